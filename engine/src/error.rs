//! Error types for the Tether engine.

use crate::{ModelName, OperationId};
use thiserror::Error;

/// All possible errors from the Tether engine.
///
/// Backend failures are never reported through this type: they travel on the
/// [`Operation`](crate::Operation) outcome. Errors here are either
/// construction-time misconfiguration or misuse of an operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("store has no model: configure `model` or `fields`")]
    MissingModel,

    #[error("model not registered: {0}")]
    UnknownModel(ModelName),

    #[error("unknown proxy type: {0}")]
    UnknownProxyType(String),

    #[error("unknown store type: {0}")]
    UnknownStoreType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Validation errors
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    // Operation errors
    #[error("operation {0} has already completed")]
    OutcomeAlreadySet(OperationId),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownProxyType("rest".into());
        assert_eq!(err.to_string(), "unknown proxy type: rest");

        let err = Error::OutcomeAlreadySet("op-1".into());
        assert_eq!(err.to_string(), "operation op-1 has already completed");

        let err = Error::TypeMismatch {
            field: "age".into(),
            expected: "Int".into(),
            got: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for field 'age': expected Int, got String"
        );
    }

    #[test]
    fn json_errors_become_config_errors() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
