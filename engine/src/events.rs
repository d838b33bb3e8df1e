//! Store events and the notifier that dispatches them.
//!
//! Listeners are stored as `Arc<dyn Fn>` and snapshotted before every
//! dispatch, so a listener may subscribe, unsubscribe or call back into the
//! store while an event is being delivered. No lock is held while a listener
//! runs.

use crate::{BatchOptions, EditKind, Operation, Record, Store};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A listener id returned by [`Notifier::on`], accepted by [`Notifier::off`].
pub type ListenerId = u64;

/// Closure type for store listeners.
pub type ListenerFn = dyn Fn(&Store, &StoreEvent<'_>) -> Control + Send + Sync;

/// Names of the events a store emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Add,
    Remove,
    Update,
    DataChanged,
    BeforeLoad,
    Load,
    BeforeSync,
    Write,
    Clear,
}

impl EventName {
    /// Whether listeners may veto this event.
    pub fn is_cancellable(self) -> bool {
        matches!(self, EventName::BeforeLoad | EventName::BeforeSync)
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventName::Add => "add",
            EventName::Remove => "remove",
            EventName::Update => "update",
            EventName::DataChanged => "datachanged",
            EventName::BeforeLoad => "beforeload",
            EventName::Load => "load",
            EventName::BeforeSync => "beforesync",
            EventName::Write => "write",
            EventName::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Event payloads. The store itself is passed alongside every event.
#[derive(Debug)]
pub enum StoreEvent<'a> {
    /// Records entered the working set at `index`
    Add { records: &'a [Record], index: usize },
    /// A record left the working set from `index`
    Remove { record: &'a Record, index: usize },
    /// A joined record was edited, committed or rejected
    Update { record: &'a Record, kind: EditKind },
    /// The working set changed in bulk
    DataChanged,
    /// A read is about to be issued; cancellable
    BeforeLoad { operation: &'a Operation },
    /// A read completed
    Load {
        records: &'a [Record],
        success: bool,
        operation: &'a Operation,
    },
    /// A batch is about to be issued; cancellable
    BeforeSync { options: &'a BatchOptions },
    /// A write operation succeeded and was reconciled
    Write { operation: &'a Operation },
    /// The working set was emptied
    Clear,
}

impl StoreEvent<'_> {
    pub fn name(&self) -> EventName {
        match self {
            StoreEvent::Add { .. } => EventName::Add,
            StoreEvent::Remove { .. } => EventName::Remove,
            StoreEvent::Update { .. } => EventName::Update,
            StoreEvent::DataChanged => EventName::DataChanged,
            StoreEvent::BeforeLoad { .. } => EventName::BeforeLoad,
            StoreEvent::Load { .. } => EventName::Load,
            StoreEvent::BeforeSync { .. } => EventName::BeforeSync,
            StoreEvent::Write { .. } => EventName::Write,
            StoreEvent::Clear => EventName::Clear,
        }
    }
}

/// What a listener asks the notifier to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    #[default]
    Continue,
    /// Skip the remaining listeners and, for cancellable events, veto.
    Stop,
}

impl From<()> for Control {
    fn from(_: ()) -> Self {
        Control::Continue
    }
}

impl From<bool> for Control {
    fn from(proceed: bool) -> Self {
        if proceed {
            Control::Continue
        } else {
            Control::Stop
        }
    }
}

/// Named-event dispatcher with veto support and suspension.
pub struct Notifier {
    listeners: Mutex<HashMap<EventName, Vec<(ListenerId, Arc<ListenerFn>)>>>,
    next_id: AtomicU64,
    suspended: AtomicUsize,
    suspended_events: Mutex<HashMap<EventName, usize>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            suspended: AtomicUsize::new(0),
            suspended_events: Mutex::new(HashMap::new()),
        }
    }

    /// Register `listener` for `event`.
    ///
    /// The listener may return `()`, a `bool` (`false` stops) or a [`Control`].
    pub fn on<F, R>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&Store, &StoreEvent<'_>) -> R + Send + Sync + 'static,
        R: Into<Control>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Arc<ListenerFn> =
            Arc::new(move |store: &Store, event: &StoreEvent<'_>| -> Control {
                listener(store, event).into()
            });
        self.listeners
            .lock()
            .entry(event)
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove the listener identified by `id`. Unknown ids are ignored.
    pub fn off(&self, id: ListenerId) {
        for list in self.listeners.lock().values_mut() {
            list.retain(|(lid, _)| *lid != id);
        }
    }

    pub fn clear_listeners(&self) {
        self.listeners.lock().clear();
    }

    pub fn has_listeners(&self, event: EventName) -> bool {
        self.listeners
            .lock()
            .get(&event)
            .is_some_and(|list| !list.is_empty())
    }

    /// Suspend every event until a matching [`Notifier::resume_events`].
    /// Calls nest.
    pub fn suspend_events(&self) {
        self.suspended.fetch_add(1, Ordering::SeqCst);
    }

    pub fn resume_events(&self) {
        let _ = self
            .suspended
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Suspend a single event. Calls nest.
    pub fn suspend_event(&self, event: EventName) {
        *self.suspended_events.lock().entry(event).or_default() += 1;
    }

    pub fn resume_event(&self, event: EventName) {
        let mut suspended = self.suspended_events.lock();
        if let Some(count) = suspended.get_mut(&event) {
            *count -= 1;
            if *count == 0 {
                suspended.remove(&event);
            }
        }
    }

    pub fn is_suspended(&self, event: EventName) -> bool {
        self.suspended.load(Ordering::SeqCst) > 0
            || self.suspended_events.lock().contains_key(&event)
    }

    /// Deliver `event`. Suspended events are dropped.
    pub fn fire(&self, store: &Store, event: &StoreEvent<'_>) {
        self.dispatch(store, event);
    }

    /// Deliver a cancellable `event`; returns `false` when a listener vetoed.
    pub fn fire_cancellable(&self, store: &Store, event: &StoreEvent<'_>) -> bool {
        self.dispatch(store, event) == Control::Continue
    }

    fn dispatch(&self, store: &Store, event: &StoreEvent<'_>) -> Control {
        let name = event.name();
        if self.is_suspended(name) {
            return Control::Continue;
        }

        let snapshot: Vec<Arc<ListenerFn>> = {
            let guard = self.listeners.lock();
            guard
                .get(&name)
                .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        for listener in snapshot {
            if listener(store, event) == Control::Stop {
                return Control::Stop;
            }
        }
        Control::Continue
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventName, usize> = self
            .listeners
            .lock()
            .iter()
            .map(|(name, list)| (*name, list.len()))
            .collect();
        f.debug_struct("Notifier")
            .field("listeners", &counts)
            .field("suspended", &self.suspended.load(Ordering::SeqCst))
            .finish()
    }
}
