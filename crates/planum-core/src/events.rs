//! Synchronous publish/subscribe with priorities and cancellation.
//!
//! Listeners receive the owning context mutably, so a listener may mutate
//! the diagram and fire further events while a dispatch is in progress.
//! Dispatch iterates over a snapshot of the listener list taken when
//! [`EventBus::fire`] starts: listeners added during a dispatch only see later
//! events, and listeners removed during a dispatch are skipped.
//!
//! Ordering is by priority (higher first), ties in registration order.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use log::trace;

use crate::{identifier::Id, overlays::OverlayId};

/// Priority given to listeners registered without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 1000;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// Data carried by an event.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Element(Id),
    Elements(Vec<Id>),
    Overlay {
        id: OverlayId,
        element: Id,
        kind: String,
    },
    Command {
        command: String,
    },
    Import {
        warnings: usize,
    },
}

/// An event being dispatched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    name: String,
    payload: Payload,
    stopped: bool,
    default_prevented: bool,
}

impl Event {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Name of the event as passed to [`EventBus::fire`]; empty before dispatch.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    /// Returns the element carried by element payloads.
    pub fn element(&self) -> Option<Id> {
        match self.payload {
            Payload::Element(id) => Some(id),
            Payload::Overlay { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Keeps lower-priority listeners from seeing this event.
    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    /// Asks the emitting operation to abort.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

type Callback<C> = Rc<dyn Fn(&mut C, &mut Event)>;

struct Listener<C> {
    id: ListenerId,
    priority: i32,
    callback: Callback<C>,
}

/// Implemented by contexts that own an [`EventBus`] over themselves.
pub trait EventSource: Sized {
    fn events(&self) -> &EventBus<Self>;
}

/// Named-event listener registry for a context type `C`.
pub struct EventBus<C> {
    listeners: IndexMap<String, Vec<Listener<C>>>,
    next_id: usize,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self {
            listeners: IndexMap::new(),
            next_id: 0,
        }
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field(
                "listeners",
                &self
                    .listeners
                    .iter()
                    .map(|(name, list)| (name.as_str(), list.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `event` with the given priority.
    ///
    /// # Examples
    ///
    /// ```
    /// use planum_core::events::{Event, EventBus, EventSource, Payload};
    ///
    /// struct Counter {
    ///     bus: EventBus<Counter>,
    ///     seen: Vec<&'static str>,
    /// }
    ///
    /// impl EventSource for Counter {
    ///     fn events(&self) -> &EventBus<Self> {
    ///         &self.bus
    ///     }
    /// }
    ///
    /// let mut counter = Counter { bus: EventBus::new(), seen: Vec::new() };
    /// counter.bus.on("ping", 500, |c: &mut Counter, _| c.seen.push("low"));
    /// counter.bus.on("ping", 1500, |c: &mut Counter, _| c.seen.push("high"));
    ///
    /// let allowed = EventBus::fire(&mut counter, "ping", &mut Event::new(Payload::Empty));
    /// assert!(allowed);
    /// assert_eq!(counter.seen, vec!["high", "low"]);
    /// ```
    pub fn on(
        &mut self,
        event: &str,
        priority: i32,
        callback: impl Fn(&mut C, &mut Event) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        let list = self.listeners.entry(event.to_string()).or_default();
        // Insert after every listener of equal or higher priority.
        let index = list
            .iter()
            .position(|l| l.priority < priority)
            .unwrap_or(list.len());
        list.insert(
            index,
            Listener {
                id,
                priority,
                callback: Rc::new(callback),
            },
        );
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(index) = list.iter().position(|l| l.id == id) {
                list.remove(index);
                return true;
            }
        }
        false
    }

    /// Returns the number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }

    fn is_registered(&self, event: &str, id: ListenerId) -> bool {
        self.listeners
            .get(event)
            .is_some_and(|list| list.iter().any(|l| l.id == id))
    }

    fn snapshot(&self, event: &str) -> Vec<(ListenerId, Callback<C>)> {
        self.listeners.get(event).map_or_else(Vec::new, |list| {
            list.iter()
                .map(|l| (l.id, Rc::clone(&l.callback)))
                .collect()
        })
    }
}

impl<C: EventSource> EventBus<C> {
    /// Dispatches `event` under `name` to the listeners of `context`.
    ///
    /// Returns false if a listener called [`Event::prevent_default`].
    pub fn fire(context: &mut C, name: &str, event: &mut Event) -> bool {
        event.name = name.to_string();
        let listeners = context.events().snapshot(name);
        trace!(event = name, listeners = listeners.len(); "Firing event");

        for (id, callback) in listeners {
            if event.stopped {
                break;
            }
            if !context.events().is_registered(name, id) {
                continue;
            }
            callback(context, event);
        }
        !event.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        bus: EventBus<Recorder>,
        log: Vec<String>,
        late: Option<ListenerId>,
    }

    impl EventSource for Recorder {
        fn events(&self) -> &EventBus<Self> {
            &self.bus
        }
    }

    fn fire(recorder: &mut Recorder, name: &str) -> bool {
        EventBus::fire(recorder, name, &mut Event::new(Payload::Empty))
    }

    #[test]
    fn test_priority_then_registration_order() {
        let mut recorder = Recorder::default();
        recorder.bus.on("e", DEFAULT_PRIORITY, |r, _| r.log.push("a".into()));
        recorder.bus.on("e", 2000, |r, _| r.log.push("high".into()));
        recorder.bus.on("e", DEFAULT_PRIORITY, |r, _| r.log.push("b".into()));
        recorder.bus.on("e", 10, |r, _| r.log.push("low".into()));

        assert!(fire(&mut recorder, "e"));
        assert_eq!(recorder.log, vec!["high", "a", "b", "low"]);
    }

    #[test]
    fn test_stop_propagation() {
        let mut recorder = Recorder::default();
        recorder.bus.on("e", 2000, |r, e| {
            r.log.push("first".into());
            e.stop_propagation();
        });
        recorder.bus.on("e", 1000, |r, _| r.log.push("second".into()));

        assert!(fire(&mut recorder, "e"));
        assert_eq!(recorder.log, vec!["first"]);
    }

    #[test]
    fn test_prevent_default() {
        let mut recorder = Recorder::default();
        recorder.bus.on("e", DEFAULT_PRIORITY, |_, e| e.prevent_default());
        recorder.bus.on("e", 1, |r, _| r.log.push("still runs".into()));

        assert!(!fire(&mut recorder, "e"));
        assert_eq!(recorder.log, vec!["still runs"]);
    }

    #[test]
    fn test_off() {
        let mut recorder = Recorder::default();
        let id = recorder.bus.on("e", DEFAULT_PRIORITY, |r, _| r.log.push("x".into()));

        assert!(recorder.bus.off(id));
        assert!(!recorder.bus.off(id));
        fire(&mut recorder, "e");
        assert!(recorder.log.is_empty());
    }

    #[test]
    fn test_registration_during_dispatch_uses_snapshot() {
        let mut recorder = Recorder::default();
        recorder.bus.on("e", DEFAULT_PRIORITY, |r, _| {
            r.log.push("outer".into());
            r.bus.on("e", 2000, |r, _| r.log.push("added".into()));
        });

        fire(&mut recorder, "e");
        assert_eq!(recorder.log, vec!["outer"]);
    }

    #[test]
    fn test_removal_during_dispatch_skips_listener() {
        let mut recorder = Recorder::default();
        recorder.bus.on("e", 2000, |r, _| {
            r.log.push("remover".into());
            if let Some(late) = r.late.take() {
                r.bus.off(late);
            }
        });
        let late = recorder.bus.on("e", 1, |r, _| r.log.push("late".into()));
        recorder.late = Some(late);

        fire(&mut recorder, "e");
        assert_eq!(recorder.log, vec!["remover"]);
    }

    #[test]
    fn test_reentrant_fire() {
        let mut recorder = Recorder::default();
        recorder.bus.on("outer", DEFAULT_PRIORITY, |r, _| {
            r.log.push("outer".into());
            fire(r, "inner");
            r.log.push("outer done".into());
        });
        recorder.bus.on("inner", DEFAULT_PRIORITY, |r, e| {
            assert_eq!(e.name(), "inner");
            r.log.push("inner".into());
        });

        fire(&mut recorder, "outer");
        assert_eq!(recorder.log, vec!["outer", "inner", "outer done"]);
    }
}
