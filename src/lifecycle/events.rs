//! Event subscription plumbing.
//!
//! [`EventSource`] is the seam a [`DisposableBase`](super::DisposableBase)
//! subscribes through; [`EventEmitter`] is the in-process implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

/// Identifies one registered listener on a source.
pub type ListenerId = u64;

/// Callback invoked with the event payload.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// A subject that listeners can subscribe to by event name.
pub trait EventSource: Send + Sync {
    fn add_listener(&self, event: &str, handler: EventHandler) -> ListenerId;

    /// Returns whether the listener was registered.
    fn remove_listener(&self, event: &str, id: ListenerId) -> bool;
}

/// Named-event emitter. Handlers run synchronously on `emit`.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<HashMap<String, Vec<(ListenerId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls every handler registered for `event`. Returns how many ran.
    ///
    /// Handlers are called outside the lock, so a handler may subscribe or
    /// unsubscribe without deadlocking.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let handlers: Vec<EventHandler> = self
            .listeners
            .lock()
            .get(event)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.lock().get(event).map_or(0, Vec::len)
    }
}

impl EventSource for EventEmitter {
    fn add_listener(&self, event: &str, handler: EventHandler) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn remove_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };

        let before = list.len();
        list.retain(|(listener, _)| *listener != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock();
        f.debug_struct("EventEmitter")
            .field("events", &listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (EventHandler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let handler: EventHandler = Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (handler, calls)
    }

    #[test]
    fn test_emit_reaches_listeners_of_that_event() {
        let emitter = EventEmitter::new();
        let (handler, calls) = counter();
        emitter.add_listener("reload", handler);

        assert_eq!(emitter.emit("reload", &json!({"path": "docs/button.md"})), 1);
        assert_eq!(emitter.emit("other", &Value::Null), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let emitter = EventEmitter::new();
        let (handler, calls) = counter();
        let id = emitter.add_listener("reload", handler);

        assert!(emitter.remove_listener("reload", id));
        assert!(!emitter.remove_listener("reload", id));
        assert_eq!(emitter.listener_count("reload"), 0);

        emitter.emit("reload", &Value::Null);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_can_unsubscribe_during_emit() {
        let emitter = Arc::new(EventEmitter::new());
        let inner = emitter.clone();
        let handler: EventHandler = Arc::new(move |payload| {
            let id = payload.as_u64().unwrap_or_default();
            inner.remove_listener("once", id);
        });
        let id = emitter.add_listener("once", handler);

        assert_eq!(emitter.emit("once", &json!(id)), 1);
        assert_eq!(emitter.listener_count("once"), 0);
    }
}
