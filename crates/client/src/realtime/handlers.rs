//! Subscription registry for realtime messages.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use talent_ops_core::realtime::{Envelope, Topic};
use uuid::Uuid;

/// Callback invoked for every matching message.
pub type Handler = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Identifies one registration so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Handlers keyed by topic, each list in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<Topic, Vec<(HandlerId, Handler)>>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<String, usize> = handlers
            .iter()
            .map(|(topic, list)| (topic.to_string(), list.len()))
            .collect();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, topic: Topic, handler: F) -> HandlerId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = HandlerId(Uuid::new_v4());
        self.handlers
            .write()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a registration. Unknown ids are ignored; returns whether
    /// anything was removed.
    pub fn off(&self, topic: &Topic, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(registered, _)| *registered != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(topic);
        }
        removed
    }

    /// Call the handlers for the message's kind, then the wildcard handlers.
    /// Returns how many handlers ran.
    ///
    /// Handlers run outside the lock, so they may subscribe or unsubscribe.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let matched: Vec<Handler> = {
            let handlers = self.handlers.read();
            let exact = handlers.get(&Topic::Kind(envelope.kind.clone()));
            let wildcard = handlers.get(&Topic::Wildcard);
            exact
                .into_iter()
                .chain(wildcard)
                .flatten()
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };
        for handler in &matched {
            handler(envelope);
        }
        matched.len()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parking_lot::Mutex;
    use talent_ops_core::realtime::MessageKind;

    use super::*;

    fn envelope(kind: &str) -> Envelope {
        Envelope::parse(&format!(r#"{{"type":"{kind}","data":{{}}}}"#)).unwrap()
    }

    #[test]
    fn test_exact_handlers_run_before_wildcard() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let log = calls.clone();
        registry.on(Topic::Wildcard, move |_| log.lock().push("wildcard"));
        let log = calls.clone();
        registry.on(Topic::Kind(MessageKind::NewMessage), move |_| log.lock().push("exact"));

        assert_eq!(registry.dispatch(&envelope("new_message")), 2);
        assert_eq!(*calls.lock(), vec!["exact", "wildcard"]);
    }

    #[test]
    fn test_unknown_kinds_reach_their_handlers() {
        let registry = HandlerRegistry::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = hits.clone();
        registry.on("typing".parse().unwrap(), move |_| *counter.lock() += 1);

        registry.dispatch(&envelope("typing"));
        registry.dispatch(&envelope("new_message"));
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_off_is_idempotent() {
        let registry = HandlerRegistry::new();
        let topic = Topic::Kind(MessageKind::SystemNotice);
        let id = registry.on(topic.clone(), |_| {});
        assert_eq!(registry.len(), 1);

        assert!(registry.off(&topic, id));
        assert!(!registry.off(&topic, id));
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch(&envelope("system_notice")), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let registry = Arc::new(HandlerRegistry::new());
        let slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));

        let reg = Arc::clone(&registry);
        let own = Arc::clone(&slot);
        let id = registry.on(Topic::Wildcard, move |_| {
            if let Some(id) = *own.lock() {
                reg.off(&Topic::Wildcard, id);
            }
        });
        *slot.lock() = Some(id);

        assert_eq!(registry.dispatch(&envelope("new_message")), 1);
        assert_eq!(registry.dispatch(&envelope("new_message")), 0);
    }
}
