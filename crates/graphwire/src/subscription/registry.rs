//! Per-id subscription registry.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Error;

/// An event delivered to one subscription's stream.
#[derive(Debug, Clone)]
pub enum SubscriptionEvent {
    /// A payload frame arrived for this subscription. `None` when the
    /// frame carried no payload (or a JSON `null`).
    Data(Option<Value>),
    /// The server completed the subscription; no further events follow.
    Completed,
    /// The subscription died with the connection; terminal.
    Failed(Error),
}

/// Maps subscription id to its delivery channel.
///
/// Shared between the connection task (inbound delivery) and callers
/// (subscribe/unsubscribe), so mutation goes through a mutex. Lookups
/// are O(1); delivery to an unknown id is silently dropped because late
/// frames legitimately arrive after an unsubscribe.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: Mutex<HashMap<String, mpsc::UnboundedSender<SubscriptionEvent>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delivery channel under `id`.
    ///
    /// Fails with [`Error::SubscriptionIdInUse`] when the id already has a
    /// live entry, leaving the existing entry untouched.
    pub fn insert(
        &self,
        id: &str,
        sender: mpsc::UnboundedSender<SubscriptionEvent>,
    ) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        if entries.contains_key(id) {
            return Err(Error::SubscriptionIdInUse(id.to_string()));
        }
        entries.insert(id.to_string(), sender);
        Ok(())
    }

    /// Remove an entry, returning whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    /// Deliver a payload to `id`, silently dropping it when unknown.
    pub fn deliver(&self, id: &str, payload: Option<Value>) {
        if let Some(sender) = self.entries.lock().get(id) {
            let _ = sender.send(SubscriptionEvent::Data(payload));
        }
    }

    /// Complete and remove the entry for `id`, if present.
    pub fn complete(&self, id: &str) {
        if let Some(sender) = self.entries.lock().remove(id) {
            let _ = sender.send(SubscriptionEvent::Completed);
        }
    }

    /// Drain every entry, notifying each exactly once with `error`.
    pub fn fail_all(&self, error: Error) {
        let entries = std::mem::take(&mut *self.entries.lock());
        for sender in entries.into_values() {
            let _ = sender.send(SubscriptionEvent::Failed(error.clone()));
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no subscriptions are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn channel() -> (
        mpsc::UnboundedSender<SubscriptionEvent>,
        mpsc::UnboundedReceiver<SubscriptionEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let registry = SubscriptionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, _rx2) = channel();

        registry.insert("s1", tx1).unwrap();
        let err = registry.insert("s1", tx2).unwrap_err();
        assert_eq!(err, Error::SubscriptionIdInUse("s1".into()));

        // Original entry still delivers.
        registry.deliver("s1", Some(json!(1)));
        assert!(matches!(
            rx1.try_recv().unwrap(),
            SubscriptionEvent::Data(Some(_))
        ));
    }

    #[test]
    fn delivery_to_unknown_id_is_dropped() {
        let registry = SubscriptionRegistry::new();
        registry.deliver("ghost", Some(json!(1)));
        assert!(registry.is_empty());
    }

    #[test]
    fn complete_removes_only_that_entry() {
        let registry = SubscriptionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.insert("42", tx1).unwrap();
        registry.insert("other", tx2).unwrap();

        registry.complete("42");

        assert!(matches!(rx1.try_recv().unwrap(), SubscriptionEvent::Completed));
        assert_eq!(registry.len(), 1);

        // Late frame for the completed id goes nowhere.
        registry.deliver("42", None);
        assert!(rx1.try_recv().is_err());

        // The survivor is untouched.
        registry.deliver("other", None);
        assert!(matches!(rx2.try_recv().unwrap(), SubscriptionEvent::Data(None)));
    }

    #[test]
    fn fail_all_notifies_each_entry_exactly_once() {
        let registry = SubscriptionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.insert("a", tx1).unwrap();
        registry.insert("b", tx2).unwrap();

        registry.fail_all(Error::ConnectionClosed);
        registry.fail_all(Error::ConnectionClosed);

        for rx in [&mut rx1, &mut rx2] {
            assert!(matches!(
                rx.try_recv().unwrap(),
                SubscriptionEvent::Failed(Error::ConnectionClosed)
            ));
            assert!(rx.try_recv().is_err());
        }
        assert!(registry.is_empty());
    }
}
