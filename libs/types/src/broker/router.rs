//! Id-keyed message demultiplexer
//!
//! A brokerage connection multiplexes every subscription over one socket.
//! Instead of attaching and detaching listener closures per contract, the
//! reader task dispatches each frame to the receiver registered under the
//! frame's id. Cleanup is `deregister(id)`; a route whose receiver was dropped
//! is pruned on the next dispatch.

use dashmap::DashMap;
use std::fmt::Display;
use std::hash::Hash;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Routes messages of type `M` to the receiver registered for key `K`
pub struct MessageRouter<K, M>
where
    K: Eq + Hash + Copy + Display,
{
    routes: DashMap<K, mpsc::UnboundedSender<M>>,
}

impl<K, M> MessageRouter<K, M>
where
    K: Eq + Hash + Copy + Display,
{
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    /// Register a route, replacing (and closing) any previous one for `key`
    pub fn register(&self, key: K) -> mpsc::UnboundedReceiver<M> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.routes.insert(key, tx).is_some() {
            debug!("Replaced existing route for {}", key);
        }
        rx
    }

    /// Deliver a message; returns false when nobody is listening on `key`
    pub fn dispatch(&self, key: &K, message: M) -> bool {
        let delivered = match self.routes.get(key) {
            Some(route) => route.send(message).is_ok(),
            None => {
                trace!("No route for {}, dropping message", key);
                return false;
            }
        };

        if !delivered {
            debug!("Receiver for {} dropped, pruning route", key);
            self.routes.remove(key);
        }
        delivered
    }

    /// Remove a route; the receiver observes end-of-stream
    pub fn deregister(&self, key: &K) -> bool {
        self.routes.remove(key).is_some()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.routes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<K, M> Default for MessageRouter<K, M>
where
    K: Eq + Hash + Copy + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContractId;

    #[tokio::test]
    async fn test_dispatch_reaches_only_registered_key() {
        let router: MessageRouter<ContractId, u32> = MessageRouter::new();
        let mut first = router.register(ContractId::new(1));
        let mut second = router.register(ContractId::new(2));

        assert!(router.dispatch(&ContractId::new(2), 20));
        assert!(!router.dispatch(&ContractId::new(3), 30));

        assert_eq!(second.recv().await, Some(20));
        assert!(first.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deregister_closes_stream() {
        let router: MessageRouter<ContractId, u32> = MessageRouter::new();
        let mut rx = router.register(ContractId::new(5));

        assert!(router.deregister(&ContractId::new(5)));
        assert!(!router.deregister(&ContractId::new(5)));
        assert_eq!(rx.recv().await, None);
        assert!(router.is_empty());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let router: MessageRouter<ContractId, u32> = MessageRouter::new();
        let rx = router.register(ContractId::new(9));
        drop(rx);

        assert!(!router.dispatch(&ContractId::new(9), 1));
        assert!(!router.contains(&ContractId::new(9)));
    }
}
