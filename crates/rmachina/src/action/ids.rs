use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique, creation-ordered identifier of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(u64);

impl ActionId {
    /// Sentinel carried by wire messages that do not request an acknowledgment.
    pub const NO_ACK: ActionId = ActionId(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing action ids, starting at 1.
///
/// Each session owns its own generator so independent sessions never share
/// id sequences.
#[derive(Debug, Default)]
pub struct ActionIdGenerator {
    last: AtomicU64,
}

impl ActionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next id.
    pub fn next_id(&self) -> ActionId {
        ActionId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// The most recently issued id, or `NO_ACK` if none was issued yet.
    pub fn last_id(&self) -> ActionId {
        ActionId(self.last.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let ids = ActionIdGenerator::new();
        assert_eq!(ids.last_id(), ActionId::NO_ACK);
        assert_eq!(ids.next_id(), ActionId::from_raw(1));
        assert_eq!(ids.next_id(), ActionId::from_raw(2));
        assert_eq!(ids.last_id().raw(), 2);
    }

    #[test]
    fn test_generators_are_independent() {
        let a = ActionIdGenerator::new();
        let b = ActionIdGenerator::new();
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id().raw(), 1);
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let ids = Arc::new(ActionIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<ActionId> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread"))
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert_eq!(all.last().copied(), Some(ActionId::from_raw(1000)));
    }

    #[test]
    fn test_id_serialization() {
        let id = ActionId::from_raw(42);
        let serialized = serde_json::to_string(&id).expect("serialize");
        assert_eq!(serialized, "42");
        let deserialized: ActionId = serde_json::from_str(&serialized).expect("deserialize");
        assert_eq!(id, deserialized);
    }
}
