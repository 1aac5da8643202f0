use crate::action::{Action, ActionId};
use std::collections::VecDeque;
use std::sync::Arc;

/// Ordered queue of issued actions awaiting release.
///
/// Actions leave the queue only through [`ActionsBuffer::get_next`],
/// [`ActionsBuffer::get_all_up_to_id`] or a non-peeking pending query; every
/// other query returns copies and leaves the release watermark untouched.
#[derive(Debug, Clone, Default)]
pub struct ActionsBuffer {
    pending: VecDeque<Arc<Action>>,
    /// Number of leading pending actions frozen into the current block.
    blocked: usize,
    last_added: Option<ActionId>,
    last_released: Option<Arc<Action>>,
    released_count: usize,
}

impl ActionsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action. Actions must arrive in increasing id order; an
    /// out-of-order action is rejected and false is returned.
    pub fn add(&mut self, action: Arc<Action>) -> bool {
        if let Some(last) = self.last_added {
            if action.id() <= last {
                tracing::warn!(
                    id = %action.id(),
                    last = %last,
                    "rejecting out-of-order action; ids must increase"
                );
                return false;
            }
        }
        self.last_added = Some(action.id());
        self.pending.push_back(action);
        true
    }

    /// Release the oldest pending action.
    pub fn get_next(&mut self) -> Option<Arc<Action>> {
        let action = self.pending.pop_front()?;
        self.blocked = self.blocked.saturating_sub(1);
        self.mark_released(&action);
        Some(action)
    }

    /// All pending actions. With `peek == false` they are released as well.
    pub fn get_all_pending(&mut self, peek: bool) -> Vec<Arc<Action>> {
        if peek {
            return self.peek_all();
        }
        let count = self.pending.len();
        self.release_front(count)
    }

    /// The pending actions frozen by the last [`ActionsBuffer::set_block`].
    /// With `peek == false` they are released as well.
    pub fn get_block_pending(&mut self, peek: bool) -> Vec<Arc<Action>> {
        if peek {
            return self.peek_block();
        }
        let count = self.blocked;
        self.release_front(count)
    }

    /// Copy of every pending action.
    pub fn peek_all(&self) -> Vec<Arc<Action>> {
        self.pending.iter().cloned().collect()
    }

    /// Copy of the pending actions in the current block.
    pub fn peek_block(&self) -> Vec<Arc<Action>> {
        self.pending.iter().take(self.blocked).cloned().collect()
    }

    /// Freeze every pending action into the current block.
    pub fn set_block(&mut self) {
        self.blocked = self.pending.len();
    }

    /// Release every pending action whose id is at most `id`.
    pub fn get_all_up_to_id(&mut self, id: ActionId) -> Vec<Arc<Action>> {
        let count = self
            .pending
            .iter()
            .take_while(|action| action.id() <= id)
            .count();
        self.release_front(count)
    }

    /// The most recently released action.
    pub fn get_last(&self) -> Option<Arc<Action>> {
        self.last_released.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked
    }

    pub fn released_count(&self) -> usize {
        self.released_count
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop every pending action without releasing it.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.blocked = 0;
        dropped
    }

    fn release_front(&mut self, count: usize) -> Vec<Arc<Action>> {
        let released: Vec<Arc<Action>> = self.pending.drain(..count).collect();
        self.blocked = self.blocked.saturating_sub(count);
        if let Some(last) = released.last() {
            self.last_released = Some(Arc::clone(last));
        }
        self.released_count += released.len();
        released
    }

    fn mark_released(&mut self, action: &Arc<Action>) {
        self.last_released = Some(Arc::clone(action));
        self.released_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionIdGenerator, ActionKind};

    fn comments(ids: &ActionIdGenerator, n: usize) -> Vec<Arc<Action>> {
        (0..n)
            .map(|i| Arc::new(Action::new(ids, ActionKind::Comment(format!("c{i}")))))
            .collect()
    }

    fn filled(n: usize) -> ActionsBuffer {
        let ids = ActionIdGenerator::new();
        let mut buffer = ActionsBuffer::new();
        for action in comments(&ids, n) {
            assert!(buffer.add(action));
        }
        buffer
    }

    fn raw_ids(actions: &[Arc<Action>]) -> Vec<u64> {
        actions.iter().map(|a| a.id().raw()).collect()
    }

    #[test]
    fn test_get_next_releases_in_order() {
        let mut buffer = filled(3);
        assert_eq!(buffer.get_next().map(|a| a.id().raw()), Some(1));
        assert_eq!(buffer.get_next().map(|a| a.id().raw()), Some(2));
        assert_eq!(buffer.get_next().map(|a| a.id().raw()), Some(3));
        assert!(buffer.get_next().is_none());
        assert_eq!(buffer.released_count(), 3);
        assert_eq!(buffer.get_last().map(|a| a.id().raw()), Some(3));
    }

    #[test]
    fn test_peek_does_not_release() {
        let mut buffer = filled(3);
        for _ in 0..5 {
            assert_eq!(raw_ids(&buffer.get_all_pending(true)), vec![1, 2, 3]);
        }
        assert_eq!(buffer.get_next().map(|a| a.id().raw()), Some(1));
        assert_eq!(raw_ids(&buffer.get_all_pending(true)), vec![2, 3]);
    }

    #[test]
    fn test_get_all_pending_without_peek_releases() {
        let mut buffer = filled(2);
        assert_eq!(raw_ids(&buffer.get_all_pending(false)), vec![1, 2]);
        assert!(!buffer.has_pending());
        assert_eq!(buffer.get_last().map(|a| a.id().raw()), Some(2));
    }

    #[test]
    fn test_block_partition() {
        let ids = ActionIdGenerator::new();
        let mut buffer = ActionsBuffer::new();
        let actions = comments(&ids, 5);
        for action in actions.iter().take(3) {
            buffer.add(Arc::clone(action));
        }
        assert!(buffer.get_block_pending(true).is_empty(), "no block yet");
        buffer.set_block();
        for action in actions.iter().skip(3) {
            buffer.add(Arc::clone(action));
        }
        assert_eq!(raw_ids(&buffer.get_block_pending(true)), vec![1, 2, 3]);
        assert_eq!(raw_ids(&buffer.get_all_pending(true)), vec![1, 2, 3, 4, 5]);

        // Releasing one action shrinks the block.
        buffer.get_next();
        assert_eq!(raw_ids(&buffer.get_block_pending(true)), vec![2, 3]);

        assert_eq!(raw_ids(&buffer.get_block_pending(false)), vec![2, 3]);
        assert_eq!(buffer.blocked_count(), 0);
        assert_eq!(raw_ids(&buffer.get_all_pending(true)), vec![4, 5]);
    }

    #[test]
    fn test_get_all_up_to_id() {
        let mut buffer = filled(5);
        let released = buffer.get_all_up_to_id(ActionId::from_raw(3));
        assert_eq!(raw_ids(&released), vec![1, 2, 3]);
        assert_eq!(buffer.pending_count(), 2);
        assert!(buffer.get_all_up_to_id(ActionId::from_raw(3)).is_empty());
    }

    #[test]
    fn test_rejects_out_of_order_actions() {
        let ids = ActionIdGenerator::new();
        let actions = comments(&ids, 2);
        let mut buffer = ActionsBuffer::new();
        assert!(buffer.add(Arc::clone(&actions[1])));
        assert!(!buffer.add(Arc::clone(&actions[0])));
        assert!(!buffer.add(Arc::clone(&actions[1])), "duplicates rejected");
        assert_eq!(buffer.pending_count(), 1);
    }

    #[test]
    fn test_discard_pending() {
        let mut buffer = filled(4);
        buffer.set_block();
        assert_eq!(buffer.discard_pending(), 4);
        assert_eq!(buffer.blocked_count(), 0);
        assert!(buffer.get_last().is_none());
    }
}
