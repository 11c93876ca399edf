//! Priority queue of scheduled actions (min-heap by due time)

use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::config::ScheduledAction;

/// Due time, then insertion order, so actions sharing a timestamp run in
/// config order
type Slot = Reverse<(u64, usize)>;

pub struct ActionQueue {
    queue: PriorityQueue<usize, Slot>,
    map: HashMap<usize, ScheduledAction>,
    next_seq: usize,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            map: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, action: ScheduledAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(seq, Reverse((action.at, seq)));
        self.map.insert(seq, action);
    }

    /// Earliest action, whether due or not
    pub fn peek(&self) -> Option<&ScheduledAction> {
        let (seq, _) = self.queue.peek()?;
        self.map.get(seq)
    }

    /// Pop the earliest action if it is due at `now`
    pub fn pop_due(&mut self, now: u64) -> Option<ScheduledAction> {
        if self.peek()?.at > now {
            return None;
        }
        let (seq, _) = self.queue.pop()?;
        self.map.remove(&seq)
    }

    /// Every action due at `now`, earliest first
    pub fn drain_due(&mut self, now: u64) -> Vec<ScheduledAction> {
        let mut due = Vec::new();
        while let Some(action) = self.pop_due(now) {
            due.push(action);
        }
        due
    }

    pub fn next_due_at(&self) -> Option<u64> {
        self.peek().map(|a| a.at)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<ScheduledAction> for ActionQueue {
    fn from_iter<I: IntoIterator<Item = ScheduledAction>>(iter: I) -> Self {
        let mut queue = Self::new();
        for action in iter {
            queue.push(action);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Action;

    fn accrue(at: u64, rate_ppm: u64) -> ScheduledAction {
        ScheduledAction {
            at,
            action: Action::Accrue { rate_ppm },
        }
    }

    #[test]
    fn test_queue_orders_by_due_time() {
        let mut queue = ActionQueue::new();
        queue.push(accrue(30, 1));
        queue.push(accrue(10, 2));
        queue.push(accrue(20, 3));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.next_due_at(), Some(10));

        let due = queue.drain_due(25);
        let times: Vec<u64> = due.iter().map(|a| a.at).collect();
        assert_eq!(times, vec![10, 20]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_same_timestamp_keeps_insertion_order() {
        let mut queue: ActionQueue = (1..=4).map(|i| accrue(5, i)).collect();

        let actions: Vec<Action> = queue.drain_due(5).into_iter().map(|a| a.action).collect();
        assert_eq!(
            actions,
            (1..=4).map(|i| Action::Accrue { rate_ppm: i }).collect::<Vec<_>>()
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nothing_due_before_time() {
        let mut queue = ActionQueue::new();
        queue.push(accrue(100, 1));

        assert!(queue.pop_due(99).is_none());
        assert_eq!(queue.peek().map(|a| a.at), Some(100));
        assert!(queue.pop_due(100).is_some());
        assert!(queue.pop_due(1_000).is_none());
    }
}
