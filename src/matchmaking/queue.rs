//! Matchmaking queue implementation

use std::collections::VecDeque;
use std::time::Instant;
use uuid::Uuid;

use crate::game::GameError;

/// Connection waiting in the matchmaking queue
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub conn_id: Uuid,
    pub queued_at: Instant,
}

/// The matchmaking queue. Arrival order is pairing order.
pub struct MatchmakingQueue {
    queue: VecDeque<QueuedPlayer>,
    /// Maximum number of waiting connections
    max_len: usize,
}

impl MatchmakingQueue {
    pub fn new(max_len: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_len,
        }
    }

    /// Add a connection to the back of the queue. Already queued connections
    /// keep their place.
    pub fn enqueue(&mut self, conn_id: Uuid) -> Result<(), GameError> {
        if self.contains(&conn_id) {
            return Ok(());
        }
        if self.queue.len() >= self.max_len {
            return Err(GameError::QueueFull);
        }
        self.queue.push_back(QueuedPlayer {
            conn_id,
            queued_at: Instant::now(),
        });
        Ok(())
    }

    /// Remove a connection from the queue
    pub fn dequeue(&mut self, conn_id: Uuid) -> Option<QueuedPlayer> {
        let pos = self.queue.iter().position(|p| p.conn_id == conn_id)?;
        self.queue.remove(pos)
    }

    /// Check if a connection is in the queue
    pub fn contains(&self, conn_id: &Uuid) -> bool {
        self.queue.iter().any(|p| &p.conn_id == conn_id)
    }

    /// Get queue length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take the two oldest entries, or leave the queue untouched
    pub fn try_pair(&mut self) -> Option<(QueuedPlayer, QueuedPlayer)> {
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;
        Some((first, second))
    }
}

impl Default for MatchmakingQueue {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_is_idempotent() {
        let mut queue = MatchmakingQueue::default();
        let a = Uuid::new_v4();
        queue.enqueue(a).unwrap();
        queue.enqueue(a).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(queue.try_pair().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn pairs_in_arrival_order() {
        let mut queue = MatchmakingQueue::default();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            queue.enqueue(*id).unwrap();
        }

        let (a, b) = queue.try_pair().unwrap();
        assert_eq!((a.conn_id, b.conn_id), (ids[0], ids[1]));
        let (c, d) = queue.try_pair().unwrap();
        assert_eq!((c.conn_id, d.conn_id), (ids[2], ids[3]));
        assert!(queue.try_pair().is_none());
        assert!(queue.contains(&ids[4]));
    }

    #[test]
    fn dequeue_then_requeue_does_not_duplicate() {
        let mut queue = MatchmakingQueue::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        queue.enqueue(a).unwrap();
        queue.enqueue(b).unwrap();

        assert!(queue.dequeue(a).is_some());
        assert!(queue.dequeue(a).is_none());
        queue.enqueue(a).unwrap();
        queue.enqueue(a).unwrap();

        assert_eq!(queue.len(), 2);
        let (first, second) = queue.try_pair().unwrap();
        assert_eq!((first.conn_id, second.conn_id), (b, a));
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_rejects_newcomers() {
        let mut queue = MatchmakingQueue::new(1);
        let a = Uuid::new_v4();
        queue.enqueue(a).unwrap();
        assert_eq!(queue.enqueue(Uuid::new_v4()), Err(GameError::QueueFull));
        assert_eq!(queue.enqueue(a), Ok(()));
    }
}
