//! Matchmaking service - manages queue and match creation

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::connection::ConnectionRegistry;
use crate::game::{BulletIds, GameError, GameMatch, MatchHandle, MatchRegistry, MatchState};
use crate::ws::protocol::ServerMsg;

use super::queue::MatchmakingQueue;

/// Matchmaking service
pub struct MatchmakingService {
    /// Single serialization point for pairing
    queue: Mutex<MatchmakingQueue>,
    registry: Arc<MatchRegistry>,
    connections: Arc<ConnectionRegistry>,
    bullet_ids: Arc<BulletIds>,
    max_matches: usize,
    tick_interval: Duration,
    fire_cooldown: Duration,
}

impl MatchmakingService {
    pub fn new(
        config: &Config,
        registry: Arc<MatchRegistry>,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            queue: Mutex::new(MatchmakingQueue::new(config.max_queue_len)),
            registry,
            connections,
            bullet_ids: Arc::new(BulletIds::new()),
            max_matches: config.max_matches,
            tick_interval: config.tick_interval,
            fire_cooldown: config.fire_cooldown,
        }
    }

    /// Join matchmaking queue and pair immediately if someone is waiting.
    /// Returns the id of the match formed by this join, if any.
    pub fn join_queue(self: &Arc<Self>, conn_id: Uuid) -> Result<Option<Uuid>, GameError> {
        let mut queue = self.queue.lock();
        queue.enqueue(conn_id)?;

        debug!(conn_id = %conn_id, queue_size = queue.len(), "Connection joined matchmaking queue");

        Ok(self.pair_waiting(&mut queue))
    }

    /// Leave matchmaking queue
    pub fn leave_queue(&self, conn_id: Uuid) -> bool {
        self.queue.lock().dequeue(conn_id).is_some()
    }

    /// Get current queue size
    pub fn queue_size(&self) -> usize {
        self.queue.lock().len()
    }

    /// Check if connection is in queue
    pub fn is_in_queue(&self, conn_id: &Uuid) -> bool {
        self.queue.lock().contains(conn_id)
    }

    /// Destroy a match and detach its participants. Idempotent.
    /// The freed slot is handed to the oldest waiting pair, if any.
    pub fn release_match(self: &Arc<Self>, match_id: Uuid) -> Option<MatchHandle> {
        let handle = self.registry.remove(&match_id)?;
        for conn_id in &handle.participants {
            self.connections.clear_match_if(conn_id, match_id);
        }

        let mut queue = self.queue.lock();
        if let Some(next) = self.pair_waiting(&mut queue) {
            debug!(released = %match_id, next = %next, "Deferred pair matched");
        }

        Some(handle)
    }

    /// Pair the two oldest waiting connections unless the match cap is
    /// reached. Caller holds the queue lock, so pairing is serialized.
    fn pair_waiting(self: &Arc<Self>, queue: &mut MatchmakingQueue) -> Option<Uuid> {
        if queue.len() < 2 {
            return None;
        }

        if self.registry.active_matches() >= self.max_matches {
            warn!(
                active_matches = self.registry.active_matches(),
                queue_size = queue.len(),
                "Match limit reached, pairing deferred"
            );
            return None;
        }

        let (first, second) = queue.try_pair()?;

        info!(
            first = %first.conn_id,
            second = %second.conn_id,
            first_wait_ms = first.queued_at.elapsed().as_millis() as u64,
            "Paired connections"
        );

        // Created under the queue lock so a concurrent disconnect either
        // finds its connection still queued or already attached to the match
        Some(self.create_match(first.conn_id, second.conn_id))
    }

    /// Create a match for two paired connections
    fn create_match(self: &Arc<Self>, first: Uuid, second: Uuid) -> Uuid {
        let match_id = Uuid::new_v4();
        let seed = rand::random::<u64>();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let state = MatchState::new(
            match_id,
            [first, second],
            &mut rng,
            self.bullet_ids.clone(),
            self.fire_cooldown,
        );
        let (game_match, handle) =
            GameMatch::new(state, self.connections.clone(), self.tick_interval);

        // Register match
        self.registry.insert(handle);

        // Join the broadcast group and tell each side which player is theirs
        for conn_id in [first, second] {
            self.connections.set_match(&conn_id, match_id);
            self.connections
                .send_to(&conn_id, ServerMsg::StartGame { self_id: conn_id });
        }

        info!(match_id = %match_id, seed, "Created new match");

        let service = Arc::clone(self);
        tokio::spawn(async move {
            game_match.run().await;

            // Cleanup after match ends
            if service.release_match(match_id).is_some() {
                info!(match_id = %match_id, "Match removed from registry");
            }
        });

        match_id
    }
}
