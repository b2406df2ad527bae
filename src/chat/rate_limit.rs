//! Per-participant message burst limiting.
//!
//! Every message attempt bumps the participant's burst counter and schedules
//! one deferred decrement. Capacity therefore recovers one slot per decay
//! interval after each attempt, regardless of how the attempts were spaced.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::coordinator::RelayState;
use super::participant::{ConnectionId, Participant};

/// Configuration for burst limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum attempts allowed before decay catches up.
    pub threshold: u32,
    /// Delay before one attempt stops counting.
    pub decay: Duration,
}

impl RateLimitConfig {
    /// Create a new rate limit configuration.
    pub fn new(threshold: u32, decay_secs: u64) -> Self {
        Self {
            threshold,
            decay: Duration::from_secs(decay_secs),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(10, 60)
    }
}

/// Result of a burst check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Attempt is allowed.
    Allowed,
    /// Attempt is rejected.
    Limited {
        /// Burst count after recording the attempt.
        burst_count: u32,
    },
}

impl RateLimitResult {
    /// Check if the attempt is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed)
    }
}

/// Burst counter bookkeeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config }
    }

    /// Record a message attempt.
    ///
    /// The counter is incremented even when the attempt is rejected.
    pub fn record_attempt(&self, participant: &mut Participant) -> RateLimitResult {
        participant.message_burst_count = participant.message_burst_count.saturating_add(1);
        if participant.message_burst_count > self.config.threshold {
            RateLimitResult::Limited {
                burst_count: participant.message_burst_count,
            }
        } else {
            RateLimitResult::Allowed
        }
    }

    /// Release one attempt, floored at zero.
    pub fn decay(&self, participant: &mut Participant) {
        participant.message_burst_count = participant.message_burst_count.saturating_sub(1);
    }

    /// Schedule one deferred decay for a connection.
    ///
    /// When the delay elapses the participant is looked up again; if the
    /// connection is gone by then the task does nothing.
    pub(crate) fn schedule_decay(
        &self,
        state: &Arc<Mutex<RelayState>>,
        connection: ConnectionId,
    ) -> JoinHandle<()> {
        let limiter = *self;
        let state = Arc::clone(state);
        tokio::spawn(async move {
            tokio::time::sleep(limiter.config.decay).await;
            let mut state = state.lock().await;
            match state.registry.get_mut(connection) {
                Some(participant) => {
                    limiter.decay(participant);
                    tracing::trace!(
                        %connection,
                        burst_count = participant.message_burst_count,
                        "Burst counter decayed"
                    );
                }
                None => {
                    tracing::trace!(%connection, "Skipping decay for departed connection");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::participant::ParticipantRegistry;

    fn participant() -> Participant {
        let mut registry = ParticipantRegistry::new();
        registry.add(ConnectionId::new()).unwrap()
    }

    #[test]
    fn test_rate_limit_config() {
        let config = RateLimitConfig::new(5, 30);
        assert_eq!(config.threshold, 5);
        assert_eq!(config.decay, Duration::from_secs(30));

        let default = RateLimitConfig::default();
        assert_eq!(default.threshold, 10);
        assert_eq!(default.decay, Duration::from_secs(60));
    }

    #[test]
    fn test_allows_up_to_threshold() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, 60));
        let mut p = participant();

        assert!(limiter.record_attempt(&mut p).is_allowed());
        assert!(limiter.record_attempt(&mut p).is_allowed());
        assert!(limiter.record_attempt(&mut p).is_allowed());
        assert_eq!(
            limiter.record_attempt(&mut p),
            RateLimitResult::Limited { burst_count: 4 }
        );
    }

    #[test]
    fn test_rejected_attempts_still_count() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, 60));
        let mut p = participant();

        limiter.record_attempt(&mut p);
        limiter.record_attempt(&mut p);
        limiter.record_attempt(&mut p);
        assert_eq!(p.message_burst_count, 3);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let limiter = RateLimiter::default();
        let mut p = participant();

        limiter.decay(&mut p);
        assert_eq!(p.message_burst_count, 0);

        limiter.record_attempt(&mut p);
        limiter.decay(&mut p);
        limiter.decay(&mut p);
        assert_eq!(p.message_burst_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_decay_after_delay() {
        let limiter = RateLimiter::new(RateLimitConfig::new(10, 60));
        let state = Arc::new(Mutex::new(RelayState::new(10)));
        let conn = ConnectionId::new();
        {
            let mut guard = state.lock().await;
            guard.registry.add(conn).unwrap();
            let p = guard.registry.get_mut(conn).unwrap();
            limiter.record_attempt(p);
            limiter.record_attempt(p);
        }

        let handle = limiter.schedule_decay(&state, conn);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(
            state.lock().await.registry.get(conn).unwrap().message_burst_count,
            2
        );

        handle.await.unwrap();
        assert_eq!(
            state.lock().await.registry.get(conn).unwrap().message_burst_count,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_decay_skips_departed_connection() {
        let limiter = RateLimiter::default();
        let state = Arc::new(Mutex::new(RelayState::new(10)));
        let conn = ConnectionId::new();
        state.lock().await.registry.add(conn).unwrap();

        let handle = limiter.schedule_decay(&state, conn);
        state.lock().await.registry.remove(conn);

        handle.await.unwrap();
        let guard = state.lock().await;
        assert!(guard.registry.get(conn).is_none());
        assert_eq!(guard.registry.count(), 0);
    }
}
