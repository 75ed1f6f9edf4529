//! Circuit breaker (spec §4.1 failure semantics): disable a capability
//! port for a cooldown window after consecutive failures. No direct
//! teacher precedent (the teacher's ports don't retry); implemented
//! against the general breaker shape implied by the retry policy.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    opened_at_millis: AtomicU64,
    epoch: Instant,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self { threshold, cooldown, consecutive_failures: AtomicU32::new(0), opened_at_millis: AtomicU64::new(0), epoch: Instant::now() }
    }

    /// True while the breaker is tripped and the cooldown has not elapsed.
    pub fn is_open(&self) -> bool {
        let opened_at = self.opened_at_millis.load(Ordering::SeqCst);
        if opened_at == 0 {
            return false;
        }
        let elapsed = self.epoch.elapsed().as_millis() as u64;
        if elapsed.saturating_sub(opened_at) >= self.cooldown.as_millis() as u64 {
            // Cooldown elapsed: half-open, allow a trial call through.
            self.opened_at_millis.store(0, Ordering::SeqCst);
            self.consecutive_failures.store(0, Ordering::SeqCst);
            return false;
        }
        true
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.opened_at_millis.store(0, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.threshold {
            self.opened_at_millis.store(self.epoch.elapsed().as_millis() as u64, Ordering::SeqCst);
        }
    }
}
