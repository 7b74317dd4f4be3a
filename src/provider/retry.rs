//! Retry, backoff, timeout, and cancellation for provider calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Granularity of cancellation checks while backing off.
const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Capped exponential backoff with a fixed attempt ceiling.
///
/// The delay before retry `n` (counting from 1) is `base_delay * 2^(n-1)`,
/// never more than `max_delay`. Only transient errors are retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(rename = "base_delay_ms", with = "millis")]
    pub base_delay: Duration,

    /// Upper bound on any single delay
    #[serde(rename = "max_delay_ms", with = "millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Reject policies that would never make an attempt.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry max_attempts must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, name: &str, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        self.validate()?;

        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_transient() {
                return Err(err);
            }
            if attempt >= self.max_attempts {
                log::warn!("{}: giving up after {} attempts: {}", name, attempt, err);
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.delay_for(attempt);
            log::warn!(
                "{}: attempt {}/{} failed ({}), retrying in {:?}",
                name,
                attempt,
                self.max_attempts,
                err,
                delay
            );
            cancel.sleep(delay)?;
            attempt += 1;
        }
    }
}

/// Cooperative cancellation shared between the caller and workers.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, returning early with [`Error::Cancelled`].
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Bounds how many provider calls are in flight at once.
///
/// A call holds a permit from before it starts until it returns. A call that
/// timed out keeps its permit while it runs on in the background, so a hung
/// provider cannot be piled up by retries.
#[derive(Debug, Clone)]
pub struct CallGate {
    release: Sender<()>,
    acquire: Receiver<()>,
    limit: usize,
}

/// Returns its permit to the gate when dropped.
struct Permit(Sender<()>);

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.0.try_send(());
    }
}

impl CallGate {
    /// Allow at most `limit` concurrent calls (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        let (release, acquire) = crossbeam_channel::bounded(limit);
        for _ in 0..limit {
            let _ = release.try_send(());
        }
        Self {
            release,
            acquire,
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `f` under a permit, waiting at most `timeout` in total.
    ///
    /// Waiting for a permit counts against the timeout. Without a timeout `f`
    /// runs on the calling thread; otherwise it runs on a helper thread and a
    /// timed-out result is discarded.
    pub fn call<T, F>(&self, provider: &'static str, timeout: Option<Duration>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let Some(timeout) = timeout else {
            self.acquire
                .recv()
                .map_err(|_| Error::Other("call gate closed".to_string()))?;
            let _permit = Permit(self.release.clone());
            return f();
        };

        let deadline = Instant::now() + timeout;
        if self.acquire.recv_deadline(deadline).is_err() {
            log::debug!("{}: no call permit within {:?}", provider, timeout);
            return Err(Error::Timeout { provider, timeout });
        }
        let permit = Permit(self.release.clone());

        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::Builder::new()
            .name(format!("{}-call", provider))
            .spawn(move || {
                let result = f();
                drop(permit);
                // The receiver is gone after a timeout.
                let _ = tx.send(result);
            })?;

        match rx.recv_deadline(deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout { provider, timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::permanent(
                provider,
                "provider call panicked",
            )),
        }
    }
}

impl Default for CallGate {
    fn default() -> Self {
        Self::new(rayon::current_num_threads())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
