
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{BackendError, StoreError};

/// How transient backend failures are retried: exponential backoff with
/// jitter, capped by `max_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// including the first try
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 10,
            max_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Wait before try number `attempt + 1`.
    ///
    /// Half of the exponential step is always waited, the other half is
    /// random, so that writers in conflict spread out.
    pub fn delay(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let step = self
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        let half = step / 2;
        Duration::from_millis(half + rng.gen_range(0..=step - half))
    }

    /// Runs `op` until it succeeds, fails for good, or attempts run out.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, BackendError>,
    ) -> Result<T, StoreError> {
        let mut rng = rand::thread_rng();
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay(attempt, &mut rng);
                    log::warn!(
                        "{} failed ({}), attempt {}/{}, retrying in {:?}",
                        what,
                        e,
                        attempt,
                        max_attempts,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("{} failed after {} attempt(s): {}", what, attempt, e);
                    return Err(StoreError::Database {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
use rand::{rngs::StdRng, SeedableRng};

#[test]
fn test_delays_grow_and_are_capped() {
    let policy = RetryPolicy {
        max_attempts: 10,
        base_delay_ms: 10,
        max_delay_ms: 100,
    };
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let first = policy.delay(1, &mut rng);
        assert!(first >= Duration::from_millis(5) && first <= Duration::from_millis(10));
        let third = policy.delay(3, &mut rng);
        assert!(third >= Duration::from_millis(20) && third <= Duration::from_millis(40));
        let late = policy.delay(30, &mut rng);
        assert!(late >= Duration::from_millis(50) && late <= Duration::from_millis(100));
    }
}

#[test]
fn test_zero_delays() {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 0,
        max_delay_ms: 0,
    };
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(policy.delay(2, &mut rng), Duration::from_millis(0));
}

#[test]
fn test_run() {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 2,
    };

    let mut calls = 0;
    let res = policy.run("op", || {
        calls += 1;
        if calls < 3 {
            Err(BackendError::Deadlock)
        } else {
            Ok(calls)
        }
    });
    assert_eq!(res.unwrap(), 3);

    let mut calls = 0;
    let res: Result<(), _> = policy.run("op", || {
        calls += 1;
        Err(BackendError::SerializationFailure)
    });
    assert!(matches!(res, Err(StoreError::Database { attempts: 3, .. })));
    assert_eq!(calls, 3);

    let mut calls = 0;
    let res: Result<(), _> = policy.run("op", || {
        calls += 1;
        Err(BackendError::Other("disk full".to_owned()))
    });
    assert!(matches!(res, Err(StoreError::Database { attempts: 1, .. })));
    assert_eq!(calls, 1);
}
