
//! Game persistence with optimistic locking.
//!
//! Every stored game carries a version. A write only lands if the stored
//! version is still the one the writer read; otherwise the writer gets
//! [`StoreError::OptimisticLock`] and must fetch, validate and try again.

pub mod memory;
pub mod retry;

use thiserror::Error;

use crate::{GameId, GameState};

pub use memory::MemoryBackend;
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("deadlock detected")]
    Deadlock,
    #[error("could not serialize access due to concurrent update")]
    SerializationFailure,
    #[error("connection lost: {0}")]
    Connection(String),
    #[error("bad snapshot: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Failures worth trying again as is
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Deadlock | BackendError::SerializationFailure | BackendError::Connection(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("game {id} not found")]
    NotFound { id: GameId },
    #[error("game {id} already exists")]
    AlreadyExists { id: GameId },
    #[error("game {resource_id} changed since version {expected_version}")]
    OptimisticLock { resource_id: GameId, expected_version: u64 },
    #[error("storage failed after {attempts} attempt(s)")]
    Database {
        attempts: u32,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    Committed,
    Conflict { actual: u64 },
    Missing,
}

/// Where snapshots live. Each call is one transaction.
pub trait Backend: Send + Sync {
    fn load(&self, id: &str) -> Result<Option<GameState>, BackendError>;

    /// Writes a new row, `false` if the id is taken
    fn insert(&self, game: &GameState) -> Result<bool, BackendError>;

    /// Replaces the row of `game.id` if its version is still `expected`
    fn compare_and_swap(&self, expected: u64, game: &GameState) -> Result<CasOutcome, BackendError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn load(&self, id: &str) -> Result<Option<GameState>, BackendError> {
        (**self).load(id)
    }
    fn insert(&self, game: &GameState) -> Result<bool, BackendError> {
        (**self).insert(game)
    }
    fn compare_and_swap(&self, expected: u64, game: &GameState) -> Result<CasOutcome, BackendError> {
        (**self).compare_and_swap(expected, game)
    }
}

pub struct GameStore<B> {
    backend: B,
    retry: RetryPolicy,
}

impl<B: Backend> GameStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_retry(backend, RetryPolicy::default())
    }

    pub fn with_retry(backend: B, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stores a new game at version 1, without reading first
    pub fn create(&self, game: &GameState) -> Result<GameState, StoreError> {
        let mut row = game.clone();
        row.version = 1;
        if self.retry.run("insert", || self.backend.insert(&row))? {
            log::debug!("game {} stored", row.id);
            Ok(row)
        } else {
            Err(StoreError::AlreadyExists { id: row.id })
        }
    }

    pub fn get(&self, id: &str) -> Result<GameState, StoreError> {
        self.retry
            .run("load", || self.backend.load(id))?
            .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })
    }

    /// Writes `game` over the stored row if nobody wrote since `game.version`.
    ///
    /// Returns the game as stored, at the next version.
    pub fn set(&self, game: &GameState) -> Result<GameState, StoreError> {
        let expected = game.version;
        let mut row = game.clone();
        row.version = expected + 1;

        match self
            .retry
            .run("update", || self.backend.compare_and_swap(expected, &row))?
        {
            CasOutcome::Committed => {
                log::debug!("game {} stored at version {}", row.id, row.version);
                Ok(row)
            }
            CasOutcome::Conflict { actual } => {
                log::warn!(
                    "game {} is at version {}, the update was made from {}",
                    row.id,
                    actual,
                    expected
                );
                Err(StoreError::OptimisticLock {
                    resource_id: row.id,
                    expected_version: expected,
                })
            }
            CasOutcome::Missing => Err(StoreError::NotFound { id: row.id }),
        }
    }
}

#[cfg(test)]
mod fixtures {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// A memory backend that first fails with the queued errors
    pub struct Flaky {
        pub inner: MemoryBackend,
        pub failures: Mutex<VecDeque<BackendError>>,
        pub calls: AtomicUsize,
    }

    impl Flaky {
        pub fn new(failures: Vec<BackendError>) -> Self {
            Self {
                inner: MemoryBackend::new(),
                failures: Mutex::new(failures.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn next_failure(&self) -> Result<(), BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().unwrap().pop_front() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    impl Backend for Flaky {
        fn load(&self, id: &str) -> Result<Option<GameState>, BackendError> {
            self.next_failure()?;
            self.inner.load(id)
        }
        fn insert(&self, game: &GameState) -> Result<bool, BackendError> {
            self.next_failure()?;
            self.inner.insert(game)
        }
        fn compare_and_swap(&self, expected: u64, game: &GameState) -> Result<CasOutcome, BackendError> {
            self.next_failure()?;
            self.inner.compare_and_swap(expected, game)
        }
    }

    pub fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }
}

#[cfg(test)]
use crate::game::fixtures::new_game;

#[test]
fn test_create_and_get() {
    let store = GameStore::new(MemoryBackend::new());
    let mut game = new_game();
    game.version = 9;
    let stored = store.create(&game).unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(store.get("g1").unwrap(), stored);

    assert!(matches!(store.create(&game), Err(StoreError::AlreadyExists { id }) if id == "g1"));
    assert!(matches!(store.get("nope"), Err(StoreError::NotFound { id }) if id == "nope"));
}

#[test]
fn test_stale_write_is_rejected() {
    let store = GameStore::new(MemoryBackend::new());
    let game = store.create(&new_game()).unwrap();
    let game = store.set(&game).unwrap();
    let game = store.set(&game).unwrap();
    assert_eq!(game.version, 3);

    // two writers both read version 3
    let first = store.get("g1").unwrap();
    let second = store.get("g1").unwrap();

    let stored = store.set(&first).unwrap();
    assert_eq!(stored.version, 4);

    match store.set(&second) {
        Err(StoreError::OptimisticLock {
            resource_id,
            expected_version,
        }) => {
            assert_eq!(resource_id, "g1");
            assert_eq!(expected_version, 3);
        }
        other => panic!("expected a lock error, got {:?}", other),
    }
    assert_eq!(store.get("g1").unwrap().version, 4);
}

#[test]
fn test_set_unknown_game() {
    let store = GameStore::new(MemoryBackend::new());
    assert!(matches!(store.set(&new_game()), Err(StoreError::NotFound { .. })));
}

#[test]
fn test_transient_failures_are_retried() {
    let flaky = fixtures::Flaky::new(vec![
        BackendError::Deadlock,
        BackendError::Connection("reset by peer".to_owned()),
    ]);
    let store = GameStore::with_retry(flaky, fixtures::fast_retry());
    let game = store.create(&new_game()).unwrap();
    assert_eq!(game.version, 1);
    assert_eq!(store.backend().calls.load(std::sync::atomic::Ordering::SeqCst), 3);

    store
        .backend()
        .failures
        .lock()
        .unwrap()
        .push_back(BackendError::SerializationFailure);
    assert_eq!(store.set(&game).unwrap().version, 2);
}

#[test]
fn test_retries_run_out() {
    let flaky = fixtures::Flaky::new((0..5).map(|_| BackendError::Deadlock).collect());
    let store = GameStore::with_retry(flaky, fixtures::fast_retry());
    match store.create(&new_game()) {
        Err(StoreError::Database { attempts, source }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(source, BackendError::Deadlock));
        }
        other => panic!("expected a database error, got {:?}", other),
    }
    assert!(store.backend().inner.is_empty());
}

#[test]
fn test_fatal_errors_are_not_retried() {
    let flaky = fixtures::Flaky::new(vec![BackendError::Other("constraint violated".to_owned())]);
    let store = GameStore::with_retry(flaky, fixtures::fast_retry());
    let err = store.create(&new_game()).unwrap_err();
    assert!(matches!(err, StoreError::Database { attempts: 1, .. }));
    assert_eq!(store.backend().calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    // the cause is kept
    assert_eq!(
        std::error::Error::source(&err).map(|e| e.to_string()),
        Some("constraint violated".to_owned()),
    );
}

#[test]
fn test_one_writer_wins_a_race() {
    let store = GameStore::new(MemoryBackend::new());
    let game = store.create(&new_game()).unwrap();

    let wins = std::thread::scope(|s| {
        let handles = (0..8)
            .map(|_| {
                let game = game.clone();
                let store = &store;
                s.spawn(move || store.set(&game).is_ok())
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count()
    });
    assert_eq!(wins, 1);
    assert_eq!(store.get("g1").unwrap().version, 2);
}

#[test]
fn test_no_lost_updates() {
    let store = GameStore::new(MemoryBackend::new());
    store.create(&new_game()).unwrap();

    std::thread::scope(|s| {
        for t in 0..4 {
            let store = &store;
            s.spawn(move || {
                let name = format!("writer{}", t);
                for _ in 0..10 {
                    loop {
                        let mut game = store.get("g1").unwrap();
                        *game.scores.entry(name.clone()).or_insert(0) += 1;
                        match store.set(&game) {
                            Ok(_) => break,
                            Err(StoreError::OptimisticLock { .. }) => continue,
                            Err(e) => panic!("{}", e),
                        }
                    }
                }
            });
        }
    });

    let game = store.get("g1").unwrap();
    assert_eq!(game.version, 41);
    for t in 0..4 {
        assert_eq!(game.scores[&format!("writer{}", t)], 10);
    }
}
