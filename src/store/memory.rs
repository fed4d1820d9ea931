
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Backend, BackendError, CasOutcome};
use crate::{GameId, GameState};

#[derive(Debug)]
struct Row {
    version: u64,
    snapshot: Vec<u8>,
}

/// Games kept in memory as JSON snapshots, one row per game.
///
/// The version check and the write of a row happen under the row's shard
/// lock, so two writers can never both succeed from the same version.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: DashMap<GameId, Row>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn version_of(&self, id: &str) -> Option<u64> {
        self.rows.get(id).map(|row| row.version)
    }
}

impl Backend for MemoryBackend {
    fn load(&self, id: &str) -> Result<Option<GameState>, BackendError> {
        let row = match self.rows.get(id) {
            Some(row) => row,
            None => return Ok(None),
        };
        let mut game: GameState = serde_json::from_slice(&row.snapshot)?;
        game.version = row.version;
        Ok(Some(game))
    }

    fn insert(&self, game: &GameState) -> Result<bool, BackendError> {
        let snapshot = serde_json::to_vec(game)?;
        match self.rows.entry(game.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(Row {
                    version: game.version,
                    snapshot,
                });
                Ok(true)
            }
        }
    }

    fn compare_and_swap(&self, expected: u64, game: &GameState) -> Result<CasOutcome, BackendError> {
        let snapshot = serde_json::to_vec(game)?;
        let mut row = match self.rows.get_mut(&game.id) {
            Some(row) => row,
            None => return Ok(CasOutcome::Missing),
        };
        if row.version != expected {
            return Ok(CasOutcome::Conflict { actual: row.version });
        }
        row.version = game.version;
        row.snapshot = snapshot;
        Ok(CasOutcome::Committed)
    }
}

#[cfg(test)]
use crate::game::fixtures::new_game;

#[test]
fn test_rows() {
    let backend = MemoryBackend::new();
    let game = new_game();
    assert!(backend.load("g1").unwrap().is_none());
    assert!(backend.insert(&game).unwrap());
    assert!(!backend.insert(&game).unwrap());
    assert_eq!(backend.len(), 1);
    assert_eq!(backend.load("g1").unwrap(), Some(game.clone()));

    let mut next = game.clone();
    next.version = 2;
    assert_eq!(backend.compare_and_swap(1, &next).unwrap(), CasOutcome::Committed);
    assert_eq!(backend.version_of("g1"), Some(2));
    assert_eq!(
        backend.compare_and_swap(1, &next).unwrap(),
        CasOutcome::Conflict { actual: 2 },
    );

    let mut other = game;
    other.id = "elsewhere".to_owned();
    assert_eq!(backend.compare_and_swap(1, &other).unwrap(), CasOutcome::Missing);
}
