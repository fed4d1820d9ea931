
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{score, Letter, PlayerId, Position};

/// Rank of a move in its game, starting at 1
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MoveNumber(pub u32);

/// An accepted move, never changed once in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub player_id: PlayerId,
    pub position: Position,
    pub letter: Letter,
    /// normalized
    pub word: String,
    pub applied_at: DateTime<Utc>,
}

/// The append-only history of a game.
///
/// Scores and used words are derived from it; the helpers here recompute them
/// from scratch so stored values can be checked.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveLog {
    moves: Vec<Move>,
}

impl MoveLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, a_move: Move) -> MoveNumber {
        self.moves.push(a_move);
        MoveNumber(self.moves.len() as u32)
    }

    pub fn get(&self, number: MoveNumber) -> Option<&Move> {
        let index = (number.0 as usize).checked_sub(1)?;
        self.moves.get(index)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn last(&self) -> Option<&Move> {
        self.moves.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MoveNumber, &Move)> {
        self.moves
            .iter()
            .enumerate()
            .map(|(i, m)| (MoveNumber(i as u32 + 1), m))
    }

    pub fn by_player<'a>(&'a self, player: &'a str) -> impl Iterator<Item = &'a Move> {
        self.moves.iter().filter(move |m| m.player_id == player)
    }

    /// Sum of the word scores of each player, listed players start at 0
    pub fn scores<'p>(&self, players: impl IntoIterator<Item = &'p PlayerId>) -> BTreeMap<PlayerId, u32> {
        let mut acc = players
            .into_iter()
            .map(|p| (p.clone(), 0))
            .collect::<BTreeMap<_, _>>();
        for m in &self.moves {
            *acc.entry(m.player_id.clone()).or_insert(0) += score(&m.word);
        }
        acc
    }

    /// The words of the moves, with the number of times each was played
    pub fn word_counts(&self) -> BTreeMap<&str, usize> {
        let mut acc = BTreeMap::new();
        for m in &self.moves {
            *acc.entry(m.word.as_str()).or_insert(0) += 1;
        }
        acc
    }

    pub fn words(&self) -> BTreeSet<&str> {
        self.moves.iter().map(|m| m.word.as_str()).collect()
    }
}

#[cfg(test)]
fn played(player: &str, word: &str) -> Move {
    Move {
        player_id: player.to_owned(),
        position: Position::new(0, 0),
        letter: Letter('А'),
        word: word.to_owned(),
        applied_at: Utc::now(),
    }
}

#[test]
fn test_numbers() {
    let mut log = MoveLog::new();
    assert_eq!(log.push(played("anna", "ДАР")), MoveNumber(1));
    assert_eq!(log.push(played("boris", "БАЛЫ")), MoveNumber(2));
    assert_eq!(log.get(MoveNumber(1)).unwrap().word, "ДАР");
    assert_eq!(log.get(MoveNumber(2)).unwrap().word, "БАЛЫ");
    assert!(log.get(MoveNumber(0)).is_none());
    assert!(log.get(MoveNumber(3)).is_none());
    assert_eq!(
        log.iter().map(|(n, _)| n).collect::<Vec<_>>(),
        vec![MoveNumber(1), MoveNumber(2)],
    );
}

#[test]
fn test_derived_indexes() {
    let mut log = MoveLog::new();
    log.push(played("anna", "ДАР"));
    log.push(played("boris", "БАЛЫ"));
    log.push(played("anna", "ЛАК"));

    assert_eq!(log.by_player("anna").count(), 2);
    assert_eq!(log.by_player("carl").count(), 0);

    let players = vec!["anna".to_owned(), "boris".to_owned(), "carl".to_owned()];
    let scores = log.scores(&players);
    assert_eq!(scores["anna"], score("ДАР") + score("ЛАК"));
    assert_eq!(scores["boris"], score("БАЛЫ"));
    assert_eq!(scores["carl"], 0);

    assert_eq!(log.words().len(), 3);
    assert!(log.word_counts().values().all(|&n| n == 1));
}

#[test]
fn test_serializes_as_a_list() {
    let mut log = MoveLog::new();
    log.push(played("anna", "ДАР"));
    let json = serde_json::to_value(&log).unwrap();
    assert!(json.is_array());
    let back: MoveLog = serde_json::from_value(json).unwrap();
    assert_eq!(back, log);
}
