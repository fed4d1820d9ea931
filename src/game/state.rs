
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::moves::MoveLog;
use crate::{Board, GameId, Language, NormalizationMode, PlayerId, Position, Square};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// fewer than two players
    Waiting,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error("the base word is empty")]
    EmptyBaseWord,
    #[error("the base word has {len} letters, the board is {size} wide")]
    BaseWordLength { len: usize, size: usize },
    #[error("{letter:?} in the base word is not in the game alphabet")]
    BaseWordLetter { letter: char },
    #[error("player {0:?} is listed twice")]
    DuplicatePlayer(PlayerId),
    #[error("AI player {0:?} is not a player of the game")]
    UnknownAiPlayer(PlayerId),
    #[error("players cannot join once the first move is played")]
    AlreadyStarted,
    #[error("the game is finished")]
    Finished,
}

#[derive(Debug, Clone, Default)]
pub struct GameOptions {
    pub size: usize,
    pub base_word: String,
    pub players: Vec<PlayerId>,
    pub ai_players: BTreeSet<PlayerId>,
    pub language: Language,
}

impl GameOptions {
    pub fn new<P: Into<PlayerId>>(size: usize, base_word: &str, players: Vec<P>) -> Self {
        Self {
            size,
            base_word: base_word.to_owned(),
            players: players.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_ai(mut self, player: &str) -> Self {
        self.ai_players.insert(player.to_owned());
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

/// A game, as handed to and from the store.
///
/// `moves` is the authoritative history; `scores` and `used_words` are kept
/// alongside for cheap reads and can be checked with [`GameState::verify`].
/// Only [`apply_move`](super::apply_move) adds moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    pub size: usize,
    pub board: Board,
    /// normalized
    pub base_word: String,
    pub language: Language,
    pub players: Vec<PlayerId>,
    pub ai_players: BTreeSet<PlayerId>,
    pub current_player_index: usize,
    pub moves: MoveLog,
    pub scores: BTreeMap<PlayerId, u32>,
    pub used_words: BTreeSet<String>,
    pub status: GameStatus,
    /// bumped by the store on each write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored field that does not match what the move log says
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Inconsistency {
    #[error("{player} has {stored} points, the moves give {derived}")]
    Score { player: PlayerId, stored: u32, derived: u32 },
    #[error("score recorded for {0}, who is not a player")]
    UnknownScore(PlayerId),
    #[error("{0} was played more than once")]
    DuplicateWord(String),
    #[error("used words are {stored:?}, the moves give {derived:?}")]
    UsedWords { stored: BTreeSet<String>, derived: BTreeSet<String> },
    #[error("current player index is {stored}, expected {derived}")]
    Turn { stored: usize, derived: usize },
    #[error("the board does not hold the letter of move {0}")]
    Board(usize),
    #[error("the board has {stored} letters, expected {derived}")]
    LetterCount { stored: usize, derived: usize },
}

/// Creates a game with `base_word` laid out in the middle row.
///
/// The game waits for players while there are fewer than two.
pub fn create_game(
    id: &str,
    options: GameOptions,
    mode: NormalizationMode,
) -> Result<GameState, SetupError> {
    let GameOptions {
        size,
        base_word,
        players,
        ai_players,
        language,
    } = options;

    let base_word = mode.normalize(&base_word);
    let len = base_word.chars().count();
    if len == 0 {
        return Err(SetupError::EmptyBaseWord);
    }
    if len != size {
        return Err(SetupError::BaseWordLength { len, size });
    }
    if let Some(letter) = base_word.chars().find(|&c| !language.contains(crate::Letter(c))) {
        return Err(SetupError::BaseWordLetter { letter });
    }

    let mut seen = BTreeSet::new();
    for p in &players {
        if !seen.insert(p) {
            return Err(SetupError::DuplicatePlayer(p.clone()));
        }
    }
    if let Some(ai) = ai_players.iter().find(|ai| !seen.contains(ai)) {
        return Err(SetupError::UnknownAiPlayer(ai.clone()));
    }

    let mut board = Board::empty(size);
    let middle = size / 2;
    for (col, c) in base_word.chars().enumerate() {
        board.set(Position::new(middle, col), Square::Filled(crate::Letter(c)));
    }

    let now = Utc::now();
    let game = GameState {
        id: id.to_owned(),
        size,
        board,
        used_words: std::iter::once(base_word.clone()).collect(),
        base_word,
        language,
        scores: players.iter().map(|p| (p.clone(), 0)).collect(),
        status: if players.len() < 2 {
            GameStatus::Waiting
        } else {
            GameStatus::InProgress
        },
        players,
        ai_players,
        current_player_index: 0,
        moves: MoveLog::new(),
        version: 1,
        created_at: now,
        updated_at: now,
    };
    log::debug!("game {} created with {:?}", game.id, game.base_word);
    Ok(game)
}

impl GameState {
    pub fn current_player(&self) -> Option<&PlayerId> {
        self.players.get(self.current_player_index)
    }

    pub fn is_ai_turn(&self) -> bool {
        self.current_player()
            .map_or(false, |p| self.ai_players.contains(p))
    }

    pub fn fill_ratio(&self) -> f64 {
        self.board.fill_ratio()
    }

    pub fn empty_cells(&self) -> usize {
        self.board.empty_cells().count()
    }

    /// Adds a player at the end of the turn order.
    ///
    /// Only possible before the first move; the game starts with the second
    /// player. Joining twice is a no-op.
    pub fn join(&mut self, player: &str) -> Result<(), SetupError> {
        if self.status == GameStatus::Finished {
            return Err(SetupError::Finished);
        }
        if self.players.iter().any(|p| p == player) {
            return Ok(());
        }
        if !self.moves.is_empty() {
            return Err(SetupError::AlreadyStarted);
        }
        self.players.push(player.to_owned());
        self.scores.insert(player.to_owned(), 0);
        if self.players.len() >= 2 {
            self.status = GameStatus::InProgress;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn finish(&mut self) {
        if self.status != GameStatus::Finished {
            log::debug!("game {} finished at {:.0}% filled", self.id, self.fill_ratio() * 100.);
            self.status = GameStatus::Finished;
            self.updated_at = Utc::now();
        }
    }

    /// Recomputes everything derived from the move log and compares it with
    /// the stored fields.
    pub fn verify(&self) -> Result<(), Inconsistency> {
        let derived = self.moves.scores(&self.players);
        for (player, &derived) in &derived {
            let stored = self.scores.get(player).copied().unwrap_or(0);
            if stored != derived {
                return Err(Inconsistency::Score {
                    player: player.clone(),
                    stored,
                    derived,
                });
            }
        }
        if let Some(extra) = self.scores.keys().find(|p| !derived.contains_key(*p)) {
            return Err(Inconsistency::UnknownScore(extra.clone()));
        }

        let counts = self.moves.word_counts();
        if let Some((word, _)) = counts.iter().find(|&(_, &n)| n > 1) {
            return Err(Inconsistency::DuplicateWord((*word).to_owned()));
        }
        if counts.contains_key(self.base_word.as_str()) {
            return Err(Inconsistency::DuplicateWord(self.base_word.clone()));
        }
        let words = counts
            .keys()
            .map(|w| (*w).to_owned())
            .chain(std::iter::once(self.base_word.clone()))
            .collect::<BTreeSet<_>>();
        if words != self.used_words {
            return Err(Inconsistency::UsedWords {
                stored: self.used_words.clone(),
                derived: words,
            });
        }

        if !self.players.is_empty() {
            let derived = self.moves.len() % self.players.len();
            if derived != self.current_player_index {
                return Err(Inconsistency::Turn {
                    stored: self.current_player_index,
                    derived,
                });
            }
        }

        for (i, (_, m)) in self.moves.iter().enumerate() {
            if self.board.letter_at(m.position) != Some(m.letter) {
                return Err(Inconsistency::Board(i + 1));
            }
        }
        let expected = self.base_word.chars().count() + self.moves.len();
        let stored = self.board.filled_count();
        if stored != expected {
            return Err(Inconsistency::LetterCount {
                stored,
                derived: expected,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
use super::fixtures;

#[test]
fn test_create_game() {
    let game = fixtures::new_game();
    assert_eq!(game.size, 5);
    assert_eq!(game.base_word, "БАЛДА");
    assert_eq!(game.board.to_string(), ".....\n.....\nБАЛДА\n.....\n.....\n");
    assert_eq!(game.used_words, std::iter::once("БАЛДА".to_owned()).collect::<BTreeSet<_>>());
    assert_eq!(game.scores.values().copied().collect::<Vec<_>>(), vec![0, 0]);
    assert_eq!(game.status, GameStatus::InProgress);
    assert_eq!(game.version, 1);
    assert_eq!(game.current_player().map(String::as_str), Some("anna"));
    assert_eq!(game.empty_cells(), 20);
    assert!((game.fill_ratio() - 0.2).abs() < 1e-9);
    game.verify().unwrap();
}

#[test]
fn test_create_game_errors() {
    let mode = NormalizationMode::Exact;
    assert_eq!(
        create_game("g", GameOptions::new(4, "БАЛДА", vec!["a", "b"]), mode),
        Err(SetupError::BaseWordLength { len: 5, size: 4 }),
    );
    assert_eq!(
        create_game("g", GameOptions::new(0, "  ", vec!["a", "b"]), mode),
        Err(SetupError::EmptyBaseWord),
    );
    assert_eq!(
        create_game("g", GameOptions::new(3, "КОТ", vec!["a", "a"]), mode),
        Err(SetupError::DuplicatePlayer("a".to_owned())),
    );
    assert_eq!(
        create_game("g", GameOptions::new(3, "КОТ", vec!["a", "b"]).with_ai("c"), mode),
        Err(SetupError::UnknownAiPlayer("c".to_owned())),
    );
    assert_eq!(
        create_game("g", GameOptions::new(3, "CAT", vec!["a", "b"]), mode),
        Err(SetupError::BaseWordLetter { letter: 'C' }),
    );
    let english = GameOptions::new(3, "cat", vec!["a", "b"]).with_language(Language::English);
    assert!(create_game("g", english, mode).is_ok());
}

#[test]
fn test_base_word_normalization() {
    let game = create_game(
        "g",
        GameOptions::new(4, "ёлка", vec!["a", "b"]),
        NormalizationMode::FoldYo,
    )
    .unwrap();
    assert_eq!(game.base_word, "ЕЛКА");
    // even boards put the word just below the middle line
    assert_eq!(game.board.letter_at(Position::new(2, 0)), Some(crate::Letter('Е')));
}

#[test]
fn test_lifecycle() {
    let mut game = create_game(
        "g",
        GameOptions::new(3, "КОТ", vec!["anna"]),
        NormalizationMode::Exact,
    )
    .unwrap();
    assert_eq!(game.status, GameStatus::Waiting);

    game.join("anna").unwrap();
    assert_eq!(game.players.len(), 1);
    assert_eq!(game.status, GameStatus::Waiting);

    game.join("boris").unwrap();
    assert_eq!(game.status, GameStatus::InProgress);
    assert_eq!(game.scores["boris"], 0);
    game.verify().unwrap();

    game.finish();
    assert_eq!(game.status, GameStatus::Finished);
    assert_eq!(game.join("carl"), Err(SetupError::Finished));
}

#[test]
fn test_verify_spots_tampering() {
    let game = fixtures::new_game();

    let mut bad = game.clone();
    bad.scores.insert("anna".to_owned(), 7);
    assert!(matches!(bad.verify(), Err(Inconsistency::Score { stored: 7, derived: 0, .. })));

    let mut bad = game.clone();
    bad.used_words.insert("ДА".to_owned());
    assert!(matches!(bad.verify(), Err(Inconsistency::UsedWords { .. })));

    let mut bad = game.clone();
    bad.current_player_index = 1;
    assert!(matches!(bad.verify(), Err(Inconsistency::Turn { stored: 1, derived: 0 })));

    let mut bad = game;
    bad.board.set(Position::new(0, 0), Square::Filled(crate::Letter('Я')));
    assert!(matches!(bad.verify(), Err(Inconsistency::LetterCount { .. })));
}

#[test]
fn test_snapshot_serialization() {
    let game = fixtures::new_game();
    let json = serde_json::to_string(&game).unwrap();
    let back: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, game);
}
