
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::moves::Move;
use super::state::{GameState, GameStatus};
use crate::solver::find_path_through;
use crate::{score, Dictionary, Letter, NormalizationMode, PlayerId, Position, Square};

/// What a player submits for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub player_id: PlayerId,
    pub position: Position,
    /// a single letter, any case
    pub letter: String,
    pub word: String,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rules {
    pub min_word_length: usize,
    pub normalization: NormalizationMode,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            min_word_length: 2,
            normalization: NormalizationMode::Exact,
        }
    }
}

/// A rejected move. The `Display` text is meant for players.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidMove {
    #[error("game is not in progress")]
    NotInProgress(GameStatus),
    #[error("not your turn")]
    NotYourTurn { player: PlayerId, expected: Option<PlayerId> },
    #[error("cell {0} is outside the board")]
    OutsideBoard(Position),
    #[error("cell occupied")]
    CellOccupied(Position),
    #[error("{0:?} is not a single letter of the game alphabet")]
    InvalidLetter(String),
    #[error("word too short, at least {min} letters are needed")]
    WordTooShort { len: usize, min: usize },
    #[error("the word does not contain the placed letter {letter}")]
    LetterNotInWord { letter: Letter, word: String },
    #[error("word not traceable from placed letter")]
    NotTraceable { word: String },
    #[error("word not in dictionary")]
    NotInDictionary { word: String },
    #[error("word already used")]
    AlreadyUsed { word: String },
}

impl InvalidMove {
    /// A stable code for each kind of rejection
    pub fn reason(&self) -> &'static str {
        use InvalidMove::*;
        match self {
            NotInProgress(_) => "game_not_in_progress",
            NotYourTurn { .. } => "not_your_turn",
            OutsideBoard(_) => "outside_board",
            CellOccupied(_) => "cell_occupied",
            InvalidLetter(_) => "invalid_letter",
            WordTooShort { .. } => "word_too_short",
            LetterNotInWord { .. } => "letter_not_in_word",
            NotTraceable { .. } => "word_not_traceable",
            NotInDictionary { .. } => "word_not_in_dictionary",
            AlreadyUsed { .. } => "word_already_used",
        }
    }
}

/// Checks `request` against `game` and returns the game after the move.
///
/// Checks run in a fixed order and the first failure is returned: game
/// status, turn, cell, letter, word shape, path, dictionary, uniqueness.
/// `game` is never modified; the version is left for the store to bump.
pub fn apply_move(
    game: &GameState,
    request: &MoveRequest,
    dictionary: &(impl Dictionary + ?Sized),
    rules: &Rules,
) -> Result<GameState, InvalidMove> {
    if game.status != GameStatus::InProgress {
        return Err(InvalidMove::NotInProgress(game.status));
    }

    let expected = game.current_player();
    if expected != Some(&request.player_id) {
        return Err(InvalidMove::NotYourTurn {
            player: request.player_id.clone(),
            expected: expected.cloned(),
        });
    }

    let position = request.position;
    if !game.board.contains(position) {
        return Err(InvalidMove::OutsideBoard(position));
    }
    if !game.board.is_empty_at(position) {
        return Err(InvalidMove::CellOccupied(position));
    }

    let letter = single_letter(&request.letter, rules.normalization)
        .filter(|&l| game.language.contains(l))
        .ok_or_else(|| InvalidMove::InvalidLetter(request.letter.clone()))?;

    let word = rules.normalization.normalize(&request.word);
    let len = word.chars().count();
    if len < rules.min_word_length {
        return Err(InvalidMove::WordTooShort {
            len,
            min: rules.min_word_length,
        });
    }
    if !word.contains(letter.0) {
        return Err(InvalidMove::LetterNotInWord { letter, word });
    }

    if find_path_through(&game.board, position, letter, &word).is_none() {
        return Err(InvalidMove::NotTraceable { word });
    }
    if !dictionary.has(&word) {
        return Err(InvalidMove::NotInDictionary { word });
    }
    if game.used_words.contains(&word) {
        return Err(InvalidMove::AlreadyUsed { word });
    }

    let points = score(&word);
    let now = Utc::now();
    let mut next = game.clone();
    next.board.set(position, Square::Filled(letter));
    *next.scores.entry(request.player_id.clone()).or_insert(0) += points;
    next.used_words.insert(word.clone());
    let number = next.moves.push(Move {
        player_id: request.player_id.clone(),
        position,
        letter,
        word,
        applied_at: now,
    });
    next.current_player_index = (game.current_player_index + 1) % game.players.len();
    next.updated_at = now;

    log::debug!(
        "game {}: move {:?} by {} for {} points",
        game.id,
        number,
        request.player_id,
        points
    );
    Ok(next)
}

fn single_letter(text: &str, mode: NormalizationMode) -> Option<Letter> {
    let mut chars = text.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Some(mode.normalize_letter(c)),
        _ => None,
    }
}

#[cfg(test)]
use super::fixtures::{dictionary, new_game, request, scripted_moves};

#[cfg(test)]
fn play(game: &GameState, req: &MoveRequest) -> Result<GameState, InvalidMove> {
    apply_move(game, req, &dictionary(), &Rules::default())
}

#[test]
fn test_word_not_in_dictionary() {
    let game = new_game();
    // Р above Л makes БАЛР, traceable but unknown
    let err = play(&game, &request("anna", 1, 2, "Р", "БАЛР")).unwrap_err();
    assert_eq!(err.to_string(), "word not in dictionary");
    assert_eq!(err.reason(), "word_not_in_dictionary");
    assert_eq!(game, new_game_like(&game));
    assert!(game.board.is_empty_at(Position::new(1, 2)));
}

// the same game, regardless of timestamps
#[cfg(test)]
fn new_game_like(game: &GameState) -> GameState {
    let mut fresh = new_game();
    fresh.created_at = game.created_at;
    fresh.updated_at = game.updated_at;
    fresh
}

#[test]
fn test_accepted_move() {
    let game = new_game();
    let next = play(&game, &request("anna", 1, 4, "р", " дар ")).unwrap();

    assert_eq!(next.board.letter_at(Position::new(1, 4)), Some(Letter('Р')));
    assert_eq!(next.scores["anna"], score("ДАР"));
    assert_eq!(next.scores["boris"], 0);
    assert!(next.used_words.contains("ДАР"));
    assert_eq!(next.current_player().map(String::as_str), Some("boris"));
    assert_eq!(next.moves.len(), 1);
    // the store bumps the version, not the validator
    assert_eq!(next.version, game.version);
    next.verify().unwrap();

    // the input game is untouched
    assert!(game.moves.is_empty());
    assert!(game.board.is_empty_at(Position::new(1, 4)));
}

#[test]
fn test_rejections_in_order() {
    let game = new_game();
    let check = |req: MoveRequest, reason: &str| {
        let err = play(&game, &req).unwrap_err();
        assert_eq!(err.reason(), reason, "{:?}", req);
    };

    // wrong player and occupied cell: the turn is checked first
    check(request("boris", 2, 0, "Р", "ДАР"), "not_your_turn");
    check(request("carl", 1, 4, "Р", "ДАР"), "not_your_turn");
    check(request("anna", 2, 0, "Р", "ДАР"), "cell_occupied");
    check(request("anna", 5, 0, "Р", "ДАР"), "outside_board");
    check(request("anna", 1, 4, "РЫ", "ДАР"), "invalid_letter");
    check(request("anna", 1, 4, "", "ДАР"), "invalid_letter");
    check(request("anna", 1, 4, "R", "ДАР"), "invalid_letter");
    check(request("anna", 1, 4, "7", "ДАР"), "invalid_letter");
    check(request("anna", 1, 4, "Р", "Р"), "word_too_short");
    check(request("anna", 1, 4, "Р", "ДАМ"), "letter_not_in_word");
    // Р is placed away from ДА
    check(request("anna", 0, 0, "Р", "ДАР"), "word_not_traceable");
    // БАЛДА is all on the board, the placed letter is not on its path
    check(request("anna", 1, 0, "Б", "БАЛДА"), "word_not_traceable");
    check(request("anna", 1, 2, "Р", "БАЛР"), "word_not_in_dictionary");
}

#[test]
fn test_word_already_used() {
    let game = new_game();
    let next = play(&game, &request("anna", 1, 4, "Р", "ДАР")).unwrap();
    let err = play(&next, &request("boris", 3, 4, "Р", "ДАР")).unwrap_err();
    assert_eq!(err, InvalidMove::AlreadyUsed { word: "ДАР".to_owned() });
    assert_eq!(err.to_string(), "word already used");
}

#[test]
fn test_game_must_be_in_progress() {
    let mut game = new_game();
    game.finish();
    let err = play(&game, &request("anna", 1, 4, "Р", "ДАР")).unwrap_err();
    assert_eq!(err.reason(), "game_not_in_progress");
}

#[test]
fn test_move_sequence_properties() {
    let mut game = new_game();
    for (n, req) in scripted_moves().iter().enumerate() {
        let next = play(&game, req).unwrap();

        // exactly one square changed
        let changed = game
            .board
            .positions()
            .filter(|&p| game.board.get(p) != next.board.get(p))
            .collect::<Vec<_>>();
        assert_eq!(changed, vec![req.position]);

        let last = next.moves.last().unwrap();
        assert!(last.word.contains(last.letter.0));
        assert!(find_path_through(&game.board, last.position, last.letter, &last.word)
            .unwrap()
            .contains(&req.position));

        assert_eq!(next.current_player_index, (n + 1) % next.players.len());
        next.verify().unwrap();
        game = next;
    }

    assert_eq!(game.scores["anna"], score("ДАР") + score("ЛАК"));
    assert_eq!(game.scores["boris"], score("БАЛЫ") + score("ДАМ"));
    assert_eq!(game.used_words.len(), 5);
}

#[test]
fn test_normalization_rules() {
    let game = new_game();
    let dict = crate::Trie::from_words(vec!["ДАЕ"]);
    let fold = Rules {
        normalization: NormalizationMode::FoldYo,
        ..Rules::default()
    };
    // Ё is read as Е on both the letter and the word
    let next = apply_move(&game, &request("anna", 1, 4, "ё", "даё"), &dict, &fold).unwrap();
    assert_eq!(next.board.letter_at(Position::new(1, 4)), Some(Letter('Е')));
    assert!(next.used_words.contains("ДАЕ"));

    let exact = apply_move(&game, &request("anna", 1, 4, "ё", "даё"), &dict, &Rules::default());
    assert_eq!(exact.unwrap_err().reason(), "word_not_in_dictionary");

    let strict = Rules {
        min_word_length: 4,
        ..Rules::default()
    };
    let err = apply_move(&game, &request("anna", 1, 4, "Р", "ДАР"), &dict, &strict).unwrap_err();
    assert_eq!(err, InvalidMove::WordTooShort { len: 3, min: 4 });
}

#[test]
fn test_any_word_with_allow_all() {
    let game = new_game();
    let next = apply_move(
        &game,
        &request("anna", 1, 2, "Р", "БАЛР"),
        &crate::AllowAllDictionary,
        &Rules::default(),
    )
    .unwrap();
    assert!(next.used_words.contains("БАЛР"));
}
