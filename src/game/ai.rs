
use std::time::Instant;

use super::state::{GameState, GameStatus};
use super::validate::MoveRequest;
use crate::solver::{suggest_words, SuggestOptions};
use crate::{Dictionary, EngineConfig};

/// The move an AI player would submit, `None` if it is not an AI's turn or
/// nothing can be played.
///
/// This is the best ranked suggestion for the board. Only letters of the
/// game alphabet are tried, so the request passes validation as long as
/// `dictionary` is the one the game is checked against.
pub fn next_ai_move(
    game: &GameState,
    dictionary: &(impl Dictionary + ?Sized),
    config: &EngineConfig,
) -> Option<MoveRequest> {
    if game.status != GameStatus::InProgress || !game.is_ai_turn() {
        return None;
    }
    let player = game.current_player()?;

    let start = Instant::now();
    let options = SuggestOptions::from_config(config, &game.used_words, &game.base_word)
        .language(game.language)
        .limit(1);
    let best = suggest_words(&game.board, dictionary, &options).into_iter().next()?;

    log::info!(
        "{} plays {} at {} for {:?} ({} points) after {:?}",
        player,
        best.letter,
        best.position,
        best.word,
        best.score,
        Instant::now() - start
    );
    Some(MoveRequest {
        player_id: player.clone(),
        position: best.position,
        letter: best.letter.to_string(),
        word: best.word,
    })
}

#[cfg(test)]
use super::{apply_move, create_game, fixtures, GameOptions};

#[test]
fn test_ai_plays_the_best_move() {
    let game = create_game(
        "g",
        GameOptions::new(5, "БАЛДА", vec!["anna", "bot"]).with_ai("bot"),
        crate::NormalizationMode::Exact,
    )
    .unwrap();
    let dict = fixtures::dictionary();
    let config = EngineConfig::default();

    // not its turn yet
    assert!(!game.is_ai_turn());
    assert_eq!(next_ai_move(&game, &dict, &config), None);

    let game = apply_move(&game, &fixtures::request("anna", 1, 4, "Р", "ДАР"), &dict, &config.rules()).unwrap();
    assert!(game.is_ai_turn());
    let request = next_ai_move(&game, &dict, &config).unwrap();
    assert_eq!(request.player_id, "bot");
    // БАЛЫ is worth the most of what is left
    assert_eq!(request.word, "БАЛЫ");
    assert_eq!(request.position, crate::Position::new(1, 2));

    let after = apply_move(&game, &request, &dict, &config.rules()).unwrap();
    after.verify().unwrap();
    assert_eq!(after.scores["bot"], crate::score("БАЛЫ"));
}

#[test]
fn test_ai_without_moves() {
    let mut game = create_game(
        "g",
        GameOptions::new(5, "БАЛДА", vec!["bot", "anna"]).with_ai("bot"),
        crate::NormalizationMode::Exact,
    )
    .unwrap();
    let config = EngineConfig::default();
    let empty = crate::Trie::from_words(vec!["БАЛДА"]);
    assert_eq!(next_ai_move(&game, &empty, &config), None);

    game.finish();
    assert_eq!(next_ai_move(&game, &fixtures::dictionary(), &config), None);
}

#[test]
fn test_ai_ignores_letters_of_other_alphabets() {
    let game = create_game(
        "g",
        GameOptions::new(5, "БАЛДА", vec!["bot", "anna"]).with_ai("bot"),
        crate::NormalizationMode::Exact,
    )
    .unwrap();
    // plenty of Latin words outscore ДАР
    let dict = crate::Trie::from_words(
        vec!["БАЛДА".to_owned(), "ДАР".to_owned()]
            .into_iter()
            .chain(('A'..='Z').flat_map(|c| vec![format!("А{}", c), format!("Б{}", c)])),
    );
    let config = EngineConfig {
        suggestion_max_limit: 5,
        ..EngineConfig::default()
    };

    let request = next_ai_move(&game, &dict, &config).unwrap();
    assert_eq!(request.word, "ДАР");
    assert_eq!(request.letter, "Р");
    assert_eq!(request.position, crate::Position::new(1, 4));
    apply_move(&game, &request, &dict, &config.rules()).unwrap();
}
