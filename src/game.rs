
pub mod ai;
pub mod moves;
pub mod state;
pub mod validate;

pub use ai::next_ai_move;
pub use moves::{Move, MoveLog, MoveNumber};
pub use state::{create_game, GameOptions, GameState, GameStatus, Inconsistency, SetupError};
pub use validate::{apply_move, InvalidMove, MoveRequest, Rules};

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::{NormalizationMode, Position, Trie};

    pub fn dictionary() -> Trie {
        Trie::from_words(vec!["БАЛДА", "БАЛ", "ДА", "ДАР", "БАЛЫ", "ЛАК", "ДАМ"])
    }

    /// БАЛДА in the middle row of a 5x5 board, anna then boris
    pub fn new_game() -> GameState {
        create_game(
            "g1",
            GameOptions::new(5, "балда", vec!["anna", "boris"]),
            NormalizationMode::Exact,
        )
        .unwrap()
    }

    pub fn request(player: &str, row: usize, col: usize, letter: &str, word: &str) -> MoveRequest {
        MoveRequest {
            player_id: player.to_owned(),
            position: Position::new(row, col),
            letter: letter.to_owned(),
            word: word.to_owned(),
        }
    }

    /// Four accepted moves: ДАР, БАЛЫ, ЛАК, ДАМ
    pub fn scripted_moves() -> Vec<MoveRequest> {
        vec![
            request("anna", 1, 4, "р", "дар"),
            request("boris", 3, 2, "Ы", "БАЛЫ"),
            request("anna", 1, 1, "К", "ЛАК"),
            request("boris", 3, 4, "М", "ДАМ"),
        ]
    }
}
