
use super::{normalize_word, Letter};

/// Points given to single letters
pub trait LetterScoring: Sync {
    fn score_for(&self, letter: Letter) -> u32;

    /// Sum of the letter points of the normalized word
    fn score_word(&self, word: &str) -> u32 {
        normalize_word(word)
            .chars()
            .map(|c| self.score_for(Letter(c)))
            .sum()
    }
}

/// The static table used for every game: "Эрудит" points for the Cyrillic
/// letters, scrabble points for the Latin ones, 1 for anything else
pub struct StandardScoring;
impl LetterScoring for StandardScoring {
    fn score_for(&self, letter: Letter) -> u32 {
        match letter.0 {
            'А' => 1,
            'Б' => 3,
            'В' => 1,
            'Г' => 3,
            'Д' => 2,
            'Е' => 1,
            'Ё' => 3,
            'Ж' => 5,
            'З' => 5,
            'И' => 1,
            'Й' => 4,
            'К' => 2,
            'Л' => 2,
            'М' => 2,
            'Н' => 1,
            'О' => 1,
            'П' => 2,
            'Р' => 1,
            'С' => 1,
            'Т' => 1,
            'У' => 2,
            'Ф' => 10,
            'Х' => 5,
            'Ц' => 5,
            'Ч' => 5,
            'Ш' => 8,
            'Щ' => 10,
            'Ъ' => 10,
            'Ы' => 4,
            'Ь' => 3,
            'Э' => 8,
            'Ю' => 8,
            'Я' => 3,

            'A' => 1,
            'B' => 3,
            'C' => 3,
            'D' => 2,
            'E' => 1,
            'F' => 4,
            'G' => 2,
            'H' => 4,
            'I' => 1,
            'J' => 8,
            'K' => 5,
            'L' => 1,
            'M' => 3,
            'N' => 1,
            'O' => 1,
            'P' => 3,
            'Q' => 10,
            'R' => 1,
            'S' => 1,
            'T' => 1,
            'U' => 1,
            'V' => 4,
            'W' => 4,
            'X' => 8,
            'Y' => 4,
            'Z' => 10,
            _ => {
                log::debug!("unrecognized letter for score {}, counted as 1", letter);
                1
            }
        }
    }
}

/// Score of a word, as credited to the player who made it
pub fn score(word: &str) -> u32 {
    StandardScoring.score_word(word)
}

#[test]
fn test_score() {
    // Б3 А1 Л2 Д2 А1
    assert_eq!(score("БАЛДА"), 9);
    assert_eq!(score(" балда "), 9);
    assert_eq!(score("ДА"), 3);
    assert_eq!(score("QUIZ"), 22);
    assert_eq!(score(""), 0);
    // unknown letters count for one
    assert_eq!(score("Ä1"), 2);
}

#[test]
fn test_score_is_stable_across_threads() {
    let words = ["БАЛДА", "ЩУКА", "ФЪЕЗ", "WORD"];
    let expected = words.iter().map(|w| score(w)).collect::<Vec<_>>();

    std::thread::scope(|s| {
        let handles = (0..4)
            .map(|_| s.spawn(|| words.iter().map(|w| score(w)).collect::<Vec<_>>()))
            .collect::<Vec<_>>();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}
