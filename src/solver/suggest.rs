
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Instant;

use dashmap::DashMap;
use rayon::prelude::*;
use serde::Serialize;
use typed_arena::Arena;

use super::PathNode;
use crate::{normalize_word, score, Board, Dictionary, EngineConfig, Language, Letter, Position, Square, Step};

pub const DEFAULT_LIMIT: usize = 10;
/// Applied whatever the caller asks for, it bounds the sorting and output work
pub const MAX_LIMIT: usize = 50;

/// A move the engine would play: a letter on an empty square and the word it makes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub position: Position,
    pub letter: Letter,
    pub word: String,
    pub score: u32,
}

impl Suggestion {
    /// Best first: higher score, then row-major position, then word, then letter
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.word.cmp(&other.word))
            .then_with(|| self.letter.cmp(&other.letter))
    }
}

#[derive(Debug, Clone)]
pub struct SuggestOptions<'a> {
    /// `None` means the default limit
    pub limit: Option<usize>,
    pub used_words: &'a BTreeSet<String>,
    pub base_word: &'a str,
    pub min_word_length: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Only letters of this language are placed, `None` places any letter of the dictionary
    pub language: Option<Language>,
}

impl<'a> SuggestOptions<'a> {
    pub fn new(used_words: &'a BTreeSet<String>, base_word: &'a str) -> Self {
        Self {
            limit: None,
            used_words,
            base_word,
            min_word_length: 2,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            language: None,
        }
    }

    pub fn from_config(config: &EngineConfig, used_words: &'a BTreeSet<String>, base_word: &'a str) -> Self {
        Self {
            limit: None,
            used_words,
            base_word,
            min_word_length: config.min_word_length,
            default_limit: config.suggestion_limit,
            max_limit: config.suggestion_max_limit,
            language: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// The number of suggestions actually returned at most
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
            .min(MAX_LIMIT)
    }

    fn is_used(&self, word: &str) -> bool {
        self.used_words.contains(word) || normalize_word(self.base_word) == word
    }
}

// The letters a path may read at `pos`: any candidate on the placed square,
// the board letter elsewhere
fn letters_at<'b>(board: &'b Board, placed: Position, candidates: &'b [Letter], pos: Position) -> &'b [Letter] {
    if pos == placed {
        return candidates;
    }
    match board.get(pos) {
        Some(Square::Filled(letter)) => std::slice::from_ref(letter),
        _ => &[],
    }
}

/// Calls `found` with each letter that can go on `placed` and each dictionary
/// word traced through it.
///
/// The placed square reads as any of `candidates`, so one search covers them
/// all. A partial path is only extended while its letters are a dictionary
/// prefix.
fn words_through<'a>(
    board: &Board,
    placed: Position,
    candidates: &[Letter],
    dictionary: &(impl Dictionary + ?Sized),
    min_len: usize,
    arena: &'a Arena<PathNode<'a>>,
    mut found: impl FnMut(Letter, &str),
) {
    let size = board.size();

    let mut stack: Vec<(&'a PathNode<'a>, String)> = vec![];
    for pos in board.positions().rev() {
        for &letter in letters_at(board, placed, candidates, pos) {
            let word = letter.0.to_string();
            if dictionary.has_prefix(&word) {
                stack.push((arena.alloc(PathNode::start(pos, letter)), word));
            }
        }
    }

    while let Some((node, word)) = stack.pop() {
        if node.len >= min_len {
            if let Some(letter) = node.letter_on(placed) {
                if dictionary.has(&word) {
                    found(letter, &word);
                }
            }
        }

        for &step in Step::ALL.iter().rev() {
            let next = match node.pos.step(step, size) {
                Some(next) => next,
                None => continue,
            };
            if node.contains(next) {
                continue;
            }
            for &letter in letters_at(board, placed, candidates, next) {
                let mut longer = word.clone();
                longer.push(letter.0);
                if dictionary.has_prefix(&longer) {
                    stack.push((arena.alloc(node.extend(next, letter)), longer));
                }
            }
        }
    }
}

/// Ranks the moves available on `board`.
///
/// Every empty square a word can go through is tried with every letter of the
/// dictionary alphabet (restricted to the options' language, if any). With
/// words of two letters or more, only squares next to a letter qualify.
/// Words already used (and the base word) are skipped. The result is sorted
/// best first and never longer than the effective limit; it is empty when
/// nothing can be played.
pub fn suggest_words(
    board: &Board,
    dictionary: &(impl Dictionary + ?Sized),
    options: &SuggestOptions,
) -> Vec<Suggestion> {
    let limit = options.effective_limit();
    let alphabet = dictionary
        .alphabet()
        .into_iter()
        .filter(|&letter| options.language.map_or(true, |lang| lang.contains(letter)))
        .collect::<Vec<_>>();
    if limit == 0 || alphabet.is_empty() {
        return vec![];
    }

    let start = Instant::now();
    let min_len = options.min_word_length.max(1);
    let cells = if min_len == 1 {
        board.empty_cells().collect::<Vec<_>>()
    } else {
        board.frontier().collect::<Vec<_>>()
    };
    let found: DashMap<(Position, Letter, String), u32> = DashMap::new();

    cells.into_par_iter().for_each(|position| {
        let arena = Arena::new();
        words_through(board, position, &alphabet, dictionary, min_len, &arena, |letter, word| {
            if !options.is_used(word) {
                found.insert((position, letter, word.to_owned()), score(word));
            }
        });
    });

    let found = found.into_read_only();
    let mut suggestions = found
        .iter()
        .map(|((position, letter, word), &score)| Suggestion {
            position: *position,
            letter: *letter,
            word: word.clone(),
            score,
        })
        .collect::<Vec<_>>();

    let total = suggestions.len();
    suggestions.par_sort_unstable_by(Suggestion::rank);
    suggestions.truncate(limit);

    log::debug!(
        "{} suggestions found in {:?}, {} kept",
        total,
        Instant::now() - start,
        suggestions.len()
    );
    suggestions
}

#[cfg(test)]
use crate::Trie;

#[cfg(test)]
fn suggest(board: &Board, dictionary: &Trie, used: &[&str], limit: usize) -> Vec<Suggestion> {
    let used = used.iter().map(|w| w.to_string()).collect::<BTreeSet<_>>();
    suggest_words(board, dictionary, &SuggestOptions::new(&used, "").limit(limit))
}

#[test]
fn test_finds_words_through_new_letter() {
    let board = Board::parse("...\nДА.\n...");
    let dict = Trie::from_words(vec!["ДАР", "ДАМ", "АД", "ДА"]);
    let found = suggest(&board, &dict, &["ДА"], 10);

    let words = found
        .iter()
        .map(|s| (s.position, s.letter, s.word.as_str()))
        .collect::<BTreeSet<_>>();

    // М and Р next to А, А next to Д for АД
    assert!(words.contains(&(Position::new(1, 2), Letter('Р'), "ДАР")));
    assert!(words.contains(&(Position::new(1, 2), Letter('М'), "ДАМ")));
    assert!(words.contains(&(Position::new(0, 0), Letter('А'), "АД")));
    assert!(words.contains(&(Position::new(2, 0), Letter('А'), "АД")));
    // ДА is already used
    assert!(found.iter().all(|s| s.word != "ДА"));
    // every suggestion is worth its word
    assert!(found.iter().all(|s| s.score == score(&s.word)));
}

#[test]
fn test_sorted_and_limited() {
    // twelve possible placements around a lone А
    let board = Board::parse(".....\n.....\n..А..\n.....\n.....");
    let dict = Trie::from_words(vec!["АБ", "АД", "АЖ", "БА", "ДА", "ЖА"]);

    let all = suggest(&board, &dict, &[], 50);
    assert_eq!(all.len(), 24);

    let top = suggest(&board, &dict, &[], 5);
    assert_eq!(top.len(), 5);
    assert_eq!(top[..], all[..5]);
    for pair in top.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(top[0].score, score("АЖ"));
}

#[test]
fn test_ties_are_deterministic() {
    let board = Board::parse("...\n.А.\n...");
    let dict = Trie::from_words(vec!["ДА", "АД"]);
    let found = suggest(&board, &dict, &[], 10);

    // all worth 3: sorted by square, then word
    assert_eq!(
        found.iter().map(|s| (s.position, s.word.as_str())).collect::<Vec<_>>(),
        vec![
            (Position::new(0, 1), "АД"),
            (Position::new(0, 1), "ДА"),
            (Position::new(1, 0), "АД"),
            (Position::new(1, 0), "ДА"),
            (Position::new(1, 2), "АД"),
            (Position::new(1, 2), "ДА"),
            (Position::new(2, 1), "АД"),
            (Position::new(2, 1), "ДА"),
        ],
    );
    for _ in 0..5 {
        assert_eq!(suggest(&board, &dict, &[], 10), found);
    }
}

#[test]
fn test_hard_limit() {
    let board = Board::parse(".....\n.....\n..А..\n.....\n.....");
    let dict = Trie::from_words(
        ('Б'..='Я').flat_map(|c| vec![format!("А{}", c), format!("{}А", c)]),
    );
    let used = BTreeSet::new();
    let options = SuggestOptions::new(&used, "").limit(10_000);
    assert_eq!(options.effective_limit(), MAX_LIMIT);
    assert_eq!(suggest_words(&board, &dict, &options).len(), MAX_LIMIT);
}

#[test]
fn test_nothing_to_suggest() {
    let board = Board::parse("...\n.А.\n...");
    let dict = Trie::from_words(vec!["КОТ"]);
    assert!(suggest(&board, &dict, &[], 10).is_empty());

    // no alphabet, nothing to try
    let used = BTreeSet::new();
    let options = SuggestOptions::new(&used, "");
    assert!(suggest_words(&board, &crate::AllowAllDictionary, &options).is_empty());

    let dict = Trie::from_words(vec!["ДА"]);
    assert!(suggest(&board, &dict, &[], 0).is_empty());
}

#[test]
fn test_base_word_is_never_suggested() {
    let board = Board::parse("...\nД..\n...");
    let dict = Trie::from_words(vec!["ДА"]);
    let used = BTreeSet::new();
    let options = SuggestOptions::new(&used, "да");
    assert!(suggest_words(&board, &dict, &options).is_empty());
}

#[test]
fn test_one_letter_words_go_anywhere() {
    let board = Board::parse("...\n...\n..А");
    let dict = Trie::from_words(vec!["Я"]);
    let used = BTreeSet::new();

    let mut options = SuggestOptions::new(&used, "");
    options.min_word_length = 1;
    let found = suggest_words(&board, &dict, &options);
    assert_eq!(
        found.iter().map(|s| s.position).collect::<BTreeSet<_>>(),
        board.empty_cells().collect::<BTreeSet<_>>(),
    );
    assert!(found.iter().all(|s| s.word == "Я" && s.letter == Letter('Я')));

    // two letters at least: nothing to trace
    assert!(suggest_words(&board, &dict, &SuggestOptions::new(&used, "")).is_empty());
}

#[test]
fn test_language_restricts_placed_letters() {
    let board = Board::parse("...\nДА.\n...");
    let dict = Trie::from_words(vec!["ДАР", "ДАQ", "ДАZ"]);
    let used = BTreeSet::new();

    let all = suggest_words(&board, &dict, &SuggestOptions::new(&used, ""));
    assert_eq!(all[0].word, "ДАQ");

    let options = SuggestOptions::new(&used, "").language(Language::Russian).limit(1);
    let found = suggest_words(&board, &dict, &options);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].word, "ДАР");
}

#[test]
fn test_agrees_with_path_finding() {
    let board = Board::parse("...\nДА.\n...");
    let words = vec!["ДА", "АД", "ДАР", "ДАМ", "АДА", "РАД"];
    let dict = Trie::from_words(words.clone());

    let mut expected = BTreeSet::new();
    for position in board.empty_cells() {
        for &letter in dict.alphabet() {
            for word in &words {
                if super::find_path_through(&board, position, letter, word).is_some() {
                    expected.insert((position, letter, word.to_string()));
                }
            }
        }
    }

    let found = suggest(&board, &dict, &[], MAX_LIMIT)
        .into_iter()
        .map(|s| (s.position, s.letter, s.word))
        .collect::<BTreeSet<_>>();
    assert_eq!(found.len(), 21);
    assert_eq!(found, expected);
}
