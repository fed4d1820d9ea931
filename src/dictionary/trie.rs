
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{normalize_word, Letter};

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<char, usize>,
    terminal: bool,
}

/// Prefix tree over normalized words.
///
/// Nodes live in a single vector and point to their children by index, the
/// root being the first one.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    size: usize,
    /// one count per distinct letter of each inserted word
    frequency: BTreeMap<Letter, usize>,
    /// reset by every insertion that adds a word
    alphabet: OnceLock<BTreeSet<Letter>>,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            size: 0,
            frequency: BTreeMap::new(),
            alphabet: OnceLock::new(),
        }
    }

    pub fn from_words<I>(words: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut trie = Self::new();
        for word in words {
            trie.insert(word.as_ref());
        }
        trie
    }

    /// Adds the normalized word, returns whether it was not known before
    pub fn insert(&mut self, word: &str) -> bool {
        let word = normalize_word(word);
        if word.is_empty() {
            return false;
        }

        let mut node = 0;
        for c in word.chars() {
            node = match self.nodes[node].children.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(c, next);
                    next
                }
            };
        }

        if self.nodes[node].terminal {
            return false;
        }
        self.nodes[node].terminal = true;
        self.size += 1;

        let distinct = word.chars().map(Letter).collect::<BTreeSet<_>>();
        for letter in distinct {
            *self.frequency.entry(letter).or_insert(0) += 1;
        }
        self.alphabet = OnceLock::new();
        true
    }

    fn find(&self, normalized: &str) -> Option<usize> {
        let mut node = 0;
        for c in normalized.chars() {
            node = *self.nodes[node].children.get(&c)?;
        }
        Some(node)
    }

    pub fn has(&self, word: &str) -> bool {
        self.find(&normalize_word(word))
            .map_or(false, |node| self.nodes[node].terminal)
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        let prefix = normalize_word(prefix);
        if prefix.is_empty() {
            return self.size > 0;
        }
        self.find(&prefix).is_some()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// All letters used by the known words, computed once until the next insertion
    pub fn alphabet(&self) -> &BTreeSet<Letter> {
        self.alphabet.get_or_init(|| {
            self.nodes
                .iter()
                .flat_map(|node| node.children.keys().map(|&c| Letter(c)))
                .collect()
        })
    }

    pub fn letter_frequency(&self) -> &BTreeMap<Letter, usize> {
        &self.frequency
    }

    /// Visits the words in lexicographic order, stopping below `max_len` letters
    fn walk(&self, max_len: Option<usize>, mut visit: impl FnMut(&str, usize)) {
        // children are pushed in reverse so the smallest letter is popped first
        let mut stack = vec![(0usize, String::new(), 0usize)];
        while let Some((node, word, len)) = stack.pop() {
            if self.nodes[node].terminal {
                visit(&word, len);
            }
            if max_len.map_or(false, |max| len >= max) {
                continue;
            }
            for (&c, &child) in self.nodes[node].children.iter().rev() {
                let mut next = word.clone();
                next.push(c);
                stack.push((child, next, len + 1));
            }
        }
    }

    pub fn words(&self) -> Vec<String> {
        let mut acc = Vec::with_capacity(self.size);
        self.walk(None, |word, _| acc.push(word.to_owned()));
        acc
    }

    pub fn words_of_length(&self, length: usize) -> Vec<String> {
        let mut acc = vec![];
        self.walk(Some(length), |word, len| {
            if len == length {
                acc.push(word.to_owned())
            }
        });
        acc
    }

    /// Up to `count` distinct words of exactly `length` letters, in random order
    pub fn random_words(&self, length: usize, count: usize) -> Vec<String> {
        self.random_words_with(length, count, &mut rand::thread_rng())
    }

    pub fn random_words_with(&self, length: usize, count: usize, rng: &mut impl Rng) -> Vec<String> {
        let candidates = self.words_of_length(length);
        if candidates.len() < count {
            log::debug!(
                "only {} words of length {} for {} requested",
                candidates.len(),
                length,
                count
            );
        }
        candidates.choose_multiple(rng, count).cloned().collect()
    }
}

#[cfg(test)]
fn balda_trie() -> Trie {
    Trie::from_words(vec!["БАЛДА", "БАЛ", "ДА"])
}

#[test]
fn test_membership() {
    let trie = balda_trie();
    assert!(trie.has("БАЛДА"));
    assert!(trie.has(" балда\n"));
    assert!(trie.has("бал"));
    assert!(!trie.has("БА"));
    assert!(!trie.has("БАЛДАА"));
    assert!(!trie.has(""));

    assert!(trie.has_prefix("Б"));
    assert!(trie.has_prefix("БАЛД"));
    assert!(trie.has_prefix("БАЛДА"));
    assert!(trie.has_prefix("д"));
    assert!(!trie.has_prefix("Л"));
    assert!(trie.has_prefix(""));
    assert!(!Trie::new().has_prefix(""));
}

#[test]
fn test_insert_is_idempotent() {
    let mut trie = balda_trie();
    assert_eq!(trie.size(), 3);
    assert!(!trie.insert("балда"));
    assert!(!trie.insert("  БАЛ "));
    assert!(!trie.insert(""));
    assert!(!trie.insert("   "));
    assert_eq!(trie.size(), 3);
    assert!(trie.insert("ЛАД"));
    assert_eq!(trie.size(), 4);
}

#[test]
fn test_alphabet_cache_is_invalidated() {
    let mut trie = balda_trie();
    let before = trie.alphabet().clone();
    assert_eq!(
        before,
        vec![Letter('А'), Letter('Б'), Letter('Д'), Letter('Л')].into_iter().collect::<BTreeSet<_>>(),
    );
    // asking again gives the cached value
    assert_eq!(trie.alphabet(), &before);

    trie.insert("КОТ");
    let after = trie.alphabet();
    assert!(after.contains(&Letter('К')));
    assert!(after.contains(&Letter('Т')));
    assert_eq!(after.len(), 7);
}

#[test]
fn test_letter_frequency() {
    let trie = balda_trie();
    let freq = trie.letter_frequency();
    // А is counted once for БАЛДА even though it appears twice
    assert_eq!(freq[&Letter('А')], 3);
    assert_eq!(freq[&Letter('Б')], 2);
    assert_eq!(freq[&Letter('Л')], 2);
    assert_eq!(freq[&Letter('Д')], 2);
    assert_eq!(freq.len(), 4);
}

#[test]
fn test_words() {
    let trie = balda_trie();
    assert_eq!(trie.words(), vec!["БАЛ", "БАЛДА", "ДА"]);
    assert_eq!(trie.words_of_length(2), vec!["ДА"]);
    assert_eq!(trie.words_of_length(5), vec!["БАЛДА"]);
    assert!(trie.words_of_length(4).is_empty());
}

#[test]
fn test_random_words() {
    use rand::{rngs::StdRng, SeedableRng};

    let trie = Trie::from_words(vec!["КОТ", "ЛЕС", "БАЛДА", "ДА", "СЛОН"]);
    let mut rng = StdRng::seed_from_u64(7);

    let mut three = trie.random_words_with(3, 100, &mut rng);
    three.sort();
    assert_eq!(three, vec!["КОТ", "ЛЕС"]);

    let one = trie.random_words_with(3, 1, &mut rng);
    assert_eq!(one.len(), 1);
    assert!(one[0] == "КОТ" || one[0] == "ЛЕС");

    assert!(trie.random_words(7, 3).is_empty());
    assert!(trie.random_words(3, 0).is_empty());
}
