
pub mod cached;
pub mod source;
pub mod trie;

use std::collections::BTreeSet;
use std::sync::Arc;

use super::Letter;

pub use cached::{CachedDictionary, LazyDictionary};
pub use source::{open_word_file, parse_word_list, DictionaryError, FstWords, WordList, WordSource};
pub use trie::Trie;

/// Lookups the engine needs from a word list.
///
/// Every method normalizes its input (trim, uppercase) before looking it up.
pub trait Dictionary: Sync {
    fn has(&self, word: &str) -> bool;

    /// True for any prefix of a known word, complete words included
    fn has_prefix(&self, prefix: &str) -> bool;

    /// Number of distinct known words
    fn size(&self) -> usize;

    /// Every letter appearing in some known word
    fn alphabet(&self) -> BTreeSet<Letter>;
}

impl Dictionary for Trie {
    fn has(&self, word: &str) -> bool {
        Trie::has(self, word)
    }
    fn has_prefix(&self, prefix: &str) -> bool {
        Trie::has_prefix(self, prefix)
    }
    fn size(&self) -> usize {
        Trie::size(self)
    }
    fn alphabet(&self) -> BTreeSet<Letter> {
        Trie::alphabet(self).clone()
    }
}

impl<D: Dictionary + Send + ?Sized> Dictionary for Arc<D> {
    fn has(&self, word: &str) -> bool {
        (**self).has(word)
    }
    fn has_prefix(&self, prefix: &str) -> bool {
        (**self).has_prefix(prefix)
    }
    fn size(&self) -> usize {
        (**self).size()
    }
    fn alphabet(&self) -> BTreeSet<Letter> {
        (**self).alphabet()
    }
}

/// Accepts every non blank word.
///
/// Only meant as a fallback when no word list could be loaded: it knows no
/// word, so its size is 0 and its alphabet is empty (nothing to suggest).
#[derive(Debug, Copy, Clone, Default)]
pub struct AllowAllDictionary;

impl Dictionary for AllowAllDictionary {
    fn has(&self, word: &str) -> bool {
        !word.trim().is_empty()
    }
    fn has_prefix(&self, _prefix: &str) -> bool {
        true
    }
    fn size(&self) -> usize {
        0
    }
    fn alphabet(&self) -> BTreeSet<Letter> {
        BTreeSet::new()
    }
}

#[test]
fn test_allow_all() {
    let dict = AllowAllDictionary;
    assert!(dict.has("АБВГД"));
    assert!(dict.has("x"));
    assert!(!dict.has(""));
    assert!(!dict.has("  \t\n"));
    assert!(dict.has_prefix("ЩЩ"));
    assert_eq!(dict.size(), 0);
    assert!(dict.alphabet().is_empty());
}

#[test]
fn test_trait_objects_agree_with_trie() {
    let trie = Trie::from_words(vec!["БАЛДА", "БАЛ", "ДА"]);
    let shared: Arc<Trie> = Arc::new(trie.clone());
    let dyn_dict: &dyn Dictionary = &trie;

    for word in &["балда", "БАЛ", "БА", "ДАЛ", ""] {
        assert_eq!(dyn_dict.has(word), shared.has(word));
        assert_eq!(dyn_dict.has_prefix(word), Dictionary::has_prefix(&shared, word));
    }
    assert_eq!(Dictionary::size(&shared), 3);
}
