
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::Instant;

use super::source::{DictionaryError, WordSource};
use super::{Dictionary, Trie};
use crate::Letter;

fn build_trie(source: &dyn WordSource) -> Result<Trie, DictionaryError> {
    let start = Instant::now();
    let mut trie = Trie::new();
    source.for_each_word(&mut |word| {
        trie.insert(word);
    })?;
    log::info!("dictionary built in {:?} ({} words)", Instant::now() - start, trie.size());
    Ok(trie)
}

/// A trie loaded from a slower word source.
///
/// Readers work on a snapshot; `reload` builds a complete new trie before
/// swapping it in, so a reader never sees a partially filled one.
///
/// Each `Dictionary` call reads the trie current at that moment. Work made
/// of many calls, like a suggestion run or a move check, should hold one
/// [`snapshot`](Self::snapshot) throughout so a reload cannot land halfway.
pub struct CachedDictionary<S: WordSource> {
    source: S,
    current: RwLock<Arc<Trie>>,
}

impl<S: WordSource> CachedDictionary<S> {
    pub fn load(source: S) -> Result<Self, DictionaryError> {
        let trie = build_trie(&source)?;
        Ok(Self::with_trie(source, trie))
    }

    fn with_trie(source: S, trie: Trie) -> Self {
        Self {
            source,
            current: RwLock::new(Arc::new(trie)),
        }
    }

    /// The trie in use right now, unaffected by later reloads
    pub fn snapshot(&self) -> Arc<Trie> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuilds the trie from the source and swaps it in, returns the new size.
    ///
    /// On failure the previous trie stays in use.
    pub fn reload(&self) -> Result<usize, DictionaryError> {
        let fresh = build_trie(&self.source)?;
        let size = fresh.size();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
        log::info!("dictionary reloaded ({} words)", size);
        Ok(size)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

// one lookup, one snapshot
impl<S: WordSource> Dictionary for CachedDictionary<S> {
    fn has(&self, word: &str) -> bool {
        self.snapshot().has(word)
    }
    fn has_prefix(&self, prefix: &str) -> bool {
        self.snapshot().has_prefix(prefix)
    }
    fn size(&self) -> usize {
        self.snapshot().size()
    }
    fn alphabet(&self) -> BTreeSet<Letter> {
        self.snapshot().alphabet().clone()
    }
}

/// A dictionary built on first use.
///
/// Concurrent first callers wait for a single load; once loaded, `get` never
/// takes a lock. A failed load keeps the source so a later call can retry.
pub struct LazyDictionary<S: WordSource> {
    pending: Mutex<Option<S>>,
    loaded: OnceLock<CachedDictionary<S>>,
}

impl<S: WordSource> LazyDictionary<S> {
    pub fn new(source: S) -> Self {
        Self {
            pending: Mutex::new(Some(source)),
            loaded: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<&CachedDictionary<S>, DictionaryError> {
        if let Some(dictionary) = self.loaded.get() {
            return Ok(dictionary);
        }

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        // somebody may have loaded it while we were waiting
        if let Some(dictionary) = self.loaded.get() {
            return Ok(dictionary);
        }

        let source = pending.take().ok_or(DictionaryError::Unavailable)?;
        match build_trie(&source) {
            Ok(trie) => Ok(self.loaded.get_or_init(|| CachedDictionary::with_trie(source, trie))),
            Err(e) => {
                log::warn!("dictionary load failed: {}", e);
                *pending = Some(source);
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }
}

#[cfg(test)]
mod fixtures {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A source whose words can be changed, counting how often it is read
    pub struct Swappable {
        pub words: Mutex<Vec<String>>,
        pub loads: AtomicUsize,
        pub fail: Mutex<bool>,
    }

    impl Swappable {
        pub fn new(words: &[&str]) -> Self {
            Self {
                words: Mutex::new(words.iter().map(|w| w.to_string()).collect()),
                loads: AtomicUsize::new(0),
                fail: Mutex::new(false),
            }
        }
        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl WordSource for Swappable {
        fn for_each_word(&self, visit: &mut dyn FnMut(&str)) -> Result<(), DictionaryError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock().unwrap() {
                return Err(DictionaryError::Unavailable);
            }
            // slow enough for concurrent callers to pile up
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.words.lock().unwrap().iter().for_each(|w| visit(w));
            Ok(())
        }
    }
}

#[test]
fn test_reload_swaps_whole_trie() {
    use fixtures::Swappable;

    let dict = CachedDictionary::load(Swappable::new(&["БАЛДА", "БАЛ"])).unwrap();
    assert!(dict.has("балда"));
    assert_eq!(Dictionary::size(&dict), 2);

    let before = dict.snapshot();
    *dict.source().words.lock().unwrap() = vec!["КОТ".to_owned()];
    assert_eq!(dict.reload().unwrap(), 1);

    assert!(dict.has("КОТ"));
    assert!(!dict.has("БАЛДА"));
    // a snapshot taken before the reload is untouched
    assert!(before.has("БАЛДА"));
    assert!(!before.has("КОТ"));
}

#[test]
fn test_snapshot_outlives_reload_mid_search() {
    use crate::{suggest_words, Board, SuggestOptions};
    use fixtures::Swappable;

    let dict = CachedDictionary::load(Swappable::new(&["ДАР"])).unwrap();
    let board = Board::parse("...\nДА.\n...");
    let used = BTreeSet::new();
    let options = SuggestOptions::new(&used, "");

    let trie = dict.snapshot();
    *dict.source().words.lock().unwrap() = vec!["ДАМ".to_owned()];
    dict.reload().unwrap();

    let held = suggest_words(&board, &*trie, &options);
    assert!(!held.is_empty());
    assert!(held.iter().all(|s| s.word == "ДАР"));
    let fresh = suggest_words(&board, &*dict.snapshot(), &options);
    assert!(fresh.iter().all(|s| s.word == "ДАМ"));
}

#[test]
fn test_failed_reload_keeps_previous_words() {
    use fixtures::Swappable;

    let dict = CachedDictionary::load(Swappable::new(&["БАЛДА"])).unwrap();
    *dict.source().fail.lock().unwrap() = true;
    assert!(dict.reload().is_err());
    assert!(dict.has("БАЛДА"));
}

#[test]
fn test_readers_during_reload() {
    use fixtures::Swappable;

    let words = (0..200).map(|i| format!("СЛОВО{}", i)).collect::<Vec<_>>();
    let source = Swappable::new(&words.iter().map(|w| w.as_str()).collect::<Vec<_>>());
    let dict = CachedDictionary::load(source).unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..5 {
                dict.reload().unwrap();
            }
        });
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    // a reader sees either the full old or the full new word set
                    assert_eq!(dict.snapshot().size(), 200);
                }
            });
        }
    });
}

#[test]
fn test_lazy_loads_once() {
    use fixtures::Swappable;

    let lazy = LazyDictionary::new(Swappable::new(&["БАЛДА", "ДА"]));
    assert!(!lazy.is_loaded());

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let dict = lazy.get().unwrap();
                assert!(dict.has("ДА"));
            });
        }
    });

    assert!(lazy.is_loaded());
    assert_eq!(lazy.get().unwrap().source().loads(), 1);
}

#[test]
fn test_lazy_retries_after_failure() {
    use fixtures::Swappable;

    let source = Swappable::new(&["БАЛДА"]);
    *source.fail.lock().unwrap() = true;
    let lazy = LazyDictionary::new(source);

    assert!(lazy.get().is_err());
    assert!(!lazy.is_loaded());

    // the source went back in place, fix it through the pending slot
    *lazy.pending.lock().unwrap().as_ref().unwrap().fail.lock().unwrap() = false;
    let dict = lazy.get().unwrap();
    assert!(dict.has("БАЛДА"));
    assert_eq!(dict.source().loads(), 2);
}
