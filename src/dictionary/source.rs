
use std::path::{Path, PathBuf};

use fst::{Set, Streamer};

use crate::NormalizationMode;

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("failed to read word list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fst dictionary: {0}")]
    Fst(#[from] fst::Error),

    #[error("word in fst dictionary is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("dictionary file {0} is neither .txt or .fst")]
    UnknownFormat(PathBuf),

    #[error("dictionary source is gone after a failed load")]
    Unavailable,
}

/// Anything able to enumerate a word list, whatever the storage
pub trait WordSource: Send + Sync {
    /// Calls `visit` once per stored word
    fn for_each_word(&self, visit: &mut dyn FnMut(&str)) -> Result<(), DictionaryError>;
}

impl<W: AsRef<str> + Send + Sync> WordSource for Vec<W> {
    fn for_each_word(&self, visit: &mut dyn FnMut(&str)) -> Result<(), DictionaryError> {
        self.iter().for_each(|w| visit(w.as_ref()));
        Ok(())
    }
}

impl<S: WordSource + ?Sized> WordSource for Box<S> {
    fn for_each_word(&self, visit: &mut dyn FnMut(&str)) -> Result<(), DictionaryError> {
        (**self).for_each_word(visit)
    }
}

/// Words of a flat list: one word per line, case insensitive.
///
/// Blank lines and lines holding anything but letters are discarded.
pub fn parse_word_list(text: &str, mode: NormalizationMode) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.chars().all(char::is_alphabetic))
        .map(move |line| mode.normalize(line))
}

/// A newline delimited word list held in memory
#[derive(Debug, Clone)]
pub struct WordList {
    text: String,
    mode: NormalizationMode,
}

impl WordList {
    pub fn new(text: impl Into<String>, mode: NormalizationMode) -> Self {
        Self {
            text: text.into(),
            mode,
        }
    }

    pub fn from_file(path: impl AsRef<Path>, mode: NormalizationMode) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::new(text, mode))
    }

    pub fn words(&self) -> impl Iterator<Item = String> + '_ {
        parse_word_list(&self.text, self.mode)
    }
}

impl WordSource for WordList {
    fn for_each_word(&self, visit: &mut dyn FnMut(&str)) -> Result<(), DictionaryError> {
        self.words().for_each(|w| visit(&w));
        Ok(())
    }
}

/// A word list compiled into a finite state transducer (see the `make_fst` binary).
///
/// The keys are expected to be normalized already.
pub struct FstWords<D: AsRef<[u8]>> {
    set: Set<D>,
}

impl FstWords<Vec<u8>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| DictionaryError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self { set: Set::new(data)? })
    }

    /// Builds the set in memory, words are normalized, sorted and deduplicated first
    pub fn from_words<I>(words: I, mode: NormalizationMode) -> Result<Self, DictionaryError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut words = words
            .into_iter()
            .map(|w| mode.normalize(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>();
        words.sort_unstable();
        words.dedup();
        Ok(Self {
            set: Set::from_iter(words)?,
        })
    }
}

impl<D: AsRef<[u8]>> FstWords<D> {
    pub fn new(set: Set<D>) -> Self {
        Self { set }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn as_set(&self) -> &Set<D> {
        &self.set
    }
}

impl<D: AsRef<[u8]> + Send + Sync> WordSource for FstWords<D> {
    fn for_each_word(&self, visit: &mut dyn FnMut(&str)) -> Result<(), DictionaryError> {
        let mut stream = self.set.stream();
        while let Some(key) = stream.next() {
            visit(std::str::from_utf8(key)?);
        }
        Ok(())
    }
}

/// Opens a `.txt` word list or a `.fst` set, depending on the extension
pub fn open_word_file(
    path: impl AsRef<Path>,
    mode: NormalizationMode,
) -> Result<Box<dyn WordSource>, DictionaryError> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("fst") => Ok(Box::new(FstWords::open(path)?)),
        Some("txt") => Ok(Box::new(WordList::from_file(path, mode)?)),
        _ => Err(DictionaryError::UnknownFormat(path.to_owned())),
    }
}

#[cfg(test)]
fn collect(source: &dyn WordSource) -> Vec<String> {
    let mut acc = vec![];
    source.for_each_word(&mut |w| acc.push(w.to_owned())).unwrap();
    acc
}

#[test]
fn test_parse_word_list() {
    let text = "балда\n  Бал  \n\nда\nне-слово\nслово1\nЁлка\r\n";
    assert_eq!(
        parse_word_list(text, NormalizationMode::Exact).collect::<Vec<_>>(),
        vec!["БАЛДА", "БАЛ", "ДА", "ЁЛКА"],
    );
    assert_eq!(
        parse_word_list(text, NormalizationMode::FoldYo).last(),
        Some("ЕЛКА".to_owned()),
    );
    assert_eq!(collect(&WordList::new(text, NormalizationMode::Exact)).len(), 4);
}

#[test]
fn test_fst_words() {
    let words = FstWords::from_words(vec!["да", "балда", "БАЛ", "да", ""], NormalizationMode::Exact).unwrap();
    assert_eq!(words.len(), 3);
    assert_eq!(collect(&words), vec!["БАЛ", "БАЛДА", "ДА"]);
    assert!(words.as_set().contains("БАЛДА"));
}

#[test]
fn test_unknown_extension() {
    match open_word_file("words.csv", NormalizationMode::Exact) {
        Err(DictionaryError::UnknownFormat(p)) => assert_eq!(p, PathBuf::from("words.csv")),
        _ => panic!("csv should not be accepted"),
    }
    match open_word_file("/nonexistent/words.txt", NormalizationMode::Exact) {
        Err(DictionaryError::Io { .. }) => (),
        _ => panic!("missing file should fail to open"),
    }
}
