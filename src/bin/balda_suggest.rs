
use std::collections::BTreeSet;
use std::convert::TryInto;
use std::path::PathBuf;
use std::time::Instant;

use structopt::StructOpt;

use balda::dictionary::open_word_file;
use balda::{suggest_words, Board, CachedDictionary, EngineConfig, SuggestOptions};

/// Text given inline, or `{ file = "..." }` to read it from disk
#[derive(Debug, PartialEq, serde::Deserialize)]
#[serde(untagged)]
enum TextSource {
    Inline(String),
    File { file: PathBuf },
}

impl TextSource {
    fn read(self) -> std::io::Result<String> {
        match self {
            TextSource::Inline(text) => Ok(text),
            TextSource::File { file } => std::fs::read_to_string(file),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct Settings {
    /// The dictionary: a `.txt` file with one word per line, or a `.fst` file made with `make_fst`
    dictionary: PathBuf,

    /// The board as a string or the file containing it (more info in `Opt`)
    board: TextSource,

    /// Words already played, one per line, as a string or a file
    used_words: Option<TextSource>,

    /// The base word of the game, never suggested
    #[serde(default)]
    base_word: String,

    /// The number of suggestions shown, the engine default if absent
    n_shown: Option<usize>,

    #[serde(default)]
    engine: EngineConfig,
}

#[derive(Debug, StructOpt)]
#[structopt(name = "balda_suggest", about = "List the best moves for a balda board")]
struct Opt {
    /// The config file, if not present only the environment and flags are used
    #[structopt(short = "c", long = "config")]
    config: Option<String>,

    /// The dictionary: a `.txt` file with one word per line, or a `.fst` file made with `make_fst`
    #[structopt(short = "d", long = "dictionary")]
    dict: Option<String>,

    /// The board, where one line in the file is one row of the board.
    /// Dots, spaces and underscores are empty squares
    #[structopt(short = "b", long = "board")]
    board_file: Option<String>,

    /// A file with the words already played, one per line
    #[structopt(short = "u", long = "used-words")]
    used_file: Option<String>,

    /// The base word of the game
    #[structopt(short = "w", long = "base-word")]
    base_word: Option<String>,

    /// The number of suggestions shown
    #[structopt(short = "n", long = "number-shown")]
    n_shown: Option<usize>,
}

fn load_config(opt: Opt) -> Result<Settings, config::ConfigError> {
    let mut s = config::Config::new();

    if let Some(f) = opt.config {
        s.merge(config::File::with_name(&f))?;
    }

    s.merge(config::Environment::with_prefix("BALDA").separator("__"))?;

    if let Some(d) = opt.dict {
        s.set("dictionary", d)?;
    }
    if let Some(b) = opt.board_file {
        s.set("board.file", b)?;
    }
    if let Some(u) = opt.used_file {
        s.set("used_words.file", u)?;
    }
    if let Some(w) = opt.base_word {
        s.set("base_word", w)?;
    }
    if let Some(n) = opt.n_shown {
        let n: i64 = n
            .try_into()
            .map_err(|_| config::ConfigError::Message("number shown is too large".to_owned()))?;
        s.set("n_shown", n)?;
    }

    s.try_into()
}

fn main() {
    simple_logger::SimpleLogger::from_env().init().unwrap();

    let opt = Opt::from_args();

    let conf = load_config(opt).expect("config");
    let engine = conf.engine;

    let board = Board::parse(&conf.board.read().expect("read board"));
    let used_words = match conf.used_words {
        Some(used) => used
            .read()
            .expect("read used words")
            .lines()
            .map(|w| engine.normalization.normalize(w))
            .filter(|w| !w.is_empty())
            .collect::<BTreeSet<_>>(),
        None => BTreeSet::new(),
    };
    let base_word = engine.normalization.normalize(&conf.base_word);

    let start = Instant::now();
    let source = open_word_file(&conf.dictionary, engine.normalization).expect("opening the dictionary");
    let dictionary = CachedDictionary::load(source).expect("loading the dictionary");
    log::info!("dictionary loaded in {:?}", Instant::now() - start);

    let mut options = SuggestOptions::from_config(&engine, &used_words, &base_word);
    if let Some(n) = conf.n_shown {
        options = options.limit(n);
    }

    let start = Instant::now();
    let trie = dictionary.snapshot();
    let suggestions = suggest_words(&board, &*trie, &options);
    log::info!("suggestions evaluated in {:?}", Instant::now() - start);

    if suggestions.is_empty() {
        println!("no move found");
        return;
    }

    let mut last_score = None;
    for s in suggestions {
        if last_score == Some(s.score) {
            print!("{:>3}  ", " ")
        } else {
            last_score = Some(s.score);
            print!("{:>3}: ", s.score)
        }
        println!("{:>2}-{:<2} {}  {}", (b'A' + s.position.col as u8) as char, s.position.row + 1, s.letter, s.word);
    }
}

#[cfg(test)]
fn settings_from_toml(text: &str) -> Settings {
    let mut s = config::Config::new();
    s.merge(config::File::from_str(text, config::FileFormat::Toml)).unwrap();
    s.try_into().unwrap()
}

#[test]
fn test_settings_text_sources() {
    let conf = settings_from_toml(
        r#"
        dictionary = "words.fst"
        board = "...\nБАЛ\n..."
        used_words = { file = "used.txt" }
        "#,
    );
    assert_eq!(conf.board, TextSource::Inline("...\nБАЛ\n...".to_owned()));
    assert_eq!(conf.used_words, Some(TextSource::File { file: PathBuf::from("used.txt") }));
    assert_eq!(conf.board.read().unwrap(), "...\nБАЛ\n...");

    let conf = settings_from_toml(
        r#"
        dictionary = "words.txt"
        board = { file = "board.txt" }
        "#,
    );
    assert_eq!(conf.board, TextSource::File { file: PathBuf::from("board.txt") });
    assert_eq!(conf.used_words, None);
    assert!(conf.board.read().is_err());
}
