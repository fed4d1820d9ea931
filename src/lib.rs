
pub mod config;
pub mod dictionary;
pub mod game;
pub mod score_rules;
pub mod solver;
pub mod store;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use config::EngineConfig;
pub use dictionary::{AllowAllDictionary, CachedDictionary, Dictionary, LazyDictionary, Trie};
pub use game::{
    apply_move, create_game, next_ai_move, GameOptions, GameState, GameStatus, InvalidMove, Move,
    MoveRequest, Rules, SetupError,
};
pub use score_rules::{score, LetterScoring, StandardScoring};
pub use solver::{find_placements_for_word, suggest_words, Placement, SuggestOptions, Suggestion};
pub use store::{GameStore, MemoryBackend, RetryPolicy, StoreError};

/// Identifier of a player, as handed over by the session layer
pub type PlayerId = String;

/// Identifier of a stored game
pub type GameId = String;

// letters are stored uppercase, after normalization
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Letter(pub char);

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Debug for Letter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    Empty,
    Filled(Letter),
}

impl Square {
    pub fn letter(&self) -> Option<Letter> {
        match self {
            Square::Filled(letter) => Some(*letter),
            Square::Empty => None,
        }
    }
    pub fn is_empty(&self) -> bool {
        *self == Square::Empty
    }
}

/// The four orthogonal moves between adjacent squares, in search order
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Up,
    Right,
    Down,
    Left,
}

impl Step {
    pub const ALL: &'static [Step] = &[Step::Up, Step::Right, Step::Down, Step::Left];
}

// field order matters: the derived Ord is row-major
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The adjacent position in that direction, None if it leaves a `size` x `size` board
    pub fn step(self, step: Step, size: usize) -> Option<Position> {
        let Position { row, col } = self;
        let next = match step {
            Step::Up => Position { row: row.checked_sub(1)?, col },
            Step::Down => Position { row: row + 1, col },
            Step::Left => Position { row, col: col.checked_sub(1)? },
            Step::Right => Position { row, col: col + 1 },
        };
        if next.row < size && next.col < size {
            Some(next)
        } else {
            None
        }
    }

    pub fn neighbours(self, size: usize) -> impl Iterator<Item = Position> {
        Step::ALL.iter().filter_map(move |&step| self.step(step, size))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A square grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table<T> {
    size: usize,
    squares: Vec<Vec<T>>,
}

impl<T> Table<T> {
    pub fn fill_with(size: usize, el: T) -> Self
    where
        T: Clone,
    {
        Self {
            size,
            squares: vec![vec![el; size]; size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, pos: Position) -> Option<&T> {
        self.squares.get(pos.row)?.get(pos.col)
    }
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.squares.get_mut(pos.row)?.get_mut(pos.col)
    }
    pub fn set(&mut self, pos: Position, val: T) {
        self.squares[pos.row][pos.col] = val
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    /// All positions, row-major
    pub fn positions(&self) -> impl DoubleEndedIterator<Item = Position> {
        let size = self.size;
        (0..size * size).map(move |i| Position { row: i / size, col: i % size })
    }
}

pub type Board = Table<Square>;

impl Table<Square> {
    pub fn empty(size: usize) -> Self {
        Table::fill_with(size, Square::Empty)
    }

    /// Reads a board where one line is one row.
    ///
    /// Dots, spaces and underscores are empty squares, letters are uppercased.
    /// The board is as large as its longest side, missing squares are empty.
    pub fn parse(text: &str) -> Self {
        let rows = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>();
        let size = rows
            .iter()
            .map(|r| r.chars().count())
            .max()
            .unwrap_or(0)
            .max(rows.len());

        let mut board = Board::empty(size);
        for (i, row) in rows.iter().enumerate() {
            for (j, c) in row.chars().enumerate() {
                if c.is_alphabetic() {
                    let letter = c.to_uppercase().next().unwrap_or(c);
                    board.set(Position { row: i, col: j }, Square::Filled(Letter(letter)));
                } else if c != '.' && c != '_' && c != ' ' {
                    log::warn!("a character in the given board is neither a letter or empty (._ ): {:?}", c);
                }
            }
        }
        board
    }

    pub fn letter_at(&self, pos: Position) -> Option<Letter> {
        self.get(pos).and_then(Square::letter)
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos).map_or(false, Square::is_empty)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(move |&p| self.is_empty_at(p))
    }

    pub fn filled_count(&self) -> usize {
        self.squares.iter().flatten().filter(|s| !s.is_empty()).count()
    }

    /// Share of filled squares, in `[0, 1]`
    pub fn fill_ratio(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        self.filled_count() as f64 / (self.size * self.size) as f64
    }

    /// Empty squares with at least one filled neighbour, the only ones a word can go through
    pub fn frontier(&self) -> impl Iterator<Item = Position> + '_ {
        let size = self.size;
        self.empty_cells()
            .filter(move |&p| p.neighbours(size).any(|n| !self.is_empty_at(n)))
    }
}

impl fmt::Display for Table<Square> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in &self.squares {
            for square in row {
                match square {
                    Square::Filled(letter) => write!(f, "{}", letter)?,
                    Square::Empty => write!(f, ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// The alphabet a game is played with
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Russian,
    English,
}

impl Default for Language {
    fn default() -> Self {
        Self::Russian
    }
}

impl Language {
    pub fn alphabet(self) -> Vec<Letter> {
        match self {
            Language::Russian => ('А'..='Я')
                .chain(std::iter::once('Ё'))
                .map(Letter)
                .collect(),
            Language::English => ('A'..='Z').map(Letter).collect(),
        }
    }

    pub fn contains(self, letter: Letter) -> bool {
        match self {
            Language::Russian => ('А'..='Я').contains(&letter.0) || letter.0 == 'Ё',
            Language::English => letter.0.is_ascii_uppercase(),
        }
    }
}

/// How words and letters are made comparable
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// trim and uppercase
    Exact,
    /// like `Exact`, and `Ё` is read as `Е`
    FoldYo,
}

impl Default for NormalizationMode {
    fn default() -> Self {
        Self::Exact
    }
}

impl NormalizationMode {
    pub fn normalize(self, word: &str) -> String {
        let upper = word.trim().to_uppercase();
        match self {
            NormalizationMode::Exact => upper,
            NormalizationMode::FoldYo => upper.replace('Ё', "Е"),
        }
    }

    pub fn normalize_letter(self, letter: char) -> Letter {
        let upper = letter.to_uppercase().next().unwrap_or(letter);
        match (self, upper) {
            (NormalizationMode::FoldYo, 'Ё') => Letter('Е'),
            _ => Letter(upper),
        }
    }
}

/// Trims and uppercases, the normalization every dictionary applies
pub fn normalize_word(word: &str) -> String {
    NormalizationMode::Exact.normalize(word)
}

#[test]
fn test_steps() {
    let corner = Position::new(0, 0);
    assert_eq!(corner.step(Step::Up, 5), None);
    assert_eq!(corner.step(Step::Left, 5), None);
    assert_eq!(corner.step(Step::Right, 5), Some(Position::new(0, 1)));
    assert_eq!(corner.step(Step::Down, 5), Some(Position::new(1, 0)));

    let far = Position::new(4, 4);
    assert_eq!(far.step(Step::Down, 5), None);
    assert_eq!(far.step(Step::Right, 5), None);

    let middle = Position::new(2, 2);
    assert_eq!(
        middle.neighbours(5).collect::<Vec<_>>(),
        vec![
            Position::new(1, 2),
            Position::new(2, 3),
            Position::new(3, 2),
            Position::new(2, 1),
        ],
    );
}

#[test]
fn test_parse_board() {
    let board = Board::parse("...\nбал\n_ _\n");
    assert_eq!(board.size(), 3);
    assert_eq!(board.letter_at(Position::new(1, 0)), Some(Letter('Б')));
    assert_eq!(board.letter_at(Position::new(1, 2)), Some(Letter('Л')));
    assert_eq!(board.letter_at(Position::new(0, 0)), None);
    assert_eq!(board.filled_count(), 3);
    assert_eq!(board.frontier().count(), 6);
    assert_eq!(board.to_string(), "...\nБАЛ\n...\n");
}

#[test]
fn test_normalization() {
    assert_eq!(normalize_word("  балда \n"), "БАЛДА");
    assert_eq!(NormalizationMode::FoldYo.normalize("ёлка"), "ЕЛКА");
    assert_eq!(NormalizationMode::Exact.normalize("ёлка"), "ЁЛКА");
    assert_eq!(NormalizationMode::FoldYo.normalize_letter('ё'), Letter('Е'));

    assert_eq!(Language::Russian.alphabet().len(), 33);
    assert!(Language::Russian.contains(Letter('Ё')));
    assert!(!Language::Russian.contains(Letter('A')));
    assert!(Language::English.contains(Letter('Q')));
}
