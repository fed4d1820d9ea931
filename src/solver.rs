
pub mod path_finder;
pub mod suggest;

use serde::Serialize;

use super::{normalize_word, Board, Letter, Position};

pub use path_finder::{find_path, find_path_through};
pub use suggest::{suggest_words, SuggestOptions, Suggestion};

/// A board with at most one extra letter laid over an empty square.
///
/// This is how the search looks at "the board plus the letter being placed"
/// without touching the board itself.
#[derive(Debug, Copy, Clone)]
pub struct Overlay<'b> {
    board: &'b Board,
    placed: Option<(Position, Letter)>,
}

impl<'b> Overlay<'b> {
    pub fn new(board: &'b Board, position: Position, letter: Letter) -> Self {
        Self {
            board,
            placed: Some((position, letter)),
        }
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn letter_at(&self, pos: Position) -> Option<Letter> {
        match self.placed {
            Some((placed_pos, letter)) if placed_pos == pos => Some(letter),
            _ => self.board.letter_at(pos),
        }
    }

    pub fn positions(&self) -> impl DoubleEndedIterator<Item = Position> {
        self.board.positions()
    }
}

/// One square of a path being explored, linked back to the previous squares.
///
/// Nodes are allocated in an arena, so branches share their common start.
pub struct PathNode<'a> {
    pub pos: Position,
    pub letter: Letter,
    /// number of squares up to and including this one
    pub len: usize,
    pub prev: Option<&'a PathNode<'a>>,
}

impl<'a> PathNode<'a> {
    pub fn start(pos: Position, letter: Letter) -> Self {
        Self {
            pos,
            letter,
            len: 1,
            prev: None,
        }
    }

    pub fn extend(&'a self, pos: Position, letter: Letter) -> Self {
        Self {
            pos,
            letter,
            len: self.len + 1,
            prev: Some(self),
        }
    }

    fn iter(&'a self) -> impl Iterator<Item = &'a PathNode<'a>> {
        std::iter::successors(Some(self), |node| node.prev)
    }

    pub fn contains(&'a self, pos: Position) -> bool {
        self.iter().any(|node| node.pos == pos)
    }

    /// The squares from the first to this one
    pub fn positions(&'a self) -> Vec<Position> {
        let mut acc = self.iter().map(|node| node.pos).collect::<Vec<_>>();
        acc.reverse();
        acc
    }

    /// The letter the path reads on `pos`, if it goes through it
    pub fn letter_on(&'a self, pos: Position) -> Option<Letter> {
        self.iter().find(|node| node.pos == pos).map(|node| node.letter)
    }
}

/// An empty square and a letter that could go there
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Placement {
    pub position: Position,
    pub letter: Letter,
}

/// Every empty square where some letter would make `word` traceable through it.
///
/// Used for hints: the dictionary is not consulted. Results are row-major,
/// letters in order of first appearance in the word.
pub fn find_placements_for_word(board: &Board, word: &str) -> Vec<Placement> {
    let word = normalize_word(word);
    let mut letters: Vec<Letter> = vec![];
    for c in word.chars() {
        if !letters.contains(&Letter(c)) {
            letters.push(Letter(c));
        }
    }

    let mut acc = vec![];
    for position in board.empty_cells() {
        for &letter in &letters {
            if find_path_through(board, position, letter, &word).is_some() {
                acc.push(Placement { position, letter });
            }
        }
    }
    acc
}

#[test]
fn test_overlay() {
    let board = Board::parse("...\nБАЛ\n...");
    let view = Overlay::new(&board, Position::new(0, 2), Letter('Д'));
    assert_eq!(view.letter_at(Position::new(0, 2)), Some(Letter('Д')));
    assert_eq!(view.letter_at(Position::new(1, 0)), Some(Letter('Б')));
    assert_eq!(view.letter_at(Position::new(0, 0)), None);
    // the board itself is untouched
    assert_eq!(board.letter_at(Position::new(0, 2)), None);
}

#[test]
fn test_path_nodes() {
    let arena = typed_arena::Arena::new();
    let a = &*arena.alloc(PathNode::start(Position::new(1, 0), Letter('Б')));
    let b = &*arena.alloc(a.extend(Position::new(1, 1), Letter('А')));
    let c = &*arena.alloc(b.extend(Position::new(1, 2), Letter('Л')));
    assert_eq!(c.len, 3);
    assert_eq!(c.letter_on(Position::new(1, 1)), Some(Letter('А')));
    assert_eq!(c.letter_on(Position::new(0, 1)), None);
    assert_eq!(
        c.positions(),
        vec![Position::new(1, 0), Position::new(1, 1), Position::new(1, 2)],
    );
    assert!(c.contains(Position::new(1, 0)));
    assert!(!b.contains(Position::new(1, 2)));
}

#[test]
fn test_placements_for_word() {
    let board = Board::parse(".....\n.....\nБАЛДА\n.....\n.....");

    // БАЛЫ: only the square under or above Л can take the Ы
    let placements = find_placements_for_word(&board, "балы");
    assert_eq!(
        placements,
        vec![
            Placement { position: Position::new(1, 2), letter: Letter('Ы') },
            Placement { position: Position::new(3, 2), letter: Letter('Ы') },
        ],
    );

    // ДАР: Р goes next to the last А
    let placements = find_placements_for_word(&board, "ДАР");
    assert_eq!(
        placements,
        vec![
            Placement { position: Position::new(1, 4), letter: Letter('Р') },
            Placement { position: Position::new(3, 4), letter: Letter('Р') },
        ],
    );

    // no single extra letter makes it traceable
    assert!(find_placements_for_word(&board, "ЛАДА").is_empty());
}
