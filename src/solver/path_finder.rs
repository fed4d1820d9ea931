
use typed_arena::Arena;

use super::{Overlay, PathNode};
use crate::{Board, Letter, Position, Step};

/// Finds squares spelling `word`, with `letter` virtually placed at `position`.
///
/// The path is simple (no square twice) and made of orthogonal steps. The
/// first path found is returned: starting squares are tried row-major and
/// steps in the order of `Step::ALL`. The path may not go through `position`
/// at all if the word is already on the board; see `find_path_through`.
///
/// `word` is compared as is, it should be normalized like the board letters.
pub fn find_path(board: &Board, position: Position, letter: Letter, word: &str) -> Option<Vec<Position>> {
    search(&Overlay::new(board, position, letter), word, None)
}

/// Like `find_path`, but only accepts paths that go through `position`
pub fn find_path_through(board: &Board, position: Position, letter: Letter, word: &str) -> Option<Vec<Position>> {
    search(&Overlay::new(board, position, letter), word, Some(position))
}

// Depth first search with an explicit stack. Each stacked node is the end of
// a partial path, which is read back through the arena links.
fn search(view: &Overlay, word: &str, through: Option<Position>) -> Option<Vec<Position>> {
    let word = word.chars().map(Letter).collect::<Vec<_>>();
    let first = *word.first()?;
    let size = view.size();

    let arena = Arena::new();
    let mut stack: Vec<&PathNode> = vec![];

    // reversed, so the first square row-major is popped first
    for pos in view.positions().rev() {
        if view.letter_at(pos) == Some(first) {
            stack.push(arena.alloc(PathNode::start(pos, first)));
        }
    }

    while let Some(node) = stack.pop() {
        if node.len == word.len() {
            if through.map_or(true, |p| node.contains(p)) {
                return Some(node.positions());
            }
            continue;
        }

        let wanted = word[node.len];
        for &step in Step::ALL.iter().rev() {
            let next = match node.pos.step(step, size) {
                Some(next) => next,
                None => continue,
            };
            if view.letter_at(next) == Some(wanted) && !node.contains(next) {
                stack.push(arena.alloc(node.extend(next, wanted)));
            }
        }
    }

    None
}

#[cfg(test)]
fn p(row: usize, col: usize) -> Position {
    Position::new(row, col)
}

#[test]
fn test_simple_path() {
    let board = Board::parse(".....\n.....\nБАЛДА\n.....\n.....");

    // БАЛЫ through Ы placed under Л
    assert_eq!(
        find_path(&board, p(3, 2), Letter('Ы'), "БАЛЫ"),
        Some(vec![p(2, 0), p(2, 1), p(2, 2), p(3, 2)]),
    );

    // turning corners
    let board = Board::parse("КО.\n.Т.\n...");
    assert_eq!(
        find_path(&board, p(1, 0), Letter('Т'), "ОТ"),
        Some(vec![p(0, 1), p(1, 1)]),
    );
    assert_eq!(
        find_path(&board, p(2, 1), Letter('Ы'), "КОТЫ"),
        Some(vec![p(0, 0), p(0, 1), p(1, 1), p(2, 1)]),
    );
}

#[test]
fn test_no_diagonals() {
    let board = Board::parse("К..\n.О.\n...");
    assert_eq!(find_path(&board, p(2, 2), Letter('Т'), "КОТ"), None);
}

#[test]
fn test_no_square_twice() {
    // АНА would need to come back on the same А
    let board = Board::parse("АН.\n...\n...");
    assert_eq!(find_path(&board, p(2, 2), Letter('Я'), "АНА"), None);

    let board = Board::parse("АНА\n...\n...");
    assert_eq!(
        find_path(&board, p(2, 2), Letter('Я'), "АНА"),
        Some(vec![p(0, 0), p(0, 1), p(0, 2)]),
    );
}

#[test]
fn test_word_already_on_board() {
    let board = Board::parse("ДА.\n...\n...");
    // the plain search is happy with the existing letters
    assert_eq!(
        find_path(&board, p(1, 1), Letter('А'), "ДА"),
        Some(vec![p(0, 0), p(0, 1)]),
    );
    // only the placed А would make the path go through (1, 1), and it is not adjacent to Д
    assert_eq!(find_path_through(&board, p(1, 1), Letter('А'), "ДА"), None);
    assert_eq!(
        find_path_through(&board, p(1, 0), Letter('А'), "ДА"),
        Some(vec![p(0, 0), p(1, 0)]),
    );
}

#[test]
fn test_through_skips_paths_avoiding_the_placed_square() {
    // with a second Р placed under А, ДАР can be spelled two ways; the plain
    // search finds the one on the existing row first
    let board = Board::parse("ДАР\n...\n...");
    assert_eq!(
        find_path(&board, p(1, 1), Letter('Р'), "ДАР"),
        Some(vec![p(0, 0), p(0, 1), p(0, 2)]),
    );
    assert_eq!(
        find_path_through(&board, p(1, 1), Letter('Р'), "ДАР"),
        Some(vec![p(0, 0), p(0, 1), p(1, 1)]),
    );
}

#[test]
fn test_first_path_is_deterministic() {
    let board = Board::parse(".А.\nАДА\n.А.");
    let first = find_path(&board, p(0, 0), Letter('Б'), "ДА");
    for _ in 0..10 {
        assert_eq!(find_path(&board, p(0, 0), Letter('Б'), "ДА"), first);
    }
    // Up is tried first
    assert_eq!(first, Some(vec![p(1, 1), p(0, 1)]));
}

#[test]
fn test_empty_or_unplaceable_word() {
    let board = Board::parse("ДА.\n...\n...");
    assert_eq!(find_path(&board, p(2, 2), Letter('Я'), ""), None);
    assert_eq!(find_path(&board, p(2, 2), Letter('Я'), "ЯД"), None);
    assert_eq!(find_path(&board, p(2, 2), Letter('Я'), "Я"), Some(vec![p(2, 2)]));
}
