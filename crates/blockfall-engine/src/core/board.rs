use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::LockError;

use super::piece::{Piece, PieceKind};

/// A single cell of the playfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Cell {
    /// Empty cell.
    #[default]
    Empty,
    /// Locked block of a specific piece kind.
    Filled(PieceKind),
}

impl Cell {
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    #[must_use]
    pub fn kind(self) -> Option<PieceKind> {
        match self {
            Cell::Empty => None,
            Cell::Filled(kind) => Some(kind),
        }
    }

    /// `.` for empty cells, the kind letter otherwise.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Filled(kind) => kind.as_char(),
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        if c == '.' {
            return Some(Cell::Empty);
        }
        match PieceKind::from_char(c) {
            Some(kind) => Some(Cell::Filled(kind)),
            None => None,
        }
    }
}

/// One row of the playfield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRow {
    cells: Box<[Cell]>,
}

impl BoardRow {
    fn empty(cols: usize) -> Self {
        Self {
            cells: vec![Cell::Empty; cols].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// A row is filled when it has no empty cell.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }
}

/// The playfield of locked cells.
///
/// Rows are indexed top to bottom with row 0 the topmost visible row. Cells
/// above row 0 are never stored: pieces may overhang the top while they spawn
/// but can not lock there. The total row count never changes; clearing lines
/// removes full rows and inserts empty rows at the top.
///
/// # Example
///
/// ```
/// use blockfall_engine::{Board, Piece, PieceKind, PiecePosition};
///
/// let mut board = Board::new(10, 20);
/// let piece = Piece::new(PieceKind::O, PiecePosition::new(3, 17));
/// assert!(!board.is_colliding(piece));
/// board.lock_piece(piece).unwrap();
/// assert!(board.is_colliding(piece));
/// assert_eq!(board.clear_lines(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cols: usize,
    rows: Vec<BoardRow>,
}

impl Board {
    /// Creates an empty board of `cols` × `rows` cells.
    #[must_use]
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows: vec![BoardRow::empty(cols); rows],
        }
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns an iterator over the rows, top to bottom.
    pub fn iter_rows(&self) -> impl Iterator<Item = &BoardRow> {
        self.rows.iter()
    }

    /// Returns the cell at `(col, row)`, or `None` outside the board.
    #[must_use]
    pub fn cell(&self, col: i32, row: i32) -> Option<Cell> {
        let (col, row) = self.index(col, row)?;
        Some(self.rows[row].cells[col])
    }

    fn index(&self, col: i32, row: i32) -> Option<(usize, usize)> {
        let col = usize::try_from(col).ok().filter(|&c| c < self.cols)?;
        let row = usize::try_from(row).ok().filter(|&r| r < self.rows.len())?;
        Some((col, row))
    }

    /// Returns `true` if the cell is outside the board (on any side, including
    /// above row 0) or holds a locked block.
    #[must_use]
    pub fn is_blocked(&self, col: i32, row: i32) -> bool {
        self.cell(col, row).is_none_or(|c| !c.is_empty())
    }

    /// Checks if any cell of the piece is outside the side or bottom bounds, or
    /// overlaps a locked cell.
    ///
    /// Cells above the visible board (row < 0) only take part in the
    /// horizontal bounds check.
    #[must_use]
    pub fn is_colliding(&self, piece: Piece) -> bool {
        let rows = i32::try_from(self.rows.len()).unwrap_or(i32::MAX);
        let cols = i32::try_from(self.cols).unwrap_or(i32::MAX);
        piece.cells().any(|(x, y)| {
            if x < 0 || x >= cols || y >= rows {
                return true;
            }
            y >= 0 && self.is_blocked(x, y)
        })
    }

    /// Writes the piece's kind into every cell it covers.
    ///
    /// Fails without touching the board when any cell lies above row 0, or when
    /// the piece collides.
    pub fn lock_piece(&mut self, piece: Piece) -> Result<(), LockError> {
        if piece.cells().any(|(_, y)| y < 0) {
            return Err(LockError::AboveBoard);
        }
        let cells = piece
            .cells()
            .map(|(x, y)| {
                self.index(x, y)
                    .filter(|&(col, row)| self.rows[row].cells[col].is_empty())
            })
            .collect::<Option<ArrayVec<_, 4>>>()
            .ok_or(LockError::Collision)?;
        for (col, row) in cells {
            self.rows[row].cells[col] = Cell::Filled(piece.kind());
        }
        Ok(())
    }

    /// Clears filled lines and returns the number of lines cleared.
    ///
    /// Rows above each cleared line shift down in a single bottom-up pass and
    /// the same number of empty rows are inserted at the top.
    pub fn clear_lines(&mut self) -> usize {
        let height = self.rows.len();
        let mut count = 0;
        for y in (0..height).rev() {
            if self.rows[y].is_filled() {
                count += 1;
                continue;
            }
            if count > 0 {
                self.rows.swap(y, y + count);
            }
        }
        for row in &mut self.rows[..count] {
            *row = BoardRow::empty(self.cols);
        }
        count
    }

    /// Creates a board from ASCII art for testing.
    ///
    /// `.` is an empty cell, a kind letter is a locked cell of that kind.
    /// Rows are given top to bottom; blank lines and surrounding whitespace are
    /// ignored. The art fills the bottom of a `cols` × `rows` board.
    ///
    /// # Panics
    ///
    /// Panics on a row of the wrong width, an unknown character, or more art
    /// rows than `rows`.
    #[must_use]
    pub fn from_ascii(cols: usize, rows: usize, art: &str) -> Self {
        let mut board = Self::new(cols, rows);
        let lines: Vec<&str> = art
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        assert!(
            lines.len() <= rows,
            "art has {} rows, board only {rows}",
            lines.len()
        );
        let top = rows - lines.len();

        for (i, line) in lines.iter().enumerate() {
            let cells: Vec<Cell> = line
                .chars()
                .map(|c| Cell::from_char(c).unwrap_or_else(|| panic!("invalid cell '{c}'")))
                .collect();
            assert_eq!(
                cells.len(),
                cols,
                "Each row must have exactly {cols} cells, got {} at row {i}",
                cells.len(),
            );
            board.rows[top + i].cells = cells.into_boxed_slice();
        }
        board
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            for cell in row.cells() {
                write!(f, "{}", cell.as_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: ["..........", "..IIII....", ...] (one string per row, top first)
        serializer.collect_seq(
            self.rows
                .iter()
                .map(|row| row.cells().iter().map(|c| c.as_char()).collect::<String>()),
        )
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let lines = Vec::<String>::deserialize(deserializer)?;
        let Some(first) = lines.first() else {
            return Err(serde::de::Error::custom("board must have at least one row"));
        };
        let cols = first.chars().count();
        if cols == 0 {
            return Err(serde::de::Error::custom("board rows must not be empty"));
        }

        let mut rows = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let cells = line
                .chars()
                .map(|c| {
                    Cell::from_char(c).ok_or_else(|| {
                        serde::de::Error::custom(format!("invalid cell '{c}' at row {i}"))
                    })
                })
                .collect::<Result<Box<[Cell]>, D::Error>>()?;
            if cells.len() != cols {
                return Err(serde::de::Error::custom(format!(
                    "expected {cols} cells at row {i}, got {}",
                    cells.len()
                )));
            }
            rows.push(BoardRow { cells });
        }

        Ok(Board { cols, rows })
    }
}
