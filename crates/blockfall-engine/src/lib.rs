//! Rules engine of a falling-block puzzle game.
//!
//! The crate owns the playfield, the falling and queued pieces, movement and
//! rotation legality (SRS kick tables), line clearing and scoring with
//! T-spins, combos and back-to-back bonuses. It runs no clock of its own: a
//! host loop calls [`GameState`] operations on input events and on a timer
//! derived from [`GameState::fall_interval`].

pub use self::{core::*, engine::*};

use derive_more::{Display, Error, IsVariant};

pub mod core;
pub mod engine;

/// Rejection of a requested move, rotation or drop.
///
/// The game state is unchanged whenever one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, IsVariant)]
pub enum MoveError {
    #[display("piece colliding at the requested position")]
    Collision,
    #[display("no active piece")]
    NoActivePiece,
    #[display("game is over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, IsVariant)]
pub enum HoldError {
    #[display("hold already used for this piece")]
    HoldAlreadyUsed,
    #[display("no active piece")]
    NoActivePiece,
    #[display("game is over")]
    GameOver,
}

/// Rejection of a lock; the board is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, IsVariant)]
pub enum LockError {
    #[display("piece locked above the visible board")]
    AboveBoard,
    #[display("piece overlaps a locked cell or the board bounds")]
    Collision,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConfigError {
    #[display("board must be within 4x4..={max_cols}x{max_rows}, got {cols}x{rows}")]
    InvalidBoardSize {
        cols: usize,
        rows: usize,
        max_cols: usize,
        max_rows: usize,
    },
    #[display("start level must be within 1..={max}, got {level}")]
    InvalidStartLevel { level: u32, max: u32 },
    #[display("preview length must be within {min}..={max}, got {len}")]
    InvalidPreviewLen { len: usize, min: usize, max: usize },
}

/// Rejection of a persisted game state that violates an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, IsVariant)]
pub enum LoadError {
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),
    #[display("board is {cols}x{rows}, configuration expects {expected_cols}x{expected_rows}")]
    BoardDimensions {
        cols: usize,
        rows: usize,
        expected_cols: usize,
        expected_rows: usize,
    },
    #[display("bag holds {len} pieces, at most 7 allowed")]
    BagOverflow { len: usize },
    #[display("bag contains {kind} more than once")]
    DuplicateBagKind { kind: PieceKind },
    #[display("level {level} is below {min} (start level and {lines} cleared lines)")]
    InvalidLevel { level: u32, lines: u32, min: u32 },
    #[display("combo counter {combo} is below -1")]
    InvalidCombo { combo: i32 },
    #[display("next queue holds {len} pieces, at least {expected} required")]
    ShortNextQueue { len: usize, expected: usize },
    #[display("board row {row} is full")]
    FilledRow { row: usize },
    #[display("active piece {piece} collides with the board")]
    ActivePieceCollision { piece: Piece },
    #[display("game in progress has no active piece")]
    MissingActivePiece,
}
