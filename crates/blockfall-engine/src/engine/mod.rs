//! Game engine logic and state management.
//!
//! This module orchestrates the core data structures into a playable game:
//!
//! - [`GameState`] - Board, falling piece, queue, hold and scoring of one game
//! - [`GameConfig`] - Board size, start level and preview length
//! - [`GameStats`] - Score, lines, level, combo and back-to-back tracking
//! - [`PieceBuffer`] - 7-bag piece generation, next queue and hold slot
//! - [`PieceSeed`] - Seed for deterministic piece generation
//! - [`GameSnapshot`] - Serializable form of a [`GameState`]
//!
//! # Game Flow
//!
//! 1. Create a [`GameState`] from a [`GameConfig`] and a [`PieceSeed`]
//! 2. Move, rotate, hold and soft drop the falling piece on input events
//! 3. Call [`GameState::step_gravity`] every [`GameState::fall_interval`]
//! 4. Hard drop or gravity locks the piece; lines are cleared and scored and
//!    the next piece spawns
//! 5. Repeat until top-out
//!
//! # Example
//!
//! ```
//! use blockfall_engine::{GameConfig, GameState, PieceSeed, RotationDirection};
//!
//! let mut game = GameState::new(GameConfig::default(), PieceSeed::from_bytes([0; 16])).unwrap();
//!
//! // Rejected moves leave the state unchanged.
//! let _ = game.try_move(-1, 0);
//! let _ = game.try_rotate(RotationDirection::Clockwise);
//!
//! while !game.step_gravity().unwrap().is_locked() {}
//! assert_eq!(game.stats().completed_pieces(), 1);
//! ```

pub use self::{config::*, game_state::*, piece_buffer::*, scoring::*, snapshot::*};

mod config;
mod game_state;
mod piece_buffer;
mod scoring;
mod snapshot;
