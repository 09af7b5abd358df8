use std::time::Duration;

use crate::{
    ConfigError, HoldError, LockError, MoveError,
    core::{
        board::Board,
        kick::{RotationDirection, kicks_for},
        piece::{Piece, PieceKind, PiecePosition},
    },
};

use super::{
    config::{GameConfig, SPAWN_ROW},
    piece_buffer::{PieceBag, PieceBuffer, PieceSeed},
    scoring::{GameStats, HARD_DROP_POINTS, SOFT_DROP_POINTS, TSpin},
};

/// Result of a successful rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationOutcome {
    /// T-spin classification of the new pose, armed until the next translation
    /// or lock.
    pub t_spin: TSpin,
    /// Index of the kick candidate that was accepted (0 is the unkicked pose).
    pub kick_index: usize,
}

/// Result of locking the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockResult {
    pub lines_cleared: usize,
    pub t_spin: TSpin,
    pub points: u64,
    /// Set when this lock ended the game, either by locking above the board or
    /// by the next piece colliding at spawn.
    pub topped_out: bool,
}

/// What a gravity tick did to the active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum GravityOutcome {
    Moved,
    Locked(LockResult),
}

/// Complete state of one game.
///
/// Every mutation goes through the operations below; each either succeeds or
/// returns an error leaving the state untouched. Once the game is over, every
/// operation is rejected with a `GameOver` error.
///
/// # Example
///
/// ```
/// use blockfall_engine::{GameConfig, GameState, PieceSeed, RotationDirection};
///
/// let mut game = GameState::new(GameConfig::default(), PieceSeed::from_bytes([1; 16])).unwrap();
///
/// game.try_move(-1, 0).unwrap();
/// game.try_rotate(RotationDirection::Clockwise).unwrap();
/// let ghost = game.ghost().unwrap();
///
/// let result = game.hard_drop().unwrap();
/// assert!(!result.topped_out);
/// assert_eq!(game.stats().completed_pieces(), 1);
/// for (x, y) in ghost.cells() {
///     assert!(!game.board().cell(x, y).unwrap().is_empty());
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub(super) config: GameConfig,
    pub(super) board: Board,
    pub(super) buffer: PieceBuffer,
    pub(super) active: Option<Piece>,
    pub(super) can_hold: bool,
    pub(super) armed_t_spin: TSpin,
    pub(super) stats: GameStats,
    pub(super) game_over: bool,
}

impl GameState {
    /// Starts a game on an empty board with the first piece spawned.
    pub fn new(config: GameConfig, seed: PieceSeed) -> Result<Self, ConfigError> {
        config.validate()?;
        let buffer = PieceBuffer::new(PieceBag::with_seed(seed), config.preview_len);
        let mut this = Self {
            board: Board::new(config.cols, config.rows),
            buffer,
            active: None,
            can_hold: true,
            armed_t_spin: TSpin::None,
            stats: GameStats::new(config.start_level),
            game_over: false,
            config,
        };
        this.spawn_next();
        Ok(this)
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the falling piece. `None` only after the game ended at spawn.
    #[must_use]
    pub fn active_piece(&self) -> Option<Piece> {
        self.active
    }

    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.buffer.next_pieces()
    }

    #[must_use]
    pub fn held_piece(&self) -> Option<PieceKind> {
        self.buffer.held_piece()
    }

    /// Returns `true` if hold has not been used since the last spawn.
    #[must_use]
    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    #[must_use]
    pub fn armed_t_spin(&self) -> TSpin {
        self.armed_t_spin
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Interval between automatic one-row drops at the current level.
    #[must_use]
    pub fn fall_interval(&self) -> Duration {
        self.stats.fall_interval()
    }

    fn playable_piece(&self) -> Result<Piece, MoveError> {
        if self.game_over {
            return Err(MoveError::GameOver);
        }
        self.active.ok_or(MoveError::NoActivePiece)
    }

    fn spawn_next(&mut self) {
        let kind = self.buffer.pop_next();
        self.spawn_kind(kind);
        self.can_hold = true;
    }

    /// Installs `kind` at its spawn pose, or ends the game if that collides.
    fn spawn_kind(&mut self, kind: PieceKind) {
        let piece = Piece::new(
            kind,
            PiecePosition::new(self.config.spawn_column(), SPAWN_ROW),
        );
        self.armed_t_spin = TSpin::None;
        if self.board.is_colliding(piece) {
            self.game_over = true;
            self.active = None;
        } else {
            self.active = Some(piece);
        }
    }

    /// Translates the active piece by `(dx, dy)` if the target is free.
    pub fn try_move(&mut self, dx: i32, dy: i32) -> Result<(), MoveError> {
        let piece = self.playable_piece()?.translated(dx, dy);
        if self.board.is_colliding(piece) {
            return Err(MoveError::Collision);
        }
        self.active = Some(piece);
        self.armed_t_spin = TSpin::None;
        Ok(())
    }

    /// Rotates the active piece, trying each kick candidate in order.
    ///
    /// The first non-colliding candidate is installed. The T-spin flag is
    /// re-evaluated for the new pose and stays armed until the next
    /// translation or lock.
    pub fn try_rotate(&mut self, direction: RotationDirection) -> Result<RotationOutcome, MoveError> {
        let piece = self.playable_piece()?;
        let rotated = piece.rotated(direction);
        let (kick_index, candidate) = kicks_for(piece.kind(), piece.rotation(), rotated.rotation())
            .iter()
            .map(|&(dx, dy)| rotated.translated(dx, dy))
            .enumerate()
            .find(|(_, candidate)| !self.board.is_colliding(*candidate))
            .ok_or(MoveError::Collision)?;

        let t_spin = self.t_spin_at(candidate);
        self.active = Some(candidate);
        self.armed_t_spin = t_spin;
        Ok(RotationOutcome { t_spin, kick_index })
    }

    /// Three or more blocked diagonal corners around the T pivot.
    fn t_spin_at(&self, piece: Piece) -> TSpin {
        let Some((cx, cy)) = piece.pivot() else {
            return TSpin::None;
        };
        let blocked = [(-1, -1), (1, -1), (-1, 1), (1, 1)]
            .into_iter()
            .filter(|&(dx, dy)| self.board.is_blocked(cx + dx, cy + dy))
            .count();
        if blocked >= 3 {
            TSpin::Full
        } else {
            TSpin::None
        }
    }

    fn drop_distance(&self, piece: Piece) -> i32 {
        let mut distance = 0;
        while !self.board.is_colliding(piece.translated(0, distance + 1)) {
            distance += 1;
        }
        distance
    }

    /// Number of rows the active piece can fall before landing.
    #[must_use]
    pub fn hard_drop_distance(&self) -> usize {
        self.active
            .map_or(0, |piece| self.drop_distance(piece).unsigned_abs() as usize)
    }

    /// Returns the active piece at its landing pose.
    #[must_use]
    pub fn ghost(&self) -> Option<Piece> {
        self.active
            .map(|piece| piece.translated(0, self.drop_distance(piece)))
    }

    /// Moves the active piece one row down, awarding a soft drop point.
    pub fn soft_drop(&mut self) -> Result<(), MoveError> {
        self.try_move(0, 1)?;
        self.stats.add_drop_points(1, SOFT_DROP_POINTS);
        Ok(())
    }

    /// Drops the active piece to its landing pose and locks it.
    pub fn hard_drop(&mut self) -> Result<LockResult, MoveError> {
        let piece = self.playable_piece()?;
        let distance = self.drop_distance(piece);
        if distance > 0 {
            self.active = Some(piece.translated(0, distance));
            self.armed_t_spin = TSpin::None;
            self.stats
                .add_drop_points(distance.unsigned_abs() as usize, HARD_DROP_POINTS);
        }
        self.lock_and_advance()
    }

    /// One gravity tick: fall a row, or lock if the piece has landed.
    pub fn step_gravity(&mut self) -> Result<GravityOutcome, MoveError> {
        match self.try_move(0, 1) {
            Ok(()) => Ok(GravityOutcome::Moved),
            Err(MoveError::Collision) => self.lock_and_advance().map(GravityOutcome::Locked),
            Err(e) => Err(e),
        }
    }

    /// Locks the active piece, clears lines, scores, and spawns the next piece.
    ///
    /// A piece with any cell above row 0 ends the game instead: the board is
    /// left untouched and nothing is scored or spawned.
    pub fn lock_and_advance(&mut self) -> Result<LockResult, MoveError> {
        let piece = self.playable_piece()?;
        match self.board.lock_piece(piece) {
            Ok(()) => {}
            Err(LockError::AboveBoard) => {
                self.game_over = true;
                self.armed_t_spin = TSpin::None;
                return Ok(LockResult {
                    lines_cleared: 0,
                    t_spin: TSpin::None,
                    points: 0,
                    topped_out: true,
                });
            }
            // The active piece is validated on every install.
            Err(LockError::Collision) => return Err(MoveError::Collision),
        }
        let t_spin = std::mem::take(&mut self.armed_t_spin);

        let lines_cleared = self.board.clear_lines();
        let points = self.stats.score_clear(lines_cleared, t_spin);
        self.stats.record_lock(lines_cleared);

        self.active = None;
        self.spawn_next();

        Ok(LockResult {
            lines_cleared,
            t_spin,
            points,
            topped_out: self.game_over,
        })
    }

    /// Sets the active piece aside.
    ///
    /// With an empty hold slot the next queued piece spawns; otherwise the held
    /// kind returns at its spawn pose. Allowed once per spawned piece.
    pub fn hold_swap(&mut self) -> Result<(), HoldError> {
        if self.game_over {
            return Err(HoldError::GameOver);
        }
        let piece = self.active.ok_or(HoldError::NoActivePiece)?;
        if !self.can_hold {
            return Err(HoldError::HoldAlreadyUsed);
        }
        let kind = self.buffer.hold(piece.kind());
        self.spawn_kind(kind);
        self.can_hold = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: PieceSeed = PieceSeed::from_bytes([42; 16]);

    fn new_game() -> GameState {
        GameState::new(GameConfig::default(), SEED).unwrap()
    }

    fn game_with(board: Board, piece: Piece) -> GameState {
        let config = GameConfig {
            cols: board.cols(),
            rows: board.rows(),
            ..GameConfig::default()
        };
        let mut game = GameState::new(config, SEED).unwrap();
        game.board = board;
        game.active = Some(piece);
        game
    }

    fn piece_at(kind: PieceKind, x: i32, y: i32) -> Piece {
        Piece::new(kind, PiecePosition::new(x, y))
    }

    #[test]
    fn test_new_spawns_first_piece() {
        let game = new_game();
        let piece = game.active_piece().unwrap();
        assert_eq!(piece.position(), PiecePosition::new(3, -2));
        assert_eq!(piece.rotation().index(), 0);
        assert_eq!(game.next_pieces().count(), 5);
        assert!(game.can_hold());
        assert!(!game.is_game_over());
        assert_eq!(game.stats().level(), 1);
        assert_eq!(game.fall_interval(), Duration::from_millis(800));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = GameConfig {
            start_level: 0,
            ..GameConfig::default()
        };
        assert!(GameState::new(config, SEED).is_err());
    }

    #[test]
    fn test_start_level_is_honoured() {
        let config = GameConfig {
            start_level: 7,
            ..GameConfig::default()
        };
        let game = GameState::new(config, SEED).unwrap();
        assert_eq!(game.stats().level(), 7);
        assert!(game.fall_interval() < Duration::from_millis(800));
    }

    #[test]
    fn test_move_stops_at_walls() {
        let mut game = game_with(Board::new(10, 20), piece_at(PieceKind::O, 3, 5));
        // O occupies frame columns 1 and 2.
        for _ in 0..4 {
            game.try_move(-1, 0).unwrap();
        }
        let before = game.clone();
        assert_eq!(game.try_move(-1, 0), Err(MoveError::Collision));
        assert_eq!(game, before);
        assert_eq!(game.active_piece().unwrap().position().x(), -1);
    }

    #[test]
    fn test_wall_kick_selects_second_candidate() {
        // T pointing right, hugging the left wall.
        let piece = piece_at(PieceKind::T, -1, 5).rotated(RotationDirection::Clockwise);
        let mut game = game_with(Board::new(10, 20), piece);

        let outcome = game.try_rotate(RotationDirection::Clockwise).unwrap();
        assert_eq!(outcome.kick_index, 1);
        let active = game.active_piece().unwrap();
        assert_eq!(active.position(), PiecePosition::new(0, 5));
        assert_eq!(active.rotation().index(), 2);
    }

    #[test]
    fn test_wall_kick_skips_blocked_candidate() {
        let board = Board::from_ascii(
            10,
            10,
            "
            ..I.......
            ..........
            ..........
            ",
        );
        let piece = piece_at(PieceKind::T, -1, 5).rotated(RotationDirection::Clockwise);
        let mut game = game_with(board, piece);

        let outcome = game.try_rotate(RotationDirection::Clockwise).unwrap();
        assert_eq!(outcome.kick_index, 2);
        assert_eq!(
            game.active_piece().unwrap().position(),
            PiecePosition::new(0, 4)
        );
    }

    #[test]
    fn test_rotation_fails_when_every_kick_collides() {
        let art = format!("IIIII.IIII\n{}", "IIIIIIIIII\n".repeat(19));
        let board = Board::from_ascii(10, 20, &art);
        let mut game = game_with(board, piece_at(PieceKind::T, 3, -2));

        let before = game.clone();
        assert_eq!(
            game.try_rotate(RotationDirection::Clockwise),
            Err(MoveError::Collision)
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_o_piece_rotation_is_identity() {
        let mut game = game_with(Board::new(10, 20), piece_at(PieceKind::O, 3, 5));
        for direction in [
            RotationDirection::Clockwise,
            RotationDirection::CounterClockwise,
            RotationDirection::Half,
        ] {
            let outcome = game.try_rotate(direction).unwrap();
            assert_eq!(outcome.kick_index, 0);
            assert_eq!(game.active_piece(), Some(piece_at(PieceKind::O, 3, 5)));
        }
    }

    fn t_spin_slot() -> GameState {
        let board = Board::from_ascii(
            10,
            20,
            "
            ...I......
            III...IIII
            IIII.IIIII
            ",
        );
        // T pointing left, above the slot.
        let piece = piece_at(PieceKind::T, 3, 16).rotated(RotationDirection::CounterClockwise);
        game_with(board, piece)
    }

    #[test]
    fn test_t_spin_single() {
        let mut game = t_spin_slot();
        let outcome = game.try_rotate(RotationDirection::CounterClockwise).unwrap();
        assert_eq!(
            outcome,
            RotationOutcome {
                t_spin: TSpin::Full,
                kick_index: 0
            }
        );
        assert_eq!(game.armed_t_spin(), TSpin::Full);

        let result = game.lock_and_advance().unwrap();
        assert_eq!(
            result,
            LockResult {
                lines_cleared: 1,
                t_spin: TSpin::Full,
                points: 400,
                topped_out: false,
            }
        );
        assert!(game.stats().back_to_back());
        assert_eq!(game.armed_t_spin(), TSpin::None);
    }

    #[test]
    fn test_rotation_out_of_slot_rearms_flag() {
        let mut game = t_spin_slot();
        game.try_rotate(RotationDirection::CounterClockwise).unwrap();
        let outcome = game.try_rotate(RotationDirection::Clockwise).unwrap();
        assert_eq!(outcome.t_spin, TSpin::None);
        assert_eq!(game.armed_t_spin(), TSpin::None);
    }

    #[test]
    fn test_translation_disarms_t_spin() {
        let mut game = game_with(Board::new(10, 20), piece_at(PieceKind::T, 3, 5));
        game.armed_t_spin = TSpin::Full;
        game.try_move(1, 0).unwrap();
        assert_eq!(game.armed_t_spin(), TSpin::None);

        game.armed_t_spin = TSpin::Full;
        game.soft_drop().unwrap();
        assert_eq!(game.armed_t_spin(), TSpin::None);

        game.armed_t_spin = TSpin::Full;
        let result = game.hard_drop().unwrap();
        assert_eq!(result.t_spin, TSpin::None);
    }

    #[test]
    fn test_ghost_and_hard_drop_distance() {
        let mut game = game_with(Board::new(10, 20), piece_at(PieceKind::T, 3, -2));
        assert_eq!(game.hard_drop_distance(), 19);
        let ghost = game.ghost().unwrap();
        assert_eq!(ghost.position(), PiecePosition::new(3, 17));
        // Read only.
        assert_eq!(game.active_piece(), Some(piece_at(PieceKind::T, 3, -2)));

        game.hard_drop().unwrap();
        assert_eq!(game.stats().score(), 38);
        for (x, y) in ghost.cells() {
            assert_eq!(game.board().cell(x, y).unwrap().kind(), Some(PieceKind::T));
        }
    }

    #[test]
    fn test_ghost_on_landed_piece_is_itself() {
        let piece = piece_at(PieceKind::T, 3, 17);
        let game = game_with(Board::new(10, 20), piece);
        assert_eq!(game.hard_drop_distance(), 0);
        assert_eq!(game.ghost(), Some(piece));
    }

    #[test]
    fn test_soft_drop_and_gravity() {
        let mut game = game_with(Board::new(10, 20), piece_at(PieceKind::T, 3, 16));
        game.soft_drop().unwrap();
        assert_eq!(game.stats().score(), 1);
        assert_eq!(game.soft_drop(), Err(MoveError::Collision));
        assert_eq!(game.stats().score(), 1);

        let outcome = game.step_gravity().unwrap();
        assert!(outcome.is_locked());
        assert_eq!(game.stats().completed_pieces(), 1);

        assert_eq!(game.step_gravity(), Ok(GravityOutcome::Moved));
    }

    #[test]
    fn test_tetris_clears_and_spawns() {
        let board = Board::from_ascii(
            10,
            20,
            "
            IIIIIIIII.
            IIIIIIIII.
            IIIIIIIII.
            IIIIIIIII.
            ",
        );
        let vertical_i = piece_at(PieceKind::I, 7, 0).rotated(RotationDirection::Clockwise);
        let mut game = game_with(board, vertical_i);
        let queued = game.next_pieces().next().unwrap();

        let result = game.hard_drop().unwrap();
        assert_eq!(result.lines_cleared, 4);
        assert_eq!(result.points, 800);
        assert!(game.board().iter_rows().all(|row| row.cells().iter().all(|c| c.is_empty())));
        assert_eq!(game.stats().lines(), 4);
        assert_eq!(game.stats().line_cleared_counter()[4], 1);
        assert_eq!(game.active_piece().unwrap().kind(), queued);
        assert_eq!(game.next_pieces().count(), 5);
    }

    #[test]
    fn test_hold_is_single_use() {
        let mut game = new_game();
        let first = game.active_piece().unwrap().kind();
        let second = game.next_pieces().next().unwrap();

        game.hold_swap().unwrap();
        assert_eq!(game.held_piece(), Some(first));
        assert_eq!(game.active_piece().unwrap().kind(), second);
        assert!(!game.can_hold());

        let before = game.clone();
        assert_eq!(game.hold_swap(), Err(HoldError::HoldAlreadyUsed));
        assert_eq!(game, before);

        game.hard_drop().unwrap();
        assert!(game.can_hold());
        let third = game.active_piece().unwrap().kind();
        let queue: Vec<_> = game.next_pieces().collect();
        game.hold_swap().unwrap();
        assert_eq!(game.held_piece(), Some(third));
        let active = game.active_piece().unwrap();
        assert_eq!(active.kind(), first);
        assert_eq!(active.position(), PiecePosition::new(3, -2));
        assert_eq!(game.next_pieces().collect::<Vec<_>>(), queue);
    }

    #[test]
    fn test_lock_above_board_ends_game() {
        let mut game = new_game();
        let board_before = game.board().clone();

        let result = game.lock_and_advance().unwrap();
        assert!(result.topped_out);
        assert!(game.is_game_over());
        assert_eq!(game.board(), &board_before);
        assert_eq!(game.stats().completed_pieces(), 0);

        let before = game.clone();
        assert_eq!(game.try_move(1, 0), Err(MoveError::GameOver));
        assert_eq!(
            game.try_rotate(RotationDirection::Clockwise),
            Err(MoveError::GameOver)
        );
        assert_eq!(game.hard_drop(), Err(MoveError::GameOver));
        assert_eq!(game.step_gravity(), Err(MoveError::GameOver));
        assert_eq!(game.hold_swap(), Err(HoldError::GameOver));
        assert_eq!(game, before);
    }

    #[test]
    fn test_spawn_collision_ends_game() {
        let mut game = game_with(Board::new(10, 20), piece_at(PieceKind::O, 0, 17));
        game.board.lock_piece(piece_at(PieceKind::O, 3, -1)).unwrap();
        game.buffer = PieceBuffer::from_parts(PieceBag::with_seed(SEED), [PieceKind::O], None, 5);

        let result = game.lock_and_advance().unwrap();
        assert!(result.topped_out);
        assert!(game.is_game_over());
        assert_eq!(game.active_piece(), None);
        assert_eq!(game.stats().completed_pieces(), 1);
        assert_eq!(game.lock_and_advance(), Err(MoveError::GameOver));
    }

    #[test]
    fn test_hold_respawn_collision_ends_game() {
        let mut game = game_with(Board::new(10, 20), piece_at(PieceKind::T, 0, 10));
        // Blocks the O spawn pose.
        game.board.lock_piece(piece_at(PieceKind::O, 3, -1)).unwrap();
        let queue = [PieceKind::I, PieceKind::S, PieceKind::Z, PieceKind::J, PieceKind::L];
        game.buffer =
            PieceBuffer::from_parts(PieceBag::with_seed(SEED), queue, Some(PieceKind::O), 5);

        game.hold_swap().unwrap();
        assert!(game.is_game_over());
        assert_eq!(game.active_piece(), None);
        assert_eq!(game.held_piece(), Some(PieceKind::T));
        assert_eq!(game.next_pieces().collect::<Vec<_>>(), queue);
        assert_eq!(game.hold_swap(), Err(HoldError::GameOver));
    }

    #[test]
    fn test_lock_rejects_colliding_active_piece() {
        let board = Board::from_ascii(10, 20, ".....O....");
        // The T's stem overlaps the locked cell at (5, 19).
        let mut game = game_with(board, piece_at(PieceKind::T, 3, 17));
        let before = game.clone();
        assert_eq!(game.lock_and_advance(), Err(MoveError::Collision));
        assert_eq!(game, before);
    }
}
