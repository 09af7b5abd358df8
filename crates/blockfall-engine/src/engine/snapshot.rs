use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    LoadError,
    core::{
        board::{Board, BoardRow},
        piece::{Piece, PieceKind},
    },
};

use super::{
    config::GameConfig,
    game_state::GameState,
    piece_buffer::{PieceBag, PieceBuffer},
    scoring::{GameStats, TSpin},
};

/// Serializable form of a [`GameState`].
///
/// Holds every field of the game verbatim, including the random generator
/// feeding the bag, so a restored game continues exactly as the original would.
/// The fall interval is not stored; it follows from `level`.
///
/// # Example
///
/// ```
/// use blockfall_engine::{GameConfig, GameSnapshot, GameState, PieceSeed};
///
/// let mut game = GameState::new(GameConfig::default(), PieceSeed::from_bytes([3; 16])).unwrap();
/// game.hard_drop().unwrap();
///
/// let json = serde_json::to_string(&game.snapshot()).unwrap();
/// let snapshot: GameSnapshot = serde_json::from_str(&json).unwrap();
/// let restored = GameState::restore(snapshot).unwrap();
/// assert_eq!(restored, game);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub config: GameConfig,
    pub board: Board,
    pub rng: Pcg32,
    /// Kinds left in the current bag batch, in draw order.
    pub bag: Vec<PieceKind>,
    pub next_queue: Vec<PieceKind>,
    pub hold: Option<PieceKind>,
    pub can_hold: bool,
    pub active: Option<Piece>,
    #[serde(default)]
    pub armed_t_spin: TSpin,
    #[serde(flatten)]
    pub stats: GameStats,
    pub game_over: bool,
}

impl GameState {
    /// Captures the complete state for persistence.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        let bag = self.buffer.bag();
        GameSnapshot {
            config: self.config.clone(),
            board: self.board.clone(),
            rng: bag.rng().clone(),
            bag: bag.remaining().collect(),
            next_queue: self.buffer.next_pieces().collect(),
            hold: self.buffer.held_piece(),
            can_hold: self.can_hold,
            active: self.active,
            armed_t_spin: self.armed_t_spin,
            stats: self.stats.clone(),
            game_over: self.game_over,
        }
    }

    /// Rebuilds a game from a snapshot, rejecting states no sequence of
    /// operations could have produced.
    pub fn restore(snapshot: GameSnapshot) -> Result<Self, LoadError> {
        let GameSnapshot {
            config,
            board,
            rng,
            bag,
            next_queue,
            hold,
            can_hold,
            active,
            armed_t_spin,
            stats,
            game_over,
        } = snapshot;

        config.validate().map_err(LoadError::Config)?;
        if board.cols() != config.cols || board.rows() != config.rows {
            return Err(LoadError::BoardDimensions {
                cols: board.cols(),
                rows: board.rows(),
                expected_cols: config.cols,
                expected_rows: config.rows,
            });
        }

        if let Some(row) = board.iter_rows().position(BoardRow::is_filled) {
            return Err(LoadError::FilledRow { row });
        }

        if bag.len() > PieceKind::LEN {
            return Err(LoadError::BagOverflow { len: bag.len() });
        }
        for (i, kind) in bag.iter().enumerate() {
            if bag[..i].contains(kind) {
                return Err(LoadError::DuplicateBagKind { kind: *kind });
            }
        }

        if next_queue.len() < config.preview_len {
            return Err(LoadError::ShortNextQueue {
                len: next_queue.len(),
                expected: config.preview_len,
            });
        }

        let min_level = config.start_level.max(stats.lines() / 10 + 1);
        if stats.level() < min_level {
            return Err(LoadError::InvalidLevel {
                level: stats.level(),
                lines: stats.lines(),
                min: min_level,
            });
        }
        if stats.combo() < -1 {
            return Err(LoadError::InvalidCombo {
                combo: stats.combo(),
            });
        }

        match active {
            Some(piece) if board.is_colliding(piece) => {
                return Err(LoadError::ActivePieceCollision { piece });
            }
            None if !game_over => return Err(LoadError::MissingActivePiece),
            _ => {}
        }

        let buffer = PieceBuffer::from_parts(
            PieceBag::from_parts(rng, bag),
            next_queue,
            hold,
            config.preview_len,
        );
        Ok(Self {
            config,
            board,
            buffer,
            active,
            can_hold,
            armed_t_spin,
            stats,
            game_over,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ConfigError, PiecePosition, PieceSeed, RotationDirection};

    fn mid_game() -> GameState {
        let seed = PieceSeed::from_bytes([11; 16]);
        let mut game = GameState::new(GameConfig::default(), seed).unwrap();
        game.hold_swap().unwrap();
        for dx in [-3, 0, 3, -1] {
            let _ = game.try_move(dx, 0);
            let _ = game.try_rotate(RotationDirection::Clockwise);
            game.hard_drop().unwrap();
        }
        game.soft_drop().unwrap();
        game
    }

    fn play(game: &mut GameState) -> Vec<String> {
        let mut trace = vec![];
        for i in 0..40 {
            let _ = game.try_move(i % 5 - 2, 0);
            if i % 3 == 0 {
                let _ = game.try_rotate(RotationDirection::CounterClockwise);
            }
            if i % 7 == 0 {
                let _ = game.hold_swap();
            }
            if game.hard_drop().is_err() {
                break;
            }
            trace.push(
                game.active_piece()
                    .map_or_else(|| "-".to_owned(), |p| p.to_string()),
            );
        }
        trace
    }

    fn to_value(game: &GameState) -> serde_json::Value {
        serde_json::to_value(game.snapshot()).unwrap()
    }

    fn restore_value(value: serde_json::Value) -> Result<GameState, LoadError> {
        GameState::restore(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_round_trip_is_exact() {
        let game = mid_game();
        let json = serde_json::to_string_pretty(&game.snapshot()).unwrap();
        let snapshot: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, game.snapshot());
        assert_eq!(GameState::restore(snapshot).unwrap(), game);
    }

    #[test]
    fn test_restored_game_continues_identically() {
        let mut original = mid_game();
        let mut restored = GameState::restore(original.snapshot()).unwrap();

        for (dx, dy) in [(-1, 0), (1, 0), (0, 1), (5, 0), (-9, 0)] {
            assert_eq!(
                original.clone().try_move(dx, dy),
                restored.clone().try_move(dx, dy)
            );
        }
        assert_eq!(play(&mut original), play(&mut restored));
        assert_eq!(original, restored);
    }

    #[test]
    fn test_format_fields() {
        let value = to_value(&mid_game());
        for key in [
            "config",
            "board",
            "rng",
            "bag",
            "next_queue",
            "hold",
            "can_hold",
            "active",
            "armed_t_spin",
            "score",
            "lines",
            "level",
            "combo",
            "back_to_back",
            "completed_pieces",
            "line_cleared_counter",
            "game_over",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["board"].as_array().unwrap().len(), 20);
        assert_eq!(value["next_queue"].as_array().unwrap().len(), 5);
        assert_eq!(value["completed_pieces"], json!(4));
    }

    #[test]
    fn test_rejects_board_dimension_mismatch() {
        let mut value = to_value(&mid_game());
        value["config"]["rows"] = json!(21);
        assert_eq!(
            restore_value(value),
            Err(LoadError::BoardDimensions {
                cols: 10,
                rows: 20,
                expected_cols: 10,
                expected_rows: 21,
            })
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut value = to_value(&mid_game());
        value["config"]["preview_len"] = json!(0);
        assert!(matches!(
            restore_value(value),
            Err(LoadError::Config(ConfigError::InvalidPreviewLen { len: 0, .. }))
        ));

        let mut value = to_value(&mid_game());
        value["config"]["preview_len"] = json!(1_u64 << 50);
        assert!(matches!(
            restore_value(value),
            Err(LoadError::Config(ConfigError::InvalidPreviewLen { .. }))
        ));
    }

    #[test]
    fn test_rejects_bad_bag() {
        let mut value = to_value(&mid_game());
        value["bag"] = json!(["T", "S", "T"]);
        assert_eq!(
            restore_value(value),
            Err(LoadError::DuplicateBagKind {
                kind: PieceKind::T
            })
        );

        let mut value = to_value(&mid_game());
        value["bag"] = json!(["I", "O", "T", "S", "Z", "J", "L", "I"]);
        assert_eq!(restore_value(value), Err(LoadError::BagOverflow { len: 8 }));
    }

    #[test]
    fn test_rejects_bad_counters() {
        let mut value = to_value(&mid_game());
        value["level"] = json!(0);
        assert!(matches!(
            restore_value(value),
            Err(LoadError::InvalidLevel {
                level: 0,
                min: 1,
                ..
            })
        ));

        let mut value = to_value(&mid_game());
        value["combo"] = json!(-2);
        assert_eq!(
            restore_value(value),
            Err(LoadError::InvalidCombo { combo: -2 })
        );
    }

    #[test]
    fn test_rejects_level_behind_lines() {
        let mut value = to_value(&mid_game());
        value["lines"] = json!(95);
        value["level"] = json!(1);
        assert_eq!(
            restore_value(value),
            Err(LoadError::InvalidLevel {
                level: 1,
                lines: 95,
                min: 10,
            })
        );

        let mut value = to_value(&mid_game());
        value["lines"] = json!(95);
        value["level"] = json!(10);
        assert!(restore_value(value).is_ok());
    }

    #[test]
    fn test_rejects_level_below_start_level() {
        let mut value = to_value(&mid_game());
        value["config"]["start_level"] = json!(5);
        value["level"] = json!(4);
        assert!(matches!(
            restore_value(value),
            Err(LoadError::InvalidLevel { min: 5, .. })
        ));
    }

    #[test]
    fn test_rejects_short_next_queue() {
        let mut value = to_value(&mid_game());
        value["next_queue"] = json!([]);
        assert_eq!(
            restore_value(value),
            Err(LoadError::ShortNextQueue {
                len: 0,
                expected: 5,
            })
        );

        let mut value = to_value(&mid_game());
        value["next_queue"] = json!(["I", "O", "T", "S"]);
        assert_eq!(
            restore_value(value),
            Err(LoadError::ShortNextQueue {
                len: 4,
                expected: 5,
            })
        );
    }

    #[test]
    fn test_rejects_filled_board_row() {
        let mut value = to_value(&mid_game());
        value["board"][19] = json!("IIIIIIIIII");
        assert_eq!(restore_value(value), Err(LoadError::FilledRow { row: 19 }));
    }

    #[test]
    fn test_rejects_bad_active_piece() {
        let mut value = to_value(&mid_game());
        // Below the bottom row.
        value["active"] = json!("O#0@3,19");
        assert!(matches!(
            restore_value(value),
            Err(LoadError::ActivePieceCollision { .. })
        ));

        let mut value = to_value(&mid_game());
        value["active"] = json!(null);
        assert_eq!(restore_value(value), Err(LoadError::MissingActivePiece));

        // A finished game may have no active piece.
        let mut value = to_value(&mid_game());
        value["active"] = json!(null);
        value["game_over"] = json!(true);
        assert!(restore_value(value).unwrap().is_game_over());
    }

    #[test]
    fn test_rejects_malformed_fields() {
        let mut value = to_value(&mid_game());
        value["board"][0] = json!("....X.....");
        assert!(serde_json::from_value::<GameSnapshot>(value).is_err());

        let mut value = to_value(&mid_game());
        value["active"] = json!("O#1@3,0");
        assert!(serde_json::from_value::<GameSnapshot>(value).is_err());
    }

    #[test]
    fn test_spawned_piece_is_persisted_verbatim() {
        let game = GameState::new(GameConfig::default(), PieceSeed::from_bytes([0; 16])).unwrap();
        let value = to_value(&game);
        let kind = game.active_piece().unwrap().kind();
        assert_eq!(value["active"], json!(format!("{}#0@3,-2", kind.as_char())));
        assert_eq!(
            game.active_piece().unwrap().position(),
            PiecePosition::new(3, -2)
        );
        assert_eq!(value["combo"], json!(-1));
        assert_eq!(value["armed_t_spin"], json!("none"));
    }
}
