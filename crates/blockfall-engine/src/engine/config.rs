use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Highest accepted starting level.
pub const MAX_START_LEVEL: u32 = 99;

/// Accepted board widths.
pub const COLS_RANGE: RangeInclusive<usize> = 4..=64;
/// Accepted board heights.
pub const ROWS_RANGE: RangeInclusive<usize> = 4..=128;
/// Accepted next queue lookahead, up to two full bags.
pub const PREVIEW_LEN_RANGE: RangeInclusive<usize> = 5..=14;

/// Row the top of a freshly spawned piece's frame starts at (above the board).
pub const SPAWN_ROW: i32 = -2;

/// Parameters of a game.
///
/// Missing fields take their defaults when deserialized, so a config file only
/// needs the values it changes:
///
/// ```
/// use blockfall_engine::GameConfig;
///
/// let config: GameConfig = serde_json::from_str(r#"{ "start_level": 5 }"#).unwrap();
/// assert_eq!(config.cols, 10);
/// assert_eq!(config.start_level, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub cols: usize,
    pub rows: usize,
    pub start_level: u32,
    /// Number of upcoming kinds kept visible in the next queue.
    pub preview_len: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: 10,
            rows: 20,
            start_level: 1,
            preview_len: 5,
        }
    }
}

impl GameConfig {
    /// Checks that a game can be played with these parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Every piece frame must fit horizontally at the spawn column.
        if !COLS_RANGE.contains(&self.cols) || !ROWS_RANGE.contains(&self.rows) {
            return Err(ConfigError::InvalidBoardSize {
                cols: self.cols,
                rows: self.rows,
                max_cols: *COLS_RANGE.end(),
                max_rows: *ROWS_RANGE.end(),
            });
        }
        if !(1..=MAX_START_LEVEL).contains(&self.start_level) {
            return Err(ConfigError::InvalidStartLevel {
                level: self.start_level,
                max: MAX_START_LEVEL,
            });
        }
        if !PREVIEW_LEN_RANGE.contains(&self.preview_len) {
            return Err(ConfigError::InvalidPreviewLen {
                len: self.preview_len,
                min: *PREVIEW_LEN_RANGE.start(),
                max: *PREVIEW_LEN_RANGE.end(),
            });
        }
        Ok(())
    }

    /// Column of the left edge of a spawned piece's frame.
    #[must_use]
    pub fn spawn_column(&self) -> i32 {
        i32::try_from(self.cols.saturating_sub(4) / 2).unwrap_or(0)
    }
}
