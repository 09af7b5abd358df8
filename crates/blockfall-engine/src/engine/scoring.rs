use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base points of a regular (non-T-spin) clear, indexed by lines cleared.
const LINE_CLEAR_POINTS: [u64; 5] = [0, 100, 300, 500, 800];

/// Points per row of a soft drop.
pub const SOFT_DROP_POINTS: u64 = 1;
/// Points per row of a hard drop.
pub const HARD_DROP_POINTS: u64 = 2;

/// T-spin classification of a lock.
///
/// Any T-piece whose last maneuver was a rotation ending with at least three of
/// its four diagonal corners blocked counts as a full T-spin; there is no
/// separate "mini" class.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum TSpin {
    #[default]
    None,
    Full,
}

/// Returns the interval between automatic one-row drops at `level`.
///
/// `max(0.05, 0.8 × 0.9^(level − 1))` seconds: decreasing with level and
/// clamped at 50 ms.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use blockfall_engine::gravity_for_level;
///
/// assert_eq!(gravity_for_level(1), Duration::from_millis(800));
/// assert!(gravity_for_level(2) < gravity_for_level(1));
/// assert_eq!(gravity_for_level(100), Duration::from_millis(50));
/// ```
#[must_use]
pub fn gravity_for_level(level: u32) -> Duration {
    let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
    Duration::from_secs_f64((0.8 * 0.9_f64.powi(exponent)).max(0.05))
}

/// Score, level and streak tracking.
///
/// - **Score**: line clear points with combo and back-to-back bonuses, plus
///   drop points
/// - **Level**: `lines / 10 + 1`, never lowered below the start level
/// - **Combo**: `-1` without a streak, otherwise the number of consecutive
///   clearing locks minus one
/// - **Back-to-back**: set while the last clearing lock was a Tetris or a
///   T-spin
///
/// # Example
///
/// ```
/// use blockfall_engine::{GameStats, TSpin};
///
/// let mut stats = GameStats::new(1);
/// assert_eq!(stats.score_clear(4, TSpin::None), 800); // Tetris
/// assert_eq!(stats.score_clear(1, TSpin::Full), 675); // (400 + 50) × 1.5
///
/// assert_eq!(stats.score(), 1475);
/// assert_eq!(stats.combo(), 1);
/// assert!(stats.back_to_back());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    score: u64,
    lines: u32,
    level: u32,
    combo: i32,
    back_to_back: bool,
    completed_pieces: u64,
    line_cleared_counter: [u64; 5],
}

impl Default for GameStats {
    fn default() -> Self {
        Self::new(1)
    }
}

impl GameStats {
    /// Creates a tracker with zero score starting at `start_level`.
    #[must_use]
    pub const fn new(start_level: u32) -> Self {
        Self {
            score: 0,
            lines: 0,
            level: start_level,
            combo: -1,
            back_to_back: false,
            completed_pieces: 0,
            line_cleared_counter: [0; 5],
        }
    }

    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Returns the total number of lines cleared.
    #[must_use]
    pub const fn lines(&self) -> u32 {
        self.lines
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub const fn combo(&self) -> i32 {
        self.combo
    }

    #[must_use]
    pub const fn back_to_back(&self) -> bool {
        self.back_to_back
    }

    /// Returns the total number of pieces that have been locked into place.
    #[must_use]
    pub const fn completed_pieces(&self) -> u64 {
        self.completed_pieces
    }

    /// Returns a histogram of locks by lines cleared (index 0 to 4).
    #[must_use]
    pub const fn line_cleared_counter(&self) -> &[u64; 5] {
        &self.line_cleared_counter
    }

    /// Returns the gravity interval of the current level.
    #[must_use]
    pub fn fall_interval(&self) -> Duration {
        gravity_for_level(self.level)
    }

    /// Scores a lock that cleared `lines` lines and returns the points awarded.
    ///
    /// A lock without a clear breaks both the combo and the back-to-back
    /// streak and awards nothing, T-spin or not.
    pub fn score_clear(&mut self, lines: usize, t_spin: TSpin) -> u64 {
        if lines == 0 {
            self.combo = -1;
            self.back_to_back = false;
            return 0;
        }

        let mut points = match t_spin {
            TSpin::Full => match lines {
                1 => 400,
                2 => 700,
                _ => 100,
            },
            TSpin::None => LINE_CLEAR_POINTS[lines.min(4)],
        };
        let difficult = t_spin.is_full() || lines >= 4;

        self.combo += 1;
        if self.combo > 0 {
            points += 50 * u64::from(self.combo.unsigned_abs());
        }

        if difficult {
            if self.back_to_back {
                points = points * 3 / 2;
            }
            self.back_to_back = true;
        } else {
            self.back_to_back = false;
        }

        self.lines += u32::try_from(lines).unwrap_or(u32::MAX);
        self.level = self.level.max(self.lines / 10 + 1);

        self.score += points;
        points
    }

    /// Adds drop points (soft or hard drop distance times its rate).
    pub fn add_drop_points(&mut self, rows: usize, points_per_row: u64) {
        self.score += u64::try_from(rows).unwrap_or(u64::MAX) * points_per_row;
    }

    /// Counts a locked piece in the statistics.
    pub(crate) fn record_lock(&mut self, lines: usize) {
        self.completed_pieces += 1;
        if let Some(count) = self.line_cleared_counter.get_mut(lines) {
            *count += 1;
        }
    }
}
