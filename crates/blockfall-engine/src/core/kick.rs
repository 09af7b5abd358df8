use super::piece::{PieceKind, PieceRotation};

/// Requested rotation of the falling piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum RotationDirection {
    /// 90° clockwise.
    Clockwise,
    /// 90° counter-clockwise.
    CounterClockwise,
    /// 180°. No kick table exists for this turn, only the zero offset is tried.
    Half,
}

impl RotationDirection {
    /// Signed number of clockwise quarter turns.
    #[must_use]
    pub const fn delta(self) -> i8 {
        match self {
            RotationDirection::Clockwise => 1,
            RotationDirection::CounterClockwise => -1,
            RotationDirection::Half => 2,
        }
    }
}

/// Offset `(dx, dy)` applied to a rotated piece; `dy` grows downward.
pub type Kick = (i32, i32);

type KickEntry = ((u8, u8), [Kick; 5]);

const ZERO_KICK: [Kick; 1] = [(0, 0)];

/// Kick candidates shared by J, L, T, S and Z.
const JLTSZ_KICKS: [KickEntry; 8] = [
    ((0, 1), [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)]),
    ((1, 0), [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)]),
    ((1, 2), [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)]),
    ((2, 1), [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)]),
    ((2, 3), [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)]),
    ((3, 2), [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)]),
    ((3, 0), [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)]),
    ((0, 3), [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)]),
];

/// Kick candidates of the I-piece (longer reach, asymmetric).
const I_KICKS: [KickEntry; 8] = [
    ((0, 1), [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)]),
    ((1, 0), [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)]),
    ((1, 2), [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)]),
    ((2, 1), [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)]),
    ((2, 3), [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)]),
    ((3, 2), [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)]),
    ((3, 0), [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)]),
    ((0, 3), [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)]),
];

/// Returns the ordered kick candidates for rotating `kind` from `from` to `to`.
///
/// The first candidate that does not collide wins. Transitions without a table
/// entry (180° turns, the O-piece, same-index turns) fall back to the zero
/// offset only.
///
/// # Example
///
/// ```
/// use blockfall_engine::{PieceKind, PieceRotation, kicks_for};
///
/// let spawn = PieceRotation::SPAWN;
/// let right = PieceRotation::new(PieceKind::T, 1).unwrap();
/// assert_eq!(kicks_for(PieceKind::T, spawn, right)[1], (-1, 0));
/// assert_eq!(kicks_for(PieceKind::O, spawn, spawn), &[(0, 0)]);
/// ```
#[must_use]
pub fn kicks_for(kind: PieceKind, from: PieceRotation, to: PieceRotation) -> &'static [Kick] {
    let table: &'static [KickEntry; 8] = if kind == PieceKind::I {
        &I_KICKS
    } else {
        &JLTSZ_KICKS
    };
    let key = (from.index(), to.index());
    table
        .iter()
        .find(|(transition, _)| *transition == key)
        .map_or(&ZERO_KICK[..], |(_, kicks)| &kicks[..])
}
