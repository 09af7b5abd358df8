use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::kick::RotationDirection;

/// A tetromino with position, rotation, and type.
///
/// Pieces are immutable values: movement and rotation return new `Piece`
/// instances that the caller validates against the board before installing.
///
/// # Coordinate System
///
/// - Position is the top-left corner of the piece's 4×4 frame
/// - Columns grow rightward, rows grow downward, row 0 is the topmost visible row
/// - Rows may be negative while the piece is above the visible board
///
/// # Example
///
/// ```
/// use blockfall_engine::{Piece, PieceKind, PiecePosition, RotationDirection};
///
/// let piece = Piece::new(PieceKind::T, PiecePosition::new(3, -2));
/// let moved = piece.translated(1, 0);
/// let rotated = moved.rotated(RotationDirection::Clockwise);
/// assert_eq!(rotated.position(), PiecePosition::new(4, -2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    position: PiecePosition,
    rotation: PieceRotation,
    kind: PieceKind,
}

impl fmt::Display for Piece {
    // Format: "kind#rotation@col,row" (e.g., "T#1@4,-2")
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}@{},{}",
            self.kind.as_char(),
            self.rotation.0,
            self.position.x,
            self.position.y
        )
    }
}

impl Serialize for Piece {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let (kind_str, rest) = s.split_once('#').ok_or_else(|| {
            serde::de::Error::custom(format!(
                "missing '#' in format 'kind#rotation@col,row', got '{s}'"
            ))
        })?;

        let mut chars = kind_str.chars();
        let (Some(kind_char), None) = (chars.next(), chars.next()) else {
            return Err(serde::de::Error::custom(format!(
                "piece kind must be single character, got '{kind_str}'"
            )));
        };
        let kind = PieceKind::from_char(kind_char)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid piece kind: {kind_char}")))?;

        let (rotation_str, position_str) = rest.split_once('@').ok_or_else(|| {
            serde::de::Error::custom(format!(
                "missing '@' in format 'kind#rotation@col,row', got '{s}'"
            ))
        })?;

        let rotation_num = rotation_str.parse::<u8>().map_err(|e| {
            serde::de::Error::custom(format!("invalid rotation: {rotation_str} ({e})"))
        })?;
        if rotation_num >= kind.rotation_count() {
            return Err(serde::de::Error::custom(format!(
                "rotation of {kind} must be below {}, got {rotation_num}",
                kind.rotation_count()
            )));
        }

        let (x_str, y_str) = position_str.split_once(',').ok_or_else(|| {
            serde::de::Error::custom(format!(
                "missing ',' in format 'kind#rotation@col,row', got '{s}'"
            ))
        })?;
        let x = x_str
            .parse::<i32>()
            .map_err(|e| serde::de::Error::custom(format!("invalid column: {x_str} ({e})")))?;
        let y = y_str
            .parse::<i32>()
            .map_err(|e| serde::de::Error::custom(format!("invalid row: {y_str} ({e})")))?;

        Ok(Piece {
            position: PiecePosition::new(x, y),
            rotation: PieceRotation(rotation_num),
            kind,
        })
    }
}

impl Piece {
    /// Creates a piece in its spawn orientation at the given position.
    #[must_use]
    pub const fn new(kind: PieceKind, position: PiecePosition) -> Self {
        Self {
            position,
            rotation: PieceRotation::SPAWN,
            kind,
        }
    }

    #[must_use]
    pub fn position(&self) -> PiecePosition {
        self.position
    }

    #[must_use]
    pub fn rotation(&self) -> PieceRotation {
        self.rotation
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    /// Returns the board cells `(col, row)` covered by this piece.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.kind
            .cells(self.rotation)
            .map(move |(dx, dy)| (self.position.x + dx, self.position.y + dy))
    }

    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            position: self.position.translated(dx, dy),
            rotation: self.rotation,
            kind: self.kind,
        }
    }

    /// Rotates in place without any kick; legality is up to the caller.
    #[must_use]
    pub fn rotated(&self, direction: RotationDirection) -> Self {
        Self {
            position: self.position,
            rotation: self.rotation.rotated(self.kind, direction.delta()),
            kind: self.kind,
        }
    }

    /// Returns the cell the piece pivots around, if it has one.
    ///
    /// Only the T-piece has a well-defined pivot: the single cell with three
    /// orthogonal neighbours inside the piece.
    #[must_use]
    pub fn pivot(&self) -> Option<(i32, i32)> {
        if self.kind != PieceKind::T {
            return None;
        }
        let cells: ArrayVec<(i32, i32), 4> = self.cells().collect();
        cells.iter().copied().find(|&(x, y)| {
            [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
                .iter()
                .filter(|n| cells.contains(n))
                .count()
                == 3
        })
    }
}

/// Position of a piece's 4×4 frame on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PiecePosition {
    x: i32,
    y: i32,
}

impl PiecePosition {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the frame's left edge.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.x
    }

    /// Row of the frame's top edge (negative above the visible board).
    #[must_use]
    pub const fn y(self) -> i32 {
        self.y
    }

    #[must_use]
    pub const fn translated(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Rotation index of a piece.
///
/// Index `0` is the spawn orientation; each step is a 90° clockwise turn of
/// the 4×4 frame. The number of distinct indices depends on the kind (see
/// [`PieceKind::rotation_count`]) and rotation wraps modulo that count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceRotation(u8);

impl PieceRotation {
    pub const SPAWN: Self = Self(0);

    /// Creates a rotation index, or `None` when out of range for `kind`.
    #[must_use]
    pub const fn new(kind: PieceKind, index: u8) -> Option<Self> {
        if index < kind.rotation_count() {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn rotated(self, kind: PieceKind, delta: i8) -> Self {
        let count = i16::from(kind.rotation_count());
        let index = (i16::from(self.0) + i16::from(delta)).rem_euclid(count);
        Self(u8::try_from(index).unwrap_or(0))
    }

    const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// The seven tetromino kinds.
///
/// Also used as the tag of a locked board cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, derive_more::Display,
)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// T-piece.
    T = 2,
    /// S-piece.
    S = 3,
    /// Z-piece.
    Z = 4,
    /// J-piece.
    J = 5,
    /// L-piece.
    L = 6,
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    /// All kinds in catalog order.
    pub const ALL: [PieceKind; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Number of distinct orientations of this kind.
    #[must_use]
    pub const fn rotation_count(self) -> u8 {
        ROTATION_COUNTS[self as usize]
    }

    /// Returns the `(dx, dy)` offsets inside the 4×4 frame occupied in the
    /// given rotation.
    pub fn cells(self, rotation: PieceRotation) -> impl Iterator<Item = (i32, i32)> {
        let mask = SHAPE_MASKS[self as usize][rotation.as_usize()];
        (0..4).flat_map(move |dy: i32| {
            let row = mask[dy.unsigned_abs() as usize];
            (0..4)
                .filter(move |dx: &i32| (row & (1 << dx)) != 0)
                .map(move |dx| (dx, dy))
        })
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use blockfall_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::T => 'T',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
        }
    }

    /// Parses a piece kind from a single character.
    ///
    /// # Examples
    ///
    /// ```
    /// use blockfall_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_char('I'), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_char('X'), None);
    /// ```
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'T' => Some(PieceKind::T),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            _ => None,
        }
    }
}

/// One orientation of a piece as 4 rows of 4 bits (bit N is column N).
type ShapeMask = [u8; 4];

const ROTATION_COUNTS: [u8; PieceKind::LEN] = [2, 1, 4, 2, 2, 4, 4];

/// Generates 4 successive 90° clockwise turns of a mask inside its 4×4 frame.
const fn mask_rotations(mask: ShapeMask) -> [ShapeMask; 4] {
    let mut rotates = [mask; 4];
    let mut i = 1;
    while i < 4 {
        let mut new_mask = [0; 4];
        let mut y = 0;
        while y < 4 {
            let mut x = 0;
            while x < 4 {
                if (rotates[i - 1][3 - x] & (1 << y)) != 0 {
                    new_mask[y] |= 1 << x;
                }
                x += 1;
            }
            y += 1;
        }
        rotates[i] = new_mask;
        i += 1;
    }
    rotates
}

// Only the first `rotation_count` entries of each kind are reachable; the
// rest are duplicates of those orientations shifted inside the frame.
const SHAPE_MASKS: [[ShapeMask; 4]; PieceKind::LEN] = {
    const fn m(bits: [bool; 4]) -> u8 {
        let mut mask = 0;
        let mut i = 0;
        while i < 4 {
            if bits[i] {
                mask |= 1 << i;
            }
            i += 1;
        }
        mask
    }

    const C: bool = true;
    const E: bool = false;
    const EEEE: u8 = 0;

    [
        // I-piece
        mask_rotations([EEEE, m([C, C, C, C]), EEEE, EEEE]),
        // O-piece
        mask_rotations([EEEE, m([E, C, C, E]), m([E, C, C, E]), EEEE]),
        // T-piece
        mask_rotations([EEEE, m([E, C, C, C]), m([E, E, C, E]), EEEE]),
        // S-piece
        mask_rotations([EEEE, m([E, E, C, C]), m([E, C, C, E]), EEEE]),
        // Z-piece
        mask_rotations([EEEE, m([E, C, C, E]), m([E, E, C, C]), EEEE]),
        // J-piece
        mask_rotations([EEEE, m([E, C, C, C]), m([E, E, E, C]), EEEE]),
        // L-piece
        mask_rotations([EEEE, m([E, C, C, C]), m([E, C, E, E]), EEEE]),
    ]
};
