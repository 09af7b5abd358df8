use std::{collections::VecDeque, fmt};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
    seq::SliceRandom,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PieceKind;

/// Seed for deterministic piece generation.
///
/// This is a 128-bit (16-byte) seed used to initialize the random number
/// generator of the [`PieceBag`]. The same seed produces the same sequence
/// of pieces, which makes games replayable and tests deterministic.
///
/// # Example
///
/// ```
/// use blockfall_engine::{PieceBag, PieceSeed};
/// use rand::Rng as _;
///
/// let seed: PieceSeed = rand::rng().random();
///
/// let mut bag1 = PieceBag::with_seed(seed);
/// let mut bag2 = PieceBag::with_seed(seed);
/// assert_eq!(bag1.take_one(), bag2.take_one());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSeed([u8; 16]);

impl PieceSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for PieceSeed {
    // Big-endian hex, so the bytes read in order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl Serialize for PieceSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for PieceSeed {
    type Err = String;

    fn from_str(hex_str: &str) -> Result<Self, Self::Err> {
        if hex_str.len() != 32 {
            return Err(format!(
                "invalid hex: expected 32 characters, got {}",
                hex_str.len()
            ));
        }
        let num = u128::from_str_radix(hex_str, 16)
            .map_err(|e| format!("invalid hex: {hex_str} ({e})"))?;
        Ok(Self(num.to_be_bytes()))
    }
}

/// Allows generating random `PieceSeed` values with `rng.random()`.
impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}

/// The 7-bag randomizer.
///
/// Holds what is left of the current shuffled batch of the seven kinds. A new
/// uniformly shuffled batch is appended only when the bag runs empty, so any
/// seven consecutive draws starting at a refill boundary contain every kind
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceBag {
    rng: Pcg32,
    bag: VecDeque<PieceKind>,
}

impl PieceBag {
    /// Creates an empty bag drawing from a generator seeded with `seed`.
    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        Self::from_rng(Pcg32::from_seed(seed.0))
    }

    /// Creates an empty bag drawing from the given generator.
    #[must_use]
    pub fn from_rng(rng: Pcg32) -> Self {
        Self {
            rng,
            bag: VecDeque::with_capacity(PieceKind::LEN),
        }
    }

    /// Restores a bag from persisted parts. The caller validates `bag`.
    pub(crate) fn from_parts(rng: Pcg32, bag: impl IntoIterator<Item = PieceKind>) -> Self {
        Self {
            rng,
            bag: bag.into_iter().collect(),
        }
    }

    /// Appends a shuffled set of all 7 kinds.
    pub fn refill(&mut self) {
        let mut new_bag = PieceKind::ALL;
        new_bag.shuffle(&mut self.rng);
        self.bag.extend(new_bag);
    }

    /// Draws the next kind, refilling first if the bag is empty.
    ///
    /// # Panics
    ///
    /// Panics if the bag is empty after a refill (never happens).
    pub fn take_one(&mut self) -> PieceKind {
        if self.bag.is_empty() {
            self.refill();
        }
        self.bag
            .pop_front()
            .expect("Piece bag should never be empty after refill")
    }

    /// Returns the kinds left in the current batch, in draw order.
    pub fn remaining(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.bag.iter().copied()
    }

    #[must_use]
    pub fn rng(&self) -> &Pcg32 {
        &self.rng
    }
}

/// Next queue and hold slot fed by a [`PieceBag`].
///
/// The queue always holds at least `preview_len` upcoming kinds once a piece
/// has been drawn.
///
/// # Example
///
/// ```
/// use blockfall_engine::{PieceBag, PieceBuffer, PieceSeed};
///
/// let mut buffer = PieceBuffer::new(PieceBag::with_seed(PieceSeed::from_bytes([7; 16])), 5);
///
/// let first = buffer.pop_next();
/// assert_eq!(buffer.next_pieces().count(), 5);
///
/// // Holding with an empty slot stores the piece and draws the next one.
/// let second = buffer.next_pieces().next().unwrap();
/// assert_eq!(buffer.hold(first), second);
/// assert_eq!(buffer.held_piece(), Some(first));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceBuffer {
    bag: PieceBag,
    next: VecDeque<PieceKind>,
    held: Option<PieceKind>,
    preview_len: usize,
}

impl PieceBuffer {
    /// Creates a buffer with an empty hold slot and a filled next queue.
    #[must_use]
    pub fn new(bag: PieceBag, preview_len: usize) -> Self {
        let mut this = Self {
            bag,
            next: VecDeque::with_capacity(2 * PieceKind::LEN),
            held: None,
            preview_len,
        };
        this.fill_queue();
        this
    }

    /// Restores a buffer from persisted parts. The caller validates `bag`.
    pub(crate) fn from_parts(
        bag: PieceBag,
        next: impl IntoIterator<Item = PieceKind>,
        held: Option<PieceKind>,
        preview_len: usize,
    ) -> Self {
        Self {
            bag,
            next: next.into_iter().collect(),
            held,
            preview_len,
        }
    }

    fn fill_queue(&mut self) {
        while self.next.len() < self.preview_len {
            self.next.push_back(self.bag.take_one());
        }
    }

    /// Pops the front of the next queue, keeping the lookahead full.
    pub fn pop_next(&mut self) -> PieceKind {
        self.fill_queue();
        let kind = self
            .next
            .pop_front()
            .unwrap_or_else(|| self.bag.take_one());
        self.fill_queue();
        kind
    }

    /// Returns an iterator over the upcoming pieces in the queue.
    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.next.iter().copied()
    }

    /// Stores `current` in the hold slot.
    ///
    /// Returns the previously held piece, or the next piece from the queue if
    /// the slot was empty.
    pub fn hold(&mut self, current: PieceKind) -> PieceKind {
        match self.held.replace(current) {
            Some(held) => held,
            None => self.pop_next(),
        }
    }

    /// Returns the currently held piece, if any.
    #[must_use]
    pub fn held_piece(&self) -> Option<PieceKind> {
        self.held
    }

    #[must_use]
    pub fn bag(&self) -> &PieceBag {
        &self.bag
    }
}
