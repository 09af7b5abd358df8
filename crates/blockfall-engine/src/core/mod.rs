pub use self::{board::*, kick::*, piece::*};

pub(crate) mod board;
pub(crate) mod kick;
pub(crate) mod piece;
