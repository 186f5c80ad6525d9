//! Number of bits per quantized component.

use serde::{Deserialize, Serialize};

/// Smallest supported number of bits per component.
pub const MIN_DEPTH: usize = 4;
/// Largest supported number of bits per component.
pub const MAX_DEPTH: usize = 8;

/// Number of bits used to store one quantized component.
///
/// Only constructible for `4..=8`, so every function taking a `Depth` can rely
/// on a group of 8 components occupying exactly `bits()` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Depth(u8);

impl Depth {
    pub fn new(bits: usize) -> Option<Self> {
        (MIN_DEPTH..=MAX_DEPTH)
            .contains(&bits)
            .then_some(Self(bits as u8))
    }

    pub fn bits(self) -> usize {
        self.0 as usize
    }

    /// Largest code value, `2^B - 1`.
    pub fn range(self) -> u32 {
        (1u32 << self.0) - 1
    }

    /// Byte length of `size` packed components.
    pub fn packed_len(self, size: usize) -> usize {
        (size * self.bits()).div_ceil(8)
    }
}

impl TryFrom<usize> for Depth {
    type Error = String;

    fn try_from(bits: usize) -> Result<Self, Self::Error> {
        Depth::new(bits).ok_or_else(|| format!("depth {bits} is outside of [4, 8]"))
    }
}

impl From<Depth> for usize {
    fn from(depth: Depth) -> Self {
        depth.bits()
    }
}
