//! Hardware backends and their tiling constants.
//!
//! A backend is a set of kernel shapes tuned for one instruction set. The
//! kernels themselves are portable; what differs per backend is how wide the
//! blocked M×N micro-kernel runs, which cache budgets bound the macro blocks,
//! and whether a depth has an unpack kernel at all.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::depth::Depth;

/// Largest micro tile height any backend uses.
pub const MAX_MICRO_M: usize = 12;
/// Largest micro tile width any backend uses.
pub const MAX_MICRO_N: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Scalar,
    Sse41,
    Avx2,
    Avx512bw,
}

static DETECTED: OnceLock<Backend> = OnceLock::new();

fn probe() -> Backend {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw") {
            return Backend::Avx512bw;
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return Backend::Avx2;
        }
        if is_x86_feature_detected!("sse4.1") {
            return Backend::Sse41;
        }
    }

    Backend::Scalar
}

impl Backend {
    /// Best backend for the running CPU. Probed once per process.
    pub fn detect() -> Backend {
        *DETECTED.get_or_init(probe)
    }

    /// Default tiling constants for this backend.
    pub fn profile(self) -> BackendProfile {
        let cache = CacheBudget::default();
        match self {
            Backend::Scalar => BackendProfile {
                cache,
                byte_tile: Some(MicroTile::new(2, 4)),
                word_tile: Some(MicroTile::new(2, 4)),
            },
            Backend::Sse41 => BackendProfile {
                cache,
                byte_tile: Some(MicroTile::new(5, 8)),
                word_tile: Some(MicroTile::new(6, 8)),
            },
            Backend::Avx2 => BackendProfile {
                cache,
                byte_tile: Some(MicroTile::new(5, 16)),
                word_tile: None,
            },
            Backend::Avx512bw => BackendProfile {
                cache,
                byte_tile: Some(MicroTile::new(12, 32)),
                word_tile: None,
            },
        }
    }
}

/// Cache sizes, in bytes, that bound the unpack scratch buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheBudget {
    pub l1: usize,
    pub l2: usize,
    pub l3: usize,
}

impl Default for CacheBudget {
    fn default() -> Self {
        CacheBudget {
            l1: 32 * 1024,
            l2: 256 * 1024,
            l3: 2 * 1024 * 1024,
        }
    }
}

/// Shape of the register block of the M×N micro-kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroTile {
    /// Rows of A (query side) per tile.
    pub m: usize,
    /// Columns of B (reference side) per tile, also the number of B records
    /// interleaved in the unpacked layout.
    pub n: usize,
}

impl MicroTile {
    pub const fn new(m: usize, n: usize) -> Self {
        MicroTile { m, n }
    }

    pub fn is_valid(&self) -> bool {
        (1..=MAX_MICRO_M).contains(&self.m) && (1..=MAX_MICRO_N).contains(&self.n)
    }
}

/// Element type of the unpacked scratch buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScratchWidth {
    /// One byte per component.
    Byte,
    /// Components widened to 16 bits.
    Word,
}

impl ScratchWidth {
    pub fn bytes(self) -> usize {
        match self {
            ScratchWidth::Byte => 1,
            ScratchWidth::Word => 2,
        }
    }
}

/// Tiling constants owned by a bound engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendProfile {
    pub cache: CacheBudget,
    /// Micro tile for depths 4..=7, unpacked to bytes.
    pub byte_tile: Option<MicroTile>,
    /// Micro tile for depth 8, unpacked to 16-bit words.
    pub word_tile: Option<MicroTile>,
}

impl BackendProfile {
    /// Unpack kernel for `depth`, or `None` when the backend only has the
    /// direct path for it.
    pub fn unpack_kernel(&self, depth: Depth) -> Option<(ScratchWidth, MicroTile)> {
        if depth.bits() == 8 {
            self.word_tile.map(|tile| (ScratchWidth::Word, tile))
        } else {
            self.byte_tile.map(|tile| (ScratchWidth::Byte, tile))
        }
    }
}
