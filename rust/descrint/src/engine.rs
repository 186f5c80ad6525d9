//! The bound (size, depth) engine exposing every codec operation.

use half::f16;

use crate::backend::{Backend, BackendProfile, MicroTile, MAX_MICRO_M, MAX_MICRO_N};
use crate::config::EngineConfig;
use crate::correlate;
use crate::decode::{decode_f16, decode_f32};
use crate::depth::Depth;
use crate::encode::{encode_f16, encode_f32};
use crate::error::EngineError;
use crate::header::{DescrHeader, HEADER_SIZE};
use crate::mxn::{
    cosine_distances_direct, cosine_distances_unpack, DistanceMatrix, MacroPolicy, UnpackKernel,
};

/// Largest supported number of components per descriptor.
pub const MAX_SIZE: usize = 32768;

/// An engine bound to one descriptor size and depth.
///
/// Construction validates the shape and picks the backend once; every
/// operation after that is a pure function of its arguments. The engine is
/// plain data and can be shared between threads.
///
/// Records passed to an engine must be exactly [`DescrInt::encoded_size`]
/// bytes long. Passing anything else is a programming error and panics.
#[derive(Clone, Copy, Debug)]
pub struct DescrInt {
    size: usize,
    depth: Depth,
    encoded_size: usize,
    backend: Backend,
    profile: BackendProfile,
    kernel: Option<UnpackKernel>,
    policy: MacroPolicy,
}

impl DescrInt {
    /// Binds an engine with the default configuration.
    pub fn new(size: usize, depth: usize) -> Result<Self, EngineError> {
        Self::with_config(size, depth, &EngineConfig::default())
    }

    pub fn with_config(
        size: usize,
        depth: usize,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let depth = validate(size, depth)?;
        let backend = config.backend.unwrap_or_else(Backend::detect);

        let mut profile = backend.profile();
        if let Some(cache) = config.cache {
            for (level, bytes) in [("l1", cache.l1), ("l2", cache.l2), ("l3", cache.l3)] {
                if bytes == 0 {
                    return Err(EngineError::InvalidCache { level });
                }
            }
            profile.cache = cache;
        }

        if let Some(tile) = config.tile {
            if !tile.is_valid() {
                return Err(EngineError::InvalidTiling {
                    tile,
                    max_m: MAX_MICRO_M,
                    max_n: MAX_MICRO_N,
                });
            }
        }

        let kernel = profile
            .unpack_kernel(depth)
            .map(|(width, tile)| UnpackKernel {
                width,
                tile: config.tile.unwrap_or(tile),
                cache: profile.cache,
            });

        let policy = match (config.policy, kernel) {
            (MacroPolicy::Unpack, None) => {
                tracing::warn!(
                    ?backend,
                    depth = depth.bits(),
                    "No unpack kernel for this depth, falling back to direct policy"
                );
                MacroPolicy::Direct
            }
            (policy, _) => policy,
        };

        let engine = DescrInt {
            size,
            depth,
            encoded_size: HEADER_SIZE + depth.packed_len(size),
            backend,
            profile,
            kernel,
            policy,
        };
        tracing::debug!(
            size,
            depth = depth.bits(),
            ?backend,
            ?policy,
            tile = ?kernel.map(|k| k.tile),
            width = ?kernel.map(|k| k.width),
            macro_m = kernel.map(|k| k.macro_m(size)),
            macro_n = kernel.map(|k| k.macro_n(size)),
            "Bound descrint engine"
        );
        Ok(engine)
    }

    /// Whether `new(size, depth)` succeeds.
    pub fn valid(size: usize, depth: usize) -> bool {
        validate(size, depth).is_ok()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn depth(&self) -> usize {
        self.depth.bits()
    }

    /// Byte length of one record: the 16-byte header plus the packed payload.
    pub fn encoded_size(&self) -> usize {
        self.encoded_size
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    /// Micro tile of the unpack kernel, if the backend has one for this depth.
    pub fn micro_tile(&self) -> Option<MicroTile> {
        self.kernel.map(|k| k.tile)
    }

    pub fn encode(&self, src: &[f32]) -> Vec<u8> {
        let mut dst = vec![0u8; self.encoded_size];
        self.encode_into(src, &mut dst);
        dst
    }

    pub fn encode_into(&self, src: &[f32], dst: &mut [u8]) {
        self.check_source(src.len());
        self.check_record(dst);
        encode_f32(self.depth, src, dst);
    }

    pub fn encode_f16(&self, src: &[f16]) -> Vec<u8> {
        self.check_source(src.len());
        let mut dst = vec![0u8; self.encoded_size];
        encode_f16(self.depth, src, &mut dst);
        dst
    }

    pub fn decode(&self, record: &[u8]) -> Vec<f32> {
        let mut dst = vec![0f32; self.size];
        self.decode_into(record, &mut dst);
        dst
    }

    pub fn decode_into(&self, record: &[u8], dst: &mut [f32]) {
        self.check_record(record);
        self.check_source(dst.len());
        decode_f32(self.depth, record, dst);
    }

    pub fn decode_f16(&self, record: &[u8]) -> Vec<f16> {
        self.check_record(record);
        let mut dst = vec![f16::ZERO; self.size];
        decode_f16(self.depth, record, &mut dst);
        dst
    }

    /// Euclidean norm of the reconstruction, as stored in the header.
    pub fn norm(&self, record: &[u8]) -> f32 {
        self.check_record(record);
        DescrHeader::read(record).norm
    }

    pub fn cosine_distance(&self, a: &[u8], b: &[u8]) -> f32 {
        self.check_record(a);
        self.check_record(b);
        correlate::cosine_distance(self.depth, a, b)
    }

    /// Policy an `m × n` call runs under.
    pub fn policy_for(&self, m: usize, n: usize) -> MacroPolicy {
        match (self.policy, self.kernel) {
            (_, None) | (MacroPolicy::Direct, _) => MacroPolicy::Direct,
            (MacroPolicy::Unpack, Some(_)) => MacroPolicy::Unpack,
            (MacroPolicy::Auto, Some(kernel)) => kernel.select(self.size, m, n),
        }
    }

    /// Writes the cosine distance of `a[i]` and `b[j]` to `out[i * stride + j]`.
    ///
    /// Entries of `out` outside the `a.len() × b.len()` block are untouched.
    pub fn cosine_distances_mxn(&self, a: &[&[u8]], b: &[&[u8]], out: &mut [f32], stride: usize) {
        let (m, n) = (a.len(), b.len());
        for record in a.iter().chain(b) {
            self.check_record(record);
        }
        if m == 0 || n == 0 {
            return;
        }
        assert!(
            stride >= n,
            "Output stride {stride} is smaller than the {n} columns"
        );
        let required = (m - 1) * stride + n;
        assert!(
            out.len() >= required,
            "Output holds {} values, {m}x{n} with stride {stride} needs {required}",
            out.len()
        );

        let policy = self.policy_for(m, n);
        tracing::trace!(m, n, ?policy, "cosine distances");
        let mut out = DistanceMatrix { data: out, stride };
        match (policy, &self.kernel) {
            (MacroPolicy::Unpack, Some(kernel)) => {
                cosine_distances_unpack(self.depth, self.size, kernel, a, b, &mut out)
            }
            _ => cosine_distances_direct(self.depth, a, b, &mut out),
        }
    }

    /// Same as [`DescrInt::cosine_distances_mxn`] with each batch given as
    /// one contiguous buffer of records.
    pub fn cosine_distances_mxn_flat(&self, a: &[u8], b: &[u8], out: &mut [f32], stride: usize) {
        let a = self.split_records(a);
        let b = self.split_records(b);
        self.cosine_distances_mxn(&a, &b, out, stride);
    }

    /// Freshly allocated `a.len() × b.len()` distance matrix, row-major.
    pub fn cosine_distance_matrix(&self, a: &[&[u8]], b: &[&[u8]]) -> Vec<f32> {
        let mut out = vec![0f32; a.len() * b.len()];
        self.cosine_distances_mxn(a, b, &mut out, b.len());
        out
    }

    fn split_records<'a>(&self, buffer: &'a [u8]) -> Vec<&'a [u8]> {
        assert!(
            buffer.len() % self.encoded_size == 0,
            "Buffer of {} bytes is not a whole number of {}-byte records",
            buffer.len(),
            self.encoded_size
        );
        buffer.chunks_exact(self.encoded_size).collect()
    }

    fn check_source(&self, len: usize) {
        assert_eq!(
            len, self.size,
            "Descriptor has {len} components, engine expects {}",
            self.size
        );
    }

    fn check_record(&self, record: &[u8]) {
        assert_eq!(
            record.len(),
            self.encoded_size,
            "Record has {} bytes, engine expects {}",
            record.len(),
            self.encoded_size
        );
    }
}

fn validate(size: usize, depth: usize) -> Result<Depth, EngineError> {
    if size == 0 || size % 8 != 0 || size > MAX_SIZE {
        return Err(EngineError::InvalidSize(size));
    }
    Depth::new(depth).ok_or(EngineError::InvalidDepth(depth))
}
