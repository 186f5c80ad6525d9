//! M×N cosine distance matrix between two batches of encoded records.
//!
//! Two policies compute the same reduction:
//!
//! - [`MacroPolicy::Direct`]: every entry is one call of the pairwise
//!   correlator on the packed records.
//! - [`MacroPolicy::Unpack`]: A is split into row blocks of at most `macro_m`
//!   records (bounded by the L2 budget), B into column blocks of at most
//!   `macro_n` records (bounded by the L3 budget). Each block is unpacked once
//!   and a micro-kernel accumulates integer correlations for tiles of
//!   `tile.m × tile.n` entries, then decodes a whole tile row at once.
//!
//! The integer correlation of a pair is the same under both policies, and
//! both decode it through [`decode_cosine_distance`], so the matrices agree.

use serde::{Deserialize, Serialize};

use crate::backend::{CacheBudget, MicroTile, ScratchWidth, MAX_MICRO_M, MAX_MICRO_N};
use crate::correlate::{cosine_distance, decode_cosine_distance};
use crate::depth::Depth;
use crate::header::DescrHeader;
use crate::unpack::{
    unpack_data_a, unpack_data_b, unpack_norm_a, unpack_norm_b, HeaderPlanes, RowScratch,
    TileScratch, UnpackElem,
};

/// How an M×N call is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroPolicy {
    /// Pick per call from the problem shape and cache budgets.
    #[default]
    Auto,
    Direct,
    Unpack,
}

/// Unpack kernel bound for one (backend, depth) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnpackKernel {
    pub width: ScratchWidth,
    pub tile: MicroTile,
    pub cache: CacheBudget,
}

impl UnpackKernel {
    /// Bytes of one unpacked record.
    pub fn row_bytes(&self, size: usize) -> usize {
        size * self.width.bytes()
    }

    /// Decides between the direct and the unpack path for an `m × n` call.
    pub fn select(&self, size: usize, m: usize, n: usize) -> MacroPolicy {
        let row_bytes = self.row_bytes(size);
        if row_bytes * self.tile.n > self.cache.l1 {
            return MacroPolicy::Direct;
        }
        if n * 2 < self.tile.n || m * 2 < self.tile.m {
            return MacroPolicy::Direct;
        }
        MacroPolicy::Unpack
    }

    /// Largest row block of A, a multiple of the tile height.
    pub fn macro_m(&self, size: usize) -> usize {
        align_lo(self.cache.l2 / self.row_bytes(size), self.tile.m).max(self.tile.m)
    }

    /// Largest column block of B, a multiple of the tile width.
    pub fn macro_n(&self, size: usize) -> usize {
        align_lo(self.cache.l3 / self.row_bytes(size), self.tile.n).max(self.tile.n)
    }
}

fn align_lo(value: usize, align: usize) -> usize {
    value / align * align
}

/// Destination of an M×N call: row `i` starts at `i * stride`.
pub struct DistanceMatrix<'a> {
    pub data: &'a mut [f32],
    pub stride: usize,
}

impl DistanceMatrix<'_> {
    fn row(&mut self, i: usize, first: usize, len: usize) -> &mut [f32] {
        let start = i * self.stride + first;
        &mut self.data[start..start + len]
    }
}

/// Direct policy: one pairwise correlation per entry.
pub fn cosine_distances_direct(
    depth: Depth,
    a: &[&[u8]],
    b: &[&[u8]],
    out: &mut DistanceMatrix<'_>,
) {
    for (i, record_a) in a.iter().enumerate() {
        let row = out.row(i, 0, b.len());
        for (dst, record_b) in row.iter_mut().zip(b) {
            *dst = cosine_distance(depth, record_a, record_b);
        }
    }
}

/// Unpack-then-block policy.
pub fn cosine_distances_unpack(
    depth: Depth,
    size: usize,
    kernel: &UnpackKernel,
    a: &[&[u8]],
    b: &[&[u8]],
    out: &mut DistanceMatrix<'_>,
) {
    match kernel.width {
        ScratchWidth::Byte => blocked::<u8>(depth, size, kernel, a, b, out),
        ScratchWidth::Word => blocked::<u16>(depth, size, kernel, a, b, out),
    }
}

fn blocked<T: UnpackElem>(
    depth: Depth,
    size: usize,
    kernel: &UnpackKernel,
    a: &[&[u8]],
    b: &[&[u8]],
    out: &mut DistanceMatrix<'_>,
) {
    let (m, n) = (a.len(), b.len());
    let tile = kernel.tile;
    let macro_m = kernel.macro_m(size);
    let macro_n = kernel.macro_n(size);
    tracing::trace!(m, n, macro_m, macro_n, tile_m = tile.m, tile_n = tile.n, "unpack policy");

    let block_a = macro_m.min(m);
    let block_b = macro_n.min(n);
    let mut data_a = RowScratch::<T>::with_capacity(block_a, size);
    let mut data_b = TileScratch::<T>::with_capacity(block_b, size, tile.n);
    let mut norms_a = Vec::with_capacity(block_a);
    let mut norms_b = HeaderPlanes::with_capacity(block_b);

    for i in (0..m).step_by(macro_m) {
        let rows = &a[i..(i + macro_m).min(m)];
        unpack_norm_a(rows, &mut norms_a);
        unpack_data_a(depth, rows, &mut data_a);
        for j in (0..n).step_by(macro_n) {
            let cols = &b[j..(j + macro_n).min(n)];
            unpack_norm_b(cols, &mut norms_b);
            unpack_data_b(depth, cols, &mut data_b);
            macro_correlation(
                size,
                tile,
                &data_a,
                &norms_a,
                &data_b,
                &norms_b,
                out,
                (i, j),
            );
        }
    }
}

/// Runs the micro-kernel over every tile of one unpacked (A block, B block)
/// pair and writes the decoded distances at `origin` of `out`.
#[allow(clippy::too_many_arguments)]
fn macro_correlation<T: UnpackElem>(
    size: usize,
    tile: MicroTile,
    data_a: &RowScratch<T>,
    norms_a: &[DescrHeader],
    data_b: &TileScratch<T>,
    norms_b: &HeaderPlanes,
    out: &mut DistanceMatrix<'_>,
    origin: (usize, usize),
) {
    let rows = data_a.rows();
    let cols = norms_b.len();
    for t in 0..data_b.tiles() {
        let col = t * tile.n;
        let tile_cols = tile.n.min(cols - col);
        for row in (0..rows).step_by(tile.m) {
            let tile_rows = tile.m.min(rows - row);
            let acc = micro_correlation(
                size,
                tile_rows,
                data_a.rows_from(row),
                data_b.tile(t),
                tile.n,
            );
            for (r, acc_row) in acc.iter().take(tile_rows).enumerate() {
                let header_a = &norms_a[row + r];
                let dst = out.row(origin.0 + row + r, origin.1 + col, tile_cols);
                decode_cosine_distances_1xn(header_a, norms_b, col, &acc_row[..tile_cols], dst);
            }
        }
    }
}

/// Integer correlations of `rows` A rows against one interleaved B tile.
///
/// `a` holds the rows back to back, `b` is `size` runs of `width` values.
#[inline]
fn micro_correlation<T: UnpackElem>(
    size: usize,
    rows: usize,
    a: &[T],
    b: &[T],
    width: usize,
) -> [[u32; MAX_MICRO_N]; MAX_MICRO_M] {
    let mut acc = [[0u32; MAX_MICRO_N]; MAX_MICRO_M];
    for (k, run) in b.chunks_exact(width).take(size).enumerate() {
        for (r, acc_row) in acc.iter_mut().take(rows).enumerate() {
            let value: u32 = a[r * size + k].into();
            for (sum, &other) in acc_row[..width].iter_mut().zip(run) {
                let other: u32 = other.into();
                *sum += value * other;
            }
        }
    }
    acc
}

/// Decodes one tile row of correlations against consecutive B columns.
#[inline]
fn decode_cosine_distances_1xn(
    a: &DescrHeader,
    b: &HeaderPlanes,
    first: usize,
    ab: &[u32],
    dst: &mut [f32],
) {
    for (c, (dst, &ab)) in dst.iter_mut().zip(ab).enumerate() {
        *dst = decode_cosine_distance(ab, a, &b.get(first + c));
    }
}
