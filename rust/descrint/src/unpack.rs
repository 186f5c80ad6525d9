//! Expansion of batches of encoded records into dense scratch buffers for the
//! blocked M×N kernel.
//!
//! Layouts, for records of `size` components:
//!
//! - A side ([`RowScratch`]): row-major, row `i` is the `size` codes of
//!   record `i`.
//! - B side ([`TileScratch`]): records are grouped into tiles of `width`
//!   (the micro tile width). Inside a tile the layout is component-major, so
//!   `tile[k * width + c]` is component `k` of record `c`. The micro-kernel
//!   reads one contiguous run of `width` values per component.
//! - Headers: A keeps one [`DescrHeader`] per row; B keeps the four header
//!   fields as separate planes ([`HeaderPlanes`]) indexed by column.
//!
//! A partial last B tile is padded by repeating the last record so that the
//! kernel always runs full-width tiles.

use crate::bitpack;
use crate::depth::Depth;
use crate::header::{DescrHeader, HEADER_SIZE};

/// Element of an unpacked scratch buffer.
pub trait UnpackElem: Copy + Default + From<u8> + Into<u32> {}

impl UnpackElem for u8 {}
impl UnpackElem for u16 {}

/// Row-major unpacked codes of the A side.
#[derive(Debug)]
pub struct RowScratch<T> {
    data: Vec<T>,
    size: usize,
    rows: usize,
}

impl<T: UnpackElem> RowScratch<T> {
    pub fn with_capacity(rows: usize, size: usize) -> Self {
        RowScratch {
            data: Vec::with_capacity(rows * size),
            size,
            rows: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[cfg(test)]
    fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// Rows `first..` as one contiguous slice.
    pub fn rows_from(&self, first: usize) -> &[T] {
        &self.data[first * self.size..]
    }
}

/// Component-major interleaved tiles of the B side.
#[derive(Debug)]
pub struct TileScratch<T> {
    data: Vec<T>,
    size: usize,
    width: usize,
    tiles: usize,
}

impl<T: UnpackElem> TileScratch<T> {
    pub fn with_capacity(records: usize, size: usize, width: usize) -> Self {
        TileScratch {
            data: Vec::with_capacity(records.div_ceil(width) * width * size),
            size,
            width,
            tiles: 0,
        }
    }

    pub fn tiles(&self) -> usize {
        self.tiles
    }

    pub fn tile(&self, t: usize) -> &[T] {
        let len = self.size * self.width;
        &self.data[t * len..(t + 1) * len]
    }
}

/// Header fields of the B side, one plane per field.
#[derive(Debug, Default)]
pub struct HeaderPlanes {
    pub inv_scale: Vec<f32>,
    pub min: Vec<f32>,
    pub sum_term: Vec<f32>,
    pub norm: Vec<f32>,
}

impl HeaderPlanes {
    pub fn with_capacity(records: usize) -> Self {
        HeaderPlanes {
            inv_scale: Vec::with_capacity(records),
            min: Vec::with_capacity(records),
            sum_term: Vec::with_capacity(records),
            norm: Vec::with_capacity(records),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.norm.len()
    }

    pub fn get(&self, j: usize) -> DescrHeader {
        DescrHeader {
            inv_scale: self.inv_scale[j],
            min: self.min[j],
            sum_term: self.sum_term[j],
            norm: self.norm[j],
        }
    }

    fn clear(&mut self) {
        self.inv_scale.clear();
        self.min.clear();
        self.sum_term.clear();
        self.norm.clear();
    }

    fn push(&mut self, header: DescrHeader) {
        self.inv_scale.push(header.inv_scale);
        self.min.push(header.min);
        self.sum_term.push(header.sum_term);
        self.norm.push(header.norm);
    }
}

/// Unpacks the payloads of `records` row by row into `dst`.
pub fn unpack_data_a<T: UnpackElem>(depth: Depth, records: &[&[u8]], dst: &mut RowScratch<T>) {
    let size = dst.size;
    dst.data.clear();
    dst.data.resize(records.len() * size, T::default());
    for (row, record) in dst.data.chunks_exact_mut(size).zip(records) {
        bitpack::unpack(depth, &record[HEADER_SIZE..], row);
    }
    dst.rows = records.len();
}

/// Unpacks the payloads of `records` into interleaved tiles of the scratch width.
pub fn unpack_data_b<T: UnpackElem>(depth: Depth, records: &[&[u8]], dst: &mut TileScratch<T>) {
    let (size, width) = (dst.size, dst.width);
    let tiles = records.len().div_ceil(width);
    dst.data.clear();
    dst.data.resize(tiles * width * size, T::default());
    dst.tiles = tiles;

    let Some(last) = records.last() else {
        return;
    };
    let mut row = vec![T::default(); size];
    for (t, tile) in dst.data.chunks_exact_mut(width * size).enumerate() {
        for c in 0..width {
            let record = records.get(t * width + c).unwrap_or(last);
            bitpack::unpack(depth, &record[HEADER_SIZE..], &mut row);
            for (k, &value) in row.iter().enumerate() {
                tile[k * width + c] = value;
            }
        }
    }
}

/// Copies the header of every record into `dst`, one per row.
pub fn unpack_norm_a(records: &[&[u8]], dst: &mut Vec<DescrHeader>) {
    dst.clear();
    dst.extend(records.iter().map(|record| DescrHeader::read(record)));
}

/// Copies the header fields of every record into column planes.
pub fn unpack_norm_b(records: &[&[u8]], dst: &mut HeaderPlanes) {
    dst.clear();
    for record in records {
        dst.push(DescrHeader::read(record));
    }
}
