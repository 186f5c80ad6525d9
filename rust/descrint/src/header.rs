//! Fixed 16-byte metadata stored in front of every encoded descriptor.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

/// Byte length of [`DescrHeader`].
pub const HEADER_SIZE: usize = size_of::<DescrHeader>();

/// Per-descriptor metadata. 16 bytes.
///
/// | Offset | Field        | Meaning                                 |
/// |--------|--------------|-----------------------------------------|
/// | 0      | `inv_scale`  | decode multiplier, `1 / scale`          |
/// | 4      | `min`        | additive shift                          |
/// | 8      | `sum_term`   | `Σcode · inv_scale + 0.5 · N · min`     |
/// | 12     | `norm`       | L2 norm of the quantized reconstruction |
///
/// Read and written via `bytemuck::pod_read_unaligned` / `bytemuck::bytes_of`
/// on the raw record buffer, so the layout is `#[repr(C)]` and `Pod`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DescrHeader {
    pub inv_scale: f32,
    pub min: f32,
    pub sum_term: f32,
    pub norm: f32,
}

impl DescrHeader {
    /// Reads the header from the first 16 bytes of `record`.
    pub fn read(record: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&record[..HEADER_SIZE])
    }

    /// Writes the header into the first 16 bytes of `record`.
    pub fn write(&self, record: &mut [u8]) {
        record[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(self));
    }

    /// Reconstructs one component from its integer code.
    #[inline]
    pub fn dequantize(&self, code: u8) -> f32 {
        f32::from(code) * self.inv_scale + self.min
    }
}
