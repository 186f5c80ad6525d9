//! Packing of unsigned `B`-bit integers, `B` in `4..=8`.
//!
//! Components are processed in groups of 8. A group of 8 `B`-bit values is
//! exactly `B` bytes, so groups are concatenated without padding and the
//! payload of `N` components (`N % 8 == 0`) is `N * B / 8` bytes.
//!
//! Inside a group the bits are laid out least-significant-bit first: value `i`
//! occupies bits `[i * B, (i + 1) * B)` of the little-endian integer formed
//! by the group's bytes, so a value may straddle a byte boundary:
//!
//! ```text
//! B = 6, values v0..v7:
//! byte 0 = v0[0..6] | v1[0..2] << 6
//! byte 1 = v1[2..6] | v2[0..4] << 4
//! byte 2 = v2[4..6] | v3[0..6] << 2
//! ...
//! ```
//!
//! For `B = 8` the mapping is the identity.
//!
//! This module knows nothing about scale or shift, it only moves integers.

use crate::depth::Depth;

/// Number of components in one packed group.
pub const GROUP: usize = 8;

const fn group_shifts() -> [[u32; GROUP]; 9] {
    let mut table = [[0u32; GROUP]; 9];
    let mut bits = 0;
    while bits < 9 {
        let mut i = 0;
        while i < GROUP {
            table[bits][i] = (i * bits) as u32;
            i += 1;
        }
        bits += 1;
    }
    table
}

const fn group_masks() -> [u64; 9] {
    let mut table = [0u64; 9];
    let mut bits = 0;
    while bits < 9 {
        table[bits] = (1u64 << bits) - 1;
        bits += 1;
    }
    table
}

/// Bit offset of each value inside a group, indexed by depth.
const GROUP_SHIFTS: [[u32; GROUP]; 9] = group_shifts();
/// Value mask, indexed by depth.
const GROUP_MASKS: [u64; 9] = group_masks();

/// Packs one group of 8 values into `depth.bits()` bytes of `dst`.
///
/// Bits above the depth are ignored.
#[inline]
pub fn pack_group(depth: Depth, group: &[u8], dst: &mut [u8]) {
    let bits = depth.bits();
    let shifts = &GROUP_SHIFTS[bits];
    let mask = GROUP_MASKS[bits];
    let word = group[..GROUP]
        .iter()
        .zip(shifts)
        .fold(0u64, |word, (&value, &shift)| {
            word | ((u64::from(value) & mask) << shift)
        });
    dst[..bits].copy_from_slice(&word.to_le_bytes()[..bits]);
}

/// Unpacks one group of 8 values from the first `depth.bits()` bytes of `src`.
#[inline]
pub fn unpack_group(depth: Depth, src: &[u8]) -> [u8; GROUP] {
    let bits = depth.bits();
    let mut bytes = [0u8; 8];
    bytes[..bits].copy_from_slice(&src[..bits]);
    let word = u64::from_le_bytes(bytes);
    let shifts = &GROUP_SHIFTS[bits];
    let mask = GROUP_MASKS[bits];
    std::array::from_fn(|i| ((word >> shifts[i]) & mask) as u8)
}

/// Packs `codes` into `dst`.
///
/// `codes.len()` must be a multiple of 8 and `dst` must hold at least
/// `depth.packed_len(codes.len())` bytes.
pub fn pack(depth: Depth, codes: &[u8], dst: &mut [u8]) {
    debug_assert_eq!(codes.len() % GROUP, 0);
    let len = depth.packed_len(codes.len());
    assert!(
        dst.len() >= len,
        "packed buffer holds {} bytes, {} required",
        dst.len(),
        len
    );
    if depth.bits() == 8 {
        dst[..len].copy_from_slice(codes);
        return;
    }
    for (group, out) in codes
        .chunks_exact(GROUP)
        .zip(dst.chunks_exact_mut(depth.bits()))
    {
        pack_group(depth, group, out);
    }
}

/// Unpacks `dst.len()` values from `src`, widening each to `T`.
///
/// `dst.len()` must be a multiple of 8.
pub fn unpack<T: From<u8>>(depth: Depth, src: &[u8], dst: &mut [T]) {
    debug_assert_eq!(dst.len() % GROUP, 0);
    let len = depth.packed_len(dst.len());
    assert!(
        src.len() >= len,
        "packed buffer holds {} bytes, {} required",
        src.len(),
        len
    );
    if depth.bits() == 8 {
        for (out, &value) in dst.iter_mut().zip(src) {
            *out = T::from(value);
        }
        return;
    }
    for (out, group) in dst
        .chunks_exact_mut(GROUP)
        .zip(src.chunks_exact(depth.bits()))
    {
        for (out, value) in out.iter_mut().zip(unpack_group(depth, group)) {
            *out = T::from(value);
        }
    }
}

/// Iterates over the groups of a packed payload without materializing it.
pub fn groups(depth: Depth, src: &[u8]) -> impl Iterator<Item = [u8; GROUP]> + '_ {
    src.chunks_exact(depth.bits())
        .map(move |group| unpack_group(depth, group))
}
