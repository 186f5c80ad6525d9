//! Scalar quantization of a float descriptor into an encoded record.
//!
//! For a descriptor `x` of `N` components and depth `B`:
//!
//! ```text
//! width     = max(max - min, EPS)
//! scale     = (2^B - 1) / width
//! code[i]   = round((x[i] - min) * scale)
//! inv_scale = 1 / scale
//! sum_term  = Σcode · inv_scale + 0.5 · N · min
//! norm      = sqrt(Σcode² · inv_scale² + 2 · Σcode · inv_scale · min + N · min²)
//! ```
//!
//! `norm` is the L2 norm of the reconstruction `code · inv_scale + min`, not of
//! the original floats. `sum_term` is arranged so that the cross terms of a dot
//! product between two reconstructions collapse to
//! `sum_term_a · min_b + sum_term_b · min_a` (see [`crate::correlate`]).

use half::f16;

use crate::bitpack;
use crate::depth::Depth;
use crate::header::{DescrHeader, HEADER_SIZE};

/// Minimum width of the quantization range, avoids dividing by zero on
/// constant descriptors.
pub const EPS: f32 = 1e-6;

/// Integer statistics accumulated while quantizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CodeStats {
    pub sum: u32,
    pub sqsum: u64,
}

/// Returns `(min, max)` over `src`.
pub fn min_max(src: &[f32]) -> (f32, f32) {
    src.iter()
        .fold((f32::MAX, -f32::MAX), |(min, max), &x| (min.min(x), max.max(x)))
}

/// Quantizes `src` into integer codes and returns their statistics.
pub fn quantize(src: &[f32], scale: f32, min: f32, range: u32, codes: &mut [u8]) -> CodeStats {
    let top = range as f32;
    let mut stats = CodeStats::default();
    for (code, &x) in codes.iter_mut().zip(src) {
        let value = ((x - min) * scale).round().clamp(0.0, top) as u32;
        stats.sum += value;
        stats.sqsum += u64::from(value * value);
        *code = value as u8;
    }
    stats
}

/// Builds the header for a descriptor of `size` components.
pub fn header(inv_scale: f32, min: f32, size: usize, stats: CodeStats) -> DescrHeader {
    let inv_scale_d = f64::from(inv_scale);
    let min_d = f64::from(min);
    let sum = f64::from(stats.sum);
    let sqsum = stats.sqsum as f64;
    let size = size as f64;

    let sum_term = sum * inv_scale_d + 0.5 * size * min_d;
    let norm_sq = sqsum * inv_scale_d * inv_scale_d
        + 2.0 * sum * inv_scale_d * min_d
        + size * min_d * min_d;

    DescrHeader {
        inv_scale,
        min,
        sum_term: sum_term as f32,
        // Cancellation can push a near-zero radicand below zero.
        norm: norm_sq.max(0.0).sqrt() as f32,
    }
}

/// Encodes `src` into `dst`, which must be `16 + depth.packed_len(src.len())`
/// bytes long.
pub fn encode_f32(depth: Depth, src: &[f32], dst: &mut [u8]) {
    let size = src.len();
    let (min, max) = min_max(src);
    // Kept as a width: `min + EPS` rounds back to `min` once |min| >= 32.
    let width = (max - min).max(EPS);
    let scale = depth.range() as f32 / width;
    let inv_scale = 1.0 / scale;

    let mut codes = vec![0u8; size];
    let stats = quantize(src, scale, min, depth.range(), &mut codes);
    bitpack::pack(depth, &codes, &mut dst[HEADER_SIZE..]);
    header(inv_scale, min, size, stats).write(dst);
}

/// Encodes a half precision descriptor by widening it to `f32` first.
pub fn encode_f16(depth: Depth, src: &[f16], dst: &mut [u8]) {
    let widened = src.iter().map(|x| x.to_f32()).collect::<Vec<_>>();
    encode_f32(depth, &widened, dst);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(bits: usize) -> Depth {
        Depth::new(bits).unwrap()
    }

    fn encoded_size(depth: Depth, size: usize) -> usize {
        HEADER_SIZE + depth.packed_len(size)
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(&[3.0, -1.0, 2.0, 7.5]), (-1.0, 7.5));
    }

    #[test]
    fn test_ramp_depth_4() {
        let src = (0..8).map(|i| i as f32).collect::<Vec<_>>();
        let mut dst = vec![0u8; encoded_size(depth(4), 8)];
        encode_f32(depth(4), &src, &mut dst);
        assert_eq!(dst.len(), 20);

        let header = DescrHeader::read(&dst);
        assert!((1.0 / header.inv_scale - 15.0 / 7.0).abs() < 1e-5);
        assert_eq!(header.min, 0.0);

        let mut codes = [0u8; 8];
        bitpack::unpack(depth(4), &dst[HEADER_SIZE..], &mut codes);
        // round(i * 15 / 7)
        assert_eq!(codes, [0, 2, 4, 6, 9, 11, 13, 15]);

        let sum = codes.iter().map(|&c| c as f32).sum::<f32>();
        assert!((header.sum_term - sum * header.inv_scale).abs() < 1e-4);
        let norm = codes
            .iter()
            .map(|&c| (c as f32 * header.inv_scale).powi(2))
            .sum::<f32>()
            .sqrt();
        assert!((header.norm - norm).abs() < 1e-4);
    }

    #[test]
    fn test_constant_descriptor() {
        let src = vec![3.25f32; 16];
        let mut dst = vec![0u8; encoded_size(depth(6), 16)];
        encode_f32(depth(6), &src, &mut dst);
        let header = DescrHeader::read(&dst);
        assert!(header.inv_scale > 0.0 && header.inv_scale.is_finite());
        assert_eq!(header.min, 3.25);
        assert!(dst[HEADER_SIZE..].iter().all(|&b| b == 0));
        assert!((header.norm - 3.25 * 4.0).abs() < 1e-4);
        assert!((header.sum_term - 0.5 * 16.0 * 3.25).abs() < 1e-4);
    }

    #[test]
    fn test_large_constant_descriptor_keeps_finite_scale() {
        for value in [32.0f32, 100.0, 1e6, -1e6] {
            let src = vec![value; 16];
            for bits in 4..=8 {
                let d = depth(bits);
                let mut dst = vec![0u8; encoded_size(d, 16)];
                encode_f32(d, &src, &mut dst);
                let header = DescrHeader::read(&dst);
                assert!(
                    header.inv_scale > 0.0 && header.inv_scale.is_finite(),
                    "constant {value} depth {bits}: inv_scale {}",
                    header.inv_scale
                );
                assert_eq!(header.min, value);
                assert!(dst[HEADER_SIZE..].iter().all(|&b| b == 0));
                assert!(header.norm.is_finite());
            }
        }
    }

    #[test]
    fn test_zero_descriptor_has_zero_norm() {
        let src = vec![0.0f32; 8];
        let mut dst = vec![0u8; encoded_size(depth(8), 8)];
        encode_f32(depth(8), &src, &mut dst);
        let header = DescrHeader::read(&dst);
        assert_eq!(header.norm, 0.0);
        assert!(!header.norm.is_nan());
    }

    #[test]
    fn test_codes_within_range() {
        let src = (0..32)
            .map(|i| if i % 2 == 0 { 1e6 } else { -1e6 })
            .collect::<Vec<f32>>();
        for bits in 4..=8 {
            let d = depth(bits);
            let mut dst = vec![0u8; encoded_size(d, src.len())];
            encode_f32(d, &src, &mut dst);
            let mut codes = vec![0u8; src.len()];
            bitpack::unpack(d, &dst[HEADER_SIZE..], &mut codes);
            assert!(codes.iter().all(|&c| u32::from(c) <= d.range()));
            assert!(codes.contains(&(d.range() as u8)));
        }
    }

    #[test]
    fn test_f16_matches_f32() {
        let src = (0..24).map(|i| (i as f32 - 12.0) * 0.125).collect::<Vec<_>>();
        let half = src.iter().map(|&x| f16::from_f32(x)).collect::<Vec<_>>();
        let mut a = vec![0u8; encoded_size(depth(7), 24)];
        let mut b = vec![0u8; encoded_size(depth(7), 24)];
        encode_f32(depth(7), &src, &mut a);
        encode_f16(depth(7), &half, &mut b);
        // Multiples of 1/8 in this range are exact in f16.
        assert_eq!(a, b);
    }
}
