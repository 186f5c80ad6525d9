//! Reconstruction of approximate float values from an encoded record.

use half::f16;

use crate::bitpack;
use crate::depth::Depth;
use crate::header::{DescrHeader, HEADER_SIZE};

/// Decodes `record` into `dst`: `dst[i] = code[i] * inv_scale + min`.
pub fn decode_f32(depth: Depth, record: &[u8], dst: &mut [f32]) {
    let header = DescrHeader::read(record);
    let payload = &record[HEADER_SIZE..];
    for (out, group) in dst
        .chunks_exact_mut(bitpack::GROUP)
        .zip(bitpack::groups(depth, payload))
    {
        for (out, code) in out.iter_mut().zip(group) {
            *out = header.dequantize(code);
        }
    }
}

/// Decodes `record` into half precision values.
pub fn decode_f16(depth: Depth, record: &[u8], dst: &mut [f16]) {
    let header = DescrHeader::read(record);
    let payload = &record[HEADER_SIZE..];
    for (out, group) in dst
        .chunks_exact_mut(bitpack::GROUP)
        .zip(bitpack::groups(depth, payload))
    {
        for (out, code) in out.iter_mut().zip(group) {
            *out = f16::from_f32(header.dequantize(code));
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::encode::{encode_f32, min_max};

    fn roundtrip(bits: usize, src: &[f32]) -> Vec<f32> {
        let depth = Depth::new(bits).unwrap();
        let mut record = vec![0u8; HEADER_SIZE + depth.packed_len(src.len())];
        encode_f32(depth, src, &mut record);
        let mut out = vec![0f32; src.len()];
        decode_f32(depth, &record, &mut out);
        out
    }

    #[test]
    fn test_ramp_depth_4_within_one_step() {
        let src = (0..8).map(|i| i as f32).collect::<Vec<_>>();
        let out = roundtrip(4, &src);
        let step = 7.0 / 15.0;
        for (x, y) in src.iter().zip(&out) {
            assert!((x - y).abs() <= step + 1e-5, "{x} decoded as {y}");
        }
        assert_eq!(out[0], 0.0);
        assert!((out[7] - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_depth_8_within_half_step() {
        let mut rng = StdRng::seed_from_u64(11);
        let src = (0..256).map(|_| rng.gen_range(-3.0..3.0)).collect::<Vec<f32>>();
        let (min, max) = min_max(&src);
        let half_step = 0.5 * (max - min) / 255.0;
        let out = roundtrip(8, &src);
        for (x, y) in src.iter().zip(&out) {
            assert!((x - y).abs() <= half_step * 1.001 + 1e-6, "{x} decoded as {y}");
        }
    }

    #[test]
    fn test_error_bound_all_depths() {
        let mut rng = StdRng::seed_from_u64(42);
        for bits in 4..=8 {
            let src = (0..512)
                .map(|_| rng.gen_range(-10.0..10.0))
                .collect::<Vec<f32>>();
            let (min, max) = min_max(&src);
            let step = (max - min) / ((1 << bits) - 1) as f32;
            let out = roundtrip(bits, &src);
            let worst = src
                .iter()
                .zip(&out)
                .map(|(x, y)| (x - y).abs())
                .fold(0.0f32, f32::max);
            assert!(worst <= step, "depth {bits}: error {worst} over step {step}");
        }
    }

    #[test]
    fn test_f16_decode() {
        let depth = Depth::new(5).unwrap();
        let src = (0..16).map(|i| i as f32 * 0.5).collect::<Vec<_>>();
        let mut record = vec![0u8; HEADER_SIZE + depth.packed_len(16)];
        encode_f32(depth, &src, &mut record);
        let mut wide = vec![0f32; 16];
        let mut narrow = vec![f16::ZERO; 16];
        decode_f32(depth, &record, &mut wide);
        decode_f16(depth, &record, &mut narrow);
        for (w, n) in wide.iter().zip(&narrow) {
            assert_eq!(f16::from_f32(*w), *n);
        }
    }
}
