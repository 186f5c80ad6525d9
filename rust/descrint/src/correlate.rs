//! Cosine distance between two encoded records.
//!
//! ## Dot product estimation
//!
//! Each record reconstructs component `i` as `a[i] = α_a · c_a[i] + m_a`,
//! where `α` is `inv_scale`, `m` is `min` and `c` the integer code. Then:
//!
//! ```text
//! ⟨a, b⟩ = Σ (α_a·c_a[i] + m_a) · (α_b·c_b[i] + m_b)
//!        = α_a·α_b·Σc_a[i]·c_b[i] + α_a·m_b·Σc_a[i] + α_b·m_a·Σc_b[i] + N·m_a·m_b
//! ```
//!
//! With the stored `sum_term = α·Σc + 0.5·N·m` the last three terms are
//!
//! ```text
//! sum_term_a · m_b + sum_term_b · m_a
//!   = α_a·m_b·Σc_a + 0.5·N·m_a·m_b + α_b·m_a·Σc_b + 0.5·N·m_a·m_b
//! ```
//!
//! so only the integer correlation `Σc_a[i]·c_b[i]` has to be computed per
//! pair. Both the pairwise path here and the blocked kernels in
//! [`crate::mxn`] finish through [`decode_cosine_distance`].
//!
//! ## Distance
//!
//! ```text
//! Cosine: 1 - ⟨a, b⟩ / (‖a‖ · ‖b‖), clamped to [0, 2]
//! ```

use crate::bitpack;
use crate::depth::Depth;
use crate::header::{DescrHeader, HEADER_SIZE};

/// Integer correlation `Σ a[i] · b[i]` of two packed payloads.
///
/// Iterates both streams group by group, never holding more than 8 unpacked
/// values per side.
pub fn correlation(depth: Depth, a: &[u8], b: &[u8]) -> u32 {
    if depth.bits() == 8 {
        return a
            .iter()
            .zip(b)
            .map(|(&x, &y)| u32::from(x) * u32::from(y))
            .sum();
    }
    bitpack::groups(depth, a)
        .zip(bitpack::groups(depth, b))
        .map(|(ga, gb)| {
            ga.iter()
                .zip(&gb)
                .map(|(&x, &y)| u32::from(x) * u32::from(y))
                .sum::<u32>()
        })
        .sum()
}

/// Converts an integer correlation into a cosine distance using both headers.
#[inline]
pub fn decode_cosine_distance(ab: u32, a: &DescrHeader, b: &DescrHeader) -> f32 {
    // Grouped so that swapping `a` and `b` gives the same bits.
    let dot = ab as f32 * (a.inv_scale * b.inv_scale) + (a.sum_term * b.min + b.sum_term * a.min);
    let denominator = (a.norm * b.norm).max(f32::EPSILON);
    (1.0 - dot / denominator).clamp(0.0, 2.0)
}

/// Cosine distance between two complete records.
pub fn cosine_distance(depth: Depth, a: &[u8], b: &[u8]) -> f32 {
    let ab = correlation(depth, &a[HEADER_SIZE..], &b[HEADER_SIZE..]);
    decode_cosine_distance(ab, &DescrHeader::read(a), &DescrHeader::read(b))
}
