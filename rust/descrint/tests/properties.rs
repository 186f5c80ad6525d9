use descrint::{Backend, DescrInt, EngineConfig, MacroPolicy};
use proptest::prelude::*;

const BACKENDS: [Backend; 4] = [
    Backend::Scalar,
    Backend::Sse41,
    Backend::Avx2,
    Backend::Avx512bw,
];

/// (size, depth, descriptor) with `size` a multiple of 8.
fn descriptor() -> impl Strategy<Value = (usize, usize, Vec<f32>)> {
    (1usize..=32, 4usize..=8).prop_flat_map(|(groups, depth)| {
        let size = groups * 8;
        (
            Just(size),
            Just(depth),
            proptest::collection::vec(-100.0f32..100.0, size),
        )
    })
}

/// (size, depth, A batch, B batch, backend index).
fn batches() -> impl Strategy<Value = (usize, usize, Vec<Vec<f32>>, Vec<Vec<f32>>, usize)> {
    (1usize..=8, 4usize..=8).prop_flat_map(|(groups, depth)| {
        let size = groups * 8;
        let vector = proptest::collection::vec(-1.0f32..1.0, size);
        (
            Just(size),
            Just(depth),
            proptest::collection::vec(vector.clone(), 1..20),
            proptest::collection::vec(vector, 1..40),
            0usize..BACKENDS.len(),
        )
    })
}

proptest! {
    #[test]
    fn test_create_predicate(size in 0usize..40000, depth in 0usize..12) {
        let expected = size > 0 && size % 8 == 0 && size <= 32768 && (4..=8).contains(&depth);
        prop_assert_eq!(DescrInt::new(size, depth).is_ok(), expected);
        prop_assert_eq!(DescrInt::valid(size, depth), expected);
    }

    #[test]
    fn test_quantization_error_bound((size, depth, x) in descriptor()) {
        let engine = DescrInt::new(size, depth).unwrap();
        let decoded = engine.decode(&engine.encode(&x));
        let min = x.iter().copied().fold(f32::INFINITY, f32::min);
        let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let step = (max - min) / ((1u32 << depth) - 1) as f32;
        for (a, b) in x.iter().zip(&decoded) {
            prop_assert!((a - b).abs() <= step * 1.0001 + 1e-5, "{} decoded as {}, step {}", a, b, step);
        }
    }

    #[test]
    fn test_self_distance_near_zero((size, depth, x) in descriptor()) {
        let engine = DescrInt::new(size, depth).unwrap();
        let record = engine.encode(&x);
        let d = engine.cosine_distance(&record, &record);
        prop_assert!((0.0..1e-3).contains(&d), "self distance {}", d);
    }

    #[test]
    fn test_symmetry((size, depth, x) in descriptor(), seed in any::<u64>()) {
        let engine = DescrInt::new(size, depth).unwrap();
        let y = x
            .iter()
            .enumerate()
            .map(|(i, v)| v * ((seed >> (i % 64)) & 1) as f32 - (i % 5) as f32)
            .collect::<Vec<_>>();
        let (a, b) = (engine.encode(&x), engine.encode(&y));
        prop_assert_eq!(engine.cosine_distance(&a, &b), engine.cosine_distance(&b, &a));
    }

    #[test]
    fn test_distances_in_range((size, depth, x) in descriptor()) {
        let engine = DescrInt::new(size, depth).unwrap();
        let y = x.iter().rev().copied().collect::<Vec<_>>();
        let d = engine.cosine_distance(&engine.encode(&x), &engine.encode(&y));
        prop_assert!(d.is_finite());
        prop_assert!((0.0..=2.0).contains(&d));
    }

    #[test]
    fn test_mxn_matches_pairwise((size, depth, a, b, backend) in batches()) {
        for policy in [MacroPolicy::Direct, MacroPolicy::Unpack, MacroPolicy::Auto] {
            let config = EngineConfig {
                backend: Some(BACKENDS[backend]),
                policy,
                ..EngineConfig::default()
            };
            let engine = DescrInt::with_config(size, depth, &config).unwrap();
            let a = a.iter().map(|x| engine.encode(x)).collect::<Vec<_>>();
            let b = b.iter().map(|x| engine.encode(x)).collect::<Vec<_>>();
            let a = a.iter().map(Vec::as_slice).collect::<Vec<_>>();
            let b = b.iter().map(Vec::as_slice).collect::<Vec<_>>();

            let stride = b.len() + 3;
            let mut out = vec![-1.0f32; a.len() * stride];
            engine.cosine_distances_mxn(&a, &b, &mut out, stride);
            for (i, ra) in a.iter().enumerate() {
                for (j, rb) in b.iter().enumerate() {
                    let expected = engine.cosine_distance(ra, rb);
                    let actual = out[i * stride + j];
                    prop_assert!(
                        (expected - actual).abs() < 1e-4,
                        "{:?} {:?} [{}][{}]: {} vs {}", BACKENDS[backend], policy, i, j, expected, actual
                    );
                }
                prop_assert!(out[i * stride + b.len()..(i + 1) * stride].iter().all(|&x| x == -1.0));
            }
        }
    }
}
