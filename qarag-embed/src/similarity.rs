//! Vector similarity helpers

use half::f16;

/// Cosine similarity of two embeddings in `[-1, 1]`.
///
/// Returns 0 when either vector has zero norm or the lengths differ.
/// Accumulation happens in f32 so half-precision inputs do not lose range.
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        let x = x.to_f32();
        let y = y.to_f32();
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Scales `vector` to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f16]) {
    let norm = vector
        .iter()
        .map(|x| x.to_f32() * x.to_f32())
        .sum::<f32>()
        .sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value = f16::from_f32(value.to_f32() / norm);
        }
    }
}

/// Converts f32 model output into the f16 representation used for storage.
pub fn to_f16(vector: &[f32]) -> Vec<f16> {
    vector.iter().copied().map(f16::from_f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f32]) -> Vec<f16> {
        to_f16(values)
    }

    #[test]
    fn test_self_similarity_is_one() {
        for values in [&[1.0, 0.0, 0.0][..], &[0.3, -0.7, 2.5], &[5.0, 5.0]] {
            let vector = v(values);
            let similarity = cosine_similarity(&vector, &vector);
            assert!((similarity - 1.0).abs() < 1e-6, "{values:?} -> {similarity}");
        }
    }

    #[test]
    fn test_zero_vector_is_zero() {
        let zero = v(&[0.0, 0.0, 0.0]);
        assert_eq!(cosine_similarity(&zero, &v(&[1.0, 2.0, 3.0])), 0.0);
        assert_eq!(cosine_similarity(&v(&[1.0, 2.0, 3.0]), &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&v(&[1.0, 0.0]), &v(&[0.0, 1.0])), 0.0);
        assert_eq!(cosine_similarity(&v(&[1.0, 0.0]), &v(&[-1.0, 0.0])), -1.0);

        let similarity = cosine_similarity(&v(&[0.6, 0.8]), &v(&[0.8, 0.6]));
        assert!((similarity - 0.96).abs() < 0.01);
    }

    #[test]
    fn test_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&v(&[1.0, 2.0]), &v(&[1.0, 2.0, 3.0])), 0.0);
    }

    #[test]
    fn test_normalize() {
        let mut vector = v(&[3.0, 4.0]);
        normalize(&mut vector);
        assert!((vector[0].to_f32() - 0.6).abs() < 1e-3);
        assert!((vector[1].to_f32() - 0.8).abs() < 1e-3);

        let mut zero = v(&[0.0, 0.0]);
        normalize(&mut zero);
        assert_eq!(zero, v(&[0.0, 0.0]));
    }
}
