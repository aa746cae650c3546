// Dot product and norm kernels used by scoring and the flat index.
// AVX2/FMA on x86_64 when the dimension is wide enough, scalar otherwise.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "x86_64")]
const MIN_DIM_AVX: usize = 32;

/// Inner product of two equal-length slices.
///
/// Mismatched lengths return 0.0; callers validate dimensions at load time
/// so this only guards against misuse.
#[inline]
pub fn dot_product_simd(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if a.len() >= MIN_DIM_AVX
            && is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma")
        {
            return unsafe { dot_product_avx2(a, b) };
        }
    }

    dot_product_scalar(a, b)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn dot_product_avx2(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let mut acc_lo = _mm256_setzero_ps();
    let mut acc_hi = _mm256_setzero_ps();
    let mut i = 0;

    while i + 16 <= len {
        let a0 = _mm256_loadu_ps(a.as_ptr().add(i));
        let b0 = _mm256_loadu_ps(b.as_ptr().add(i));
        let a1 = _mm256_loadu_ps(a.as_ptr().add(i + 8));
        let b1 = _mm256_loadu_ps(b.as_ptr().add(i + 8));
        acc_lo = _mm256_fmadd_ps(a0, b0, acc_lo);
        acc_hi = _mm256_fmadd_ps(a1, b1, acc_hi);
        i += 16;
    }

    let acc = _mm256_add_ps(acc_lo, acc_hi);
    let mut lanes = [0.0f32; 8];
    _mm256_storeu_ps(lanes.as_mut_ptr(), acc);
    let mut sum: f32 = lanes.iter().sum();

    while i < len {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

/// Scalar fallback with two accumulators so the adds pipeline.
#[inline]
fn dot_product_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut even = 0.0f32;
    let mut odd = 0.0f32;

    let mut pairs_a = a.chunks_exact(2);
    let mut pairs_b = b.chunks_exact(2);
    for (pa, pb) in (&mut pairs_a).zip(&mut pairs_b) {
        even += pa[0] * pb[0];
        odd += pa[1] * pb[1];
    }
    for (x, y) in pairs_a.remainder().iter().zip(pairs_b.remainder()) {
        even += x * y;
    }
    even + odd
}

#[inline]
pub fn norm_squared_simd(v: &[f32]) -> f32 {
    dot_product_simd(v, v)
}

#[inline]
pub fn norm_simd(v: &[f32]) -> f32 {
    norm_squared_simd(v).sqrt()
}
