use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// Tolerance used when checking that a vector has unit L2 norm.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// A dense embedding vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Inner product; equals cosine similarity when both sides are unit length.
    #[inline]
    pub fn dot(&self, other: &Vector) -> f32 {
        crate::simd::dot_product_simd(&self.data, &other.data)
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        crate::simd::norm_simd(&self.data)
    }

    #[inline]
    pub fn is_unit(&self) -> bool {
        (self.norm() - 1.0).abs() <= UNIT_NORM_TOLERANCE
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Scale to unit length in place. Returns false and leaves the vector
    /// untouched when its norm is (numerically) zero or not finite.
    #[inline]
    pub fn normalize(&mut self) -> bool {
        let norm = self.norm();
        if !norm.is_finite() || norm <= f32::EPSILON {
            return false;
        }
        let inv = 1.0 / norm;
        for x in &mut self.data {
            *x *= inv;
        }
        true
    }

    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut v = self.clone();
        v.normalize();
        v
    }

    /// Elementwise mean of a non-empty set of equal-dimension vectors.
    ///
    /// Returns `None` for an empty input.
    pub fn mean<'a, I>(vectors: I) -> Option<Vector>
    where
        I: IntoIterator<Item = &'a Vector>,
    {
        let mut iter = vectors.into_iter();
        let first = iter.next()?;
        let mut sum = first.data.clone();
        let mut count = 1usize;
        for v in iter {
            for (acc, x) in sum.iter_mut().zip(&v.data) {
                *acc += x;
            }
            count += 1;
        }
        let inv = 1.0 / count as f32;
        for x in &mut sum {
            *x *= inv;
        }
        Some(Vector::new(sum))
    }
}

impl Add for &Vector {
    type Output = Vector;

    fn add(self, other: &Vector) -> Vector {
        assert_eq!(self.dim(), other.dim());
        Vector::new(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a + b)
                .collect(),
        )
    }
}

impl Mul<f32> for &Vector {
    type Output = Vector;

    fn mul(self, scalar: f32) -> Vector {
        Vector::new(self.data.iter().map(|x| x * scalar).collect())
    }
}
