//! Utilities to approximate equality of floating point values.

use crate::matrix::Matrix;

/// Tolerance for host/device parity comparisons (the device path stages
/// through `f32`).
pub const DEVICE_PARITY_ERROR: f64 = 1e-8;

/// Tolerance for comparing analytic gradients against finite differences.
pub const FINITE_DIFF_ERROR: f64 = 1e-6;

/// Checks absolute distance within a tolerance.
pub trait RelativeEq<Rhs: ?Sized> {
    /// Whether `self` and `rhs` agree within `tol`.
    fn approx_eq(&self, rhs: &Rhs, tol: f64) -> bool;
}

impl RelativeEq<Self> for f64 {
    fn approx_eq(&self, rhs: &Self, tol: f64) -> bool {
        (self - rhs).abs() <= tol
    }
}

impl RelativeEq<Self> for [f64] {
    fn approx_eq(&self, rhs: &Self, tol: f64) -> bool {
        self.len() == rhs.len()
            && self
                .iter()
                .zip(rhs.iter())
                .all(|(a, b)| a.approx_eq(b, tol))
    }
}

impl RelativeEq<Self> for Matrix {
    fn approx_eq(&self, rhs: &Self, tol: f64) -> bool {
        self.rows() == rhs.rows()
            && self.cols() == rhs.cols()
            && self.as_slice().approx_eq(rhs.as_slice(), tol)
    }
}

/// Approximates equality based off the absolute difference.
pub fn approx_eq<A: RelativeEq<B> + ?Sized, B: ?Sized>(a: &A, b: &B, tol: f64) -> bool {
    a.approx_eq(b, tol)
}
