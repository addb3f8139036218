//! The first `n` elements of a vector, for every value flavor.

use crate::check::{check_vector, check_vector_index, MathError};
use crate::expr::{DeviceVar, Expr};
use crate::matrix::Matrix;
use crate::tape::{Edge, MatVar};

const FUNCTION: &str = "head";

/// Values supporting the `head` operation.
pub trait Head {
    type Output;

    /// The first `n` elements, oriented like the source.
    fn head(&self, n: usize) -> Result<Self::Output, MathError>;
}

/// Returns the first `n` elements of a row or column vector, preserving
/// the source orientation.
///
/// `n = 0` is valid and yields an empty result; `n` greater than the
/// source length is a range error raised before any computation, tape
/// mutation, or device dispatch.
///
/// # Example
/// ```
/// use gradix::prim::head;
/// use gradix::vector;
///
/// let v = vector![1.0, 2.0, 3.0];
/// let h = head(&v, 2).unwrap();
/// assert_eq!(h.as_slice(), &[1.0, 2.0]);
/// ```
pub fn head<T: Head + ?Sized>(x: &T, n: usize) -> Result<T::Output, MathError> {
    x.head(n)
}

impl Head for Matrix {
    type Output = Matrix;

    fn head(&self, n: usize) -> Result<Matrix, MathError> {
        check_vector(FUNCTION, "x", self.rows(), self.cols())?;
        if n != 0 {
            check_vector_index(FUNCTION, "n", self.len(), n)?;
        }
        let data = self.as_slice()[..n].to_vec();
        Ok(if self.rows() == 1 {
            Matrix::row(data)
        } else {
            Matrix::column(data)
        })
    }
}

impl Head for MatVar {
    type Output = MatVar;

    fn head(&self, n: usize) -> Result<MatVar, MathError> {
        let value = self.value().head(n)?;
        // Local partial is the slice of the identity map: each output
        // element's adjoint flows straight back to the same position in
        // the source.
        Ok(self.context().register_matrix(
            value,
            vec![Edge::Scatter {
                target: self.slot(),
                row0: 0,
                col0: 0,
            }],
        ))
    }
}

impl<'a> Head for Expr<'a> {
    type Output = Expr<'a>;

    fn head(&self, n: usize) -> Result<Expr<'a>, MathError> {
        check_vector(FUNCTION, "x", self.rows(), self.cols())?;
        if n != 0 {
            check_vector_index(FUNCTION, "n", self.len(), n)?;
        }
        if self.rows() == 1 {
            self.block(0, 0, 1, n)
        } else {
            self.block(0, 0, n, 1)
        }
    }
}

impl Head for DeviceVar {
    type Output = DeviceVar;

    fn head(&self, n: usize) -> Result<DeviceVar, MathError> {
        let expr = Expr::load(self.value()).head(n)?;
        let value = expr.eval();
        Ok(self.context().register_device(
            value,
            vec![Edge::Scatter {
                target: self.slot(),
                row0: 0,
                col0: 0,
            }],
        ))
    }
}
