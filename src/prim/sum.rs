//! Sum of all elements, for every value flavor.
//!
//! The tracked flavors record one dense edge whose partials are all ones;
//! summing a device value reads it back first (a synchronization point).

use crate::expr::{DeviceMatrix, DeviceVar};
use crate::matrix::Matrix;
use crate::tape::{Edge, MatVar, Var};

/// Values supporting summation into a scalar.
pub trait Summable {
    type Output;

    fn sum_elements(&self) -> Self::Output;
}

/// Returns the sum of all elements of `x`.
///
/// # Example
/// ```
/// use gradix::prim::sum;
/// use gradix::vector;
///
/// assert_eq!(sum(&vector![1.0, 2.0, 3.0]), 6.0);
/// ```
pub fn sum<T: Summable + ?Sized>(x: &T) -> T::Output {
    x.sum_elements()
}

impl Summable for Matrix {
    type Output = f64;

    fn sum_elements(&self) -> f64 {
        self.as_slice().iter().sum()
    }
}

impl Summable for MatVar {
    type Output = Var;

    fn sum_elements(&self) -> Var {
        let total = self.value().as_slice().iter().sum();
        let ones = Matrix::new(self.rows(), self.cols(), vec![1.0; self.len()]);
        self.context().register_scalar(
            total,
            vec![Edge::Dense {
                target: self.slot(),
                partials: ones,
            }],
        )
    }
}

impl Summable for DeviceMatrix {
    type Output = f64;

    fn sum_elements(&self) -> f64 {
        self.as_slice().iter().sum()
    }
}

impl Summable for DeviceVar {
    type Output = Var;

    fn sum_elements(&self) -> Var {
        let total = self.value().as_slice().iter().sum();
        let ones = Matrix::new(self.rows(), self.cols(), vec![1.0; self.len()]);
        self.context().register_scalar(
            total,
            vec![Edge::Dense {
                target: self.slot(),
                partials: ones,
            }],
        )
    }
}
