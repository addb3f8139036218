//! Core matrix data structures.
//!
//! # Host Value Representation
//!
//! This module defines the plain (host-resident, differentiation-constant)
//! flavor of a value: a dense row-major matrix of `f64` elements.
//!
//! It supports:
//! - Construction of matrices with explicit row/column extents
//! - Column vectors (n×1) and row vectors (1×n) as degenerate matrices
//! - Element access by `(row, col)` pair or flat slice
//! - Compile-time `matrix!` / `vector!` literal macros
//!
//! ## Design Highlights
//! - Extents are stored separately from the flat data and enforced at
//!   construction
//! - Vectors keep their orientation: operations that slice a vector return
//!   a result oriented like the source
//! - The same type backs values, local partial derivatives, and adjoint
//!   storage on the tape
//!
//! ## Limitations
//! - Row-major only
//! - `f64` elements only
//! - No broadcasting or shape inference
//!
//! ## Example
//!
//! ```rust
//! use gradix::matrix::Matrix;
//! let m = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(m.rows(), 2);
//! assert_eq!(m.get(1, 2), 6.0);
//! ```

/// A dense row-major matrix of `f64` values.
///
/// - `rows` and `cols` define the extents, e.g. `(2, 3)` for a 2×3 matrix.
/// - Column vectors are n×1, row vectors 1×n.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a new matrix with the given extents and flat row-major data.
    ///
    /// # Panics
    /// Panics if `data.len()` does not equal `rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            rows * cols,
            data.len(),
            "extents {rows}x{cols} are incompatible with {} data elements",
            data.len()
        );
        Self { rows, cols, data }
    }

    /// Creates a zero-filled matrix with the given extents.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates a column vector (n×1) from the given elements.
    pub fn column(data: Vec<f64>) -> Self {
        Self {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Creates a row vector (1×n) from the given elements.
    pub fn row(data: Vec<f64>) -> Self {
        Self {
            rows: 1,
            cols: data.len(),
            data,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the matrix has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the matrix is vector-shaped (a single row or a single column).
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Returns the element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the position is out of range.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "position out of range");
        self.data[row * self.cols + col]
    }

    /// Flat row-major view of the elements.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn get_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        assert!(row < self.rows && col < self.cols, "position out of range");
        &mut self.data[row * self.cols + col]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub(crate) fn fill(&mut self, value: f64) {
        for slot in &mut self.data {
            *slot = value;
        }
    }
}

/// Defines a matrix from a nested literal array.
///
/// All rows must have the same length.
///
/// # Example
/// ```
/// use gradix::matrix;
/// let m = matrix!([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(m.rows(), 2);
/// assert_eq!(m.cols(), 2);
/// ```
#[macro_export]
macro_rules! matrix {
    ([ $( [ $( $x:expr ),+ $(,)? ] ),+ $(,)? ]) => {{
        let rows: ::std::vec::Vec<::std::vec::Vec<f64>> =
            ::std::vec![ $( ::std::vec![ $( ($x) as f64 ),+ ] ),+ ];
        let width = rows[0].len();
        assert!(rows.iter().all(|r| r.len() == width),
            "ragged matrix literal (rows have mismatched lengths)");
        let height = rows.len();
        let mut data = ::std::vec::Vec::with_capacity(height * width);
        for r in rows { data.extend(r); }
        $crate::matrix::Matrix::new(height, width, data)
    }};
}

/// Defines a column vector (n×1) from a flat literal list.
///
/// # Example
/// ```
/// use gradix::vector;
/// let v = vector![1.0, 2.0, 3.0];
/// assert_eq!(v.rows(), 3);
/// assert_eq!(v.cols(), 1);
/// ```
#[macro_export]
macro_rules! vector {
    ( $( $x:expr ),* $(,)? ) => {
        $crate::matrix::Matrix::column(::std::vec![ $( ($x) as f64 ),* ])
    };
}
