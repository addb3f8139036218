//! Argument validation for primitive functions.
//!
//! Every primitive validates its inputs before any computation, tape
//! mutation, or device dispatch. A failed check aborts the call with a
//! [`MathError`] naming the primitive, the offending argument, and the
//! violated bound; the caller observes no partial state.
//!
//! The error taxonomy:
//! - [`ErrorKind::Domain`] — a numeric input is non-finite, or a scale is
//!   not strictly positive
//! - [`ErrorKind::Range`] — an index or length argument is outside the
//!   valid bound for its container
//! - [`ErrorKind::SizeMismatch`] — two arguments declared to correspond
//!   element-wise have different extents

use std::fmt;

/// Classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A numeric input violated a domain constraint (finite, positive).
    Domain,
    /// An index or length argument fell outside its container's bound.
    Range,
    /// Two corresponding arguments have inconsistent extents.
    SizeMismatch,
}

/// A validation failure raised before any observable mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MathError {
    kind: ErrorKind,
    function: &'static str,
    name: &'static str,
    message: String,
}

impl MathError {
    pub fn domain(function: &'static str, name: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Domain,
            function,
            name,
            message: message.into(),
        }
    }

    pub fn range(function: &'static str, name: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Range,
            function,
            name,
            message: message.into(),
        }
    }

    pub fn size_mismatch(
        function: &'static str,
        name: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::SizeMismatch,
            function,
            name,
            message: message.into(),
        }
    }

    /// The failure classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The primitive that raised the failure.
    pub fn function(&self) -> &str {
        self.function
    }

    /// The label of the offending argument.
    pub fn name(&self) -> &str {
        self.name
    }
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.function, self.name, self.message)
    }
}

impl std::error::Error for MathError {}

/// Checks that every value is finite.
pub fn check_finite(
    function: &'static str,
    name: &'static str,
    values: &[f64],
) -> Result<(), MathError> {
    for &v in values {
        if !v.is_finite() {
            return Err(MathError::domain(
                function,
                name,
                format!("is {v}, but must be finite"),
            ));
        }
    }
    Ok(())
}

/// Checks that every value is strictly positive and finite.
pub fn check_positive_finite(
    function: &'static str,
    name: &'static str,
    values: &[f64],
) -> Result<(), MathError> {
    for &v in values {
        if !(v > 0.0 && v.is_finite()) {
            return Err(MathError::domain(
                function,
                name,
                format!("is {v}, but must be positive finite"),
            ));
        }
    }
    Ok(())
}

/// Checks that a container has exactly the expected number of elements.
pub fn check_consistent_size(
    function: &'static str,
    name: &'static str,
    size: usize,
    expected: usize,
) -> Result<(), MathError> {
    if size != expected {
        return Err(MathError::size_mismatch(
            function,
            name,
            format!("has size {size}, but must have size {expected}"),
        ));
    }
    Ok(())
}

/// Checks that the given extents describe a row or column vector.
pub fn check_vector(
    function: &'static str,
    name: &'static str,
    rows: usize,
    cols: usize,
) -> Result<(), MathError> {
    if !(rows == 1 || cols == 1) {
        return Err(MathError::size_mismatch(
            function,
            name,
            format!("has dimensions {rows}x{cols}, but must be a row or column vector"),
        ));
    }
    Ok(())
}

/// Checks that a length argument fits within a vector of the given size.
pub fn check_vector_index(
    function: &'static str,
    name: &'static str,
    size: usize,
    index: usize,
) -> Result<(), MathError> {
    if index > size {
        return Err(MathError::range(
            function,
            name,
            format!("is {index}, but must be in the interval [0, {size}]"),
        ));
    }
    Ok(())
}

/// Checks that a row range `[row0, row0 + height)` fits within `rows`.
pub fn check_row_range(
    function: &'static str,
    name: &'static str,
    rows: usize,
    row0: usize,
    height: usize,
) -> Result<(), MathError> {
    if row0 + height > rows {
        return Err(MathError::range(
            function,
            name,
            format!("spans rows [{row0}, {}), but must fit within {rows} rows", row0 + height),
        ));
    }
    Ok(())
}

/// Checks that a column range `[col0, col0 + width)` fits within `cols`.
pub fn check_col_range(
    function: &'static str,
    name: &'static str,
    cols: usize,
    col0: usize,
    width: usize,
) -> Result<(), MathError> {
    if col0 + width > cols {
        return Err(MathError::range(
            function,
            name,
            format!(
                "spans columns [{col0}, {}), but must fit within {cols} columns",
                col0 + width
            ),
        ));
    }
    Ok(())
}
