//! Device-resident values and the lazy expression builder.
//!
//! # Kernel Generation Layer
//!
//! A [`DeviceMatrix`] is the device-resident flavor of a value: an
//! exclusively-owned buffer plus row/column extents. Operations over
//! device values do not execute immediately; they build an [`Expr`], a
//! small arena of expression nodes (block reads, elementwise arithmetic,
//! scaling) that is validated eagerly and evaluated lazily.
//!
//! ## Design Highlights
//! - **Eager validation, lazy execution.** Extents and bounds are checked
//!   when a node is constructed, so an invalid slice fails synchronously
//!   with a precise error before anything is queued on the device.
//! - **Fusion.** Chained operations never materialize intermediate
//!   buffers. A terminal [`Expr::eval`] walks the tree once and issues a
//!   single fused dispatch (one generated compute shader on the wgpu
//!   backend, one parallel sweep on the CPU backend).
//! - **Synchronization.** Evaluation is the one blocking point: the
//!   result is never observable before its producing dispatch completes.
//!
//! ## Example
//!
//! ```rust
//! use gradix::expr::{DeviceMatrix, Expr};
//!
//! let m = DeviceMatrix::new(3, 1, vec![1.0, 2.0, 3.0]);
//! let top = Expr::load(&m).block(0, 0, 2, 1).unwrap();
//! let doubled = top.scale(2.0);
//! assert_eq!(doubled.eval().as_slice(), &[2.0, 4.0]);
//! ```

use crate::check::{check_col_range, check_consistent_size, check_row_range, MathError};
use crate::matrix::Matrix;
use crate::tape::{Context, Edge, SlotId};

/// A device-resident matrix: an exclusively-owned buffer plus extents.
///
/// The buffer is staged host-side and uploaded when a dispatch consumes
/// it; exclusive ownership guarantees a freed buffer can never be read.
/// Copying clones the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DeviceMatrix {
    /// Creates a device matrix with the given extents and row-major data.
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

    /// Transfers a host matrix to the device.
    pub fn from_matrix(m: &Matrix) -> Self {
        Self {
            rows: m.rows(),
            cols: m.cols(),
            data: m.as_slice().to_vec(),
        }
    }

    /// Reads the value back to the host (a synchronization point).
    pub fn to_matrix(&self) -> Matrix {
        Matrix::new(self.rows, self.cols, self.data.clone())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the value is vector-shaped (a single row or column).
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Flat row-major view of the staged elements.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }
}

#[derive(Clone, Debug)]
pub(crate) enum ExprOp {
    /// Read from a source buffer.
    Load(usize),
    /// Read the sub-block of `of` starting at `(row0, col0)`.
    Block {
        of: usize,
        row0: usize,
        col0: usize,
    },
    Add(usize, usize),
    Sub(usize, usize),
    Mul(usize, usize),
    Scale(usize, f64),
}

#[derive(Clone, Debug)]
pub(crate) struct ExprNode {
    pub(crate) op: ExprOp,
    pub(crate) rows: usize,
    pub(crate) cols: usize,
}

/// A lazily-evaluated expression over device values.
///
/// Nodes live in an index-based arena; every node carries pre-validated
/// extents, so shape queries never touch the device.
#[derive(Clone, Debug)]
pub struct Expr<'a> {
    nodes: Vec<ExprNode>,
    sources: Vec<&'a DeviceMatrix>,
    root: usize,
}

impl<'a> Expr<'a> {
    /// Starts an expression that reads a whole device value.
    pub fn load(source: &'a DeviceMatrix) -> Self {
        Self {
            nodes: vec![ExprNode {
                op: ExprOp::Load(0),
                rows: source.rows(),
                cols: source.cols(),
            }],
            sources: vec![source],
            root: 0,
        }
    }

    /// Rows of the evaluated result.
    pub fn rows(&self) -> usize {
        self.nodes[self.root].rows
    }

    /// Columns of the evaluated result.
    pub fn cols(&self) -> usize {
        self.nodes[self.root].cols
    }

    /// Elements of the evaluated result.
    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sub-block of `rows × cols` elements starting at `(row0, col0)`.
    ///
    /// Bounds are validated here, before anything is queued; the offending
    /// dimension is named in the error.
    pub fn block(
        &self,
        row0: usize,
        col0: usize,
        rows: usize,
        cols: usize,
    ) -> Result<Expr<'a>, MathError> {
        const FUNCTION: &str = "block";
        check_row_range(FUNCTION, "i", self.rows(), row0, rows)?;
        check_col_range(FUNCTION, "j", self.cols(), col0, cols)?;
        let mut nodes = self.nodes.clone();
        nodes.push(ExprNode {
            op: ExprOp::Block {
                of: self.root,
                row0,
                col0,
            },
            rows,
            cols,
        });
        Ok(Expr {
            root: nodes.len() - 1,
            nodes,
            sources: self.sources.clone(),
        })
    }

    /// Elementwise sum of two expressions of identical extents.
    pub fn add(&self, rhs: &Expr<'a>) -> Result<Expr<'a>, MathError> {
        self.binary(rhs, "add", ExprOp::Add)
    }

    /// Elementwise difference of two expressions of identical extents.
    pub fn sub(&self, rhs: &Expr<'a>) -> Result<Expr<'a>, MathError> {
        self.binary(rhs, "sub", ExprOp::Sub)
    }

    /// Elementwise product of two expressions of identical extents.
    pub fn mul(&self, rhs: &Expr<'a>) -> Result<Expr<'a>, MathError> {
        self.binary(rhs, "mul", ExprOp::Mul)
    }

    /// Every element multiplied by a constant.
    pub fn scale(&self, factor: f64) -> Expr<'a> {
        let mut nodes = self.nodes.clone();
        nodes.push(ExprNode {
            op: ExprOp::Scale(self.root, factor),
            rows: self.rows(),
            cols: self.cols(),
        });
        Expr {
            root: nodes.len() - 1,
            nodes,
            sources: self.sources.clone(),
        }
    }

    /// Materializes the expression with a single fused dispatch.
    ///
    /// This is the synchronization point: the call blocks until the
    /// producing dispatch completes.
    pub fn eval(&self) -> DeviceMatrix {
        crate::ops::dispatch::evaluate(self)
    }

    fn binary(
        &self,
        rhs: &Expr<'a>,
        function: &'static str,
        op: fn(usize, usize) -> ExprOp,
    ) -> Result<Expr<'a>, MathError> {
        check_consistent_size(function, "rows", rhs.rows(), self.rows())?;
        check_consistent_size(function, "cols", rhs.cols(), self.cols())?;
        let mut nodes = self.nodes.clone();
        let mut sources = self.sources.clone();
        let node_off = nodes.len();
        let src_off = sources.len();
        for n in &rhs.nodes {
            let shifted = match n.op {
                ExprOp::Load(s) => ExprOp::Load(s + src_off),
                ExprOp::Block { of, row0, col0 } => ExprOp::Block {
                    of: of + node_off,
                    row0,
                    col0,
                },
                ExprOp::Add(a, b) => ExprOp::Add(a + node_off, b + node_off),
                ExprOp::Sub(a, b) => ExprOp::Sub(a + node_off, b + node_off),
                ExprOp::Mul(a, b) => ExprOp::Mul(a + node_off, b + node_off),
                ExprOp::Scale(a, k) => ExprOp::Scale(a + node_off, k),
            };
            nodes.push(ExprNode {
                op: shifted,
                rows: n.rows,
                cols: n.cols,
            });
        }
        sources.extend_from_slice(&rhs.sources);
        nodes.push(ExprNode {
            op: op(self.root, node_off + rhs.root),
            rows: self.rows(),
            cols: self.cols(),
        });
        Ok(Expr {
            root: nodes.len() - 1,
            nodes,
            sources,
        })
    }

    pub(crate) fn nodes(&self) -> &[ExprNode] {
        &self.nodes
    }

    pub(crate) fn sources(&self) -> &[&'a DeviceMatrix] {
        &self.sources
    }

    pub(crate) fn root(&self) -> usize {
        self.root
    }
}

impl<'a> From<&'a DeviceMatrix> for Expr<'a> {
    fn from(source: &'a DeviceMatrix) -> Self {
        Expr::load(source)
    }
}

/// A tracked device matrix: a device value plus a tape slot reference.
///
/// Cloning aliases the same slot.
#[derive(Clone)]
pub struct DeviceVar {
    ctx: Context,
    slot: SlotId,
    value: DeviceMatrix,
}

impl Context {
    /// Creates a tracked device-matrix leaf.
    pub fn device_matrix(&self, value: DeviceMatrix) -> DeviceVar {
        let slot = self.new_slot(value.rows(), value.cols());
        DeviceVar {
            ctx: self.clone(),
            slot,
            value,
        }
    }

    pub(crate) fn register_device(&self, value: DeviceMatrix, edges: Vec<Edge>) -> DeviceVar {
        let slot = self.new_slot(value.rows(), value.cols());
        self.append(slot, edges);
        DeviceVar {
            ctx: self.clone(),
            slot,
            value,
        }
    }
}

impl std::fmt::Debug for DeviceVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceVar")
            .field("value", &self.value)
            .field("slot", &self.slot)
            .finish()
    }
}

impl DeviceVar {
    /// The forward value.
    pub fn value(&self) -> &DeviceMatrix {
        &self.value
    }

    /// The accumulated adjoint (host-side), valid after a reverse pass.
    pub fn adjoint(&self) -> Matrix {
        self.ctx.adjoint(self.slot)
    }

    pub fn rows(&self) -> usize {
        self.value.rows()
    }

    pub fn cols(&self) -> usize {
        self.value.cols()
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub(crate) fn slot(&self) -> SlotId {
        self.slot
    }

    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }
}
