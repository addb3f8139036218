//! Gradient tape and reverse-mode accumulation.
//!
//! # Reverse-Mode Autodiff Core
//!
//! Forward evaluation of a differentiable primitive records one node on an
//! append-only tape; a later reverse pass walks the nodes in reverse
//! creation order and distributes each node's adjoint into the adjoint
//! slots of its inputs.
//!
//! **Key pieces:**
//! - **[`Context`]:** explicit owner of one tape arena. Clone a `Context`
//!   to share the same arena; create one `Context` per independent
//!   computation.
//! - **[`Var`] / [`MatVar`]:** tracked scalar and matrix values, each
//!   carrying a stable reference into an adjoint slot.
//! - **Edges:** a node's edges pair an input slot with the local partial
//!   derivative of the output with respect to that input. Adjoints are
//!   accumulated by addition only, so values consumed by several
//!   downstream operations (fan-out) receive every contribution.
//!
//! ## Lifecycle
//!
//! The tape grows during forward evaluation, is consumed by exactly one
//! reverse pass ([`Var::backward`]), and is then reset ([`Context::reset`])
//! before the next independent run. Appending after a reverse pass without
//! a reset is a programming error and panics. Nested segments can be torn
//! down with [`Context::mark`] / [`Context::truncate`].
//!
//! ## Threading
//!
//! A `Context` is a `Rc<RefCell<_>>` handle and therefore `!Send`: one
//! tape belongs to one thread by construction. Independent computations on
//! other threads get their own `Context`.
//!
//! ## Example
//!
//! ```rust
//! use gradix::tape::Context;
//!
//! let ctx = Context::new();
//! let a = ctx.scalar(2.0);
//! let b = ctx.scalar(3.0);
//! let s = &a + &b;
//! s.backward();
//! assert_eq!(a.adjoint(), 1.0);
//! assert_eq!(b.adjoint(), 1.0);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::ops::Add;
use std::rc::Rc;

use crate::matrix::Matrix;

/// Stable reference to an adjoint slot on the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

/// Stable reference to a recorded tape node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// A recorded dependency of a node on one differentiable input.
pub(crate) enum Edge {
    /// Local partial of a scalar-valued output with respect to `target`,
    /// shaped like `target`. The reverse pass adds
    /// `output_adjoint * partials[i]` into each target adjoint element.
    Dense { target: SlotId, partials: Matrix },
    /// Identity-slice dependency: the output adjoint block flows back into
    /// `target` at the recorded offset (inverse of a block read).
    Scatter {
        target: SlotId,
        row0: usize,
        col0: usize,
    },
}

pub(crate) struct TapeNode {
    out: SlotId,
    edges: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Recording,
    Swept,
}

/// Append-only arena of adjoint slots and recorded nodes.
struct Tape {
    adjoints: Vec<Matrix>,
    nodes: Vec<TapeNode>,
    phase: Phase,
}

impl Tape {
    fn new() -> Self {
        Self {
            adjoints: Vec::new(),
            nodes: Vec::new(),
            phase: Phase::Recording,
        }
    }

    fn new_slot(&mut self, rows: usize, cols: usize) -> SlotId {
        assert_eq!(
            self.phase,
            Phase::Recording,
            "tape used after a reverse pass; call reset() first"
        );
        let id = SlotId(self.adjoints.len());
        self.adjoints.push(Matrix::zeros(rows, cols));
        id
    }

    fn append(&mut self, node: TapeNode) -> NodeId {
        assert_eq!(
            self.phase,
            Phase::Recording,
            "tape appended to after a reverse pass; call reset() first"
        );
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Walks the nodes in strictly reverse creation order, adding
    /// `incoming_adjoint * local_partial` into each edge's target.
    fn reverse_pass(&mut self) {
        self.phase = Phase::Swept;
        for node in self.nodes.iter().rev() {
            let out = self.adjoints[node.out.0].clone();
            for edge in &node.edges {
                match edge {
                    Edge::Dense { target, partials } => {
                        let incoming = out.as_slice()[0];
                        let slot = &mut self.adjoints[target.0];
                        for (adj, p) in slot.as_mut_slice().iter_mut().zip(partials.as_slice()) {
                            *adj += incoming * p;
                        }
                    }
                    Edge::Scatter { target, row0, col0 } => {
                        let slot = &mut self.adjoints[target.0];
                        for r in 0..out.rows() {
                            for c in 0..out.cols() {
                                *slot.get_mut(row0 + r, col0 + c) += out.get(r, c);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// A position on the tape, for tearing down a nested segment.
#[derive(Debug, Clone, Copy)]
pub struct TapeMark {
    slots: usize,
    nodes: usize,
}

/// Explicit owner of one tape arena.
///
/// All tracked values created through a `Context` share its arena; cloning
/// the `Context` (or a tracked value) copies the handle, never the slots.
#[derive(Clone)]
pub struct Context {
    tape: Rc<RefCell<Tape>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            tape: Rc::new(RefCell::new(Tape::new())),
        }
    }

    /// Creates a tracked scalar leaf.
    pub fn scalar(&self, value: f64) -> Var {
        let slot = self.tape.borrow_mut().new_slot(1, 1);
        Var {
            ctx: self.clone(),
            slot,
            value,
        }
    }

    /// Creates a tracked matrix leaf.
    pub fn matrix(&self, value: Matrix) -> MatVar {
        let slot = self.tape.borrow_mut().new_slot(value.rows(), value.cols());
        MatVar {
            ctx: self.clone(),
            slot,
            value,
        }
    }

    /// Number of nodes recorded so far.
    pub fn node_count(&self) -> usize {
        self.tape.borrow().nodes.len()
    }

    /// Clears the arena for the next independent run.
    pub fn reset(&self) {
        let mut tape = self.tape.borrow_mut();
        tape.adjoints.clear();
        tape.nodes.clear();
        tape.phase = Phase::Recording;
    }

    /// Records the current tape position.
    pub fn mark(&self) -> TapeMark {
        let tape = self.tape.borrow();
        TapeMark {
            slots: tape.adjoints.len(),
            nodes: tape.nodes.len(),
        }
    }

    /// Tears down everything recorded after `mark`, reclaiming its memory.
    ///
    /// Tracked values created after the mark must not be used afterwards.
    pub fn truncate(&self, mark: TapeMark) {
        let mut tape = self.tape.borrow_mut();
        assert!(
            mark.slots <= tape.adjoints.len() && mark.nodes <= tape.nodes.len(),
            "tape mark does not belong to this tape"
        );
        tape.adjoints.truncate(mark.slots);
        tape.nodes.truncate(mark.nodes);
        tape.phase = Phase::Recording;
    }

    pub(crate) fn same_arena(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.tape, &other.tape)
    }

    pub(crate) fn new_slot(&self, rows: usize, cols: usize) -> SlotId {
        self.tape.borrow_mut().new_slot(rows, cols)
    }

    pub(crate) fn append(&self, out: SlotId, edges: Vec<Edge>) -> NodeId {
        self.tape.borrow_mut().append(TapeNode { out, edges })
    }

    /// Registers one node producing a tracked scalar.
    pub(crate) fn register_scalar(&self, value: f64, edges: Vec<Edge>) -> Var {
        let slot = self.new_slot(1, 1);
        self.append(slot, edges);
        Var {
            ctx: self.clone(),
            slot,
            value,
        }
    }

    /// Registers one node producing a tracked matrix.
    pub(crate) fn register_matrix(&self, value: Matrix, edges: Vec<Edge>) -> MatVar {
        let slot = self.new_slot(value.rows(), value.cols());
        self.append(slot, edges);
        MatVar {
            ctx: self.clone(),
            slot,
            value,
        }
    }

    pub(crate) fn adjoint(&self, slot: SlotId) -> Matrix {
        self.tape.borrow().adjoints[slot.0].clone()
    }

    fn backward_from(&self, root: SlotId) {
        let mut tape = self.tape.borrow_mut();
        for adj in &mut tape.adjoints {
            adj.fill(0.0);
        }
        tape.adjoints[root.0].fill(1.0);
        tape.reverse_pass();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// A tracked scalar: a value plus a reference into a tape adjoint slot.
///
/// Cloning aliases the same slot.
#[derive(Clone)]
pub struct Var {
    ctx: Context,
    slot: SlotId,
    value: f64,
}

impl Var {
    /// The forward value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The accumulated adjoint, valid after a reverse pass.
    pub fn adjoint(&self) -> f64 {
        self.ctx.adjoint(self.slot).as_slice()[0]
    }

    /// Seeds this value's adjoint with 1 and runs the reverse pass.
    ///
    /// Must strictly follow all forward appends; afterwards the tape
    /// rejects further appends until [`Context::reset`].
    pub fn backward(&self) {
        self.ctx.backward_from(self.slot);
    }

    pub(crate) fn slot(&self) -> SlotId {
        self.slot
    }

    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("value", &self.value)
            .field("slot", &self.slot)
            .finish()
    }
}

/// A tracked matrix: a value plus a reference into a tape adjoint slot.
///
/// Cloning aliases the same slot.
#[derive(Clone)]
pub struct MatVar {
    ctx: Context,
    slot: SlotId,
    value: Matrix,
}

impl MatVar {
    /// The forward value.
    pub fn value(&self) -> &Matrix {
        &self.value
    }

    /// The accumulated adjoint, valid after a reverse pass.
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

impl fmt::Debug for MatVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatVar")
            .field("value", &self.value)
            .field("slot", &self.slot)
            .finish()
    }
}

/// Adds two tracked scalars, recording one node with unit partials.
///
/// Lets reductions from different sources combine into a single root for
/// one reverse pass.
impl Add for &Var {
    type Output = Var;

    fn add(self, rhs: &Var) -> Var {
        assert!(
            self.ctx.same_arena(&rhs.ctx),
            "tracked values must share a tape"
        );
        self.ctx.register_scalar(
            self.value + rhs.value,
            vec![
                Edge::Dense {
                    target: self.slot,
                    partials: Matrix::new(1, 1, vec![1.0]),
                },
                Edge::Dense {
                    target: rhs.slot,
                    partials: Matrix::new(1, 1, vec![1.0]),
                },
            ],
        )
    }
}
