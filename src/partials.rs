//! Per-call accumulation of local partial derivatives.
//!
//! A primitive constructs one [`OperandsAndPartials`] per call, stores the
//! local partial of its output with respect to each differentiable input
//! (shaped like that input), and finishes with [`OperandsAndPartials::build`].
//! The build step registers exactly one tape node carrying every edge
//! (one node per primitive call, not one per arithmetic sub-step) or, when
//! no input is differentiable, returns the plain value without touching
//! the tape at all.

use crate::kind::OutputKind;
use crate::matrix::Matrix;
use crate::tape::{Context, Edge, SlotId, Var};

/// Accumulator for the dense edges of a single primitive evaluation.
pub struct OperandsAndPartials {
    ctx: Option<Context>,
    edges: Vec<Edge>,
}

impl OperandsAndPartials {
    /// `ctx` is the context of whichever input is tracked, if any.
    pub fn new(ctx: Option<Context>) -> Self {
        Self {
            ctx,
            edges: Vec::new(),
        }
    }

    /// Stores the local partial for one differentiable input.
    ///
    /// `partials` must be shaped like the input: one slot for a scalar,
    /// the input's extents for a container.
    pub fn edge(&mut self, slot: SlotId, partials: Matrix) {
        self.edges.push(Edge::Dense {
            target: slot,
            partials,
        });
    }

    /// Produces the output value for the resolved return flavor `K`.
    pub fn build<K: OutputKind>(self, value: f64) -> K::Output {
        K::build(value, self)
    }

    /// Registers the single batched tape node for a tracked result.
    pub(crate) fn register(self, value: f64) -> Var {
        let ctx = self
            .ctx
            .expect("tracked result requires a recording context");
        ctx.register_scalar(value, self.edges)
    }
}
