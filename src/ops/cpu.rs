//! Parallel CPU evaluation of device expressions.
//!
//! # CPU Backend
//!
//! The default backend: walks a pre-validated expression tree once per
//! output element, with `rayon` parallelism across output rows. Used
//! whenever no GPU backend is enabled or the GPU path declines the work.
//!
//! Offsets of nested block reads compose during the walk, so a chain of
//! slices costs a single index computation per element and no
//! intermediate buffer is ever allocated.

use rayon::prelude::*;

use crate::expr::{DeviceMatrix, Expr, ExprOp};

/// Evaluates the expression tree in one parallel sweep.
pub fn eval(expr: &Expr<'_>) -> DeviceMatrix {
    let rows = expr.rows();
    let cols = expr.cols();
    let mut out = vec![0.0f64; rows * cols];

    out.par_chunks_mut(cols.max(1))
        .enumerate()
        .for_each(|(r, row)| {
            for (c, slot) in row.iter_mut().enumerate() {
                *slot = value_at(expr, expr.root(), r, c);
            }
        });

    DeviceMatrix::new(rows, cols, out)
}

fn value_at(expr: &Expr<'_>, node: usize, r: usize, c: usize) -> f64 {
    match &expr.nodes()[node].op {
        ExprOp::Load(s) => expr.sources()[*s].get(r, c),
        ExprOp::Block { of, row0, col0 } => value_at(expr, *of, r + row0, c + col0),
        ExprOp::Add(a, b) => value_at(expr, *a, r, c) + value_at(expr, *b, r, c),
        ExprOp::Sub(a, b) => value_at(expr, *a, r, c) - value_at(expr, *b, r, c),
        ExprOp::Mul(a, b) => value_at(expr, *a, r, c) * value_at(expr, *b, r, c),
        ExprOp::Scale(a, k) => k * value_at(expr, *a, r, c),
    }
}
