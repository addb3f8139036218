//! gradix: reverse-mode automatic differentiation over linear-algebra
//! primitives, with CPU and GPU execution paths.
//!
//! Designed around three interchangeable flavors of a value (plain,
//! differentiation-tracked, and device-resident), with primitives defined
//! once and specialized per flavor combination at compile time.
//!
//! # Features
//!
//! - A gradient tape with batched nodes: one primitive call records one
//!   node carrying analytically simplified partials, however large its
//!   inputs.
//! - Compile-time dispatch over value flavors; all-plain calls never
//!   touch the tape.
//! - A lazy device expression builder that validates shapes eagerly and
//!   fuses chained slices and elementwise operations into a single
//!   dispatch.
//!
//! # Goals
//!
//! - Prioritize correctness and explicitness: validation before
//!   computation, one reverse pass per tape, no ambient global tape.
//! - Keep host and device evaluation interchangeable — same expression,
//!   same result, backend chosen at runtime.
//!
//! # Modules
//!
//! - [`matrix`] — Host value representation (dense row-major matrices).
//! - [`tape`] — Gradient tape, tracked values, reverse accumulation.
//! - [`kind`] — Compile-time classification of argument flavors.
//! - [`partials`] — Per-call accumulation of local partials.
//! - [`expr`] — Device values and the lazy expression builder.
//! - [`ops`] — CPU/GPU evaluation backends and dispatch.
//! - [`prim`] — Primitive functions (`head`, `sum`,
//!   `normal_id_glm_lpdf`).
//! - [`check`] — Argument validation and the error taxonomy.
//! - [`backend`] — Runtime backend selection.
//! - [`approx`] — Approximate floating-point comparison helpers.
//!
//! # Example
//!
//! ```rust
//! use gradix::prim::{head, sum};
//! use gradix::tape::Context;
//! use gradix::vector;
//!
//! let ctx = Context::new();
//! let v = ctx.matrix(vector![1.0, 2.0, 3.0]);
//! let h = head(&v, 2).unwrap();
//! let s = sum(&h);
//! s.backward();
//! assert_eq!(v.adjoint().as_slice(), &[1.0, 1.0, 0.0]);
//! ```

pub mod approx;
pub mod backend;
pub mod check;
pub mod expr;
pub mod kind;
pub mod matrix;
pub mod ops;
pub mod partials;
pub mod prim;
pub mod tape;
