//! # Expression Evaluation Layer
//!
//! This module evaluates device expressions across different compute
//! backends, including CPU, GPU (WGPU), and optionally CUDA.
//!
//! ## Submodules
//!
//! - [`cpu`] — Multi-threaded host evaluation (default fallback backend)
//! - [`wgpu`] *(opt-in)* — Fused compute-shader dispatch using `wgpu`
//! - [`cuda`] *(planned)* — CUDA backend for NVIDIA (not yet supported)
//! - [`dispatch`] — Runtime backend switching
//!
//! ## Backend Selection
//!
//! Evaluation is backend-agnostic from the caller's perspective: a lazy
//! expression is materialized by [`dispatch::evaluate`], which consults
//! the global [`crate::backend::Backend`] selector and falls back to the
//! CPU when a GPU path is unavailable or declines the work. Both backends
//! evaluate the same pre-validated expression tree, so results agree to
//! floating-point staging precision.
//!
//! ## Notes
//!
//! - GPU acceleration is only used when its feature flag is enabled
//! - CUDA support is not implemented yet; the module dispatches to WebGPU
//! - A whole expression tree becomes one dispatch; intermediates are
//!   never materialized
//!
//! ## Feature Flags
//!
//! - `wgpu` — Enables the `wgpu` (WebGPU) backend
//! - `cuda` — Enables the placeholder CUDA module (dispatches to WGPU)

pub mod cpu;
#[cfg(feature = "cuda")]
pub mod cuda;
pub mod dispatch;
#[cfg(any(feature = "wgpu", feature = "cuda"))]
pub mod wgpu;
