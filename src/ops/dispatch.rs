//! Evaluation Dispatch
//!
//! Selects the backend (CPU, WGPU, CUDA) for materializing a device
//! expression, based on the global [`Backend`] selector.
//!
//! The fused evaluation attempts backend-specific implementations in
//! priority order:
//! 1. `Cuda` (if enabled)
//! 2. `Wgpu` (if enabled)
//! 3. Falls back to `Cpu`
//!
//! GPU paths return `Option` and decline work they cannot run, so the
//! fallback is deterministic and the caller always receives a value.

use crate::backend::{get_backend, Backend};
use crate::expr::{DeviceMatrix, Expr};

/// Materializes a device expression with one fused dispatch on the
/// selected backend.
///
/// This call blocks until the producing dispatch completes; the returned
/// value is fully synchronized.
pub fn evaluate(expr: &Expr<'_>) -> DeviceMatrix {
    match get_backend() {
        Backend::Cuda => {
            #[cfg(feature = "cuda")]
            {
                if let Some(result) = super::cuda::cuda_eval(expr) {
                    return result;
                }
            }
        }
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                if let Some(result) = super::wgpu::wgpu_eval(expr) {
                    return result;
                }
            }
        }
        _ => {}
    }

    super::cpu::eval(expr)
}
