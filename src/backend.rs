//! Backend selection module.
//!
//! This module defines the available evaluation backends for device
//! expressions and provides functions to set and get the current backend.
//!
//! # Supported Backends
//!
//! - `Cpu` — Pure Rust evaluation of device expressions (default).
//! - `Wgpu` — Fused compute-shader dispatch using `wgpu` (if available).
//! - `Cuda` — Placeholder for future support (currently delegates to wgpu).
//!
//! The backend is stored globally using an `AtomicU8`, enabling fast
//! switching between CPU and GPU evaluation at runtime. Whichever backend
//! runs, the evaluated result of an expression is identical; the selector
//! only chooses where the fused evaluation executes.

use briny::traits::{InteriorImmutable, RawConvert, StableLayout, Unaligned};
use core::convert::TryFrom;
use core::sync::atomic::{AtomicU8, Ordering};

/// Enumeration of supported evaluation backends.
///
/// Currently only `Cpu` and `Wgpu` are implemented. `Cuda` is reserved
/// for future compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Pure CPU-based evaluation (default).
    #[default]
    Cpu = 0,
    /// Fused GPU dispatch using `wgpu`.
    Wgpu,
    /// Placeholder for future CUDA support.
    Cuda,
}

unsafe impl StableLayout for Backend {}
unsafe impl RawConvert for Backend {}
unsafe impl Unaligned for Backend {}
unsafe impl InteriorImmutable for Backend {}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Wgpu),
            2 => Ok(Self::Cuda),
            _ => Err(()),
        }
    }
}

/// Internal global state for the active backend.
///
/// This uses acquire/release ordering because the backend is only expected
/// to change rarely, outside of evaluation.
#[cfg(target_has_atomic = "8")]
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Cpu as u8);

/// A mutable non-atomic unsynchronized backend state.
///
/// It is assumed that this will not be accessed concurrently.
#[cfg(not(target_has_atomic = "8"))]
static mut UNSAFE_GLOBAL_BACKEND: u8 = Backend::Cpu as u8;

/// Sets the active backend for device-expression evaluation.
///
/// # Example
///
/// ```
/// use gradix::backend::{set_backend, Backend};
/// set_backend(Backend::Cpu);
/// ```
pub fn set_backend(b: Backend) {
    #[cfg(not(target_has_atomic = "8"))]
    unsafe {
        UNSAFE_GLOBAL_BACKEND = b as u8;
    }
    #[cfg(target_has_atomic = "8")]
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the currently active evaluation backend.
///
/// If the stored value is invalid, defaults to [`Backend::Cpu`].
///
/// # Example
///
/// ```
/// use gradix::backend::get_backend;
/// let backend = get_backend();
/// ```
pub fn get_backend() -> Backend {
    #[cfg(not(target_has_atomic = "8"))]
    {
        Backend::try_from(unsafe { UNSAFE_GLOBAL_BACKEND }).unwrap_or_default()
    }
    #[cfg(target_has_atomic = "8")]
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}
