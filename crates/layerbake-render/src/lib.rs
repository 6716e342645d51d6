//! layerbake-render
//!
//! The GPU surface the texture bake pipeline talks to.
//!
//! [`GpuContext`] models the slice of a fixed-function texture API the
//! exporter needs: one 2D binding point, the automatic mipmap generation
//! parameter, per-level size queries and RGBA8 readback. [`SoftwareGpu`]
//! implements it on the CPU so exports run headless.

mod context;
mod software;

pub use context::{GpuContext, GpuError, GpuResult, TextureName, NO_TEXTURE};
pub use software::{GpuStats, SoftwareGpu};
