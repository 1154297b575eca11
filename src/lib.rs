//! Single-dispatch Vulkan compute harness.
//!
//! Loads a pre-compiled SPIR-V kernel and, for every accelerator the Vulkan
//! loader reports, selects a compute queue and a host-visible memory type,
//! provisions three storage buffers (`in1`, `in2`, `out`) at bindings 0..=2,
//! dispatches one 1×1×1 workgroup and reads `out` back.
//!
//! [`harness::run_all`] is the entry point; the modules below are its stages
//! in pipeline order.

pub mod error;
pub mod device;
pub mod memory;
pub mod bindings;
pub mod resources;
pub mod pipeline;
pub mod dispatch;
pub mod readback;
pub mod harness;
pub mod cli;

pub use error::{PlatformError, ReproError};
pub use harness::{run_accelerator, run_all, AcceleratorReport};
pub use pipeline::Kernel;
