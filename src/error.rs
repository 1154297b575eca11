//! Error taxonomy and the platform-call checking convention.
//!
//! Every Vulkan call that can fail goes through [`VkCheck::check`], which turns
//! a non-success `vk::Result` into a [`PlatformError`] carrying the call name
//! and the caller's source location. Nothing below `main` terminates the
//! process; errors propagate with `?` to the single top-level handler.

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

/// Exit status for argument errors.
pub const EXIT_USAGE: i32 = 1;
/// Exit status for every other fatal error.
pub const EXIT_FATAL: i32 = 2;

/// A Vulkan call returned something other than `VK_SUCCESS`.
#[derive(Debug, Clone, Copy)]
pub struct PlatformError {
    /// Name of the failing entry point, e.g. `vkCreateBuffer`.
    pub call: &'static str,
    pub result: vk::Result,
    pub location: &'static Location<'static>,
}

impl PlatformError {
    /// Build an error for `call` at the caller's location.
    #[track_caller]
    pub fn new(call: &'static str, result: vk::Result) -> Self {
        Self {
            call,
            result,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failure at {}:{} {} with error code: {} ({:?})",
            self.location.file(),
            self.location.line(),
            self.call,
            self.result.as_raw(),
            self.result,
        )
    }
}

impl std::error::Error for PlatformError {}

/// Attach a call name and source location to an `ash` result.
pub trait VkCheck<T> {
    fn check(self, call: &'static str) -> Result<T, PlatformError>;
}

impl<T> VkCheck<T> for ash::prelude::VkResult<T> {
    #[track_caller]
    fn check(self, call: &'static str) -> Result<T, PlatformError> {
        let location = Location::caller();
        self.map_err(|result| PlatformError {
            call,
            result,
            location,
        })
    }
}

#[derive(Error, Debug)]
pub enum ReproError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("no compute-capable queue family on '{device}'")]
    NoSuitableQueue { device: String },

    #[error("no host-visible, host-coherent memory type on '{device}' can hold {required} bytes")]
    NoSuitableMemory { device: String, required: u64 },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("failed to load the Vulkan loader: {0}")]
    Loader(#[from] ash::LoadingError),

    #[error("failed to read kernel '{}': {source}", path.display())]
    KernelRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl ReproError {
    /// Process exit status the top-level handler uses for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReproError::Usage(_) => EXIT_USAGE,
            _ => EXIT_FATAL,
        }
    }
}
