//! Command-line arguments and logging setup for the `vk-repro` binary.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, PartialEq)]
#[command(
    name = "vk-repro",
    about = "Run a SPIR-V compute kernel once on every Vulkan accelerator and print its output buffer",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    /// Path to the pre-compiled SPIR-V kernel
    #[arg(allow_hyphen_values = true)]
    pub kernel: PathBuf,

    /// Name of the kernel's entry point
    #[arg(allow_hyphen_values = true)]
    pub entry_point: String,
}

/// Initialize tracing to stderr.
///
/// Respects the `RUST_LOG` env var, defaulting to WARN so stdout stays the
/// kernel output only.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
