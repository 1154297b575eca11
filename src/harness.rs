//! The per-accelerator pipeline and the serial loop over accelerators.

use tracing::{info, warn};

use crate::bindings::{total_buffer_bytes, DescriptorLayout};
use crate::device::{Accelerator, LogicalDevice, Platform};
use crate::dispatch::dispatch_once;
use crate::error::ReproError;
use crate::pipeline::{ComputePipeline, Kernel};
use crate::readback::read_output;
use crate::resources::{BufferTriple, DescriptorBindings};

/// Output of one accelerator's dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceleratorReport {
    pub index: usize,
    pub name: String,
    pub output: Vec<f32>,
}

/// Provision, dispatch and read back on one accelerator.
///
/// Every object created here is released before returning, in reverse
/// creation order, whether the run succeeds or not.
pub fn run_accelerator(
    platform: &Platform,
    accelerator: &Accelerator,
    kernel: &Kernel,
) -> Result<Vec<f32>, ReproError> {
    let queue_family = accelerator.compute_queue_family()?;
    let memory_type = accelerator.host_memory_type(total_buffer_bytes())?;

    let device = LogicalDevice::create(platform, accelerator, queue_family)?;
    let buffers = BufferTriple::provision(&device, memory_type)?;

    let set_layout = DescriptorLayout::create(device.raw())?;
    let pipeline = ComputePipeline::build(device.raw(), kernel, &set_layout)?;
    let bindings = DescriptorBindings::create(device.raw(), &set_layout, &buffers)?;

    dispatch_once(&device, &pipeline, bindings.set())?;

    Ok(read_output(&buffers)?)
}

/// Run the kernel on every accelerator in enumeration order.
///
/// `on_report` is called as soon as each accelerator finishes. The first
/// failure, including one returned by `on_report`, stops the loop; later
/// accelerators are not attempted. Returns the number of accelerators run.
pub fn run_all<F>(kernel: &Kernel, mut on_report: F) -> Result<usize, ReproError>
where
    F: FnMut(&AcceleratorReport) -> Result<(), ReproError>,
{
    let platform = Platform::new()?;
    let accelerators = platform.accelerators()?;
    if accelerators.is_empty() {
        warn!("no Vulkan accelerators found");
        return Ok(0);
    }
    info!(count = accelerators.len(), "enumerated accelerators");

    for accelerator in &accelerators {
        info!(index = accelerator.index, name = %accelerator.name, "running kernel");
        let output = run_accelerator(&platform, accelerator, kernel)?;
        on_report(&AcceleratorReport {
            index: accelerator.index,
            name: accelerator.name.clone(),
            output,
        })?;
    }

    Ok(accelerators.len())
}
