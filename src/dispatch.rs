//! One-shot command recording, submission and the queue wait-idle that makes
//! the kernel's writes visible to the host.

use ash::vk;
use tracing::{debug, info};

use crate::device::LogicalDevice;
use crate::error::{PlatformError, VkCheck};
use crate::pipeline::ComputePipeline;

/// Workgroup counts of the single dispatch.
pub const WORKGROUPS: (u32, u32, u32) = (1, 1, 1);

struct CommandPool<'a> {
    device: &'a ash::Device,
    pool: vk::CommandPool,
}

impl<'a> CommandPool<'a> {
    fn create(device: &'a ash::Device, queue_family_index: u32) -> Result<Self, PlatformError> {
        let info = vk::CommandPoolCreateInfo::default().queue_family_index(queue_family_index);
        let pool = unsafe { device.create_command_pool(&info, None) }.check("vkCreateCommandPool")?;
        Ok(Self { device, pool })
    }

    fn allocate_primary(&self) -> Result<vk::CommandBuffer, PlatformError> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&info) }
            .check("vkAllocateCommandBuffers")?;
        Ok(buffers[0])
    }
}

impl Drop for CommandPool<'_> {
    fn drop(&mut self) {
        unsafe { self.device.destroy_command_pool(self.pool, None) };
    }
}

/// Run `pipeline` once with `descriptor_set` bound at set 0 and block until
/// the queue is idle.
///
/// When this returns `Ok`, every write the kernel made is visible to host
/// mappings of host-coherent memory.
pub fn dispatch_once(
    device: &LogicalDevice,
    pipeline: &ComputePipeline,
    descriptor_set: vk::DescriptorSet,
) -> Result<(), PlatformError> {
    let raw = device.raw();
    let pool = CommandPool::create(raw, device.queue_family_index())?;
    let cmd = pool.allocate_primary()?;

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    let (x, y, z) = WORKGROUPS;
    unsafe {
        raw.begin_command_buffer(cmd, &begin_info)
            .check("vkBeginCommandBuffer")?;
        raw.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::COMPUTE, pipeline.raw());
        raw.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::COMPUTE,
            pipeline.layout(),
            0,
            &[descriptor_set],
            &[],
        );
        raw.cmd_dispatch(cmd, x, y, z);
        // Shader writes to `out` must be made visible to host reads.
        let to_host = vk::MemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::SHADER_WRITE)
            .dst_access_mask(vk::AccessFlags::HOST_READ);
        raw.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::COMPUTE_SHADER,
            vk::PipelineStageFlags::HOST,
            vk::DependencyFlags::empty(),
            &[to_host],
            &[],
            &[],
        );
        raw.end_command_buffer(cmd).check("vkEndCommandBuffer")?;
    }

    let queue = device.queue();
    let command_buffers = [cmd];
    let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
    unsafe { raw.queue_submit(queue, &[submit], vk::Fence::null()) }.check("vkQueueSubmit")?;
    debug!(workgroups = ?WORKGROUPS, "submitted dispatch");

    // Drains the whole queue, which holds only this submission.
    unsafe { raw.queue_wait_idle(queue) }.check("vkQueueWaitIdle")?;
    info!(device = %device.name(), "dispatch complete");

    Ok(())
}
