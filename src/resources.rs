//! Buffer provisioning and descriptor-set construction.
//!
//! Each of the three buffers gets its own allocation from the memory type the
//! classifier chose. Inputs are written through a [`MappedMemory`] that is
//! released as soon as the write is done.

use ash::vk;
use tracing::debug;

use crate::bindings::{pool_sizes, BufferRole, DescriptorLayout, BINDING_TABLE};
use crate::device::LogicalDevice;
use crate::error::{PlatformError, ReproError, VkCheck};
use crate::memory::MappedMemory;

/// A storage buffer bound at offset 0 to its own allocation.
pub struct DeviceBuffer {
    device: ash::Device,
    role: BufferRole,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
}

impl DeviceBuffer {
    fn create(
        device: &LogicalDevice,
        role: BufferRole,
        memory_type_index: u32,
    ) -> Result<Self, ReproError> {
        let raw = device.raw();
        let size = role.byte_size();
        let queue_families = [device.queue_family_index()];

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(vk::BufferUsageFlags::STORAGE_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_families);
        let buffer = unsafe { raw.create_buffer(&buffer_info, None) }.check("vkCreateBuffer")?;

        let requirements = unsafe { raw.get_buffer_memory_requirements(buffer) };
        if requirements.memory_type_bits & (1 << memory_type_index) == 0 {
            unsafe { raw.destroy_buffer(buffer, None) };
            return Err(ReproError::NoSuitableMemory {
                device: device.name().to_string(),
                required: size,
            });
        }

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(size.max(requirements.size))
            .memory_type_index(memory_type_index);
        let memory = match unsafe { raw.allocate_memory(&alloc_info, None) }.check("vkAllocateMemory") {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { raw.destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        // From here on drop releases both handles.
        let this = Self {
            device: raw.clone(),
            role,
            buffer,
            memory,
        };
        unsafe { raw.bind_buffer_memory(buffer, memory, 0) }.check("vkBindBufferMemory")?;

        debug!(
            buffer = role.name(),
            size,
            allocation = alloc_info.allocation_size,
            "created buffer"
        );
        Ok(this)
    }

    pub fn raw(&self) -> vk::Buffer {
        self.buffer
    }

    /// Map the buffer's contents for host access.
    pub fn map(&self) -> Result<MappedMemory<'_>, PlatformError> {
        MappedMemory::map(&self.device, self.memory, self.role.byte_size() as usize)
    }

    /// Write `data` through a mapping that is released before returning.
    pub fn upload(&self, data: &[f32]) -> Result<(), PlatformError> {
        let mut mapped = self.map()?;
        mapped.write_f32(data);
        Ok(())
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// The `in1`, `in2` and `out` buffers.
pub struct BufferTriple {
    in1: DeviceBuffer,
    in2: DeviceBuffer,
    out: DeviceBuffer,
}

impl BufferTriple {
    /// Create all three buffers and write the input contents.
    pub fn provision(device: &LogicalDevice, memory_type_index: u32) -> Result<Self, ReproError> {
        let provision_one = |role: BufferRole| -> Result<DeviceBuffer, ReproError> {
            let buffer = DeviceBuffer::create(device, role, memory_type_index)?;
            if let Some(data) = role.initial_contents() {
                buffer.upload(&data)?;
            }
            Ok(buffer)
        };
        Ok(Self {
            in1: provision_one(BufferRole::In1)?,
            in2: provision_one(BufferRole::In2)?,
            out: provision_one(BufferRole::Out)?,
        })
    }

    pub fn get(&self, role: BufferRole) -> &DeviceBuffer {
        match role {
            BufferRole::In1 => &self.in1,
            BufferRole::In2 => &self.in2,
            BufferRole::Out => &self.out,
        }
    }
}

/// Descriptor pool holding the one set the dispatch binds.
pub struct DescriptorBindings {
    device: ash::Device,
    pool: vk::DescriptorPool,
    set: vk::DescriptorSet,
}

impl DescriptorBindings {
    /// Allocate a set against `layout` and point every slot at its buffer.
    pub fn create(
        device: &ash::Device,
        layout: &DescriptorLayout,
        buffers: &BufferTriple,
    ) -> Result<Self, PlatformError> {
        let sizes = pool_sizes();
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(1)
            .pool_sizes(&sizes);
        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
            .check("vkCreateDescriptorPool")?;
        let mut this = Self {
            device: device.clone(),
            pool,
            set: vk::DescriptorSet::null(),
        };

        let layouts = [layout.raw()];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&layouts);
        this.set = unsafe { device.allocate_descriptor_sets(&alloc_info) }
            .check("vkAllocateDescriptorSets")?[0];

        let buffer_infos: Vec<[vk::DescriptorBufferInfo; 1]> = BINDING_TABLE
            .iter()
            .map(|slot| {
                [vk::DescriptorBufferInfo {
                    buffer: buffers.get(slot.role).raw(),
                    offset: 0,
                    range: vk::WHOLE_SIZE,
                }]
            })
            .collect();
        let writes: Vec<vk::WriteDescriptorSet> = BINDING_TABLE
            .iter()
            .zip(buffer_infos.iter())
            .map(|(slot, info)| {
                vk::WriteDescriptorSet::default()
                    .dst_set(this.set)
                    .dst_binding(slot.binding)
                    .dst_array_element(0)
                    .descriptor_type(slot.kind)
                    .buffer_info(info)
            })
            .collect();
        unsafe { device.update_descriptor_sets(&writes, &[]) };

        Ok(this)
    }

    pub fn set(&self) -> vk::DescriptorSet {
        self.set
    }
}

impl Drop for DescriptorBindings {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}
