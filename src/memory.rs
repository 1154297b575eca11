//! Memory type selection and scoped host mappings.

use std::ffi::c_void;
use std::ptr::NonNull;

use ash::vk;
use tracing::debug;

use crate::device::Accelerator;
use crate::error::{PlatformError, ReproError, VkCheck};

/// One row of an accelerator's memory-type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTypeInfo {
    pub host_visible: bool,
    pub host_coherent: bool,
    pub heap_index: u32,
    /// Byte capacity of the heap this type allocates from.
    pub heap_size: vk::DeviceSize,
}

/// Flatten Vulkan memory properties into a table in memory-type index order.
pub fn memory_type_table(props: &vk::PhysicalDeviceMemoryProperties) -> Vec<MemoryTypeInfo> {
    let count = (props.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES);
    props.memory_types[..count]
        .iter()
        .map(|ty| {
            let heap_size = props
                .memory_heaps
                .get(ty.heap_index as usize)
                .map_or(0, |heap| heap.size);
            MemoryTypeInfo {
                host_visible: ty
                    .property_flags
                    .contains(vk::MemoryPropertyFlags::HOST_VISIBLE),
                host_coherent: ty
                    .property_flags
                    .contains(vk::MemoryPropertyFlags::HOST_COHERENT),
                heap_index: ty.heap_index,
                heap_size,
            }
        })
        .collect()
}

/// First memory type that is host-visible, host-coherent and whose heap is
/// strictly larger than `required` bytes.
pub fn select_memory_type(types: &[MemoryTypeInfo], required: vk::DeviceSize) -> Option<u32> {
    types
        .iter()
        .position(|ty| ty.host_visible && ty.host_coherent && required < ty.heap_size)
        .map(|i| i as u32)
}

impl Accelerator {
    /// Memory type for all of the harness's buffers, or `NoSuitableMemory`.
    pub fn host_memory_type(&self, required: vk::DeviceSize) -> Result<u32, ReproError> {
        let types = self.memory_types();
        let index = select_memory_type(&types, required).ok_or_else(|| {
            ReproError::NoSuitableMemory {
                device: self.name.clone(),
                required,
            }
        })?;
        debug!(
            memory_type = index,
            heap = types[index as usize].heap_index,
            heap_size = types[index as usize].heap_size,
            required,
            "selected memory type"
        );
        Ok(index)
    }
}

/// A host mapping of a whole allocation, unmapped on drop.
pub struct MappedMemory<'a> {
    device: &'a ash::Device,
    memory: vk::DeviceMemory,
    ptr: NonNull<c_void>,
    len: usize,
}

impl<'a> MappedMemory<'a> {
    /// Map the first `len` bytes of `memory`.
    pub fn map(
        device: &'a ash::Device,
        memory: vk::DeviceMemory,
        len: usize,
    ) -> Result<Self, PlatformError> {
        let raw = unsafe {
            device.map_memory(memory, 0, len as vk::DeviceSize, vk::MemoryMapFlags::empty())
        }
        .check("vkMapMemory")?;
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => {
                unsafe { device.unmap_memory(memory) };
                return Err(PlatformError::new(
                    "vkMapMemory",
                    vk::Result::ERROR_MEMORY_MAP_FAILED,
                ));
            }
        };
        Ok(Self {
            device,
            memory,
            ptr,
            len,
        })
    }

    /// Copy `data` to the start of the mapping.
    pub fn write_f32(&mut self, data: &[f32]) {
        let bytes = std::mem::size_of_val(data);
        assert!(bytes <= self.len, "write of {} bytes into {}-byte mapping", bytes, self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr() as *const u8,
                self.ptr.as_ptr() as *mut u8,
                bytes,
            );
        }
    }

    /// Copy `count` floats from the start of the mapping.
    pub fn read_f32(&self, count: usize) -> Vec<f32> {
        let bytes = count * std::mem::size_of::<f32>();
        assert!(bytes <= self.len, "read of {} bytes from {}-byte mapping", bytes, self.len);
        let mut out = vec![0.0f32; count];
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.ptr.as_ptr() as *const u8,
                out.as_mut_ptr() as *mut u8,
                bytes,
            );
        }
        out
    }
}

impl Drop for MappedMemory<'_> {
    fn drop(&mut self) {
        unsafe { self.device.unmap_memory(self.memory) };
    }
}
