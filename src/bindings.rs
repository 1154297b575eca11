//! The kernel's resource slots.
//!
//! [`BINDING_TABLE`] is the only place the slot → buffer mapping is written
//! down. The descriptor-set layout the pipeline is compiled against, the
//! descriptor pool sizes and the descriptor writes are all derived from it.

use ash::vk;

use crate::error::{PlatformError, VkCheck};

/// Role of each of the three buffers the kernel sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferRole {
    In1,
    In2,
    Out,
}

impl BufferRole {
    /// Number of `f32` elements in the buffer.
    pub const fn element_count(self) -> usize {
        match self {
            BufferRole::In1 => 20,
            BufferRole::In2 => 6,
            BufferRole::Out => 20,
        }
    }

    pub const fn byte_size(self) -> vk::DeviceSize {
        (self.element_count() * std::mem::size_of::<f32>()) as vk::DeviceSize
    }

    /// Host-written contents, `None` for the output buffer.
    pub fn initial_contents(self) -> Option<Vec<f32>> {
        match self {
            BufferRole::In1 => Some((0..self.element_count()).map(|i| i as f32).collect()),
            BufferRole::In2 => Some(vec![1.0, 4.0, 2.0, -2.0, 0.0, 1.0]),
            BufferRole::Out => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferRole::In1 => "in1",
            BufferRole::In2 => "in2",
            BufferRole::Out => "out",
        }
    }
}

/// Total bytes of all three buffers; the memory classifier's admission size.
pub const fn total_buffer_bytes() -> vk::DeviceSize {
    BufferRole::In1.byte_size() + BufferRole::In2.byte_size() + BufferRole::Out.byte_size()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSlot {
    pub binding: u32,
    pub role: BufferRole,
    pub kind: vk::DescriptorType,
}

pub const BINDING_TABLE: [BindingSlot; 3] = [
    BindingSlot {
        binding: 0,
        role: BufferRole::In1,
        kind: vk::DescriptorType::STORAGE_BUFFER,
    },
    BindingSlot {
        binding: 1,
        role: BufferRole::In2,
        kind: vk::DescriptorType::STORAGE_BUFFER,
    },
    BindingSlot {
        binding: 2,
        role: BufferRole::Out,
        kind: vk::DescriptorType::STORAGE_BUFFER,
    },
];

/// Layout bindings, one descriptor per slot, visible to the compute stage only.
pub fn layout_bindings() -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    BINDING_TABLE
        .iter()
        .map(|slot| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(slot.binding)
                .descriptor_type(slot.kind)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::COMPUTE)
        })
        .collect()
}

/// Pool sizes for exactly one set of [`BINDING_TABLE`].
pub fn pool_sizes() -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for slot in &BINDING_TABLE {
        match sizes.iter_mut().find(|size| size.ty == slot.kind) {
            Some(size) => size.descriptor_count += 1,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: slot.kind,
                descriptor_count: 1,
            }),
        }
    }
    sizes
}

/// Descriptor-set layout built from [`BINDING_TABLE`], destroyed on drop.
pub struct DescriptorLayout {
    device: ash::Device,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorLayout {
    pub fn create(device: &ash::Device) -> Result<Self, PlatformError> {
        let bindings = layout_bindings();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&info, None) }
            .check("vkCreateDescriptorSetLayout")?;
        Ok(Self {
            device: device.clone(),
            layout,
        })
    }

    pub fn raw(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_slots_are_dense_and_unique() {
        for (i, slot) in BINDING_TABLE.iter().enumerate() {
            assert_eq!(slot.binding, i as u32);
        }
        let roles: HashSet<BufferRole> = BINDING_TABLE.iter().map(|s| s.role).collect();
        assert_eq!(roles.len(), BINDING_TABLE.len());
        for role in [BufferRole::In1, BufferRole::In2, BufferRole::Out] {
            assert!(roles.contains(&role), "{} has no slot", role.name());
        }
    }

    #[test]
    fn test_table_mapping() {
        assert_eq!(BINDING_TABLE[0].role, BufferRole::In1);
        assert_eq!(BINDING_TABLE[1].role, BufferRole::In2);
        assert_eq!(BINDING_TABLE[2].role, BufferRole::Out);
        assert!(BINDING_TABLE
            .iter()
            .all(|s| s.kind == vk::DescriptorType::STORAGE_BUFFER));
    }

    #[test]
    fn test_layout_bindings_match_table() {
        let bindings = layout_bindings();
        assert_eq!(bindings.len(), BINDING_TABLE.len());
        for (binding, slot) in bindings.iter().zip(BINDING_TABLE.iter()) {
            assert_eq!(binding.binding, slot.binding);
            assert_eq!(binding.descriptor_type, slot.kind);
            assert_eq!(binding.descriptor_count, 1);
            assert_eq!(binding.stage_flags, vk::ShaderStageFlags::COMPUTE);
        }
    }

    #[test]
    fn test_pool_sizes_cover_three_storage_buffers() {
        let sizes = pool_sizes();
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].ty, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 3);
    }

    #[test]
    fn test_buffer_sizes() {
        assert_eq!(BufferRole::In1.byte_size(), 80);
        assert_eq!(BufferRole::In2.byte_size(), 24);
        assert_eq!(BufferRole::Out.byte_size(), 80);
        assert_eq!(total_buffer_bytes(), 184);
    }

    #[test]
    fn test_initial_contents() {
        let in1 = BufferRole::In1.initial_contents().unwrap();
        assert_eq!(in1.len(), 20);
        assert_eq!(in1[0], 0.0);
        assert_eq!(in1[19], 19.0);
        assert!(in1.iter().enumerate().all(|(i, &v)| v == i as f32));

        assert_eq!(
            BufferRole::In2.initial_contents().unwrap(),
            vec![1.0, 4.0, 2.0, -2.0, 0.0, 1.0]
        );
        assert!(BufferRole::Out.initial_contents().is_none());
    }

    #[test]
    fn test_initial_contents_fit_buffers() {
        for role in BINDING_TABLE.iter().map(|slot| slot.role) {
            if let Some(data) = role.initial_contents() {
                assert_eq!(data.len(), role.element_count(), "{}", role.name());
            }
        }
    }
}
