//! Vulkan instance creation, accelerator enumeration, compute queue selection
//! and logical device setup.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info};

use crate::error::{PlatformError, ReproError, VkCheck};
use crate::memory::{memory_type_table, MemoryTypeInfo};

const APPLICATION_NAME: &CStr = c"VKComputeSample";

/// Pick a queue family for compute submission.
///
/// Transfer and sparse-binding bits are ignored. A dedicated compute family
/// (compute without graphics) wins over a combined graphics + compute one;
/// within each pass the lowest index wins.
pub fn select_compute_queue_family(families: &[vk::QueueFlags]) -> Option<u32> {
    let masked = |flags: vk::QueueFlags| {
        flags & !(vk::QueueFlags::TRANSFER | vk::QueueFlags::SPARSE_BINDING)
    };

    let dedicated = families.iter().position(|&flags| {
        let flags = masked(flags);
        flags.contains(vk::QueueFlags::COMPUTE) && !flags.contains(vk::QueueFlags::GRAPHICS)
    });

    dedicated
        .or_else(|| {
            families
                .iter()
                .position(|&flags| masked(flags).contains(vk::QueueFlags::COMPUTE))
        })
        .map(|i| i as u32)
}

/// Loaded Vulkan entry points and the instance created from them.
pub struct Platform {
    _entry: ash::Entry,
    instance: ash::Instance,
}

impl Platform {
    /// Load the Vulkan loader and create an instance with no layers or extensions.
    pub fn new() -> Result<Self, ReproError> {
        let entry = unsafe { ash::Entry::load()? };

        let app_info = vk::ApplicationInfo::default()
            .application_name(APPLICATION_NAME)
            .application_version(0)
            .engine_version(0)
            .api_version(vk::make_api_version(0, 1, 0, 9));

        let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .check("vkCreateInstance")?;

        Ok(Self {
            _entry: entry,
            instance,
        })
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Enumerate every physical device, reading the tables the harness needs.
    pub fn accelerators(&self) -> Result<Vec<Accelerator>, PlatformError> {
        let handles = unsafe { self.instance.enumerate_physical_devices() }
            .check("vkEnumeratePhysicalDevices")?;

        Ok(handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| Accelerator::query(&self.instance, index, handle))
            .collect())
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}

/// A physical device and the capability tables read from it.
pub struct Accelerator {
    pub index: usize,
    pub handle: vk::PhysicalDevice,
    pub name: String,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl Accelerator {
    fn query(instance: &ash::Instance, index: usize, handle: vk::PhysicalDevice) -> Self {
        let props = unsafe { instance.get_physical_device_properties(handle) };
        let name = props
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| format!("device #{}", index));
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(handle) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(handle) };

        debug!(
            index,
            name = %name,
            queue_families = queue_families.len(),
            memory_types = memory_properties.memory_type_count,
            "queried accelerator"
        );

        Self {
            index,
            handle,
            name,
            queue_families,
            memory_properties,
        }
    }

    /// Queue family to submit the dispatch on, or `NoSuitableQueue`.
    pub fn compute_queue_family(&self) -> Result<u32, ReproError> {
        let flags: Vec<vk::QueueFlags> =
            self.queue_families.iter().map(|f| f.queue_flags).collect();
        select_compute_queue_family(&flags).ok_or_else(|| ReproError::NoSuitableQueue {
            device: self.name.clone(),
        })
    }

    /// The memory-type table in index order.
    pub fn memory_types(&self) -> Vec<MemoryTypeInfo> {
        memory_type_table(&self.memory_properties)
    }
}

/// Logical device with a single queue from the chosen family.
///
/// Every object created during an accelerator iteration must be dropped
/// before this value.
pub struct LogicalDevice {
    device: ash::Device,
    name: String,
    queue_family_index: u32,
}

impl LogicalDevice {
    pub fn create(
        platform: &Platform,
        accelerator: &Accelerator,
        queue_family_index: u32,
    ) -> Result<Self, PlatformError> {
        let priorities = [1.0f32];
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&priorities)];
        let device_info = vk::DeviceCreateInfo::default().queue_create_infos(&queue_infos);

        let device = unsafe {
            platform
                .instance()
                .create_device(accelerator.handle, &device_info, None)
        }
        .check("vkCreateDevice")?;

        info!(
            accelerator = accelerator.index,
            queue_family = queue_family_index,
            "created logical device"
        );

        Ok(Self {
            device,
            name: accelerator.name.clone(),
            queue_family_index,
        })
    }

    pub fn raw(&self) -> &ash::Device {
        &self.device
    }

    /// Name of the accelerator this device was created on.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Queue 0 of the selected family.
    pub fn queue(&self) -> vk::Queue {
        unsafe { self.device.get_device_queue(self.queue_family_index, 0) }
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);
        }
    }
}
