//! Kernel loading and compute pipeline construction.

use std::ffi::CString;
use std::io::Cursor;
use std::path::Path;

use ash::vk;
use tracing::{debug, warn};

use crate::bindings::DescriptorLayout;
use crate::error::{PlatformError, ReproError, VkCheck};

/// A pre-compiled SPIR-V kernel and the entry point to run.
#[derive(Debug, Clone)]
pub struct Kernel {
    bytes: Vec<u8>,
    entry_point: CString,
}

impl Kernel {
    pub fn new(bytes: Vec<u8>, entry_point: &str) -> Result<Self, ReproError> {
        let entry_point = CString::new(entry_point).map_err(|_| {
            ReproError::Usage("entry point name must not contain NUL bytes".to_string())
        })?;
        Ok(Self { bytes, entry_point })
    }

    /// Read the kernel file whole. Its contents are not inspected here.
    pub fn load(path: &Path, entry_point: &str) -> Result<Self, ReproError> {
        let bytes = std::fs::read(path).map_err(|source| ReproError::KernelRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "read kernel");
        Self::new(bytes, entry_point)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn entry_point(&self) -> &CString {
        &self.entry_point
    }
}

/// Reinterpret kernel bytes as SPIR-V words.
///
/// Fails when the length is zero or not a multiple of 4: such a binary cannot
/// form a shader module, so it is reported as a failed `vkCreateShaderModule`.
#[track_caller]
pub fn kernel_words(bytes: &[u8]) -> Result<Vec<u32>, PlatformError> {
    let failed = PlatformError::new("vkCreateShaderModule", vk::Result::ERROR_INITIALIZATION_FAILED);
    match ash::util::read_spv(&mut Cursor::new(bytes)) {
        Ok(words) if !words.is_empty() => Ok(words),
        Ok(_) => {
            warn!("kernel binary is empty");
            Err(failed)
        }
        Err(e) => {
            warn!(error = %e, bytes = bytes.len(), "kernel binary is not a sequence of 4-byte words");
            Err(failed)
        }
    }
}

/// Shader module, pipeline layout and compute pipeline for one kernel.
pub struct ComputePipeline {
    device: ash::Device,
    shader_module: vk::ShaderModule,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl ComputePipeline {
    /// Compile `kernel` against the binding-table layout.
    pub fn build(
        device: &ash::Device,
        kernel: &Kernel,
        set_layout: &DescriptorLayout,
    ) -> Result<Self, PlatformError> {
        let words = kernel_words(kernel.bytes())?;
        let module_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let shader_module = unsafe { device.create_shader_module(&module_info, None) }
            .check("vkCreateShaderModule")?;
        let mut this = Self {
            device: device.clone(),
            shader_module,
            layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        };

        let set_layouts = [set_layout.raw()];
        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        this.layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .check("vkCreatePipelineLayout")?;

        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader_module)
            .name(kernel.entry_point());
        let pipeline_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(this.layout);
        let pipelines = unsafe {
            device.create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        }
        .map_err(|(_, result)| PlatformError::new("vkCreateComputePipelines", result))?;
        this.pipeline = pipelines[0];

        debug!(
            words = words.len(),
            entry_point = %kernel.entry_point().to_string_lossy(),
            "built compute pipeline"
        );
        Ok(this)
    }

    pub fn raw(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for ComputePipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
            self.device.destroy_shader_module(self.shader_module, None);
        }
    }
}
