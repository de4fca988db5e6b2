//! Headless wgpu device acquisition and setup-time error reporting.
//!
//! Everything that can fail here is fatal to startup: the caller reports the
//! error and never reaches the render loop. Shader-compilation failures are
//! kept distinct from missing asset files because they demand different
//! fixes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no compatible graphics adapter found")]
    AdapterNotFound,
    #[error("failed to create device: {0}")]
    DeviceCreation(String),
    #[error("shader '{name}' failed to compile: {detail}")]
    ShaderCompile { name: String, detail: String },
    #[error("support texture missing: {path}")]
    AssetMissing { path: String },
    #[error("failed to decode support texture {path}: {detail}")]
    AssetDecode { path: String, detail: String },
}

/// Device, queue and the colour format the pipeline renders in.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
}

impl GpuContext {
    /// Acquire a headless device. The off-screen chain renders in
    /// `Rgba8Unorm` so frames can be read back and encoded directly.
    pub async fn new_headless() -> Result<Self, SetupError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(SetupError::AdapterNotFound)?;

        log::info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Afterglow Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| SetupError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            format: wgpu::TextureFormat::Rgba8Unorm,
        })
    }
}

/// Compile a WGSL module inside a validation error scope so compiler
/// diagnostics surface as a [`SetupError::ShaderCompile`] instead of a
/// device loss later on.
pub fn compile_shader(
    device: &wgpu::Device,
    name: &str,
    source: &str,
) -> Result<wgpu::ShaderModule, SetupError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(name),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(SetupError::ShaderCompile {
            name: name.to_string(),
            detail: error.to_string(),
        });
    }
    Ok(module)
}
