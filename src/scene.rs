//! The scene-renderer seam.
//!
//! The entity/scene renderer proper is an external collaborator: the
//! pipeline only needs something that draws into the buffer it is handed
//! and can report where a named entity currently is (for anchoring
//! area-restricted effects). [`TestCardScene`] is the built-in stand-in
//! used by the offline render path: an animated backdrop with a bright
//! orbiting blob named `cubey`.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::camera::Camera;
use crate::gpu::context::{compile_shader, SetupError};
use crate::gpu::sequencer::DEPTH_FORMAT;

/// What the frame orchestrator requires of the scene renderer.
pub trait SceneRenderer {
    /// Advance scene simulation by `dt` seconds.
    fn update(&mut self, dt: f32);

    /// Draw the scene into `colour_view`, writing depth into `depth_view`.
    fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        colour_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        camera: &Camera,
    );

    /// Current world position of a named entity, if it exists.
    fn entity_position(&self, name: &str) -> Option<Vec3>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    blob_world: [f32; 4],
    time: f32,
    aspect: f32,
    _pad: [f32; 2],
}

/// Procedural demo scene: drifting gradient plus an orbiting bright blob.
pub struct TestCardScene {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    time: f32,
    blob_position: Vec3,
}

/// Orbit followed by the blob, giving area effects a moving anchor.
const ORBIT_CENTRE: Vec3 = Vec3::new(0.0, 10.0, -60.0);
const ORBIT_RADIUS: f32 = 18.0;
const ORBIT_SPEED: f32 = 0.6;

impl TestCardScene {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Result<Self, SetupError> {
        let module = compile_shader(
            device,
            "scene_test_card",
            include_str!("gpu/shader_scene_test_card.wgsl"),
        )?;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Test Card Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Test Card Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Test Card Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Test Card Uniform Buffer"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Test Card Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
            time: 0.0,
            blob_position: ORBIT_CENTRE + Vec3::new(ORBIT_RADIUS, 0.0, 0.0),
        })
    }
}

impl SceneRenderer for TestCardScene {
    fn update(&mut self, dt: f32) {
        self.time += dt;
        let angle = self.time * ORBIT_SPEED;
        self.blob_position = ORBIT_CENTRE
            + Vec3::new(
                angle.cos() * ORBIT_RADIUS,
                (self.time * 0.9).sin() * 6.0,
                angle.sin() * ORBIT_RADIUS * 0.5,
            );
    }

    fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        colour_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        camera: &Camera,
    ) {
        let uniforms = SceneUniforms {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            blob_world: self.blob_position.extend(1.0).to_array(),
            time: self.time,
            aspect: camera.aspect(),
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: colour_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    // Ambient clear colour.
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.3,
                        g: 0.3,
                        b: 0.4,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn entity_position(&self, name: &str) -> Option<Vec3> {
        (name == "cubey").then_some(self.blob_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_uniforms_size() {
        // mat4 + vec4 + 4 scalars = 96 bytes, matching the WGSL struct.
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 96);
    }

    #[test]
    fn test_orbit_stays_near_centre() {
        // Pure state arithmetic: simulate updates without a device.
        let mut time = 0.0f32;
        for _ in 0..200 {
            time += 0.033;
            let angle = time * ORBIT_SPEED;
            let pos = ORBIT_CENTRE
                + Vec3::new(
                    angle.cos() * ORBIT_RADIUS,
                    (time * 0.9).sin() * 6.0,
                    angle.sin() * ORBIT_RADIUS * 0.5,
                );
            assert!((pos - ORBIT_CENTRE).length() <= ORBIT_RADIUS + 6.0 + 1e-3);
        }
    }
}
