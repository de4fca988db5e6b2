//! The pipeline sequencer: drives the filter chain through the GPU.
//!
//! Owns the ping-pong pair, the bloom intermediate and the per-technique
//! pipelines. Techniques are resolved once at startup; per-frame code never
//! looks anything up by name. Every stage draws a parameterless 4-vertex
//! triangle strip whose geometry the vertex stage derives from the bound
//! area rectangle, so there is no vertex or index buffer anywhere in the
//! post-process path.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wgpu::util::DeviceExt;

use crate::animator::ParamAnimator;
use crate::area::AreaRect;
use crate::chain::FilterChain;
use crate::filter::{EffectRegistry, FilterKind};
use crate::gpu::context::{compile_shader, SetupError};
use crate::gpu::maps::SupportMaps;
use crate::gpu::ping_pong::{
    create_colour_target, plan_bloom, plan_chain, Buffer, PingPongPair, Target,
};
use crate::settings::EffectSettings;

/// Fixed size of every per-technique parameter buffer.
const PARAM_BUFFER_SIZE: u64 = 64;

/// Depth format shared with the scene pass; area-restricted quads test
/// against it so they sit at their projected depth in the scene.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-stage uniforms consumed by the quad vertex stage and some fragments.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct StageUniforms {
    area_top_left: [f32; 2],
    area_bottom_right: [f32; 2],
    area_depth: f32,
    viewport_width: f32,
    viewport_height: f32,
    _pad: f32,
}

impl StageUniforms {
    fn new(rect: AreaRect, width: u32, height: u32) -> Self {
        Self {
            area_top_left: rect.top_left.to_array(),
            area_bottom_right: rect.bottom_right.to_array(),
            area_depth: rect.depth,
            viewport_width: width as f32,
            viewport_height: height as f32,
            _pad: 0.0,
        }
    }
}

// Parameter blocks, one explicit layout per technique family. Field order
// and padding match the WGSL uniform structs.

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct TintParams {
    colour: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct TintDualParams {
    colour_a: [f32; 4],
    colour_b: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct NoiseParams {
    scale: [f32; 2],
    offset: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct ScalarParams {
    value: f32,
    _pad: [f32; 3],
}

impl ScalarParams {
    fn new(value: f32) -> Self {
        Self {
            value,
            _pad: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct WaterParams {
    colour: [f32; 4],
    phase: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct RetroParams {
    pixelation: f32,
    colour_depth: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BlurParams {
    direction: [f32; 2],
    sigma: f32,
    _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CompositeParams {
    intensity: f32,
    original_intensity: f32,
    saturation: f32,
    original_saturation: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GameboyParams {
    pixels: f32,
    colour_depth: f32,
    _pad: [f32; 2],
    colour: [f32; 4],
}

/// Resolved GPU resources for one technique.
struct TechniqueResources {
    pipeline: wgpu::RenderPipeline,
    /// Depth-tested variant used for area-restricted passes. The internal
    /// bloom techniques never run area-restricted and skip it.
    area_pipeline: Option<wgpu::RenderPipeline>,
    param_buffer: wgpu::Buffer,
    param_bind_group: wgpu::BindGroup,
    /// Which support map the technique samples, from its descriptor.
    support_map: Option<crate::filter::SupportMap>,
}

/// Internal bloom techniques, separate from user-addable filters so a
/// standalone blur in the chain cannot clobber the bloom blur parameters.
struct BloomResources {
    extract: TechniqueResources,
    blur_horizontal: TechniqueResources,
    blur_vertical: TechniqueResources,
    composite: TechniqueResources,
    target_view: wgpu::TextureView,
    target_texture: wgpu::Texture,
}

pub struct PipelineSequencer {
    ping_pong: PingPongPair,
    effects: HashMap<FilterKind, TechniqueResources>,
    bloom: BloomResources,

    texture_layout: wgpu::BindGroupLayout,
    param_layout: wgpu::BindGroupLayout,
    stage_layout: wgpu::BindGroupLayout,

    scene_sampler: wgpu::Sampler,
    /// Repeat-addressed sampler for the tiling support maps.
    map_sampler: wgpu::Sampler,

    fullscreen_stage_buffer: wgpu::Buffer,
    fullscreen_stage_bind_group: wgpu::BindGroup,

    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    rng: StdRng,
}

fn technique_shader(kind: FilterKind) -> (&'static str, &'static str) {
    match kind {
        FilterKind::Copy => ("post_copy", include_str!("shader_post_copy.wgsl")),
        FilterKind::Tint => ("post_tint", include_str!("shader_post_tint.wgsl")),
        FilterKind::TintDual => ("post_tint_dual", include_str!("shader_post_tint_dual.wgsl")),
        FilterKind::GreyNoise => (
            "post_grey_noise",
            include_str!("shader_post_grey_noise.wgsl"),
        ),
        FilterKind::Burn => ("post_burn", include_str!("shader_post_burn.wgsl")),
        FilterKind::Distort => ("post_distort", include_str!("shader_post_distort.wgsl")),
        FilterKind::Spiral => ("post_spiral", include_str!("shader_post_spiral.wgsl")),
        FilterKind::HeatHaze => ("post_heat_haze", include_str!("shader_post_heat_haze.wgsl")),
        FilterKind::Water => ("post_water", include_str!("shader_post_water.wgsl")),
        FilterKind::Retro => ("post_retro", include_str!("shader_post_retro.wgsl")),
        FilterKind::Grayscale => ("post_grayscale", include_str!("shader_post_grayscale.wgsl")),
        FilterKind::Invert => ("post_invert", include_str!("shader_post_invert.wgsl")),
        FilterKind::GaussianBlurHorizontal | FilterKind::GaussianBlurVertical => (
            "post_gaussian_blur",
            include_str!("shader_post_gaussian_blur.wgsl"),
        ),
        FilterKind::Bloom => (
            "post_bloom_composite",
            include_str!("shader_post_bloom_composite.wgsl"),
        ),
        FilterKind::Gameboy => ("post_gameboy", include_str!("shader_post_gameboy.wgsl")),
    }
}

impl PipelineSequencer {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        registry: &EffectRegistry,
    ) -> Result<Self, SetupError> {
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let param_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Param Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let stage_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Stage Layout"),
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

        let scene_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Scene Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let map_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Map Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Post Pipeline Layout"),
            bind_group_layouts: &[&texture_layout, &param_layout, &stage_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let make_technique = |kind_label: &str,
                              shader_name: &str,
                              shader_src: &str,
                              with_area: bool,
                              support_map: Option<crate::filter::SupportMap>|
         -> Result<TechniqueResources, SetupError> {
            let module = compile_shader(device, shader_name, shader_src)?;
            let pipeline = create_quad_pipeline(
                device,
                &pipeline_layout,
                &module,
                format,
                kind_label,
                false,
            );
            let area_pipeline = with_area.then(|| {
                create_quad_pipeline(device, &pipeline_layout, &module, format, kind_label, true)
            });
            let param_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Post Params: {kind_label}")),
                size: PARAM_BUFFER_SIZE,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let param_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Post Param Bind Group: {kind_label}")),
                layout: &param_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: param_buffer.as_entire_binding(),
                }],
            });
            Ok(TechniqueResources {
                pipeline,
                area_pipeline,
                param_buffer,
                param_bind_group,
                support_map,
            })
        };

        let mut effects = HashMap::new();
        for kind in registry.kinds() {
            let (shader_name, shader_src) = technique_shader(kind);
            let descriptor = registry.lookup(kind);
            effects.insert(
                kind,
                make_technique(
                    kind.name(),
                    shader_name,
                    shader_src,
                    true,
                    descriptor.support_map,
                )?,
            );
        }

        let (bloom_target, bloom_target_view) =
            create_colour_target(device, format, width, height, "Bloom Intermediate");
        let bloom = BloomResources {
            extract: make_technique(
                "bloom_extract",
                "post_bloom_extract",
                include_str!("shader_post_bloom_extract.wgsl"),
                false,
                None,
            )?,
            blur_horizontal: make_technique(
                "bloom_blur_horizontal",
                "post_gaussian_blur",
                include_str!("shader_post_gaussian_blur.wgsl"),
                false,
                None,
            )?,
            blur_vertical: make_technique(
                "bloom_blur_vertical",
                "post_gaussian_blur",
                include_str!("shader_post_gaussian_blur.wgsl"),
                false,
                None,
            )?,
            composite: make_technique(
                "bloom_composite",
                "post_bloom_composite",
                include_str!("shader_post_bloom_composite.wgsl"),
                false,
                None,
            )?,
            target_view: bloom_target_view,
            target_texture: bloom_target,
        };

        let fullscreen_stage_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Post Full-Screen Stage Uniforms"),
            size: std::mem::size_of::<StageUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let fullscreen_stage_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Full-Screen Stage Bind Group"),
            layout: &stage_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: fullscreen_stage_buffer.as_entire_binding(),
            }],
        });

        log::info!(
            "pipeline sequencer ready: {} techniques at {}x{}",
            effects.len(),
            width,
            height
        );

        Ok(Self {
            ping_pong: PingPongPair::new(device, format, width, height),
            effects,
            bloom,
            texture_layout,
            param_layout,
            stage_layout,
            scene_sampler,
            map_sampler,
            fullscreen_stage_buffer,
            fullscreen_stage_bind_group,
            width,
            height,
            format,
            rng: StdRng::from_entropy(),
        })
    }

    /// The view the external scene renderer draws into this frame.
    ///
    /// Always the ping-pong pair's current write target; [`scene_rendered`]
    /// marks it as the read source once the scene pass has run.
    pub fn scene_target_view(&self) -> &wgpu::TextureView {
        self.ping_pong.write_view()
    }

    /// Mark the scene image as the chain's starting read source.
    pub fn scene_rendered(&mut self) {
        let written = self.ping_pong.read_source().other();
        self.ping_pong.set_read_source(written);
    }

    /// Recreate all viewport-sized targets at a new output size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.ping_pong.resize(device, width, height);
        self.bloom.target_texture.destroy();
        let (target, view) =
            create_colour_target(device, self.format, width, height, "Bloom Intermediate");
        self.bloom.target_texture = target;
        self.bloom.target_view = view;
        log::debug!("post targets resized to {}x{}", width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Run the full-screen filter chain: each stage reads the valid buffer
    /// and writes the other, the last stage writes the presentation target.
    /// A chain with no entries degenerates to a single pass-through copy so
    /// the presentation target always receives a valid image.
    pub fn process(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        chain: &FilterChain,
        animator: &ParamAnimator,
        settings: &EffectSettings,
        maps: &SupportMaps,
        presentation_view: &wgpu::TextureView,
    ) {
        let full_screen = StageUniforms::new(AreaRect::full_screen(), self.width, self.height);
        queue.write_buffer(
            &self.fullscreen_stage_buffer,
            0,
            bytemuck::bytes_of(&full_screen),
        );

        let kinds: Vec<FilterKind> = if chain.is_empty() {
            vec![FilterKind::Copy]
        } else {
            chain.entries().to_vec()
        };
        let plan = plan_chain(kinds.len(), self.ping_pong.read_source());

        for (pass, &kind) in plan.passes.iter().zip(&kinds) {
            let last = pass.output == Target::Presentation;
            if kind == FilterKind::Bloom {
                self.run_bloom(device, queue, encoder, settings, pass.input, pass.output, presentation_view);
            } else {
                self.write_params(queue, kind, animator, settings);
                let input_view = self.ping_pong.view(pass.input);
                let output_view = match pass.output {
                    Target::PingPong(buffer) => self.ping_pong.view(buffer),
                    Target::Presentation => presentation_view,
                };
                self.draw_quad(
                    device,
                    encoder,
                    kind,
                    input_view,
                    None,
                    output_view,
                    maps,
                );
            }
            if !last {
                self.ping_pong.flip();
            }
        }

        debug_assert_eq!(self.ping_pong.read_source(), plan.final_read);
    }

    /// Run one area-restricted pass: sample the latest full-screen-processed
    /// buffer inside `rect` and composite onto the presentation target,
    /// depth-tested against the scene so the effect sits at its projected
    /// depth.
    pub fn process_area(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        kind: FilterKind,
        rect: AreaRect,
        animator: &ParamAnimator,
        settings: &EffectSettings,
        maps: &SupportMaps,
        presentation_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) {
        if kind == FilterKind::Bloom {
            // The multi-pass composition has no area variant.
            log::warn!("bloom cannot run area-restricted; skipping");
            return;
        }

        self.write_params(queue, kind, animator, settings);

        let stage = StageUniforms::new(rect, self.width, self.height);
        let stage_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Post Area Stage Uniforms"),
            contents: bytemuck::bytes_of(&stage),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let stage_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Area Stage Bind Group"),
            layout: &self.stage_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: stage_buffer.as_entire_binding(),
            }],
        });

        let technique = &self.effects[&kind];
        let area_pipeline = technique
            .area_pipeline
            .as_ref()
            .unwrap_or_else(|| unreachable!("area pipeline built for every registered filter"));

        let input_bind_group =
            self.texture_bind_group(device, self.ping_pong.read_view(), &self.scene_sampler);
        let map_bind_group =
            self.texture_bind_group(device, maps.view(technique.support_map), &self.map_sampler);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Post Area Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: presentation_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(area_pipeline);
        pass.set_bind_group(0, &input_bind_group, &[]);
        pass.set_bind_group(1, &technique.param_bind_group, &[]);
        pass.set_bind_group(2, &stage_bind_group, &[]);
        pass.set_bind_group(3, &map_bind_group, &[]);
        pass.draw(0..4, 0..1);
    }

    /// Fixed three-step bloom sub-sequence plus composite, invoked as a
    /// single chain entry. Borrows the outer write buffer as blur scratch;
    /// the outer ping-pong state advances exactly as for any other stage.
    fn run_bloom(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &EffectSettings,
        input: Buffer,
        output: Target,
        presentation_view: &wgpu::TextureView,
    ) {
        let bloom_plan = plan_bloom(input);

        queue.write_buffer(
            &self.bloom.extract.param_buffer,
            0,
            bytemuck::bytes_of(&ScalarParams::new(settings.bloom_threshold)),
        );
        queue.write_buffer(
            &self.bloom.blur_horizontal.param_buffer,
            0,
            bytemuck::bytes_of(&BlurParams {
                direction: [1.0, 0.0],
                sigma: settings.bloom_sigma,
                _pad: 0.0,
            }),
        );
        queue.write_buffer(
            &self.bloom.blur_vertical.param_buffer,
            0,
            bytemuck::bytes_of(&BlurParams {
                direction: [0.0, 1.0],
                sigma: settings.bloom_sigma,
                _pad: 0.0,
            }),
        );
        queue.write_buffer(
            &self.bloom.composite.param_buffer,
            0,
            bytemuck::bytes_of(&CompositeParams {
                intensity: settings.bloom_intensity,
                original_intensity: settings.bloom_original_intensity,
                saturation: settings.bloom_saturation,
                original_saturation: settings.bloom_original_saturation,
            }),
        );

        // 1. Threshold-extract the scene into the bloom intermediate.
        self.draw_technique_quad(
            device,
            encoder,
            "Bloom Extract Pass",
            &self.bloom.extract,
            self.ping_pong.view(bloom_plan.extract_input),
            None,
            &self.bloom.target_view,
        );

        // 2. Horizontal blur into the outer write buffer (scratch).
        self.draw_technique_quad(
            device,
            encoder,
            "Bloom Horizontal Blur Pass",
            &self.bloom.blur_horizontal,
            &self.bloom.target_view,
            None,
            self.ping_pong.view(bloom_plan.blur_scratch),
        );

        // 3. Vertical blur back into the bloom intermediate.
        self.draw_technique_quad(
            device,
            encoder,
            "Bloom Vertical Blur Pass",
            &self.bloom.blur_vertical,
            self.ping_pong.view(bloom_plan.blur_scratch),
            None,
            &self.bloom.target_view,
        );

        // 4. Composite the untouched scene with the twice-blurred glow.
        let output_view = match output {
            Target::PingPong(buffer) => self.ping_pong.view(buffer),
            Target::Presentation => presentation_view,
        };
        self.draw_technique_quad(
            device,
            encoder,
            "Bloom Composite Pass",
            &self.bloom.composite,
            self.ping_pong.view(bloom_plan.composite_scene),
            Some(&self.bloom.target_view),
            output_view,
        );
    }

    /// Bind the parameters a technique declares, pulling current values from
    /// the animator and settings. One handler per filter tag; no sharing
    /// between adjacent tags.
    fn write_params(
        &mut self,
        queue: &wgpu::Queue,
        kind: FilterKind,
        animator: &ParamAnimator,
        settings: &EffectSettings,
    ) {
        let buffer = &self.effects[&kind].param_buffer;
        match kind {
            FilterKind::Copy | FilterKind::Grayscale | FilterKind::Invert => {}
            FilterKind::Tint => {
                let params = TintParams {
                    colour: extend(settings.tint_colour),
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
            FilterKind::TintDual => {
                let params = TintDualParams {
                    colour_a: extend(animator.tint2_colour_a.to_array()),
                    colour_b: extend(animator.tint2_colour_b.to_array()),
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
            FilterKind::GreyNoise => {
                let params = NoiseParams {
                    scale: [
                        self.width as f32 / settings.grain_size,
                        self.height as f32 / settings.grain_size,
                    ],
                    offset: animator.noise_offset(&mut self.rng),
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
            FilterKind::Burn => {
                queue.write_buffer(
                    buffer,
                    0,
                    bytemuck::bytes_of(&ScalarParams::new(animator.burn_level)),
                );
            }
            FilterKind::Distort => {
                queue.write_buffer(
                    buffer,
                    0,
                    bytemuck::bytes_of(&ScalarParams::new(settings.distort_level)),
                );
            }
            FilterKind::Spiral => {
                queue.write_buffer(
                    buffer,
                    0,
                    bytemuck::bytes_of(&ScalarParams::new(animator.spiral_amount())),
                );
            }
            FilterKind::HeatHaze => {
                queue.write_buffer(
                    buffer,
                    0,
                    bytemuck::bytes_of(&ScalarParams::new(animator.heat_haze_phase)),
                );
            }
            FilterKind::Water => {
                let params = WaterParams {
                    colour: extend(settings.water_colour),
                    phase: animator.wiggle_phase,
                    _pad: [0.0; 3],
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
            FilterKind::Retro => {
                let params = RetroParams {
                    pixelation: settings.retro_pixelation,
                    colour_depth: settings.retro_colour_depth,
                    _pad: [0.0; 2],
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
            FilterKind::GaussianBlurHorizontal => {
                let params = BlurParams {
                    direction: [1.0, 0.0],
                    sigma: settings.blur_sigma,
                    _pad: 0.0,
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
            FilterKind::GaussianBlurVertical => {
                let params = BlurParams {
                    direction: [0.0, 1.0],
                    sigma: settings.blur_sigma,
                    _pad: 0.0,
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
            FilterKind::Bloom => {
                // Bound inside run_bloom; the chain-entry pipeline is the
                // composite and its params are written there.
            }
            FilterKind::Gameboy => {
                let params = GameboyParams {
                    pixels: settings.gameboy_pixels,
                    colour_depth: settings.gameboy_colour_depth,
                    _pad: [0.0; 2],
                    colour: extend(settings.gameboy_colour),
                };
                queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
            }
        }
    }

    fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn draw_quad(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        kind: FilterKind,
        input_view: &wgpu::TextureView,
        secondary_view: Option<&wgpu::TextureView>,
        output_view: &wgpu::TextureView,
        maps: &SupportMaps,
    ) {
        let technique = &self.effects[&kind];
        let label = format!("Post Pass: {}", kind.name());
        let map_view = secondary_view.unwrap_or_else(|| maps.view(technique.support_map));

        let input_bind_group = self.texture_bind_group(device, input_view, &self.scene_sampler);
        let map_bind_group = self.texture_bind_group(device, map_view, &self.map_sampler);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&technique.pipeline);
        pass.set_bind_group(0, &input_bind_group, &[]);
        pass.set_bind_group(1, &technique.param_bind_group, &[]);
        pass.set_bind_group(2, &self.fullscreen_stage_bind_group, &[]);
        pass.set_bind_group(3, &map_bind_group, &[]);
        pass.draw(0..4, 0..1);
    }

    fn draw_technique_quad(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        technique: &TechniqueResources,
        input_view: &wgpu::TextureView,
        secondary_view: Option<&wgpu::TextureView>,
        output_view: &wgpu::TextureView,
    ) {
        let input_bind_group = self.texture_bind_group(device, input_view, &self.scene_sampler);
        // The composite samples the glow through group 3; other passes leave
        // it pointing at the input.
        let map_bind_group = self.texture_bind_group(
            device,
            secondary_view.unwrap_or(input_view),
            &self.scene_sampler,
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&technique.pipeline);
        pass.set_bind_group(0, &input_bind_group, &[]);
        pass.set_bind_group(1, &technique.param_bind_group, &[]);
        pass.set_bind_group(2, &self.fullscreen_stage_bind_group, &[]);
        pass.set_bind_group(3, &map_bind_group, &[]);
        pass.draw(0..4, 0..1);
    }
}

fn extend(rgb: [f32; 3]) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], 1.0]
}

fn create_quad_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    label: &str,
    depth_tested: bool,
) -> wgpu::RenderPipeline {
    let full_label = if depth_tested {
        format!("Post Area Pipeline: {label}")
    } else {
        format!("Post Pipeline: {label}")
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&full_label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: depth_tested.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_uniforms_layout_matches_wgsl() {
        // vec2 + vec2 + four scalars = 32 bytes, mirroring the WGSL struct.
        assert_eq!(std::mem::size_of::<StageUniforms>(), 32);
    }

    #[test]
    fn test_param_blocks_fit_shared_buffer() {
        assert!(std::mem::size_of::<TintDualParams>() as u64 <= PARAM_BUFFER_SIZE);
        assert!(std::mem::size_of::<GameboyParams>() as u64 <= PARAM_BUFFER_SIZE);
        assert!(std::mem::size_of::<WaterParams>() as u64 <= PARAM_BUFFER_SIZE);
        assert!(std::mem::size_of::<CompositeParams>() as u64 <= PARAM_BUFFER_SIZE);
    }

    #[test]
    fn test_gameboy_params_layout() {
        // The vec4 colour must land on a 16-byte boundary.
        assert_eq!(std::mem::size_of::<GameboyParams>(), 32);
        assert_eq!(std::mem::offset_of!(GameboyParams, colour), 16);
    }
}
