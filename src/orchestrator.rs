//! The top-level per-frame driver.
//!
//! Owns the pipeline context — camera, chain, animator, settings, sequencer,
//! support maps, scene depth — and sequences each frame: scene pass →
//! full-screen chain → area-restricted passes. Presentation and any overlay
//! belong to the caller. Chain edits from the control surface are queued and
//! applied atomically at the next frame boundary, never mid-frame.

use glam::Vec3;

use crate::animator::ParamAnimator;
use crate::area::project_area;
use crate::camera::Camera;
use crate::chain::FilterChain;
use crate::filter::{EffectRegistry, FilterKind, UnknownFilterError};
use crate::gpu::context::SetupError;
use crate::gpu::maps::SupportMaps;
use crate::gpu::sequencer::{PipelineSequencer, DEPTH_FORMAT};
use crate::scene::SceneRenderer;
use crate::settings::EffectSettings;

/// A deferred chain mutation from the control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainEdit {
    Add(FilterKind),
    Remove(usize),
    MoveUp(usize),
    MoveDown(usize),
}

/// An area-restricted effect anchored to a named scene entity.
#[derive(Clone, Debug)]
pub struct AreaEffect {
    pub filter: FilterKind,
    /// Entity whose transform anchors the area, queried each frame.
    pub anchor: String,
    /// World-space width and height of the camera-facing rectangle.
    pub width: f32,
    pub height: f32,
    /// Pulls (negative) or pushes (positive) the effect's apparent depth.
    pub depth_bias: f32,
}

impl AreaEffect {
    /// Default demo configuration: a spiral over the animated entity,
    /// pulled slightly toward the camera.
    pub fn spiral_over(anchor: impl Into<String>) -> Self {
        Self {
            filter: FilterKind::Spiral,
            anchor: anchor.into(),
            width: 20.0,
            height: 20.0,
            depth_bias: -9.0,
        }
    }
}

pub struct FrameOrchestrator {
    registry: EffectRegistry,
    chain: FilterChain,
    pending_edits: Vec<ChainEdit>,
    animator: ParamAnimator,
    settings: EffectSettings,
    sequencer: PipelineSequencer,
    maps: SupportMaps,
    pub camera: Camera,
    pub area_effects: Vec<AreaEffect>,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl FrameOrchestrator {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        maps: SupportMaps,
    ) -> Result<Self, SetupError> {
        let registry = EffectRegistry::new();
        let sequencer = PipelineSequencer::new(device, format, width, height, &registry)?;
        let settings = EffectSettings::default();
        let animator = ParamAnimator::new(&settings);
        let (depth_texture, depth_view) = create_depth_target(device, width, height);

        let mut camera = Camera::look_at(Vec3::new(25.0, 30.0, 45.0), Vec3::new(0.0, 10.0, -60.0));
        camera.set_clip_planes(2.0, 300_000.0);
        camera.set_aspect(width as f32 / height as f32);

        Ok(Self {
            registry,
            chain: FilterChain::new(),
            pending_edits: Vec::new(),
            animator,
            settings,
            sequencer,
            maps,
            camera,
            area_effects: Vec::new(),
            depth_texture,
            depth_view,
            width,
            height,
        })
    }

    // === Control surface ===

    /// Queue adding a filter by textual identifier; rejected with
    /// [`UnknownFilterError`] when the name has no registry entry.
    pub fn add_filter_by_name(&mut self, name: &str) -> Result<(), UnknownFilterError> {
        let descriptor = self.registry.resolve(name)?;
        self.pending_edits.push(ChainEdit::Add(descriptor.kind));
        Ok(())
    }

    pub fn add_filter(&mut self, kind: FilterKind) {
        self.pending_edits.push(ChainEdit::Add(kind));
    }

    /// Queue removal; the edit is ignored at apply time if it would empty
    /// the chain.
    pub fn remove_filter(&mut self, index: usize) {
        self.pending_edits.push(ChainEdit::Remove(index));
    }

    pub fn move_filter_up(&mut self, index: usize) {
        self.pending_edits.push(ChainEdit::MoveUp(index));
    }

    pub fn move_filter_down(&mut self, index: usize) {
        self.pending_edits.push(ChainEdit::MoveDown(index));
    }

    /// The active chain as human-readable identifiers, in order.
    pub fn chain_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Replace the whole chain (used when loading a chain file at startup).
    pub fn set_chain(&mut self, chain: FilterChain) {
        self.chain = chain;
    }

    pub fn settings(&self) -> &EffectSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut EffectSettings {
        &mut self.settings
    }

    pub fn animator(&self) -> &ParamAnimator {
        &self.animator
    }

    // === Frame loop ===

    /// Advance simulation: scene motion and parameter animation. Pure state
    /// arithmetic; touches no rendering resources.
    pub fn update(&mut self, dt: f32, scene: &mut dyn SceneRenderer) {
        scene.update(dt);
        self.animator.advance(dt, &self.settings);
    }

    /// Drain queued chain edits. Runs at the frame boundary only.
    fn apply_pending_edits(&mut self) {
        for edit in self.pending_edits.drain(..) {
            let applied = match edit {
                ChainEdit::Add(kind) => {
                    self.chain.push(kind);
                    true
                }
                ChainEdit::Remove(index) => self.chain.remove(index),
                ChainEdit::MoveUp(index) => self.chain.move_up(index),
                ChainEdit::MoveDown(index) => self.chain.move_down(index),
            };
            if !applied {
                log::warn!("ignored invalid chain edit {:?}", edit);
            }
        }
    }

    /// Render one frame: scene pass, full-screen chain, area passes. The
    /// caller presents `presentation_view` afterwards.
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut dyn SceneRenderer,
        presentation_view: &wgpu::TextureView,
    ) {
        self.apply_pending_edits();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        // Scene pass into the current ping-pong write target.
        scene.render(
            queue,
            &mut encoder,
            self.sequencer.scene_target_view(),
            &self.depth_view,
            &self.camera,
        );
        self.sequencer.scene_rendered();

        // Full-screen chain.
        self.sequencer.process(
            device,
            queue,
            &mut encoder,
            &self.chain,
            &self.animator,
            &self.settings,
            &self.maps,
            presentation_view,
        );

        // Area-restricted passes composite onto the resolved frame.
        for area in &self.area_effects {
            let Some(centre) = scene.entity_position(&area.anchor) else {
                log::warn!("area effect anchor '{}' not found; skipping", area.anchor);
                continue;
            };
            let rect = project_area(&self.camera, centre, area.width, area.height, area.depth_bias);
            self.sequencer.process_area(
                device,
                queue,
                &mut encoder,
                area.filter,
                rect,
                &self.animator,
                &self.settings,
                &self.maps,
                presentation_view,
                &self.depth_view,
            );
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Recreate every viewport-sized resource at the new output size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.camera.set_aspect(width as f32 / height as f32);
        self.sequencer.resize(device, width, height);
        self.depth_texture.destroy();
        let (texture, view) = create_depth_target(device, width, height);
        self.depth_texture = texture;
        self.depth_view = view;
    }
}

fn create_depth_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
