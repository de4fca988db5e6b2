//! Ping-pong intermediate render targets and pass planning.
//!
//! Two equally-sized colour targets alternate roles across the full-screen
//! filter chain: one is read as a texture while the other is written as the
//! render target, so no stage ever reads the buffer it is writing. The
//! choreography itself is pure data — [`plan_chain`] and [`plan_bloom`]
//! compute which buffer each pass touches without a GPU in sight, which is
//! where the hazard-freedom guarantees are enforced and tested.

/// One of the two ping-pong colour buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Buffer {
    A,
    B,
}

impl Buffer {
    pub fn other(self) -> Buffer {
        match self {
            Buffer::A => Buffer::B,
            Buffer::B => Buffer::A,
        }
    }
}

/// Where a pass writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    PingPong(Buffer),
    /// The final presentation target supplied by the caller.
    Presentation,
}

/// One full-screen pass: read `input`, write `output`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagePass {
    pub input: Buffer,
    pub output: Target,
}

/// The complete plan for a frame's full-screen chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainPlan {
    pub passes: Vec<StagePass>,
    /// The buffer holding the latest intermediate image once the chain has
    /// run; area-restricted passes read from here.
    pub final_read: Buffer,
}

/// Plan the full-screen chain for `len` stages, with the scene image sitting
/// in `read_source`.
///
/// Every stage reads the current source and writes the other buffer, except
/// the last, which writes the presentation target. The source flips after
/// each stage except the last. A zero-length chain still produces a single
/// pass-through pass so the presentation target receives a valid image every
/// frame.
pub fn plan_chain(len: usize, read_source: Buffer) -> ChainPlan {
    if len == 0 {
        return ChainPlan {
            passes: vec![StagePass {
                input: read_source,
                output: Target::Presentation,
            }],
            final_read: read_source,
        };
    }

    let mut passes = Vec::with_capacity(len);
    let mut read = read_source;
    for i in 0..len {
        let last = i == len - 1;
        let output = if last {
            Target::Presentation
        } else {
            Target::PingPong(read.other())
        };
        passes.push(StagePass {
            input: read,
            output,
        });
        if !last {
            read = read.other();
        }
    }

    ChainPlan {
        passes,
        final_read: read,
    }
}

/// The fixed internal steps of the bloom sub-sequence, planned for a stage
/// whose outer read source is `read`.
///
/// The bright-pass extract lands in the dedicated bloom intermediate; the
/// horizontal blur borrows the outer write buffer as scratch; the vertical
/// blur returns to the intermediate; the composite reads the untouched scene
/// buffer plus the twice-blurred intermediate and writes the stage's output.
/// The outer ping-pong state advances exactly as for a single-pass stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BloomPlan {
    /// scene (`read`) -> bloom intermediate
    pub extract_input: Buffer,
    /// bloom intermediate -> scratch
    pub blur_scratch: Buffer,
    /// composite inputs: scene buffer + bloom intermediate
    pub composite_scene: Buffer,
}

pub fn plan_bloom(read: Buffer) -> BloomPlan {
    BloomPlan {
        extract_input: read,
        blur_scratch: read.other(),
        composite_scene: read,
    }
}

/// The two ping-pong colour targets plus the read-source flag.
///
/// Exclusively owned by the pipeline sequencer. Both targets match the
/// output viewport exactly and are destroyed and recreated on resize.
pub struct PingPongPair {
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
    read_source: Buffer,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl PingPongPair {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let (tex_a, view_a) = create_colour_target(device, format, width, height, "Ping-Pong A");
        let (tex_b, view_b) = create_colour_target(device, format, width, height, "Ping-Pong B");
        Self {
            textures: [tex_a, tex_b],
            views: [view_a, view_b],
            read_source: Buffer::A,
            width,
            height,
            format,
        }
    }

    /// View of the buffer currently holding the latest image.
    pub fn read_view(&self) -> &wgpu::TextureView {
        self.view(self.read_source)
    }

    /// View of the buffer that is safe to render into (never the read
    /// source).
    pub fn write_view(&self) -> &wgpu::TextureView {
        self.view(self.read_source.other())
    }

    pub fn view(&self, buffer: Buffer) -> &wgpu::TextureView {
        match buffer {
            Buffer::A => &self.views[0],
            Buffer::B => &self.views[1],
        }
    }

    pub fn read_source(&self) -> Buffer {
        self.read_source
    }

    /// Swap the read-source flag after a completed stage.
    pub fn flip(&mut self) {
        self.read_source = self.read_source.other();
    }

    /// Point the read-source flag at `buffer` (used when the scene pass has
    /// just rendered into it).
    pub fn set_read_source(&mut self, buffer: Buffer) {
        self.read_source = buffer;
    }

    /// Destroy and recreate both targets at the new viewport size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        for texture in &self.textures {
            texture.destroy();
        }
        let (tex_a, view_a) =
            create_colour_target(device, self.format, width, height, "Ping-Pong A");
        let (tex_b, view_b) =
            create_colour_target(device, self.format, width, height, "Ping-Pong B");
        self.textures = [tex_a, tex_b];
        self.views = [view_a, view_b];
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Create a colour target with both a render-attachment and a
/// shader-readable binding.
pub fn create_colour_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_stage_reads_its_own_output() {
        for len in 1..=8 {
            let plan = plan_chain(len, Buffer::A);
            for pass in &plan.passes {
                assert_ne!(
                    Target::PingPong(pass.input),
                    pass.output,
                    "hazard in plan of length {}",
                    len
                );
            }
        }
    }

    #[test]
    fn test_stage_outputs_feed_next_inputs() {
        let plan = plan_chain(5, Buffer::A);
        for window in plan.passes.windows(2) {
            assert_eq!(Target::PingPong(window[1].input), window[0].output);
        }
    }

    #[test]
    fn test_last_stage_writes_presentation() {
        for len in 0..=6 {
            let plan = plan_chain(len, Buffer::A);
            assert_eq!(plan.passes.last().unwrap().output, Target::Presentation);
        }
    }

    #[test]
    fn test_two_stage_chain_alternates_a_b() {
        // Chain = [Tint, Invert]: stage 0 reads A writes B, stage 1 reads B
        // writes the presentation target.
        let plan = plan_chain(2, Buffer::A);
        assert_eq!(
            plan.passes,
            vec![
                StagePass {
                    input: Buffer::A,
                    output: Target::PingPong(Buffer::B),
                },
                StagePass {
                    input: Buffer::B,
                    output: Target::Presentation,
                },
            ]
        );
        assert_eq!(plan.final_read, Buffer::B);
    }

    #[test]
    fn test_empty_chain_is_pass_through() {
        let plan = plan_chain(0, Buffer::B);
        assert_eq!(plan.passes.len(), 1);
        assert_eq!(plan.passes[0].input, Buffer::B);
        assert_eq!(plan.passes[0].output, Target::Presentation);
        assert_eq!(plan.final_read, Buffer::B);
    }

    #[test]
    fn test_single_stage_keeps_read_source() {
        let plan = plan_chain(1, Buffer::A);
        assert_eq!(plan.final_read, Buffer::A);
    }

    #[test]
    fn test_flip_count_is_len_minus_one() {
        for len in 1..=8usize {
            let plan = plan_chain(len, Buffer::A);
            // The read source flips between consecutive stages only.
            let flips = plan
                .passes
                .windows(2)
                .filter(|w| w[0].input != w[1].input)
                .count();
            assert_eq!(flips, len - 1);
        }
    }

    #[test]
    fn test_bloom_scratch_avoids_scene_buffer() {
        for read in [Buffer::A, Buffer::B] {
            let plan = plan_bloom(read);
            assert_eq!(plan.extract_input, read);
            assert_eq!(plan.composite_scene, read);
            // The blur scratch must not clobber the scene image the
            // composite still needs.
            assert_ne!(plan.blur_scratch, read);
        }
    }

    #[test]
    fn test_bloom_preserves_outer_choreography() {
        // A bloom stage consumes exactly the same outer state as any other
        // stage: it reads the current source and leaves the source flag
        // untouched for the sequencer to advance.
        let outer = plan_chain(3, Buffer::A);
        let bloom = plan_bloom(outer.passes[1].input);
        assert_eq!(bloom.composite_scene, outer.passes[1].input);
        assert_eq!(Target::PingPong(bloom.blur_scratch), outer.passes[1].output);
    }
}
