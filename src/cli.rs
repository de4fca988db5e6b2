//! Headless command-line driver.
//!
//! Renders the built-in test-card scene through the post-process pipeline
//! to PNG frames on disk. Also exercises the control-surface operations so
//! an edited chain can be observed across a frame sequence.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::chain::FilterChain;
use crate::filter::{EffectRegistry, FilterKind};
use crate::gpu::context::GpuContext;
use crate::gpu::maps::SupportMaps;
use crate::orchestrator::{AreaEffect, FrameOrchestrator};
use crate::scene::TestCardScene;
use crate::settings::EffectSettings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render frames of the test-card scene through the filter chain
    Render {
        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Number of frames to render
        #[arg(long, default_value_t = 120)]
        frames: u32,

        /// Simulated frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Output width
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 600)]
        height: u32,

        /// Comma-separated filter chain, e.g. "tint,invert"
        #[arg(long)]
        chain: Option<String>,

        /// JSON file with a chain and optional settings overrides
        #[arg(long)]
        chain_file: Option<PathBuf>,

        /// Directory containing Noise.png, Burn.png and Distort.png;
        /// synthetic maps are generated when omitted
        #[arg(long)]
        media: Option<PathBuf>,

        /// Area-restricted filter drawn over the moving blob
        /// ("none" disables it)
        #[arg(long, default_value = "spiral")]
        area: String,
    },

    /// List the registered filter identifiers
    Filters,
}

/// On-disk chain description consumed by `--chain-file`.
#[derive(Deserialize)]
struct ChainFile {
    chain: Vec<String>,
    #[serde(default)]
    settings: Option<EffectSettings>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            out,
            frames,
            fps,
            width,
            height,
            chain,
            chain_file,
            media,
            area,
        } => pollster::block_on(render_offline(
            out, frames, fps, width, height, chain, chain_file, media, area,
        )),
        Commands::Filters => {
            let registry = EffectRegistry::new();
            for kind in registry.kinds() {
                println!("{:<16} {}", kind.name(), kind.display_name());
            }
            Ok(())
        }
    }
}

/// Resolve the chain from CLI flags. Unknown names are reported and the
/// add is rejected, per the registry contract.
fn resolve_chain(
    registry: &EffectRegistry,
    chain: Option<&str>,
    chain_file: Option<&PathBuf>,
) -> Result<(FilterChain, Option<EffectSettings>)> {
    let (names, settings) = if let Some(path) = chain_file {
        let mut contents = String::new();
        File::open(path)
            .with_context(|| format!("failed to open chain file {}", path.display()))?
            .read_to_string(&mut contents)?;
        let parsed: ChainFile = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse chain file {}", path.display()))?;
        (parsed.chain, parsed.settings)
    } else if let Some(list) = chain {
        (
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None,
        )
    } else {
        (vec!["copy".to_string()], None)
    };

    let mut kinds = Vec::new();
    for name in &names {
        match registry.resolve(name) {
            Ok(descriptor) => kinds.push(descriptor.kind),
            Err(e) => log::error!("rejected chain entry: {}", e),
        }
    }
    Ok((FilterChain::from_entries(kinds), settings))
}

#[allow(clippy::too_many_arguments)]
async fn render_offline(
    out_dir: PathBuf,
    frames: u32,
    fps: f32,
    width: u32,
    height: u32,
    chain: Option<String>,
    chain_file: Option<PathBuf>,
    media: Option<PathBuf>,
    area: String,
) -> Result<()> {
    let gpu = GpuContext::new_headless()
        .await
        .context("graphics setup failed")?;

    let maps = match &media {
        Some(dir) => SupportMaps::load(&gpu.device, &gpu.queue, dir)
            .context("failed to load support textures")?,
        None => SupportMaps::synthetic(&gpu.device, &gpu.queue),
    };

    let registry = EffectRegistry::new();
    let (filter_chain, settings_overrides) =
        resolve_chain(&registry, chain.as_deref(), chain_file.as_ref())?;

    let mut orchestrator = FrameOrchestrator::new(&gpu.device, gpu.format, width, height, maps)
        .context("pipeline setup failed")?;
    orchestrator.set_chain(filter_chain);
    if let Some(overrides) = settings_overrides {
        *orchestrator.settings_mut() = overrides;
    }

    if area != "none" {
        let kind = FilterKind::from_name(&area)?;
        orchestrator.area_effects.push(AreaEffect {
            filter: kind,
            ..AreaEffect::spiral_over("cubey")
        });
    }

    let mut scene =
        TestCardScene::new(&gpu.device, gpu.format).context("scene setup failed")?;

    log::info!(
        "rendering {} frames at {}x{}, chain: {:?}",
        frames,
        width,
        height,
        orchestrator.chain_names()
    );

    // Presentation target with readback support.
    let target_desc = wgpu::TextureDescriptor {
        label: Some("Presentation Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: gpu.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };
    let target = gpu.device.create_texture(&target_desc);
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

    // Readback buffer with rows padded to the required 256-byte alignment.
    let unpadded_bytes_per_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
    let output_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let dt = 1.0 / fps;
    for frame in 0..frames {
        orchestrator.update(dt, &mut scene);
        orchestrator.render_frame(&gpu.device, &gpu.queue, &mut scene, &target_view);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            target_desc.size,
        );
        gpu.queue.submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        gpu.device.poll(wgpu::Maintain::Wait);
        rx.recv()??;

        {
            let data = buffer_slice.get_mapped_range();
            let mut unpadded = Vec::with_capacity((width * height * 4) as usize);
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                unpadded.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
            }
            let frame_path = out_dir.join(format!("frame_{:05}.png", frame));
            image::save_buffer(&frame_path, &unpadded, width, height, image::ColorType::Rgba8)
                .with_context(|| format!("failed to write {}", frame_path.display()))?;
        }
        output_buffer.unmap();
    }

    log::info!("wrote {} frames to {}", frames, out_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_chain_from_list() {
        let registry = EffectRegistry::new();
        let (chain, settings) =
            resolve_chain(&registry, Some("tint, invert"), None).unwrap();
        assert_eq!(
            chain.entries(),
            &[FilterKind::Tint, FilterKind::Invert]
        );
        assert!(settings.is_none());
    }

    #[test]
    fn test_resolve_chain_skips_unknown_names() {
        let registry = EffectRegistry::new();
        let (chain, _) = resolve_chain(&registry, Some("tint,bogus,invert"), None).unwrap();
        assert_eq!(
            chain.entries(),
            &[FilterKind::Tint, FilterKind::Invert]
        );
    }

    #[test]
    fn test_resolve_chain_defaults_to_copy() {
        let registry = EffectRegistry::new();
        let (chain, _) = resolve_chain(&registry, None, None).unwrap();
        assert_eq!(chain.entries(), &[FilterKind::Copy]);
    }
}
