//! Support textures sampled by the map-driven effects.
//!
//! The grey-noise, burn and distort filters each sample a static image in
//! addition to the scene. These are loaded once at setup and referenced by
//! view thereafter. When no media directory is supplied (headless test
//! renders), deterministic synthetic stand-ins are generated instead.

use std::path::Path;

use crate::filter::SupportMap;
use crate::gpu::context::SetupError;

/// The three support textures plus a 1x1 white placeholder bound when a
/// technique samples no map.
pub struct SupportMaps {
    pub noise: wgpu::TextureView,
    pub burn: wgpu::TextureView,
    pub distort: wgpu::TextureView,
    pub placeholder: wgpu::TextureView,
}

impl SupportMaps {
    /// Load Noise.png, Burn.png and Distort.png from `media_dir`.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        media_dir: &Path,
    ) -> Result<Self, SetupError> {
        let noise = load_png(device, queue, &media_dir.join("Noise.png"))?;
        let burn = load_png(device, queue, &media_dir.join("Burn.png"))?;
        let distort = load_png(device, queue, &media_dir.join("Distort.png"))?;
        Ok(Self {
            noise,
            burn,
            distort,
            placeholder: placeholder_view(device, queue),
        })
    }

    /// Deterministic procedural stand-ins, identical across runs.
    pub fn synthetic(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        const SIZE: u32 = 256;
        let noise = upload_rgba(
            device,
            queue,
            "Synthetic Noise Map",
            SIZE,
            SIZE,
            &generate(SIZE, |x, y| {
                let v = hash2(x, y);
                [v, v, v, 255]
            }),
        );
        let burn = upload_rgba(
            device,
            queue,
            "Synthetic Burn Map",
            SIZE,
            SIZE,
            &generate(SIZE, |x, y| {
                // Smooth diagonal ramp perturbed by hash noise, so the burn
                // front creeps rather than sweeping in a straight line.
                let ramp = (x + y) as f32 / (2 * (SIZE - 1)) as f32;
                let v = (ramp * 0.75 + (hash2(x / 8, y / 8) as f32 / 255.0) * 0.25) * 255.0;
                let v = v as u8;
                [v, v, v, 255]
            }),
        );
        let distort = upload_rgba(
            device,
            queue,
            "Synthetic Distort Map",
            SIZE,
            SIZE,
            &generate(SIZE, |x, y| {
                // Mid-grey is "no offset"; gentle sinusoidal displacement field.
                let fx = x as f32 / SIZE as f32;
                let fy = y as f32 / SIZE as f32;
                let dx = ((fx * 12.0).sin() * 0.5 + 0.5) * 255.0;
                let dy = ((fy * 12.0).cos() * 0.5 + 0.5) * 255.0;
                [dx as u8, dy as u8, 128, 255]
            }),
        );
        Self {
            noise,
            burn,
            distort,
            placeholder: placeholder_view(device, queue),
        }
    }

    pub fn view(&self, map: Option<SupportMap>) -> &wgpu::TextureView {
        match map {
            Some(SupportMap::Noise) => &self.noise,
            Some(SupportMap::Burn) => &self.burn,
            Some(SupportMap::Distort) => &self.distort,
            None => &self.placeholder,
        }
    }
}

fn load_png(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
) -> Result<wgpu::TextureView, SetupError> {
    if !path.exists() {
        return Err(SetupError::AssetMissing {
            path: path.display().to_string(),
        });
    }
    let img = image::open(path)
        .map_err(|e| SetupError::AssetDecode {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();
    let label = path.display().to_string();
    Ok(upload_rgba(device, queue, &label, width, height, &img))
}

fn generate(size: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            data.extend_from_slice(&f(x, y));
        }
    }
    data
}

/// Small integer hash onto [0, 255]; stable across runs and platforms.
fn hash2(x: u32, y: u32) -> u8 {
    let mut h = x.wrapping_mul(374_761_393).wrapping_add(y.wrapping_mul(668_265_263));
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    (h ^ (h >> 16)) as u8
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn placeholder_view(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    upload_rgba(device, queue, "Placeholder Map", 1, 1, &[255, 255, 255, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash2(3, 7), hash2(3, 7));
        // Neighbouring texels should not all collapse to one value.
        let distinct: std::collections::HashSet<u8> =
            (0..64).map(|i| hash2(i, i * 3 + 1)).collect();
        assert!(distinct.len() > 16);
    }

    #[test]
    fn test_generate_fills_every_texel() {
        let data = generate(16, |_, _| [1, 2, 3, 4]);
        assert_eq!(data.len(), 16 * 16 * 4);
        assert_eq!(&data[0..4], &[1, 2, 3, 4]);
    }
}
