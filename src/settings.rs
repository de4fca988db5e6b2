//! Live-tunable per-effect parameters.
//!
//! One field per tunable, with the defaults the effects were authored
//! against. The pipeline sequencer reads these every frame rather than
//! caching them, so an external control surface can edit them at any time
//! between frames. Nothing here is persisted; a restart returns to defaults.

use serde::{Deserialize, Serialize};

fn default_tint() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}
fn default_tint2_a() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}
fn default_tint2_b() -> [f32; 3] {
    [1.0, 1.0, 0.0]
}
fn default_water() -> [f32; 3] {
    [0.0, 1.0, 1.0]
}
fn default_gameboy_colour() -> [f32; 3] {
    [0.509, 0.675, 0.059]
}
fn default_true() -> bool {
    true
}

/// Tunable parameters for every effect, with documented defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Tint colour. Default red.
    pub tint_colour: [f32; 3],

    /// First gradient colour for the two-colour tint. Default blue.
    pub tint2_colour_a: [f32; 3],
    /// Second gradient colour for the two-colour tint. Default yellow.
    pub tint2_colour_b: [f32; 3],
    /// Whether the two tint colours rotate through hue space.
    pub tint2_rotate: bool,
    /// Hue rotation speed in degrees per second.
    pub tint2_rotate_speed: f32,

    /// Fineness of the noise grain, in pixels per noise texel.
    pub grain_size: f32,

    /// Cycle speed of the burn level, in full cycles per second fraction.
    pub burn_speed: f32,

    /// Strength of the UV displacement for the distort filter.
    pub distort_level: f32,

    /// Spiral phase advance per second.
    pub spiral_speed: f32,
    /// Heat haze phase advance per second.
    pub heat_haze_speed: f32,
    /// Water wiggle phase advance per second.
    pub wiggle_speed: f32,

    /// Underwater tint colour. Default cyan.
    pub water_colour: [f32; 3],

    /// Retro pixel grid resolution.
    pub retro_pixelation: f32,
    /// Retro quantisation levels per channel.
    pub retro_colour_depth: f32,

    /// Standalone Gaussian blur strength.
    pub blur_sigma: f32,

    /// Blur strength used inside the bloom sub-sequence.
    pub bloom_sigma: f32,
    /// Brightness threshold for bloom extraction.
    pub bloom_threshold: f32,
    /// Weight of the blurred glow in the composite.
    pub bloom_intensity: f32,
    /// Weight of the unprocessed scene in the composite.
    pub bloom_original_intensity: f32,
    /// Saturation applied to the glow before compositing.
    pub bloom_saturation: f32,
    /// Saturation applied to the scene before compositing.
    pub bloom_original_saturation: f32,

    /// Gameboy pixel grid resolution.
    pub gameboy_pixels: f32,
    /// Gameboy shade count.
    pub gameboy_colour_depth: f32,
    /// Gameboy screen colour. Default the classic pea green.
    pub gameboy_colour: [f32; 3],
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            tint_colour: default_tint(),
            tint2_colour_a: default_tint2_a(),
            tint2_colour_b: default_tint2_b(),
            tint2_rotate: default_true(),
            tint2_rotate_speed: 10.0,
            grain_size: 140.0,
            burn_speed: 0.2,
            distort_level: 0.03,
            spiral_speed: 1.0,
            heat_haze_speed: 1.0,
            wiggle_speed: 1.0,
            water_colour: default_water(),
            retro_pixelation: 128.0,
            retro_colour_depth: 4.0,
            blur_sigma: 5.0,
            bloom_sigma: 40.0,
            bloom_threshold: 0.3,
            bloom_intensity: 1.3,
            bloom_original_intensity: 1.0,
            bloom_saturation: 1.0,
            bloom_original_saturation: 1.0,
            gameboy_pixels: 150.0,
            gameboy_colour_depth: 4.0,
            gameboy_colour: default_gameboy_colour(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_authored_values() {
        let s = EffectSettings::default();
        assert_eq!(s.tint_colour, [1.0, 0.0, 0.0]);
        assert_eq!(s.grain_size, 140.0);
        assert_eq!(s.distort_level, 0.03);
        assert_eq!(s.retro_pixelation, 128.0);
        assert_eq!(s.bloom_threshold, 0.3);
        assert_eq!(s.gameboy_colour_depth, 4.0);
    }

    #[test]
    fn test_partial_json_overrides() {
        let s: EffectSettings =
            serde_json::from_str(r#"{"blur_sigma": 12.0, "tint2_rotate": false}"#).unwrap();
        assert_eq!(s.blur_sigma, 12.0);
        assert!(!s.tint2_rotate);
        // Untouched fields keep their defaults.
        assert_eq!(s.grain_size, 140.0);
    }
}
