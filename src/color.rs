//! RGB / HSL colour conversion.
//!
//! Used by the parameter animator to rotate tint hues over time while
//! preserving saturation and lightness. Hue is measured in degrees and kept
//! in [0, 360).

/// An RGB colour with components in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// As a GPU-ready array.
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f32; 3]> for Rgb {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// A colour in HSL space: hue in degrees [0, 360), saturation and lightness
/// in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

/// Convert an RGB colour to HSL.
pub fn rgb_to_hsl(rgb: Rgb) -> Hsl {
    let max = rgb.r.max(rgb.g).max(rgb.b);
    let min = rgb.r.min(rgb.g).min(rgb.b);
    let delta = max - min;

    let l = (max + min) / 2.0;

    let s = if delta == 0.0 {
        0.0
    } else {
        delta / (1.0 - (2.0 * l - 1.0).abs())
    };

    let mut h = if max == 0.0 || delta == 0.0 {
        0.0
    } else if rgb.r == max {
        (rgb.g - rgb.b) / delta
    } else if rgb.g == max {
        2.0 + (rgb.b - rgb.r) / delta
    } else {
        4.0 + (rgb.r - rgb.g) / delta
    };

    h *= 60.0;
    if h < 0.0 {
        h += 360.0;
    }

    Hsl { h, s, l }
}

/// Convert an HSL colour back to RGB.
pub fn hsl_to_rgb(hsl: Hsl) -> Rgb {
    let c = (1.0 - (2.0 * hsl.l - 1.0).abs()) * hsl.s;
    let x = c * (1.0 - ((hsl.h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = hsl.l - c / 2.0;

    let (r, g, b) = if hsl.h < 60.0 {
        (c, x, 0.0)
    } else if hsl.h < 120.0 {
        (x, c, 0.0)
    } else if hsl.h < 180.0 {
        (0.0, c, x)
    } else if hsl.h < 240.0 {
        (0.0, x, c)
    } else if hsl.h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Rgb::new(r + m, g + m, b + m)
}

/// Rotate a colour's hue by `degrees`, wrapping into [0, 360).
/// Saturation and lightness are untouched.
pub fn rotate_hue(rgb: Rgb, degrees: f32) -> Rgb {
    let mut hsl = rgb_to_hsl(rgb);
    hsl.h = (hsl.h + degrees).rem_euclid(360.0);
    hsl_to_rgb(hsl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_rgb_close(a: Rgb, b: Rgb) {
        assert!((a.r - b.r).abs() < EPSILON, "{:?} != {:?}", a, b);
        assert!((a.g - b.g).abs() < EPSILON, "{:?} != {:?}", a, b);
        assert!((a.b - b.b).abs() < EPSILON, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_round_trip_preserves_colour() {
        let colours = [
            Rgb::new(1.0, 0.0, 0.0),
            Rgb::new(0.0, 0.0, 1.0),
            Rgb::new(1.0, 1.0, 0.0),
            Rgb::new(0.509, 0.675, 0.059),
            Rgb::new(0.25, 0.5, 0.75),
        ];
        for &c in &colours {
            assert_rgb_close(hsl_to_rgb(rgb_to_hsl(c)), c);
        }
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let c = Rgb::new(0.2, 0.7, 0.4);
        assert_rgb_close(rotate_hue(c, 0.0), c);
    }

    #[test]
    fn test_full_rotation_is_identity() {
        let c = Rgb::new(0.9, 0.1, 0.3);
        assert_rgb_close(rotate_hue(c, 360.0), c);
    }

    #[test]
    fn test_known_hues() {
        assert!((rgb_to_hsl(Rgb::new(1.0, 0.0, 0.0)).h - 0.0).abs() < EPSILON);
        assert!((rgb_to_hsl(Rgb::new(0.0, 1.0, 0.0)).h - 120.0).abs() < EPSILON);
        assert!((rgb_to_hsl(Rgb::new(0.0, 0.0, 1.0)).h - 240.0).abs() < EPSILON);
    }

    #[test]
    fn test_rotation_preserves_saturation_and_lightness() {
        let c = Rgb::new(0.8, 0.3, 0.5);
        let before = rgb_to_hsl(c);
        let after = rgb_to_hsl(rotate_hue(c, 90.0));
        assert!((before.s - after.s).abs() < 1e-3);
        assert!((before.l - after.l).abs() < 1e-3);
    }

    #[test]
    fn test_grey_has_no_hue() {
        let hsl = rgb_to_hsl(Rgb::new(0.5, 0.5, 0.5));
        assert_eq!(hsl.h, 0.0);
        assert_eq!(hsl.s, 0.0);
    }
}
