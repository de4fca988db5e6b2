//! Per-effect time-varying parameter state.
//!
//! All animated values live here as explicit, inspectable fields, advanced
//! once per update tick. `advance` is pure state arithmetic: it never
//! touches rendering resources, so it can run on any schedule as long as it
//! happens before parameters are bound for the frame.

use rand::Rng;

use crate::color::{rotate_hue, Rgb};
use crate::settings::EffectSettings;

/// Animated state for the effects that need it.
#[derive(Clone, Debug)]
pub struct ParamAnimator {
    /// Burn progress, cycling in [0, 1).
    pub burn_level: f32,
    /// Spiral phase, unbounded; the shader applies a cosine so growth is
    /// harmless (long sessions eventually lose float precision — accepted).
    pub spiral_phase: f32,
    /// Heat haze phase, unbounded.
    pub heat_haze_phase: f32,
    /// Water wiggle phase, unbounded.
    pub wiggle_phase: f32,
    /// Current two-colour tint pair, hue-rotated when enabled.
    pub tint2_colour_a: Rgb,
    pub tint2_colour_b: Rgb,
}

impl ParamAnimator {
    pub fn new(settings: &EffectSettings) -> Self {
        Self {
            burn_level: 0.0,
            spiral_phase: 0.0,
            heat_haze_phase: 0.0,
            wiggle_phase: 0.0,
            tint2_colour_a: settings.tint2_colour_a.into(),
            tint2_colour_b: settings.tint2_colour_b.into(),
        }
    }

    /// Advance all animated state by `dt` seconds. Called exactly once per
    /// update tick, before the next frame binds parameters.
    pub fn advance(&mut self, dt: f32, settings: &EffectSettings) {
        self.burn_level = (self.burn_level + settings.burn_speed * dt).rem_euclid(1.0);
        self.spiral_phase += settings.spiral_speed * dt;
        self.heat_haze_phase += settings.heat_haze_speed * dt;
        self.wiggle_phase += settings.wiggle_speed * dt;

        if settings.tint2_rotate {
            let degrees = settings.tint2_rotate_speed * dt;
            self.tint2_colour_a = rotate_hue(self.tint2_colour_a, degrees);
            self.tint2_colour_b = rotate_hue(self.tint2_colour_b, degrees);
        }
    }

    /// The spiral amount bound to the shader: a tweaked cosine of the phase.
    pub fn spiral_amount(&self) -> f32 {
        (1.0 - self.spiral_phase.cos()) * 4.0
    }

    /// Fresh noise offset for the grey-noise filter. Redrawn on every render
    /// call (not per tick) so the static keeps crawling even when the
    /// simulation is paused.
    pub fn noise_offset<R: Rng>(&self, rng: &mut R) -> [f32; 2] {
        [rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_burn_level_wraps_and_matches_cumulative_time() {
        let settings = EffectSettings::default();
        let mut animator = ParamAnimator::new(&settings);
        let dt = 0.1;
        let steps = 97;
        for _ in 0..steps {
            animator.advance(dt, &settings);
        }
        let expected = (settings.burn_speed * dt * steps as f32).rem_euclid(1.0);
        assert!((animator.burn_level - expected).abs() < 1e-4);
        assert!(animator.burn_level >= 0.0 && animator.burn_level < 1.0);
    }

    #[test]
    fn test_burn_level_never_negative() {
        let mut settings = EffectSettings::default();
        settings.burn_speed = 0.9;
        let mut animator = ParamAnimator::new(&settings);
        for _ in 0..1000 {
            animator.advance(0.033, &settings);
            assert!(animator.burn_level >= 0.0 && animator.burn_level < 1.0);
        }
    }

    #[test]
    fn test_phases_grow_unbounded() {
        let settings = EffectSettings::default();
        let mut animator = ParamAnimator::new(&settings);
        for _ in 0..100 {
            animator.advance(0.5, &settings);
        }
        assert!(animator.spiral_phase > 10.0);
        assert!(animator.heat_haze_phase > 10.0);
        assert!(animator.wiggle_phase > 10.0);
    }

    #[test]
    fn test_spiral_amount_stays_bounded() {
        let settings = EffectSettings::default();
        let mut animator = ParamAnimator::new(&settings);
        for _ in 0..500 {
            animator.advance(0.25, &settings);
            let amount = animator.spiral_amount();
            assert!((0.0..=8.0).contains(&amount));
        }
    }

    #[test]
    fn test_hue_rotation_preserves_lightness() {
        let settings = EffectSettings::default();
        let mut animator = ParamAnimator::new(&settings);
        let before = crate::color::rgb_to_hsl(animator.tint2_colour_a);
        for _ in 0..50 {
            animator.advance(0.1, &settings);
        }
        let after = crate::color::rgb_to_hsl(animator.tint2_colour_a);
        assert!((before.l - after.l).abs() < 1e-2);
    }

    #[test]
    fn test_rotation_disabled_keeps_colours() {
        let mut settings = EffectSettings::default();
        settings.tint2_rotate = false;
        let mut animator = ParamAnimator::new(&settings);
        let before = animator.tint2_colour_a;
        animator.advance(1.0, &settings);
        assert_eq!(animator.tint2_colour_a, before);
    }

    #[test]
    fn test_noise_offset_in_range() {
        let settings = EffectSettings::default();
        let animator = ParamAnimator::new(&settings);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let [x, y] = animator.noise_offset(&mut rng);
            assert!((0.0..1.0).contains(&x));
            assert!((0.0..1.0).contains(&y));
        }
    }
}
