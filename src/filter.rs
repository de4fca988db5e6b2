//! Filter identities and the effect registry.
//!
//! Every post-process filter has a stable enumerable tag, a textual
//! identifier (used by the CLI and chain files) and a descriptor declaring
//! which parameters and support map its technique consumes. The registry is
//! built once at startup; per-frame code works with resolved [`FilterKind`]
//! tags, never with names.

use thiserror::Error;

/// A filter name that has no matching registry entry.
///
/// Raised when filter identifiers are round-tripped through text (CLI
/// arguments, JSON chain files). The add operation is rejected and reported;
/// the pipeline keeps running.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown filter '{0}'")]
pub struct UnknownFilterError(pub String);

/// Enumeration of the available post-process filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Straight copy of the input, no processing.
    Copy,
    /// Single-colour multiplicative tint.
    Tint,
    /// Two-colour vertical gradient tint with optional hue rotation.
    TintDual,
    /// Grayscale plus animated TV-static noise.
    GreyNoise,
    /// Dissolving burn driven by a burn map and a cycling level.
    Burn,
    /// UV displacement through a distortion map.
    Distort,
    /// Whole-screen spiral twist, animated.
    Spiral,
    /// Heat shimmer, animated.
    HeatHaze,
    /// Underwater look: wavy UVs plus a tint.
    Water,
    /// Pixelation with a reduced colour palette.
    Retro,
    Grayscale,
    Invert,
    GaussianBlurHorizontal,
    GaussianBlurVertical,
    /// Multi-pass glow: threshold extract, separable blur, composite.
    Bloom,
    /// Handheld-console look: pixelated, few shades of a single green.
    Gameboy,
}

impl FilterKind {
    /// All user-addable filters, in registry order.
    pub const ALL: [FilterKind; 16] = [
        FilterKind::Copy,
        FilterKind::Tint,
        FilterKind::TintDual,
        FilterKind::GreyNoise,
        FilterKind::Burn,
        FilterKind::Distort,
        FilterKind::Spiral,
        FilterKind::HeatHaze,
        FilterKind::Water,
        FilterKind::Retro,
        FilterKind::Grayscale,
        FilterKind::Invert,
        FilterKind::GaussianBlurHorizontal,
        FilterKind::GaussianBlurVertical,
        FilterKind::Bloom,
        FilterKind::Gameboy,
    ];

    /// Stable textual identifier, used for the CLI and chain files.
    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Copy => "copy",
            FilterKind::Tint => "tint",
            FilterKind::TintDual => "tint_dual",
            FilterKind::GreyNoise => "grey_noise",
            FilterKind::Burn => "burn",
            FilterKind::Distort => "distort",
            FilterKind::Spiral => "spiral",
            FilterKind::HeatHaze => "heat_haze",
            FilterKind::Water => "water",
            FilterKind::Retro => "retro",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Invert => "invert",
            FilterKind::GaussianBlurHorizontal => "blur_horizontal",
            FilterKind::GaussianBlurVertical => "blur_vertical",
            FilterKind::Bloom => "bloom",
            FilterKind::Gameboy => "gameboy",
        }
    }

    /// Human-readable name for listings and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            FilterKind::Copy => "Copy",
            FilterKind::Tint => "Tint",
            FilterKind::TintDual => "Tint (two colours)",
            FilterKind::GreyNoise => "Grey Noise",
            FilterKind::Burn => "Burn",
            FilterKind::Distort => "Distort",
            FilterKind::Spiral => "Spiral",
            FilterKind::HeatHaze => "Heat Haze",
            FilterKind::Water => "Underwater",
            FilterKind::Retro => "Retro",
            FilterKind::Grayscale => "Grayscale",
            FilterKind::Invert => "Invert",
            FilterKind::GaussianBlurHorizontal => "Gaussian Blur (horizontal)",
            FilterKind::GaussianBlurVertical => "Gaussian Blur (vertical)",
            FilterKind::Bloom => "Bloom",
            FilterKind::Gameboy => "Gameboy",
        }
    }

    /// Resolve a textual identifier back to a filter tag.
    pub fn from_name(name: &str) -> Result<FilterKind, UnknownFilterError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .ok_or_else(|| UnknownFilterError(name.to_string()))
    }
}

/// Support texture a technique samples in addition to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupportMap {
    Noise,
    Burn,
    Distort,
}

/// Parameter slot types a technique declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamSlot {
    Scalar(&'static str),
    Vector(&'static str),
}

/// Immutable description of one registered filter.
#[derive(Clone, Debug)]
pub struct FilterDescriptor {
    pub kind: FilterKind,
    /// Parameter slots the technique expects bound before invocation.
    pub params: &'static [ParamSlot],
    /// Which support map, if any, the technique samples.
    pub support_map: Option<SupportMap>,
}

/// Registry mapping filter tags to their descriptors.
///
/// Built once at startup. Lookup by tag is infallible by construction
/// (every enum variant has exactly one descriptor); lookup by name is the
/// defensive path for identifiers arriving as text.
pub struct EffectRegistry {
    descriptors: Vec<FilterDescriptor>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        let descriptors = FilterKind::ALL
            .iter()
            .map(|&kind| Self::describe(kind))
            .collect();
        Self { descriptors }
    }

    fn describe(kind: FilterKind) -> FilterDescriptor {
        use ParamSlot::{Scalar, Vector};
        let (params, support_map): (&'static [ParamSlot], _) = match kind {
            FilterKind::Copy | FilterKind::Grayscale | FilterKind::Invert => (&[], None),
            FilterKind::Tint => (&[Vector("tint_colour")], None),
            FilterKind::TintDual => {
                (&[Vector("tint_colour"), Vector("tint_colour2")], None)
            }
            FilterKind::GreyNoise => (
                &[Vector("noise_scale"), Vector("noise_offset")],
                Some(SupportMap::Noise),
            ),
            FilterKind::Burn => (&[Scalar("burn_level")], Some(SupportMap::Burn)),
            FilterKind::Distort => {
                (&[Scalar("distort_level")], Some(SupportMap::Distort))
            }
            FilterKind::Spiral => (&[Scalar("spiral_amount")], None),
            FilterKind::HeatHaze => (&[Scalar("haze_phase")], None),
            FilterKind::Water => (&[Vector("tint_colour"), Scalar("wiggle_phase")], None),
            FilterKind::Retro => {
                (&[Scalar("pixelation"), Scalar("colour_depth")], None)
            }
            FilterKind::GaussianBlurHorizontal | FilterKind::GaussianBlurVertical => {
                (&[Scalar("sigma")], None)
            }
            FilterKind::Bloom => (
                &[
                    Scalar("threshold"),
                    Scalar("sigma"),
                    Scalar("intensity"),
                    Scalar("original_intensity"),
                    Scalar("saturation"),
                    Scalar("original_saturation"),
                ],
                None,
            ),
            FilterKind::Gameboy => (
                &[
                    Scalar("pixels"),
                    Scalar("colour_depth"),
                    Vector("tint_colour"),
                ],
                None,
            ),
        };
        FilterDescriptor {
            kind,
            params,
            support_map,
        }
    }

    /// Get the descriptor for a filter tag.
    pub fn lookup(&self, kind: FilterKind) -> &FilterDescriptor {
        self.descriptors
            .iter()
            .find(|d| d.kind == kind)
            .unwrap_or_else(|| unreachable!("descriptor registered for every FilterKind"))
    }

    /// Resolve a textual identifier, rejecting unknown names.
    pub fn resolve(&self, name: &str) -> Result<&FilterDescriptor, UnknownFilterError> {
        let kind = FilterKind::from_name(name)?;
        Ok(self.lookup(kind))
    }

    /// All registered filter tags, in order.
    pub fn kinds(&self) -> impl Iterator<Item = FilterKind> + '_ {
        self.descriptors.iter().map(|d| d.kind)
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_descriptor() {
        let registry = EffectRegistry::new();
        for kind in FilterKind::ALL {
            assert_eq!(registry.lookup(kind).kind, kind);
        }
    }

    #[test]
    fn test_name_round_trip() {
        for kind in FilterKind::ALL {
            assert_eq!(FilterKind::from_name(kind.name()), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        let registry = EffectRegistry::new();
        let err = registry.resolve("sepia").unwrap_err();
        assert_eq!(err, UnknownFilterError("sepia".to_string()));
    }

    #[test]
    fn test_support_maps() {
        let registry = EffectRegistry::new();
        assert_eq!(
            registry.lookup(FilterKind::Burn).support_map,
            Some(SupportMap::Burn)
        );
        assert_eq!(
            registry.lookup(FilterKind::GreyNoise).support_map,
            Some(SupportMap::Noise)
        );
        assert_eq!(registry.lookup(FilterKind::Spiral).support_map, None);
    }
}
