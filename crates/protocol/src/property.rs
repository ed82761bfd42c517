use serde::{Deserialize, Serialize};

/// Animatable visual property of a target.
///
/// The host resolves each one to its own representation (a CSS transform
/// component, a style property, a scene uniform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Property {
    Opacity,
    /// Horizontal translation in CSS pixels.
    X,
    /// Vertical translation in CSS pixels.
    Y,
    /// Uniform scale factor.
    Scale,
    /// Rotation around the screen normal, in degrees.
    Rotate,
    /// Gaussian blur radius in CSS pixels.
    Blur,
    /// Blend factor between a target's base color and its accent color.
    ColorMix,
}

impl Property {
    /// Value of the property when nothing animates it.
    pub fn identity(self) -> f64 {
        match self {
            Self::Opacity | Self::Scale => 1.0,
            Self::X | Self::Y | Self::Rotate | Self::Blur | Self::ColorMix => 0.0,
        }
    }

    /// Whether the host folds this property into the element's `transform`.
    pub fn is_transform(self) -> bool {
        matches!(self, Self::X | Self::Y | Self::Scale | Self::Rotate)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opacity => "opacity",
            Self::X => "x",
            Self::Y => "y",
            Self::Scale => "scale",
            Self::Rotate => "rotate",
            Self::Blur => "blur",
            Self::ColorMix => "color-mix",
        }
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which subsystem wrote a property value.
///
/// Scroll timelines and interaction animations never share a slot: each
/// writes its own layer and the host composes them (opacity and scale
/// multiply, translations and rotations add).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Scroll,
    Interaction,
}

impl Layer {
    /// Combine the two layers' values for one property.
    pub fn compose(property: Property, scroll: f64, interaction: f64) -> f64 {
        match property {
            Property::Opacity | Property::Scale => scroll * interaction,
            _ => scroll + interaction,
        }
    }
}
