use std::fmt;
use std::str::FromStr;

use folio_protocol::{ElementGeometry, Viewport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AnchorParseError {
    #[error("expected \"<element-edge> <viewport-edge>\", got {0:?}")]
    Shape(String),
    #[error("unknown edge {0:?}")]
    Edge(String),
}

/// A point along one axis of a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    Top,
    Center,
    Bottom,
    /// Percentage of the box height from its top.
    Percent(f64),
    /// Pixels from the box's top.
    Pixels(f64),
}

impl Edge {
    /// Offset of this edge from the top of a box `extent` pixels tall.
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => extent / 2.0,
            Self::Bottom => extent,
            Self::Percent(p) => extent * p / 100.0,
            Self::Pixels(px) => px,
        }
    }
}

impl FromStr for Edge {
    type Err = AnchorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let edge = match s {
            "top" => Self::Top,
            "center" => Self::Center,
            "bottom" => Self::Bottom,
            _ => {
                let number = |rest: &str| {
                    rest.parse::<f64>()
                        .ok()
                        .filter(|n| n.is_finite())
                        .ok_or_else(|| AnchorParseError::Edge(s.to_string()))
                };
                if let Some(rest) = s.strip_suffix('%') {
                    Self::Percent(number(rest)?)
                } else if let Some(rest) = s.strip_suffix("px") {
                    Self::Pixels(number(rest)?)
                } else {
                    return Err(AnchorParseError::Edge(s.to_string()));
                }
            }
        };
        Ok(edge)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("top"),
            Self::Center => f.write_str("center"),
            Self::Bottom => f.write_str("bottom"),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Pixels(px) => write!(f, "{px}px"),
        }
    }
}

/// Where a trigger starts or ends: the moment `element` edge of the trigger
/// meets `viewport` edge of the screen, e.g. `"top bottom"` is "the
/// element's top touches the viewport's bottom".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TriggerAnchor {
    pub element: Edge,
    pub viewport: Edge,
}

impl TriggerAnchor {
    pub const fn new(element: Edge, viewport: Edge) -> Self {
        Self { element, viewport }
    }

    /// Scroll offset at which the two edges line up.
    pub fn scroll_position(&self, element: ElementGeometry, viewport: Viewport) -> f64 {
        element.top + self.element.resolve(element.height) - self.viewport.resolve(viewport.height)
    }
}

impl FromStr for TriggerAnchor {
    type Err = AnchorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(element), Some(viewport), None) => Ok(Self {
                element: element.parse()?,
                viewport: viewport.parse()?,
            }),
            _ => Err(AnchorParseError::Shape(s.to_string())),
        }
    }
}

impl TryFrom<String> for TriggerAnchor {
    type Error = AnchorParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TriggerAnchor> for String {
    fn from(anchor: TriggerAnchor) -> Self {
        anchor.to_string()
    }
}

impl fmt::Display for TriggerAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.element, self.viewport)
    }
}
