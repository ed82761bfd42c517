use serde::{Deserialize, Serialize};

use crate::target::TargetId;
use crate::types::Viewport;

/// Pointer gesture on an interactive element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Enter,
    Leave,
    Down,
    Up,
}

/// Everything the host feeds into the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Mouse wheel or trackpad delta in CSS pixels (positive = down).
    Wheel { delta_y: f64 },
    /// Finger movement since the previous touch event (positive = down).
    Touch { delta_y: f64 },
    /// The browser's own scroll position changed (scrollbar drag, keyboard,
    /// unsmoothed touch).
    NativeScroll { offset: f64 },
    Resize {
        viewport: Viewport,
        /// Total scrollable document height.
        document_height: f64,
    },
    Pointer {
        target: TargetId,
        phase: PointerPhase,
    },
    /// Fraction of `target` currently inside the viewport.
    Intersection { target: TargetId, ratio: f64 },
}

/// What a host listener is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    Wheel,
    Touch,
    NativeScroll,
    Resize,
    Pointer(TargetId),
    Intersection(TargetId),
}

impl InputEvent {
    /// The listener kind that delivers this event.
    pub fn kind(&self) -> InputKind {
        match self {
            Self::Wheel { .. } => InputKind::Wheel,
            Self::Touch { .. } => InputKind::Touch,
            Self::NativeScroll { .. } => InputKind::NativeScroll,
            Self::Resize { .. } => InputKind::Resize,
            Self::Pointer { target, .. } => InputKind::Pointer(target.clone()),
            Self::Intersection { target, .. } => InputKind::Intersection(target.clone()),
        }
    }
}
