//! Smooth-scroll emulation.
//!
//! Wheel and touch deltas move a target offset; every frame the virtual
//! offset is tweened toward that target over a fixed duration. A new input
//! restarts the tween from wherever the virtual offset currently is, so the
//! motion never jumps and always settles `duration` seconds after the last
//! input.

use folio_protocol::{DeviceProfile, InputKind};
use serde::Serialize;
use thiserror::Error;

use crate::config::{MotionConfig, ScrollTuning};
use crate::easing::Easing;
use crate::host::{Host, HostError, Scope};

#[derive(Debug, Error, PartialEq)]
pub enum ScrollError {
    #[error("invalid frame delta: {0}")]
    InvalidDelta(f64),
}

/// Options for [`SmoothScroll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollOptions {
    /// Seconds for the virtual offset to settle.
    pub duration: f64,
    pub easing: Easing,
    pub smooth_wheel: bool,
    /// When false, touch input is applied immediately (native touch
    /// scrolling is trusted).
    pub smooth_touch: bool,
    pub touch_multiplier: f64,
    pub wheel_multiplier: f64,
}

impl ScrollOptions {
    pub fn for_profile(config: &MotionConfig, profile: &DeviceProfile) -> Self {
        Self::from(config.scroll.get(profile.tier))
    }
}

impl From<ScrollTuning> for ScrollOptions {
    fn from(t: ScrollTuning) -> Self {
        Self {
            duration: t.duration,
            easing: t.easing,
            smooth_wheel: t.smooth_wheel,
            smooth_touch: t.smooth_touch,
            touch_multiplier: t.touch_multiplier,
            wheel_multiplier: t.wheel_multiplier,
        }
    }
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self::from(ScrollTuning::DESKTOP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScrollDirection {
    Still,
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollState {
    /// Where the document is headed: the sum of all input, clamped.
    pub raw_offset: f64,
    /// Eased offset used for animation.
    pub virtual_offset: f64,
    /// Pixels per second of the virtual offset over the last frame.
    pub velocity: f64,
    pub limit: f64,
    pub direction: ScrollDirection,
}

/// Emitted by [`SmoothScroll::advance`] at most once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollChange {
    pub state: ScrollState,
    /// The offset was produced by the emulator rather than by the browser,
    /// so the host has to move the document to it.
    pub animated: bool,
}

#[derive(Debug, Clone, Copy)]
struct Tween {
    from: f64,
    to: f64,
    elapsed: f64,
}

#[derive(Debug)]
pub struct SmoothScroll {
    options: ScrollOptions,
    state: ScrollState,
    tween: Option<Tween>,
    /// Input arrived since the last `advance`.
    dirty: bool,
    scope: Scope,
}

impl SmoothScroll {
    pub fn new(options: ScrollOptions, limit: f64) -> Self {
        Self {
            options,
            state: ScrollState {
                raw_offset: 0.0,
                virtual_offset: 0.0,
                velocity: 0.0,
                limit: limit.max(0.0),
                direction: ScrollDirection::Still,
            },
            tween: None,
            dirty: false,
            scope: Scope::new(),
        }
    }

    pub fn options(&self) -> &ScrollOptions {
        &self.options
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Whether a smoothed scroll is still settling.
    pub fn is_scrolling(&self) -> bool {
        self.tween.is_some()
    }

    /// Register the input listeners the emulator consumes.
    pub fn attach(&mut self, host: &mut dyn Host) -> Result<(), HostError> {
        if !self.scope.is_empty() {
            return Ok(());
        }
        let kinds = [
            InputKind::Wheel,
            InputKind::Touch,
            InputKind::NativeScroll,
            InputKind::Resize,
        ];
        for kind in kinds {
            if let Err(e) = self.scope.listen(host, kind) {
                self.scope.release(host);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Release every listener registered by [`attach`](Self::attach).
    pub fn detach(&mut self, host: &mut dyn Host) -> usize {
        self.tween = None;
        self.scope.release(host)
    }

    pub fn is_attached(&self) -> bool {
        !self.scope.is_empty()
    }

    pub fn on_wheel(&mut self, delta_y: f64) {
        if !delta_y.is_finite() {
            tracing::trace!(delta_y, "ignoring non-finite wheel delta");
            return;
        }
        let delta = delta_y * self.options.wheel_multiplier;
        let target = self.state.raw_offset + delta;
        if self.options.smooth_wheel {
            self.retarget(target);
        } else {
            self.jump(target);
        }
    }

    pub fn on_touch(&mut self, delta_y: f64) {
        if !delta_y.is_finite() {
            tracing::trace!(delta_y, "ignoring non-finite touch delta");
            return;
        }
        if self.options.smooth_touch {
            let target = self.state.raw_offset + delta_y * self.options.touch_multiplier;
            self.retarget(target);
        } else {
            // The browser already scrolled natively by this amount.
            self.jump(self.state.raw_offset + delta_y);
        }
    }

    /// The document moved on its own (scrollbar, keyboard, native touch).
    ///
    /// While a smoothed scroll is running the document position is the echo
    /// of our own `ScrollTo` and is ignored.
    pub fn on_native_scroll(&mut self, offset: f64) {
        if self.tween.is_some() || !offset.is_finite() {
            return;
        }
        self.jump(offset);
    }

    /// Scroll to an absolute offset, e.g. a navbar anchor.
    pub fn scroll_to(&mut self, offset: f64, immediate: bool) {
        if !offset.is_finite() {
            return;
        }
        if immediate {
            self.jump(offset);
        } else {
            self.retarget(offset);
        }
    }

    pub fn set_limit(&mut self, limit: f64) {
        if !limit.is_finite() {
            return;
        }
        self.state.limit = limit.max(0.0);
        let clamped = self.clamp(self.state.raw_offset);
        if clamped != self.state.raw_offset {
            self.jump(clamped);
        }
    }

    /// Move the virtual offset forward by `dt` seconds. Returns the new state
    /// if anything changed since the previous call.
    pub fn advance(&mut self, dt: f64) -> Result<Option<ScrollChange>, ScrollError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(ScrollError::InvalidDelta(dt));
        }

        let previous = self.state.virtual_offset;
        let mut animated = false;

        if let Some(mut tween) = self.tween {
            tween.elapsed += dt;
            let t = (tween.elapsed / self.options.duration).min(1.0);
            let value = tween.from + (tween.to - tween.from) * self.options.easing.apply(t);
            self.state.virtual_offset = if t >= 1.0 { tween.to } else { value };
            self.tween = if t >= 1.0 { None } else { Some(tween) };
            animated = true;
        }

        let moved = self.state.virtual_offset - previous;
        self.state.velocity = if dt > 0.0 { moved / dt } else { 0.0 };
        self.state.direction = if moved > 0.0 {
            ScrollDirection::Down
        } else if moved < 0.0 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Still
        };

        if moved == 0.0 && !self.dirty {
            return Ok(None);
        }
        self.dirty = false;
        Ok(Some(ScrollChange {
            state: self.state,
            animated,
        }))
    }

    fn retarget(&mut self, target: f64) {
        let target = self.clamp(target);
        self.state.raw_offset = target;
        self.dirty = true;
        if target == self.state.virtual_offset {
            self.tween = None;
            return;
        }
        self.tween = Some(Tween {
            from: self.state.virtual_offset,
            to: target,
            elapsed: 0.0,
        });
    }

    fn jump(&mut self, offset: f64) {
        let offset = self.clamp(offset);
        self.tween = None;
        self.state.raw_offset = offset;
        self.state.virtual_offset = offset;
        self.dirty = true;
    }

    fn clamp(&self, offset: f64) -> f64 {
        offset.clamp(0.0, self.state.limit)
    }
}
