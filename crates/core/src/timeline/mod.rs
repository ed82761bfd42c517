//! Scroll-triggered timelines.
//!
//! A timeline maps the scroll range between two trigger anchors onto its
//! own time axis and writes the interpolated property values of its steps
//! to the scroll layer. Timelines never share applied state: each keeps the
//! values it wrote so it can revert exactly those on dispose.

mod anchor;
mod engine;
mod step;

pub use anchor::{AnchorParseError, Edge, TriggerAnchor};
pub use engine::TimelineEngine;
pub use step::{Detail, PropertyDelta, Stagger, StepPosition, StepSpec};

use std::collections::BTreeMap;

use folio_protocol::{DeviceProfile, Layer, Property, RenderCommand, TargetId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MotionConfig;
use crate::host::Host;
use step::ResolvedStep;

/// Progress difference below which a scrubbed timeline counts as caught up.
const SCRUB_EPSILON: f64 = 1e-4;

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("timeline {0:?} is already registered")]
    Duplicate(String),
    #[error("timeline {id:?}: step {index} has no property deltas")]
    EmptyStep { id: String, index: usize },
    #[error("timeline {id:?}: step {index} has a non-finite {field}")]
    NonFinite {
        id: String,
        index: usize,
        field: &'static str,
    },
    #[error("anchor: {0}")]
    Anchor(#[from] AnchorParseError),
}

/// Declarative description of one scroll-driven timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSpec {
    pub id: String,
    /// Element whose position defines the scroll range.
    pub trigger: TargetId,
    pub start: TriggerAnchor,
    pub end: TriggerAnchor,
    pub steps: Vec<StepSpec>,
    /// Seconds the playhead lags behind the scroll position. `None` follows
    /// scroll exactly.
    #[serde(default)]
    pub scrub: Option<f64>,
}

impl TimelineSpec {
    /// Anchors are given in their string form, e.g. `"top bottom"`.
    pub fn new(
        id: impl Into<String>,
        trigger: impl Into<TargetId>,
        start: &str,
        end: &str,
    ) -> Result<Self, TimelineError> {
        Ok(Self {
            id: id.into(),
            trigger: trigger.into(),
            start: start.parse()?,
            end: end.parse()?,
            steps: Vec::new(),
            scrub: None,
        })
    }

    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    pub fn scrub(mut self, lag: f64) -> Self {
        self.scrub = Some(lag);
        self
    }

    fn validate(&self) -> Result<(), TimelineError> {
        let non_finite = |index, field| TimelineError::NonFinite {
            id: self.id.clone(),
            index,
            field,
        };
        for (index, step) in self.steps.iter().enumerate() {
            if step.deltas.is_empty() {
                return Err(TimelineError::EmptyStep {
                    id: self.id.clone(),
                    index,
                });
            }
            if !step.duration.is_finite() {
                return Err(non_finite(index, "duration"));
            }
            let position = match step.position {
                StepPosition::At(t) | StepPosition::WithPrevious(t) => t,
                StepPosition::AfterPrevious => 0.0,
            };
            if !position.is_finite() {
                return Err(non_finite(index, "position"));
            }
            if step.deltas.iter().any(|d| !d.from.is_finite() || !d.to.is_finite()) {
                return Err(non_finite(index, "delta"));
            }
            if let Some(stagger) = step.stagger
                && !stagger.each.is_finite()
            {
                return Err(non_finite(index, "stagger"));
            }
        }
        Ok(())
    }
}

/// How much of a timeline a device tier plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelinePolicy {
    pub max_detail: Detail,
    pub stagger_factor: f64,
}

impl TimelinePolicy {
    pub fn for_profile(config: &MotionConfig, profile: &DeviceProfile) -> Self {
        Self {
            max_detail: config.motion.detail.get(profile.tier),
            stagger_factor: config.motion.stagger_factor.get(profile.tier),
        }
    }
}

impl Default for TimelinePolicy {
    fn default() -> Self {
        Self {
            max_detail: Detail::Full,
            stagger_factor: 1.0,
        }
    }
}

#[derive(Debug)]
pub struct Timeline {
    id: String,
    trigger: TargetId,
    start: TriggerAnchor,
    end: TriggerAnchor,
    steps: Vec<ResolvedStep>,
    /// Whether each step's target is in the document.
    live: Vec<bool>,
    total: f64,
    scrub: Option<f64>,
    /// Scroll offsets of the start and end anchors; `None` while the
    /// trigger is not mounted.
    range: Option<(f64, f64)>,
    progress: f64,
    applied: BTreeMap<(TargetId, Property), f64>,
    disposed: bool,
}

impl Timeline {
    pub fn new(spec: TimelineSpec, policy: TimelinePolicy) -> Result<Self, TimelineError> {
        spec.validate()?;
        let (steps, total) = step::resolve(&spec.steps, policy.max_detail, policy.stagger_factor);
        Ok(Self {
            id: spec.id,
            trigger: spec.trigger,
            start: spec.start,
            end: spec.end,
            live: vec![false; steps.len()],
            steps,
            total,
            scrub: spec.scrub.filter(|s| s.is_finite() && *s > 0.0),
            range: None,
            progress: 0.0,
            applied: BTreeMap::new(),
            disposed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trigger(&self) -> &TargetId {
        &self.trigger
    }

    /// Steps this timeline plays after tier filtering and stagger expansion.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// A timeline is inactive while its trigger is missing or after dispose.
    pub fn is_active(&self) -> bool {
        self.range.is_some() && !self.disposed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Scroll offsets at which the timeline starts and ends.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    /// Resolve the anchors against current layout. Called on mount and
    /// whenever the page relays out.
    pub fn measure(&mut self, host: &dyn Host) {
        let viewport = host.viewport();
        self.range = host.measure(&self.trigger).map(|geometry| {
            (
                self.start.scroll_position(geometry, viewport),
                self.end.scroll_position(geometry, viewport),
            )
        });
        for (live, step) in self.live.iter_mut().zip(&self.steps) {
            *live = host.has_target(&step.target);
        }
        if self.range.is_none() {
            tracing::debug!(id = %self.id, trigger = %self.trigger, "timeline trigger not mounted");
        }
    }

    /// Scroll-derived progress for `scroll`, clamped to `[0, 1]`.
    pub fn progress_at(&self, scroll: f64) -> f64 {
        let Some((start, end)) = self.range else {
            return 0.0;
        };
        if end <= start {
            return if scroll >= start { 1.0 } else { 0.0 };
        }
        ((scroll - start) / (end - start)).clamp(0.0, 1.0)
    }

    /// Whether a scrubbed playhead is still catching up with scroll.
    pub fn is_settling(&self, scroll: f64) -> bool {
        self.is_active()
            && self.scrub.is_some()
            && (self.progress_at(scroll) - self.progress).abs() > SCRUB_EPSILON
    }

    /// Move the playhead for the given scroll offset and write changed
    /// values to `out`.
    pub fn sync(&mut self, scroll: f64, dt: f64, out: &mut Vec<RenderCommand>) {
        if !self.is_active() {
            return;
        }
        let target = self.progress_at(scroll);
        self.progress = match self.scrub {
            Some(lag) => {
                let next = self.progress + (target - self.progress) * (1.0 - (-dt / lag).exp());
                if (target - next).abs() <= SCRUB_EPSILON {
                    target
                } else {
                    next
                }
            }
            None => target,
        };
        self.apply(out);
    }

    /// Value this timeline currently applies to `(target, property)`.
    pub fn value(&self, target: &TargetId, property: Property) -> Option<f64> {
        self.applied.get(&(target.clone(), property)).copied()
    }

    /// Revert every applied value exactly once. Later calls emit nothing.
    pub fn dispose(&mut self, out: &mut Vec<RenderCommand>) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        let reverted = self.applied.len();
        for (target, property) in std::mem::take(&mut self.applied).into_keys() {
            out.push(RenderCommand::ResetProperty {
                target,
                layer: Layer::Scroll,
                property,
            });
        }
        tracing::debug!(id = %self.id, reverted, "timeline disposed");
        reverted
    }

    fn apply(&mut self, out: &mut Vec<RenderCommand>) {
        let time = self.progress * self.total;
        let mut values: BTreeMap<(TargetId, Property), f64> = BTreeMap::new();

        // Steps are in start order: for each slot the latest started step
        // wins; before any has started the first one holds its `from`.
        for (step, _) in self.steps.iter().zip(&self.live).filter(|(_, live)| **live) {
            let started = time >= step.start;
            let eased = step.eased(time);
            for delta in &step.deltas {
                let key = (step.target.clone(), delta.property);
                if started || !values.contains_key(&key) {
                    values.insert(key, delta.at(eased));
                }
            }
        }

        for (key, value) in &values {
            if self.applied.get(key) != Some(value) {
                out.push(RenderCommand::SetProperty {
                    target: key.0.clone(),
                    layer: Layer::Scroll,
                    property: key.1,
                    value: *value,
                });
            }
        }
        self.applied = values;
    }
}
