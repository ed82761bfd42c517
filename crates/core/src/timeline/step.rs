use folio_protocol::{Property, TargetId};
use serde::{Deserialize, Serialize};

use crate::easing::Easing;

/// How essential a step is to the page reading correctly.
///
/// Lower tiers drop steps above their maximum detail, so ordering matters:
/// `Essential < Enhanced < Full`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Detail {
    #[default]
    Essential,
    Enhanced,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyDelta {
    pub property: Property,
    pub from: f64,
    pub to: f64,
}

impl PropertyDelta {
    pub fn new(property: Property, from: f64, to: f64) -> Self {
        Self { property, from, to }
    }

    pub fn at(&self, eased: f64) -> f64 {
        self.from + (self.to - self.from) * eased
    }
}

/// Placement of a step on its timeline, in seconds of timeline time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepPosition {
    /// Absolute start time.
    At(f64),
    /// Start when the previous step ends.
    #[default]
    AfterPrevious,
    /// Start this long after the previous step started (may be negative).
    WithPrevious(f64),
}

/// Repeat a step over `count` sibling targets, `each` seconds apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stagger {
    pub count: usize,
    pub each: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub target: TargetId,
    pub deltas: Vec<PropertyDelta>,
    #[serde(default)]
    pub position: StepPosition,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_easing")]
    pub easing: Easing,
    #[serde(default)]
    pub detail: Detail,
    #[serde(default)]
    pub stagger: Option<Stagger>,
}

fn default_duration() -> f64 {
    0.5
}

fn default_easing() -> Easing {
    Easing::Power2Out
}

impl StepSpec {
    pub fn new(target: impl Into<TargetId>) -> Self {
        Self {
            target: target.into(),
            deltas: Vec::new(),
            position: StepPosition::default(),
            duration: default_duration(),
            easing: default_easing(),
            detail: Detail::default(),
            stagger: None,
        }
    }

    pub fn from_to(mut self, property: Property, from: f64, to: f64) -> Self {
        self.deltas.push(PropertyDelta::new(property, from, to));
        self
    }

    pub fn position(mut self, position: StepPosition) -> Self {
        self.position = position;
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    pub fn ease(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn detail(mut self, detail: Detail) -> Self {
        self.detail = detail;
        self
    }

    pub fn stagger(mut self, count: usize, each: f64) -> Self {
        self.stagger = Some(Stagger { count, each });
        self
    }
}

/// A step placed on the timeline for one concrete target.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedStep {
    pub target: TargetId,
    pub deltas: Vec<PropertyDelta>,
    pub start: f64,
    pub duration: f64,
    pub easing: Easing,
}

impl ResolvedStep {
    /// Eased local progress at timeline time `time`.
    pub fn eased(&self, time: f64) -> f64 {
        let local = if self.duration <= 0.0 {
            if time >= self.start { 1.0 } else { 0.0 }
        } else {
            (time - self.start) / self.duration
        };
        self.easing.apply(local)
    }
}

/// Lay out `steps` for a tier that plays up to `max_detail` and scales
/// staggers by `stagger_factor`. Returns the placed steps in start order
/// and the total timeline length.
pub(crate) fn resolve(
    steps: &[StepSpec],
    max_detail: Detail,
    stagger_factor: f64,
) -> (Vec<ResolvedStep>, f64) {
    let mut resolved = Vec::new();
    let mut previous_start = 0.0_f64;
    let mut previous_end = 0.0_f64;
    let mut total = 0.0_f64;

    for step in steps.iter().filter(|s| s.detail <= max_detail) {
        let start = match step.position {
            StepPosition::At(t) => t,
            StepPosition::AfterPrevious => previous_end,
            StepPosition::WithPrevious(offset) => previous_start + offset,
        }
        .max(0.0);
        let duration = step.duration.max(0.0);

        let mut end = start + duration;
        match step.stagger {
            Some(Stagger { count, each }) if count > 0 => {
                let each = each * stagger_factor;
                for i in 0..count {
                    let offset = start + each * i as f64;
                    end = end.max(offset + duration);
                    resolved.push(ResolvedStep {
                        target: step.target.nth(i),
                        deltas: step.deltas.clone(),
                        start: offset,
                        duration,
                        easing: step.easing,
                    });
                }
            }
            _ => resolved.push(ResolvedStep {
                target: step.target.clone(),
                deltas: step.deltas.clone(),
                start,
                duration,
                easing: step.easing,
            }),
        }

        previous_start = start;
        previous_end = end;
        total = total.max(end);
    }

    resolved.sort_by(|a, b| a.start.total_cmp(&b.start));
    (resolved, total)
}
