use folio_protocol::{Property, RenderCommand, TargetId};

use super::{Timeline, TimelineError, TimelinePolicy, TimelineSpec};
use crate::host::Host;

/// Every live timeline of the page, grouped by the view that owns it.
#[derive(Debug)]
pub struct TimelineEngine {
    policy: TimelinePolicy,
    timelines: Vec<(String, Timeline)>,
    /// Scroll offset of the last sync; `None` forces the next one.
    last_scroll: Option<f64>,
}

impl TimelineEngine {
    pub fn new(policy: TimelinePolicy) -> Self {
        Self {
            policy,
            timelines: Vec::new(),
            last_scroll: None,
        }
    }

    pub fn policy(&self) -> TimelinePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Build a timeline for `owner`, measure it and schedule its first sync.
    pub fn add(
        &mut self,
        owner: &str,
        spec: TimelineSpec,
        host: &dyn Host,
    ) -> Result<&Timeline, TimelineError> {
        if self.get(&spec.id).is_some() {
            return Err(TimelineError::Duplicate(spec.id));
        }
        let mut timeline = Timeline::new(spec, self.policy)?;
        timeline.measure(host);
        tracing::debug!(
            owner,
            id = timeline.id(),
            steps = timeline.step_count(),
            active = timeline.is_active(),
            "timeline added"
        );
        self.timelines.push((owner.to_string(), timeline));
        self.last_scroll = None;
        Ok(&self.timelines[self.timelines.len() - 1].1)
    }

    pub fn get(&self, id: &str) -> Option<&Timeline> {
        self.timelines
            .iter()
            .map(|(_, t)| t)
            .find(|t| t.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timeline> {
        self.timelines.iter().map(|(_, t)| t)
    }

    /// Dispose and drop every timeline owned by `owner`. Returns how many
    /// were removed.
    pub fn remove_owned_by(&mut self, owner: &str, out: &mut Vec<RenderCommand>) -> usize {
        let before = self.timelines.len();
        self.timelines.retain_mut(|(o, timeline)| {
            if o == owner {
                timeline.dispose(out);
                false
            } else {
                true
            }
        });
        before - self.timelines.len()
    }

    /// Re-resolve every anchor after the layout changed.
    pub fn remeasure(&mut self, host: &dyn Host) {
        for (_, timeline) in &mut self.timelines {
            timeline.measure(host);
        }
        self.last_scroll = None;
    }

    /// Bring every timeline to `scroll`. Skipped when the offset has not
    /// changed since the last call and nothing is still scrubbing.
    pub fn sync(&mut self, scroll: f64, dt: f64, out: &mut Vec<RenderCommand>) {
        let settling = self.timelines.iter().any(|(_, t)| t.is_settling(scroll));
        if self.last_scroll == Some(scroll) && !settling {
            return;
        }
        for (_, timeline) in &mut self.timelines {
            timeline.sync(scroll, dt, out);
        }
        self.last_scroll = Some(scroll);
    }

    /// Value the most recently added timeline writing `(target, property)`
    /// currently applies.
    pub fn value(&self, target: &TargetId, property: Property) -> Option<f64> {
        self.timelines
            .iter()
            .rev()
            .find_map(|(_, t)| t.value(target, property))
    }

    pub fn progress(&self, id: &str) -> Option<f64> {
        self.get(id).map(Timeline::progress)
    }

    pub fn dispose_all(&mut self, out: &mut Vec<RenderCommand>) -> usize {
        let mut reverted = 0;
        for (_, mut timeline) in self.timelines.drain(..) {
            reverted += timeline.dispose(out);
        }
        self.last_scroll = None;
        reverted
    }
}
