//! Declarative per-element animation.
//!
//! Each registered element names a property set per state (hidden,
//! visible, hover, tap). Input moves the element between states and the
//! animator transitions its interaction-layer values toward the state's
//! set. A newer target always replaces the running transition, starting
//! from wherever the values currently are.

use std::collections::{BTreeMap, BTreeSet};

use folio_protocol::{InputKind, Layer, PointerPhase, Property, RenderCommand, TargetId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MotionConfig;
use crate::easing::Easing;
use crate::host::{Host, HostError, Scope};

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("{0} is already animated")]
    Duplicate(TargetId),
    #[error("keyframe loop on {0} needs at least two keyframes per track")]
    Keyframes(TargetId),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Property values for one state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(BTreeMap<Property, f64>);

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: Property, value: f64) -> Self {
        self.0.insert(property, value);
        self
    }

    pub fn get(&self, property: Property) -> Option<f64> {
        self.0.get(&property).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Property, f64)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub duration: f64,
    #[serde(default)]
    pub delay: f64,
    pub easing: Easing,
}

impl Transition {
    pub const fn new(duration: f64, easing: Easing) -> Self {
        Self {
            duration,
            delay: 0.0,
            easing,
        }
    }

    pub fn delayed(self, delay: f64) -> Self {
        Self { delay, ..self }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::new(0.3, Easing::EaseOut)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Variant {
    pub values: PropertySet,
    #[serde(default)]
    pub transition: Transition,
}

impl Variant {
    pub fn new(values: PropertySet, transition: Transition) -> Self {
        Self { values, transition }
    }
}

/// Start the visible transition once `amount` of the element is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealTrigger {
    pub amount: f64,
    /// Hide again when the element leaves the viewport.
    #[serde(default)]
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub target: TargetId,
    pub hidden: Variant,
    pub visible: Variant,
    #[serde(default)]
    pub hover: Option<Variant>,
    #[serde(default)]
    pub tap: Option<Variant>,
    /// `None` plays the visible transition as soon as the element mounts.
    #[serde(default)]
    pub reveal: Option<RevealTrigger>,
    /// Position among its siblings; the visible transition waits
    /// `index * stagger` seconds.
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub stagger: f64,
}

impl ElementSpec {
    pub fn new(target: impl Into<TargetId>, hidden: Variant, visible: Variant) -> Self {
        Self {
            target: target.into(),
            hidden,
            visible,
            hover: None,
            tap: None,
            reveal: None,
            index: 0,
            stagger: 0.0,
        }
    }

    /// The gallery card reveal: rise and fade in when a fifth of the card is
    /// visible, staggered by position.
    pub fn reveal_card(
        target: impl Into<TargetId>,
        index: usize,
        config: &MotionConfig,
        stagger_factor: f64,
    ) -> Self {
        let motion = &config.motion;
        Self {
            reveal: Some(RevealTrigger {
                amount: motion.reveal_amount,
                repeat: false,
            }),
            index,
            stagger: motion.reveal_stagger * stagger_factor,
            ..Self::new(
                target,
                Variant::new(
                    PropertySet::new()
                        .with(Property::Opacity, 0.0)
                        .with(Property::Y, motion.reveal_offset),
                    Transition::default(),
                ),
                Variant::new(
                    PropertySet::new()
                        .with(Property::Opacity, 1.0)
                        .with(Property::Y, 0.0),
                    Transition::new(motion.reveal_duration, Easing::EaseOut),
                ),
            )
        }
    }

    pub fn hover(mut self, variant: Variant) -> Self {
        self.hover = Some(variant);
        self
    }

    pub fn tap(mut self, variant: Variant) -> Self {
        self.tap = Some(variant);
        self
    }
}

/// What an element currently shows, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InteractionState {
    Pressed,
    Hovered,
    InView,
    EnteringView,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Hidden,
    Entering,
    InView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pointer {
    Idle,
    Hovered,
    Pressed,
}

#[derive(Debug)]
struct Tween {
    from: BTreeMap<Property, f64>,
    to: BTreeMap<Property, f64>,
    transition: Transition,
    elapsed: f64,
    generation: u64,
}

#[derive(Debug)]
struct Element {
    owner: String,
    spec: ElementSpec,
    visibility: Visibility,
    pointer: Pointer,
    current: BTreeMap<Property, f64>,
    tween: Option<Tween>,
    generation: u64,
}

impl Element {
    fn state(&self) -> InteractionState {
        match (self.pointer, self.visibility) {
            (Pointer::Pressed, _) => InteractionState::Pressed,
            (Pointer::Hovered, _) => InteractionState::Hovered,
            (Pointer::Idle, Visibility::InView) => InteractionState::InView,
            (Pointer::Idle, Visibility::Entering) => InteractionState::EnteringView,
            (Pointer::Idle, Visibility::Hidden) => InteractionState::Idle,
        }
    }

    /// The values and transition the current state asks for.
    fn goal(&self) -> (BTreeMap<Property, f64>, Transition) {
        let base = match self.visibility {
            Visibility::Hidden => &self.spec.hidden,
            Visibility::Entering | Visibility::InView => &self.spec.visible,
        };
        let overlay = match self.pointer {
            Pointer::Pressed => self.spec.tap.as_ref().or(self.spec.hover.as_ref()),
            Pointer::Hovered => self.spec.hover.as_ref(),
            Pointer::Idle => None,
        };

        let mut values: BTreeMap<Property, f64> = base.values.0.clone();
        let mut transition = base.transition;
        if let Some(overlay) = overlay {
            values.extend(overlay.values.iter());
            transition = overlay.transition;
        }
        // Anything animated before but absent now returns to rest.
        for property in self.current.keys() {
            values.entry(*property).or_insert_with(|| property.identity());
        }
        (values, transition)
    }

    fn retarget(&mut self, extra_delay: f64) {
        let (to, transition) = self.goal();
        let unchanged = match &self.tween {
            Some(tween) => tween.to == to,
            None => self.current == to,
        };
        if unchanged {
            return;
        }
        self.generation += 1;
        let from = to
            .keys()
            .map(|p| (*p, self.current.get(p).copied().unwrap_or_else(|| p.identity())))
            .collect();
        self.tween = Some(Tween {
            from,
            to,
            transition: transition.delayed(transition.delay + extra_delay),
            elapsed: 0.0,
            generation: self.generation,
        });
    }

    /// Start the staggered visible transition.
    fn reveal(&mut self) {
        self.visibility = Visibility::Entering;
        self.retarget(self.spec.index as f64 * self.spec.stagger);
        if self.tween.is_none() {
            // Nothing to animate: already showing the visible set.
            self.visibility = Visibility::InView;
        }
    }

    /// Set values without a transition.
    fn snap(&mut self, values: &PropertySet, out: &mut Vec<RenderCommand>) {
        for (property, value) in values.iter() {
            self.current.insert(property, value);
            out.push(set(&self.spec.target, property, value));
        }
    }

    /// Step the running transition. Returns the generation of a transition
    /// that finished this frame.
    fn advance(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Option<u64> {
        let tween = self.tween.as_mut()?;
        tween.elapsed += dt;
        let t = tween.elapsed - tween.transition.delay;
        if t < 0.0 {
            return None;
        }
        let local = if tween.transition.duration <= 0.0 {
            1.0
        } else {
            (t / tween.transition.duration).min(1.0)
        };
        let eased = tween.transition.easing.apply(local);

        for (property, to) in &tween.to {
            let from = tween.from.get(property).copied().unwrap_or(*to);
            let value = if local >= 1.0 { *to } else { from + (to - from) * eased };
            if self.current.get(property) != Some(&value) {
                self.current.insert(*property, value);
                out.push(set(&self.spec.target, *property, value));
            }
        }

        if local < 1.0 {
            return None;
        }
        let generation = tween.generation;
        self.tween = None;
        Some(generation)
    }
}

fn set(target: &TargetId, property: Property, value: f64) -> RenderCommand {
    RenderCommand::SetProperty {
        target: target.clone(),
        layer: Layer::Interaction,
        property,
        value,
    }
}

/// Repeating keyframe animation, e.g. the loading pulse shown while the 3D
/// scene is not ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSpec {
    pub target: TargetId,
    /// Evenly spaced keyframes per property.
    pub tracks: Vec<(Property, Vec<f64>)>,
    /// Seconds per cycle.
    pub duration: f64,
    pub easing: Easing,
    /// Number of cycles; `None` repeats forever.
    #[serde(default)]
    pub repeat: Option<u32>,
}

impl LoopSpec {
    /// Scale 1 → 1.2 → 1 and opacity 0.5 → 1 → 0.5 every two seconds.
    pub fn loading_pulse(target: impl Into<TargetId>) -> Self {
        Self {
            target: target.into(),
            tracks: vec![
                (Property::Scale, vec![1.0, 1.2, 1.0]),
                (Property::Opacity, vec![0.5, 1.0, 0.5]),
            ],
            duration: 2.0,
            easing: Easing::EaseInOut,
            repeat: None,
        }
    }
}

#[derive(Debug)]
pub struct KeyframeLoop {
    spec: LoopSpec,
    elapsed: f64,
    finished: bool,
    stopped: bool,
}

impl KeyframeLoop {
    pub fn new(spec: LoopSpec) -> Result<Self, InteractionError> {
        if spec.tracks.iter().any(|(_, frames)| frames.len() < 2) {
            return Err(InteractionError::Keyframes(spec.target));
        }
        Ok(Self {
            spec,
            elapsed: 0.0,
            finished: false,
            stopped: false,
        })
    }

    pub fn target(&self) -> &TargetId {
        &self.spec.target
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Value of `frames` at cycle phase `phase ∈ [0, 1]`; the easing applies
    /// to each segment between two keyframes.
    fn sample(&self, frames: &[f64], phase: f64) -> f64 {
        let segments = (frames.len() - 1) as f64;
        let position = (phase * segments).clamp(0.0, segments);
        let index = (position.floor() as usize).min(frames.len() - 2);
        let local = position - index as f64;
        let (a, b) = (frames[index], frames[index + 1]);
        a + (b - a) * self.spec.easing.apply(local)
    }

    pub fn advance(&mut self, dt: f64, out: &mut Vec<RenderCommand>) {
        if self.finished || self.spec.duration <= 0.0 {
            return;
        }
        self.elapsed += dt;
        let cycles = self.elapsed / self.spec.duration;
        let phase = match self.spec.repeat {
            Some(n) if cycles >= f64::from(n) => {
                self.finished = true;
                1.0
            }
            _ => cycles.fract(),
        };
        for (property, frames) in &self.spec.tracks {
            out.push(set(&self.spec.target, *property, self.sample(frames, phase)));
        }
    }

    pub fn stop(&mut self, out: &mut Vec<RenderCommand>) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.finished = true;
        for (property, _) in &self.spec.tracks {
            out.push(RenderCommand::ResetProperty {
                target: self.spec.target.clone(),
                layer: Layer::Interaction,
                property: *property,
            });
        }
    }
}

#[derive(Debug, Default)]
pub struct InteractionAnimator {
    touch: bool,
    elements: Vec<Element>,
    /// Registered before their target was in the document, by owner.
    pending: Vec<(String, ElementSpec)>,
    loops: Vec<(String, KeyframeLoop)>,
    scopes: BTreeMap<String, Scope>,
}

impl InteractionAnimator {
    /// `touch` disables hover: on touch devices press is the only pointer
    /// affordance.
    pub fn new(touch: bool) -> Self {
        Self {
            touch,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Start animating an element on behalf of view `owner`. Targets that
    /// are not in the document are parked until [`Self::retry_pending`]
    /// finds them.
    pub fn register(
        &mut self,
        owner: &str,
        spec: ElementSpec,
        host: &mut dyn Host,
        out: &mut Vec<RenderCommand>,
    ) -> Result<bool, InteractionError> {
        let taken = self.elements.iter().any(|e| e.spec.target == spec.target)
            || self.pending.iter().any(|(_, p)| p.target == spec.target);
        if taken {
            return Err(InteractionError::Duplicate(spec.target));
        }
        if !host.has_target(&spec.target) {
            tracing::trace!(target = %spec.target, "interactive element not mounted");
            self.pending.push((owner.to_string(), spec));
            return Ok(false);
        }
        self.attach(owner, spec, host, out)?;
        Ok(true)
    }

    /// Register every parked element whose target has since mounted.
    /// Returns how many were attached.
    pub fn retry_pending(
        &mut self,
        host: &mut dyn Host,
        out: &mut Vec<RenderCommand>,
    ) -> Result<usize, InteractionError> {
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(_, spec)| host.has_target(&spec.target));
        self.pending = waiting;
        let mut attached = 0;
        for (owner, spec) in ready {
            self.attach(&owner, spec, host, out)?;
            attached += 1;
        }
        Ok(attached)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn attach(
        &mut self,
        owner: &str,
        spec: ElementSpec,
        host: &mut dyn Host,
        out: &mut Vec<RenderCommand>,
    ) -> Result<(), InteractionError> {
        let scope = self.scopes.entry(owner.to_string()).or_default();
        scope.listen(host, InputKind::Pointer(spec.target.clone()))?;
        if spec.reveal.is_some() {
            scope.listen(host, InputKind::Intersection(spec.target.clone()))?;
        }

        let mut element = Element {
            owner: owner.to_string(),
            visibility: Visibility::Hidden,
            pointer: Pointer::Idle,
            current: BTreeMap::new(),
            tween: None,
            generation: 0,
            spec,
        };
        let hidden = element.spec.hidden.values.clone();
        element.snap(&hidden, out);
        if element.spec.reveal.is_none() {
            element.reveal();
        }
        self.elements.push(element);
        Ok(())
    }

    pub fn state(&self, target: &TargetId) -> Option<InteractionState> {
        self.element(target).map(Element::state)
    }

    /// Current interaction-layer value of `property` on `target`.
    pub fn value(&self, target: &TargetId, property: Property) -> Option<f64> {
        self.element(target)
            .and_then(|e| e.current.get(&property).copied())
    }

    pub fn is_animating(&self) -> bool {
        self.elements.iter().any(|e| e.tween.is_some())
            || self.loops.iter().any(|(_, l)| !l.is_finished())
    }

    pub fn on_intersection(&mut self, target: &TargetId, ratio: f64) {
        let Some(element) = self.element_mut(target) else {
            return;
        };
        let Some(reveal) = element.spec.reveal else {
            return;
        };
        if ratio >= reveal.amount {
            if element.visibility == Visibility::Hidden {
                element.reveal();
            }
        } else if reveal.repeat && element.visibility != Visibility::Hidden {
            element.visibility = Visibility::Hidden;
            element.retarget(0.0);
        }
    }

    pub fn on_pointer(&mut self, target: &TargetId, phase: PointerPhase) {
        let touch = self.touch;
        let Some(element) = self.element_mut(target) else {
            return;
        };
        let next = match phase {
            PointerPhase::Enter if touch => return,
            PointerPhase::Enter if element.pointer == Pointer::Pressed => Pointer::Pressed,
            PointerPhase::Enter => Pointer::Hovered,
            PointerPhase::Leave => Pointer::Idle,
            PointerPhase::Down => Pointer::Pressed,
            PointerPhase::Up if touch => Pointer::Idle,
            PointerPhase::Up => Pointer::Hovered,
        };
        if next != element.pointer {
            element.pointer = next;
            element.retarget(0.0);
        }
    }

    /// Step every transition and loop by `dt` seconds.
    pub fn advance(&mut self, dt: f64, out: &mut Vec<RenderCommand>) {
        for element in &mut self.elements {
            let Some(generation) = element.advance(dt, out) else {
                continue;
            };
            // Only the transition that is still current may settle state.
            if generation == element.generation && element.visibility == Visibility::Entering {
                element.visibility = Visibility::InView;
            }
        }
        for (_, keyframes) in &mut self.loops {
            keyframes.advance(dt, out);
        }
    }

    pub fn add_loop(&mut self, owner: &str, spec: LoopSpec) -> Result<(), InteractionError> {
        if self.loops.iter().any(|(_, l)| l.target() == &spec.target) {
            return Err(InteractionError::Duplicate(spec.target));
        }
        self.loops.push((owner.to_string(), KeyframeLoop::new(spec)?));
        Ok(())
    }

    /// Stop the loop on `target` and clear what it wrote.
    pub fn stop_loop(&mut self, target: &TargetId, out: &mut Vec<RenderCommand>) -> bool {
        let Some(index) = self.loops.iter().position(|(_, l)| l.target() == target) else {
            return false;
        };
        let (_, mut keyframes) = self.loops.remove(index);
        keyframes.stop(out);
        true
    }

    /// Cancel every transition and loop of `owner`, clear their values and
    /// release the owner's listeners. Returns the number of elements
    /// removed.
    pub fn remove_owned_by(
        &mut self,
        owner: &str,
        host: &mut dyn Host,
        out: &mut Vec<RenderCommand>,
    ) -> usize {
        let mut removed = 0;
        self.elements.retain(|element| {
            if element.owner != owner {
                return true;
            }
            let touched: BTreeSet<Property> = element.current.keys().copied().collect();
            for property in touched {
                out.push(RenderCommand::ResetProperty {
                    target: element.spec.target.clone(),
                    layer: Layer::Interaction,
                    property,
                });
            }
            removed += 1;
            false
        });
        self.pending.retain(|(o, _)| o != owner);
        self.loops.retain_mut(|(o, keyframes)| {
            if o == owner {
                keyframes.stop(out);
                false
            } else {
                true
            }
        });
        if let Some(mut scope) = self.scopes.remove(owner) {
            scope.release(host);
        }
        removed
    }

    fn element(&self, target: &TargetId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.spec.target == target)
    }

    fn element_mut(&mut self, target: &TargetId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.spec.target == target)
    }
}
