//! The seam between the core and whatever displays the page.
//!
//! A [`Host`] owns the real resources: input listeners, the per-frame
//! callback, layout measurement and the 3D surface. The core only ever
//! holds ids for them, recorded in a [`Scope`] so they can be released
//! together.

use std::collections::{BTreeMap, HashMap};

use folio_protocol::{ElementGeometry, InputKind, TargetId, Viewport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("cannot listen for {kind:?}: {reason}")]
    Listener { kind: InputKind, reason: String },
    #[error("cannot schedule a frame: {0}")]
    Frame(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequest(pub u64);

/// Readiness of the surface the particle scene draws into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Not mounted yet; ask again next frame.
    Pending,
    Ready,
    /// The surface cannot be created (no WebGL, lost context, ...).
    Failed(String),
}

pub trait Host {
    fn add_listener(&mut self, kind: InputKind) -> Result<ListenerId, HostError>;

    fn remove_listener(&mut self, id: ListenerId);

    /// Ask for exactly one frame callback. The host answers by calling
    /// `Page::frame` with the returned request.
    fn request_frame(&mut self) -> Result<FrameRequest, HostError>;

    fn cancel_frame(&mut self, request: FrameRequest);

    fn viewport(&self) -> Viewport;

    /// Full scrollable height of the document.
    fn document_height(&self) -> f64;

    /// Layout box of a target, or `None` if it is not in the document.
    fn measure(&self, target: &TargetId) -> Option<ElementGeometry>;

    fn has_target(&self, target: &TargetId) -> bool {
        self.measure(target).is_some()
    }

    fn surface_status(&self) -> SurfaceStatus;

    /// Bumped whenever element geometry or the viewport changes. The page
    /// re-measures on the next frame after it moves.
    fn layout_revision(&self) -> u64 {
        0
    }

    /// Largest valid scroll offset.
    fn scroll_limit(&self) -> f64 {
        (self.document_height() - self.viewport().height).max(0.0)
    }
}

/// Listener registrations owned by one component or view.
///
/// `release` removes every registration exactly once; calling it again is a
/// no-op.
#[derive(Debug, Default)]
pub struct Scope {
    listeners: Vec<ListenerId>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(
        &mut self,
        host: &mut dyn Host,
        kind: InputKind,
    ) -> Result<ListenerId, HostError> {
        let id = host.add_listener(kind)?;
        self.listeners.push(id);
        Ok(id)
    }

    /// Remove every listener this scope registered. Returns how many were
    /// removed.
    pub fn release(&mut self, host: &mut dyn Host) -> usize {
        let count = self.listeners.len();
        for id in self.listeners.drain(..).rev() {
            host.remove_listener(id);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Deterministic host driven by a fake clock.
///
/// Frames only run when the caller advances time, which makes it the host
/// for headless replays and the terminal preview, and lets tests observe
/// exactly which listeners and frame requests are outstanding.
#[derive(Debug)]
pub struct ManualHost {
    viewport: Viewport,
    document_height: f64,
    now_ms: f64,
    next_id: u64,
    listeners: BTreeMap<ListenerId, InputKind>,
    pending_frame: Option<FrameRequest>,
    elements: HashMap<TargetId, ElementGeometry>,
    surface: SurfaceStatus,
    frames_fired: u64,
    layout_revision: u64,
}

impl ManualHost {
    pub fn new(viewport: Viewport, document_height: f64) -> Self {
        Self {
            viewport,
            document_height,
            now_ms: 0.0,
            next_id: 1,
            listeners: BTreeMap::new(),
            pending_frame: None,
            elements: HashMap::new(),
            surface: SurfaceStatus::Ready,
            frames_fired: 0,
            layout_revision: 0,
        }
    }

    pub fn with_element(mut self, target: impl Into<TargetId>, geometry: ElementGeometry) -> Self {
        self.elements.insert(target.into(), geometry);
        self
    }

    pub fn set_element(&mut self, target: impl Into<TargetId>, geometry: ElementGeometry) {
        self.elements.insert(target.into(), geometry);
        self.layout_revision += 1;
    }

    pub fn remove_element(&mut self, target: &str) {
        if self.elements.remove(target).is_some() {
            self.layout_revision += 1;
        }
    }

    pub fn set_surface(&mut self, status: SurfaceStatus) {
        self.surface = status;
    }

    pub fn resize(&mut self, viewport: Viewport, document_height: f64) {
        self.viewport = viewport;
        self.document_height = document_height;
        self.layout_revision += 1;
    }

    pub fn now(&self) -> f64 {
        self.now_ms
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_listening(&self, kind: &InputKind) -> bool {
        self.listeners.values().any(|k| k == kind)
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending_frame
    }

    /// Frames handed out by [`advance`](Self::advance) so far.
    pub fn frames_fired(&self) -> u64 {
        self.frames_fired
    }

    /// Move the clock forward by `ms`. If a frame was requested it fires
    /// now: the request and the current time are returned for the caller to
    /// pass to `Page::frame`.
    pub fn advance(&mut self, ms: f64) -> Option<(FrameRequest, f64)> {
        self.now_ms += ms;
        let request = self.pending_frame.take()?;
        self.frames_fired += 1;
        Some((request, self.now_ms))
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Host for ManualHost {
    fn add_listener(&mut self, kind: InputKind) -> Result<ListenerId, HostError> {
        let id = ListenerId(self.next());
        self.listeners.insert(id, kind);
        Ok(id)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn request_frame(&mut self) -> Result<FrameRequest, HostError> {
        let request = FrameRequest(self.next());
        self.pending_frame = Some(request);
        Ok(request)
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending_frame == Some(request) {
            self.pending_frame = None;
        }
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn document_height(&self) -> f64 {
        self.document_height
    }

    fn measure(&self, target: &TargetId) -> Option<ElementGeometry> {
        self.elements.get(target).copied()
    }

    fn surface_status(&self) -> SurfaceStatus {
        self.surface.clone()
    }

    fn layout_revision(&self) -> u64 {
        self.layout_revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> ManualHost {
        ManualHost::new(Viewport::new(1280.0, 800.0), 4000.0)
    }

    #[test]
    fn scope_release_is_idempotent() {
        let mut host = host();
        let mut scope = Scope::new();
        scope.listen(&mut host, InputKind::Wheel).unwrap();
        scope.listen(&mut host, InputKind::Resize).unwrap();
        assert_eq!(host.listener_count(), 2);

        assert_eq!(scope.release(&mut host), 2);
        assert_eq!(host.listener_count(), 0);
        assert_eq!(scope.release(&mut host), 0);
    }

    #[test]
    fn frames_fire_only_when_requested() {
        let mut host = host();
        assert!(host.advance(16.0).is_none());

        let request = host.request_frame().unwrap();
        let fired = host.advance(16.0);
        assert_eq!(fired.map(|(r, _)| r), Some(request));
        assert_eq!(fired.map(|(_, t)| t), Some(32.0));
        assert!(host.advance(16.0).is_none());
    }

    #[test]
    fn cancelled_frame_never_fires() {
        let mut host = host();
        let request = host.request_frame().unwrap();
        host.cancel_frame(request);
        assert!(host.advance(16.0).is_none());
        assert_eq!(host.frames_fired(), 0);
    }

    #[test]
    fn layout_changes_bump_the_revision() {
        let mut host = host().with_element("#hero", ElementGeometry::new(0.0, 800.0));
        assert_eq!(host.layout_revision(), 0);
        host.set_element("#about", ElementGeometry::new(800.0, 800.0));
        host.remove_element("#missing");
        assert_eq!(host.layout_revision(), 1);
        host.remove_element("#hero");
        host.resize(Viewport::new(390.0, 844.0), 5000.0);
        assert_eq!(host.layout_revision(), 3);
    }

    #[test]
    fn scroll_limit_subtracts_viewport() {
        assert_eq!(host().scroll_limit(), 3200.0);
    }
}
