use std::collections::HashMap;

use folio_core::{FrameRequest, Host, HostError, ListenerId, SurfaceStatus};
use folio_protocol::{ElementGeometry, InputKind, TargetId, Viewport};
use serde::Serialize;

/// A resource request for the JS side to carry out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum HostOp {
    Listen { id: u64, kind: InputKind },
    Unlisten { id: u64 },
    RequestFrame { id: u64 },
    CancelFrame { id: u64 },
}

/// Host backed by the page's JS glue.
///
/// The core cannot touch the DOM from here, so listener and frame requests
/// are queued as [`HostOp`]s and drained by JS after every call into the
/// bridge. Layout is pushed in from JS whenever it changes.
#[derive(Debug)]
pub struct BridgeHost {
    viewport: Viewport,
    document_height: f64,
    layout: HashMap<TargetId, ElementGeometry>,
    surface: SurfaceStatus,
    next_id: u64,
    listeners: HashMap<ListenerId, InputKind>,
    ops: Vec<HostOp>,
    layout_revision: u64,
}

impl BridgeHost {
    pub fn new(
        viewport: Viewport,
        document_height: f64,
        layout: HashMap<TargetId, ElementGeometry>,
    ) -> Self {
        Self {
            viewport,
            document_height,
            layout,
            surface: SurfaceStatus::Pending,
            next_id: 1,
            listeners: HashMap::new(),
            ops: Vec::new(),
            layout_revision: 0,
        }
    }

    pub fn set_layout(&mut self, layout: HashMap<TargetId, ElementGeometry>) {
        self.layout = layout;
        self.layout_revision += 1;
    }

    pub fn resize(&mut self, viewport: Viewport, document_height: f64) {
        self.viewport = viewport;
        self.document_height = document_height;
        self.layout_revision += 1;
    }

    pub fn set_surface(&mut self, status: SurfaceStatus) {
        self.surface = status;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Hand the queued requests to JS.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Host for BridgeHost {
    fn add_listener(&mut self, kind: InputKind) -> Result<ListenerId, HostError> {
        if let InputKind::Pointer(target) | InputKind::Intersection(target) = &kind
            && !self.layout.contains_key(target)
        {
            return Err(HostError::Listener {
                reason: format!("{target} is not in the document"),
                kind,
            });
        }
        let id = self.next();
        self.ops.push(HostOp::Listen {
            id,
            kind: kind.clone(),
        });
        self.listeners.insert(ListenerId(id), kind);
        Ok(ListenerId(id))
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if self.listeners.remove(&id).is_some() {
            self.ops.push(HostOp::Unlisten { id: id.0 });
        }
    }

    fn request_frame(&mut self) -> Result<FrameRequest, HostError> {
        let id = self.next();
        self.ops.push(HostOp::RequestFrame { id });
        Ok(FrameRequest(id))
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.ops.push(HostOp::CancelFrame { id: request.0 });
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn document_height(&self) -> f64 {
        self.document_height
    }

    fn measure(&self, target: &TargetId) -> Option<ElementGeometry> {
        self.layout.get(target).copied()
    }

    fn surface_status(&self) -> SurfaceStatus {
        self.surface.clone()
    }

    fn layout_revision(&self) -> u64 {
        self.layout_revision
    }
}
