//! The per-frame driver.
//!
//! One `RenderLoop` runs per page. Every tick it measures elapsed time and
//! runs the frame phases in a fixed order: scroll, timelines, scene,
//! interactions. A failing phase loses only its own output for that frame;
//! the loop always schedules the next one.

use folio_protocol::RenderCommand;
use thiserror::Error;

use crate::host::{FrameRequest, Host, HostError};
use crate::scene::SceneError;
use crate::scroll::ScrollError;

/// Longest frame delta passed to the phases, in seconds. Longer gaps
/// (background tab, debugger pause) are treated as one slow frame.
pub const MAX_FRAME_DELTA: f64 = 0.1;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("scroll: {0}")]
    Scroll(#[from] ScrollError),
    #[error("scene: {0}")]
    Scene(#[from] SceneError),
}

/// The four stages of a frame, run in declaration order.
pub trait FramePhases {
    fn scroll(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError>;

    fn timelines(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError>;

    fn scene(
        &mut self,
        dt: f64,
        host: &dyn Host,
        out: &mut Vec<RenderCommand>,
    ) -> Result<(), FrameError>;

    fn interactions(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError>;
}

#[derive(Debug, Default)]
pub struct RenderLoop {
    running: bool,
    pending: Option<FrameRequest>,
    /// Timestamp of the previous tick in milliseconds.
    last_time: Option<f64>,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Frames ticked since the loop was created.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Request the first frame. Starting a running loop does nothing.
    pub fn start(&mut self, host: &mut dyn Host) -> Result<(), HostError> {
        if self.running {
            return Ok(());
        }
        self.pending = Some(host.request_frame()?);
        self.running = true;
        self.last_time = None;
        tracing::debug!("render loop started");
        Ok(())
    }

    /// Cancel the outstanding frame request. Returns whether the loop was
    /// running; stopping twice is harmless.
    pub fn stop(&mut self, host: &mut dyn Host) -> bool {
        if let Some(request) = self.pending.take() {
            host.cancel_frame(request);
        }
        let was_running = std::mem::replace(&mut self.running, false);
        if was_running {
            tracing::debug!(frames = self.frames, "render loop stopped");
        }
        self.last_time = None;
        was_running
    }

    /// Run one frame for `request` at `now_ms`. Callbacks for a request the
    /// loop no longer waits on (stopped, or superseded) return `None`.
    pub fn tick(
        &mut self,
        host: &mut dyn Host,
        request: FrameRequest,
        now_ms: f64,
        phases: &mut dyn FramePhases,
    ) -> Option<Vec<RenderCommand>> {
        if !self.running || self.pending != Some(request) {
            tracing::trace!(?request, "ignoring stale frame");
            return None;
        }
        self.pending = None;

        let dt = frame_delta(self.last_time, now_ms);
        if now_ms.is_finite() {
            self.last_time = Some(now_ms);
        }

        let mut out = Vec::new();
        run_phase("scroll", &mut out, |out| phases.scroll(dt, out));
        run_phase("timelines", &mut out, |out| phases.timelines(dt, out));
        run_phase("scene", &mut out, |out| phases.scene(dt, &*host, out));
        run_phase("interactions", &mut out, |out| phases.interactions(dt, out));
        self.frames += 1;

        match host.request_frame() {
            Ok(next) => self.pending = Some(next),
            Err(e) => tracing::warn!("cannot schedule the next frame: {e}"),
        }
        Some(out)
    }
}

/// Seconds since the previous frame, clamped to `[0, MAX_FRAME_DELTA]`.
/// The first frame has a zero delta.
pub fn frame_delta(last_ms: Option<f64>, now_ms: f64) -> f64 {
    let Some(last_ms) = last_ms else {
        return 0.0;
    };
    let dt = (now_ms - last_ms) / 1000.0;
    if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DELTA)
    } else {
        0.0
    }
}

/// Run a phase; on failure drop whatever it wrote and keep going. Only
/// `Err` is isolated: phases report failure by value and must not panic.
fn run_phase(
    name: &'static str,
    out: &mut Vec<RenderCommand>,
    phase: impl FnOnce(&mut Vec<RenderCommand>) -> Result<(), FrameError>,
) {
    let mark = out.len();
    if let Err(e) = phase(out) {
        out.truncate(mark);
        tracing::warn!(phase = name, "frame step failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualHost;
    use folio_protocol::{TargetId, Viewport};

    #[derive(Default)]
    struct Recorder {
        order: Vec<&'static str>,
        deltas: Vec<f64>,
        failing: Option<&'static str>,
    }

    impl Recorder {
        fn failing(phase: &'static str) -> Self {
            Self {
                failing: Some(phase),
                ..Self::default()
            }
        }

        fn record(
            &mut self,
            phase: &'static str,
            out: &mut Vec<RenderCommand>,
        ) -> Result<(), FrameError> {
            self.order.push(phase);
            out.push(marker(phase));
            if self.failing == Some(phase) {
                return Err(SceneError::InvalidDelta(-1.0).into());
            }
            Ok(())
        }
    }

    fn marker(name: &str) -> RenderCommand {
        RenderCommand::BeginGroup {
            id: TargetId::new(name),
        }
    }

    impl FramePhases for Recorder {
        fn scroll(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError> {
            self.deltas.push(dt);
            self.record("scroll", out)
        }

        fn timelines(&mut self, _dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError> {
            self.record("timelines", out)
        }

        fn scene(
            &mut self,
            _dt: f64,
            _host: &dyn Host,
            out: &mut Vec<RenderCommand>,
        ) -> Result<(), FrameError> {
            self.record("scene", out)
        }

        fn interactions(&mut self, _dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError> {
            self.record("interactions", out)
        }
    }

    fn host() -> ManualHost {
        ManualHost::new(Viewport::new(1280.0, 800.0), 2000.0)
    }

    fn step(
        host: &mut ManualHost,
        render_loop: &mut RenderLoop,
        phases: &mut Recorder,
        ms: f64,
    ) -> Option<Vec<RenderCommand>> {
        let (request, now) = host.advance(ms)?;
        render_loop.tick(host, request, now, phases)
    }

    #[test]
    fn phases_run_in_order_and_reschedule() {
        let mut host = host();
        let mut render_loop = RenderLoop::new();
        let mut phases = Recorder::default();
        render_loop.start(&mut host).unwrap();

        let out = step(&mut host, &mut render_loop, &mut phases, 16.0).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(phases.order, ["scroll", "timelines", "scene", "interactions"]);
        assert!(host.pending_frame().is_some());
        assert_eq!(render_loop.frames(), 1);
    }

    #[test]
    fn failing_phase_loses_only_its_output() {
        for failing in ["scroll", "timelines", "scene", "interactions"] {
            let mut host = host();
            let mut render_loop = RenderLoop::new();
            let mut phases = Recorder::failing(failing);
            render_loop.start(&mut host).unwrap();
            let out = step(&mut host, &mut render_loop, &mut phases, 16.0).unwrap();

            assert_eq!(phases.order, ["scroll", "timelines", "scene", "interactions"]);
            assert_eq!(out.len(), 3, "{failing}");
            assert!(!out.contains(&marker(failing)));
            assert!(host.pending_frame().is_some());
        }
    }

    #[test]
    fn loop_keeps_running_after_a_failed_frame() {
        let mut host = host();
        let mut render_loop = RenderLoop::new();
        let mut phases = Recorder::failing("scroll");
        render_loop.start(&mut host).unwrap();
        step(&mut host, &mut render_loop, &mut phases, 16.0).unwrap();
        phases.failing = None;
        let out = step(&mut host, &mut render_loop, &mut phases, 16.0).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(render_loop.frames(), 2);
    }

    #[test]
    fn delta_is_clamped() {
        let mut host = host();
        let mut render_loop = RenderLoop::new();
        let mut phases = Recorder::default();
        let _ = render_loop.start(&mut host);
        step(&mut host, &mut render_loop, &mut phases, 16.0);
        step(&mut host, &mut render_loop, &mut phases, 16.0);
        step(&mut host, &mut render_loop, &mut phases, 5000.0);
        assert_eq!(phases.deltas[0], 0.0);
        assert!((phases.deltas[1] - 0.016).abs() < 1e-9);
        assert_eq!(phases.deltas[2], MAX_FRAME_DELTA);
        assert_eq!(frame_delta(Some(100.0), 50.0), 0.0);
        assert_eq!(frame_delta(Some(0.0), f64::NAN), 0.0);
    }

    #[test]
    fn stop_is_idempotent_and_cancels() {
        let mut host = host();
        let mut render_loop = RenderLoop::new();
        let _ = render_loop.start(&mut host);
        let _ = render_loop.start(&mut host);
        assert!(render_loop.stop(&mut host));
        assert!(!render_loop.stop(&mut host));
        assert!(host.pending_frame().is_none());
        assert!(host.advance(16.0).is_none());
    }

    #[test]
    fn stale_request_is_ignored() {
        let mut host = host();
        let mut render_loop = RenderLoop::new();
        let mut phases = Recorder::default();
        let _ = render_loop.start(&mut host);
        let stale = host.advance(16.0);
        render_loop.stop(&mut host);
        if let Some((request, now)) = stale {
            assert!(render_loop.tick(&mut host, request, now, &mut phases).is_none());
        }
        assert!(phases.order.is_empty());
        assert!(host.pending_frame().is_none());
    }
}
