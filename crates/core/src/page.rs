//! The root of a mounted page.
//!
//! A [`Page`] owns the host and every component, keeps the one device
//! profile it was mounted with, and routes input and frame callbacks.
//! Views are mounted and unmounted as a unit: whatever a view registered is
//! released before the next frame runs.

use folio_protocol::{DeviceProfile, InputEvent, Property, RenderCommand, TargetId};
use thiserror::Error;

use crate::config::{ConfigError, MotionConfig};
use crate::host::{FrameRequest, Host, HostError};
use crate::interaction::{InteractionAnimator, InteractionError, InteractionState, LoopSpec};
use crate::render_loop::{FrameError, FramePhases, RenderLoop};
use crate::scene::{SceneDriver, SceneStatus};
use crate::scroll::{ScrollOptions, ScrollState, SmoothScroll};
use crate::timeline::{TimelineEngine, TimelineError, TimelinePolicy};
use crate::view::ViewSpec;

#[derive(Debug, Error)]
pub enum MountError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("host: {0}")]
    Host(#[from] HostError),
    #[error("timeline: {0}")]
    Timeline(#[from] TimelineError),
    #[error("interaction: {0}")]
    Interaction(#[from] InteractionError),
    #[error("view {0:?} is already mounted")]
    DuplicateView(String),
    #[error("view {0:?} declares a second 3D scene")]
    DuplicateScene(String),
    #[error("view {0:?} cannot mount on an unmounted page")]
    Unmounted(String),
}

/// Every component of a page, in the order a frame visits them.
#[derive(Debug)]
struct Stage {
    scroll: SmoothScroll,
    timelines: TimelineEngine,
    scene: Option<SceneDriver>,
    /// View owning the scene.
    scene_owner: Option<String>,
    interactions: InteractionAnimator,
}

impl Stage {
    fn stop_loader(&mut self, out: &mut Vec<RenderCommand>) {
        let loader = self.scene.as_ref().and_then(|s| s.spec().loader.clone());
        if let Some(loader) = loader {
            self.interactions.stop_loop(&loader, out);
        }
    }
}

impl FramePhases for Stage {
    fn scroll(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError> {
        if let Some(change) = self.scroll.advance(dt)?
            && change.animated
        {
            out.push(RenderCommand::ScrollTo {
                offset: change.state.virtual_offset,
            });
        }
        Ok(())
    }

    fn timelines(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError> {
        self.timelines
            .sync(self.scroll.state().virtual_offset, dt, out);
        Ok(())
    }

    fn scene(
        &mut self,
        dt: f64,
        host: &dyn Host,
        out: &mut Vec<RenderCommand>,
    ) -> Result<(), FrameError> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };
        let changed = scene.advance(dt, &host.surface_status(), out)?;

        let container = scene.container().clone();
        let opacity = self.timelines.value(&container, Property::Opacity);
        let scale = self.timelines.value(&container, Property::Scale);
        scene.set_presentation(opacity.unwrap_or(1.0), scale.unwrap_or(1.0), out);

        if matches!(changed, Some(SceneStatus::Ready | SceneStatus::Disabled)) {
            self.stop_loader(out);
        }
        Ok(())
    }

    fn interactions(&mut self, dt: f64, out: &mut Vec<RenderCommand>) -> Result<(), FrameError> {
        self.interactions.advance(dt, out);
        Ok(())
    }
}

pub struct Page<H: Host> {
    host: H,
    profile: DeviceProfile,
    config: MotionConfig,
    stage: Stage,
    render_loop: RenderLoop,
    views: Vec<String>,
    /// Commands produced outside a frame (initial values of newly mounted
    /// elements), delivered at the start of the next frame.
    queued: Vec<RenderCommand>,
    /// Host layout revision the components were last measured against.
    layout_revision: u64,
    mounted: bool,
}

impl<H: Host> Page<H> {
    /// Attach the scroll listeners, mount `views` and request the first
    /// frame. `profile` is the session's one classification; the views
    /// should have been built from the same value.
    pub fn mount(
        mut host: H,
        profile: DeviceProfile,
        config: MotionConfig,
        views: Vec<ViewSpec>,
    ) -> Result<Self, MountError> {
        config.validate()?;

        let mut scroll = SmoothScroll::new(
            ScrollOptions::for_profile(&config, &profile),
            host.scroll_limit(),
        );
        scroll.attach(&mut host)?;

        let stage = Stage {
            scroll,
            timelines: TimelineEngine::new(TimelinePolicy::for_profile(&config, &profile)),
            scene: None,
            scene_owner: None,
            interactions: InteractionAnimator::new(profile.is_touch()),
        };
        let layout_revision = host.layout_revision();
        let mut page = Self {
            host,
            profile,
            config,
            stage,
            render_loop: RenderLoop::new(),
            views: Vec::new(),
            queued: Vec::new(),
            layout_revision,
            mounted: true,
        };

        // On error `page` drops here, which unmounts what was registered.
        for view in views {
            page.mount_view(view)?;
        }
        page.render_loop.start(&mut page.host)?;
        tracing::debug!(
            tier = %page.profile.tier,
            views = page.views.len(),
            "page mounted"
        );
        Ok(page)
    }

    /// Register a view's timelines, elements, loops and scene. A view that
    /// fails to mount leaves nothing behind.
    pub fn mount_view(&mut self, view: ViewSpec) -> Result<(), MountError> {
        if !self.mounted {
            return Err(MountError::Unmounted(view.id));
        }
        if self.views.contains(&view.id) {
            return Err(MountError::DuplicateView(view.id));
        }
        if view.scene.is_some() && self.stage.scene.is_some() {
            return Err(MountError::DuplicateScene(view.id));
        }
        let id = view.id.clone();
        self.views.push(id.clone());
        if let Err(e) = self.register_view(view) {
            let out = self.unmount_view(&id);
            self.queued.extend(out);
            return Err(e);
        }
        tracing::debug!(view = %id, "view mounted");
        Ok(())
    }

    fn register_view(&mut self, view: ViewSpec) -> Result<(), MountError> {
        let stage = &mut self.stage;
        for timeline in view.timelines {
            stage.timelines.add(&view.id, timeline, &self.host)?;
        }
        for element in view.elements {
            stage
                .interactions
                .register(&view.id, element, &mut self.host, &mut self.queued)?;
        }
        for spec in view.loops {
            stage.interactions.add_loop(&view.id, spec)?;
        }
        if let Some(scene) = view.scene {
            if let Some(loader) = &scene.loader {
                stage
                    .interactions
                    .add_loop(&view.id, LoopSpec::loading_pulse(loader.clone()))?;
            }
            stage.scene = Some(SceneDriver::new(
                scene,
                &self.profile,
                self.config.scene.clone(),
                self.host.viewport().dpr,
            ));
            stage.scene_owner = Some(view.id);
        }
        Ok(())
    }

    /// Dispose everything `id` registered and return the commands that
    /// revert it. Unknown ids are a no-op.
    pub fn unmount_view(&mut self, id: &str) -> Vec<RenderCommand> {
        let mut out = Vec::new();
        let Some(index) = self.views.iter().position(|v| v == id) else {
            return out;
        };
        self.views.remove(index);

        let stage = &mut self.stage;
        let timelines = stage.timelines.remove_owned_by(id, &mut out);
        let elements = stage
            .interactions
            .remove_owned_by(id, &mut self.host, &mut out);
        if stage.scene_owner.as_deref() == Some(id) {
            if let Some(mut scene) = stage.scene.take() {
                scene.teardown(&mut out);
            }
            stage.scene_owner = None;
        }
        tracing::debug!(view = id, timelines, elements, "view unmounted");
        out
    }

    /// Route one host event to the component that consumes it.
    pub fn handle_input(&mut self, event: InputEvent) {
        if !self.mounted {
            return;
        }
        let stage = &mut self.stage;
        match event {
            InputEvent::Wheel { delta_y } => stage.scroll.on_wheel(delta_y),
            InputEvent::Touch { delta_y } => stage.scroll.on_touch(delta_y),
            InputEvent::NativeScroll { offset } => stage.scroll.on_native_scroll(offset),
            InputEvent::Resize {
                viewport,
                document_height,
            } => {
                if let Err(e) = self.relayout() {
                    tracing::warn!("relayout after resize failed: {e}");
                }
                self.stage
                    .scroll
                    .set_limit((document_height - viewport.height).max(0.0));
            }
            InputEvent::Pointer { target, phase } => stage.interactions.on_pointer(&target, phase),
            InputEvent::Intersection { target, ratio } => {
                stage.interactions.on_intersection(&target, ratio);
            }
        }
    }

    /// Re-measure every timeline trigger and attach interactive elements
    /// that were missing when their view mounted. Runs on its own at the
    /// start of a frame whenever the host's layout revision has moved.
    pub fn relayout(&mut self) -> Result<(), MountError> {
        if !self.mounted {
            return Ok(());
        }
        self.layout_revision = self.host.layout_revision();
        let stage = &mut self.stage;
        stage.scroll.set_limit(self.host.scroll_limit());
        stage.timelines.remeasure(&self.host);
        let attached = stage
            .interactions
            .retry_pending(&mut self.host, &mut self.queued)?;
        tracing::debug!(
            revision = self.layout_revision,
            attached,
            "page relaid out"
        );
        Ok(())
    }

    /// Smoothly scroll so `target`'s top meets the top of the viewport, as
    /// the navbar links do. Returns false if the target is not mounted.
    pub fn scroll_to_target(&mut self, target: &TargetId) -> bool {
        let Some(geometry) = self.host.measure(target) else {
            return false;
        };
        self.stage.scroll.scroll_to(geometry.top, false);
        true
    }

    /// Run the frame the host scheduled. Stale or post-unmount callbacks
    /// produce nothing.
    pub fn frame(&mut self, request: FrameRequest, now_ms: f64) -> Vec<RenderCommand> {
        if !self.mounted {
            return Vec::new();
        }
        if self.host.layout_revision() != self.layout_revision
            && self.render_loop.pending() == Some(request)
            && let Err(e) = self.relayout()
        {
            tracing::warn!("relayout failed: {e}");
        }
        let Some(commands) =
            self.render_loop
                .tick(&mut self.host, request, now_ms, &mut self.stage)
        else {
            return Vec::new();
        };
        let mut out = std::mem::take(&mut self.queued);
        out.extend(commands);
        out
    }

    /// Stop the loop, release every view and listener and return the
    /// commands that revert all applied values. Later calls return nothing.
    pub fn unmount(&mut self) -> Vec<RenderCommand> {
        if !self.mounted {
            return Vec::new();
        }
        self.mounted = false;
        self.render_loop.stop(&mut self.host);

        let mut out = Vec::new();
        for id in self.views.clone().iter().rev() {
            out.extend(self.unmount_view(id));
        }
        self.stage.timelines.dispose_all(&mut out);
        self.stage.scroll.detach(&mut self.host);
        self.queued.clear();
        tracing::debug!("page unmounted");
        out
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn views(&self) -> &[String] {
        &self.views
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.stage.scroll.state()
    }

    pub fn timeline_progress(&self, id: &str) -> Option<f64> {
        self.stage.timelines.progress(id)
    }

    pub fn timelines(&self) -> &TimelineEngine {
        &self.stage.timelines
    }

    pub fn interaction_state(&self, target: &TargetId) -> Option<InteractionState> {
        self.stage.interactions.state(target)
    }

    pub fn scene(&self) -> Option<&SceneDriver> {
        self.stage.scene.as_ref()
    }

    pub fn scene_status(&self) -> Option<SceneStatus> {
        self.stage.scene.as_ref().map(SceneDriver::status)
    }

    pub fn frames(&self) -> u64 {
        self.render_loop.frames()
    }
}

impl<H: Host> Drop for Page<H> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Environment;
    use crate::host::{ManualHost, SurfaceStatus};
    use crate::interaction::{ElementSpec, PropertySet, Transition, Variant};
    use crate::scene::SceneSpec;
    use crate::timeline::{StepSpec, TimelineSpec};
    use folio_protocol::{ElementGeometry, InputKind, PointerPhase, Viewport};

    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";

    fn host() -> ManualHost {
        ManualHost::new(Viewport::new(1280.0, 800.0), 4000.0)
            .with_element("#hero", ElementGeometry::new(0.0, 800.0))
            .with_element("#hero-scene", ElementGeometry::new(0.0, 800.0))
            .with_element("#about", ElementGeometry::new(800.0, 800.0))
            .with_element("#about h2", ElementGeometry::new(840.0, 80.0))
            .with_element("#cta", ElementGeometry::new(600.0, 60.0))
    }

    fn desktop() -> DeviceProfile {
        Environment::new(FIREFOX, 1920.0, 1080.0).classify(&MotionConfig::default().device)
    }

    fn hero() -> ViewSpec {
        let fade = TimelineSpec::new("hero-scene", "#hero", "top top", "bottom top")
            .unwrap()
            .step(
                StepSpec::new("#hero-scene")
                    .from_to(Property::Opacity, 1.0, 0.0)
                    .from_to(Property::Scale, 1.0, 0.8),
            );
        ViewSpec::new("hero")
            .scene(SceneSpec {
                container: "#hero-scene".into(),
                loader: Some("#scene-loader".into()),
                cards: 0,
            })
            .timeline(fade)
            .element(
                ElementSpec::new("#cta", Variant::default(), Variant::default()).hover(
                    Variant::new(
                        PropertySet::new().with(Property::Scale, 1.1),
                        Transition::default(),
                    ),
                ),
            )
    }

    fn about() -> ViewSpec {
        let title = TimelineSpec::new("about-title", "#about", "top bottom", "top 40%")
            .unwrap()
            .step(StepSpec::new("#about h2").from_to(Property::Y, 60.0, 0.0));
        ViewSpec::new("about").timeline(title)
    }

    fn mount(views: Vec<ViewSpec>) -> Page<ManualHost> {
        Page::mount(host(), desktop(), MotionConfig::default(), views).unwrap()
    }

    fn run_frames(page: &mut Page<ManualHost>, n: usize) -> Vec<RenderCommand> {
        let mut out = Vec::new();
        for _ in 0..n {
            if let Some((request, now)) = page.host_mut().advance(16.0) {
                out.extend(page.frame(request, now));
            }
        }
        out
    }

    #[test]
    fn mount_registers_and_schedules() {
        let page = mount(vec![hero(), about()]);
        assert_eq!(page.views(), ["hero", "about"]);
        assert!(page.host().is_listening(&InputKind::Wheel));
        assert!(page.host().is_listening(&InputKind::Pointer("#cta".into())));
        assert!(page.host().pending_frame().is_some());
        assert_eq!(page.scene_status(), Some(SceneStatus::Pending));
    }

    #[test]
    fn scene_builds_on_the_second_frame_and_stops_the_loader() {
        let mut page = mount(vec![hero()]);
        let first = run_frames(&mut page, 1);
        assert!(!first.iter().any(|c| matches!(c, RenderCommand::ConfigureScene { .. })));
        let second = run_frames(&mut page, 1);
        assert!(second.iter().any(|c| matches!(c, RenderCommand::ConfigureScene { .. })));
        assert!(second.iter().any(|c| matches!(
            c,
            RenderCommand::ResetProperty { target, .. } if target.as_str() == "#scene-loader"
        )));
        assert_eq!(page.scene_status(), Some(SceneStatus::Ready));
    }

    #[test]
    fn scene_presentation_follows_its_timeline() {
        let mut page = mount(vec![hero()]);
        run_frames(&mut page, 2);
        for _ in 0..40 {
            page.handle_input(InputEvent::Wheel { delta_y: 10.0 });
        }
        let out = run_frames(&mut page, 120);
        let last = out.iter().rev().find_map(|c| match c {
            RenderCommand::SetSceneTransform { opacity, scale } => Some((*opacity, *scale)),
            _ => None,
        });
        let (opacity, scale) = last.unwrap();
        assert!(opacity < 1.0 && opacity > 0.0);
        assert!(scale < 1.0 && scale > 0.8);
    }

    fn loader_writes(out: &[RenderCommand]) -> usize {
        out.iter()
            .filter(|c| matches!(
                c,
                RenderCommand::SetProperty { target, .. } if target.as_str() == "#scene-loader"
            ))
            .count()
    }

    #[test]
    fn failed_surface_skips_the_scene() {
        let mut page = mount(vec![hero(), about()]);
        page.host_mut()
            .set_surface(SurfaceStatus::Failed("no webgl".into()));
        let out = run_frames(&mut page, 3);
        assert_eq!(page.scene_status(), Some(SceneStatus::Disabled));
        assert!(!out.iter().any(|c| matches!(c, RenderCommand::ConfigureScene { .. })));
        assert!(out.iter().any(|c| matches!(
            c,
            RenderCommand::ResetProperty { target, .. } if target.as_str() == "#scene-loader"
        )));
        assert!(page.host().pending_frame().is_some());

        // The loader stays cleared and the rest of the page keeps animating.
        page.scroll_to_target(&"#about".into());
        let later = run_frames(&mut page, 60);
        assert_eq!(loader_writes(&later), 0);
        assert!(page.timeline_progress("about-title").unwrap() > 0.0);
    }

    #[test]
    fn degenerate_camera_is_rejected_at_mount() {
        let mut config = MotionConfig::default();
        config.scene.field_of_view = 0.0;
        assert!(matches!(
            Page::mount(host(), desktop(), config, vec![hero()]),
            Err(MountError::Config(_))
        ));
    }

    #[test]
    fn late_trigger_activates_once_laid_out() {
        let host = ManualHost::new(Viewport::new(1280.0, 800.0), 4000.0);
        let mut page = Page::mount(host, desktop(), MotionConfig::default(), vec![about()]).unwrap();
        run_frames(&mut page, 2);
        assert!(!page.timelines().get("about-title").unwrap().is_active());

        page.host_mut()
            .set_element("#about", ElementGeometry::new(800.0, 800.0));
        page.host_mut()
            .set_element("#about h2", ElementGeometry::new(840.0, 80.0));
        assert!(page.scroll_to_target(&"#about".into()));
        run_frames(&mut page, 120);

        assert_eq!(page.scroll_state().virtual_offset, 800.0);
        assert!(page.timelines().get("about-title").unwrap().is_active());
        assert_eq!(page.timeline_progress("about-title"), Some(1.0));
    }

    #[test]
    fn late_element_is_attached_on_relayout() {
        let host = ManualHost::new(Viewport::new(1280.0, 800.0), 4000.0)
            .with_element("#hero", ElementGeometry::new(0.0, 800.0));
        let mut page = Page::mount(host, desktop(), MotionConfig::default(), vec![hero()]).unwrap();
        assert!(page.interaction_state(&"#cta".into()).is_none());
        assert!(!page.host().is_listening(&InputKind::Pointer("#cta".into())));

        page.host_mut()
            .set_element("#cta", ElementGeometry::new(600.0, 60.0));
        run_frames(&mut page, 1);
        assert!(page.host().is_listening(&InputKind::Pointer("#cta".into())));
        page.handle_input(InputEvent::Pointer {
            target: "#cta".into(),
            phase: PointerPhase::Enter,
        });
        assert_eq!(
            page.interaction_state(&"#cta".into()),
            Some(InteractionState::Hovered)
        );

        page.unmount();
        assert_eq!(page.host().listener_count(), 0);
    }

    #[test]
    fn page_keeps_the_profile_it_was_given() {
        let phone = Environment::new("Mozilla/5.0 (iPhone) Mobile", 390.0, 844.0)
            .classify(&MotionConfig::default().device);
        let page = Page::mount(host(), phone, MotionConfig::default(), vec![hero()]).unwrap();
        assert_eq!(*page.profile(), phone);
        let params = page.scene().unwrap().params();
        assert_eq!(params.particle_count, 800);
    }

    #[test]
    fn mount_view_after_unmount_is_refused() {
        let mut page = mount(vec![hero()]);
        page.unmount();
        assert!(matches!(
            page.mount_view(about()),
            Err(MountError::Unmounted(_))
        ));
        assert_eq!(page.host().listener_count(), 0);
        assert!(page.views().is_empty());
        assert!(page.unmount().is_empty());
    }

    #[test]
    fn unmount_view_releases_its_registrations() {
        let mut page = mount(vec![hero(), about()]);
        run_frames(&mut page, 3);
        let out = page.unmount_view("hero");
        assert!(out.contains(&RenderCommand::DestroyScene));
        assert!(!page.host().is_listening(&InputKind::Pointer("#cta".into())));
        assert!(page.scene().is_none());
        assert!(page.timeline_progress("hero-scene").is_none());
        assert!(page.timeline_progress("about-title").is_some());
        assert!(page.unmount_view("hero").is_empty());
    }

    #[test]
    fn duplicate_views_are_rejected() {
        let mut page = mount(vec![about()]);
        assert!(matches!(
            page.mount_view(about()),
            Err(MountError::DuplicateView(_))
        ));
        assert_eq!(page.views().len(), 1);
    }

    #[test]
    fn failed_view_leaves_nothing_behind() {
        let mut page = mount(vec![hero()]);
        let listeners = page.host().listener_count();
        // Same element twice: the second registration fails.
        let broken = ViewSpec::new("broken")
            .element(ElementSpec::new("#about", Variant::default(), Variant::default()))
            .element(ElementSpec::new("#about", Variant::default(), Variant::default()));
        assert!(page.mount_view(broken).is_err());
        assert_eq!(page.host().listener_count(), listeners);
        assert_eq!(page.views(), ["hero"]);
    }

    #[test]
    fn hover_reaches_the_interaction_layer() {
        let mut page = mount(vec![hero()]);
        page.handle_input(InputEvent::Pointer {
            target: "#cta".into(),
            phase: PointerPhase::Enter,
        });
        assert_eq!(
            page.interaction_state(&"#cta".into()),
            Some(InteractionState::Hovered)
        );
    }

    #[test]
    fn scroll_to_target_glides() {
        let mut page = mount(vec![about()]);
        assert!(page.scroll_to_target(&"#about".into()));
        assert!(!page.scroll_to_target(&"#missing".into()));
        let out = run_frames(&mut page, 2);
        assert!(out.iter().any(|c| matches!(c, RenderCommand::ScrollTo { .. })));
        assert_eq!(page.scroll_state().raw_offset, 800.0);
    }

    #[test]
    fn unmount_is_idempotent_and_quiet() {
        let mut page = mount(vec![hero(), about()]);
        run_frames(&mut page, 3);
        let out = page.unmount();
        assert!(!out.is_empty());
        assert_eq!(page.host().listener_count(), 0);
        assert!(page.host().pending_frame().is_none());
        assert!(page.unmount().is_empty());
        assert!(run_frames(&mut page, 3).is_empty());
    }
}
