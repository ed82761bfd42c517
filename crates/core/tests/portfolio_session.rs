//! Integration test: mount the full portfolio on a deterministic host and
//! drive it with synthetic input and frames.

use std::f32::consts::TAU;

use folio_core::content::sample_projects;
use folio_core::interaction::InteractionState;
use folio_core::presets;
use folio_core::scene::{SceneStatus, card_layout};
use folio_core::timeline::{StepSpec, Timeline, TimelinePolicy, TimelineSpec};
use folio_core::{Environment, Host, ManualHost, MotionConfig, Page};
use folio_protocol::{
    DeviceTier, ElementGeometry, InputEvent, Layer, Property, RenderCommand, TargetId, Viewport,
};

const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";
const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";

fn portfolio_host() -> ManualHost {
    let mut host = ManualHost::new(Viewport::new(1280.0, 800.0), 4000.0)
        .with_element(presets::HERO, ElementGeometry::new(0.0, 800.0))
        .with_element(presets::HERO_SCENE, ElementGeometry::new(0.0, 800.0))
        .with_element(presets::SCENE_LOADER, ElementGeometry::new(380.0, 40.0))
        .with_element(presets::HERO_SOCIAL, ElementGeometry::new(520.0, 40.0))
        .with_element("#about", ElementGeometry::new(800.0, 800.0))
        .with_element("#experience", ElementGeometry::new(1600.0, 800.0))
        .with_element(presets::PROJECTS, ElementGeometry::new(2400.0, 1000.0))
        .with_element(presets::PROJECTS_TITLE, ElementGeometry::new(2440.0, 80.0))
        .with_element("#contact", ElementGeometry::new(3400.0, 600.0));
    let name = TargetId::new(presets::HERO_NAME);
    for i in 0..3 {
        host.set_element(name.nth(i), ElementGeometry::new(300.0, 60.0));
    }
    let cta = TargetId::new(presets::HERO_CTA);
    for i in 0..2 {
        host.set_element(cta.nth(i), ElementGeometry::new(600.0, 48.0));
    }
    let link = TargetId::new(presets::NAV_LINK);
    for i in 0..presets::NAV_SECTIONS.len() {
        host.set_element(link.nth(i), ElementGeometry::new(0.0, 24.0));
    }
    let card = TargetId::new(presets::PROJECT_CARD);
    for i in 0..3 {
        host.set_element(card.nth(i), ElementGeometry::new(2560.0, 400.0));
    }
    host
}

fn mount(environment: &Environment) -> Page<ManualHost> {
    let config = MotionConfig::default();
    let profile = environment.classify(&config.device);
    let views = presets::portfolio(&config, &profile, &sample_projects())
        .expect("portfolio views should build");
    Page::mount(portfolio_host(), profile, config, views).expect("portfolio should mount")
}

fn desktop() -> Environment {
    Environment::new(FIREFOX, 1920.0, 1080.0)
}

fn frame(page: &mut Page<ManualHost>, ms: f64) -> Vec<RenderCommand> {
    match page.host_mut().advance(ms) {
        Some((request, now)) => page.frame(request, now),
        None => Vec::new(),
    }
}

fn run_frames(page: &mut Page<ManualHost>, n: usize) -> Vec<RenderCommand> {
    (0..n).flat_map(|_| frame(page, 16.0)).collect()
}

#[test]
fn wheel_burst_is_smoothed_then_settles() {
    let mut page = mount(&desktop());
    let limit = page.host().scroll_limit();
    let duration = page.config().scroll.desktop.duration;

    // 100 wheel events over one second, one frame after each.
    let mut smoothed = false;
    for _ in 0..100 {
        page.handle_input(InputEvent::Wheel { delta_y: 10.0 });
        frame(&mut page, 10.0);
        let state = page.scroll_state();
        smoothed |= (state.virtual_offset - state.raw_offset).abs() > 1.0;
    }
    assert!(smoothed, "virtual offset never lagged the raw offset");
    assert_eq!(page.scroll_state().raw_offset, 1000.0);

    let settle_frames = (duration * 1000.0 / 16.0).ceil() as usize;
    run_frames(&mut page, settle_frames);
    let state = page.scroll_state();
    assert!(
        (state.virtual_offset - state.raw_offset).abs() <= 0.01 * limit,
        "virtual {} did not converge on raw {}",
        state.virtual_offset,
        state.raw_offset
    );
}

#[test]
fn teardown_before_first_frame_leaves_nothing_running() {
    let mut page = mount(&desktop());
    assert!(page.host().listener_count() > 0);
    assert!(page.host().pending_frame().is_some());

    page.unmount();
    assert_eq!(page.host().listener_count(), 0);
    assert!(page.host().pending_frame().is_none());
    assert!(page.host_mut().advance(16.0).is_none());
    assert!(run_frames(&mut page, 5).is_empty());
    assert_eq!(page.frames(), 0);
    assert!(page.unmount().is_empty());
}

#[test]
fn timeline_progress_spans_its_anchors() {
    let host = ManualHost::new(Viewport::new(1280.0, 800.0), 4000.0)
        .with_element("#about", ElementGeometry::new(800.0, 800.0))
        .with_element("#about h2", ElementGeometry::new(840.0, 80.0));
    let spec = TimelineSpec::new("about-title", "#about", "top bottom", "top 40%")
        .expect("anchors should parse")
        .step(StepSpec::new("#about h2").from_to(Property::Y, 60.0, 0.0));
    let mut timeline = Timeline::new(spec, TimelinePolicy::default()).expect("valid timeline");
    timeline.measure(&host);

    // Element top meets the viewport bottom at 0 and 40% of it at 480.
    assert_eq!(timeline.range(), Some((0.0, 480.0)));
    assert_eq!(timeline.progress_at(-50.0), 0.0);
    assert_eq!(timeline.progress_at(0.0), 0.0);
    assert_eq!(timeline.progress_at(480.0), 1.0);
    assert_eq!(timeline.progress_at(1200.0), 1.0);

    let samples: Vec<f64> = (0..=48).map(|i| timeline.progress_at(i as f64 * 10.0)).collect();
    assert!(samples.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn disposing_twice_reverts_once() {
    let host = ManualHost::new(Viewport::new(1280.0, 800.0), 4000.0)
        .with_element("#about", ElementGeometry::new(800.0, 800.0))
        .with_element("#about h2", ElementGeometry::new(840.0, 80.0));
    let spec = TimelineSpec::new("about-title", "#about", "top bottom", "top 40%")
        .expect("anchors should parse")
        .step(
            StepSpec::new("#about h2")
                .from_to(Property::Y, 60.0, 0.0)
                .from_to(Property::Opacity, 0.0, 1.0),
        );
    let mut timeline = Timeline::new(spec, TimelinePolicy::default()).expect("valid timeline");
    timeline.measure(&host);

    let mut out = Vec::new();
    timeline.sync(240.0, 0.016, &mut out);
    assert_eq!(out.len(), 2);

    let mut reverted = Vec::new();
    assert_eq!(timeline.dispose(&mut reverted), 2);
    assert_eq!(timeline.dispose(&mut reverted), 0);
    assert_eq!(reverted.len(), 2);
    assert!(reverted.iter().all(|c| matches!(
        c,
        RenderCommand::ResetProperty { layer: Layer::Scroll, .. }
    )));
    assert_eq!(timeline.value(&"#about h2".into(), Property::Y), None);

    // Syncing a disposed timeline applies nothing.
    let mut after = Vec::new();
    timeline.sync(480.0, 0.016, &mut after);
    assert!(after.is_empty());
}

#[test]
fn unmounting_a_view_twice_is_harmless() {
    let mut page = mount(&desktop());
    run_frames(&mut page, 3);

    let first = page.unmount_view("hero");
    assert!(first.iter().any(|c| matches!(
        c,
        RenderCommand::ResetProperty { layer: Layer::Scroll, .. }
    )));
    assert!(first.contains(&RenderCommand::DestroyScene));
    assert!(page.unmount_view("hero").is_empty());
    assert_eq!(page.views(), ["navbar", "projects"]);
    assert!(page.host().pending_frame().is_some());
}

#[test]
fn cards_are_evenly_spaced() {
    for n in [1, 3, 7] {
        let cards = card_layout(n, 5.0);
        assert_eq!(cards.len(), n);
        for (i, card) in cards.iter().enumerate() {
            let next = &cards[(i + 1) % n];
            let mut spacing = card.rotation_y - next.rotation_y;
            if i + 1 == n {
                spacing += TAU;
            }
            assert!(
                (spacing - TAU / n as f32).abs() < 1e-5,
                "N={n}: spacing {spacing} between cards {i} and {}",
                (i + 1) % n
            );
            let radius = (card.position.x.powi(2) + card.position.z.powi(2)).sqrt();
            assert!((radius - 5.0).abs() < 1e-4);
        }
    }
}

#[test]
fn scene_builds_with_one_card_per_project() {
    let mut page = mount(&desktop());
    let out = run_frames(&mut page, 3);
    let cards = out.iter().find_map(|c| match c {
        RenderCommand::CreateCards { cards } => Some(cards.len()),
        _ => None,
    });
    assert_eq!(cards, Some(3));
    assert_eq!(page.scene_status(), Some(SceneStatus::Ready));

    // Every frame after the build floats each card.
    let next = run_frames(&mut page, 1);
    let floats = next
        .iter()
        .filter(|c| matches!(c, RenderCommand::SetCardTransform { .. }))
        .count();
    assert_eq!(floats, 3);
}

#[test]
fn lower_tiers_never_do_more_work() {
    let environments = [
        Environment::new(FIREFOX, 1920.0, 1080.0),
        Environment::new(IPAD, 1024.0, 1366.0),
        Environment::new(IPHONE, 390.0, 844.0),
    ];
    let mut seen = Vec::new();
    for environment in &environments {
        let page = mount(environment);
        let particles = page.scene().map_or(0, |s| s.params().particle_count);
        let passes = page
            .scene()
            .map_or(0, |s| s.params().post_processing.passes());
        let steps = page.timelines().get("hero-out").map_or(0, Timeline::step_count);
        seen.push((page.profile().tier, particles, passes, steps));
    }

    let tiers: Vec<DeviceTier> = seen.iter().map(|s| s.0).collect();
    assert_eq!(
        tiers,
        [DeviceTier::Desktop, DeviceTier::Mobile, DeviceTier::NarrowMobile]
    );
    for pair in seen.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);
        assert!(lower.1 <= upper.1, "particle count grew: {seen:?}");
        assert!(lower.2 <= upper.2, "post-processing grew: {seen:?}");
        assert!(lower.3 <= upper.3, "timeline steps grew: {seen:?}");
    }
    assert_eq!(seen[0], (DeviceTier::Desktop, 3000, 3, 6));
    assert_eq!(seen[2], (DeviceTier::NarrowMobile, 800, 0, 3));
}

#[test]
fn cards_reveal_in_order_once_in_view() {
    let mut page = mount(&desktop());
    run_frames(&mut page, 2);
    let card = TargetId::new(presets::PROJECT_CARD);
    for i in 0..3 {
        assert_eq!(page.interaction_state(&card.nth(i)), Some(InteractionState::Idle));
        page.handle_input(InputEvent::Intersection {
            target: card.nth(i),
            ratio: 0.5,
        });
    }
    assert_eq!(
        page.interaction_state(&card.nth(2)),
        Some(InteractionState::EnteringView)
    );

    // First card: 0.5 s. Third card: 0.4 s delay plus 0.5 s.
    run_frames(&mut page, 40);
    assert_eq!(page.interaction_state(&card.nth(0)), Some(InteractionState::InView));
    assert_eq!(
        page.interaction_state(&card.nth(2)),
        Some(InteractionState::EnteringView)
    );
    run_frames(&mut page, 30);
    assert_eq!(page.interaction_state(&card.nth(2)), Some(InteractionState::InView));
}

#[test]
fn navbar_link_glides_to_its_section() {
    let mut page = mount(&desktop());
    assert!(page.scroll_to_target(&presets::PROJECTS.into()));
    let out = run_frames(&mut page, 90);
    assert_eq!(page.scroll_state().virtual_offset, 2400.0);
    assert_eq!(page.timeline_progress("projects-title"), Some(1.0));
    assert!(out.iter().any(|c| matches!(c, RenderCommand::ScrollTo { .. })));

    let json = serde_json::to_string(&out).expect("commands serialize");
    assert!(json.contains("\"ScrollTo\""));
}

#[test]
fn gallery_laid_out_after_mount_comes_alive() {
    let config = MotionConfig::default();
    let profile = desktop().classify(&config.device);
    let views = presets::portfolio(&config, &profile, &sample_projects()).expect("views build");
    let card = TargetId::new(presets::PROJECT_CARD);
    let mut host = portfolio_host();
    host.remove_element(presets::PROJECTS);
    host.remove_element(presets::PROJECTS_TITLE);
    for i in 0..3 {
        host.remove_element(card.nth(i).as_str());
    }
    let mut page = Page::mount(host, profile, config, views).expect("portfolio should mount");
    run_frames(&mut page, 5);
    let title = page.timelines().get("projects-title").expect("title timeline");
    assert!(!title.is_active());
    assert_eq!(page.interaction_state(&card.nth(0)), None);

    page.host_mut()
        .set_element(presets::PROJECTS, ElementGeometry::new(2400.0, 1000.0));
    page.host_mut()
        .set_element(presets::PROJECTS_TITLE, ElementGeometry::new(2440.0, 80.0));
    for i in 0..3 {
        page.host_mut()
            .set_element(card.nth(i), ElementGeometry::new(2560.0, 400.0));
    }
    assert!(page.scroll_to_target(&presets::PROJECTS.into()));
    run_frames(&mut page, 90);

    assert_eq!(page.timeline_progress("projects-title"), Some(1.0));
    for i in 0..3 {
        assert_eq!(page.interaction_state(&card.nth(i)), Some(InteractionState::Idle));
    }
    page.unmount();
    assert_eq!(page.host().listener_count(), 0);
}
