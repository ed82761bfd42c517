//! The portfolio's own views: hero, navbar and project gallery.

use folio_protocol::{DeviceProfile, Property, TargetId};

use crate::config::MotionConfig;
use crate::content::ContentItem;
use crate::easing::Easing;
use crate::interaction::{ElementSpec, PropertySet, Transition, Variant};
use crate::scene::SceneSpec;
use crate::timeline::{Detail, StepPosition, StepSpec, TimelineError, TimelineSpec};
use crate::view::ViewSpec;

pub const HERO: &str = "#home";
pub const HERO_NAME: &str = ".hero-name span";
pub const HERO_SOCIAL: &str = ".social-links";
pub const HERO_CTA: &str = ".cta-buttons button";
pub const HERO_SCENE: &str = "#hero-scene";
pub const SCENE_LOADER: &str = "#scene-loader";
pub const NAV_LINK: &str = ".menu-items a";
pub const PROJECTS: &str = "#projects";
pub const PROJECTS_TITLE: &str = "#projects h2";
pub const PROJECT_CARD: &str = ".project-card";

/// Sections the navbar links scroll to, in menu order.
pub const NAV_SECTIONS: [&str; 4] = ["#about", "#experience", "#projects", "#contact"];

/// All views of the page for a device. The scene gets one card per
/// project.
pub fn portfolio(
    config: &MotionConfig,
    profile: &DeviceProfile,
    projects: &[ContentItem],
) -> Result<Vec<ViewSpec>, TimelineError> {
    Ok(vec![
        navbar(),
        hero(projects.len())?,
        gallery(config, profile, projects.len())?,
    ])
}

/// Hero: the name, links and 3D scene drift away as the section scrolls
/// out.
pub fn hero(cards: usize) -> Result<ViewSpec, TimelineError> {
    let scroll_out = TimelineSpec::new("hero-out", HERO, "top top", "bottom top")?
        .scrub(0.3)
        .step(
            StepSpec::new(HERO_NAME)
                .from_to(Property::Y, 0.0, -80.0)
                .from_to(Property::Opacity, 1.0, 0.0)
                .duration(1.0)
                .stagger(3, 0.15),
        )
        .step(
            StepSpec::new(HERO_SOCIAL)
                .from_to(Property::Opacity, 1.0, 0.0)
                .position(StepPosition::WithPrevious(0.2))
                .detail(Detail::Enhanced),
        )
        .step(
            StepSpec::new(HERO_CTA)
                .from_to(Property::X, 0.0, -40.0)
                .from_to(Property::Blur, 0.0, 6.0)
                .position(StepPosition::WithPrevious(0.0))
                .detail(Detail::Full)
                .stagger(2, 0.1),
        );

    let scene_out = TimelineSpec::new("hero-scene", HERO, "center center", "bottom top")?.step(
        StepSpec::new(HERO_SCENE)
            .from_to(Property::Opacity, 1.0, 0.0)
            .from_to(Property::Scale, 1.0, 0.85)
            .ease(Easing::Linear)
            .duration(1.0),
    );

    let button = TargetId::new(HERO_CTA);
    let press = |i| {
        ElementSpec::new(button.nth(i), Variant::default(), Variant::default())
            .hover(Variant::new(
                PropertySet::new().with(Property::Scale, 1.05),
                Transition::new(0.2, Easing::EaseOut),
            ))
            .tap(Variant::new(
                PropertySet::new().with(Property::Scale, 0.95),
                Transition::new(0.1, Easing::EaseOut),
            ))
    };

    Ok(ViewSpec::new("hero")
        .timeline(scroll_out)
        .timeline(scene_out)
        .element(press(0))
        .element(press(1))
        .scene(SceneSpec {
            container: HERO_SCENE.into(),
            loader: Some(SCENE_LOADER.into()),
            cards,
        }))
}

/// Navbar: menu links tint on hover.
pub fn navbar() -> ViewSpec {
    let link = TargetId::new(NAV_LINK);
    (0..NAV_SECTIONS.len()).fold(ViewSpec::new("navbar"), |view, i| {
        let tint = Variant::new(
            PropertySet::new().with(Property::ColorMix, 1.0),
            Transition::new(0.15, Easing::EaseOut),
        );
        view.element(
            ElementSpec::new(link.nth(i), Variant::default(), Variant::default()).hover(tint),
        )
    })
}

/// Project gallery: the heading rises in with scroll, the cards reveal
/// one after another once the grid is in view.
pub fn gallery(
    config: &MotionConfig,
    profile: &DeviceProfile,
    cards: usize,
) -> Result<ViewSpec, TimelineError> {
    let title = TimelineSpec::new("projects-title", PROJECTS, "top bottom", "top 40%")?.step(
        StepSpec::new(PROJECTS_TITLE)
            .from_to(Property::Y, 60.0, 0.0)
            .from_to(Property::Opacity, 0.0, 1.0)
            .ease(Easing::Power3Out)
            .duration(1.0),
    );

    let stagger_factor = config.motion.stagger_factor.get(profile.tier);
    let card = TargetId::new(PROJECT_CARD);
    let view = (0..cards).fold(ViewSpec::new("projects").timeline(title), |view, i| {
        let lift = Variant::new(
            PropertySet::new().with(Property::Y, -8.0),
            Transition::new(0.2, Easing::EaseOut),
        );
        view.element(ElementSpec::reveal_card(card.nth(i), i, config, stagger_factor).hover(lift))
    });
    Ok(view)
}
