use std::collections::BTreeMap;

use folio_core::ManualHost;
use folio_core::presets;
use folio_protocol::{
    CardPlacement, Color, ElementGeometry, Layer, Property, RenderCommand, SceneParams, TargetId,
    Vec3, Viewport,
};
use glam::{EulerRot, Mat3};

/// Sections of the demo page, top to bottom, with their heights.
pub const SECTIONS: [(&str, f64); 5] = [
    (presets::HERO, 800.0),
    ("#about", 800.0),
    ("#experience", 800.0),
    (presets::PROJECTS, 1000.0),
    ("#contact", 600.0),
];

/// A deterministic host laid out like the real page.
pub fn demo_host(viewport: Viewport, projects: usize) -> ManualHost {
    let mut top = 0.0;
    let mut host = ManualHost::new(viewport, SECTIONS.iter().map(|(_, h)| h).sum());
    for (section, height) in SECTIONS {
        host.set_element(section, ElementGeometry::new(top, height));
        top += height;
    }

    host.set_element(presets::HERO_SCENE, ElementGeometry::new(0.0, 800.0));
    host.set_element(presets::SCENE_LOADER, ElementGeometry::new(380.0, 40.0));
    host.set_element(presets::HERO_SOCIAL, ElementGeometry::new(520.0, 40.0));
    host.set_element(presets::PROJECTS_TITLE, ElementGeometry::new(2440.0, 80.0));
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
    for i in 0..projects {
        let row = (i / 3) as f64;
        host.set_element(card.nth(i), ElementGeometry::new(2560.0 + row * 420.0, 400.0));
    }
    host
}

/// Fraction of `geometry` inside the viewport at scroll offset `scroll`.
pub fn visible_ratio(geometry: ElementGeometry, viewport_height: f64, scroll: f64) -> f64 {
    if geometry.height <= 0.0 {
        return 0.0;
    }
    let top = geometry.top.max(scroll);
    let bottom = (geometry.top + geometry.height).min(scroll + viewport_height);
    ((bottom - top) / geometry.height).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct SceneView {
    pub params: SceneParams,
    pub particles: Vec<Vec3>,
    pub colors: Vec<Color>,
    pub cards: Vec<CardPlacement>,
    pub card_offsets: Vec<Vec3>,
    pub rotation: Vec3,
    pub opacity: f32,
    pub scale: f32,
}

impl SceneView {
    fn new(params: SceneParams) -> Self {
        Self {
            params,
            particles: Vec::new(),
            colors: Vec::new(),
            cards: Vec::new(),
            card_offsets: Vec::new(),
            rotation: Vec3::ZERO,
            opacity: 1.0,
            scale: 1.0,
        }
    }

    /// Project a scene point to normalized screen coordinates in `[-1, 1]`,
    /// or `None` if it lies behind the near plane.
    pub fn project(&self, point: Vec3, spin: bool) -> Option<(f64, f64)> {
        let mut p = glam::Vec3::new(point.x, point.y, point.z);
        if spin {
            let r = self.rotation;
            p = Mat3::from_euler(EulerRot::XYZ, r.x, r.y, r.z) * p;
        }
        let depth = self.params.camera_distance - p.z;
        if depth <= self.params.near {
            return None;
        }
        let focal = 1.0 / (self.params.field_of_view.to_radians() / 2.0).tan();
        let s = focal * self.scale / depth;
        Some((f64::from(p.x * s), f64::from(p.y * s)))
    }

    /// Mean particle colour dimmed by the scene opacity, as terminal RGB.
    pub fn tint(&self) -> (u8, u8, u8) {
        if self.colors.is_empty() {
            return (0, 0, 0);
        }
        let n = self.colors.len() as f32;
        let (r, g, b) = self
            .colors
            .iter()
            .fold((0.0, 0.0, 0.0), |(r, g, b), c| (r + c.r, g + c.g, b + c.b));
        let channel = |v: f32| ((v / n) * self.opacity * 255.0).clamp(0.0, 255.0) as u8;
        (channel(r), channel(g), channel(b))
    }

    /// Card centre including its current float offset.
    pub fn card_position(&self, index: usize) -> Option<Vec3> {
        let card = self.cards.get(index)?;
        let offset = self.card_offsets.get(index).copied().unwrap_or(Vec3::ZERO);
        Some(Vec3::new(
            card.position.x + offset.x,
            card.position.y + offset.y,
            card.position.z + offset.z,
        ))
    }
}

/// What the host would currently show: every applied property value and
/// the scene, rebuilt from render commands only.
#[derive(Debug, Default)]
pub struct Mirror {
    values: BTreeMap<(TargetId, Layer, Property), f64>,
    scroll: f64,
    scene: Option<SceneView>,
    commands: u64,
}

impl Mirror {
    pub fn apply(&mut self, commands: &[RenderCommand]) {
        self.commands += commands.len() as u64;
        for command in commands {
            match command {
                RenderCommand::SetProperty {
                    target,
                    layer,
                    property,
                    value,
                } => {
                    self.values.insert((target.clone(), *layer, *property), *value);
                }
                RenderCommand::ResetProperty {
                    target,
                    layer,
                    property,
                } => {
                    self.values.remove(&(target.clone(), *layer, *property));
                }
                RenderCommand::ScrollTo { offset } => self.scroll = *offset,
                RenderCommand::ConfigureScene { params } => {
                    self.scene = Some(SceneView::new(*params));
                }
                RenderCommand::CreateParticleField {
                    positions, colors, ..
                } => {
                    if let Some(scene) = self.scene.as_mut() {
                        scene.particles.clone_from(positions);
                        scene.colors.clone_from(colors);
                    }
                }
                RenderCommand::CreateCards { cards } => {
                    if let Some(scene) = self.scene.as_mut() {
                        scene.cards.clone_from(cards);
                        scene.card_offsets = vec![Vec3::ZERO; cards.len()];
                    }
                }
                RenderCommand::SetFieldRotation { rotation } => {
                    if let Some(scene) = self.scene.as_mut() {
                        scene.rotation = *rotation;
                    }
                }
                RenderCommand::SetCardTransform { index, offset, .. } => {
                    if let Some(slot) = self
                        .scene
                        .as_mut()
                        .and_then(|s| s.card_offsets.get_mut(*index as usize))
                    {
                        *slot = *offset;
                    }
                }
                RenderCommand::SetSceneTransform { opacity, scale } => {
                    if let Some(scene) = self.scene.as_mut() {
                        scene.opacity = *opacity;
                        scene.scale = *scale;
                    }
                }
                RenderCommand::DestroyScene => self.scene = None,
                RenderCommand::BeginGroup { .. } | RenderCommand::EndGroup => {}
            }
        }
    }

    /// Both layers composed, or `None` if neither touches the property.
    pub fn composed(&self, target: &TargetId, property: Property) -> Option<f64> {
        let scroll = self.values.get(&(target.clone(), Layer::Scroll, property));
        let interaction = self
            .values
            .get(&(target.clone(), Layer::Interaction, property));
        if scroll.is_none() && interaction.is_none() {
            return None;
        }
        Some(Layer::compose(
            property,
            scroll.copied().unwrap_or_else(|| property.identity()),
            interaction.copied().unwrap_or_else(|| property.identity()),
        ))
    }

    /// Targets with at least one applied value, in order.
    pub fn targets(&self) -> Vec<TargetId> {
        let mut targets: Vec<TargetId> = self.values.keys().map(|(t, _, _)| t.clone()).collect();
        targets.dedup();
        targets
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn scroll(&self) -> f64 {
        self.scroll
    }

    pub fn scene(&self) -> Option<&SceneView> {
        self.scene.as_ref()
    }

    pub fn commands(&self) -> u64 {
        self.commands
    }
}
