use serde::{Deserialize, Serialize};

use crate::interaction::{ElementSpec, LoopSpec};
use crate::scene::SceneSpec;
use crate::timeline::TimelineSpec;

/// Everything one section of the page animates. Mounting a view registers
/// all of it; unmounting releases all of it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewSpec {
    pub id: String,
    #[serde(default)]
    pub timelines: Vec<TimelineSpec>,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub loops: Vec<LoopSpec>,
    #[serde(default)]
    pub scene: Option<SceneSpec>,
}

impl ViewSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn timeline(mut self, timeline: TimelineSpec) -> Self {
        self.timelines.push(timeline);
        self
    }

    pub fn element(mut self, element: ElementSpec) -> Self {
        self.elements.push(element);
        self
    }

    pub fn looping(mut self, spec: LoopSpec) -> Self {
        self.loops.push(spec);
        self
    }

    pub fn scene(mut self, scene: SceneSpec) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Parse a list of views from JSON.
    pub fn list_from_json(json: &str) -> Result<Vec<ViewSpec>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_parse_from_json() {
        let json = r##"[
            {
                "id": "hero",
                "timelines": [{
                    "id": "hero-out",
                    "trigger": "#hero",
                    "start": "top top",
                    "end": "bottom top",
                    "steps": [{
                        "target": "#hero h1",
                        "deltas": [{"property": "Opacity", "from": 1.0, "to": 0.0}],
                        "easing": "linear"
                    }]
                }],
                "scene": {"container": "#hero-scene", "cards": 3}
            },
            {"id": "footer"}
        ]"##;
        let views = ViewSpec::list_from_json(json).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].timelines[0].steps[0].duration, 0.5);
        assert_eq!(views[0].scene.as_ref().map(|s| s.cards), Some(3));
        assert!(views[1].timelines.is_empty());
    }
}
