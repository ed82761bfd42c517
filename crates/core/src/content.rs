use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate content id {0}")]
    DuplicateId(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// One project in the gallery. Copy is opaque to the core; only the id and
/// the number of items matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tech: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Parse the project list and check that ids are unique.
pub fn parse_content(json: &str) -> Result<Vec<ContentItem>, ContentError> {
    let items: Vec<ContentItem> = serde_json::from_str(json)?;
    check_unique(&items)?;
    Ok(items)
}

pub fn check_unique(items: &[ContentItem]) -> Result<(), ContentError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id) {
            return Err(ContentError::DuplicateId(item.id));
        }
    }
    Ok(())
}

/// Placeholder gallery shipped with the site.
pub fn sample_projects() -> Vec<ContentItem> {
    let item = |id, title: &str, description: &str| ContentItem {
        id,
        title: title.to_string(),
        description: description.to_string(),
        tech: Vec::new(),
        links: Vec::new(),
    };
    vec![
        item(
            1,
            "Project One",
            "A brief description of the first project, highlighting key technologies or features.",
        ),
        item(
            2,
            "Project Two",
            "Description for the second project. Mention the problem it solves or its main purpose.",
        ),
        item(
            3,
            "Project Three",
            "Details about the third project. Maybe focus on the tech stack used.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_optional_fields() {
        let json = r#"[
            {"id": 1, "title": "Folio", "description": "This site",
             "tech": ["rust", "wasm"],
             "links": [{"label": "source", "url": "https://example.com/folio"}]},
            {"id": 2, "title": "Other", "description": "Something else"}
        ]"#;
        let items = parse_content(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].tech, ["rust", "wasm"]);
        assert!(items[1].links.is_empty());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"[
            {"id": 4, "title": "a", "description": ""},
            {"id": 4, "title": "b", "description": ""}
        ]"#;
        assert!(matches!(
            parse_content(json),
            Err(ContentError::DuplicateId(4))
        ));
    }

    #[test]
    fn samples_are_valid() {
        let items = sample_projects();
        assert_eq!(items.len(), 3);
        assert!(check_unique(&items).is_ok());
    }
}
