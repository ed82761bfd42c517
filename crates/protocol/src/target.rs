use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

/// Handle to a visual target on the host: a DOM selector such as
/// `".project-card:nth-child(2)"` or a scene node name such as `"scene"`.
///
/// Targets are cloned into commands on every frame, so the name lives in an
/// `Arc<str>` and a clone is a refcount bump. On the wire it is a bare
/// selector string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub struct TargetId(Arc<str>);

impl TargetId {
    pub fn new(selector: impl AsRef<str>) -> Self {
        TargetId(Arc::from(selector.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the target for the `index`-th item of a group, e.g. the third
    /// project card of `".project-card"`.
    pub fn nth(&self, index: usize) -> TargetId {
        TargetId::new(format!("{}:nth-child({})", self.0, index + 1))
    }
}

impl PartialEq<&str> for TargetId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl std::ops::Deref for TargetId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by target be queried with a plain selector.
impl std::borrow::Borrow<str> for TargetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        TargetId(Arc::from(s))
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        TargetId(Arc::from(s))
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TargetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
