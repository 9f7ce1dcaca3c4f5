//! Animation clip categories and the URL set produced after rigging.

use serde::{Deserialize, Serialize};

/// File extension of downloadable 3-D artifacts.
pub const ASSET_EXTENSION: &str = ".glb";

/// The two locomotion clips requested for every rigged character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    Running,
    Walking,
}

impl AnimationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnimationKind::Running => "running",
            AnimationKind::Walking => "walking",
        }
    }
}

/// Animation clip URLs attached to a final artifact. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walking: Option<String>,
}

impl AnimationUrls {
    pub fn is_empty(&self) -> bool {
        self.running.is_none() && self.walking.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.running.is_some() && self.walking.is_some()
    }

    /// Set a clip URL only if that category is still empty.
    ///
    /// Returns `true` when the value was stored.
    pub fn fill(&mut self, kind: AnimationKind, url: impl Into<String>) -> bool {
        let slot = match kind {
            AnimationKind::Running => &mut self.running,
            AnimationKind::Walking => &mut self.walking,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(url.into());
        true
    }
}
