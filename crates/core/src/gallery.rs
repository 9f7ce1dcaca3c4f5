//! Gallery of previously generated characters.
//!
//! The gallery is an ordered list held by an external store that only
//! offers push/delete/list. [`record_gallery_entry`] layers the gallery
//! rules on top with a read-modify-write:
//!
//! - entries are unique by model URL (re-adding moves the entry to the front),
//! - the newest entry is first,
//! - at most `capacity` entries are kept.
//!
//! Concurrent writers are not sequenced; last write wins.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::artifact::AnimationUrls;
use crate::types::{EntityId, Timestamp};

/// Default number of entries retained.
pub const DEFAULT_GALLERY_CAPACITY: usize = 20;

/// Compact summary of one finished generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub id: EntityId,
    pub prompt: String,
    pub model_url: String,
    #[serde(default)]
    pub animation_urls: AnimationUrls,
    pub created_at: Timestamp,
}

impl GalleryEntry {
    pub fn new(
        prompt: impl Into<String>,
        model_url: impl Into<String>,
        animation_urls: AnimationUrls,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            prompt: prompt.into(),
            model_url: model_url.into(),
            animation_urls,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Errors from a gallery backend.
#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("Gallery backend error: {0}")]
    Backend(String),
}

/// Opaque ordered-list store backing the gallery.
#[async_trait::async_trait]
pub trait GalleryStore: Send + Sync {
    /// All entries, newest first.
    async fn list(&self) -> Result<Vec<GalleryEntry>, GalleryError>;

    /// Insert an entry at the front.
    async fn push(&self, entry: GalleryEntry) -> Result<(), GalleryError>;

    /// Remove an entry by id. Removing a missing id is not an error.
    async fn delete(&self, id: EntityId) -> Result<(), GalleryError>;

    /// Short backend name reported by the health endpoint.
    fn backend_name(&self) -> &'static str;
}

/// Ids of existing entries that must be deleted before `new_model_url` is
/// pushed so that URLs stay unique and the list stays within `capacity`.
///
/// `existing` must be newest first.
pub fn stale_entry_ids(
    existing: &[GalleryEntry],
    new_model_url: &str,
    capacity: usize,
) -> Vec<EntityId> {
    // One slot is reserved for the entry about to be pushed.
    let keep = capacity.saturating_sub(1);
    let mut retained = 0usize;
    let mut stale = Vec::new();

    for entry in existing {
        if entry.model_url == new_model_url || retained >= keep {
            stale.push(entry.id);
        } else {
            retained += 1;
        }
    }
    stale
}

/// Record a finished generation in the gallery.
///
/// Returns the number of stale entries removed.
pub async fn record_gallery_entry(
    store: &dyn GalleryStore,
    entry: GalleryEntry,
    capacity: usize,
) -> Result<usize, GalleryError> {
    if capacity == 0 {
        return Ok(0);
    }

    let existing = store.list().await?;
    let stale = stale_entry_ids(&existing, &entry.model_url, capacity);
    for id in &stale {
        store.delete(*id).await?;
    }
    store.push(entry).await?;
    Ok(stale.len())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local gallery store used when no database is configured.
#[derive(Default)]
pub struct MemoryGalleryStore {
    entries: RwLock<VecDeque<GalleryEntry>>,
}

impl MemoryGalleryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl GalleryStore for MemoryGalleryStore {
    async fn list(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        Ok(self.entries.read().await.iter().cloned().collect())
    }

    async fn push(&self, entry: GalleryEntry) -> Result<(), GalleryError> {
        self.entries.write().await.push_front(entry);
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> Result<(), GalleryError> {
        self.entries.write().await.retain(|e| e.id != id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
