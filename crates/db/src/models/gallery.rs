//! Gallery entry rows.

use rigforge_core::artifact::AnimationUrls;
use rigforge_core::gallery::GalleryEntry;
use rigforge_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `gallery_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GalleryEntryRow {
    pub id: EntityId,
    pub prompt: String,
    pub model_url: String,
    pub running_url: Option<String>,
    pub walking_url: Option<String>,
    pub created_at: Timestamp,
}

impl From<GalleryEntryRow> for GalleryEntry {
    fn from(row: GalleryEntryRow) -> Self {
        GalleryEntry {
            id: row.id,
            prompt: row.prompt,
            model_url: row.model_url,
            animation_urls: AnimationUrls {
                running: row.running_url,
                walking: row.walking_url,
            },
            created_at: row.created_at,
        }
    }
}
