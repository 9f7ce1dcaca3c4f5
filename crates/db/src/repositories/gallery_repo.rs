//! Repository for the `gallery_entries` table.

use rigforge_core::gallery::GalleryEntry;
use rigforge_core::types::EntityId;
use sqlx::PgPool;

use crate::models::gallery::GalleryEntryRow;

/// Column list for `gallery_entries` queries.
const COLUMNS: &str = "id, prompt, model_url, running_url, walking_url, created_at";

/// Provides list/insert/delete operations for gallery entries.
pub struct GalleryRepo;

impl GalleryRepo {
    /// All entries, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<GalleryEntryRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM gallery_entries ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, GalleryEntryRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Insert an entry. A row with the same model URL is replaced, which
    /// moves it to the front.
    pub async fn insert(pool: &PgPool, entry: &GalleryEntry) -> Result<GalleryEntryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO gallery_entries \
                (id, prompt, model_url, running_url, walking_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (model_url) DO UPDATE SET \
                id = EXCLUDED.id, \
                prompt = EXCLUDED.prompt, \
                running_url = EXCLUDED.running_url, \
                walking_url = EXCLUDED.walking_url, \
                created_at = EXCLUDED.created_at \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GalleryEntryRow>(&query)
            .bind(entry.id)
            .bind(&entry.prompt)
            .bind(&entry.model_url)
            .bind(entry.animation_urls.running.as_deref())
            .bind(entry.animation_urls.walking.as_deref())
            .bind(entry.created_at)
            .fetch_one(pool)
            .await
    }

    /// Delete an entry by id. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM gallery_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
