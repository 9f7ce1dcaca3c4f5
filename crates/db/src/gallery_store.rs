//! [`GalleryStore`] backed by Postgres.

use rigforge_core::gallery::{GalleryEntry, GalleryError, GalleryStore};
use rigforge_core::types::EntityId;

use crate::repositories::GalleryRepo;
use crate::DbPool;

/// Shared gallery persisted in the `gallery_entries` table.
pub struct PgGalleryStore {
    pool: DbPool,
}

impl PgGalleryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend_error(e: sqlx::Error) -> GalleryError {
    tracing::error!(error = %e, "Gallery query failed");
    GalleryError::Backend(e.to_string())
}

#[async_trait::async_trait]
impl GalleryStore for PgGalleryStore {
    async fn list(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        let rows = GalleryRepo::list(&self.pool).await.map_err(backend_error)?;
        Ok(rows.into_iter().map(GalleryEntry::from).collect())
    }

    async fn push(&self, entry: GalleryEntry) -> Result<(), GalleryError> {
        GalleryRepo::insert(&self.pool, &entry)
            .await
            .map(|_| ())
            .map_err(backend_error)
    }

    async fn delete(&self, id: EntityId) -> Result<(), GalleryError> {
        GalleryRepo::delete(&self.pool, id)
            .await
            .map(|_| ())
            .map_err(backend_error)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
