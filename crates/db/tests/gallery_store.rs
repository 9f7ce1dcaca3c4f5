//! Integration tests for the Postgres gallery store.
//!
//! These run against a real database (`DATABASE_URL`) and are ignored by
//! default. Run with `cargo test -p rigforge-db -- --ignored`.

use rigforge_core::artifact::AnimationUrls;
use rigforge_core::gallery::{record_gallery_entry, GalleryEntry, GalleryStore};
use rigforge_db::PgGalleryStore;
use sqlx::PgPool;

fn entry(prompt: &str, url: &str) -> GalleryEntry {
    GalleryEntry::new(prompt, url, AnimationUrls::default())
}

// ---------------------------------------------------------------------------
// Test: entries are listed newest first with animation columns mapped
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn list_is_newest_first(pool: PgPool) {
    let store = PgGalleryStore::new(pool);

    store.push(entry("first", "https://a/1.glb")).await.unwrap();
    let mut second = entry("second", "https://a/2.glb");
    second.animation_urls.walking = Some("https://a/walk.glb".into());
    store.push(second).await.unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].prompt, "second");
    assert_eq!(listed[0].animation_urls.walking.as_deref(), Some("https://a/walk.glb"));
    assert!(listed[0].animation_urls.running.is_none());
    assert_eq!(listed[1].prompt, "first");
}

// ---------------------------------------------------------------------------
// Test: capacity and URL de-duplication hold through the database
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn record_caps_and_deduplicates(pool: PgPool) {
    let store = PgGalleryStore::new(pool);

    for i in 0..21 {
        record_gallery_entry(&store, entry("p", &format!("https://a/{i}.glb")), 20)
            .await
            .unwrap();
    }
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 20);
    assert_eq!(listed[0].model_url, "https://a/20.glb");
    assert!(listed.iter().all(|e| e.model_url != "https://a/0.glb"));

    record_gallery_entry(&store, entry("again", "https://a/5.glb"), 20)
        .await
        .unwrap();
    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 20);
    assert_eq!(listed[0].model_url, "https://a/5.glb");
    assert_eq!(
        listed.iter().filter(|e| e.model_url == "https://a/5.glb").count(),
        1
    );
}
