//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod gallery_repo;

pub use gallery_repo::GalleryRepo;
