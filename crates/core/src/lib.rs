//! Domain types shared across the rigforge workspace.
//!
//! Pure logic only: stage and task vocabulary, request validation, and the
//! gallery model with its de-duplication rules. Network and storage
//! concerns live in the `meshy`, `pipeline` and `db` crates.

pub mod artifact;
pub mod error;
pub mod gallery;
pub mod generation;
pub mod stage;
pub mod submission;
pub mod types;
