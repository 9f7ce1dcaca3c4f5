//! Row types for database tables.

pub mod gallery;
