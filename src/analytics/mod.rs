//! Read-side analytics over evaluated slates.

pub mod export;
pub mod summary;
