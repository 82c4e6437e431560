//! Core engine: feed intake, the shared slate board and the refresh cycle.

pub mod board;
pub mod feed;
pub mod refresher;
