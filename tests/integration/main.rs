//! Integration suite: the full pipeline driven through the public API.

mod mock_feed;
mod pipeline;
mod refresh;
