//! Line Server Transport
//!
//! HTTP client, push-channel decoding, request sequencing and the background
//! tasks that deliver everything to the dashboard.

pub mod client;
pub mod feed;
pub mod sequence;
pub mod sse;

pub use client::{ClientError, LineApi, LineClient};
pub use feed::{decode_frame, Feed, FeedEvent, FEED_CAPACITY};
pub use sequence::{RequestSequencer, Resource, Ticket};
pub use sse::{SseDecoder, SseFrame};
