//! Line Watch
//!
//! Live production dashboard for a two-line manufacturing cell:
//! - Polled and pushed production snapshots folded into one state
//! - Per-line part reconciliation with sticky hourly targets
//! - Hourly target/actual charts and parts-per-hour markers
//! - Transient part-detected alerts and a class tally
//! - Scrap reporting against the line server
//! - A simulator speaking the same HTTP and event-stream protocol

pub mod config;
pub mod engine;
pub mod model;
pub mod scrap;
pub mod sim;
pub mod telemetry;
pub mod transport;
pub mod tui;

// Re-exports for convenience
pub use config::DashboardConfig;
pub use engine::Dashboard;
pub use model::{LineId, PayloadPatch, Snapshot, UpdateKind};
pub use scrap::ScrapDesk;
pub use transport::{Feed, FeedEvent, LineApi, LineClient};
