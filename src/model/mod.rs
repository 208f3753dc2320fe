//! Production Data Model
//!
//! Payload shapes exchanged with the line server and the pure metric
//! derivations applied to them.

pub mod metrics;
pub mod payload;
pub mod records;

pub use payload::{
    LineId, LineReport, PartInfo, PayloadPatch, Production, Scrap, Snapshot, Totals, UpdateKind,
    WirePayload,
};
pub use records::{PartEntry, ScrapRecord, ScrapReport, UploadReply};
