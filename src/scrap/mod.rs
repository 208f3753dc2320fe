//! Scrap reporting: the form model and the desk that drives it against the server.

pub mod desk;
pub mod form;

pub use desk::{fulfil, DeskEvent, DeskRequest, ScrapDesk, HISTORY_CAP};
pub use form::{missing_fields_message, FormField, ScrapForm};
