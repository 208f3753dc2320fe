//! Scrap Desk
//!
//! The scrap-report workflow around [`ScrapForm`]: catalogue loading,
//! dependent lookups and submission. Methods that need the server return a
//! [`DeskRequest`]; the caller runs it through [`fulfil`] (usually on a
//! spawned task) and feeds the resulting [`DeskEvent`] back into
//! [`ScrapDesk::apply`]. Lookups are ticketed so a slow answer for an
//! earlier selection never overwrites a newer one.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{info, warn};

use super::form::{missing_fields_message, ScrapForm};
use crate::engine::NoticeLevel;
use crate::model::{LineId, PartEntry, ScrapRecord, ScrapReport};
use crate::transport::client::LineApi;
use crate::transport::sequence::{RequestSequencer, Resource, Ticket};

/// Submitted reports kept in memory.
pub const HISTORY_CAP: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum DeskRequest {
    LoadCatalogue { history: Ticket },
    Parts { ticket: Ticket, program: String },
    Description { ticket: Ticket, code: String },
    Code { ticket: Ticket, description: String },
    Submit(ScrapReport),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeskEvent {
    Catalogue {
        programs: Result<Vec<String>, String>,
        codes: Result<Vec<String>, String>,
        descriptions: Result<Vec<String>, String>,
        history_ticket: Ticket,
        history: Result<Vec<ScrapRecord>, String>,
    },
    Parts {
        ticket: Ticket,
        program: String,
        result: Result<Vec<PartEntry>, String>,
    },
    Description {
        ticket: Ticket,
        result: Result<String, String>,
    },
    Code {
        ticket: Ticket,
        result: Result<String, String>,
    },
    Submitted(Result<ScrapRecord, String>),
}

/// Message to surface to the operator after applying an event.
pub type DeskNotice = Option<(NoticeLevel, String)>;

pub struct ScrapDesk {
    form: ScrapForm,
    programs: Vec<String>,
    parts: Vec<String>,
    codes: Vec<String>,
    descriptions: Vec<String>,
    history: VecDeque<ScrapRecord>,
    sequencer: Arc<RequestSequencer>,
}

impl ScrapDesk {
    pub fn new(sequencer: Arc<RequestSequencer>) -> Self {
        Self {
            form: ScrapForm::new(),
            programs: Vec::new(),
            parts: Vec::new(),
            codes: Vec::new(),
            descriptions: Vec::new(),
            history: VecDeque::new(),
            sequencer,
        }
    }

    pub fn form(&self) -> &ScrapForm {
        &self.form
    }

    pub fn programs(&self) -> &[String] {
        &self.programs
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// Submitted reports, newest first.
    pub fn history(&self) -> impl Iterator<Item = &ScrapRecord> {
        self.history.iter()
    }

    pub fn load_catalogue(&self) -> DeskRequest {
        DeskRequest::LoadCatalogue {
            history: self.sequencer.issue(Resource::ScrapHistory),
        }
    }

    pub fn select_line(&mut self, line: Option<LineId>) {
        self.form.set_line(line);
    }

    /// Choose (or with a blank value, clear) the program.
    pub fn select_program(&mut self, program: &str) -> Option<DeskRequest> {
        self.form.set_program(program);
        self.parts.clear();
        // Issued even when clearing, so an in-flight answer is dropped.
        let ticket = self.sequencer.issue(Resource::Parts);
        self.form.program().map(|program| DeskRequest::Parts {
            ticket,
            program: program.to_string(),
        })
    }

    pub fn select_part(&mut self, part_number: &str) -> Result<(), String> {
        if !self.form.part_enabled() {
            return Err("Select a program first".to_string());
        }
        if !self.parts.iter().any(|p| p == part_number.trim()) {
            return Err(format!("Unknown part number '{}'", part_number.trim()));
        }
        self.form.set_part_number(part_number);
        Ok(())
    }

    /// Choose a defect code; its description is looked up.
    pub fn select_code(&mut self, code: &str) -> Option<DeskRequest> {
        self.form.set_defect_code(code);
        let ticket = self.sequencer.issue(Resource::DefectDescription);
        match self.form.defect_code() {
            Some(code) => Some(DeskRequest::Description { ticket, code: code.to_string() }),
            None => {
                self.form.set_defect_description("");
                None
            }
        }
    }

    /// Choose a defect description; its code is looked up.
    pub fn select_description(&mut self, description: &str) -> Option<DeskRequest> {
        self.form.set_defect_description(description);
        let ticket = self.sequencer.issue(Resource::DefectCode);
        match self.form.defect_description() {
            Some(description) => Some(DeskRequest::Code {
                ticket,
                description: description.to_string(),
            }),
            None => {
                self.form.set_defect_code("");
                None
            }
        }
    }

    pub fn set_comments(&mut self, comments: &str) {
        self.form.set_comments(comments);
    }

    /// Validate and produce the submit request, or the message to show.
    pub fn submit(&mut self) -> Result<DeskRequest, String> {
        self.form
            .validate()
            .map(DeskRequest::Submit)
            .map_err(|missing| missing_fields_message(&missing))
    }

    pub fn apply(&mut self, event: DeskEvent) -> DeskNotice {
        match event {
            DeskEvent::Catalogue { programs, codes, descriptions, history_ticket, history } => {
                let mut failures = Vec::new();
                match programs {
                    Ok(list) => self.programs = list,
                    Err(e) => failures.push(("programs", e)),
                }
                match codes {
                    Ok(list) => self.codes = list,
                    Err(e) => failures.push(("defect codes", e)),
                }
                match descriptions {
                    Ok(list) => self.descriptions = list,
                    Err(e) => failures.push(("descriptions", e)),
                }
                match history {
                    Ok(records) if self.sequencer.accept(&history_ticket) => {
                        self.history = records.into_iter().take(HISTORY_CAP).collect();
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Error loading scrap history: {}", e),
                }
                for (what, error) in &failures {
                    warn!("Error loading {}: {}", what, error);
                }
                failures
                    .first()
                    .map(|(what, _)| (NoticeLevel::Error, format!("Error loading {}", what)))
            }
            DeskEvent::Parts { ticket, program, result } => {
                if !self.sequencer.accept(&ticket) || self.form.program() != Some(program.as_str()) {
                    return None;
                }
                match result {
                    Ok(parts) => {
                        self.parts = parts.into_iter().map(|p| p.part_number).collect();
                        None
                    }
                    Err(e) => {
                        warn!("Error loading part numbers for {}: {}", program, e);
                        Some((NoticeLevel::Error, "Error loading part numbers".to_string()))
                    }
                }
            }
            DeskEvent::Description { ticket, result } => {
                if !self.sequencer.accept(&ticket) {
                    return None;
                }
                match result {
                    Ok(description) => self.form.set_defect_description(&description),
                    Err(e) => warn!("Error getting description: {}", e),
                }
                None
            }
            DeskEvent::Code { ticket, result } => {
                if !self.sequencer.accept(&ticket) {
                    return None;
                }
                match result {
                    Ok(code) => self.form.set_defect_code(&code),
                    Err(e) => warn!("Error getting code: {}", e),
                }
                None
            }
            DeskEvent::Submitted(Ok(record)) => {
                info!("Scrap report recorded for line {} at {}", record.line, record.time);
                self.history.push_front(record);
                self.history.truncate(HISTORY_CAP);
                self.form.reset();
                self.parts.clear();
                Some((NoticeLevel::Success, "Scrap report submitted successfully".to_string()))
            }
            DeskEvent::Submitted(Err(e)) => {
                warn!("Error submitting scrap report: {}", e);
                Some((NoticeLevel::Error, "Error submitting scrap report".to_string()))
            }
        }
    }
}

/// Run `request` against the server.
pub async fn fulfil(api: &dyn LineApi, request: DeskRequest) -> DeskEvent {
    let text = |e: crate::transport::client::ClientError| e.to_string();
    match request {
        DeskRequest::LoadCatalogue { history } => {
            let (programs, codes, descriptions, records) = tokio::join!(
                api.programs(),
                api.defect_codes(),
                api.defect_descriptions(),
                api.scrap_history()
            );
            DeskEvent::Catalogue {
                programs: programs.map_err(text),
                codes: codes.map_err(text),
                descriptions: descriptions.map_err(text),
                history_ticket: history,
                history: records.map_err(text),
            }
        }
        DeskRequest::Parts { ticket, program } => {
            let result = api.parts(&program).await.map_err(text);
            DeskEvent::Parts { ticket, program, result }
        }
        DeskRequest::Description { ticket, code } => DeskEvent::Description {
            ticket,
            result: api.description_for_code(&code).await.map_err(text),
        },
        DeskRequest::Code { ticket, description } => DeskEvent::Code {
            ticket,
            result: api.code_for_description(&description).await.map_err(text),
        },
        DeskRequest::Submit(report) => DeskEvent::Submitted(api.submit_scrap(&report).await.map_err(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desk() -> ScrapDesk {
        ScrapDesk::new(Arc::new(RequestSequencer::new()))
    }

    fn parts_event(request: DeskRequest, parts: &[&str]) -> DeskEvent {
        let DeskRequest::Parts { ticket, program } = request else {
            panic!("expected a parts request");
        };
        DeskEvent::Parts {
            ticket,
            program,
            result: Ok(parts.iter().map(|p| PartEntry { part_number: p.to_string() }).collect()),
        }
    }

    #[test]
    fn test_stale_parts_answer_is_dropped() {
        let mut desk = desk();
        let first = desk.select_program("P1").unwrap();
        let second = desk.select_program("P2").unwrap();

        desk.apply(parts_event(second, &["2001", "2002"]));
        desk.apply(parts_event(first, &["1001"]));

        assert_eq!(desk.parts(), ["2001".to_string(), "2002".to_string()]);
    }

    #[test]
    fn test_clearing_program_disables_parts() {
        let mut desk = desk();
        let request = desk.select_program("P1").unwrap();
        desk.apply(parts_event(request, &["1001"]));
        assert!(desk.select_program("").is_none());
        assert!(desk.parts().is_empty());
        assert!(!desk.form().part_enabled());
        assert!(desk.select_part("1001").is_err());
    }

    #[test]
    fn test_failed_submit_keeps_form() {
        let mut desk = desk();
        desk.select_line(Some(LineId::One));
        let request = desk.select_program("P1").unwrap();
        desk.apply(parts_event(request, &["1001"]));
        desk.select_part("1001").unwrap();
        desk.select_code("D1");
        desk.select_description("Crack");
        assert!(desk.submit().is_ok());

        let notice = desk.apply(DeskEvent::Submitted(Err("boom".to_string())));
        assert_eq!(notice.map(|n| n.0), Some(NoticeLevel::Error));
        assert_eq!(desk.form().part_number(), Some("1001"));
    }

    #[test]
    fn test_successful_submit_resets_and_records() {
        let mut desk = desk();
        let record = ScrapRecord { line: "2".to_string(), time: "t".to_string(), ..Default::default() };
        let notice = desk.apply(DeskEvent::Submitted(Ok(record.clone())));
        assert_eq!(notice.map(|n| n.0), Some(NoticeLevel::Success));
        assert_eq!(desk.history().next(), Some(&record));
        assert!(!desk.form().part_enabled());
    }

    #[test]
    fn test_submit_reports_missing_fields() {
        let mut desk = desk();
        let message = desk.submit().unwrap_err();
        assert!(message.starts_with("Please fill in all required fields: Line, Program"));
    }
}
