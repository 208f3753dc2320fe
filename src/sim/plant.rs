//! Simulated Plant
//!
//! In-memory stand-in for the detection pipeline: a bill of materials, a
//! scrap book, per-line counters and the scrap history, producing payloads in
//! the same shape the real line server publishes.

use std::collections::VecDeque;

use anyhow::{bail, Result};
use chrono::{DateTime, Local, Timelike};
use rand::Rng;

use crate::model::metrics;
use crate::model::{
    LineId, PartEntry, PartInfo, Production, Scrap, ScrapRecord, ScrapReport, WirePayload,
};
use crate::scrap::HISTORY_CAP;

/// Time format of `current_time` in production payloads.
pub const CLOCK_FORMAT: &str = "%H:%M:%S";
/// Time format stamped on scrap records.
pub const RECORD_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

#[derive(Debug, Clone, PartialEq)]
pub struct BomEntry {
    pub program: String,
    pub part_number: String,
    pub part_description: String,
    pub class_name: String,
    pub target: u64,
}

impl BomEntry {
    fn new(program: &str, part_number: &str, part_description: &str, class_name: &str, target: u64) -> Self {
        Self {
            program: program.to_string(),
            part_number: part_number.to_string(),
            part_description: part_description.to_string(),
            class_name: class_name.to_string(),
            target,
        }
    }
}

pub fn default_bom() -> Vec<BomEntry> {
    vec![
        BomEntry::new("P100", "4410-A", "Front bracket", "bracket_front", 120),
        BomEntry::new("P100", "4410-B", "Rear bracket", "bracket_rear", 120),
        BomEntry::new("P200", "5520-A", "Door panel left", "panel_left", 60),
        BomEntry::new("P200", "5520-B", "Door panel right", "panel_right", 60),
        BomEntry::new("P300", "7730", "Hinge cover", "hinge_cover", 200),
    ]
}

pub fn default_scrap_book() -> Vec<(String, String)> {
    [
        ("D01", "Crack"),
        ("D02", "Scratch"),
        ("D03", "Dent"),
        ("D04", "Burr"),
        ("D05", "Wrong dimension"),
    ]
    .into_iter()
    .map(|(code, description)| (code.to_string(), description.to_string()))
    .collect()
}

#[derive(Debug, Clone, Default)]
struct LineCounters {
    part: Option<PartInfo>,
    quantity: u64,
    scrap: u64,
    last_crossing: Option<DateTime<Local>>,
    total_tbp: f64,
}

impl LineCounters {
    fn target(&self) -> u64 {
        self.part.as_ref().map(|p| p.target).unwrap_or(0)
    }

    /// Actual minus the share of the hourly target due by `now`.
    fn delta(&self, now: DateTime<Local>) -> i64 {
        let elapsed = (now.minute() * 60 + now.second()) as f64 / 3600.0;
        let due = (self.target() as f64 * elapsed) as i64;
        self.quantity as i64 - due
    }

    fn scrap_report(&self) -> Scrap {
        Scrap {
            total: self.scrap,
            rate: Some(metrics::scrap_rate(self.scrap, self.quantity)),
        }
    }
}

pub struct Plant {
    bom: Vec<BomEntry>,
    scrap_book: Vec<(String, String)>,
    lines: [LineCounters; 2],
    history: VecDeque<ScrapRecord>,
    next_track: u64,
}

impl Default for Plant {
    fn default() -> Self {
        Self::new(default_bom(), default_scrap_book())
    }
}

impl Plant {
    pub fn new(bom: Vec<BomEntry>, scrap_book: Vec<(String, String)>) -> Self {
        Self {
            bom,
            scrap_book,
            lines: Default::default(),
            history: VecDeque::new(),
            next_track: 1,
        }
    }

    /// Register one part crossing on `line` using BOM entry `entry`.
    pub fn advance(&mut self, line: LineId, entry: usize, now: DateTime<Local>) -> Option<&PartInfo> {
        let bom = self.bom.get(entry)?;
        let track_id = self.next_track.to_string();
        self.next_track += 1;

        let counters = &mut self.lines[line.index()];
        if let Some(last) = counters.last_crossing {
            counters.total_tbp += (now - last).num_seconds().max(0) as f64;
        }
        counters.last_crossing = Some(now);
        counters.quantity += 1;
        counters.part = Some(PartInfo {
            program: bom.program.clone(),
            part_number: bom.part_number.clone(),
            part_description: bom.part_description.clone(),
            class_name: bom.class_name.clone(),
            target: bom.target,
            track_id,
        });
        counters.part.as_ref()
    }

    /// Advance a random line. Most crossings repeat the part already running.
    pub fn advance_random<R: Rng>(&mut self, rng: &mut R, now: DateTime<Local>) -> Option<LineId> {
        if self.bom.is_empty() {
            return None;
        }
        let line = if rng.gen_bool(0.5) { LineId::One } else { LineId::Two };
        let running = self.lines[line.index()].part.as_ref().and_then(|part| {
            self.bom.iter().position(|b| b.part_number == part.part_number)
        });
        let entry = match running {
            Some(index) if rng.gen_bool(0.8) => index,
            _ => rng.gen_range(0..self.bom.len()),
        };
        self.advance(line, entry, now).map(|_| line)
    }

    /// Full production payload as served on `/production_data`.
    pub fn payload(&self, now: DateTime<Local>) -> WirePayload {
        let [one, two] = &self.lines;
        let total_quantity = one.quantity + two.quantity;
        let total_scrap = one.scrap + two.scrap;
        WirePayload {
            line1_part: Some(one.part.clone().unwrap_or_default()),
            line2_part: Some(two.part.clone().unwrap_or_default()),
            line1_production: Some(Production { quantity: one.quantity, delta: one.delta(now) }),
            line2_production: Some(Production { quantity: two.quantity, delta: two.delta(now) }),
            line1_scrap: Some(one.scrap_report()),
            line2_scrap: Some(two.scrap_report()),
            total_quantity: Some(total_quantity),
            total_delta: Some(one.delta(now) + two.delta(now)),
            total_scrap: Some(total_scrap),
            average_scrap_rate: Some(metrics::average_scrap_rate(total_scrap, total_quantity)),
            current_time: Some(now.format(CLOCK_FORMAT).to_string()),
            total_tbp_line1: Some(one.total_tbp),
            total_tbp_line2: Some(two.total_tbp),
        }
    }

    /// Scrap counters only, as pushed after a submission.
    pub fn scrap_payload(&self) -> WirePayload {
        let [one, two] = &self.lines;
        let total_scrap = one.scrap + two.scrap;
        WirePayload {
            line1_scrap: Some(one.scrap_report()),
            line2_scrap: Some(two.scrap_report()),
            total_scrap: Some(total_scrap),
            average_scrap_rate: Some(metrics::average_scrap_rate(
                total_scrap,
                one.quantity + two.quantity,
            )),
            ..Default::default()
        }
    }

    /// Book one scrapped unit and prepend the stamped record to the history.
    pub fn record_scrap(&mut self, report: ScrapReport, now: DateTime<Local>) -> Result<ScrapRecord> {
        let line = match report.line.trim().parse::<u8>().ok().and_then(LineId::from_number) {
            Some(line) => line,
            None => bail!("Unknown line '{}'", report.line),
        };
        if report.defect_code.trim().is_empty() || report.defect_description.trim().is_empty() {
            bail!("Defect code and description are required");
        }
        self.lines[line.index()].scrap += 1;

        let record = ScrapRecord::from_report(report, now.format(RECORD_FORMAT).to_string());
        self.history.push_front(record.clone());
        self.history.truncate(HISTORY_CAP);
        Ok(record)
    }

    pub fn history(&self) -> Vec<ScrapRecord> {
        self.history.iter().cloned().collect()
    }

    pub fn programs(&self) -> Vec<String> {
        let mut programs: Vec<String> = self.bom.iter().map(|b| b.program.clone()).collect();
        programs.sort();
        programs.dedup();
        programs
    }

    pub fn parts(&self, program: &str) -> Vec<PartEntry> {
        self.bom
            .iter()
            .filter(|b| b.program == program)
            .map(|b| PartEntry { part_number: b.part_number.clone() })
            .collect()
    }

    pub fn defect_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.scrap_book.iter().map(|(c, _)| c.clone()).collect();
        codes.sort();
        codes
    }

    pub fn defect_descriptions(&self) -> Vec<String> {
        let mut descriptions: Vec<String> = self.scrap_book.iter().map(|(_, d)| d.clone()).collect();
        descriptions.sort();
        descriptions
    }

    pub fn description_for(&self, code: &str) -> Option<&str> {
        self.scrap_book
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, d)| d.as_str())
    }

    pub fn code_for(&self, description: &str) -> Option<&str> {
        self.scrap_book
            .iter()
            .find(|(_, d)| d == description)
            .map(|(c, _)| c.as_str())
    }
}
