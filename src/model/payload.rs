//! Update Payloads
//!
//! Wire shapes published by the line server and the normalized form the
//! dashboard engine consumes. Numeric fields are decoded leniently: the
//! server mixes strings and numbers, and anything unparseable becomes zero
//! (counts) or "no value" (rates) instead of failing the whole update.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::metrics;

/// One of the two monitored production lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineId {
    One,
    Two,
}

impl LineId {
    pub const ALL: [LineId; 2] = [LineId::One, LineId::Two];

    pub fn index(self) -> usize {
        match self {
            LineId::One => 0,
            LineId::Two => 1,
        }
    }

    /// Line number as used in field identifiers and scrap reports.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn label(self) -> String {
        format!("Line {}", self.number())
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(LineId::One),
            2 => Some(LineId::Two),
            _ => None,
        }
    }
}

/// Which push event (or poll) produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Complete snapshot: `update` events and `GET /production_data`.
    Full,
    /// Production counters and part identity: `production_update`.
    Production,
    /// Scrap counters only: `scrap_update`.
    Scrap,
}

impl UpdateKind {
    pub fn from_event(name: &str) -> Option<Self> {
        match name {
            "update" => Some(UpdateKind::Full),
            "production_update" => Some(UpdateKind::Production),
            "scrap_update" => Some(UpdateKind::Scrap),
            _ => None,
        }
    }

    pub fn event_name(self) -> &'static str {
        match self {
            UpdateKind::Full => "update",
            UpdateKind::Production => "production_update",
            UpdateKind::Scrap => "scrap_update",
        }
    }
}

/// Identity of the part most recently seen on a line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartInfo {
    #[serde(default, deserialize_with = "lenient_text")]
    pub program: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub part_number: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub part_description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub class_name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub target: u64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub track_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Production {
    #[serde(default, deserialize_with = "lenient_count")]
    pub quantity: u64,
    #[serde(default, deserialize_with = "lenient_signed")]
    pub delta: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scrap {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient_rate")]
    pub rate: Option<f64>,
}

/// Payload exactly as the line server publishes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WirePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1_part: Option<PartInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2_part: Option<PartInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1_production: Option<Production>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2_production: Option<Production>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1_scrap: Option<Scrap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2_scrap: Option<Scrap>,
    #[serde(default, deserialize_with = "lenient_opt_count", skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_signed", skip_serializing_if = "Option::is_none")]
    pub total_delta: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_count", skip_serializing_if = "Option::is_none")]
    pub total_scrap: Option<u64>,
    #[serde(default, deserialize_with = "lenient_rate", skip_serializing_if = "Option::is_none")]
    pub average_scrap_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_rate", skip_serializing_if = "Option::is_none")]
    pub total_tbp_line1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_rate", skip_serializing_if = "Option::is_none")]
    pub total_tbp_line2: Option<f64>,
}

/// Everything one payload says about a single line. `None` means the
/// payload did not carry that object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineReport {
    pub part: Option<PartInfo>,
    pub production: Option<Production>,
    pub scrap: Option<Scrap>,
    /// Accumulated cycle time (seconds) behind the current quantity.
    pub cycle_time_secs: Option<f64>,
}

impl LineReport {
    pub fn quantity(&self) -> u64 {
        self.production.as_ref().map(|p| p.quantity).unwrap_or(0)
    }

    pub fn scrap_total(&self) -> u64 {
        self.scrap.as_ref().map(|s| s.total).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub quantity: Option<u64>,
    pub delta: Option<i64>,
    pub scrap: Option<u64>,
    pub average_scrap_rate: Option<f64>,
    pub current_time: Option<String>,
}

/// Normalized payload. Also serves as the merged snapshot the dashboard
/// holds between updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadPatch {
    pub lines: [LineReport; 2],
    pub totals: Totals,
}

pub type Snapshot = PayloadPatch;

impl PayloadPatch {
    pub fn from_json(raw: &str) -> Result<Self> {
        let wire: WirePayload =
            serde_json::from_str(raw).context("Failed to decode update payload")?;
        Ok(wire.into())
    }

    pub fn line(&self, line: LineId) -> &LineReport {
        &self.lines[line.index()]
    }

    pub fn line_mut(&mut self, line: LineId) -> &mut LineReport {
        &mut self.lines[line.index()]
    }

    /// Fold `patch` into this snapshot according to the update kind.
    pub fn absorb(&mut self, kind: UpdateKind, patch: PayloadPatch) {
        match kind {
            UpdateKind::Full => {
                *self = patch;
            }
            UpdateKind::Production => {
                for (held, incoming) in self.lines.iter_mut().zip(patch.lines) {
                    overlay(&mut held.part, incoming.part);
                    overlay(&mut held.production, incoming.production);
                    overlay(&mut held.scrap, incoming.scrap);
                    overlay(&mut held.cycle_time_secs, incoming.cycle_time_secs);
                }
                let totals = patch.totals;
                overlay(&mut self.totals.quantity, totals.quantity);
                overlay(&mut self.totals.delta, totals.delta);
                overlay(&mut self.totals.scrap, totals.scrap);
                overlay(&mut self.totals.current_time, totals.current_time);
                self.recompute_scrap_rates();
            }
            UpdateKind::Scrap => {
                for (held, incoming) in self.lines.iter_mut().zip(patch.lines) {
                    overlay(&mut held.scrap, incoming.scrap);
                }
                overlay(&mut self.totals.scrap, patch.totals.scrap);
                self.recompute_scrap_rates();
            }
        }
    }

    /// Derive scrap rates from held counters instead of trusting the sender.
    pub fn recompute_scrap_rates(&mut self) {
        let mut produced: u64 = 0;
        let mut scrapped: u64 = 0;
        for line in self.lines.iter_mut() {
            let quantity = line.quantity();
            produced = produced.saturating_add(quantity);
            if let Some(scrap) = line.scrap.as_mut() {
                scrapped = scrapped.saturating_add(scrap.total);
                scrap.rate = Some(metrics::scrap_rate(scrap.total, quantity));
            }
        }
        let total_scrap = self.totals.scrap.unwrap_or(scrapped);
        self.totals.average_scrap_rate = Some(metrics::average_scrap_rate(total_scrap, produced));
    }
}

fn overlay<T>(held: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *held = incoming;
    }
}

impl From<WirePayload> for PayloadPatch {
    fn from(wire: WirePayload) -> Self {
        Self {
            lines: [
                LineReport {
                    part: wire.line1_part,
                    production: wire.line1_production,
                    scrap: wire.line1_scrap,
                    cycle_time_secs: wire.total_tbp_line1,
                },
                LineReport {
                    part: wire.line2_part,
                    production: wire.line2_production,
                    scrap: wire.line2_scrap,
                    cycle_time_secs: wire.total_tbp_line2,
                },
            ],
            totals: Totals {
                quantity: wire.total_quantity,
                delta: wire.total_delta,
                scrap: wire.total_scrap,
                average_scrap_rate: wire.average_scrap_rate,
                current_time: wire.current_time,
            },
        }
    }
}

impl From<PayloadPatch> for WirePayload {
    fn from(patch: PayloadPatch) -> Self {
        let [one, two] = patch.lines;
        Self {
            line1_part: one.part,
            line2_part: two.part,
            line1_production: one.production,
            line2_production: two.production,
            line1_scrap: one.scrap,
            line2_scrap: two.scrap,
            total_quantity: patch.totals.quantity,
            total_delta: patch.totals.delta,
            total_scrap: patch.totals.scrap,
            average_scrap_rate: patch.totals.average_scrap_rate,
            current_time: patch.totals.current_time,
            total_tbp_line1: one.cycle_time_secs,
            total_tbp_line2: two.cycle_time_secs,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// LENIENT DECODING
// ──────────────────────────────────────────────────────────────────────────────

/// Integer prefix of a textual number, the way form inputs are read.
fn parse_leading_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    if let Some(v) = text.parse::<f64>().ok().filter(|v| v.is_finite()) {
        return Some(v.trunc() as i64);
    }
    // Trailing junk such as "50pcs": keep the sign and leading digits.
    let unsigned = text.trim_start_matches(['+', '-']);
    let sign_len = text.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse::<i64>().ok()
}

fn signed_from(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_integer(s),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn count_from(value: Option<&Value>) -> Option<u64> {
    signed_from(value).map(|v| v.max(0) as u64)
}

fn rate_from(value: Option<&Value>) -> Option<f64> {
    let rate = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    rate.is_finite().then_some(rate)
}

pub(crate) fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(count_from(value.as_ref()).unwrap_or(0))
}

fn lenient_signed<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(signed_from(value.as_ref()).unwrap_or(0))
}

fn lenient_opt_count<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.map(|v| count_from(Some(&v)).unwrap_or(0)))
}

fn lenient_opt_signed<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.map(|v| signed_from(Some(&v)).unwrap_or(0)))
}

fn lenient_rate<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(rate_from(value.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "line1_part": {"program": " P100 ", "part_number": "4410", "part_description": "Bracket",
                       "track_id": 17, "target": "50", "class_name": "bracket_a"},
        "line2_part": {"program": "", "part_number": "", "part_description": "",
                       "track_id": "", "target": "abc", "class_name": ""},
        "line1_production": {"quantity": 100, "delta": -4},
        "line2_production": {"quantity": "12", "delta": "3"},
        "line1_scrap": {"total": 2, "rate": 1.9},
        "line2_scrap": {"total": 0, "rate": "unknown"},
        "total_quantity": 112, "total_delta": -1, "total_scrap": 2,
        "average_scrap_rate": null, "current_time": "10:15:00",
        "total_tbp_line1": 3000
    }"#;

    #[test]
    fn test_decodes_mixed_numeric_encodings() {
        let patch = PayloadPatch::from_json(SNAPSHOT).unwrap();
        let one = patch.line(LineId::One);
        let part = one.part.as_ref().unwrap();
        assert_eq!(part.program, "P100");
        assert_eq!(part.track_id, "17");
        assert_eq!(part.target, 50);
        assert_eq!(one.cycle_time_secs, Some(3000.0));

        let two = patch.line(LineId::Two);
        assert_eq!(two.part.as_ref().unwrap().target, 0);
        assert_eq!(two.quantity(), 12);
        assert_eq!(two.production.as_ref().unwrap().delta, 3);
        assert_eq!(two.scrap.as_ref().unwrap().rate, None);
        assert_eq!(two.cycle_time_secs, None);

        assert_eq!(patch.totals.average_scrap_rate, None);
        assert_eq!(patch.totals.current_time.as_deref(), Some("10:15:00"));
    }

    #[test]
    fn test_target_keeps_integer_prefix() {
        assert_eq!(parse_leading_integer("50pcs"), Some(50));
        assert_eq!(parse_leading_integer(" -12 parts"), Some(-12));
        assert_eq!(parse_leading_integer("7.9"), Some(7));
        assert_eq!(parse_leading_integer("abc"), None);
        assert_eq!(parse_leading_integer("+-3"), None);

        let patch = PayloadPatch::from_json(
            r#"{"line1_part": {"target": "50pcs"}, "line2_part": {"target": "abc"}}"#,
        )
        .unwrap();
        assert_eq!(patch.line(LineId::One).part.as_ref().unwrap().target, 50);
        assert_eq!(patch.line(LineId::Two).part.as_ref().unwrap().target, 0);
    }

    #[test]
    fn test_huge_counts_do_not_overflow_rates() {
        let max = i64::MAX;
        let mut held = PayloadPatch::default();
        let update = PayloadPatch::from_json(&format!(
            r#"{{"line1_production": {{"quantity": {max}}}, "line2_production": {{"quantity": {max}}},
                "line1_scrap": {{"total": {max}}}, "line2_scrap": {{"total": {max}}},
                "total_scrap": {max}}}"#
        ))
        .unwrap();
        held.absorb(UpdateKind::Production, update);

        let rate = held.line(LineId::One).scrap.as_ref().unwrap().rate.unwrap();
        assert_eq!(rate, 50.0);
        let average = held.totals.average_scrap_rate.unwrap();
        assert!((0.0..=100.0).contains(&average));
    }

    #[test]
    fn test_missing_objects_stay_absent() {
        let patch = PayloadPatch::from_json(r#"{"line1_scrap": {"total": 1}}"#).unwrap();
        assert!(patch.line(LineId::One).part.is_none());
        assert_eq!(patch.line(LineId::One).scrap_total(), 1);
        assert!(patch.line(LineId::Two).scrap.is_none());
    }

    #[test]
    fn test_negative_counts_clamp_to_zero() {
        let patch =
            PayloadPatch::from_json(r#"{"line1_production": {"quantity": -5, "delta": -5}}"#).unwrap();
        let production = patch.line(LineId::One).production.clone().unwrap();
        assert_eq!(production.quantity, 0);
        assert_eq!(production.delta, -5);
    }

    #[test]
    fn test_scrap_update_keeps_production_and_recomputes_rates() {
        let mut held = PayloadPatch::from_json(SNAPSHOT).unwrap();
        let scrap = PayloadPatch::from_json(
            r#"{"line1_scrap": {"total": 25, "rate": 99}, "line2_scrap": {"total": 0}, "total_scrap": 25}"#,
        )
        .unwrap();
        held.absorb(UpdateKind::Scrap, scrap);

        let one = held.line(LineId::One);
        assert_eq!(one.quantity(), 100);
        assert_eq!(one.scrap.as_ref().unwrap().rate, Some(20.0));
        assert_eq!(held.totals.scrap, Some(25));
        // 25 / (25 + 112)
        assert_eq!(held.totals.average_scrap_rate, Some(18.2));
    }

    #[test]
    fn test_full_update_replaces_snapshot() {
        let mut held = PayloadPatch::from_json(SNAPSHOT).unwrap();
        held.absorb(UpdateKind::Full, PayloadPatch::default());
        assert_eq!(held, PayloadPatch::default());
    }

    #[test]
    fn test_update_kind_event_names() {
        for kind in [UpdateKind::Full, UpdateKind::Production, UpdateKind::Scrap] {
            assert_eq!(UpdateKind::from_event(kind.event_name()), Some(kind));
        }
        assert_eq!(UpdateKind::from_event("connect"), None);
    }
}
