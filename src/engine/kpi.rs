//! KPI Fields
//!
//! Writes the scalar figures of a snapshot into a [`Surface`]. Every write is
//! independent: a missing field or a missing per-line object only affects
//! that one value.

use tracing::debug;

use super::surface::{self, LineField, Surface};
use crate::model::{metrics, LineId, Snapshot};

/// Shown when a line has no part identity to display.
pub const NO_PART: &str = "No Part";
/// Shown when the payload carried no refresh time.
pub const NO_TIME: &str = "--";

#[derive(Debug, Default, Clone, Copy)]
pub struct KpiPresenter;

impl KpiPresenter {
    pub fn new() -> Self {
        Self
    }

    /// Write every KPI field for `snapshot`. Returns the number of writes
    /// that found their field.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S, snapshot: &Snapshot) -> usize {
        let mut written = 0;
        for line in LineId::ALL {
            written += self.render_line(surface, snapshot, line);
        }

        let totals = &snapshot.totals;
        let total_delta = totals.delta.unwrap_or(0);
        written += write(surface, surface::TOTAL_QUANTITY, &totals.quantity.unwrap_or(0).to_string());
        written += write(surface, surface::TOTAL_DELTA, &metrics::format_delta(total_delta));
        written += flag(surface, surface::TOTAL_DELTA, metrics::delta_is_positive(total_delta));
        written += write(surface, surface::TOTAL_SCRAP, &totals.scrap.unwrap_or(0).to_string());
        written += write(
            surface,
            surface::AVERAGE_SCRAP_RATE,
            &format!("{}%", metrics::format_rate(totals.average_scrap_rate)),
        );
        written += write(
            surface,
            surface::LAST_REFRESH,
            totals.current_time.as_deref().unwrap_or(NO_TIME),
        );
        written
    }

    fn render_line<S: Surface + ?Sized>(&self, surface: &mut S, snapshot: &Snapshot, line: LineId) -> usize {
        let report = snapshot.line(line);
        let mut written = 0;

        let part = report.part.as_ref();
        let or_placeholder = |value: Option<&String>| -> String {
            match value {
                Some(v) if !v.is_empty() => v.clone(),
                _ => NO_PART.to_string(),
            }
        };
        written += write(surface, &LineField::Program.id(line), &or_placeholder(part.map(|p| &p.program)));
        written += write(surface, &LineField::PartNumber.id(line), &or_placeholder(part.map(|p| &p.part_number)));
        written += write(
            surface,
            &LineField::PartDescription.id(line),
            &or_placeholder(part.map(|p| &p.part_description)),
        );

        let delta = report.production.as_ref().map(|p| p.delta).unwrap_or(0);
        written += write(surface, &LineField::Quantity.id(line), &report.quantity().to_string());
        written += write(surface, &LineField::Delta.id(line), &metrics::format_delta(delta));
        written += flag(surface, &LineField::Delta.id(line), metrics::delta_is_positive(delta));

        let rate = report.scrap.as_ref().and_then(|s| s.rate);
        written += write(surface, &LineField::Scrap.id(line), &report.scrap_total().to_string());
        written += write(
            surface,
            &LineField::ScrapRate.id(line),
            &format!("{}%", metrics::format_rate(rate)),
        );
        written
    }
}

fn write<S: Surface + ?Sized>(surface: &mut S, id: &str, text: &str) -> usize {
    if surface.set_text(id, text) {
        1
    } else {
        debug!("Skipping write to missing field '{}'", id);
        0
    }
}

fn flag<S: Surface + ?Sized>(surface: &mut S, id: &str, on: bool) -> usize {
    usize::from(surface.set_flag(id, surface::POSITIVE, on))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::surface::{FieldBoard, POSITIVE};
    use crate::model::PayloadPatch;

    #[test]
    fn test_renders_zero_rates_instead_of_nan() {
        let snapshot = PayloadPatch::from_json(
            r#"{"line1_production": {"quantity": 0, "delta": 0}, "line1_scrap": {"total": 0}}"#,
        )
        .unwrap();
        let mut board = FieldBoard::dashboard();
        KpiPresenter::new().render(&mut board, &snapshot);

        assert_eq!(board.text("scrap-rate-1"), Some("0%"));
        assert_eq!(board.text("scrap-rate-2"), Some("0%"));
        assert_eq!(board.text("average-scrap-rate"), Some("0%"));
        assert_eq!(board.text("scrap-1"), Some("0"));
    }

    #[test]
    fn test_missing_line_degrades_to_placeholders() {
        let snapshot = PayloadPatch::from_json(
            r#"{"line1_part": {"program": "P1", "part_number": "", "part_description": "Cap"}}"#,
        )
        .unwrap();
        let mut board = FieldBoard::dashboard();
        KpiPresenter::new().render(&mut board, &snapshot);

        assert_eq!(board.text("program-1"), Some("P1"));
        assert_eq!(board.text("part-number-1"), Some(NO_PART));
        assert_eq!(board.text("part-description-1"), Some("Cap"));
        assert_eq!(board.text("program-2"), Some(NO_PART));
        assert_eq!(board.text("quantity-2"), Some("0"));
        assert_eq!(board.text("last-refresh"), Some(NO_TIME));
    }

    #[test]
    fn test_delta_sign_and_style() {
        let snapshot = PayloadPatch::from_json(
            r#"{"line1_production": {"quantity": 5, "delta": 3},
                "line2_production": {"quantity": 5, "delta": 0},
                "total_delta": -2, "current_time": "08:00:00"}"#,
        )
        .unwrap();
        let mut board = FieldBoard::dashboard();
        KpiPresenter::new().render(&mut board, &snapshot);

        assert_eq!(board.text("delta-1"), Some("+3"));
        assert!(board.has_flag("delta-1", POSITIVE));
        assert_eq!(board.text("delta-2"), Some("-0"));
        assert!(!board.has_flag("delta-2", POSITIVE));
        assert_eq!(board.text("total-delta"), Some("-2"));
        assert_eq!(board.text("last-refresh"), Some("08:00:00"));
    }

    #[test]
    fn test_missing_field_does_not_block_others() {
        let snapshot = PayloadPatch::from_json(r#"{"total_quantity": 9}"#).unwrap();
        let mut board = FieldBoard::dashboard();
        board.remove("program-1");
        let written = KpiPresenter::new().render(&mut board, &snapshot);

        assert_eq!(board.text("total-quantity"), Some("9"));
        assert!(written > 0);
    }
}
