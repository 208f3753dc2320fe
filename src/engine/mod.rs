//! Dashboard Engine
//!
//! One ingestion path for every update source. Polled snapshots and pushed
//! events are folded into a single held snapshot, then the reconciler decides
//! per line whether the chart and the part alert move, and the KPI fields are
//! rewritten from the merged state.

pub mod chart;
pub mod kpi;
pub mod notify;
pub mod reconciler;
pub mod surface;
pub mod tally;

use std::time::{Duration, Instant};

use tracing::debug;

pub use chart::{ChartPresenter, LineChart, MarkerColor};
pub use kpi::KpiPresenter;
pub use notify::{Notice, NoticeBody, NoticeLevel, NotificationPresenter, PartNotice};
pub use reconciler::{LineChange, LineState, StateReconciler};
pub use surface::{FieldBoard, Surface};
pub use tally::ClassTally;

use crate::model::{LineId, PayloadPatch, Snapshot, UpdateKind};

/// What a single ingestion did, per line and overall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// `None` when the merged snapshot had no part object for the line.
    pub changes: [Option<LineChange>; 2],
    pub notices_posted: usize,
    pub fields_written: usize,
}

impl IngestReport {
    pub fn change(&self, line: LineId) -> Option<LineChange> {
        self.changes[line.index()]
    }
}

pub struct Dashboard {
    snapshot: Snapshot,
    reconciler: StateReconciler,
    charts: ChartPresenter,
    kpi: KpiPresenter,
    notices: NotificationPresenter,
    tally: ClassTally,
    board: FieldBoard,
    updates_applied: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(NotificationPresenter::default())
    }
}

impl Dashboard {
    pub fn new(notices: NotificationPresenter) -> Self {
        Self {
            snapshot: Snapshot::default(),
            reconciler: StateReconciler::new(),
            charts: ChartPresenter::new(),
            kpi: KpiPresenter::new(),
            notices,
            tally: ClassTally::new(),
            board: FieldBoard::dashboard(),
            updates_applied: 0,
        }
    }

    pub fn with_notice_settings(ttl: Duration, capacity: usize) -> Self {
        Self::new(NotificationPresenter::new(ttl, capacity))
    }

    /// Apply one update. `hour` is the wall-clock hour used for chart buckets.
    pub fn ingest(&mut self, kind: UpdateKind, patch: PayloadPatch, now: Instant, hour: u32) -> IngestReport {
        self.snapshot.absorb(kind, patch);
        self.updates_applied += 1;

        let mut report = IngestReport::default();
        if kind != UpdateKind::Scrap {
            for line in LineId::ALL {
                let Some(part) = self.snapshot.line(line).part.clone() else {
                    continue;
                };
                let change = self.reconciler.reconcile(line, &part);
                report.changes[line.index()] = Some(change);

                if change.is_changed() {
                    let target = self.reconciler.target(line);
                    let rate = self.charts.update(line, hour, target, self.snapshot.line(line));
                    debug!(
                        "{} chart updated at {:02}:00 (target {}, rate {}/h)",
                        line.label(),
                        hour,
                        target,
                        rate
                    );
                }
                if change.is_new_part() {
                    self.tally.record(&part);
                    self.notices.post_part(line, &part, now);
                    report.notices_posted += 1;
                }
            }
        }

        report.fields_written = self.kpi.render(&mut self.board, &self.snapshot);
        report
    }

    /// Advance timers; returns how many notices were hidden.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.notices.expire(now)
    }

    pub fn post_message(&mut self, level: NoticeLevel, text: impl Into<String>, now: Instant) {
        self.notices.post_message(level, text, now);
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn board(&self) -> &FieldBoard {
        &self.board
    }

    pub fn chart(&self, line: LineId) -> &LineChart {
        self.charts.chart(line)
    }

    pub fn line_state(&self, line: LineId) -> &LineState {
        self.reconciler.state(line)
    }

    pub fn notices(&self) -> &NotificationPresenter {
        &self.notices
    }

    pub fn tally(&self) -> &ClassTally {
        &self.tally
    }

    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrap_update_skips_reconciliation() {
        let mut dash = Dashboard::default();
        let now = Instant::now();
        let full = PayloadPatch::from_json(
            r#"{"line1_part": {"track_id": "1", "class_name": "a", "target": 10},
                "line1_production": {"quantity": 4, "delta": 1}}"#,
        )
        .unwrap();
        dash.ingest(UpdateKind::Full, full, now, 9);

        let scrap = PayloadPatch::from_json(r#"{"line1_scrap": {"total": 1}}"#).unwrap();
        let report = dash.ingest(UpdateKind::Scrap, scrap, now, 9);

        assert_eq!(report.change(LineId::One), None);
        assert_eq!(report.notices_posted, 0);
        assert_eq!(dash.board().text("scrap-rate-1"), Some("20%"));
        assert_eq!(dash.chart(LineId::One).revision(), 1);
    }

    #[test]
    fn test_tick_expires_notices() {
        let mut dash = Dashboard::with_notice_settings(Duration::from_secs(5), 4);
        let now = Instant::now();
        let full = PayloadPatch::from_json(r#"{"line2_part": {"track_id": "3"}}"#).unwrap();
        dash.ingest(UpdateKind::Full, full, now, 9);
        assert_eq!(dash.notices().len(), 1);
        assert_eq!(dash.tick(now + Duration::from_secs(6)), 1);
    }
}
