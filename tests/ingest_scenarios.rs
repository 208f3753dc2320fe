//! Ingestion Scenarios
//!
//! End-to-end behaviour of the dashboard engine for sequences of updates,
//! driven through the single `Dashboard::ingest` path.

use std::time::{Duration, Instant};

use linewatch::engine::{LineChange, MarkerColor, NoticeBody};
use linewatch::{Dashboard, LineId, PayloadPatch, UpdateKind};

fn line1(track: &str, class: &str, target: u64, quantity: u64, cycle: f64) -> PayloadPatch {
    PayloadPatch::from_json(&format!(
        r#"{{"line1_part": {{"program": "P100", "part_number": "4410", "part_description": "Bracket",
                             "track_id": "{track}", "class_name": "{class}", "target": "{target}"}},
            "line1_production": {{"quantity": {quantity}, "delta": 2}},
            "total_tbp_line1": {cycle}}}"#
    ))
    .unwrap()
}

#[test]
fn test_repeated_track_id_leaves_chart_but_refreshes_kpis() {
    let mut dash = Dashboard::default();
    let now = Instant::now();

    dash.ingest(UpdateKind::Full, line1("7", "bracket", 60, 10, 600.0), now, 9);
    let chart_before = dash.chart(LineId::One).clone();

    let report = dash.ingest(UpdateKind::Full, line1("7", "bracket", 90, 14, 700.0), now, 9);

    assert_eq!(report.change(LineId::One), Some(LineChange::Unchanged));
    assert_eq!(dash.chart(LineId::One), &chart_before);
    assert_eq!(dash.line_state(LineId::One).current_target, 60);
    assert_eq!(dash.board().text("quantity-1"), Some("14"));
    assert_eq!(dash.board().text("delta-1"), Some("+2"));
}

#[test]
fn test_sticky_target_survives_same_class() {
    let mut dash = Dashboard::default();
    let now = Instant::now();

    dash.ingest(UpdateKind::Full, line1("1", "bracket", 50, 10, 600.0), now, 10);
    // 100 parts in 3000 s = 120/h, judged against the sticky 50.
    let report = dash.ingest(UpdateKind::Full, line1("2", "bracket", 500, 100, 3000.0), now, 10);

    assert_eq!(
        report.change(LineId::One),
        Some(LineChange::Changed { new_part: true, target_adopted: false })
    );
    assert_eq!(dash.line_state(LineId::One).current_target, 50);
    let chart = dash.chart(LineId::One);
    assert_eq!(chart.marker(), MarkerColor::Green);
    assert_eq!(chart.rate_series()[4], Some(120));
    assert_eq!(chart.target_series()[4], 50);
    assert_eq!(chart.quantity_series()[4], 100);
}

#[test]
fn test_class_change_adopts_new_target() {
    let mut dash = Dashboard::default();
    let now = Instant::now();

    dash.ingest(UpdateKind::Full, line1("1", "bracket", 50, 10, 600.0), now, 10);
    dash.ingest(UpdateKind::Full, line1("2", "panel", 200, 100, 3000.0), now, 10);

    assert_eq!(dash.line_state(LineId::One).current_target, 200);
    assert_eq!(dash.chart(LineId::One).marker(), MarkerColor::Red);
}

#[test]
fn test_missing_rates_render_as_zero() {
    let mut dash = Dashboard::default();
    let patch = PayloadPatch::from_json(
        r#"{"line1_production": {"quantity": 0}, "line1_scrap": {"total": 0},
            "line2_scrap": {"total": 0, "rate": "n/a"}}"#,
    )
    .unwrap();
    dash.ingest(UpdateKind::Full, patch, Instant::now(), 12);

    assert_eq!(dash.board().text("scrap-rate-1"), Some("0%"));
    assert_eq!(dash.board().text("scrap-rate-2"), Some("0%"));
    assert_eq!(dash.board().text("program-1"), Some("No Part"));
    assert_eq!(dash.board().text("average-scrap-rate"), Some("0%"));
}

#[test]
fn test_one_notice_per_track_transition() {
    let mut dash = Dashboard::with_notice_settings(Duration::from_secs(60), 16);
    let now = Instant::now();
    let tracks = ["1", "1", "2", "2", "2", "3", "", "3"];

    let mut posted = 0;
    for track in tracks {
        posted += dash
            .ingest(UpdateKind::Full, line1(track, "bracket", 50, 1, 60.0), now, 8)
            .notices_posted;
    }

    // The blank between the two "3"s moves the chart but raises no second notice.
    assert_eq!(posted, 3);
    let tracks_seen: Vec<String> = dash
        .notices()
        .visible()
        .filter_map(|n| match &n.body {
            NoticeBody::PartDetected(p) => Some(p.track_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(tracks_seen, vec!["1", "2", "3"]);
    assert_eq!(dash.tally().get("bracket").map(|e| e.count), Some(3));
}

#[test]
fn test_push_updates_merge_into_held_snapshot() {
    let mut dash = Dashboard::default();
    let now = Instant::now();
    dash.ingest(UpdateKind::Full, line1("1", "bracket", 50, 9, 600.0), now, 9);

    let scrap = PayloadPatch::from_json(
        r#"{"line1_scrap": {"total": 1, "rate": 99}, "total_scrap": 1}"#,
    )
    .unwrap();
    dash.ingest(UpdateKind::Scrap, scrap, now, 9);

    // Rate derived from held quantity 9 and scrap 1, not the pushed 99.
    assert_eq!(dash.board().text("scrap-rate-1"), Some("10%"));
    assert_eq!(dash.board().text("program-1"), Some("P100"));
    assert_eq!(dash.board().text("total-scrap"), Some("1"));
}
