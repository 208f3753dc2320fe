//! Client Round Trips
//!
//! The HTTP client, the scrap desk and the feed tasks against the simulator
//! bound to an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use linewatch::engine::NoticeLevel;
use linewatch::model::ScrapReport;
use linewatch::scrap::{fulfil, ScrapDesk};
use linewatch::sim::{self, SimState};
use linewatch::transport::{
    ClientError, Feed, FeedEvent, LineApi, LineClient, RequestSequencer, SseDecoder, FEED_CAPACITY,
};
use linewatch::{LineId, UpdateKind};

const WAIT: Duration = Duration::from_secs(5);

async fn start_sim() -> (SimState, LineClient) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = SimState::default();
    tokio::spawn(sim::serve(listener, state.clone()));
    (state, LineClient::new(format!("http://{}", addr)))
}

fn report(line: &str) -> ScrapReport {
    ScrapReport {
        line: line.to_string(),
        program: "P100".to_string(),
        part_number: "4410-A".to_string(),
        defect_code: "D02".to_string(),
        defect_description: "Scratch".to_string(),
        comments: "left edge".to_string(),
    }
}

#[tokio::test]
async fn test_production_data_reflects_plant() {
    let (state, client) = start_sim().await;
    state.plant.lock().await.advance(LineId::Two, 2, Local::now());

    let patch = client.production_data().await.unwrap();
    let part = patch.line(LineId::Two).part.clone().unwrap();
    assert_eq!(part.part_number, "5520-A");
    assert_eq!(part.target, 60);
    assert_eq!(patch.line(LineId::Two).quantity(), 1);
    assert_eq!(patch.line(LineId::One).part.clone().unwrap().track_id, "");
    assert_eq!(patch.totals.quantity, Some(1));
}

#[tokio::test]
async fn test_desk_loads_parts_for_selected_program() {
    let (_state, client) = start_sim().await;
    let mut desk = ScrapDesk::new(Arc::new(RequestSequencer::new()));

    let catalogue = fulfil(&client, desk.load_catalogue()).await;
    assert_eq!(desk.apply(catalogue), None);
    assert_eq!(desk.programs(), ["P100", "P200", "P300"]);
    assert_eq!(desk.codes().len(), 5);

    let request = desk.select_program("P200").unwrap();
    let event = fulfil(&client, request).await;
    desk.apply(event);
    assert_eq!(desk.parts(), ["5520-A", "5520-B"]);
    assert!(desk.form().part_enabled());

    assert!(desk.select_program("").is_none());
    assert!(desk.parts().is_empty());
    assert!(!desk.form().part_enabled());
}

#[tokio::test]
async fn test_code_and_description_lookups() {
    let (_state, client) = start_sim().await;
    let mut desk = ScrapDesk::new(Arc::new(RequestSequencer::new()));

    let request = desk.select_code("D05").unwrap();
    desk.apply(fulfil(&client, request).await);
    assert_eq!(desk.form().defect_description(), Some("Wrong dimension"));

    let request = desk.select_description("Dent").unwrap();
    desk.apply(fulfil(&client, request).await);
    assert_eq!(desk.form().defect_code(), Some("D03"));

    assert!(matches!(
        client.description_for_code("D99").await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_submission_is_recorded_and_pushed() {
    let (_state, client) = start_sim().await;
    let response = client.open_event_stream("/events").await.unwrap();
    let mut stream = response.bytes_stream();

    let record = client.submit_scrap(&report("1")).await.unwrap();
    assert_eq!(record.line, "1");
    assert_eq!(record.comments, "left edge");
    assert_eq!(client.scrap_history().await.unwrap(), vec![record]);

    let mut decoder = SseDecoder::new();
    let frame = tokio::time::timeout(WAIT, async {
        loop {
            let chunk = stream.next().await.unwrap().unwrap();
            if let Some(frame) = decoder.push(&chunk).into_iter().next() {
                return frame;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(frame.event, "scrap_update");
    assert!(frame.data.contains("\"total_scrap\":1"));

    assert!(client.submit_scrap(&report("4")).await.is_err());
}

#[tokio::test]
async fn test_desk_submit_resets_form() {
    let (_state, client) = start_sim().await;
    let mut desk = ScrapDesk::new(Arc::new(RequestSequencer::new()));

    desk.select_line(Some(LineId::Two));
    let request = desk.select_program("P100").unwrap();
    desk.apply(fulfil(&client, request).await);
    desk.select_part("4410-B").unwrap();
    let request = desk.select_code("D01").unwrap();
    desk.apply(fulfil(&client, request).await);

    let submit = desk.submit().unwrap();
    let notice = desk.apply(fulfil(&client, submit).await);

    assert_eq!(notice.map(|n| n.0), Some(NoticeLevel::Success));
    let latest = desk.history().next().unwrap();
    assert_eq!(latest.line, "2");
    assert_eq!(latest.defect_description, "Crack");
    assert_eq!(desk.form().program(), None);
}

#[tokio::test]
async fn test_video_upload() {
    let (_state, client) = start_sim().await;
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("shift.mp4");
    std::fs::write(&clip, b"not really a video").unwrap();

    client.upload_video(&clip).await.unwrap();
    assert!(matches!(
        client.upload_video(&dir.path().join("missing.mp4")).await,
        Err(ClientError::Io { .. })
    ));
}

#[tokio::test]
async fn test_feed_delivers_pushed_production() {
    let (state, client) = start_sim().await;
    let (tx, mut rx) = mpsc::channel(FEED_CAPACITY);
    let feed = Feed::new(Arc::new(client), Arc::new(RequestSequencer::new()), tx);
    let listener = feed.spawn_push_listener("/events".to_string(), Duration::from_millis(100));

    let connected = tokio::time::timeout(WAIT, rx.recv()).await.unwrap();
    assert_eq!(connected, Some(FeedEvent::Link { connected: true }));

    state.advance().await;
    let pushed = tokio::time::timeout(WAIT, rx.recv()).await.unwrap();
    match pushed {
        Some(FeedEvent::Pushed { kind, patch }) => {
            assert_eq!(kind, UpdateKind::Production);
            assert_eq!(patch.totals.quantity, Some(1));
        }
        other => panic!("unexpected {:?}", other),
    }
    listener.abort();
}
