//! Line Server Simulator
//!
//! An axum server exposing the same endpoints as the production line server,
//! backed by a [`Plant`]. A production clock advances the plant and every
//! change is pushed on `/events` as a server-sent event.

pub mod plant;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub use plant::{default_bom, default_scrap_book, BomEntry, Plant};

use crate::model::{PartEntry, ScrapRecord, ScrapReport, UpdateKind, UploadReply, WirePayload};

/// One push-channel message: event name and JSON body.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub event: &'static str,
    pub data: String,
}

struct SimError(StatusCode, String);

impl IntoResponse for SimError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

#[derive(Clone)]
pub struct SimState {
    pub plant: Arc<Mutex<Plant>>,
    pub tx: broadcast::Sender<PushMessage>,
    pub last_upload: Arc<Mutex<Option<(String, usize)>>>,
}

impl SimState {
    pub fn new(plant: Plant) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            plant: Arc::new(Mutex::new(plant)),
            tx,
            last_upload: Arc::new(Mutex::new(None)),
        }
    }

    /// Broadcast `payload` to every push subscriber.
    pub fn publish(&self, kind: UpdateKind, payload: &WirePayload) {
        match serde_json::to_string(payload) {
            Ok(data) => {
                // No subscribers is fine.
                let _ = self.tx.send(PushMessage { event: kind.event_name(), data });
            }
            Err(e) => warn!("Failed to encode {} payload: {}", kind.event_name(), e),
        }
    }

    /// Advance a random line and push the new production state.
    pub async fn advance(&self) {
        let now = Local::now();
        let payload = {
            let mut plant = self.plant.lock().await;
            let Some(line) = plant.advance_random(&mut rand::thread_rng(), now) else {
                return;
            };
            debug!("Part crossed on {}", line.label());
            plant.payload(now)
        };
        self.publish(UpdateKind::Production, &payload);
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new(Plant::default())
    }
}

pub fn router(state: SimState) -> Router {
    Router::new()
        .route("/production_data", get(production_data))
        .route("/video_feed", get(video_feed))
        .route("/upload_video", post(upload_video))
        .route("/submit_scrap", post(submit_scrap))
        .route("/get_scrap_history", get(scrap_history))
        .route("/get_programs", get(programs))
        .route("/get_parts/{program}", get(parts))
        .route("/get_defect_codes", get(defect_codes))
        .route("/get_defect_descriptions", get(defect_descriptions))
        .route("/get_description/{code}", get(description))
        .route("/get_code/{description}", get(code))
        .route("/events", get(events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Advance the plant every `every` until the task is aborted.
pub fn spawn_clock(state: SimState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            state.advance().await;
        }
    })
}

pub async fn serve(listener: TcpListener, state: SimState) -> Result<()> {
    info!("Line simulator listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn production_data(State(state): State<SimState>) -> Json<WirePayload> {
    Json(state.plant.lock().await.payload(Local::now()))
}

async fn video_feed(State(state): State<SimState>) -> impl IntoResponse {
    let body = match state.last_upload.lock().await.as_ref() {
        Some((name, size)) => format!("replaying {} ({} bytes)", name, size),
        None => "live camera".to_string(),
    };
    ([(header::CONTENT_TYPE, "text/plain")], body)
}

async fn upload_video(State(state): State<SimState>, mut multipart: Multipart) -> Json<UploadReply> {
    let rejected = |error: &str| {
        Json(UploadReply { success: false, error: Some(error.to_string()), message: None })
    };
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return rejected("No video file provided"),
            Err(e) => return rejected(&e.to_string()),
        };
        if field.name() != Some("video") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        if name.is_empty() {
            return rejected("No video file selected");
        }
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return rejected(&e.to_string()),
        };
        info!("Received upload {} ({} bytes)", name, bytes.len());
        *state.last_upload.lock().await = Some((name, bytes.len()));
        return Json(UploadReply {
            success: true,
            error: None,
            message: Some("Video uploaded successfully".to_string()),
        });
    }
}

async fn submit_scrap(
    State(state): State<SimState>,
    Json(report): Json<ScrapReport>,
) -> Result<Json<ScrapRecord>, SimError> {
    let (record, scrap) = {
        let mut plant = state.plant.lock().await;
        let record = plant
            .record_scrap(report, Local::now())
            .map_err(|e| SimError(StatusCode::BAD_REQUEST, e.to_string()))?;
        (record, plant.scrap_payload())
    };
    state.publish(UpdateKind::Scrap, &scrap);
    Ok(Json(record))
}

async fn scrap_history(State(state): State<SimState>) -> Json<Vec<ScrapRecord>> {
    Json(state.plant.lock().await.history())
}

async fn programs(State(state): State<SimState>) -> Json<Vec<String>> {
    Json(state.plant.lock().await.programs())
}

async fn parts(State(state): State<SimState>, Path(program): Path<String>) -> Json<Vec<PartEntry>> {
    Json(state.plant.lock().await.parts(&program))
}

async fn defect_codes(State(state): State<SimState>) -> Json<Vec<String>> {
    Json(state.plant.lock().await.defect_codes())
}

async fn defect_descriptions(State(state): State<SimState>) -> Json<Vec<String>> {
    Json(state.plant.lock().await.defect_descriptions())
}

async fn description(State(state): State<SimState>, Path(code): Path<String>) -> Response {
    match state.plant.lock().await.description_for(&code) {
        Some(description) => Json(json!({ "description": description })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn code(State(state): State<SimState>, Path(description): Path<String>) -> Response {
    match state.plant.lock().await.code_for(&description) {
        Some(code) => Json(json!({ "code": code })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn events(State(state): State<SimState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.tx.subscribe()).filter_map(|message| async move {
        match message {
            Ok(message) => Some(Ok(Event::default().event(message.event).data(message.data))),
            // Lagged subscribers skip what they missed.
            Err(_) => None,
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
