//! Update Feed
//!
//! Background tasks that talk to the line server and report back to the UI
//! loop over one channel: the snapshot poller, the push listener, video
//! uploads and scrap-desk requests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::client::{LineApi, LineClient};
use super::sequence::{RequestSequencer, Resource, Ticket};
use super::sse::{SseDecoder, SseFrame};
use crate::model::{PayloadPatch, UpdateKind};
use crate::scrap::{self, DeskEvent, DeskRequest};

/// Channel depth between the background tasks and the UI loop.
pub const FEED_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Answer to a polled `/production_data` fetch.
    Snapshot { ticket: Ticket, patch: PayloadPatch },
    /// An update received on the push channel.
    Pushed { kind: UpdateKind, patch: PayloadPatch },
    Link { connected: bool },
    FetchFailed { what: &'static str, error: String },
    VideoUploaded { preview_url: String },
    UploadFailed(String),
    Desk(DeskEvent),
}

/// Turn a push-channel frame into an update, if it is one we consume.
pub fn decode_frame(frame: &SseFrame) -> Option<FeedEvent> {
    let Some(kind) = UpdateKind::from_event(&frame.event) else {
        debug!("Ignoring push event '{}'", frame.event);
        return None;
    };
    match PayloadPatch::from_json(&frame.data) {
        Ok(patch) => Some(FeedEvent::Pushed { kind, patch }),
        Err(e) => {
            warn!("Malformed '{}' payload: {:#}", frame.event, e);
            None
        }
    }
}

/// Spawner for every task that feeds the dashboard.
#[derive(Clone)]
pub struct Feed {
    client: Arc<LineClient>,
    sequencer: Arc<RequestSequencer>,
    tx: mpsc::Sender<FeedEvent>,
}

impl Feed {
    pub fn new(client: Arc<LineClient>, sequencer: Arc<RequestSequencer>, tx: mpsc::Sender<FeedEvent>) -> Self {
        Self { client, sequencer, tx }
    }

    pub fn sequencer(&self) -> &Arc<RequestSequencer> {
        &self.sequencer
    }

    /// Fetch one snapshot under a fresh ticket.
    pub fn request_snapshot(&self) -> JoinHandle<()> {
        let ticket = self.sequencer.issue(Resource::ProductionData);
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fetch_snapshot(client.as_ref(), ticket).await).await;
        })
    }

    /// Poll `/production_data` every `every` until the receiver goes away.
    pub fn spawn_poller(&self, every: Duration) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if feed.tx.is_closed() {
                    break;
                }
                let ticket = feed.sequencer.issue(Resource::ProductionData);
                let client = feed.client.clone();
                let tx = feed.tx.clone();
                // Fetches may overlap; the ticket sorts out which answer wins.
                tokio::spawn(async move {
                    let _ = tx.send(fetch_snapshot(client.as_ref(), ticket).await).await;
                });
            }
            debug!("Poller stopped");
        })
    }

    /// Listen on the push channel at `path`, reconnecting after `retry`.
    pub fn spawn_push_listener(&self, path: String, retry: Duration) -> JoinHandle<()> {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            loop {
                match client.open_event_stream(&path).await {
                    Ok(response) => {
                        info!("Push channel connected at {}", path);
                        if tx.send(FeedEvent::Link { connected: true }).await.is_err() {
                            return;
                        }
                        let mut decoder = SseDecoder::new();
                        let mut stream = response.bytes_stream();
                        while let Some(chunk) = stream.next().await {
                            let bytes = match chunk {
                                Ok(bytes) => bytes,
                                Err(e) => {
                                    warn!("Push channel read failed: {}", e);
                                    break;
                                }
                            };
                            for frame in decoder.push(&bytes) {
                                if let Some(event) = decode_frame(&frame) {
                                    if tx.send(event).await.is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                        info!("Push channel closed");
                        if tx.send(FeedEvent::Link { connected: false }).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("Push channel unavailable: {}", e),
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(retry).await;
            }
        })
    }

    /// Upload a clip; on success report the refreshed preview reference and
    /// fetch a new snapshot.
    pub fn spawn_upload(&self, path: PathBuf, video_feed_path: String) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move {
            info!("Uploading {}", path.display());
            match feed.client.upload_video(&path).await {
                Ok(()) => {
                    let millis = chrono::Utc::now().timestamp_millis();
                    let preview_url = feed.client.preview_url(&video_feed_path, millis);
                    let _ = feed.tx.send(FeedEvent::VideoUploaded { preview_url }).await;
                    feed.request_snapshot();
                }
                Err(e) => {
                    warn!("Upload of {} failed: {}", path.display(), e);
                    let _ = feed.tx.send(FeedEvent::UploadFailed(e.to_string())).await;
                }
            }
        })
    }

    /// Run a scrap-desk request and route its answer back to the desk.
    pub fn spawn_desk(&self, request: DeskRequest) -> JoinHandle<()> {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = scrap::fulfil(client.as_ref(), request).await;
            let _ = tx.send(FeedEvent::Desk(event)).await;
        })
    }
}

async fn fetch_snapshot(api: &dyn LineApi, ticket: Ticket) -> FeedEvent {
    match api.production_data().await {
        Ok(patch) => FeedEvent::Snapshot { ticket, patch },
        Err(e) => FeedEvent::FetchFailed { what: "production data", error: e.to_string() },
    }
}
