//! Terminal Dashboard
//!
//! Owns the [`Dashboard`] and the [`ScrapDesk`], drains feed events between
//! frames and turns typed commands into requests.

pub mod command;
mod render;

use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Timelike;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::engine::{Dashboard, NoticeLevel};
use crate::model::UpdateKind;
use crate::scrap::ScrapDesk;
use crate::transport::{Feed, FeedEvent};
use command::Command;

const TICK_RATE: Duration = Duration::from_millis(100);
const LOG_LINES: usize = 100;

pub struct App {
    config: DashboardConfig,
    dashboard: Dashboard,
    desk: ScrapDesk,
    feed: Feed,
    events: mpsc::Receiver<FeedEvent>,
    input: String,
    status: String,
    connected: bool,
    preview_url: Option<String>,
    logs: Vec<String>,
}

impl App {
    pub fn new(config: DashboardConfig, feed: Feed, events: mpsc::Receiver<FeedEvent>) -> Self {
        let dashboard = Dashboard::with_notice_settings(config.notice_ttl(), config.notice_capacity);
        let desk = ScrapDesk::new(feed.sequencer().clone());
        Self {
            config,
            dashboard,
            desk,
            feed,
            events,
            input: String::new(),
            status: "Connecting...".to_string(),
            connected: false,
            preview_url: None,
            logs: Vec::new(),
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn desk(&self) -> &ScrapDesk {
        &self.desk
    }

    /// Start the poller, the push listener and the initial loads.
    pub fn start(&mut self) {
        self.feed.request_snapshot();
        self.feed.spawn_poller(self.config.poll_interval());
        self.feed
            .spawn_push_listener(self.config.push_path.clone(), self.config.reconnect_delay());
        self.feed.spawn_desk(self.desk.load_catalogue());
        info!("Dashboard started against {}", self.config.server_url);
    }

    fn push_log(&mut self, msg: String) {
        self.logs.push(msg);
        if self.logs.len() > LOG_LINES {
            self.logs.remove(0);
        }
    }

    fn ingest(&mut self, kind: UpdateKind, patch: crate::model::PayloadPatch, now: Instant) {
        let hour = chrono::Local::now().hour();
        let report = self.dashboard.ingest(kind, patch, now, hour);
        if report.notices_posted > 0 {
            self.push_log(format!("{} new part(s) detected", report.notices_posted));
        }
    }

    /// Apply one event from the background tasks.
    pub fn handle_feed(&mut self, event: FeedEvent, now: Instant) {
        match event {
            FeedEvent::Snapshot { ticket, patch } => {
                if self.feed.sequencer().accept(&ticket) {
                    self.ingest(UpdateKind::Full, patch, now);
                }
            }
            FeedEvent::Pushed { kind, patch } => self.ingest(kind, patch, now),
            FeedEvent::Link { connected } => {
                self.connected = connected;
                self.status = if connected { "Live" } else { "Polling" }.to_string();
                self.push_log(format!("Push channel {}", if connected { "connected" } else { "lost" }));
            }
            FeedEvent::FetchFailed { what, error } => {
                warn!("Error fetching {}: {}", what, error);
                self.push_log(format!("Error fetching {}: {}", what, error));
            }
            FeedEvent::VideoUploaded { preview_url } => {
                self.push_log(format!("Preview now at {}", preview_url));
                self.preview_url = Some(preview_url);
                self.dashboard
                    .post_message(NoticeLevel::Success, "Video uploaded successfully", now);
            }
            FeedEvent::UploadFailed(error) => {
                self.dashboard
                    .post_message(NoticeLevel::Error, format!("Error uploading video: {}", error), now);
            }
            FeedEvent::Desk(event) => {
                if let Some((level, text)) = self.desk.apply(event) {
                    self.push_log(text.clone());
                    self.dashboard.post_message(level, text, now);
                }
            }
        }
    }

    /// Execute a command. Returns `false` when the operator asked to quit.
    pub fn handle_command(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::Quit => return false,
            Command::Help => self.status = command::HELP.to_string(),
            Command::Refresh => {
                self.feed.request_snapshot();
                self.feed.spawn_desk(self.desk.load_catalogue());
            }
            Command::Upload(path) => {
                self.push_log(format!("Uploading {}", path.display()));
                self.feed.spawn_upload(path, self.config.video_feed_path.clone());
            }
            Command::Line(line) => self.desk.select_line(line),
            Command::Program(program) => {
                if let Some(request) = self.desk.select_program(&program) {
                    self.feed.spawn_desk(request);
                }
            }
            Command::Part(part) => {
                if let Err(message) = self.desk.select_part(&part) {
                    self.dashboard.post_message(NoticeLevel::Error, message, now);
                }
            }
            Command::Code(code) => {
                if let Some(request) = self.desk.select_code(&code) {
                    self.feed.spawn_desk(request);
                }
            }
            Command::Description(description) => {
                if let Some(request) = self.desk.select_description(&description) {
                    self.feed.spawn_desk(request);
                }
            }
            Command::Comment(text) => self.desk.set_comments(&text),
            Command::Submit => match self.desk.submit() {
                Ok(request) => {
                    self.feed.spawn_desk(request);
                }
                Err(message) => self.dashboard.post_message(NoticeLevel::Error, message, now),
            },
        }
        true
    }

    fn submit_input(&mut self, now: Instant) -> bool {
        let line = std::mem::take(&mut self.input);
        match command::parse(&line) {
            Ok(Some(command)) => self.handle_command(command, now),
            Ok(None) => true,
            Err(message) => {
                self.status = message;
                true
            }
        }
    }
}

/// Run the terminal loop until the operator quits.
pub async fn run(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = event_loop(&mut app).await;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
}

async fn event_loop(app: &mut App) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    app.start();

    loop {
        terminal.draw(|f| render::draw(f, app))?;

        let now = Instant::now();
        while let Ok(event) = app.events.try_recv() {
            app.handle_feed(event, now);
        }
        app.dashboard.tick(now);

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Enter => {
                            if !app.submit_input(Instant::now()) {
                                break;
                            }
                        }
                        KeyCode::Char(c) => app.input.push(c),
                        KeyCode::Backspace => {
                            app.input.pop();
                        }
                        KeyCode::Esc => break,
                        _ => {}
                    }
                }
            }
        }
    }
    info!("Dashboard closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::model::PayloadPatch;
    use crate::transport::{LineClient, RequestSequencer, Resource, FEED_CAPACITY};

    fn app() -> App {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let feed = Feed::new(
            Arc::new(LineClient::new("http://127.0.0.1:9")),
            Arc::new(RequestSequencer::new()),
            tx,
        );
        App::new(DashboardConfig::default(), feed, rx)
    }

    fn patch(track: &str, quantity: u64) -> PayloadPatch {
        PayloadPatch::from_json(&format!(
            r#"{{"line1_part": {{"track_id": "{}", "class_name": "a", "target": 10}},
                "line1_production": {{"quantity": {}, "delta": 0}}}}"#,
            track, quantity
        ))
        .unwrap()
    }

    #[test]
    fn test_superseded_snapshot_is_dropped() {
        let mut app = app();
        let now = Instant::now();
        let old = app.feed.sequencer().issue(Resource::ProductionData);
        let new = app.feed.sequencer().issue(Resource::ProductionData);

        app.handle_feed(FeedEvent::Snapshot { ticket: new, patch: patch("2", 7) }, now);
        app.handle_feed(FeedEvent::Snapshot { ticket: old, patch: patch("1", 3) }, now);

        assert_eq!(app.dashboard().board().text("quantity-1"), Some("7"));
        assert_eq!(app.dashboard().updates_applied(), 1);
    }

    #[test]
    fn test_submit_with_missing_fields_posts_error() {
        let mut app = app();
        assert!(app.handle_command(Command::Submit, Instant::now()));
        assert_eq!(app.dashboard().notices().len(), 1);
    }

    #[test]
    fn test_quit_and_bad_input() {
        let mut app = app();
        app.input = "launch".to_string();
        assert!(app.submit_input(Instant::now()));
        assert!(app.status.starts_with("Unknown command"));
        app.input = "quit".to_string();
        assert!(!app.submit_input(Instant::now()));
    }

    #[test]
    fn test_upload_failure_becomes_notice() {
        let mut app = app();
        app.handle_feed(FeedEvent::UploadFailed("too large".to_string()), Instant::now());
        assert_eq!(app.dashboard().notices().len(), 1);
        app.handle_feed(FeedEvent::Link { connected: true }, Instant::now());
        assert!(app.connected);
    }
}
