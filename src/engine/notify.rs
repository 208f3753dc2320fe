//! Transient Notices
//!
//! Part-detected alerts and short status messages. Notices stack: an alert
//! from one line never replaces a visible alert from the other. Each notice
//! hides on its own once its time-to-live has passed.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::model::{LineId, PartInfo};

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);
pub const DEFAULT_NOTICE_CAPACITY: usize = 8;

/// Status messages stay up for a shorter time than part alerts.
const MESSAGE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub struct PartNotice {
    pub line: LineId,
    pub program: String,
    pub part_number: String,
    pub description: String,
    pub track_id: String,
}

impl PartNotice {
    pub fn from_part(line: LineId, part: &PartInfo) -> Self {
        Self {
            line,
            program: part.program.clone(),
            part_number: part.part_number.clone(),
            description: part.part_description.clone(),
            track_id: part.track_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoticeBody {
    PartDetected(PartNotice),
    Message { level: NoticeLevel, text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub body: NoticeBody,
    pub expires_at: Instant,
}

pub struct NotificationPresenter {
    ttl: Duration,
    capacity: usize,
    active: VecDeque<Notice>,
    next_id: u64,
}

impl Default for NotificationPresenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL, DEFAULT_NOTICE_CAPACITY)
    }
}

impl NotificationPresenter {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            active: VecDeque::new(),
            next_id: 1,
        }
    }

    /// Show a part-detected alert for `line`.
    pub fn post_part(&mut self, line: LineId, part: &PartInfo, now: Instant) -> u64 {
        let body = NoticeBody::PartDetected(PartNotice::from_part(line, part));
        self.push(body, now + self.ttl)
    }

    pub fn post_message(&mut self, level: NoticeLevel, text: impl Into<String>, now: Instant) -> u64 {
        let body = NoticeBody::Message { level, text: text.into() };
        self.push(body, now + MESSAGE_TTL)
    }

    fn push(&mut self, body: NoticeBody, expires_at: Instant) -> u64 {
        if self.active.len() >= self.capacity {
            if let Some(dropped) = self.active.pop_front() {
                warn!("Notice stack full, dropping notice #{}", dropped.id);
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        self.active.push_back(Notice { id, body, expires_at });
        id
    }

    /// Hide every notice whose time is up. Returns how many were hidden.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.active.len();
        self.active.retain(|notice| notice.expires_at > now);
        before - self.active.len()
    }

    /// Visible notices, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
