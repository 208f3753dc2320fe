//! Request Sequencing
//!
//! Every request for a resource takes a ticket. Only the response holding the
//! newest ticket for its resource may be applied; anything older was
//! superseded while in flight and is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Resources whose responses can race each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    ProductionData,
    Parts,
    DefectDescription,
    DefectCode,
    ScrapHistory,
}

impl Resource {
    const COUNT: usize = 5;

    fn slot(self) -> usize {
        match self {
            Resource::ProductionData => 0,
            Resource::Parts => 1,
            Resource::DefectDescription => 2,
            Resource::DefectCode => 3,
            Resource::ScrapHistory => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub resource: Resource,
    pub seq: u64,
}

/// Thread-safe ticket issuer, shared between request tasks and the UI loop.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    counter: AtomicU64,
    latest: [AtomicU64; Resource::COUNT],
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket that supersedes every earlier ticket for `resource`.
    pub fn issue(&self, resource: Resource) -> Ticket {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest[resource.slot()].fetch_max(seq, Ordering::SeqCst);
        Ticket { resource, seq }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest[ticket.resource.slot()].load(Ordering::SeqCst) == ticket.seq
    }

    /// Like [`is_current`](Self::is_current), logging discarded responses.
    pub fn accept(&self, ticket: &Ticket) -> bool {
        let current = self.is_current(ticket);
        if !current {
            debug!("Discarding superseded {:?} response #{}", ticket.resource, ticket.seq);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let seq = RequestSequencer::new();
        let first = seq.issue(Resource::ProductionData);
        let second = seq.issue(Resource::ProductionData);
        assert!(!seq.accept(&first));
        assert!(seq.accept(&second));
    }

    #[test]
    fn test_resources_are_independent() {
        let seq = RequestSequencer::new();
        let data = seq.issue(Resource::ProductionData);
        let parts = seq.issue(Resource::Parts);
        assert!(seq.is_current(&data));
        assert!(seq.is_current(&parts));
    }
}
