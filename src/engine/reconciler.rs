//! Per-Line State Reconciliation
//!
//! Production counters tick continuously, but the chart and the part
//! notification should only move when a physically new unit crosses the
//! sensor (a new track id), and the target should only re-baseline when the
//! product type actually changes.

use tracing::debug;

use crate::model::{LineId, PartInfo};

/// Identity state remembered for one line across updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineState {
    /// `None` until the first part object arrives for this line.
    pub last_track_id: Option<String>,
    /// Product type the sticky target belongs to.
    pub current_class_name: String,
    /// Sticky: kept until the class changes or while it is still unset.
    pub current_target: u64,
    /// Last non-empty track id a part notice was raised for.
    pub last_notified_track_id: Option<String>,
}

/// Outcome of reconciling one line against an incoming part object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    /// Same track id as before: leave chart and notification alone.
    Unchanged,
    /// Track id moved. `new_part` is set when the new id is non-empty and
    /// differs from the last one notified.
    Changed { new_part: bool, target_adopted: bool },
}

impl LineChange {
    pub fn is_changed(self) -> bool {
        matches!(self, LineChange::Changed { .. })
    }

    pub fn is_new_part(self) -> bool {
        matches!(self, LineChange::Changed { new_part: true, .. })
    }
}

/// Owns the [`LineState`] of both lines.
#[derive(Debug, Default)]
pub struct StateReconciler {
    lines: [LineState; 2],
}

impl StateReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, line: LineId) -> &LineState {
        &self.lines[line.index()]
    }

    /// Sticky target currently applied to `line`.
    pub fn target(&self, line: LineId) -> u64 {
        self.state(line).current_target
    }

    /// Compare an incoming part object with the stored identity and update it.
    pub fn reconcile(&mut self, line: LineId, part: &PartInfo) -> LineChange {
        let state = &mut self.lines[line.index()];

        if state.last_track_id.as_deref() == Some(part.track_id.as_str()) {
            return LineChange::Unchanged;
        }

        let mut target_adopted = false;
        if part.class_name != state.current_class_name || state.current_target == 0 {
            debug!(
                "{} target re-baseline: class '{}' -> '{}', target {} -> {}",
                line.label(),
                state.current_class_name,
                part.class_name,
                state.current_target,
                part.target
            );
            state.current_target = part.target;
            state.current_class_name = part.class_name.clone();
            target_adopted = true;
        }

        // A blank id in between does not re-arm the notice for the same unit.
        let new_part = !part.track_id.is_empty()
            && state.last_notified_track_id.as_deref() != Some(part.track_id.as_str());
        if new_part {
            state.last_notified_track_id = Some(part.track_id.clone());
        }
        state.last_track_id = Some(part.track_id.clone());

        LineChange::Changed { new_part, target_adopted }
    }
}
