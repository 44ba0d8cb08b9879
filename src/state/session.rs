use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Aggregate state shown by the save bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditSessionState {
    Idle,
    Editing,
    Saving,
    Saved,
    Error,
}

impl EditSessionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EditSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Resting,
    Saving,
    Saved { until: Instant },
    Failed { until: Instant },
}

/// Tracks the save protocol. `Idle` and `Editing` are never stored: they are
/// read off the current edit count, and the transient `Saved` / `Error`
/// states lapse on read once their display interval has passed.
#[derive(Clone, Debug)]
pub struct SessionStateMachine {
    phase: Phase,
    display: Duration,
}

impl SessionStateMachine {
    pub fn new(display: Duration) -> Self {
        Self {
            phase: Phase::Resting,
            display,
        }
    }

    pub fn state(&self, edit_count: usize) -> EditSessionState {
        self.state_at(edit_count, Instant::now())
    }

    pub fn state_at(&self, edit_count: usize, now: Instant) -> EditSessionState {
        match self.phase {
            Phase::Saving => EditSessionState::Saving,
            Phase::Saved { until } if now < until => EditSessionState::Saved,
            Phase::Failed { until } if now < until => EditSessionState::Error,
            _ if edit_count > 0 => EditSessionState::Editing,
            _ => EditSessionState::Idle,
        }
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.phase, Phase::Saving)
    }

    /// When the current transient state lapses, if one is showing.
    pub fn display_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Saved { until } | Phase::Failed { until } => Some(until),
            _ => None,
        }
    }

    /// Enters `Saving`. Returns false when a save is already in flight.
    pub fn begin_save(&mut self) -> bool {
        if self.is_saving() {
            return false;
        }
        self.phase = Phase::Saving;
        true
    }

    pub fn succeed(&mut self) {
        self.phase = Phase::Saved {
            until: Instant::now() + self.display,
        };
    }

    pub fn fail(&mut self) {
        self.phase = Phase::Failed {
            until: Instant::now() + self.display,
        };
    }

    /// Drops any transient state so the resting state shows again.
    /// A no-op while saving.
    pub fn rest(&mut self) -> bool {
        if self.is_saving() {
            return false;
        }
        self.phase = Phase::Resting;
        true
    }
}
