//! Lifecycle state and counters for a polling engine

use std::time::{Duration, Instant};

use crate::token::{AttemptToken, Epoch};

/// Engine lifecycle: `Inactive -> Active -> Inactive`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not polling; no current token, no pending timer
    Inactive,
    /// Polling under the given epoch
    Active {
        epoch: Epoch,
        since: Instant,
    },
}

impl EngineState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn epoch(&self) -> Option<Epoch> {
        match self {
            Self::Active { epoch, .. } => Some(*epoch),
            Self::Inactive => None,
        }
    }
}

/// Snapshot of a polling engine's counters
///
/// Fetch failures are not counted: a failing source shows up only as
/// accepted writes of whatever the failure policy produced.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub state: EngineState,
    pub current_token: Option<AttemptToken>,
    pub delay: Duration,
    /// Activations and restarts since construction
    pub epochs: u64,
    /// Fetch attempts issued since construction
    pub attempts_issued: u64,
    /// Settlements that carried the current token
    pub settlements_accepted: u64,
    /// Settlements dropped because their token was superseded
    pub stale_discarded: u64,
    /// Version of the value cell
    pub value_version: u64,
}

impl std::fmt::Display for EngineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Polling Engine Stats:")?;
        match self.state {
            EngineState::Active { epoch, since } => {
                writeln!(f, "  State: active ({}, for {:?})", epoch, since.elapsed())?
            }
            EngineState::Inactive => writeln!(f, "  State: inactive")?,
        }
        match self.current_token {
            Some(token) => writeln!(f, "  Current token: {}", token)?,
            None => writeln!(f, "  Current token: none")?,
        }
        writeln!(f, "  Delay: {:?}", self.delay)?;
        writeln!(f, "  Epochs: {}", self.epochs)?;
        writeln!(
            f,
            "  Attempts: {} issued, {} accepted, {} stale",
            self.attempts_issued, self.settlements_accepted, self.stale_discarded
        )?;
        writeln!(f, "  Value version: {}", self.value_version)?;

        Ok(())
    }
}
