//! Launch phase state machine published to the splash UI.

use tokio::sync::watch;
use tracing::warn;

/// Current phase of the startup sequence.
///
/// Phases only move forward; a phase, once left, is never revisited.
/// `Aborted` is terminal and reachable only from `UpdateOffered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    /// Splash window created, nothing started yet
    Initializing,
    /// Fetching the remote version manifest
    CheckingUpdate,
    /// A newer version exists; waiting on the user's decision
    UpdateOffered,
    /// Server process spawn + readiness probe in progress
    StartingServer,
    /// Main flow released, splash closing
    Ready,
    /// User accepted the update; process exits without starting the server
    Aborted,
}

impl LaunchPhase {
    fn rank(self) -> u8 {
        match self {
            Self::Initializing => 0,
            Self::CheckingUpdate => 1,
            Self::UpdateOffered => 2,
            Self::StartingServer => 3,
            Self::Ready => 4,
            Self::Aborted => 5,
        }
    }

    /// Whether moving to `next` respects the forward-only ordering.
    pub fn can_advance_to(self, next: LaunchPhase) -> bool {
        match (self, next) {
            (Self::Aborted, _) => false,
            (Self::UpdateOffered, Self::Aborted) => true,
            (_, Self::Aborted) => false,
            (from, to) => to.rank() > from.rank(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::CheckingUpdate => "checking_update",
            Self::UpdateOffered => "update_offered",
            Self::StartingServer => "starting_server",
            Self::Ready => "ready",
            Self::Aborted => "aborted",
        }
    }
}

/// Phase plus the status text shown on the splash label.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub phase: LaunchPhase,
    pub message: String,
}

/// Transient launch state, mutated only by the splash controller and
/// the single background task it spawns.
pub struct LaunchState {
    tx: watch::Sender<StatusUpdate>,
}

impl LaunchState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusUpdate {
            phase: LaunchPhase::Initializing,
            message: "Starting Application...".into(),
        });
        Self { tx }
    }

    /// Advance to a later phase, refusing regressions.
    ///
    /// Returns false (and logs) when the transition would revisit an
    /// earlier phase or leave the terminal one.
    pub fn advance(&self, phase: LaunchPhase, message: &str) -> bool {
        let current = self.tx.borrow().phase;
        if !current.can_advance_to(phase) {
            warn!(
                "Refusing launch phase transition {:?} -> {:?}",
                current, phase
            );
            return false;
        }

        let _ = self.tx.send(StatusUpdate {
            phase,
            message: message.into(),
        });
        true
    }

    pub fn phase(&self) -> LaunchPhase {
        self.tx.borrow().phase
    }

    pub fn message(&self) -> String {
        self.tx.borrow().message.clone()
    }

    /// Subscribe to phase/status changes.
    pub fn subscribe(&self) -> watch::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }
}

impl Default for LaunchState {
    fn default() -> Self {
        Self::new()
    }
}
