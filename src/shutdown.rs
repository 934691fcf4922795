//! Quit sequence
//!
//! The overlay vetoes ordinary close events, so quitting is a two-phase
//! shutdown: a cooperative close through the toolkit, then an unconditional
//! process exit. The sequence runs at most once no matter how many quit
//! requests arrive or from which thread.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use crate::shared::QuitSource;

/// Exit code of the authorized quit path
pub const QUIT_EXIT_CODE: i32 = 0;

/// One step of the quit sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitStep {
    StopTimer,
    DetachListener,
    PermitClose,
    CloseWindow,
    FlushOutput,
    RequestShutdown,
    Terminate,
}

impl QuitStep {
    pub const ORDER: [QuitStep; 7] = [
        QuitStep::StopTimer,
        QuitStep::DetachListener,
        QuitStep::PermitClose,
        QuitStep::CloseWindow,
        QuitStep::FlushOutput,
        QuitStep::RequestShutdown,
        QuitStep::Terminate,
    ];
}

impl fmt::Display for QuitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuitStep::StopTimer => "stop timer",
            QuitStep::DetachListener => "detach listener",
            QuitStep::PermitClose => "permit close",
            QuitStep::CloseWindow => "close window",
            QuitStep::FlushOutput => "flush output",
            QuitStep::RequestShutdown => "request shutdown",
            QuitStep::Terminate => "terminate",
        };
        f.write_str(name)
    }
}

/// A quit step that could not be completed. Logged, never propagated.
#[derive(Debug, Error)]
#[error("quit step '{step}' failed: {reason}")]
pub struct QuitStepError {
    pub step: QuitStep,
    pub reason: String,
}

impl QuitStepError {
    pub fn new(step: QuitStep, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }
}

/// Carries out the individual steps. The UI adapter implements this against
/// the real window; tests record the calls.
pub trait QuitSteps {
    fn perform(&mut self, step: QuitStep) -> Result<(), QuitStepError>;
}

/// Debounce for quit requests arriving from several sources
#[derive(Debug, Default)]
pub struct QuitLatch {
    fired: AtomicBool,
}

impl QuitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the quit. Only the first caller gets true.
    pub fn try_fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Run the quit sequence if no one has yet. Returns true if this call ran it.
/// In production the `Terminate` step does not return.
pub fn run_quit_sequence(latch: &QuitLatch, source: QuitSource, steps: &mut impl QuitSteps) -> bool {
    if !latch.try_fire() {
        info!(?source, "quit already in progress, request ignored");
        return false;
    }

    info!(?source, "quit requested");
    for step in QuitStep::ORDER {
        if let Err(e) = steps.perform(step) {
            warn!("{}", e);
        }
    }
    true
}

/// Flush stdout and stderr before the process goes away
pub fn flush_std_streams() -> Result<(), QuitStepError> {
    let out = std::io::stdout().flush();
    let err = std::io::stderr().flush();
    out.and(err)
        .map_err(|e| QuitStepError::new(QuitStep::FlushOutput, e.to_string()))
}
