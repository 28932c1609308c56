use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::view_model::{ProgressView, StageRow};
use crate::{ClientError, IngestionStatus, StageName, StageStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachinePhase {
    #[default]
    Uninitialized,
    Receiving,
    Terminal,
}

/// Outcome of [`IngestionMachine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// Returned exactly once, for the snapshot that carried `is_complete`.
    Completed,
    /// The machine is terminal; the snapshot was dropped.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("stage {stage} regressed from {from} to {to}")]
    Regression {
        stage: StageName,
        from: StageStatus,
        to: StageStatus,
    },
    #[error("stage {stage} reports progress {progress}%")]
    ProgressOutOfRange { stage: StageName, progress: u8 },
}

impl From<ProtocolViolation> for ClientError {
    fn from(violation: ProtocolViolation) -> Self {
        ClientError::Protocol(violation.to_string())
    }
}

/// Latest known pipeline snapshot for one task.
///
/// Snapshots replace each other wholesale; the only client-side judgement is
/// the stage regression check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestionMachine {
    phase: MachinePhase,
    latest: Option<IngestionStatus>,
    stalled: Option<String>,
    protocol_error: Option<String>,
}

impl IngestionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MachinePhase {
        self.phase
    }

    pub fn latest(&self) -> Option<&IngestionStatus> {
        self.latest.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == MachinePhase::Terminal
    }

    pub fn apply(&mut self, snapshot: IngestionStatus) -> Result<Applied, ProtocolViolation> {
        if self.is_terminal() {
            engine_debug!("Dropping snapshot received after completion");
            return Ok(Applied::Ignored);
        }

        if let Err(violation) = self.validate(&snapshot) {
            engine_warn!("Rejected progress snapshot: {}", violation);
            self.protocol_error = Some(violation.to_string());
            return Err(violation);
        }

        let complete = snapshot.is_complete;
        self.latest = Some(snapshot);
        self.protocol_error = None;
        self.stalled = None;

        if complete {
            engine_info!("Ingestion reported complete");
            self.phase = MachinePhase::Terminal;
            Ok(Applied::Completed)
        } else {
            self.phase = MachinePhase::Receiving;
            Ok(Applied::Updated)
        }
    }

    fn validate(&self, snapshot: &IngestionStatus) -> Result<(), ProtocolViolation> {
        for (stage, state) in snapshot.states.iter() {
            if state.progress > 100 {
                return Err(ProtocolViolation::ProgressOutOfRange {
                    stage,
                    progress: state.progress,
                });
            }
        }

        let Some(previous) = &self.latest else {
            return Ok(());
        };
        for (stage, next) in snapshot.states.iter() {
            let prev = previous.stage(stage);
            if next.status < prev.status {
                return Err(ProtocolViolation::Regression {
                    stage,
                    from: prev.status,
                    to: next.status,
                });
            }
            if next.status == StageStatus::Active
                && prev.status == StageStatus::Active
                && next.progress < prev.progress
            {
                // Tolerated: the server is authoritative on percentages.
                engine_debug!(
                    "Stage {} progress went back from {} to {}",
                    stage,
                    prev.progress,
                    next.progress
                );
            }
        }
        Ok(())
    }

    /// Records an undecodable payload without touching the visible snapshot.
    pub fn record_protocol_error(&mut self, message: impl Into<String>) {
        self.protocol_error = Some(message.into());
    }

    /// Marks the feeding stream as dead. The phase is left alone so the caller
    /// can decide whether to resubmit.
    pub fn mark_stalled(&mut self, reason: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.stalled = Some(reason.into());
    }

    pub fn view(&self) -> ProgressView {
        let stages = match &self.latest {
            Some(status) => status
                .states
                .iter()
                .map(|(stage, state)| StageRow {
                    stage,
                    label: stage.label(),
                    status: state.status,
                    percent: state.progress,
                    message: state.message.clone(),
                    is_current: status.current_state == stage,
                })
                .collect(),
            None => Vec::new(),
        };

        ProgressView {
            initializing: self.latest.is_none(),
            current_stage: self.latest.as_ref().map(|status| status.current_state),
            stages,
            complete: self.is_terminal(),
            stalled: self.stalled.clone(),
            protocol_error: self.protocol_error.clone(),
        }
    }
}
