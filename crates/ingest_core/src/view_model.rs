use crate::{ClientError, DashboardStep, StageName, StageStatus, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRow {
    pub stage: StageName,
    pub label: &'static str,
    pub status: StageStatus,
    pub percent: u8,
    pub message: String,
    /// The server's `current_state` pointer; highlighting only.
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressView {
    /// No snapshot yet: show an indeterminate indicator for every stage.
    pub initializing: bool,
    pub current_stage: Option<StageName>,
    pub stages: Vec<StageRow>,
    pub complete: bool,
    /// The progress stream died; last good rows stay visible.
    pub stalled: Option<String>,
    pub protocol_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardView {
    pub step: DashboardStep,
    pub step_number: u8,
    pub task_id: Option<TaskId>,
    pub collection_name: Option<String>,
    pub submitting: bool,
    pub progress: ProgressView,
    pub last_error: Option<ClientError>,
    pub login_required: bool,
    pub awaiting_answer: bool,
    pub last_answer: Option<String>,
    pub dirty: bool,
}
