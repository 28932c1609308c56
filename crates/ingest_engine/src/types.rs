use ingest_core::{ClientError, IngestionStatus, SubmissionId, SubscriptionId, TaskId};

/// Results reported back from the engine thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Submitted {
        submission: SubmissionId,
        result: Result<TaskId, ClientError>,
    },
    Snapshot {
        subscription: SubscriptionId,
        status: IngestionStatus,
    },
    StreamFailed {
        subscription: SubscriptionId,
        error: ClientError,
    },
    Answered(Result<String, ClientError>),
}
