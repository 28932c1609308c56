use crate::{ClientError, FileUpload, IngestionStatus, SubmissionId, SubscriptionId, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a document to ingest.
    FileChosen(FileUpload),
    /// User submitted a website URL to scrape.
    UrlSubmitted(String),
    /// The server accepted a submission and started a task.
    SubmissionAccepted {
        submission: SubmissionId,
        task_id: TaskId,
    },
    SubmissionFailed {
        submission: SubmissionId,
        error: ClientError,
    },
    /// A decoded progress snapshot from a subscription.
    Snapshot {
        subscription: SubscriptionId,
        status: IngestionStatus,
    },
    /// A progress subscription reported an error. Protocol errors leave the
    /// stream running; anything else means the stream is gone.
    StreamFailed {
        subscription: SubscriptionId,
        error: ClientError,
    },
    /// User finished the customization step.
    CustomizationFinished,
    /// User asked a question against the finished collection.
    QuestionAsked(String),
    AnswerReceived(Result<String, ClientError>),
    /// User clicked "Create another".
    ResetClicked,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
