use crate::{FileUpload, SubmissionId, SubscriptionId, TaskId};

/// Side effects requested by [`crate::update`]; executed by the app's effect runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitFile {
        submission: SubmissionId,
        file: FileUpload,
    },
    SubmitUrl {
        submission: SubmissionId,
        url: String,
    },
    Subscribe {
        subscription: SubscriptionId,
        task_id: TaskId,
    },
    /// Idempotent; closing an already finished subscription is a no-op.
    CloseSubscription { subscription: SubscriptionId },
    /// The server rejected the stored credential.
    ClearCredential,
    Ask { question: String, collection: String },
}
