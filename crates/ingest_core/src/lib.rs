//! Ingest core: wire model, ingestion state machine and the pure dashboard
//! controller.
mod effect;
mod error;
mod machine;
mod msg;
mod stage;
mod state;
mod status;
mod update;
mod upload;
mod view_model;

pub use effect::Effect;
pub use error::ClientError;
pub use machine::{Applied, IngestionMachine, MachinePhase, ProtocolViolation};
pub use msg::Msg;
pub use stage::{StageName, StageState, StageStates, StageStatus};
pub use state::{DashboardState, DashboardStep, SubmissionId, SubscriptionId};
pub use status::{decode_snapshot, IngestionStatus, TaskId};
pub use update::update;
pub use upload::{validate_url, FileUpload, UploadPolicy};
pub use view_model::{DashboardView, ProgressView, StageRow};
