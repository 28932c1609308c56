//! Ingest engine: HTTP clients for the ingestion service and effect execution.
mod ask;
mod config;
mod credentials;
mod engine;
mod http;
mod sse;
mod stream;
mod submit;
mod types;

pub use ask::QuestionClient;
pub use config::EngineConfig;
pub use credentials::{
    Credential, CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore,
};
pub use engine::{EngineError, EngineHandle};
pub use sse::SseDecoder;
pub use stream::{ProgressClient, StreamEvent, Subscription, SubscriptionHandle};
pub use submit::{ReqwestSubmitter, TaskSubmitter};
pub use types::EngineEvent;
