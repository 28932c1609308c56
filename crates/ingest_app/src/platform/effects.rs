use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use ingest_core::{Effect, Msg};
use ingest_engine::{CredentialStore, EngineConfig, EngineError, EngineEvent, EngineHandle};

/// Executes the effects requested by `update` and turns engine events back
/// into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    credentials: Arc<dyn CredentialStore>,
}

impl EffectRunner {
    pub fn new(
        config: EngineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, EngineError> {
        let engine = EngineHandle::new(config, credentials.clone())?;
        Ok(Self {
            engine,
            credentials,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitFile { submission, file } => {
                    engine_info!(
                        "SubmitFile submission={} file={} len={}",
                        submission,
                        file.filename,
                        file.bytes.len()
                    );
                    self.engine.submit_file(submission, file);
                }
                Effect::SubmitUrl { submission, url } => {
                    engine_info!("SubmitUrl submission={} url={}", submission, url);
                    self.engine.submit_url(submission, url);
                }
                Effect::Subscribe {
                    subscription,
                    task_id,
                } => self.engine.subscribe(subscription, task_id),
                Effect::CloseSubscription { subscription } => self.engine.close(subscription),
                Effect::ClearCredential => {
                    engine_warn!("Server rejected the stored token; clearing it");
                    self.credentials.clear();
                }
                Effect::Ask {
                    question,
                    collection,
                } => self.engine.ask(question, collection),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(to_msg)
    }

    pub fn live_subscriptions(&self) -> usize {
        self.engine.live_subscriptions()
    }
}

pub fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted {
            submission,
            result: Ok(task_id),
        } => Msg::SubmissionAccepted {
            submission,
            task_id,
        },
        EngineEvent::Submitted {
            submission,
            result: Err(error),
        } => {
            engine_warn!("Submission {} failed: {}", submission, error);
            Msg::SubmissionFailed { submission, error }
        }
        EngineEvent::Snapshot {
            subscription,
            status,
        } => Msg::Snapshot {
            subscription,
            status,
        },
        EngineEvent::StreamFailed {
            subscription,
            error,
        } => Msg::StreamFailed {
            subscription,
            error,
        },
        EngineEvent::Answered(result) => Msg::AnswerReceived(result),
    }
}
