use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use ingest_core::{ClientError, FileUpload, SubmissionId, SubscriptionId, TaskId};

use crate::stream::{ProgressClient, StreamEvent, SubscriptionHandle};
use crate::submit::{ReqwestSubmitter, TaskSubmitter};
use crate::{CredentialStore, EngineConfig, EngineEvent, QuestionClient};

enum EngineCommand {
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
    Close {
        subscription: SubscriptionId,
    },
    Ask {
        question: String,
        collection: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build http client: {0}")]
    Client(#[from] ClientError),
}

type LiveSubscriptions = Arc<Mutex<HashMap<SubscriptionId, SubscriptionHandle>>>;

/// Runs IO on a background thread with its own tokio runtime.
///
/// Commands are executed in the order they were sent, so a `close` always
/// lands before a later `subscribe`.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    live: LiveSubscriptions,
}

impl EngineHandle {
    pub fn new(
        config: EngineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let submitter: Arc<dyn TaskSubmitter> =
            Arc::new(ReqwestSubmitter::new(config.clone(), credentials.clone())?);
        let progress = ProgressClient::new(config.clone(), credentials.clone())?;
        let questions = Arc::new(QuestionClient::new(config, credentials)?);

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let live: LiveSubscriptions = Arc::default();
        let worker = Worker {
            runtime,
            submitter,
            progress,
            questions,
            event_tx,
            live: live.clone(),
        };

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                worker.handle(command);
            }
            worker.shutdown();
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            live,
        })
    }

    pub fn submit_file(&self, submission: SubmissionId, file: FileUpload) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::SubmitFile { submission, file });
    }

    pub fn submit_url(&self, submission: SubmissionId, url: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::SubmitUrl {
            submission,
            url: url.into(),
        });
    }

    pub fn subscribe(&self, subscription: SubscriptionId, task_id: TaskId) {
        let _ = self.cmd_tx.send(EngineCommand::Subscribe {
            subscription,
            task_id,
        });
    }

    /// Idempotent; unknown or finished subscriptions are ignored.
    pub fn close(&self, subscription: SubscriptionId) {
        let _ = self.cmd_tx.send(EngineCommand::Close { subscription });
    }

    pub fn ask(&self, question: impl Into<String>, collection: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Ask {
            question: question.into(),
            collection: collection.into(),
        });
    }

    /// Number of progress streams that are still open.
    pub fn live_subscriptions(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct Worker {
    runtime: tokio::runtime::Runtime,
    submitter: Arc<dyn TaskSubmitter>,
    progress: ProgressClient,
    questions: Arc<QuestionClient>,
    event_tx: mpsc::Sender<EngineEvent>,
    live: LiveSubscriptions,
}

impl Worker {
    fn handle(&self, command: EngineCommand) {
        match command {
            EngineCommand::SubmitFile { submission, file } => {
                let submitter = self.submitter.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = submitter.submit_file(file).await;
                    let _ = event_tx.send(EngineEvent::Submitted { submission, result });
                });
            }
            EngineCommand::SubmitUrl { submission, url } => {
                let submitter = self.submitter.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = submitter.submit_url(&url).await;
                    let _ = event_tx.send(EngineEvent::Submitted { submission, result });
                });
            }
            EngineCommand::Subscribe {
                subscription,
                task_id,
            } => self.subscribe(subscription, task_id),
            EngineCommand::Close { subscription } => {
                let handle = self
                    .live
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&subscription);
                if let Some(handle) = handle {
                    engine_info!("Closing subscription {}", subscription);
                    handle.close();
                }
            }
            EngineCommand::Ask {
                question,
                collection,
            } => {
                let questions = self.questions.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = questions.ask(&question, &collection).await;
                    let _ = event_tx.send(EngineEvent::Answered(result));
                });
            }
        }
    }

    fn subscribe(&self, subscription: SubscriptionId, task_id: TaskId) {
        let mut stream = {
            let _guard = self.runtime.enter();
            self.progress.subscribe(&task_id)
        };
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subscription, stream.handle());

        let event_tx = self.event_tx.clone();
        let live = self.live.clone();
        self.runtime.spawn(async move {
            while let Some(event) = stream.next().await {
                let event = match event {
                    StreamEvent::Snapshot(status) => EngineEvent::Snapshot {
                        subscription,
                        status,
                    },
                    StreamEvent::Failed(error) => EngineEvent::StreamFailed {
                        subscription,
                        error,
                    },
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            engine_debug!("Subscription {} drained", subscription);
            live.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&subscription);
        });
    }

    fn shutdown(self) {
        let handles: Vec<_> = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for handle in handles {
            handle.close();
        }
        self.runtime.shutdown_background();
    }
}
