use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use ingest_core::{decode_snapshot, ClientError, IngestionStatus, TaskId};
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::http::{build_client, check_status, map_reqwest_error, require_credential};
use crate::sse::SseDecoder;
use crate::{CredentialStore, EngineConfig};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Snapshot(IngestionStatus),
    /// `Protocol` failures leave the stream running; every other variant is
    /// the last event of the subscription.
    Failed(ClientError),
}

/// Cancels a [`Subscription`]. Cheap to clone; `close` is idempotent.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub fn close(&self) {
        if !self.token.is_cancelled() {
            engine_debug!("Closing progress subscription");
        }
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Server-ordered progress events for one task.
#[derive(Debug)]
pub struct Subscription {
    task_id: TaskId,
    handle: SubscriptionHandle,
    events: mpsc::Receiver<StreamEvent>,
}

impl Subscription {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    pub fn close(&mut self) {
        self.handle.close();
        self.events.close();
    }

    /// Next event, or `None` once the stream ended or was closed. Events
    /// still buffered at the time of `close` are dropped.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.handle.is_closed() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.handle.token.cancelled() => None,
            event = self.events.recv() => event,
        }
    }
}

/// Opens server-push progress subscriptions.
pub struct ProgressClient {
    config: EngineConfig,
    credentials: Arc<dyn CredentialStore>,
    client: reqwest::Client,
}

impl ProgressClient {
    pub fn new(
        config: EngineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        // No overall timeout: the stream lives as long as the task does.
        let client = build_client(config.connect_timeout, None)?;
        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    /// Starts a subscription and returns at once; failures arrive as events.
    ///
    /// Must be called from within a tokio runtime unless the credential is
    /// missing or the endpoint cannot be built.
    pub fn subscribe(&self, task_id: &TaskId) -> Subscription {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let token = CancellationToken::new();
        let subscription = Subscription {
            task_id: task_id.clone(),
            handle: SubscriptionHandle {
                token: token.clone(),
            },
            events: rx,
        };

        let url = match self.stream_url(task_id) {
            Ok(url) => url,
            Err(err) => {
                engine_warn!("Not subscribing to task {}: {}", task_id, err);
                let _ = tx.try_send(StreamEvent::Failed(err));
                return subscription;
            }
        };

        engine_info!("Subscribing to progress of task {}", task_id);
        let client = self.client.clone();
        let stall_timeout = self.config.stall_timeout;
        let task_id = task_id.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    engine_debug!("Progress stream for task {} cancelled", task_id);
                }
                _ = pump(client, url, stall_timeout, &tx) => {
                    engine_debug!("Progress stream for task {} finished", task_id);
                }
            }
        });
        subscription
    }

    fn stream_url(&self, task_id: &TaskId) -> Result<reqwest::Url, ClientError> {
        let credential = require_credential(self.credentials.as_ref())?;
        let mut url = self.config.endpoint("process-status")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("api base url cannot have a path".into()))?
            .push(task_id.as_str());
        // Push channels cannot carry an Authorization header.
        url.query_pairs_mut()
            .append_pair("token", credential.expose());
        Ok(url)
    }
}

enum Flow {
    Continue,
    Stop,
}

async fn pump(
    client: reqwest::Client,
    url: reqwest::Url,
    stall_timeout: Option<Duration>,
    tx: &mpsc::Sender<StreamEvent>,
) {
    if let Err(err) = read_stream(client, url, stall_timeout, tx).await {
        engine_warn!("Progress stream failed: {}", err);
        let _ = tx.send(StreamEvent::Failed(err)).await;
    }
}

async fn read_stream(
    client: reqwest::Client,
    url: reqwest::Url,
    stall_timeout: Option<Duration>,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), ClientError> {
    let request = client.get(url).header(ACCEPT, "text/event-stream").send();
    let response = within(stall_timeout, request)
        .await?
        .map_err(map_reqwest_error)?;
    let response = check_status(response).await?;

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = within(stall_timeout, body.next()).await? {
        let chunk = chunk.map_err(map_reqwest_error)?;
        for payload in decoder.push(&chunk) {
            if let Flow::Stop = deliver(&payload, tx).await {
                return Ok(());
            }
        }
    }
    if let Some(payload) = decoder.finish() {
        if let Flow::Stop = deliver(&payload, tx).await {
            return Ok(());
        }
    }

    Err(ClientError::Network(
        "progress stream closed before completion".to_string(),
    ))
}

async fn deliver(payload: &str, tx: &mpsc::Sender<StreamEvent>) -> Flow {
    let (event, last) = match decode_snapshot(payload) {
        Ok(status) => {
            let complete = status.is_complete;
            (StreamEvent::Snapshot(status), complete)
        }
        Err(err) => {
            engine_warn!("Skipping progress payload: {}", err);
            (StreamEvent::Failed(err), false)
        }
    };
    // A dropped receiver means nobody is listening any more.
    if tx.send(event).await.is_err() || last {
        Flow::Stop
    } else {
        Flow::Continue
    }
}

async fn within<F: Future>(limit: Option<Duration>, future: F) -> Result<F::Output, ClientError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| ClientError::Stalled {
                idle_secs: limit.as_secs(),
            }),
        None => Ok(future.await),
    }
}
