use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::firebase::{FirebaseClient, MachineTree, ServerEvent, SseDecoder};
use crate::sync::event::ChangeEvent;
use crate::sync::worker::{self, SensorSink};

/// Connection state of the Firebase subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Connecting,
    Connected,
    Disconnected,
    Stopped,
}

#[derive(Debug, Clone)]
struct SubscriptionOptions {
    path: String,
    reconnect_delay: Duration,
    idle_timeout: Duration,
}

/// Handle to a running sync listener.
///
/// Created once at startup; dropping it does not stop the tasks, call
/// [`SyncHandle::stop`].
pub struct SyncHandle {
    status_tx: Arc<watch::Sender<ListenerState>>,
    status_rx: watch::Receiver<ListenerState>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
    /// Subscribe to state transitions.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ListenerState> {
        self.status_rx.clone()
    }

    #[must_use]
    pub fn state(&self) -> ListenerState {
        *self.status_rx.borrow()
    }

    /// Abort the subscription and the worker. In-flight inserts are dropped.
    pub async fn stop(self) {
        for task in &self.tasks {
            task.abort();
        }
        futures::future::join_all(self.tasks).await;
        self.status_tx.send_replace(ListenerState::Stopped);
        tracing::info!("Sensor sync listener stopped");
    }

    /// Wait until every task finishes on its own, e.g. after the event
    /// source closed its channel.
    pub async fn wait(self) {
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Sensor sync task failed");
            }
        }
        self.status_tx.send_replace(ListenerState::Stopped);
    }
}

/// Start mirroring `machines` from Firebase into `sensor_data`.
///
/// # Errors
///
/// Returns `AppError::Firebase` if the HTTP client cannot be built.
pub fn start(config: &Config, db: Arc<DatabaseConnection>) -> AppResult<SyncHandle> {
    let client = FirebaseClient::new(config)?;
    let options = SubscriptionOptions {
        path: config.firebase_machines_path.clone(),
        reconnect_delay: Duration::from_secs(config.firebase_reconnect_delay_seconds),
        idle_timeout: Duration::from_secs(config.firebase_idle_timeout_seconds),
    };

    let (events_tx, events_rx) = mpsc::channel(config.sync_event_buffer.max(1));
    let (status_tx, status_rx) = watch::channel(ListenerState::Connecting);
    let status_tx = Arc::new(status_tx);

    tracing::info!(
        path = %options.path,
        reconnect_delay_secs = options.reconnect_delay.as_secs(),
        "Starting sensor sync listener"
    );

    let subscription = tokio::spawn(run_subscription(
        client,
        options,
        events_tx,
        status_tx.clone(),
    ));
    let worker = tokio::spawn(worker::run(db, events_rx));

    Ok(SyncHandle {
        status_tx,
        status_rx,
        tasks: vec![subscription, worker],
    })
}

/// Run the worker against an externally fed event channel.
///
/// The listener reports `Connected` right away and finishes once every
/// sender is dropped.
pub fn start_with_events<S: SensorSink>(sink: S, events: mpsc::Receiver<ChangeEvent>) -> SyncHandle {
    let (status_tx, status_rx) = watch::channel(ListenerState::Connected);
    let worker = tokio::spawn(worker::run(sink, events));

    SyncHandle {
        status_tx: Arc::new(status_tx),
        status_rx,
        tasks: vec![worker],
    }
}

enum StreamEnd {
    /// The worker is gone; stop subscribing.
    ReceiverClosed,
    /// The stream ended and should be reopened.
    Closed(String),
}

async fn run_subscription(
    client: FirebaseClient,
    options: SubscriptionOptions,
    events: mpsc::Sender<ChangeEvent>,
    status: Arc<watch::Sender<ListenerState>>,
) {
    // Survives reconnects so a fresh snapshot only reports real changes.
    let mut tree = MachineTree::default();
    let mut reconnects: u64 = 0;

    loop {
        status.send_replace(ListenerState::Connecting);

        match stream_once(&client, &options, &mut tree, &events, &status).await {
            Ok(StreamEnd::ReceiverClosed) => {
                tracing::info!("Event receiver closed, ending Firebase subscription");
                return;
            }
            Ok(StreamEnd::Closed(reason)) => {
                tracing::warn!(reason = %reason, reconnects, "Firebase stream closed");
            }
            Err(e) => {
                tracing::error!(error = %e, reconnects, "Firebase stream failed");
            }
        }

        status.send_replace(ListenerState::Disconnected);
        reconnects += 1;
        tokio::time::sleep(options.reconnect_delay).await;
    }
}

async fn stream_once(
    client: &FirebaseClient,
    options: &SubscriptionOptions,
    tree: &mut MachineTree,
    events: &mpsc::Sender<ChangeEvent>,
    status: &watch::Sender<ListenerState>,
) -> AppResult<StreamEnd> {
    let response = client.open_stream(&options.path).await?;
    status.send_replace(ListenerState::Connected);
    tracing::info!(path = %options.path, "Subscribed to Firebase");

    let mut decoder = SseDecoder::default();
    let stream = response.bytes_stream().timeout(options.idle_timeout);
    tokio::pin!(stream);

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(Ok(chunk)) => chunk,
            Ok(Err(e)) => {
                return Err(AppError::Firebase(format!(
                    "Stream read failed: {}",
                    e.without_url()
                )));
            }
            Err(_) => return Ok(StreamEnd::Closed("idle timeout".to_string())),
        };

        for server_event in decoder.push(&chunk) {
            let changes = match server_event {
                ServerEvent::Put(update) => tree.apply_put(&update.path, update.data),
                ServerEvent::Patch(update) => tree.apply_patch(&update.path, update.data),
                ServerEvent::KeepAlive => continue,
                ServerEvent::Cancel(reason) => {
                    return Ok(StreamEnd::Closed(format!("cancelled by server: {reason}")));
                }
                ServerEvent::AuthRevoked => {
                    return Ok(StreamEnd::Closed("auth revoked".to_string()));
                }
                ServerEvent::Malformed { event, error } => {
                    tracing::warn!(event = %event, error = %error, "Ignoring malformed Firebase event");
                    continue;
                }
                ServerEvent::Overflow => {
                    return Ok(StreamEnd::Closed("event exceeded the size limit".to_string()));
                }
                ServerEvent::Unknown(event) => {
                    tracing::debug!(event = %event, "Ignoring unknown Firebase event");
                    continue;
                }
            };

            for change in changes {
                if events.send(change).await.is_err() {
                    return Ok(StreamEnd::ReceiverClosed);
                }
            }
        }
    }

    Ok(StreamEnd::Closed("server closed the stream".to_string()))
}
