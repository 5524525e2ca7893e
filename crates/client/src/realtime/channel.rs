//! WebSocket connection task with bounded reconnects.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use talent_ops_core::realtime::{Envelope, MessageKind, OutboundMessage, Topic, notice_for};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::handlers::{HandlerId, HandlerRegistry};
use super::reconnect::ReconnectPolicy;
use super::{ChannelStatus, RealtimeError};
use crate::config::ReconnectConfig;
use crate::notify::Notifier;

/// Realtime notification channel.
///
/// Cheap to clone; clones share the connection, the handlers and the status.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    ws_url: Url,
    reconnect: ReconnectConfig,
    handlers: HandlerRegistry,
    notifier: Arc<dyn Notifier>,
    status: watch::Sender<ChannelStatus>,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<String>,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("ws_url", &self.inner.ws_url.as_str())
            .field("status", &self.status())
            .field("handlers", &self.inner.handlers)
            .finish_non_exhaustive()
    }
}

impl RealtimeChannel {
    #[must_use]
    pub fn new(ws_url: Url, reconnect: ReconnectConfig, notifier: Arc<dyn Notifier>) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Idle);
        Self {
            inner: Arc::new(ChannelInner {
                ws_url,
                reconnect,
                handlers: HandlerRegistry::new(),
                notifier,
                status,
                worker: Mutex::new(None),
            }),
        }
    }

    /// Start the connection task. Does nothing while a task is already
    /// connecting, open or waiting to reconnect.
    ///
    /// The token, if any, is passed as the `token` query parameter.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::NoRuntime` when called outside a Tokio runtime.
    pub fn connect(&self, token: Option<&SecretString>) -> Result<(), RealtimeError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| RealtimeError::NoRuntime)?;

        let mut worker = self.inner.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            tracing::debug!("Realtime channel already running");
            return Ok(());
        }

        let mut url = self.inner.ws_url.clone();
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("token", token.expose_secret());
        }

        let cancel = CancellationToken::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        self.inner.status.send_replace(ChannelStatus::Connecting);
        let handle = runtime.spawn(run(
            Arc::clone(&self.inner),
            url,
            cancel.clone(),
            outbound_rx,
        ));

        *worker = Some(Worker {
            cancel,
            outbound,
            handle,
        });
        Ok(())
    }

    /// Stop the connection task and any pending reconnect.
    pub fn disconnect(&self) {
        if let Some(worker) = self.inner.worker.lock().take() {
            worker.cancel.cancel();
            tracing::info!("Realtime channel disconnected");
        }
        self.inner.status.send_replace(ChannelStatus::Closed);
    }

    /// Register a handler for `topic`.
    pub fn on<F>(&self, topic: Topic, handler: F) -> HandlerId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.inner.handlers.on(topic, handler)
    }

    /// Remove a handler. Unknown ids are ignored.
    pub fn off(&self, topic: &Topic, id: HandlerId) -> bool {
        self.inner.handlers.off(topic, id)
    }

    /// Send a message if the connection is open. Otherwise the message is
    /// dropped with a warning; nothing is queued. Returns whether it was
    /// handed to the connection.
    pub fn send(&self, kind: MessageKind, data: serde_json::Value) -> bool {
        if !self.status().is_open() {
            tracing::warn!(kind = %kind, "Realtime channel is not connected, dropping message");
            return false;
        }

        let text = match serde_json::to_string(&OutboundMessage { kind, data }) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode realtime message");
                return false;
            }
        };

        let worker = self.inner.worker.lock();
        match worker.as_ref() {
            Some(worker) => worker.outbound.send(text).is_ok(),
            None => false,
        }
    }

    /// Parse and dispatch one inbound frame, as the connection task does.
    ///
    /// Malformed frames are logged and dropped. Returns whether the frame was
    /// a valid envelope.
    pub fn dispatch_raw(&self, text: &str) -> bool {
        self.inner.dispatch_raw(text)
    }

    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        self.inner.status.borrow().clone()
    }

    /// Watch status changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<ChannelStatus> {
        self.inner.status.subscribe()
    }
}

impl ChannelInner {
    fn set_status(&self, status: ChannelStatus) {
        self.status.send_replace(status);
    }

    fn dispatch_raw(&self, text: &str) -> bool {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse realtime message");
                return false;
            }
        };

        let handled = self.handlers.dispatch(&envelope);
        tracing::debug!(kind = %envelope.kind, handled, "Realtime message dispatched");

        if let Some(notice) = notice_for(&envelope) {
            self.notifier.notify(notice);
        }
        true
    }
}

/// Connect, pump frames until the socket closes, then reconnect on a fixed
/// delay until the attempt budget runs out or the task is cancelled.
async fn run(
    inner: Arc<ChannelInner>,
    url: Url,
    cancel: CancellationToken,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let mut policy = ReconnectPolicy::new(inner.reconnect);
    let endpoint = redacted(&url);

    loop {
        let connected = tokio::select! {
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
            () = cancel.cancelled() => break,
        };

        match connected {
            Ok((stream, _response)) => {
                policy.on_open();
                inner.set_status(ChannelStatus::Open);
                tracing::info!(endpoint = %endpoint, "Realtime channel connected");

                if pump(&inner, stream, &cancel, &mut outbound).await {
                    break;
                }
                tracing::info!("Realtime channel closed");
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Realtime connection failed");
            }
        }

        let Some(delay) = policy.next_delay() else {
            tracing::info!(
                attempts = policy.max_attempts(),
                "Max reconnect attempts reached, giving up"
            );
            inner.set_status(ChannelStatus::GaveUp);
            return;
        };

        let attempt = policy.attempts();
        inner.set_status(ChannelStatus::Reconnecting { attempt });
        tracing::info!(
            attempt,
            max = policy.max_attempts(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Attempting to reconnect"
        );

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => break,
        }
    }

    inner.set_status(ChannelStatus::Closed);
}

/// Returns `true` if the task was cancelled, `false` if the socket closed.
async fn pump<S>(
    inner: &ChannelInner,
    stream: tokio_tungstenite::WebSocketStream<S>,
    cancel: &CancellationToken,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> bool
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    tracing::debug!(error = %e, "Failed to send close frame");
                }
                return true;
            }
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    inner.dispatch_raw(&text);
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Server closed realtime channel");
                    return false;
                }
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::debug!(len = bytes.len(), "Ignoring binary realtime frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Realtime channel error");
                    return false;
                }
                None => return false,
            },
            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::warn!(error = %e, "Failed to send realtime message");
                    return false;
                }
            }
        }
    }
}

/// The URL without its query string, so tokens never reach the logs.
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
