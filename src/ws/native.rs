//! Native WebSocket client: background tokio task over a [`Connector`].
//!
//! - One socket at a time, owned by the task
//! - Fixed-delay reconnect after every unrequested close, with no attempt ceiling
//! - Identity handshake on open
//! - Inbound text frames dispatched inline, in transport order
//! - Sends gated on the socket being open (never queued)
//! - Stream-based event delivery to consumer

use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::WsError;
use crate::storage::IdentityProvider;
use crate::ws::transport::{
    CloseInfo, Connection, Connector, Frame, FrameSink, FrameStream, TungsteniteConnector,
};
use crate::ws::{Dispatcher, MessageOut, ReadyState, WsConfig, WsEvent};

/// Upper bound on how long `disconnect()` waits for the task to wind down.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Commands from public API to background task ─────────────────────────────

enum Command {
    Send(String),
    ReconnectNow,
    Disconnect,
}

// ─── Disconnect reasons for reconnection decision ────────────────────────────

enum DisconnectReason {
    UserRequested,
    Closed { code: Option<u16>, reason: String },
}

enum Attempt {
    Connected(Connection),
    Failed(WsError),
    Cancelled,
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    config: WsConfig,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    identity: Option<Arc<dyn IdentityProvider>>,
    event_tx: mpsc::Sender<WsEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    ready_state: Arc<AtomicU8>,
}

impl TaskState {
    fn emit(&self, event: WsEvent) {
        let _ = self.event_tx.try_send(event);
    }

    fn set_ready_state(&self, state: ReadyState) {
        self.ready_state.store(state as u8, Ordering::SeqCst);
    }
}

// ─── Public WsClient ─────────────────────────────────────────────────────────

/// Native WebSocket client.
///
/// Uses a background tokio task for connection management.
/// The public API communicates with it via mpsc channels.
pub struct WsClient {
    config: WsConfig,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    identity: Option<Arc<dyn IdentityProvider>>,
    cmd_tx: Option<mpsc::Sender<Command>>,
    event_rx: tokio::sync::Mutex<mpsc::Receiver<WsEvent>>,
    event_tx: mpsc::Sender<WsEvent>,
    task_handle: Option<JoinHandle<()>>,
    ready_state: Arc<AtomicU8>,
}

impl WsClient {
    /// Client over `tokio-tungstenite` feeding the global price store.
    /// Does not connect yet.
    pub fn new(config: WsConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector), Dispatcher::default())
    }

    /// Client with an explicit transport and dispatcher. Does not connect yet.
    pub fn with_connector(
        config: WsConfig,
        connector: Arc<dyn Connector>,
        dispatcher: Dispatcher,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        Self {
            config,
            connector,
            dispatcher,
            identity: None,
            cmd_tx: None,
            event_rx: tokio::sync::Mutex::new(event_rx),
            event_tx,
            task_handle: None,
            ready_state: Arc::new(AtomicU8::new(ReadyState::Closed as u8)),
        }
    }

    /// Send a `connect` handshake with this identity on every open.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Connect to the WebSocket server.
    ///
    /// No-op while the socket is open or an attempt is in flight. If the task
    /// is waiting out a reconnect delay, the wait is cut short and the attempt
    /// starts now. Otherwise spawns the background task.
    pub async fn connect(&mut self) -> Result<(), WsError> {
        match self.ready_state() {
            ReadyState::Open | ReadyState::Connecting => {
                tracing::debug!("WebSocket already {}, ignoring connect", self.ready_state());
                return Ok(());
            }
            ReadyState::Closing | ReadyState::Closed => {}
        }

        let task_alive = self
            .task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        if let (true, Some(tx)) = (task_alive, &self.cmd_tx) {
            self.set_ready_state(ReadyState::Connecting);
            match tx.try_send(Command::ReconnectNow) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.set_ready_state(ReadyState::Closed);
                    return Err(WsError::SendFailed("Command channel full".into()));
                }
                // Task exited between the check and the send; spawn a fresh one.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(self.config.command_channel_capacity.max(1));
        self.cmd_tx = Some(cmd_tx);
        self.set_ready_state(ReadyState::Connecting);

        let state = TaskState {
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            dispatcher: self.dispatcher.clone(),
            identity: self.identity.clone(),
            event_tx: self.event_tx.clone(),
            cmd_rx,
            ready_state: Arc::clone(&self.ready_state),
        };

        let handle = tokio::spawn(run_task(state));
        if let Some(old) = self.task_handle.replace(handle) {
            old.abort();
        }

        Ok(())
    }

    /// Disconnect from the WebSocket server.
    ///
    /// Closes the socket with code 1000, cancels any pending reconnect and
    /// waits for the background task to finish. No reconnect fires afterwards.
    pub async fn disconnect(&mut self) -> Result<(), WsError> {
        if matches!(self.ready_state(), ReadyState::Open | ReadyState::Connecting) {
            self.set_ready_state(ReadyState::Closing);
        }

        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Disconnect).await;
        }

        if let Some(mut handle) = self.task_handle.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut handle).await.is_err() {
                tracing::warn!("WebSocket task did not stop in time, aborting");
                handle.abort();
            }
        }

        self.set_ready_state(ReadyState::Closed);
        Ok(())
    }

    /// Serialize and send a message to the server.
    ///
    /// Only transmits while the socket is open. Otherwise the message is
    /// logged and dropped and `WsError::NotConnected` is returned.
    pub fn send<T: Serialize + ?Sized>(&self, msg: &T) -> Result<(), WsError> {
        if !self.is_connected() {
            tracing::warn!(
                "Dropping outbound message: WebSocket is {}",
                self.ready_state()
            );
            return Err(WsError::NotConnected);
        }

        let json = serde_json::to_string(msg).map_err(|e| WsError::SendFailed(e.to_string()))?;
        match &self.cmd_tx {
            Some(tx) => tx.try_send(Command::Send(json)).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    WsError::SendFailed("Command channel full".into())
                }
                mpsc::error::TrySendError::Closed(_) => WsError::NotConnected,
            }),
            None => Err(WsError::NotConnected),
        }
    }

    /// Whether the WebSocket is currently open.
    pub fn is_connected(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Current connection state.
    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from(self.ready_state.load(Ordering::SeqCst))
    }

    fn set_ready_state(&self, state: ReadyState) {
        self.ready_state.store(state as u8, Ordering::SeqCst);
    }

    /// Get a stream of events from the WebSocket connection.
    ///
    /// The returned stream borrows `self`, so it must be dropped
    /// before calling `connect()` or `disconnect()`.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = WsEvent> + Send + '_>> {
        Box::pin(futures_util::stream::unfold(
            &self.event_rx,
            |rx| async move {
                let mut guard = rx.lock().await;
                guard.recv().await.map(|event| (event, rx))
            },
        ))
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for WsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsClient")
            .field("url", &self.config.url)
            .field("ready_state", &self.ready_state())
            .finish_non_exhaustive()
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    loop {
        // ── 1. Attempt connection ────────────────────────────────────────
        state.set_ready_state(ReadyState::Connecting);
        tracing::info!("Connecting to {}", state.config.url);

        let Connection { mut sink, stream } = match attempt_connect(&mut state).await {
            Attempt::Connected(connection) => connection,
            Attempt::Failed(e) => {
                tracing::error!("WebSocket connection failed: {}", e);
                state.set_ready_state(ReadyState::Closed);
                state.emit(WsEvent::Disconnected {
                    code: None,
                    reason: format!("Connection failed: {}", e),
                });
                if wait_for_reconnect(&mut state).await {
                    continue;
                }
                return;
            }
            Attempt::Cancelled => {
                state.set_ready_state(ReadyState::Closed);
                return;
            }
        };

        // ── 2. Connected ─────────────────────────────────────────────────
        state.set_ready_state(ReadyState::Open);
        tracing::info!("WebSocket connected to {}", state.config.url);
        state.emit(WsEvent::Connected);

        send_handshake(&state, &mut sink).await;

        // ── 3. Inner select! loop ────────────────────────────────────────
        let reason = run_connected(&mut state, sink, stream).await;

        // ── 4. Post-disconnect decision ──────────────────────────────────
        state.set_ready_state(ReadyState::Closed);

        match reason {
            DisconnectReason::UserRequested => return,
            DisconnectReason::Closed { code, reason } => {
                tracing::info!("WebSocket closed: code={:?} reason={}", code, reason);
                state.emit(WsEvent::Disconnected { code, reason });
                if !wait_for_reconnect(&mut state).await {
                    return;
                }
            }
        }
    }
}

/// The inner connected loop. Runs until the connection breaks.
async fn run_connected(
    state: &mut TaskState,
    mut sink: FrameSink,
    mut stream: FrameStream,
) -> DisconnectReason {
    loop {
        tokio::select! {
            // ── a) Incoming frame ────────────────────────────────────────
            frame = stream.next() => {
                match frame {
                    Some(Ok(Frame::Text(text))) => {
                        for event in state.dispatcher.handle_text(&text) {
                            state.emit(event);
                        }
                    }
                    Some(Ok(Frame::Ping(data))) => {
                        let _ = sink.send(Frame::Pong(data)).await;
                    }
                    Some(Ok(Frame::Pong(_))) | Some(Ok(Frame::Binary(_))) => {}
                    Some(Ok(Frame::Close(info))) => {
                        let (code, reason) = extract_close(info.as_ref());
                        return DisconnectReason::Closed { code: Some(code), reason };
                    }
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        let _ = sink.close().await;
                        return DisconnectReason::Closed { code: None, reason: e.to_string() };
                    }
                    None => {
                        return DisconnectReason::Closed {
                            code: None,
                            reason: "Stream ended".into(),
                        };
                    }
                }
            }

            // ── b) Command from public API ───────────────────────────────
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Send(json)) => {
                        if let Err(e) = sink.send(Frame::Text(json)).await {
                            tracing::warn!("Send failed, message dropped: {}", e);
                        }
                    }
                    Some(Command::ReconnectNow) => {}
                    Some(Command::Disconnect) => {
                        state.set_ready_state(ReadyState::Closing);
                        let _ = sink
                            .send(Frame::Close(Some(CloseInfo::normal("Client disconnect"))))
                            .await;
                        let _ = sink.close().await;
                        return DisconnectReason::UserRequested;
                    }
                    None => {
                        // WsClient dropped
                        return DisconnectReason::UserRequested;
                    }
                }
            }
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Open a socket, bounded by the connect timeout. Commands are still served
/// so a `disconnect()` issued mid-attempt abandons it.
async fn attempt_connect(state: &mut TaskState) -> Attempt {
    let connector = Arc::clone(&state.connector);
    let url = state.config.url.clone();
    let connect = tokio::time::timeout(state.config.connect_timeout(), connector.connect(&url));
    tokio::pin!(connect);

    loop {
        tokio::select! {
            result = &mut connect => {
                return match result {
                    Ok(Ok(connection)) => Attempt::Connected(connection),
                    Ok(Err(e)) => Attempt::Failed(e),
                    Err(_) => Attempt::Failed(WsError::Timeout),
                };
            }
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Disconnect) | None => return Attempt::Cancelled,
                    Some(Command::ReconnectNow) => {}
                    Some(Command::Send(_)) => {
                        tracing::warn!("Dropping outbound message: WebSocket is connecting");
                    }
                }
            }
        }
    }
}

/// Wait out the fixed reconnect delay. Returns `false` when the task should stop.
async fn wait_for_reconnect(state: &mut TaskState) -> bool {
    if !state.config.reconnect {
        tracing::info!("Reconnect disabled, WebSocket task exiting");
        return false;
    }

    let delay_ms = state.config.reconnect_delay_ms;
    tracing::info!("Reconnecting in {}ms", delay_ms);
    state.emit(WsEvent::Reconnecting { delay_ms });

    let sleep = tokio::time::sleep(state.config.reconnect_delay());
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return true,
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::ReconnectNow) => {
                        tracing::info!("Reconnect requested, skipping remaining delay");
                        return true;
                    }
                    Some(Command::Send(_)) => {
                        tracing::warn!("Dropping outbound message: WebSocket is closed");
                    }
                    Some(Command::Disconnect) | None => return false,
                }
            }
        }
    }
}

/// Announce the cached user, if any. Failures are logged and the socket stays up.
async fn send_handshake(state: &TaskState, sink: &mut FrameSink) {
    let Some(identity) = &state.identity else {
        return;
    };

    let user_id = match identity.cached_user_id() {
        Ok(Some(user_id)) => user_id,
        Ok(None) => {
            tracing::debug!("No cached user, skipping connect handshake");
            return;
        }
        Err(e) => {
            tracing::warn!("Failed to read cached user: {}", e);
            return;
        }
    };

    let json = match serde_json::to_string(&MessageOut::connect(user_id)) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to serialize connect handshake: {}", e);
            return;
        }
    };
    if let Err(e) = sink.send(Frame::Text(json)).await {
        tracing::warn!("Failed to send connect handshake: {}", e);
    }
}

/// Extract close code and reason from an optional close frame.
fn extract_close(info: Option<&CloseInfo>) -> (u16, String) {
    match info {
        Some(info) => (info.code, info.reason.clone()),
        None => (1006, "No close frame".into()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
