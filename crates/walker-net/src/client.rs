//! Client facade: one TCP connection to the bridge, two workers, two queues.
//!
//! ```text
//! send(msg) -> outbound queue -> send worker -> shim -> frame -> socket
//! socket -> recv worker -> frame -> shim -> allow-list -> inbound queue -> recv()
//! ```
//!
//! Start and stop run as state machine transitions on their own threads.
//! Per-message problems are logged and skipped; a broken socket stops the
//! whole client. Nothing reconnects on its own: a stopped client stays
//! stopped, and a new one must be built.

use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::framing::FrameConfig;
use crate::lock;
use crate::message::Message;
use crate::platform::{SocketConfig, connect};
use crate::queue::MessageQueue;
use crate::shim::OpcodeShim;
use crate::state_machine::{ConnectionState, SPIN_INTERVAL, StateMachine, StateMask};
use crate::worker::{CancelToken, WorkerContext, recv_loop, send_loop};

/// Where to connect and how to behave once connected.
#[derive(Debug, Clone)]
pub struct ClientParams {
    /// Host of the local bridge.
    pub local_host: String,
    /// Port of the local bridge.
    pub local_port: u16,
    /// Server the bridge should reach, sent in the handshake frame.
    pub remote_url: String,
    /// Polling interval of the state machine and both workers.
    pub spin_interval: Duration,
    /// Queue length that triggers a backlog warning. 0 disables it.
    pub queue_warning_level: usize,
    /// Framing limits.
    pub frame: FrameConfig,
    /// Socket options.
    pub socket: SocketConfig,
}

impl ClientParams {
    /// Parameters with default polling, framing and socket settings.
    pub fn new(
        local_host: impl Into<String>,
        local_port: u16,
        remote_url: impl Into<String>,
    ) -> Self {
        Self {
            local_host: local_host.into(),
            local_port,
            remote_url: remote_url.into(),
            spin_interval: SPIN_INTERVAL,
            queue_warning_level: 1024,
            frame: FrameConfig::default(),
            socket: SocketConfig::default(),
        }
    }
}

/// Errors that make the start transition fail.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// `host:port` that was tried.
        addr: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// The live socket and the workers using it.
struct Connection {
    stream: TcpStream,
    cancel: CancelToken,
    workers: Vec<JoinHandle<()>>,
}

struct Shared<M> {
    params: ClientParams,
    shim: Arc<OpcodeShim>,
    state: StateMachine,
    outbound: Arc<MessageQueue<M>>,
    inbound: Arc<MessageQueue<M>>,
    connection: Mutex<Option<Connection>>,
}

impl<M: Message> Shared<M> {
    fn context(&self, queue: &Arc<MessageQueue<M>>) -> WorkerContext<M> {
        WorkerContext {
            state: self.state.clone(),
            queue: Arc::clone(queue),
            shim: Arc::clone(&self.shim),
            frame: self.params.frame.clone(),
        }
    }

    /// Body of the start transition.
    fn start_workers(self: &Arc<Self>) -> Result<(), ClientError> {
        let stream = connect(&self.params.local_host, self.params.local_port, &self.params.socket)
            .map_err(|source| ClientError::Connect {
                addr: format!("{}:{}", self.params.local_host, self.params.local_port),
                source,
            })?;

        let cancel = CancelToken::new();
        let mut connection = Connection {
            stream,
            cancel: cancel.clone(),
            workers: Vec::with_capacity(2),
        };

        if let Err(e) = self.spawn_workers(&mut connection) {
            Self::close(connection);
            return Err(e);
        }

        *lock(&self.connection) = Some(connection);
        Ok(())
    }

    fn spawn_workers(self: &Arc<Self>, connection: &mut Connection) -> Result<(), ClientError> {
        let writer = connection.stream.try_clone().map_err(ClientError::Spawn)?;
        let reader = connection.stream.try_clone().map_err(ClientError::Spawn)?;

        let shared = Arc::clone(self);
        let cancel = connection.cancel.clone();
        let sender = std::thread::Builder::new()
            .name("walker-send".into())
            .spawn(move || {
                let ctx = shared.context(&shared.outbound);
                let result = send_loop(writer, ctx, &shared.params.remote_url, cancel.clone());
                shared.on_worker_exit("send", result, &cancel);
            })
            .map_err(ClientError::Spawn)?;
        connection.workers.push(sender);

        let shared = Arc::clone(self);
        let cancel = connection.cancel.clone();
        let receiver = std::thread::Builder::new()
            .name("walker-recv".into())
            .spawn(move || {
                let ctx = shared.context(&shared.inbound);
                let result = recv_loop(reader, ctx, cancel.clone());
                shared.on_worker_exit("recv", result, &cancel);
            })
            .map_err(ClientError::Spawn)?;
        connection.workers.push(receiver);

        Ok(())
    }

    fn on_worker_exit<E: std::fmt::Display>(
        self: &Arc<Self>,
        side: &str,
        result: Result<(), E>,
        cancel: &CancelToken,
    ) {
        match result {
            Ok(()) => tracing::debug!("{side} worker exited"),
            Err(e) if cancel.is_cancelled() => tracing::debug!("{side} worker closed: {e}"),
            Err(e) => {
                tracing::warn!("Error in {side} worker: {e}");
                self.request_stop();
            }
        }
    }

    /// Body of the stop transition: close the socket, cancel, join.
    fn stop_workers(&self) {
        let connection = lock(&self.connection).take();
        if let Some(connection) = connection {
            tracing::info!("Closing connection...");
            Self::close(connection);
        }
        tracing::info!("Stopped.");
    }

    fn close(connection: Connection) {
        let _ = connection.stream.shutdown(Shutdown::Both);
        tracing::info!("Stopping workers...");
        connection.cancel.cancel();
        for worker in connection.workers {
            let _ = worker.join();
        }
    }

    fn request_stop(self: &Arc<Self>) -> bool {
        let shared = Arc::clone(self);
        match self.state.stop_transition(move || shared.stop_workers()) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Failed to spawn stop transition: {e}");
                false
            }
        }
    }
}

/// Client connection to a bridge speaking the framed protocol.
///
/// Owned by exactly one caller; share it by reference. Dropping a client
/// stops it and waits until it is stopped.
pub struct WalkerClient<M: Message> {
    shared: Arc<Shared<M>>,
}

impl<M: Message> WalkerClient<M> {
    /// Create a client in the `Ready` state. Nothing is connected until
    /// [`start`](Self::start).
    pub fn new(params: ClientParams, shim: Arc<OpcodeShim>) -> Self {
        let warning_level = params.queue_warning_level;
        let state = StateMachine::with_spin_interval(params.spin_interval);
        tracing::info!(
            "Created client for {}:{} -> {}",
            params.local_host,
            params.local_port,
            params.remote_url
        );
        Self {
            shared: Arc::new(Shared {
                params,
                shim,
                state,
                outbound: Arc::new(MessageQueue::new("Send", warning_level)),
                inbound: Arc::new(MessageQueue::new("Recv", warning_level)),
                connection: Mutex::new(None),
            }),
        }
    }

    /// Begin `Ready → Running` in the background. No-op once started.
    pub fn start(&self) {
        let shared = Arc::clone(&self.shared);
        let result = self.shared.state.init_transition(move || match shared.start_workers() {
            Ok(()) => {
                tracing::info!("Started.");
                true
            }
            Err(e) => {
                tracing::warn!("Fail to start. Reason: {e}");
                false
            }
        });
        if let Err(e) = result {
            tracing::warn!("Failed to spawn start transition: {e}");
        }
    }

    /// Begin `→ Stopped` in the background: close the socket, then join
    /// both workers.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Queue `msg` for sending. Dropped silently unless running.
    pub fn send(&self, msg: M) {
        if self.shared.state.is_in_state(ConnectionState::Running) {
            self.shared.outbound.push(msg);
        }
    }

    /// Move every received message into `collector`. No-op unless running.
    pub fn recv<C: Extend<M>>(&self, collector: &mut C) {
        if self.shared.state.is_in_state(ConnectionState::Running) {
            self.shared.inbound.drain_into(collector);
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.state()
    }

    /// Whether the current state is in `mask`.
    pub fn is_in_state(&self, mask: impl Into<StateMask>) -> bool {
        self.shared.state.is_in_state(mask)
    }

    /// Poll until the current state is in `mask`.
    pub fn spin_until(&self, mask: impl Into<StateMask>) {
        self.shared.state.spin_until(mask)
    }

    /// Connection parameters.
    pub fn params(&self) -> &ClientParams {
        &self.shared.params
    }
}

impl<M: Message> Drop for WalkerClient<M> {
    fn drop(&mut self) {
        if self.is_in_state(ConnectionState::Stopped) || self.shared.request_stop() {
            self.spin_until(ConnectionState::Stopped);
        }
    }
}
