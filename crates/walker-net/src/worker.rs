//! Send and receive loops, one OS thread each per connection.
//!
//! Both loops poll: they check their [`CancelToken`] once per iteration and
//! sleep for the spin interval while the client is not `Running`. A loop
//! blocked in socket I/O is only woken by the socket being shut down.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::framing::{Frame, FrameConfig, FrameError, read_frame};
use crate::message::Message;
use crate::queue::MessageQueue;
use crate::shim::OpcodeShim;
use crate::state_machine::{ConnectionState, StateMachine};
use crate::transport::{TransportError, send_all};

/// Cooperative cancellation flag handed to each worker at spawn time.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Failures that end a worker and, with it, the connection.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The handshake frame could not be built.
    #[error("handshake failed: {0}")]
    Handshake(#[source] FrameError),
    /// Writing to the socket failed.
    #[error("send failed: {0}")]
    Send(#[from] TransportError),
    /// Reading a frame failed.
    #[error("recv failed: {0}")]
    Recv(#[from] FrameError),
}

/// Everything a worker shares with the facade.
pub(crate) struct WorkerContext<M> {
    pub(crate) state: StateMachine,
    pub(crate) queue: Arc<MessageQueue<M>>,
    pub(crate) shim: Arc<OpcodeShim>,
    pub(crate) frame: FrameConfig,
}

impl<M> WorkerContext<M> {
    /// Sleep and report `false` while the client is not running.
    fn wait_running(&self) -> bool {
        if self.state.is_in_state(ConnectionState::Running) {
            return true;
        }
        std::thread::sleep(self.state.spin_interval());
        false
    }
}

/// Send the handshake once, then forward queued messages until cancelled.
pub(crate) fn send_loop<M: Message, W: Write>(
    mut writer: W,
    ctx: WorkerContext<M>,
    remote_url: &str,
    cancel: CancelToken,
) -> Result<(), WorkerError> {
    let mut has_sent_url = false;
    let mut body = Vec::new();

    while !cancel.is_cancelled() {
        if !ctx.wait_running() {
            continue;
        }

        if !has_sent_url {
            let handshake = Frame::command(remote_url)
                .encode(&ctx.frame)
                .map_err(WorkerError::Handshake)?;
            send_all(&mut writer, &handshake)?;
            tracing::debug!("sent remote url {remote_url}");
            has_sent_url = true;
        }

        let batch = ctx.queue.take_all();
        if batch.is_empty() {
            std::thread::sleep(ctx.state.spin_interval());
            continue;
        }

        for msg in batch {
            body.clear();
            if let Err(e) = msg.serialize(&mut body) {
                tracing::warn!("Error when serializing msg: {e}, payload: {body:?}");
                continue;
            }

            let remote = match ctx.shim.patch_send(&mut body) {
                Ok(remote) => remote,
                Err(e) => {
                    tracing::warn!("Dropping outbound msg: {e}");
                    continue;
                }
            };

            let frame = Frame::data(std::mem::take(&mut body), msg.is_reliable());
            let bytes = match frame.encode(&ctx.frame) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(opcode = remote, "Dropping outbound msg: {e}");
                    continue;
                }
            };
            send_all(&mut writer, &bytes)?;
            tracing::trace!(opcode = remote, len = bytes.len(), "sent frame");
        }
    }

    Ok(())
}

/// Decode incoming frames into the inbound queue until cancelled.
pub(crate) fn recv_loop<M: Message, R: Read>(
    mut reader: R,
    ctx: WorkerContext<M>,
    cancel: CancelToken,
) -> Result<(), WorkerError> {
    while !cancel.is_cancelled() {
        if !ctx.wait_running() {
            continue;
        }

        let mut body = match read_frame(&mut reader, &ctx.frame)? {
            Frame::Data { body, .. } => body,
            Frame::Command { url } => {
                tracing::debug!("Ignoring command frame ({} bytes)", url.len());
                continue;
            }
        };

        let local = match ctx.shim.patch_recv(&mut body) {
            Ok(local) => local,
            Err(e) => {
                tracing::debug!("Dropping inbound frame: {e}");
                continue;
            }
        };

        if !ctx.shim.allows(local) {
            tracing::trace!(opcode = local, "filtered inbound frame");
            continue;
        }

        match M::deserialize(&body) {
            Ok(msg) => ctx.queue.push(msg),
            Err(e) => {
                tracing::warn!("Error when deserializing msg: {e}, payload: {body:?}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Note, remote_data_frame, shim};
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn running_context() -> WorkerContext<Note> {
        let state = StateMachine::new();
        state.init_transition(|| true).unwrap().join().unwrap();
        WorkerContext {
            state,
            queue: Arc::new(MessageQueue::new("test", 0)),
            shim: shim(),
            frame: FrameConfig::default(),
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_recv_loop_filters_and_keeps_order() {
        let mut wire = Vec::new();
        wire.extend(remote_data_frame(10, b"first", true));
        wire.extend(remote_data_frame(4, b"not allowed", true));
        wire.extend(remote_data_frame(99, b"unmapped", true));
        wire.extend(remote_data_frame(10, b"bad", true));
        wire.extend(Frame::command("ignored").encode(&FrameConfig::default()).unwrap());
        wire.extend(remote_data_frame(3, b"second", false));

        let ctx = running_context();
        let queue = Arc::clone(&ctx.queue);
        let result = recv_loop(Cursor::new(wire), ctx, CancelToken::new());

        // The cursor runs dry after the last frame.
        assert!(matches!(
            result,
            Err(WorkerError::Recv(FrameError::Transport(TransportError::ConnectionBroken)))
        ));
        let mut received = Vec::new();
        queue.drain_into(&mut received);
        assert_eq!(received, vec![Note::new(2, b"first"), Note::new(0, b"second")]);
    }

    #[test]
    fn test_recv_loop_exits_when_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = recv_loop::<Note, _>(Cursor::new(Vec::new()), running_context(), cancel);
        assert!(result.is_ok());
    }

    #[test]
    fn test_send_loop_handshake_then_patched_frames() {
        let ctx = running_context();
        ctx.queue.push(Note::new(2, b"hello"));
        ctx.queue.push(Note::new(2, b"poison"));
        ctx.queue.push(Note::new(42, b"unmapped"));
        ctx.queue.push(Note {
            opcode: 0,
            reliable: false,
            text: b"bye".to_vec(),
        });

        let buf = SharedBuf::default();
        let cancel = CancelToken::new();
        let worker = {
            let buf = buf.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || send_loop(buf, ctx, "10.0.0.1:26676", cancel))
        };

        let mut expected = Frame::command("10.0.0.1:26676")
            .encode(&FrameConfig::default())
            .unwrap();
        expected.extend(remote_data_frame(10, b"hello", true));
        expected.extend(remote_data_frame(3, b"bye", false));

        let deadline = Instant::now() + Duration::from_secs(5);
        while buf.0.lock().unwrap().len() < expected.len() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        cancel.cancel();
        assert!(worker.join().unwrap().is_ok());
        assert_eq!(*buf.0.lock().unwrap(), expected);
    }

    /// Accepts `budget` bytes, then reports a closed peer with `Ok(0)`.
    struct ClosingWriter {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for ClosingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.budget - self.written.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_send_loop_broken_connection_abandons_batch() {
        let handshake = Frame::command("url").encode(&FrameConfig::default()).unwrap();
        let ctx = running_context();
        let queue = Arc::clone(&ctx.queue);
        ctx.queue.push(Note::new(2, b"first"));
        ctx.queue.push(Note::new(0, b"second"));

        let mut writer = ClosingWriter {
            written: Vec::new(),
            budget: handshake.len(),
        };
        let result = send_loop(&mut writer, ctx, "url", CancelToken::new());

        assert!(matches!(
            result,
            Err(WorkerError::Send(TransportError::ConnectionBroken))
        ));
        assert_eq!(writer.written, handshake);
        assert_eq!(queue.len(), 0, "the rest of the batch is not requeued");
    }

    #[test]
    fn test_send_loop_waits_for_running() {
        let state = StateMachine::new();
        let ctx = WorkerContext {
            state: state.clone(),
            queue: Arc::new(MessageQueue::new("test", 0)),
            shim: shim(),
            frame: FrameConfig::default(),
        };
        let buf = SharedBuf::default();
        let cancel = CancelToken::new();
        let worker = {
            let buf = buf.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || send_loop::<Note, _>(buf, ctx, "url", cancel))
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(buf.0.lock().unwrap().is_empty(), "nothing is sent before Running");

        cancel.cancel();
        assert!(worker.join().unwrap().is_ok());
        assert_eq!(state.state(), ConnectionState::Ready);
    }
}
