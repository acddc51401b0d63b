//! Client side of the ShadowWalker bridge protocol.
//!
//! A [`WalkerClient`] holds one TCP connection to a local bridge process.
//! Outgoing messages are queued, translated to the server's opcode numbering
//! by an [`OpcodeShim`], framed and written by a send worker. Incoming frames
//! are read by a receive worker, translated back, filtered by an
//! [`AllowList`], decoded and queued until the caller drains them.
//!
//! The lifecycle is a three-state machine (`Ready → Running → Stopped`)
//! whose transitions run on their own threads, so `start` and `stop` never
//! block the caller.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod client;
pub mod framing;
pub mod message;
pub mod platform;
mod queue;
pub mod shim;
pub mod state_machine;
pub mod transport;
pub mod worker;

#[cfg(test)]
mod testing;

pub use client::{ClientError, ClientParams, WalkerClient};
pub use framing::{FRAME_SIZE_LIMIT, Frame, FrameConfig, FrameError, read_frame, write_frame};
pub use message::Message;
pub use platform::SocketConfig;
pub use shim::{
    AllowList, OpcodeMap, OpcodeMapError, OpcodeShim, PatchError, PatchHook, PatchRegistry,
    ShimError,
};
pub use state_machine::{ConnectionState, SPIN_INTERVAL, StateMachine, StateMask};
pub use transport::TransportError;
pub use worker::{CancelToken, WorkerError};

/// Lock `mutex`, recovering the guard if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
