//! Length-prefixed framing for the client/bridge TCP stream.
//!
//! Every frame starts with a little-endian `u32` giving the number of bytes
//! that follow it, then a one-byte kind discriminator. The rest depends on the
//! kind:
//!
//! ```text
//! data frame:
//! +------------------+----------+--------------+-----------------+
//! | total (u32 LE)   | kind = 0 | reliable u8  | body            |
//! | body + 1 + 1     |          | 0 or 1       | (opcode first)  |
//! +------------------+----------+--------------+-----------------+
//!
//! command frame:
//! +------------------+----------+--------------+-----------------+
//! | total (u32 LE)   | kind = 1 | len (u32 LE) | remote url      |
//! | body + 1 + 4     |          | body length  |                 |
//! +------------------+----------+--------------+-----------------+
//! ```
//!
//! The command frame is sent exactly once, before any data frame, and names
//! the server the bridge on the other end should connect to.

use std::io::{Read, Write};

use crate::transport::{TransportError, recv_all, send_all};

/// Byte width of the total-length prefix.
pub const LENGTH_FIELD_LEN: usize = 4;
/// Discriminator value of a data frame.
pub const KIND_DATA: u8 = 0;
/// Discriminator value of a command frame.
pub const KIND_COMMAND: u8 = 1;
/// Bytes counted by the total length of a data frame besides its body.
pub const DATA_METADATA_LEN: usize = 1 + 1;
/// Bytes counted by the total length of a command frame besides its body.
pub const COMMAND_METADATA_LEN: usize = 1 + 4;

/// Largest `max_frame_size` a client accepts. Frame bodies are allocated in
/// full before they are read, so this bounds the memory one header can claim.
pub const FRAME_SIZE_LIMIT: u32 = 16 * 1024 * 1024;

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted value of the total-length field. Default: 1 MB.
    pub max_frame_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 1_048_576,
        }
    }
}

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The socket failed or closed mid-frame.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The discriminator byte is neither data nor command.
    #[error("unknown frame kind {0}")]
    UnknownKind(u8),

    /// The declared length cannot even hold the frame's metadata.
    #[error("frame length {total} is shorter than its {required} metadata bytes")]
    Truncated {
        /// Declared total length.
        total: u32,
        /// Metadata bytes the frame kind requires.
        required: usize,
    },

    /// The command length echo disagrees with the declared total length.
    #[error("command length echo {echo} does not match body length {body}")]
    LengthMismatch {
        /// Value of the echo field.
        echo: u32,
        /// Body length implied by the total length.
        body: usize,
    },

    /// The frame exceeds the configured maximum.
    #[error("frame size {size} exceeds maximum {max}")]
    TooLarge {
        /// Declared or computed total length.
        size: u64,
        /// The configured maximum.
        max: u32,
    },
}

/// One unit of wire data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Handshake carrying the remote server URL.
    Command {
        /// UTF-8 bytes of the URL.
        url: Vec<u8>,
    },
    /// A serialized, opcode-patched message.
    Data {
        /// Reliability flag forwarded to the bridge.
        reliable: bool,
        /// Message body; its first four bytes are the opcode.
        body: Vec<u8>,
    },
}

impl Frame {
    /// Build the handshake frame for `url`.
    pub fn command(url: &str) -> Self {
        Self::Command {
            url: url.as_bytes().to_vec(),
        }
    }

    /// Build a data frame around an already patched body.
    pub fn data(body: Vec<u8>, reliable: bool) -> Self {
        Self::Data { reliable, body }
    }

    /// Value written into the total-length field.
    fn total_len(&self) -> u64 {
        match self {
            Frame::Command { url } => (url.len() + COMMAND_METADATA_LEN) as u64,
            Frame::Data { body, .. } => (body.len() + DATA_METADATA_LEN) as u64,
        }
    }

    /// Encode the frame into one contiguous buffer.
    pub fn encode(&self, config: &FrameConfig) -> Result<Vec<u8>, FrameError> {
        let total = self.total_len();
        if total > u64::from(config.max_frame_size) {
            return Err(FrameError::TooLarge {
                size: total,
                max: config.max_frame_size,
            });
        }

        let mut out = Vec::with_capacity(LENGTH_FIELD_LEN + total as usize);
        out.extend_from_slice(&(total as u32).to_le_bytes());
        match self {
            Frame::Command { url } => {
                out.push(KIND_COMMAND);
                out.extend_from_slice(&(url.len() as u32).to_le_bytes());
                out.extend_from_slice(url);
            }
            Frame::Data { reliable, body } => {
                out.push(KIND_DATA);
                out.push(u8::from(*reliable));
                out.extend_from_slice(body);
            }
        }
        Ok(out)
    }
}

/// Encode `frame` and write all of it to the stream.
pub fn write_frame<W: Write + ?Sized>(
    writer: &mut W,
    frame: &Frame,
    config: &FrameConfig,
) -> Result<(), FrameError> {
    let bytes = frame.encode(config)?;
    send_all(writer, &bytes)?;
    Ok(())
}

/// Read a single frame from the stream.
///
/// Blocks until the whole frame has arrived. Any error leaves the stream at
/// an unknown position, so callers must treat it as fatal for the connection.
pub fn read_frame<R: Read + ?Sized>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Frame, FrameError> {
    let prefix = recv_all(reader, LENGTH_FIELD_LEN + 1)?;
    let total = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    let kind = prefix[LENGTH_FIELD_LEN];

    if total > config.max_frame_size {
        return Err(FrameError::TooLarge {
            size: u64::from(total),
            max: config.max_frame_size,
        });
    }

    match kind {
        KIND_DATA => {
            let body_len = body_len(total, DATA_METADATA_LEN)?;
            let flag = recv_all(reader, 1)?;
            let body = recv_all(reader, body_len)?;
            Ok(Frame::Data {
                reliable: flag[0] != 0,
                body,
            })
        }
        KIND_COMMAND => {
            let body_len = body_len(total, COMMAND_METADATA_LEN)?;
            let echo = recv_all(reader, 4)?;
            let echo = u32::from_le_bytes([echo[0], echo[1], echo[2], echo[3]]);
            if echo as usize != body_len {
                return Err(FrameError::LengthMismatch {
                    echo,
                    body: body_len,
                });
            }
            let url = recv_all(reader, body_len)?;
            Ok(Frame::Command { url })
        }
        other => Err(FrameError::UnknownKind(other)),
    }
}

fn body_len(total: u32, required: usize) -> Result<usize, FrameError> {
    (total as usize)
        .checked_sub(required)
        .ok_or(FrameError::Truncated { total, required })
}
