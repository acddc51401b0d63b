//! Typed payloads for the messages the client sends and decodes.
//!
//! A serialized body is the local opcode as a little-endian `u32` followed by
//! the [`postcard`] encoding of the payload struct.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use walker_net::Message;
use walker_net::message::{OPCODE_LEN, peek_opcode};

use crate::opcode::OpCode;

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// A decoded catalogue message.
#[derive(Debug, Clone, PartialEq)]
pub enum BmmoMessage {
    /// Client asks to join with its profile.
    LoginRequestV3(LoginRequestV3),
    /// Server accepts the login and lists everyone online.
    LoginAcceptedV3(LoginAcceptedV3),
    /// Bare notification without a body of its own.
    SimpleAction(SimpleAction),
    /// Public chat line.
    Chat(Chat),
    /// Another player joined.
    PlayerConnectedV2(PlayerConnectedV2),
    /// Another player left.
    PlayerDisconnected(PlayerDisconnected),
}

impl BmmoMessage {
    /// Opcode used for dispatch in application code.
    pub fn tag(&self) -> OpCode {
        match self {
            BmmoMessage::LoginRequestV3(_) => OpCode::LoginRequestV3,
            BmmoMessage::LoginAcceptedV3(_) => OpCode::LoginAcceptedV3,
            BmmoMessage::SimpleAction(_) => OpCode::SimpleAction,
            BmmoMessage::Chat(_) => OpCode::Chat,
            BmmoMessage::PlayerConnectedV2(_) => OpCode::PlayerConnectedV2,
            BmmoMessage::PlayerDisconnected(_) => OpCode::PlayerDisconnected,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Release stage of a client build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Stage {
    /// Early testing build.
    Alpha,
    /// Feature-complete testing build.
    #[default]
    Beta,
    /// Release candidate.
    ReleaseCandidate,
    /// Stable release.
    Release,
}

/// Client build version announced at login.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BmmoVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
    /// Patch version.
    pub subminor: u8,
    /// Release stage.
    pub stage: Stage,
    /// Build number within the stage.
    pub build: u8,
}

impl Default for BmmoVersion {
    fn default() -> Self {
        Self {
            major: 3,
            minor: 2,
            subminor: 5,
            stage: Stage::Beta,
            build: 7,
        }
    }
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginRequestV3 {
    /// Client build.
    pub version: BmmoVersion,
    /// Display name.
    pub nickname: String,
    /// Whether cheats are enabled locally.
    pub cheated: bool,
    /// Stable player identity.
    pub uuid: [u8; 16],
}

/// One player in the login roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    /// Server-assigned player identifier.
    pub player_id: u64,
    /// Display name.
    pub name: String,
    /// Whether the player has cheats enabled.
    pub cheated: bool,
}

/// Login accepted, with the players already online.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginAcceptedV3 {
    /// Everyone online, including the new player.
    pub players: Vec<PlayerInfo>,
}

/// Notification identified only by its action code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimpleAction {
    /// Server-defined action code.
    pub action: u32,
}

/// Chat line. `player_id` 0 is the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    /// Sender.
    pub player_id: u64,
    /// Message text.
    pub content: String,
}

/// A player joined.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConnectedV2 {
    /// Server-assigned player identifier.
    pub player_id: u64,
    /// Display name.
    pub name: String,
    /// Whether the player has cheats enabled.
    pub cheated: bool,
}

/// A player left.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerDisconnected {
    /// Player that left.
    pub player_id: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while encoding or decoding a catalogue message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The body is shorter than an opcode.
    #[error("body of {0} bytes has no opcode")]
    Truncated(usize),
    /// The opcode is outside the local numbering.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),
    /// The opcode is known but has no payload type in this catalogue.
    #[error("no payload type for {0:?}")]
    Unsupported(OpCode),
    /// Postcard encoding or decoding failed.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

// ---------------------------------------------------------------------------
// Wire encoding
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, MessageError> {
    Ok(postcard::from_bytes(payload)?)
}

impl Message for BmmoMessage {
    type Error = MessageError;

    fn opcode(&self) -> u32 {
        self.tag().into()
    }

    fn is_reliable(&self) -> bool {
        true
    }

    fn serialize(&self, writer: &mut Vec<u8>) -> Result<(), MessageError> {
        let payload = match self {
            BmmoMessage::LoginRequestV3(m) => postcard::to_allocvec(m),
            BmmoMessage::LoginAcceptedV3(m) => postcard::to_allocvec(m),
            BmmoMessage::SimpleAction(m) => postcard::to_allocvec(m),
            BmmoMessage::Chat(m) => postcard::to_allocvec(m),
            BmmoMessage::PlayerConnectedV2(m) => postcard::to_allocvec(m),
            BmmoMessage::PlayerDisconnected(m) => postcard::to_allocvec(m),
        }?;
        writer.reserve(OPCODE_LEN + payload.len());
        writer.extend_from_slice(&self.opcode().to_le_bytes());
        writer.extend_from_slice(&payload);
        Ok(())
    }

    fn deserialize(reader: &[u8]) -> Result<Self, MessageError> {
        let opcode = peek_opcode(reader).ok_or(MessageError::Truncated(reader.len()))?;
        let payload = &reader[OPCODE_LEN..];
        let msg = match OpCode::try_from(opcode)? {
            OpCode::LoginRequestV3 => BmmoMessage::LoginRequestV3(decode(payload)?),
            OpCode::LoginAcceptedV3 => BmmoMessage::LoginAcceptedV3(decode(payload)?),
            OpCode::SimpleAction => BmmoMessage::SimpleAction(decode(payload)?),
            OpCode::Chat => BmmoMessage::Chat(decode(payload)?),
            OpCode::PlayerConnectedV2 => BmmoMessage::PlayerConnectedV2(decode(payload)?),
            OpCode::PlayerDisconnected => BmmoMessage::PlayerDisconnected(decode(payload)?),
            other => return Err(MessageError::Unsupported(other)),
        };
        Ok(msg)
    }
}
