//! Message catalogue and server dialect for the Ballance multiplayer mod.
//!
//! - [`OpCode`]: the client's local opcode numbering.
//! - [`dialect`]: the shim that speaks the alternate server's numbering.
//! - [`BmmoMessage`]: typed payloads for the messages the client decodes.

pub mod dialect;
pub mod messages;
pub mod opcode;

pub use dialect::{ALLOWED_OPCODES, BALLANCE_BUG_PAIRS, dialect};
pub use messages::{
    BmmoMessage, BmmoVersion, Chat, LoginAcceptedV3, LoginRequestV3, MessageError,
    PlayerConnectedV2, PlayerDisconnected, PlayerInfo, SimpleAction, Stage,
};
pub use opcode::OpCode;
