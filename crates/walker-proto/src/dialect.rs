//! The alternate server's opcode dialect.

use std::sync::{Arc, OnceLock};

use walker_net::{AllowList, OpcodeMap, OpcodeMapError, OpcodeShim, PatchError, PatchRegistry};

use crate::opcode::OpCode;

/// `(local, remote)` pairs for the alternate server. Remote values 0-2, 5-9,
/// 11-13, 21 and 33 have no local counterpart.
pub const BALLANCE_BUG_PAIRS: [(OpCode, u32); 33] = [
    (OpCode::SimpleAction, 3),
    (OpCode::PlayerDisconnected, 4),
    (OpCode::Chat, 10),
    (OpCode::PlayerConnectedV2, 14),
    (OpCode::CheatState, 15),
    (OpCode::OwnedCheatState, 16),
    (OpCode::CheatToggle, 17),
    (OpCode::OwnedCheatToggle, 18),
    (OpCode::KickRequest, 19),
    (OpCode::PlayerKicked, 20),
    (OpCode::LoginRequestV3, 22),
    (OpCode::LevelFinishV2, 23),
    (OpCode::ActionDenied, 24),
    (OpCode::OpState, 25),
    (OpCode::Countdown, 26),
    (OpCode::DidNotFinish, 27),
    (OpCode::MapNames, 28),
    (OpCode::PlainText, 29),
    (OpCode::CurrentMap, 30),
    (OpCode::HashData, 31),
    (OpCode::TimedBallState, 32),
    (OpCode::Timestamp, 34),
    (OpCode::PrivateChat, 35),
    (OpCode::PlayerReady, 36),
    (OpCode::ImportantNotification, 37),
    (OpCode::ModList, 38),
    (OpCode::PopupBox, 39),
    (OpCode::CurrentSector, 40),
    (OpCode::LoginAcceptedV3, 41),
    (OpCode::PermanentNotification, 42),
    (OpCode::SoundData, 43),
    (OpCode::PublicNotification, 44),
    (OpCode::OwnedCompressedBallState, 45),
];

/// Local opcodes the client decodes. Everything else is dropped on receipt.
pub const ALLOWED_OPCODES: [OpCode; 5] = [
    OpCode::LoginAcceptedV3,
    OpCode::SimpleAction,
    OpCode::Chat,
    OpCode::PlayerConnectedV2,
    OpCode::PlayerDisconnected,
];

static DIALECT: OnceLock<Result<Arc<OpcodeShim>, OpcodeMapError>> = OnceLock::new();

/// The process-wide shim for the alternate server, built on first use.
pub fn dialect() -> Result<Arc<OpcodeShim>, OpcodeMapError> {
    DIALECT.get_or_init(build).clone()
}

fn build() -> Result<Arc<OpcodeShim>, OpcodeMapError> {
    let pairs: Vec<(u32, u32)> = BALLANCE_BUG_PAIRS
        .iter()
        .map(|&(local, remote)| (u32::from(local), remote))
        .collect();
    let map = OpcodeMap::from_pairs(&pairs)?;
    let allow: AllowList = ALLOWED_OPCODES.iter().map(|&op| u32::from(op)).collect();
    let patches = PatchRegistry::new().with(
        OpCode::OwnedCompressedBallState.into(),
        patch_owned_compressed_ball_state,
    );
    tracing::debug!("built dialect with {} opcode pairs", map.len());
    Ok(Arc::new(OpcodeShim::new(map, allow, patches)))
}

/// Both dialects agree on this layout; only the opcode differs.
fn patch_owned_compressed_ball_state(_body: &mut Vec<u8>) -> Result<(), PatchError> {
    Ok(())
}
