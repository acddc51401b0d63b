//! Local opcode numbering.

use crate::messages::MessageError;

/// Every opcode the dialect table knows about, in local numbering.
///
/// The discriminant is the value written at the start of a serialized body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum OpCode {
    SimpleAction = 0,
    PlayerDisconnected = 1,
    Chat = 2,
    PlayerConnectedV2 = 3,
    CheatState = 4,
    OwnedCheatState = 5,
    CheatToggle = 6,
    OwnedCheatToggle = 7,
    KickRequest = 8,
    PlayerKicked = 9,
    LoginRequestV3 = 10,
    LevelFinishV2 = 11,
    ActionDenied = 12,
    OpState = 13,
    Countdown = 14,
    DidNotFinish = 15,
    MapNames = 16,
    PlainText = 17,
    CurrentMap = 18,
    HashData = 19,
    TimedBallState = 20,
    Timestamp = 21,
    PrivateChat = 22,
    PlayerReady = 23,
    ImportantNotification = 24,
    ModList = 25,
    PopupBox = 26,
    CurrentSector = 27,
    LoginAcceptedV3 = 28,
    PermanentNotification = 29,
    SoundData = 30,
    PublicNotification = 31,
    OwnedCompressedBallState = 32,
}

impl OpCode {
    /// All opcodes in ascending order.
    pub const ALL: [OpCode; 33] = [
        OpCode::SimpleAction,
        OpCode::PlayerDisconnected,
        OpCode::Chat,
        OpCode::PlayerConnectedV2,
        OpCode::CheatState,
        OpCode::OwnedCheatState,
        OpCode::CheatToggle,
        OpCode::OwnedCheatToggle,
        OpCode::KickRequest,
        OpCode::PlayerKicked,
        OpCode::LoginRequestV3,
        OpCode::LevelFinishV2,
        OpCode::ActionDenied,
        OpCode::OpState,
        OpCode::Countdown,
        OpCode::DidNotFinish,
        OpCode::MapNames,
        OpCode::PlainText,
        OpCode::CurrentMap,
        OpCode::HashData,
        OpCode::TimedBallState,
        OpCode::Timestamp,
        OpCode::PrivateChat,
        OpCode::PlayerReady,
        OpCode::ImportantNotification,
        OpCode::ModList,
        OpCode::PopupBox,
        OpCode::CurrentSector,
        OpCode::LoginAcceptedV3,
        OpCode::PermanentNotification,
        OpCode::SoundData,
        OpCode::PublicNotification,
        OpCode::OwnedCompressedBallState,
    ];
}

impl From<OpCode> for u32 {
    fn from(op: OpCode) -> u32 {
        op as u32
    }
}

impl TryFrom<u32> for OpCode {
    type Error = MessageError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(MessageError::UnknownOpcode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_dense_and_ordered() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(u32::from(*op), i as u32);
        }
    }

    #[test]
    fn test_try_from_round_trip() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::try_from(u32::from(op)).unwrap(), op);
        }
    }

    #[test]
    fn test_try_from_out_of_range() {
        assert!(matches!(
            OpCode::try_from(33),
            Err(MessageError::UnknownOpcode(33))
        ));
        assert!(OpCode::try_from(u32::MAX).is_err());
    }
}
