//! Message type and dialect shared by the unit tests.

use std::sync::Arc;

use crate::message::{Message, OPCODE_LEN, peek_opcode};
use crate::shim::{OpcodeMap, OpcodeShim, PatchRegistry};

/// Local opcodes 0..=3 map to remote 3, 4, 10 and 14.
pub(crate) const PAIRS: &[(u32, u32)] = &[(0, 3), (1, 4), (2, 10), (3, 14)];
/// Local opcodes the tests decode.
pub(crate) const ALLOWED: [u32; 2] = [0, 2];

pub(crate) fn shim() -> Arc<OpcodeShim> {
    Arc::new(OpcodeShim::new(
        OpcodeMap::from_pairs(PAIRS).unwrap(),
        ALLOWED.into_iter().collect(),
        PatchRegistry::new(),
    ))
}

/// Opcode followed by raw text. Text `poison` refuses to serialize and text
/// `bad` refuses to deserialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Note {
    pub(crate) opcode: u32,
    pub(crate) reliable: bool,
    pub(crate) text: Vec<u8>,
}

impl Note {
    pub(crate) fn new(opcode: u32, text: &[u8]) -> Self {
        Self {
            opcode,
            reliable: true,
            text: text.to_vec(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("note codec: {0}")]
pub(crate) struct NoteError(&'static str);

impl Message for Note {
    type Error = NoteError;

    fn opcode(&self) -> u32 {
        self.opcode
    }

    fn is_reliable(&self) -> bool {
        self.reliable
    }

    fn serialize(&self, writer: &mut Vec<u8>) -> Result<(), NoteError> {
        writer.extend_from_slice(&self.opcode.to_le_bytes());
        if self.text == b"poison" {
            return Err(NoteError("poisoned"));
        }
        writer.extend_from_slice(&self.text);
        Ok(())
    }

    fn deserialize(reader: &[u8]) -> Result<Self, NoteError> {
        let opcode = peek_opcode(reader).ok_or(NoteError("truncated"))?;
        let text = &reader[OPCODE_LEN..];
        if text == b"bad" {
            return Err(NoteError("malformed"));
        }
        Ok(Note::new(opcode, text))
    }
}

/// Wire bytes of a data frame carrying `text` under a remote opcode.
pub(crate) fn remote_data_frame(remote: u32, text: &[u8], reliable: bool) -> Vec<u8> {
    let mut body = remote.to_le_bytes().to_vec();
    body.extend_from_slice(text);
    crate::framing::Frame::data(body, reliable)
        .encode(&Default::default())
        .unwrap()
}
