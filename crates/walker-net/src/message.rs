//! The message collaborator consumed by the workers.
//!
//! The core never looks inside a message beyond its leading opcode: a `u32`
//! in little-endian order occupying the first [`OPCODE_LEN`] bytes of every
//! serialized body. Everything after it belongs to the message layer.

/// Byte width of the opcode at the start of a serialized body.
pub const OPCODE_LEN: usize = 4;

/// A message that can cross the wire.
///
/// Implementations write their opcode first, in the client's local
/// numbering; the workers rewrite it to and from the server's dialect.
pub trait Message: Send + Sized + 'static {
    /// Error raised by [`serialize`](Self::serialize) and
    /// [`deserialize`](Self::deserialize).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Local opcode of this message.
    fn opcode(&self) -> u32;

    /// Whether the bridge should deliver this message reliably.
    fn is_reliable(&self) -> bool;

    /// Append the serialized message, opcode first, to `writer`.
    fn serialize(&self, writer: &mut Vec<u8>) -> Result<(), Self::Error>;

    /// Decode a body whose leading opcode is already in local numbering.
    fn deserialize(reader: &[u8]) -> Result<Self, Self::Error>;
}

/// Read the opcode at the start of `body`, if the body is long enough.
pub fn peek_opcode(body: &[u8]) -> Option<u32> {
    let bytes: [u8; OPCODE_LEN] = body.get(..OPCODE_LEN)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Overwrite the opcode at the start of `body`. Returns `false` when the body
/// is too short to hold one.
pub fn write_opcode(body: &mut [u8], opcode: u32) -> bool {
    match body.get_mut(..OPCODE_LEN) {
        Some(slot) => {
            slot.copy_from_slice(&opcode.to_le_bytes());
            true
        }
        None => false,
    }
}
