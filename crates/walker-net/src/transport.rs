//! Full-buffer socket I/O over a stream that may write or read partially.
//!
//! Both helpers block the calling worker thread until the whole buffer has
//! moved. A zero-byte write or read means the peer is gone and is reported as
//! [`TransportError::ConnectionBroken`]; the owning client reacts by stopping.

use std::io::{ErrorKind, Read, Write};

/// Largest single `read` issued by [`recv_all`].
pub const RECV_CHUNK_SIZE: usize = 2048;

/// Errors raised by [`send_all`] and [`recv_all`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The socket accepted or produced zero bytes.
    #[error("socket connection broken")]
    ConnectionBroken,

    /// The underlying socket call failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write every byte of `bytes`, looping over partial writes.
pub fn send_all<W: Write + ?Sized>(writer: &mut W, bytes: &[u8]) -> Result<(), TransportError> {
    let mut sent = 0;
    while sent < bytes.len() {
        match writer.write(&bytes[sent..]) {
            Ok(0) => return Err(TransportError::ConnectionBroken),
            Ok(n) => sent += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Read exactly `len` bytes, issuing reads of at most [`RECV_CHUNK_SIZE`].
pub fn recv_all<R: Read + ?Sized>(reader: &mut R, len: usize) -> Result<Vec<u8>, TransportError> {
    let mut buf = vec![0u8; len];
    let mut received = 0;
    while received < len {
        let end = (received + RECV_CHUNK_SIZE).min(len);
        match reader.read(&mut buf[received..end]) {
            Ok(0) => return Err(TransportError::ConnectionBroken),
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Accepts at most `limit` bytes per call, then reports a closed socket
    /// once `budget` is spent.
    struct TrickleWriter {
        written: Vec<u8>,
        limit: usize,
        budget: usize,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.limit).min(self.budget);
            self.written.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Yields one byte per `read` call.
    struct TrickleReader(Cursor<Vec<u8>>);

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let one = buf.len().min(1);
            self.0.read(&mut buf[..one])
        }
    }

    #[test]
    fn test_send_all_survives_partial_writes() {
        let mut writer = TrickleWriter {
            written: Vec::new(),
            limit: 3,
            budget: usize::MAX,
        };
        send_all(&mut writer, b"partial writes are stitched").unwrap();
        assert_eq!(writer.written, b"partial writes are stitched");
    }

    #[test]
    fn test_send_all_zero_write_is_broken() {
        let mut writer = TrickleWriter {
            written: Vec::new(),
            limit: 4,
            budget: 6,
        };
        let result = send_all(&mut writer, b"0123456789");
        assert!(matches!(result, Err(TransportError::ConnectionBroken)));
        assert_eq!(writer.written, b"012345");
    }

    #[test]
    fn test_recv_all_survives_partial_reads() {
        let mut reader = TrickleReader(Cursor::new(b"abcdefgh".to_vec()));
        let bytes = recv_all(&mut reader, 5).unwrap();
        assert_eq!(bytes, b"abcde");
    }

    #[test]
    fn test_recv_all_eof_mid_buffer_is_broken() {
        let mut reader = Cursor::new(vec![1u8, 2, 3]);
        let result = recv_all(&mut reader, 8);
        assert!(matches!(result, Err(TransportError::ConnectionBroken)));
    }

    #[test]
    fn test_recv_all_reads_beyond_chunk_size() {
        let payload: Vec<u8> = (0..RECV_CHUNK_SIZE * 3 + 17).map(|i| i as u8).collect();
        let mut reader = Cursor::new(payload.clone());
        let bytes = recv_all(&mut reader, payload.len()).unwrap();
        assert_eq!(bytes, payload);
    }

    #[test]
    fn test_recv_all_zero_length_reads_nothing() {
        let mut reader = Cursor::new(Vec::new());
        assert!(recv_all(&mut reader, 0).unwrap().is_empty());
    }
}
