//! Byte-level line framing for tokio.
//!
//! Lines are framed on `\n` (an optional preceding `\r` is dropped) and
//! handed out as raw bytes, so any charset survives framing. A payload longer
//! than [`MAX_LINE_PAYLOAD`] is a protocol violation and fails the stream.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Maximum line payload in bytes, excluding CR/LF.
pub const MAX_LINE_PAYLOAD: usize = 510;

/// Codec splitting a byte stream into IRC lines.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum payload length
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the standard 510-byte payload budget.
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_PAYLOAD)
    }

    /// Create a codec with a custom payload budget.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    fn too_long(&self, actual: usize) -> ProtocolError {
        ProtocolError::MessageTooLong {
            actual,
            limit: self.max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Vec<u8>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Vec<u8>>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let mut line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }

            if line.len() > self.max_len {
                return Err(self.too_long(line.len()));
            }

            Ok(Some(line.to_vec()))
        } else {
            self.next_index = src.len();

            // room for the CR/LF still to come
            if src.len() > self.max_len + 2 {
                return Err(self.too_long(src.len()));
            }

            Ok(None)
        }
    }
}

/// Encodes one payload, appending CR/LF.
///
/// Anything from the first embedded CR or LF onwards is dropped so a payload
/// can never smuggle a second line.
impl Encoder<Vec<u8>> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: Vec<u8>, dst: &mut BytesMut) -> error::Result<()> {
        let end = line
            .iter()
            .position(|b| *b == b'\r' || *b == b'\n')
            .unwrap_or(line.len());
        if end > self.max_len {
            return Err(self.too_long(end));
        }

        dst.reserve(end + 2);
        dst.put_slice(&line[..end]);
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
