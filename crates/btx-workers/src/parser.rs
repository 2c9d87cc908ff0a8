//! Streaming frame parser.
//!
//! The parser is a two-state machine fed with arbitrary byte chunks:
//! it first waits for a complete 9-byte header, then for `size + 1`
//! bytes of payload plus sentinel. Frames split across any number of
//! chunks are reassembled; a missing sentinel means the stream has
//! desynchronized and is reported as a hard error.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::WorkerError;
use crate::framer::{HEADER_SIZE, MAX_PAYLOAD, SENTINEL};

/// A reassembled frame, ready for packet decoding.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Job correlation id.
    pub id: u32,
    /// Command byte identifying the packet type.
    pub cmd: u8,
    /// Raw packet payload (sentinel stripped).
    pub payload: Bytes,
}

enum State {
    /// Waiting for the 9-byte header.
    Header,
    /// Waiting for `size` payload bytes plus the sentinel.
    Payload { id: u32, cmd: u8, size: usize },
}

/// Incremental parser over a byte stream of frames.
pub struct Parser {
    buffer: BytesMut,
    state: State,
}

impl Parser {
    /// Creates an empty parser in the header state.
    pub fn new() -> Self {
        Parser {
            buffer: BytesMut::new(),
            state: State::Header,
        }
    }

    /// Feeds a chunk into the parser and returns every frame completed
    /// by it. An error leaves the stream unusable; callers should tear
    /// the connection down rather than continue feeding.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, WorkerError> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            match self.state {
                State::Header => {
                    if self.buffer.len() < HEADER_SIZE {
                        break;
                    }
                    let header = self.buffer.split_to(HEADER_SIZE);
                    let id = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
                    let cmd = header[4];
                    let size =
                        u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
                    if size > MAX_PAYLOAD {
                        return Err(WorkerError::Frame(format!(
                            "payload size {} exceeds maximum",
                            size
                        )));
                    }
                    self.state = State::Payload { id, cmd, size };
                }
                State::Payload { id, cmd, size } => {
                    if self.buffer.len() < size + 1 {
                        break;
                    }
                    let payload = self.buffer.split_to(size).freeze();
                    let sentinel = self.buffer.get_u8();
                    if sentinel != SENTINEL {
                        return Err(WorkerError::Frame(format!(
                            "bad sentinel byte 0x{:02x}",
                            sentinel
                        )));
                    }
                    self.state = State::Header;
                    frames.push(Frame { id, cmd, payload });
                }
            }
        }
        Ok(frames)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}
