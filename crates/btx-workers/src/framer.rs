//! Wire framing for worker IPC.
//!
//! Every message is a single frame:
//!
//! ```text
//! id:u32-LE | cmd:u8 | size:u32-LE | payload (size bytes) | 0x0a
//! ```
//!
//! The trailing newline is a sentinel: a frame whose last byte is not
//! `0x0a` indicates a desynchronized stream and is rejected by the
//! parser.

/// Size of the fixed frame header (id + cmd + size).
pub const HEADER_SIZE: usize = 9;

/// Frame sentinel byte.
pub const SENTINEL: u8 = 0x0a;

/// Maximum payload size accepted on the wire (8 MiB). Anything larger
/// is treated as stream corruption.
pub const MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Encodes a complete frame for the given job id, command byte and
/// payload.
pub fn frame(id: u32, cmd: u8, payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + 1);
    data.extend_from_slice(&id.to_le_bytes());
    data.push(cmd);
    data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    data.extend_from_slice(payload);
    data.push(SENTINEL);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout() {
        let data = frame(7, 13, &[0xaa, 0xbb, 0xcc]);
        assert_eq!(data.len(), HEADER_SIZE + 3 + 1);
        assert_eq!(&data[0..4], &7u32.to_le_bytes());
        assert_eq!(data[4], 13);
        assert_eq!(&data[5..9], &3u32.to_le_bytes());
        assert_eq!(&data[9..12], &[0xaa, 0xbb, 0xcc]);
        assert_eq!(data[12], SENTINEL);
    }

    #[test]
    fn empty_payload() {
        let data = frame(0, 1, &[]);
        assert_eq!(data.len(), HEADER_SIZE + 1);
        assert_eq!(data[HEADER_SIZE], SENTINEL);
    }
}
