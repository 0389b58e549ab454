//! Minimal byte-level marshalling helpers for a concrete transport that
//! needs to turn a [`crate::descriptor::FileId`] or chunk payload into
//! length-prefixed bytes. [`crate::bus::MockBus`] skips this entirely since
//! it passes values in-process, but a real bus adapter sitting behind
//! [`crate::bus::SessionBus`] would use these.

use crate::descriptor::FileId;

/// Encodes a file id as its raw 20 bytes.
pub fn encode_file_id(id: &FileId) -> [u8; 20] {
    *id
}

/// Decodes a file id from a byte slice, failing if the length is wrong.
pub fn decode_file_id(bytes: &[u8]) -> Option<FileId> {
    let arr: [u8; 20] = bytes.try_into().ok()?;
    Some(arr)
}

/// Renders a file id as lowercase hex, for logging and diagnostics.
pub fn file_id_hex(id: &FileId) -> String {
    hex::encode(id)
}

/// Prefixes `payload` with its length as a big-endian `u32`.
pub fn encode_length_prefixed(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Splits a length-prefixed buffer into `(payload, remainder)`, or `None`
/// if the buffer is shorter than the declared length.
pub fn decode_length_prefixed(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    if buf.len() < 4 {
        return None;
    }
    let len = u32::from_be_bytes(buf[..4].try_into().unwrap()) as usize;
    let rest = &buf[4..];
    if rest.len() < len {
        return None;
    }
    Some((&rest[..len], &rest[len..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_round_trips() {
        let id: FileId = [7u8; 20];
        let encoded = encode_file_id(&id);
        assert_eq!(decode_file_id(&encoded), Some(id));
    }

    #[test]
    fn file_id_hex_is_lowercase_and_forty_chars() {
        let id: FileId = [0xabu8; 20];
        let rendered = file_id_hex(&id);
        assert_eq!(rendered.len(), 40);
        assert_eq!(rendered, "ab".repeat(20));
    }

    #[test]
    fn rejects_truncated_file_id() {
        assert_eq!(decode_file_id(&[1, 2, 3]), None);
    }

    #[test]
    fn length_prefixed_round_trips_with_remainder() {
        let encoded = encode_length_prefixed(b"hello");
        let mut buf = encoded;
        buf.extend_from_slice(b"trailing");
        let (payload, rest) = decode_length_prefixed(&buf).unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(rest, b"trailing");
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(decode_length_prefixed(&[0, 0, 0, 5, 1, 2]), None);
    }
}
