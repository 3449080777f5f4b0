//! The length prefix every message travels behind.

use std::io;

/// The integer type of the length prefix.
type LenType = u64;

/// The size in bytes of the length prefix.
pub(crate) const PREFIX_SIZE: usize = size_of::<LenType>();

/// The largest frame a receiver accepts unless told otherwise, 1 GiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 30;

/// Encodes the length of a frame's body as it's big endian prefix.
pub(crate) fn encode_len(len: usize) -> [u8; PREFIX_SIZE] {
    (len as LenType).to_be_bytes()
}

/// Decodes a length prefix, rejecting frames over `max_len` bytes before anything is allocated.
pub(crate) fn decode_len(prefix: [u8; PREFIX_SIZE], max_len: usize) -> io::Result<usize> {
    let len = LenType::from_be_bytes(prefix);

    match usize::try_from(len) {
        Ok(len) if len <= max_len => Ok(len),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds the limit of {max_len} bytes"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_big_endian() {
        assert_eq!(encode_len(0x0102), [0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(decode_len(encode_len(4096), 4096).unwrap(), 4096);
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let err = decode_len(encode_len(4097), 4096).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
