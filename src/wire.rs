//! Hex literal parsing and little-endian field helpers.
//!
//! The canned ENIP byte templates in [`crate::payloads`] and
//! [`crate::encap`] are easiest to transcribe from vendor packet captures as
//! hex strings; `hex_bytes` turns one into a `Vec<u8>` at module-init time.
//! Everything else in this module is thin sugar over `to_le_bytes`/
//! `from_le_bytes`, packing wire fields directly rather than through a
//! `byteorder` dependency.

/// Decode a hex string into bytes, ignoring whitespace.
///
/// # Panics
///
/// Panics if the string (after stripping whitespace) has odd length or
/// contains a non-hex-digit character. The canned templates that use this
/// are compile-time literals, so a malformed one is a programming error the
/// crate should fail loudly on, not propagate as a runtime `Result`.
pub fn hex_bytes(s: &str) -> Vec<u8> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    assert!(
        cleaned.len() % 2 == 0,
        "hex literal has odd length: {cleaned}"
    );
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .unwrap_or_else(|_| panic!("invalid hex byte at offset {i}: {cleaned}"))
        })
        .collect()
}

/// Read a little-endian `u16` at `offset`, returning `None` if the buffer
/// is too short.
pub fn read_u16_le(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

/// Read a little-endian `u32` at `offset`, returning `None` if the buffer
/// is too short.
pub fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Overwrite `buf[offset..offset+4]` with `value` little-endian.
///
/// # Panics
///
/// Panics if `buf` is too short; callers always pass a fixed-size template
/// whose length was asserted at construction.
pub fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Right-pad `src` with zeros (or truncate) to exactly `size` bytes.
///
/// This is the "never shorter than the configured size" invariant from the
/// current-payload data model: writers may hand in a short or long slice,
/// the wire always sees exactly `size` bytes.
pub fn fit_exact(src: &[u8], size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    let n = src.len().min(size);
    out[..n].copy_from_slice(&src[..n]);
    out
}

/// Lowercase hex encoding of `bytes`, no separators -- the inverse of
/// [`hex_bytes`], used for diagnostic dumps of live payloads.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_bytes_decodes_simple_literal() {
        assert_eq!(hex_bytes("0102 0304"), vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    #[should_panic(expected = "odd length")]
    fn hex_bytes_rejects_odd_length() {
        hex_bytes("abc");
    }

    #[test]
    fn le_roundtrip() {
        let mut buf = [0u8; 8];
        write_u32_le(&mut buf, 2, 0x0A0B_0C0D);
        assert_eq!(read_u32_le(&buf, 2), Some(0x0A0B_0C0D));
        assert_eq!(read_u16_le(&buf, 2), Some(0x0C0D));
    }

    #[test]
    fn read_le_returns_none_when_short() {
        let buf = [0u8; 1];
        assert_eq!(read_u16_le(&buf, 0), None);
        assert_eq!(read_u32_le(&buf, 0), None);
    }

    #[test]
    fn fit_exact_pads_and_truncates() {
        assert_eq!(fit_exact(&[1, 2], 4), vec![1, 2, 0, 0]);
        assert_eq!(fit_exact(&[1, 2, 3, 4, 5], 3), vec![1, 2, 3]);
    }

    #[test]
    fn to_hex_is_lowercase_and_unseparated() {
        assert_eq!(to_hex(&[0xAA, 0x01, 0x0F]), "aa010f");
        assert_eq!(to_hex(&[]), "");
    }
}
