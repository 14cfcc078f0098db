//! ISO-8859-1 transport view of line bytes.
//!
//! Framing and structural parsing treat every byte as one character, so any
//! byte sequence survives the trip to `String` and back unchanged. Text
//! parameters are re-decoded with the resolved charset afterwards.

/// Map each byte to the code point of the same value.
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inverse of [`latin1_decode`]. Code points above `U+00FF` become `?`.
pub fn latin1_encode(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_survive_round_trip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        assert_eq!(latin1_encode(&latin1_decode(&bytes)), bytes);
    }

    #[test]
    fn test_utf8_bytes_become_separate_chars() {
        let decoded = latin1_decode("é".as_bytes());
        assert_eq!(decoded.chars().count(), 2);
    }

    #[test]
    fn test_wide_chars_are_replaced() {
        assert_eq!(latin1_encode("a€b"), b"a?b".to_vec());
    }
}
