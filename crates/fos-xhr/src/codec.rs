//! Binary string codec
//!
//! Level 1 transports only hand out text. With the response MIME type
//! overridden to `text/plain; charset=x-user-defined`, each received byte
//! becomes one character whose low 8 bits are the byte value
//! (0x00-0x7F as ASCII, 0x80-0xFF as U+F780-U+F7FF).

/// Decode a one-byte-per-character string into bytes
pub fn binary_string_to_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| (c as u32 & 0xFF) as u8).collect()
}

/// Encode bytes the way an `x-user-defined` decoder would
pub fn bytes_to_binary_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x00..=0x7F => char::from(b),
            _ => char::from_u32(0xF700 + b as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
        })
        .collect()
}
