//! Autokey XOR cipher used by HS1xx plugs on port 9999.
//!
//! The running key starts at `0xAB` and is replaced after every byte by the
//! ciphertext byte just produced (encode) or consumed (decode). Key state is
//! local to each call, so concurrent callers never share it.

/// Initial key for the XOR autokey cipher.
pub const INITIAL_KEY: u8 = 0xAB;

/// Obfuscates `plaintext`.
///
/// The output has the same length as the input and carries no header; see
/// [`crate::frame`] for wire framing.
///
/// # Example
///
/// ```
/// use hsplug_core::crypto::xor::{decode, encode};
///
/// let command = br#"{"system":{"get_sysinfo":{}}}"#;
/// let scrambled = encode(command);
///
/// assert_eq!(scrambled.len(), command.len());
/// assert_eq!(decode(&scrambled), command);
/// ```
pub fn encode(plaintext: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    let mut result = Vec::with_capacity(plaintext.len());

    for &byte in plaintext {
        let encrypted = key ^ byte;
        key = encrypted;
        result.push(encrypted);
    }

    result
}

/// Reverses [`encode`].
///
/// Expects the bare ciphertext, without any length header.
pub fn decode(ciphertext: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    let mut result = Vec::with_capacity(ciphertext.len());

    for &byte in ciphertext {
        result.push(key ^ byte);
        key = byte;
    }

    result
}
