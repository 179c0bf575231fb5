//! Payload obfuscation for the Smart Home Protocol.
//!
//! HS1xx plugs scramble every JSON payload with an autokey XOR cipher (see
//! [`xor`]). It hides nothing from anyone who has read this file: treat it
//! as encoding, not as confidentiality.

pub mod xor;

pub use xor::{INITIAL_KEY, decode as xor_decode, encode as xor_encode};
