//! Quantum Cryptography Protocols.

pub mod qkd;
pub use qkd::{bb84, intercept, trials};
