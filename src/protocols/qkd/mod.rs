//! Quantum Key Distribution (QKD) Protocols.
//!
//! - **BB84**: prepare-and-measure key exchange over two conjugate bases.
//! - **Intercept-resend**: the eavesdropping attack BB84 is designed to expose.
//! - **Trials**: batches of seeded runs for error-rate statistics.

pub mod bb84;
pub mod intercept;
pub mod trials;
