//! Intercept-resend eavesdropping.
//!
//! Eve measures every passing qubit in a basis of her own choosing and sends
//! Bob a fresh qubit encoding whatever she saw, in that same basis. When her
//! basis differs from Alice's the resent state is conjugate to the original,
//! so Bob (measuring in Alice's basis) reads the right bit only half the
//! time. Averaged over Eve's choices this costs her a 25% error rate on the
//! sifted key.

use crate::core::qubit::{self, Basis, Bit, PreparedQubit};
use rand::Rng;

/// What Eve forwards and what she learned.
#[derive(Debug, Clone)]
pub struct Interception {
    /// Freshly prepared qubit sent on to Bob.
    pub resent: PreparedQubit,
    /// Eve's measurement result.
    pub outcome: Bit,
}

/// Measures `qubit` in `eve_basis` and re-prepares the result.
///
/// The original qubit is only borrowed; nothing derived from it other than
/// `outcome` reaches the returned value.
pub fn intercept<R: Rng + ?Sized>(
    qubit: &PreparedQubit,
    eve_basis: Basis,
    rng: &mut R,
) -> Interception {
    let outcome = qubit::measure(qubit, eve_basis, rng);

    Interception {
        resent: qubit::prepare(outcome, eve_basis),
        outcome,
    }
}
