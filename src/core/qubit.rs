//! BB84 encoding of a classical bit into a single qubit.
//!
//! | bit | basis | state |
//! |-----|-------|-------|
//! | 0   | Z     | `|0⟩` |
//! | 1   | Z     | `|1⟩` |
//! | 0   | X     | `|+⟩` |
//! | 1   | X     | `|−⟩` |
//!
//! Measuring in the preparation basis returns the encoded bit with
//! certainty; measuring in the conjugate basis returns a uniformly random
//! bit. Both laws fall out of the Born rule applied to the density matrix.

use crate::core::channels::QuantumChannel;
use crate::core::gates::Gate;
use crate::core::measurements::Measurement;
use crate::core::state::QuantumState;
use crate::core::utils::approx_eq;
use num_complex::Complex64;
use rand::Rng;
use rand::distr::{Distribution, StandardUniform};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::trace;

/// Measurement / preparation basis.
///
/// Serializes as its symbol, `"Z"` or `"X"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basis {
    /// Computational basis {|0⟩, |1⟩}.
    Rectilinear,
    /// Hadamard basis {|+⟩, |−⟩}.
    Diagonal,
}

impl Basis {
    /// Projective measurement for this basis.
    pub fn measurement(self) -> Measurement {
        match self {
            Basis::Rectilinear => Measurement::z_basis(),
            Basis::Diagonal => Measurement::x_basis(),
        }
    }

    /// Short name used in tables and JSON: `Z` for rectilinear, `X` for diagonal.
    pub fn symbol(self) -> &'static str {
        match self {
            Basis::Rectilinear => "Z",
            Basis::Diagonal => "X",
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Basis {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.symbol())
    }
}

impl Distribution<Basis> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Basis {
        if rng.random_bool(0.5) {
            Basis::Diagonal
        } else {
            Basis::Rectilinear
        }
    }
}

/// A classical bit. Serializes as the number `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    /// Outcome index 0 is bit 0, anything else is bit 1.
    pub fn from_index(index: usize) -> Bit {
        if index == 0 { Bit::Zero } else { Bit::One }
    }

    /// Measurement outcome index of this bit.
    pub fn index(self) -> usize {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        if value { Bit::One } else { Bit::Zero }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Bit::Zero => "0",
            Bit::One => "1",
        })
    }
}

impl Serialize for Bit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(match self {
            Bit::Zero => 0,
            Bit::One => 1,
        })
    }
}

impl Distribution<Bit> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Bit {
        Bit::from(rng.random_bool(0.5))
    }
}

/// A qubit in flight.
///
/// Holds only the physical state; nothing about how it was prepared can be
/// read back except through measurement.
#[derive(Debug, Clone)]
pub struct PreparedQubit {
    state: QuantumState,
}

impl PartialEq for PreparedQubit {
    fn eq(&self, other: &Self) -> bool {
        approx_eq(
            &self.state.density_matrix,
            &other.state.density_matrix,
            1e-9,
        )
    }
}

impl PreparedQubit {
    /// Density matrix view of the qubit.
    pub fn state(&self) -> &QuantumState {
        &self.state
    }

    /// Returns a copy of this qubit after passing through `channel`.
    pub fn transmit(&self, channel: &QuantumChannel) -> PreparedQubit {
        let mut state = self.state.clone();
        state.apply_channel(channel);
        PreparedQubit { state }
    }

    /// Computational-basis amplitudes, `None` once noise has mixed the state.
    pub fn amplitudes(&self) -> Option<[Complex64; 2]> {
        self.state.amplitudes()
    }

    /// Ket notation for the four BB84 states.
    pub fn label(&self) -> Option<&'static str> {
        [
            (Bit::Zero, Basis::Rectilinear, "|0⟩"),
            (Bit::One, Basis::Rectilinear, "|1⟩"),
            (Bit::Zero, Basis::Diagonal, "|+⟩"),
            (Bit::One, Basis::Diagonal, "|−⟩"),
        ]
        .into_iter()
        .find(|&(bit, basis, _)| prepare(bit, basis) == *self)
        .map(|(_, _, label)| label)
    }
}

/// Encodes `bit` in `basis`: X if the bit is 1, then H for the diagonal basis.
pub fn prepare(bit: Bit, basis: Basis) -> PreparedQubit {
    let mut state = QuantumState::new();

    if bit == Bit::One {
        state.apply(&Gate::x());
    }
    if basis == Basis::Diagonal {
        state.apply(&Gate::h());
    }

    PreparedQubit { state }
}

/// Born-rule distribution `[P(0), P(1)]` for measuring `qubit` in `basis`.
pub fn outcome_probabilities(qubit: &PreparedQubit, basis: Basis) -> [f64; 2] {
    qubit.state.probabilities(&basis.measurement())
}

/// Measures `qubit` in `basis`, drawing one number from `rng`.
///
/// Collapse happens on a private copy; `qubit` itself is left untouched.
pub fn measure<R: Rng + ?Sized>(qubit: &PreparedQubit, basis: Basis, rng: &mut R) -> Bit {
    let mut state = qubit.state.clone();
    let result = state.measure(&basis.measurement(), rng);
    trace!(
        %basis,
        outcome = result.index,
        probability = result.probability,
        "qubit measured"
    );
    Bit::from_index(result.index)
}
