use crate::core::QuantumChannel;
use crate::core::qubit::{self, Basis, Bit, PreparedQubit};
use rand::Rng;
use serde::Serialize;

/// Outcome histogram of a sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub zeros: usize,
    pub ones: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.zeros + self.ones
    }

    pub fn get(&self, bit: Bit) -> usize {
        match bit {
            Bit::Zero => self.zeros,
            Bit::One => self.ones,
        }
    }

    /// Empirical frequency of `bit`; 0.0 for an empty histogram.
    pub fn frequency(&self, bit: Bit) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.get(bit) as f64 / total as f64,
        }
    }
}

/// A simulator for sampling prepared qubits.
///
/// The `Sampler` measures fresh copies of the same qubit many times,
/// optionally passing each copy through a quantum channel first.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    /// Optional quantum channel to apply to the qubit before measurement.
    pub channel: Option<QuantumChannel>,
}

impl Sampler {
    /// Creates a new `Sampler` instance with no channel (noise-free).
    pub fn new() -> Self {
        Self { channel: None }
    }

    /// Sets the quantum channel for the sampler.
    ///
    /// # Arguments
    ///
    /// * `channel` - The `QuantumChannel` to apply.
    pub fn with_channel(mut self, channel: QuantumChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Measures `num_shots` copies of `qubit` in `basis`.
    ///
    /// # Arguments
    ///
    /// * `qubit` - The prepared qubit to copy and measure.
    /// * `basis` - The measurement basis.
    /// * `num_shots` - The number of times to repeat the measurement.
    /// * `rng` - Source of randomness, one draw per shot.
    pub fn run<R: Rng + ?Sized>(
        &self,
        qubit: &PreparedQubit,
        basis: Basis,
        num_shots: usize,
        rng: &mut R,
    ) -> OutcomeCounts {
        let target = match &self.channel {
            Some(chan) => qubit.transmit(chan),
            None => qubit.clone(),
        };

        let mut counts = OutcomeCounts::default();
        for _ in 0..num_shots {
            match qubit::measure(&target, basis, rng) {
                Bit::Zero => counts.zeros += 1,
                Bit::One => counts.ones += 1,
            }
        }

        counts
    }
}
