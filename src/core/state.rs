use crate::core::channels::QuantumChannel;
use crate::core::Gate;
use crate::core::utils::{sandwich, trace};
use crate::core::measurements::{Measurement, MeasurementResult};
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

/// Probabilities below this are treated as exactly zero.
const PROBABILITY_FLOOR: f64 = 1e-12;

/// Density matrix of a single qubit.
#[derive(Clone, Debug)]
pub struct QuantumState {
    pub density_matrix: Array2<Complex64>,
}

impl Default for QuantumState {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantumState {
    /// Creates a new quantum state initialized to |0>.
    pub fn new() -> Self {
        let mut density_matrix = Array2::<Complex64>::zeros((2, 2));
        density_matrix[[0, 0]] = Complex64::new(1.0, 0.0);

        Self { density_matrix }
    }

    /// Purity tr(rho^2); 1 for pure states, 1/2 for the maximally mixed state.
    pub fn purity(&self) -> f64 {
        trace(&self.density_matrix.dot(&self.density_matrix)).re
    }

    /// Amplitudes (a0, a1) of a pure state with the global phase chosen so
    /// that the first non-zero amplitude is real and positive.
    ///
    /// Returns `None` for mixed states.
    pub fn amplitudes(&self) -> Option<[Complex64; 2]> {
        if (self.purity() - 1.0).abs() > 1e-9 {
            return None;
        }

        let rho = &self.density_matrix;
        let p0 = rho[[0, 0]].re.max(0.0);

        if p0 > PROBABILITY_FLOOR {
            let a0 = p0.sqrt();
            // rho_10 = a1 * conj(a0) with a0 real
            let a1 = rho[[1, 0]] / a0;
            Some([Complex64::new(a0, 0.0), a1])
        } else {
            Some([Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)])
        }
    }

    /// Applies a quantum gate, rho -> U rho U†
    pub fn apply(&mut self, gate: &Gate) {
        self.density_matrix = sandwich(&gate.matrix, &self.density_matrix);
    }

    /// Apply QuantumChannel to QuantumState, rho -> sum_k K rho K†
    pub fn apply_channel(&mut self, channel: &QuantumChannel) {
        let mut new_rho = Array2::<Complex64>::zeros((2, 2));

        for k in &channel.kraus_ops {
            new_rho = new_rho + sandwich(k, &self.density_matrix);
        }

        self.density_matrix = new_rho;
    }

    /// Born-rule probability of each measurement outcome.
    ///
    /// Values under `PROBABILITY_FLOOR` are zeroed and the rest renormalised,
    /// so a deterministic outcome has probability exactly 1.0.
    pub fn probabilities(&self, measurement: &Measurement) -> [f64; 2] {
        let mut probs = [0.0; 2];

        for (p, op) in probs.iter_mut().zip(&measurement.operators) {
            let p_k = trace(&sandwich(op, &self.density_matrix)).re;
            *p = if p_k < PROBABILITY_FLOOR { 0.0 } else { p_k };
        }

        let sum: f64 = probs.iter().sum();
        if sum > 0.0 {
            for p in &mut probs {
                *p /= sum;
            }
        }

        probs
    }

    /// Randomly selects an outcome index weighted by `probs`.
    ///
    /// Zero-probability outcomes are never returned.
    fn pick_outcome<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
        let roll: f64 = rng.random();

        let mut cumulative = 0.0;
        for (i, &p) in probs.iter().enumerate() {
            cumulative += p;
            if p > 0.0 && roll < cumulative {
                return i;
            }
        }
        // Rounding left roll above the final cumulative sum
        probs.iter().rposition(|&p| p > 0.0).unwrap_or(0)
    }

    /// Physical measurement which changes the state irretrievably
    pub fn measure<R: Rng + ?Sized>(
        &mut self,
        measurement: &Measurement,
        rng: &mut R,
    ) -> MeasurementResult {
        let probs = self.probabilities(measurement);

        let outcome_idx = Self::pick_outcome(&probs, rng);
        let p_selected = probs[outcome_idx];

        // rho' = (M_k * rho * M_k†) / p_k
        let numerator = sandwich(&measurement.operators[outcome_idx], &self.density_matrix);
        let norm = trace(&numerator).re;
        if norm > 0.0 {
            self.density_matrix = numerator.mapv(|val| val / Complex64::new(norm, 0.0));
        }

        MeasurementResult {
            index: outcome_idx,
            probability: p_selected,
        }
    }
}
