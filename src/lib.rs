mod core;
pub mod protocols;
mod sampler;

pub use crate::core::{
    Basis, Bit, Gate, Measurement, MeasurementResult, PreparedQubit, QuantumChannel,
    QuantumState, errors, qubit, utils,
};
pub use crate::protocols::bb84::{Bb84Config, RunRecord, SiftedEntry, Slot, SlotChoices, run};
pub use crate::protocols::trials::{TrialSummary, run_trials};
pub use crate::sampler::{OutcomeCounts, Sampler};
