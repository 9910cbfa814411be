pub mod channels;
pub mod errors;
mod gates;
mod measurements;
pub mod qubit;
mod state;
pub mod utils;

pub use channels::QuantumChannel;
pub use gates::Gate;
pub use measurements::{Measurement, MeasurementResult};
pub use qubit::{Basis, Bit, PreparedQubit};
pub use state::QuantumState;
