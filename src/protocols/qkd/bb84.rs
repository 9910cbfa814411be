//! BB84 Quantum Key Distribution Protocol.
//!
//! Alice encodes random bits in randomly chosen bases, Bob measures each
//! qubit in his own random basis, and the two keep only the slots where the
//! bases agree (sifting). An optional eavesdropper performs an
//! intercept-resend attack on every qubit, and an optional noise channel
//! degrades the line.
//!
//! # Final key policy
//!
//! The final key is built from sifted slots where Alice's bit and Bob's
//! outcome agree; disagreeing slots are dropped without aborting. Textbook
//! BB84 instead keeps the whole sifted key, estimates the QBER on a
//! disclosed sample and aborts above a threshold. Callers that need that
//! behaviour should act on [`RunRecord::qber`] themselves.

use crate::core::QuantumChannel;
use crate::core::errors::ProtocolError;
use crate::core::qubit::{self, Basis, Bit};
use crate::protocols::qkd::intercept::intercept;
use num_complex::Complex64;
use rand::Rng;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use tracing::{debug, trace};

/// Random choices made for one slot before any qubit is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotChoices {
    pub alice_bit: Bit,
    pub alice_basis: Basis,
    /// `Some` exactly when Eve is on the line.
    pub eve_basis: Option<Basis>,
    pub bob_basis: Basis,
}

impl SlotChoices {
    /// Draws Alice's bit and basis, Eve's basis (if present) and Bob's basis,
    /// in that order.
    pub fn draw<R: Rng + ?Sized>(eve_present: bool, rng: &mut R) -> Self {
        let alice_bit = rng.random();
        let alice_basis = rng.random();
        let eve_basis = eve_present.then(|| rng.random());
        let bob_basis = rng.random();

        Self {
            alice_bit,
            alice_basis,
            eve_basis,
            bob_basis,
        }
    }
}

/// Eve's view of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EveRecord {
    pub basis: Basis,
    pub outcome: Bit,
}

/// Everything that happened to one qubit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub alice_bit: Bit,
    pub alice_basis: Basis,
    /// Ket label of the state Alice sent.
    pub sent_state: Option<&'static str>,
    /// Computational-basis amplitudes of the state Alice sent.
    pub sent_amplitudes: Option<[Complex64; 2]>,
    pub eve: Option<EveRecord>,
    pub bob_basis: Basis,
    pub bob_outcome: Bit,
}

impl Slot {
    /// True when Alice and Bob chose the same basis.
    pub fn bases_match(&self) -> bool {
        self.alice_basis == self.bob_basis
    }
}

/// A slot that survived sifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiftedEntry {
    pub index: usize,
    pub alice_bit: Bit,
    pub bob_outcome: Bit,
}

impl SiftedEntry {
    /// True when Bob's outcome equals Alice's bit.
    pub fn agrees(&self) -> bool {
        self.alice_bit == self.bob_outcome
    }
}

/// Result of one BB84 run.
///
/// Sifting, the final key and the QBER are computed once when the record is
/// built; accessors only read them. The serialized form also carries the
/// derived counts and the final key as a bit string.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    eve_present: bool,
    slots: Vec<Slot>,
    sifted_key: Vec<SiftedEntry>,
    final_key: Vec<Bit>,
    error_count: usize,
    qber: f64,
}

impl RunRecord {
    fn from_slots(eve_present: bool, slots: Vec<Slot>) -> Self {
        // Public basis reconciliation
        let sifted_key: Vec<SiftedEntry> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.bases_match())
            .map(|(index, slot)| SiftedEntry {
                index,
                alice_bit: slot.alice_bit,
                bob_outcome: slot.bob_outcome,
            })
            .collect();

        let final_key: Vec<Bit> = sifted_key
            .iter()
            .filter(|entry| entry.agrees())
            .map(|entry| entry.alice_bit)
            .collect();

        let error_count = sifted_key.len() - final_key.len();
        let qber = if sifted_key.is_empty() {
            0.0
        } else {
            error_count as f64 / sifted_key.len() as f64
        };

        Self {
            eve_present,
            slots,
            sifted_key,
            final_key,
            error_count,
            qber,
        }
    }

    /// Whether Eve intercepted the line.
    pub fn eve_present(&self) -> bool {
        self.eve_present
    }

    /// Per-slot history in transmission order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of qubits Alice sent.
    pub fn key_length(&self) -> usize {
        self.slots.len()
    }

    /// Alice's raw bits, one per slot.
    pub fn alice_bits(&self) -> Vec<Bit> {
        self.slots.iter().map(|s| s.alice_bit).collect()
    }

    /// Alice's preparation bases, one per slot.
    pub fn alice_bases(&self) -> Vec<Basis> {
        self.slots.iter().map(|s| s.alice_basis).collect()
    }

    /// Bob's measurement bases, one per slot.
    pub fn bob_bases(&self) -> Vec<Basis> {
        self.slots.iter().map(|s| s.bob_basis).collect()
    }

    /// Bob's measurement outcomes, one per slot.
    pub fn bob_outcomes(&self) -> Vec<Bit> {
        self.slots.iter().map(|s| s.bob_outcome).collect()
    }

    /// Eve's measurement bases; `None` when Eve was absent.
    pub fn eve_bases(&self) -> Option<Vec<Basis>> {
        self.eve_present
            .then(|| self.slots.iter().filter_map(|s| s.eve.map(|e| e.basis)).collect())
    }

    /// Eve's measurement outcomes; `None` when Eve was absent.
    pub fn eve_outcomes(&self) -> Option<Vec<Bit>> {
        self.eve_present
            .then(|| self.slots.iter().filter_map(|s| s.eve.map(|e| e.outcome)).collect())
    }

    /// Slots where Alice's and Bob's bases matched, in index order.
    pub fn sifted_key(&self) -> &[SiftedEntry] {
        &self.sifted_key
    }

    /// Number of sifted slots.
    pub fn sifted_len(&self) -> usize {
        self.sifted_key.len()
    }

    /// Alice's bits from sifted slots where Bob agreed.
    pub fn final_key(&self) -> &[Bit] {
        &self.final_key
    }

    /// Number of bits in the final key.
    pub fn final_len(&self) -> usize {
        self.final_key.len()
    }

    /// Final key as a string of `0`/`1`.
    pub fn final_key_string(&self) -> String {
        self.final_key.iter().map(ToString::to_string).collect()
    }

    /// Sifted slots where Alice and Bob disagree.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Fraction of sifted slots in error; 0.0 when nothing was sifted.
    pub fn qber(&self) -> f64 {
        self.qber
    }
}

impl Serialize for RunRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("RunRecord", 10)?;
        state.serialize_field("eve_present", &self.eve_present)?;
        state.serialize_field("key_length", &self.key_length())?;
        state.serialize_field("slots", &self.slots)?;
        state.serialize_field("sifted_key", &self.sifted_key)?;
        state.serialize_field("sifted_len", &self.sifted_len())?;
        state.serialize_field("final_key", &self.final_key)?;
        state.serialize_field("final_key_string", &self.final_key_string())?;
        state.serialize_field("final_len", &self.final_len())?;
        state.serialize_field("error_count", &self.error_count)?;
        state.serialize_field("qber", &self.qber)?;
        state.end()
    }
}

/// Parameters of a BB84 run.
#[derive(Debug, Clone)]
pub struct Bb84Config {
    pub key_length: usize,
    pub eve_present: bool,
    /// Noise between Alice and the rest of the line.
    pub channel: Option<QuantumChannel>,
}

impl Bb84Config {
    /// Noise-free, eavesdropper-free run of `key_length` qubits.
    pub fn new(key_length: usize) -> Self {
        Self {
            key_length,
            eve_present: false,
            channel: None,
        }
    }

    /// Enables or disables the intercept-resend eavesdropper.
    pub fn with_eve(mut self, eve_present: bool) -> Self {
        self.eve_present = eve_present;
        self
    }

    /// Puts `channel` on the line between Alice and the receivers.
    pub fn with_channel(mut self, channel: QuantumChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Checks the key length and any configured channel.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.key_length < 1 {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "key_length must be at least 1, got {}",
                self.key_length
            )));
        }
        self.validate_channel()
    }

    /// Re-validates channels assembled by hand through the public field.
    fn validate_channel(&self) -> Result<(), ProtocolError> {
        if let Some(channel) = &self.channel {
            QuantumChannel::new(channel.kraus_ops.clone())?;
        }
        Ok(())
    }

    /// Runs the protocol with all choices drawn from `rng`.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RunRecord, ProtocolError> {
        self.validate()?;

        let choices: Vec<SlotChoices> = (0..self.key_length)
            .map(|_| SlotChoices::draw(self.eve_present, rng))
            .collect();

        Ok(self.execute(&choices, rng))
    }

    /// Runs the protocol with the bit and basis choices fixed by the caller.
    ///
    /// Only measurement outcomes are drawn from `rng`. There must be exactly
    /// `key_length` choices.
    pub fn run_scripted<R: Rng + ?Sized>(
        &self,
        choices: &[SlotChoices],
        rng: &mut R,
    ) -> Result<RunRecord, ProtocolError> {
        self.validate()?;
        if choices.len() != self.key_length {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "expected {} scripted slots, got {}",
                self.key_length,
                choices.len()
            )));
        }
        if let Some(index) = choices
            .iter()
            .position(|c| c.eve_basis.is_some() != self.eve_present)
        {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "slot {index}: Eve's basis must be given exactly when Eve is present"
            )));
        }

        Ok(self.execute(choices, rng))
    }

    fn execute<R: Rng + ?Sized>(&self, choices: &[SlotChoices], rng: &mut R) -> RunRecord {
        debug!(
            key_length = choices.len(),
            eve_present = self.eve_present,
            noisy = self.channel.is_some(),
            "starting BB84 run"
        );

        let slots: Vec<Slot> = choices
            .iter()
            .enumerate()
            .map(|(index, choice)| {
                let slot = self.exchange(choice, rng);
                trace!(
                    index,
                    alice_bit = %slot.alice_bit,
                    alice_basis = %slot.alice_basis,
                    bob_basis = %slot.bob_basis,
                    bob_outcome = %slot.bob_outcome,
                    intercepted = slot.eve.is_some(),
                    "slot exchanged"
                );
                slot
            })
            .collect();

        let record = RunRecord::from_slots(self.eve_present, slots);

        debug!(
            key_length = record.key_length(),
            sifted = record.sifted_len(),
            final_len = record.final_len(),
            errors = record.error_count(),
            qber = record.qber(),
            eve_present = record.eve_present(),
            "BB84 run complete"
        );
        if record.final_key().is_empty() {
            debug!("run produced an empty final key");
        }

        record
    }

    /// Prepare, transmit, optionally intercept, and measure one qubit.
    fn exchange<R: Rng + ?Sized>(&self, choice: &SlotChoices, rng: &mut R) -> Slot {
        let sent = qubit::prepare(choice.alice_bit, choice.alice_basis);
        let sent_state = sent.label();
        let sent_amplitudes = sent.amplitudes();

        let mut in_flight = match &self.channel {
            Some(channel) => sent.transmit(channel),
            None => sent,
        };

        let eve = choice.eve_basis.map(|eve_basis| {
            let caught = intercept(&in_flight, eve_basis, rng);
            in_flight = caught.resent;
            EveRecord {
                basis: eve_basis,
                outcome: caught.outcome,
            }
        });

        let bob_outcome = qubit::measure(&in_flight, choice.bob_basis, rng);

        Slot {
            alice_bit: choice.alice_bit,
            alice_basis: choice.alice_basis,
            sent_state,
            sent_amplitudes,
            eve,
            bob_basis: choice.bob_basis,
            bob_outcome,
        }
    }
}

/// Runs BB84 over `key_length` qubits, with or without Eve.
pub fn run<R: Rng + ?Sized>(
    key_length: usize,
    eve_present: bool,
    rng: &mut R,
) -> Result<RunRecord, ProtocolError> {
    Bb84Config::new(key_length).with_eve(eve_present).run(rng)
}
