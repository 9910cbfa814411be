//! Command-line driver for the BB84 simulator.
//!
//! Builds a configuration from flags, runs the library, and renders the
//! resulting records. All protocol logic lives in `qkd_sim`; this file only
//! formats what the library computed.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use qkd_sim::errors::ProtocolError;
use qkd_sim::{
    Basis, Bb84Config, Bit, QuantumChannel, RunRecord, Sampler, TrialSummary, qubit, run_trials,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qkd-sim", version, about = "BB84 quantum key distribution simulator")]
struct Cli {
    /// Log protocol progress at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the protocol once and print every slot
    Run {
        #[command(flatten)]
        line: LineArgs,
        #[arg(long)]
        seed: Option<u64>,
        /// Emit the run record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the protocol many times and summarise the QBER
    Trials {
        #[command(flatten)]
        line: LineArgs,
        #[arg(short, long, default_value_t = 100)]
        trials: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        json: bool,
    },
    /// Measure one prepared state repeatedly
    Sample {
        #[arg(long, value_enum, default_value = "0")]
        bit: BitArg,
        #[arg(long, value_enum, default_value = "z")]
        prep_basis: BasisArg,
        #[arg(long, value_enum, default_value = "x")]
        meas_basis: BasisArg,
        #[arg(long, default_value_t = 1000)]
        shots: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        noise: NoiseArgs,
    },
}

#[derive(Args)]
struct LineArgs {
    /// Number of qubits Alice sends
    #[arg(short = 'n', long, default_value_t = 10, allow_negative_numbers = true)]
    key_length: i64,
    /// Put an intercept-resend eavesdropper on the line
    #[arg(long)]
    eve: bool,
    #[command(flatten)]
    noise: NoiseArgs,
}

/// Noise on the line. Several flags compose in the order listed.
#[derive(Args)]
struct NoiseArgs {
    /// Bit-flip probability
    #[arg(long)]
    bit_flip: Option<f64>,
    /// Phase-flip probability
    #[arg(long)]
    phase_flip: Option<f64>,
    /// Depolarizing probability
    #[arg(long)]
    depolarizing: Option<f64>,
    /// Amplitude-damping rate gamma
    #[arg(long)]
    amplitude_damping: Option<f64>,
}

impl NoiseArgs {
    /// Composite channel for the given flags, `None` for a clean line.
    fn channel(&self) -> Result<Option<QuantumChannel>, ProtocolError> {
        let stages = [
            self.bit_flip.map(QuantumChannel::bit_flip),
            self.phase_flip.map(QuantumChannel::phase_flip),
            self.depolarizing.map(QuantumChannel::depolarizing),
            self.amplitude_damping.map(QuantumChannel::amplitude_damping),
        ];

        let mut line: Option<QuantumChannel> = None;
        for stage in stages.into_iter().flatten() {
            let stage = stage?;
            line = Some(match line {
                Some(earlier) => earlier.compose(&stage),
                None => stage,
            });
        }
        Ok(line)
    }
}

impl LineArgs {
    fn to_config(&self) -> Result<Bb84Config, ProtocolError> {
        let key_length = usize::try_from(self.key_length).map_err(|_| {
            ProtocolError::InvalidConfiguration(format!(
                "key_length must be at least 1, got {}",
                self.key_length
            ))
        })?;

        let mut config = Bb84Config::new(key_length).with_eve(self.eve);
        if let Some(channel) = self.noise.channel()? {
            config = config.with_channel(channel);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BasisArg {
    Z,
    X,
}

impl From<BasisArg> for Basis {
    fn from(arg: BasisArg) -> Self {
        match arg {
            BasisArg::Z => Basis::Rectilinear,
            BasisArg::X => Basis::Diagonal,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BitArg {
    #[value(name = "0")]
    Zero,
    #[value(name = "1")]
    One,
}

impl From<BitArg> for Bit {
    fn from(arg: BitArg) -> Self {
        match arg {
            BitArg::Zero => Bit::Zero,
            BitArg::One => Bit::One,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn rng_from(seed: Option<u64>) -> ChaCha20Rng {
    match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_os_rng(),
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_record(record: &RunRecord) {
    println!(
        "{:>5}  {:>5} {:>5} {:>5}  {:>5} {:>5}  {:>5} {:>5}  {}",
        "slot", "A.bit", "A.bas", "state", "E.bas", "E.bit", "B.bas", "B.bit", "sifted"
    );
    for (index, slot) in record.slots().iter().enumerate() {
        let sifted = match (slot.bases_match(), slot.alice_bit == slot.bob_outcome) {
            (false, _) => "",
            (true, true) => "keep",
            (true, false) => "ERROR",
        };
        println!(
            "{:>5}  {:>5} {:>5} {:>5}  {:>5} {:>5}  {:>5} {:>5}  {}",
            index,
            slot.alice_bit,
            slot.alice_basis,
            slot.sent_state.unwrap_or("mixed"),
            opt(slot.eve.map(|e| e.basis)),
            opt(slot.eve.map(|e| e.outcome)),
            slot.bob_basis,
            slot.bob_outcome,
            sifted
        );
    }

    println!();
    println!("eavesdropper : {}", if record.eve_present() { "present" } else { "absent" });
    println!("key length   : {}", record.key_length());
    println!("sifted       : {}", record.sifted_len());
    println!("errors       : {}", record.error_count());
    println!("QBER         : {:.2}%", record.qber() * 100.0);
    if record.final_key().is_empty() {
        println!("final key    : (empty)");
    } else {
        println!("final key    : {} ({} bits)", record.final_key_string(), record.final_len());
    }
}

fn print_summary(summary: &TrialSummary) {
    println!("trials        : {}", summary.trials);
    println!("key length    : {}", summary.key_length);
    println!("eavesdropper  : {}", if summary.eve_present { "present" } else { "absent" });
    println!(
        "QBER          : {:.2}% ± {:.2}% (min {:.2}%, max {:.2}%)",
        summary.mean_qber * 100.0,
        summary.std_dev_qber * 100.0,
        summary.min_qber * 100.0,
        summary.max_qber * 100.0
    );
    println!("mean sifted   : {:.1}", summary.mean_sifted_len);
    println!("mean final    : {:.1}", summary.mean_final_len);
    println!("empty keys    : {}", summary.empty_final_keys);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { line, seed, json } => {
            let config = line.to_config().context("invalid run configuration")?;
            let mut rng = rng_from(seed);
            debug!(?seed, "running single BB84 exchange");
            let record = config.run(&mut rng).context("BB84 run failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
            }
        }
        Commands::Trials {
            line,
            trials,
            seed,
            json,
        } => {
            let config = line.to_config().context("invalid trial configuration")?;
            let summary = run_trials(&config, trials, seed).context("trial batch failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Sample {
            bit,
            prep_basis,
            meas_basis,
            shots,
            seed,
            noise,
        } => {
            let (bit, prep, meas) = (Bit::from(bit), Basis::from(prep_basis), Basis::from(meas_basis));
            let state = qubit::prepare(bit, prep);
            let channel = noise.channel().context("invalid noise configuration")?;

            let mut sampler = Sampler::new();
            let received = match channel {
                Some(channel) => {
                    let received = state.transmit(&channel);
                    sampler = sampler.with_channel(channel);
                    received
                }
                None => state.clone(),
            };
            let probs = qubit::outcome_probabilities(&received, meas);
            let counts = sampler.run(&state, meas, shots, &mut rng_from(seed));

            println!(
                "prepared {} (bit {bit}, basis {prep}), measured in {meas}",
                state.label().unwrap_or("?")
            );
            for outcome in [Bit::Zero, Bit::One] {
                println!(
                    "  {outcome}: {:>8}  ({:.4} observed, {:.4} expected)",
                    counts.get(outcome),
                    counts.frequency(outcome),
                    probs[outcome.index()]
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn line_args(args: &[&str]) -> LineArgs {
        let argv = ["qkd-sim", "run"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run { line, .. } => line,
            _ => unreachable!("parsed a run command"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_key_length_is_a_configuration_error() {
        let err = line_args(&["-n", "-5"]).to_config().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("-5"));
    }

    #[test]
    fn zero_key_length_is_a_configuration_error() {
        let err = line_args(&["--key-length", "0"]).to_config().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidConfiguration(_)));
    }

    #[test]
    fn clean_line_has_no_channel() {
        let config = line_args(&["-n", "16", "--eve"]).to_config().unwrap();
        assert_eq!(config.key_length, 16);
        assert!(config.eve_present);
        assert!(config.channel.is_none());
    }

    #[test]
    fn noise_flags_map_to_channels() {
        let config = line_args(&["--bit-flip", "0.1"]).to_config().unwrap();
        assert_eq!(config.channel.map(|c| c.kraus_ops.len()), Some(2));

        let config = line_args(&["--depolarizing", "0.2"]).to_config().unwrap();
        assert_eq!(config.channel.map(|c| c.kraus_ops.len()), Some(4));
    }

    #[test]
    fn noise_flags_compose() {
        let config = line_args(&["--phase-flip", "0.2", "--amplitude-damping", "0.3"])
            .to_config()
            .unwrap();
        assert_eq!(config.channel.map(|c| c.kraus_ops.len()), Some(4));

        let config = line_args(&["--bit-flip", "0.1", "--phase-flip", "0.1", "--depolarizing", "0.1"])
            .to_config()
            .unwrap();
        assert_eq!(config.channel.map(|c| c.kraus_ops.len()), Some(16));
    }

    #[test]
    fn full_bit_flip_flag_inverts_every_z_slot() {
        let config = line_args(&["-n", "100", "--bit-flip", "1.0"]).to_config().unwrap();
        let record = config.run(&mut rng_from(Some(3))).unwrap();
        for entry in record.sifted_key() {
            let slot = &record.slots()[entry.index];
            assert_eq!(entry.agrees(), slot.alice_basis == Basis::Diagonal);
        }
    }

    #[test]
    fn out_of_range_noise_is_a_configuration_error() {
        let err = line_args(&["--depolarizing", "1.5"]).to_config().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidConfiguration(_)));
    }
}
