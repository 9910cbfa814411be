//! Repeated BB84 runs for QBER statistics.
//!
//! Each trial gets its own `ChaCha20Rng` seeded with `seed + trial_index`,
//! so a batch is reproducible no matter how rayon schedules it.

use crate::core::errors::ProtocolError;
use crate::protocols::qkd::bb84::Bb84Config;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

/// Aggregate statistics over a batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSummary {
    pub trials: usize,
    pub key_length: usize,
    pub eve_present: bool,
    pub mean_qber: f64,
    pub std_dev_qber: f64,
    pub min_qber: f64,
    pub max_qber: f64,
    pub mean_sifted_len: f64,
    pub mean_final_len: f64,
    /// Runs whose final key came out empty.
    pub empty_final_keys: usize,
}

struct TrialOutcome {
    qber: f64,
    sifted_len: usize,
    final_len: usize,
}

/// Runs `trials` independent protocol runs in parallel.
pub fn run_trials(
    config: &Bb84Config,
    trials: usize,
    seed: u64,
) -> Result<TrialSummary, ProtocolError> {
    if trials == 0 {
        return Err(ProtocolError::InvalidConfiguration(
            "trials must be at least 1".to_string(),
        ));
    }
    config.validate()?;

    let outcomes: Vec<TrialOutcome> = (0..trials)
        .into_par_iter()
        .map(|trial| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed.wrapping_add(trial as u64));
            config.run(&mut rng).map(|record| TrialOutcome {
                qber: record.qber(),
                sifted_len: record.sifted_len(),
                final_len: record.final_len(),
            })
        })
        .collect::<Result<_, _>>()?;

    let n = outcomes.len() as f64;
    let mean_qber = outcomes.iter().map(|o| o.qber).sum::<f64>() / n;
    let variance = outcomes
        .iter()
        .map(|o| (o.qber - mean_qber).powi(2))
        .sum::<f64>()
        / n;

    let summary = TrialSummary {
        trials,
        key_length: config.key_length,
        eve_present: config.eve_present,
        mean_qber,
        std_dev_qber: variance.sqrt(),
        min_qber: outcomes.iter().map(|o| o.qber).fold(f64::INFINITY, f64::min),
        max_qber: outcomes.iter().map(|o| o.qber).fold(0.0, f64::max),
        mean_sifted_len: outcomes.iter().map(|o| o.sifted_len as f64).sum::<f64>() / n,
        mean_final_len: outcomes.iter().map(|o| o.final_len as f64).sum::<f64>() / n,
        empty_final_keys: outcomes.iter().filter(|o| o.final_len == 0).count(),
    };

    info!(
        trials,
        key_length = summary.key_length,
        eve_present = summary.eve_present,
        mean_qber = summary.mean_qber,
        std_dev_qber = summary.std_dev_qber,
        "trial batch complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_trials_rejected() {
        assert!(matches!(
            run_trials(&Bb84Config::new(8), 0, 1),
            Err(ProtocolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn invalid_config_rejected_before_running() {
        assert!(matches!(
            run_trials(&Bb84Config::new(0), 4, 1),
            Err(ProtocolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn batches_are_reproducible() {
        let config = Bb84Config::new(128).with_eve(true);
        let a = run_trials(&config, 16, 42).unwrap();
        let b = run_trials(&config, 16, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn honest_line_averages_zero_qber() {
        let summary = run_trials(&Bb84Config::new(100), 20, 3).unwrap();
        assert_eq!(summary.mean_qber, 0.0);
        assert_eq!(summary.max_qber, 0.0);
        assert_eq!(summary.mean_sifted_len, summary.mean_final_len);
    }

    #[test]
    fn eavesdropper_averages_quarter_qber() {
        let config = Bb84Config::new(400).with_eve(true);
        let summary = run_trials(&config, 50, 1234).unwrap();
        assert!(
            (summary.mean_qber - 0.25).abs() < 0.02,
            "mean qber {}",
            summary.mean_qber
        );
        assert!(summary.min_qber <= summary.mean_qber);
        assert!(summary.max_qber >= summary.mean_qber);
    }
}
