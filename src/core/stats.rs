//! Descriptive statistics over one channel of a window.
//!
//! Standard deviations are population (divide by N) throughout.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Location and spread of a signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

/// Compute mean, population standard deviation, min, max and range.
pub fn summary(signal: &[f64]) -> Summary {
    if signal.is_empty() {
        return Summary::default();
    }

    let min = signal.min();
    let max = signal.max();
    Summary {
        mean: signal.mean(),
        std: signal.population_std_dev(),
        min,
        max,
        range: max - min,
    }
}

/// Percentile `q` (0..=1) using linear interpolation between closest ranks.
pub fn percentile(signal: &[f64], q: f64) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }

    let mut sorted = signal.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Fraction of consecutive sample pairs whose signs differ.
///
/// Signs are -1, 0 and +1: an exact zero is its own sign, so a step onto
/// or off zero counts as a crossing. The count is divided by the number of
/// samples, not the number of pairs.
pub fn zero_crossing_rate(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }

    let crossings = signal
        .windows(2)
        .filter(|pair| sign(pair[0]) != sign(pair[1]))
        .count();
    crossings as f64 / signal.len() as f64
}

/// Per-row Euclidean norm of three aligned channels.
pub fn euclidean_norms(x: &[f64], y: &[f64], z: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((x, y), z)| (x * x + y * y + z * z).sqrt())
        .collect()
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
