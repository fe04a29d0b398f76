//! Frequency-domain features of a real-valued window.
//!
//! The spectrum of a real signal is conjugate-symmetric, so only bins
//! `0..n/2` are kept.

use crate::core::stats::summary;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// Statistics of the half magnitude spectrum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Mean magnitude over the kept bins
    pub fft_mean: f64,
    /// Population standard deviation of the kept magnitudes
    pub fft_std: f64,
    /// Bin index of the largest magnitude (first one on ties)
    pub dominant_freq: usize,
}

/// Reusable FFT state. Plans are cached per signal length, so one
/// analyzer should serve every window of a run.
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
    buffer: Vec<Complex<f64>>,
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
        }
    }

    /// Magnitudes of bins `0..floor(n/2)` of the signal's DFT.
    pub fn half_spectrum(&mut self, signal: &[f64]) -> Vec<f64> {
        let half = signal.len() / 2;
        if half == 0 {
            return Vec::new();
        }

        self.buffer.clear();
        self.buffer
            .extend(signal.iter().map(|&x| Complex::new(x, 0.0)));

        let fft = self.planner.plan_fft_forward(signal.len());
        fft.process(&mut self.buffer);

        self.buffer[..half].iter().map(|c| c.norm()).collect()
    }

    /// Spectral features of one channel.
    pub fn analyze(&mut self, signal: &[f64]) -> SpectralFeatures {
        let magnitudes = self.half_spectrum(signal);
        if magnitudes.is_empty() {
            return SpectralFeatures::default();
        }

        let stats = summary(&magnitudes);
        SpectralFeatures {
            fft_mean: stats.mean,
            fft_std: stats.std,
            dominant_freq: argmax(&magnitudes),
        }
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sinusoid(len: usize, cycles: f64) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * cycles * i as f64 / len as f64).sin())
            .collect()
    }

    #[test]
    fn test_dominant_bin_of_pure_tone() {
        let mut analyzer = SpectralAnalyzer::new();

        for (len, cycles) in [(64, 5.0), (50, 3.0), (128, 17.0)] {
            let features = analyzer.analyze(&sinusoid(len, cycles));
            assert_eq!(features.dominant_freq, cycles as usize, "len {len}");
        }
    }

    #[test]
    fn test_half_spectrum_length() {
        let mut analyzer = SpectralAnalyzer::new();
        assert_eq!(analyzer.half_spectrum(&[1.0; 10]).len(), 5);
        assert_eq!(analyzer.half_spectrum(&[1.0; 11]).len(), 5);
    }

    #[test]
    fn test_constant_signal_is_all_dc() {
        let mut analyzer = SpectralAnalyzer::new();
        let magnitudes = analyzer.half_spectrum(&[2.0; 8]);

        assert!((magnitudes[0] - 16.0).abs() < 1e-9);
        assert!(magnitudes[1..].iter().all(|m| m.abs() < 1e-9));

        let features = analyzer.analyze(&[2.0; 8]);
        assert_eq!(features.dominant_freq, 0);
        assert!((features.fft_mean - 4.0).abs() < 1e-9);
        // Magnitudes 16, 0, 0, 0: population std is sqrt(48).
        assert!((features.fft_std - 48f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_window() {
        let mut analyzer = SpectralAnalyzer::new();
        assert_eq!(analyzer.analyze(&[1.0]), SpectralFeatures::default());
        assert_eq!(analyzer.analyze(&[]), SpectralFeatures::default());
    }

    #[test]
    fn test_argmax_prefers_first() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[0.0]), 0);
    }
}
