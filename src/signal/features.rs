use serde::Serialize;

use super::spectrum::half_spectrum_magnitudes;

/// Number of scalars in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 9;

/// Column names, in [`FeatureVector::to_array`] order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "mean",
    "std_dev",
    "min",
    "max",
    "energy",
    "skewness",
    "kurtosis",
    "spectral_energy",
    "dominant_freq",
];

/// Time- and frequency-domain summary of one bead waveform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FeatureVector {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Mean of squared samples.
    pub energy: f64,
    pub skewness: f64,
    /// Excess kurtosis (normal distribution = 0).
    pub kurtosis: f64,
    /// Mean squared magnitude over the non-negative half of the spectrum.
    pub spectral_energy: f64,
    /// Bin index of the strongest half-spectrum component.
    pub dominant_freq: usize,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.mean,
            self.std_dev,
            self.min,
            self.max,
            self.energy,
            self.skewness,
            self.kurtosis,
            self.spectral_energy,
            self.dominant_freq as f64,
        ]
    }
}

/// Reduce a waveform to its [`FeatureVector`].
///
/// NaN samples are dropped first. An empty (or all-NaN) waveform yields the
/// all-zero vector rather than an error.
pub fn extract_features(signal: &[f64]) -> FeatureVector {
    let samples: Vec<f64> = signal.iter().copied().filter(|x| !x.is_nan()).collect();
    if samples.is_empty() {
        return FeatureVector::default();
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let energy = samples.iter().map(|x| x * x).sum::<f64>() / n;

    let (m2, m3, m4) = central_moments(&samples, mean);
    let std_dev = m2.sqrt();
    // No variance: shape statistics are defined as zero.
    let (skewness, kurtosis) = if max > min && m2 > 0.0 {
        (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };

    let magnitudes = half_spectrum_magnitudes(&samples);
    let (spectral_energy, dominant_freq) = if magnitudes.is_empty() {
        (0.0, 0)
    } else {
        let total: f64 = magnitudes.iter().map(|m| m * m).sum();
        (total / magnitudes.len() as f64, argmax(&magnitudes))
    };

    FeatureVector {
        mean,
        std_dev,
        min,
        max,
        energy,
        skewness,
        kurtosis,
        spectral_energy,
        dominant_freq,
    }
}

/// Biased second, third and fourth central moments.
fn central_moments(samples: &[f64], mean: f64) -> (f64, f64, f64) {
    let n = samples.len() as f64;
    let (s2, s3, s4) = samples.iter().fold((0.0, 0.0, 0.0), |(s2, s3, s4), x| {
        let d = x - mean;
        let d2 = d * d;
        (s2 + d2, s3 + d2 * d, s4 + d2 * d2)
    });
    (s2 / n, s3 / n, s4 / n)
}

/// First index of the largest value; 0 when every value is zero.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_signal_is_all_zero() {
        let f = extract_features(&[]);
        assert_eq!(f.to_array(), [0.0; FEATURE_COUNT]);
        let nan = extract_features(&[f64::NAN, f64::NAN]);
        assert_eq!(nan.to_array(), [0.0; FEATURE_COUNT]);
    }

    #[test]
    fn test_constant_signal() {
        let f = extract_features(&[1.0, 1.0, 1.0, 1.0]);
        assert!(close(f.mean, 1.0));
        assert_eq!(f.std_dev, 0.0);
        assert_eq!(f.min, 1.0);
        assert_eq!(f.max, 1.0);
        assert!(close(f.energy, 1.0));
        assert_eq!(f.skewness, 0.0);
        assert_eq!(f.kurtosis, 0.0);
        // |X0| = 4, |X1| = 0 → (16 + 0) / 2
        assert!(close(f.spectral_energy, 8.0));
        assert_eq!(f.dominant_freq, 0);
    }

    #[test]
    fn test_time_domain_statistics() {
        let f = extract_features(&[1.0, 2.0, 3.0, 4.0]);
        assert!(close(f.mean, 2.5));
        assert!(close(f.std_dev, 1.25f64.sqrt()));
        assert!(close(f.energy, 30.0 / 4.0));
        assert!(close(f.skewness, 0.0));
        // m4 / m2² - 3 = 2.5625 / 1.5625 - 3
        assert!(close(f.kurtosis, 2.5625 / 1.5625 - 3.0));
    }

    #[test]
    fn test_skewed_signal() {
        let f = extract_features(&[0.0, 0.0, 0.0, 10.0]);
        assert!(f.skewness > 1.0);
        let g = extract_features(&[10.0, 10.0, 10.0, 0.0]);
        assert!(close(g.skewness, -f.skewness));
    }

    #[test]
    fn test_single_sample_has_no_spectrum() {
        let f = extract_features(&[-3.0]);
        assert_eq!(f.mean, -3.0);
        assert_eq!(f.energy, 9.0);
        assert_eq!(f.spectral_energy, 0.0);
        assert_eq!(f.dominant_freq, 0);
    }

    #[test]
    fn test_dominant_frequency_of_tone() {
        let n = 40;
        let signal: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * 3.0 * i as f64 / n as f64).sin())
            .collect();
        assert_eq!(extract_features(&signal).dominant_freq, 3);
    }

    #[test]
    fn test_nan_samples_are_ignored() {
        let clean = extract_features(&[1.0, 5.0, 2.0]);
        let dirty = extract_features(&[1.0, f64::NAN, 5.0, 2.0]);
        assert_eq!(clean, dirty);
    }

    #[test]
    fn test_bounds_invariants() {
        let signals: Vec<Vec<f64>> = vec![
            vec![-4.0, 2.0, 7.5],
            vec![0.1; 17],
            (0..129).map(|i| ((i as f64) * 0.21).cos() * 5.0 - 1.0).collect(),
        ];
        for s in &signals {
            let f = extract_features(s);
            assert!(f.energy >= 0.0);
            assert!(f.spectral_energy >= 0.0);
            assert!(f.min <= f.mean + 1e-12 && f.mean <= f.max + 1e-12);
            assert!(f.dominant_freq < s.len() / 2 || s.len() < 2);
        }
    }
}
