use std::f64::consts::PI;

/// Magnitudes of the first `n / 2` bins of the DFT of `signal`.
///
/// Exact O(n²) transform over a shared twiddle table; bead waveforms are
/// short enough that this stays cheap.
pub fn half_spectrum_magnitudes(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let bins = n / 2;
    if bins == 0 {
        return Vec::new();
    }

    let step = 2.0 * PI / n as f64;
    let (cos_table, sin_table): (Vec<f64>, Vec<f64>) = (0..n)
        .map(|j| {
            let angle = step * j as f64;
            (angle.cos(), angle.sin())
        })
        .unzip();

    (0..bins)
        .map(|k| {
            let mut re = 0.0;
            let mut im = 0.0;
            let mut phase = 0usize;
            for &x in signal {
                re += x * cos_table[phase];
                im -= x * sin_table[phase];
                phase += k;
                if phase >= n {
                    phase -= n;
                }
            }
            re.hypot(im)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_signals_have_no_bins() {
        assert!(half_spectrum_magnitudes(&[]).is_empty());
        assert!(half_spectrum_magnitudes(&[3.0]).is_empty());
        assert_eq!(half_spectrum_magnitudes(&[1.0, 2.0]).len(), 1);
    }

    #[test]
    fn test_dc_bin_is_the_sum() {
        let mags = half_spectrum_magnitudes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(mags.len(), 2);
        assert!((mags[0] - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_pure_tone_peaks_at_its_bin() {
        let n = 64;
        let signal: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 5.0 * i as f64 / n as f64).cos())
            .collect();
        let mags = half_spectrum_magnitudes(&signal);
        assert_eq!(mags.len(), 32);
        assert!((mags[5] - n as f64 / 2.0).abs() < 1e-9);
        for (k, m) in mags.iter().enumerate() {
            if k != 5 {
                assert!(*m < 1e-9, "bin {k} = {m}");
            }
        }
    }

    #[test]
    fn test_alternating_signal_four_samples() {
        // All the energy sits in the Nyquist bin, which is not returned.
        let mags = half_spectrum_magnitudes(&[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(mags.len(), 2);
        assert!(mags.iter().all(|m| m.abs() < 1e-12));
    }
}
