//! Feature math for one window
//!
//! Every function here is pure: given a spectrum or a block of samples and a
//! set of channel indices, it returns a number. Empty channel or frequency
//! masks produce NaN rather than an error.

use crate::spectral::Spectrum;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Floor applied to integrated band power before taking log10
pub const POWER_FLOOR: f64 = 1e-10;

/// Embedding dimension for sample entropy
pub const SAMPLE_ENTROPY_M: usize = 2;

/// Tolerance factor for sample entropy, relative to the window std
pub const SAMPLE_ENTROPY_R_FACTOR: f64 = 0.2;

/// Indices of `labels` that belong to a region, matched case-insensitively
///
/// Returned in block order; labels absent from the block are ignored.
pub fn channel_mask(region_channels: &[String], labels: &[String]) -> Vec<usize> {
    let wanted: Vec<String> = region_channels.iter().map(|c| c.trim().to_lowercase()).collect();
    labels
        .iter()
        .enumerate()
        .filter(|(_, label)| wanted.contains(&label.trim().to_lowercase()))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of frequency bins inside `[lo_hz, hi_hz]`
pub fn frequency_mask(frequencies: ArrayView1<'_, f64>, lo_hz: f64, hi_hz: f64) -> Vec<usize> {
    frequencies
        .iter()
        .enumerate()
        .filter(|(_, f)| **f >= lo_hz && **f <= hi_hz)
        .map(|(i, _)| i)
        .collect()
}

/// Trapezoidal integral of `y` over the sample points `x`
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| 0.5 * (yy[0] + yy[1]) * (xx[1] - xx[0]))
        .sum()
}

/// log10 band power of the mean PSD over `channels`
pub fn band_power(spectrum: &Spectrum, channels: &[usize], lo_hz: f64, hi_hz: f64) -> f64 {
    let bins = frequency_mask(spectrum.frequencies.view(), lo_hz, hi_hz);
    if channels.is_empty() || bins.is_empty() {
        return f64::NAN;
    }

    let mean_psd: Vec<f64> = bins
        .iter()
        .map(|&k| channels.iter().map(|&c| spectrum.psd[[c, k]]).sum::<f64>() / channels.len() as f64)
        .collect();
    let freqs: Vec<f64> = bins.iter().map(|&k| spectrum.frequencies[k]).collect();

    trapezoid(&mean_psd, &freqs).max(POWER_FLOOR).log10()
}

/// Shannon entropy in bits of one normalized PSD row
///
/// NaN when the row carries no power.
pub fn channel_spectral_entropy(psd: ArrayView1<'_, f64>) -> f64 {
    let total: f64 = psd.sum();
    if !(total.is_finite() && total > 0.0) {
        return f64::NAN;
    }
    psd.iter()
        .map(|p| (p / total).max(f64::EPSILON))
        .map(|p| -p * p.log2())
        .sum()
}

/// Mean spectral entropy over `channels`
pub fn spectral_entropy(spectrum: &Spectrum, channels: &[usize]) -> f64 {
    finite_mean(channels.iter().map(|&c| channel_spectral_entropy(spectrum.psd.row(c))))
}

/// Sample standard deviation (N - 1) of every value in a block
pub fn global_std(block: ArrayView2<'_, f64>) -> f64 {
    if block.len() < 2 {
        return 0.0;
    }
    block.std(1.0)
}

/// Zero-mean, unit-variance copy of a series
///
/// A constant series maps to all zeros.
pub fn zscore(series: ArrayView1<'_, f64>) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    let mean = series.sum() / n as f64;
    let std = if n > 1 { series.std(1.0) } else { 0.0 };
    series
        .iter()
        .map(|x| if std > 0.0 { (x - mean) / std } else { 0.0 })
        .collect()
}

/// Sample entropy `-ln(A / B)` with Chebyshev distance and tolerance `r`
///
/// `B` counts pairs of length-`m` templates within `r`, `A` the pairs that
/// still match at length `m + 1`. Self-matches are excluded. Returns a
/// non-finite value when no templates match.
///
/// Compares every template pair, so cost grows with the square of
/// `series.len()`: a 300 s window at 500 Hz is about 10^10 comparisons.
pub fn sample_entropy(series: &[f64], m: usize, r: f64) -> f64 {
    let n = series.len();
    if m == 0 || n <= m + 1 {
        return f64::NAN;
    }

    let templates = n - m;
    let mut b = 0u64;
    let mut a = 0u64;
    for i in 0..templates {
        for j in (i + 1)..templates {
            let matched = (0..m).all(|k| (series[i + k] - series[j + k]).abs() <= r);
            if matched {
                b += 1;
                if (series[i + m] - series[j + m]).abs() <= r {
                    a += 1;
                }
            }
        }
    }

    if b == 0 {
        return f64::NAN;
    }
    -((a as f64) / (b as f64)).ln()
}

/// Mean sample entropy of the z-normalized channels in `channels`
///
/// `r` is absolute and shared by every channel of the window.
pub fn region_sample_entropy(block: ArrayView2<'_, f64>, channels: &[usize], r: f64) -> f64 {
    finite_mean(channels.iter().map(|&c| {
        let normalized = zscore(block.row(c));
        sample_entropy(&normalized, SAMPLE_ENTROPY_M, r)
    }))
}

/// Mean of the finite values, NaN if there are none
fn finite_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Feature values of one window in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Element-wise mean ignoring NaN; NaN where every input is NaN
    ///
    /// `None` for an empty slice.
    pub fn nan_mean(vectors: &[FeatureVector]) -> Option<FeatureVector> {
        let width = vectors.first()?.len();
        let means = (0..width)
            .map(|i| finite_mean(vectors.iter().filter_map(|v| v.0.get(i).copied())))
            .collect();
        Some(FeatureVector(means))
    }

    /// Element-wise difference `self - baseline`
    pub fn subtract(&self, baseline: &FeatureVector) -> FeatureVector {
        FeatureVector(self.0.iter().zip(&baseline.0).map(|(x, b)| x - b).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn flat_spectrum(max_hz: f64, step: f64, value: f64, channels: usize) -> Spectrum {
        let n = (max_hz / step) as usize + 1;
        Spectrum {
            frequencies: Array1::from_shape_fn(n, |k| k as f64 * step),
            psd: Array2::from_elem((channels, n), value),
        }
    }

    #[test]
    fn test_channel_mask_case_insensitive() {
        let block = labels(&["Fz", "o1", " O2 ", "Cz"]);
        let region = labels(&["O1", "O2", "Oz"]);
        assert_eq!(channel_mask(&region, &block), vec![1, 2]);
        assert!(channel_mask(&labels(&["T7"]), &block).is_empty());
    }

    #[test]
    fn test_band_power_of_flat_psd() {
        // Flat density of 2.0 over 8..12 Hz integrates to 8.0.
        let spectrum = flat_spectrum(50.0, 0.5, 2.0, 2);
        let lp = band_power(&spectrum, &[0, 1], 8.0, 12.0);
        assert!((lp - 8f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_band_power_floor() {
        let spectrum = flat_spectrum(50.0, 0.5, 0.0, 1);
        assert!((band_power(&spectrum, &[0], 8.0, 12.0) + 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_band_power_empty_masks_are_nan() {
        // Bins only below 8 Hz: an alpha band has no bins.
        let spectrum = flat_spectrum(7.5, 0.5, 1.0, 1);
        assert!(band_power(&spectrum, &[0], 8.0, 13.0).is_nan());
        let spectrum = flat_spectrum(50.0, 0.5, 1.0, 1);
        assert!(band_power(&spectrum, &[], 8.0, 13.0).is_nan());
    }

    #[test]
    fn test_spectral_entropy_bounds() {
        // Uniform over 64 bins is exactly 6 bits.
        let spectrum = flat_spectrum(31.5, 0.5, 1.0, 1);
        assert_eq!(spectrum.n_bins(), 64);
        assert!((spectral_entropy(&spectrum, &[0]) - 6.0).abs() < 1e-9);

        let mut peaked = flat_spectrum(31.5, 0.5, 0.0, 1);
        peaked.psd[[0, 10]] = 5.0;
        assert!(spectral_entropy(&peaked, &[0]) < 1e-6);

        assert!(spectral_entropy(&spectrum, &[]).is_nan());
    }

    #[test]
    fn test_sample_entropy_regular_vs_random() {
        let periodic: Vec<f64> = (0..300).map(|t| (t % 4) as f64).collect();
        let regular = sample_entropy(&periodic, 2, 0.2);
        assert!(regular.abs() < 1e-12);

        // Deterministic pseudo-random sequence (LCG).
        let mut state = 12345u64;
        let noisy: Vec<f64> = (0..300)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 33) as f64 / (1u64 << 31) as f64
            })
            .collect();
        let irregular = sample_entropy(&zscore(Array1::from(noisy).view()), 2, 0.2);
        assert!(irregular > regular);
        assert!(irregular.is_finite());
    }

    #[test]
    fn test_sample_entropy_degenerate_inputs() {
        assert!(sample_entropy(&[1.0, 2.0], 2, 0.2).is_nan());
        // Strictly increasing with tiny r: no template pairs match.
        let ramp: Vec<f64> = (0..50).map(|t| t as f64).collect();
        assert!(!sample_entropy(&ramp, 2, 0.1).is_finite());
    }

    #[test]
    fn test_region_sample_entropy_skips_non_finite() {
        let block = Array2::from_shape_fn((2, 200), |(c, t)| {
            if c == 0 {
                (t % 5) as f64
            } else {
                t as f64
            }
        });
        // The normalized ramp steps by more than r, so channel 1 never matches.
        let r = 0.01;
        let value = region_sample_entropy(block.view(), &[0, 1], r);
        let only_first = region_sample_entropy(block.view(), &[0], r);
        assert!(value.is_finite());
        assert_eq!(value, only_first);
        assert!(region_sample_entropy(block.view(), &[], r).is_nan());
    }

    #[test]
    fn test_global_std() {
        let block = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((global_std(block.view()) - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(global_std(Array2::<f64>::zeros((1, 1)).view()), 0.0);
    }

    #[test]
    fn test_zscore() {
        let z = zscore(Array1::from(vec![1.0, 2.0, 3.0]).view());
        assert_eq!(z, vec![-1.0, 0.0, 1.0]);
        assert_eq!(zscore(Array1::from(vec![4.0, 4.0]).view()), vec![0.0, 0.0]);
    }

    #[test]
    fn test_nan_mean_and_subtract() {
        let vectors = vec![
            FeatureVector(vec![1.0, f64::NAN, f64::NAN]),
            FeatureVector(vec![3.0, 4.0, f64::NAN]),
        ];
        let mean = FeatureVector::nan_mean(&vectors).unwrap();
        assert_eq!(mean.0[0], 2.0);
        assert_eq!(mean.0[1], 4.0);
        assert!(mean.0[2].is_nan());
        assert!(FeatureVector::nan_mean(&[]).is_none());

        let delta = FeatureVector(vec![5.0, 5.0, 5.0]).subtract(&mean);
        assert_eq!(delta.0[..2], [3.0, 1.0]);
        assert!(delta.0[2].is_nan());
    }
}
