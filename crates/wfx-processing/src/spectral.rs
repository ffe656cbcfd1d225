//! Welch power spectral density estimation
//!
//! Segments of `min(round(2 * fs), n)` samples with 50% overlap, a periodic
//! Hamming taper and constant detrending. Each segment is zero-padded to the
//! next power of two, and the averaged periodogram is scaled to a one-sided
//! density in units²/Hz.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;
use wfx_core::{WfxError, WfxResult};

/// Channel×frequency PSD with its frequency axis
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Bin centre frequencies in Hz, ascending from 0
    pub frequencies: Array1<f64>,
    /// One row per channel, one column per frequency bin
    pub psd: Array2<f64>,
}

impl Spectrum {
    pub fn n_bins(&self) -> usize {
        self.frequencies.len()
    }
}

/// Segment length used for a block of `n` samples at `sample_rate`
pub fn segment_length(sample_rate: f64, n: usize) -> usize {
    let two_seconds = (2.0 * sample_rate).round().max(1.0) as usize;
    two_seconds.min(n).max(1)
}

/// Periodic Hamming window of length `m`
pub fn hamming(m: usize) -> Vec<f64> {
    if m <= 1 {
        return vec![1.0; m];
    }
    (0..m)
        .map(|k| 0.54 - 0.46 * (2.0 * PI * k as f64 / m as f64).cos())
        .collect()
}

/// Reusable Welch estimator
///
/// Holds an FFT planner so repeated windows of the same length reuse plans.
/// Not shared between threads; each worker builds its own.
pub struct WelchEstimator {
    planner: RealFftPlanner<f64>,
}

impl Default for WelchEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl WelchEstimator {
    pub fn new() -> Self {
        Self { planner: RealFftPlanner::new() }
    }

    /// Estimate the PSD of every row of a channel×sample block
    pub fn estimate(&mut self, block: ArrayView2<'_, f64>, sample_rate: f64) -> WfxResult<Spectrum> {
        let (n_channels, n) = block.dim();
        if n == 0 {
            return Err(WfxError::Computation {
                reason: "cannot estimate a spectrum from an empty block".to_string(),
            });
        }

        let nperseg = segment_length(sample_rate, n);
        let nfft = nperseg.next_power_of_two();
        let n_bins = nfft / 2 + 1;
        let taper = hamming(nperseg);
        let fft = self.planner.plan_fft_forward(nfft);

        let mut psd = Array2::zeros((n_channels, n_bins));
        for (c, row) in block.rows().into_iter().enumerate() {
            let channel_psd = channel_psd(&fft, row, &taper, nfft, sample_rate)?;
            psd.row_mut(c).assign(&channel_psd);
        }

        let frequencies = Array1::from_shape_fn(n_bins, |k| k as f64 * sample_rate / nfft as f64);
        Ok(Spectrum { frequencies, psd })
    }
}

/// One-shot PSD; builds a fresh planner
pub fn welch_psd(block: ArrayView2<'_, f64>, sample_rate: f64) -> WfxResult<Spectrum> {
    WelchEstimator::new().estimate(block, sample_rate)
}

fn channel_psd(
    fft: &Arc<dyn RealToComplex<f64>>,
    signal: ArrayView1<'_, f64>,
    taper: &[f64],
    nfft: usize,
    sample_rate: f64,
) -> WfxResult<Array1<f64>> {
    let nperseg = taper.len();
    let step = nperseg - nperseg / 2;
    let n = signal.len();
    let n_bins = nfft / 2 + 1;

    let mut input = fft.make_input_vec();
    let mut output: Vec<Complex<f64>> = fft.make_output_vec();
    let mut accum = Array1::<f64>::zeros(n_bins);
    let mut segments = 0usize;

    let mut start = 0;
    while start + nperseg <= n {
        let segment = signal.slice(ndarray::s![start..start + nperseg]);
        let mean = segment.mean().unwrap_or(0.0);

        input.iter_mut().for_each(|x| *x = 0.0);
        for (slot, (x, w)) in input.iter_mut().zip(segment.iter().zip(taper)) {
            *slot = (x - mean) * w;
        }

        fft.process(&mut input, &mut output).map_err(|e| WfxError::Computation {
            reason: format!("FFT of length {} failed: {}", nfft, e),
        })?;

        for (acc, bin) in accum.iter_mut().zip(&output) {
            *acc += bin.norm_sqr();
        }
        segments += 1;
        start += step;
    }

    if segments == 0 {
        return Err(WfxError::Computation {
            reason: format!("no complete {}-sample segment in {} samples", nperseg, n),
        });
    }

    let window_power: f64 = taper.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sample_rate * window_power * segments as f64);
    accum.mapv_inplace(|p| p * scale);

    // Fold negative frequencies into the one-sided estimate. DC and, for even
    // lengths, Nyquist have no mirror image.
    let last = if nfft % 2 == 0 { n_bins - 1 } else { n_bins };
    for k in 1..last {
        accum[k] *= 2.0;
    }

    Ok(accum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize, amplitude: f64) -> Vec<f64> {
        (0..n).map(|t| amplitude * (2.0 * PI * freq * t as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_frequency_axis() {
        let fs = 128.0;
        let block = Array2::from_shape_vec((1, 1024), sine(10.0, fs, 1024, 1.0)).unwrap();
        let spectrum = welch_psd(block.view(), fs).unwrap();
        // 256-sample segments, already a power of two.
        assert_eq!(spectrum.n_bins(), 129);
        assert_eq!(spectrum.frequencies[0], 0.0);
        assert!((spectrum.frequencies[128] - 64.0).abs() < 1e-12);
        assert!((spectrum.frequencies[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_peak_at_signal_frequency() {
        let fs = 125.0;
        let block = Array2::from_shape_vec((1, 2500), sine(10.0, fs, 2500, 2.0)).unwrap();
        let spectrum = welch_psd(block.view(), fs).unwrap();
        let row = spectrum.psd.row(0);
        let (peak, _) = row
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (k, &p)| if p > best.1 { (k, p) } else { best });
        assert!((spectrum.frequencies[peak] - 10.0).abs() < 0.5);
    }

    #[test]
    fn test_density_preserves_variance() {
        // Integrated one-sided density approximates the signal variance.
        let fs = 200.0;
        let amplitude = 3.0;
        let block = Array2::from_shape_vec((1, 4000), sine(25.0, fs, 4000, amplitude)).unwrap();
        let spectrum = welch_psd(block.view(), fs).unwrap();
        let df = spectrum.frequencies[1] - spectrum.frequencies[0];
        let total: f64 = spectrum.psd.row(0).sum() * df;
        let variance = amplitude * amplitude / 2.0;
        assert!((total - variance).abs() / variance < 0.05, "total {} vs {}", total, variance);
    }

    #[test]
    fn test_short_block_uses_whole_block() {
        // 100 samples at 250 Hz: segment shrinks to the block, FFT pads to 128.
        let fs = 250.0;
        let block = Array2::from_shape_fn((3, 100), |(c, t)| ((c + 1) as f64 * t as f64).sin());
        let spectrum = welch_psd(block.view(), fs).unwrap();
        assert_eq!(spectrum.psd.dim(), (3, 65));
        assert!(spectrum.psd.iter().all(|p| p.is_finite() && *p >= 0.0));
    }

    #[test]
    fn test_hamming_shape() {
        let w = hamming(8);
        assert!((w[0] - 0.08).abs() < 1e-12);
        assert!((w[4] - 1.0).abs() < 1e-12);
        assert_eq!(hamming(1), vec![1.0]);
        assert_eq!(segment_length(125.0, 10_000), 250);
        assert_eq!(segment_length(125.0, 40), 40);
    }

    #[test]
    fn test_empty_block_is_error() {
        let block = Array2::<f64>::zeros((2, 0));
        assert!(welch_psd(block.view(), 100.0).is_err());
    }
}
