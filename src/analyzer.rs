use rustfft::{num_complex::Complex, Fft, FftPlanner, Length};
use std::sync::Arc;

use crate::config::Configuration;
use crate::dsp::{compress, prepare_fft_input_inplace};
use crate::error::{Result, VizError};

/// Number of leading bars attenuated to keep the bass from dominating.
pub const BASS_BARS: usize = 3;
pub const BASS_ATTENUATION: f32 = 0.5;

/// Turns one audio frame into `bar_count` raw bar magnitudes.
///
/// Only the lowest quarter of the DFT bins is kept; the rest of the
/// spectrum is discarded. The retained bins are gained, log-compressed and
/// averaged into equal-width linear groups, one per bar.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f32>,
    plan: Option<Arc<dyn Fft<f32>>>,
    buf: Vec<Complex<f32>>,
    compressed: Vec<f32>,
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            plan: None,
            buf: Vec::new(),
            compressed: Vec::new(),
        }
    }

    fn plan_for(&mut self, len: usize) -> Arc<dyn Fft<f32>> {
        match &self.plan {
            Some(plan) if plan.len() == len => Arc::clone(plan),
            _ => {
                let plan = self.planner.plan_fft_forward(len);
                self.plan = Some(Arc::clone(&plan));
                plan
            }
        }
    }

    pub fn analyze(&mut self, frame: &[f32], cfg: &Configuration) -> Result<Vec<f32>> {
        if frame.is_empty() {
            return Err(VizError::InvalidInput("empty audio frame".into()));
        }
        if let Some(pos) = frame.iter().position(|s| !s.is_finite()) {
            return Err(VizError::InvalidInput(format!(
                "non-finite sample at index {pos}"
            )));
        }

        let fft = self.plan_for(frame.len());
        prepare_fft_input_inplace(frame, cfg.input_gain, &mut self.buf);
        fft.process(&mut self.buf);

        let kept = frame.len() / 4;
        self.compressed.clear();
        self.compressed.extend(
            self.buf[..kept]
                .iter()
                .map(|c| compress(c.norm() * cfg.spectrum_gain)),
        );

        let mut bars = partition_bars(&self.compressed, cfg.bar_count);
        suppress_bass(&mut bars);
        Ok(bars)
    }
}

/// Averages `spectrum` into `bar_count` contiguous groups of
/// `len / bar_count` bins. Bars without a full group stay at zero.
pub fn partition_bars(spectrum: &[f32], bar_count: usize) -> Vec<f32> {
    let mut bars = vec![0.0f32; bar_count];
    if bar_count == 0 {
        return bars;
    }
    let bin_width = spectrum.len() / bar_count;
    if bin_width == 0 {
        return bars;
    }
    for (bar, group) in bars.iter_mut().zip(spectrum.chunks_exact(bin_width)) {
        *bar = group.iter().sum::<f32>() / bin_width as f32;
    }
    bars
}

pub fn suppress_bass(bars: &mut [f32]) {
    let n = BASS_BARS.min(bars.len());
    for v in &mut bars[..n] {
        *v *= BASS_ATTENUATION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(len: usize, cycles: f64) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * cycles * i as f64 / len as f64).sin() as f32)
            .collect()
    }

    #[test]
    fn returns_exactly_bar_count_values() {
        let mut analyzer = SpectrumAnalyzer::new();
        let frame = sine(2048, 40.0);
        for bar_count in [10, 33, 50, 77, 100] {
            let cfg = Configuration { bar_count, ..Default::default() };
            assert_eq!(analyzer.analyze(&frame, &cfg).unwrap().len(), bar_count);
        }
    }

    #[test]
    fn short_frames_pad_with_zeros() {
        let mut analyzer = SpectrumAnalyzer::new();
        let cfg = Configuration { bar_count: 50, ..Default::default() };
        // 64 samples keep 16 bins, fewer than 50 bars.
        let bars = analyzer.analyze(&sine(64, 3.0), &cfg).unwrap();
        assert_eq!(bars, vec![0.0; 50]);
    }

    #[test]
    fn empty_frame_is_invalid_input() {
        let mut analyzer = SpectrumAnalyzer::new();
        let err = analyzer.analyze(&[], &Configuration::default()).unwrap_err();
        assert!(matches!(err, VizError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_frame_is_invalid_input() {
        let mut analyzer = SpectrumAnalyzer::new();
        let err = analyzer
            .analyze(&[0.0, f32::NAN, 0.0, 0.0], &Configuration::default())
            .unwrap_err();
        assert!(matches!(err, VizError::InvalidInput(_)));
    }

    #[test]
    fn silence_gives_zero_bars() {
        let mut analyzer = SpectrumAnalyzer::new();
        let bars = analyzer
            .analyze(&vec![0.0; 2048], &Configuration::default())
            .unwrap();
        assert!(bars.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn bass_bars_are_halved() {
        let spectrum: Vec<f32> = (0..40).map(|i| i as f32 + 1.0).collect();
        let plain = partition_bars(&spectrum, 10);
        let mut suppressed = plain.clone();
        suppress_bass(&mut suppressed);
        for i in 0..10 {
            let expected = if i < 3 { plain[i] * 0.5 } else { plain[i] };
            assert_eq!(suppressed[i], expected);
        }
    }

    #[test]
    fn partition_averages_equal_width_groups() {
        // width floor(23 / 10) = 2, trailing bins ignored
        let spectrum: Vec<f32> = (0..23).map(|i| i as f32).collect();
        let bars = partition_bars(&spectrum, 10);
        assert_eq!(bars[0], 0.5);
        assert_eq!(bars[9], 18.5);
    }

    #[test]
    fn tone_lands_in_expected_bar() {
        let mut analyzer = SpectrumAnalyzer::new();
        let cfg = Configuration { bar_count: 16, ..Default::default() };
        // 512 kept bins, 32 per bar; cycle 200 sits in bar 6.
        let bars = analyzer.analyze(&sine(2048, 200.0), &cfg).unwrap();
        let loudest = bars
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(loudest.0, 6);
    }

    #[test]
    fn matches_direct_computation_for_dc() {
        let mut analyzer = SpectrumAnalyzer::new();
        let cfg = Configuration { bar_count: 10, ..Default::default() };
        // Constant 0.5 over 160 samples: only bin 0 is non-zero,
        // |X0| = 160 * 0.5 * input_gain 2.0 = 160.
        let bars = analyzer.analyze(&vec![0.5; 160], &cfg).unwrap();
        // 40 kept bins, 4 per bar.
        let expected = (160.0f32 * 10.0).ln_1p() / 4.0 * 0.5;
        assert_abs_diff_eq!(bars[0], expected, epsilon = 1e-3);
        assert_abs_diff_eq!(bars[5], 0.0, epsilon = 1e-3);
    }
}
