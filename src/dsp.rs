use rustfft::num_complex::Complex;

/// Dynamic range compression applied to spectrum magnitudes.
#[inline]
pub fn compress(m: f32) -> f32 {
    m.ln_1p()
}

/// Single-pole smoothing: `alpha * prev + (1 - alpha) * x`.
#[inline]
pub fn ema(prev: f32, x: f32, alpha: f32) -> f32 {
    alpha * prev + (1.0 - alpha) * x
}

#[inline]
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Fills `buf` with the gain-scaled samples as complex FFT input.
#[inline]
pub fn prepare_fft_input_inplace(
    samples: &[f32],
    gain: f32,
    buf: &mut Vec<Complex<f32>>,
) {
    buf.clear();
    buf.reserve(samples.len());
    for &x in samples {
        buf.push(Complex {
            re: x * gain,
            im: 0.0,
        });
    }
}
