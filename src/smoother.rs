/// Instant-attack, bounded-release envelope over bar magnitudes.
#[derive(Debug, Default)]
pub struct BarSmoother {
    last_magnitudes: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    pub displayed: Vec<f32>,
    pub rising: Vec<bool>,
}

impl BarSmoother {
    pub fn new(num_bars: usize) -> Self {
        Self {
            last_magnitudes: vec![0.0; num_bars],
        }
    }

    /// Resets the history to zeros when the bar count changes.
    pub fn resize(&mut self, num_bars: usize) {
        if self.last_magnitudes.len() != num_bars {
            self.last_magnitudes = vec![0.0; num_bars];
        }
    }

    pub fn last_magnitudes(&self) -> &[f32] {
        &self.last_magnitudes
    }

    /// A falling bar drops to at least `last * (1 - decay_factor)`; a bar
    /// at or above its previous value takes the raw value directly.
    pub fn smooth(&mut self, raw: &[f32], decay_factor: f32) -> Smoothed {
        self.resize(raw.len());
        let keep = 1.0 - decay_factor;

        let mut displayed = Vec::with_capacity(raw.len());
        let mut rising = Vec::with_capacity(raw.len());
        for (&r, &last) in raw.iter().zip(&self.last_magnitudes) {
            let floor = last * keep;
            let v = if r < last { r.max(floor) } else { r };
            displayed.push(v);
            rising.push(v > floor);
        }

        self.last_magnitudes.copy_from_slice(&displayed);
        Smoothed { displayed, rising }
    }
}
