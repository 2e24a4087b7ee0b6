/// Height a cap jumps to whenever its bar is rising.
pub const CAP_RESET_HEIGHT: f32 = 10.0;

/// Short-lived peak markers drawn above each bar.
#[derive(Debug, Default)]
pub struct CapTracker {
    heights: Vec<f32>,
}

impl CapTracker {
    pub fn new(num_bars: usize) -> Self {
        Self {
            heights: vec![0.0; num_bars],
        }
    }

    pub fn resize(&mut self, num_bars: usize) {
        if self.heights.len() != num_bars {
            self.heights = vec![0.0; num_bars];
        }
    }

    /// Zeroes every cap, used while caps are disabled.
    pub fn clear(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = 0.0);
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn update(&mut self, rising: &[bool], cap_decay_factor: f32) -> &[f32] {
        self.resize(rising.len());
        let keep = 1.0 - cap_decay_factor;
        for (h, &up) in self.heights.iter_mut().zip(rising) {
            *h = if up {
                CAP_RESET_HEIGHT
            } else {
                (*h * keep).max(0.0)
            };
        }
        &self.heights
    }
}
