use crate::config::{MAX_SCALE, MIN_SCALE};
use crate::dsp::ema;

/// Weight kept from the previous scale on each update.
pub const SCALE_SMOOTHING: f32 = 0.5;

/// Global magnitude-to-pixel sensitivity. `current` stays in
/// `[MIN_SCALE, MAX_SCALE]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleState {
    pub current: f32,
    pub last: f32,
}

impl ScaleState {
    pub fn new(scale: f32) -> Self {
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        Self {
            current: scale,
            last: scale,
        }
    }

    /// Moves the scale halfway towards the level that would put the
    /// loudest bar at a fifth of `render_height`.
    pub fn update(&mut self, displayed: &[f32], render_height: u32) {
        let max_mag = if displayed.is_empty() {
            1.0
        } else {
            displayed.iter().copied().fold(f32::MIN, f32::max)
        };
        if max_mag > 0.0 {
            let target = (max_mag / (render_height as f32 / 5.0)).clamp(MIN_SCALE, MAX_SCALE);
            self.current = ema(self.last, target, SCALE_SMOOTHING).clamp(MIN_SCALE, MAX_SCALE);
            self.last = self.current;
        }
    }
}
