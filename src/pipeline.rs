use tracing::{debug, warn};

use crate::analyzer::SpectrumAnalyzer;
use crate::autoscale::ScaleState;
use crate::caps::CapTracker;
use crate::config::Configuration;
use crate::dsp::peak_amplitude;
use crate::smoother::BarSmoother;

/// Result of one pipeline pass, handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    pub displayed: Vec<f32>,
    pub caps: Vec<f32>,
    pub scale: f32,
}

/// Per-frame signal chain: analyzer, smoother, caps, auto-scale.
///
/// Owns all state that persists between frames. Only the processing loop
/// touches it, one frame at a time.
pub struct FramePipeline {
    cfg: Configuration,
    analyzer: SpectrumAnalyzer,
    smoother: BarSmoother,
    caps: CapTracker,
    scale: ScaleState,
}

impl FramePipeline {
    pub fn new(cfg: Configuration) -> Self {
        let n = cfg.bar_count;
        Self {
            analyzer: SpectrumAnalyzer::new(),
            smoother: BarSmoother::new(n),
            caps: CapTracker::new(n),
            scale: ScaleState::new(cfg.scale),
            cfg,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.cfg
    }

    pub fn scale(&self) -> ScaleState {
        self.scale
    }

    pub fn last_magnitudes(&self) -> &[f32] {
        self.smoother.last_magnitudes()
    }

    pub fn cap_heights(&self) -> &[f32] {
        self.caps.heights()
    }

    /// Swaps in a new configuration between frames.
    pub fn apply_config(&mut self, cfg: Configuration) {
        if cfg.bar_count != self.cfg.bar_count {
            self.smoother.resize(cfg.bar_count);
            self.caps.resize(cfg.bar_count);
        }
        if !cfg.auto_scale {
            self.scale = ScaleState::new(cfg.scale);
        }
        self.cfg = cfg;
    }

    pub fn process(&mut self, frame: &[f32], render_height: u32) -> FrameOutput {
        let cfg = &self.cfg;
        let n = cfg.bar_count;

        let raw = match self.analyzer.analyze(frame, cfg) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("analysis failed, substituting silence: {}", e);
                vec![0.0; n]
            }
        };
        if cfg.debug_output {
            debug!("raw amplitude: {:.2}", peak_amplitude(frame));
        }

        let smoothed = self.smoother.smooth(&raw, cfg.decay_factor);

        let caps = if cfg.use_caps {
            self.caps.update(&smoothed.rising, cfg.cap_decay_factor).to_vec()
        } else {
            self.caps.resize(n);
            self.caps.clear();
            vec![0.0; n]
        };

        if cfg.auto_scale {
            self.scale.update(&smoothed.displayed, render_height);
        }

        if cfg.debug_output {
            let head = &smoothed.displayed[..smoothed.displayed.len().min(5)];
            debug!("first bars (decayed): {:.2?}", head);
            if cfg.use_caps {
                debug!("first caps: {:.2?}", &caps[..caps.len().min(5)]);
            }
            if cfg.auto_scale {
                let max = smoothed.displayed.iter().copied().fold(0.0f32, f32::max);
                debug!("max magnitude: {:.2}, scale: {:.2}", max, self.scale.current);
            }
        }

        FrameOutput {
            displayed: smoothed.displayed,
            caps,
            scale: self.scale.current,
        }
    }
}
