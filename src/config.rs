use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, VizError};

pub const MIN_BARS: usize = 10;
pub const MAX_BARS: usize = 100;
pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;
pub const MAX_DECAY: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const CYAN: Rgb = Rgb::new(0, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// How bars are colored. Serialized by tag, e.g. `{"kind":"fixed","rgb":{..}}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rgb", rename_all = "snake_case")]
pub enum ColorMode {
    Fixed(Rgb),
    Rainbow,
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Fixed(Rgb::CYAN)
    }
}

impl FromStr for ColorMode {
    type Err = VizError;

    /// Accepts `rainbow`, a preset name, or `r,g,b`.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        let preset = match name.as_str() {
            "rainbow" => return Ok(ColorMode::Rainbow),
            "cyan" => Some(Rgb::CYAN),
            "red" => Some(Rgb::RED),
            "green" => Some(Rgb::GREEN),
            "blue" => Some(Rgb::BLUE),
            "yellow" => Some(Rgb::YELLOW),
            _ => None,
        };
        if let Some(rgb) = preset {
            return Ok(ColorMode::Fixed(rgb));
        }

        let parts: Vec<&str> = name.split(',').map(str::trim).collect();
        if let [r, g, b] = parts.as_slice() {
            let parse = |c: &str| {
                c.parse::<u8>()
                    .map_err(|_| VizError::InvalidConfiguration(format!("bad color component '{c}'")))
            };
            return Ok(ColorMode::Fixed(Rgb::new(parse(r)?, parse(g)?, parse(b)?)));
        }
        Err(VizError::InvalidConfiguration(format!("unknown color '{s}'")))
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Rainbow => write!(f, "rainbow"),
            ColorMode::Fixed(c) => write!(f, "{},{},{}", c.r, c.g, c.b),
        }
    }
}

/// Immutable snapshot of the tunables read by the pipeline each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    pub bar_count: usize,
    pub input_gain: f32,
    pub spectrum_gain: f32,
    pub decay_factor: f32,
    pub cap_decay_factor: f32,
    /// Pixels.
    pub min_bar_height: u32,
    pub max_bar_height_fraction: f32,
    pub use_caps: bool,
    pub auto_scale: bool,
    /// Manual sensitivity, used while `auto_scale` is off.
    pub scale: f32,
    pub color_mode: ColorMode,
    pub debug_output: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            bar_count: 50,
            input_gain: 2.0,
            spectrum_gain: 10.0,
            decay_factor: 0.5,
            cap_decay_factor: 0.9,
            min_bar_height: 10,
            max_bar_height_fraction: 0.8,
            use_caps: false,
            auto_scale: false,
            scale: 2.0,
            color_mode: ColorMode::default(),
            debug_output: true,
        }
    }
}

fn check_range(name: &str, v: f32, lo: f32, hi: f32) -> Result<()> {
    if v >= lo && v <= hi {
        Ok(())
    } else {
        Err(VizError::InvalidConfiguration(format!(
            "{name} must be in [{lo}, {hi}], got {v}"
        )))
    }
}

fn check_positive(name: &str, v: f32) -> Result<()> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(VizError::InvalidConfiguration(format!(
            "{name} must be positive, got {v}"
        )))
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BARS..=MAX_BARS).contains(&self.bar_count) {
            return Err(VizError::InvalidConfiguration(format!(
                "bar count must be in [{MIN_BARS}, {MAX_BARS}], got {}",
                self.bar_count
            )));
        }
        check_positive("input gain", self.input_gain)?;
        check_positive("spectrum gain", self.spectrum_gain)?;
        check_range("decay factor", self.decay_factor, 0.0, MAX_DECAY)?;
        check_range("cap decay factor", self.cap_decay_factor, 0.0, MAX_DECAY)?;
        if !(self.max_bar_height_fraction > 0.0 && self.max_bar_height_fraction <= 1.0) {
            return Err(VizError::InvalidConfiguration(format!(
                "max bar height fraction must be in (0, 1], got {}",
                self.max_bar_height_fraction
            )));
        }
        if !self.auto_scale {
            check_range("scale", self.scale, MIN_SCALE, MAX_SCALE)?;
        }
        Ok(())
    }
}

/// Message from a control surface to the processing loop.
#[derive(Debug)]
pub enum ControlEvent {
    Apply(Configuration),
    Notice(String),
}

/// Control-surface side of the configuration boundary.
#[derive(Clone)]
pub struct ConfigPublisher {
    tx: Sender<ControlEvent>,
}

/// Processing-loop side of the configuration boundary.
pub struct ConfigInbox {
    rx: Receiver<ControlEvent>,
}

pub fn config_channel() -> (ConfigPublisher, ConfigInbox) {
    let (tx, rx) = channel::unbounded();
    (ConfigPublisher { tx }, ConfigInbox { rx })
}

impl ConfigPublisher {
    /// Validates `cfg` and hands it to the processing loop. A rejected
    /// configuration is reported to the loop as a notice and never applied.
    pub fn publish(&self, cfg: Configuration) -> Result<()> {
        if let Err(e) = cfg.validate() {
            let _ = self.tx.send(ControlEvent::Notice(e.to_string()));
            return Err(e);
        }
        // The loop may already be gone during shutdown.
        let _ = self.tx.send(ControlEvent::Apply(cfg));
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Pending {
    pub config: Option<Configuration>,
    pub notice: Option<String>,
}

impl ConfigInbox {
    /// Collects everything published since the last call. Latest wins; an
    /// accepted configuration supersedes any earlier notice.
    pub fn drain(&self) -> Pending {
        let mut pending = Pending::default();
        loop {
            match self.rx.try_recv() {
                Ok(ControlEvent::Apply(cfg)) => {
                    pending.config = Some(cfg);
                    pending.notice = None;
                }
                Ok(ControlEvent::Notice(msg)) => pending.notice = Some(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Configuration::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad = [
            Configuration { bar_count: 9, ..Default::default() },
            Configuration { bar_count: 101, ..Default::default() },
            Configuration { input_gain: 0.0, ..Default::default() },
            Configuration { spectrum_gain: -1.0, ..Default::default() },
            Configuration { decay_factor: 0.95, ..Default::default() },
            Configuration { cap_decay_factor: -0.1, ..Default::default() },
            Configuration { max_bar_height_fraction: 0.0, ..Default::default() },
            Configuration { scale: 7.0, ..Default::default() },
            Configuration { decay_factor: f32::NAN, ..Default::default() },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(VizError::InvalidConfiguration(_))),
                "{cfg:?} should be rejected"
            );
        }
    }

    #[test]
    fn scale_is_ignored_under_auto_scale() {
        let cfg = Configuration { auto_scale: true, scale: 40.0, ..Default::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_color_modes() {
        assert_eq!("rainbow".parse::<ColorMode>().unwrap(), ColorMode::Rainbow);
        assert_eq!("Red".parse::<ColorMode>().unwrap(), ColorMode::Fixed(Rgb::RED));
        assert_eq!(
            "10, 20,30".parse::<ColorMode>().unwrap(),
            ColorMode::Fixed(Rgb::new(10, 20, 30))
        );
        assert!("magenta".parse::<ColorMode>().is_err());
        assert!("1,2,300".parse::<ColorMode>().is_err());
    }

    #[test]
    fn color_mode_serializes_by_tag() {
        let json = serde_json::to_string(&ColorMode::Rainbow).unwrap();
        assert_eq!(json, r#"{"kind":"rainbow"}"#);
        let fixed: ColorMode =
            serde_json::from_str(r#"{"kind":"fixed","rgb":{"r":1,"g":2,"b":3}}"#).unwrap();
        assert_eq!(fixed, ColorMode::Fixed(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn inbox_keeps_latest_and_reports_rejections() {
        let (publisher, inbox) = config_channel();
        publisher
            .publish(Configuration { bar_count: 20, ..Default::default() })
            .unwrap();
        publisher
            .publish(Configuration { bar_count: 30, ..Default::default() })
            .unwrap();
        assert!(publisher
            .publish(Configuration { bar_count: 500, ..Default::default() })
            .is_err());

        let pending = inbox.drain();
        assert_eq!(pending.config.map(|c| c.bar_count), Some(30));
        assert!(pending.notice.unwrap().contains("bar count"));
        assert_eq!(inbox.drain(), Pending::default());
    }

    #[test]
    fn accepted_change_supersedes_earlier_rejection() {
        let (publisher, inbox) = config_channel();
        assert!(publisher
            .publish(Configuration { bar_count: 5, ..Default::default() })
            .is_err());
        publisher
            .publish(Configuration { bar_count: 40, ..Default::default() })
            .unwrap();

        let pending = inbox.drain();
        assert_eq!(pending.config.map(|c| c.bar_count), Some(40));
        assert_eq!(pending.notice, None);
    }
}
