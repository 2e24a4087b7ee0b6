pub mod analyzer;
pub mod audio;
pub mod autoscale;
pub mod buffer;
pub mod caps;
pub mod config;
pub mod controls;
pub mod driver;
pub mod dsp;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod smoother;
pub mod store;
pub mod terminal;

pub use analyzer::{partition_bars, suppress_bass, SpectrumAnalyzer};
pub use audio::{best_config_for, build_stream, pick_input_device, start_capture, Capture};
pub use autoscale::ScaleState;
pub use buffer::{FrameAssembler, FrameQueue};
pub use caps::{CapTracker, CAP_RESET_HEIGHT};
pub use config::{config_channel, ColorMode, ConfigInbox, ConfigPublisher, Configuration, Rgb};
pub use driver::{FrameDriver, Step};
pub use error::VizError;
pub use pipeline::{FrameOutput, FramePipeline};
pub use render::{bar_colors, hsv_to_rgb, layout_bars, pixel_height, Geometry, RenderFrame, Renderer};
pub use smoother::{BarSmoother, Smoothed};
pub use store::{SettingsStore, StoredSettings};
pub use terminal::{TerminalRenderer, TerminalSession};
