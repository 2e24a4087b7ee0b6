use std::fmt;

/// Errors raised by the visualizer pipeline and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum VizError {
    /// Malformed or empty audio frame. The frame is dropped.
    InvalidInput(String),
    /// A configuration value outside its accepted range.
    InvalidConfiguration(String),
    /// Capture device disconnected or the stream faulted.
    AudioCapture(String),
    /// The drawing surface failed.
    Render(String),
    /// Reading or writing the settings document failed.
    Store(String),
}

impl fmt::Display for VizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VizError::InvalidInput(e) => write!(f, "invalid input: {}", e),
            VizError::InvalidConfiguration(e) => write!(f, "invalid configuration: {}", e),
            VizError::AudioCapture(e) => write!(f, "audio capture error: {}", e),
            VizError::Render(e) => write!(f, "render error: {}", e),
            VizError::Store(e) => write!(f, "settings store error: {}", e),
        }
    }
}

impl std::error::Error for VizError {}

pub type Result<T> = std::result::Result<T, VizError>;
