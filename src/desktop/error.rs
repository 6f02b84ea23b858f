use thiserror::Error;

/// A specialized `Result` type for desktop capture and input operations.
pub type DesktopResult<T> = Result<T, DesktopError>;

/// The error type for everything that touches the real desktop.
#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("Window not found: no open window title contains '{title}'")]
    WindowNotFound { title: String },

    #[error("Failed to enumerate windows: {description}")]
    WindowEnumerationFailed { description: String },

    #[error("Screen capture of window '{title}' failed: {description}")]
    CaptureFailed { title: String, description: String },

    #[error("Captured frame of window '{title}' is empty ({width}x{height})")]
    EmptyFrame {
        title: String,
        width: u32,
        height: u32,
    },

    #[error("Failed to initialise the input device: {description}")]
    InputInitFailed { description: String },

    #[error("Pointer action at ({x}, {y}) failed: {description}")]
    InputFailed { x: i32, y: i32, description: String },

    #[error("Failed to save screenshot: {description}")]
    ScreenshotSaveFailed { description: String },
}

impl DesktopError {
    /// True for the one error `start()` is documented to surface to the caller.
    pub fn is_window_not_found(&self) -> bool {
        matches!(self, DesktopError::WindowNotFound { .. })
    }
}
