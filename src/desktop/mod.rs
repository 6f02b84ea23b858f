// Desktop module - window capture and synthetic pointer input
// The state machine only sees the ScreenSource / InputActuator traits; the
// xcap and enigo implementations live here.

pub mod capture;
pub mod error;
pub mod input;
pub mod types;

// Re-export the main types for easy access
pub use capture::XcapScreen;
pub use error::{DesktopError, DesktopResult};
pub use input::EnigoInput;
pub use types::{InputActuator, Point, ScreenSource, WindowBinding};
