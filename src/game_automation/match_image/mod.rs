//! Image matching for the maze screens
//!
//! Templates are loaded once from disk and searched for in every captured
//! frame, either across the whole window or inside a fractional region.

pub mod correlation;
pub mod detector;
pub mod region;
pub mod template;


// Re-export main types
pub use detector::{ColorMode, Detector, Frame, MatchResult};
pub use region::{Roi, clamp01};
pub use template::{Template, TemplateLoadError, TemplateStore};
