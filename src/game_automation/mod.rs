// Game automation module
// This module provides the finite state machine that plays the maze screens:
// capture, template matching, decision and click, one state at a time.

pub mod channels;
pub mod fsm;
pub mod match_image;
pub mod params;
pub mod states;
pub mod types;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

// Re-export the main types and functions for easy access
pub use channels::{EventSink, StopHandle, create_automation_channels};
pub use fsm::{BotConfig, MazeBot};
pub use match_image::{ColorMode, Detector, Frame, MatchResult, Roi, TemplateStore};
pub use params::{ParamMap, ParamProvider, ParamValue, RunParams};
pub use types::{AutomationEvent, BattleKind, Continuation, StateKind, StateSpec};
