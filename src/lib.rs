pub mod args;
pub mod config;
pub mod desktop;
pub mod game_automation;

pub use game_automation::{BotConfig, MazeBot};
