//! Pointer input backed by `enigo`

use super::error::{DesktopError, DesktopResult};
use super::types::{InputActuator, Point};
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use std::time::Duration;

/// Time the pointer rests on the target before the button goes down; some
/// game clients ignore clicks that arrive with the move.
const MOVE_SETTLE: Duration = Duration::from_millis(20);

pub struct EnigoInput {
    enigo: Enigo,
    debug: bool,
}

impl EnigoInput {
    pub fn new(debug: bool) -> DesktopResult<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| DesktopError::InputInitFailed {
            description: e.to_string(),
        })?;
        Ok(Self { enigo, debug })
    }
}

impl InputActuator for EnigoInput {
    fn click(&mut self, point: Point) -> DesktopResult<()> {
        let failed = |e: enigo::InputError| DesktopError::InputFailed {
            x: point.x,
            y: point.y,
            description: e.to_string(),
        };
        self.enigo
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(failed)?;
        std::thread::sleep(MOVE_SETTLE);
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(failed)?;
        if self.debug {
            log::debug!("[CLICK] {},{}", point.x, point.y);
        }
        Ok(())
    }
}
