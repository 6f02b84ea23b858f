//! Shop and support screens. Both are left through a button in the bottom
//! right corner, so they share one state.

use super::keys::*;
use super::{BotContext, Heartbeat, State};
use crate::desktop::DesktopResult;
use crate::game_automation::match_image::Roi;
use crate::game_automation::types::{Continuation, StateKind, StateSpec};

const ROI_SKIP_BUTTON: Roi = Roi::new(0.72, 0.82, 0.98, 0.98);

pub struct SkipBottomRightState {
    kind: StateKind,
    after: Continuation,
    heartbeat: Heartbeat,
}

impl SkipBottomRightState {
    pub fn new(kind: StateKind, after: Continuation, heartbeat: Heartbeat) -> Self {
        Self {
            kind,
            after,
            heartbeat,
        }
    }

    fn leave(&mut self) -> StateSpec {
        std::mem::take(&mut self.after).next()
    }
}

impl State for SkipBottomRightState {
    fn kind(&self) -> StateKind {
        self.kind
    }

    fn prefetch(&self) -> &'static [&'static str] {
        &[BTN_SHOP_SKIP, BTN_NEXT]
    }

    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>> {
        // Running out of time still moves on along the chain
        if self.heartbeat.check(self.kind, ctx) {
            return Ok(Some(self.leave()));
        }

        let frame = ctx.grab()?;
        let p = ctx.params;
        let detector = ctx.detector(&frame);

        let hit = detector
            .color_in(BTN_SHOP_SKIP, p.thr_main, ROI_SKIP_BUTTON)
            .or_else(|| detector.gray_in(BTN_NEXT, p.thr_main - 0.08, ROI_SKIP_BUTTON));
        if let Some(hit) = hit {
            ctx.click(hit.center)?;
            ctx.pause(p.sleep_fast.mul_f64(1.1));
            return Ok(Some(self.leave()));
        }

        let (cx, cy) = ROI_SKIP_BUTTON.center(frame.width(), frame.height());
        ctx.click(frame.origin().offset(cx as i32, cy as i32))?;
        Ok(None)
    }
}
