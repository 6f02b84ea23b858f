//! Formation screen: start the exploration and confirm it.

use super::keys::*;
use super::{BotContext, Heartbeat, State};
use crate::desktop::DesktopResult;
use crate::game_automation::match_image::{ColorMode, Roi};
use crate::game_automation::types::{StateKind, StateSpec};

/// Where the confirm button sits when the full-frame search misses it
const ROI_CONFIRM: Roi = Roi::new(0.65, 0.80, 0.98, 0.98);

pub struct PrepareState {
    heartbeat: Heartbeat,
    clicked_explore: bool,
}

impl PrepareState {
    pub fn new(heartbeat: Heartbeat) -> Self {
        Self {
            heartbeat,
            clicked_explore: false,
        }
    }
}

impl State for PrepareState {
    fn kind(&self) -> StateKind {
        StateKind::Prepare
    }

    fn prefetch(&self) -> &'static [&'static str] {
        &[BTN_EXPLORE, BTN_EXPLORE_CONFIRM, TAG_SELECT]
    }

    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>> {
        if self.heartbeat.check(self.kind(), ctx) {
            return Ok(Some(StateSpec::to(StateKind::Init)));
        }

        let frame = ctx.grab()?;
        let p = ctx.params;
        let detector = ctx.detector(&frame);

        if !self.clicked_explore
            && let Some(hit) = detector.find_either(BTN_EXPLORE, p.thr_main, None, ColorMode::Gray)
        {
            ctx.click(hit.center)?;
            self.clicked_explore = true;
            ctx.pause(p.sleep_base);
            return Ok(None);
        }

        let confirm = detector
            .find_either(BTN_EXPLORE_CONFIRM, p.thr_main, None, ColorMode::Gray)
            .or_else(|| detector.color_in(BTN_EXPLORE_CONFIRM, p.thr_main, ROI_CONFIRM));
        if let Some(hit) = confirm {
            ctx.click(hit.center)?;
            ctx.pause(p.sleep_fast.mul_f64(1.2));
            return Ok(Some(StateSpec::to(StateKind::RouteSelection)));
        }

        if detector.gray(TITLE_ROUTE, p.thr_tag).is_some() {
            return Ok(Some(StateSpec::to(StateKind::RouteSelection)));
        }
        Ok(None)
    }
}
