//! Triage: work out which screen the game is on after a start or a watchdog
//! reset.

use super::keys::*;
use super::{BotContext, Heartbeat, State};
use crate::desktop::DesktopResult;
use crate::game_automation::match_image::ColorMode;
use crate::game_automation::types::{BattleKind, StateKind, StateSpec};

pub struct InitState {
    heartbeat: Heartbeat,
    bound: bool,
}

impl InitState {
    pub fn new(heartbeat: Heartbeat) -> Self {
        Self {
            heartbeat,
            bound: false,
        }
    }
}

impl State for InitState {
    fn kind(&self) -> StateKind {
        StateKind::Init
    }

    fn prefetch(&self) -> &'static [&'static str] {
        &[
            BTN_EXPLORE,
            BTN_EXPLORE_CONFIRM,
            TAG_SELECT,
            BTN_NEXT,
            TITLE_ROUTE,
            BTN_ROUTE_CONFIRM,
            BTN_BATTLE_SKIP,
            TITLE_RELIC,
        ]
    }

    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>> {
        if !self.bound {
            ctx.rebind()?;
            self.bound = true;
        }

        if self.heartbeat.check(self.kind(), ctx) {
            return Ok(Some(StateSpec::to(StateKind::RouteSelection)));
        }

        let frame = ctx.grab()?;
        let p = ctx.params;
        let next_hit = {
            let detector = ctx.detector(&frame);

            // Formation / preparation screen
            let preparing = detector.gray(BTN_EXPLORE, p.thr_main).is_some()
                || detector
                    .find_either(BTN_EXPLORE_CONFIRM, p.thr_main, None, ColorMode::Gray)
                    .is_some()
                || detector.gray(TAG_SELECT, p.thr_tag).is_some();
            if preparing {
                return Ok(Some(StateSpec::to(StateKind::Prepare)));
            }

            let next_hit = detector.gray(BTN_NEXT, p.thr_main);
            if next_hit.is_none() {
                if detector.gray(TITLE_ROUTE, p.thr_tag).is_some() {
                    return Ok(Some(StateSpec::to(StateKind::RouteSelection)));
                }
                if detector.gray(BTN_ROUTE_CONFIRM, p.thr_main).is_some() {
                    return Ok(Some(StateSpec::to(StateKind::RouteConfirmation {
                        battle: BattleKind::Standard,
                    })));
                }
                if detector.gray(BTN_BATTLE_SKIP, p.thr_main).is_some() {
                    return Ok(Some(StateSpec::to(StateKind::Battle(BattleKind::Standard))));
                }
                if detector.gray(TITLE_RELIC, p.thr_tag).is_some() {
                    return Ok(Some(StateSpec::to(StateKind::RelicSelection)));
                }
            }
            next_hit
        };

        // Reward popups and the like: press Next and look again
        if let Some(hit) = next_hit {
            ctx.click(hit.center)?;
            ctx.pause(p.sleep_fast.mul_f64(1.1));
        }
        Ok(None)
    }
}
