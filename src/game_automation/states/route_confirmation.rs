use super::keys::*;
use super::{BotContext, Heartbeat, State};
use crate::desktop::DesktopResult;
use crate::game_automation::match_image::ColorMode;
use crate::game_automation::types::{BattleKind, StateKind, StateSpec};

/// Confirm the chosen node, then fight the battle it leads to.
pub struct RouteConfirmationState {
    battle: BattleKind,
    heartbeat: Heartbeat,
}

impl RouteConfirmationState {
    pub fn new(battle: BattleKind, heartbeat: Heartbeat) -> Self {
        Self { battle, heartbeat }
    }
}

impl State for RouteConfirmationState {
    fn kind(&self) -> StateKind {
        StateKind::RouteConfirmation {
            battle: self.battle,
        }
    }

    fn prefetch(&self) -> &'static [&'static str] {
        &[BTN_ROUTE_CONFIRM, TITLE_ROUTE]
    }

    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>> {
        if self.heartbeat.check(self.kind(), ctx) {
            return Ok(Some(StateSpec::to(StateKind::Init)));
        }

        let frame = ctx.grab()?;
        let p = ctx.params;
        let detector = ctx.detector(&frame);
        let battle = StateSpec::to(StateKind::Battle(self.battle));

        if let Some(hit) =
            detector.find_either(BTN_ROUTE_CONFIRM, p.thr_main, None, ColorMode::Color)
        {
            ctx.click(hit.center)?;
            ctx.pause(p.sleep_fast.mul_f64(1.2));
            return Ok(Some(battle));
        }

        // Already confirmed, the fight has started
        if detector.gray(BTN_BATTLE_SKIP, p.thr_main).is_some() {
            return Ok(Some(battle));
        }
        if detector.gray(TITLE_RELIC, p.thr_tag).is_some() {
            return Ok(Some(StateSpec::to(StateKind::RelicSelection)));
        }
        Ok(None)
    }
}
