//! Battle and boss battle: skip the fight, tap through the intro and press
//! Next on the result screen.

use super::keys::*;
use super::{BotContext, Heartbeat, State};
use crate::desktop::DesktopResult;
use crate::game_automation::match_image::Roi;
use crate::game_automation::types::{BattleKind, StateKind, StateSpec};
use std::time::Duration;

const ROI_SKIP: Roi = Roi::new(0.78, 0.00, 0.99, 0.22);
const ROI_NEXT: Roi = Roi::new(0.72, 0.78, 0.99, 0.99);

/// How long after entry the intro is tapped through blindly
const SPAM_WINDOW: Duration = Duration::from_millis(2300);
const SPAM_GAP: Duration = Duration::from_millis(40);
const SPAM_PAUSE: Duration = Duration::from_millis(120);
const SPAM_X: f64 = 0.94;
const SPAM_YS: [f64; 3] = [0.10, 0.112, 0.113];

const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(50);

pub struct BattleState {
    battle: BattleKind,
    heartbeat: Heartbeat,
}

impl BattleState {
    pub fn new(battle: BattleKind, heartbeat: Heartbeat) -> Self {
        Self { battle, heartbeat }
    }
}

impl State for BattleState {
    fn kind(&self) -> StateKind {
        StateKind::Battle(self.battle)
    }

    fn prefetch(&self) -> &'static [&'static str] {
        &[BTN_BATTLE_SKIP, BTN_SKIP, BTN_NEXT]
    }

    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>> {
        if self.heartbeat.check(self.kind(), ctx) {
            return Ok(Some(StateSpec::to(StateKind::Init)));
        }

        let frame = ctx.grab()?;
        let p = ctx.params;
        let detector = ctx.detector(&frame);

        let next = detector
            .gray_in(BTN_NEXT, p.thr_main - 0.10, ROI_NEXT)
            .or_else(|| detector.gray(BTN_NEXT, p.thr_main - 0.08));
        if let Some(hit) = next {
            ctx.click(hit.center)?;
            ctx.pause(p.sleep_fast);
            return Ok(Some(StateSpec::with_after(
                StateKind::RelicSelection,
                self.battle.post_chain(),
            )));
        }

        let skip = detector
            .color_in(
                BTN_BATTLE_SKIP,
                (p.thr_skip_color - 0.08).max(0.30),
                ROI_SKIP,
            )
            .or_else(|| detector.gray_in(BTN_BATTLE_SKIP, p.thr_main - 0.12, ROI_SKIP))
            .or_else(|| detector.color_in(BTN_SKIP, p.thr_main - 0.12, ROI_SKIP));
        if let Some(hit) = skip {
            ctx.click(hit.center)?;
            ctx.pause(DOUBLE_CLICK_GAP);
            ctx.click(hit.center)?;
            ctx.pause(p.sleep_fast.mul_f64(0.8));
            return Ok(None);
        }

        if self.heartbeat.elapsed() < SPAM_WINDOW {
            for ry in SPAM_YS {
                if ctx.stop_requested() {
                    break;
                }
                ctx.click(frame.point_at(SPAM_X, ry))?;
                ctx.pause(SPAM_GAP);
            }
            ctx.pause(SPAM_PAUSE);
            return Ok(None);
        }

        ctx.pause(p.sleep_base.mul_f64(0.8));
        Ok(None)
    }
}
