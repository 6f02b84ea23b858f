//! Relic pickup after a battle.
//!
//! Prefers the card marked with a diamond, otherwise takes the leftmost card.
//! Once a card is clicked the state follows its continuation; with an empty
//! continuation it stays and keeps picking until another screen shows up.

use super::keys::*;
use super::{BotContext, Heartbeat, State};
use crate::desktop::DesktopResult;
use crate::game_automation::match_image::Roi;
use crate::game_automation::types::{BattleKind, Continuation, StateKind, StateSpec};
use std::time::{Duration, Instant};

const ROI_DIAMOND: Roi = Roi::new(0.08, 0.18, 0.92, 0.58);
const CARD_CENTERS: [(f64, f64); 3] = [(0.20, 0.62), (0.50, 0.62), (0.80, 0.62)];
const DIAMOND_THRESHOLD_FLOOR: f32 = 0.70;
/// Quiet period after a click while the card animation plays
const CLICK_COOLDOWN: Duration = Duration::from_millis(600);

pub struct RelicSelectionState {
    after: Continuation,
    heartbeat: Heartbeat,
    last_click: Option<Instant>,
}

impl RelicSelectionState {
    pub fn new(after: Continuation, heartbeat: Heartbeat) -> Self {
        Self {
            after,
            heartbeat,
            last_click: None,
        }
    }

    fn clicked(&mut self) -> Option<StateSpec> {
        self.last_click = Some(Instant::now());
        if self.after.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.after).next())
        }
    }
}

impl State for RelicSelectionState {
    fn kind(&self) -> StateKind {
        StateKind::RelicSelection
    }

    fn prefetch(&self) -> &'static [&'static str] {
        &[TITLE_RELIC, RELIC_DIAMOND, TITLE_ROUTE, BTN_BATTLE_SKIP]
    }

    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>> {
        if self.heartbeat.check(self.kind(), ctx) {
            ctx.log("[RELIC] watchdog -> Init");
            return Ok(Some(StateSpec::to(StateKind::Init)));
        }

        let frame = ctx.grab()?;
        let p = ctx.params;
        let detector = ctx.detector(&frame);

        if detector.gray(TITLE_ROUTE, p.thr_tag).is_some() {
            return Ok(Some(StateSpec::to(StateKind::RouteSelection)));
        }
        if detector.gray(BTN_BATTLE_SKIP, p.thr_main).is_some() {
            return Ok(Some(StateSpec::to(StateKind::Battle(BattleKind::Standard))));
        }

        if self
            .last_click
            .is_some_and(|at| at.elapsed() < CLICK_COOLDOWN)
        {
            return Ok(None);
        }

        let diamond_threshold = p.thr_tag.max(DIAMOND_THRESHOLD_FLOOR);
        let target = match detector.color_in(RELIC_DIAMOND, diamond_threshold, ROI_DIAMOND) {
            Some(hit) => {
                ctx.log(format!("[RELIC] diamond @ {} ({:.2})", hit.center, hit.score));
                hit.center
            }
            None => {
                let (rx, ry) = CARD_CENTERS[0];
                let point = frame.point_at(rx, ry);
                ctx.log(format!("[RELIC] click default left @ {point}"));
                point
            }
        };

        ctx.click(target)?;
        ctx.pause(p.sleep_fast);
        Ok(self.clicked())
    }
}
