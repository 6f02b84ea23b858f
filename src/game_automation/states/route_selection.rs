//! Route map: pick the next node by event priority.
//!
//! Event icons are searched in the left part of the map first. When nothing
//! in the priority list clears the threshold there, a second pass widens the
//! region and lowers the threshold slightly. Within a pass the first key in
//! priority order that matches wins, whatever the scores of later keys.

use super::keys::*;
use super::{BotContext, Heartbeat, State};
use crate::desktop::{DesktopResult, Point};
use crate::game_automation::match_image::{ColorMode, Detector, Roi};
use crate::game_automation::params::DEFAULT_EVENT_PRIORITY;
use crate::game_automation::types::{BattleKind, StateKind, StateSpec};
use std::time::{Duration, Instant};

const LEFT_RATIO_MIN: f64 = 0.05;
const LEFT_RATIO_MAX: f64 = 0.75;
/// Second pass: how far the region grows to the right, and its hard limit
const PASS2_WIDEN: f64 = 0.12;
const PASS2_RIGHT_CAP: f64 = 0.78;
/// Second pass threshold is `thr_main` minus this
const PASS2_THRESHOLD_DROP: f32 = 0.02;
/// The route title is accepted well below `thr_tag`, but never under 0.5
const TITLE_THRESHOLD_DROP: f32 = 0.15;
const TITLE_THRESHOLD_FLOOR: f32 = 0.5;
const DEBUG_INTERVAL: Duration = Duration::from_millis(700);
const DEBUG_SEEN_LIMIT: usize = 8;

pub struct RouteSelectionState {
    heartbeat: Heartbeat,
    last_debug: Option<Instant>,
}

/// A chosen event node
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePick {
    pub key: String,
    pub center: Point,
    pub roi: Roi,
}

impl RouteSelectionState {
    pub fn new(heartbeat: Heartbeat) -> Self {
        Self {
            heartbeat,
            last_debug: None,
        }
    }
}

/// `route_left_ratio` limited to the range the map layout allows
pub fn left_ratio(route_left_ratio: f64) -> f64 {
    route_left_ratio.clamp(LEFT_RATIO_MIN, LEFT_RATIO_MAX)
}

pub fn pass1_roi(left: f64) -> Roi {
    Roi::new(0.05, 0.18, left, 0.86)
}

pub fn pass2_roi(left: f64) -> Roi {
    Roi::new(0.02, 0.12, (left + PASS2_WIDEN).min(PASS2_RIGHT_CAP), 0.90)
}

/// Walk `priority` in order and return the first key found in `roi`, gray
/// before color.
fn first_in_priority(
    detector: &Detector<'_>,
    priority: &[String],
    roi: Roi,
    threshold: f32,
) -> Option<RoutePick> {
    priority.iter().find_map(|key| {
        detector
            .find_either(key, threshold, Some(roi), ColorMode::Gray)
            .map(|hit| RoutePick {
                key: key.clone(),
                center: hit.center,
                roi,
            })
    })
}

/// Run both passes over the route map
pub fn pick_event(
    detector: &Detector<'_>,
    priority: &[String],
    route_left_ratio: f64,
    thr_main: f32,
) -> Option<RoutePick> {
    let left = left_ratio(route_left_ratio);
    first_in_priority(detector, priority, pass1_roi(left), thr_main).or_else(|| {
        first_in_priority(
            detector,
            priority,
            pass2_roi(left),
            thr_main - PASS2_THRESHOLD_DROP,
        )
    })
}

impl RouteSelectionState {
    fn log_diagnostics(&mut self, ctx: &BotContext<'_>, detector: &Detector<'_>, title_score: f32) {
        let now = Instant::now();
        if self
            .last_debug
            .is_some_and(|last| now.duration_since(last) <= DEBUG_INTERVAL)
        {
            return;
        }

        let p = ctx.params;
        let left = left_ratio(p.route_left_ratio);
        let roi = pass1_roi(left);
        ctx.log(format!(
            "[ROUTE/DBG] title_route={title_score:.2} | roi={roi} | left_ratio={left:.2}"
        ));
        ctx.log(format!("[ROUTE/DBG] priority={:?}", p.event_priority));

        // Everything visible at a loose threshold
        let loose = (p.thr_main - 0.25).max(0.50);
        let mut seen: Vec<_> = DEFAULT_EVENT_PRIORITY
            .iter()
            .filter_map(|key| detector.find_either(key, loose, Some(roi), ColorMode::Gray))
            .collect();
        seen.sort_by(|a, b| b.score.total_cmp(&a.score));
        for hit in seen.iter().take(DEBUG_SEEN_LIMIT) {
            ctx.log(format!(
                "[ROUTE/DBG] seen {:>12} v={:.2} @ {}",
                hit.key, hit.score, hit.center
            ));
        }

        // What the strict pass would accept
        let eligible: Vec<String> = p
            .event_priority
            .iter()
            .filter_map(|key| detector.find_either(key, p.thr_main, Some(roi), ColorMode::Gray))
            .map(|hit| format!("{}:{:.2}@{}", hit.key, hit.score, hit.center))
            .collect();
        let eligible = if eligible.is_empty() {
            "(none)".to_string()
        } else {
            eligible.join(", ")
        };
        ctx.log(format!("[ROUTE/DBG] eligible={eligible}"));

        self.last_debug = Some(now);
    }
}

impl State for RouteSelectionState {
    fn kind(&self) -> StateKind {
        StateKind::RouteSelection
    }

    fn prefetch(&self) -> &'static [&'static str] {
        &[
            TITLE_ROUTE,
            BTN_ROUTE_CONFIRM,
            "event_boss",
            "event_battle",
            "event_risky",
            "event_support",
            "event_shop",
            "event_event",
            "event_unknown",
        ]
    }

    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>> {
        if self.heartbeat.check(self.kind(), ctx) {
            return Ok(Some(StateSpec::to(StateKind::Init)));
        }

        let frame = ctx.grab()?;
        let p = ctx.params;
        let detector = ctx.detector(&frame);

        let title_threshold = (p.thr_tag - TITLE_THRESHOLD_DROP).max(TITLE_THRESHOLD_FLOOR);
        let Some(title) = detector.gray(TITLE_ROUTE, title_threshold) else {
            // Not on the map: hand over to whatever screen this is
            let next = if detector.gray(BTN_BATTLE_SKIP, p.thr_main).is_some() {
                StateKind::Battle(BattleKind::Standard)
            } else if detector.gray(TITLE_RELIC, p.thr_tag).is_some() {
                StateKind::RelicSelection
            } else if detector.gray(BTN_ROUTE_CONFIRM, p.thr_main).is_some() {
                StateKind::RouteConfirmation {
                    battle: BattleKind::Standard,
                }
            } else {
                StateKind::Init
            };
            return Ok(Some(StateSpec::to(next)));
        };

        if ctx.debug {
            self.log_diagnostics(ctx, &detector, title.score);
        }

        let Some(pick) = pick_event(&detector, &p.event_priority, p.route_left_ratio, p.thr_main)
        else {
            return Ok(None);
        };

        if ctx.debug {
            ctx.log(format!(
                "[ROUTE] choose {} @ {} (roi={})",
                pick.key, pick.center, pick.roi
            ));
        }
        ctx.click(pick.center)?;
        ctx.pause(p.sleep_fast);

        let battle = if pick.key == EVENT_BOSS {
            BattleKind::Boss
        } else {
            BattleKind::Standard
        };
        Ok(Some(StateSpec::to(StateKind::RouteConfirmation { battle })))
    }
}
