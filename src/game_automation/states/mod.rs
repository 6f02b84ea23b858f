// Maze states
// One struct per screen the bot knows how to handle. Each step captures a
// frame, looks for the cues of its screen and either acts, stays or names
// the next state.

pub mod battle;
pub mod init;
pub mod prepare;
pub mod relic_selection;
pub mod route_confirmation;
pub mod route_selection;
pub mod skip_bottom_right;

use super::channels::{EventSink, StopHandle};
use super::match_image::{Detector, Frame, TemplateStore};
use super::params::RunParams;
use super::types::{StateKind, StateSpec};
use crate::desktop::{DesktopResult, InputActuator, Point, ScreenSource, WindowBinding};
use std::time::{Duration, Instant};

pub use battle::BattleState;
pub use init::InitState;
pub use prepare::PrepareState;
pub use relic_selection::RelicSelectionState;
pub use route_confirmation::RouteConfirmationState;
pub use route_selection::RouteSelectionState;
pub use skip_bottom_right::SkipBottomRightState;

/// Template keys shared by several states
pub mod keys {
    pub const BTN_EXPLORE: &str = "btn_explore";
    pub const BTN_EXPLORE_CONFIRM: &str = "btn_explore_confirm";
    pub const TAG_SELECT: &str = "tag_select";
    pub const BTN_SHOP_SKIP: &str = "btn_shop_skip";
    pub const TITLE_ROUTE: &str = "title_route";
    pub const BTN_ROUTE_CONFIRM: &str = "btn_route_confirm";
    pub const BTN_BATTLE_SKIP: &str = "btn_battle_skip";
    pub const BTN_SKIP: &str = "btn_skip";
    pub const BTN_NEXT: &str = "btn_next";
    pub const TITLE_RELIC: &str = "title_relic";
    pub const RELIC_DIAMOND: &str = "relic_diamond";
    pub const EVENT_BOSS: &str = "event_boss";
}

/// Everything a state may touch during one step. Borrowed from the bot for
/// the duration of the step.
pub struct BotContext<'a> {
    pub screen: &'a mut dyn ScreenSource,
    pub input: &'a mut dyn InputActuator,
    pub binding: &'a mut WindowBinding,
    pub templates: &'a TemplateStore,
    pub params: &'a RunParams,
    pub sink: &'a EventSink,
    pub stop: &'a StopHandle,
    pub title: &'a str,
    pub debug: bool,
}

impl<'a> BotContext<'a> {
    /// Capture the bound window as a fresh frame
    pub fn grab(&mut self) -> DesktopResult<Frame> {
        let image = self.screen.capture(self.binding)?;
        Ok(Frame::new(self.binding.origin(), image))
    }

    /// Detector over `frame`. Holds no borrow of the context, so clicks can
    /// follow a match while the detector is still in use.
    pub fn detector<'f>(&self, frame: &'f Frame) -> Detector<'f>
    where
        'a: 'f,
    {
        Detector::new(self.templates, frame)
    }

    pub fn click(&mut self, point: Point) -> DesktopResult<()> {
        self.input.click(point)?;
        if self.debug {
            self.sink.log(format!("[CLICK] {},{}", point.x, point.y));
        }
        Ok(())
    }

    pub fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    pub fn log(&self, line: impl Into<String>) {
        self.sink.log(line);
    }

    /// Look the window up again; it may have moved since the last bind.
    pub fn rebind(&mut self) -> DesktopResult<()> {
        *self.binding = self.screen.bind(self.title)?;
        Ok(())
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }
}

/// Watchdog for one visit to a state.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    started: Instant,
    timeout: Duration,
    last_beat: Option<Instant>,
    beats: u64,
}

impl Heartbeat {
    pub fn new(timeout: Duration) -> Self {
        Self::starting_at(Instant::now(), timeout)
    }

    pub fn starting_at(started: Instant, timeout: Duration) -> Self {
        Self {
            started,
            timeout,
            last_beat: None,
            beats: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn timed_out(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) > self.timeout
    }

    /// Advance the beat counter on the first check and then once a second.
    /// Returns the new count when it moved.
    pub fn tick(&mut self, now: Instant) -> Option<u64> {
        let due = self
            .last_beat
            .is_none_or(|last| now.saturating_duration_since(last) >= Duration::from_secs(1));
        if due {
            self.last_beat = Some(now);
            self.beats += 1;
            Some(self.beats)
        } else {
            None
        }
    }

    /// Beat and report whether the state has outstayed its timeout.
    pub fn check(&mut self, kind: StateKind, ctx: &BotContext<'_>) -> bool {
        let now = Instant::now();
        if let Some(beats) = self.tick(now)
            && ctx.debug
        {
            ctx.log(format!("[STATE] {kind} +{beats}s"));
        }
        self.timed_out(now)
    }
}

pub trait State {
    fn kind(&self) -> StateKind;

    /// Templates this state looks for, checked when it becomes current
    fn prefetch(&self) -> &'static [&'static str];

    /// One capture/match/act cycle. `Ok(None)` means stay.
    fn step(&mut self, ctx: &mut BotContext<'_>) -> DesktopResult<Option<StateSpec>>;
}

/// Build the state a transition names, with its standard watchdog
pub fn instantiate(spec: StateSpec) -> Box<dyn State> {
    let timeout = spec.kind.timeout();
    instantiate_with_timeout(spec, timeout)
}

pub(crate) fn instantiate_with_timeout(spec: StateSpec, timeout: Duration) -> Box<dyn State> {
    let heartbeat = Heartbeat::new(timeout);
    match spec.kind {
        StateKind::Init => Box::new(InitState::new(heartbeat)),
        StateKind::Prepare => Box::new(PrepareState::new(heartbeat)),
        StateKind::RouteSelection => Box::new(RouteSelectionState::new(heartbeat)),
        StateKind::RouteConfirmation { battle } => {
            Box::new(RouteConfirmationState::new(battle, heartbeat))
        }
        StateKind::Battle(battle) => Box::new(BattleState::new(battle, heartbeat)),
        StateKind::RelicSelection => Box::new(RelicSelectionState::new(spec.after, heartbeat)),
        StateKind::Shop | StateKind::Support => {
            Box::new(SkipBottomRightState::new(spec.kind, spec.after, heartbeat))
        }
    }
}
