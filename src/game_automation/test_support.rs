// Scripted desktop for state machine tests
use super::channels::create_automation_channels;
use super::fsm::{BotConfig, MazeBot};
use super::params::ParamMap;
use super::types::AutomationEvent;
use crate::desktop::{DesktopError, DesktopResult, InputActuator, Point, ScreenSource, WindowBinding};
use image::{Rgb, RgbImage};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedReceiver;

pub const SCREEN_W: u32 = 400;
pub const SCREEN_H: u32 = 300;
/// Where the fake window sits on the desktop
pub const ORIGIN: Point = Point::new(1000, 200);
const BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);

/// Every key the states look for
pub const ALL_KEYS: [&str; 18] = [
    "btn_explore",
    "btn_explore_confirm",
    "tag_select",
    "btn_shop_skip",
    "title_route",
    "btn_route_confirm",
    "btn_battle_skip",
    "btn_skip",
    "btn_next",
    "title_relic",
    "relic_diamond",
    "event_boss",
    "event_risky",
    "event_battle",
    "event_support",
    "event_shop",
    "event_event",
    "event_unknown",
];

/// Deterministic 24x16 texture, different for every key
pub fn pattern(key: &str) -> RgbImage {
    let seed = key
        .bytes()
        .fold(2_166_136_261u32, |h, b| (h ^ b as u32).wrapping_mul(16_777_619));
    RgbImage::from_fn(24, 16, |x, y| {
        let h = (seed ^ x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263))
            .wrapping_mul(2_654_435_761);
        Rgb([(h >> 24) as u8, (h >> 16) as u8, (h >> 8) as u8])
    })
}

/// `pattern(key)` with a mild ripple, still well above the usual thresholds
/// but below an exact copy.
pub fn degraded(key: &str) -> RgbImage {
    let mut image = pattern(key);
    for (x, y, px) in image.enumerate_pixels_mut() {
        let delta = ((x * 7 + y * 13) % 41) as i16 - 20;
        for channel in px.0.iter_mut() {
            *channel = (*channel as i16 + delta).clamp(0, 255) as u8;
        }
    }
    image
}

/// Screen builder: flat background with templates pasted at pixel positions
pub struct Scene(RgbImage);

impl Scene {
    pub fn new() -> Self {
        Self(RgbImage::from_pixel(SCREEN_W, SCREEN_H, BACKGROUND))
    }

    pub fn with(mut self, key: &str, x: i64, y: i64) -> Self {
        image::imageops::replace(&mut self.0, &pattern(key), x, y);
        self
    }

    pub fn with_degraded(mut self, key: &str, x: i64, y: i64) -> Self {
        image::imageops::replace(&mut self.0, &degraded(key), x, y);
        self
    }

    pub fn build(self) -> RgbImage {
        self.0
    }
}

/// Absolute screen point of the center of a template pasted at `(x, y)`
pub fn center_of(x: i32, y: i32) -> Point {
    ORIGIN.offset(x + 12, y + 8)
}

/// Screen source showing whatever frame the test put up last
#[derive(Clone)]
pub struct ScriptedScreen {
    frame: Rc<RefCell<RgbImage>>,
    binds: Rc<Cell<u32>>,
    window_present: Rc<Cell<bool>>,
}

impl ScriptedScreen {
    pub fn new() -> Self {
        Self {
            frame: Rc::new(RefCell::new(Scene::new().build())),
            binds: Rc::new(Cell::new(0)),
            window_present: Rc::new(Cell::new(true)),
        }
    }

    pub fn show(&self, scene: Scene) {
        *self.frame.borrow_mut() = scene.build();
    }

    pub fn binds(&self) -> u32 {
        self.binds.get()
    }

    pub fn close_window(&self) {
        self.window_present.set(false);
    }
}

impl ScreenSource for ScriptedScreen {
    fn bind(&mut self, title_substring: &str) -> DesktopResult<WindowBinding> {
        if !self.window_present.get() {
            return Err(DesktopError::WindowNotFound {
                title: title_substring.to_string(),
            });
        }
        self.binds.set(self.binds.get() + 1);
        Ok(WindowBinding {
            id: 7,
            title: format!("{title_substring} - test"),
            left: ORIGIN.x,
            top: ORIGIN.y,
            width: SCREEN_W,
            height: SCREEN_H,
        })
    }

    fn capture(&mut self, _binding: &WindowBinding) -> DesktopResult<RgbImage> {
        Ok(self.frame.borrow().clone())
    }
}

/// Input actuator that only remembers where it clicked
#[derive(Clone, Default)]
pub struct RecordingInput {
    clicks: Rc<RefCell<Vec<Point>>>,
}

impl RecordingInput {
    pub fn clicks(&self) -> Vec<Point> {
        self.clicks.borrow().clone()
    }

    pub fn take(&self) -> Vec<Point> {
        std::mem::take(&mut *self.clicks.borrow_mut())
    }
}

impl InputActuator for RecordingInput {
    fn click(&mut self, point: Point) -> DesktopResult<()> {
        self.clicks.borrow_mut().push(point);
        Ok(())
    }
}

pub type TestBot = MazeBot<ScriptedScreen, RecordingInput>;

/// A started bot with every template on disk, plus handles to drive it.
pub struct Harness {
    pub bot: TestBot,
    pub screen: ScriptedScreen,
    pub input: RecordingInput,
    pub events: UnboundedReceiver<AutomationEvent>,
    _templates: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_params(ParamMap::new())
    }

    pub fn with_params(params: ParamMap) -> Self {
        let templates = tempfile::tempdir().unwrap();
        for key in ALL_KEYS {
            pattern(key)
                .save(templates.path().join(format!("{key}.png")))
                .unwrap();
        }

        let screen = ScriptedScreen::new();
        let input = RecordingInput::default();
        let (sink, events) = create_automation_channels();
        let config = BotConfig {
            title: "Maze".to_string(),
            templates_dir: templates.path().to_path_buf(),
            debug: false,
        };
        let mut bot = MazeBot::new(config, screen.clone(), input.clone(), sink, move || params.clone());
        bot.start().unwrap();

        Self {
            bot,
            screen,
            input,
            events,
            _templates: templates,
        }
    }

    /// Drain everything sent so far
    pub fn drain_events(&mut self) -> Vec<AutomationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
