// Core desktop types and the traits the state machine drives
use super::error::DesktopResult;
use image::RgbImage;
use serde::Serialize;

/// Absolute screen coordinates. Windows on secondary monitors can sit at
/// negative offsets, hence signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The screen rectangle of the window the bot is driving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowBinding {
    pub id: u32,
    pub title: String,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowBinding {
    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }
}

// Trait for anything that can find a window and hand back its pixels
// (xcap on a real desktop, scripted frames in tests)
pub trait ScreenSource {
    /// Locate the first window whose title contains `title_substring`.
    fn bind(&mut self, title_substring: &str) -> DesktopResult<WindowBinding>;

    /// Grab the bound window's rectangle as a 3-channel image.
    fn capture(&mut self, binding: &WindowBinding) -> DesktopResult<RgbImage>;
}

pub trait InputActuator {
    /// Move the pointer to an absolute screen point and left-click.
    fn click(&mut self, point: Point) -> DesktopResult<()>;
}

impl<T: ScreenSource + ?Sized> ScreenSource for Box<T> {
    fn bind(&mut self, title_substring: &str) -> DesktopResult<WindowBinding> {
        (**self).bind(title_substring)
    }

    fn capture(&mut self, binding: &WindowBinding) -> DesktopResult<RgbImage> {
        (**self).capture(binding)
    }
}

impl<T: InputActuator + ?Sized> InputActuator for Box<T> {
    fn click(&mut self, point: Point) -> DesktopResult<()> {
        (**self).click(point)
    }
}
