//! Threshold-gated template search over a captured frame

use super::correlation::{best_location, score_map};
use super::region::Roi;
use super::template::TemplateStore;
use crate::desktop::Point;
use image::{GrayImage, ImageBuffer, Pixel, RgbImage};
use imageproc::rect::Rect;
use std::cell::OnceCell;

/// One capture of the bound window. The intensity raster is derived on first
/// use and at most once.
#[derive(Debug)]
pub struct Frame {
    origin: Point,
    color: RgbImage,
    gray: OnceCell<GrayImage>,
}

impl Frame {
    pub fn new(origin: Point, color: RgbImage) -> Self {
        Self {
            origin,
            color,
            gray: OnceCell::new(),
        }
    }

    /// Screen position of the frame's top-left pixel
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn color(&self) -> &RgbImage {
        &self.color
    }

    pub fn gray(&self) -> &GrayImage {
        self.gray
            .get_or_init(|| image::imageops::grayscale(&self.color))
    }

    /// Absolute point for a position given as fractions of the frame size.
    pub fn point_at(&self, rx: f64, ry: f64) -> Point {
        let dx = (self.width() as f64 * rx) as i32;
        let dy = (self.height() as f64 * ry) as i32;
        self.origin.offset(dx, dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Gray,
    Color,
}

impl ColorMode {
    pub fn other(self) -> Self {
        match self {
            ColorMode::Gray => ColorMode::Color,
            ColorMode::Color => ColorMode::Gray,
        }
    }
}

/// A located template in absolute screen coordinates. `bottom_right` is
/// exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub key: String,
    pub score: f32,
    pub top_left: Point,
    pub bottom_right: Point,
    pub center: Point,
}

/// Borrowed view pairing the loaded templates with the current frame
pub struct Detector<'a> {
    templates: &'a TemplateStore,
    frame: &'a Frame,
}

impl<'a> Detector<'a> {
    pub fn new(templates: &'a TemplateStore, frame: &'a Frame) -> Self {
        Self { templates, frame }
    }

    /// Best placement of `key` if it scores at least `threshold`.
    ///
    /// Missing templates, regions with no area and templates larger than the
    /// searched area all come back as `None`.
    pub fn find(
        &self,
        key: &str,
        threshold: f32,
        region: Option<Roi>,
        mode: ColorMode,
    ) -> Option<MatchResult> {
        self.best(key, region, mode)
            .filter(|found| found.score >= threshold)
    }

    /// Best placement of `key` regardless of score.
    pub fn best(&self, key: &str, region: Option<Roi>, mode: ColorMode) -> Option<MatchResult> {
        let template = self.templates.get(key)?;
        let rect = region
            .unwrap_or(Roi::FULL)
            .to_rect(self.frame.width(), self.frame.height())?;

        let (score, (x, y)) = match mode {
            ColorMode::Gray => locate(self.frame.gray(), rect, &template.gray)?,
            ColorMode::Color => locate(self.frame.color(), rect, &template.color)?,
        };

        let top_left = self
            .frame
            .origin
            .offset(rect.left() + x as i32, rect.top() + y as i32);
        let (w, h) = (template.width() as i32, template.height() as i32);
        Some(MatchResult {
            key: key.to_string(),
            score,
            top_left,
            bottom_right: top_left.offset(w, h),
            center: top_left.offset(w / 2, h / 2),
        })
    }

    /// Try `first`, then the other mode.
    pub fn find_either(
        &self,
        key: &str,
        threshold: f32,
        region: Option<Roi>,
        first: ColorMode,
    ) -> Option<MatchResult> {
        self.find(key, threshold, region, first)
            .or_else(|| self.find(key, threshold, region, first.other()))
    }

    pub fn gray(&self, key: &str, threshold: f32) -> Option<MatchResult> {
        self.find(key, threshold, None, ColorMode::Gray)
    }

    pub fn color(&self, key: &str, threshold: f32) -> Option<MatchResult> {
        self.find(key, threshold, None, ColorMode::Color)
    }

    pub fn gray_in(&self, key: &str, threshold: f32, region: Roi) -> Option<MatchResult> {
        self.find(key, threshold, Some(region), ColorMode::Gray)
    }

    pub fn color_in(&self, key: &str, threshold: f32, region: Roi) -> Option<MatchResult> {
        self.find(key, threshold, Some(region), ColorMode::Color)
    }
}

/// Score `template` over the `rect` part of `image`; the location is relative
/// to the rect.
fn locate<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    rect: Rect,
    template: &ImageBuffer<P, Vec<u8>>,
) -> Option<(f32, (u32, u32))>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let covers_all = rect.left() == 0
        && rect.top() == 0
        && rect.width() == image.width()
        && rect.height() == image.height();

    let map = if covers_all {
        score_map(image, template)?
    } else {
        let area = image::imageops::crop_imm(
            image,
            rect.left() as u32,
            rect.top() as u32,
            rect.width(),
            rect.height(),
        )
        .to_image();
        score_map(&area, template)?
    };
    Some(best_location(&map))
}
