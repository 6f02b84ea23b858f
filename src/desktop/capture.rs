//! Window lookup and capture backed by `xcap`

use super::error::{DesktopError, DesktopResult};
use super::types::{ScreenSource, WindowBinding};
use image::{DynamicImage, RgbImage};
use std::time::Duration;

/// Pause after raising the window so the compositor has drawn it before the
/// first capture.
const ACTIVATE_SETTLE: Duration = Duration::from_millis(150);

/// Screen source for a real desktop session.
#[derive(Default)]
pub struct XcapScreen {
    bound: Option<(u32, xcap::Window)>,
}

impl XcapScreen {
    pub fn new() -> Self {
        Self { bound: None }
    }

    /// Titles of every window that currently reports a non-empty title.
    pub fn list_titles() -> DesktopResult<Vec<String>> {
        let windows = all_windows()?;
        let mut titles: Vec<String> = windows
            .iter()
            .filter_map(|w| w.title().ok())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        titles.sort();
        titles.dedup();
        Ok(titles)
    }

    fn window_for(&mut self, binding: &WindowBinding) -> DesktopResult<&xcap::Window> {
        let cached = matches!(&self.bound, Some((id, _)) if *id == binding.id);
        if !cached {
            let window = all_windows()?
                .into_iter()
                .find(|w| w.id().ok() == Some(binding.id))
                .ok_or_else(|| DesktopError::WindowNotFound {
                    title: binding.title.clone(),
                })?;
            self.bound = Some((binding.id, window));
        }
        match &self.bound {
            Some((_, window)) => Ok(window),
            None => Err(DesktopError::WindowNotFound {
                title: binding.title.clone(),
            }),
        }
    }
}

fn all_windows() -> DesktopResult<Vec<xcap::Window>> {
    xcap::Window::all().map_err(|e| DesktopError::WindowEnumerationFailed {
        description: e.to_string(),
    })
}

fn describe(window: &xcap::Window, title: String) -> DesktopResult<WindowBinding> {
    let enumeration = |e: xcap::XCapError| DesktopError::WindowEnumerationFailed {
        description: format!("reading geometry of '{title}': {e}"),
    };
    Ok(WindowBinding {
        id: window.id().map_err(enumeration)?,
        left: window.x().map_err(enumeration)?,
        top: window.y().map_err(enumeration)?,
        width: window.width().map_err(enumeration)?,
        height: window.height().map_err(enumeration)?,
        title,
    })
}

#[cfg(target_os = "windows")]
fn activate(binding: &WindowBinding) -> bool {
    use windows_sys::Win32::Foundation::HWND;
    use windows_sys::Win32::UI::WindowsAndMessaging::SetForegroundWindow;

    // xcap reports the HWND as the window id on Windows.
    let hwnd = binding.id as usize as HWND;
    unsafe { SetForegroundWindow(hwnd) != 0 }
}

#[cfg(not(target_os = "windows"))]
fn activate(binding: &WindowBinding) -> bool {
    log::debug!(
        "Window activation not supported on this platform, leaving '{}' as is",
        binding.title
    );
    false
}

impl ScreenSource for XcapScreen {
    fn bind(&mut self, title_substring: &str) -> DesktopResult<WindowBinding> {
        let mut candidates: Vec<(String, xcap::Window)> = all_windows()?
            .into_iter()
            .filter_map(|w| {
                let title = w.title().ok()?;
                (!title.trim().is_empty() && title.contains(title_substring)).then_some((title, w))
            })
            .collect();

        if candidates.is_empty() {
            return Err(DesktopError::WindowNotFound {
                title: title_substring.to_string(),
            });
        }

        // Prefer a window that is actually on screen
        let pick = candidates
            .iter()
            .position(|(_, w)| !w.is_minimized().unwrap_or(false))
            .unwrap_or(0);
        let (title, window) = candidates.swap_remove(pick);

        let binding = describe(&window, title)?;
        if activate(&binding) {
            std::thread::sleep(ACTIVATE_SETTLE);
        }
        log::debug!(
            "Bound window '{}' @ {},{} {}x{}",
            binding.title,
            binding.left,
            binding.top,
            binding.width,
            binding.height
        );
        self.bound = Some((binding.id, window));
        Ok(binding)
    }

    fn capture(&mut self, binding: &WindowBinding) -> DesktopResult<RgbImage> {
        let window = self.window_for(binding)?;
        let rgba = window
            .capture_image()
            .map_err(|e| DesktopError::CaptureFailed {
                title: binding.title.clone(),
                description: e.to_string(),
            })?;

        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(DesktopError::EmptyFrame {
                title: binding.title.clone(),
                width,
                height,
            });
        }
        Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}
