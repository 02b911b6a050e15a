//! Window surfaces: capture a window's client pixels and post mouse input to it.
//!
//! [`WindowSurface`] is the seam between the automation core and the OS. The
//! Win32 implementation lives in [`windows`] (feature `windows`, Windows only),
//! and [`mock::ScriptedSurface`] serves prepared frames for tests.

use thiserror::Error;

pub mod frame;
pub mod mock;
pub mod privilege;
#[cfg(all(windows, feature = "windows"))]
pub mod windows;

pub use frame::{FrameBuffer, Point, WindowRect};
#[cfg(all(windows, feature = "windows"))]
pub use windows::GdiWindow;

/// Errors raised by a [`WindowSurface`].
#[derive(Error, Debug)]
pub enum CaptureError {
    /// No top-level window carries the requested title
    #[error("window with title '{0}' not found")]
    WindowNotFound(String),

    /// The handle does not refer to a live window
    #[error("invalid window handle")]
    InvalidWindow,

    /// A GDI primitive returned failure
    #[error("GDI call `{call}` failed")]
    Gdi { call: &'static str },

    /// The window rectangle has no area
    #[error("window has an empty rectangle ({width}x{height})")]
    EmptyWindow { width: i32, height: i32 },

    /// Posting an input message to the window failed
    #[error("failed to post message to window: {0}")]
    PostMessage(String),

    /// Querying or raising process privileges failed
    #[error("elevation failed: {0}")]
    Elevation(String),

    /// The scripted surface has no frames left to serve
    #[error("no frame available")]
    NoFrame,
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// A window that can be captured and clicked.
///
/// All coordinates are relative to the window at capture time.
pub trait WindowSurface {
    /// Restore the window if it is minimized, otherwise bring it to the foreground.
    fn restore_and_foreground(&self) -> CaptureResult<()>;

    /// The window's outer rectangle in screen coordinates.
    fn bounds(&self) -> CaptureResult<WindowRect>;

    /// Take a fresh BGRA snapshot of the window.
    fn capture(&self) -> CaptureResult<FrameBuffer>;

    /// Post a left-button-down message at `point` without moving the cursor.
    fn post_left_down(&self, point: Point) -> CaptureResult<()>;

    /// Post a left-button-up message at `point` without moving the cursor.
    fn post_left_up(&self, point: Point) -> CaptureResult<()>;
}

impl<S: WindowSurface + ?Sized> WindowSurface for &S {
    fn restore_and_foreground(&self) -> CaptureResult<()> {
        (**self).restore_and_foreground()
    }

    fn bounds(&self) -> CaptureResult<WindowRect> {
        (**self).bounds()
    }

    fn capture(&self) -> CaptureResult<FrameBuffer> {
        (**self).capture()
    }

    fn post_left_down(&self, point: Point) -> CaptureResult<()> {
        (**self).post_left_down(point)
    }

    fn post_left_up(&self, point: Point) -> CaptureResult<()> {
        (**self).post_left_up(point)
    }
}

/// Pack a point into a mouse message `lParam`: x in the low word, y in the high word.
///
/// Each coordinate is truncated to 16 bits, so negative coordinates keep
/// their two's complement low word the same way `MAKELPARAM` does.
pub fn pack_lparam(point: Point) -> isize {
    let x = (point.x as u32) & 0xFFFF;
    let y = (point.y as u32) & 0xFFFF;
    ((y << 16) | x) as i32 as isize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_lparam() {
        assert_eq!(pack_lparam(Point::new(25, 40)), (40 << 16) | 25);
        assert_eq!(pack_lparam(Point::new(0, 0)), 0);
        assert_eq!(pack_lparam(Point::new(0xFFFF, 0)), 0xFFFF);
    }

    #[test]
    fn test_pack_lparam_negative_x() {
        let packed = pack_lparam(Point::new(-1, 2));
        assert_eq!(packed & 0xFFFF, 0xFFFF);
        assert_eq!((packed >> 16) & 0xFFFF, 2);
    }
}
