use std::{thread, time::Duration};

use tracing::{debug, info, warn};
use windows::{
    Win32::{
        Foundation::{HWND, LPARAM, RECT, WPARAM},
        UI::WindowsAndMessaging::{
            FindWindowW, GetWindowRect, IsIconic, IsWindow, PostMessageW, SW_RESTORE,
            SetForegroundWindow, SetProcessDPIAware, ShowWindow, WM_LBUTTONDOWN, WM_LBUTTONUP,
        },
    },
    core::{HSTRING, PCWSTR},
};

use crate::{
    CaptureError, CaptureResult, FrameBuffer, Point, WindowRect, WindowSurface, pack_lparam,
};

mod gdi;
pub mod privilege;

use gdi::{Bitmap, MemoryDc, ScreenDc};

/// Default pause between raising the window and measuring it.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// A top-level window captured through GDI and driven with posted messages.
pub struct GdiWindow {
    hwnd: HWND,
    title: String,
    settle_delay: Duration,
}

impl GdiWindow {
    /// Find a top-level window by its exact title.
    pub fn find(title: &str) -> CaptureResult<Self> {
        let hwnd = unsafe { FindWindowW(PCWSTR::null(), &HSTRING::from(title)) }
            .map_err(|_| CaptureError::WindowNotFound(title.to_string()))?;
        if hwnd.is_invalid() {
            return Err(CaptureError::WindowNotFound(title.to_string()));
        }
        info!("[GdiWindow] found '{}' at {:?}", title, hwnd);
        Ok(Self {
            hwnd,
            title: title.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        })
    }

    /// Wrap an existing handle, e.g. the desktop window.
    pub fn from_hwnd(hwnd: HWND) -> CaptureResult<Self> {
        if !unsafe { IsWindow(Some(hwnd)) }.as_bool() {
            return Err(CaptureError::InvalidWindow);
        }
        Ok(Self {
            hwnd,
            title: String::new(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        })
    }

    /// Override how long [`WindowSurface::capture`] waits after raising the window.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    fn ensure_alive(&self) -> CaptureResult<()> {
        if unsafe { IsWindow(Some(self.hwnd)) }.as_bool() {
            Ok(())
        } else {
            Err(CaptureError::InvalidWindow)
        }
    }

    fn post(&self, msg: u32, point: Point) -> CaptureResult<()> {
        self.ensure_alive()?;
        unsafe {
            PostMessageW(
                Some(self.hwnd),
                msg,
                WPARAM(0),
                LPARAM(pack_lparam(point)),
            )
        }
        .map_err(|err| CaptureError::PostMessage(err.to_string()))
    }
}

/// Stop Windows from scaling the window contents, so captures match the real pixels.
pub fn set_dpi_aware() {
    if !unsafe { SetProcessDPIAware() }.as_bool() {
        warn!("SetProcessDPIAware failed, captures may be scaled");
    }
}

/// Copy `rect` off the screen DC. Every GDI object is released on return, including on failure.
fn grab(rect: &WindowRect) -> CaptureResult<FrameBuffer> {
    let (width, height) = (rect.width(), rect.height());
    let screen = ScreenDc::acquire()?;
    let memory = MemoryDc::compatible_with(&screen)?;
    let bitmap = Bitmap::compatible_with(&screen, width, height)?;
    {
        let _selection = memory.select(&bitmap)?;
        memory.blit_from(&screen, rect.left, rect.top, width, height)?;
    }
    let data = bitmap.read_bgra(&screen)?;
    debug!("[GdiWindow] captured {}x{}", width, height);

    FrameBuffer::from_raw(width as u32, height as u32, data)
        .ok_or(CaptureError::Gdi { call: "GetDIBits" })
}

impl WindowSurface for GdiWindow {
    fn restore_and_foreground(&self) -> CaptureResult<()> {
        self.ensure_alive()?;
        unsafe {
            if IsIconic(self.hwnd).as_bool() {
                let _ = ShowWindow(self.hwnd, SW_RESTORE);
            } else if !SetForegroundWindow(self.hwnd).as_bool() {
                // the foreground lock may refuse us, the capture still works if the window is visible
                warn!("[GdiWindow] SetForegroundWindow refused for '{}'", self.title);
            }
        }
        Ok(())
    }

    fn bounds(&self) -> CaptureResult<WindowRect> {
        self.ensure_alive()?;
        let mut rect = RECT::default();
        unsafe { GetWindowRect(self.hwnd, &mut rect) }
            .map_err(|_| CaptureError::Gdi {
                call: "GetWindowRect",
            })?;
        Ok(WindowRect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }

    /// Raise the window, wait for it to settle, then copy its rectangle off the screen DC.
    ///
    /// The copy covers the full `width x height` of the window rectangle.
    fn capture(&self) -> CaptureResult<FrameBuffer> {
        self.restore_and_foreground()?;
        thread::sleep(self.settle_delay);

        let rect = self.bounds()?;
        if rect.is_empty() {
            return Err(CaptureError::EmptyWindow {
                width: rect.width(),
                height: rect.height(),
            });
        }
        grab(&rect)
    }

    fn post_left_down(&self, point: Point) -> CaptureResult<()> {
        self.post(WM_LBUTTONDOWN, point)
    }

    fn post_left_up(&self, point: Point) -> CaptureResult<()> {
        self.post(WM_LBUTTONUP, point)
    }
}
