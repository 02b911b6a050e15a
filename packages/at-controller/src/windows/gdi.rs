//! Scoped GDI objects.
//!
//! Every handle is owned by a guard that releases it on drop, so an early
//! return from a failed call cannot leak device contexts or bitmaps. Guards
//! must be dropped in reverse order of creation, which plain local bindings do.

use std::{ffi::c_void, mem::size_of};

use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, HBITMAP, HDC, HGDIOBJ, ReleaseDC,
    SRCCOPY, SelectObject,
};

use crate::{CaptureError, CaptureResult};

/// The device context of the whole screen.
pub(super) struct ScreenDc(HDC);

impl ScreenDc {
    pub fn acquire() -> CaptureResult<Self> {
        let dc = unsafe { GetDC(None) };
        if dc.is_invalid() {
            return Err(CaptureError::Gdi { call: "GetDC" });
        }
        Ok(Self(dc))
    }
}

impl Drop for ScreenDc {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(None, self.0);
        }
    }
}

/// An off-screen device context compatible with the screen.
pub(super) struct MemoryDc(HDC);

impl MemoryDc {
    pub fn compatible_with(screen: &ScreenDc) -> CaptureResult<Self> {
        let dc = unsafe { CreateCompatibleDC(Some(screen.0)) };
        if dc.is_invalid() {
            return Err(CaptureError::Gdi {
                call: "CreateCompatibleDC",
            });
        }
        Ok(Self(dc))
    }

    /// Select `bitmap` into this context until the returned guard drops.
    pub fn select<'a>(&'a self, bitmap: &'a Bitmap) -> CaptureResult<Selection<'a>> {
        let previous = unsafe { SelectObject(self.0, bitmap.handle.into()) };
        if previous.is_invalid() {
            return Err(CaptureError::Gdi {
                call: "SelectObject",
            });
        }
        Ok(Selection { dc: self, previous })
    }

    /// Copy `width x height` pixels from `source` at `(x, y)` to the origin of this context.
    pub fn blit_from(
        &self,
        source: &ScreenDc,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> CaptureResult<()> {
        unsafe { BitBlt(self.0, 0, 0, width, height, Some(source.0), x, y, SRCCOPY) }
            .map_err(|_| CaptureError::Gdi { call: "BitBlt" })
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

/// A bitmap compatible with the screen.
pub(super) struct Bitmap {
    handle: HBITMAP,
    width: i32,
    height: i32,
}

impl Bitmap {
    pub fn compatible_with(screen: &ScreenDc, width: i32, height: i32) -> CaptureResult<Self> {
        let handle = unsafe { CreateCompatibleBitmap(screen.0, width, height) };
        if handle.is_invalid() {
            return Err(CaptureError::Gdi {
                call: "CreateCompatibleBitmap",
            });
        }
        Ok(Self {
            handle,
            width,
            height,
        })
    }

    /// Read the bitmap as top-down 32-bit BGRA rows.
    ///
    /// The bitmap must not be selected into any device context.
    pub fn read_bgra(&self, screen: &ScreenDc) -> CaptureResult<Vec<u8>> {
        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: self.width,
                // negative height asks for top-down rows
                biHeight: -self.height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut data = vec![0u8; self.width as usize * self.height as usize * 4];
        let lines = unsafe {
            GetDIBits(
                screen.0,
                self.handle,
                0,
                self.height as u32,
                Some(data.as_mut_ptr() as *mut c_void),
                &mut info,
                DIB_RGB_COLORS,
            )
        };
        if lines != self.height {
            return Err(CaptureError::Gdi { call: "GetDIBits" });
        }
        Ok(data)
    }
}

impl Drop for Bitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.handle.into());
        }
    }
}

/// Restores the previously selected object on drop.
pub(super) struct Selection<'a> {
    dc: &'a MemoryDc,
    previous: HGDIOBJ,
}

impl Drop for Selection<'_> {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.dc.0, self.previous);
        }
    }
}
