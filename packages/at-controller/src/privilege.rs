//! Process privilege checks.
//!
//! Posting input to another process's window usually needs the same or a
//! higher integrity level, so the binary relaunches itself elevated when needed.

#[cfg(all(windows, feature = "windows"))]
pub use crate::windows::privilege::{is_elevated, relaunch_elevated};

/// Non-Windows builds have no integrity levels to match.
#[cfg(not(all(windows, feature = "windows")))]
pub fn is_elevated() -> bool {
    true
}

#[cfg(not(all(windows, feature = "windows")))]
pub fn relaunch_elevated() -> crate::CaptureResult<()> {
    Err(crate::CaptureError::Elevation(
        "elevation is only supported on Windows".to_string(),
    ))
}
