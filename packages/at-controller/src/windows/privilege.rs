use tracing::info;
use windows::{
    Win32::UI::{
        Shell::{IsUserAnAdmin, ShellExecuteW},
        WindowsAndMessaging::SW_SHOWNORMAL,
    },
    core::{HSTRING, PCWSTR, w},
};

use crate::{CaptureError, CaptureResult};

pub fn is_elevated() -> bool {
    unsafe { IsUserAnAdmin() }.as_bool()
}

/// Start this executable again through the `runas` verb.
///
/// The elevated instance starts in the current working directory so relative
/// template paths keep resolving. The caller should exit afterwards.
pub fn relaunch_elevated() -> CaptureResult<()> {
    let exe = std::env::current_exe().map_err(|err| CaptureError::Elevation(err.to_string()))?;
    let cwd = std::env::current_dir().map_err(|err| CaptureError::Elevation(err.to_string()))?;
    info!("relaunching {} elevated", exe.display());

    let instance = unsafe {
        ShellExecuteW(
            None,
            w!("runas"),
            &HSTRING::from(exe.as_os_str()),
            PCWSTR::null(),
            &HSTRING::from(cwd.as_os_str()),
            SW_SHOWNORMAL,
        )
    };
    // values up to 32 are error codes
    if instance.0 as isize <= 32 {
        return Err(CaptureError::Elevation(format!(
            "ShellExecuteW returned {}",
            instance.0 as isize
        )));
    }
    Ok(())
}
