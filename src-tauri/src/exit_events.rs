use tauri::{AppHandle, ExitRequestApi, Manager};

use crate::{append_desktop_log, append_shutdown_log, main_window, DesktopState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowsClosedDecision {
    QuitApp,
    StayResident,
}

/// macOS apps stay in the dock with no windows open; everyone else quits.
pub fn platform_stays_resident() -> bool {
    cfg!(target_os = "macos")
}

pub fn decide_windows_closed(stays_resident: bool) -> WindowsClosedDecision {
    if stays_resident {
        WindowsClosedDecision::StayResident
    } else {
        WindowsClosedDecision::QuitApp
    }
}

pub fn should_present_on_reopen(has_visible_windows: bool) -> bool {
    !has_visible_windows
}

/// `code` is `None` when the last window closed, `Some` for `AppHandle::exit`.
pub fn handle_exit_requested(app_handle: &AppHandle, code: Option<i32>, api: &ExitRequestApi) {
    let state = app_handle.state::<DesktopState>();
    if code.is_none() && !state.supervisor.is_shutting_down() {
        match decide_windows_closed(platform_stays_resident()) {
            WindowsClosedDecision::StayResident => {
                api.prevent_exit();
                append_desktop_log("all windows closed; staying resident");
                return;
            }
            WindowsClosedDecision::QuitApp => {
                append_shutdown_log("all windows closed; quitting");
            }
        }
    } else if let Some(code) = code {
        append_shutdown_log(&format!("exit requested with code {code}"));
    }
}

pub fn handle_exit_event(app_handle: &AppHandle) {
    let state = app_handle.state::<DesktopState>();
    if state.supervisor.stop().is_none() {
        append_shutdown_log("no backend process to stop");
    }
}

pub fn handle_reopen(app_handle: &AppHandle, has_visible_windows: bool) {
    if !should_present_on_reopen(has_visible_windows) {
        return;
    }
    let backend_url = app_handle.state::<DesktopState>().backend_url.clone();
    if let Err(error) =
        main_window::open_main_window(app_handle, &backend_url, append_desktop_log)
    {
        append_desktop_log(&format!("failed to reopen main window: {error}"));
    }
}
