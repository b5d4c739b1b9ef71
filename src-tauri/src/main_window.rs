use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use url::Url;

use crate::{
    ui_dispatch, DesktopState, MAIN_WINDOW_HEIGHT, MAIN_WINDOW_LABEL, MAIN_WINDOW_TITLE,
    MAIN_WINDOW_WIDTH,
};

/// Creates the hidden dashboard window, or reveals the existing one.
///
/// The window stays hidden until its first page finishes loading; see
/// [`show_main_window`].
pub fn open_main_window<F>(app_handle: &AppHandle, backend_url: &str, log: F) -> Result<(), String>
where
    F: Fn(&str),
{
    if app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_some() {
        show_main_window(app_handle, log);
        return Ok(());
    }

    let url = Url::parse(backend_url)
        .map_err(|error| format!("Invalid backend URL {backend_url}: {error}"))?;
    WebviewWindowBuilder::new(app_handle, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
        .title(MAIN_WINDOW_TITLE)
        .inner_size(MAIN_WINDOW_WIDTH, MAIN_WINDOW_HEIGHT)
        .visible(false)
        .build()
        .map_err(|error| format!("Failed to create main window: {error}"))?;
    log(&format!("main window created for {backend_url}"));
    Ok(())
}

pub fn show_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log("show_main_window skipped: main window not found");
        return;
    };

    if let Err(error) = window.unminimize() {
        log(&format!("failed to unminimize main window: {error}"));
    }
    if let Err(error) = window.show() {
        log(&format!("failed to show main window: {error}"));
    }
    if let Err(error) = window.set_focus() {
        log(&format!("failed to focus main window: {error}"));
    }
}

/// Schedules [`open_main_window`] on the UI thread from a background thread.
pub fn present_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str) + Send + Copy + 'static,
{
    let backend_url = app_handle.state::<DesktopState>().backend_url.clone();
    let dispatched =
        ui_dispatch::run_on_main_thread_dispatch(app_handle, "open main window", move |main_app| {
            if let Err(error) = open_main_window(main_app, &backend_url, log) {
                log(&error);
            }
        });
    if let Err(error) = dispatched {
        log(&error);
    }
}
