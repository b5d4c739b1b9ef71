use tauri::{webview::PageLoadEvent, Manager, RunEvent, WindowEvent};

use crate::{
    append_desktop_log, append_startup_log, backend_config::BackendConfig, desktop_bridge,
    exit_events, logging, main_window, runtime_paths, startup_task, DesktopState,
    DESKTOP_LOG_FILE, MAIN_WINDOW_LABEL,
};

pub(crate) fn run() {
    let log_path =
        logging::resolve_desktop_log_path(runtime_paths::default_root_dir(), DESKTOP_LOG_FILE);
    let mut logging_guard = Some(logging::init(&log_path));

    append_startup_log("desktop process starting");
    append_startup_log(&format!("desktop log path: {}", log_path.display()));

    let state = match DesktopState::bootstrap(BackendConfig::from_env()) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("OpenClaw startup failed: {error}");
            drop(logging_guard);
            std::process::exit(1);
        }
    };

    tauri::Builder::default()
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::get_run_credential,
        ])
        .on_page_load(|webview, payload| match payload.event() {
            PageLoadEvent::Started => {
                append_desktop_log(&format!("page-load started: {}", payload.url()));
                let state = webview.app_handle().state::<DesktopState>();
                if desktop_bridge::should_inject_desktop_bridge(&state.backend_url, payload.url()) {
                    desktop_bridge::inject_desktop_bridge(webview, append_desktop_log);
                }
            }
            PageLoadEvent::Finished => {
                append_desktop_log(&format!("page-load finished: {}", payload.url()));
                let state = webview.app_handle().state::<DesktopState>();
                if desktop_bridge::should_inject_desktop_bridge(&state.backend_url, payload.url()) {
                    desktop_bridge::inject_desktop_bridge(webview, append_desktop_log);
                }
                if webview.window().label() == MAIN_WINDOW_LABEL {
                    main_window::show_main_window(webview.app_handle(), append_desktop_log);
                }
            }
        })
        .setup(|app| {
            let backend_url = app.state::<DesktopState>().backend_url.clone();
            match desktop_bridge::credential_bridge_capability(&backend_url) {
                Some(capability) => app.add_capability(capability)?,
                None => tracing::error!(
                    "cannot grant the credential bridge to invalid backend url {backend_url}"
                ),
            }
            startup_task::spawn_startup_task(app.handle().clone(), append_startup_log);
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(move |app_handle, event| match event {
            RunEvent::ExitRequested { code, api, .. } => {
                exit_events::handle_exit_requested(app_handle, code, &api);
            }
            RunEvent::Exit => {
                exit_events::handle_exit_event(app_handle);
                drop(logging_guard.take());
            }
            RunEvent::WindowEvent {
                label,
                event: WindowEvent::Destroyed,
                ..
            } => {
                append_desktop_log(&format!("window '{label}' closed"));
            }
            #[cfg(target_os = "macos")]
            RunEvent::Reopen {
                has_visible_windows,
                ..
            } => {
                exit_events::handle_reopen(app_handle, has_visible_windows);
            }
            _ => {}
        });
}
