use tauri::AppHandle;

/// Runs `task` on the UI thread; window creation must happen there.
pub fn run_on_main_thread_dispatch<F>(
    app_handle: &AppHandle,
    action_name: &str,
    task: F,
) -> Result<(), String>
where
    F: FnOnce(&AppHandle) + Send + 'static,
{
    let main_app = app_handle.clone();
    app_handle
        .run_on_main_thread(move || task(&main_app))
        .map_err(|error| format!("Failed to dispatch '{action_name}' to main thread: {error}"))
}
