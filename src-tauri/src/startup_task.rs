use std::{sync::Arc, thread};

use tauri::{AppHandle, Manager};

use crate::{
    backend_readiness::{self, ReadinessOutcome},
    backend_supervisor::SupervisorHooks,
    launch_plan, logging, main_window, DesktopState,
};

pub fn spawn_startup_task<F>(app_handle: AppHandle, log: F)
where
    F: Fn(&str) + Send + Copy + 'static,
{
    let spawned = thread::Builder::new()
        .name("openclaw-startup".to_string())
        .spawn(move || run_startup(&app_handle, log));
    if let Err(error) = spawned {
        log(&format!("failed to spawn startup task: {error}"));
    }
}

fn launch_backend(app_handle: &AppHandle, state: &DesktopState) -> bool {
    let plan = match launch_plan::resolve_launch_plan(app_handle) {
        Ok(plan) => plan,
        Err(error) => {
            tracing::error!("Backend failed to start: {error}");
            return false;
        }
    };

    let quit_handle = app_handle.clone();
    let hooks = SupervisorHooks {
        output: Arc::new(logging::relay_backend_line),
        on_quit: Arc::new(move |code: i32| quit_handle.exit(code)),
    };
    match state.supervisor.launch(plan, state.backend_env(), hooks) {
        Ok(()) => true,
        Err(error) => {
            tracing::error!("Backend failed to start: {error}");
            false
        }
    }
}

fn run_startup<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str) + Send + Copy + 'static,
{
    let state = app_handle.state::<DesktopState>();
    log(&format!(
        "backend port {}; dashboard url {}",
        state.port, state.backend_url
    ));

    if launch_backend(app_handle, &state) {
        let supervisor = &state.supervisor;
        let outcome = backend_readiness::wait_for_backend(
            state.port,
            state.config.startup_gate,
            || supervisor.is_alive(),
            || supervisor.announced_ready(),
        );
        match outcome {
            ReadinessOutcome::Ready => log("backend is accepting connections"),
            ReadinessOutcome::Announced => log("backend reported ready"),
            ReadinessOutcome::DelayElapsed => log("startup delay elapsed"),
            ReadinessOutcome::TimedOut => {
                tracing::warn!("backend not reachable before timeout; opening window anyway")
            }
            ReadinessOutcome::BackendExited => {
                tracing::warn!("backend exited before it became reachable")
            }
        }
    } else {
        tracing::warn!("running without a backend; the dashboard will not load");
    }

    main_window::present_main_window(app_handle, log);
}
