#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_runtime;
mod app_types;
mod backend_config;
mod backend_control;
mod backend_launch;
mod backend_lifecycle;
mod backend_output;
mod backend_readiness;
mod backend_supervisor;
mod desktop_bridge;
mod desktop_bridge_commands;
mod exit_events;
mod launch_plan;
mod logging;
mod main_window;
mod process_control;
mod run_credential;
mod runtime_paths;
mod startup_task;
mod ui_dispatch;

pub(crate) use app_constants::*;
pub(crate) use app_types::{DesktopState, LaunchError, LaunchPlan, RuntimeManifest};
pub(crate) use logging::{append_desktop_log, append_shutdown_log, append_startup_log};

fn main() {
    app_runtime::run();
}
