use tauri::State;

use crate::DesktopState;

#[tauri::command]
pub(crate) fn get_run_credential(state: State<'_, DesktopState>) -> String {
    state.bridge_credential().to_string()
}

#[cfg(test)]
mod tests {
    use tauri::{
        ipc::{CallbackFn, InvokeBody},
        test::{get_ipc_response, mock_builder, mock_context, noop_assets, INVOKE_KEY},
        webview::InvokeRequest,
        WebviewUrl, WebviewWindowBuilder,
    };

    use super::*;
    use crate::{
        backend_config::BackendConfig, desktop_bridge::DESKTOP_BRIDGE_METHODS,
        BACKEND_CREDENTIAL_ENV, MAIN_WINDOW_LABEL,
    };

    /// Commands registered with the invoke handler. Must match `build.rs`.
    const DESKTOP_BRIDGE_COMMANDS: &[&str] = &["get_run_credential"];

    #[test]
    fn bridge_methods_map_onto_registered_commands() {
        let invoked: Vec<&str> = DESKTOP_BRIDGE_METHODS
            .iter()
            .map(|(_, command)| *command)
            .collect();
        assert_eq!(invoked, DESKTOP_BRIDGE_COMMANDS);
    }

    #[test]
    fn app_manifest_allows_exactly_the_registered_commands() {
        let build_script = include_str!("../build.rs");
        let listed = format!(".commands(&{:?})", DESKTOP_BRIDGE_COMMANDS);
        assert!(
            build_script.contains(&listed),
            "build.rs must declare {listed}"
        );
    }

    #[test]
    fn invoking_the_command_returns_the_credential_given_to_the_backend() {
        let state = DesktopState::bootstrap(BackendConfig::default()).expect("bootstrap");
        let injected = state
            .backend_env()
            .overrides()
            .into_iter()
            .find(|(key, _)| *key == BACKEND_CREDENTIAL_ENV)
            .map(|(_, value)| value)
            .expect("credential is injected");

        let app = mock_builder()
            .manage(state)
            .invoke_handler(tauri::generate_handler![get_run_credential])
            .build(mock_context(noop_assets()))
            .expect("mock app");
        let webview = WebviewWindowBuilder::new(&app, MAIN_WINDOW_LABEL, WebviewUrl::default())
            .build()
            .expect("mock webview");

        let response = get_ipc_response(
            &webview,
            InvokeRequest {
                cmd: "get_run_credential".into(),
                callback: CallbackFn(0),
                error: CallbackFn(1),
                url: "http://tauri.localhost".parse().expect("valid url"),
                body: InvokeBody::default(),
                headers: Default::default(),
                invoke_key: INVOKE_KEY.to_string(),
            },
        )
        .expect("command should answer");
        let answered: String = response.deserialize().expect("credential is a string");

        assert_eq!(answered, injected);
        assert_eq!(answered.len(), 64);
    }
}
