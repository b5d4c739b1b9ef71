use tauri::{ipc::CapabilityBuilder, Webview};
use url::Url;

use crate::MAIN_WINDOW_LABEL;

pub const DESKTOP_BRIDGE_GLOBAL: &str = "openclawDesktop";
pub const CREDENTIAL_BRIDGE_CAPABILITY: &str = "credential-bridge";
pub const CREDENTIAL_BRIDGE_PERMISSION: &str = "allow-get-run-credential";

/// Every method the dashboard can call, paired with the command it invokes.
pub const DESKTOP_BRIDGE_METHODS: &[(&str, &str)] = &[("getRunCredential", "get_run_credential")];

pub fn desktop_bridge_script() -> String {
    let methods = DESKTOP_BRIDGE_METHODS
        .iter()
        .map(|(method, command)| format!("{method}: () => internals.invoke({command:?})"))
        .collect::<Vec<_>>()
        .join(",\n      ");

    format!(
        r#"(() => {{
  if (Object.prototype.hasOwnProperty.call(window, {global:?})) return;
  const internals = window.__TAURI_INTERNALS__;
  if (!internals || typeof internals.invoke !== "function") return;
  Object.defineProperty(window, {global:?}, {{
    value: Object.freeze({{
      {methods}
    }}),
    writable: false,
    enumerable: false,
    configurable: false,
  }});
}})();"#,
        global = DESKTOP_BRIDGE_GLOBAL,
    )
}

fn same_origin(left: &Url, right: &Url) -> bool {
    left.scheme() == right.scheme()
        && left.host_str() == right.host_str()
        && left.port_or_known_default() == right.port_or_known_default()
}

/// Only pages served by our own backend get the bridge.
pub fn should_inject_desktop_bridge(backend_url: &str, page_url: &Url) -> bool {
    match Url::parse(backend_url) {
        Ok(backend) => same_origin(&backend, page_url),
        Err(_) => false,
    }
}

/// Remote URL pattern covering every page of the backend origin and nothing else.
pub fn credential_bridge_origin(backend_url: &str) -> Option<String> {
    let backend = Url::parse(backend_url).ok()?;
    let host = backend.host_str()?;
    let port = backend.port_or_known_default()?;
    Some(format!("{}://{host}:{port}/*", backend.scheme()))
}

/// Grants the credential command to the main window while it shows the backend.
pub fn credential_bridge_capability(backend_url: &str) -> Option<CapabilityBuilder> {
    let origin = credential_bridge_origin(backend_url)?;
    Some(
        CapabilityBuilder::new(CREDENTIAL_BRIDGE_CAPABILITY)
            .window(MAIN_WINDOW_LABEL)
            .remote(origin)
            .permission(CREDENTIAL_BRIDGE_PERMISSION),
    )
}

pub fn inject_desktop_bridge<F>(webview: &Webview, log: F)
where
    F: Fn(&str),
{
    if let Err(error) = webview.eval(&desktop_bridge_script()) {
        log(&format!("failed to inject desktop bridge: {error}"));
    }
}
