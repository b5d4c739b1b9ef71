use std::{
    env, fs,
    path::{Path, PathBuf},
};

use tauri::{path::BaseDirectory, AppHandle, Manager};

use crate::{
    LaunchError, LaunchPlan, RuntimeManifest, BACKEND_CMD_ENV, BACKEND_CWD_ENV,
    BACKEND_ENTRYPOINT, DEV_RUNTIME_CMD, RUNTIME_MANIFEST_RESOURCE, SOURCE_DIR_ENV,
};

fn read_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn resolve_launch_plan(app: &AppHandle) -> Result<LaunchPlan, LaunchError> {
    let cwd_override = read_env(BACKEND_CWD_ENV).map(PathBuf::from);

    if let Some(custom_cmd) = read_env(BACKEND_CMD_ENV) {
        let cwd = cwd_override
            .or_else(detect_source_root)
            .unwrap_or_else(workspace_root_dir);
        return resolve_custom_launch(&custom_cmd, cwd);
    }

    if let Some(manifest_path) = resolve_resource_path(app, RUNTIME_MANIFEST_RESOURCE) {
        if manifest_path.is_file() {
            return resolve_packaged_launch(&manifest_path, cwd_override);
        }
    }

    let source_root = detect_source_root().ok_or(LaunchError::SourceNotFound)?;
    Ok(resolve_dev_launch(&source_root, cwd_override))
}

pub(crate) fn resolve_custom_launch(custom_cmd: &str, cwd: PathBuf) -> Result<LaunchPlan, LaunchError> {
    let mut pieces = shlex::split(custom_cmd)
        .ok_or_else(|| LaunchError::InvalidCommand(custom_cmd.to_string()))?;
    if pieces.is_empty() {
        return Err(LaunchError::EmptyCommand);
    }

    let cmd = pieces.remove(0);
    Ok(LaunchPlan {
        cmd,
        args: pieces,
        cwd,
        packaged_mode: false,
    })
}

pub(crate) fn resolve_packaged_launch(
    manifest_path: &Path,
    cwd_override: Option<PathBuf>,
) -> Result<LaunchPlan, LaunchError> {
    let backend_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let manifest_text =
        fs::read_to_string(manifest_path).map_err(|source| LaunchError::ManifestRead {
            path: manifest_path.to_path_buf(),
            source,
        })?;
    let manifest: RuntimeManifest =
        serde_json::from_str(&manifest_text).map_err(|source| LaunchError::ManifestParse {
            path: manifest_path.to_path_buf(),
            source,
        })?;

    let default_runtime_relative = if cfg!(target_os = "windows") {
        PathBuf::from("runtime").join("node.exe")
    } else {
        PathBuf::from("runtime").join("node")
    };
    let runtime_path = backend_dir.join(
        manifest
            .runtime
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or(default_runtime_relative),
    );
    if !runtime_path.is_file() {
        return Err(LaunchError::MissingRuntime(runtime_path));
    }

    let entrypoint_path = backend_dir.join(
        manifest
            .entrypoint
            .as_deref()
            .unwrap_or(BACKEND_ENTRYPOINT),
    );
    if !entrypoint_path.is_file() {
        return Err(LaunchError::MissingEntrypoint(entrypoint_path));
    }

    Ok(LaunchPlan {
        cmd: runtime_path.to_string_lossy().to_string(),
        args: vec![entrypoint_path.to_string_lossy().to_string()],
        cwd: cwd_override.unwrap_or(backend_dir),
        packaged_mode: true,
    })
}

pub(crate) fn resolve_dev_launch(source_root: &Path, cwd_override: Option<PathBuf>) -> LaunchPlan {
    LaunchPlan {
        cmd: DEV_RUNTIME_CMD.to_string(),
        args: vec![source_root
            .join(BACKEND_ENTRYPOINT)
            .to_string_lossy()
            .to_string()],
        cwd: cwd_override.unwrap_or_else(|| source_root.to_path_buf()),
        packaged_mode: false,
    }
}

fn workspace_root_dir() -> PathBuf {
    let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..");
    candidate
        .canonicalize()
        .unwrap_or_else(|_| candidate.to_path_buf())
}

fn is_source_root(candidate: &Path) -> bool {
    candidate.join(BACKEND_ENTRYPOINT).is_file()
}

fn detect_source_root() -> Option<PathBuf> {
    if let Some(source_dir) = read_env(SOURCE_DIR_ENV) {
        let candidate = PathBuf::from(source_dir);
        if is_source_root(&candidate) {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }

    find_source_root_from(&workspace_root_dir())
}

/// Walks up from `start` looking for the checkout that holds the backend entrypoint.
pub(crate) fn find_source_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(4)
        .find(|candidate| is_source_root(candidate))
        .map(Path::to_path_buf)
}

fn resolve_resource_path(app: &AppHandle, relative_path: &str) -> Option<PathBuf> {
    app.path()
        .resolve(relative_path, BaseDirectory::Resource)
        .ok()
}

pub(crate) fn build_debug_command(plan: &LaunchPlan) -> Vec<String> {
    let mut parts = vec![plan.cmd.clone()];
    parts.extend(plan.args.clone());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_launch_splits_quoted_arguments() {
        let plan = resolve_custom_launch(
            r#"/opt/node/bin/node "my backend.mjs" --flag"#,
            PathBuf::from("/srv"),
        )
        .expect("custom command should parse");
        assert_eq!(plan.cmd, "/opt/node/bin/node");
        assert_eq!(plan.args, vec!["my backend.mjs", "--flag"]);
        assert_eq!(plan.cwd, PathBuf::from("/srv"));
        assert!(!plan.packaged_mode);
        assert_eq!(
            build_debug_command(&plan),
            vec!["/opt/node/bin/node", "my backend.mjs", "--flag"]
        );
    }

    #[test]
    fn custom_launch_rejects_unbalanced_quotes_and_blank_commands() {
        assert!(matches!(
            resolve_custom_launch("node \"unterminated", PathBuf::new()),
            Err(LaunchError::InvalidCommand(_))
        ));
        assert!(matches!(
            resolve_custom_launch("   ", PathBuf::new()),
            Err(LaunchError::EmptyCommand)
        ));
    }

    #[test]
    fn packaged_launch_uses_manifest_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend_dir = dir.path().join("backend");
        fs::create_dir_all(backend_dir.join("bin")).expect("create runtime dir");
        fs::write(backend_dir.join("bin").join("node"), b"").expect("write runtime");
        fs::write(backend_dir.join("server.mjs"), b"").expect("write entrypoint");
        let manifest_path = backend_dir.join("runtime-manifest.json");
        fs::write(
            &manifest_path,
            r#"{"runtime": "bin/node", "entrypoint": "server.mjs"}"#,
        )
        .expect("write manifest");

        let plan = resolve_packaged_launch(&manifest_path, None).expect("packaged plan");
        assert_eq!(PathBuf::from(&plan.cmd), backend_dir.join("bin").join("node"));
        assert_eq!(
            plan.args,
            vec![backend_dir.join("server.mjs").to_string_lossy().to_string()]
        );
        assert_eq!(plan.cwd, backend_dir);
        assert!(plan.packaged_mode);
    }

    #[test]
    fn packaged_launch_reports_missing_runtime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest_path = dir.path().join("runtime-manifest.json");
        fs::write(&manifest_path, "{}").expect("write manifest");

        assert!(matches!(
            resolve_packaged_launch(&manifest_path, None),
            Err(LaunchError::MissingRuntime(_))
        ));
    }

    #[test]
    fn packaged_launch_reports_malformed_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest_path = dir.path().join("runtime-manifest.json");
        fs::write(&manifest_path, "not json").expect("write manifest");

        assert!(matches!(
            resolve_packaged_launch(&manifest_path, None),
            Err(LaunchError::ManifestParse { .. })
        ));
    }

    #[test]
    fn dev_launch_runs_entrypoint_with_node() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(BACKEND_ENTRYPOINT), b"").expect("write entrypoint");
        let nested = dir.path().join("apps").join("desktop");
        fs::create_dir_all(&nested).expect("create nested dir");

        let root = find_source_root_from(&nested).expect("root should be found");
        assert_eq!(root, dir.path());

        let plan = resolve_dev_launch(&root, None);
        assert_eq!(plan.cmd, DEV_RUNTIME_CMD);
        assert_eq!(
            plan.args,
            vec![dir.path().join(BACKEND_ENTRYPOINT).to_string_lossy().to_string()]
        );
        assert_eq!(plan.cwd, dir.path());
    }
}
