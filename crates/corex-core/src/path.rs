use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve the workspace root directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. `COREX_PATH` environment variable (with tilde expansion)
/// 3. System data directory
/// 4. `~/.corex` (fallback for systems without a standard data directory)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("COREX_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("corex"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".corex"));
    }

    Err(Error::Config(
        "could not determine workspace path: no HOME directory or system data directory found"
            .to_string(),
    ))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// The session-scoped directory for a workspace id / session id pair, per
/// the persisted layout: `<workspace_root>/<workspace_id>/sessions/<session_id>/`.
pub fn session_root(workspace_root: &Path, workspace_id: &str, session_id: &str) -> PathBuf {
    workspace_root.join(workspace_id).join("sessions").join(session_id)
}

/// Resolve `relative` against `root` and verify the result cannot escape
/// `root`, without requiring the path to exist on disk yet (working-memory
/// writes create files that don't exist before the call). Resolution is
/// purely lexical: `..` components are collapsed against the path built so
/// far rather than against the filesystem, so a caller can't use a symlink
/// planted inside the workspace to redirect a write outside it — any `..`
/// that would climb above `root` is rejected outright instead of being
/// followed.
pub fn resolve_within(root: &Path, relative: &str) -> corex_types::Result<PathBuf> {
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(corex_types::Error::PathEscape(relative.to_string()));
                }
                resolved.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(corex_types::Error::PathEscape(relative.to_string()));
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_within_accepts_nested_relative_path() {
        let root = Path::new("/workspace/sessions/abc");
        let resolved = resolve_within(root, "checkpoints/ckpt_1_100.json").unwrap();
        assert_eq!(resolved, root.join("checkpoints/ckpt_1_100.json"));
    }

    #[test]
    fn resolve_within_rejects_parent_escape() {
        let root = Path::new("/workspace/sessions/abc");
        let err = resolve_within(root, "../other/task_plan.md").unwrap_err();
        assert_eq!(err.kind(), "path_escape");
    }

    #[test]
    fn resolve_within_rejects_absolute_path() {
        let root = Path::new("/workspace/sessions/abc");
        let err = resolve_within(root, "/etc/passwd").unwrap_err();
        assert_eq!(err.kind(), "path_escape");
    }

    #[test]
    fn resolve_within_collapses_internal_traversal_without_net_escape() {
        let root = Path::new("/workspace/sessions/abc");
        let resolved = resolve_within(root, "artifacts/../findings.md").unwrap();
        assert_eq!(resolved, root.join("findings.md"));
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths_untouched() {
        assert_eq!(expand_tilde("/already/absolute"), PathBuf::from("/already/absolute"));
    }
}
