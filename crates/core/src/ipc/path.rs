use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const APP_NAME: &str = "browser-coordinator";

/// First 8 hex characters of SHA-256(absolute workspace path). Not a
/// cryptographic requirement, just a stable low-collision hash over
/// plausible workspace paths on one machine.
pub fn workspace_hash(workspace: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workspace.as_os_str().as_encoded_bytes());
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

#[cfg(unix)]
pub fn socket_path(workspace: &Path) -> PathBuf {
    data_dir().join(format!("ipc-{}.sock", workspace_hash(workspace)))
}

#[cfg(windows)]
pub fn socket_path(workspace: &Path) -> String {
    format!(r"\\.\pipe\{APP_NAME}-{}", workspace_hash(workspace))
}

/// Directory holding all per-workspace socket files, used by `discover`
/// to enumerate and reap stale sockets.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(std::env::temp_dir).join(APP_NAME)
}

/// Path for the coordinator's own control-plane socket (CLI -> `serve`),
/// keyed the same way as the editor-host socket so one workspace's
/// `serve` process and its CLI commands agree on where to meet.
#[cfg(unix)]
pub fn control_socket_path(workspace: Option<&Path>) -> PathBuf {
    let key = workspace.map(workspace_hash).unwrap_or_else(|| "default".to_string());
    data_dir().join(format!("control-{key}.sock"))
}

#[cfg(windows)]
pub fn control_socket_path(workspace: Option<&Path>) -> String {
    let key = workspace.map(workspace_hash).unwrap_or_else(|| "default".to_string());
    format!(r"\\.\pipe\{APP_NAME}-control-{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_eight_chars() {
        let a = workspace_hash(Path::new("/home/user/project"));
        let b = workspace_hash(Path::new("/home/user/project"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn distinct_paths_hash_differently() {
        let a = workspace_hash(Path::new("/home/user/project-a"));
        let b = workspace_hash(Path::new("/home/user/project-b"));
        assert_ne!(a, b);
    }
}
