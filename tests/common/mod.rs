//! Common test utilities for jumpstart integration tests

use std::path::PathBuf;
use tempfile::TempDir;

/// A test workspace with its own manifest directory and cache directory.
#[allow(dead_code)]
pub struct TestWorkspace {
    #[allow(dead_code)]
    pub temp: TempDir,
    /// Path to workspace root
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a file in the workspace, creating parent directories.
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Write a manifest with the given dependency coordinates, pointing at a
    /// repository nothing listens on.
    pub fn write_manifest(&self, dependencies: &[&str]) -> PathBuf {
        let deps: Vec<String> = dependencies.iter().map(|d| format!("\"{d}\"")).collect();
        self.write_file(
            "jumpstart.json",
            &format!(
                r#"{{
  "dependencies": [{}],
  "repositories": [{{"id": "local", "url": "http://127.0.0.1:1/"}}]
}}"#,
                deps.join(", ")
            ),
        )
    }

    /// Per-workspace cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.path.join("cache")
    }
}

/// Build a jumpstart command isolated to the given workspace's cache.
#[allow(deprecated, dead_code)]
pub fn jumpstart_cmd(workspace: &TestWorkspace) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("jumpstart").expect("binary builds");
    cmd.current_dir(&workspace.path);
    cmd.env("JUMPSTART_CACHE_DIR", workspace.cache_dir());
    cmd
}
