//! Shared test utilities for integration and E2E tests.
//!
//! This module provides source-repository fixtures and helpers to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_helm_chart("charts/demo", "demo");
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::sources;
    pub use super::TestFixture;
}

/// Source file contents for the three pattern kinds.
#[allow(dead_code)]
pub mod sources {
    /// `Chart.yaml` for a chart named `demo`.
    pub const CHART: &str = "apiVersion: v2\nname: demo\ndescription: A demo chart\nversion: 1.0.0\n";

    /// `values.yaml` for the `demo` chart.
    pub const VALUES: &str = "replicaCount: 2\nimage:\n  repository: myorg/demo\n  tag: \"1.4\"\n";

    /// An ArgoCD `Application` named `payments`.
    pub const APPLICATION: &str = r#"apiVersion: argoproj.io/v1alpha1
kind: Application
metadata:
  name: payments
  namespace: argocd
spec:
  project: default
  source:
    repoURL: https://github.com/acme/payments.git
    targetRevision: HEAD
    path: deploy/payments
  destination:
    server: https://kubernetes.default.svc
    namespace: payments
  syncPolicy:
    automated:
      prune: true
"#;

    /// Base `kustomization.yaml` listing one resource.
    pub const KUSTOMIZATION: &str = "namespace: web\nresources:\n- deployment.yaml\n";

    /// Plain resource referenced by [`KUSTOMIZATION`].
    pub const DEPLOYMENT: &str =
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  namespace: web\nspec:\n  replicas: 1\n";
}

/// A temporary workspace holding a source repository, and optionally a target.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_helm_chart("charts/demo", "demo")
///     .with_target("new-service");
///
/// fixture
///     .command()
///     .arg("replicate")
///     .arg(fixture.source())
///     .arg(fixture.target())
///     .assert()
///     .success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
    target_name: String,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new fixture with an empty `source` directory.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("source")
            .create_dir_all()
            .expect("Failed to create source directory");
        Self {
            temp_dir,
            target_name: "new-service".to_string(),
        }
    }

    /// Create an empty target directory with the given name.
    pub fn with_target(mut self, name: &str) -> Self {
        self.temp_dir
            .child(name)
            .create_dir_all()
            .expect("Failed to create target directory");
        self.target_name = name.to_string();
        self
    }

    /// Add a file to the source repository.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child("source")
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a file to the target repository.
    pub fn with_target_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(&self.target_name)
            .child(path)
            .write_str(content)
            .expect("Failed to write target file");
        self
    }

    /// Add the `demo` Helm chart under `dir`.
    pub fn with_helm_chart(self, dir: &str) -> Self {
        self.with_file(&format!("{dir}/Chart.yaml"), sources::CHART)
            .with_file(&format!("{dir}/values.yaml"), sources::VALUES)
    }

    /// Add the `payments` ArgoCD application at `path`.
    pub fn with_argocd_app(self, path: &str) -> Self {
        self.with_file(path, sources::APPLICATION)
    }

    /// Add a Kustomize base under `dir`.
    pub fn with_kustomize_base(self, dir: &str) -> Self {
        self.with_file(&format!("{dir}/kustomization.yaml"), sources::KUSTOMIZATION)
            .with_file(&format!("{dir}/deployment.yaml"), sources::DEPLOYMENT)
    }

    /// Write `.deploy-replicator.yaml` in the working directory.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".deploy-replicator.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Root of the workspace, used as the working directory for commands.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source(&self) -> PathBuf {
        self.temp_dir.path().join("source")
    }

    pub fn target(&self) -> PathBuf {
        self.temp_dir.path().join(&self.target_name)
    }

    /// Directory for saved templates (not created).
    pub fn templates(&self) -> PathBuf {
        self.temp_dir.path().join("templates")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Relative paths of every file under the target, sorted.
    pub fn target_files(&self) -> Vec<String> {
        let target = self.target();
        let mut files: Vec<String> = walkdir::WalkDir::new(&target)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&target)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        files.sort();
        files
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("deploy-replicator");
        cmd.current_dir(self.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("DEPLOY_REPLICATOR_CONFIG");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_source_and_target() {
        let fixture = TestFixture::new().with_target("new-service");
        assert!(fixture.source().is_dir());
        assert!(fixture.target().is_dir());
        assert!(fixture.target_files().is_empty());
    }

    #[test]
    fn test_sources_are_valid_yaml() {
        for text in [
            sources::CHART,
            sources::VALUES,
            sources::APPLICATION,
            sources::KUSTOMIZATION,
            sources::DEPLOYMENT,
        ] {
            serde_yaml::from_str::<serde_yaml::Value>(text).expect("fixture should be valid YAML");
        }
    }
}
