//! # Pattern Detectors
//!
//! One detector per pattern family. Each one walks a repository root and
//! returns the patterns it recognizes, in traversal order. Detectors never
//! fail because of a single malformed file: such files are logged as
//! detection errors and skipped. An `Err` from [`Detector::detect`] means the
//! detector could not run at all (for example, the root is not a directory).
//!
//! ## Traversal
//!
//! All detectors share [`walk_files`], which visits files in file-name order
//! and prunes excluded directory names at any depth, so the same tree always
//! yields the same sequence. Saved template directories (a `template.yaml`
//! manifest next to a `files/` directory) are pruned as well: their files hold
//! placeholders, not deployable configuration.

mod argocd;
mod helm;
mod kustomize;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::ReplicatorConfig;
use crate::defaults::{MANIFEST_FILE_NAME, TEMPLATE_FILES_DIR};
use crate::error::{Error, Result};
use crate::pattern::{Pattern, PatternKind};

pub use argocd::ArgocdDetector;
pub use helm::HelmDetector;
pub use kustomize::KustomizeDetector;

/// Directory names pruned from every traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedDirs(Vec<String>);

impl ExcludedDirs {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn from_config(config: &ReplicatorConfig) -> Self {
        Self(config.excluded_dirs())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }
}

impl Default for ExcludedDirs {
    fn default() -> Self {
        Self::from_config(&ReplicatorConfig::default())
    }
}

type DetectFn = dyn Fn(&Path) -> Result<Vec<Pattern>> + Send + Sync;

/// A detector supplied by the caller as a function.
#[derive(Clone)]
pub struct CustomDetector {
    kind: PatternKind,
    name: &'static str,
    detect: Arc<DetectFn>,
}

impl CustomDetector {
    pub fn new<F>(kind: PatternKind, name: &'static str, detect: F) -> Self
    where
        F: Fn(&Path) -> Result<Vec<Pattern>> + Send + Sync + 'static,
    {
        Self {
            kind,
            name,
            detect: Arc::new(detect),
        }
    }
}

impl fmt::Debug for CustomDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDetector")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A registered detector.
#[derive(Debug, Clone)]
pub enum Detector {
    Helm(HelmDetector),
    Argocd(ArgocdDetector),
    Kustomize(KustomizeDetector),
    Custom(CustomDetector),
}

impl Detector {
    /// The detector for `kind`, configured from `config`.
    pub fn for_kind(kind: PatternKind, config: &ReplicatorConfig) -> Self {
        let excluded = ExcludedDirs::from_config(config);
        match kind {
            PatternKind::Helm => Detector::Helm(HelmDetector::new(excluded)),
            PatternKind::Argocd => Detector::Argocd(ArgocdDetector::new(excluded)),
            PatternKind::Kustomize => Detector::Kustomize(KustomizeDetector::new(excluded)),
        }
    }

    pub fn kind(&self) -> PatternKind {
        match self {
            Detector::Helm(_) => PatternKind::Helm,
            Detector::Argocd(_) => PatternKind::Argocd,
            Detector::Kustomize(_) => PatternKind::Kustomize,
            Detector::Custom(d) => d.kind,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Detector::Custom(d) => d.name,
            _ => self.kind().as_str(),
        }
    }

    /// Run the detector over `root`.
    pub fn detect(&self, root: &Path) -> Result<Vec<Pattern>> {
        match self {
            Detector::Helm(d) => d.detect(root),
            Detector::Argocd(d) => d.detect(root),
            Detector::Kustomize(d) => d.detect(root),
            Detector::Custom(d) => (d.detect)(root),
        }
    }
}

/// Helm, ArgoCD and Kustomize detectors, in that order.
pub fn default_detectors(config: &ReplicatorConfig) -> Vec<Detector> {
    PatternKind::ALL
        .into_iter()
        .map(|kind| Detector::for_kind(kind, config))
        .collect()
}

/// List every regular file under `root`, relative to it, in traversal order.
pub(crate) fn walk_files(root: &Path, excluded: &ExcludedDirs) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::Path {
            message: format!("'{}' is not a directory", root.display()),
        });
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !(excluded.contains(&entry.file_name().to_string_lossy()) || is_saved_template(entry.path()))
        });

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Ok(relative) = entry.path().strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }
    Ok(files)
}

fn is_saved_template(dir: &Path) -> bool {
    let saved = dir.join(MANIFEST_FILE_NAME).is_file() && dir.join(TEMPLATE_FILES_DIR).is_dir();
    if saved {
        debug!("Skipping saved template {}", dir.display());
    }
    saved
}

/// Read a file as text, logging and returning `None` when that fails.
pub(crate) fn read_text(root: &Path, relative: &Path) -> Option<String> {
    match std::fs::read_to_string(root.join(relative)) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(
                "{}",
                Error::Detection {
                    path: relative.display().to_string(),
                    message: e.to_string(),
                }
            );
            None
        }
    }
}

/// Name for a pattern rooted at `dir`, falling back to the root's own name.
pub(crate) fn directory_name(root: &Path, dir: &Path) -> String {
    match dir.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => root_name(root),
    }
}

fn root_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}
