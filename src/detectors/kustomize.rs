//! Kustomize detection.
//!
//! A directory holding `kustomization.yaml` (or `kustomization.yml`; the
//! `.yaml` file wins when both exist) is a pattern named after the directory.
//! Its configs are the kustomization file plus every `resources` entry that
//! exists inside the repository. A file entry contributes itself, a directory
//! entry (usually a base) contributes its kustomization file. Remote
//! references are kept in the metadata but contribute no config files.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};
use serde_yaml::Value;

use super::{directory_name, read_text, walk_files, ExcludedDirs};
use crate::defaults::KUSTOMIZATION_FILES;
use crate::error::{Error, Result};
use crate::path::normalize_relative;
use crate::pattern::{KustomizeLayout, KustomizeMetadata, Pattern, PatternMetadata};
use crate::yaml::lookup_string;

#[derive(Debug, Clone, Default)]
pub struct KustomizeDetector {
    excluded: ExcludedDirs,
}

impl KustomizeDetector {
    pub fn new(excluded: ExcludedDirs) -> Self {
        Self { excluded }
    }

    pub fn detect(&self, root: &Path) -> Result<Vec<Pattern>> {
        let mut seen_dirs = BTreeSet::new();
        let mut patterns = Vec::new();

        for file in walk_files(root, &self.excluded)? {
            let is_kustomization = file
                .file_name()
                .is_some_and(|n| KUSTOMIZATION_FILES.iter().any(|k| n == *k));
            if !is_kustomization {
                continue;
            }
            let dir = file.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
            if !seen_dirs.insert(dir.clone()) {
                debug!("Ignoring {}, directory already has a kustomization", file.display());
                continue;
            }

            match self.read_kustomization(root, &dir, &file) {
                Ok(Some(pattern)) => {
                    debug!("Found Kustomize pattern '{}' at {}", pattern.name, pattern.path.display());
                    patterns.push(pattern);
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
        Ok(patterns)
    }

    fn read_kustomization(&self, root: &Path, dir: &Path, file: &Path) -> Result<Option<Pattern>> {
        let Some(text) = read_text(root, file) else {
            return Ok(None);
        };
        let doc: Value = if text.trim().is_empty() {
            Value::Mapping(Default::default())
        } else {
            serde_yaml::from_str(&text).map_err(|e| Error::Detection {
                path: file.display().to_string(),
                message: e.to_string(),
            })?
        };
        if !doc.is_mapping() {
            return Err(Error::Detection {
                path: file.display().to_string(),
                message: "kustomization is not a mapping".to_string(),
            });
        }

        let resources: Vec<String> = doc
            .get("resources")
            .and_then(Value::as_sequence)
            .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let mut configs = vec![file.to_path_buf()];
        for resource in &resources {
            if let Some(path) = local_resource(root, dir, resource) {
                configs.push(path);
            }
        }

        let metadata = KustomizeMetadata {
            namespace: lookup_string(&doc, &["namespace"]),
            layout: layout(dir),
            has_overlays: has_overlays(root, dir),
            resources,
        };

        Pattern::new(
            directory_name(root, dir),
            dir,
            configs,
            None,
            PatternMetadata::Kustomize(metadata),
        )
        .map(Some)
    }
}

fn is_remote(resource: &str) -> bool {
    resource.contains("://") || resource.starts_with("git@") || resource.starts_with("github.com/")
}

/// The repository-relative config file a local resource entry stands for.
fn local_resource(root: &Path, dir: &Path, resource: &str) -> Option<PathBuf> {
    if is_remote(resource) {
        return None;
    }
    let Some(path) = normalize_relative(&dir.join(resource)) else {
        debug!("Resource '{}' in {} points outside the repository", resource, dir.display());
        return None;
    };
    let full = root.join(&path);
    if full.is_file() {
        return Some(path);
    }
    if full.is_dir() {
        let kustomization = KUSTOMIZATION_FILES
            .iter()
            .map(|name| path.join(name))
            .find(|file| root.join(file).is_file());
        if kustomization.is_none() {
            debug!("Resource directory '{}' in {} has no kustomization", resource, dir.display());
        }
        return kustomization;
    }
    debug!("Resource '{}' in {} does not exist", resource, dir.display());
    None
}

fn layout(dir: &Path) -> KustomizeLayout {
    let segments: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(pos) = segments.iter().position(|s| s == "overlays") {
        let name = segments
            .get(pos + 1)
            .or_else(|| segments.last())
            .cloned()
            .unwrap_or_default();
        return KustomizeLayout::Overlay { name };
    }
    if segments.iter().any(|s| s == "base" || s == "bases") {
        return KustomizeLayout::Base;
    }
    KustomizeLayout::Standalone
}

fn has_overlays(root: &Path, dir: &Path) -> bool {
    match dir.parent() {
        Some(parent) => root.join(parent).join("overlays").is_dir(),
        None => false,
    }
}
