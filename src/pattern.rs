//! # Deployment Patterns
//!
//! A `Pattern` is one deployment construct discovered in a repository: a Helm
//! chart, an ArgoCD `Application` document or a Kustomize directory. Patterns
//! are plain value objects. The facts that only make sense for one kind live in
//! a tagged `PatternMetadata`, so a Helm pattern can never carry ArgoCD sync
//! settings and vice versa.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The family a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Helm,
    Argocd,
    Kustomize,
}

impl PatternKind {
    /// All kinds, in default detector registration order.
    pub const ALL: [PatternKind; 3] = [PatternKind::Helm, PatternKind::Argocd, PatternKind::Kustomize];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Helm => "helm",
            PatternKind::Argocd => "argocd",
            PatternKind::Kustomize => "kustomize",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "helm" => Ok(PatternKind::Helm),
            "argocd" => Ok(PatternKind::Argocd),
            "kustomize" => Ok(PatternKind::Kustomize),
            other => Err(Error::ConfigParse {
                message: format!("unknown pattern kind '{}'", other),
                hint: Some("Expected one of: helm, argocd, kustomize".to_string()),
            }),
        }
    }
}

/// A dependency declared in a chart's `Chart.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDependency {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// Facts read from a chart's `Chart.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmMetadata {
    pub api_version: Option<String>,
    pub app_version: Option<String>,
    pub description: Option<String>,
    pub chart_type: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

/// How an ArgoCD application sources its manifests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Helm,
    Kustomize,
    #[default]
    Directory,
}

/// Facts read from an ArgoCD `Application` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgocdMetadata {
    /// Position of the document inside its (possibly multi-document) file.
    pub document_index: usize,
    pub project: Option<String>,
    pub repo_url: Option<String>,
    pub target_revision: Option<String>,
    pub source_path: Option<String>,
    pub destination_server: Option<String>,
    pub destination_namespace: Option<String>,
    pub source_type: SourceType,
    pub automated_sync: bool,
}

/// Where a kustomization sits in a base/overlay layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum KustomizeLayout {
    Base,
    Overlay { name: String },
    Standalone,
}

/// Facts read from a `kustomization.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KustomizeMetadata {
    /// Resource entries exactly as listed, including directories and remote refs.
    pub resources: Vec<String>,
    pub namespace: Option<String>,
    pub layout: KustomizeLayout,
    pub has_overlays: bool,
}

/// Kind-specific metadata. The variant determines the pattern's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PatternMetadata {
    Helm(HelmMetadata),
    Argocd(ArgocdMetadata),
    Kustomize(KustomizeMetadata),
}

impl PatternMetadata {
    pub fn kind(&self) -> PatternKind {
        match self {
            PatternMetadata::Helm(_) => PatternKind::Helm,
            PatternMetadata::Argocd(_) => PatternKind::Argocd,
            PatternMetadata::Kustomize(_) => PatternKind::Kustomize,
        }
    }
}

/// One discovered deployment construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    /// Location relative to the scanned root. A directory for Helm and
    /// Kustomize, the manifest file for ArgoCD.
    pub path: PathBuf,
    /// Files belonging to this pattern, relative to the scanned root.
    pub configs: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub metadata: PatternMetadata,
}

impl Pattern {
    /// Build a pattern, rejecting records that break the pattern invariants.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        configs: Vec<PathBuf>,
        version: Option<String>,
        metadata: PatternMetadata,
    ) -> Result<Self> {
        let name = name.into();
        let path = path.into();

        if name.trim().is_empty() {
            return Err(Error::Detection {
                path: path.display().to_string(),
                message: "pattern name is empty".to_string(),
            });
        }
        if configs.is_empty() {
            return Err(Error::Detection {
                path: path.display().to_string(),
                message: format!("{} pattern '{}' has no config files", metadata.kind(), name),
            });
        }
        for p in std::iter::once(&path).chain(configs.iter()) {
            if !crate::path::is_contained_relative(p) {
                return Err(Error::Detection {
                    path: p.display().to_string(),
                    message: "pattern paths must be relative and stay inside the repository".to_string(),
                });
            }
        }

        let mut unique = Vec::with_capacity(configs.len());
        for config in configs {
            if !unique.contains(&config) {
                unique.push(config);
            }
        }

        Ok(Self {
            name,
            path,
            configs: unique,
            version,
            metadata,
        })
    }

    pub fn kind(&self) -> PatternKind {
        self.metadata.kind()
    }

    pub fn reference(&self) -> PatternRef {
        PatternRef {
            kind: self.kind(),
            name: self.name.clone(),
        }
    }

    /// The directory the pattern's files are rooted in, relative to the repository.
    pub fn directory(&self) -> &Path {
        match self.metadata {
            PatternMetadata::Argocd(_) => self.path.parent().unwrap_or_else(|| Path::new("")),
            _ => &self.path,
        }
    }
}

/// Weak reference from a template back to the pattern it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternRef {
    pub kind: PatternKind,
    pub name: String,
}

impl fmt::Display for PatternRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}
