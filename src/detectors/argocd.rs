//! ArgoCD `Application` detection.
//!
//! Every `.yaml`/`.yml` file is split into documents and each document is
//! parsed on its own. A document whose top-level `kind` is `Application` is a
//! pattern, wherever it lives. Documents that do not parse (Helm templates,
//! for instance) are ignored.

use std::path::Path;

use log::{debug, trace, warn};
use serde_yaml::Value;

use super::{read_text, walk_files, ExcludedDirs};
use crate::error::{Error, Result};
use crate::pattern::{ArgocdMetadata, Pattern, PatternMetadata, SourceType};
use crate::yaml::{lookup, lookup_string, split_documents};

const APPLICATION_KIND: &str = "Application";

#[derive(Debug, Clone, Default)]
pub struct ArgocdDetector {
    excluded: ExcludedDirs,
}

impl ArgocdDetector {
    pub fn new(excluded: ExcludedDirs) -> Self {
        Self { excluded }
    }

    pub fn detect(&self, root: &Path) -> Result<Vec<Pattern>> {
        let mut patterns = Vec::new();

        for file in walk_files(root, &self.excluded)? {
            let is_yaml = file
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if !is_yaml {
                continue;
            }
            let Some(text) = read_text(root, &file) else {
                continue;
            };

            for (index, document) in split_documents(&text).into_iter().enumerate() {
                if document.trim().is_empty() {
                    continue;
                }
                let value: Value = match serde_yaml::from_str(document) {
                    Ok(value) => value,
                    Err(e) => {
                        trace!("{} document {} is not YAML: {}", file.display(), index, e);
                        continue;
                    }
                };
                if lookup_string(&value, &["kind"]).as_deref() != Some(APPLICATION_KIND) {
                    continue;
                }
                match application(&file, index, &value) {
                    Ok(pattern) => {
                        debug!("Found ArgoCD application '{}' in {}", pattern.name, file.display());
                        patterns.push(pattern);
                    }
                    Err(e) => warn!("{}", e),
                }
            }
        }
        Ok(patterns)
    }
}

fn application(file: &Path, index: usize, doc: &Value) -> Result<Pattern> {
    let name = lookup_string(doc, &["metadata", "name"]).ok_or_else(|| Error::Detection {
        path: file.display().to_string(),
        message: format!("Application in document {} has no metadata.name", index),
    })?;

    let source = lookup(doc, &["spec", "source"])
        .or_else(|| lookup(doc, &["spec", "sources"]).and_then(|s| s.get(0)));
    let source_field = |key: &str| source.and_then(|s| lookup_string(s, &[key]));

    let source_type = match source {
        Some(s) if s.get("helm").is_some() || s.get("chart").is_some() => SourceType::Helm,
        Some(s) if s.get("kustomize").is_some() => SourceType::Kustomize,
        _ => SourceType::Directory,
    };
    let automated_sync = lookup(doc, &["spec", "syncPolicy", "automated"]).is_some_and(|v| !v.is_null());

    let metadata = ArgocdMetadata {
        document_index: index,
        project: lookup_string(doc, &["spec", "project"]),
        repo_url: source_field("repoURL"),
        target_revision: source_field("targetRevision"),
        source_path: source_field("path"),
        destination_server: lookup_string(doc, &["spec", "destination", "server"]),
        destination_namespace: lookup_string(doc, &["spec", "destination", "namespace"]),
        source_type,
        automated_sync,
    };

    Pattern::new(
        name,
        file,
        vec![file.to_path_buf()],
        None,
        PatternMetadata::Argocd(metadata),
    )
}
