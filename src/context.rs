//! # Variable Context
//!
//! The values templates are rendered with for one target repository. Values
//! come from layers, resolved from highest to lowest priority:
//!
//! 1. **Overrides** supplied by the caller (`--set`, `--vars`).
//! 2. **Inspection** of patterns already present in the target: an existing
//!    ArgoCD destination or Kustomize namespace, an ArgoCD `repoURL` when
//!    the repository has no git remote, a Helm `image.repository`.
//! 3. **Built-ins** derived from the target itself: `app_name` and
//!    `repo_name` (the directory's base name), `target_path`, `repo_url`
//!    (the git remote, or empty), `namespace` (= `app_name`) and
//!    `image_repository` (the configured convention).
//! 4. **Template defaults** recorded at extraction time.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::debug;

use crate::config::ReplicatorConfig;
use crate::error::{Error, Result};
use crate::git;
use crate::pattern::{Pattern, PatternMetadata};
use crate::suggestions::find_similar;
use crate::template::render::render_with;
use crate::template::Template;
use crate::yaml::lookup_string;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableContext {
    builtins: BTreeMap<String, String>,
    inspected: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for `target`, given the patterns a scan found there.
    pub fn for_target(
        target: &Path,
        existing: &[Pattern],
        overrides: BTreeMap<String, String>,
        config: &ReplicatorConfig,
    ) -> Result<Self> {
        let app_name = target_name(target);
        let remote = git::remote_url(target);
        let image_repository = render_with(&config.image_repository_format, |name| {
            (name == "app_name").then(|| app_name.clone())
        })?;

        let mut context = Self::new()
            .with_builtin("app_name", &app_name)
            .with_builtin("repo_name", &app_name)
            .with_builtin("namespace", &app_name)
            .with_builtin("image_repository", &image_repository)
            .with_builtin("repo_url", remote.as_deref().unwrap_or(""))
            .with_builtin("target_path", &target.display().to_string());

        context.inspect(target, existing, remote.is_none());
        for (name, value) in overrides {
            context = context.with_override(&name, &value);
        }
        Ok(context)
    }

    pub fn with_builtin(mut self, name: &str, value: &str) -> Self {
        self.builtins.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_inspected(mut self, name: &str, value: &str) -> Self {
        self.inspected.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_override(mut self, name: &str, value: &str) -> Self {
        self.overrides.insert(name.to_string(), value.to_string());
        self
    }

    fn inspect(&mut self, target: &Path, existing: &[Pattern], need_repo_url: bool) {
        let mut found: Vec<(&str, String)> = Vec::new();

        let argocd = existing.iter().find_map(|p| match &p.metadata {
            PatternMetadata::Argocd(meta) => Some(meta),
            _ => None,
        });
        let kustomize_namespace = existing.iter().find_map(|p| match &p.metadata {
            PatternMetadata::Kustomize(meta) => meta.namespace.clone(),
            _ => None,
        });

        if let Some(ns) = argocd
            .and_then(|meta| meta.destination_namespace.clone())
            .or(kustomize_namespace)
        {
            found.push(("namespace", ns));
        }
        if need_repo_url {
            if let Some(url) = argocd.and_then(|meta| meta.repo_url.clone()) {
                found.push(("repo_url", url));
            }
        }
        if let Some(image) = existing
            .iter()
            .filter(|p| matches!(p.metadata, PatternMetadata::Helm(_)))
            .find_map(|chart| chart_image_repository(target, chart))
        {
            found.push(("image_repository", image));
        }

        for (name, value) in found {
            debug!("Target inspection: {} = {}", name, value);
            self.inspected.insert(name.to_string(), value);
        }
    }

    /// The context's own value for `name`, ignoring template defaults.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.overrides
            .get(name)
            .or_else(|| self.inspected.get(name))
            .or_else(|| self.builtins.get(name))
            .map(String::as_str)
    }

    /// The value for `name` when rendering `template`.
    pub fn resolve(&self, name: &str, template: &Template) -> Option<String> {
        self.get(name).map(str::to_string).or_else(|| {
            template
                .variables()
                .get(name)
                .and_then(|var| var.default.clone())
        })
    }

    /// Every name the context itself can resolve.
    pub fn names(&self) -> BTreeSet<&str> {
        self.builtins
            .keys()
            .chain(self.inspected.keys())
            .chain(self.overrides.keys())
            .map(String::as_str)
            .collect()
    }

    /// Resolve every variable `template` declares.
    ///
    /// Fails on the first variable without a value, suggesting a close
    /// known name when there is one.
    pub fn values_for(&self, template: &Template) -> Result<BTreeMap<String, String>> {
        let mut values = BTreeMap::new();
        for name in template.variables().keys() {
            match self.resolve(name, template) {
                Some(value) => {
                    values.insert(name.clone(), value);
                }
                None => {
                    let known = self.names();
                    let hint = find_similar(name, known.iter().copied());
                    return Err(Error::missing_variable(name, hint));
                }
            }
        }
        Ok(values)
    }
}

/// Base name of the target directory, resolving `.` and friends.
pub fn target_name(target: &Path) -> String {
    target
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| target.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string())
}

fn chart_image_repository(target: &Path, chart: &Pattern) -> Option<String> {
    let values_path = target.join(&chart.path).join("values.yaml");
    let text = std::fs::read_to_string(&values_path).ok()?;
    match serde_yaml::from_str::<serde_yaml::Value>(&text) {
        Ok(values) => lookup_string(&values, &["image", "repository"]),
        Err(e) => {
            debug!("Ignoring {}: {}", values_path.display(), e);
            None
        }
    }
}
