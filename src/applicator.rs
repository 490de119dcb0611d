//! # Applicator
//!
//! Applies templates to a target repository. For every template, in order:
//!
//! 1. Skip it (`skipped-exists`) when the target already has a pattern of the
//!    same kind named like the template's source or its rendered name, unless
//!    `force` is set. A forced template that matches a pattern by source name
//!    replaces that pattern in place: it keeps the existing name and, for Helm
//!    charts and ArgoCD manifests, the existing location. Overriding the
//!    template's name variable opts out of this.
//! 2. Resolve its variables against the target's [`VariableContext`].
//! 3. Render the name, destination and every file. A missing variable fails
//!    the template.
//! 4. Compute output paths under the target root. A path that would escape
//!    the root, or that an earlier template of the batch already claimed,
//!    fails the template.
//! 5. Without `force`, skip the template if any output file already exists.
//! 6. Report the paths (`dry_run`) or write the files in order (`applied`).
//!
//! One template's failure never stops the batch, and every template gets
//! exactly one [`ApplyResult`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::config::ReplicatorConfig;
use crate::context::VariableContext;
use crate::error::{Error, Result};
use crate::path::{display_relative, resolve_within};
use crate::pattern::{Pattern, PatternKind};
use crate::scanner::Scanner;
use crate::template::render::{parse, render_with, Segment};
use crate::template::Template;
use crate::yaml::split_documents;

/// How templates are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Compute everything, write nothing.
    pub dry_run: bool,
    /// Apply even when the pattern or its files already exist.
    pub force: bool,
    /// Variable values that win over everything else.
    pub overrides: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStatus {
    Applied,
    SkippedExists,
    SkippedDryRun,
    Failed,
}

impl ApplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyStatus::Applied => "applied",
            ApplyStatus::SkippedExists => "skipped-exists",
            ApplyStatus::SkippedDryRun => "skipped-dry-run",
            ApplyStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ApplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    pub pattern_type: PatternKind,
    pub pattern_name: String,
    pub status: ApplyStatus,
    pub message: String,
    /// Target-relative paths written, or that would be written on a dry run.
    pub written_paths: Vec<PathBuf>,
}

impl ApplyResult {
    fn new(template: &Template, status: ApplyStatus, message: impl Into<String>) -> Self {
        Self {
            pattern_type: template.kind(),
            pattern_name: template.source().name.clone(),
            status,
            message: message.into(),
            written_paths: Vec::new(),
        }
    }

    fn failed(template: &Template, error: &Error) -> Self {
        Self::new(template, ApplyStatus::Failed, error.to_string())
    }

    fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.written_paths = paths;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.status == ApplyStatus::Failed
    }
}

/// Result counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ApplySummary {
    pub fn from_results(results: &[ApplyResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            match result.status {
                ApplyStatus::Applied => summary.applied += 1,
                ApplyStatus::SkippedExists | ApplyStatus::SkippedDryRun => summary.skipped += 1,
                ApplyStatus::Failed => summary.failed += 1,
            }
            summary
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// A template rendered for one target, not yet written.
struct Rendered {
    name: String,
    /// (target-relative path, absolute path, body)
    files: Vec<(PathBuf, PathBuf, String)>,
}

pub struct Applicator<'a> {
    scanner: Scanner,
    config: &'a ReplicatorConfig,
}

impl<'a> Applicator<'a> {
    pub fn new(scanner: Scanner, config: &'a ReplicatorConfig) -> Self {
        Self { scanner, config }
    }

    /// An applicator using the default detectors.
    pub fn with_defaults(config: &'a ReplicatorConfig) -> Self {
        Self::new(Scanner::with_default_detectors(config), config)
    }

    /// Apply `templates` to `target`, returning one result per template.
    pub fn apply(&self, templates: &[Template], target: &Path, options: &ApplyOptions) -> Vec<ApplyResult> {
        if !target.is_dir() {
            let error = Error::Path {
                message: format!("target '{}' is not a directory", target.display()),
            };
            return templates.iter().map(|t| ApplyResult::failed(t, &error)).collect();
        }

        let existing = self.scanner.scan(target);
        let context = match VariableContext::for_target(target, &existing, options.overrides.clone(), self.config) {
            Ok(context) => context,
            Err(e) => {
                return templates.iter().map(|t| ApplyResult::failed(t, &e)).collect();
            }
        };

        let mut claimed: BTreeMap<PathBuf, String> = BTreeMap::new();
        templates
            .iter()
            .map(|template| {
                let result = self.apply_one(template, target, &existing, &context, options, &mut claimed);
                info!("{} {}: {}", template.source(), result.status, result.message);
                result
            })
            .collect()
    }

    fn apply_one(
        &self,
        template: &Template,
        target: &Path,
        existing: &[Pattern],
        context: &VariableContext,
        options: &ApplyOptions,
        claimed: &mut BTreeMap<PathBuf, String>,
    ) -> ApplyResult {
        let source_name = &template.source().name;
        let matched = find_existing(existing, template.kind(), &[source_name]);
        if let (Some(found), false) = (matched, options.force) {
            return ApplyResult::new(
                template,
                ApplyStatus::SkippedExists,
                format!("{} already exists at {}", found.reference(), display_relative(&found.path)),
            );
        }
        let replacing = matched.filter(|_| match name_variable(template) {
            Some(var) => !options.overrides.contains_key(&var),
            None => true,
        });
        if let Some(found) = replacing {
            debug!("Replacing {} at {}", found.reference(), display_relative(&found.path));
        }

        let rendered = match render_template(template, target, context, replacing) {
            Ok(rendered) => rendered,
            Err(e) => return ApplyResult::failed(template, &e),
        };

        let label = template.source().to_string();
        for (relative, _, _) in &rendered.files {
            if let Some(owner) = claimed.get(relative) {
                let error = Error::Write {
                    path: display_relative(relative),
                    message: format!("already produced by {} in this batch", owner),
                };
                return ApplyResult::failed(template, &error);
            }
        }
        for (relative, _, _) in &rendered.files {
            claimed.insert(relative.clone(), label.clone());
        }

        if !options.force {
            if let Some(found) = find_existing(existing, template.kind(), &[&rendered.name]) {
                return ApplyResult::new(
                    template,
                    ApplyStatus::SkippedExists,
                    format!("{} already exists at {}", found.reference(), display_relative(&found.path)),
                );
            }
            let present: Vec<String> = rendered
                .files
                .iter()
                .filter(|(_, absolute, _)| absolute.exists())
                .map(|(relative, _, _)| display_relative(relative))
                .collect();
            if !present.is_empty() {
                return ApplyResult::new(
                    template,
                    ApplyStatus::SkippedExists,
                    format!("target already contains {}", present.join(", ")),
                );
            }
        }

        let relative_paths: Vec<PathBuf> = rendered.files.iter().map(|(rel, _, _)| rel.clone()).collect();
        if options.dry_run {
            return ApplyResult::new(
                template,
                ApplyStatus::SkippedDryRun,
                format!("would write {} file(s)", relative_paths.len()),
            )
            .with_paths(relative_paths);
        }

        let mut written = Vec::with_capacity(rendered.files.len());
        for (relative, absolute, body) in &rendered.files {
            if let Err(e) = write_file(target, relative, absolute, body) {
                return ApplyResult::failed(template, &e).with_paths(written);
            }
            debug!("Wrote {}", absolute.display());
            written.push(relative.clone());
        }
        ApplyResult::new(
            template,
            ApplyStatus::Applied,
            format!("wrote {} file(s) as {}", written.len(), rendered.name),
        )
        .with_paths(written)
    }
}

fn find_existing<'p>(existing: &'p [Pattern], kind: PatternKind, names: &[&String]) -> Option<&'p Pattern> {
    existing
        .iter()
        .find(|p| p.kind() == kind && names.iter().any(|n| **n == p.name))
}

/// The variable a template's name consists of, when it is a single placeholder.
fn name_variable(template: &Template) -> Option<String> {
    match parse(template.name()).ok()?.as_slice() {
        [Segment::Variable(var)] => Some(var.to_string()),
        _ => None,
    }
}

/// Render `template` for `target`.
///
/// File keys are literal paths below the destination and are never rendered.
/// With `replacing`, the template takes over that pattern's name, and its
/// location unless it is a kustomization (whose destination is the common
/// ancestor of all its files, not the pattern directory).
fn render_template(
    template: &Template,
    target: &Path,
    context: &VariableContext,
    replacing: Option<&Pattern>,
) -> Result<Rendered> {
    let mut values = context.values_for(template)?;
    if let (Some(found), Some(var)) = (replacing, name_variable(template)) {
        values.insert(var, found.name.clone());
    }
    let lookup = |name: &str| values.get(name).cloned();

    let name = render_with(template.name(), lookup)?;
    let destination = match replacing {
        Some(found) if found.kind() != PatternKind::Kustomize => found.directory().to_path_buf(),
        _ => PathBuf::from(render_with(template.destination(), lookup)?),
    };
    let single_manifest = match replacing {
        Some(found)
            if found.kind() == PatternKind::Argocd
                && template.files().len() == 1
                && holds_one_document(&target.join(&found.path)) =>
        {
            Some(&found.path)
        }
        _ => None,
    };

    let mut files = Vec::with_capacity(template.files().len());
    let mut seen = BTreeSet::new();
    for (key, body) in template.files() {
        let relative = match single_manifest {
            Some(path) => path.clone(),
            None => destination.join(key),
        };
        let absolute = resolve_within(target, &relative).map_err(|e| Error::Write {
            path: relative.display().to_string(),
            message: e.to_string(),
        })?;
        let relative = absolute
            .strip_prefix(target)
            .map(Path::to_path_buf)
            .unwrap_or(relative);
        if !seen.insert(relative.clone()) {
            return Err(Error::Write {
                path: display_relative(&relative),
                message: "two template files map to the same path".to_string(),
            });
        }
        files.push((relative, absolute, render_with(body, lookup)?));
    }
    Ok(Rendered { name, files })
}

/// Whether `path` is a YAML file with exactly one non-empty document.
fn holds_one_document(path: &Path) -> bool {
    fs::read_to_string(path).is_ok_and(|text| {
        split_documents(&text)
            .iter()
            .filter(|doc| !doc.trim().is_empty())
            .count()
            == 1
    })
}

fn write_file(target: &Path, relative: &Path, absolute: &Path, body: &str) -> Result<()> {
    let write_error = |message: String| Error::Write {
        path: display_relative(relative),
        message,
    };
    if let Some(parent) = absolute.parent() {
        fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        // A symlinked directory inside the target could still lead outside it.
        let root = target.canonicalize().map_err(|e| write_error(e.to_string()))?;
        let real_parent = parent.canonicalize().map_err(|e| write_error(e.to_string()))?;
        if !real_parent.starts_with(&root) {
            return Err(write_error(format!(
                "resolves outside of '{}' through a symbolic link",
                target.display()
            )));
        }
    }
    fs::write(absolute, body).map_err(|e| write_error(e.to_string()))
}
