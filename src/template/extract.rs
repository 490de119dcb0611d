//! Template extraction.
//!
//! For every pattern the extractor reads its config files and decides, scalar
//! by scalar, whether the literal is structural (kept) or environment
//! specific (replaced by a `${variable}` placeholder). The decision is driven
//! entirely by the pattern kind's [`KindRules`]:
//!
//! 1. The first key rule matching the file and key path names the variable.
//! 2. Otherwise a scalar equal to the pattern's own name or version becomes
//!    the kind's `name_variable` / `version_variable`.
//!
//! Within one template a variable is bound to exactly one literal. A rule
//! hit whose variable is already bound to a different literal leaves the
//! scalar alone, and an exact-name or exact-version hit reuses whatever
//! variable the literal is already bound to. Substitution happens on the raw
//! text, so everything that is not replaced stays byte-identical.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::render::{escape_literal, placeholder};
use super::{Template, Variable};
use crate::config::{describe_variable, KindRules, ReplicatorConfig};
use crate::defaults::KUSTOMIZATION_FILES;
use crate::error::{Error, Result};
use crate::path::{common_ancestor, to_slash};
use crate::pattern::{Pattern, PatternMetadata};
use crate::yaml::{scan_scalars, split_documents};

/// File key used for the single manifest of an ArgoCD template.
pub const ARGOCD_FILE_KEY: &str = "application.yaml";

/// Builds templates from patterns found under one source root.
pub struct TemplateExtractor<'a> {
    root: PathBuf,
    config: &'a ReplicatorConfig,
}

impl<'a> TemplateExtractor<'a> {
    pub fn new(root: impl Into<PathBuf>, config: &'a ReplicatorConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Extract a template from every pattern, in order.
    ///
    /// A pattern whose files can no longer be read is logged and skipped.
    pub fn extract(&self, patterns: &[Pattern]) -> Vec<Template> {
        patterns
            .iter()
            .filter_map(|pattern| match self.extract_pattern(pattern) {
                Ok(template) => Some(template),
                Err(e) => {
                    warn!("Skipping {}: {}", pattern.reference(), e);
                    None
                }
            })
            .collect()
    }

    /// Extract the template for a single pattern.
    pub fn extract_pattern(&self, pattern: &Pattern) -> Result<Template> {
        let configs = template_configs(pattern);
        let base = self.base_directory(pattern, &configs);
        let rules = self.config.rules_for(pattern.kind());
        let mut bindings = Bindings::new(pattern, rules);

        let mut sources = Vec::with_capacity(configs.len());
        for config in configs {
            let text = self.read_config(pattern, config)?;
            let key = self.file_key(pattern, &base, config)?;
            sources.push((key, text));
        }

        let mut files = BTreeMap::new();
        for (key, text) in &sources {
            let body = bindings.parameterize(key, text)?;
            files.insert(key.clone(), body);
        }

        let name = match bindings.variable_for(&pattern.name) {
            Some(var) => placeholder(var),
            None => escape_literal(&pattern.name),
        };
        let destination = to_slash(&base)
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match bindings.variable_for(segment) {
                Some(var) if segment == pattern.name => placeholder(var),
                _ => escape_literal(segment),
            })
            .collect::<Vec<_>>()
            .join("/");

        debug!(
            "Extracted {} with {} file(s) and variables {:?}",
            pattern.reference(),
            files.len(),
            bindings.variables.keys().collect::<Vec<_>>()
        );
        Template::new(pattern.reference(), name, destination, files, bindings.variables)
    }

    fn base_directory(&self, pattern: &Pattern, configs: &[&PathBuf]) -> PathBuf {
        match pattern.metadata {
            PatternMetadata::Kustomize(_) => common_ancestor(configs.iter().map(|c| c.as_path())),
            _ => pattern.directory().to_path_buf(),
        }
    }

    fn file_key(&self, pattern: &Pattern, base: &Path, config: &Path) -> Result<String> {
        if let PatternMetadata::Argocd(_) = pattern.metadata {
            return Ok(ARGOCD_FILE_KEY.to_string());
        }
        let relative = config.strip_prefix(base).map_err(|_| Error::Path {
            message: format!(
                "{} is not under the directory of {}",
                config.display(),
                pattern.reference()
            ),
        })?;
        Ok(to_slash(relative))
    }

    fn read_config(&self, pattern: &Pattern, config: &Path) -> Result<String> {
        let full = self.root.join(config);
        let text = std::fs::read_to_string(&full).map_err(|e| Error::Detection {
            path: config.display().to_string(),
            message: format!("cannot read config file: {}", e),
        })?;

        match &pattern.metadata {
            PatternMetadata::Argocd(meta) => split_documents(&text)
                .get(meta.document_index)
                .map(|doc| doc.to_string())
                .ok_or_else(|| Error::Detection {
                    path: config.display().to_string(),
                    message: format!("document {} no longer exists", meta.document_index),
                }),
            _ => Ok(text),
        }
    }
}

/// The configs a pattern's template carries.
///
/// A kustomization pulling in another directory lists that directory's
/// kustomization file among its configs. That file belongs to its own
/// pattern and template, so it is left out here.
fn template_configs(pattern: &Pattern) -> Vec<&PathBuf> {
    match pattern.metadata {
        PatternMetadata::Kustomize(_) => pattern
            .configs
            .iter()
            .filter(|config| {
                let foreign = config.parent() != Some(pattern.path.as_path())
                    && config
                        .file_name()
                        .is_some_and(|name| KUSTOMIZATION_FILES.iter().any(|k| name == *k));
                if foreign {
                    debug!("{} leaves {} to its own template", pattern.reference(), config.display());
                }
                !foreign
            })
            .collect(),
        _ => pattern.configs.iter().collect(),
    }
}

/// Variable bindings for one template under construction.
struct Bindings<'r> {
    rules: &'r KindRules,
    /// variable -> literal
    bound: BTreeMap<String, String>,
    /// literal -> first variable bound to it
    by_literal: BTreeMap<String, String>,
    variables: BTreeMap<String, Variable>,
}

impl<'r> Bindings<'r> {
    fn new(pattern: &Pattern, rules: &'r KindRules) -> Self {
        let mut bindings = Self {
            rules,
            bound: BTreeMap::new(),
            by_literal: BTreeMap::new(),
            variables: BTreeMap::new(),
        };
        // The pattern's own name and version are bound up front so every file
        // agrees on them regardless of the order files are visited in.
        if let Some(var) = &rules.name_variable {
            bindings.bind(var, &pattern.name);
        }
        if let (Some(var), Some(version)) = (&rules.version_variable, &pattern.version) {
            bindings.bind(var, version);
        }
        bindings
    }

    fn bind(&mut self, var: &str, literal: &str) -> bool {
        match self.bound.get(var) {
            Some(existing) => existing == literal,
            None => {
                self.bound.insert(var.to_string(), literal.to_string());
                self.by_literal
                    .entry(literal.to_string())
                    .or_insert_with(|| var.to_string());
                true
            }
        }
    }

    fn variable_for(&self, literal: &str) -> Option<&str> {
        self.by_literal.get(literal).map(String::as_str)
    }

    fn record(&mut self, var: &str, literal: &str, description: Option<&str>, keep_default: bool) {
        let entry = self.variables.entry(var.to_string()).or_insert_with(|| {
            Variable::new(description.unwrap_or_else(|| describe_variable(var)), None)
        });
        if keep_default && entry.default.is_none() {
            entry.default = Some(literal.to_string());
        }
    }

    /// Choose the variable for one scalar, or `None` to keep it literal.
    fn choose(&mut self, file: &str, key_path: &str, literal: &str) -> Result<Option<String>> {
        let rules = self.rules;
        for rule in &rules.keys {
            if !rule.matches(file, key_path, literal)? {
                continue;
            }
            if self.bind(&rule.variable, literal) {
                self.record(&rule.variable, literal, rule.description.as_deref(), rule.keep_default);
                return Ok(Some(rule.variable.clone()));
            }
            debug!(
                "{}: '{}' keeps literal '{}', variable '{}' is bound to another value",
                file, key_path, literal, rule.variable
            );
            return Ok(None);
        }

        let exact = [
            (rules.name_variable.as_deref(), false),
            (rules.version_variable.as_deref(), true),
        ];
        for (var, is_version) in exact {
            let Some(var) = var else { continue };
            if self.bound.get(var).map(String::as_str) == Some(literal) {
                let chosen = self.variable_for(literal).unwrap_or(var).to_string();
                self.record(&chosen, literal, None, is_version);
                return Ok(Some(chosen));
            }
        }
        Ok(None)
    }

    /// Replace every parameterizable scalar in `text` with its placeholder.
    fn parameterize(&mut self, file: &str, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for site in scan_scalars(text) {
            let Some(var) = self.choose(file, &site.key_path, &site.value)? else {
                continue;
            };
            out.push_str(&escape_literal(&text[last..site.span.start]));
            out.push_str(&placeholder(&var));
            last = site.span.end;
        }
        out.push_str(&escape_literal(&text[last..]));
        Ok(out)
    }
}
