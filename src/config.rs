//! # Configuration Schema and Parsing
//!
//! This module defines `ReplicatorConfig`, the optional `.deploy-replicator.yaml`
//! file that tunes scanning and parameterization. Every field has a built-in
//! default, so an absent file and an empty file behave identically.
//!
//! ## Parameterization rules
//!
//! Which literal values become template variables is decided by an explicit
//! rule set per pattern kind, never by guessing:
//!
//! - **`keys`**: ordered `KeyRule`s. A rule names a YAML key path (a glob over
//!   `/`-joined keys, list items transparent) and optionally a file glob. The
//!   first matching rule wins and the scalar becomes `${variable}`.
//! - **`name_variable` / `version_variable`**: any other scalar whose value is
//!   exactly the pattern's own name or version is replaced with that variable.
//!
//! A user-supplied rule set for a kind replaces the default one for that kind.
//!
//! ```yaml
//! exclude_dirs: [fixtures]
//! image_repository_format: "ghcr.io/acme/${app_name}"
//! rules:
//!   kustomize:
//!     name_variable: app_name
//!     keys:
//!       - key: namespace
//!         variable: namespace
//! ```

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::path::glob_match;
use crate::pattern::PatternKind;

/// One key-path rule for a pattern kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyRule {
    /// Glob over the file path relative to the template root. A glob without
    /// `/` is matched against the file name only. Absent means every file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Glob over the `/`-joined key path of the scalar.
    pub key: String,
    /// Regular expression the scalar's literal must match. Absent means any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Variable the scalar is replaced with.
    pub variable: String,
    /// Human description recorded on the template variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Record the source literal as the variable's default value.
    #[serde(default)]
    pub keep_default: bool,
}

impl KeyRule {
    fn new(file: Option<&str>, key: &str, variable: &str) -> Self {
        Self {
            file: file.map(str::to_string),
            key: key.to_string(),
            value: None,
            variable: variable.to_string(),
            description: None,
            keep_default: false,
        }
    }

    fn keeping_default(mut self) -> Self {
        self.keep_default = true;
        self
    }

    /// Whether this rule applies to the scalar `literal` at `key_path` in `file`.
    pub fn matches(&self, file: &str, key_path: &str, literal: &str) -> Result<bool> {
        if let Some(file_glob) = &self.file {
            let subject = if file_glob.contains('/') {
                file
            } else {
                file.rsplit('/').next().unwrap_or(file)
            };
            if !glob_match(file_glob, subject)? {
                return Ok(false);
            }
        }
        if !glob_match(&self.key, key_path)? {
            return Ok(false);
        }
        match &self.value {
            Some(pattern) => Ok(Regex::new(pattern)?.is_match(literal)),
            None => Ok(true),
        }
    }
}

/// The parameterization rules for one pattern kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindRules {
    /// Variable used for scalars equal to the pattern's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_variable: Option<String>,
    /// Variable used for scalars equal to the pattern's version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_variable: Option<String>,
    #[serde(default)]
    pub keys: Vec<KeyRule>,
}

impl KindRules {
    fn helm() -> Self {
        Self {
            name_variable: Some("app_name".to_string()),
            version_variable: Some("chart_version".to_string()),
            keys: vec![
                KeyRule::new(Some("Chart.yaml"), "name", "app_name"),
                KeyRule::new(Some("Chart.yaml"), "version", "chart_version").keeping_default(),
                KeyRule::new(Some("Chart.yaml"), "appVersion", "app_version").keeping_default(),
                KeyRule::new(Some("values.yaml"), "image/repository", "image_repository"),
                KeyRule::new(Some("values.yaml"), "image/tag", "image_tag").keeping_default(),
                KeyRule::new(None, "namespace", "namespace"),
                KeyRule::new(None, "**/namespace", "namespace"),
            ],
        }
    }

    fn argocd() -> Self {
        Self {
            name_variable: Some("app_name".to_string()),
            version_variable: None,
            keys: vec![
                KeyRule::new(None, "metadata/name", "app_name"),
                KeyRule::new(None, "metadata/namespace", "argocd_namespace").keeping_default(),
                KeyRule::new(None, "spec/project", "project").keeping_default(),
                KeyRule::new(None, "spec/source/repoURL", "repo_url"),
                KeyRule::new(None, "spec/sources/repoURL", "repo_url"),
                KeyRule::new(None, "spec/source/targetRevision", "target_revision").keeping_default(),
                KeyRule::new(None, "spec/source/path", "source_path").keeping_default(),
                KeyRule::new(None, "spec/source/helm/releaseName", "app_name"),
                KeyRule::new(None, "spec/destination/server", "dest_server").keeping_default(),
                KeyRule::new(None, "spec/destination/namespace", "namespace"),
            ],
        }
    }

    fn kustomize() -> Self {
        Self {
            name_variable: None,
            version_variable: None,
            keys: vec![
                KeyRule::new(Some("kustomization.y*ml"), "namespace", "namespace"),
                KeyRule::new(Some("kustomization.y*ml"), "namePrefix", "name_prefix").keeping_default(),
                KeyRule::new(Some("kustomization.y*ml"), "nameSuffix", "name_suffix").keeping_default(),
                KeyRule::new(Some("kustomization.y*ml"), "images/newName", "image_repository"),
                KeyRule::new(Some("kustomization.y*ml"), "images/newTag", "image_tag").keeping_default(),
                KeyRule::new(None, "metadata/namespace", "namespace"),
            ],
        }
    }
}

/// Rule sets for every pattern kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSets {
    #[serde(default = "KindRules::helm")]
    pub helm: KindRules,
    #[serde(default = "KindRules::argocd")]
    pub argocd: KindRules,
    #[serde(default = "KindRules::kustomize")]
    pub kustomize: KindRules,
}

impl Default for RuleSets {
    fn default() -> Self {
        Self {
            helm: KindRules::helm(),
            argocd: KindRules::argocd(),
            kustomize: KindRules::kustomize(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicatorConfig {
    /// Directory names excluded from scans, in addition to the built-in set.
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    /// Placeholder string rendered with `app_name` to derive `image_repository`.
    #[serde(default = "default_image_repository_format")]
    pub image_repository_format: String,
    #[serde(default)]
    pub rules: RuleSets,
}

fn default_image_repository_format() -> String {
    defaults::IMAGE_REPOSITORY_FORMAT.to_string()
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            image_repository_format: default_image_repository_format(),
            rules: RuleSets::default(),
        }
    }
}

impl ReplicatorConfig {
    /// Parse and validate a YAML configuration string.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: Some(
                "Valid top-level keys are exclude_dirs, image_repository_format and rules".to_string(),
            ),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            message: format!("cannot read {}: {}", path.display(), e),
            hint: None,
        })?;
        Self::parse(&content)
    }

    /// Load the explicit config file if given, else the default file in `dir`
    /// if it exists, else built-in defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = dir.join(defaults::CONFIG_FILE_NAME);
        if candidate.is_file() {
            log::debug!("loading configuration from {}", candidate.display());
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Check that every glob compiles and every variable name is usable.
    pub fn validate(&self) -> Result<()> {
        for kind in PatternKind::ALL {
            let rules = self.rules_for(kind);
            let names = rules
                .keys
                .iter()
                .map(|r| r.variable.as_str())
                .chain(rules.name_variable.as_deref())
                .chain(rules.version_variable.as_deref());
            for name in names {
                if !crate::template::render::is_variable_name(name) {
                    return Err(Error::ConfigParse {
                        message: format!("invalid variable name '{}' in {} rules", name, kind),
                        hint: Some("Variable names use letters, digits and underscores".to_string()),
                    });
                }
            }
            for rule in &rules.keys {
                glob::Pattern::new(&rule.key)?;
                if let Some(file) = &rule.file {
                    glob::Pattern::new(file)?;
                }
                if let Some(value) = &rule.value {
                    Regex::new(value)?;
                }
            }
        }
        if !crate::template::render::placeholders(&self.image_repository_format)?
            .iter()
            .all(|name| name == "app_name")
        {
            return Err(Error::ConfigParse {
                message: "image_repository_format may only reference ${app_name}".to_string(),
                hint: None,
            });
        }
        Ok(())
    }

    pub fn rules_for(&self, kind: PatternKind) -> &KindRules {
        match kind {
            PatternKind::Helm => &self.rules.helm,
            PatternKind::Argocd => &self.rules.argocd,
            PatternKind::Kustomize => &self.rules.kustomize,
        }
    }

    /// Built-in exclusions followed by the configured extra ones.
    pub fn excluded_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = defaults::EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect();
        for extra in &self.exclude_dirs {
            if !dirs.contains(extra) {
                dirs.push(extra.clone());
            }
        }
        dirs
    }
}

/// Human description for a well-known variable.
pub fn describe_variable(name: &str) -> &'static str {
    match name {
        "app_name" => "Application name, derived from the target directory name",
        "repo_url" => "Version-control remote URL of the target repository",
        "namespace" => "Kubernetes namespace the application is deployed into",
        "image_repository" => "Container image repository",
        "image_tag" => "Container image tag",
        "chart_version" => "Helm chart version",
        "app_version" => "Application version recorded in the chart",
        "argocd_namespace" => "Namespace the ArgoCD Application object lives in",
        "project" => "ArgoCD project",
        "target_revision" => "Git revision ArgoCD tracks",
        "source_path" => "Path inside the repository ArgoCD syncs from",
        "dest_server" => "Kubernetes API server ArgoCD deploys to",
        "name_prefix" => "Prefix Kustomize adds to resource names",
        "name_suffix" => "Suffix Kustomize adds to resource names",
        _ => "Template variable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ReplicatorConfig::parse("").unwrap();
        assert_eq!(config, ReplicatorConfig::default());
        assert_eq!(config.image_repository_format, "myorg/${app_name}");
    }

    #[test]
    fn test_parse_extra_exclusions() {
        let config = ReplicatorConfig::parse("exclude_dirs: [fixtures, .git]\n").unwrap();
        let dirs = config.excluded_dirs();
        assert!(dirs.contains(&"fixtures".to_string()));
        assert_eq!(dirs.iter().filter(|d| *d == ".git").count(), 1);
    }

    #[test]
    fn test_custom_rules_replace_defaults_for_one_kind() {
        let yaml = r#"
rules:
  kustomize:
    name_variable: app_name
    keys:
      - key: namespace
        variable: namespace
"#;
        let config = ReplicatorConfig::parse(yaml).unwrap();
        let kustomize = config.rules_for(PatternKind::Kustomize);
        assert_eq!(kustomize.keys.len(), 1);
        assert_eq!(kustomize.name_variable.as_deref(), Some("app_name"));
        assert_eq!(config.rules_for(PatternKind::Helm), &KindRules::helm());
    }

    #[test]
    fn test_unknown_field_is_rejected_with_hint() {
        let err = ReplicatorConfig::parse("rulez: {}\n").unwrap_err();
        let display = err.to_string();
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn test_invalid_variable_name_is_rejected() {
        let yaml = "rules:\n  helm:\n    keys:\n      - key: name\n        variable: app-name\n";
        assert!(ReplicatorConfig::parse(yaml).is_err());
    }

    #[test]
    fn test_image_format_must_only_use_app_name() {
        assert!(ReplicatorConfig::parse("image_repository_format: \"ghcr.io/${org}/x\"\n").is_err());
        assert!(ReplicatorConfig::parse("image_repository_format: \"ghcr.io/acme/${app_name}\"\n").is_ok());
    }

    #[test]
    fn test_key_rule_file_matching() {
        let by_name = KeyRule::new(Some("Chart.yaml"), "name", "app_name");
        assert!(by_name.matches("Chart.yaml", "name", "demo").unwrap());
        assert!(!by_name.matches("values.yaml", "name", "demo").unwrap());
        assert!(!by_name.matches("Chart.yaml", "dependencies/name", "redis").unwrap());

        let by_path = KeyRule::new(Some("templates/**"), "**/namespace", "namespace");
        assert!(by_path.matches("templates/deployment.yaml", "metadata/namespace", "prod").unwrap());
        assert!(!by_path.matches("values.yaml", "metadata/namespace", "prod").unwrap());

        let kustomization = KeyRule::new(Some("kustomization.y*ml"), "namespace", "namespace");
        assert!(kustomization.matches("overlays/prod/kustomization.yml", "namespace", "prod").unwrap());
    }

    #[test]
    fn test_key_rule_value_pattern() {
        let mut rule = KeyRule::new(None, "image/tag", "image_tag");
        rule.value = Some(r"^v?\d+\.\d+".to_string());
        assert!(rule.matches("values.yaml", "image/tag", "v1.4.2").unwrap());
        assert!(!rule.matches("values.yaml", "image/tag", "latest").unwrap());
    }

    #[test]
    fn test_invalid_value_pattern_is_rejected() {
        let yaml = "rules:\n  helm:\n    keys:\n      - key: image/tag\n        value: \"(unclosed\"\n        variable: image_tag\n";
        let err = ReplicatorConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("Regex error"));
    }

    #[test]
    fn test_load_prefers_explicit_then_default_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(
            ReplicatorConfig::load(None, dir.path()).unwrap(),
            ReplicatorConfig::default()
        );

        std::fs::write(
            dir.path().join(defaults::CONFIG_FILE_NAME),
            "exclude_dirs: [fixtures]\n",
        )
        .unwrap();
        let config = ReplicatorConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.exclude_dirs, vec!["fixtures".to_string()]);

        let missing = dir.path().join("missing.yaml");
        assert!(ReplicatorConfig::load(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_describe_variable() {
        assert!(describe_variable("app_name").contains("Application name"));
        assert_eq!(describe_variable("custom"), "Template variable");
    }
}
