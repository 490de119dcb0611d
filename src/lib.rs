//! # Deploy Replicator Library
//!
//! This library discovers deployment patterns (Helm charts, ArgoCD
//! `Application` manifests, Kustomize directories) in one repository, turns
//! them into parameterized templates, and applies those templates to another
//! repository. It is designed to be used by the `deploy-replicator`
//! command-line tool but can also be embedded directly.
//!
//! ## Quick Example
//!
//! ```
//! use deploy_replicator::applicator::{Applicator, ApplyOptions, ApplyStatus};
//! use deploy_replicator::config::ReplicatorConfig;
//! use deploy_replicator::scanner::Scanner;
//! use deploy_replicator::template::TemplateExtractor;
//!
//! let source = tempfile::tempdir().unwrap();
//! std::fs::create_dir_all(source.path().join("charts/demo")).unwrap();
//! std::fs::write(
//!     source.path().join("charts/demo/Chart.yaml"),
//!     "name: demo\nversion: 1.0.0\n",
//! )
//! .unwrap();
//! let target = tempfile::tempdir().unwrap();
//!
//! let config = ReplicatorConfig::default();
//! let patterns = Scanner::with_default_detectors(&config).scan(source.path());
//! let templates = TemplateExtractor::new(source.path(), &config).extract(&patterns);
//!
//! let options = ApplyOptions { dry_run: true, ..Default::default() };
//! let results = Applicator::with_defaults(&config).apply(&templates, target.path(), &options);
//! assert_eq!(results[0].status, ApplyStatus::SkippedDryRun);
//! ```
//!
//! ## Core Concepts
//!
//! - **Patterns (`pattern`, `detectors`, `scanner`)**: Detectors recognize one
//!   pattern family each; the scanner runs them in a fixed order and merges
//!   their findings.
//! - **Templates (`template`)**: A pattern's files with environment-specific
//!   literals replaced by `${variable}` placeholders, chosen by the rule sets
//!   in `config`. Templates can be saved to and loaded from a directory.
//! - **Application (`context`, `applicator`)**: Variables are resolved for a
//!   target repository and the rendered files are written under its root,
//!   never overwriting existing work unless forced.
//!
//! ## Execution Flow
//!
//! 1.  **Scan**: `Scanner::scan` over the source repository.
//! 2.  **Extract**: `TemplateExtractor::extract` builds one template per pattern.
//! 3.  **Store** (optional): `template::save_templates` / `load_templates`.
//! 4.  **Apply**: `Applicator::apply` re-scans the target, resolves variables,
//!     renders and writes, returning one `ApplyResult` per template.

pub mod applicator;
pub mod config;
pub mod context;
pub mod defaults;
pub mod detectors;
pub mod error;
pub mod git;
pub mod output;
pub mod path;
pub mod pattern;
pub mod scanner;
pub mod suggestions;
pub mod template;
pub mod yaml;

#[cfg(test)]
mod path_proptest;
