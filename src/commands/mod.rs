//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `deploy-replicator` command-line tool. Each subcommand is defined in its
//! own file to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic, returning whether every result succeeded.
//!
//! Options shared by `apply` and `replicate` (variable overrides, result
//! printing) live here.

pub mod apply;
pub mod replicate;
pub mod scan;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use deploy_replicator::applicator::{ApplyResult, ApplySummary};
use deploy_replicator::output::{format_result, format_summary, OutputConfig};
use deploy_replicator::suggestions;
use deploy_replicator::template::render::is_variable_name;
use deploy_replicator::yaml::scalar_to_string;

/// Variable override options.
#[derive(Args, Debug, Default)]
pub struct VarArgs {
    /// Set a template variable (repeatable), e.g. --set namespace=payments
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// YAML file mapping variable names to values; --set wins on conflicts
    #[arg(long = "vars", value_name = "FILE")]
    pub vars_file: Option<PathBuf>,
}

impl VarArgs {
    /// Collect overrides from the vars file, then `--set` flags.
    pub fn overrides(&self) -> Result<BTreeMap<String, String>> {
        let mut overrides = match &self.vars_file {
            Some(path) => read_vars_file(path)?,
            None => BTreeMap::new(),
        };
        for arg in &self.set {
            let (name, value) = arg
                .split_once('=')
                .filter(|(name, _)| is_variable_name(name.trim()))
                .ok_or_else(|| suggestions::invalid_override(arg))?;
            overrides.insert(name.trim().to_string(), value.to_string());
        }
        Ok(overrides)
    }
}

fn read_vars_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| suggestions::invalid_vars_file(path, &e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let mapping: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&text)
        .map_err(|e| suggestions::invalid_vars_file(path, &e.to_string()))?;

    let mut vars = BTreeMap::new();
    for (name, value) in mapping {
        if !is_variable_name(&name) {
            return Err(suggestions::invalid_vars_file(
                path,
                &format!("'{}' is not a valid variable name", name),
            ));
        }
        let value = scalar_to_string(&value).ok_or_else(|| {
            suggestions::invalid_vars_file(path, &format!("value of '{}' is not a scalar", name))
        })?;
        vars.insert(name, value);
    }
    Ok(vars)
}

/// Print every result and the summary. Returns `true` when nothing failed.
pub fn report(out: &OutputConfig, results: &[ApplyResult]) -> bool {
    for result in results {
        print!("{}", format_result(out, result));
    }
    let summary = ApplySummary::from_results(results);
    println!("{}", format_summary(out, &summary));
    !summary.has_failures()
}
