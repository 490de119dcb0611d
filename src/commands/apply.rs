//! Apply command implementation
//!
//! Loads a template directory written by `scan -o` and applies every
//! template to the target repository.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use deploy_replicator::applicator::{Applicator, ApplyOptions};
use deploy_replicator::output::emoji;
use deploy_replicator::suggestions;
use deploy_replicator::template::load_templates;

use super::{report, VarArgs};
use crate::cli::Globals;

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Directory of saved templates
    #[arg(value_name = "TEMPLATES_DIR")]
    pub templates: PathBuf,

    /// Repository to apply the templates to
    #[arg(value_name = "TARGET_REPO")]
    pub target: PathBuf,

    /// Show what would be written without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Apply even when the pattern or its files already exist
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub vars: VarArgs,
}

/// Execute the apply command
pub fn execute(args: ApplyArgs, globals: &Globals) -> Result<bool> {
    if !args.templates.is_dir() {
        return Err(suggestions::templates_dir_not_found(&args.templates));
    }
    if !args.target.is_dir() {
        return Err(suggestions::repository_not_found("Target", &args.target));
    }
    let options = ApplyOptions {
        dry_run: args.dry_run,
        force: args.force,
        overrides: args.vars.overrides()?,
    };

    let templates = load_templates(&args.templates)
        .with_context(|| format!("Failed to load templates from {}", args.templates.display()))?;
    let out = &globals.output;
    if templates.is_empty() {
        println!(
            "{} No templates found in {}",
            emoji(out, "📭", "[INFO]"),
            args.templates.display()
        );
        return Ok(true);
    }

    println!(
        "{} Applying {} template(s) to {}{}",
        emoji(out, "🚀", "[APPLY]"),
        templates.len(),
        args.target.display(),
        if options.dry_run { " (dry run)" } else { "" }
    );
    let results = Applicator::with_defaults(&globals.config).apply(&templates, &args.target, &options);
    Ok(report(out, &results))
}
