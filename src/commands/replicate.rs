//! Replicate command implementation
//!
//! Scans the source repository, extracts templates in memory and applies them
//! to the target. Equivalent to `scan -o` followed by `apply`, without the
//! intermediate directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use deploy_replicator::applicator::{Applicator, ApplyOptions};
use deploy_replicator::output::emoji;
use deploy_replicator::scanner::Scanner;
use deploy_replicator::suggestions;
use deploy_replicator::template::TemplateExtractor;

use super::{report, VarArgs};
use crate::cli::Globals;

/// Arguments for the replicate command
#[derive(Args, Debug)]
pub struct ReplicateArgs {
    /// Repository to copy patterns from
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Repository to apply them to
    #[arg(value_name = "TARGET")]
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

/// Execute the replicate command
pub fn execute(args: ReplicateArgs, globals: &Globals) -> Result<bool> {
    if !args.source.is_dir() {
        return Err(suggestions::repository_not_found("Source", &args.source));
    }
    if !args.target.is_dir() {
        return Err(suggestions::repository_not_found("Target", &args.target));
    }
    let options = ApplyOptions {
        dry_run: args.dry_run,
        force: args.force,
        overrides: args.vars.overrides()?,
    };
    let out = &globals.output;

    let patterns = Scanner::with_default_detectors(&globals.config).scan(&args.source);
    if patterns.is_empty() {
        println!(
            "{} No deployment patterns found in {}",
            emoji(out, "🔍", "[SCAN]"),
            args.source.display()
        );
        return Ok(true);
    }

    let templates = TemplateExtractor::new(&args.source, &globals.config).extract(&patterns);
    // Patterns that could not be turned into templates were already logged.
    let complete = templates.len() == patterns.len();
    println!(
        "{} Replicating {} of {} pattern(s) from {} to {}{}",
        emoji(out, "🚀", "[APPLY]"),
        templates.len(),
        patterns.len(),
        args.source.display(),
        args.target.display(),
        if options.dry_run { " (dry run)" } else { "" }
    );

    let results = Applicator::with_defaults(&globals.config).apply(&templates, &args.target, &options);
    Ok(report(out, &results) && complete)
}
