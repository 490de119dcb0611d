//! # Scan Command Implementation
//!
//! Lists the deployment patterns found in a repository. With `-o`, the
//! patterns are also extracted into templates and saved to a directory that
//! `apply` can read back later.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use deploy_replicator::defaults::DEFAULT_TEMPLATE_DIR;
use deploy_replicator::output::{emoji, format_patterns};
use deploy_replicator::path::display_relative;
use deploy_replicator::scanner::{ScanOptions, Scanner};
use deploy_replicator::suggestions;
use deploy_replicator::template::{save_templates, TemplateExtractor};

use crate::cli::Globals;

/// Detect deployment patterns in a repository
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Repository to scan
    #[arg(value_name = "REPO")]
    pub repo: PathBuf,

    /// Save extracted templates to this directory
    #[arg(short, long, value_name = "DIR", num_args = 0..=1, default_missing_value = DEFAULT_TEMPLATE_DIR)]
    pub output: Option<PathBuf>,

    /// Run detectors concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Print patterns as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Execute the `scan` command.
pub fn execute(args: ScanArgs, globals: &Globals) -> Result<bool> {
    if !args.repo.is_dir() {
        return Err(suggestions::repository_not_found("Source", &args.repo));
    }
    let out = &globals.output;

    let scanner = Scanner::with_default_detectors(&globals.config).with_options(ScanOptions {
        parallel: args.parallel,
    });
    let patterns = scanner.scan(&args.repo);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&patterns)?);
    } else if patterns.is_empty() {
        println!(
            "{} No deployment patterns found in {}",
            emoji(out, "🔍", "[SCAN]"),
            args.repo.display()
        );
    } else {
        println!(
            "{} Found {} pattern(s) in {}\n",
            emoji(out, "🔍", "[SCAN]"),
            patterns.len(),
            args.repo.display()
        );
        print!("{}", format_patterns(out, &patterns));
    }

    if let Some(output_dir) = &args.output {
        let extractor = TemplateExtractor::new(&args.repo, &globals.config);
        let templates = extractor.extract(&patterns);
        let dirs = save_templates(&templates, output_dir)
            .with_context(|| format!("Failed to save templates to {}", output_dir.display()))?;

        // Keep stdout valid JSON when --json is set.
        if args.json {
            log::info!("Saved {} template(s) to {}", dirs.len(), output_dir.display());
        } else {
            println!(
                "\n{} Saved {} template(s) to {}",
                emoji(out, "💾", "[SAVE]"),
                dirs.len(),
                output_dir.display()
            );
            for dir in &dirs {
                let shown = dir.strip_prefix(output_dir).unwrap_or(dir);
                println!("    {}", display_relative(shown));
            }
        }
        return Ok(templates.len() == patterns.len());
    }
    Ok(true)
}
