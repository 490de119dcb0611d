//! # Output Configuration
//!
//! This module provides utilities for controlling CLI output appearance,
//! including color and emoji support based on terminal capabilities and
//! user preferences, plus the plain-text renderings of scan and apply
//! results the CLI prints.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deploy_replicator::output::{OutputConfig, emoji};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//!
//! // Use emoji helper that respects config
//! println!("{} Scanning...", emoji(&config, "🔍", "[SCAN]"));
//! ```

use std::env;

use console::{pad_str, style, Alignment};

use crate::applicator::{ApplyResult, ApplyStatus, ApplySummary};
use crate::path::display_relative;
use crate::pattern::Pattern;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the appropriate string based on color configuration.
///
/// When colors are enabled, returns the emoji. When disabled, returns
/// the plain text alternative.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Render discovered patterns as an aligned table.
pub fn format_patterns(config: &OutputConfig, patterns: &[Pattern]) -> String {
    let rows: Vec<[String; 4]> = patterns
        .iter()
        .map(|p| {
            [
                p.kind().to_string(),
                p.name.clone(),
                p.version.clone().unwrap_or_else(|| "-".to_string()),
                display_relative(&p.path),
            ]
        })
        .collect();
    let header = ["TYPE", "NAME", "VERSION", "PATH"].map(str::to_string);

    let mut widths = header.clone().map(|h| h.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(console::measure_text_width(cell));
        }
    }

    let line = |cells: &[String; 4]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| pad_str(cell, width, Alignment::Left, None).into_owned())
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&style(line(&header)).bold().force_styling(config.use_color).to_string());
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

/// One line per result, plus its paths.
pub fn format_result(config: &OutputConfig, result: &ApplyResult) -> String {
    let (icon, plain) = match result.status {
        ApplyStatus::Applied => ("✅", "[OK]"),
        ApplyStatus::SkippedExists => ("⏭️", "[SKIP]"),
        ApplyStatus::SkippedDryRun => ("🔎", "[DRY]"),
        ApplyStatus::Failed => ("❌", "[FAIL]"),
    };
    let status = style(result.status.as_str()).force_styling(config.use_color);
    let status = match result.status {
        ApplyStatus::Applied => status.green(),
        ApplyStatus::SkippedExists | ApplyStatus::SkippedDryRun => status.yellow(),
        ApplyStatus::Failed => status.red().bold(),
    };

    let mut out = format!(
        "{} {}/{} {}: {}\n",
        emoji(config, icon, plain),
        result.pattern_type,
        result.pattern_name,
        status,
        result.message
    );
    for path in &result.written_paths {
        out.push_str(&format!("    {}\n", display_relative(path)));
    }
    out
}

pub fn format_summary(config: &OutputConfig, summary: &ApplySummary) -> String {
    format!(
        "{} Summary: {} applied, {} skipped, {} failed",
        emoji(config, "📊", "[INFO]"),
        summary.applied,
        summary.skipped,
        summary.failed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{HelmMetadata, PatternKind, PatternMetadata};
    use std::path::PathBuf;

    #[test]
    fn test_color_always() {
        let config = OutputConfig::from_env_and_flag("always");
        assert!(config.use_color);
    }

    #[test]
    fn test_color_never() {
        let config = OutputConfig::from_env_and_flag("never");
        assert!(!config.use_color);
    }

    #[test]
    fn test_emoji_helper_with_color() {
        let config = OutputConfig::with_color();
        assert_eq!(emoji(&config, "🔍", "[SCAN]"), "🔍");
    }

    #[test]
    fn test_emoji_helper_without_color() {
        let config = OutputConfig::without_color();
        assert_eq!(emoji(&config, "🔍", "[SCAN]"), "[SCAN]");
    }

    #[test]
    fn test_format_patterns_aligns_columns() {
        let pattern = Pattern::new(
            "demo",
            "charts/demo",
            vec![PathBuf::from("charts/demo/Chart.yaml")],
            Some("1.0.0".to_string()),
            PatternMetadata::Helm(HelmMetadata::default()),
        )
        .unwrap();
        let table = format_patterns(&OutputConfig::without_color(), &[pattern]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], "TYPE  NAME  VERSION  PATH");
        assert_eq!(lines[1], "helm  demo  1.0.0    charts/demo");
    }

    #[test]
    fn test_format_result_without_color() {
        let result = ApplyResult {
            pattern_type: PatternKind::Argocd,
            pattern_name: "payments".to_string(),
            status: ApplyStatus::SkippedDryRun,
            message: "would write 1 file(s)".to_string(),
            written_paths: vec![PathBuf::from("argocd/application.yaml")],
        };
        let text = format_result(&OutputConfig::without_color(), &result);
        assert_eq!(
            text,
            "[DRY] argocd/payments skipped-dry-run: would write 1 file(s)\n    argocd/application.yaml\n"
        );
    }

    #[test]
    fn test_format_summary() {
        let summary = ApplySummary {
            applied: 2,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(
            format_summary(&OutputConfig::without_color(), &summary),
            "[INFO] Summary: 2 applied, 1 skipped, 0 failed"
        );
    }
}
