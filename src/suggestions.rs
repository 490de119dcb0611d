//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Following CLI recommendations,
//! errors should tell users what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Template directory not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::templates_dir_not_found(path));
//! ```

use std::path::Path;

/// Generate an error for a templates directory that does not exist.
pub fn templates_dir_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Template directory not found: {path}\n\n\
         hint: Create one with 'deploy-replicator scan <repo> -o {path}'\n\
         hint: Use 'deploy-replicator replicate <source> <target>' to skip the intermediate directory",
        path = path.display()
    )
}

/// Generate an error for a repository path that is not a directory.
pub fn repository_not_found(role: &str, path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "{role} repository not found: {path}\n\n\
         hint: Pass the path of an existing directory",
        path = path.display()
    )
}

/// Generate an error for a malformed `--set` argument.
pub fn invalid_override(arg: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid variable override: '{arg}'\n\n\
         hint: Use --set name=value, for example --set namespace=payments\n\
         hint: Variable names use letters, digits and underscores"
    )
}

/// Generate an error for a `--vars` file that is not a flat mapping.
pub fn invalid_vars_file(path: &Path, error: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Invalid variables file: {path}\n\
         error: {error}\n\n\
         hint: The file must be a YAML mapping of variable names to string values\n\
         hint: Quote values YAML would otherwise read as numbers or booleans",
        path = path.display()
    )
}

/// Find a similar string among `candidates`.
///
/// Returns the closest candidate when it is within two edits of `input` and
/// the edit is not a full rewrite.
pub fn find_similar<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter(|candidate| *candidate != input)
        .filter_map(|candidate| {
            let distance = strsim::levenshtein(input, candidate);
            if distance <= 2 && distance < input.chars().count() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}
