//! Default values for deploy-replicator.
//!
//! This module centralizes the constants shared by the library and the CLI,
//! ensuring consistency and avoiding duplication.

use std::time::Duration;

/// Configuration file picked up from the working directory when present.
pub const CONFIG_FILE_NAME: &str = ".deploy-replicator.yaml";

/// Manifest written next to each serialized template.
pub const MANIFEST_FILE_NAME: &str = "template.yaml";

/// Directory, inside a serialized template, that holds the template's files.
pub const TEMPLATE_FILES_DIR: &str = "files";

/// File names marking a Kustomize directory, in order of preference.
pub const KUSTOMIZATION_FILES: [&str; 2] = ["kustomization.yaml", "kustomization.yml"];

/// Directory names never descended into while scanning a repository.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",         // Git repository data
    ".hg",          // Mercurial repository data
    ".svn",         // SVN repository data
    "node_modules", // Node.js dependencies
    "vendor",       // Vendored dependencies
    "target",       // Rust build artifacts
    "build",        // Generic build output
    "dist",         // Distribution files
    "__pycache__",  // Python bytecode cache
    ".venv",        // Python virtual environment
    "venv",         // Python virtual environment
    ".terraform",   // Terraform provider cache
];

/// Convention used to derive `image_repository` from `app_name`.
pub const IMAGE_REPOSITORY_FORMAT: &str = "myorg/${app_name}";

/// Upper bound for the optional `git` subprocess used to find a remote URL.
pub const GIT_REMOTE_TIMEOUT: Duration = Duration::from_secs(2);

/// Template output directory used by `scan -o` when given without a value.
pub const DEFAULT_TEMPLATE_DIR: &str = "deploy-templates";
