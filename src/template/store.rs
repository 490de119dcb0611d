//! On-disk template directories.
//!
//! Layout, one directory per template:
//!
//! ```text
//! <output>/<kind>/<name>/template.yaml      manifest: source, name, destination, file list, variables
//! <output>/<kind>/<name>/files/<key>        one file per template file, verbatim
//! ```
//!
//! `<name>` is the source pattern name encoded as a single path segment; two
//! templates that encode to the same name get `-2`, `-3`, ... suffixes.
//! Loading reads the manifest and exactly the files it lists, so a saved
//! template reloads to an identical `Template`.
//!
//! Saving a batch makes the store hold exactly that batch: template
//! directories left over from an earlier save are removed. Directories
//! without a manifest are never touched.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::{Template, Variable};
use crate::defaults::{MANIFEST_FILE_NAME, TEMPLATE_FILES_DIR};
use crate::error::{Error, Result};
use crate::path::{encode_path_segment, resolve_within};
use crate::pattern::{PatternKind, PatternRef};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    source: PatternRef,
    name: String,
    destination: String,
    files: Vec<String>,
    #[serde(default)]
    variables: BTreeMap<String, Variable>,
}

fn store_error(path: &Path, message: impl Into<String>) -> Error {
    Error::TemplateStore {
        path: path.display().to_string(),
        message: message.into(),
    }
}

/// Write every template under `output`, returning the directories created.
///
/// Template directories under `output` that this call did not write are removed.
pub fn save_templates(templates: &[Template], output: &Path) -> Result<Vec<PathBuf>> {
    let mut used: BTreeSet<PathBuf> = BTreeSet::new();
    let mut written = Vec::with_capacity(templates.len());

    for template in templates {
        let kind_dir = output.join(template.kind().as_str());
        let base = encode_path_segment(&template.source().name);
        let mut dir = kind_dir.join(&base);
        let mut suffix = 2;
        while used.contains(&dir) {
            dir = kind_dir.join(format!("{}-{}", base, suffix));
            suffix += 1;
        }
        save_template(template, &dir)?;
        used.insert(dir.clone());
        written.push(dir);
    }
    remove_stale(output, &used)?;
    Ok(written)
}

fn remove_stale(output: &Path, keep: &BTreeSet<PathBuf>) -> Result<()> {
    for kind in PatternKind::ALL {
        let kind_dir = output.join(kind.as_str());
        if !kind_dir.is_dir() {
            continue;
        }
        let mut stale = Vec::new();
        for entry in WalkDir::new(&kind_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| store_error(&kind_dir, e.to_string()))?;
            let dir = entry.path();
            if entry.file_type().is_dir() && dir.join(MANIFEST_FILE_NAME).is_file() && !keep.contains(dir) {
                stale.push(dir.to_path_buf());
            }
        }
        for dir in stale {
            debug!("Removing stale template {}", dir.display());
            fs::remove_dir_all(&dir)?;
        }
    }
    Ok(())
}

/// Write one template into `dir`, replacing a template previously saved there.
pub fn save_template(template: &Template, dir: &Path) -> Result<()> {
    let files_dir = dir.join(TEMPLATE_FILES_DIR);
    if dir.join(MANIFEST_FILE_NAME).is_file() && files_dir.is_dir() {
        debug!("Replacing template files in {}", files_dir.display());
        fs::remove_dir_all(&files_dir)?;
    }
    fs::create_dir_all(&files_dir)?;

    for (key, body) in template.files() {
        let path = resolve_within(&files_dir, Path::new(key))
            .map_err(|e| store_error(dir, e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
    }

    let manifest = Manifest {
        source: template.source().clone(),
        name: template.name().to_string(),
        destination: template.destination().to_string(),
        files: template.files().keys().cloned().collect(),
        variables: template.variables().clone(),
    };
    let yaml = serde_yaml::to_string(&manifest)?;
    fs::write(dir.join(MANIFEST_FILE_NAME), yaml)?;
    Ok(())
}

/// Load a single template directory.
pub fn load_template(dir: &Path) -> Result<Template> {
    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    let text = fs::read_to_string(&manifest_path)
        .map_err(|e| store_error(&manifest_path, format!("cannot read manifest: {}", e)))?;
    let manifest: Manifest = serde_yaml::from_str(&text)
        .map_err(|e| store_error(&manifest_path, format!("invalid manifest: {}", e)))?;

    let files_dir = dir.join(TEMPLATE_FILES_DIR);
    let mut files = BTreeMap::new();
    for key in manifest.files {
        let path = resolve_within(&files_dir, Path::new(&key))
            .map_err(|e| store_error(dir, e.to_string()))?;
        let body = fs::read_to_string(&path)
            .map_err(|e| store_error(&path, format!("cannot read template file: {}", e)))?;
        files.insert(key, body);
    }

    Template::new(
        manifest.source,
        manifest.name,
        manifest.destination,
        files,
        manifest.variables,
    )
}

/// Load every template saved under `dir`, ordered by kind then directory name.
pub fn load_templates(dir: &Path) -> Result<Vec<Template>> {
    if !dir.is_dir() {
        return Err(store_error(dir, "template directory does not exist"));
    }

    let mut templates = Vec::new();
    for kind in PatternKind::ALL {
        let kind_dir = dir.join(kind.as_str());
        if !kind_dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&kind_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| store_error(&kind_dir, e.to_string()))?;
            if !entry.file_type().is_dir() || !entry.path().join(MANIFEST_FILE_NAME).is_file() {
                continue;
            }
            let template = load_template(entry.path())?;
            if template.kind() != kind {
                return Err(store_error(
                    entry.path(),
                    format!("manifest declares kind '{}' inside the '{}' directory", template.kind(), kind),
                ));
            }
            templates.push(template);
        }
    }
    debug!("Loaded {} template(s) from {}", templates.len(), dir.display());
    Ok(templates)
}
