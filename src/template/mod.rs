//! # Templates
//!
//! A `Template` is the renderable form of one discovered `Pattern`: a set of
//! file bodies containing `${name}` placeholders, plus the variables those
//! placeholders reference.
//!
//! - [`extract`] turns patterns into templates.
//! - [`render`] parses and substitutes placeholders.
//! - [`store`] writes templates to a directory and reads them back.

pub mod extract;
pub mod render;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::describe_variable;
use crate::error::{Error, Result};
use crate::path::is_contained_relative;
use crate::pattern::{PatternKind, PatternRef};

pub use extract::TemplateExtractor;
pub use store::{load_templates, save_templates};

/// A variable referenced by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Variable {
    pub fn new(description: impl Into<String>, default: Option<String>) -> Self {
        Self {
            description: description.into(),
            default,
        }
    }
}

/// A parameterized deployment pattern, ready to be rendered into a target.
///
/// Templates are immutable once built. [`Template::new`] checks that every
/// file key stays inside the destination and that `variables` is exactly the
/// set of names referenced by `name`, `destination` and `files`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: PatternRef,
    name: String,
    destination: String,
    files: BTreeMap<String, String>,
    variables: BTreeMap<String, Variable>,
}

impl Template {
    /// Build a template.
    ///
    /// Referenced variables missing from `variables` are declared with a
    /// generic description and no default; declared variables nothing
    /// references are dropped.
    pub fn new(
        source: PatternRef,
        name: impl Into<String>,
        destination: impl Into<String>,
        files: BTreeMap<String, String>,
        mut variables: BTreeMap<String, Variable>,
    ) -> Result<Self> {
        let name = name.into();
        let destination = destination.into();

        if files.is_empty() {
            return Err(Error::Render {
                message: format!("template for {} has no files", source),
                variable: None,
            });
        }
        if !is_contained_relative(Path::new(&destination)) {
            return Err(Error::Path {
                message: format!("template destination '{}' is not a relative path", destination),
            });
        }
        for key in files.keys() {
            if key.is_empty() || !is_contained_relative(Path::new(key)) {
                return Err(Error::Path {
                    message: format!("template file '{}' escapes its destination", key),
                });
            }
        }

        let mut referenced = render::placeholders(&name)?;
        referenced.extend(render::placeholders(&destination)?);
        for body in files.values() {
            referenced.extend(render::placeholders(body)?);
        }

        variables.retain(|var, _| referenced.contains(var));
        for var in &referenced {
            variables
                .entry(var.clone())
                .or_insert_with(|| Variable::new(describe_variable(var), None));
        }

        Ok(Self {
            source,
            name,
            destination,
            files,
            variables,
        })
    }

    pub fn kind(&self) -> PatternKind {
        self.source.kind
    }

    /// The pattern this template was extracted from.
    pub fn source(&self) -> &PatternRef {
        &self.source
    }

    /// Pattern name, possibly containing placeholders.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output directory relative to the target root, possibly containing placeholders.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    pub fn variable_names(&self) -> BTreeSet<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    /// Target-relative path of a file key, with placeholders still in place.
    pub fn output_path(&self, key: &str) -> PathBuf {
        Path::new(&self.destination).join(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> PatternRef {
        PatternRef {
            kind: PatternKind::Helm,
            name: "demo".to_string(),
        }
    }

    #[test]
    fn test_new_declares_referenced_variables() {
        let files = BTreeMap::from([(
            "Chart.yaml".to_string(),
            "name: ${app_name}\nversion: ${chart_version}\n".to_string(),
        )]);
        let declared = BTreeMap::from([
            ("chart_version".to_string(), Variable::new("Helm chart version", Some("1.0.0".to_string()))),
            ("unused".to_string(), Variable::new("never referenced", None)),
        ]);
        let template = Template::new(source(), "${app_name}", "charts/${app_name}", files, declared).unwrap();

        assert_eq!(
            template.variable_names().into_iter().collect::<Vec<_>>(),
            vec!["app_name", "chart_version"]
        );
        assert_eq!(template.variables()["chart_version"].default.as_deref(), Some("1.0.0"));
        assert!(template.variables()["app_name"].description.contains("Application name"));
        assert_eq!(template.kind(), PatternKind::Helm);
    }

    #[test]
    fn test_new_rejects_escaping_keys() {
        let files = BTreeMap::from([("../evil.yaml".to_string(), "x: 1\n".to_string())]);
        let err = Template::new(source(), "demo", "", files, BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("escapes"));
    }

    #[test]
    fn test_new_rejects_empty_file_set() {
        assert!(Template::new(source(), "demo", "", BTreeMap::new(), BTreeMap::new()).is_err());
    }

    #[test]
    fn test_output_path_joins_destination() {
        let files = BTreeMap::from([("templates/svc.yaml".to_string(), "kind: Service\n".to_string())]);
        let template = Template::new(source(), "demo", "charts/demo", files, BTreeMap::new()).unwrap();
        assert_eq!(
            template.output_path("templates/svc.yaml"),
            PathBuf::from("charts/demo/templates/svc.yaml")
        );
    }
}
