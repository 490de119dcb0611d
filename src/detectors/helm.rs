//! Helm chart detection.
//!
//! A directory holding a `Chart.yaml` is a chart. Its name and version come
//! from the top-level `name` and `version` keys (the directory name stands in
//! for a missing `name`). The chart's configs are `Chart.yaml`, `values.yaml`
//! when present, and every file under `templates/`.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_yaml::Value;

use super::{directory_name, read_text, walk_files, ExcludedDirs};
use crate::error::{Error, Result};
use crate::pattern::{ChartDependency, HelmMetadata, Pattern, PatternMetadata};
use crate::yaml::lookup_string;

const CHART_FILE: &str = "Chart.yaml";
const VALUES_FILE: &str = "values.yaml";
const TEMPLATES_DIR: &str = "templates";

#[derive(Debug, Clone, Default)]
pub struct HelmDetector {
    excluded: ExcludedDirs,
}

impl HelmDetector {
    pub fn new(excluded: ExcludedDirs) -> Self {
        Self { excluded }
    }

    pub fn detect(&self, root: &Path) -> Result<Vec<Pattern>> {
        let files = walk_files(root, &self.excluded)?;
        let mut patterns = Vec::new();

        for chart_file in files.iter().filter(|f| f.file_name().is_some_and(|n| n == CHART_FILE)) {
            match self.read_chart(root, chart_file, &files) {
                Ok(Some(pattern)) => {
                    debug!("Found Helm chart '{}' at {}", pattern.name, pattern.path.display());
                    patterns.push(pattern);
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
        Ok(patterns)
    }

    fn read_chart(&self, root: &Path, chart_file: &Path, files: &[PathBuf]) -> Result<Option<Pattern>> {
        let Some(text) = read_text(root, chart_file) else {
            return Ok(None);
        };
        let detection_error = |message: String| Error::Detection {
            path: chart_file.display().to_string(),
            message,
        };
        let chart: Value = serde_yaml::from_str(&text).map_err(|e| detection_error(e.to_string()))?;
        if !chart.is_mapping() {
            return Err(detection_error("Chart.yaml is not a mapping".to_string()));
        }

        let dir = chart_file.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let name = lookup_string(&chart, &["name"]).unwrap_or_else(|| directory_name(root, &dir));
        let version = lookup_string(&chart, &["version"]);

        let mut configs = vec![chart_file.to_path_buf()];
        let values = dir.join(VALUES_FILE);
        if files.contains(&values) {
            configs.push(values);
        }
        let templates = dir.join(TEMPLATES_DIR);
        configs.extend(files.iter().filter(|f| f.starts_with(&templates)).cloned());

        let metadata = HelmMetadata {
            api_version: lookup_string(&chart, &["apiVersion"]),
            app_version: lookup_string(&chart, &["appVersion"]),
            description: lookup_string(&chart, &["description"]),
            chart_type: lookup_string(&chart, &["type"]),
            dependencies: dependencies(&chart),
        };

        Pattern::new(name, dir, configs, version, PatternMetadata::Helm(metadata)).map(Some)
    }
}

fn dependencies(chart: &Value) -> Vec<ChartDependency> {
    let Some(list) = chart.get("dependencies").and_then(Value::as_sequence) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|dep| {
            Some(ChartDependency {
                name: lookup_string(dep, &["name"])?,
                version: lookup_string(dep, &["version"]),
                repository: lookup_string(dep, &["repository"]),
            })
        })
        .collect()
}
