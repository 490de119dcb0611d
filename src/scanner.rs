//! # Repository Scanner
//!
//! The scanner runs an ordered list of detectors over a repository root and
//! merges their results into one list. The output order is fixed: detector
//! registration order first, then each detector's traversal order. Running
//! detectors in parallel does not change it.
//!
//! A detector that fails, or panics, contributes nothing for that scan. The
//! failure is logged and the remaining detectors still run. Custom
//! detectors (see [`crate::detectors::CustomDetector`]) get the same
//! treatment.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::ReplicatorConfig;
use crate::detectors::{default_detectors, Detector};
use crate::error::Error;
use crate::pattern::{Pattern, PatternKind};

/// Scan behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Run detectors concurrently on the rayon pool.
    pub parallel: bool,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    detectors: Vec<Detector>,
    options: ScanOptions,
}

impl Scanner {
    /// A scanner over an explicit detector list.
    pub fn new(detectors: Vec<Detector>) -> Self {
        Self {
            detectors,
            options: ScanOptions::default(),
        }
    }

    /// A scanner with the Helm, ArgoCD and Kustomize detectors.
    pub fn with_default_detectors(config: &ReplicatorConfig) -> Self {
        Self::new(default_detectors(config))
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Scan `root` and return every pattern found, deduplicated.
    pub fn scan(&self, root: &Path) -> Vec<Pattern> {
        let per_detector: Vec<Vec<Pattern>> = if self.options.parallel {
            self.detectors.par_iter().map(|d| run_detector(d, root)).collect()
        } else {
            self.detectors.iter().map(|d| run_detector(d, root)).collect()
        };

        let mut seen: BTreeSet<(PatternKind, PathBuf, String)> = BTreeSet::new();
        let mut patterns = Vec::new();
        for pattern in per_detector.into_iter().flatten() {
            let key = (pattern.kind(), pattern.path.clone(), pattern.name.clone());
            if seen.insert(key) {
                patterns.push(pattern);
            } else {
                debug!("Dropping duplicate {} at {}", pattern.reference(), pattern.path.display());
            }
        }

        info!("Found {} pattern(s) in {}", patterns.len(), root.display());
        patterns
    }
}

fn run_detector(detector: &Detector, root: &Path) -> Vec<Pattern> {
    let outcome = catch_unwind(AssertUnwindSafe(|| detector.detect(root)));
    let error = match outcome {
        Ok(Ok(patterns)) => return patterns,
        Ok(Err(e)) => e.to_string(),
        Err(panic) => panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "detector panicked".to_string()),
    };
    warn!(
        "{}",
        Error::Scan {
            detector: detector.name().to_string(),
            message: error,
        }
    );
    Vec::new()
}
