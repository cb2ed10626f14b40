//! Problem list: the persistent, per-artifact record of reported problems.
//!
//! Markers are tagged with a producer category. Every operation of
//! `ProblemList` only sees markers of its own category, so markers written
//! by other tools sharing the file survive a rebuild.

use crate::error::StoreError;
use crate::models::{line_sentinel, Diagnostic, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Category used when the configuration does not name one.
pub const DEFAULT_CATEGORY: &str = "drlbuild.problem";

/// Sink for diagnostics, scoped by artifact identity.
pub trait ProblemStore {
    /// Remove every marker this producer owns for `artifact`. Succeeds when
    /// there is none.
    fn clear(&mut self, artifact: &str) -> Result<(), StoreError>;

    /// Record one diagnostic against `artifact`.
    fn add(&mut self, artifact: &str, diagnostic: &Diagnostic) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One stored problem.
pub struct Marker {
    pub category: String,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, with = "line_sentinel")]
    pub line: Option<u32>,
}

impl Marker {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            message: self.message.clone(),
            line: self.line,
            severity: self.severity,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProblemFile {
    version: u32,
    #[serde(default)]
    markers: BTreeMap<String, Vec<Marker>>,
}

#[derive(Debug)]
/// JSON-backed problem list.
pub struct ProblemList {
    category: String,
    markers: BTreeMap<String, Vec<Marker>>,
}

impl ProblemList {
    /// Bump to discard problem files written by an older layout.
    const FORMAT_VERSION: u32 = 1;

    pub fn new(category: &str) -> Self {
        ProblemList {
            category: category.to_string(),
            markers: BTreeMap::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Load from `path`. A missing file or an older format yields an empty
    /// list; malformed JSON is an error.
    pub fn load(path: &Path, category: &str) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new(category));
        }
        let data = fs::read(path)?;
        let file: ProblemFile = serde_json::from_slice(&data)?;
        if file.version != Self::FORMAT_VERSION {
            log::info!(
                "discarding problem list {} (format {})",
                path.display(),
                file.version
            );
            return Ok(Self::new(category));
        }
        Ok(ProblemList {
            category: category.to_string(),
            markers: file.markers,
        })
    }

    /// Write every marker, including other categories, to `path`.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = ProblemFile {
            version: Self::FORMAT_VERSION,
            markers: self
                .markers
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        let content = serde_json::to_vec_pretty(&file)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// This category's problems for `artifact`, in recording order.
    pub fn problems(&self, artifact: &str) -> Vec<Diagnostic> {
        self.markers
            .get(artifact)
            .map(|ms| {
                ms.iter()
                    .filter(|m| m.category == self.category)
                    .map(Marker::to_diagnostic)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Artifacts with at least one problem of this category, sorted.
    pub fn artifacts(&self) -> Vec<String> {
        self.markers
            .iter()
            .filter(|(_, ms)| ms.iter().any(|m| m.category == self.category))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Drop this category's markers everywhere.
    pub fn clear_all(&mut self) {
        let keys: Vec<String> = self.markers.keys().cloned().collect();
        for k in keys {
            self.retain_foreign(&k);
        }
    }

    pub fn error_count(&self) -> usize {
        self.markers
            .values()
            .flatten()
            .filter(|m| m.category == self.category && m.severity == Severity::Error)
            .count()
    }

    fn retain_foreign(&mut self, artifact: &str) {
        let category = self.category.clone();
        if let Some(ms) = self.markers.get_mut(artifact) {
            ms.retain(|m| m.category != category);
            if ms.is_empty() {
                self.markers.remove(artifact);
            }
        }
    }
}

impl ProblemStore for ProblemList {
    fn clear(&mut self, artifact: &str) -> Result<(), StoreError> {
        self.retain_foreign(artifact);
        Ok(())
    }

    fn add(&mut self, artifact: &str, diagnostic: &Diagnostic) -> Result<(), StoreError> {
        if artifact.is_empty() {
            return Err(StoreError::Rejected(artifact.to_string()));
        }
        self.markers
            .entry(artifact.to_string())
            .or_default()
            .push(Marker {
                category: self.category.clone(),
                message: diagnostic.message.clone(),
                severity: diagnostic.severity,
                line: diagnostic.line,
            });
        Ok(())
    }
}
