//! Shared data models for artifacts, diagnostics, compiler outcomes and
//! build results.

pub mod outcome;
pub mod runtime;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Line value written for diagnostics whose line is unknown.
pub const UNKNOWN_LINE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Kind of a build artifact, derived from its file extension.
pub enum ArtifactKind {
    #[serde(rename = "rule-text")]
    RuleText,
    #[serde(rename = "spreadsheet")]
    Spreadsheet,
}

impl ArtifactKind {
    /// Map a file extension to an artifact kind (`drl` or `xls`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "drl" => Some(ArtifactKind::RuleText),
            "xls" => Some(ArtifactKind::Spreadsheet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::RuleText => "rule-text",
            ArtifactKind::Spreadsheet => "spreadsheet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A file handed to the compiler during a build pass.
///
/// `id` is the project-relative path with `/` separators and keys the
/// problem list.
pub struct SourceArtifact {
    pub id: String,
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl SourceArtifact {
    /// Build an artifact for `path` if its extension names a known kind.
    pub fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let kind = ArtifactKind::from_extension(path.extension()?.to_str()?)?;
        Some(SourceArtifact {
            id: artifact_id(root, path),
            path: path.to_path_buf(),
            kind,
        })
    }
}

/// Project-relative identity of `path`, falling back to the path itself.
pub fn artifact_id(root: &Path, path: &Path) -> String {
    let rel = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Marker severity. Diagnostics produced by the builder are always errors.
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single reported problem.
pub struct Diagnostic {
    pub message: String,
    #[serde(default, with = "line_sentinel")]
    pub line: Option<u32>,
    #[serde(default)]
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, line: Option<u32>) -> Self {
        Diagnostic {
            message: message.into(),
            line,
            severity: Severity::Error,
        }
    }
}

/// Serde adapter writing `None` lines as `-1` and reading any negative
/// value back as `None`.
pub mod line_sentinel {
    use super::UNKNOWN_LINE;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(line: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(line.map(i64::from).unwrap_or(UNKNOWN_LINE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let raw = Option::<i64>::deserialize(d)?;
        Ok(raw.and_then(|v| u32::try_from(v).ok()))
    }
}

#[derive(Debug, Clone, Serialize)]
/// What happened to one artifact during a build pass.
pub struct ArtifactReport {
    pub artifact: String,
    pub kind: Option<ArtifactKind>,
    pub diagnostics: Vec<Diagnostic>,
    /// The artifact vanished; its markers were dropped.
    pub removed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Aggregated build summary used by printers and the exit code.
pub struct BuildSummary {
    pub errors: usize,
    pub artifacts: usize,
    pub removed: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Build results container.
pub struct BuildResult {
    pub artifacts: Vec<ArtifactReport>,
    pub summary: BuildSummary,
}

impl BuildResult {
    pub fn push(&mut self, report: ArtifactReport) {
        if report.removed {
            self.summary.removed += 1;
        } else {
            self.summary.artifacts += 1;
        }
        self.summary.errors += report
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        self.artifacts.push(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_kind_from_extension() {
        assert_eq!(ArtifactKind::from_extension("drl"), Some(ArtifactKind::RuleText));
        assert_eq!(ArtifactKind::from_extension("xls"), Some(ArtifactKind::Spreadsheet));
        assert_eq!(ArtifactKind::from_extension("xlsx"), None);
        assert_eq!(ArtifactKind::from_extension("java"), None);
    }

    #[test]
    fn test_artifact_id_is_relative_with_forward_slashes() {
        let root = Path::new("/work/project");
        let a = SourceArtifact::from_path(root, &root.join("rules").join("pricing.drl")).unwrap();
        assert_eq!(a.id, "rules/pricing.drl");
        assert_eq!(a.kind, ArtifactKind::RuleText);
        assert!(SourceArtifact::from_path(root, &root.join("README.md")).is_none());
        assert_eq!(artifact_id(root, root), ".");
    }

    #[test]
    fn test_unknown_line_serializes_as_sentinel() {
        let d = Diagnostic::error("boom", None);
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["line"], -1);
        assert_eq!(v["severity"], "error");
        let back: Diagnostic = serde_json::from_value(v).unwrap();
        assert_eq!(back.line, None);

        let known: Diagnostic =
            serde_json::from_str(r#"{"message":"m","line":7,"severity":"error"}"#).unwrap();
        assert_eq!(known.line, Some(7));
    }

    #[test]
    fn test_build_result_push_counts() {
        let mut res = BuildResult::default();
        res.push(ArtifactReport {
            artifact: "a.drl".into(),
            kind: Some(ArtifactKind::RuleText),
            diagnostics: vec![Diagnostic::error("x", Some(1)), Diagnostic::error("y", None)],
            removed: false,
        });
        res.push(ArtifactReport {
            artifact: "gone.drl".into(),
            kind: None,
            diagnostics: vec![],
            removed: true,
        });
        assert_eq!(res.summary.errors, 2);
        assert_eq!(res.summary.artifacts, 1);
        assert_eq!(res.summary.removed, 1);
    }
}
