//! Compiler outcome schema.
//!
//! The rule compiler reports exactly one `CompilationOutcome` per artifact.
//! Semantic errors found after a successful parse arrive as a list of
//! kind-tagged `BuilderError`s; tags this crate does not know are kept as
//! `BuilderError::Unknown` instead of failing the whole outcome.

use super::line_sentinel;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
/// Result of running the compiler over one artifact.
pub enum CompilationOutcome {
    /// The parser rejected the input outright.
    ParseFailure {
        message: String,
        #[serde(default, with = "line_sentinel")]
        line: Option<u32>,
    },
    /// Parsing succeeded; these errors were found afterwards. Empty means clean.
    BuilderErrors {
        #[serde(default)]
        errors: Vec<BuilderError>,
    },
    /// Anything else that went wrong. `kind` names the failure.
    UnexpectedFailure {
        kind: String,
        #[serde(default)]
        message: Option<String>,
    },
}

impl CompilationOutcome {
    /// A clean compile.
    pub fn clean() -> Self {
        CompilationOutcome::BuilderErrors { errors: Vec::new() }
    }

    pub fn unexpected(kind: impl Into<String>, message: Option<String>) -> Self {
        CompilationOutcome::UnexpectedFailure {
            kind: kind.into(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Low-level problem embedded in a rule or function error.
pub struct CompilationProblem {
    pub message: String,
    #[serde(default, with = "line_sentinel")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Structured error reported by the compiler after parsing.
///
/// Serializes in the compiler's kind-tagged form; `Unknown` writes its raw
/// record back unchanged.
pub enum BuilderError {
    Global {
        global: String,
        message: Option<String>,
    },
    Rule {
        rule: String,
        message: String,
        line: Option<u32>,
        problems: Option<Vec<CompilationProblem>>,
    },
    Parser {
        message: String,
        row: Option<u32>,
    },
    Function {
        function: String,
        message: String,
        problems: Option<Vec<CompilationProblem>>,
    },
    FieldTemplate {
        message: String,
        line: Option<u32>,
    },
    FactTemplate {
        message: String,
        line: Option<u32>,
    },
    /// Unrecognized tag; `detail` is the record exactly as received.
    Unknown { tag: String, detail: Json },
}

impl BuilderError {
    /// Tag name as reported by the compiler.
    pub fn kind_name(&self) -> &str {
        match self {
            BuilderError::Global { .. } => "global",
            BuilderError::Rule { .. } => "rule",
            BuilderError::Parser { .. } => "parser",
            BuilderError::Function { .. } => "function",
            BuilderError::FieldTemplate { .. } => "field_template",
            BuilderError::FactTemplate { .. } => "fact_template",
            BuilderError::Unknown { tag, .. } => tag,
        }
    }

    /// Convert a raw JSON record, keeping unknown or malformed records.
    pub fn from_json(value: Json) -> Self {
        match serde_json::from_value::<KnownBuilderError>(value.clone()) {
            Ok(known) => known.into(),
            Err(_) => BuilderError::Unknown {
                tag: value
                    .get("kind")
                    .and_then(Json::as_str)
                    .unwrap_or("untagged")
                    .to_string(),
                detail: value,
            },
        }
    }

    /// The kind-tagged form, or the raw record for `Unknown`.
    fn tagged(&self) -> Result<KnownBuilderError, Json> {
        let known = match self.clone() {
            BuilderError::Global { global, message } => KnownBuilderError::Global { global, message },
            BuilderError::Rule {
                rule,
                message,
                line,
                problems,
            } => KnownBuilderError::Rule {
                rule,
                message,
                line,
                problems,
            },
            BuilderError::Parser { message, row } => KnownBuilderError::Parser { message, row },
            BuilderError::Function {
                function,
                message,
                problems,
            } => KnownBuilderError::Function {
                function,
                message,
                problems,
            },
            BuilderError::FieldTemplate { message, line } => {
                KnownBuilderError::FieldTemplate { message, line }
            }
            BuilderError::FactTemplate { message, line } => {
                KnownBuilderError::FactTemplate { message, line }
            }
            BuilderError::Unknown { detail, .. } => return Err(detail),
        };
        Ok(known)
    }
}

impl Serialize for BuilderError {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.tagged() {
            Ok(known) => known.serialize(s),
            Err(raw) => raw.serialize(s),
        }
    }
}

impl<'de> Deserialize<'de> for BuilderError {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(BuilderError::from_json(Json::deserialize(d)?))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum KnownBuilderError {
    Global {
        global: String,
        #[serde(default)]
        message: Option<String>,
    },
    Rule {
        rule: String,
        #[serde(default)]
        message: String,
        #[serde(default, with = "line_sentinel")]
        line: Option<u32>,
        #[serde(default)]
        problems: Option<Vec<CompilationProblem>>,
    },
    Parser {
        message: String,
        #[serde(default, with = "line_sentinel")]
        row: Option<u32>,
    },
    Function {
        function: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        problems: Option<Vec<CompilationProblem>>,
    },
    FieldTemplate {
        message: String,
        #[serde(default, with = "line_sentinel")]
        line: Option<u32>,
    },
    FactTemplate {
        message: String,
        #[serde(default, with = "line_sentinel")]
        line: Option<u32>,
    },
}

impl From<KnownBuilderError> for BuilderError {
    fn from(k: KnownBuilderError) -> Self {
        match k {
            KnownBuilderError::Global { global, message } => BuilderError::Global { global, message },
            KnownBuilderError::Rule {
                rule,
                message,
                line,
                problems,
            } => BuilderError::Rule {
                rule,
                message,
                line,
                problems,
            },
            KnownBuilderError::Parser { message, row } => BuilderError::Parser { message, row },
            KnownBuilderError::Function {
                function,
                message,
                problems,
            } => BuilderError::Function {
                function,
                message,
                problems,
            },
            KnownBuilderError::FieldTemplate { message, line } => {
                BuilderError::FieldTemplate { message, line }
            }
            KnownBuilderError::FactTemplate { message, line } => {
                BuilderError::FactTemplate { message, line }
            }
        }
    }
}
