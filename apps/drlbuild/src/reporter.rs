//! Translation of compiler outcomes into diagnostics, and their application
//! to the problem list.
//!
//! `report` clears the artifact's previous problems before recording the new
//! ones, so the problem list only ever reflects the latest pass. Store
//! failures are logged and never stop the remaining diagnostics.

use crate::models::outcome::{BuilderError, CompilationOutcome, CompilationProblem};
use crate::models::{Diagnostic, SourceArtifact};
use crate::store::ProblemStore;

/// Applies compiler outcomes to a problem store, one artifact at a time.
pub struct BuildReporter<'a, S: ProblemStore> {
    store: &'a mut S,
}

impl<'a, S: ProblemStore> BuildReporter<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        BuildReporter { store }
    }

    /// Replace the problems recorded for `artifact` with those produced by
    /// `outcome`. Returns the diagnostics in the order they were produced.
    pub fn report(
        &mut self,
        artifact: &SourceArtifact,
        outcome: &CompilationOutcome,
    ) -> Vec<Diagnostic> {
        self.report_id(&artifact.id, outcome)
    }

    /// Same as `report`, keyed by a raw artifact id.
    pub fn report_id(&mut self, artifact: &str, outcome: &CompilationOutcome) -> Vec<Diagnostic> {
        if let Err(e) = self.store.clear(artifact) {
            log::warn!("failed to clear problems for {}: {}", artifact, e);
        }
        let diagnostics = translate(outcome);
        for d in &diagnostics {
            if let Err(e) = self.store.add(artifact, d) {
                log::warn!("failed to record problem for {}: {}", artifact, e);
            }
        }
        log::debug!("{}: {} problem(s)", artifact, diagnostics.len());
        diagnostics
    }
}

/// Turn one outcome into an ordered list of diagnostics.
pub fn translate(outcome: &CompilationOutcome) -> Vec<Diagnostic> {
    match outcome {
        CompilationOutcome::ParseFailure { message, line } => {
            vec![Diagnostic::error(message.clone(), *line)]
        }
        CompilationOutcome::BuilderErrors { errors } => {
            let mut out = Vec::new();
            for e in errors {
                translate_builder_error(e, &mut out);
            }
            out
        }
        CompilationOutcome::UnexpectedFailure { kind, message } => {
            let message = match message.as_deref().map(str::trim) {
                Some(m) if !m.is_empty() => m.to_string(),
                _ => format!("Error: {}", kind),
            };
            vec![Diagnostic::error(message, None)]
        }
    }
}

fn translate_builder_error(error: &BuilderError, out: &mut Vec<Diagnostic>) {
    match error {
        BuilderError::Global { global, message } => {
            let text = match message.as_deref() {
                Some(m) if !m.trim().is_empty() => format!("{}: {}", global, m),
                _ => global.clone(),
            };
            out.push(Diagnostic::error(text, None));
        }
        BuilderError::Rule {
            rule,
            message,
            line,
            problems,
        } => match problems {
            // Lines of embedded problems point into generated code, not the rule file.
            Some(problems) => push_problems(problems, *line, out),
            None => out.push(Diagnostic::error(format!("{}:{}", rule, message), *line)),
        },
        BuilderError::Parser { message, row } => {
            out.push(Diagnostic::error(message.clone(), *row));
        }
        BuilderError::Function {
            function,
            message,
            problems,
        } => match problems {
            Some(problems) => push_problems(problems, None, out),
            None => out.push(Diagnostic::error(format!("{}:{}", function, message), None)),
        },
        BuilderError::FieldTemplate { message, line } | BuilderError::FactTemplate { message, line } => {
            out.push(Diagnostic::error(message.clone(), *line));
        }
        BuilderError::Unknown { tag, detail } => {
            out.push(Diagnostic::error(
                format!("Unknown builder error {}: {}", tag, detail),
                None,
            ));
        }
    }
}

fn push_problems(problems: &[CompilationProblem], line: Option<u32>, out: &mut Vec<Diagnostic>) {
    out.extend(
        problems
            .iter()
            .map(|p| Diagnostic::error(p.message.clone(), line)),
    );
}
