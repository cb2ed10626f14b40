//! Build driver: picks the artifacts of a pass, compiles them one at a time
//! and hands every outcome to the reporter.
//!
//! A full build visits every `.drl` and `.xls` file under the project root;
//! an incremental build only the changed paths. Files under the build-output
//! directory are skipped unless that directory is the project root itself.
//! Cancellation is checked before each artifact.

use crate::compiler::{compile_artifact, Compiler, SpreadsheetConverter};
use crate::error::BuildError;
use crate::models::outcome::CompilationOutcome;
use crate::models::{artifact_id, ArtifactKind, ArtifactReport, BuildResult, SourceArtifact};
use crate::reporter::BuildReporter;
use crate::store::ProblemStore;
use glob::{glob_with, MatchOptions, Pattern};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Artifact id used for problems that concern the project as a whole.
pub const PROJECT_ARTIFACT: &str = ".";

const EXTENSIONS: [&str; 2] = ["drl", "xls"];

#[derive(Debug, Clone)]
pub enum BuildKind {
    Full,
    /// Changed paths; `None` when no delta is known.
    Incremental(Option<Vec<PathBuf>>),
}

#[derive(Debug, Clone, Default)]
/// Cooperative cancellation signal shared with whoever drives the build.
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ProjectBuilder<'a> {
    root: &'a Path,
    compiler: &'a dyn Compiler,
    converter: Option<&'a dyn SpreadsheetConverter>,
    output_dir: Option<PathBuf>,
    build_all: bool,
    cancel: CancelFlag,
}

impl<'a> ProjectBuilder<'a> {
    pub fn new(root: &'a Path, compiler: &'a dyn Compiler) -> Self {
        ProjectBuilder {
            root,
            compiler,
            converter: None,
            output_dir: None,
            build_all: false,
            cancel: CancelFlag::default(),
        }
    }

    pub fn converter(mut self, converter: Option<&'a dyn SpreadsheetConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// Turn every incremental build into a full one.
    pub fn build_all(mut self, all: bool) -> Self {
        self.build_all = all;
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Run one build pass, updating `store` as artifacts are visited.
    pub fn build<S: ProblemStore>(&self, kind: BuildKind, store: &mut S) -> BuildResult {
        let mut result = BuildResult::default();
        let mut reporter = BuildReporter::new(store);
        reporter.report_id(PROJECT_ARTIFACT, &CompilationOutcome::clean());

        let candidates = match self.candidates(kind) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("build of {} failed: {}", self.root.display(), e);
                let diagnostics = reporter.report_id(
                    PROJECT_ARTIFACT,
                    &CompilationOutcome::unexpected(
                        "build",
                        Some(format!("Error when trying to build project: {}", e)),
                    ),
                );
                result.push(ArtifactReport {
                    artifact: PROJECT_ARTIFACT.to_string(),
                    kind: None,
                    diagnostics,
                    removed: false,
                });
                return result;
            }
        };
        log::info!(
            "building {} ({} candidate file(s))",
            self.root.display(),
            candidates.len()
        );

        for path in candidates {
            if self.cancel.is_cancelled() {
                log::info!("build cancelled before {}", path.display());
                result.summary.cancelled = true;
                break;
            }
            if self.is_excluded(&path) {
                log::debug!("skipping {} (build output)", path.display());
                continue;
            }
            let known = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ArtifactKind::from_extension)
                .is_some();
            if !known {
                continue;
            }
            if !path.exists() {
                let id = artifact_id(self.root, &path);
                reporter.report_id(&id, &CompilationOutcome::clean());
                result.push(ArtifactReport {
                    artifact: id,
                    kind: None,
                    diagnostics: Vec::new(),
                    removed: true,
                });
                continue;
            }
            let Some(artifact) = SourceArtifact::from_path(self.root, &path) else {
                continue;
            };
            let outcome = self.compile_guarded(&artifact);
            let diagnostics = reporter.report(&artifact, &outcome);
            result.push(ArtifactReport {
                artifact: artifact.id,
                kind: Some(artifact.kind),
                diagnostics,
                removed: false,
            });
        }
        log::info!(
            "build finished: {} artifact(s), {} error(s)",
            result.summary.artifacts,
            result.summary.errors
        );
        result
    }

    fn candidates(&self, kind: BuildKind) -> Result<Vec<PathBuf>, BuildError> {
        if !self.root.is_dir() {
            return Err(BuildError::Inaccessible(self.root.to_path_buf()));
        }
        match kind {
            BuildKind::Incremental(Some(changed)) if !self.build_all => Ok(changed
                .into_iter()
                .map(|p| if p.is_absolute() { p } else { self.root.join(p) })
                .filter(|p| !self.is_hidden(p))
                .collect()),
            _ => self.scan(),
        }
    }

    fn scan(&self) -> Result<Vec<PathBuf>, BuildError> {
        let base = Pattern::escape(&self.root.to_string_lossy());
        // `**` does not descend into dot-directories with this set.
        let options = MatchOptions {
            require_literal_leading_dot: true,
            ..MatchOptions::new()
        };
        let mut found = Vec::new();
        for ext in EXTENSIONS {
            let pattern = format!("{}/**/*.{}", base, ext);
            for entry in glob_with(&pattern, options)? {
                match entry {
                    Ok(p) if p.is_file() && !self.is_hidden(&p) => found.push(p),
                    Ok(_) => {}
                    Err(e) => log::warn!("cannot read {}: {}", e.path().display(), e.error()),
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// `path` relative to the root with `.` components dropped, so `./target`
    /// and the `target/...` paths a scan of `.` yields compare equal.
    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.root)
            .unwrap_or(path)
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Some(out) = self.output_dir.as_deref() else {
            return false;
        };
        let out = self.relative(out);
        // an output directory equal to the root excludes nothing
        !out.as_os_str().is_empty() && self.relative(path).starts_with(&out)
    }

    /// Paths inside dot-directories (VCS metadata, the problem list) are never built.
    fn is_hidden(&self, path: &Path) -> bool {
        self.relative(path)
            .components()
            .any(|c| matches!(c, Component::Normal(s) if s.to_string_lossy().starts_with('.')))
    }

    /// Compile one artifact, turning errors and panics into an outcome.
    fn compile_guarded(&self, artifact: &SourceArtifact) -> CompilationOutcome {
        log::debug!("compiling {} ({})", artifact.id, artifact.kind.as_str());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            compile_artifact(self.compiler, self.converter, artifact)
        }));
        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => CompilationOutcome::unexpected(e.kind_name(), Some(e.to_string())),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned());
                CompilationOutcome::unexpected("panic", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompilerError;
    use crate::models::outcome::BuilderError;
    use crate::models::Diagnostic;
    use crate::store::{ProblemList, DEFAULT_CATEGORY};
    use crate::config::resolve_effective;
    use serial_test::serial;
    use std::cell::RefCell;
    use std::env;
    use std::fs;
    use tempfile::tempdir;

    /// Restores the working directory when dropped.
    struct CwdGuard(PathBuf);

    impl CwdGuard {
        fn enter(dir: &Path) -> Self {
            let prev = env::current_dir().unwrap();
            env::set_current_dir(dir).unwrap();
            CwdGuard(prev)
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = env::set_current_dir(&self.0);
        }
    }

    /// Reports one parser error per source line containing "bad".
    #[derive(Default)]
    struct LineCompiler {
        seen: RefCell<Vec<String>>,
        cancel_after: Option<(usize, CancelFlag)>,
    }

    impl Compiler for LineCompiler {
        fn compile(
            &self,
            source: &str,
            artifact: &SourceArtifact,
        ) -> Result<CompilationOutcome, CompilerError> {
            if source.contains("panic") {
                panic!("compiler blew up");
            }
            let mut seen = self.seen.borrow_mut();
            seen.push(artifact.id.clone());
            if let Some((n, flag)) = &self.cancel_after {
                if seen.len() >= *n {
                    flag.cancel();
                }
            }
            let errors = source
                .lines()
                .enumerate()
                .filter(|(_, l)| l.contains("bad"))
                .map(|(i, l)| BuilderError::Parser {
                    message: l.to_string(),
                    row: Some(i as u32 + 1),
                })
                .collect();
            Ok(CompilationOutcome::BuilderErrors { errors })
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("rules")).unwrap();
        fs::create_dir_all(root.join("target").join("classes")).unwrap();
        fs::create_dir_all(root.join(".drlbuild")).unwrap();
        fs::write(root.join("rules").join("a.drl"), "ok\nbad one\n").unwrap();
        fs::write(root.join("rules").join("b.drl"), "ok\n").unwrap();
        fs::write(root.join("rules").join("notes.txt"), "bad\n").unwrap();
        fs::write(root.join("target").join("classes").join("copy.drl"), "bad\n").unwrap();
        fs::write(root.join(".drlbuild").join("hidden.drl"), "bad\n").unwrap();
        fs::create_dir_all(root.join(".git").join("objects")).unwrap();
        fs::write(root.join(".git").join("objects").join("vcs.drl"), "bad\n").unwrap();
        dir
    }

    #[test]
    fn test_full_build_skips_output_dir_and_hidden() {
        let dir = project();
        let root = dir.path();
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        let res = ProjectBuilder::new(root, &compiler)
            .output_dir(Some(root.join("target")))
            .build(BuildKind::Full, &mut store);

        assert_eq!(*compiler.seen.borrow(), vec!["rules/a.drl", "rules/b.drl"]);
        assert_eq!(res.summary.artifacts, 2);
        assert_eq!(res.summary.errors, 1);
        assert_eq!(
            store.problems("rules/a.drl"),
            vec![Diagnostic::error("bad one", Some(2))]
        );
        assert!(store.problems("rules/b.drl").is_empty());
    }

    #[test]
    fn test_output_dir_equal_to_root_is_not_skipped() {
        let dir = project();
        let root = dir.path();
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        ProjectBuilder::new(root, &compiler)
            .output_dir(Some(root.to_path_buf()))
            .build(BuildKind::Full, &mut store);
        assert!(compiler
            .seen
            .borrow()
            .contains(&"target/classes/copy.drl".to_string()));
    }

    #[test]
    fn test_incremental_build_only_visits_delta() {
        let dir = project();
        let root = dir.path();
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        store.add("rules/b.drl", &Diagnostic::error("stale", None)).unwrap();
        let res = ProjectBuilder::new(root, &compiler).build(
            BuildKind::Incremental(Some(vec![PathBuf::from("rules/a.drl")])),
            &mut store,
        );
        assert_eq!(*compiler.seen.borrow(), vec!["rules/a.drl"]);
        assert_eq!(res.summary.artifacts, 1);
        // untouched artifact keeps its problems
        assert_eq!(store.problems("rules/b.drl").len(), 1);
    }

    #[test]
    fn test_incremental_without_delta_or_build_all_is_full() {
        let dir = project();
        let root = dir.path();
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        ProjectBuilder::new(root, &compiler)
            .output_dir(Some(root.join("target")))
            .build(BuildKind::Incremental(None), &mut store);
        assert_eq!(compiler.seen.borrow().len(), 2);

        let compiler = LineCompiler::default();
        ProjectBuilder::new(root, &compiler)
            .output_dir(Some(root.join("target")))
            .build_all(true)
            .build(
                BuildKind::Incremental(Some(vec![PathBuf::from("rules/a.drl")])),
                &mut store,
            );
        assert_eq!(compiler.seen.borrow().len(), 2);
    }

    #[test]
    fn test_deleted_artifact_in_delta_drops_problems() {
        let dir = project();
        let root = dir.path();
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        store.add("rules/gone.drl", &Diagnostic::error("old", Some(1))).unwrap();
        let res = ProjectBuilder::new(root, &compiler).build(
            BuildKind::Incremental(Some(vec![root.join("rules").join("gone.drl")])),
            &mut store,
        );
        assert!(compiler.seen.borrow().is_empty());
        assert_eq!(res.summary.removed, 1);
        assert!(store.problems("rules/gone.drl").is_empty());
    }

    #[test]
    fn test_cancellation_stops_before_next_artifact() {
        let dir = project();
        let root = dir.path();
        let flag = CancelFlag::default();
        let compiler = LineCompiler {
            seen: RefCell::new(Vec::new()),
            cancel_after: Some((1, flag.clone())),
        };
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        store.add("rules/b.drl", &Diagnostic::error("previous", None)).unwrap();
        let res = ProjectBuilder::new(root, &compiler)
            .output_dir(Some(root.join("target")))
            .cancel_flag(flag)
            .build(BuildKind::Full, &mut store);
        assert!(res.summary.cancelled);
        assert_eq!(*compiler.seen.borrow(), vec!["rules/a.drl"]);
        // b.drl was never started, so its markers are as before
        assert_eq!(store.problems("rules/b.drl"), vec![Diagnostic::error("previous", None)]);
    }

    #[test]
    fn test_compiler_panic_becomes_diagnostic() {
        let dir = project();
        let root = dir.path();
        fs::write(root.join("rules").join("b.drl"), "panic\n").unwrap();
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        let res = ProjectBuilder::new(root, &compiler)
            .output_dir(Some(root.join("target")))
            .build(BuildKind::Full, &mut store);
        assert_eq!(res.summary.artifacts, 2);
        let problems = store.problems("rules/b.drl");
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "compiler blew up");
        assert_eq!(problems[0].line, None);
        // the other artifact is still processed
        assert_eq!(store.problems("rules/a.drl").len(), 1);
    }

    #[test]
    fn test_spreadsheet_without_converter_reports_failure() {
        let dir = project();
        let root = dir.path();
        fs::write(root.join("rules").join("table.xls"), b"\xd0\xcf").unwrap();
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        ProjectBuilder::new(root, &compiler)
            .output_dir(Some(root.join("target")))
            .build(BuildKind::Full, &mut store);
        let problems = store.problems("rules/table.xls");
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "no spreadsheet converter is configured");
    }

    #[test]
    fn test_inaccessible_root_records_project_problem() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        let res = ProjectBuilder::new(&missing, &compiler).build(BuildKind::Full, &mut store);
        assert_eq!(res.summary.errors, 1);
        let problems = store.problems(PROJECT_ARTIFACT);
        assert_eq!(problems.len(), 1);
        assert!(problems[0]
            .message
            .starts_with("Error when trying to build project:"));

        // a later successful pass clears the project-level problem
        let res = ProjectBuilder::new(dir.path(), &compiler).build(BuildKind::Full, &mut store);
        assert_eq!(res.summary.errors, 0);
        assert!(store.problems(PROJECT_ARTIFACT).is_empty());
    }

    #[test]
    #[serial]
    fn test_relative_root_skips_output_dir() {
        let dir = project();
        let _cwd = CwdGuard::enter(dir.path());
        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        let res = ProjectBuilder::new(Path::new("."), &compiler)
            .output_dir(Some(PathBuf::from("./target")))
            .build(BuildKind::Full, &mut store);
        assert_eq!(*compiler.seen.borrow(), vec!["rules/a.drl", "rules/b.drl"]);
        assert_eq!(res.summary.artifacts, 2);
        assert!(store.problems("target/classes/copy.drl").is_empty());
    }

    #[test]
    #[serial]
    fn test_build_with_config_resolved_from_working_dir() {
        let dir = project();
        fs::write(
            dir.path().join("drlbuild.toml"),
            "output_dir = \"target\"\n[compiler]\ncommand = \"drlc\"\n",
        )
        .unwrap();
        let nested = dir.path().join("rules");
        let _cwd = CwdGuard::enter(&nested);

        let eff = resolve_effective(None, None, None).unwrap();
        assert!(eff.config_found);
        assert_eq!(eff.project_root, fs::canonicalize(dir.path()).unwrap());

        let compiler = LineCompiler::default();
        let mut store = ProblemList::new(DEFAULT_CATEGORY);
        ProjectBuilder::new(&eff.project_root, &compiler)
            .output_dir(eff.output_dir.clone())
            .build_all(eff.build_all)
            .build(BuildKind::Full, &mut store);
        assert_eq!(*compiler.seen.borrow(), vec!["rules/a.drl", "rules/b.drl"]);
    }
}
