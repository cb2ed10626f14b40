//! Bridge to the external rule compiler and spreadsheet converter.
//!
//! Both are opaque services. `CommandCompiler` and `CommandConverter` reach
//! them through a child process: the source goes to stdin, the artifact path
//! is the last argument, and the result comes back on stdout (a JSON
//! `CompilationOutcome` for the compiler, rule text for the converter).

use crate::config::CommandCfg;
use crate::error::CompilerError;
use crate::models::outcome::CompilationOutcome;
use crate::models::runtime::Runtime;
use crate::models::{ArtifactKind, SourceArtifact};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;

/// Compiles rule text into an outcome.
pub trait Compiler {
    fn compile(
        &self,
        source: &str,
        artifact: &SourceArtifact,
    ) -> Result<CompilationOutcome, CompilerError>;
}

/// Converts a spreadsheet decision table into rule text.
pub trait SpreadsheetConverter {
    fn convert(&self, bytes: &[u8], artifact: &SourceArtifact) -> Result<String, CompilerError>;
}

/// Read `artifact` and run it through the converter (spreadsheets only) and
/// the compiler.
pub fn compile_artifact(
    compiler: &dyn Compiler,
    converter: Option<&dyn SpreadsheetConverter>,
    artifact: &SourceArtifact,
) -> Result<CompilationOutcome, CompilerError> {
    let source = match artifact.kind {
        ArtifactKind::RuleText => String::from_utf8(fs::read(&artifact.path)?)?,
        ArtifactKind::Spreadsheet => {
            let converter = converter.ok_or(CompilerError::NoConverter)?;
            let bytes = fs::read(&artifact.path)?;
            converter.convert(&bytes, artifact)?
        }
    };
    compiler.compile(&source, artifact)
}

/// Compiler reached through an external command.
pub struct CommandCompiler {
    cmd: CommandCfg,
    runtime: Option<Runtime>,
}

impl CommandCompiler {
    pub fn new(cmd: CommandCfg, runtime: Option<Runtime>) -> Self {
        CommandCompiler { cmd, runtime }
    }

    fn env(&self) -> Vec<(&'static str, String)> {
        match &self.runtime {
            Some(rt) => vec![
                ("DRLBUILD_RUNTIME_PATH", rt.path.clone().unwrap_or_default()),
                ("DRLBUILD_RUNTIME_VERSION", rt.version.clone()),
                ("DRLBUILD_RUNTIME_CLASSPATH", rt.classpath()),
            ],
            None => Vec::new(),
        }
    }
}

impl Compiler for CommandCompiler {
    fn compile(
        &self,
        source: &str,
        artifact: &SourceArtifact,
    ) -> Result<CompilationOutcome, CompilerError> {
        let out = run_command(&self.cmd, source.as_bytes(), artifact, &self.env())?;
        Ok(interpret_output(&out))
    }
}

/// Spreadsheet converter reached through an external command.
pub struct CommandConverter {
    cmd: CommandCfg,
}

impl CommandConverter {
    pub fn new(cmd: CommandCfg) -> Self {
        CommandConverter { cmd }
    }
}

impl SpreadsheetConverter for CommandConverter {
    fn convert(&self, bytes: &[u8], artifact: &SourceArtifact) -> Result<String, CompilerError> {
        let out = run_command(&self.cmd, bytes, artifact, &[])?;
        if !out.status.success() {
            return Err(CompilerError::Exit {
                command: self.cmd.command.clone(),
                status: out.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8(out.stdout)?)
    }
}

fn run_command(
    cmd: &CommandCfg,
    input: &[u8],
    artifact: &SourceArtifact,
    env: &[(&str, String)],
) -> Result<Output, CompilerError> {
    log::debug!("running {} for {}", cmd.command, artifact.id);
    let mut child = Command::new(&cmd.command)
        .args(&cmd.args)
        .arg(&artifact.path)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CompilerError::Spawn {
            command: cmd.command.clone(),
            source,
        })?;

    // Feed stdin from another thread so a chatty child cannot block on a full stdout pipe.
    let writer = child.stdin.take().map(|mut stdin| {
        let data = input.to_vec();
        std::thread::spawn(move || {
            if let Err(e) = stdin.write_all(&data) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    log::warn!("failed to write compiler input: {}", e);
                }
            }
        })
    });
    let out = child.wait_with_output()?;
    if let Some(w) = writer {
        let _ = w.join();
    }
    Ok(out)
}

/// Map a finished compiler process to an outcome.
fn interpret_output(out: &Output) -> CompilationOutcome {
    let parsed = serde_json::from_slice::<CompilationOutcome>(&out.stdout);
    match parsed {
        Ok(outcome) => outcome,
        Err(e) if out.status.success() => CompilationOutcome::unexpected(
            "invalid-output",
            Some(format!("compiler output is not a valid outcome: {}", e)),
        ),
        Err(_) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            parse_error_line(&stderr).unwrap_or_else(|| {
                CompilationOutcome::unexpected("compiler-exit", Some(stderr.trim().to_string()))
            })
        }
    }
}

/// Recognize `[ERR 101] Line 3:4 ...` parser messages on stderr.
fn parse_error_line(stderr: &str) -> Option<CompilationOutcome> {
    static ERR_LINE: OnceLock<Regex> = OnceLock::new();
    let re = ERR_LINE.get_or_init(|| {
        Regex::new(r"\[ERR \d+\] Line (\d+):\d+").expect("static regex")
    });
    stderr.lines().find_map(|l| {
        let caps = re.captures(l)?;
        let line = caps.get(1)?.as_str().parse::<u32>().ok()?;
        Some(CompilationOutcome::ParseFailure {
            message: l.trim().to_string(),
            line: Some(line),
        })
    })
}
