//! Configuration discovery and effective settings resolution.
//!
//! drlbuild reads `drlbuild.toml|yaml|yml` from the project root (or closest
//! ancestor) and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `output_dir`: none (nothing is skipped)
//! - `store`: `.drlbuild/problems.json`
//! - `category`: `drlbuild.problem`
//! - `build.all`: false
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::ConfigError;
use crate::models::runtime::Runtime;
use crate::store::DEFAULT_CATEGORY;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Store location used when the config does not name one.
pub const DEFAULT_STORE: &str = ".drlbuild/problems.json";

#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
/// An external program: `[compiler]` or `[converter]`.
pub struct CommandCfg {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Build behavior under `[build]`.
pub struct BuildCfg {
    /// Rebuild every artifact even when only a delta is known.
    pub all: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `drlbuild.toml|yaml`.
pub struct DrlBuildConfig {
    pub output: Option<String>,
    pub output_dir: Option<String>,
    pub store: Option<String>,
    pub category: Option<String>,
    /// Name of the runtime this project builds against.
    pub runtime: Option<String>,
    pub build: Option<BuildCfg>,
    pub compiler: Option<CommandCfg>,
    pub converter: Option<CommandCfg>,
    #[serde(default)]
    pub runtimes: Vec<Runtime>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub project_root: PathBuf,
    pub output: String,
    pub output_dir: Option<PathBuf>,
    pub store: PathBuf,
    pub category: String,
    pub build_all: bool,
    pub compiler: Option<CommandCfg>,
    pub converter: Option<CommandCfg>,
    pub runtime: Option<String>,
    pub runtimes: Vec<Runtime>,
    /// Whether a config file was found at all.
    pub config_found: bool,
}

/// Walk upward from `start` to detect the project root.
///
/// Stops when a `drlbuild.toml|yaml|yml` or a `.git` directory is found.
/// `start` is made absolute first so relative starts such as `.` reach
/// their real ancestors; an unresolvable start is used as given.
pub fn detect_project_root(start: &Path) -> PathBuf {
    let start = fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    let mut cur = start.as_path();
    loop {
        if config_path(cur).is_some() || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start,
        }
    }
}

fn config_path(root: &Path) -> Option<PathBuf> {
    ["drlbuild.toml", "drlbuild.yaml", "drlbuild.yml"]
        .iter()
        .map(|n| root.join(n))
        .find(|p| p.exists())
}

/// Load the config, reporting malformed files. `Ok(None)` when absent.
pub fn load_config_checked(root: &Path) -> Result<Option<DrlBuildConfig>, ConfigError> {
    let Some(path) = config_path(root) else {
        return Ok(None);
    };
    let s = fs::read_to_string(&path)?;
    let cfg = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        toml::from_str(&s).map_err(|e| ConfigError::Toml {
            path: path.clone(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&s).map_err(|e| ConfigError::Yaml {
            path: path.clone(),
            message: e.to_string(),
        })?
    };
    validate(&cfg)?;
    Ok(Some(cfg))
}

fn validate(cfg: &DrlBuildConfig) -> Result<(), ConfigError> {
    if let Some(out) = cfg.output.as_deref() {
        if out != "human" && out != "json" {
            return Err(ConfigError::Invalid(format!(
                "output must be human or json, got '{}'",
                out
            )));
        }
    }
    for (label, cmd) in [("compiler", &cfg.compiler), ("converter", &cfg.converter)] {
        if cmd.as_ref().is_some_and(|c| c.command.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("[{}].command is empty", label)));
        }
    }
    let mut names = std::collections::HashSet::new();
    for rt in &cfg.runtimes {
        if !names.insert(rt.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "runtime '{}' is configured twice",
                rt.name
            )));
        }
    }
    Ok(())
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_project_root: Option<&str>,
    cli_output: Option<&str>,
    cli_build_all: Option<bool>,
) -> Result<Effective, ConfigError> {
    let start = PathBuf::from(cli_project_root.unwrap_or("."));
    let project_root = detect_project_root(&start);
    let loaded = load_config_checked(&project_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    let output_dir = cfg.output_dir.map(|d| project_root.join(d));
    let store = project_root.join(cfg.store.as_deref().unwrap_or(DEFAULT_STORE));
    let category = cfg
        .category
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    let build_all = cli_build_all
        .or_else(|| cfg.build.as_ref().and_then(|b| b.all))
        .unwrap_or(false);

    Ok(Effective {
        project_root,
        output,
        output_dir,
        store,
        category,
        build_all,
        compiler: cfg.compiler,
        converter: cfg.converter,
        runtime: cfg.runtime,
        runtimes: cfg.runtimes,
        config_found,
    })
}
