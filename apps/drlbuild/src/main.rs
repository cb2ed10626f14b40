//! drlbuild CLI binary entry point.
//! Delegates to modules for build/problems/runtime and prints results.

mod build;
mod cli;
mod compiler;
mod config;
mod error;
mod models;
mod output;
mod reporter;
mod runtime;
mod store;
mod utils;

use crate::build::{BuildKind, ProjectBuilder};
use crate::compiler::{CommandCompiler, CommandConverter, SpreadsheetConverter};
use crate::config::Effective;
use crate::runtime::RuntimeManager;
use crate::store::ProblemList;
use clap::Parser;
use cli::{Cli, Commands, RuntimeCmd};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Build {
            project_root,
            output,
            changed,
            all,
        } => {
            let eff = effective_or_exit(
                project_root.as_deref(),
                output.as_deref(),
                if all { Some(true) } else { None },
            );
            let Some(compiler_cfg) = eff.compiler.clone() else {
                fail("No compiler is configured. Add a [compiler] section to drlbuild.toml.");
            };
            let runtimes = RuntimeManager::new(eff.runtimes.clone(), eff.runtime.clone());
            let compiler = CommandCompiler::new(compiler_cfg, runtimes.build_runtime());
            let converter = eff.converter.clone().map(CommandConverter::new);
            let mut store = load_store_or_exit(&eff);

            let kind = if changed.is_empty() {
                BuildKind::Full
            } else {
                BuildKind::Incremental(Some(changed.iter().map(PathBuf::from).collect()))
            };
            let result = ProjectBuilder::new(&eff.project_root, &compiler)
                .converter(converter.as_ref().map(|c| c as &dyn SpreadsheetConverter))
                .output_dir(eff.output_dir.clone())
                .build_all(eff.build_all)
                .build(kind, &mut store);

            if let Err(e) = store.save(&eff.store) {
                fail(&format!("cannot save problem list: {}", e));
            }
            output::print_build(&result, &eff.output);
            if result.summary.errors > 0 {
                std::process::exit(1);
            }
        }
        Commands::Problems {
            project_root,
            output,
        } => {
            let eff = effective_or_exit(project_root.as_deref(), output.as_deref(), None);
            let store = load_store_or_exit(&eff);
            output::print_problems(&store, &eff.output);
        }
        Commands::Clean { project_root } => {
            let eff = effective_or_exit(project_root.as_deref(), None, None);
            let mut store = load_store_or_exit(&eff);
            store.clear_all();
            if let Err(e) = store.save(&eff.store) {
                fail(&format!("cannot save problem list: {}", e));
            }
            println!("cleaned");
        }
        Commands::Runtime { cmd } => match cmd {
            RuntimeCmd::Ls {
                project_root,
                output,
            } => {
                let eff = effective_or_exit(project_root.as_deref(), output.as_deref(), None);
                let mgr = RuntimeManager::new(eff.runtimes, eff.runtime);
                output::print_runtimes(mgr.configured_runtimes(), mgr.project_runtime(), &eff.output);
            }
            RuntimeCmd::Default { project_root } => {
                let eff = effective_or_exit(project_root.as_deref(), None, None);
                let mgr = RuntimeManager::new(eff.runtimes, eff.runtime);
                match mgr.project_runtime() {
                    Some(rt) => println!("{} {}", rt.name, rt.version),
                    None => fail("No runtime is configured. Add [[runtimes]] to drlbuild.toml."),
                }
            }
            RuntimeCmd::SetDefault {
                project_root,
                output,
                name,
            } => {
                let eff = effective_or_exit(project_root.as_deref(), output.as_deref(), None);
                let mut mgr = RuntimeManager::new(eff.runtimes, None);
                if !mgr.set_default(&name) {
                    fail(&format!("unknown runtime: {}", name));
                }
                output::print_runtimes(mgr.configured_runtimes(), mgr.default_runtime(), &eff.output);
            }
            RuntimeCmd::Jars { project_root, name } => {
                let eff = effective_or_exit(project_root.as_deref(), None, None);
                let mut mgr = RuntimeManager::new(eff.runtimes, eff.runtime);
                match mgr.recognize_jars_for(&name) {
                    Some(rt) => {
                        for jar in &rt.jars {
                            println!("{}", jar);
                        }
                    }
                    None => fail(&format!("unknown runtime: {}", name)),
                }
            }
        },
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", utils::error_prefix(), message);
    std::process::exit(2);
}

fn effective_or_exit(
    project_root: Option<&str>,
    output: Option<&str>,
    build_all: Option<bool>,
) -> Effective {
    match config::resolve_effective(project_root, output, build_all) {
        Ok(eff) => {
            if !eff.config_found {
                eprintln!(
                    "{} {}",
                    utils::note_prefix(),
                    "No drlbuild.toml found; using defaults."
                );
            }
            eff
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn load_store_or_exit(eff: &Effective) -> ProblemList {
    match ProblemList::load(&eff.store, &eff.category) {
        Ok(s) => s,
        Err(e) => fail(&format!(
            "cannot read problem list {}: {}",
            eff.store.display(),
            e
        )),
    }
}
