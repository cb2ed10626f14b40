//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "drlbuild",
    version,
    about = "Rule project builder",
    long_about = "drlbuild — compiles .drl rule files and .xls decision tables with an external rule compiler and keeps a per-file problem list.\n\nConfiguration precedence: CLI > drlbuild.toml > defaults.",
    after_help = "Examples:\n  drlbuild build\n  drlbuild build --changed rules/pricing.drl --output json\n  drlbuild problems\n  drlbuild runtime ls",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current drlbuild version.")]
    Version,
    /// Build the project and refresh the problem list
    #[command(
        about = "Run a build pass",
        long_about = "Compile rule files and decision tables and replace their problems. Without --changed every artifact is built.",
        after_help = "Examples:\n  drlbuild build\n  drlbuild build --changed rules/a.drl --changed tables/b.xls"
    )]
    Build {
        #[arg(long, help = "Project root (default: current dir)")]
        project_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, help = "Changed file; repeat for each file (incremental build)")]
        changed: Vec<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Rebuild everything even when --changed is given")]
        all: bool,
    },
    /// Show the stored problem list
    #[command(
        about = "List problems",
        long_about = "Print the problems recorded by the last build passes."
    )]
    Problems {
        #[arg(long, help = "Project root (default: current dir)")]
        project_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Remove every problem recorded by drlbuild
    #[command(
        about = "Clear problems",
        long_about = "Remove drlbuild problems from the problem list. Problems from other tools are kept."
    )]
    Clean {
        #[arg(long, help = "Project root (default: current dir)")]
        project_root: Option<String>,
    },
    /// Runtime management (ls/default/set-default/jars)
    Runtime {
        #[command(subcommand)]
        cmd: RuntimeCmd,
    },
}

#[derive(Subcommand)]
/// Subcommands for `drlbuild runtime`
pub enum RuntimeCmd {
    /// List configured runtimes
    #[command(
        about = "List runtimes",
        long_about = "List runtimes configured under [[runtimes]]; the effective one is starred."
    )]
    Ls {
        #[arg(long, help = "Project root (default: current dir)")]
        project_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Print the runtime the project builds against
    #[command(
        about = "Show effective runtime",
        long_about = "Print the runtime named by the project's `runtime` key, or the default runtime."
    )]
    Default {
        #[arg(long, help = "Project root (default: current dir)")]
        project_root: Option<String>,
    },
    /// Make a runtime the default for this invocation
    #[command(
        about = "Set default runtime",
        long_about = "Mark NAME as the only default runtime and print the resulting list. The config file is not rewritten."
    )]
    SetDefault {
        #[arg(long, help = "Project root (default: current dir)")]
        project_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(help = "Runtime name")]
        name: String,
    },
    /// Recognize the jars of a runtime
    #[command(
        about = "Recognize jars",
        long_about = "Scan the runtime's install path for jar files and print them."
    )]
    Jars {
        #[arg(long, help = "Project root (default: current dir)")]
        project_root: Option<String>,
        #[arg(help = "Runtime name")]
        name: String,
    },
}
