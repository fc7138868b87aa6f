use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dart-precommit",
    version,
    about = "Pre-commit checks and fixes for Dart packages"
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run all tasks over the staged files (default).
    Run(RunArgs),
    /// Install the git pre-commit hook.
    Install(HookArgs),
    /// Remove the git pre-commit hook.
    Uninstall(HookArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Package root containing pubspec.yaml.
    #[arg(short, long, default_value = ".")]
    pub directory: PathBuf,

    /// Do not relativize and sort imports.
    #[arg(long)]
    pub no_fix_imports: bool,

    /// Do not run `dart format`.
    #[arg(long)]
    pub no_format: bool,

    /// Do not run `dart analyze`.
    #[arg(long)]
    pub no_analyze: bool,

    /// Keep running the remaining tasks after a rejection.
    #[arg(short, long)]
    pub continue_on_rejected: bool,

    /// Use a distinct exit code per result (0 clean, 1 changes,
    /// 2 unstaged changes, 3 rejected).
    #[arg(short = 'e', long)]
    pub detailed_exit_code: bool,

    /// Log level for diagnostics when RUST_LOG is not set.
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Args, Debug)]
pub struct HookArgs {
    /// Repository root. Defaults to the repository containing the current directory.
    #[arg(short, long)]
    pub repository: Option<PathBuf>,
}

/// Parse CLI arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}
