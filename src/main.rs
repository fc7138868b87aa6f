use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::exit;
use std::rc::Rc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use dart_precommit::HookResult;
use dart_precommit::cli::{self, Commands, HookArgs, RunArgs};
use dart_precommit::config::HookConfig;
use dart_precommit::gate::{install_hook, uninstall_hook};
use dart_precommit::git::GitRepository;
use dart_precommit::hook::Hook;
use dart_precommit::logger::ConsoleLogger;
use dart_precommit::process::{ProcessRunner, SystemProcess};

/// Exit code for failures that are not a hook result.
const EXIT_ERROR: i32 = 127;

fn main() {
    let args = cli::parse_args();

    let outcome = match args.command {
        None => handle_run(&args.run),
        Some(Commands::Run(run_args)) => handle_run(&run_args),
        Some(Commands::Install(hook_args)) => handle_install(&hook_args).map(|()| 0),
        Some(Commands::Uninstall(hook_args)) => handle_uninstall(&hook_args).map(|()| 0),
    };

    match outcome {
        Ok(code) => exit(code),
        Err(err) => {
            eprintln!("✗ {:#}", err);
            exit(EXIT_ERROR);
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dart_precommit={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Handle the run command - execute all tasks and map the result to an exit code.
fn handle_run(args: &RunArgs) -> Result<i32> {
    init_tracing(&args.log_level);

    let config = HookConfig::load(args).context("Failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let runner: Rc<dyn ProcessRunner> = Rc::new(SystemProcess::new(&config.package_dir));
    let repository = GitRepository::new(runner.clone(), &config.package_dir);
    let logger = ConsoleLogger::new();
    let tasks = config.tasks(runner)?;

    let result = Hook::new(&repository, &logger, tasks)
        .continue_on_rejected(config.continue_on_rejected)
        .run()?;

    match result {
        HookResult::Clean => println!("✓ All staged files are clean"),
        HookResult::HasChanges => {
            println!("✓ Fixed staged files and added the fixes to the commit")
        }
        HookResult::HasUnstagedChanges => eprintln!(
            "⚠ Fixed partially staged files; review and stage the fixes, then commit again"
        ),
        HookResult::Rejected => {
            eprintln!("✗ Some staged files have problems that must be fixed by hand")
        }
    }

    Ok(result.exit_code(args.detailed_exit_code))
}

fn repo_root(args: &HookArgs) -> Result<PathBuf> {
    if let Some(root) = &args.repository {
        return Ok(root.clone());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let runner = Rc::new(SystemProcess::new(&cwd));
    GitRepository::new(runner, cwd)
        .find_repo_root()
        .context("Failed to locate git repository")
}

/// Handle install command - write the pre-commit hook.
fn handle_install(args: &HookArgs) -> Result<()> {
    let hook_path = install_hook(&repo_root(args)?)?;
    println!("✓ Pre-commit hook installed at {}", hook_path.display());
    Ok(())
}

/// Handle uninstall command - remove our pre-commit hook.
fn handle_uninstall(args: &HookArgs) -> Result<()> {
    if uninstall_hook(&repo_root(args)?)? {
        println!("✓ Pre-commit hook removed");
    } else {
        println!("No dart-precommit hook installed");
    }
    Ok(())
}
