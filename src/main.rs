// ABOUTME: CLI entry point for dbcontext-migrator
// ABOUTME: Parses commands, discovers contexts, and routes to the workflows

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use dbcontext_migrator::commands::{self, AddOptions, FailurePolicy};
use dbcontext_migrator::config::{self, Settings};
use dbcontext_migrator::naming::UlidNamer;
use dbcontext_migrator::preflight;
use dbcontext_migrator::runner::{CommandRunner, DryRunRunner, ProcessRunner};
use dbcontext_migrator::toolchain::Toolchain;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dbcontext-migrator")]
#[command(about = "Add or apply EF Core migrations for every DbContext in a solution", long_about = None)]
#[command(version)]
struct Cli {
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    /// Solution root to scan (defaults to the parent of the current directory)
    #[arg(long, global = true, env = "DBCONTEXT_MIGRATOR_ROOT")]
    root: Option<PathBuf>,
    /// Path to a config file (defaults to <root>/dbcontext-migrator.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Toolchain program to invoke instead of the configured one
    #[arg(long, global = true, env = "DBCONTEXT_MIGRATOR_TOOLCHAIN")]
    toolchain: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct RunArgs {
    /// Only process these contexts (repeatable)
    #[arg(long = "context", value_name = "NAME")]
    contexts: Vec<String>,
    /// Stop at the first failing context
    #[arg(long, conflicts_with = "continue_on_error")]
    fail_fast: bool,
    /// Report failures and keep going with the remaining contexts
    #[arg(long)]
    continue_on_error: bool,
    /// Print the commands that would run without executing them
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    fn policy(&self, configured: FailurePolicy) -> FailurePolicy {
        if self.fail_fast {
            FailurePolicy::FailFast
        } else if self.continue_on_error {
            FailurePolicy::Continue
        } else {
            configured
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build each project and add a new ULID-named migration per DbContext
    Add {
        #[command(flatten)]
        run: RunArgs,
        /// Skip building the project before adding the migration
        #[arg(long)]
        no_build: bool,
    },
    /// Apply pending migrations for each DbContext
    Update {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Show discovered DbContexts and their project files
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --log
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let root = match cli.root {
        Some(root) => root,
        None => config::default_root()?,
    };
    let mut settings = Settings::load(cli.config.as_deref(), &root)?;
    if let Some(program) = cli.toolchain {
        settings.toolchain.program = program;
    }

    let mut discovery = dbcontext_migrator::discover(&root, &settings.discovery)?;
    if discovery.found_no_projects() {
        println!("No directories found.");
        return Ok(());
    }

    let toolchain = Toolchain::new(settings.toolchain.clone());

    match cli.command {
        Commands::List => {
            commands::list_contexts(&discovery, &settings.discovery);
            Ok(())
        }
        Commands::Add { run, no_build } => {
            select_contexts(&mut discovery, &run.contexts)?;
            if discovery.targets.is_empty() {
                println!("No DbContexts to process.");
                return Ok(());
            }
            let mut runner = make_runner(run.dry_run, &toolchain)?;
            let mut namer = UlidNamer::new();
            let options = AddOptions {
                policy: run.policy(settings.workflow.add_policy),
                build: !no_build,
            };
            let report = commands::generate_migrations(
                &discovery.targets,
                &toolchain,
                &mut *runner,
                &mut namer,
                &options,
            )?;
            report.print("All migrations completed successfully.");
            Ok(())
        }
        Commands::Update { run } => {
            select_contexts(&mut discovery, &run.contexts)?;
            if discovery.targets.is_empty() {
                println!("No DbContexts to process.");
                return Ok(());
            }
            let mut runner = make_runner(run.dry_run, &toolchain)?;
            let report = commands::apply_migrations(
                &discovery.targets,
                &toolchain,
                &mut *runner,
                run.policy(settings.workflow.update_policy),
            )?;
            report.print("All migrations applied successfully.");
            Ok(())
        }
    }
}

fn select_contexts(
    discovery: &mut dbcontext_migrator::Discovery,
    names: &[String],
) -> anyhow::Result<()> {
    let unknown = discovery.retain_contexts(names);
    if !unknown.is_empty() {
        bail!("Unknown DbContext(s): {}", unknown.join(", "));
    }
    Ok(())
}

/// Real runs check the toolchain first; dry runs never touch it.
fn make_runner(dry_run: bool, toolchain: &Toolchain) -> anyhow::Result<Box<dyn CommandRunner>> {
    if dry_run {
        return Ok(Box::new(DryRunRunner::default()));
    }
    preflight::check_toolchain(toolchain.program())?;
    let mut runner = ProcessRunner;
    preflight::check_ef_tool(&mut runner, toolchain)?;
    Ok(Box::new(runner))
}
