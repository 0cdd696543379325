use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, error, info, warn};

use migrator::config::MigratorConfig;
use migrator::context::{MigrationContext, Requirements, RunMode};
use migrator::migration::{FileMigrator, UserMigrator, fix_sequences, verify};
use migrator::report::MigrationReport;
use migrator::tags::TagConsolidator;

#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(about = "Moves legacy file-share data into the new schema and cleans up tags")]
struct Cli {
    /// Config environment; reads config/<env>.toml
    #[arg(long, global = true, default_value = "staging", env = "MIGRATOR_ENV")]
    env: String,

    /// Apply changes. Without this flag every step is a dry run.
    #[arg(long, global = true)]
    execute: bool,

    /// Enable debug logging, including SQL
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print reports as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Copy legacy users so file owners can resolve
    MigrateUsers,
    /// Upload payloads and copy file rows with their raw tags
    MigrateFiles {
        /// Rows per page; overrides migration.batch_size
        #[arg(long)]
        batch_size: Option<u64>,
    },
    /// Split, delete and merge tags
    CleanTags,
    /// Check a random sample of migrated objects
    Verify {
        /// Objects to check; overrides migration.verify_samples
        #[arg(long)]
        samples: Option<u64>,
    },
    /// Advance id sequences past the migrated rows
    FixSequences,
    /// migrate-users, migrate-files, clean-tags and fix-sequences in order
    Pipeline,
}

impl Command {
    fn requirements(self) -> Requirements {
        match self {
            Self::MigrateUsers => Requirements {
                source: true,
                store: false,
            },
            Self::MigrateFiles { .. } | Self::Pipeline => Requirements {
                source: true,
                store: true,
            },
            Self::Verify { .. } => Requirements {
                source: false,
                store: true,
            },
            Self::CleanTags | Self::FixSequences => Requirements::default(),
        }
    }

    fn steps(self) -> Vec<Step> {
        match self {
            Self::MigrateUsers => vec![Step::MigrateUsers],
            Self::MigrateFiles { .. } => vec![Step::MigrateFiles],
            Self::CleanTags => vec![Step::CleanTags],
            Self::Verify { .. } => vec![Step::Verify],
            Self::FixSequences => vec![Step::FixSequences],
            Self::Pipeline => vec![
                Step::MigrateUsers,
                Step::MigrateFiles,
                Step::CleanTags,
                Step::FixSequences,
            ],
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let json = cli.json;
    match run(cli).await {
        Ok(reports) => {
            print_reports(&reports, json);
            if reports.iter().any(MigrationReport::has_failures) {
                warn!("Finished with failures");
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<Vec<MigrationReport>> {
    let mut config = MigratorConfig::load(&cli.env)
        .with_context(|| format!("Failed to load config for env {:?}", cli.env))?;

    match cli.command {
        Command::MigrateFiles {
            batch_size: Some(n),
        } => config.migration.batch_size = n.max(1),
        Command::Verify { samples: Some(n) } => config.migration.verify_samples = n,
        _ => {}
    }

    let mode = RunMode::from_execute_flag(cli.execute);
    if mode.is_dry_run() {
        info!("Dry run: nothing will be written. Pass --execute to apply changes.");
    }

    let ctx = MigrationContext::connect(&config, mode, cli.command.requirements())
        .await
        .context("Failed to initialize")?;

    let mut reports = Vec::new();
    for step in cli.command.steps() {
        let report = run_step(&ctx, &config, step)
            .await
            .with_context(|| format!("{} aborted", step.name()))?;
        reports.push(report);
    }
    Ok(reports)
}

/// One unit of work; `pipeline` expands to several.
#[derive(Debug, Clone, Copy)]
enum Step {
    MigrateUsers,
    MigrateFiles,
    CleanTags,
    Verify,
    FixSequences,
}

impl Step {
    fn name(self) -> &'static str {
        match self {
            Self::MigrateUsers => migrator::migration::users::STEP,
            Self::MigrateFiles => migrator::migration::files::STEP,
            Self::CleanTags => migrator::tags::consolidate::STEP,
            Self::Verify => migrator::migration::verify::STEP,
            Self::FixSequences => migrator::migration::sequences::STEP,
        }
    }
}

async fn run_step(
    ctx: &MigrationContext,
    config: &MigratorConfig,
    step: Step,
) -> anyhow::Result<MigrationReport> {
    let batch_size = config.migration.batch_size;
    let report = match step {
        Step::MigrateUsers => {
            UserMigrator::new(ctx.source()?, &ctx.target, ctx.mode, batch_size)
                .run()
                .await?
        }
        Step::MigrateFiles => {
            FileMigrator::new(ctx.source()?, &ctx.target, ctx.store()?, ctx.mode, batch_size)
                .run()
                .await?
        }
        Step::CleanTags => {
            let outcome = TagConsolidator::new(&ctx.target, ctx.mode).run().await?;
            if outcome.plan.is_empty() {
                info!("Tags are already consolidated");
            }
            outcome.report
        }
        Step::Verify => {
            let outcome = verify(&ctx.target, ctx.store()?, config.migration.verify_samples).await?;
            info!(
                migrated = outcome.migrated,
                checked = outcome.report.attempted,
                missing = outcome.report.failed,
                "Verification finished"
            );
            outcome.report
        }
        Step::FixSequences => fix_sequences(&ctx.target, ctx.mode).await?.1,
    };
    Ok(report)
}

fn print_reports(reports: &[MigrationReport], json: bool) {
    if json {
        match serde_json::to_string_pretty(reports) {
            Ok(out) => println!("{out}"),
            Err(e) => error!(error = %e, "Failed to serialize reports"),
        }
        return;
    }
    for report in reports {
        println!("{report}");
    }
}
