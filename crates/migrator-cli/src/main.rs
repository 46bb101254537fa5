//! Migrator Command-Line Tool
//!
//! Applies, reverts and previews declarative migrations against a sled
//! object store.

mod commands;
mod formatter;

use clap::{Parser, Subcommand};
use commands::{MigrateOptions, StoreOptions};
use formatter::OutputFormat;
use migrator_core::{Direction, Mode};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Migrator Command-Line Tool
#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(version, about = "Apply declarative migrations to stored configuration objects")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply the up patches of every migration
    Up(MigrateArgs),
    /// Apply the down patches of every migration
    Down(MigrateArgs),
    /// Print the changes a run would make without writing them
    Calculate(CalculateArgs),
    /// Load YAML or JSON objects into the store
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct StoreArgs {
    /// Path of the sled store
    #[arg(long)]
    pub store: PathBuf,

    /// Store cache capacity in MB
    #[arg(long, default_value_t = 64)]
    pub cache_mb: u64,
}

#[derive(clap::Args, Debug)]
pub struct MigrateArgs {
    /// Directory holding migration files
    #[arg(long)]
    pub migrations_dir: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    /// YAML file of directory entries made available to `directory.lookup`
    #[arg(long)]
    pub directory: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct CalculateArgs {
    #[command(flatten)]
    pub migrate: MigrateArgs,

    /// Direction to calculate (up or down)
    #[arg(long, default_value = "up")]
    pub direction: Direction,

    /// Output format
    #[arg(long, default_value_t = OutputFormat::Json, value_enum)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Files to import
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl From<&StoreArgs> for StoreOptions {
    fn from(args: &StoreArgs) -> Self {
        StoreOptions {
            path: args.store.clone(),
            cache_capacity_mb: args.cache_mb,
        }
    }
}

impl From<&MigrateArgs> for MigrateOptions {
    fn from(args: &MigrateArgs) -> Self {
        MigrateOptions {
            migrations_dir: args.migrations_dir.clone(),
            store: StoreOptions::from(&args.store),
            directory: args.directory.clone(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("migrator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> commands::Result<()> {
    match args.command {
        Command::Up(args) => run_migrate(&args, Direction::Up),
        Command::Down(args) => run_migrate(&args, Direction::Down),
        Command::Calculate(args) => {
            let options = MigrateOptions::from(&args.migrate);
            let changes = commands::migrate(&options, args.direction, Mode::Calculate)?;
            let formatter = formatter::create_formatter(args.format);
            println!("{}", formatter.format_changes(&changes));
            Ok(())
        }
        Command::Import(args) => {
            let count = commands::import(&StoreOptions::from(&args.store), &args.files)?;
            println!("Imported {} objects", count);
            Ok(())
        }
    }
}

fn run_migrate(args: &MigrateArgs, direction: Direction) -> commands::Result<()> {
    let changes = commands::migrate(&MigrateOptions::from(args), direction, Mode::Apply)?;
    let formatter = formatter::create_formatter(OutputFormat::Text);
    println!("{}", formatter.format_changes(&changes));
    Ok(())
}
