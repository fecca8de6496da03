//! Gene expression worker main executable

pub mod annos;
pub mod categories;
pub mod common;
pub mod err;
pub mod expr;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Gene expression aggregation and partitioning",
    long_about = "This tool aggregates transcript expression to genes and partitions it by gene categories"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Annotation-related commands.
    Annos(Annos),
    /// Expression-related commands.
    Expr(Expr),
}

/// Parsing of "annos *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Annos {
    /// The sub command to run
    #[command(subcommand)]
    command: AnnosCommands,
}

/// Enum supporting the parsing of "annos *" sub commands.
#[derive(Debug, Subcommand)]
enum AnnosCommands {
    Resolve(annos::cli::Args),
}

/// Parsing of "expr *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Expr {
    /// The sub command to run
    #[command(subcommand)]
    command: ExprCommands,
}

/// Enum supporting the parsing of "expr *" sub commands.
#[derive(Debug, Subcommand)]
enum ExprCommands {
    Aggregate(expr::Args),
    Partition(categories::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Annos(annos) => match &annos.command {
                AnnosCommands::Resolve(args) => annos::cli::run(&cli.common, args)?,
            },
            Commands::Expr(expr) => match &expr.command {
                ExprCommands::Aggregate(args) => expr::run(&cli.common, args)?,
                ExprCommands::Partition(args) => categories::run(&cli.common, args)?,
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
