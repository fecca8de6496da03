//! Implementation of the `expr aggregate` sub command.

pub mod aggregate;
pub mod input;
pub mod overrides;

use std::{io::Write, path::Path, time::Instant};

use clap::Parser;
use thousands::Separable;

use crate::{
    annos::load_resolver,
    common::{
        io::{open_read_maybe_gz, open_write_maybe_gz},
        trace_rss_now,
    },
    expr::input::FileFormat,
};

use self::{
    aggregate::{aggregate, AggregateOptions, AggregatedGeneRow},
    input::{load_expression_rows, DEFAULT_TPM_COLUMNS, DEFAULT_TRANSCRIPT_COLUMNS},
    overrides::ManualOverrides,
};

/// Command line arguments for `expr aggregate` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Aggregate transcript expression to genes", long_about = None)]
pub struct Args {
    /// Path to the annotation configuration TOML file.
    #[arg(long, required = true)]
    pub path_conf: String,
    /// Path to the transcript expression CSV/TSV file.
    #[arg(long, required = true)]
    pub path_input: String,
    /// Path to the output TSV file.
    #[arg(long, required = true)]
    pub path_output: String,
    /// Optional path to additional transcript overrides TSV.
    #[arg(long)]
    pub path_overrides: Option<String>,
    /// Do not consult built-in overrides before the annotation lookup.
    #[arg(long, default_value_t = false)]
    pub no_builtin_overrides: bool,
    /// Candidate names of the transcript ID column, defaults to common names.
    #[arg(long)]
    pub transcript_column: Vec<String>,
    /// Candidate names of the TPM column, defaults to `tpm`.
    #[arg(long)]
    pub tpm_column: Vec<String>,
    /// Retry identifiers that are no known transcript as gene identifiers.
    #[arg(long, default_value_t = false)]
    pub gene_id_fallback: bool,
}

/// Write the aggregated table as TSV.
pub fn write_aggregated_tsv<W: Write>(
    writer: W,
    rows: &[AggregatedGeneRow],
) -> Result<(), anyhow::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load an aggregated table written by `write_aggregated_tsv` or a CSV equivalent.
#[tracing::instrument]
pub fn load_aggregated(path: &Path) -> Result<Vec<AggregatedGeneRow>, anyhow::Error> {
    let before_loading = Instant::now();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(FileFormat::from_path(path)?.delimiter())
        .from_reader(open_read_maybe_gz(path)?);
    let result = reader
        .deserialize()
        .collect::<Result<Vec<AggregatedGeneRow>, _>>()
        .map_err(|e| anyhow::anyhow!("problem reading gene expression from {:?}: {}", path, e))?;
    tracing::debug!(
        "loaded {} gene rows in {:?}",
        result.len().separate_with_commas(),
        before_loading.elapsed()
    );
    Ok(result)
}

/// Return `values` as `&str` or `defaults` if empty.
fn candidates_or<'a>(values: &'a [String], defaults: &[&'a str]) -> Vec<&'a str> {
    if values.is_empty() {
        defaults.to_vec()
    } else {
        values.iter().map(String::as_str).collect()
    }
}

/// Main entry point for `expr aggregate` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let (conf, resolver) = load_resolver(Path::new(&args.path_conf))?;

    let mut overrides = ManualOverrides::builtin()?;
    if args.no_builtin_overrides {
        overrides.clear_primary();
    }
    if let Some(path_overrides) = conf.path_overrides.as_ref() {
        overrides.extend_from_tsv(&conf.resolve_path(path_overrides))?;
    }
    if let Some(path_overrides) = args.path_overrides.as_ref() {
        overrides.extend_from_tsv(Path::new(path_overrides))?;
    }
    tracing::info!("using {} manual transcript overrides", overrides.len());
    trace_rss_now();

    let rows = load_expression_rows(
        Path::new(&args.path_input),
        &candidates_or(&args.transcript_column, DEFAULT_TRANSCRIPT_COLUMNS),
        &candidates_or(&args.tpm_column, DEFAULT_TPM_COLUMNS),
    )?;

    tracing::info!("Aggregating expression...");
    let before_aggregation = Instant::now();
    let aggregation = aggregate(
        &rows,
        &overrides,
        &resolver,
        &AggregateOptions {
            gene_id_fallback: args.gene_id_fallback,
        },
    );
    tracing::info!(
        "... done aggregating {} rows to {} genes in {:?}",
        aggregation.stats.num_rows.separate_with_commas(),
        aggregation.rows.len().separate_with_commas(),
        before_aggregation.elapsed()
    );

    let mut out = open_write_maybe_gz(&args.path_output)?;
    write_aggregated_tsv(&mut out, &aggregation.rows)?;
    out.finish()?;

    tracing::info!(
        "All of `expr aggregate` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
