//! Implementation of the `annos resolve` sub command.

use clap::Parser;
use serde::Serialize;

use crate::{
    annos::{
        load_resolver,
        resolver::{ResolveMode, ResolverSession},
    },
    common::{io::read_lines, trace_rss_now},
};

/// Command line arguments for `annos resolve` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve gene names and identifiers", long_about = None)]
pub struct Args {
    /// Path to the annotation configuration TOML file.
    #[arg(long, required = true)]
    pub path_conf: String,
    /// How to interpret the tokens.
    #[arg(long, value_enum, default_value_t = ResolveMode::Name)]
    pub mode: ResolveMode,
    /// Tokens to resolve; `@path` reads one token per line from `path`.
    #[arg(required = true)]
    pub tokens: Vec<String>,
}

/// One line of output.
#[derive(Serialize, Debug, PartialEq)]
pub struct ResolvedRecord {
    pub token: String,
    pub gene_id: Option<String>,
    pub gene_name: Option<String>,
    pub is_protein_coding: Option<bool>,
    pub ensembl_release: i64,
}

/// Resolve all `tokens` in the given `mode`.
pub fn resolve_tokens(
    session: &mut ResolverSession,
    tokens: &[String],
    mode: ResolveMode,
) -> Vec<ResolvedRecord> {
    tokens
        .iter()
        .map(|token| {
            let gene = session.resolve(token, mode);
            ResolvedRecord {
                token: token.clone(),
                gene_id: gene.as_ref().map(|gene| gene.gene_id.clone()),
                gene_name: gene.as_ref().map(|gene| gene.gene_name.clone()),
                is_protein_coding: gene.as_ref().map(|gene| gene.is_protein_coding),
                ensembl_release: gene.map_or(-1, |gene| gene.release as i64),
            }
        })
        .collect()
}

/// Main entry point for `annos resolve` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let (_, resolver) = load_resolver(std::path::Path::new(&args.path_conf))?;
    trace_rss_now();

    let mut tokens = Vec::new();
    for token in &args.tokens {
        if let Some(path) = token.strip_prefix('@') {
            tokens.extend(read_lines(path)?);
        } else {
            tokens.push(token.clone());
        }
    }

    let records = resolve_tokens(&mut resolver.session(), &tokens, args.mode);
    let num_found = records.iter().filter(|r| r.gene_id.is_some()).count();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(std::io::stdout());
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!("resolved {} of {} tokens", num_found, records.len());
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::annos::resolver::{fixture, ResolveMode};

    #[test]
    fn resolve_tokens() {
        let resolver = fixture::resolver();
        let records = super::resolve_tokens(
            &mut resolver.session(),
            &[String::from("ENST02"), String::from("ENST99")],
            ResolveMode::TranscriptId,
        );

        assert_eq!(
            records,
            vec![
                super::ResolvedRecord {
                    token: String::from("ENST02"),
                    gene_id: Some(String::from("ENSG01")),
                    gene_name: Some(String::from("FOO")),
                    is_protein_coding: Some(true),
                    ensembl_release: 100,
                },
                super::ResolvedRecord {
                    token: String::from("ENST99"),
                    gene_id: None,
                    gene_name: None,
                    is_protein_coding: None,
                    ensembl_release: -1,
                },
            ]
        );
    }

    #[test]
    fn resolve_tokens_ignores_versions() {
        let resolver = fixture::resolver();
        let records = super::resolve_tokens(
            &mut resolver.session(),
            &[String::from("ENST02"), String::from("ENST02.7")],
            ResolveMode::TranscriptId,
        );

        assert_eq!(
            records
                .iter()
                .map(|record| (
                    record.gene_id.as_deref(),
                    record.gene_name.as_deref(),
                    record.ensembl_release
                ))
                .collect::<Vec<_>>(),
            vec![
                (Some("ENSG01"), Some("FOO"), 100),
                (Some("ENSG01"), Some("FOO"), 100),
            ]
        );
    }
}
