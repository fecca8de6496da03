//! Common functionality.

use std::sync::LazyLock;

use byte_unit::{Byte, UnitType};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::err::ConfigError;

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
///
/// Does nothing if `/proc` is not available.
pub fn trace_rss_now() {
    let rss = procfs::process::Process::myself()
        .and_then(|me| me.stat())
        .map(|stat| stat.rss * procfs::page_size());
    match rss {
        Ok(rss) => tracing::debug!(
            "RSS now: {}",
            Byte::from_u64(rss).get_appropriate_unit(UnitType::Binary)
        ),
        Err(e) => tracing::trace!("could not determine RSS: {}", e),
    }
}

/// Strip the version suffix from an identifier, i.e., everything starting at the first `.`.
///
/// This is the coarse variant used for transcript identifiers in expression tables.
pub fn strip_version_suffix(raw_id: &str) -> &str {
    raw_id.split('.').next().unwrap_or(raw_id)
}

/// Regular expression for versioned ENSEMBL gene identifiers.
static ENSEMBL_GENE_WITH_VERSION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(?i)(ENS[A-Z]*G\d+)\.\d+$").expect("invalid regular expression")
});

/// Strip the version from an ENSEMBL gene identifier such as `ENSG00000141510.18`.
///
/// Other identifiers are returned unchanged so that symbols like `AC000003.1` are kept.
pub fn strip_ensembl_gene_version(gene_id: &str) -> &str {
    ENSEMBL_GENE_WITH_VERSION
        .captures(gene_id)
        .and_then(|caps| caps.get(1))
        .map_or(gene_id, |m| m.as_str())
}

/// Regular expression for ENSEMBL gene identifiers with optional version.
static ENSEMBL_GENE_ID: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(?i)ENS[A-Z]*G\d+(\.\d+)?$").expect("invalid regular expression")
});

/// Whether `token` looks like an ENSEMBL gene identifier, e.g., `ENSMUSG00000059552.2`.
pub fn is_ensembl_gene_id(token: &str) -> bool {
    ENSEMBL_GENE_ID.is_match(token)
}

/// Clean a raw token from a user-provided gene list.
///
/// Surrounding whitespace is removed and empty values as well as the `none` and `nan`
/// sentinels (in any casing) yield `None`.
pub fn clean_token(raw: &str) -> Option<&str> {
    let token = raw.trim();
    if token.is_empty()
        || token.eq_ignore_ascii_case("none")
        || token.eq_ignore_ascii_case("nan")
    {
        None
    } else {
        Some(token)
    }
}

/// Find the index of the first column in `header` matching one of `candidates`.
///
/// Matching is case-insensitive and columns are considered in the order of the header.
/// The candidate list `candidates` is expected to be in lower case.
pub fn find_column<S: AsRef<str>>(
    header: &[S],
    candidates: &[&str],
    what: &str,
) -> Result<usize, ConfigError> {
    header
        .iter()
        .position(|column| {
            let column = column.as_ref().to_lowercase();
            candidates.iter().any(|candidate| candidate.to_lowercase() == column)
        })
        .ok_or_else(|| ConfigError::ColumnNotFound {
            what: what.to_string(),
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            available: header.iter().map(|s| s.as_ref().to_string()).collect(),
        })
}
