//! Manual corrections for transcripts that cannot be resolved through the annotation.

use std::{collections::HashMap, io::BufRead, path::Path};

use serde::Deserialize;

use crate::common::io::open_read_maybe_gz;

/// Built-in corrections, transcript ID to gene name.
const BUILTIN_OVERRIDES_TSV: &str = include_str!("../../data/tx_overrides.tsv");

/// One row of an override TSV file.
#[derive(Debug, Deserialize)]
struct Record {
    /// Transcript identifier, with or without version.
    identifier: String,
    /// Gene name to assign.
    gene_name: String,
}

/// Parse override records from a TSV reader.
fn parse_tsv<R: BufRead>(reader: R) -> Result<HashMap<String, String>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(reader);
    let mut result = HashMap::new();
    for record in reader.deserialize() {
        let record: Record = record?;
        result.insert(
            record.identifier.trim().to_string(),
            record.gene_name.trim().to_string(),
        );
    }
    Ok(result)
}

/// Manual transcript to gene name corrections.
///
/// The primary table is consulted first, the fallback table only after the annotation
/// lookup failed.  By default both hold the built-in corrections.
#[derive(Debug, Default, Clone)]
pub struct ManualOverrides {
    /// Corrections consulted before the annotation lookup.
    primary: HashMap<String, String>,
    /// Corrections consulted after the annotation lookup failed.
    fallback: HashMap<String, String>,
}

impl ManualOverrides {
    /// Construct with the built-in corrections as primary and fallback table.
    pub fn builtin() -> Result<Self, anyhow::Error> {
        let builtin = parse_tsv(BUILTIN_OVERRIDES_TSV.as_bytes())?;
        Ok(Self {
            primary: builtin.clone(),
            fallback: builtin,
        })
    }

    /// Construct from explicit tables.
    pub fn new(primary: HashMap<String, String>, fallback: HashMap<String, String>) -> Self {
        Self { primary, fallback }
    }

    /// Add corrections from a TSV file with `identifier` and `gene_name` columns to the
    /// primary table.
    pub fn extend_from_tsv(&mut self, path: &Path) -> Result<(), anyhow::Error> {
        tracing::debug!("loading transcript overrides from {:?}", path);
        let records = parse_tsv(open_read_maybe_gz(path)?)
            .map_err(|e| anyhow::anyhow!("problem loading overrides from {:?}: {}", path, e))?;
        self.primary.extend(records);
        Ok(())
    }

    /// Drop the built-in corrections from the primary table, keeping them as fallback.
    pub fn clear_primary(&mut self) {
        self.primary.clear();
    }

    /// Look up in the primary table.
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.primary.get(identifier).map(String::as_str)
    }

    /// Look up in the fallback table.
    pub fn get_fallback(&self, identifier: &str) -> Option<&str> {
        self.fallback.get(identifier).map(String::as_str)
    }

    /// Number of primary corrections.
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// Whether there are no primary corrections.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}
