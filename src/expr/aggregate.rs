//! Aggregation of transcript-level expression to gene-level expression.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    annos::resolver::{IdentityResolver, ResolverSession},
    common::strip_version_suffix,
    expr::{input::ExpressionRow, overrides::ManualOverrides},
};

/// Unknown rows above this abundance are reported individually.
pub const UNKNOWN_REPORT_THRESHOLD: f64 = 1.0;

/// Sentinel release for genes without annotation metadata.
pub const MISSING_RELEASE: i64 = -1;

/// Options for `aggregate`.
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Retry identifiers that are no known transcript as gene identifiers.
    pub gene_id_fallback: bool,
}

/// One row of the gene-level expression table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AggregatedGeneRow {
    /// Gene name.
    pub gene: String,
    /// Summed abundance.
    #[serde(rename = "TPM")]
    pub tpm: f64,
    /// Canonical gene identifier, if the name could be resolved.
    pub gene_id: Option<String>,
    /// Release `gene_id` was resolved from, `MISSING_RELEASE` if unresolved.
    pub ensembl_release: i64,
}

/// Statistics on how much of the abundance could be assigned to genes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageStats {
    /// Abundance assigned to known genes.
    pub known_tpm: f64,
    /// Abundance of rows that could not be resolved.
    pub unknown_tpm: f64,
    /// Number of input rows.
    pub num_rows: usize,
    /// Number of rows that could not be resolved.
    pub num_unknown_rows: usize,
    /// Number of unknown rows above `UNKNOWN_REPORT_THRESHOLD`.
    pub num_unknown_reported: usize,
}

impl CoverageStats {
    /// Percentage of the total abundance assigned to known genes, 0 for no abundance.
    pub fn percent_known(&self) -> f64 {
        let total = self.known_tpm + self.unknown_tpm;
        if total > 0.0 {
            self.known_tpm * 100.0 / total
        } else {
            0.0
        }
    }
}

/// Result of `aggregate`.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Gene rows, sorted ascending by abundance.
    pub rows: Vec<AggregatedGeneRow>,
    /// Coverage statistics.
    pub stats: CoverageStats,
}

/// Determine the gene name for one raw input identifier.
///
/// The first successful of the following wins: the raw identifier in the primary
/// overrides, the identifier without version in the primary overrides, the annotation
/// lookup by transcript ID (and by gene ID if enabled), and the fallback overrides.
fn resolve_gene_name(
    raw_id: &str,
    overrides: &ManualOverrides,
    session: &mut ResolverSession,
    options: &AggregateOptions,
) -> Option<String> {
    if let Some(gene_name) = overrides.get(raw_id) {
        return Some(gene_name.to_string());
    }
    let stripped_id = strip_version_suffix(raw_id);
    if let Some(gene_name) = overrides.get(stripped_id) {
        return Some(gene_name.to_string());
    }
    let gene = session.resolve_by_transcript_id(stripped_id).or_else(|| {
        if options.gene_id_fallback {
            session.resolve_by_gene_id(stripped_id)
        } else {
            None
        }
    });
    if let Some(gene) = gene {
        return Some(gene.gene_name);
    }
    overrides.get_fallback(stripped_id).map(str::to_string)
}

/// Sum up abundance per gene.
///
/// Rows are grouped by resolved gene name.  Every gene is then annotated with the
/// canonical identifier and release of its name.
pub fn aggregate(
    rows: &[ExpressionRow],
    overrides: &ManualOverrides,
    resolver: &IdentityResolver,
    options: &AggregateOptions,
) -> Aggregation {
    let mut session = resolver.session();
    let mut stats = CoverageStats {
        num_rows: rows.len(),
        ..Default::default()
    };

    let mut tpm_by_gene: IndexMap<String, f64> = IndexMap::new();
    for row in rows {
        match resolve_gene_name(&row.target_id, overrides, &mut session, options) {
            Some(gene_name) => {
                *tpm_by_gene.entry(gene_name).or_default() += row.tpm;
            }
            None => {
                stats.num_unknown_rows += 1;
                stats.unknown_tpm += row.tpm;
                if row.tpm > UNKNOWN_REPORT_THRESHOLD {
                    stats.num_unknown_reported += 1;
                    tracing::warn!(
                        "unknown #{}: {} with {} TPM",
                        stats.num_unknown_reported,
                        &row.target_id,
                        row.tpm
                    );
                }
            }
        }
    }
    stats.known_tpm = tpm_by_gene.values().sum();

    tracing::info!(
        "Assigned {:.2} TPM to known genes, {:.2} to unknown gene names; {:.4}% known",
        stats.known_tpm,
        stats.unknown_tpm,
        stats.percent_known()
    );

    let mut result = tpm_by_gene
        .into_iter()
        .map(|(gene, tpm)| {
            let canonical = session.resolve_by_name(&gene);
            AggregatedGeneRow {
                gene,
                tpm,
                gene_id: canonical.as_ref().map(|c| c.gene_id.clone()),
                ensembl_release: canonical.map_or(MISSING_RELEASE, |c| c.release as i64),
            }
        })
        .collect::<Vec<_>>();
    result.sort_by(|lhs, rhs| lhs.tpm.total_cmp(&rhs.tpm));

    tracing::debug!(
        "{} distinct lookups, {} answered from cache",
        session.num_cached(),
        session.num_hits()
    );

    Aggregation {
        rows: result,
        stats,
    }
}
