//! Construction of the long-format table of expression per gene and category.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    annos::resolver::IdentityResolver,
    categories::{
        normalize::{check_gene_ids, normalize_category_sets},
        sets::CategorySets,
    },
    common::strip_ensembl_gene_version,
    err::ConfigError,
    expr::aggregate::AggregatedGeneRow,
};

/// Default offset added to the abundance before the log transform.
pub const DEFAULT_TPM_OFFSET: f64 = 0.01;

/// Pseudo count in `log_TPM = log10(LOG_PSEUDO_COUNT + TPM)`.
pub const LOG_PSEUDO_COUNT: f64 = 1e-4;

/// Default name of the category for genes in no category set.
pub const DEFAULT_OTHER_CATEGORY: &str = "uncategorized";

/// Minimal abundance of genes picked for labeling.
pub const LABEL_MIN_TPM: f64 = 0.1;

/// Options for `partition`.
#[derive(Debug, Clone)]
pub struct PartitionOptions {
    /// Category whose membership suppresses membership in all others.
    pub priority_category: Option<String>,
    /// Offset added to the abundance.
    pub tpm_offset: f64,
    /// Name of the fallback category.
    pub other_category_name: String,
    /// Whether the fallback category is ordered before the category sets.
    pub place_other_first: bool,
    /// Fail on unresolvable category set entries.
    pub strict: bool,
    /// Strip versions from ENSEMBL gene identifiers of the expression table.
    pub strip_version: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            priority_category: None,
            tpm_offset: DEFAULT_TPM_OFFSET,
            other_category_name: DEFAULT_OTHER_CATEGORY.to_string(),
            place_other_first: true,
            strict: false,
            strip_version: true,
        }
    }
}

/// One row of the long-format table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnnotatedExpressionRow {
    /// Canonical gene identifier, the gene name for unresolved genes.
    pub gene_id: String,
    /// Category label.
    pub category: String,
    /// Abundance plus offset.
    #[serde(rename = "TPM")]
    pub tpm: f64,
    /// `log10(1e-4 + TPM)`.
    #[serde(rename = "log_TPM")]
    pub log_tpm: f64,
    /// Name to display.
    pub gene_display_name: String,
}

/// Result of `partition`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitioned {
    /// Category labels in display order, including the fallback category.
    pub category_order: Vec<String>,
    /// One row per gene and category, in order of the expression table.
    pub rows: Vec<AnnotatedExpressionRow>,
}

/// The identifier of an aggregated row, falling back to its gene name.
fn row_gene_id(row: &AggregatedGeneRow, strip_version: bool) -> String {
    match row.gene_id.as_deref().filter(|gene_id| !gene_id.is_empty()) {
        Some(gene_id) if strip_version => strip_ensembl_gene_version(gene_id).to_string(),
        Some(gene_id) => gene_id.to_string(),
        None => row.gene.clone(),
    }
}

/// Distribute the aggregated rows over the categories.
///
/// Genes in `k` categories yield `k` rows, genes in no category yield one row in the
/// fallback category.  Display names come from the gene name of the row or the name
/// found for the category set entry, rewritten to the literature alias, else the
/// identifier.  The `tpm_offset` must be finite and non-negative.
pub fn partition(
    rows: &[AggregatedGeneRow],
    sets: &CategorySets,
    options: &PartitionOptions,
    resolver: &IdentityResolver,
) -> Result<Partitioned, ConfigError> {
    if !(options.tpm_offset.is_finite() && options.tpm_offset >= 0.0) {
        return Err(ConfigError::InvalidTpmOffset {
            offset: options.tpm_offset.to_string(),
        });
    }

    let mut session = resolver.session();
    let mut normalized = normalize_category_sets(sets, &mut session, options.strict)?;
    if let Some(priority) = options.priority_category.as_deref() {
        normalized.apply_priority(priority);
    }

    let gene_ids = rows
        .iter()
        .map(|row| row_gene_id(row, options.strip_version))
        .collect::<Vec<_>>();
    let expressed_ids = gene_ids.iter().map(String::as_str).collect::<HashSet<_>>();
    let num_missing = check_gene_ids(&normalized, &expressed_ids);
    if num_missing > 0 {
        tracing::info!("{} category genes not in expression table", num_missing);
    }

    let names_from_rows = rows
        .iter()
        .zip(gene_ids.iter())
        .filter(|(row, _)| !row.gene.is_empty())
        .map(|(row, gene_id)| (gene_id.as_str(), row.gene.as_str()))
        .collect::<HashMap<_, _>>();
    let display_name = |gene_id: &str| -> String {
        names_from_rows
            .get(gene_id)
            .copied()
            .or_else(|| normalized.gene_names.get(gene_id).map(String::as_str))
            .map(|name| resolver.aliases().display_name(name))
            .unwrap_or(gene_id)
            .to_string()
    };

    let categories_by_gene = normalized.categories_by_gene();
    let other = options.other_category_name.as_str();
    let fallback = [other];
    let mut result = Vec::with_capacity(rows.len());
    for (row, gene_id) in rows.iter().zip(gene_ids.iter()) {
        let tpm = row.tpm + options.tpm_offset;
        let log_tpm = (LOG_PSEUDO_COUNT + tpm).log10();
        let gene_display_name = display_name(gene_id);
        let categories = categories_by_gene
            .get(gene_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&fallback);
        for category in categories {
            result.push(AnnotatedExpressionRow {
                gene_id: gene_id.clone(),
                category: category.to_string(),
                tpm,
                log_tpm,
                gene_display_name: gene_display_name.clone(),
            });
        }
    }

    let set_categories = normalized
        .members
        .keys()
        .filter(|category| category.as_str() != other)
        .cloned();
    let category_order = if options.place_other_first {
        std::iter::once(other.to_string())
            .chain(set_categories)
            .collect()
    } else {
        set_categories
            .chain(std::iter::once(other.to_string()))
            .collect()
    };

    tracing::debug!(
        "{} lookups during partitioning, {} from cache",
        session.num_cached(),
        session.num_hits()
    );

    Ok(Partitioned {
        category_order,
        rows: result,
    })
}

/// Pick rows whose genes should be labeled in a plot.
///
/// For every category but `other_category_name`, these are the top `num_per_category`
/// rows by abundance that have an abundance above `LABEL_MIN_TPM`.  The result follows
/// the category order, rows within one category by descending abundance.
pub fn pick_genes_to_label<'a>(
    partitioned: &'a Partitioned,
    other_category_name: &str,
    num_per_category: usize,
) -> Vec<&'a AnnotatedExpressionRow> {
    let mut result = Vec::new();
    for category in &partitioned.category_order {
        if category == other_category_name {
            continue;
        }
        let mut rows = partitioned
            .rows
            .iter()
            .filter(|row| &row.category == category && row.tpm > LABEL_MIN_TPM)
            .collect::<Vec<_>>();
        rows.sort_by(|lhs, rhs| rhs.tpm.total_cmp(&lhs.tpm));
        result.extend(rows.into_iter().take(num_per_category));
    }
    result
}
