//! Normalization of category sets to canonical gene identifiers.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    annos::resolver::ResolverSession,
    categories::sets::CategorySets,
    common::{clean_token, strip_ensembl_gene_version},
    err::ConfigError,
};

/// Category sets after resolution of their tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedCategories {
    /// Category to canonical gene identifiers, categories in input order.
    pub members: IndexMap<String, BTreeSet<String>>,
    /// Canonical gene identifier to the gene name found while resolving.
    pub gene_names: HashMap<String, String>,
    /// Category to tokens that could not be resolved, only non-empty entries.
    pub unresolved: IndexMap<String, Vec<String>>,
}

impl NormalizedCategories {
    /// Categories of each gene identifier, each list in category order.
    pub fn categories_by_gene(&self) -> HashMap<&str, Vec<&str>> {
        let mut result: HashMap<&str, Vec<&str>> = HashMap::new();
        for (category, gene_ids) in &self.members {
            for gene_id in gene_ids {
                result
                    .entry(gene_id.as_str())
                    .or_default()
                    .push(category.as_str());
            }
        }
        result
    }

    /// Remove genes of `priority` from all other categories.
    ///
    /// Nothing happens if there is no category `priority`.
    pub fn apply_priority(&mut self, priority: &str) {
        let Some(prio_ids) = self.members.get(priority).cloned() else {
            tracing::warn!("priority category {:?} not among category sets", priority);
            return;
        };
        for (category, gene_ids) in self.members.iter_mut() {
            if category != priority {
                let before = gene_ids.len();
                gene_ids.retain(|gene_id| !prio_ids.contains(gene_id));
                if gene_ids.len() != before {
                    tracing::debug!(
                        "removed {} genes of {:?} from {:?}",
                        before - gene_ids.len(),
                        priority,
                        category
                    );
                }
            }
        }
    }

    /// Human-readable list of unresolved tokens, one line per category.
    pub fn unresolved_details(&self) -> String {
        self.unresolved
            .iter()
            .map(|(category, tokens)| format!("{}: {}", category, tokens.join(", ")))
            .join("\n")
    }
}

/// Resolve the tokens of all category sets by gene name or ENSEMBL gene ID.
///
/// Tokens are cleaned with `clean_token`, resolved identifiers lose any ENSEMBL version.
/// Unresolved tokens are reported per category, or yield an error if `strict`.
pub fn normalize_category_sets(
    sets: &CategorySets,
    session: &mut ResolverSession,
    strict: bool,
) -> Result<NormalizedCategories, ConfigError> {
    let mut result = NormalizedCategories::default();

    for (category, genes) in sets {
        let tokens = genes
            .iter()
            .filter_map(|gene| clean_token(gene))
            .collect::<Vec<_>>();
        let resolved = session.resolve_names(&tokens);
        if resolved.len() != tokens.len() {
            return Err(ConfigError::LengthMismatch {
                expected: tokens.len(),
                actual: resolved.len(),
            });
        }

        let mut gene_ids = BTreeSet::new();
        for (token, resolved) in tokens.iter().zip(resolved) {
            match resolved {
                (Some(gene_id), Some(gene_name)) => {
                    let gene_id = strip_ensembl_gene_version(&gene_id).to_string();
                    result.gene_names.insert(gene_id.clone(), gene_name);
                    gene_ids.insert(gene_id);
                }
                _ => result
                    .unresolved
                    .entry(category.clone())
                    .or_default()
                    .push(token.to_string()),
            }
        }
        result.members.insert(category.clone(), gene_ids);
    }

    if !result.unresolved.is_empty() {
        if strict {
            return Err(ConfigError::UnresolvedGeneSets {
                details: result.unresolved_details(),
            });
        }
        for (category, tokens) in &result.unresolved {
            tracing::warn!(
                "unresolved in category {}: {}",
                category,
                tokens.join(", ")
            );
        }
    }

    tracing::info!("Categories: {:?}", result.members.keys().collect::<Vec<_>>());
    Ok(result)
}

/// Report category genes that are missing from the expression table.
///
/// Returns the number of missing (category, gene) pairs.
pub fn check_gene_ids(normalized: &NormalizedCategories, expressed_ids: &HashSet<&str>) -> usize {
    let mut num_missing = 0;
    for (category, gene_ids) in &normalized.members {
        for gene_id in gene_ids {
            if expressed_ids.contains(gene_id.as_str()) {
                continue;
            }
            num_missing += 1;
            match normalized.gene_names.get(gene_id) {
                Some(gene_name) => tracing::warn!(
                    "gene ID {} ({}) (category={:?}) not found in expression table",
                    gene_id,
                    gene_name,
                    category
                ),
                None => tracing::warn!(
                    "gene ID {} (category={:?}) not found in expression table",
                    gene_id,
                    category
                ),
            }
        }
    }
    num_missing
}
