//! Loading of user-supplied category sets.

use std::{path::Path, time::Instant};

use indexmap::IndexMap;
use thousands::Separable;

use crate::{
    common::{find_column, io::inner_extension, io::open_read_maybe_gz},
    expr::input::FileFormat,
};

/// Category name to raw gene identifiers or symbols, in file order.
pub type CategorySets = IndexMap<String, Vec<String>>;

/// Candidates for the category column of set TSV files.
pub const CATEGORY_COLUMNS: &[&str] = &["category", "gene_set", "set"];

/// Candidates for the gene column of set TSV files.
pub const GENE_COLUMNS: &[&str] = &["gene", "gene_id", "gene_name", "symbol"];

/// Parse category sets from a JSON object mapping category names to lists of strings.
///
/// `null` list entries are dropped.
pub fn read_category_sets_json<R: std::io::Read>(reader: R) -> Result<CategorySets, anyhow::Error> {
    let raw: IndexMap<String, Vec<Option<String>>> = serde_json::from_reader(reader)?;
    Ok(raw
        .into_iter()
        .map(|(category, genes)| (category, genes.into_iter().flatten().collect()))
        .collect())
}

/// Parse category sets from a table with a category and a gene column, one gene per line.
pub fn read_category_sets_table<R: std::io::Read>(
    reader: R,
    delimiter: u8,
) -> Result<CategorySets, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(reader);
    let header = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let category_column = find_column(&header, CATEGORY_COLUMNS, "category")?;
    let gene_column = find_column(&header, GENE_COLUMNS, "gene")?;

    let mut result = CategorySets::new();
    for record in reader.records() {
        let record = record?;
        let category = record.get(category_column).unwrap_or_default().trim();
        let gene = record.get(gene_column).unwrap_or_default();
        if category.is_empty() {
            tracing::debug!("skipping gene {:?} without category", gene);
            continue;
        }
        result
            .entry(category.to_string())
            .or_default()
            .push(gene.to_string());
    }
    Ok(result)
}

/// Load category sets from a `.json` file or a CSV/TSV table, optionally gzip-compressed.
#[tracing::instrument]
pub fn load_category_sets(path: &Path) -> Result<CategorySets, anyhow::Error> {
    tracing::info!("Loading category sets from {:?}...", path);
    let before_loading = Instant::now();
    let reader = open_read_maybe_gz(path)?;
    let result = if inner_extension(path).as_deref() == Some("json") {
        read_category_sets_json(reader)
    } else {
        read_category_sets_table(reader, FileFormat::from_path(path)?.delimiter())
    }
    .map_err(|e| anyhow::anyhow!("problem loading category sets from {:?}: {}", path, e))?;
    tracing::info!(
        "... done loading {} categories with {} entries in {:?}",
        result.len(),
        result
            .values()
            .map(Vec::len)
            .sum::<usize>()
            .separate_with_commas(),
        before_loading.elapsed()
    );
    Ok(result)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::CategorySets;

    fn sets(pairs: &[(&str, &[&str])]) -> CategorySets {
        pairs
            .iter()
            .map(|(category, genes)| {
                (
                    category.to_string(),
                    genes.iter().map(|g| g.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn load_json() -> Result<(), anyhow::Error> {
        let result =
            super::load_category_sets(std::path::Path::new("tests/categories/sets.json"))?;

        assert_eq!(
            result,
            sets(&[
                ("Checkpoints", &["PD-L1", " TP53 ", "nan", "NOTAGENE"]),
                ("Growth", &["FOO", "p53"]),
                ("Empty", &[]),
            ])
        );

        Ok(())
    }

    #[test]
    fn load_tsv() -> Result<(), anyhow::Error> {
        let result = super::load_category_sets(std::path::Path::new("tests/categories/sets.tsv"))?;

        assert_eq!(
            result,
            sets(&[("Checkpoints", &["CD274", "TP53"]), ("Growth", &["FOO", "none"])])
        );

        Ok(())
    }

    #[test]
    fn read_table_csv_with_other_header() -> Result<(), anyhow::Error> {
        let data = "Symbol,Gene_Set\nFOO,b\nBAR,a\n,a\nBAZ,\n";
        let result = super::read_category_sets_table(data.as_bytes(), b',')?;

        assert_eq!(result, sets(&[("b", &["FOO"]), ("a", &["BAR", ""])]));

        Ok(())
    }

    #[test]
    fn read_json_keeps_category_order() -> Result<(), anyhow::Error> {
        let data = r#"{"Zeta": ["FOO"], "Alpha": ["TP53"], "Mu": []}"#;
        let result = super::read_category_sets_json(data.as_bytes())?;

        assert_eq!(
            result.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Zeta", "Alpha", "Mu"]
        );

        Ok(())
    }

    #[test]
    fn read_json_rejects_non_object() {
        assert!(super::read_category_sets_json("[\"FOO\"]".as_bytes()).is_err());
    }
}
