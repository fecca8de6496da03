//! Mapping between ENSEMBL gene symbols and names commonly used in the literature.

use std::{collections::HashMap, io::BufRead, path::Path};

use serde::Deserialize;

use crate::common::io::open_read_maybe_gz;

/// Built-in alias table, e.g., `CD274` is better known as `PD-L1`.
const BUILTIN_ALIASES_TSV: &str = include_str!("../../data/aliases.tsv");

/// One row of an alias TSV file.
#[derive(Debug, Deserialize)]
struct Record {
    /// The ENSEMBL gene symbol.
    symbol: String,
    /// The name used in the literature.
    display_name: String,
}

/// Bidirectional, one-to-one mapping of gene symbols to display names.
#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    /// Symbol to display name.
    forward: HashMap<String, String>,
    /// Display name to symbol.
    reverse: HashMap<String, String>,
}

impl AliasTable {
    /// Construct with the built-in aliases.
    pub fn builtin() -> Result<Self, anyhow::Error> {
        let mut result = Self::default();
        result.extend_from_reader(BUILTIN_ALIASES_TSV.as_bytes())?;
        Ok(result)
    }

    /// Construct from explicit `(symbol, display_name)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut result = Self::default();
        for (symbol, display_name) in pairs {
            result.insert(symbol, display_name);
        }
        result
    }

    /// Register an alias, replacing any previous mapping of either side.
    pub fn insert(&mut self, symbol: &str, display_name: &str) {
        if let Some(old_display_name) = self.forward.remove(symbol) {
            self.reverse.remove(&old_display_name);
        }
        if let Some(old_symbol) = self.reverse.remove(display_name) {
            self.forward.remove(&old_symbol);
        }
        self.forward
            .insert(symbol.to_string(), display_name.to_string());
        self.reverse
            .insert(display_name.to_string(), symbol.to_string());
    }

    /// Add the aliases from a TSV file with `symbol` and `display_name` columns.
    pub fn extend_from_tsv(&mut self, path: &Path) -> Result<(), anyhow::Error> {
        tracing::debug!("loading aliases from {:?}", path);
        self.extend_from_reader(open_read_maybe_gz(path)?)
            .map_err(|e| anyhow::anyhow!("problem loading aliases from {:?}: {}", path, e))
    }

    fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> Result<(), anyhow::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .from_reader(reader);
        for record in reader.deserialize() {
            let record: Record = record?;
            self.insert(record.symbol.trim(), record.display_name.trim());
        }
        Ok(())
    }

    /// The literature name for an ENSEMBL symbol, if any.
    pub fn alias(&self, symbol: &str) -> Option<&str> {
        self.forward.get(symbol).map(String::as_str)
    }

    /// The ENSEMBL symbol for a literature name, if any.
    pub fn reverse_alias(&self, display_name: &str) -> Option<&str> {
        self.reverse.get(display_name).map(String::as_str)
    }

    /// Rewrite a symbol to its display name, falling back to the symbol itself.
    pub fn display_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.alias(symbol).unwrap_or(symbol)
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::AliasTable;

    #[test]
    fn builtin() -> Result<(), anyhow::Error> {
        let aliases = AliasTable::builtin()?;

        assert_eq!(aliases.len(), 34);
        assert_eq!(aliases.alias("CD274"), Some("PD-L1"));
        assert_eq!(aliases.reverse_alias("PD-L1"), Some("CD274"));
        assert_eq!(aliases.display_name("TP53"), "p53");
        assert_eq!(aliases.display_name("BRCA1"), "BRCA1");

        Ok(())
    }

    #[test]
    fn insert_keeps_one_to_one() {
        let mut aliases = AliasTable::from_pairs([("CD274", "PD-L1")]);
        aliases.insert("CD274", "B7-H1");

        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.alias("CD274"), Some("B7-H1"));
        assert_eq!(aliases.reverse_alias("PD-L1"), None);

        aliases.insert("PDCD1LG1", "B7-H1");
        assert_eq!(aliases.alias("CD274"), None);
        assert_eq!(aliases.reverse_alias("B7-H1"), Some("PDCD1LG1"));
    }

    #[test]
    fn extend_from_tsv() -> Result<(), anyhow::Error> {
        let mut aliases = AliasTable::default();
        aliases.extend_from_tsv(std::path::Path::new("tests/annos/aliases.tsv"))?;

        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.alias("DUP"), Some("Duplo"));
        assert_eq!(aliases.reverse_alias("Foo-1"), Some("FOO"));

        Ok(())
    }
}
