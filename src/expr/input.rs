//! Loading of transcript- or gene-level expression tables.

use std::{io::Read, path::Path, time::Instant};

use thousands::Separable;

use crate::{
    common::{find_column, io::inner_extension, io::open_read_maybe_gz},
    err::ConfigError,
};

/// Default candidates for the transcript identifier column, lower case.
pub const DEFAULT_TRANSCRIPT_COLUMNS: &[&str] = &[
    "transcript",
    "transcript_id",
    "transcriptid",
    "target",
    "target_id",
    "targetid",
    "name",
];

/// Default candidates for the abundance column, lower case.
pub const DEFAULT_TPM_COLUMNS: &[&str] = &["tpm"];

/// Supported tabular file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum FileFormat {
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    Tsv,
}

impl FileFormat {
    /// Guess format from the file extension, ignoring a trailing `.gz`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match inner_extension(path).as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("tsv") | Some("txt") | Some("sf") => Ok(FileFormat::Tsv),
            _ => Err(ConfigError::UnrecognizedFileFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// The field delimiter.
    pub fn delimiter(&self) -> u8 {
        match self {
            FileFormat::Csv => b',',
            FileFormat::Tsv => b'\t',
        }
    }
}

/// One input row: an identifier and its abundance.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionRow {
    /// Transcript or gene identifier as found in the input, possibly with version.
    pub target_id: String,
    /// Abundance in transcripts per million.
    pub tpm: f64,
}

impl ExpressionRow {
    pub fn new(target_id: &str, tpm: f64) -> Self {
        Self {
            target_id: target_id.to_string(),
            tpm,
        }
    }
}

/// Read expression rows from `reader`.
///
/// The identifier and abundance columns are the first columns matching one of the
/// respective candidates.
pub fn read_expression_rows<R: Read>(
    reader: R,
    delimiter: u8,
    id_candidates: &[&str],
    tpm_candidates: &[&str],
) -> Result<Vec<ExpressionRow>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(reader);
    let header = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let id_column = find_column(&header, id_candidates, "transcript ID")?;
    let tpm_column = find_column(&header, tpm_candidates, "TPM")?;
    tracing::debug!(
        "using columns {:?} (ID) and {:?} (TPM)",
        &header[id_column],
        &header[tpm_column]
    );

    let mut result = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let target_id = record.get(id_column).unwrap_or_default().trim();
        let raw_tpm = record.get(tpm_column).unwrap_or_default().trim();
        let tpm: f64 = raw_tpm.parse().map_err(|e| {
            anyhow::anyhow!(
                "invalid TPM value {:?} in data line {}: {}",
                raw_tpm,
                i + 1,
                e
            )
        })?;
        if !tpm.is_finite() || tpm < 0.0 {
            anyhow::bail!("invalid TPM value {:?} in data line {}", raw_tpm, i + 1);
        }
        result.push(ExpressionRow::new(target_id, tpm));
    }

    Ok(result)
}

/// Load expression rows from a CSV or TSV file, optionally gzip-compressed.
#[tracing::instrument(skip(id_candidates, tpm_candidates))]
pub fn load_expression_rows(
    path: &Path,
    id_candidates: &[&str],
    tpm_candidates: &[&str],
) -> Result<Vec<ExpressionRow>, anyhow::Error> {
    tracing::info!("Loading expression data from {:?}...", path);
    let before_loading = Instant::now();
    let format = FileFormat::from_path(path)?;
    let result = read_expression_rows(
        open_read_maybe_gz(path)?,
        format.delimiter(),
        id_candidates,
        tpm_candidates,
    )
    .map_err(|e| anyhow::anyhow!("problem reading {:?}: {}", path, e))?;
    tracing::info!(
        "... done loading {} rows in {:?}",
        result.len().separate_with_commas(),
        before_loading.elapsed()
    );
    Ok(result)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::err::ConfigError;

    use super::{ExpressionRow, FileFormat, DEFAULT_TPM_COLUMNS, DEFAULT_TRANSCRIPT_COLUMNS};

    #[rstest]
    #[case("expr.csv", Some(FileFormat::Csv))]
    #[case("expr.tsv.gz", Some(FileFormat::Tsv))]
    #[case("quant.sf", Some(FileFormat::Tsv))]
    #[case("expr.xlsx", None)]
    fn file_format_from_path(#[case] path: &str, #[case] expected: Option<FileFormat>) {
        assert_eq!(
            FileFormat::from_path(std::path::Path::new(path)).ok(),
            expected
        );
    }

    #[test]
    fn read_salmon_style() -> Result<(), anyhow::Error> {
        let data = "Name\tLength\tEffectiveLength\tTPM\tNumReads\n\
                    ENST01.1\t1000\t800\t5.0\t10\n\
                    ENSTXX\t500\t300\t10\t3\n";
        let rows = super::read_expression_rows(
            data.as_bytes(),
            b'\t',
            DEFAULT_TRANSCRIPT_COLUMNS,
            DEFAULT_TPM_COLUMNS,
        )?;

        assert_eq!(
            rows,
            vec![
                ExpressionRow::new("ENST01.1", 5.0),
                ExpressionRow::new("ENSTXX", 10.0)
            ]
        );

        Ok(())
    }

    #[test]
    fn read_missing_column() {
        let data = "gene,count\nFOO,1\n";
        let err = super::read_expression_rows(
            data.as_bytes(),
            b',',
            DEFAULT_TRANSCRIPT_COLUMNS,
            DEFAULT_TPM_COLUMNS,
        )
        .unwrap_err();

        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::ColumnNotFound {
                what: String::from("transcript ID"),
                candidates: DEFAULT_TRANSCRIPT_COLUMNS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                available: vec![String::from("gene"), String::from("count")],
            })
        );
    }

    #[rstest]
    #[case("abc")]
    #[case("-1.0")]
    #[case("NaN")]
    fn read_invalid_tpm(#[case] tpm: &str) {
        let data = format!("target_id,tpm\nENST01,{}\n", tpm);
        assert!(super::read_expression_rows(
            data.as_bytes(),
            b',',
            DEFAULT_TRANSCRIPT_COLUMNS,
            DEFAULT_TPM_COLUMNS,
        )
        .is_err());
    }

    #[test]
    fn load_csv() -> Result<(), anyhow::Error> {
        let rows = super::load_expression_rows(
            std::path::Path::new("tests/expr/transcripts.csv"),
            DEFAULT_TRANSCRIPT_COLUMNS,
            DEFAULT_TPM_COLUMNS,
        )?;

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], ExpressionRow::new("ENST00000000001.1", 5.0));

        Ok(())
    }
}
