//! Partitioning of gene expression by user-supplied gene categories.

pub mod normalize;
pub mod partition;
pub mod sets;

use std::{io::Write, path::Path, time::Instant};

use clap::Parser;
use serde::Serialize;
use thousands::Separable;

use crate::{
    annos::load_resolver,
    common::{io::open_write_maybe_gz, trace_rss_now},
    expr::load_aggregated,
};

use self::{
    partition::{
        partition, pick_genes_to_label, AnnotatedExpressionRow, PartitionOptions,
        DEFAULT_OTHER_CATEGORY, DEFAULT_TPM_OFFSET,
    },
    sets::load_category_sets,
};

/// Command line arguments for `expr partition` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Partition gene expression by categories", long_about = None)]
pub struct Args {
    /// Path to the annotation configuration TOML file.
    #[arg(long, required = true)]
    pub path_conf: String,
    /// Path to the aggregated gene expression TSV from `expr aggregate`.
    #[arg(long, required = true)]
    pub path_input: String,
    /// Path to the category sets, JSON object or TSV with category and gene column.
    #[arg(long, required = true)]
    pub path_gene_sets: String,
    /// Path to the output TSV file, gzip-compressed if ending in `.gz`.
    #[arg(long, required = true)]
    pub path_output: String,
    /// Category whose genes are removed from all other categories.
    #[arg(long)]
    pub priority_category: Option<String>,
    /// Name of the category for genes in no category set.
    #[arg(long, default_value = DEFAULT_OTHER_CATEGORY)]
    pub other_category_name: String,
    /// Order the fallback category after the category sets.
    #[arg(long, default_value_t = false)]
    pub other_last: bool,
    /// Offset added to the abundance before the log transform.
    #[arg(long, default_value_t = DEFAULT_TPM_OFFSET)]
    pub tpm_offset: f64,
    /// Fail if category set entries cannot be resolved.
    #[arg(long, default_value_t = false)]
    pub strict_gene_sets: bool,
    /// Keep versions of ENSEMBL gene identifiers in the expression table.
    #[arg(long, default_value_t = false)]
    pub keep_gene_id_version: bool,
    /// Optional path to write the genes to label per category to.
    #[arg(long)]
    pub path_labels_out: Option<String>,
    /// Number of genes to label per category.
    #[arg(long, default_value_t = 10)]
    pub labels_per_category: usize,
}

/// One line of the label output.
#[derive(Serialize, Debug)]
struct LabelRecord<'a> {
    category: &'a str,
    gene_id: &'a str,
    gene_display_name: &'a str,
    #[serde(rename = "TPM")]
    tpm: f64,
}

/// Write the long-format table as TSV.
pub fn write_annotated_tsv<W: Write>(
    writer: W,
    rows: &[AnnotatedExpressionRow],
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

/// Write the genes to label as TSV.
pub fn write_labels_tsv<W: Write>(
    writer: W,
    rows: &[&AnnotatedExpressionRow],
) -> Result<(), anyhow::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for row in rows {
        writer.serialize(LabelRecord {
            category: &row.category,
            gene_id: &row.gene_id,
            gene_display_name: &row.gene_display_name,
            tpm: row.tpm,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Main entry point for `expr partition` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let (_, resolver) = load_resolver(Path::new(&args.path_conf))?;
    let rows = load_aggregated(Path::new(&args.path_input))?;
    let sets = load_category_sets(Path::new(&args.path_gene_sets))?;
    trace_rss_now();

    let options = PartitionOptions {
        priority_category: args.priority_category.clone(),
        tpm_offset: args.tpm_offset,
        other_category_name: args.other_category_name.clone(),
        place_other_first: !args.other_last,
        strict: args.strict_gene_sets,
        strip_version: !args.keep_gene_id_version,
    };

    tracing::info!("Partitioning expression...");
    let before_partition = Instant::now();
    let partitioned = partition(&rows, &sets, &options, &resolver)?;
    tracing::info!(
        "... done partitioning {} genes into {} rows in {:?}",
        rows.len().separate_with_commas(),
        partitioned.rows.len().separate_with_commas(),
        before_partition.elapsed()
    );
    tracing::info!("category order: {:?}", &partitioned.category_order);

    let mut out = open_write_maybe_gz(&args.path_output)?;
    write_annotated_tsv(&mut out, &partitioned.rows)?;
    out.finish()?;

    if let Some(path_labels_out) = args.path_labels_out.as_ref() {
        let labels = pick_genes_to_label(
            &partitioned,
            &options.other_category_name,
            args.labels_per_category,
        );
        tracing::info!("writing {} genes to label", labels.len());
        let mut out = open_write_maybe_gz(path_labels_out)?;
        write_labels_tsv(&mut out, &labels)?;
        out.finish()?;
    }

    tracing::info!(
        "All of `expr partition` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::partition::AnnotatedExpressionRow;

    fn row(gene_id: &str, category: &str, tpm: f64) -> AnnotatedExpressionRow {
        AnnotatedExpressionRow {
            gene_id: gene_id.to_string(),
            category: category.to_string(),
            tpm,
            log_tpm: (1e-4 + tpm).log10(),
            gene_display_name: gene_id.to_lowercase(),
        }
    }

    #[test]
    fn write_labels_tsv() -> Result<(), anyhow::Error> {
        let rows = [row("ENSG01", "A", 10.0), row("ENSG02", "B", 0.5)];
        let mut buf = Vec::new();
        super::write_labels_tsv(&mut buf, &rows.iter().collect::<Vec<_>>())?;

        insta::assert_snapshot!(String::from_utf8(buf)?, @r###"
        category	gene_id	gene_display_name	TPM
        A	ENSG01	ensg01	10.0
        B	ENSG02	ensg02	0.5
        "###);

        Ok(())
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_output = tmp_dir.join("partitioned.tsv.gz");
        let path_labels_out = tmp_dir.join("labels.tsv");
        let args = super::Args {
            path_conf: String::from("tests/annos/conf.toml"),
            path_input: String::from("tests/categories/genes.tsv"),
            path_gene_sets: String::from("tests/categories/sets.json"),
            path_output: path_output.to_str().unwrap().to_string(),
            priority_category: Some(String::from("Checkpoints")),
            other_category_name: String::from("uncategorized"),
            other_last: false,
            tpm_offset: 0.0,
            strict_gene_sets: false,
            keep_gene_id_version: false,
            path_labels_out: Some(path_labels_out.to_str().unwrap().to_string()),
            labels_per_category: 1,
        };
        super::run(&crate::common::Args::default(), &args)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(crate::common::io::open_read_maybe_gz(&path_output)?);
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<AnnotatedExpressionRow>, _>>()?;
        assert_eq!(
            rows.iter()
                .map(|row| (
                    row.gene_id.as_str(),
                    row.category.as_str(),
                    row.gene_display_name.as_str()
                ))
                .collect::<Vec<_>>(),
            vec![
                ("MYSTERY", "uncategorized", "MYSTERY"),
                ("ENSG00000000004", "uncategorized", "OLD"),
                ("ENSG00000000005", "Checkpoints", "PD-L1"),
                ("ENSG00000000001", "Growth", "Foo-1"),
                ("ENSG00000000006", "Checkpoints", "p53"),
            ]
        );

        assert_eq!(
            std::fs::read_to_string(&path_labels_out)?,
            "category\tgene_id\tgene_display_name\tTPM\n\
             Checkpoints\tENSG00000000006\tp53\t10.0\n\
             Growth\tENSG00000000001\tFoo-1\t10.0\n"
        );

        Ok(())
    }
}
