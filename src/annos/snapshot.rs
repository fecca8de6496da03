//! Versioned genome annotation snapshots.

use std::{collections::HashMap, path::Path, time::Instant};

use thousands::Separable;

use crate::common::{io::open_read_maybe_gz, strip_version_suffix};

/// Biotype value marking protein-coding genes and transcripts.
pub const PROTEIN_CODING: &str = "protein_coding";

/// A gene entry of one annotation release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gene {
    /// Stable gene identifier without version, e.g., `ENSG00000141510`.
    pub gene_id: String,
    /// Gene symbol, e.g., `TP53`.
    pub gene_name: String,
    /// Gene biotype, e.g., `protein_coding`.
    pub biotype: String,
    /// Identifiers of the transcripts of the gene.
    pub transcript_ids: Vec<String>,
    /// Number of protein-coding transcripts of the gene.
    pub num_protein_coding_transcripts: usize,
}

impl Gene {
    /// Whether the gene itself is protein-coding.
    pub fn is_protein_coding(&self) -> bool {
        self.biotype == PROTEIN_CODING
    }
}

/// A transcript entry of one annotation release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Transcript identifier without version, e.g., `ENST00000269305`.
    pub transcript_id: String,
    /// Transcript biotype.
    pub biotype: String,
    /// Identifier of the owning gene.
    pub gene_id: String,
}

/// Read-only query interface of one annotation release.
///
/// Lookups never fail, an identifier or name that is not part of the release yields
/// `None` or an empty result.
pub trait AnnotationSnapshot: std::fmt::Debug + Send + Sync {
    /// The release number, larger is newer.
    fn release(&self) -> u32;
    /// The species of the annotation, e.g., `homo_sapiens`.
    fn species(&self) -> &str;
    /// Look up a gene by its identifier.
    fn gene_by_id(&self, gene_id: &str) -> Option<&Gene>;
    /// Look up a transcript by its identifier.
    fn transcript_by_id(&self, transcript_id: &str) -> Option<&Transcript>;
    /// All genes carrying exactly the given name.
    fn genes_by_name(&self, gene_name: &str) -> Vec<&Gene>;
}

/// Module with code for parsing the snapshot TSVs.
pub mod input {
    use serde::Deserialize;

    /// One row of the snapshot TSV, one per transcript.
    #[derive(Debug, Deserialize)]
    pub struct Record {
        pub gene_id: String,
        pub gene_name: String,
        pub gene_biotype: String,
        pub transcript_id: Option<String>,
        pub transcript_biotype: Option<String>,
    }
}

/// In-memory annotation snapshot, e.g., loaded from a TSV file.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    /// The release number.
    release: u32,
    /// The species name.
    species: String,
    /// Genes, by gene ID.
    genes: HashMap<String, Gene>,
    /// Transcripts, by transcript ID.
    transcripts: HashMap<String, Transcript>,
    /// Link from gene name to gene IDs.
    from_name: multimap::MultiMap<String, String>,
}

impl MemorySnapshot {
    /// Create a new, empty snapshot.
    pub fn new(release: u32, species: &str) -> Self {
        Self {
            release,
            species: species.to_string(),
            ..Default::default()
        }
    }

    /// Register a transcript and its gene.
    ///
    /// Passing `None` for `transcript` registers a gene without transcripts.  Version
    /// suffixes of the identifiers are removed.
    pub fn insert(
        &mut self,
        gene_id: &str,
        gene_name: &str,
        gene_biotype: &str,
        transcript: Option<(&str, &str)>,
    ) {
        let gene_id = strip_version_suffix(gene_id);
        if !self.genes.contains_key(gene_id) && !gene_name.is_empty() {
            self.from_name
                .insert(gene_name.to_string(), gene_id.to_string());
        }
        let gene = self
            .genes
            .entry(gene_id.to_string())
            .or_insert_with(|| Gene {
                gene_id: gene_id.to_string(),
                gene_name: gene_name.to_string(),
                biotype: gene_biotype.to_string(),
                transcript_ids: Vec::new(),
                num_protein_coding_transcripts: 0,
            });

        if let Some((transcript_id, transcript_biotype)) = transcript {
            let transcript_id = strip_version_suffix(transcript_id);
            if self.transcripts.contains_key(transcript_id) {
                tracing::trace!(
                    "ignoring duplicate transcript {} in release {}",
                    transcript_id,
                    self.release
                );
                return;
            }
            gene.transcript_ids.push(transcript_id.to_string());
            if transcript_biotype == PROTEIN_CODING {
                gene.num_protein_coding_transcripts += 1;
            }
            self.transcripts.insert(
                transcript_id.to_string(),
                Transcript {
                    transcript_id: transcript_id.to_string(),
                    biotype: transcript_biotype.to_string(),
                    gene_id: gene_id.to_string(),
                },
            );
        }
    }

    /// Number of genes in the snapshot.
    pub fn num_genes(&self) -> usize {
        self.genes.len()
    }

    /// Number of transcripts in the snapshot.
    pub fn num_transcripts(&self) -> usize {
        self.transcripts.len()
    }
}

impl AnnotationSnapshot for MemorySnapshot {
    fn release(&self) -> u32 {
        self.release
    }

    fn species(&self) -> &str {
        &self.species
    }

    fn gene_by_id(&self, gene_id: &str) -> Option<&Gene> {
        self.genes.get(gene_id)
    }

    fn transcript_by_id(&self, transcript_id: &str) -> Option<&Transcript> {
        self.transcripts.get(transcript_id)
    }

    fn genes_by_name(&self, gene_name: &str) -> Vec<&Gene> {
        self.from_name
            .get_vec(gene_name)
            .map_or(Vec::new(), |gene_ids| {
                gene_ids
                    .iter()
                    .filter_map(|gene_id| self.genes.get(gene_id))
                    .collect()
            })
    }
}

/// Load a snapshot from a (possibly gzip-compressed) TSV file.
#[tracing::instrument]
pub fn load_snapshot_tsv(
    path: &Path,
    release: u32,
    species: &str,
) -> Result<MemorySnapshot, anyhow::Error> {
    tracing::debug!("loading annotation release {} from {:?}...", release, path);
    let before_loading = Instant::now();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);

    let mut result = MemorySnapshot::new(release, species);
    for record in reader.deserialize() {
        let record: input::Record =
            record.map_err(|e| anyhow::anyhow!("problem parsing {:?}: {}", path, e))?;
        let transcript = match (&record.transcript_id, &record.transcript_biotype) {
            (Some(transcript_id), biotype) if !transcript_id.is_empty() => {
                Some((transcript_id.as_str(), biotype.as_deref().unwrap_or_default()))
            }
            _ => None,
        };
        result.insert(
            &record.gene_id,
            &record.gene_name,
            &record.gene_biotype,
            transcript,
        );
    }

    tracing::debug!(
        "... done loading {} genes and {} transcripts in {:?}",
        result.num_genes().separate_with_commas(),
        result.num_transcripts().separate_with_commas(),
        before_loading.elapsed(),
    );

    Ok(result)
}
