//! Resolution of transcript IDs, gene IDs, and gene symbols to canonical genes.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
};

use serde::Serialize;

use crate::{
    annos::{
        alias::AliasTable,
        snapshot::{AnnotationSnapshot, Gene},
    },
    common::{is_ensembl_gene_id, strip_version_suffix},
    err::ConfigError,
};

/// How to interpret a token to resolve.
#[derive(
    Serialize,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    Default,
    clap::ValueEnum,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResolveMode {
    /// Gene symbol, possibly an alias.
    #[default]
    Name,
    /// Transcript identifier without version.
    TranscriptId,
    /// Gene identifier without version.
    GeneId,
}

/// The resolved identity of a gene.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CanonicalGene {
    /// Stable gene identifier.
    pub gene_id: String,
    /// Canonical gene symbol.
    pub gene_name: String,
    /// Whether the gene is protein-coding.
    pub is_protein_coding: bool,
    /// The annotation release the gene was resolved from.
    pub release: u32,
}

impl CanonicalGene {
    fn new(gene: &Gene, release: u32) -> Self {
        Self {
            gene_id: gene.gene_id.clone(),
            gene_name: gene.gene_name.clone(),
            is_protein_coding: gene.is_protein_coding(),
            release,
        }
    }
}

/// Order genes sharing a name from most to least preferred.
///
/// Genes with more protein-coding transcripts come first, then genes with fewer dots in
/// their name (`AC000003.1` is a placeholder), then shorter names, then names in
/// lexicographic order.  The gene ID breaks any remaining tie.
pub fn cmp_gene_preference(lhs: &Gene, rhs: &Gene) -> Ordering {
    let dots = |gene: &Gene| gene.gene_name.matches('.').count();
    rhs.num_protein_coding_transcripts
        .cmp(&lhs.num_protein_coding_transcripts)
        .then_with(|| dots(lhs).cmp(&dots(rhs)))
        .then_with(|| {
            lhs.gene_name
                .chars()
                .count()
                .cmp(&rhs.gene_name.chars().count())
        })
        .then_with(|| lhs.gene_name.cmp(&rhs.gene_name))
        .then_with(|| lhs.gene_id.cmp(&rhs.gene_id))
}

/// Pick the most preferred gene, see `cmp_gene_preference`.
pub fn pick_best_gene<'a>(genes: &[&'a Gene]) -> Option<&'a Gene> {
    genes
        .iter()
        .copied()
        .min_by(|lhs, rhs| cmp_gene_preference(lhs, rhs))
}

/// Resolves tokens against multiple annotation releases, newest first.
#[derive(Debug)]
pub struct IdentityResolver {
    /// The snapshots, sorted by descending release.
    snapshots: Vec<Box<dyn AnnotationSnapshot>>,
    /// Aliases used for widening name searches.
    aliases: AliasTable,
}

impl IdentityResolver {
    /// Construct resolver, snapshots may be given in any order.
    ///
    /// Releases must be unique.
    pub fn new(
        mut snapshots: Vec<Box<dyn AnnotationSnapshot>>,
        aliases: AliasTable,
    ) -> Result<Self, ConfigError> {
        snapshots.sort_by_key(|snapshot| std::cmp::Reverse(snapshot.release()));
        if let Some(window) = snapshots
            .windows(2)
            .find(|window| window[0].release() == window[1].release())
        {
            return Err(ConfigError::DuplicateRelease {
                release: window[0].release(),
            });
        }
        Ok(Self { snapshots, aliases })
    }

    /// The releases in search order.
    pub fn releases(&self) -> Vec<u32> {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.release())
            .collect()
    }

    /// The alias table.
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Start a new batch with an empty memoization cache.
    pub fn session(&self) -> ResolverSession<'_> {
        ResolverSession::new(self)
    }

    /// Resolve `token` according to `mode`.
    pub fn resolve(&self, token: &str, mode: ResolveMode) -> Option<CanonicalGene> {
        match mode {
            ResolveMode::Name => self.resolve_by_name(token),
            ResolveMode::TranscriptId => self.resolve_by_transcript_id(token),
            ResolveMode::GeneId => self.resolve_by_gene_id(token),
        }
    }

    /// Names to search for `name`: the name, its alias and reverse alias, each also in
    /// lower and upper case.
    pub fn candidate_names(&self, name: &str) -> BTreeSet<String> {
        let base = std::iter::once(name)
            .chain(self.aliases.alias(name))
            .chain(self.aliases.reverse_alias(name))
            .collect::<Vec<_>>();
        base.iter()
            .flat_map(|n| [n.to_string(), n.to_lowercase(), n.to_uppercase()])
            .collect()
    }

    /// Resolve a gene symbol.
    ///
    /// The first release with any match wins.  All matches for all candidate names
    /// within that release are pooled and the preferred one is picked.
    pub fn resolve_by_name(&self, name: &str) -> Option<CanonicalGene> {
        let candidates = self.candidate_names(name);
        for snapshot in &self.snapshots {
            let mut matches: BTreeMap<&str, &Gene> = BTreeMap::new();
            for candidate in &candidates {
                tracing::trace!("--> {}: {}", snapshot.release(), candidate);
                for gene in snapshot.genes_by_name(candidate) {
                    matches.insert(gene.gene_id.as_str(), gene);
                }
            }
            let matches = matches.into_values().collect::<Vec<_>>();
            if matches.len() > 1 {
                tracing::trace!(
                    "{} matches for {} in release {}",
                    matches.len(),
                    name,
                    snapshot.release()
                );
            }
            if let Some(gene) = pick_best_gene(&matches) {
                return Some(CanonicalGene::new(gene, snapshot.release()));
            }
        }
        None
    }

    /// Resolve a transcript ID to its gene, first release with a named gene wins.
    ///
    /// A version suffix such as `.7` on `transcript_id` is ignored.
    pub fn resolve_by_transcript_id(&self, transcript_id: &str) -> Option<CanonicalGene> {
        let transcript_id = strip_version_suffix(transcript_id);
        self.snapshots.iter().find_map(|snapshot| {
            snapshot
                .transcript_by_id(transcript_id)
                .and_then(|transcript| snapshot.gene_by_id(&transcript.gene_id))
                .filter(|gene| !gene.gene_name.is_empty())
                .map(|gene| {
                    tracing::trace!(
                        "Found {} -> {} in release {}",
                        transcript_id,
                        &gene.gene_name,
                        snapshot.release()
                    );
                    CanonicalGene::new(gene, snapshot.release())
                })
        })
    }

    /// Resolve a gene ID, first release with a named gene wins.
    ///
    /// A version suffix on `gene_id` is ignored.
    pub fn resolve_by_gene_id(&self, gene_id: &str) -> Option<CanonicalGene> {
        let gene_id = strip_version_suffix(gene_id);
        self.snapshots.iter().find_map(|snapshot| {
            snapshot
                .gene_by_id(gene_id)
                .filter(|gene| !gene.gene_name.is_empty())
                .map(|gene| CanonicalGene::new(gene, snapshot.release()))
        })
    }
}

/// Memoizing view on an `IdentityResolver` for one batch operation.
///
/// Create one per aggregation or normalization run so that cached results never outlive
/// the batch.
#[derive(Debug)]
pub struct ResolverSession<'a> {
    /// The wrapped resolver.
    resolver: &'a IdentityResolver,
    /// Cached results, including misses.
    cache: HashMap<(ResolveMode, String), Option<CanonicalGene>>,
    /// Number of lookups answered from the cache.
    num_hits: usize,
}

impl<'a> ResolverSession<'a> {
    fn new(resolver: &'a IdentityResolver) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
            num_hits: 0,
        }
    }

    /// Memoized `IdentityResolver::resolve`.
    pub fn resolve(&mut self, token: &str, mode: ResolveMode) -> Option<CanonicalGene> {
        let key = (mode, token.to_string());
        if let Some(result) = self.cache.get(&key) {
            self.num_hits += 1;
            return result.clone();
        }
        let result = self.resolver.resolve(token, mode);
        self.cache.insert(key, result.clone());
        result
    }

    /// Memoized `IdentityResolver::resolve_by_name`.
    pub fn resolve_by_name(&mut self, name: &str) -> Option<CanonicalGene> {
        self.resolve(name, ResolveMode::Name)
    }

    /// Memoized `IdentityResolver::resolve_by_transcript_id`.
    pub fn resolve_by_transcript_id(&mut self, transcript_id: &str) -> Option<CanonicalGene> {
        self.resolve(transcript_id, ResolveMode::TranscriptId)
    }

    /// Memoized `IdentityResolver::resolve_by_gene_id`.
    pub fn resolve_by_gene_id(&mut self, gene_id: &str) -> Option<CanonicalGene> {
        self.resolve(gene_id, ResolveMode::GeneId)
    }

    /// Resolve gene names to `(gene_id, gene_name)` pairs, one per input token.
    ///
    /// Tokens that look like ENSEMBL gene IDs, versioned or not, are looked up as gene
    /// IDs first and as names only if that fails.
    pub fn resolve_names<S: AsRef<str>>(
        &mut self,
        names: &[S],
    ) -> Vec<(Option<String>, Option<String>)> {
        names
            .iter()
            .map(|name| match self.resolve_name_or_gene_id(name.as_ref()) {
                Some(gene) => {
                    tracing::debug!("Found {} -> {}", name.as_ref(), &gene.gene_id);
                    (Some(gene.gene_id), Some(gene.gene_name))
                }
                None => {
                    tracing::debug!("Not found: {}", name.as_ref());
                    (None, None)
                }
            })
            .collect()
    }

    fn resolve_name_or_gene_id(&mut self, token: &str) -> Option<CanonicalGene> {
        if is_ensembl_gene_id(token) {
            if let Some(gene) = self.resolve_by_gene_id(token) {
                return Some(gene);
            }
        }
        self.resolve_by_name(token)
    }

    /// Number of distinct cached lookups.
    pub fn num_cached(&self) -> usize {
        self.cache.len()
    }

    /// Number of lookups answered from the cache.
    pub fn num_hits(&self) -> usize {
        self.num_hits
    }
}


#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{
        annos::{
            alias::AliasTable,
            snapshot::{AnnotationSnapshot, Gene, MemorySnapshot},
        },
        err::ConfigError,
    };

    use super::{fixture, pick_best_gene, IdentityResolver, ResolveMode};

    fn gene(gene_id: &str, gene_name: &str, num_protein_coding_transcripts: usize) -> Gene {
        Gene {
            gene_id: gene_id.to_string(),
            gene_name: gene_name.to_string(),
            biotype: String::from("protein_coding"),
            transcript_ids: Vec::new(),
            num_protein_coding_transcripts,
        }
    }

    #[rstest]
    #[case::more_protein_coding(gene("G1", "AAAA", 3), gene("G2", "A", 1))]
    #[case::fewer_dots(gene("G1", "AC000003", 1), gene("G2", "AC0.3", 1))]
    #[case::shorter_name(gene("G1", "PRAME", 0), gene("G2", "PRAMEL1", 0))]
    #[case::lexicographic(gene("G1", "ABC1", 0), gene("G2", "ABC2", 0))]
    #[case::gene_id(gene("G1", "ABC", 0), gene("G2", "ABC", 0))]
    fn pick_best_gene_precedence(#[case] winner: Gene, #[case] loser: Gene) {
        assert_eq!(pick_best_gene(&[&winner, &loser]), Some(&winner));
        assert_eq!(pick_best_gene(&[&loser, &winner]), Some(&winner));
    }

    #[test]
    fn pick_best_gene_empty() {
        assert_eq!(pick_best_gene(&[]), None);
    }

    #[test]
    fn releases_sorted_newest_first() {
        assert_eq!(fixture::resolver().releases(), vec![110, 100]);
    }

    #[test]
    fn duplicate_release() {
        let snapshots: Vec<Box<dyn AnnotationSnapshot>> = vec![
            Box::new(MemorySnapshot::new(100, "homo_sapiens")),
            Box::new(MemorySnapshot::new(100, "homo_sapiens")),
        ];
        let err = IdentityResolver::new(snapshots, AliasTable::default()).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateRelease { release: 100 });
    }

    #[test]
    fn candidate_names() {
        let resolver = fixture::resolver();

        assert_eq!(
            resolver.candidate_names("PD-L1").into_iter().collect::<Vec<_>>(),
            vec!["CD274", "PD-L1", "cd274", "pd-l1"]
        );
        assert_eq!(
            resolver.candidate_names("Foo").into_iter().collect::<Vec<_>>(),
            vec!["FOO", "Foo", "foo"]
        );
    }

    #[rstest]
    #[case("FOO", Some(("ENSG01", "FOO", 110)))]
    #[case("foo", Some(("ENSG01", "FOO", 110)))]
    #[case("PD-L1", Some(("ENSG05", "CD274", 110)))]
    #[case("p53", Some(("ENSG06", "TP53", 110)))]
    #[case("OLD", Some(("ENSG07", "OLD", 100)))]
    #[case("DUP", Some(("ENSG02", "DUP", 100)))]
    #[case("NOPE", None)]
    fn resolve_by_name(#[case] name: &str, #[case] expected: Option<(&str, &str, u32)>) {
        let result = fixture::resolver().resolve_by_name(name);
        assert_eq!(
            result
                .as_ref()
                .map(|gene| (gene.gene_id.as_str(), gene.gene_name.as_str(), gene.release)),
            expected
        );
    }

    #[test]
    fn resolve_ambiguous_prefers_protein_coding() {
        let gene = fixture::resolver().resolve_by_name("DUP").unwrap();
        assert_eq!(gene.gene_id, "ENSG02");
        assert!(gene.is_protein_coding);
    }

    #[test]
    fn resolve_by_name_first_release_wins() {
        // The older release has a "better" BAR but the newer release has a match.
        let mut newer = MemorySnapshot::new(2, "homo_sapiens");
        newer.insert("ENSG_NEW", "BAR", "lncRNA", None);
        let mut older = MemorySnapshot::new(1, "homo_sapiens");
        older.insert("ENSG_OLD", "BAR", "protein_coding", Some(("T1", "protein_coding")));
        let snapshots: Vec<Box<dyn AnnotationSnapshot>> = vec![Box::new(older), Box::new(newer)];
        let resolver = IdentityResolver::new(snapshots, AliasTable::default()).unwrap();

        let gene = resolver.resolve_by_name("BAR").unwrap();
        assert_eq!((gene.gene_id.as_str(), gene.release), ("ENSG_NEW", 2));
    }

    #[test]
    fn resolve_by_name_independent_of_candidate_order() {
        // "p53" yields candidates matching both a pseudogene "P53" and "TP53".
        let mut snapshot = MemorySnapshot::new(1, "homo_sapiens");
        snapshot.insert("ENSG_PSEUDO", "P53", "processed_pseudogene", None);
        snapshot.insert("ENSG_TP53", "TP53", "protein_coding", Some(("T1", "protein_coding")));
        let snapshots: Vec<Box<dyn AnnotationSnapshot>> = vec![Box::new(snapshot)];
        let resolver =
            IdentityResolver::new(snapshots, AliasTable::from_pairs([("TP53", "p53")])).unwrap();

        for name in ["p53", "TP53", "tp53"] {
            assert_eq!(
                resolver.resolve_by_name(name).map(|gene| gene.gene_id),
                Some(String::from("ENSG_TP53")),
                "name = {}",
                name
            );
        }
    }

    #[rstest]
    #[case(ResolveMode::TranscriptId, "ENST01", Some(("FOO", 110)))]
    #[case(ResolveMode::TranscriptId, "ENST02", Some(("FOO", 100)))]
    #[case(ResolveMode::TranscriptId, "ENST31", Some(("DUP", 100)))]
    #[case(ResolveMode::TranscriptId, "ENST01.1", Some(("FOO", 110)))]
    #[case(ResolveMode::TranscriptId, "ENST02.7", Some(("FOO", 100)))]
    #[case(ResolveMode::TranscriptId, "ENSG01", None)]
    #[case(ResolveMode::GeneId, "ENSG07", Some(("OLD", 100)))]
    #[case(ResolveMode::GeneId, "ENSG01", Some(("FOO", 110)))]
    #[case(ResolveMode::GeneId, "ENSG07.3", Some(("OLD", 100)))]
    #[case(ResolveMode::GeneId, "ENST01", None)]
    fn resolve_by_id(
        #[case] mode: ResolveMode,
        #[case] token: &str,
        #[case] expected: Option<(&str, u32)>,
    ) {
        let result = fixture::resolver().resolve(token, mode);
        assert_eq!(
            result
                .as_ref()
                .map(|gene| (gene.gene_name.as_str(), gene.release)),
            expected
        );
    }

    #[test]
    fn resolve_skips_unnamed_genes() {
        let mut newer = MemorySnapshot::new(2, "homo_sapiens");
        newer.insert("ENSG01", "", "lncRNA", Some(("ENST01", "lncRNA")));
        let mut older = MemorySnapshot::new(1, "homo_sapiens");
        older.insert("ENSG01", "LINC01", "lncRNA", Some(("ENST01", "lncRNA")));
        let snapshots: Vec<Box<dyn AnnotationSnapshot>> = vec![Box::new(newer), Box::new(older)];
        let resolver = IdentityResolver::new(snapshots, AliasTable::default()).unwrap();

        let gene = resolver.resolve_by_transcript_id("ENST01").unwrap();
        assert_eq!((gene.gene_name.as_str(), gene.release), ("LINC01", 1));
    }

    #[test]
    fn session_memoizes() {
        let resolver = fixture::resolver();
        let mut session = resolver.session();

        assert!(session.resolve_by_name("FOO").is_some());
        assert!(session.resolve_by_name("FOO").is_some());
        assert!(session.resolve_by_name("NOPE").is_none());
        assert!(session.resolve_by_name("NOPE").is_none());
        assert!(session.resolve_by_transcript_id("FOO").is_none());

        assert_eq!(session.num_cached(), 3);
        assert_eq!(session.num_hits(), 2);

        // A fresh session starts out empty.
        assert_eq!(resolver.session().num_cached(), 0);
    }

    #[test]
    fn session_resolve_names() {
        let resolver = fixture::resolver();
        let mut session = resolver.session();

        assert_eq!(
            session.resolve_names(&["PD-L1", "NOPE"]),
            vec![
                (Some(String::from("ENSG05")), Some(String::from("CD274"))),
                (None, None)
            ]
        );
    }

    #[test]
    fn session_resolve_names_accepts_gene_ids() {
        let resolver = fixture::resolver();
        let mut session = resolver.session();

        assert_eq!(
            session.resolve_names(&["ENSG01", "ENSG06.3", "ENSG99"]),
            vec![
                (Some(String::from("ENSG01")), Some(String::from("FOO"))),
                (Some(String::from("ENSG06")), Some(String::from("TP53"))),
                (None, None)
            ]
        );
    }
}
