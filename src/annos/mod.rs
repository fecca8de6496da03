//! Genome annotation snapshots and gene identity resolution.

pub mod alias;
pub mod cli;
pub mod conf;
pub mod resolver;
pub mod snapshot;

use std::{path::Path, time::Instant};

use tracing::info;

use crate::err::ConfigError;

use self::{
    alias::AliasTable,
    conf::Top,
    resolver::IdentityResolver,
    snapshot::{load_snapshot_tsv, AnnotationSnapshot},
};

/// Build the identity resolver from the configuration file at `path_conf`.
#[tracing::instrument]
pub fn load_resolver(path_conf: &Path) -> Result<(Top, IdentityResolver), anyhow::Error> {
    info!("Loading annotation config...");
    let conf = Top::load(path_conf)?;

    let mut aliases = AliasTable::builtin()?;
    if let Some(path_aliases) = conf.path_aliases.as_ref() {
        aliases.extend_from_tsv(&conf.resolve_path(path_aliases))?;
    }

    let snapshot_confs = conf.species_snapshots();
    if snapshot_confs.is_empty() {
        return Err(ConfigError::NoSnapshots {
            species: conf.species.clone(),
        }
        .into());
    }

    info!("Loading annotation snapshots...");
    let before_loading = Instant::now();
    let mut snapshots: Vec<Box<dyn AnnotationSnapshot>> = Vec::new();
    for snapshot_conf in snapshot_confs {
        snapshots.push(Box::new(load_snapshot_tsv(
            &conf.resolve_path(&snapshot_conf.path),
            snapshot_conf.release,
            &conf.species,
        )?));
    }
    let resolver = IdentityResolver::new(snapshots, aliases)?;
    info!(
        "...done loading releases {:?} in {:?}",
        resolver.releases(),
        before_loading.elapsed()
    );

    Ok((conf, resolver))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::err::ConfigError;

    #[test]
    fn load_resolver() -> Result<(), anyhow::Error> {
        let (conf, resolver) =
            super::load_resolver(std::path::Path::new("tests/annos/conf.toml"))?;

        assert_eq!(conf.species, "homo_sapiens");
        assert_eq!(resolver.releases(), vec![110, 100]);
        // Aliases from the configuration extend the built-in ones.
        assert_eq!(resolver.aliases().alias("CD274"), Some("PD-L1"));
        assert_eq!(resolver.aliases().alias("DUP"), Some("Duplo"));

        let gene = resolver.resolve_by_name("Duplo").unwrap();
        assert_eq!((gene.gene_id.as_str(), gene.release), ("ENSG00000000002", 100));
        let gene = resolver.resolve_by_transcript_id("ENST00000000002").unwrap();
        assert_eq!((gene.gene_name.as_str(), gene.release), ("FOO", 100));

        Ok(())
    }

    #[test]
    fn load_resolver_no_snapshots() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_conf = tmp_dir.join("conf.toml");
        std::fs::write(&path_conf, "species = \"danio_rerio\"\n")?;

        let err = super::load_resolver(&path_conf).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NoSnapshots {
                species: String::from("danio_rerio")
            })
        );

        Ok(())
    }
}
