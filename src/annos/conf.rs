//! Code for supporting the annotation configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default species if none is configured.
fn default_species() -> String {
    String::from("homo_sapiens")
}

/// Configuration of one annotation snapshot.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct SnapshotConf {
    /// The annotation release, e.g., ENSEMBL release 110.
    pub release: u32,
    /// The (relative) path to the snapshot TSV file.
    pub path: String,
    /// Optional species, defaults to the top-level species.
    pub species: Option<String>,
}

/// Top-level configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Top {
    /// The species to use annotations for.
    #[serde(default = "default_species")]
    pub species: String,
    /// Optional path to additional literature aliases.
    pub path_aliases: Option<String>,
    /// Optional path to additional manual transcript overrides.
    pub path_overrides: Option<String>,
    /// The annotation snapshots, in any order.
    #[serde(default)]
    pub snapshots: Vec<SnapshotConf>,
    /// Directory that relative paths are resolved against, set on loading.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Top {
    /// Load configuration from the given TOML file.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let toml_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read configuration {:?}: {}", path, e))?;
        let mut result: Top = toml::from_str(&toml_str)
            .map_err(|e| anyhow::anyhow!("could not parse configuration {:?}: {}", path, e))?;
        result.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(result)
    }

    /// Resolve `path` relative to the configuration directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// The snapshots of the configured species, other species are skipped with a warning.
    pub fn species_snapshots(&self) -> Vec<&SnapshotConf> {
        self.snapshots
            .iter()
            .filter(|snapshot| {
                let species = snapshot.species.as_deref().unwrap_or(&self.species);
                if species == self.species {
                    true
                } else {
                    tracing::warn!(
                        "skipping release {} of species {} (configured species is {})",
                        snapshot.release,
                        species,
                        &self.species
                    );
                    false
                }
            })
            .collect()
    }
}
