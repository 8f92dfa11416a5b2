// strata_sim/src/simulation/config/catalog.rs

//! The `SensorCatalog` resource: every sensor preset found under the catalog
//! directory, parsed and validated once at startup.

use bevy::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use strata_core::config::SensorGroupConfig;

/// Presets keyed by their path below the catalog root, with separators
/// turned into dots: `velodyne/vlp16.json` becomes `"velodyne.vlp16"`.
#[derive(Resource, Default, Debug, Clone)]
pub struct SensorCatalog(pub BTreeMap<String, SensorGroupConfig>);

impl SensorCatalog {
    /// Walks `root` for `.json` files. A preset that fails to parse is logged
    /// and left out; a missing directory yields an empty catalog.
    pub fn load_from_dir(root: &Path) -> Self {
        let mut catalog = Self::default();
        if !root.exists() {
            warn!(
                "Sensor catalog directory not found at {:?}, no presets will be loaded.",
                root
            );
            return catalog;
        }

        info!("Loading sensor catalog from: {:?}", root);
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| {
                !e.file_type().is_dir() && e.path().extension().is_some_and(|ext| ext == "json")
            })
        {
            let path = entry.path();
            let Some(key) = catalog_key(root, path) else {
                continue;
            };

            match SensorGroupConfig::load(path) {
                Ok(config) => {
                    info!(
                        "Loaded sensor preset '{}' ({} rays at {:.1} Hz)",
                        key,
                        config.ray_count(),
                        config.frequency()
                    );
                    catalog.0.insert(key, config);
                }
                Err(e) => {
                    error!("Failed to load sensor preset from {:?}: {}", path, e);
                }
            }
        }
        catalog
    }

    pub fn get(&self, key: &str) -> Option<&SensorGroupConfig> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, config: SensorGroupConfig) {
        self.0.insert(key.into(), config);
    }
}

fn catalog_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_directory_layout() {
        let root = Path::new("assets/sensors");
        assert_eq!(
            catalog_key(root, Path::new("assets/sensors/velodyne/vlp16.json")).as_deref(),
            Some("velodyne.vlp16")
        );
        assert_eq!(
            catalog_key(root, Path::new("assets/sensors/ring.json")).as_deref(),
            Some("ring")
        );
        assert_eq!(catalog_key(root, Path::new("elsewhere/ring.json")), None);
    }

    #[test]
    fn bundled_presets_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/sensors");
        let catalog = SensorCatalog::load_from_dir(&root);
        let vlp16 = catalog.get("velodyne.vlp16").expect("bundled VLP-16 preset");
        assert_eq!(vlp16.ray_count(), 16 * 900);
        assert!(catalog.get("single_ring").is_some());
    }

    #[test]
    fn missing_directory_is_empty() {
        let catalog = SensorCatalog::load_from_dir(Path::new("/no/such/catalog"));
        assert!(catalog.0.is_empty());
    }
}
