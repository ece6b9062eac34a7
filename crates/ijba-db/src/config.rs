//! Database configuration.

use ijba_manifest::ManifestLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::protocol::{Protocol, ProtocolFamily};
use crate::{DbError, DbResult};

/// How cached template indexes are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyMode {
    /// One entry per resolved manifest file. Protocols that point at the same file
    /// (e.g. the train list of `search_splitN` and `compare_splitN` under a flat
    /// layout) share a single parse.
    #[default]
    ManifestPath,
    /// One entry per `(protocol, manifest)`; nothing is shared across protocols.
    Protocol,
}

/// Configuration for a [`crate::Database`].
///
/// Manifests resolve to `{annotations_directory}/{family sets}/split{n}/...`, where
/// the family directory is `search_sets` or `compare_sets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Root of the protocol CSV tree.
    pub annotations_directory: PathBuf,
    /// Directory (relative to the root) holding the 1:N split folders.
    pub search_sets: PathBuf,
    /// Directory (relative to the root) holding the 1:1 split folders.
    pub compare_sets: PathBuf,
    /// Master file manifest. When set, template rows are resolved against it and
    /// rows that it does not list are reported as not found.
    pub metadata: Option<PathBuf>,
    pub layout: ManifestLayout,
    /// Where the original images live, for [`crate::Database::original_file_name`].
    pub original_directory: Option<PathBuf>,
    /// Overrides each record's own extension when materializing original names.
    pub original_extension: Option<String>,
    pub cache_key: CacheKeyMode,
    /// Fail comparison loads that reference templates missing from the
    /// protocol's metadata instead of only reporting them.
    pub strict_comparisons: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            annotations_directory: PathBuf::from("."),
            search_sets: PathBuf::from("IJB-A_1N_sets"),
            compare_sets: PathBuf::from("IJB-A_11_sets"),
            metadata: None,
            layout: ManifestLayout::Current,
            original_directory: None,
            original_extension: None,
            cache_key: CacheKeyMode::ManifestPath,
            strict_comparisons: false,
        }
    }
}

impl DatabaseConfig {
    /// NIST directory layout under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            annotations_directory: root.into(),
            ..Default::default()
        }
    }

    /// Both families read `root/split{n}/...` directly.
    pub fn flat(root: impl Into<PathBuf>) -> Self {
        Self {
            annotations_directory: root.into(),
            search_sets: PathBuf::new(),
            compare_sets: PathBuf::new(),
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> DbResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| DbError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn with_metadata(mut self, metadata: impl Into<PathBuf>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_layout(mut self, layout: ManifestLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_original_directory(
        mut self,
        directory: impl Into<PathBuf>,
        extension: Option<String>,
    ) -> Self {
        self.original_directory = Some(directory.into());
        self.original_extension = extension;
        self
    }

    pub fn with_cache_key(mut self, mode: CacheKeyMode) -> Self {
        self.cache_key = mode;
        self
    }

    pub fn with_strict_comparisons(mut self, strict: bool) -> Self {
        self.strict_comparisons = strict;
        self
    }

    pub fn family_root(&self, family: ProtocolFamily) -> PathBuf {
        let sets = match family {
            ProtocolFamily::Search => &self.search_sets,
            ProtocolFamily::Compare => &self.compare_sets,
        };
        self.annotations_directory.join(sets)
    }

    /// Absolute location of a manifest given relative to the protocol's family.
    pub fn manifest_path(&self, protocol: Protocol, relative: &Path) -> PathBuf {
        self.family_root(protocol.family()).join(relative)
    }

    /// Master manifest location; relative paths are taken from the root.
    pub fn metadata_path(&self) -> Option<PathBuf> {
        self.metadata
            .as_ref()
            .map(|m| self.annotations_directory.join(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Role;

    #[test]
    fn nist_layout_separates_families() {
        let config = DatabaseConfig::new("/db");
        let search = Protocol::search(1).unwrap();
        let compare = Protocol::compare(1).unwrap();
        assert_eq!(
            config.manifest_path(search, &search.manifest(Role::Train)),
            Path::new("/db/IJB-A_1N_sets/split1/train_1.csv")
        );
        assert_eq!(
            config.manifest_path(compare, &compare.manifest(Role::Train)),
            Path::new("/db/IJB-A_11_sets/split1/train_1.csv")
        );
    }

    #[test]
    fn flat_layout_shares_train_lists() {
        let config = DatabaseConfig::flat("/db");
        let search = Protocol::search(4).unwrap();
        let compare = Protocol::compare(4).unwrap();
        assert_eq!(
            config.manifest_path(search, &search.manifest(Role::Train)),
            config.manifest_path(compare, &compare.manifest(Role::Train)),
        );
    }

    #[test]
    fn metadata_is_rooted_unless_absolute() {
        let config = DatabaseConfig::new("/db").with_metadata("protocol/metadata.csv");
        assert_eq!(
            config.metadata_path().unwrap(),
            Path::new("/db/protocol/metadata.csv")
        );
        let config = config.with_metadata("/elsewhere/metadata.csv");
        assert_eq!(
            config.metadata_path().unwrap(),
            Path::new("/elsewhere/metadata.csv")
        );
    }

    #[test]
    fn json_round_trip_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ijba.json");
        std::fs::write(
            &path,
            r#"{ "annotations_directory": "/data/ijba", "layout": "legacy", "cache_key": "protocol" }"#,
        )
        .unwrap();
        let config = DatabaseConfig::from_json_file(&path).unwrap();
        assert_eq!(config.annotations_directory, Path::new("/data/ijba"));
        assert_eq!(config.layout, ManifestLayout::Legacy);
        assert_eq!(config.cache_key, CacheKeyMode::Protocol);
        assert_eq!(config.search_sets, Path::new("IJB-A_1N_sets"));
        assert!(!config.strict_comparisons);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            DatabaseConfig::from_json_file(&path),
            Err(DbError::Config(_))
        ));
    }
}
