//! The query engine.

use ahash::AHashSet;
use ijba_manifest::{Annotation, ClientId, FileRecord, PathId, TemplateId};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CacheKey, CacheStats, QueryCache};
use crate::comparisons::{load_comparisons, ComparisonTable};
use crate::config::{CacheKeyMode, DatabaseConfig};
use crate::index::{load_template_index, MasterFileIndex, Template, TemplateIndex};
use crate::protocol::{parse_groups, parse_purposes, Group, Protocol, ProtocolFamily, Purpose, Role};
use crate::query::{ObjectQuery, ResolvedQuery};
use crate::report::LoadReport;
use crate::{DbError, DbResult};

/// IJB-A protocol database.
///
/// Manifests are parsed on first use and kept for the lifetime of the instance
/// (or until [`Database::reset_cache`]). A `Database` is `Sync`; concurrent
/// queries that miss on the same manifest trigger a single parse.
pub struct Database {
    config: DatabaseConfig,
    cache: QueryCache,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            cache: QueryCache::default(),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ========================================================================
    // Static surface
    // ========================================================================

    pub fn protocols(&self) -> Vec<Protocol> {
        Protocol::all()
    }

    pub fn protocol_names(&self) -> Vec<String> {
        Protocol::all().into_iter().map(Protocol::name).collect()
    }

    pub fn has_protocol(&self, name: &str) -> bool {
        name.parse::<Protocol>().is_ok()
    }

    pub fn groups(&self) -> [Group; 2] {
        Group::ALL
    }

    /// Every protocol defines file sets (templates), see [`Database::object_sets`].
    pub fn provides_file_set_for_protocol(&self, _protocol: &str) -> bool {
        true
    }

    // ========================================================================
    // Loading
    // ========================================================================

    fn cache_key(&self, protocol: Protocol, path: PathBuf) -> CacheKey {
        match self.config.cache_key {
            CacheKeyMode::ManifestPath => CacheKey::Manifest(path),
            CacheKeyMode::Protocol => CacheKey::Protocol(protocol, path),
        }
    }

    /// The master file index, when one is configured.
    pub fn master_index(&self) -> DbResult<Option<Arc<MasterFileIndex>>> {
        let Some(path) = self.config.metadata_path() else {
            return Ok(None);
        };
        self.cache
            .master
            .get_or_try_load(&path, || {
                tracing::info!(path = %path.display(), "loading master file index");
                MasterFileIndex::load(&path, self.config.layout)
            })
            .map(Some)
    }

    /// Template index of one manifest of `protocol`, parsed on first use.
    pub fn template_index(&self, protocol: Protocol, role: Role) -> DbResult<Arc<TemplateIndex>> {
        let path = self.config.manifest_path(protocol, &protocol.manifest(role));
        let key = self.cache_key(protocol, path.clone());
        self.cache.templates.get_or_try_load(&key, || {
            tracing::info!(%protocol, ?role, path = %path.display(), "loading template index");
            let master = self.master_index()?;
            load_template_index(&path, self.config.layout, role, master.as_deref())
        })
    }

    /// Comparison table of a compare protocol, parsed on first use.
    pub fn comparison_table(&self, protocol: Protocol) -> DbResult<Arc<ComparisonTable>> {
        let relative = protocol.comparisons().ok_or_else(|| {
            DbError::invalid(
                "protocol",
                &protocol.name(),
                Protocol::all().into_iter().filter(|p| !p.is_search()),
            )
        })?;
        let path = self.config.manifest_path(protocol, &relative);
        let key = self.cache_key(protocol, path.clone());
        self.cache.comparisons.get_or_try_load(&key, || {
            tracing::info!(%protocol, path = %path.display(), "loading comparison table");
            let templates = self.template_index(protocol, Role::Enroll)?;
            load_comparisons(&path, &templates, self.config.strict_comparisons)
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Distinct subjects of every file reachable for `groups` under `protocol`.
    ///
    /// For compare protocols the dev group covers every template of the
    /// verification metadata, so no model ids are needed.
    pub fn client_ids<S: AsRef<str>>(&self, protocol: &str, groups: &[S]) -> DbResult<BTreeSet<ClientId>> {
        let protocol = Protocol::parse_param(protocol)?;
        let groups = parse_groups(groups)?;

        let mut ids = BTreeSet::new();
        if groups.contains(&Group::World) {
            let train = self.template_index(protocol, Role::Train)?;
            ids.extend(train.files().map(|f| f.client_id));
        }
        if groups.contains(&Group::Dev) {
            match protocol.family() {
                ProtocolFamily::Search => {
                    for role in [Role::Enroll, Role::Probe] {
                        let index = self.template_index(protocol, role)?;
                        ids.extend(index.files().map(|f| f.client_id));
                    }
                }
                ProtocolFamily::Compare => {
                    let index = self.template_index(protocol, Role::Enroll)?;
                    ids.extend(index.files().map(|f| f.client_id));
                }
            }
        }
        Ok(ids)
    }

    /// Model (template) ids of the dev group.
    ///
    /// `model_ids` only matters for compare probes, where it selects whose probe
    /// lists are returned. Probe ids may repeat.
    pub fn model_ids<S: AsRef<str>>(
        &self,
        protocol: &str,
        purposes: &[S],
        model_ids: Option<&[TemplateId]>,
    ) -> DbResult<Vec<TemplateId>> {
        let protocol = Protocol::parse_param(protocol)?;
        let purposes = parse_purposes(purposes)?;

        let mut ids = Vec::new();
        match protocol.family() {
            ProtocolFamily::Search => {
                for purpose in purposes {
                    ids.extend(self.template_index(protocol, purpose.into())?.ids());
                }
            }
            ProtocolFamily::Compare => {
                let table = self.comparison_table(protocol)?;
                for purpose in purposes {
                    match (purpose, model_ids) {
                        (Purpose::Enroll, _) => ids.extend(table.enroll_ids()),
                        (Purpose::Probe, None) => ids.extend(table.all_probes()),
                        (Purpose::Probe, Some(models)) => {
                            for &model in models {
                                ids.extend_from_slice(table.probes_for(model));
                            }
                        }
                    }
                }
            }
        }
        Ok(ids)
    }

    /// Enroll model ids of `protocol`.
    pub fn template_ids(&self, protocol: &str) -> DbResult<Vec<TemplateId>> {
        self.model_ids(protocol, &["enroll"], None)
    }

    /// Files selected by `query`, de-duplicated by [`PathId`] in first-seen order.
    pub fn objects(&self, query: &ObjectQuery) -> DbResult<Vec<Arc<FileRecord>>> {
        let query = query.resolve()?;
        let mut templates: Vec<Arc<Template>> = Vec::new();

        if query.wants(Group::World) {
            let train = self.template_index(query.protocol, Role::Train)?;
            templates.extend(train.templates().iter().cloned());
        }
        if query.wants(Group::Dev) {
            templates.extend(self.dev_templates(&query)?);
        }

        let mut seen = AHashSet::new();
        let files = templates
            .iter()
            .flat_map(|t| t.files.iter())
            .filter(|f| query.keeps(f))
            .filter(|f| seen.insert(f.path_id()))
            .cloned()
            .collect();
        Ok(files)
    }

    fn dev_templates(&self, query: &ResolvedQuery<'_>) -> DbResult<Vec<Arc<Template>>> {
        let protocol = query.protocol;
        let mut out = Vec::new();
        match protocol.family() {
            ProtocolFamily::Search => {
                if query.wants_purpose(Purpose::Enroll) {
                    let gallery = self.template_index(protocol, Role::Enroll)?;
                    select(&gallery, query.model_ids, &mut out);
                }
                if query.wants_purpose(Purpose::Probe) {
                    // One probe pool shared by every model.
                    let probes = self.template_index(protocol, Role::Probe)?;
                    out.extend(probes.templates().iter().cloned());
                }
            }
            ProtocolFamily::Compare => {
                if query.wants_purpose(Purpose::Probe) && query.model_ids.is_none() {
                    return Err(DbError::MissingModelIds {
                        protocol: protocol.name(),
                    });
                }
                let table = self.comparison_table(protocol)?;
                let templates = self.template_index(protocol, Role::Enroll)?;
                if query.wants_purpose(Purpose::Enroll) {
                    match query.model_ids {
                        Some(models) => select(&templates, Some(models), &mut out),
                        None => {
                            out.extend(table.enroll_ids().filter_map(|id| templates.get(id).cloned()))
                        }
                    }
                }
                if let (true, Some(models)) = (query.wants_purpose(Purpose::Probe), query.model_ids) {
                    for &model in models {
                        out.extend(
                            table
                                .probes_for(model)
                                .iter()
                                .filter_map(|&probe| templates.get(probe).cloned()),
                        );
                    }
                }
            }
        }
        Ok(out)
    }

    /// Templates (file sets) of the dev group.
    ///
    /// Search enroll yields the requested gallery templates and search probe the
    /// whole probe pool. Compare enroll yields the requested enroll templates and
    /// compare probe the probe templates listed for each requested model, which
    /// requires `model_ids`.
    pub fn object_sets<S: AsRef<str>>(
        &self,
        protocol: &str,
        purposes: &[S],
        model_ids: Option<&[TemplateId]>,
    ) -> DbResult<Vec<Arc<Template>>> {
        let query = ObjectQuery {
            protocol: protocol.to_string(),
            groups: vec![Group::Dev.to_string()],
            purposes: purposes.iter().map(|p| p.as_ref().to_string()).collect(),
            model_ids: model_ids.map(<[TemplateId]>::to_vec),
            media_ids: None,
            frames: None,
        };
        self.dev_templates(&query.resolve()?)
    }

    pub fn annotations<'f>(&self, file: &'f FileRecord) -> Option<&'f Annotation> {
        file.annotation.as_ref()
    }

    /// Subject owning a dev template, searching every protocol in order.
    ///
    /// Loads dev manifests of further protocols until the id is found.
    pub fn client_id_from_model_id(&self, model_id: TemplateId) -> DbResult<Option<ClientId>> {
        for protocol in Protocol::all() {
            let roles: &[Role] = match protocol.family() {
                ProtocolFamily::Search => &[Role::Enroll, Role::Probe],
                ProtocolFamily::Compare => &[Role::Enroll],
            };
            for &role in roles {
                if let Some(template) = self.template_index(protocol, role)?.get(model_id) {
                    return Ok(Some(template.client_id));
                }
            }
        }
        Ok(None)
    }

    /// Location of the original media file of `file` (without sighting id).
    pub fn original_file_name(&self, file: &FileRecord, check_existence: bool) -> DbResult<PathBuf> {
        let directory = self.config.original_directory.as_ref().ok_or_else(|| {
            DbError::Config("original_directory is not configured".to_string())
        })?;
        let extension = self
            .config
            .original_extension
            .as_deref()
            .unwrap_or(&file.extension);
        let path = file.make_path(directory, extension, false);
        if check_existence && !path.exists() {
            return Err(DbError::FileNotFound { path });
        }
        Ok(path)
    }

    // ========================================================================
    // Diagnostics and cache control
    // ========================================================================

    /// Load reports of every manifest parsed so far, sorted by manifest path.
    pub fn diagnostics(&self) -> Vec<LoadReport> {
        let mut reports: Vec<LoadReport> = self
            .cache
            .templates
            .values()
            .iter()
            .map(|index| index.report().clone())
            .chain(
                self.cache
                    .comparisons
                    .values()
                    .iter()
                    .map(|table| table.report().clone()),
            )
            .chain(
                self.cache
                    .master
                    .values()
                    .iter()
                    .map(|master| master.report().clone()),
            )
            .collect();
        reports.sort_by(|a, b| a.manifest.cmp(&b.manifest));
        reports
    }

    /// Path ids reported missing by any load so far.
    pub fn files_not_found(&self) -> BTreeSet<PathId> {
        self.cache
            .templates
            .values()
            .iter()
            .flat_map(|index| index.report().files_not_found.iter().cloned())
            .collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Forget every parsed manifest.
    pub fn reset_cache(&self) {
        tracing::debug!("resetting query cache");
        self.cache.clear();
    }
}

fn select(index: &TemplateIndex, model_ids: Option<&[TemplateId]>, out: &mut Vec<Arc<Template>>) {
    match model_ids {
        Some(ids) => out.extend(ids.iter().filter_map(|&id| index.get(id).cloned())),
        None => out.extend(index.templates().iter().cloned()),
    }
}

