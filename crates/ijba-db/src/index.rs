//! Template and file indexes.
//!
//! A [`TemplateIndex`] is built in a single pass over one manifest: the first row
//! of a template id creates it (binding the subject), later rows append files.
//! File records are shared (`Arc`) between every template that lists them:
//!
//! - with a [`MasterFileIndex`], rows are resolved by [`PathId`] against it and
//!   unknown paths are reported instead of added;
//! - without one, the manifest is self-contained and rows are de-duplicated by
//!   [`PathId`] within the load.

use ahash::AHashMap;
use ijba_manifest::{
    read_manifest, ClientId, FileRecord, ManifestLayout, ManifestRow, PathId, TemplateId,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::protocol::Role;
use crate::report::{ClientMismatch, DuplicateFile, LoadReport, UnresolvedClient};
use crate::DbResult;

// ============================================================================
// Templates
// ============================================================================

/// A bundle of face observations of one subject, scoped to one manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: TemplateId,
    pub client_id: ClientId,
    pub files: Vec<Arc<FileRecord>>,
    /// `{media id of the first file}-{template id}`; `None` while no file of the
    /// template could be resolved.
    pub path: Option<String>,
}

impl Template {
    fn new(id: TemplateId, client_id: ClientId) -> Self {
        Self {
            id,
            client_id,
            files: Vec::new(),
            path: None,
        }
    }

    fn add_file(&mut self, file: Arc<FileRecord>) {
        if self.path.is_none() {
            self.path = Some(format!("{}-{}", file.media_id, self.id));
        }
        self.files.push(file);
    }
}

/// Templates of one manifest, in first-seen order.
#[derive(Debug, Default)]
pub struct TemplateIndex {
    templates: Vec<Arc<Template>>,
    by_id: AHashMap<TemplateId, usize>,
    report: LoadReport,
}

impl TemplateIndex {
    pub fn manifest(&self) -> &Path {
        &self.report.manifest
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: TemplateId) -> Option<&Arc<Template>> {
        self.by_id.get(&id).map(|&i| &self.templates[i])
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.templates.iter().map(|t| t.id)
    }

    pub fn templates(&self) -> &[Arc<Template>] {
        &self.templates
    }

    /// Member files of every template, in template order (with repeats).
    pub fn files(&self) -> impl Iterator<Item = &Arc<FileRecord>> + '_ {
        self.templates.iter().flat_map(|t| t.files.iter())
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

/// Single-pass builder for a [`TemplateIndex`].
pub struct TemplateIndexBuilder<'m> {
    role: Role,
    master: Option<&'m MasterFileIndex>,
    local_files: AHashMap<PathId, Arc<FileRecord>>,
    templates: Vec<Template>,
    by_id: AHashMap<TemplateId, usize>,
    report: LoadReport,
}

impl<'m> TemplateIndexBuilder<'m> {
    pub fn new(manifest: impl Into<PathBuf>, role: Role, master: Option<&'m MasterFileIndex>) -> Self {
        Self {
            role,
            master,
            local_files: AHashMap::new(),
            templates: Vec::new(),
            by_id: AHashMap::new(),
            report: LoadReport::new(manifest),
        }
    }

    pub fn push(&mut self, row: ManifestRow) {
        self.report.rows += 1;
        let ManifestRow {
            line,
            template_id,
            client_id,
            record,
        } = row;

        let id = match self.role {
            Role::Train => TemplateId::Train(template_id),
            Role::Enroll | Role::Probe => TemplateId::Numeric(template_id),
        };
        let path_id = record.path_id();

        // Training rows sometimes carry subject 0; recover it from the master list
        // when exactly one record has this path.
        let client_id = if client_id == 0 && self.role == Role::Train {
            match self.master.and_then(|m| m.infer_client(&path_id.path)) {
                Some(inferred) => inferred,
                None => {
                    tracing::debug!(line, template = %id, path = %path_id, "cannot resolve subject of row");
                    self.report.files_not_found.insert(path_id.clone());
                    self.report
                        .unresolved_clients
                        .push(UnresolvedClient { line, template_id: id, path_id });
                    return;
                }
            }
        } else {
            client_id
        };

        let idx = match self.by_id.get(&id) {
            Some(&idx) => idx,
            None => {
                self.templates.push(Template::new(id, client_id));
                self.by_id.insert(id, self.templates.len() - 1);
                self.templates.len() - 1
            }
        };

        let expected = self.templates[idx].client_id;
        if expected != client_id {
            tracing::debug!(line, template = %id, expected, found = client_id, "subject differs within template");
            self.report.client_mismatches.push(ClientMismatch {
                line,
                template_id: id,
                expected,
                found: client_id,
            });
        }

        let file = match self.master {
            Some(master) => match master.get(&path_id) {
                Some(file) => Arc::clone(file),
                None => {
                    tracing::debug!(line, template = %id, path = %path_id, "file not in master index");
                    self.report.files_not_found.insert(path_id);
                    return;
                }
            },
            None => Arc::clone(
                self.local_files
                    .entry(path_id)
                    .or_insert_with(|| Arc::new(record)),
            ),
        };
        self.templates[idx].add_file(file);
    }

    pub fn finish(self) -> TemplateIndex {
        let mut report = self.report;
        report.templates = self.templates.len();
        report.log_summary();
        TemplateIndex {
            templates: self.templates.into_iter().map(Arc::new).collect(),
            by_id: self.by_id,
            report,
        }
    }
}

impl<'m> Extend<ManifestRow> for TemplateIndexBuilder<'m> {
    fn extend<I: IntoIterator<Item = ManifestRow>>(&mut self, rows: I) {
        for row in rows {
            self.push(row);
        }
    }
}

/// Parse `path` and group its rows into templates.
pub fn load_template_index(
    path: &Path,
    layout: ManifestLayout,
    role: Role,
    master: Option<&MasterFileIndex>,
) -> DbResult<TemplateIndex> {
    let rows = read_manifest(path, layout)?;
    let mut builder = TemplateIndexBuilder::new(path, role, master);
    builder.extend(rows);
    let index = builder.finish();
    tracing::debug!(
        manifest = %path.display(),
        rows = index.report().rows,
        templates = index.len(),
        "template index built"
    );
    Ok(index)
}

// ============================================================================
// Master file index
// ============================================================================

/// Every file record of the benchmark, keyed by [`PathId`].
#[derive(Debug, Default)]
pub struct MasterFileIndex {
    report: LoadReport,
    files: AHashMap<PathId, Arc<FileRecord>>,
    by_path: AHashMap<String, Vec<PathId>>,
    clients: BTreeSet<ClientId>,
}

impl MasterFileIndex {
    /// First occurrence of a [`PathId`] wins; later duplicates are recorded in
    /// the report and otherwise ignored.
    pub fn from_rows<I>(manifest: impl Into<PathBuf>, rows: I) -> Self
    where
        I: IntoIterator<Item = ManifestRow>,
    {
        let mut index = Self {
            report: LoadReport::new(manifest),
            ..Default::default()
        };
        for row in rows {
            index.report.rows += 1;
            index.clients.insert(row.client_id);
            let path_id = row.record.path_id();
            if index.files.contains_key(&path_id) {
                index.report.duplicate_files.push(DuplicateFile {
                    line: row.line,
                    path_id,
                });
                continue;
            }
            index
                .by_path
                .entry(path_id.path.clone())
                .or_default()
                .push(path_id.clone());
            index.files.insert(path_id, Arc::new(row.record));
        }
        index
    }

    pub fn load(path: &Path, layout: ManifestLayout) -> DbResult<Self> {
        let rows = read_manifest(path, layout)?;
        let index = Self::from_rows(path, rows);
        index.report.log_summary();
        tracing::debug!(
            manifest = %path.display(),
            files = index.len(),
            clients = index.clients.len(),
            "master file index built"
        );
        Ok(index)
    }

    pub fn manifest(&self) -> &Path {
        &self.report.manifest
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path_id: &PathId) -> Option<&Arc<FileRecord>> {
        self.files.get(path_id)
    }

    /// Subject of the only record stored under `path` (any sighting).
    pub fn infer_client(&self, path: &str) -> Option<ClientId> {
        match self.by_path.get(path).map(Vec::as_slice) {
            Some([only]) => self.files.get(only).map(|f| f.client_id),
            _ => None,
        }
    }

    /// Distinct subject ids, including subject 0 if it occurs.
    pub fn clients(&self) -> &BTreeSet<ClientId> {
        &self.clients
    }
}
