//! Data-integrity diagnostics collected while loading manifests.
//!
//! NIST's lists are known to disagree with each other in places. None of these
//! findings abort a load; they are collected here so callers can inspect them.

use ijba_manifest::{ClientId, PathId, TemplateId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A template row whose subject id was 0 and could not be inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedClient {
    pub line: usize,
    pub template_id: TemplateId,
    pub path_id: PathId,
}

/// A row whose subject id disagrees with the first row of its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMismatch {
    pub line: usize,
    pub template_id: TemplateId,
    /// Subject bound at template creation (kept).
    pub expected: ClientId,
    pub found: ClientId,
}

/// A master-list row whose path id an earlier row already listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateFile {
    pub line: usize,
    pub path_id: PathId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub manifest: PathBuf,
    pub rows: usize,
    pub templates: usize,
    /// Rows dropped from their template because the file is unknown (or its
    /// subject could not be resolved).
    pub files_not_found: BTreeSet<PathId>,
    pub unresolved_clients: Vec<UnresolvedClient>,
    pub client_mismatches: Vec<ClientMismatch>,
    /// Comparison ids without a template in the protocol's metadata.
    pub unresolved_comparisons: BTreeSet<TemplateId>,
    /// Master-list rows ignored because their path id was already indexed.
    pub duplicate_files: Vec<DuplicateFile>,
}

impl LoadReport {
    pub fn new(manifest: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            ..Default::default()
        }
    }

    pub fn issue_count(&self) -> usize {
        self.files_not_found.len()
            + self.unresolved_clients.len()
            + self.client_mismatches.len()
            + self.unresolved_comparisons.len()
            + self.duplicate_files.len()
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }

    /// Emit one summary line for a load with findings.
    pub(crate) fn log_summary(&self) {
        if self.is_clean() {
            return;
        }
        tracing::warn!(
            manifest = %self.manifest.display(),
            files_not_found = self.files_not_found.len(),
            unresolved_clients = self.unresolved_clients.len(),
            client_mismatches = self.client_mismatches.len(),
            unresolved_comparisons = self.unresolved_comparisons.len(),
            duplicate_files = self.duplicate_files.len(),
            "manifest loaded with data-integrity findings"
        );
    }
}
