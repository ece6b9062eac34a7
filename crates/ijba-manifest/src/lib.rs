//! IJB-A manifest records
//!
//! Typed, in-memory records for the CSV manifests distributed with the IJB-A
//! benchmark, plus the line parsers that produce them:
//!
//! - [`FileRecord`]: one face observation (path, media, sighting, frame)
//! - [`Annotation`]: bounding box, optional landmarks, yaw and attribute flags
//! - [`ManifestRow`]: a template-membership row (`template, subject, file...`)
//! - [`ComparisonPair`]: one `(enroll, probe)` line of a verification list
//!
//! Parsing is strict: a row with the wrong column count or a missing bounding
//! box fails the whole manifest with a [`ManifestError`] naming file and line.

pub mod annotation;
pub mod error;
pub mod layout;
pub mod parser;
pub mod record;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use annotation::{Annotation, AnnotationFlags, AnnotationValue, Point};
pub use error::{ManifestError, ManifestResult};
pub use layout::ManifestLayout;
pub use parser::{
    parse_comparison_line, read_comparisons, read_manifest, ComparisonPair, ManifestRow,
    RecordParser,
};
pub use record::FileRecord;

/// Subject identifier (`SUBJECT_ID` column).
pub type ClientId = u32;
/// Source image or video identifier (`MEDIA_ID` column).
pub type MediaId = u64;
/// Disambiguates several faces inside one media item.
pub type SightingId = u32;
/// Video frame number; stills carry none.
pub type FrameNumber = u32;

// ============================================================================
// Template identifiers
// ============================================================================

/// Template identifier.
///
/// Training templates and protocol (gallery/probe/verify) templates may reuse the
/// same bare number for different bundles, so training ids carry their own tag and
/// never compare equal to a protocol id. The textual form of a training id is the
/// number prefixed with `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TemplateId {
    Numeric(u64),
    Train(u64),
}

impl TemplateId {
    /// The bare number as written in the manifest.
    pub fn raw(self) -> u64 {
        match self {
            TemplateId::Numeric(id) | TemplateId::Train(id) => id,
        }
    }

    pub fn is_train(self) -> bool {
        matches!(self, TemplateId::Train(_))
    }
}

impl From<u64> for TemplateId {
    fn from(id: u64) -> Self {
        TemplateId::Numeric(id)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::Numeric(id) => write!(f, "{id}"),
            TemplateId::Train(id) => write!(f, "T{id}"),
        }
    }
}

impl FromStr for TemplateId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix('T') {
            Some(rest) => rest.parse().map(TemplateId::Train),
            None => s.parse().map(TemplateId::Numeric),
        }
    }
}

// ============================================================================
// Path identifiers
// ============================================================================

/// Identity of a [`FileRecord`] inside the benchmark: the manifest path (with its
/// extension) plus the sighting id.
///
/// The same physical image may appear under several sighting ids; each of those is
/// a distinct record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId {
    pub path: String,
    pub sighting_id: Option<SightingId>,
}

impl PathId {
    pub fn new(path: impl Into<String>, sighting_id: Option<SightingId>) -> Self {
        Self {
            path: path.into(),
            sighting_id,
        }
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sighting_id {
            Some(sighting) => write!(f, "{}-{}", self.path, sighting),
            None => write!(f, "{}-", self.path),
        }
    }
}
