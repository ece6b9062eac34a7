//! IJB-A protocol database.
//!
//! Answers benchmark queries (clients, model ids, files, file sets, comparison
//! pairs) over the NIST-distributed CSV manifests of the IJB-A corpus:
//!
//! ```text
//!   ObjectQuery ──► Database ──► protocol resolver ──► manifest path
//!                       │
//!                       ▼
//!                  QueryCache ──miss──► RecordParser ──► TemplateIndexBuilder
//!                       │                                  (+ MasterFileIndex)
//!                       ▼
//!                 ComparisonTable (compare protocols only)
//! ```
//!
//! ## Protocol families
//!
//! - **search_split1..10**: closed-set 1:N identification. Gallery templates are the
//!   models; every model shares one probe pool.
//! - **compare_split1..10**: 1:1 verification. Enroll and probe templates come from
//!   one metadata manifest; a comparison list assigns probes to each model.
//!
//! Parsed manifests are cached per [`Database`] and never re-read until
//! [`Database::reset_cache`]. Integrity gaps in the NIST lists are collected in
//! [`LoadReport`]s rather than failing the load.

pub mod cache;
pub mod comparisons;
pub mod config;
pub mod database;
pub mod error;
pub mod index;
pub mod protocol;
pub mod query;
pub mod report;


pub use cache::{CacheKey, CacheStats, LoadCache, QueryCache};
pub use comparisons::{load_comparisons, ComparisonTable};
pub use config::{CacheKeyMode, DatabaseConfig};
pub use database::Database;
pub use error::{DbError, DbResult};
pub use index::{load_template_index, MasterFileIndex, Template, TemplateIndex, TemplateIndexBuilder};
pub use protocol::{
    parse_groups, parse_purposes, resolve_comparisons, resolve_manifest, Group, Protocol,
    ProtocolFamily, Purpose, Role,
};
pub use query::ObjectQuery;
pub use report::{ClientMismatch, DuplicateFile, LoadReport, UnresolvedClient};

pub use ijba_manifest as manifest;
pub use ijba_manifest::{Annotation, ClientId, FileRecord, ManifestLayout, PathId, TemplateId};
