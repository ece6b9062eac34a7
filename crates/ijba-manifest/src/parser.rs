//! Line parsers for template-membership and comparison manifests.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::annotation::{parse_optional, Annotation, AnnotationFieldError};
use crate::layout::{self, ManifestLayout};
use crate::{ClientId, FileRecord, ManifestError, ManifestResult};

/// One template-membership row.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    /// 1-based line number (the header is line 1).
    pub line: usize,
    /// Bare template number; tagging (train vs protocol) is up to the caller.
    pub template_id: u64,
    pub client_id: ClientId,
    pub record: FileRecord,
}

/// One `(enroll, probe)` line of a verification comparison list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonPair {
    pub line: usize,
    pub enroll: u64,
    pub probe: u64,
}

/// Parser bound to one manifest file (for error reporting) and one layout.
#[derive(Debug, Clone)]
pub struct RecordParser {
    file: PathBuf,
    layout: ManifestLayout,
}

impl RecordParser {
    pub fn new(file: impl Into<PathBuf>, layout: ManifestLayout) -> Self {
        Self {
            file: file.into(),
            layout,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Parse a whole manifest body. The first line is a header and is skipped;
    /// blank lines are ignored.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> ManifestResult<Vec<ManifestRow>> {
        let mut rows = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| self.io_error(source))?;
            if idx == 0 || line.trim().is_empty() {
                continue;
            }
            rows.push(self.parse_line(idx + 1, &line)?);
        }
        Ok(rows)
    }

    pub fn parse_line(&self, line_no: usize, line: &str) -> ManifestResult<ManifestRow> {
        let cells: Vec<&str> = line.trim_end().split(',').collect();
        let expected = self.layout.columns();
        if cells.len() != expected {
            return Err(ManifestError::MalformedRecord {
                file: self.file.clone(),
                line: line_no,
                expected,
                found: cells.len(),
            });
        }

        let template_id: u64 = self.required(line_no, &cells, layout::TEMPLATE_ID)?;
        let client_id: ClientId = self.required(line_no, &cells, layout::SUBJECT_ID)?;
        let media_id = self.required(line_no, &cells, layout::MEDIA_ID)?;
        let sighting_id = self.optional(line_no, &cells, layout::SIGHTING_ID)?;
        let frame = self.optional(line_no, &cells, layout::FRAME)?;

        let geometry = &cells[layout::GEOMETRY..layout::GEOMETRY + layout::GEOMETRY_LEN];
        let flags = &cells[layout::FLAGS..layout::FLAGS + layout::FLAGS_LEN];
        let annotation = Annotation::from_cells(geometry, flags).map_err(|err| match err {
            AnnotationFieldError::Missing(field) => ManifestError::IncompleteAnnotation {
                file: self.file.clone(),
                line: line_no,
                field,
            },
            AnnotationFieldError::Invalid { offset, value } => ManifestError::InvalidField {
                file: self.file.clone(),
                line: line_no,
                column: layout::GEOMETRY + offset,
                value,
            },
        })?;

        let (path, extension) = FileRecord::split_extension(cells[layout::FILE].trim());
        Ok(ManifestRow {
            line: line_no,
            template_id,
            client_id,
            record: FileRecord {
                path: path.to_string(),
                extension: extension.to_string(),
                client_id,
                media_id,
                sighting_id,
                frame,
                annotation: Some(annotation),
            },
        })
    }

    fn required<T: FromStr>(&self, line: usize, cells: &[&str], column: usize) -> ManifestResult<T> {
        match self.optional(line, cells, column)? {
            Some(value) => Ok(value),
            None => Err(self.invalid(line, column, cells[column])),
        }
    }

    fn optional<T: FromStr>(&self, line: usize, cells: &[&str], column: usize) -> ManifestResult<Option<T>> {
        parse_optional(cells[column]).map_err(|value| self.invalid(line, column, &value))
    }

    fn invalid(&self, line: usize, column: usize, value: &str) -> ManifestError {
        ManifestError::InvalidField {
            file: self.file.clone(),
            line,
            column,
            value: value.to_string(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> ManifestError {
        ManifestError::Io {
            path: self.file.clone(),
            source,
        }
    }
}

/// Read and parse a template-membership manifest from disk.
pub fn read_manifest(path: &Path, layout: ManifestLayout) -> ManifestResult<Vec<ManifestRow>> {
    let parser = RecordParser::new(path, layout);
    let file = File::open(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parser.parse_reader(BufReader::new(file))
}

/// Parse one line of a comparison list: exactly two integer template ids.
pub fn parse_comparison_line(file: &Path, line_no: usize, line: &str) -> ManifestResult<ComparisonPair> {
    let cells: Vec<&str> = line.trim_end().split(',').collect();
    if cells.len() != 2 {
        return Err(ManifestError::MalformedRecord {
            file: file.to_path_buf(),
            line: line_no,
            expected: 2,
            found: cells.len(),
        });
    }
    let id = |column: usize| -> ManifestResult<u64> {
        let cell = cells[column].trim();
        cell.parse().map_err(|_| ManifestError::InvalidField {
            file: file.to_path_buf(),
            line: line_no,
            column,
            value: cell.to_string(),
        })
    };
    Ok(ComparisonPair {
        line: line_no,
        enroll: id(0)?,
        probe: id(1)?,
    })
}

/// Parse a header-less comparison list.
pub fn parse_comparisons<R: BufRead>(file: &Path, reader: R) -> ManifestResult<Vec<ComparisonPair>> {
    let mut pairs = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ManifestError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        pairs.push(parse_comparison_line(file, idx + 1, &line)?);
    }
    Ok(pairs)
}

/// Read and parse a comparison list from disk.
pub fn read_comparisons(path: &Path) -> ManifestResult<Vec<ComparisonPair>> {
    let file = File::open(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_comparisons(path, BufReader::new(file))
}
