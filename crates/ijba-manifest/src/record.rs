use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Annotation, ClientId, FrameNumber, MediaId, PathId, SightingId};

/// One face observation: a media item (image or video frame) plus the sighting
/// that singles out one face inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Relative path without the filename extension.
    pub path: String,
    /// Filename extension including the leading dot (may be empty).
    pub extension: String,
    pub client_id: ClientId,
    pub media_id: MediaId,
    pub sighting_id: Option<SightingId>,
    pub frame: Option<FrameNumber>,
    pub annotation: Option<Annotation>,
}

impl FileRecord {
    /// Split a manifest `FILE` cell into stem and extension.
    ///
    /// Only the final component is inspected, so dots in directory names stay in the
    /// stem.
    pub fn split_extension(file: &str) -> (&str, &str) {
        let name_start = file.rfind('/').map_or(0, |i| i + 1);
        match file[name_start..].rfind('.') {
            Some(dot) if dot > 0 => file.split_at(name_start + dot),
            _ => (file, ""),
        }
    }

    pub fn path_id(&self) -> PathId {
        PathId::new(format!("{}{}", self.path, self.extension), self.sighting_id)
    }

    /// File name relative to the database root.
    ///
    /// With `add_sighting_id`, the sighting is appended to the stem
    /// (`frame/123_00042-2.png`) so that several faces of one image map to distinct
    /// names. Without it, the original image name is produced.
    pub fn file_name(&self, extension: &str, add_sighting_id: bool) -> String {
        match (add_sighting_id, self.sighting_id) {
            (true, Some(sighting)) => format!("{}-{}{}", self.path, sighting, extension),
            _ => format!("{}{}", self.path, extension),
        }
    }

    /// `{directory}/{file_name}`; an empty directory yields the relative name.
    pub fn make_path(
        &self,
        directory: impl AsRef<Path>,
        extension: &str,
        add_sighting_id: bool,
    ) -> PathBuf {
        directory
            .as_ref()
            .join(self.file_name(extension, add_sighting_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sighting_id: Option<SightingId>) -> FileRecord {
        FileRecord {
            path: "frame/30270_00600".to_string(),
            extension: ".png".to_string(),
            client_id: 1,
            media_id: 30270,
            sighting_id,
            frame: Some(600),
            annotation: None,
        }
    }

    #[test]
    fn split_extension_keeps_dotted_directories() {
        assert_eq!(FileRecord::split_extension("img/1.jpg"), ("img/1", ".jpg"));
        assert_eq!(FileRecord::split_extension("a.b/noext"), ("a.b/noext", ""));
        assert_eq!(FileRecord::split_extension("a.b/.hidden"), ("a.b/.hidden", ""));
        assert_eq!(FileRecord::split_extension("x.tar.gz"), ("x.tar", ".gz"));
    }

    #[test]
    fn make_path_with_and_without_sighting() {
        let f = record(Some(2));
        assert_eq!(
            f.make_path("/data", ".png", true),
            PathBuf::from("/data/frame/30270_00600-2.png")
        );
        assert_eq!(
            f.make_path("/data", ".png", false),
            PathBuf::from("/data/frame/30270_00600.png")
        );
        assert_eq!(f.make_path("", "", true), PathBuf::from("frame/30270_00600-2"));
    }

    #[test]
    fn blank_sighting_is_not_rendered() {
        let f = record(None);
        assert_eq!(f.file_name(".png", true), "frame/30270_00600.png");
    }

    #[test]
    fn path_id_includes_extension() {
        assert_eq!(
            record(Some(4)).path_id(),
            PathId::new("frame/30270_00600.png", Some(4))
        );
    }
}
