//! Column layout of the template-membership manifests.
//!
//! ```text
//!  0 TEMPLATE_ID        9 FACE_HEIGHT       18 EYES_VISIBLE
//!  1 SUBJECT_ID        10 RIGHT_EYE_X       19 NOSE_MOUTH_VISIBLE
//!  2 FILE              11 RIGHT_EYE_Y       20 INDOOR
//!  3 MEDIA_ID          12 LEFT_EYE_X        21 GENDER
//!  4 SIGHTING_ID       13 LEFT_EYE_Y        22 SKIN_TONE
//!  5 FRAME             14 NOSE_BASE_X       23 AGE
//!  6 FACE_X            15 NOSE_BASE_Y       24 FACIAL_HAIR (current layout only, ignored)
//!  7 FACE_Y            16 FACE_YAW
//!  8 FACE_WIDTH        17 FOREHEAD_VISIBLE
//! ```

use serde::{Deserialize, Serialize};

pub const TEMPLATE_ID: usize = 0;
pub const SUBJECT_ID: usize = 1;
pub const FILE: usize = 2;
pub const MEDIA_ID: usize = 3;
pub const SIGHTING_ID: usize = 4;
pub const FRAME: usize = 5;
/// First of the 11 geometric columns (box, eyes, nose, yaw).
pub const GEOMETRY: usize = 6;
pub const GEOMETRY_LEN: usize = 11;
/// First of the 7 attribute flag columns.
pub const FLAGS: usize = GEOMETRY + GEOMETRY_LEN;
pub const FLAGS_LEN: usize = 7;

/// Manifest layout version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestLayout {
    /// 25 columns; the trailing facial-hair column is skipped.
    #[default]
    Current,
    /// 24 columns, as in the older metadata exports without facial hair.
    Legacy,
}

impl ManifestLayout {
    pub const fn columns(self) -> usize {
        match self {
            ManifestLayout::Current => 25,
            ManifestLayout::Legacy => 24,
        }
    }
}
