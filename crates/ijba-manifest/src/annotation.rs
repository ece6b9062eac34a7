//! Per-face annotations: bounding box, landmarks, yaw and attribute flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::layout::{FLAGS_LEN, GEOMETRY_LEN};

/// Image coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates or nothing.
    fn pair(x: Option<f64>, y: Option<f64>) -> Option<Self> {
        match (x, y) {
            (Some(x), Some(y)) => Some(Self { x, y }),
            _ => None,
        }
    }
}

/// Categorical/ordinal attributes as coded by NIST. Blank cells stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationFlags {
    pub forehead_visible: Option<i64>,
    pub eyes_visible: Option<i64>,
    pub nose_mouth_visible: Option<i64>,
    pub indoor: Option<i64>,
    pub gender: Option<i64>,
    pub skin_tone: Option<i64>,
    pub age: Option<i64>,
}

/// Annotation of one face observation.
///
/// The bounding box is always present. Landmarks are only reported when both of
/// their coordinates are present; a half-filled pair is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub top_left: Point,
    /// Width (`x`) and height (`y`) of the face box.
    pub size: Point,
    pub right_eye: Option<Point>,
    pub left_eye: Option<Point>,
    /// Nose base.
    pub nose: Option<Point>,
    pub yaw: Option<f64>,
    pub flags: AnnotationFlags,
}

/// One entry of [`Annotation::to_map`]. Points are `(y, x)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    Point(f64, f64),
    Scalar(f64),
    Flag(Option<i64>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AnnotationFieldError {
    /// A bounding-box cell is blank.
    Missing(&'static str),
    /// Cell at `offset` (relative to the geometry block) is not a number.
    Invalid { offset: usize, value: String },
}

const BOX_FIELDS: [&str; 4] = ["FACE_X", "FACE_Y", "FACE_WIDTH", "FACE_HEIGHT"];

impl Annotation {
    pub fn bottom_right(&self) -> Point {
        Point::new(self.top_left.x + self.size.x, self.top_left.y + self.size.y)
    }

    /// True when every landmark and the yaw angle are present.
    pub fn is_complete(&self) -> bool {
        self.right_eye.is_some() && self.left_eye.is_some() && self.nose.is_some() && self.yaw.is_some()
    }

    /// Keyed view used by downstream tooling (`topleft`, `reye`, `skin-tone`, ...).
    ///
    /// Absent landmarks are absent keys, never `None` points.
    pub fn to_map(&self) -> BTreeMap<&'static str, AnnotationValue> {
        let yx = |p: Point| AnnotationValue::Point(p.y, p.x);
        let mut map = BTreeMap::new();
        map.insert("topleft", yx(self.top_left));
        map.insert("size", yx(self.size));
        map.insert("bottomright", yx(self.bottom_right()));
        if let Some(p) = self.right_eye {
            map.insert("reye", yx(p));
        }
        if let Some(p) = self.left_eye {
            map.insert("leye", yx(p));
        }
        if let Some(p) = self.nose {
            map.insert("nose", yx(p));
        }
        if let Some(yaw) = self.yaw {
            map.insert("yaw", AnnotationValue::Scalar(yaw));
        }
        let flags = &self.flags;
        map.insert("forehead-visible", AnnotationValue::Flag(flags.forehead_visible));
        map.insert("eyes-visible", AnnotationValue::Flag(flags.eyes_visible));
        map.insert("nose-mouth-visible", AnnotationValue::Flag(flags.nose_mouth_visible));
        map.insert("indoor", AnnotationValue::Flag(flags.indoor));
        map.insert("gender", AnnotationValue::Flag(flags.gender));
        map.insert("skin-tone", AnnotationValue::Flag(flags.skin_tone));
        map.insert("age", AnnotationValue::Flag(flags.age));
        map
    }

    /// Build from the 11 geometry cells followed by the 7 flag cells.
    pub(crate) fn from_cells(geometry: &[&str], flags: &[&str]) -> Result<Self, AnnotationFieldError> {
        debug_assert_eq!(geometry.len(), GEOMETRY_LEN);
        debug_assert_eq!(flags.len(), FLAGS_LEN);

        let mut g: [Option<f64>; GEOMETRY_LEN] = [None; GEOMETRY_LEN];
        for (offset, cell) in geometry.iter().enumerate() {
            g[offset] = parse_optional(cell).map_err(|value| AnnotationFieldError::Invalid { offset, value })?;
        }

        let mut bbox = [0.0f64; 4];
        for (i, value) in g[..4].iter().enumerate() {
            bbox[i] = value.ok_or(AnnotationFieldError::Missing(BOX_FIELDS[i]))?;
        }

        let mut f: [Option<i64>; FLAGS_LEN] = [None; FLAGS_LEN];
        for (i, cell) in flags.iter().enumerate() {
            f[i] = parse_optional(cell).map_err(|value| AnnotationFieldError::Invalid {
                offset: GEOMETRY_LEN + i,
                value,
            })?;
        }

        Ok(Self {
            top_left: Point::new(bbox[0], bbox[1]),
            size: Point::new(bbox[2], bbox[3]),
            right_eye: Point::pair(g[4], g[5]),
            left_eye: Point::pair(g[6], g[7]),
            nose: Point::pair(g[8], g[9]),
            yaw: g[10],
            flags: AnnotationFlags {
                forehead_visible: f[0],
                eyes_visible: f[1],
                nose_mouth_visible: f[2],
                indoor: f[3],
                gender: f[4],
                skin_tone: f[5],
                age: f[6],
            },
        })
    }
}

/// Blank cell → `None`; otherwise the parsed value or the offending text.
pub(crate) fn parse_optional<T: std::str::FromStr>(cell: &str) -> Result<Option<T>, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse().map(Some).map_err(|_| cell.to_string())
}
