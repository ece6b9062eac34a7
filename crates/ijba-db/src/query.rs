//! Query parameters for [`crate::Database::objects`].

use ijba_manifest::{FileRecord, FrameNumber, MediaId, TemplateId};
use std::collections::BTreeSet;

use crate::protocol::{parse_groups, parse_purposes, Group, Protocol, Purpose};
use crate::DbResult;

/// Unvalidated object query, as a caller would phrase it.
///
/// Group and purpose names are kept as strings until [`ObjectQuery::resolve`] so
/// that an unknown name is reported with the allowed set. Empty group or purpose
/// lists select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectQuery {
    pub protocol: String,
    pub groups: Vec<String>,
    pub purposes: Vec<String>,
    /// Restrict dev queries to these models. Ignored for the world group.
    pub model_ids: Option<Vec<TemplateId>>,
    pub media_ids: Option<BTreeSet<MediaId>>,
    /// Keep only video frames with these numbers; still images are dropped.
    pub frames: Option<BTreeSet<FrameNumber>>,
}

impl ObjectQuery {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            ..Default::default()
        }
    }

    pub fn groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn purposes<I, S>(mut self, purposes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.purposes = purposes.into_iter().map(Into::into).collect();
        self
    }

    pub fn model_ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TemplateId>,
    {
        self.model_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn media_ids(mut self, ids: impl IntoIterator<Item = MediaId>) -> Self {
        self.media_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn frames(mut self, frames: impl IntoIterator<Item = FrameNumber>) -> Self {
        self.frames = Some(frames.into_iter().collect());
        self
    }

    pub(crate) fn resolve(&self) -> DbResult<ResolvedQuery<'_>> {
        Ok(ResolvedQuery {
            groups: parse_groups(&self.groups)?,
            purposes: parse_purposes(&self.purposes)?,
            protocol: Protocol::parse_param(&self.protocol)?,
            model_ids: self.model_ids.as_deref(),
            media_ids: self.media_ids.as_ref(),
            frames: self.frames.as_ref(),
        })
    }
}

/// Validated form of an [`ObjectQuery`].
#[derive(Debug)]
pub(crate) struct ResolvedQuery<'q> {
    pub protocol: Protocol,
    pub groups: BTreeSet<Group>,
    pub purposes: BTreeSet<Purpose>,
    pub model_ids: Option<&'q [TemplateId]>,
    pub media_ids: Option<&'q BTreeSet<MediaId>>,
    pub frames: Option<&'q BTreeSet<FrameNumber>>,
}

impl ResolvedQuery<'_> {
    pub fn wants(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }

    pub fn wants_purpose(&self, purpose: Purpose) -> bool {
        self.purposes.contains(&purpose)
    }

    pub fn keeps(&self, file: &FileRecord) -> bool {
        let media_ok = self
            .media_ids
            .map_or(true, |ids| ids.contains(&file.media_id));
        let frame_ok = self
            .frames
            .map_or(true, |frames| file.frame.is_some_and(|f| frames.contains(&f)));
        media_ok && frame_ok
    }
}
