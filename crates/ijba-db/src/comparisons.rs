//! Enroll/probe pairing tables of the verification protocols.

use ahash::AHashMap;
use ijba_manifest::{read_comparisons, ComparisonPair, TemplateId};
use std::path::{Path, PathBuf};

use crate::index::TemplateIndex;
use crate::report::LoadReport;
use crate::{DbError, DbResult};

/// Probe lists keyed by enroll template, in first-seen enroll order.
///
/// Repeated `(enroll, probe)` lines are kept as repeated probe entries.
#[derive(Debug, Default)]
pub struct ComparisonTable {
    enrolls: Vec<(TemplateId, Vec<TemplateId>)>,
    by_enroll: AHashMap<TemplateId, usize>,
    pairs: usize,
    report: LoadReport,
}

impl ComparisonTable {
    pub fn from_pairs<I>(manifest: impl Into<PathBuf>, pairs: I) -> Self
    where
        I: IntoIterator<Item = ComparisonPair>,
    {
        let mut table = Self {
            report: LoadReport::new(manifest),
            ..Default::default()
        };
        for pair in pairs {
            table.push(TemplateId::Numeric(pair.enroll), TemplateId::Numeric(pair.probe));
        }
        table.report.rows = table.pairs;
        table
    }

    fn push(&mut self, enroll: TemplateId, probe: TemplateId) {
        let idx = match self.by_enroll.get(&enroll) {
            Some(&idx) => idx,
            None => {
                self.enrolls.push((enroll, Vec::new()));
                self.by_enroll.insert(enroll, self.enrolls.len() - 1);
                self.enrolls.len() - 1
            }
        };
        self.enrolls[idx].1.push(probe);
        self.pairs += 1;
    }

    pub fn manifest(&self) -> &Path {
        &self.report.manifest
    }

    pub fn enroll_ids(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.enrolls.iter().map(|(id, _)| *id)
    }

    pub fn contains_enroll(&self, id: TemplateId) -> bool {
        self.by_enroll.contains_key(&id)
    }

    /// Probe list of one enroll template; empty for unknown ids.
    pub fn probes_for(&self, enroll: TemplateId) -> &[TemplateId] {
        self.by_enroll
            .get(&enroll)
            .map_or(&[][..], |&idx| self.enrolls[idx].1.as_slice())
    }

    /// Every probe entry of every enroll template, in table order.
    pub fn all_probes(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.enrolls.iter().flat_map(|(_, probes)| probes.iter().copied())
    }

    pub fn enroll_count(&self) -> usize {
        self.enrolls.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Record every referenced id missing from `templates`. Under `strict`, the
    /// first such id fails the load instead.
    fn resolve_against(
        &mut self,
        pairs: &[ComparisonPair],
        templates: &TemplateIndex,
        strict: bool,
    ) -> DbResult<()> {
        for pair in pairs {
            for raw in [pair.enroll, pair.probe] {
                let id = TemplateId::Numeric(raw);
                if templates.contains(id) {
                    continue;
                }
                if strict {
                    return Err(DbError::UnresolvedComparison {
                        manifest: self.report.manifest.clone(),
                        line: pair.line,
                        template_id: id,
                    });
                }
                self.report.unresolved_comparisons.insert(id);
            }
        }
        Ok(())
    }
}

/// Parse a comparison list and check it against the protocol's templates.
pub fn load_comparisons(
    path: &Path,
    templates: &TemplateIndex,
    strict: bool,
) -> DbResult<ComparisonTable> {
    let pairs = read_comparisons(path)?;
    let mut table = ComparisonTable::from_pairs(path, pairs.iter().copied());
    table.resolve_against(&pairs, templates, strict)?;
    table.report.templates = table.enroll_count();
    table.report.log_summary();
    tracing::debug!(
        manifest = %path.display(),
        pairs = table.pair_count(),
        enrolls = table.enroll_count(),
        "comparison table built"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TemplateIndexBuilder;
    use crate::protocol::Role;
    use ijba_manifest::{ManifestLayout, RecordParser};
    use std::io::Write;

    fn pair(line: usize, enroll: u64, probe: u64) -> ComparisonPair {
        ComparisonPair { line, enroll, probe }
    }

    fn templates(ids: &[u64]) -> TemplateIndex {
        let parser = RecordParser::new("verify_metadata_1.csv", ManifestLayout::Current);
        let mut builder = TemplateIndexBuilder::new("verify_metadata_1.csv", Role::Enroll, None);
        for (i, id) in ids.iter().enumerate() {
            let line = format!("{id},1,img/{id}.jpg,{id},0,,1,2,3,4,,,,,,,,,,,,,,,");
            builder.push(parser.parse_line(i + 2, &line).unwrap());
        }
        builder.finish()
    }

    #[test]
    fn groups_probes_by_enroll_without_dedup() {
        let table = ComparisonTable::from_pairs(
            "verify_comparisons_1.csv",
            [pair(1, 100, 200), pair(2, 101, 200), pair(3, 100, 201), pair(4, 100, 200)],
        );
        assert_eq!(table.enroll_count(), 2);
        assert_eq!(table.pair_count(), 4);
        assert_eq!(
            table.enroll_ids().collect::<Vec<_>>(),
            vec![TemplateId::Numeric(100), TemplateId::Numeric(101)]
        );
        assert_eq!(
            table.probes_for(TemplateId::Numeric(100)),
            &[TemplateId::Numeric(200), TemplateId::Numeric(201), TemplateId::Numeric(200)]
        );
        assert!(table.probes_for(TemplateId::Numeric(999)).is_empty());
        assert!(table.probes_for(TemplateId::Train(100)).is_empty());
        assert_eq!(table.all_probes().count(), 4);
    }

    #[test]
    fn unresolved_ids_are_reported_or_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verify_comparisons_1.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "100,200").unwrap();
        writeln!(file, "100,999").unwrap();
        drop(file);

        let index = templates(&[100, 200]);
        let table = load_comparisons(&path, &index, false).unwrap();
        assert_eq!(table.pair_count(), 2);
        assert!(table
            .report()
            .unresolved_comparisons
            .contains(&TemplateId::Numeric(999)));
        // Unresolved ids stay in the table.
        assert_eq!(table.probes_for(TemplateId::Numeric(100)).len(), 2);

        match load_comparisons(&path, &index, true) {
            Err(DbError::UnresolvedComparison { line, template_id, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(template_id, TemplateId::Numeric(999));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn malformed_pair_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verify_comparisons_1.csv");
        std::fs::write(&path, "100,200\n100,200,300\n").unwrap();
        let err = load_comparisons(&path, &templates(&[100, 200]), false).unwrap_err();
        assert!(matches!(
            err,
            DbError::Manifest(ijba_manifest::ManifestError::MalformedRecord { line: 2, .. })
        ));
    }
}
