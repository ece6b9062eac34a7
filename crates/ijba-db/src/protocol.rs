//! Protocol names and manifest resolution.
//!
//! IJB-A ships 20 protocols: ten randomized splits of the 1:N `search` task and
//! the same ten splits of the 1:1 `compare` task. Resolution from a protocol and a
//! role to a manifest is pure; callers join the result onto their data root.
//!
//! | role          | `search_split{n}`              | `compare_split{n}`                |
//! |---------------|--------------------------------|-----------------------------------|
//! | train         | `split{n}/train_{n}.csv`       | `split{n}/train_{n}.csv`          |
//! | enroll        | `split{n}/search_gallery_{n}.csv` | `split{n}/verify_metadata_{n}.csv` |
//! | probe         | `split{n}/search_probe_{n}.csv`   | `split{n}/verify_metadata_{n}.csv` |
//! | comparisons   | n/a                            | `split{n}/verify_comparisons_{n}.csv` |

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DbError, DbResult};

pub const SPLITS: RangeInclusive<u8> = 1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolFamily {
    /// Closed-set 1:N identification: a gallery and one shared probe pool.
    Search,
    /// 1:1 verification: explicit enroll/probe template pairs.
    Compare,
}

impl ProtocolFamily {
    pub fn prefix(self) -> &'static str {
        match self {
            ProtocolFamily::Search => "search",
            ProtocolFamily::Compare => "compare",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Protocol {
    family: ProtocolFamily,
    split: u8,
}

impl Protocol {
    pub fn new(family: ProtocolFamily, split: u8) -> DbResult<Self> {
        if !SPLITS.contains(&split) {
            return Err(DbError::UnknownProtocol(format!("{}_split{split}", family.prefix())));
        }
        Ok(Self { family, split })
    }

    pub fn search(split: u8) -> DbResult<Self> {
        Self::new(ProtocolFamily::Search, split)
    }

    pub fn compare(split: u8) -> DbResult<Self> {
        Self::new(ProtocolFamily::Compare, split)
    }

    /// All 20 protocols, search splits first.
    pub fn all() -> Vec<Protocol> {
        [ProtocolFamily::Search, ProtocolFamily::Compare]
            .into_iter()
            .flat_map(|family| SPLITS.map(move |split| Protocol { family, split }))
            .collect()
    }

    pub fn family(self) -> ProtocolFamily {
        self.family
    }

    pub fn split(self) -> u8 {
        self.split
    }

    pub fn is_search(self) -> bool {
        self.family == ProtocolFamily::Search
    }

    pub fn name(self) -> String {
        self.to_string()
    }

    /// Manifest for `role`, relative to the family's set directory.
    pub fn manifest(self, role: Role) -> PathBuf {
        let n = self.split;
        let file = match (self.family, role) {
            (_, Role::Train) => format!("train_{n}.csv"),
            (ProtocolFamily::Search, Role::Enroll) => format!("search_gallery_{n}.csv"),
            (ProtocolFamily::Search, Role::Probe) => format!("search_probe_{n}.csv"),
            (ProtocolFamily::Compare, Role::Enroll | Role::Probe) => {
                format!("verify_metadata_{n}.csv")
            }
        };
        self.split_dir().join(file)
    }

    /// Comparison list; only the compare family has one.
    pub fn comparisons(self) -> Option<PathBuf> {
        match self.family {
            ProtocolFamily::Search => None,
            ProtocolFamily::Compare => Some(
                self.split_dir()
                    .join(format!("verify_comparisons_{}.csv", self.split)),
            ),
        }
    }

    fn split_dir(self) -> PathBuf {
        PathBuf::from(format!("split{}", self.split))
    }

    /// Parse a protocol given as a query parameter. Unknown names are caller
    /// errors and report the allowed set.
    pub fn parse_param(name: &str) -> DbResult<Self> {
        name.parse()
            .map_err(|_| DbError::invalid("protocol", name, Protocol::all()))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_split{}", self.family.prefix(), self.split)
    }
}

impl FromStr for Protocol {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || DbError::UnknownProtocol(s.to_string());
        let (family, split) = if let Some(rest) = s.strip_prefix("search_split") {
            (ProtocolFamily::Search, rest)
        } else if let Some(rest) = s.strip_prefix("compare_split") {
            (ProtocolFamily::Compare, rest)
        } else {
            return Err(unknown());
        };
        // Reject "01", "+1" and friends so that names round-trip.
        if split.is_empty() || split.starts_with('0') || !split.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        let split: u8 = split.parse().map_err(|_| unknown())?;
        Protocol::new(family, split).map_err(|_| unknown())
    }
}

/// Resolve a protocol name and role to its relative manifest path.
pub fn resolve_manifest(protocol: &str, role: Role) -> DbResult<PathBuf> {
    Ok(protocol.parse::<Protocol>()?.manifest(role))
}

/// Resolve a compare protocol to its comparison list.
pub fn resolve_comparisons(protocol: &str) -> DbResult<PathBuf> {
    let parsed: Protocol = protocol.parse()?;
    parsed
        .comparisons()
        .ok_or_else(|| DbError::invalid("protocol", protocol, Protocol::all().into_iter().filter(|p| !p.is_search())))
}

// ============================================================================
// Groups, purposes and roles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Training partition.
    World,
    /// Evaluation partition.
    Dev,
}

impl Group {
    pub const ALL: [Group; 2] = [Group::World, Group::Dev];

    pub fn as_str(self) -> &'static str {
        match self {
            Group::World => "world",
            Group::Dev => "dev",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Enroll,
    Probe,
}

impl Purpose {
    pub const ALL: [Purpose; 2] = [Purpose::Enroll, Purpose::Probe];

    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Enroll => "enroll",
            Purpose::Probe => "probe",
        }
    }
}

/// Which manifest of a protocol a template comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Train,
    Enroll,
    Probe,
}

impl From<Purpose> for Role {
    fn from(purpose: Purpose) -> Self {
        match purpose {
            Purpose::Enroll => Role::Enroll,
            Purpose::Probe => Role::Probe,
        }
    }
}

macro_rules! str_enum {
    ($ty:ty, $param:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DbError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| DbError::invalid($param, s, <$ty>::ALL))
            }
        }
    };
}

str_enum!(Group, "group");
str_enum!(Purpose, "purpose");

/// Normalize group names into a set. An empty input selects every group.
pub fn parse_groups<I, S>(values: I) -> DbResult<BTreeSet<Group>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set = values
        .into_iter()
        .map(|v| v.as_ref().parse())
        .collect::<DbResult<BTreeSet<Group>>>()?;
    Ok(if set.is_empty() { Group::ALL.into() } else { set })
}

/// Normalize purpose names into a set. An empty input selects every purpose.
pub fn parse_purposes<I, S>(values: I) -> DbResult<BTreeSet<Purpose>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set = values
        .into_iter()
        .map(|v| v.as_ref().parse())
        .collect::<DbResult<BTreeSet<Purpose>>>()?;
    Ok(if set.is_empty() { Purpose::ALL.into() } else { set })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::Path;

    #[test]
    fn twenty_protocols() {
        let all = Protocol::all();
        assert_eq!(all.len(), 20);
        assert_eq!(all[0].name(), "search_split1");
        assert_eq!(all[19].name(), "compare_split10");
        for p in &all {
            assert_eq!(p.name().parse::<Protocol>().unwrap(), *p);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        for name in ["split1", "search_split0", "search_split11", "compare_split01", "search_split", "search_split1x", ""] {
            assert!(
                matches!(name.parse::<Protocol>(), Err(DbError::UnknownProtocol(_))),
                "{name} should be rejected"
            );
        }
        assert!(matches!(
            Protocol::parse_param("nope"),
            Err(DbError::InvalidParameter { parameter: "protocol", .. })
        ));
    }

    #[test]
    fn manifest_resolution() {
        assert_eq!(
            resolve_manifest("search_split3", Role::Train).unwrap(),
            Path::new("split3/train_3.csv")
        );
        assert_eq!(
            resolve_manifest("compare_split3", Role::Train).unwrap(),
            Path::new("split3/train_3.csv")
        );
        assert_eq!(
            resolve_manifest("search_split10", Role::Enroll).unwrap(),
            Path::new("split10/search_gallery_10.csv")
        );
        assert_eq!(
            resolve_manifest("search_split2", Role::Probe).unwrap(),
            Path::new("split2/search_probe_2.csv")
        );
        for role in [Role::Enroll, Role::Probe] {
            assert_eq!(
                resolve_manifest("compare_split7", role).unwrap(),
                Path::new("split7/verify_metadata_7.csv")
            );
        }
        assert_eq!(
            resolve_comparisons("compare_split7").unwrap(),
            Path::new("split7/verify_comparisons_7.csv")
        );
        assert!(resolve_comparisons("search_split7").is_err());
        assert!(matches!(
            resolve_manifest("bogus", Role::Train),
            Err(DbError::UnknownProtocol(_))
        ));
    }

    #[test]
    fn group_and_purpose_parsing() {
        let none: [&str; 0] = [];
        assert_eq!(parse_groups(none).unwrap().len(), 2);
        assert_eq!(
            parse_groups(["dev"]).unwrap(),
            BTreeSet::from([Group::Dev])
        );
        match parse_groups(["dev", "eval"]) {
            Err(DbError::InvalidParameter { parameter, value, allowed }) => {
                assert_eq!(parameter, "group");
                assert_eq!(value, "eval");
                assert_eq!(allowed, vec!["world", "dev"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(
            parse_purposes(["probe", "probe"]).unwrap(),
            BTreeSet::from([Purpose::Probe])
        );
        assert!(parse_purposes(["train"]).is_err());
    }

    proptest! {
        #[test]
        fn parsed_names_round_trip(name in "(search|compare)_split[0-9]{1,3}") {
            if let Ok(protocol) = name.parse::<Protocol>() {
                prop_assert_eq!(protocol.name(), name);
                prop_assert!(SPLITS.contains(&protocol.split()));
            }
        }

        #[test]
        fn every_split_resolves_inside_its_folder(split in 1u8..=10) {
            for protocol in [Protocol::search(split).unwrap(), Protocol::compare(split).unwrap()] {
                for role in [Role::Train, Role::Enroll, Role::Probe] {
                    let dir = format!("split{split}");
                    prop_assert!(protocol.manifest(role).starts_with(&dir));
                }
            }
        }
    }
}
