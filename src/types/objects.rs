use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ipnet::Ipv4Net;
use regex::Regex;

use super::expr::PrefixRange;
use super::statement::Action;

/// One line of a named prefix list: permit or deny a prefix range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixListLine {
    pub action: Action,
    pub range: PrefixRange,
}

/// An ordered prefix list, first match wins, default deny.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixList {
    pub name: String,
    pub lines: Vec<PrefixListLine>,
}

impl PrefixList {
    #[must_use]
    pub fn new(name: impl Into<String>, lines: Vec<PrefixListLine>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    /// Single-line permit list, the common case in tests and fixtures.
    #[must_use]
    pub fn permitting(name: impl Into<String>, range: PrefixRange) -> Self {
        Self::new(
            name,
            vec![PrefixListLine {
                action: Action::Accept,
                range,
            }],
        )
    }

    #[must_use]
    pub fn permits(&self, prefix: Ipv4Net) -> bool {
        for line in &self.lines {
            if line.range.matches(prefix) {
                return line.action == Action::Accept;
            }
        }
        false
    }
}

/// A named community list; a route matches when it carries at least one
/// listed community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityList {
    pub name: String,
    pub communities: BTreeSet<u32>,
}

impl CommunityList {
    #[must_use]
    pub fn new(name: impl Into<String>, communities: impl IntoIterator<Item = u32>) -> Self {
        Self {
            name: name.into(),
            communities: communities.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, carried: &BTreeSet<u32>) -> bool {
        !self.communities.is_disjoint(carried)
    }
}

/// One anchored single-AS pattern, the `^N_` / `_N_` / `_N$` / `^N$`
/// forms: leftmost hop, anywhere, origin, or the entire path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsPathMatch {
    LeftMost(u32),
    Include(u32),
    Origin(u32),
    Only(u32),
}

impl AsPathMatch {
    /// Parse one pattern string. Returns `None` for anything outside the
    /// four supported anchored forms.
    #[must_use]
    pub fn parse(pattern: &str) -> Option<Self> {
        let table: [(&str, fn(u32) -> AsPathMatch); 4] = [
            (r"^\^([0-9]+)_$", AsPathMatch::LeftMost),
            (r"^_([0-9]+)_$", AsPathMatch::Include),
            (r"^_([0-9]+)\$$", AsPathMatch::Origin),
            (r"^\^([0-9]+)\$$", AsPathMatch::Only),
        ];
        for (re, build) in table {
            let re = Regex::new(re).expect("pattern table regexes are valid");
            if let Some(caps) = re.captures(pattern) {
                let asn: u32 = caps[1].parse().ok()?;
                return Some(build(asn));
            }
        }
        None
    }

    #[must_use]
    pub fn matches(&self, path: &[u32]) -> bool {
        match self {
            AsPathMatch::LeftMost(asn) => path.first() == Some(asn),
            AsPathMatch::Include(asn) => path.contains(asn),
            AsPathMatch::Origin(asn) => path.last() == Some(asn),
            AsPathMatch::Only(asn) => path == [*asn],
        }
    }
}

impl fmt::Display for AsPathMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsPathMatch::LeftMost(v) => write!(f, "^{v}_"),
            AsPathMatch::Include(v) => write!(f, "_{v}_"),
            AsPathMatch::Origin(v) => write!(f, "_{v}$"),
            AsPathMatch::Only(v) => write!(f, "^{v}$"),
        }
    }
}

/// A named set of AS-path patterns; a route matches when any member does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsPathSet {
    pub name: String,
    pub members: Vec<AsPathMatch>,
}

impl AsPathSet {
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<AsPathMatch>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    #[must_use]
    pub fn matches(&self, path: &[u32]) -> bool {
        self.members.iter().any(|m| m.matches(path))
    }
}

/// The auxiliary named objects guards resolve against.
///
/// This is the name-resolution capability handed to the compiler: "does
/// an object with this name exist, and if so what is it". A reference to
/// a name absent here is tolerated (permissive default plus a warning at
/// the referencing site), never an error.
#[derive(Debug, Default, Clone)]
pub struct ObjectTable {
    prefix_lists: BTreeMap<String, PrefixList>,
    community_lists: BTreeMap<String, CommunityList>,
    as_path_sets: BTreeMap<String, AsPathSet>,
}

impl ObjectTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_prefix_list(&mut self, list: PrefixList) {
        self.prefix_lists.insert(list.name.clone(), list);
    }

    pub fn add_community_list(&mut self, list: CommunityList) {
        self.community_lists.insert(list.name.clone(), list);
    }

    pub fn add_as_path_set(&mut self, set: AsPathSet) {
        self.as_path_sets.insert(set.name.clone(), set);
    }

    #[must_use]
    pub fn prefix_list(&self, name: &str) -> Option<&PrefixList> {
        self.prefix_lists.get(name)
    }

    #[must_use]
    pub fn community_list(&self, name: &str) -> Option<&CommunityList> {
        self.community_lists.get(name)
    }

    #[must_use]
    pub fn as_path_set(&self, name: &str) -> Option<&AsPathSet> {
        self.as_path_sets.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn prefix_list_first_match_wins() {
        let list = PrefixList::new(
            "P",
            vec![
                PrefixListLine {
                    action: Action::Reject,
                    range: PrefixRange::exact(net("10.1.0.0/16")),
                },
                PrefixListLine {
                    action: Action::Accept,
                    range: PrefixRange::with_lengths(net("10.0.0.0/8"), 8..=32),
                },
            ],
        );
        assert!(!list.permits(net("10.1.0.0/16")));
        assert!(list.permits(net("10.2.0.0/16")));
        assert!(list.permits(net("10.0.0.0/8")));
    }

    #[test]
    fn prefix_list_default_deny() {
        let list = PrefixList::permitting("P", PrefixRange::exact(net("192.0.2.0/24")));
        assert!(list.permits(net("192.0.2.0/24")));
        assert!(!list.permits(net("198.51.100.0/24")));
    }

    #[test]
    fn community_list_intersection() {
        let list = CommunityList::new("C", [100, 200]);
        assert!(list.matches(&[200, 300].into_iter().collect()));
        assert!(!list.matches(&[300, 400].into_iter().collect()));
        assert!(!list.matches(&BTreeSet::new()));
    }

    #[test]
    fn as_path_pattern_forms() {
        assert_eq!(
            AsPathMatch::parse("^65100_"),
            Some(AsPathMatch::LeftMost(65100))
        );
        assert_eq!(
            AsPathMatch::parse("_65100_"),
            Some(AsPathMatch::Include(65100))
        );
        assert_eq!(
            AsPathMatch::parse("_65100$"),
            Some(AsPathMatch::Origin(65100))
        );
        assert_eq!(AsPathMatch::parse("^65100$"), Some(AsPathMatch::Only(65100)));
        assert_eq!(AsPathMatch::parse("65100"), None);
        assert_eq!(AsPathMatch::parse("^65100-65200_"), None);
    }

    #[test]
    fn as_path_match_semantics() {
        let path = [65001, 65002, 65003];
        assert!(AsPathMatch::LeftMost(65001).matches(&path));
        assert!(!AsPathMatch::LeftMost(65002).matches(&path));
        assert!(AsPathMatch::Include(65002).matches(&path));
        assert!(AsPathMatch::Origin(65003).matches(&path));
        assert!(!AsPathMatch::Only(65001).matches(&path));
        assert!(AsPathMatch::Only(65001).matches(&[65001]));
    }

    #[test]
    fn as_path_pattern_display_round_trip() {
        for p in [
            AsPathMatch::LeftMost(65100),
            AsPathMatch::Include(65100),
            AsPathMatch::Origin(65100),
            AsPathMatch::Only(65100),
        ] {
            assert_eq!(AsPathMatch::parse(&p.to_string()), Some(p));
        }
    }

    #[test]
    fn object_table_lookup() {
        let mut table = ObjectTable::new();
        table.add_prefix_list(PrefixList::permitting(
            "P",
            PrefixRange::exact(net("192.0.2.0/24")),
        ));
        table.add_community_list(CommunityList::new("C", [100]));
        table.add_as_path_set(AsPathSet::new("A", vec![AsPathMatch::Origin(65000)]));
        assert!(table.prefix_list("P").is_some());
        assert!(table.prefix_list("Q").is_none());
        assert!(table.community_list("C").is_some());
        assert!(table.as_path_set("A").is_some());
    }
}
