use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Dot-separated hierarchical sequence key, e.g. `"1.2.10"`.
///
/// Ordering is segment-wise: two numeric segments compare as numbers
/// (`"1.9" < "1.10"`), anything else compares as text, and a strict prefix
/// sorts before its extensions. Numerically equal segments with different
/// spelling (`"02"` vs `"2"`) fall back to their text so the order stays total
/// and every subtree occupies a contiguous run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeqNum(String);

impl SeqNum {
    /// Returns `None` for an empty or blank key.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split('.')
    }

    /// Number of segments; a root key has depth 1.
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    /// The key with its last segment removed, or `None` for a root.
    pub fn parent(&self) -> Option<SeqNum> {
        self.0
            .rsplit_once('.')
            .map(|(prefix, _)| SeqNum(prefix.to_string()))
    }

    /// `true` iff `other` starts with `self + "."`.
    pub fn is_ancestor_of(&self, other: &SeqNum) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(self.0.as_str())
            && other.0.as_bytes()[self.0.len()] == b'.'
    }

    /// Every proper ancestor key, shallowest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> + '_ {
        self.0
            .match_indices('.')
            .map(move |(idx, _)| &self.0[..idx])
    }
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl Ord for SeqNum {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.segments();
        let mut right = other.segments();
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) => match compare_segment(a, b) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                },
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (None, None) => return Ordering::Equal,
            }
        }
    }
}

impl PartialOrd for SeqNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Borrow<str> for SeqNum {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SeqNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SeqNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SeqNum::new(&raw).ok_or_else(|| serde::de::Error::custom("empty sequence number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> SeqNum {
        SeqNum::new(s).unwrap()
    }

    #[test]
    fn numeric_segments_sort_by_value() {
        assert!(seq("1.9") < seq("1.10"));
        assert!(seq("2") > seq("1.99.3"));
        assert!(seq("1") < seq("1.1"));
    }

    #[test]
    fn zero_padded_keys_keep_subtrees_contiguous() {
        let mut keys = vec![seq("1.2"), seq("1.02.1"), seq("1.02"), seq("1.10")];
        keys.sort();
        let order: Vec<_> = keys.iter().map(SeqNum::as_str).collect();
        assert_eq!(order, vec!["1.02", "1.02.1", "1.2", "1.10"]);
    }

    #[test]
    fn text_segments_compare_after_numbers() {
        assert!(seq("1.5") < seq("1.A"));
        assert!(seq("1.A") < seq("1.B"));
    }

    #[test]
    fn depth_and_parent() {
        assert_eq!(seq("1").depth(), 1);
        assert_eq!(seq("1.2.10").depth(), 3);
        assert_eq!(seq("1.2.10").parent(), Some(seq("1.2")));
        assert_eq!(seq("7").parent(), None);
    }

    #[test]
    fn ancestry_requires_a_dot_boundary() {
        assert!(seq("1").is_ancestor_of(&seq("1.1")));
        assert!(seq("1").is_ancestor_of(&seq("1.1.4")));
        assert!(!seq("1").is_ancestor_of(&seq("10.1")));
        assert!(!seq("1.1").is_ancestor_of(&seq("1.1")));
        assert!(!seq("1.1").is_ancestor_of(&seq("1")));
    }

    #[test]
    fn ancestors_are_listed_shallowest_first() {
        let key = seq("3.1.4");
        let ancestors: Vec<_> = key.ancestors().collect();
        assert_eq!(ancestors, vec!["3", "3.1"]);
        assert_eq!(seq("3").ancestors().count(), 0);
    }

    #[test]
    fn blank_keys_are_rejected() {
        assert!(SeqNum::new("").is_none());
        assert!(SeqNum::new("   ").is_none());
        assert_eq!(SeqNum::new(" 1.2 ").unwrap().as_str(), "1.2");
    }
}
