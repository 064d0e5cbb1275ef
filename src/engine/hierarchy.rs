//! Tree reconstruction from dot-separated sequence keys.
//!
//! Rows are sorted once with the segment-wise [`SeqNum`] order, which puts
//! every subtree in a contiguous run right after its root. A single scan with
//! a stack of open ancestors then answers "has children" and "nearest parent"
//! for every row.

use crate::model::{SeqNum, TaskRecord};

/// Sort `tasks` into hierarchy pre-order.
///
/// The sort is stable, so rows sharing a key keep their input order. Rows
/// without a key are unattached leaves and go last, also in input order.
pub fn into_hierarchy_order(mut tasks: Vec<TaskRecord>) -> Vec<TaskRecord> {
    tasks.sort_by(|a, b| match (&a.seq_num, &b.seq_num) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    tasks
}

/// The key with its last segment removed.
pub fn parent_seq(seq: &str) -> Option<&str> {
    seq.rsplit_once('.').map(|(parent, _)| parent)
}

/// Per-row tree facts for a list already in hierarchy order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyInfo {
    pub depth: Vec<usize>,
    pub has_children: Vec<bool>,
    /// Index of the nearest present ancestor.
    pub parent: Vec<Option<usize>>,
}

impl HierarchyInfo {
    /// Resolve the rows given by `keys`, which must be in hierarchy order.
    ///
    /// A missing ancestor is skipped over: the nearest present one becomes the
    /// parent. Rows sharing a key are siblings and all count as parents when
    /// any of them has a descendant.
    pub fn resolve<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a SeqNum>>,
    {
        let keys: Vec<Option<&SeqNum>> = keys.into_iter().collect();
        let n = keys.len();
        let mut info = HierarchyInfo {
            depth: vec![1; n],
            has_children: vec![false; n],
            parent: vec![None; n],
        };

        let mut stack: Vec<usize> = Vec::new();
        for (idx, key) in keys.iter().enumerate() {
            let Some(seq) = key else {
                stack.clear();
                continue;
            };
            info.depth[idx] = seq.depth();

            while let Some(&top) = stack.last() {
                if keys[top].is_some_and(|k| k.is_ancestor_of(seq)) {
                    break;
                }
                stack.pop();
            }
            if let Some(&top) = stack.last() {
                info.has_children[top] = true;
                info.parent[idx] = Some(top);
            }
            stack.push(idx);
        }

        // Equal keys are adjacent after sorting; share the parent flag across the run.
        let mut run_start = 0;
        for idx in 1..=n {
            let same = idx < n && keys[idx].is_some() && keys[idx] == keys[run_start];
            if !same {
                if keys[run_start].is_some() && info.has_children[run_start..idx].iter().any(|&c| c) {
                    info.has_children[run_start..idx].fill(true);
                }
                run_start = idx;
            }
        }

        info
    }

    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keys(raw: &[&str]) -> Vec<Option<SeqNum>> {
        raw.iter().map(|s| SeqNum::new(s)).collect()
    }

    fn resolve(keys: &[Option<SeqNum>]) -> HierarchyInfo {
        HierarchyInfo::resolve(keys.iter().map(Option::as_ref))
    }

    #[test]
    fn sorts_numerically_per_segment() {
        let tasks = vec![
            TaskRecord::new("a", "1.10", "ten"),
            TaskRecord::new("b", "", "loose"),
            TaskRecord::new("c", "1.9", "nine"),
            TaskRecord::new("d", "1", "root"),
        ];
        let order: Vec<_> = into_hierarchy_order(tasks)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(order, vec!["root", "nine", "ten", "loose"]);
    }

    #[test]
    fn marks_parents_and_depths() {
        let keys = keys(&["1", "1.1", "1.1.1", "1.2", "2", "3", "3.1"]);
        let info = resolve(&keys);
        assert_eq!(info.depth, vec![1, 2, 3, 2, 1, 1, 2]);
        assert_eq!(
            info.has_children,
            vec![true, true, false, false, false, true, false]
        );
        assert_eq!(
            info.parent,
            vec![None, Some(0), Some(1), Some(0), None, None, Some(5)]
        );
    }

    #[test]
    fn missing_ancestor_links_to_nearest_present_one() {
        let keys = keys(&["1", "1.2.3", "1.2.4"]);
        let info = resolve(&keys);
        assert_eq!(info.parent, vec![None, Some(0), Some(0)]);
        assert_eq!(info.depth, vec![1, 3, 3]);
        assert!(info.has_children[0]);
    }

    #[test]
    fn duplicate_keys_share_the_parent_flag() {
        let keys = keys(&["1", "1", "1.1"]);
        let info = resolve(&keys);
        assert_eq!(info.has_children, vec![true, true, false]);
        assert_eq!(info.parent, vec![None, None, Some(1)]);
    }

    #[test]
    fn unkeyed_rows_are_root_leaves() {
        let keys = vec![SeqNum::new("1"), SeqNum::new("1.1"), None, None];
        let info = resolve(&keys);
        assert_eq!(info.depth, vec![1, 2, 1, 1]);
        assert_eq!(info.has_children, vec![true, false, false, false]);
        assert_eq!(info.parent[2], None);
    }

    #[test]
    fn parent_seq_drops_last_segment() {
        assert_eq!(parent_seq("1.2.10"), Some("1.2"));
        assert_eq!(parent_seq("4"), None);
    }

    fn seq_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[0-9]{1,2}", 1..5).prop_map(|segs| segs.join("."))
    }

    proptest! {
        #[test]
        fn resolved_tree_matches_prefix_ancestry(raw in prop::collection::vec(seq_strategy(), 0..60)) {
            let mut keys: Vec<SeqNum> = raw.iter().filter_map(SeqNum::new).collect();
            keys.sort();
            let info = HierarchyInfo::resolve(keys.iter().map(Some));

            for (i, key) in keys.iter().enumerate() {
                let expected_children = keys.iter().any(|other| key.is_ancestor_of(other));
                prop_assert_eq!(info.has_children[i], expected_children);

                // nearest present ancestor = longest present proper prefix
                let nearest = keys
                    .iter()
                    .filter(|other| other.is_ancestor_of(key))
                    .max_by_key(|other| other.as_str().len())
                    .map(SeqNum::as_str);
                let resolved = info.parent[i].map(|p| keys[p].as_str());
                prop_assert_eq!(resolved, nearest);
                prop_assert_eq!(info.depth[i], key.as_str().split('.').count());
            }
        }

        #[test]
        fn ancestry_is_exactly_dot_prefix(a in seq_strategy(), b in seq_strategy()) {
            let (sa, sb) = (SeqNum::new(&a).unwrap(), SeqNum::new(&b).unwrap());
            prop_assert_eq!(sa.is_ancestor_of(&sb), b.starts_with(&format!("{a}.")));
        }

        #[test]
        fn subtrees_are_contiguous_after_sorting(raw in prop::collection::vec(seq_strategy(), 0..60)) {
            let mut keys: Vec<SeqNum> = raw.iter().filter_map(SeqNum::new).collect();
            keys.sort();
            for (i, root) in keys.iter().enumerate() {
                let in_subtree: Vec<bool> = keys[i + 1..]
                    .iter()
                    .map(|k| root.is_ancestor_of(k) || k == root)
                    .collect();
                let run = in_subtree.iter().take_while(|&&x| x).count();
                prop_assert!(in_subtree[run..].iter().all(|&x| !x));
            }
        }
    }
}
