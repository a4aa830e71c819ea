//! Lookup and traversal over a project's classification tree.
//!
//! A tree is the slice of top-level nodes returned by the backend, normally a
//! single ROOT. Every traversal is pre-order (parent before children, children
//! in server order) and runs over an explicit stack, so depth is bounded only
//! by memory. Inputs are never mutated.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Classification, ClassificationNode, PATH_SEPARATOR};

/// A node paired with its distance from the top level of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNode<'a> {
    pub node: &'a ClassificationNode,
    pub depth: usize,
}

/// An active leaf offered as a selectable work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafEntry {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub depth: usize,
}

/// Pre-order walk that also exposes the chain of ancestors of each node.
///
/// The visitor receives the trail from the top level down to and including
/// the current node, and returns `true` to stop the walk.
fn walk<'a, F>(tree: &'a [ClassificationNode], mut visit: F)
where
    F: FnMut(&[&'a ClassificationNode]) -> bool,
{
    let mut stack: Vec<(&ClassificationNode, usize)> = tree.iter().rev().map(|n| (n, 0)).collect();
    let mut trail: Vec<&ClassificationNode> = Vec::new();

    while let Some((node, depth)) = stack.pop() {
        trail.truncate(depth);
        trail.push(node);

        if visit(&trail) {
            return;
        }

        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
}

/// Join the names along a trail into a display path.
///
/// A ROOT at the top of the trail is excluded; ROOT on its own keeps its name.
fn path_of(trail: &[&ClassificationNode]) -> String {
    let names = match trail.split_first() {
        Some((first, rest)) if first.is_root() && !rest.is_empty() => rest,
        _ => trail,
    };

    names
        .iter()
        .map(|n| n.name.as_str())
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}

/// Find a node anywhere in the tree. Ids are unique, so the first match wins.
#[must_use]
pub fn find_node_by_id(tree: &[ClassificationNode], id: i64) -> Option<&ClassificationNode> {
    let mut found = None;
    walk(tree, |trail| {
        let node = trail[trail.len() - 1];
        if node.id == id {
            found = Some(node);
            true
        } else {
            false
        }
    });
    found
}

/// Children of `parent_id`, or an empty slice if it is a leaf or not in the tree.
///
/// An unknown parent means the local snapshot is stale and is treated the same
/// as a parent with no children.
#[must_use]
pub fn find_children_of(tree: &[ClassificationNode], parent_id: i64) -> &[ClassificationNode] {
    find_node_by_id(tree, parent_id).map_or(&[], |node| node.children.as_slice())
}

/// The project's ROOT node, if the tree has one at the top level.
#[must_use]
pub fn find_root(tree: &[ClassificationNode]) -> Option<&ClassificationNode> {
    tree.iter().find(|n| n.is_root())
}

/// Flatten the tree in pre-order, annotating each node with its depth.
#[must_use]
pub fn flatten_with_depth(tree: &[ClassificationNode]) -> Vec<FlatNode<'_>> {
    let mut out = Vec::new();
    walk(tree, |trail| {
        out.push(FlatNode {
            node: trail[trail.len() - 1],
            depth: trail.len() - 1,
        });
        false
    });
    out
}

/// Active leaves in pre-order, each with its path computed from ancestor names.
///
/// ROOT is never a work item, even when it has no children yet.
#[must_use]
pub fn flatten_leaves_with_path(tree: &[ClassificationNode]) -> Vec<LeafEntry> {
    let mut out = Vec::new();
    walk(tree, |trail| {
        let node = trail[trail.len() - 1];
        if node.is_leaf() && node.is_active && !node.is_root() {
            out.push(LeafEntry {
                id: node.id,
                name: node.name.clone(),
                path: path_of(trail),
                depth: trail.len() - 1,
            });
        }
        false
    });
    out
}

/// Nodes whose name and flags may be edited: every node except ROOT.
#[must_use]
pub fn editable_nodes(tree: &[ClassificationNode]) -> Vec<FlatNode<'_>> {
    flatten_with_depth(tree)
        .into_iter()
        .filter(|flat| !flat.node.is_root())
        .collect()
}

/// Total number of nodes in the tree.
#[must_use]
pub fn node_count(tree: &[ClassificationNode]) -> usize {
    let mut count = 0;
    walk(tree, |_| {
        count += 1;
        false
    });
    count
}

/// Recompute the display path of `id` from the names of its ancestors.
#[must_use]
pub fn compute_path(tree: &[ClassificationNode], id: i64) -> Option<String> {
    let mut path = None;
    walk(tree, |trail| {
        if trail[trail.len() - 1].id == id {
            path = Some(path_of(trail));
            true
        } else {
            false
        }
    });
    path
}

/// Ids of the ancestors of `id`, from the top level down to its parent.
#[must_use]
pub fn ancestor_ids(tree: &[ClassificationNode], id: i64) -> Option<Vec<i64>> {
    let mut ancestors = None;
    walk(tree, |trail| {
        if trail[trail.len() - 1].id == id {
            ancestors = Some(trail[..trail.len() - 1].iter().map(|n| n.id).collect());
            true
        } else {
            false
        }
    });
    ancestors
}

/// Whether `id` sits somewhere below `ancestor_id`.
#[must_use]
pub fn is_descendant(tree: &[ClassificationNode], ancestor_id: i64, id: i64) -> bool {
    ancestor_ids(tree, id).is_some_and(|ids| ids.contains(&ancestor_id))
}

/// Default `sort_no` for a new child of `parent_id`: one past the largest
/// sibling value, or `0` when there are no siblings or no parent is selected.
#[must_use]
pub fn suggest_sort_no(tree: &[ClassificationNode], parent_id: Option<i64>) -> i32 {
    let Some(parent_id) = parent_id else {
        return 0;
    };

    find_children_of(tree, parent_id)
        .iter()
        .map(|c| c.sort_no)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Assemble nested nodes from flat records.
///
/// Top-level nodes are the records without a parent. Records whose parent is
/// absent are dropped, matching the backend's tree endpoint. Siblings are
/// ordered by `sort_no`, then `name`.
#[must_use]
pub fn build_tree(records: Vec<Classification>) -> Vec<ClassificationNode> {
    let mut top_level: Vec<i64> = Vec::new();
    let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut pending: HashMap<i64, ClassificationNode> = HashMap::with_capacity(records.len());

    for record in records {
        match record.parent_id {
            None => top_level.push(record.id),
            Some(parent) => children_of.entry(parent).or_default().push(record.id),
        }
        pending.insert(record.id, ClassificationNode::from(record));
    }

    let sort_key = |id: &i64| {
        pending
            .get(id)
            .map(|n| (n.sort_no, n.name.clone()))
            .unwrap_or_default()
    };
    top_level.sort_by_key(sort_key);
    for ids in children_of.values_mut() {
        ids.sort_by_key(sort_key);
    }

    // Pre-order over reachable ids; building in reverse finishes every child
    // before its parent.
    let mut order = Vec::with_capacity(pending.len());
    let mut stack: Vec<i64> = top_level.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        order.push(id);
        if let Some(ids) = children_of.get(&id) {
            stack.extend(ids.iter().rev().copied());
        }
    }

    let mut built: HashMap<i64, ClassificationNode> = HashMap::with_capacity(order.len());
    for id in order.into_iter().rev() {
        let Some(mut node) = pending.remove(&id) else {
            continue;
        };
        if let Some(ids) = children_of.get(&id) {
            node.children = ids.iter().filter_map(|cid| built.remove(cid)).collect();
        }
        built.insert(id, node);
    }

    top_level
        .iter()
        .filter_map(|id| built.remove(id))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{TreeFixture, sample_tree};

    #[test]
    fn test_find_children_of_example_scenario() {
        let tree = sample_tree();
        let children = find_children_of(&tree, 7);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, 15);
        assert_eq!(children[0].name, "Wiring");
    }

    #[test]
    fn test_find_children_of_later_subtree() {
        // The match lives under the second category; the search must not stop
        // after exhausting the first one.
        let tree = sample_tree();
        let ids: Vec<i64> = find_children_of(&tree, 20).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![21, 22]);
    }

    #[test]
    fn test_find_children_of_leaf_and_unknown() {
        let tree = sample_tree();
        assert!(find_children_of(&tree, 15).is_empty());
        assert!(find_children_of(&tree, 9999).is_empty());
        assert!(find_children_of(&[], 1).is_empty());
    }

    #[test]
    fn test_find_node_by_id_every_node() {
        let tree = sample_tree();
        for flat in flatten_with_depth(&tree) {
            let found = find_node_by_id(&tree, flat.node.id).unwrap();
            assert_eq!(found.id, flat.node.id);
        }
        assert!(find_node_by_id(&tree, -1).is_none());
    }

    #[test]
    fn test_flatten_with_depth_is_pre_order() {
        let tree = sample_tree();
        let flat = flatten_with_depth(&tree);
        let ids: Vec<i64> = flat.iter().map(|f| f.node.id).collect();
        assert_eq!(ids, vec![1, 7, 15, 20, 21, 23, 22]);
        assert_eq!(flat.len(), node_count(&tree));

        let depths: Vec<usize> = flat.iter().map(|f| f.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 2, 3, 2]);
        for f in &flat {
            assert_eq!(f.depth, usize::try_from(f.node.depth).unwrap());
        }
    }

    #[test]
    fn test_flatten_empty_tree() {
        assert!(flatten_with_depth(&[]).is_empty());
        assert!(flatten_leaves_with_path(&[]).is_empty());
        assert_eq!(node_count(&[]), 0);
    }

    #[test]
    fn test_flatten_leaves_with_path_skips_inactive_and_categories() {
        let tree = sample_tree();
        let leaves = flatten_leaves_with_path(&tree);
        let summary: Vec<(i64, &str)> = leaves.iter().map(|l| (l.id, l.path.as_str())).collect();
        // 22 is inactive, 21 is a category.
        assert_eq!(
            summary,
            vec![(15, "Electrical/Wiring"), (23, "Plumbing/Pipes/Copper")]
        );
        assert_eq!(leaves[1].depth, 3);
    }

    #[test]
    fn test_root_alone_is_not_a_work_item() {
        let tree = vec![TreeFixture::new(42).root(1).build()];
        assert!(flatten_leaves_with_path(&tree).is_empty());
        assert!(editable_nodes(&tree).is_empty());
    }

    #[test]
    fn test_parentless_node_is_root_whatever_its_casing() {
        let fixture = TreeFixture::new(42);
        let tree = build_tree(vec![
            fixture.record(1, None, "Root", 0),
            fixture.record(7, Some(1), "Electrical", 0),
        ]);

        assert_eq!(find_root(&tree).unwrap().id, 1);
        let editable: Vec<i64> = editable_nodes(&tree).iter().map(|f| f.node.id).collect();
        assert_eq!(editable, vec![7]);
        assert_eq!(compute_path(&tree, 7).unwrap(), "Electrical");
        assert_eq!(compute_path(&tree, 1).unwrap(), "Root");

        let leaves = flatten_leaves_with_path(&tree);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].path, "Electrical");
    }

    #[test]
    fn test_computed_path_matches_server_path() {
        let tree = sample_tree();
        for flat in flatten_with_depth(&tree) {
            assert_eq!(
                compute_path(&tree, flat.node.id).unwrap(),
                flat.node.path,
                "path mismatch for node {}",
                flat.node.id
            );
        }
    }

    #[test]
    fn test_editable_nodes_exclude_root() {
        let tree = sample_tree();
        let editable = editable_nodes(&tree);
        assert_eq!(editable.len(), node_count(&tree) - 1);
        assert!(editable.iter().all(|f| !f.node.is_root()));
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let tree = sample_tree();
        assert_eq!(ancestor_ids(&tree, 23).unwrap(), vec![1, 20, 21]);
        assert_eq!(ancestor_ids(&tree, 1).unwrap(), Vec::<i64>::new());
        assert!(ancestor_ids(&tree, 404).is_none());
        assert!(is_descendant(&tree, 20, 23));
        assert!(!is_descendant(&tree, 7, 23));
        assert!(!is_descendant(&tree, 23, 23));
    }

    #[test]
    fn test_suggest_sort_no() {
        let tree = sample_tree();
        assert_eq!(suggest_sort_no(&tree, Some(7)), 1);
        assert_eq!(suggest_sort_no(&tree, Some(20)), 6);
        assert_eq!(suggest_sort_no(&tree, Some(15)), 0);
        assert_eq!(suggest_sort_no(&tree, Some(404)), 0);
        assert_eq!(suggest_sort_no(&tree, None), 0);
    }

    #[test]
    fn test_build_tree_round_trips_server_shape() {
        let tree = sample_tree();
        let mut records: Vec<Classification> = flatten_with_depth(&tree)
            .iter()
            .map(|f| f.node.to_record())
            .collect();
        records.reverse();

        assert_eq!(build_tree(records), tree);
    }

    #[test]
    fn test_build_tree_orders_and_drops_orphans() {
        let fixture = TreeFixture::new(5);
        let records = vec![
            fixture.record(3, Some(1), "Beta", 0),
            fixture.record(2, Some(1), "Alpha", 0),
            fixture.record(4, Some(1), "Gamma", -1),
            fixture.record(9, Some(77), "Orphan", 0),
            fixture.record(1, None, "ROOT", 0),
        ];

        let tree = build_tree(records);
        assert_eq!(tree.len(), 1);
        let names: Vec<&str> = tree[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
        assert!(find_node_by_id(&tree, 9).is_none());
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let depth = 1_000;
        let mut fixture = TreeFixture::new(1).root(0);
        let mut parent = 0;
        for id in 1..=depth {
            fixture = fixture.child(parent, id, &format!("n{id}"), 0);
            parent = id;
        }
        let tree = vec![fixture.build()];
        assert_eq!(node_count(&tree), usize::try_from(depth).unwrap() + 1);
        assert_eq!(ancestor_ids(&tree, depth).unwrap().len(), usize::try_from(depth).unwrap());
    }
}
