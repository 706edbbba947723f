//! In-memory commit DAG in revision order
//!
//! Revisions are numbered in append order: every parent has a lower number
//! than its children. Hosts build one of these from their own storage and
//! answer history questions from it.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::model::CommitId;

#[derive(Debug, Default, Clone)]
pub struct HistoryGraph {
    nodes: Vec<CommitId>,
    parents: Vec<Vec<usize>>,
    has_children: Vec<bool>,
    index: FxHashMap<CommitId, usize>,
}

impl HistoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a revision. Parents must already be present.
    pub fn add(&mut self, id: CommitId, parents: &[CommitId]) -> Result<usize> {
        if let Some(&rev) = self.index.get(&id) {
            return Ok(rev);
        }
        let mut parent_revs = Vec::with_capacity(parents.len());
        for p in parents {
            let rev = *self
                .index
                .get(p)
                .ok_or_else(|| Error::Repo(format!("parent {} of {} is not in history", p, id)))?;
            self.has_children[rev] = true;
            parent_revs.push(rev);
        }
        let rev = self.nodes.len();
        self.nodes.push(id);
        self.parents.push(parent_revs);
        self.has_children.push(false);
        self.index.insert(id, rev);
        Ok(rev)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, rev: usize) -> Option<CommitId> {
        self.nodes.get(rev).copied()
    }

    pub fn rev(&self, id: &CommitId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.index.contains_key(id)
    }

    /// Revisions nothing else descends from, oldest first
    pub fn heads(&self) -> Vec<CommitId> {
        self.has_children
            .iter()
            .enumerate()
            .filter(|(_, has)| !**has)
            .map(|(rev, _)| self.nodes[rev])
            .collect()
    }

    /// Ancestors of `heads` (inclusive) that are not ancestors of `common`,
    /// in revision order. Unknown ids are ignored on both sides.
    pub fn find_missing(&self, common: &[CommitId], heads: &[CommitId]) -> Vec<CommitId> {
        let excluded = self.ancestors(common);
        let included = self.ancestors(heads);
        let mut revs: Vec<usize> = included.difference(&excluded).copied().collect();
        revs.sort_unstable();
        revs.into_iter().map(|rev| self.nodes[rev]).collect()
    }

    fn ancestors(&self, ids: &[CommitId]) -> FxHashSet<usize> {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<usize> = ids.iter().filter_map(|id| self.rev(id)).collect();
        while let Some(rev) = stack.pop() {
            if seen.insert(rev) {
                stack.extend(self.parents[rev].iter().copied());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> CommitId {
        CommitId([n; 20])
    }

    /// 1 - 2 - 3
    ///      \
    ///       4
    fn fork() -> HistoryGraph {
        let mut g = HistoryGraph::new();
        g.add(id(1), &[]).unwrap();
        g.add(id(2), &[id(1)]).unwrap();
        g.add(id(3), &[id(2)]).unwrap();
        g.add(id(4), &[id(2)]).unwrap();
        g
    }

    #[test]
    fn test_heads() {
        assert_eq!(fork().heads(), vec![id(3), id(4)]);
    }

    #[test]
    fn test_find_missing() {
        let g = fork();
        assert_eq!(g.find_missing(&[id(3)], &[id(3), id(4)]), vec![id(4)]);
        assert_eq!(g.find_missing(&[], &[id(3)]), vec![id(1), id(2), id(3)]);
        assert!(g.find_missing(&[id(3), id(4)], &[id(4)]).is_empty());
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut g = HistoryGraph::new();
        assert!(g.add(id(2), &[id(1)]).is_err());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut g = fork();
        assert_eq!(g.add(id(3), &[id(2)]).unwrap(), 2);
        assert_eq!(g.len(), 4);
    }
}
