//! Disjoint-set forest over item ids.

use std::collections::HashMap;

use uuid::Uuid;

/// Union-find with path compression and union by rank, keyed by item id.
///
/// Ids join lazily: the first `find` or `union` naming an id creates a
/// singleton set for it, so callers never pre-register the batch.
#[derive(Debug, Default)]
pub struct UnionFind {
    parent: HashMap<Uuid, Uuid>,
    rank: HashMap<Uuid, u32>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Representative of `id`'s set, creating a singleton on first sight.
    pub fn find(&mut self, id: Uuid) -> Uuid {
        if !self.parent.contains_key(&id) {
            self.parent.insert(id, id);
            self.rank.insert(id, 0);
            return id;
        }

        let mut root = id;
        while self.parent[&root] != root {
            root = self.parent[&root];
        }

        // Path compression: repoint the walked chain straight at the root.
        let mut current = id;
        while current != root {
            let next = self.parent[&current];
            self.parent.insert(current, root);
            current = next;
        }
        root
    }

    /// Merge the sets containing `a` and `b`.
    ///
    /// Returns `false` when they were already in the same set.
    pub fn union(&mut self, a: Uuid, b: Uuid) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }

        let rank_a = self.rank.get(&root_a).copied().unwrap_or(0);
        let rank_b = self.rank.get(&root_b).copied().unwrap_or(0);
        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_b, root_a);
            *self.rank.entry(root_a).or_insert(0) += 1;
        }
        true
    }

    /// Number of ids seen so far (not the number of sets).
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
