use std::marker::PhantomData;
use std::path::Path;

use crate::btree::node::{BPTNode, DataPage, NONE};
use crate::cache::{DEFAULT_CAPACITY, DEFAULT_K};
use crate::cached_file::CachedPagedFile;
use crate::error::Result;
use crate::record::Bounded;

/// A disk-resident B+-tree multi-map (§4.5). `NODE_CAP`/`PAGE_CAP` are the
/// array capacities the caller passes as `N + 1`/`M + 1` — the extra slot is
/// the one-over-fanout slack the insert path allows before splitting.
///
/// Every leaf page and every internal/leaf index node stores exactly
/// `key_count` `(key, child)` pairs, `keys[i]` always the true maximum under
/// `children[i]` — except the root's very last slot, which a write always
/// re-pins to `K::MAX` regardless of what was computed for it (§4.5.1's
/// sentinel). This is a deliberate generalization over the classic
/// "N keys, N+1 children" shape for internal nodes: rather than carrying an
/// extra unkeyed child pointer only at the internal level, every node down
/// to the leaves uses the same 1:1 pairing, and only the root ever needs an
/// artificial "infinity" separator. It keeps the insert/split/merge code
/// identical for leaf and internal nodes and is recorded as an Open Question
/// resolution in the design ledger.
pub struct BTree<K, V, const NODE_CAP: usize, const PAGE_CAP: usize> {
    node_file: CachedPagedFile<BPTNode<K, NODE_CAP>>,
    data_file: CachedPagedFile<DataPage<K, V, PAGE_CAP>>,
    root_id: i64,
    _marker: PhantomData<(K, V)>,
}

type Node<K, const NODE_CAP: usize> = BPTNode<K, NODE_CAP>;
type Page<K, V, const PAGE_CAP: usize> = DataPage<K, V, PAGE_CAP>;

impl<K, V, const NODE_CAP: usize, const PAGE_CAP: usize> BTree<K, V, NODE_CAP, PAGE_CAP>
where
    K: Bounded,
    V: crate::record::Codec,
{
    const NODE_FANOUT: usize = NODE_CAP - 1;
    const PAGE_FANOUT: usize = PAGE_CAP - 1;

    pub fn open(node_path: impl AsRef<Path>, data_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(node_path, data_path, DEFAULT_K, DEFAULT_CAPACITY)
    }

    pub fn open_with(
        node_path: impl AsRef<Path>,
        data_path: impl AsRef<Path>,
        k: usize,
        cache_capacity: usize,
    ) -> Result<Self> {
        let mut node_file = CachedPagedFile::open_with(node_path, 2, k, cache_capacity)?;
        let data_file = CachedPagedFile::open_with(data_path, 2, k, cache_capacity)?;

        let root_id = if node_file.is_empty()? {
            let mut root = Node::<K, NODE_CAP>::empty_leaf();
            root.is_root = true;
            root.key_count = 1;
            root.keys[0] = K::MAX;
            root.children[0] = NONE;
            let id = node_file.append(&root)?;
            node_file.write_info(1, id as i32)?;
            id as i64
        } else {
            node_file.get_info(1)? as i64
        };

        Ok(Self {
            node_file,
            data_file,
            root_id,
            _marker: PhantomData,
        })
    }

    // -- low-level I/O helpers ------------------------------------------

    fn read_node(&mut self, id: i64) -> Result<Node<K, NODE_CAP>> {
        self.node_file.read(id as u64)
    }

    /// Persists `node`, re-pinning the root's last slot to the sentinel
    /// (§4.5.1) regardless of whatever value split/merge bookkeeping left
    /// there — the only place this invariant needs to be enforced.
    fn write_node(&mut self, node: &Node<K, NODE_CAP>) -> Result<()> {
        let mut n = node.clone();
        if n.is_root && n.key_count > 0 {
            let last = n.key_count - 1;
            n.keys[last] = K::MAX;
        }
        self.node_file.update(n.node_id as u64, &n)
    }

    fn append_node(&mut self, node: &mut Node<K, NODE_CAP>) -> Result<i64> {
        let id = self.node_file.append(node)?;
        node.node_id = id as i64;
        self.write_node(node)?;
        Ok(node.node_id)
    }

    fn read_page(&mut self, id: i64) -> Result<Page<K, V, PAGE_CAP>> {
        self.data_file.read(id as u64)
    }

    fn write_page(&mut self, id: i64, page: &Page<K, V, PAGE_CAP>) -> Result<()> {
        self.data_file.update(id as u64, page)
    }

    fn append_page(&mut self, page: &mut Page<K, V, PAGE_CAP>) -> Result<i64> {
        let id = self.data_file.append(page)?;
        page.block_id = id as i64;
        self.data_file.update(id, page)?;
        Ok(page.block_id)
    }

    /// Updates the back-pointer of `node.children[slot]` to `node.node_id`,
    /// following a data page for a leaf or a child node for an internal
    /// node (§4.5.1's back-pointer invariant).
    fn reparent_child(&mut self, node: &Node<K, NODE_CAP>, slot: usize) -> Result<()> {
        let child_id = node.children[slot];
        if child_id == NONE {
            return Ok(());
        }
        if node.is_leaf {
            let mut page = self.read_page(child_id)?;
            page.parent_id = node.node_id;
            self.write_page(child_id, &page)?;
        } else {
            let mut child = self.read_node(child_id)?;
            child.parent_id = node.node_id;
            self.write_node(&child)?;
        }
        Ok(())
    }

    // -- find (§4.5.2) ----------------------------------------------------

    pub fn find(&mut self, key: K) -> Result<Vec<V>> {
        let leaf_id = self.find_leaf_node(key)?;
        let leaf = self.read_node(leaf_id)?;
        let i = leaf.locate(&key);
        let mut out = Vec::new();
        if i < leaf.key_count && leaf.children[i] != NONE {
            self.scan_page_chain(leaf.children[i], key, &mut out)?;
        }
        out.sort();
        Ok(out)
    }

    fn find_leaf_node(&mut self, key: K) -> Result<i64> {
        let mut cur = self.root_id;
        loop {
            let node = self.read_node(cur)?;
            if node.is_leaf {
                return Ok(cur);
            }
            let i = node.locate(&key);
            cur = node.children[i];
        }
    }

    /// Scans the data page plus, as long as the next page's first entry is
    /// still `<= key`, every page chained after it (§4.5.2 step 3).
    fn scan_page_chain(&mut self, start: i64, key: K, out: &mut Vec<V>) -> Result<()> {
        let mut maybe_id = Some(start);
        while let Some(id) = maybe_id {
            let page = self.read_page(id)?;
            for j in 0..page.key_count {
                if page.keys[j] == key {
                    out.push(page.values[j]);
                } else if page.keys[j] > key {
                    break;
                }
            }
            maybe_id = if page.next_block_id != NONE {
                let next = self.read_page(page.next_block_id)?;
                if next.key_count > 0 && next.keys[0] <= key {
                    Some(page.next_block_id)
                } else {
                    None
                }
            } else {
                None
            };
        }
        Ok(())
    }

    // -- insert (§4.5.3) --------------------------------------------------

    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let split = self.insert_rec(self.root_id, key, value)?;
        debug_assert!(
            split.is_none(),
            "root overflow must be absorbed by grow_root, never propagated"
        );
        Ok(())
    }

    /// Returns `Some((left_true_max, new_sibling_true_max, new_sibling_id))`
    /// if `node_id` split and the caller (one level up) must open a new
    /// slot for the sibling. `None` means no propagation is needed — either
    /// nothing changed (exact duplicate), the node absorbed the insert
    /// without overflowing, or the node was the root and absorbed its own
    /// overflow by growing the tree by one level.
    fn insert_rec(&mut self, node_id: i64, key: K, value: V) -> Result<Option<(K, K, i64)>> {
        let mut node = self.read_node(node_id)?;
        let i = node.locate(&key);

        if node.is_leaf {
            let page_id = node.children[i];
            let (mut page, is_new) = if page_id == NONE {
                (Page::<K, V, PAGE_CAP>::empty(), true)
            } else {
                (self.read_page(page_id)?, false)
            };

            if !page.insert(key, value) {
                // exact (key, value) duplicate: bag semantics reject it (§4.5.3 step 2)
                return Ok(None);
            }

            let page_id = if is_new {
                self.append_page(&mut page)?
            } else {
                page_id
            };
            page.parent_id = node.node_id;

            if page.key_count > Self::PAGE_FANOUT {
                let mut right = page.split();
                let right_id = self.append_page(&mut right)?;
                page.next_block_id = right_id;
                right.parent_id = node.node_id;
                self.write_page(right_id, &right)?;

                tracing::debug!(
                    page_id,
                    right_id,
                    left_count = page.key_count,
                    right_count = right.key_count,
                    "data page split"
                );

                node.keys[i] = page.last_key();
                node.children[i] = page_id;
                node.insert_slot(i + 1, right.last_key(), right_id);
            } else {
                node.keys[i] = page.last_key();
                node.children[i] = page_id;
            }
            self.write_page(page_id, &page)?;
        } else {
            let child_id = node.children[i];
            match self.insert_rec(child_id, key, value)? {
                None => {
                    let child = self.read_node(child_id)?;
                    if child.key_count > 0 {
                        node.keys[i] = child.keys[child.key_count - 1];
                    }
                }
                Some((left_max, right_max, right_id)) => {
                    node.keys[i] = left_max;
                    node.insert_slot(i + 1, right_max, right_id);
                }
            }
        }

        self.finish_node_mutation(node)
    }

    /// Persists `node`, splitting it (or growing the tree if it's the root)
    /// when it has overflowed past its fanout (§4.5.3 steps 3/4).
    fn finish_node_mutation(
        &mut self,
        mut node: Node<K, NODE_CAP>,
    ) -> Result<Option<(K, K, i64)>> {
        if node.key_count <= Self::NODE_FANOUT {
            self.write_node(&node)?;
            return Ok(None);
        }

        if node.is_root {
            tracing::debug!(root_id = node.node_id, "root node overflowed, growing tree by one level");
            self.grow_root(&mut node)?;
            self.write_node(&node)?;
            return Ok(None);
        }

        let mid = node.key_count / 2;
        let mut sibling = Node::<K, NODE_CAP> {
            node_id: NONE,
            parent_id: node.parent_id,
            is_leaf: node.is_leaf,
            is_root: false,
            key_count: node.key_count - mid,
            keys: [K::default(); NODE_CAP],
            children: [NONE; NODE_CAP],
        };
        sibling.keys[..sibling.key_count].copy_from_slice(&node.keys[mid..node.key_count]);
        sibling.children[..sibling.key_count].copy_from_slice(&node.children[mid..node.key_count]);
        node.key_count = mid;

        let sibling_id = self.append_node(&mut sibling)?;
        for slot in 0..sibling.key_count {
            self.reparent_child(&sibling, slot)?;
        }

        tracing::debug!(
            node_id = node.node_id,
            sibling_id,
            left_count = node.key_count,
            right_count = sibling.key_count,
            "index node split"
        );

        let left_max = node.keys[node.key_count - 1];
        let right_max = sibling.keys[sibling.key_count - 1];
        self.write_node(&node)?;
        Ok(Some((left_max, right_max, sibling_id)))
    }

    /// Grows the tree by one level: the overflowing root is halved into two
    /// freshly-appended children, and the root itself is rewritten in place
    /// as a two-child internal node (§4.5.3 step 4). Children's (and, for an
    /// internal root, grandchildren's) back-pointers are fixed up to point
    /// at their new parent.
    fn grow_root(&mut self, root: &mut Node<K, NODE_CAP>) -> Result<()> {
        let was_leaf = root.is_leaf;
        let total = root.key_count;
        let mid = total / 2;

        let mut left = Node::<K, NODE_CAP> {
            node_id: NONE,
            parent_id: NONE,
            is_leaf: was_leaf,
            is_root: false,
            key_count: mid,
            keys: [K::default(); NODE_CAP],
            children: [NONE; NODE_CAP],
        };
        left.keys[..mid].copy_from_slice(&root.keys[..mid]);
        left.children[..mid].copy_from_slice(&root.children[..mid]);

        let right_count = total - mid;
        let mut right = Node::<K, NODE_CAP> {
            node_id: NONE,
            parent_id: NONE,
            is_leaf: was_leaf,
            is_root: false,
            key_count: right_count,
            keys: [K::default(); NODE_CAP],
            children: [NONE; NODE_CAP],
        };
        right.keys[..right_count].copy_from_slice(&root.keys[mid..total]);
        right.children[..right_count].copy_from_slice(&root.children[mid..total]);

        let left_id = self.append_node(&mut left)?;
        let right_id = self.append_node(&mut right)?;

        for slot in 0..left.key_count {
            self.reparent_child(&left, slot)?;
        }
        for slot in 0..right.key_count {
            self.reparent_child(&right, slot)?;
        }

        root.is_leaf = false;
        root.key_count = 2;
        root.keys[0] = left.keys[left.key_count - 1];
        root.children[0] = left_id;
        root.keys[1] = K::MAX;
        root.children[1] = right_id;
        Ok(())
    }

    // -- remove (§4.5.4) --------------------------------------------------

    pub fn remove(&mut self, key: K, value: V) -> Result<()> {
        self.remove_rec(self.root_id, key, value)?;
        self.maybe_shrink_root()?;
        Ok(())
    }

    /// Returns whether `node_id` is now underflowing (`key_count <=
    /// fanout/3`) so the caller can attempt rebalancing with a sibling.
    fn remove_rec(&mut self, node_id: i64, key: K, value: V) -> Result<bool> {
        let mut node = self.read_node(node_id)?;
        let i = node.locate(&key);
        if i >= node.key_count {
            return Ok(false);
        }

        if node.is_leaf {
            let page_id = node.children[i];
            if page_id == NONE {
                return Ok(false);
            }
            let mut page = self.read_page(page_id)?;
            if !page.delete(key, value) {
                return Ok(false);
            }
            if page.key_count > 0 {
                node.keys[i] = page.last_key();
            }

            let underflow_page = page.key_count <= Self::PAGE_FANOUT / 3;
            // Only the right sibling is ever considered, and only when this
            // page is not the rightmost slot in its leaf parent — a
            // deliberately preserved asymmetry with the leaf-index-node
            // level below, not a bug to be fixed (§9).
            if underflow_page && i + 1 < node.key_count {
                let right_id = node.children[i + 1];
                if right_id != NONE {
                    let mut right = self.read_page(right_id)?;
                    if right.key_count > Self::PAGE_FANOUT / 2 {
                        tracing::debug!(page_id, right_id, "data page borrowing from right sibling");
                        page.borrow_from_right(&mut right);
                        node.keys[i] = page.last_key();
                        self.write_page(page_id, &page)?;
                        self.write_page(right_id, &right)?;
                    } else if page.key_count + right.key_count < PAGE_CAP {
                        tracing::debug!(page_id, right_id, "data page merging with right sibling");
                        page.merge_right(&right);
                        node.keys[i] = page.last_key();
                        self.write_page(page_id, &page)?;
                        self.data_file.remove(right_id as u64)?;
                        node.remove_slot(i + 1);
                    } else {
                        self.write_page(page_id, &page)?;
                    }
                } else {
                    self.write_page(page_id, &page)?;
                }
            } else {
                self.write_page(page_id, &page)?;
            }
        } else {
            let child_id = node.children[i];
            let child_underflow = self.remove_rec(child_id, key, value)?;
            let child = self.read_node(child_id)?;
            if child.key_count > 0 {
                node.keys[i] = child.keys[child.key_count - 1];
            }
            if child_underflow {
                self.rebalance_child(&mut node, i)?;
            }
        }

        let underflow_self = node.key_count <= Self::NODE_FANOUT / 3;
        self.write_node(&node)?;
        Ok(underflow_self)
    }

    /// Rebalances the child at slot `i`, preferring the left sibling over
    /// the right (§4.5.4 step 3 — the opposite preference from the
    /// data-page level). Falls back to the right sibling when `i` is the
    /// leftmost slot and has no left sibling to borrow from or merge with;
    /// the source and spec are silent on this edge, so this is a judgment
    /// call rather than a literal requirement.
    fn rebalance_child(&mut self, node: &mut Node<K, NODE_CAP>, i: usize) -> Result<()> {
        if i > 0 {
            self.rebalance_from_left(node, i - 1, i)?;
        } else if i + 1 < node.key_count {
            self.rebalance_from_right(node, i, i + 1)?;
        }
        Ok(())
    }

    /// Borrows from or merges with the sibling pair `(left_idx, right_idx =
    /// left_idx + 1)`, treating `left_idx` as the potential surplus donor
    /// and `right_idx` as the underflowing receiver — the "prefer left
    /// sibling" direction of §4.5.4 step 3. A borrow moves the donor's
    /// *last* slot onto the receiver's front. On merge, the slot at
    /// `right_idx` is dropped from `node`.
    fn rebalance_from_left(
        &mut self,
        node: &mut Node<K, NODE_CAP>,
        left_idx: usize,
        right_idx: usize,
    ) -> Result<()> {
        let left_id = node.children[left_idx];
        let right_id = node.children[right_idx];
        let mut left = self.read_node(left_id)?;
        let mut right = self.read_node(right_id)?;

        if left.key_count > Self::NODE_FANOUT / 2 {
            tracing::debug!(left_id, right_id, "index node borrowing from left sibling");
            let (k, c) = (left.keys[left.key_count - 1], left.children[left.key_count - 1]);
            left.key_count -= 1;
            right.insert_slot(0, k, c);
            self.reparent_child(&right, 0)?;

            node.keys[left_idx] = left.keys[left.key_count - 1];
            self.write_node(&left)?;
            self.write_node(&right)?;
        } else if left.key_count + right.key_count <= Self::NODE_FANOUT {
            tracing::debug!(left_id, right_id, "index node merging with left sibling");
            let base = left.key_count;
            for j in 0..right.key_count {
                left.keys[base + j] = right.keys[j];
                left.children[base + j] = right.children[j];
            }
            left.key_count += right.key_count;
            for j in base..left.key_count {
                self.reparent_child(&left, j)?;
            }

            node.keys[left_idx] = left.keys[left.key_count - 1];
            self.write_node(&left)?;
            self.node_file.remove(right_id as u64)?;
            node.remove_slot(right_idx);
        } else {
            self.write_node(&left)?;
            self.write_node(&right)?;
        }
        Ok(())
    }

    /// Borrows from or merges with the sibling pair `(left_idx, right_idx =
    /// left_idx + 1)`, treating `right_idx` as the potential surplus donor
    /// and `left_idx` as the underflowing receiver. Used only as the
    /// fallback when the underflowing child is the leftmost slot and has no
    /// left sibling to prefer. On merge, the slot at `right_idx` is dropped
    /// from `node`.
    fn rebalance_from_right(
        &mut self,
        node: &mut Node<K, NODE_CAP>,
        left_idx: usize,
        right_idx: usize,
    ) -> Result<()> {
        let left_id = node.children[left_idx];
        let right_id = node.children[right_idx];
        let mut left = self.read_node(left_id)?;
        let mut right = self.read_node(right_id)?;

        if right.key_count > Self::NODE_FANOUT / 2 {
            tracing::debug!(left_id, right_id, "index node borrowing from right sibling (fallback)");
            let (k, c) = (right.keys[0], right.children[0]);
            left.keys[left.key_count] = k;
            left.children[left.key_count] = c;
            left.key_count += 1;
            self.reparent_child(&left, left.key_count - 1)?;
            right.remove_slot(0);

            node.keys[left_idx] = left.keys[left.key_count - 1];
            self.write_node(&left)?;
            self.write_node(&right)?;
        } else if left.key_count + right.key_count <= Self::NODE_FANOUT {
            tracing::debug!(left_id, right_id, "index node merging with right sibling (fallback)");
            let base = left.key_count;
            for j in 0..right.key_count {
                left.keys[base + j] = right.keys[j];
                left.children[base + j] = right.children[j];
            }
            left.key_count += right.key_count;
            for j in base..left.key_count {
                self.reparent_child(&left, j)?;
            }

            node.keys[left_idx] = left.keys[left.key_count - 1];
            self.write_node(&left)?;
            self.node_file.remove(right_id as u64)?;
            node.remove_slot(right_idx);
        } else {
            self.write_node(&left)?;
            self.write_node(&right)?;
        }
        Ok(())
    }

    /// Shrinks the tree by one level if the root now carries only a single
    /// (key, child) pair after a merge dropped its sibling — its sole
    /// remaining child becomes the new root (§9).
    fn maybe_shrink_root(&mut self) -> Result<()> {
        let root = self.read_node(self.root_id)?;
        if root.is_leaf || root.key_count != 1 {
            return Ok(());
        }
        let child_id = root.children[0];
        let mut child = self.read_node(child_id)?;
        child.is_root = true;
        child.parent_id = NONE;
        self.write_node(&child)?;
        tracing::debug!(old_root = self.root_id, new_root = child_id, "tree shrunk by one level");
        self.root_id = child_id;
        self.node_file.write_info(1, self.root_id as i32)?;
        Ok(())
    }

    /// True if the tree has never held a live entry — the root is still the
    /// freshly-allocated sentinel-only leaf (§4.6: `addUser`'s "if the
    /// backing store is empty" check, grounded in the source's
    /// `BPTStorage::isEmpty`).
    pub fn is_empty(&mut self) -> Result<bool> {
        let root = self.read_node(self.root_id)?;
        Ok(root.is_leaf
            && (0..root.key_count).all(|i| root.children[i] == NONE))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.node_file.flush()?;
        self.data_file.flush()
    }

    /// Truncates both backing files and reinitializes an empty root (§4.6
    /// `clean`, via `UserManager::clean` -> `userDB.clear()`).
    pub fn clear(&mut self) -> Result<()> {
        self.node_file.clear()?;
        self.data_file.clear()?;

        let mut root = Node::<K, NODE_CAP>::empty_leaf();
        root.is_root = true;
        root.key_count = 1;
        root.keys[0] = K::MAX;
        root.children[0] = NONE;
        let id = self.node_file.append(&root)?;
        self.node_file.write_info(1, id as i32)?;
        self.root_id = id as i64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestTree = BTree<u64, u64, 5, 5>;

    fn open_tree(dir: &tempfile::TempDir) -> TestTree {
        TestTree::open(dir.path().join("nodes.bin"), dir.path().join("data.bin")).unwrap()
    }

    #[test]
    fn insert_and_find_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = open_tree(&dir);
        tree.insert(10, 1).unwrap();
        tree.insert(10, 2).unwrap();
        tree.insert(20, 3).unwrap();
        assert_eq!(tree.find(10).unwrap(), vec![1, 2]);
        assert_eq!(tree.find(20).unwrap(), vec![3]);
        assert_eq!(tree.find(30).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn duplicate_pair_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = open_tree(&dir);
        tree.insert(1, 100).unwrap();
        tree.insert(1, 100).unwrap();
        assert_eq!(tree.find(1).unwrap(), vec![100]);
    }

    #[test]
    fn many_inserts_force_splits_and_remain_searchable() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = open_tree(&dir);
        for i in 0..200u64 {
            tree.insert(i, i * 10).unwrap();
        }
        for i in 0..200u64 {
            assert_eq!(tree.find(i).unwrap(), vec![i * 10]);
        }
    }

    #[test]
    fn remove_then_find_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = open_tree(&dir);
        for i in 0..50u64 {
            tree.insert(i, i).unwrap();
        }
        for i in 0..50u64 {
            tree.remove(i, i).unwrap();
        }
        for i in 0..50u64 {
            assert_eq!(tree.find(i).unwrap(), Vec::<u64>::new());
        }
    }

    #[test]
    fn bag_semantics_keep_all_values_for_repeated_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = open_tree(&dir);
        for v in 0..30u64 {
            tree.insert(42, v).unwrap();
        }
        let mut found = tree.find(42).unwrap();
        found.sort();
        assert_eq!(found, (0..30u64).collect::<Vec<_>>());
    }

    #[test]
    fn is_empty_tracks_live_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = open_tree(&dir);
        assert!(tree.is_empty().unwrap());
        tree.insert(1, 1).unwrap();
        assert!(!tree.is_empty().unwrap());
    }

    #[test]
    fn clear_empties_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = open_tree(&dir);
        tree.insert(1, 1).unwrap();
        tree.insert(2, 2).unwrap();
        tree.clear().unwrap();
        assert!(tree.is_empty().unwrap());
        assert_eq!(tree.find(1).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn reopen_preserves_tree_contents() {
        let dir = tempfile::tempdir().unwrap();
        let node_path = dir.path().join("nodes.bin");
        let data_path = dir.path().join("data.bin");
        {
            let mut tree = TestTree::open(&node_path, &data_path).unwrap();
            for i in 0..80u64 {
                tree.insert(i, i + 1).unwrap();
            }
            tree.flush().unwrap();
        }
        let mut tree = TestTree::open(&node_path, &data_path).unwrap();
        for i in 0..80u64 {
            assert_eq!(tree.find(i).unwrap(), vec![i + 1]);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::{BTreeMap, HashSet};

        #[derive(Debug, Clone, Copy)]
        enum Op {
            Insert(u64, u64),
            Remove(u64, u64),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..20u64, 0..20u64).prop_map(|(k, v)| Op::Insert(k, v)),
                (0..20u64, 0..20u64).prop_map(|(k, v)| Op::Remove(k, v)),
            ]
        }

        proptest! {
            // §8: after any interleaving of insert/remove that never removes
            // more copies than were inserted, `find` returns exactly the
            // surviving multiset for each key, sorted ascending.
            #[test]
            fn interleaved_insert_remove_matches_reference(ops in prop::collection::vec(op_strategy(), 0..200)) {
                let dir = tempfile::tempdir().unwrap();
                let mut tree = open_tree(&dir);
                let mut present: HashSet<(u64, u64)> = HashSet::new();

                for op in ops {
                    match op {
                        Op::Insert(k, v) => {
                            tree.insert(k, v).unwrap();
                            present.insert((k, v));
                        }
                        Op::Remove(k, v) => {
                            // Only remove pairs the reference actually holds,
                            // so we never remove more copies than inserted.
                            if present.remove(&(k, v)) {
                                tree.remove(k, v).unwrap();
                            }
                        }
                    }
                }

                let mut expected: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
                for (k, v) in &present {
                    expected.entry(*k).or_default().push(*v);
                }
                for values in expected.values_mut() {
                    values.sort();
                }

                for k in 0..20u64 {
                    let want = expected.get(&k).cloned().unwrap_or_default();
                    prop_assert_eq!(tree.find(k).unwrap(), want);
                }
            }

            // §8: inserting `(k,v)` twice has the same final `find(k)` as
            // inserting it once.
            #[test]
            fn repeated_insert_of_same_pair_is_idempotent(k in 0..50u64, v in 0..50u64, repeats in 1..5usize) {
                let dir = tempfile::tempdir().unwrap();
                let mut tree = open_tree(&dir);
                for _ in 0..repeats {
                    tree.insert(k, v).unwrap();
                }
                prop_assert_eq!(tree.find(k).unwrap(), vec![v]);
            }

            // §8 "B structural" / "B back-pointers": after every single
            // insert or remove, every data page but the right-most in
            // global order has key_count in (M/3, M], every non-root index
            // node has key_count in (N/3, N], the root has key_count in
            // [1, N], and every data page's parent_id names the leaf node
            // whose slot actually references it.
            #[test]
            fn structural_invariants_hold_after_every_op(ops in prop::collection::vec(op_strategy(), 0..200)) {
                let dir = tempfile::tempdir().unwrap();
                let mut tree = open_tree(&dir);
                let mut present: HashSet<(u64, u64)> = HashSet::new();

                for op in ops {
                    match op {
                        Op::Insert(k, v) => {
                            tree.insert(k, v).unwrap();
                            present.insert((k, v));
                        }
                        Op::Remove(k, v) => {
                            if present.remove(&(k, v)) {
                                tree.remove(k, v).unwrap();
                            }
                        }
                    }
                    assert_structural_invariants(&mut tree);
                }
            }
        }

        /// Walks every node/page reachable from the root, in left-to-right
        /// key order, asserting §8's structural and back-pointer
        /// invariants. Panics (rather than returning a bool) so a failure
        /// points straight at the offending node/page id.
        fn assert_structural_invariants(tree: &mut TestTree) {
            let root_id = tree.root_id;
            let mut leaf_pages = Vec::new();
            walk_node(tree, root_id, &mut leaf_pages);

            for (idx, &page_id) in leaf_pages.iter().enumerate() {
                let page = tree.read_page(page_id).unwrap();
                let is_rightmost = idx + 1 == leaf_pages.len();
                if !is_rightmost {
                    assert!(
                        page.key_count > TestTree::PAGE_FANOUT / 3
                            && page.key_count <= TestTree::PAGE_FANOUT,
                        "data page {} key_count {} out of ({}, {}]",
                        page_id,
                        page.key_count,
                        TestTree::PAGE_FANOUT / 3,
                        TestTree::PAGE_FANOUT
                    );
                }
            }
        }

        fn walk_node(tree: &mut TestTree, node_id: i64, leaf_pages_out: &mut Vec<i64>) {
            let node = tree.read_node(node_id).unwrap();
            if node.is_root {
                assert!(
                    node.key_count >= 1 && node.key_count <= TestTree::NODE_FANOUT,
                    "root key_count {} out of [1, {}]",
                    node.key_count,
                    TestTree::NODE_FANOUT
                );
            } else {
                assert!(
                    node.key_count > TestTree::NODE_FANOUT / 3
                        && node.key_count <= TestTree::NODE_FANOUT,
                    "node {} key_count {} out of ({}, {}]",
                    node_id,
                    node.key_count,
                    TestTree::NODE_FANOUT / 3,
                    TestTree::NODE_FANOUT
                );
            }

            if node.is_leaf {
                for i in 0..node.key_count {
                    let page_id = node.children[i];
                    if page_id == NONE {
                        continue;
                    }
                    let page = tree.read_page(page_id).unwrap();
                    assert_eq!(
                        page.parent_id, node_id,
                        "data page {page_id} parent_id must name its owning leaf node"
                    );
                    leaf_pages_out.push(page_id);
                }
            } else {
                for i in 0..node.key_count {
                    walk_node(tree, node.children[i], leaf_pages_out);
                }
            }
        }
    }
}
