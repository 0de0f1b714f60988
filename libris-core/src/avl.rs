// ---------------------------------------------------------------------------
// OrderedIndexTree — AVL tree keyed by string
// ---------------------------------------------------------------------------
//
// Nodes live in an arena (`Vec<Option<TreeNode>>`) and reference each other
// by slot index; vacated slots are recycled through a free list. Every
// insert/delete rebalances on the way back up the recursion, so the AVL
// balance invariant holds between operations.
// ---------------------------------------------------------------------------

use std::cmp::Ordering;

use crate::error::{CatalogError, Result};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TreeNode<V> {
	key: String,
	value: V,
	left: Option<usize>,
	right: Option<usize>,
	/// Leaf height is 1; an absent child counts as 0.
	height: usize,
}

// ---------------------------------------------------------------------------
// OrderedIndexTree
// ---------------------------------------------------------------------------

/// Balanced binary search tree mapping string keys to values.
#[derive(Debug, Clone)]
pub struct OrderedIndexTree<V> {
	nodes: Vec<Option<TreeNode<V>>>,
	free: Vec<usize>,
	root: Option<usize>,
	len: usize,
}

impl<V> Default for OrderedIndexTree<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> OrderedIndexTree<V> {
	pub fn new() -> Self {
		Self {
			nodes: Vec::new(),
			free: Vec::new(),
			root: None,
			len: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Height of the whole tree (0 when empty).
	pub fn height(&self) -> usize {
		self.height_of(self.root)
	}

	/// Drop every node and release the arena.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.free.clear();
		self.root = None;
		self.len = 0;
	}

	// -- Lookup -------------------------------------------------------------

	/// Exact lookup, O(log n).
	pub fn search(&self, key: &str) -> Option<&V> {
		let mut cursor = self.root;
		while let Some(idx) = cursor {
			let node = self.node(idx);
			cursor = match key.cmp(node.key.as_str()) {
				Ordering::Less => node.left,
				Ordering::Greater => node.right,
				Ordering::Equal => return Some(&node.value),
			};
		}
		None
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.search(key).is_some()
	}

	/// Smallest key and its value.
	pub fn min(&self) -> Option<(&str, &V)> {
		let mut idx = self.root?;
		while let Some(left) = self.node(idx).left {
			idx = left;
		}
		let node = self.node(idx);
		Some((node.key.as_str(), &node.value))
	}

	/// Largest key and its value.
	pub fn max(&self) -> Option<(&str, &V)> {
		let mut idx = self.root?;
		while let Some(right) = self.node(idx).right {
			idx = right;
		}
		let node = self.node(idx);
		Some((node.key.as_str(), &node.value))
	}

	/// All entries with `lo <= key <= hi`, in key order.
	///
	/// Subtrees entirely outside the range are never visited, so the cost is
	/// O(log n + k).
	pub fn range_search(&self, lo: &str, hi: &str) -> Vec<(&str, &V)> {
		let mut out = Vec::new();
		if lo <= hi {
			self.collect_range(self.root, lo, hi, &mut out);
		}
		out
	}

	fn collect_range<'a>(
		&'a self,
		cursor: Option<usize>,
		lo: &str,
		hi: &str,
		out: &mut Vec<(&'a str, &'a V)>,
	) {
		let Some(idx) = cursor else {
			return;
		};
		let node = self.node(idx);
		let key = node.key.as_str();
		if key > lo {
			self.collect_range(node.left, lo, hi, out);
		}
		if key >= lo && key <= hi {
			out.push((key, &node.value));
		}
		if key < hi {
			self.collect_range(node.right, lo, hi, out);
		}
	}

	/// In-order traversal. Every call starts a fresh walk.
	pub fn iter(&self) -> InOrderIter<'_, V> {
		InOrderIter {
			tree: self,
			stack: Vec::new(),
			cursor: self.root,
		}
	}

	/// Values sorted by key.
	pub fn in_order(&self) -> Vec<&V> {
		self.iter().map(|(_, v)| v).collect()
	}

	pub fn keys(&self) -> Vec<&str> {
		self.iter().map(|(k, _)| k).collect()
	}

	/// First entry, in key order, accepted by `predicate`.
	pub fn find<F>(&self, mut predicate: F) -> Option<(&str, &V)>
	where
		F: FnMut(&str, &V) -> bool,
	{
		self.iter().find(|(k, v)| predicate(k, v))
	}

	/// Every entry, in key order, accepted by `predicate`.
	pub fn filter<F>(&self, mut predicate: F) -> Vec<(&str, &V)>
	where
		F: FnMut(&str, &V) -> bool,
	{
		self.iter().filter(|(k, v)| predicate(k, v)).collect()
	}

	// -- Mutation -----------------------------------------------------------

	/// Insert or overwrite. Returns the previous value for `key`, if any.
	pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
		let (root, previous) = self.insert_at(self.root, key.into(), value);
		self.root = Some(root);
		if previous.is_none() {
			self.len += 1;
		}
		previous
	}

	fn insert_at(&mut self, cursor: Option<usize>, key: String, value: V) -> (usize, Option<V>) {
		let Some(idx) = cursor else {
			return (self.allocate(key, value), None);
		};

		match key.as_str().cmp(self.node(idx).key.as_str()) {
			Ordering::Equal => {
				let previous = std::mem::replace(&mut self.node_mut(idx).value, value);
				(idx, Some(previous))
			}
			Ordering::Less => {
				let (child, previous) = self.insert_at(self.node(idx).left, key, value);
				self.node_mut(idx).left = Some(child);
				(self.rebalance(idx), previous)
			}
			Ordering::Greater => {
				let (child, previous) = self.insert_at(self.node(idx).right, key, value);
				self.node_mut(idx).right = Some(child);
				(self.rebalance(idx), previous)
			}
		}
	}

	/// Remove `key`. Returns its value, or `None` when absent.
	pub fn delete(&mut self, key: &str) -> Option<V> {
		let (root, removed) = self.delete_at(self.root, key);
		self.root = root;
		if removed.is_some() {
			self.len -= 1;
		}
		removed
	}

	fn delete_at(&mut self, cursor: Option<usize>, key: &str) -> (Option<usize>, Option<V>) {
		let Some(idx) = cursor else {
			return (None, None);
		};

		match key.cmp(self.node(idx).key.as_str()) {
			Ordering::Less => {
				let (child, removed) = self.delete_at(self.node(idx).left, key);
				if removed.is_none() {
					return (Some(idx), None);
				}
				self.node_mut(idx).left = child;
				(Some(self.rebalance(idx)), removed)
			}
			Ordering::Greater => {
				let (child, removed) = self.delete_at(self.node(idx).right, key);
				if removed.is_none() {
					return (Some(idx), None);
				}
				self.node_mut(idx).right = child;
				(Some(self.rebalance(idx)), removed)
			}
			Ordering::Equal => {
				let (left, right) = {
					let node = self.node(idx);
					(node.left, node.right)
				};
				match (left, right) {
					(None, None) => (None, Some(self.release(idx).value)),
					(Some(child), None) | (None, Some(child)) => {
						(Some(child), Some(self.release(idx).value))
					}
					(Some(left), Some(right)) => {
						// The in-order successor takes this node's place.
						let (new_right, successor) = self.detach_min(right);
						{
							let succ = self.node_mut(successor);
							succ.left = Some(left);
							succ.right = new_right;
						}
						let removed = self.release(idx).value;
						(Some(self.rebalance(successor)), Some(removed))
					}
				}
			}
		}
	}

	/// Unlink the minimum node of the subtree at `idx`.
	///
	/// Returns the rebalanced subtree root and the detached node's slot.
	fn detach_min(&mut self, idx: usize) -> (Option<usize>, usize) {
		let left = self.node(idx).left;
		match left {
			None => (self.node(idx).right, idx),
			Some(left) => {
				let (new_left, min) = self.detach_min(left);
				self.node_mut(idx).left = new_left;
				(Some(self.rebalance(idx)), min)
			}
		}
	}

	// -- Balancing ----------------------------------------------------------

	fn height_of(&self, cursor: Option<usize>) -> usize {
		cursor.map_or(0, |idx| self.node(idx).height)
	}

	fn balance_factor(&self, idx: usize) -> isize {
		let node = self.node(idx);
		self.height_of(node.left) as isize - self.height_of(node.right) as isize
	}

	fn update_height(&mut self, idx: usize) {
		let (left, right) = {
			let node = self.node(idx);
			(node.left, node.right)
		};
		let height = 1 + self.height_of(left).max(self.height_of(right));
		self.node_mut(idx).height = height;
	}

	fn rotate_right(&mut self, y: usize) -> usize {
		let Some(x) = self.node(y).left else {
			return y;
		};
		let t2 = self.node(x).right;
		self.node_mut(y).left = t2;
		self.node_mut(x).right = Some(y);
		self.update_height(y);
		self.update_height(x);
		x
	}

	fn rotate_left(&mut self, x: usize) -> usize {
		let Some(y) = self.node(x).right else {
			return x;
		};
		let t2 = self.node(y).left;
		self.node_mut(x).right = t2;
		self.node_mut(y).left = Some(x);
		self.update_height(x);
		self.update_height(y);
		y
	}

	/// Recompute the height of `idx` and restore balance with one of the
	/// four rotation cases. Returns the new subtree root.
	fn rebalance(&mut self, idx: usize) -> usize {
		self.update_height(idx);
		let factor = self.balance_factor(idx);

		let (left, right) = {
			let node = self.node(idx);
			(node.left, node.right)
		};

		if factor > 1 {
			if let Some(left) = left {
				if self.balance_factor(left) < 0 {
					// left-right
					let new_left = self.rotate_left(left);
					self.node_mut(idx).left = Some(new_left);
				}
			}
			// left-left
			return self.rotate_right(idx);
		}

		if factor < -1 {
			if let Some(right) = right {
				if self.balance_factor(right) > 0 {
					// right-left
					let new_right = self.rotate_right(right);
					self.node_mut(idx).right = Some(new_right);
				}
			}
			// right-right
			return self.rotate_left(idx);
		}

		idx
	}

	// -- Arena --------------------------------------------------------------

	fn allocate(&mut self, key: String, value: V) -> usize {
		let node = TreeNode {
			key,
			value,
			left: None,
			right: None,
			height: 1,
		};
		match self.free.pop() {
			Some(idx) => {
				self.nodes[idx] = Some(node);
				idx
			}
			None => {
				self.nodes.push(Some(node));
				self.nodes.len() - 1
			}
		}
	}

	fn release(&mut self, idx: usize) -> TreeNode<V> {
		match self.nodes[idx].take() {
			Some(node) => {
				self.free.push(idx);
				node
			}
			None => unreachable!("released vacant tree slot {idx}"),
		}
	}

	fn node(&self, idx: usize) -> &TreeNode<V> {
		match &self.nodes[idx] {
			Some(node) => node,
			None => unreachable!("vacant tree slot {idx}"),
		}
	}

	fn node_mut(&mut self, idx: usize) -> &mut TreeNode<V> {
		match &mut self.nodes[idx] {
			Some(node) => node,
			None => unreachable!("vacant tree slot {idx}"),
		}
	}

	// -- Invariants ---------------------------------------------------------

	/// Verify BST ordering, cached heights, AVL balance and the node count.
	pub fn check_invariants(&self) -> Result<()> {
		let mut count = 0;
		self.check_subtree(self.root, None, None, &mut count)?;
		if count != self.len {
			return Err(CatalogError::InvariantViolation(format!(
				"tree reports {} entries but holds {count}",
				self.len
			)));
		}
		Ok(())
	}

	fn check_subtree(
		&self,
		cursor: Option<usize>,
		lower: Option<&str>,
		upper: Option<&str>,
		count: &mut usize,
	) -> Result<usize> {
		let Some(idx) = cursor else {
			return Ok(0);
		};
		let node = self.node(idx);
		let key = node.key.as_str();

		if lower.is_some_and(|lo| key <= lo) || upper.is_some_and(|hi| key >= hi) {
			return Err(CatalogError::InvariantViolation(format!(
				"key {key:?} out of order"
			)));
		}

		*count += 1;
		let left = self.check_subtree(node.left, lower, Some(key), count)?;
		let right = self.check_subtree(node.right, Some(key), upper, count)?;

		if left.abs_diff(right) > 1 {
			return Err(CatalogError::InvariantViolation(format!(
				"node {key:?} unbalanced: left {left}, right {right}"
			)));
		}
		let height = 1 + left.max(right);
		if height != node.height {
			return Err(CatalogError::InvariantViolation(format!(
				"node {key:?} caches height {} but is {height}",
				node.height
			)));
		}
		Ok(height)
	}
}

// ---------------------------------------------------------------------------
// In-order iterator
// ---------------------------------------------------------------------------

/// Explicit-stack in-order walk over an [`OrderedIndexTree`].
pub struct InOrderIter<'a, V> {
	tree: &'a OrderedIndexTree<V>,
	stack: Vec<usize>,
	cursor: Option<usize>,
}

impl<'a, V> Iterator for InOrderIter<'a, V> {
	type Item = (&'a str, &'a V);

	fn next(&mut self) -> Option<Self::Item> {
		while let Some(idx) = self.cursor {
			self.stack.push(idx);
			self.cursor = self.tree.node(idx).left;
		}
		let idx = self.stack.pop()?;
		let node = self.tree.node(idx);
		self.cursor = node.right;
		Some((node.key.as_str(), &node.value))
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::BTreeMap;

	fn tree_of(keys: &[&str]) -> OrderedIndexTree<String> {
		let mut tree = OrderedIndexTree::new();
		for key in keys {
			tree.insert(*key, format!("v-{key}"));
		}
		tree
	}

	// -- Insert / search ----------------------------------------------------

	#[test]
	fn in_order_traversal_sorts_by_key() {
		let tree = tree_of(&["A", "C", "B"]);
		let values: Vec<&String> = tree.in_order();
		assert_eq!(values, vec!["v-A", "v-B", "v-C"]);
		tree.check_invariants().unwrap();
	}

	#[test]
	fn insert_overwrites_existing_key() {
		let mut tree = tree_of(&["k"]);
		let previous = tree.insert("k", "new".to_string());
		assert_eq!(previous.as_deref(), Some("v-k"));
		assert_eq!(tree.len(), 1);
		assert_eq!(tree.search("k").map(String::as_str), Some("new"));
	}

	#[test]
	fn empty_tree_is_harmless() {
		let mut tree: OrderedIndexTree<u32> = OrderedIndexTree::new();
		assert!(tree.search("x").is_none());
		assert!(tree.delete("x").is_none());
		assert!(tree.min().is_none());
		assert!(tree.range_search("a", "z").is_empty());
		assert_eq!(tree.height(), 0);
		tree.check_invariants().unwrap();
	}

	#[test]
	fn sequential_inserts_stay_logarithmic() {
		let mut tree = OrderedIndexTree::new();
		for i in 0..1024 {
			tree.insert(format!("{i:05}"), i);
		}
		// AVL height bound: 1.44 * log2(n + 2)
		assert!(tree.height() <= 15, "height {}", tree.height());
		tree.check_invariants().unwrap();
	}

	// -- Rotations ------------------------------------------------------------

	#[test]
	fn each_rotation_case_rebalances() {
		// left-left, right-right, left-right, right-left
		for keys in [["c", "b", "a"], ["a", "b", "c"], ["c", "a", "b"], ["a", "c", "b"]] {
			let tree = tree_of(&keys);
			assert_eq!(tree.height(), 2, "keys {keys:?}");
			assert_eq!(tree.keys(), vec!["a", "b", "c"]);
			tree.check_invariants().unwrap();
		}
	}

	// -- Delete -----------------------------------------------------------------

	#[test]
	fn delete_leaf_single_child_and_two_children() {
		let mut tree = tree_of(&["d", "b", "f", "a", "c", "e", "g", "h"]);

		// leaf
		assert_eq!(tree.delete("a").as_deref(), Some("v-a"));
		tree.check_invariants().unwrap();
		// one child (g has right child h)
		assert_eq!(tree.delete("g").as_deref(), Some("v-g"));
		tree.check_invariants().unwrap();
		// two children
		assert_eq!(tree.delete("d").as_deref(), Some("v-d"));
		tree.check_invariants().unwrap();

		assert_eq!(tree.keys(), vec!["b", "c", "e", "f", "h"]);
		assert_eq!(tree.len(), 5);
		assert!(tree.delete("zz").is_none());
		assert_eq!(tree.len(), 5);
	}

	#[test]
	fn freed_slots_are_reused() {
		let mut tree = tree_of(&["a", "b", "c"]);
		tree.delete("b");
		tree.insert("d", "v-d".to_string());
		assert_eq!(tree.nodes.len(), 3);
		assert_eq!(tree.keys(), vec!["a", "c", "d"]);
	}

	// -- Range / min / max ----------------------------------------------------

	#[test]
	fn range_search_is_inclusive() {
		let tree = tree_of(&["a", "b", "c", "d", "e", "f"]);
		let keys: Vec<&str> = tree.range_search("b", "e").into_iter().map(|(k, _)| k).collect();
		assert_eq!(keys, vec!["b", "c", "d", "e"]);
		assert!(tree.range_search("x", "a").is_empty());
		let keys: Vec<&str> = tree.range_search("bb", "cc").into_iter().map(|(k, _)| k).collect();
		assert_eq!(keys, vec!["c"]);
	}

	#[test]
	fn min_max_find_filter() {
		let tree = tree_of(&["m", "a", "z", "q"]);
		assert_eq!(tree.min().map(|(k, _)| k), Some("a"));
		assert_eq!(tree.max().map(|(k, _)| k), Some("z"));
		assert_eq!(tree.find(|k, _| k > "m").map(|(k, _)| k), Some("q"));
		let found: Vec<&str> = tree.filter(|k, _| k != "q").into_iter().map(|(k, _)| k).collect();
		assert_eq!(found, vec!["a", "m", "z"]);
	}

	#[test]
	fn traversal_is_restartable() {
		let tree = tree_of(&["b", "a"]);
		let mut first = tree.iter();
		assert_eq!(first.next().map(|(k, _)| k), Some("a"));
		assert_eq!(tree.keys(), vec!["a", "b"]);
	}

	// -- Properties -----------------------------------------------------------

	#[derive(Debug, Clone)]
	enum Op {
		Insert(String, u32),
		Delete(String),
	}

	fn op_strategy() -> impl Strategy<Value = Op> {
		let key = "[a-h]{1,3}";
		prop_oneof![
			(key, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
			key.prop_map(Op::Delete),
		]
	}

	proptest! {
		#[test]
		fn balance_and_order_hold_after_every_op(ops in prop::collection::vec(op_strategy(), 1..200)) {
			let mut tree = OrderedIndexTree::new();
			let mut model = BTreeMap::new();
			for op in ops {
				match op {
					Op::Insert(k, v) => {
						prop_assert_eq!(tree.insert(k.clone(), v), model.insert(k, v));
					}
					Op::Delete(k) => {
						prop_assert_eq!(tree.delete(&k), model.remove(&k));
					}
				}
				prop_assert!(tree.check_invariants().is_ok());
			}
			let keys: Vec<&str> = tree.keys();
			let expected: Vec<&str> = model.keys().map(String::as_str).collect();
			prop_assert_eq!(keys, expected);
		}
	}
}
