// ---------------------------------------------------------------------------
// PrefixIndex — prefix tree over normalized text
// ---------------------------------------------------------------------------
//
// Arena-backed trie. Slot 0 is the root; every other node records its parent
// so deletes can prune bottom-up. Children keep insertion order, which makes
// prefix enumeration a deterministic pre-order walk.
// ---------------------------------------------------------------------------

use crate::error::{CatalogError, Result};
use crate::text::{next_levenshtein_row, normalize, normalize_prefix};

const ROOT: usize = 0;

#[derive(Debug, Clone)]
struct TrieNode<V> {
	ch: char,
	parent: Option<usize>,
	children: Vec<(char, usize)>,
	/// Present exactly when this node ends a word.
	value: Option<V>,
}

impl<V> TrieNode<V> {
	fn new(ch: char, parent: Option<usize>) -> Self {
		Self {
			ch,
			parent,
			children: Vec::new(),
			value: None,
		}
	}

	fn child(&self, ch: char) -> Option<usize> {
		self.children
			.iter()
			.find(|(c, _)| *c == ch)
			.map(|(_, idx)| *idx)
	}
}

/// A single fuzzy hit: the normalized key, its value, and the edit distance
/// to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<'a, V> {
	pub key: String,
	pub value: &'a V,
	pub distance: usize,
}

// ---------------------------------------------------------------------------
// PrefixIndex
// ---------------------------------------------------------------------------

/// Prefix tree keyed by [`normalize`]d text.
///
/// Keys that normalize to the empty string are ignored.
#[derive(Debug, Clone)]
pub struct PrefixIndex<V> {
	nodes: Vec<Option<TrieNode<V>>>,
	free: Vec<usize>,
	word_count: usize,
}

impl<V> Default for PrefixIndex<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> PrefixIndex<V> {
	pub fn new() -> Self {
		Self {
			nodes: vec![Some(TrieNode::new('\0', None))],
			free: Vec::new(),
			word_count: 0,
		}
	}

	/// Number of stored words (terminal nodes).
	pub fn word_count(&self) -> usize {
		self.word_count
	}

	/// Number of live nodes, root included.
	pub fn node_count(&self) -> usize {
		self.nodes.len() - self.free.len()
	}

	pub fn is_empty(&self) -> bool {
		self.word_count == 0
	}

	pub fn clear(&mut self) {
		*self = Self::new();
	}

	// -- Mutation -----------------------------------------------------------

	/// Store `value` under `text`, replacing (and returning) any previous
	/// value for the same normalized key.
	pub fn insert(&mut self, text: &str, value: V) -> Option<V> {
		let key = normalize(text);
		if key.is_empty() {
			return None;
		}

		let mut cursor = ROOT;
		for ch in key.chars() {
			cursor = match self.node(cursor).child(ch) {
				Some(next) => next,
				None => {
					let next = self.allocate(TrieNode::new(ch, Some(cursor)));
					self.node_mut(cursor).children.push((ch, next));
					next
				}
			};
		}

		let previous = self.node_mut(cursor).value.replace(value);
		if previous.is_none() {
			self.word_count += 1;
		}
		previous
	}

	/// Remove the word `text`, pruning nodes that no longer lead anywhere.
	pub fn delete(&mut self, text: &str) -> Option<V> {
		let key = normalize(text);
		let idx = self.locate(&key).filter(|idx| *idx != ROOT)?;
		let removed = self.node_mut(idx).value.take()?;
		self.word_count -= 1;

		let mut cursor = idx;
		while cursor != ROOT {
			let node = self.node(cursor);
			if !node.children.is_empty() || node.value.is_some() {
				break;
			}
			let Some(parent) = node.parent else {
				break;
			};
			let ch = node.ch;
			self.node_mut(parent).children.retain(|(c, _)| *c != ch);
			self.release(cursor);
			cursor = parent;
		}

		Some(removed)
	}

	// -- Lookup -------------------------------------------------------------

	/// Exact match after normalization.
	pub fn search(&self, text: &str) -> Option<&V> {
		let key = normalize(text);
		if key.is_empty() {
			return None;
		}
		let idx = self.locate(&key)?;
		self.node(idx).value.as_ref()
	}

	pub fn get_mut(&mut self, text: &str) -> Option<&mut V> {
		let key = normalize(text);
		if key.is_empty() {
			return None;
		}
		let idx = self.locate(&key)?;
		self.node_mut(idx).value.as_mut()
	}

	pub fn contains(&self, text: &str) -> bool {
		self.search(text).is_some()
	}

	/// Every value whose key starts with `prefix`, in pre-order.
	pub fn search_by_prefix(&self, prefix: &str) -> Vec<&V> {
		self.entries_with_prefix(prefix, usize::MAX)
			.into_iter()
			.map(|(_, v)| v)
			.collect()
	}

	/// [`search_by_prefix`](Self::search_by_prefix) capped at `limit`.
	pub fn autocomplete(&self, prefix: &str, limit: usize) -> Vec<&V> {
		self.entries_with_prefix(prefix, limit)
			.into_iter()
			.map(|(_, v)| v)
			.collect()
	}

	/// Keys and values under `prefix`, pre-order, at most `limit` of them.
	///
	/// A trailing space in `prefix` is kept as a word boundary.
	pub fn entries_with_prefix(&self, prefix: &str, limit: usize) -> Vec<(String, &V)> {
		let key = normalize_prefix(prefix);
		let mut out = Vec::new();
		if limit == 0 {
			return out;
		}
		let Some(start) = self.locate(&key) else {
			return out;
		};

		let mut stack: Vec<(usize, String)> = vec![(start, key)];
		while let Some((idx, path)) = stack.pop() {
			let node = self.node(idx);
			if let Some(value) = &node.value {
				out.push((path.clone(), value));
				if out.len() >= limit {
					break;
				}
			}
			// Reverse so the first-inserted child is popped first.
			for (ch, child) in node.children.iter().rev() {
				let mut next = path.clone();
				next.push(*ch);
				stack.push((*child, next));
			}
		}
		out
	}

	/// All normalized keys in pre-order.
	pub fn keys(&self) -> Vec<String> {
		self.entries_with_prefix("", usize::MAX)
			.into_iter()
			.map(|(k, _)| k)
			.collect()
	}

	/// Entries within `max_distance` edits of `text`.
	///
	/// Walks the whole trie carrying one Levenshtein row per node; a subtree
	/// is skipped once every cell of its row exceeds `max_distance`.
	pub fn fuzzy_search(&self, text: &str, max_distance: usize) -> Vec<FuzzyMatch<'_, V>> {
		let query: Vec<char> = normalize(text).chars().collect();
		let row: Vec<usize> = (0..=query.len()).collect();
		let mut out = Vec::new();
		let mut path = String::new();
		for (ch, child) in &self.node(ROOT).children {
			self.fuzzy_walk(*child, *ch, &row, &query, max_distance, &mut path, &mut out);
		}
		out
	}

	#[allow(clippy::too_many_arguments)]
	fn fuzzy_walk<'a>(
		&'a self,
		idx: usize,
		ch: char,
		prev_row: &[usize],
		query: &[char],
		max_distance: usize,
		path: &mut String,
		out: &mut Vec<FuzzyMatch<'a, V>>,
	) {
		let row = next_levenshtein_row(prev_row, query, ch);
		path.push(ch);

		let node = self.node(idx);
		let distance = row[query.len()];
		if let Some(value) = &node.value {
			if distance <= max_distance {
				out.push(FuzzyMatch {
					key: path.clone(),
					value,
					distance,
				});
			}
		}

		if row.iter().min().is_some_and(|m| *m <= max_distance) {
			for (next_ch, child) in &node.children {
				self.fuzzy_walk(*child, *next_ch, &row, query, max_distance, path, out);
			}
		}

		path.pop();
	}

	// -- Internals ----------------------------------------------------------

	fn locate(&self, key: &str) -> Option<usize> {
		let mut cursor = ROOT;
		for ch in key.chars() {
			cursor = self.node(cursor).child(ch)?;
		}
		Some(cursor)
	}

	fn allocate(&mut self, node: TrieNode<V>) -> usize {
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

	fn release(&mut self, idx: usize) {
		if self.nodes[idx].take().is_some() {
			self.free.push(idx);
		}
	}

	fn node(&self, idx: usize) -> &TrieNode<V> {
		match &self.nodes[idx] {
			Some(node) => node,
			None => unreachable!("vacant trie slot {idx}"),
		}
	}

	fn node_mut(&mut self, idx: usize) -> &mut TrieNode<V> {
		match &mut self.nodes[idx] {
			Some(node) => node,
			None => unreachable!("vacant trie slot {idx}"),
		}
	}

	/// Every non-root leaf must end a word, and the word count must match
	/// the number of terminal nodes.
	pub fn check_invariants(&self) -> Result<()> {
		let mut terminals = 0;
		let mut stack = vec![ROOT];
		while let Some(idx) = stack.pop() {
			let node = self.node(idx);
			if node.value.is_some() {
				terminals += 1;
			}
			if idx != ROOT && node.children.is_empty() && node.value.is_none() {
				return Err(CatalogError::InvariantViolation(format!(
					"dangling trie node {idx} ({:?})",
					node.ch
				)));
			}
			stack.extend(node.children.iter().map(|(_, child)| *child));
		}
		if terminals != self.word_count {
			return Err(CatalogError::InvariantViolation(format!(
				"trie counts {} words but holds {terminals}",
				self.word_count
			)));
		}
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
