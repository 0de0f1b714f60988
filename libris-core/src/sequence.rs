// ---------------------------------------------------------------------------
// SequencedCollection — insertion-ordered doubly-linked list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ListNode<T> {
	value: T,
	prev: Option<usize>,
	next: Option<usize>,
}

/// Doubly-linked list over an arena of slots.
///
/// O(1) append/prepend, O(n) positional access and removal.
#[derive(Debug, Clone)]
pub struct SequencedCollection<T> {
	nodes: Vec<Option<ListNode<T>>>,
	free: Vec<usize>,
	head: Option<usize>,
	tail: Option<usize>,
	len: usize,
}

impl<T> Default for SequencedCollection<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> SequencedCollection<T> {
	pub fn new() -> Self {
		Self {
			nodes: Vec::new(),
			free: Vec::new(),
			head: None,
			tail: None,
			len: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn clear(&mut self) {
		*self = Self::new();
	}

	pub fn first(&self) -> Option<&T> {
		self.head.map(|idx| &self.node(idx).value)
	}

	pub fn last(&self) -> Option<&T> {
		self.tail.map(|idx| &self.node(idx).value)
	}

	// -- Insertion ----------------------------------------------------------

	/// Append at the tail.
	pub fn push_back(&mut self, value: T) {
		let idx = self.allocate(ListNode {
			value,
			prev: self.tail,
			next: None,
		});
		match self.tail {
			Some(tail) => self.node_mut(tail).next = Some(idx),
			None => self.head = Some(idx),
		}
		self.tail = Some(idx);
		self.len += 1;
	}

	/// Prepend at the head.
	pub fn push_front(&mut self, value: T) {
		let idx = self.allocate(ListNode {
			value,
			prev: None,
			next: self.head,
		});
		match self.head {
			Some(head) => self.node_mut(head).prev = Some(idx),
			None => self.tail = Some(idx),
		}
		self.head = Some(idx);
		self.len += 1;
	}

	/// Insert so that `value` ends up at `index`. Returns `false` when
	/// `index > len`.
	pub fn insert_at(&mut self, index: usize, value: T) -> bool {
		if index > self.len {
			return false;
		}
		if index == 0 {
			self.push_front(value);
			return true;
		}
		if index == self.len {
			self.push_back(value);
			return true;
		}

		let Some(after) = self.slot_at(index) else {
			return false;
		};
		let before = self.node(after).prev;
		let idx = self.allocate(ListNode {
			value,
			prev: before,
			next: Some(after),
		});
		self.node_mut(after).prev = Some(idx);
		if let Some(before) = before {
			self.node_mut(before).next = Some(idx);
		}
		self.len += 1;
		true
	}

	// -- Removal ------------------------------------------------------------

	pub fn remove_at(&mut self, index: usize) -> Option<T> {
		let idx = self.slot_at(index)?;
		Some(self.unlink(idx))
	}

	/// Remove the first element accepted by `predicate`.
	pub fn remove_first<F>(&mut self, mut predicate: F) -> Option<T>
	where
		F: FnMut(&T) -> bool,
	{
		let mut cursor = self.head;
		while let Some(idx) = cursor {
			let node = self.node(idx);
			if predicate(&node.value) {
				return Some(self.unlink(idx));
			}
			cursor = node.next;
		}
		None
	}

	pub fn pop_front(&mut self) -> Option<T> {
		let idx = self.head?;
		Some(self.unlink(idx))
	}

	pub fn pop_back(&mut self) -> Option<T> {
		let idx = self.tail?;
		Some(self.unlink(idx))
	}

	fn unlink(&mut self, idx: usize) -> T {
		let node = match self.nodes[idx].take() {
			Some(node) => node,
			None => unreachable!("unlinked vacant list slot {idx}"),
		};
		match node.prev {
			Some(prev) => self.node_mut(prev).next = node.next,
			None => self.head = node.next,
		}
		match node.next {
			Some(next) => self.node_mut(next).prev = node.prev,
			None => self.tail = node.prev,
		}
		self.free.push(idx);
		self.len -= 1;
		node.value
	}

	// -- Access -------------------------------------------------------------

	pub fn get(&self, index: usize) -> Option<&T> {
		self.slot_at(index).map(|idx| &self.node(idx).value)
	}

	pub fn position<F>(&self, mut predicate: F) -> Option<usize>
	where
		F: FnMut(&T) -> bool,
	{
		self.iter().position(|value| predicate(value))
	}

	pub fn find<F>(&self, mut predicate: F) -> Option<&T>
	where
		F: FnMut(&T) -> bool,
	{
		self.iter().find(|value| predicate(value))
	}

	pub fn filter<F>(&self, mut predicate: F) -> Vec<&T>
	where
		F: FnMut(&T) -> bool,
	{
		self.iter().filter(|value| predicate(value)).collect()
	}

	pub fn iter(&self) -> SequenceIter<'_, T> {
		SequenceIter {
			list: self,
			cursor: self.head,
			forward: true,
		}
	}

	pub fn iter_rev(&self) -> SequenceIter<'_, T> {
		SequenceIter {
			list: self,
			cursor: self.tail,
			forward: false,
		}
	}

	pub fn to_vec(&self) -> Vec<T>
	where
		T: Clone,
	{
		self.iter().cloned().collect()
	}

	// -- Arena --------------------------------------------------------------

	/// Slot holding the element at `index`, walking from whichever end is
	/// closer.
	fn slot_at(&self, index: usize) -> Option<usize> {
		if index >= self.len {
			return None;
		}
		if index <= self.len / 2 {
			let mut cursor = self.head;
			for _ in 0..index {
				cursor = cursor.and_then(|idx| self.node(idx).next);
			}
			cursor
		} else {
			let mut cursor = self.tail;
			for _ in 0..(self.len - 1 - index) {
				cursor = cursor.and_then(|idx| self.node(idx).prev);
			}
			cursor
		}
	}

	fn allocate(&mut self, node: ListNode<T>) -> usize {
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

	fn node(&self, idx: usize) -> &ListNode<T> {
		match &self.nodes[idx] {
			Some(node) => node,
			None => unreachable!("vacant list slot {idx}"),
		}
	}

	fn node_mut(&mut self, idx: usize) -> &mut ListNode<T> {
		match &mut self.nodes[idx] {
			Some(node) => node,
			None => unreachable!("vacant list slot {idx}"),
		}
	}
}

pub struct SequenceIter<'a, T> {
	list: &'a SequencedCollection<T>,
	cursor: Option<usize>,
	forward: bool,
}

impl<'a, T> Iterator for SequenceIter<'a, T> {
	type Item = &'a T;

	fn next(&mut self) -> Option<Self::Item> {
		let idx = self.cursor?;
		let node = self.list.node(idx);
		self.cursor = if self.forward { node.next } else { node.prev };
		Some(&node.value)
	}
}

impl<T> FromIterator<T> for SequencedCollection<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		let mut list = Self::new();
		for value in iter {
			list.push_back(value);
		}
		list
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
