// ---------------------------------------------------------------------------
// EntityIndexStore — canonical records plus tree, trie and sequence indexes
// ---------------------------------------------------------------------------
//
// The record map (`id -> entity`) is the only owner of entity data. The
// ordered tree maps folded natural key -> id, each prefix index maps
// normalized field text -> ids, and the sequence keeps ids in insertion
// order. Every mutation validates first and only then touches the indexes,
// so a rejected call leaves all four structures as they were.
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::avl::OrderedIndexTree;
use crate::config::StoreConfig;
use crate::error::{CatalogError, Result};
use crate::sequence::SequencedCollection;
use crate::text::normalize;
use crate::trie::{FuzzyMatch, PrefixIndex};
use crate::types::IndexedEntity;

/// Diagnostic counters for one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
	pub entities: usize,
	pub tree_height: usize,
	pub trie_nodes: usize,
	pub trie_words: usize,
}

fn current_timestamp_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}

/// Ids sharing one normalized text (two editions can share a title).
type Postings = Vec<String>;

// ---------------------------------------------------------------------------
// EntityIndexStore
// ---------------------------------------------------------------------------

pub struct EntityIndexStore<E: IndexedEntity> {
	records: HashMap<String, E>,
	by_key: OrderedIndexTree<String>,
	text_indexes: Vec<(E::Field, PrefixIndex<Postings>)>,
	sequence: SequencedCollection<String>,
	config: StoreConfig,
}

impl<E: IndexedEntity> Default for EntityIndexStore<E> {
	fn default() -> Self {
		Self::new(StoreConfig::default())
	}
}

impl<E: IndexedEntity> EntityIndexStore<E> {
	pub fn new(config: StoreConfig) -> Self {
		Self {
			records: HashMap::new(),
			by_key: OrderedIndexTree::new(),
			text_indexes: E::indexed_fields()
				.iter()
				.map(|field| (*field, PrefixIndex::new()))
				.collect(),
			sequence: SequencedCollection::new(),
			config,
		}
	}

	pub fn config(&self) -> &StoreConfig {
		&self.config
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn contains(&self, id: &str) -> bool {
		self.records.contains_key(id)
	}

	/// Reset every index.
	pub fn clear(&mut self) {
		self.records.clear();
		self.by_key.clear();
		for (_, index) in &mut self.text_indexes {
			index.clear();
		}
		self.sequence.clear();
		tracing::info!(kind = E::KIND, "store cleared");
	}

	// -- Mutation -----------------------------------------------------------

	/// Create an entity with a fresh UUID. Fails with `DuplicateKey` when the
	/// natural key is taken.
	pub fn add(&mut self, draft: E::Draft) -> Result<E> {
		let id = Uuid::new_v4().to_string();
		let entity = E::from_draft(id.clone(), draft, current_timestamp_ms())?;
		let key = entity.natural_key();

		if self.by_key.contains_key(&key) {
			tracing::warn!(kind = E::KIND, key = %key, "rejected duplicate natural key");
			return Err(CatalogError::DuplicateKey { kind: E::KIND, key });
		}

		self.by_key.insert(key, id.clone());
		for (field, index) in &mut self.text_indexes {
			add_posting(index, entity.field_text(*field), &id);
		}
		self.sequence.push_back(id.clone());
		self.records.insert(id.clone(), entity.clone());

		tracing::debug!(kind = E::KIND, id = %id, "entity added");
		Ok(entity)
	}

	/// Apply a partial update, re-indexing whatever key or text changed.
	pub fn update(&mut self, id: &str, patch: E::Patch) -> Result<E> {
		let Some(current) = self.records.get(id) else {
			return Err(self.not_found(id));
		};
		let updated = current.patched(patch)?;

		let old_key = current.natural_key();
		let new_key = updated.natural_key();
		if new_key != old_key && self.by_key.contains_key(&new_key) {
			tracing::warn!(kind = E::KIND, key = %new_key, "rejected duplicate natural key on update");
			return Err(CatalogError::DuplicateKey {
				kind: E::KIND,
				key: new_key,
			});
		}

		// Stale entries go before fresh ones are written.
		let mut reindexed = Vec::new();
		for (field, index) in &mut self.text_indexes {
			let old_text = current.field_text(*field);
			let new_text = updated.field_text(*field);
			if normalize(old_text) != normalize(new_text) {
				remove_posting(index, old_text, id);
				add_posting(index, new_text, id);
				reindexed.push(*field);
			}
		}
		if new_key != old_key {
			self.by_key.delete(&old_key);
			self.by_key.insert(new_key, id.to_string());
		}

		self.records.insert(id.to_string(), updated.clone());
		tracing::debug!(kind = E::KIND, id = %id, fields = ?reindexed, "entity updated");
		Ok(updated)
	}

	/// Remove an entity from every index.
	pub fn delete(&mut self, id: &str) -> Result<E> {
		let Some(entity) = self.records.remove(id) else {
			return Err(self.not_found(id));
		};

		self.by_key.delete(&entity.natural_key());
		for (field, index) in &mut self.text_indexes {
			remove_posting(index, entity.field_text(*field), id);
		}
		self.sequence.remove_first(|entry| entry == id);

		tracing::debug!(kind = E::KIND, id = %id, "entity deleted");
		Ok(entity)
	}

	fn not_found(&self, id: &str) -> CatalogError {
		CatalogError::NotFound {
			kind: E::KIND,
			id: id.to_string(),
		}
	}

	// -- Lookup -------------------------------------------------------------

	pub fn find_by_id(&self, id: &str) -> Option<&E> {
		self.records.get(id)
	}

	/// Exact natural-key lookup (ISBN or email, folded).
	pub fn find_by_natural_key(&self, key: &str) -> Option<&E> {
		let id = self.by_key.search(&E::fold_key(key))?;
		self.records.get(id)
	}

	/// Entities whose `field` starts with `query`, in prefix-tree pre-order.
	pub fn search_by_prefix(&self, field: E::Field, query: &str) -> Vec<&E> {
		self.prefix_hits(field, query, usize::MAX)
	}

	/// At most `limit` prefix matches for `field`.
	pub fn autocomplete(&self, field: E::Field, query: &str, limit: usize) -> Vec<&E> {
		self.prefix_hits(field, query, limit)
	}

	/// Autocomplete with the configured default limit.
	pub fn suggest(&self, field: E::Field, query: &str) -> Vec<&E> {
		self.prefix_hits(field, query, self.config.autocomplete_limit)
	}

	fn prefix_hits(&self, field: E::Field, query: &str, limit: usize) -> Vec<&E> {
		if normalize(query).is_empty() || limit == 0 {
			return Vec::new();
		}
		let Some(index) = self.text_index(field) else {
			return Vec::new();
		};
		index
			.autocomplete(query, limit)
			.into_iter()
			.flatten()
			.filter_map(|id| self.records.get(id))
			.take(limit)
			.collect()
	}

	/// Entities whose `field` is within `max_distance` edits of `query`
	/// (configured default when `None`), closest first. Equal distances keep
	/// prefix-tree order.
	pub fn fuzzy_search(
		&self,
		field: E::Field,
		query: &str,
		max_distance: Option<usize>,
	) -> Vec<(&E, usize)> {
		if normalize(query).is_empty() {
			return Vec::new();
		}
		let Some(index) = self.text_index(field) else {
			return Vec::new();
		};
		let max_distance = max_distance.unwrap_or(self.config.fuzzy_max_distance);

		let mut hits: Vec<(&E, usize)> = index
			.fuzzy_search(query, max_distance)
			.into_iter()
			.flat_map(|hit| {
				let FuzzyMatch { value, distance, .. } = hit;
				value
					.iter()
					.filter_map(|id| self.records.get(id))
					.map(move |entity| (entity, distance))
			})
			.collect();
		hits.sort_by_key(|(_, distance)| *distance);
		hits
	}

	/// Entities with `lo <= natural key <= hi`, in key order.
	pub fn range_by_natural_key(&self, lo: &str, hi: &str) -> Vec<&E> {
		self.by_key
			.range_search(&E::fold_key(lo), &E::fold_key(hi))
			.into_iter()
			.filter_map(|(_, id)| self.records.get(id))
			.collect()
	}

	pub fn get_all_sorted_by_key(&self) -> Vec<&E> {
		self.by_key
			.iter()
			.filter_map(|(_, id)| self.records.get(id))
			.collect()
	}

	pub fn get_all_in_insertion_order(&self) -> Vec<&E> {
		self.sequence
			.iter()
			.filter_map(|id| self.records.get(id))
			.collect()
	}

	pub fn get_all(&self, sorted: bool) -> Vec<&E> {
		if sorted {
			self.get_all_sorted_by_key()
		} else {
			self.get_all_in_insertion_order()
		}
	}

	/// First entity, in insertion order, accepted by `predicate`.
	pub fn find<F>(&self, mut predicate: F) -> Option<&E>
	where
		F: FnMut(&E) -> bool,
	{
		self.sequence
			.iter()
			.filter_map(|id| self.records.get(id))
			.find(|entity| predicate(entity))
	}

	/// Every entity, in insertion order, accepted by `predicate`.
	pub fn filter<F>(&self, mut predicate: F) -> Vec<&E>
	where
		F: FnMut(&E) -> bool,
	{
		self.sequence
			.iter()
			.filter_map(|id| self.records.get(id))
			.filter(|entity| predicate(entity))
			.collect()
	}

	fn text_index(&self, field: E::Field) -> Option<&PrefixIndex<Postings>> {
		self.text_indexes
			.iter()
			.find(|(f, _)| *f == field)
			.map(|(_, index)| index)
	}

	// -- Diagnostics --------------------------------------------------------

	pub fn stats(&self) -> StoreStats {
		StoreStats {
			entities: self.records.len(),
			tree_height: self.by_key.height(),
			trie_nodes: self.text_indexes.iter().map(|(_, i)| i.node_count()).sum(),
			trie_words: self.text_indexes.iter().map(|(_, i)| i.word_count()).sum(),
		}
	}

	/// Verify that the record map, the tree, every prefix index and the
	/// sequence describe exactly the same set of entities.
	pub fn check_invariants(&self) -> Result<()> {
		let violation = |msg: String| CatalogError::InvariantViolation(format!("{}: {msg}", E::KIND));
		let live: HashSet<&str> = self.records.keys().map(String::as_str).collect();

		self.by_key.check_invariants()?;
		if self.by_key.len() != live.len() {
			return Err(violation(format!(
				"tree holds {} keys for {} records",
				self.by_key.len(),
				live.len()
			)));
		}
		for (key, id) in self.by_key.iter() {
			match self.records.get(id) {
				Some(entity) if entity.natural_key() == key => {}
				Some(_) => return Err(violation(format!("tree key {key:?} is stale for {id}"))),
				None => return Err(violation(format!("tree key {key:?} names missing id {id}"))),
			}
		}

		for (field, index) in &self.text_indexes {
			index.check_invariants()?;
			let mut seen: HashSet<&str> = HashSet::new();
			for (text, ids) in index.entries_with_prefix("", usize::MAX) {
				for id in ids {
					let Some(entity) = self.records.get(id) else {
						return Err(violation(format!("{field:?} index names missing id {id}")));
					};
					if normalize(entity.field_text(*field)) != text {
						return Err(violation(format!("{field:?} index entry {text:?} is stale for {id}")));
					}
					if !seen.insert(id.as_str()) {
						return Err(violation(format!("{field:?} index lists {id} twice")));
					}
				}
			}
			if seen != live {
				return Err(violation(format!(
					"{field:?} index covers {} of {} records",
					seen.len(),
					live.len()
				)));
			}
		}

		let sequenced: HashSet<&str> = self.sequence.iter().map(String::as_str).collect();
		if self.sequence.len() != live.len() || sequenced != live {
			return Err(violation(format!(
				"sequence holds {} ids for {} records",
				self.sequence.len(),
				live.len()
			)));
		}
		Ok(())
	}
}

fn add_posting(index: &mut PrefixIndex<Postings>, text: &str, id: &str) {
	match index.get_mut(text) {
		Some(ids) => {
			if !ids.iter().any(|existing| existing == id) {
				ids.push(id.to_string());
			}
		}
		None => {
			index.insert(text, vec![id.to_string()]);
		}
	}
}

fn remove_posting(index: &mut PrefixIndex<Postings>, text: &str, id: &str) {
	let now_empty = match index.get_mut(text) {
		Some(ids) => {
			ids.retain(|existing| existing != id);
			ids.is_empty()
		}
		None => false,
	};
	if now_empty {
		index.delete(text);
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{Book, BookDraft, BookField, BookPatch, User, UserDraft, UserField, UserPatch};
	use proptest::prelude::*;

	fn books() -> EntityIndexStore<Book> {
		EntityIndexStore::default()
	}

	fn add_book(store: &mut EntityIndexStore<Book>, isbn: &str, title: &str, author: &str) -> Book {
		store.add(BookDraft::new(isbn, title, author)).unwrap()
	}

	fn titles(hits: &[&Book]) -> Vec<String> {
		hits.iter().map(|b| b.title.clone()).collect()
	}

	// -- Add ------------------------------------------------------------------

	#[test]
	fn add_indexes_everywhere() {
		let mut store = books();
		let book = add_book(&mut store, "978-1", "Harry Potter", "J. K. Rowling");

		assert_eq!(store.find_by_id(&book.id), Some(&book));
		assert_eq!(store.find_by_natural_key("9781"), Some(&book));
		assert_eq!(titles(&store.search_by_prefix(BookField::Title, "harry")), vec!["Harry Potter"]);
		assert_eq!(titles(&store.search_by_prefix(BookField::Author, "j. k")), vec!["Harry Potter"]);
		assert_eq!(store.len(), 1);
		store.check_invariants().unwrap();
	}

	#[test]
	fn duplicate_natural_key_is_rejected_without_mutation() {
		let mut store = books();
		add_book(&mut store, "978-1", "First", "A");
		let err = store.add(BookDraft::new("9781", "Second", "B")).unwrap_err();
		assert!(matches!(err, CatalogError::DuplicateKey { kind: "book", .. }));
		assert_eq!(store.len(), 1);
		assert!(store.search_by_prefix(BookField::Title, "second").is_empty());
		store.check_invariants().unwrap();
	}

	#[test]
	fn invalid_draft_touches_nothing() {
		let mut store = books();
		assert!(store.add(BookDraft::new("1", "", "A")).is_err());
		assert!(store.is_empty());
		assert_eq!(store.stats().trie_words, 0);
	}

	#[test]
	fn shared_titles_keep_both_entities() {
		let mut store = books();
		let a = add_book(&mut store, "1", "Dune", "Frank Herbert");
		let b = add_book(&mut store, "2", "Dune", "Frank Herbert");
		assert_eq!(store.search_by_prefix(BookField::Title, "dune").len(), 2);

		store.delete(&a.id).unwrap();
		let hits = store.search_by_prefix(BookField::Title, "dune");
		assert_eq!(hits, vec![&b]);
		store.check_invariants().unwrap();
	}

	// -- Update ---------------------------------------------------------------

	#[test]
	fn update_reindexes_changed_fields_only() {
		let mut store = books();
		let book = add_book(&mut store, "1", "Harry Potter", "Rowling");

		let updated = store
			.update(
				&book.id,
				BookPatch {
					title: Some("Hobbit".into()),
					isbn: Some("2".into()),
					..Default::default()
				},
			)
			.unwrap();
		assert_eq!(updated.title, "Hobbit");
		assert!(store.search_by_prefix(BookField::Title, "harry").is_empty());
		assert_eq!(titles(&store.search_by_prefix(BookField::Title, "hob")), vec!["Hobbit"]);
		assert!(store.find_by_natural_key("1").is_none());
		assert_eq!(store.find_by_natural_key("2").map(|b| b.id.as_str()), Some(book.id.as_str()));
		assert_eq!(titles(&store.search_by_prefix(BookField::Author, "rowl")), vec!["Hobbit"]);
		store.check_invariants().unwrap();
	}

	#[test]
	fn update_to_taken_key_fails_atomically() {
		let mut store = books();
		let a = add_book(&mut store, "1", "A", "X");
		add_book(&mut store, "2", "B", "Y");

		let err = store
			.update(
				&a.id,
				BookPatch {
					isbn: Some("2".into()),
					title: Some("Changed".into()),
					..Default::default()
				},
			)
			.unwrap_err();
		assert_eq!(err.code(), "CATALOG_DUPLICATE_KEY");
		assert_eq!(store.find_by_id(&a.id).map(|b| b.title.as_str()), Some("A"));
		assert!(store.search_by_prefix(BookField::Title, "changed").is_empty());
		store.check_invariants().unwrap();
	}

	#[test]
	fn update_and_delete_report_not_found() {
		let mut store = books();
		let err = store.update("missing", BookPatch::default()).unwrap_err();
		assert!(matches!(err, CatalogError::NotFound { .. }));
		let err = store.delete("missing").unwrap_err();
		assert_eq!(err.code(), "CATALOG_NOT_FOUND");
	}

	#[test]
	fn email_keys_are_case_insensitive() {
		let mut users: EntityIndexStore<User> = EntityIndexStore::default();
		let ada = users.add(UserDraft::new("Ada@Example.com", "Ada Lovelace")).unwrap();
		assert!(users.add(UserDraft::new("ada@example.COM", "Other")).is_err());
		assert_eq!(users.find_by_natural_key("ADA@EXAMPLE.COM"), Some(&ada));

		users
			.update(
				&ada.id,
				UserPatch {
					email: Some("ADA@example.com".into()),
					..Default::default()
				},
			)
			.unwrap();
		assert_eq!(users.len(), 1);
		assert_eq!(users.search_by_prefix(UserField::FullName, "ada l").len(), 1);
		users.check_invariants().unwrap();
	}

	// -- Reads ------------------------------------------------------------------

	#[test]
	fn sorted_and_insertion_orders() {
		let mut store = books();
		add_book(&mut store, "C", "Gamma", "x");
		add_book(&mut store, "A", "Alpha", "x");
		add_book(&mut store, "B", "Beta", "x");

		assert_eq!(titles(&store.get_all(true)), vec!["Alpha", "Beta", "Gamma"]);
		assert_eq!(titles(&store.get_all(false)), vec!["Gamma", "Alpha", "Beta"]);
		assert_eq!(titles(&store.range_by_natural_key("a", "b")), vec!["Alpha", "Beta"]);
	}

	#[test]
	fn autocomplete_and_fuzzy() {
		let mut store = books();
		add_book(&mut store, "1", "Harry Potter", "Rowling");
		add_book(&mut store, "2", "Harry Styles", "Somebody");
		add_book(&mut store, "3", "Hard Times", "Dickens");

		assert_eq!(titles(&store.autocomplete(BookField::Title, "Harry P", 10)), vec!["Harry Potter"]);
		assert_eq!(store.autocomplete(BookField::Title, "har", 2).len(), 2);
		assert!(store.autocomplete(BookField::Title, "   ", 5).is_empty());
		assert_eq!(store.suggest(BookField::Title, "h").len(), 3);

		let hits = store.fuzzy_search(BookField::Author, "Dikens", None);
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].0.title, "Hard Times");
		assert_eq!(hits[0].1, 1);
		assert!(store.fuzzy_search(BookField::Author, "Dikens", Some(0)).is_empty());
	}

	#[test]
	fn find_and_filter_use_insertion_order() {
		let mut store = books();
		add_book(&mut store, "2", "Second", "x");
		add_book(&mut store, "1", "First", "y");
		assert_eq!(store.find(|b| b.author == "y").map(|b| b.title.as_str()), Some("First"));
		assert_eq!(titles(&store.filter(|b| b.available_copies == 1)), vec!["Second", "First"]);
	}

	#[test]
	fn clear_and_stats() {
		let mut store = books();
		add_book(&mut store, "1", "ab", "cd");
		let stats = store.stats();
		assert_eq!(stats.entities, 1);
		assert_eq!(stats.tree_height, 1);
		assert_eq!(stats.trie_words, 2);
		assert_eq!(stats.trie_nodes, 3 + 3);

		store.clear();
		assert!(store.is_empty());
		assert_eq!(store.stats().trie_nodes, 2);
		store.check_invariants().unwrap();
	}

	// -- Properties ---------------------------------------------------------

	#[derive(Debug, Clone)]
	enum Op {
		Add(u8, u8, u8),
		Update(usize, Option<u8>, Option<u8>),
		Delete(usize),
	}

	fn op_strategy() -> impl Strategy<Value = Op> {
		prop_oneof![
			(0u8..12, 0u8..4, 0u8..4).prop_map(|(k, t, a)| Op::Add(k, t, a)),
			(any::<usize>(), proptest::option::of(0u8..12), proptest::option::of(0u8..4))
				.prop_map(|(i, k, t)| Op::Update(i, k, t)),
			any::<usize>().prop_map(Op::Delete),
		]
	}

	proptest! {
		#[test]
		fn indexes_never_diverge(ops in prop::collection::vec(op_strategy(), 1..60)) {
			let mut store = books();
			for op in ops {
				let ids: Vec<String> = store.get_all(false).iter().map(|b| b.id.clone()).collect();
				match op {
					Op::Add(k, t, a) => {
						let _ = store.add(BookDraft::new(format!("isbn-{k}"), format!("title {t}"), format!("author {a}")));
					}
					Op::Update(i, k, t) if !ids.is_empty() => {
						let id = &ids[i % ids.len()];
						let _ = store.update(id, BookPatch {
							isbn: k.map(|k| format!("isbn-{k}")),
							title: t.map(|t| format!("title {t}")),
							..Default::default()
						});
					}
					Op::Delete(i) if !ids.is_empty() => {
						let id = ids[i % ids.len()].clone();
						prop_assert!(store.delete(&id).is_ok());
					}
					_ => {}
				}
				prop_assert!(store.check_invariants().is_ok(), "{:?}", store.check_invariants());

				let all: HashSet<String> = store.get_all(false).iter().map(|b| b.id.clone()).collect();
				let sorted: HashSet<String> = store.get_all(true).iter().map(|b| b.id.clone()).collect();
				let by_title: HashSet<String> = store.search_by_prefix(BookField::Title, "title").iter().map(|b| b.id.clone()).collect();
				prop_assert_eq!(&all, &sorted);
				prop_assert_eq!(&all, &by_title);
			}
		}
	}
}
