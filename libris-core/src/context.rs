// ---------------------------------------------------------------------------
// LibraryContext — the service surface over stores and engine
// ---------------------------------------------------------------------------
//
// Built once at start-up and passed by reference. Each store and the engine
// sits behind its own mutex; a compound query takes one lock, copies what it
// needs out, and releases it before taking the next.
// ---------------------------------------------------------------------------

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::LibraryConfig;
use crate::error::{CatalogError, Result};
use crate::interaction::{
	Community, Connection, EngineStats, InteractionGraphEngine, RelatedItem, SimilarityDomain,
};
use crate::similarity::ScoredId;
use crate::store::{EntityIndexStore, StoreStats};
use crate::types::{Book, BookDraft, BookField, BookPatch, IndexedEntity, User, UserDraft, UserField, UserPatch};

/// A book snapshot with the score that surfaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredBook {
	pub book: Book,
	pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
	pub books: StoreStats,
	pub users: StoreStats,
	pub engine: EngineStats,
}

pub struct LibraryContext {
	books: Mutex<EntityIndexStore<Book>>,
	users: Mutex<EntityIndexStore<User>>,
	engine: Mutex<InteractionGraphEngine>,
	config: LibraryConfig,
}

impl Default for LibraryContext {
	fn default() -> Self {
		Self::new(LibraryConfig::default())
	}
}

impl LibraryContext {
	pub fn new(config: LibraryConfig) -> Self {
		tracing::info!(?config, "library context created");
		Self {
			books: Mutex::new(EntityIndexStore::new(config.books.clone())),
			users: Mutex::new(EntityIndexStore::new(config.users.clone())),
			engine: Mutex::new(InteractionGraphEngine::new(config.engine.clone())),
			config,
		}
	}

	pub fn config(&self) -> &LibraryConfig {
		&self.config
	}

	// -- Locked access ------------------------------------------------------

	pub fn with_books<R>(&self, f: impl FnOnce(&EntityIndexStore<Book>) -> R) -> R {
		f(&*self.books.lock())
	}

	pub fn with_books_mut<R>(&self, f: impl FnOnce(&mut EntityIndexStore<Book>) -> R) -> R {
		f(&mut *self.books.lock())
	}

	pub fn with_users<R>(&self, f: impl FnOnce(&EntityIndexStore<User>) -> R) -> R {
		f(&*self.users.lock())
	}

	pub fn with_users_mut<R>(&self, f: impl FnOnce(&mut EntityIndexStore<User>) -> R) -> R {
		f(&mut *self.users.lock())
	}

	pub fn with_engine<R>(&self, f: impl FnOnce(&InteractionGraphEngine) -> R) -> R {
		f(&*self.engine.lock())
	}

	pub fn with_engine_mut<R>(&self, f: impl FnOnce(&mut InteractionGraphEngine) -> R) -> R {
		f(&mut *self.engine.lock())
	}

	// -- Books --------------------------------------------------------------

	pub fn add_book(&self, draft: BookDraft) -> Result<Book> {
		self.with_books_mut(|books| books.add(draft))
	}

	pub fn update_book(&self, id: &str, patch: BookPatch) -> Result<Book> {
		self.with_books_mut(|books| books.update(id, patch))
	}

	/// Remove a book from the catalog. Its interaction history stays in the
	/// engine; resolved queries skip it from now on.
	pub fn delete_book(&self, id: &str) -> Result<Book> {
		self.with_books_mut(|books| books.delete(id))
	}

	pub fn find_book(&self, id: &str) -> Option<Book> {
		self.with_books(|books| books.find_by_id(id).cloned())
	}

	pub fn find_book_by_isbn(&self, isbn: &str) -> Option<Book> {
		self.with_books(|books| books.find_by_natural_key(isbn).cloned())
	}

	pub fn search_books(&self, field: BookField, query: &str) -> Vec<Book> {
		self.with_books(|books| cloned(books.search_by_prefix(field, query)))
	}

	pub fn autocomplete_books(&self, field: BookField, query: &str, limit: Option<usize>) -> Vec<Book> {
		self.with_books(|books| match limit {
			Some(limit) => cloned(books.autocomplete(field, query, limit)),
			None => cloned(books.suggest(field, query)),
		})
	}

	pub fn fuzzy_search_books(&self, field: BookField, query: &str, max_distance: Option<usize>) -> Vec<(Book, usize)> {
		self.with_books(|books| {
			books
				.fuzzy_search(field, query, max_distance)
				.into_iter()
				.map(|(book, distance)| (book.clone(), distance))
				.collect()
		})
	}

	pub fn all_books(&self, sorted: bool) -> Vec<Book> {
		self.with_books(|books| cloned(books.get_all(sorted)))
	}

	// -- Users --------------------------------------------------------------

	pub fn add_user(&self, draft: UserDraft) -> Result<User> {
		self.with_users_mut(|users| users.add(draft))
	}

	pub fn update_user(&self, id: &str, patch: UserPatch) -> Result<User> {
		self.with_users_mut(|users| users.update(id, patch))
	}

	pub fn delete_user(&self, id: &str) -> Result<User> {
		self.with_users_mut(|users| users.delete(id))
	}

	pub fn find_user(&self, id: &str) -> Option<User> {
		self.with_users(|users| users.find_by_id(id).cloned())
	}

	pub fn find_user_by_email(&self, email: &str) -> Option<User> {
		self.with_users(|users| users.find_by_natural_key(email).cloned())
	}

	pub fn search_users(&self, field: UserField, query: &str) -> Vec<User> {
		self.with_users(|users| cloned(users.search_by_prefix(field, query)))
	}

	pub fn autocomplete_users(&self, field: UserField, query: &str, limit: Option<usize>) -> Vec<User> {
		self.with_users(|users| match limit {
			Some(limit) => cloned(users.autocomplete(field, query, limit)),
			None => cloned(users.suggest(field, query)),
		})
	}

	pub fn all_users(&self, sorted: bool) -> Vec<User> {
		self.with_users(|users| cloned(users.get_all(sorted)))
	}

	// -- Interactions -------------------------------------------------------

	/// Record that `user_id` used `book_id`. Both must exist in their stores.
	pub fn record_interaction(&self, user_id: &str, book_id: &str) -> Result<u64> {
		require_present::<User>(self.with_users(|users| users.contains(user_id)), user_id)?;
		require_present::<Book>(self.with_books(|books| books.contains(book_id)), book_id)?;
		self.with_engine_mut(|engine| engine.record_interaction(user_id, book_id))
	}

	pub fn get_similar_items(&self, book_id: &str, limit: Option<usize>) -> Vec<ScoredId> {
		self.with_engine(|engine| engine.get_similar_items(book_id, limit))
	}

	pub fn get_similar_users(&self, user_id: &str, limit: Option<usize>) -> Vec<ScoredId> {
		self.with_engine(|engine| engine.get_similar_users(user_id, limit))
	}

	pub fn get_recommendations(&self, user_id: &str, limit: Option<usize>) -> Vec<ScoredId> {
		self.with_engine(|engine| engine.get_recommendations(user_id, limit))
	}

	pub fn get_related_items(&self, book_id: &str, limit: Option<usize>) -> Vec<RelatedItem> {
		self.with_engine(|engine| engine.get_related_items(book_id, limit))
	}

	pub fn find_shortest_connection(&self, from: &str, to: &str, domain: SimilarityDomain) -> Option<Connection> {
		self.with_engine(|engine| engine.find_shortest_connection(from, to, domain))
	}

	pub fn find_communities(&self) -> Vec<Community> {
		self.with_engine(|engine| engine.find_communities())
	}

	/// Recommendations resolved to book snapshots. Books deleted since the
	/// interaction was recorded are dropped.
	pub fn recommend_books(&self, user_id: &str, limit: Option<usize>) -> Vec<ScoredBook> {
		let scored = self.get_recommendations(user_id, limit);
		self.resolve_books(scored)
	}

	/// Similar books resolved to snapshots, skipping deleted ones.
	pub fn similar_books(&self, book_id: &str, limit: Option<usize>) -> Vec<ScoredBook> {
		let scored = self.get_similar_items(book_id, limit);
		self.resolve_books(scored)
	}

	fn resolve_books(&self, scored: Vec<ScoredId>) -> Vec<ScoredBook> {
		self.with_books(|books| {
			scored
				.into_iter()
				.filter_map(|ScoredId { id, score }| {
					books.find_by_id(&id).map(|book| ScoredBook {
						book: book.clone(),
						score,
					})
				})
				.collect()
		})
	}

	// -- Maintenance --------------------------------------------------------

	pub fn rebuild_all(&self) {
		self.with_engine_mut(InteractionGraphEngine::rebuild_similarity_graphs);
	}

	pub fn get_stats(&self) -> LibraryStats {
		LibraryStats {
			books: self.with_books(EntityIndexStore::stats),
			users: self.with_users(EntityIndexStore::stats),
			engine: self.with_engine(InteractionGraphEngine::stats),
		}
	}

	/// Run every structural self-check.
	pub fn check_invariants(&self) -> Result<()> {
		self.with_books(EntityIndexStore::check_invariants)?;
		self.with_users(EntityIndexStore::check_invariants)?;
		self.with_engine(InteractionGraphEngine::check_consistency)
	}

	pub fn clear(&self) {
		self.with_books_mut(EntityIndexStore::clear);
		self.with_users_mut(EntityIndexStore::clear);
		self.with_engine_mut(InteractionGraphEngine::clear);
	}
}

fn require_present<E: IndexedEntity>(present: bool, id: &str) -> Result<()> {
	if present {
		return Ok(());
	}
	tracing::warn!(kind = E::KIND, id = %id, "interaction references unknown entity");
	Err(CatalogError::NotFound {
		kind: E::KIND,
		id: id.to_string(),
	})
}

fn cloned<E: Clone>(entities: Vec<&E>) -> Vec<E> {
	entities.into_iter().cloned().collect()
}
