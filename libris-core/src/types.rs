use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CatalogError, Result};
use crate::text::{normalize, normalize_email, normalize_isbn};

// ---------------------------------------------------------------------------
// IndexedEntity
// ---------------------------------------------------------------------------

/// An entity kind that an [`EntityIndexStore`](crate::store::EntityIndexStore)
/// can hold: one natural key for the ordered tree, a fixed set of free-text
/// fields for the prefix indexes.
pub trait IndexedEntity: Clone + Debug {
	/// Names a free-text field with its own prefix index.
	type Field: Copy + Eq + Hash + Debug + 'static;
	/// Input for `add`.
	type Draft;
	/// Partial input for `update`.
	type Patch;

	/// Lower-case kind name, used in errors and logs.
	const KIND: &'static str;

	fn id(&self) -> &str;

	/// Natural key as the caller wrote it.
	fn raw_natural_key(&self) -> &str;

	/// Fold a natural key into its comparison form.
	fn fold_key(raw: &str) -> String;

	/// Natural key folded to its comparison form.
	fn natural_key(&self) -> String {
		Self::fold_key(self.raw_natural_key())
	}

	fn indexed_fields() -> &'static [Self::Field];

	fn field_text(&self, field: Self::Field) -> &str;

	/// Build and validate a new entity.
	fn from_draft(id: String, draft: Self::Draft, now: u64) -> Result<Self>;

	/// Copy of `self` with `patch` applied and validated.
	fn patched(&self, patch: Self::Patch) -> Result<Self>;
}

fn require_text(kind: &str, field: &str, value: &str) -> Result<()> {
	if normalize(value).is_empty() {
		return Err(CatalogError::Validation(format!("{kind} {field} must not be empty")));
	}
	Ok(())
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookField {
	Title,
	Author,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
	pub id: String,
	pub isbn: String,
	pub title: String,
	pub author: String,
	pub genre: Option<String>,
	pub published_year: Option<u16>,
	pub total_copies: u32,
	pub available_copies: u32,
	pub added_at: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
	pub isbn: String,
	pub title: String,
	pub author: String,
	#[serde(default)]
	pub genre: Option<String>,
	#[serde(default)]
	pub published_year: Option<u16>,
	#[serde(default = "default_copies")]
	pub total_copies: u32,
}

fn default_copies() -> u32 {
	1
}

/// Marks a patch field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Some)
}

impl BookDraft {
	pub fn new(isbn: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
		Self {
			isbn: isbn.into(),
			title: title.into(),
			author: author.into(),
			genre: None,
			published_year: None,
			total_copies: default_copies(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
	pub isbn: Option<String>,
	pub title: Option<String>,
	pub author: Option<String>,
	/// `Some(None)` clears the genre; JSON `null` maps to it.
	#[serde(default, deserialize_with = "present")]
	pub genre: Option<Option<String>>,
	#[serde(default, deserialize_with = "present")]
	pub published_year: Option<Option<u16>>,
	pub total_copies: Option<u32>,
	pub available_copies: Option<u32>,
}

impl Book {
	fn validate(&self) -> Result<()> {
		if normalize_isbn(&self.isbn).is_empty() {
			return Err(CatalogError::Validation("book isbn must not be empty".into()));
		}
		require_text("book", "title", &self.title)?;
		require_text("book", "author", &self.author)?;
		if self.available_copies > self.total_copies {
			return Err(CatalogError::Validation(format!(
				"available copies ({}) exceed total copies ({})",
				self.available_copies, self.total_copies
			)));
		}
		Ok(())
	}
}

impl IndexedEntity for Book {
	type Field = BookField;
	type Draft = BookDraft;
	type Patch = BookPatch;

	const KIND: &'static str = "book";

	fn id(&self) -> &str {
		&self.id
	}

	fn raw_natural_key(&self) -> &str {
		&self.isbn
	}

	fn fold_key(raw: &str) -> String {
		normalize_isbn(raw)
	}

	fn indexed_fields() -> &'static [BookField] {
		&[BookField::Title, BookField::Author]
	}

	fn field_text(&self, field: BookField) -> &str {
		match field {
			BookField::Title => &self.title,
			BookField::Author => &self.author,
		}
	}

	fn from_draft(id: String, draft: BookDraft, now: u64) -> Result<Self> {
		let book = Self {
			id,
			isbn: draft.isbn.trim().to_string(),
			title: draft.title.trim().to_string(),
			author: draft.author.trim().to_string(),
			genre: draft.genre,
			published_year: draft.published_year,
			total_copies: draft.total_copies,
			available_copies: draft.total_copies,
			added_at: now,
		};
		book.validate()?;
		Ok(book)
	}

	fn patched(&self, patch: BookPatch) -> Result<Self> {
		let mut book = self.clone();
		if let Some(isbn) = patch.isbn {
			book.isbn = isbn.trim().to_string();
		}
		if let Some(title) = patch.title {
			book.title = title.trim().to_string();
		}
		if let Some(author) = patch.author {
			book.author = author.trim().to_string();
		}
		if let Some(genre) = patch.genre {
			book.genre = genre;
		}
		if let Some(year) = patch.published_year {
			book.published_year = year;
		}
		if let Some(total) = patch.total_copies {
			book.total_copies = total;
		}
		if let Some(available) = patch.available_copies {
			book.available_copies = available;
		}
		book.validate()?;
		Ok(book)
	}
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserField {
	FullName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: String,
	pub email: String,
	pub full_name: String,
	pub member_since: u64,
	pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
	pub email: String,
	pub full_name: String,
}

impl UserDraft {
	pub fn new(email: impl Into<String>, full_name: impl Into<String>) -> Self {
		Self {
			email: email.into(),
			full_name: full_name.into(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
	pub email: Option<String>,
	pub full_name: Option<String>,
	pub active: Option<bool>,
}

impl User {
	fn validate(&self) -> Result<()> {
		let email = self.email.trim();
		match email.split_once('@') {
			Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
			_ => {
				return Err(CatalogError::Validation(format!(
					"email {email:?} must look like name@domain"
				)));
			}
		}
		require_text("user", "full name", &self.full_name)
	}
}

impl IndexedEntity for User {
	type Field = UserField;
	type Draft = UserDraft;
	type Patch = UserPatch;

	const KIND: &'static str = "user";

	fn id(&self) -> &str {
		&self.id
	}

	fn raw_natural_key(&self) -> &str {
		&self.email
	}

	fn fold_key(raw: &str) -> String {
		normalize_email(raw)
	}

	fn indexed_fields() -> &'static [UserField] {
		&[UserField::FullName]
	}

	fn field_text(&self, field: UserField) -> &str {
		match field {
			UserField::FullName => &self.full_name,
		}
	}

	fn from_draft(id: String, draft: UserDraft, now: u64) -> Result<Self> {
		let user = Self {
			id,
			email: draft.email.trim().to_string(),
			full_name: draft.full_name.trim().to_string(),
			member_since: now,
			active: true,
		};
		user.validate()?;
		Ok(user)
	}

	fn patched(&self, patch: UserPatch) -> Result<Self> {
		let mut user = self.clone();
		if let Some(email) = patch.email {
			user.email = email.trim().to_string();
		}
		if let Some(full_name) = patch.full_name {
			user.full_name = full_name.trim().to_string();
		}
		if let Some(active) = patch.active {
			user.active = active;
		}
		user.validate()?;
		Ok(user)
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
