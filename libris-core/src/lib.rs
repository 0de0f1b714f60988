//! In-memory catalog core: multi-index entity stores for books and users,
//! and a graph engine that turns borrowing history into similarity and
//! recommendations.
//!
//! [`LibraryContext`] is the entry point. It owns one
//! [`EntityIndexStore`] per entity kind and one [`InteractionGraphEngine`].

pub mod avl;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod interaction;
pub mod sequence;
pub mod similarity;
pub mod store;
pub mod text;
pub mod trie;
pub mod types;

pub use config::{EngineConfig, LibraryConfig, StoreConfig};
pub use context::{LibraryContext, LibraryStats, ScoredBook};
pub use error::{CatalogError, Result};
pub use graph::{GraphEdge, GraphKind, ShortestPath, WeightedGraph};
pub use interaction::{
	Community, Connection, EngineStats, InteractionGraphEngine, NodeKind, RelatedItem, SimilarityDomain,
};
pub use similarity::ScoredId;
pub use store::{EntityIndexStore, StoreStats};
pub use types::{
	Book, BookDraft, BookField, BookPatch, IndexedEntity, User, UserDraft, UserField, UserPatch,
};
