use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for one entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
	/// Edit distance used by fuzzy search when the caller gives none.
	#[serde(rename = "fuzzyMaxDistance")]
	pub fuzzy_max_distance: usize,
	/// Suggestion cap used by autocomplete when the caller gives none.
	#[serde(rename = "autocompleteLimit")]
	pub autocomplete_limit: usize,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			fuzzy_max_distance: 2,
			autocomplete_limit: 10,
		}
	}
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for the interaction graph engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Similarity edges are written only above zero and at or above this
	/// value.
	#[serde(rename = "minSimilarity")]
	pub min_similarity: f64,
	/// Fraction of a community's members that must share an item for it to
	/// count as a shared item.
	#[serde(rename = "communityItemShare")]
	pub community_item_share: f64,
	/// Smallest connected group of similar users reported as a community.
	#[serde(rename = "minCommunitySize")]
	pub min_community_size: usize,
	/// Result cap for queries called without an explicit limit.
	#[serde(rename = "defaultLimit")]
	pub default_limit: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			min_similarity: 0.0,
			community_item_share: 0.5,
			min_community_size: 2,
			default_limit: 10,
		}
	}
}

// ---------------------------------------------------------------------------
// LibraryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
	pub books: StoreConfig,
	pub users: StoreConfig,
	pub engine: EngineConfig,
}

impl LibraryConfig {
	/// Parse a JSON document; absent fields keep their defaults.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}
}
