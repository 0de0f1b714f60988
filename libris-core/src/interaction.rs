// ---------------------------------------------------------------------------
// InteractionGraphEngine — bipartite interactions plus similarity graphs
// ---------------------------------------------------------------------------
//
// Three graphs stay in lockstep:
//
// 1. `bipartite` (directed): user -> item, weight = interaction count.
// 2. `item_similarity` (undirected): Jaccard over the items' user sets.
// 3. `user_similarity` (undirected): Jaccard over the users' item sets.
//
// Membership maps mirror the bipartite edge set and are what similarity is
// computed from. Recording an interaction only recomputes the pairs that
// involve the touched user or item; `rebuild_similarity_graphs` recomputes
// everything and must land on the same edges.
// ---------------------------------------------------------------------------

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{CatalogError, Result};
use crate::graph::{GraphKind, WeightedGraph};
use crate::similarity::{ScoredId, jaccard, top_scored};

/// Tolerance when comparing stored similarity weights with recomputed ones.
const WEIGHT_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	User,
	Item,
}

/// Which similarity graph a connection query runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityDomain {
	Items,
	Users,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedItem {
	pub id: String,
	/// Users of the queried item who also used this one.
	pub co_occurrences: usize,
	/// `co_occurrences` as a percentage of the queried item's users.
	pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
	pub path: Vec<String>,
	/// Product of the similarities along `path`.
	pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
	pub members: Vec<String>,
	pub shared_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
	pub users: usize,
	pub items: usize,
	/// Distinct (user, item) pairs.
	pub interactions: usize,
	/// Sum of all interaction counts.
	pub total_interactions: u64,
	pub item_similarity_edges: usize,
	pub user_similarity_edges: usize,
}

type Membership = IndexMap<String, BTreeSet<String>>;

// ---------------------------------------------------------------------------
// InteractionGraphEngine
// ---------------------------------------------------------------------------

pub struct InteractionGraphEngine {
	bipartite: WeightedGraph<NodeKind>,
	item_similarity: WeightedGraph<()>,
	user_similarity: WeightedGraph<()>,
	user_items: Membership,
	item_users: Membership,
	config: EngineConfig,
}

impl Default for InteractionGraphEngine {
	fn default() -> Self {
		Self::new(EngineConfig::default())
	}
}

impl InteractionGraphEngine {
	pub fn new(config: EngineConfig) -> Self {
		Self {
			bipartite: WeightedGraph::new(GraphKind::DIRECTED_WEIGHTED),
			item_similarity: WeightedGraph::new(GraphKind::UNDIRECTED_WEIGHTED),
			user_similarity: WeightedGraph::new(GraphKind::UNDIRECTED_WEIGHTED),
			user_items: IndexMap::new(),
			item_users: IndexMap::new(),
			config,
		}
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	fn limit(&self, limit: Option<usize>) -> usize {
		limit.unwrap_or(self.config.default_limit)
	}

	// -- Recording ----------------------------------------------------------

	/// Record one interaction of `user_id` with `item_id` and return the new
	/// interaction count for the pair.
	pub fn record_interaction(&mut self, user_id: &str, item_id: &str) -> Result<u64> {
		if user_id.trim().is_empty() || item_id.trim().is_empty() {
			return Err(CatalogError::Validation("interaction ids must not be empty".into()));
		}
		if user_id == item_id {
			return Err(CatalogError::Validation(format!("id {user_id} cannot interact with itself")));
		}
		self.check_side(user_id, NodeKind::User)?;
		self.check_side(item_id, NodeKind::Item)?;
		self.bipartite.add_node(user_id, NodeKind::User);
		self.bipartite.add_node(item_id, NodeKind::Item);

		let count = self
			.bipartite
			.increment_edge_weight(user_id, item_id, 1.0)
			.ok_or_else(|| CatalogError::InvalidReference {
				source_id: user_id.to_string(),
				target_id: item_id.to_string(),
			})?;

		let new_pair = self
			.user_items
			.entry(user_id.to_string())
			.or_default()
			.insert(item_id.to_string());
		self.item_users
			.entry(item_id.to_string())
			.or_default()
			.insert(user_id.to_string());
		self.item_similarity.add_node(item_id, ());
		self.user_similarity.add_node(user_id, ());

		// A repeat interaction leaves both membership sets unchanged.
		if new_pair {
			refresh_similarities(&mut self.item_similarity, &self.item_users, item_id, self.config.min_similarity);
			refresh_similarities(&mut self.user_similarity, &self.user_items, user_id, self.config.min_similarity);
		}

		tracing::debug!(user = %user_id, item = %item_id, count, new_pair, "interaction recorded");
		Ok(count as u64)
	}

	/// Refuse an id already registered on the other side of the graph.
	fn check_side(&self, id: &str, kind: NodeKind) -> Result<()> {
		match self.bipartite.node_payload(id) {
			Some(existing) if *existing != kind => {
				tracing::warn!(id = %id, ?existing, ?kind, "interaction id used on both sides");
				Err(CatalogError::Validation(format!(
					"id {id} is already registered as {existing:?}"
				)))
			}
			_ => Ok(()),
		}
	}

	/// Recompute both similarity graphs from the membership maps.
	pub fn rebuild_similarity_graphs(&mut self) {
		self.item_similarity = build_similarity_graph(&self.item_users, self.config.min_similarity);
		self.user_similarity = build_similarity_graph(&self.user_items, self.config.min_similarity);
		tracing::info!(
			items = self.item_users.len(),
			users = self.user_items.len(),
			item_edges = self.item_similarity.edge_count(),
			user_edges = self.user_similarity.edge_count(),
			"similarity graphs rebuilt"
		);
	}

	pub fn clear(&mut self) {
		self.bipartite.clear();
		self.item_similarity.clear();
		self.user_similarity.clear();
		self.user_items.clear();
		self.item_users.clear();
		tracing::info!("interaction engine cleared");
	}

	// -- Similarity queries -------------------------------------------------

	/// Items most similar to `item_id`, best first (ties by ascending id).
	pub fn get_similar_items(&self, item_id: &str, limit: Option<usize>) -> Vec<ScoredId> {
		ranked_neighbors(&self.item_similarity, item_id, self.limit(limit))
	}

	/// Users most similar to `user_id`, best first (ties by ascending id).
	pub fn get_similar_users(&self, user_id: &str, limit: Option<usize>) -> Vec<ScoredId> {
		ranked_neighbors(&self.user_similarity, user_id, self.limit(limit))
	}

	/// Items the user has not touched, scored by the summed similarity of the
	/// similar users who did touch them.
	pub fn get_recommendations(&self, user_id: &str, limit: Option<usize>) -> Vec<ScoredId> {
		let Some(own) = self.user_items.get(user_id) else {
			return Vec::new();
		};

		let mut scores: HashMap<&str, f64> = HashMap::new();
		for (peer, similarity) in self.user_similarity.neighbors(user_id) {
			let Some(items) = self.user_items.get(peer) else {
				continue;
			};
			for item in items.iter().filter(|item| !own.contains(*item)) {
				*scores.entry(item.as_str()).or_insert(0.0) += similarity;
			}
		}

		top_scored(
			scores.into_iter().map(|(id, score)| ScoredId::new(id, score)),
			self.limit(limit),
		)
	}

	/// Items co-used with `item_id`, by number of shared users.
	pub fn get_related_items(&self, item_id: &str, limit: Option<usize>) -> Vec<RelatedItem> {
		let Some(users) = self.item_users.get(item_id) else {
			return Vec::new();
		};

		let mut counts: HashMap<&str, usize> = HashMap::new();
		for user in users {
			let Some(items) = self.user_items.get(user) else {
				continue;
			};
			for other in items.iter().filter(|other| *other != item_id) {
				*counts.entry(other.as_str()).or_insert(0) += 1;
			}
		}

		let mut related: Vec<RelatedItem> = counts
			.into_iter()
			.map(|(id, co_occurrences)| RelatedItem {
				id: id.to_string(),
				co_occurrences,
				percentage: co_occurrences as f64 / users.len() as f64 * 100.0,
			})
			.collect();
		related.sort_by(|a, b| b.co_occurrences.cmp(&a.co_occurrences).then_with(|| a.id.cmp(&b.id)));
		related.truncate(self.limit(limit));
		related
	}

	/// Strongest chain of similarities linking `from` to `to`.
	///
	/// Each hop costs `1 - similarity`, so the cheapest path favours strong
	/// links. `None` when either end is unknown or they are not connected.
	pub fn find_shortest_connection(&self, from: &str, to: &str, domain: SimilarityDomain) -> Option<Connection> {
		let graph = match domain {
			SimilarityDomain::Items => &self.item_similarity,
			SimilarityDomain::Users => &self.user_similarity,
		};
		if !graph.has_node(from) || !graph.has_node(to) {
			return None;
		}

		let mut found = graph.dijkstra_by(from, Some(to), |similarity| 1.0 - similarity);
		let route = found.shift_remove(to)?;
		let strength: f64 = route
			.path
			.windows(2)
			.map(|pair| graph.edge_weight(&pair[0], &pair[1]).unwrap_or(0.0))
			.product();
		Some(Connection {
			path: route.path,
			strength,
		})
	}

	/// Connected components of the user similarity graph, with the items used
	/// by at least the configured share of each group.
	///
	/// Components smaller than `min_community_size` (2 by default, which
	/// drops users with no similar peer) are left out.
	pub fn find_communities(&self) -> Vec<Community> {
		let share = self.config.community_item_share;
		let min_size = self.config.min_community_size;
		self.user_similarity
			.find_connected_components()
			.into_iter()
			.filter(|members| members.len() >= min_size)
			.map(|members| {
				let mut counts: IndexMap<&str, usize> = IndexMap::new();
				for member in &members {
					for item in self.user_items.get(member).into_iter().flatten() {
						*counts.entry(item.as_str()).or_insert(0) += 1;
					}
				}
				let mut shared: Vec<(&str, usize)> = counts
					.into_iter()
					.filter(|(_, count)| *count as f64 / members.len() as f64 >= share)
					.collect();
				shared.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
				Community {
					shared_items: shared.into_iter().map(|(id, _)| id.to_string()).collect(),
					members,
				}
			})
			.collect()
	}

	// -- Interaction queries ------------------------------------------------

	pub fn interaction_count(&self, user_id: &str, item_id: &str) -> u64 {
		self.bipartite.edge_weight(user_id, item_id).map_or(0, |w| w as u64)
	}

	pub fn items_for_user(&self, user_id: &str) -> Vec<String> {
		self.user_items
			.get(user_id)
			.map(|items| items.iter().cloned().collect())
			.unwrap_or_default()
	}

	pub fn users_for_item(&self, item_id: &str) -> Vec<String> {
		self.item_users
			.get(item_id)
			.map(|users| users.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Items ranked by number of distinct users.
	pub fn most_popular_items(&self, limit: Option<usize>) -> Vec<ScoredId> {
		top_scored(
			self.item_users
				.iter()
				.map(|(id, users)| ScoredId::new(id.as_str(), users.len() as f64)),
			self.limit(limit),
		)
	}

	pub fn stats(&self) -> EngineStats {
		EngineStats {
			users: self.user_items.len(),
			items: self.item_users.len(),
			interactions: self.bipartite.edge_count(),
			total_interactions: self.bipartite.edges().iter().map(|e| e.weight as u64).sum(),
			item_similarity_edges: self.item_similarity.edge_count(),
			user_similarity_edges: self.user_similarity.edge_count(),
		}
	}

	pub fn item_similarity_graph(&self) -> &WeightedGraph<()> {
		&self.item_similarity
	}

	pub fn user_similarity_graph(&self) -> &WeightedGraph<()> {
		&self.user_similarity
	}

	/// Verify that the membership maps mirror the bipartite graph and that
	/// every similarity edge carries the current Jaccard value.
	pub fn check_consistency(&self) -> Result<()> {
		let pairs: usize = self.user_items.values().map(BTreeSet::len).sum();
		if pairs != self.bipartite.edge_count() {
			return Err(CatalogError::InvariantViolation(format!(
				"{pairs} membership pairs for {} interaction edges",
				self.bipartite.edge_count()
			)));
		}
		for (user, items) in &self.user_items {
			for item in items {
				let mirrored = self.item_users.get(item).is_some_and(|users| users.contains(user));
				if !mirrored || !self.bipartite.has_edge(user, item) {
					return Err(CatalogError::InvariantViolation(format!(
						"interaction {user} -> {item} is not mirrored"
					)));
				}
			}
		}
		let registered = self.user_items.len() + self.item_users.len();
		if registered != self.bipartite.node_count() {
			return Err(CatalogError::InvariantViolation(format!(
				"{} interaction nodes for {registered} registered users and items",
				self.bipartite.node_count()
			)));
		}
		let mirrored_pairs: usize = self.item_users.values().map(BTreeSet::len).sum();
		if mirrored_pairs != pairs {
			return Err(CatalogError::InvariantViolation(format!(
				"user side holds {pairs} pairs, item side {mirrored_pairs}"
			)));
		}

		check_similarity_edges(&self.item_similarity, &self.item_users, "item")?;
		check_similarity_edges(&self.user_similarity, &self.user_items, "user")
	}
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Rewrite every similarity edge touching `changed`.
fn refresh_similarities(graph: &mut WeightedGraph<()>, members: &Membership, changed: &str, min_similarity: f64) {
	let Some(own) = members.get(changed) else {
		return;
	};
	for (other, theirs) in members {
		if other == changed || theirs.is_empty() {
			continue;
		}
		let similarity = jaccard(own, theirs);
		if similarity > 0.0 && similarity >= min_similarity {
			graph.add_edge(changed, other, similarity);
		} else {
			graph.remove_edge(changed, other);
		}
	}
}

fn build_similarity_graph(members: &Membership, min_similarity: f64) -> WeightedGraph<()> {
	let mut graph = WeightedGraph::new(GraphKind::UNDIRECTED_WEIGHTED);
	for id in members.keys() {
		graph.add_node(id.as_str(), ());
	}
	let entries: Vec<(&String, &BTreeSet<String>)> = members.iter().collect();
	for (i, (a, a_set)) in entries.iter().enumerate() {
		for (b, b_set) in &entries[i + 1..] {
			let similarity = jaccard(a_set, b_set);
			if similarity > 0.0 && similarity >= min_similarity {
				graph.add_edge(a, b, similarity);
			}
		}
	}
	graph
}

fn ranked_neighbors(graph: &WeightedGraph<()>, id: &str, limit: usize) -> Vec<ScoredId> {
	top_scored(
		graph
			.neighbors(id)
			.into_iter()
			.map(|(peer, similarity)| ScoredId::new(peer, similarity)),
		limit,
	)
}

fn check_similarity_edges(graph: &WeightedGraph<()>, members: &Membership, side: &str) -> Result<()> {
	for edge in graph.edges() {
		let expected = match (members.get(&edge.source), members.get(&edge.target)) {
			(Some(a), Some(b)) => jaccard(a, b),
			_ => 0.0,
		};
		if (edge.weight - expected).abs() > WEIGHT_EPSILON {
			return Err(CatalogError::InvariantViolation(format!(
				"{side} similarity {} ~ {} is {} but should be {expected}",
				edge.source, edge.target, edge.weight
			)));
		}
	}
	Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
