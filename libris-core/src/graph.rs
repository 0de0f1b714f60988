// ---------------------------------------------------------------------------
// WeightedGraph — adjacency-list graph with traversal and path algorithms
// ---------------------------------------------------------------------------
//
// Nodes carry a payload `P`. Edges are (source, target, weight) triples kept
// in insertion-ordered maps so traversal order is reproducible:
//
// 1. Undirected graphs store each edge in both endpoints' adjacency entries
//    but count and enumerate it once.
// 2. Directed graphs additionally keep a reverse index (target -> sources) so
//    `remove_node` and `incoming` never scan the whole graph.
// 3. Unweighted graphs store every edge with weight 1.0.
// ---------------------------------------------------------------------------

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphKind {
	pub directed: bool,
	pub weighted: bool,
}

impl GraphKind {
	pub const UNDIRECTED_WEIGHTED: Self = Self {
		directed: false,
		weighted: true,
	};
	pub const DIRECTED_WEIGHTED: Self = Self {
		directed: true,
		weighted: true,
	};
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
	pub source: String,
	pub target: String,
	pub weight: f64,
}

/// Cheapest known route from the Dijkstra start node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortestPath {
	pub distance: f64,
	/// Node ids from start to this node, both inclusive.
	pub path: Vec<String>,
}

type Adjacency = IndexMap<String, IndexMap<String, f64>>;

// ---------------------------------------------------------------------------
// WeightedGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WeightedGraph<P> {
	kind: GraphKind,
	nodes: IndexMap<String, P>,
	adjacency: Adjacency,
	/// target -> source -> weight. Directed graphs only.
	reverse: Adjacency,
	edge_count: usize,
}

impl<P> WeightedGraph<P> {
	pub fn new(kind: GraphKind) -> Self {
		Self {
			kind,
			nodes: IndexMap::new(),
			adjacency: IndexMap::new(),
			reverse: IndexMap::new(),
			edge_count: 0,
		}
	}

	pub fn kind(&self) -> GraphKind {
		self.kind
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn edge_count(&self) -> usize {
		self.edge_count
	}

	pub fn clear(&mut self) {
		self.nodes.clear();
		self.adjacency.clear();
		self.reverse.clear();
		self.edge_count = 0;
	}

	// -- Nodes --------------------------------------------------------------

	/// Add a node. Returns `false` (and keeps the old payload) when `id`
	/// already exists.
	pub fn add_node(&mut self, id: impl Into<String>, payload: P) -> bool {
		let id = id.into();
		if self.nodes.contains_key(&id) {
			return false;
		}
		self.adjacency.insert(id.clone(), IndexMap::new());
		if self.kind.directed {
			self.reverse.insert(id.clone(), IndexMap::new());
		}
		self.nodes.insert(id, payload);
		true
	}

	/// Remove a node and every edge touching it.
	pub fn remove_node(&mut self, id: &str) -> Option<P> {
		let payload = self.nodes.shift_remove(id)?;
		let outgoing = self.adjacency.shift_remove(id).unwrap_or_default();

		if self.kind.directed {
			let incoming = self.reverse.shift_remove(id).unwrap_or_default();
			for target in outgoing.keys() {
				if let Some(sources) = self.reverse.get_mut(target) {
					sources.shift_remove(id);
				}
			}
			for source in incoming.keys() {
				if let Some(targets) = self.adjacency.get_mut(source) {
					targets.shift_remove(id);
				}
			}
			let self_loop = usize::from(outgoing.contains_key(id));
			self.edge_count -= outgoing.len() + incoming.len() - self_loop;
		} else {
			for neighbor in outgoing.keys() {
				if let Some(targets) = self.adjacency.get_mut(neighbor) {
					targets.shift_remove(id);
				}
			}
			self.edge_count -= outgoing.len();
		}

		tracing::debug!(node = %id, edges = self.edge_count, "graph node removed");
		Some(payload)
	}

	pub fn has_node(&self, id: &str) -> bool {
		self.nodes.contains_key(id)
	}

	pub fn node_payload(&self, id: &str) -> Option<&P> {
		self.nodes.get(id)
	}

	/// Node ids in insertion order.
	pub fn node_ids(&self) -> impl Iterator<Item = &str> {
		self.nodes.keys().map(String::as_str)
	}

	// -- Edges --------------------------------------------------------------

	/// Add or overwrite an edge. Returns `false` when an endpoint is missing
	/// or the weight is negative or not finite.
	pub fn add_edge(&mut self, source: &str, target: &str, weight: f64) -> bool {
		if !self.has_node(source) || !self.has_node(target) {
			return false;
		}
		if !weight.is_finite() || weight < 0.0 {
			tracing::warn!(source, target, weight, "rejected edge weight");
			return false;
		}
		let weight = if self.kind.weighted { weight } else { 1.0 };

		let previous = self
			.adjacency
			.get_mut(source)
			.and_then(|targets| targets.insert(target.to_string(), weight));
		if self.kind.directed {
			if let Some(sources) = self.reverse.get_mut(target) {
				sources.insert(source.to_string(), weight);
			}
		} else if let Some(targets) = self.adjacency.get_mut(target) {
			targets.insert(source.to_string(), weight);
		}

		if previous.is_none() {
			self.edge_count += 1;
		}
		true
	}

	/// [`add_edge`](Self::add_edge) reporting a missing endpoint as an error.
	pub fn try_add_edge(&mut self, source: &str, target: &str, weight: f64) -> Result<()> {
		if !self.has_node(source) || !self.has_node(target) {
			return Err(CatalogError::InvalidReference {
				source_id: source.to_string(),
				target_id: target.to_string(),
			});
		}
		if !self.add_edge(source, target, weight) {
			return Err(CatalogError::Validation(format!(
				"edge weight {weight} must be finite and non-negative"
			)));
		}
		Ok(())
	}

	/// Remove an edge, returning its weight.
	pub fn remove_edge(&mut self, source: &str, target: &str) -> Option<f64> {
		let weight = self.adjacency.get_mut(source)?.shift_remove(target)?;
		if self.kind.directed {
			if let Some(sources) = self.reverse.get_mut(target) {
				sources.shift_remove(source);
			}
		} else if let Some(targets) = self.adjacency.get_mut(target) {
			targets.shift_remove(source);
		}
		self.edge_count -= 1;
		Some(weight)
	}

	/// Add `by` to the edge weight (0 when absent). Returns the new weight, or
	/// `None` when the edge could not be written.
	pub fn increment_edge_weight(&mut self, source: &str, target: &str, by: f64) -> Option<f64> {
		let weight = self.edge_weight(source, target).unwrap_or(0.0) + by;
		if !self.add_edge(source, target, weight) {
			return None;
		}
		self.edge_weight(source, target)
	}

	pub fn has_edge(&self, source: &str, target: &str) -> bool {
		self.edge_weight(source, target).is_some()
	}

	pub fn edge_weight(&self, source: &str, target: &str) -> Option<f64> {
		self.adjacency.get(source)?.get(target).copied()
	}

	/// Outgoing neighbours with edge weights, in insertion order.
	pub fn neighbors(&self, id: &str) -> Vec<(&str, f64)> {
		Self::entries(self.adjacency.get(id))
	}

	/// Incoming neighbours. Same as `neighbors` for undirected graphs.
	pub fn incoming(&self, id: &str) -> Vec<(&str, f64)> {
		if self.kind.directed {
			Self::entries(self.reverse.get(id))
		} else {
			self.neighbors(id)
		}
	}

	fn entries(map: Option<&IndexMap<String, f64>>) -> Vec<(&str, f64)> {
		map.map(|m| m.iter().map(|(k, w)| (k.as_str(), *w)).collect())
			.unwrap_or_default()
	}

	pub fn out_degree(&self, id: &str) -> usize {
		self.adjacency.get(id).map_or(0, IndexMap::len)
	}

	pub fn in_degree(&self, id: &str) -> usize {
		if self.kind.directed {
			self.reverse.get(id).map_or(0, IndexMap::len)
		} else {
			self.out_degree(id)
		}
	}

	/// Total edges touching `id` (in + out for directed graphs).
	pub fn degree(&self, id: &str) -> usize {
		if self.kind.directed {
			self.out_degree(id) + self.in_degree(id)
		} else {
			self.out_degree(id)
		}
	}

	/// Every edge once, grouped by source in node insertion order.
	pub fn edges(&self) -> Vec<GraphEdge> {
		let mut out = Vec::with_capacity(self.edge_count);
		for (source_idx, (source, targets)) in self.adjacency.iter().enumerate() {
			for (target, weight) in targets {
				if !self.kind.directed {
					let target_idx = self.adjacency.get_index_of(target).unwrap_or(usize::MAX);
					if target_idx < source_idx {
						continue;
					}
				}
				out.push(GraphEdge {
					source: source.clone(),
					target: target.clone(),
					weight: *weight,
				});
			}
		}
		out
	}

	// -- Traversal ----------------------------------------------------------

	/// Breadth-first discovery order from `start`. Empty when absent.
	pub fn bfs(&self, start: &str) -> Vec<String> {
		if !self.has_node(start) {
			return Vec::new();
		}
		let mut visited: HashSet<&str> = HashSet::from([start]);
		let mut queue: VecDeque<&str> = VecDeque::from([start]);
		let mut order = Vec::new();

		while let Some(current) = queue.pop_front() {
			order.push(current.to_string());
			if let Some(targets) = self.adjacency.get(current) {
				for next in targets.keys() {
					if visited.insert(next.as_str()) {
						queue.push_back(next.as_str());
					}
				}
			}
		}
		order
	}

	/// Depth-first pre-order from `start`. Empty when absent.
	pub fn dfs(&self, start: &str) -> Vec<String> {
		if !self.has_node(start) {
			return Vec::new();
		}
		let mut visited: HashSet<&str> = HashSet::new();
		self.dfs_from(start, &mut visited)
	}

	fn dfs_from<'a>(&'a self, start: &'a str, visited: &mut HashSet<&'a str>) -> Vec<String> {
		let mut order = Vec::new();
		let mut stack: Vec<&str> = vec![start];
		while let Some(current) = stack.pop() {
			if !visited.insert(current) {
				continue;
			}
			order.push(current.to_string());
			if let Some(targets) = self.adjacency.get(current) {
				// Reverse so the first neighbour is explored first.
				for next in targets.keys().rev() {
					if !visited.contains(next.as_str()) {
						stack.push(next.as_str());
					}
				}
			}
		}
		order
	}

	// -- Shortest paths -----------------------------------------------------

	/// Dijkstra from `start` over edge weights. Every reachable node gets its
	/// distance and path; with `end` set, the search stops once `end` is
	/// settled.
	pub fn dijkstra(&self, start: &str, end: Option<&str>) -> IndexMap<String, ShortestPath> {
		self.dijkstra_by(start, end, |weight| weight)
	}

	/// Dijkstra with edge cost `cost(weight)`. Negative costs are clamped to 0.
	pub fn dijkstra_by<F>(&self, start: &str, end: Option<&str>, cost: F) -> IndexMap<String, ShortestPath>
	where
		F: Fn(f64) -> f64,
	{
		let mut settled: IndexMap<String, ShortestPath> = IndexMap::new();
		if !self.has_node(start) {
			return settled;
		}

		let mut dist: HashMap<&str, f64> = HashMap::from([(start, 0.0)]);
		let mut previous: HashMap<&str, &str> = HashMap::new();
		// min-heap on (distance, id)
		let mut heap: BinaryHeap<(Reverse<OrderedFloat<f64>>, Reverse<&str>)> = BinaryHeap::new();
		heap.push((Reverse(OrderedFloat(0.0)), Reverse(start)));

		while let Some((Reverse(OrderedFloat(d)), Reverse(current))) = heap.pop() {
			if settled.contains_key(current) {
				continue;
			}
			settled.insert(
				current.to_string(),
				ShortestPath {
					distance: d,
					path: Self::trace(&previous, current),
				},
			);
			if end == Some(current) {
				break;
			}

			let Some(targets) = self.adjacency.get(current) else {
				continue;
			};
			for (next, weight) in targets {
				if settled.contains_key(next.as_str()) {
					continue;
				}
				let candidate = d + cost(*weight).max(0.0);
				let best = dist.entry(next.as_str()).or_insert(f64::INFINITY);
				if candidate < *best {
					*best = candidate;
					previous.insert(next.as_str(), current);
					heap.push((Reverse(OrderedFloat(candidate)), Reverse(next.as_str())));
				}
			}
		}
		settled
	}

	fn trace<'a>(previous: &HashMap<&'a str, &'a str>, node: &'a str) -> Vec<String> {
		let mut path = vec![node.to_string()];
		let mut cursor = node;
		while let Some(&prev) = previous.get(cursor) {
			path.push(prev.to_string());
			cursor = prev;
		}
		path.reverse();
		path
	}

	/// Cheapest path from `start` to `end`, if reachable.
	pub fn shortest_path(&self, start: &str, end: &str) -> Option<ShortestPath> {
		self.dijkstra(start, Some(end)).shift_remove(end)
	}

	// -- Structure ----------------------------------------------------------

	/// Forward-reachability components, seeded in node insertion order.
	///
	/// Exact for undirected graphs. For directed graphs a node joins the
	/// component of the first earlier seed that reaches it.
	pub fn find_connected_components(&self) -> Vec<Vec<String>> {
		let mut visited: HashSet<&str> = HashSet::new();
		let mut components = Vec::new();
		for id in self.nodes.keys() {
			if visited.contains(id.as_str()) {
				continue;
			}
			components.push(self.dfs_from(id, &mut visited));
		}
		components
	}

	/// Components ignoring edge direction (union-find).
	pub fn find_weakly_connected_components(&self) -> Vec<Vec<String>> {
		let mut uf = UnionFind::new(self.nodes.len());
		for (source_idx, targets) in self.adjacency.values().enumerate() {
			for target in targets.keys() {
				if let Some(target_idx) = self.nodes.get_index_of(target) {
					uf.union(source_idx, target_idx);
				}
			}
		}

		let mut groups: IndexMap<usize, Vec<String>> = IndexMap::new();
		for (idx, id) in self.nodes.keys().enumerate() {
			groups.entry(uf.find(idx)).or_default().push(id.clone());
		}
		groups.into_values().collect()
	}

	/// `degree / (|V| - 1)` per node, using out-degree for directed graphs.
	/// A single node scores 0.
	pub fn degree_centrality(&self) -> IndexMap<String, f64> {
		let n = self.nodes.len();
		self.nodes
			.keys()
			.map(|id| {
				let score = if n > 1 {
					self.out_degree(id) as f64 / (n - 1) as f64
				} else {
					0.0
				};
				(id.clone(), score)
			})
			.collect()
	}
}

// ---------------------------------------------------------------------------
// Union-Find
// ---------------------------------------------------------------------------

struct UnionFind {
	parent: Vec<usize>,
	rank: Vec<usize>,
}

impl UnionFind {
	fn new(n: usize) -> Self {
		Self {
			parent: (0..n).collect(),
			rank: vec![0; n],
		}
	}

	fn find(&mut self, x: usize) -> usize {
		let mut root = x;
		while self.parent[root] != root {
			root = self.parent[root];
		}
		// path compression
		let mut cursor = x;
		while self.parent[cursor] != root {
			let next = self.parent[cursor];
			self.parent[cursor] = root;
			cursor = next;
		}
		root
	}

	fn union(&mut self, x: usize, y: usize) {
		let rx = self.find(x);
		let ry = self.find(y);
		if rx == ry {
			return;
		}
		match self.rank[rx].cmp(&self.rank[ry]) {
			std::cmp::Ordering::Less => self.parent[rx] = ry,
			std::cmp::Ordering::Greater => self.parent[ry] = rx,
			std::cmp::Ordering::Equal => {
				self.parent[ry] = rx;
				self.rank[rx] += 1;
			}
		}
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn undirected(ids: &[&str]) -> WeightedGraph<()> {
		let mut graph = WeightedGraph::new(GraphKind::UNDIRECTED_WEIGHTED);
		for id in ids {
			graph.add_node(*id, ());
		}
		graph
	}

	fn directed(ids: &[&str]) -> WeightedGraph<()> {
		let mut graph = WeightedGraph::new(GraphKind::DIRECTED_WEIGHTED);
		for id in ids {
			graph.add_node(*id, ());
		}
		graph
	}

	// -- Nodes and edges ----------------------------------------------------

	#[test]
	fn add_node_is_idempotent() {
		let mut graph: WeightedGraph<u8> = WeightedGraph::new(GraphKind::UNDIRECTED_WEIGHTED);
		assert!(graph.add_node("a", 1));
		assert!(!graph.add_node("a", 2));
		assert_eq!(graph.node_payload("a"), Some(&1));
		assert_eq!(graph.node_count(), 1);
	}

	#[test]
	fn edges_require_both_endpoints() {
		let mut graph = undirected(&["a"]);
		assert!(!graph.add_edge("a", "b", 1.0));
		let err = graph.try_add_edge("a", "b", 1.0).unwrap_err();
		assert_eq!(err.code(), "CATALOG_INVALID_REFERENCE");
		assert_eq!(graph.edge_count(), 0);
	}

	#[test]
	fn bad_weights_are_rejected() {
		let mut graph = undirected(&["a", "b"]);
		assert!(!graph.add_edge("a", "b", -1.0));
		assert!(!graph.add_edge("a", "b", f64::NAN));
		assert!(!graph.add_edge("a", "b", f64::INFINITY));
		assert!(graph.try_add_edge("a", "b", -0.5).is_err());
		assert_eq!(graph.edge_count(), 0);
	}

	#[test]
	fn undirected_edges_are_symmetric_and_counted_once() {
		let mut graph = undirected(&["a", "b", "c"]);
		assert!(graph.add_edge("a", "b", 2.0));
		assert!(graph.add_edge("b", "a", 3.0));
		assert_eq!(graph.edge_count(), 1);
		assert_eq!(graph.edge_weight("a", "b"), Some(3.0));
		assert_eq!(graph.edge_weight("b", "a"), Some(3.0));
		assert_eq!(graph.edges().len(), 1);
		assert_eq!(graph.incoming("a"), vec![("b", 3.0)]);
	}

	#[test]
	fn unweighted_graph_stores_unit_weights() {
		let mut graph: WeightedGraph<()> = WeightedGraph::new(GraphKind {
			directed: false,
			weighted: false,
		});
		graph.add_node("a", ());
		graph.add_node("b", ());
		graph.add_edge("a", "b", 7.5);
		assert_eq!(graph.edge_weight("a", "b"), Some(1.0));
	}

	#[test]
	fn removing_node_with_three_edges_drops_three() {
		let mut graph = undirected(&["hub", "x", "y", "z", "w"]);
		graph.add_edge("hub", "x", 1.0);
		graph.add_edge("y", "hub", 1.0);
		graph.add_edge("hub", "z", 1.0);
		graph.add_edge("x", "w", 1.0);
		assert_eq!(graph.edge_count(), 4);

		graph.remove_node("hub");
		assert_eq!(graph.edge_count(), 1);
		assert!(graph.neighbors("x").iter().all(|(n, _)| *n != "hub"));
		assert!(graph.neighbors("y").is_empty());
		assert_eq!(graph.edges().len(), graph.edge_count());
	}

	#[test]
	fn directed_remove_node_purges_reverse_index() {
		let mut graph = directed(&["a", "b", "c"]);
		graph.add_edge("a", "b", 1.0);
		graph.add_edge("c", "b", 1.0);
		graph.add_edge("b", "c", 1.0);
		assert_eq!(graph.in_degree("b"), 2);
		assert_eq!(graph.degree("b"), 3);

		graph.remove_node("b");
		assert_eq!(graph.edge_count(), 0);
		assert!(graph.neighbors("a").is_empty());
		assert!(graph.incoming("c").is_empty());
	}

	#[test]
	fn remove_edge_and_increment() {
		let mut graph = directed(&["u", "i"]);
		assert_eq!(graph.increment_edge_weight("u", "i", 1.0), Some(1.0));
		assert_eq!(graph.increment_edge_weight("u", "i", 1.0), Some(2.0));
		assert_eq!(graph.edge_count(), 1);
		assert!(!graph.has_edge("i", "u"));
		assert_eq!(graph.remove_edge("u", "i"), Some(2.0));
		assert_eq!(graph.remove_edge("u", "i"), None);
		assert_eq!(graph.edge_count(), 0);
		assert!(graph.incoming("i").is_empty());
	}

	// -- Traversal ----------------------------------------------------------

	#[test]
	fn bfs_and_dfs_follow_insertion_order() {
		let mut graph = undirected(&["a", "b", "c", "d", "e"]);
		graph.add_edge("a", "b", 1.0);
		graph.add_edge("a", "c", 1.0);
		graph.add_edge("b", "d", 1.0);
		graph.add_edge("c", "e", 1.0);

		assert_eq!(graph.bfs("a"), vec!["a", "b", "c", "d", "e"]);
		assert_eq!(graph.dfs("a"), vec!["a", "b", "d", "c", "e"]);
		assert!(graph.bfs("missing").is_empty());
		assert!(graph.dfs("missing").is_empty());
	}

	#[test]
	fn dijkstra_prefers_cheaper_detour() {
		let mut graph = undirected(&["a", "b", "c", "d"]);
		graph.add_edge("a", "b", 1.0);
		graph.add_edge("b", "c", 1.0);
		graph.add_edge("a", "c", 5.0);
		graph.add_edge("c", "d", 1.0);

		let path = graph.shortest_path("a", "d").unwrap();
		assert_eq!(path.distance, 3.0);
		assert_eq!(path.path, vec!["a", "b", "c", "d"]);

		let all = graph.dijkstra("a", None);
		assert_eq!(all.len(), 4);
		assert_eq!(all["a"].distance, 0.0);
		assert_eq!(all["a"].path, vec!["a"]);
	}

	#[test]
	fn dijkstra_unreachable_and_missing() {
		let mut graph = directed(&["a", "b", "c"]);
		graph.add_edge("b", "a", 1.0);
		assert!(graph.shortest_path("a", "b").is_none());
		assert!(graph.dijkstra("zzz", None).is_empty());
		assert_eq!(graph.dijkstra("a", None).len(), 1);
	}

	// -- Structure ----------------------------------------------------------

	#[test]
	fn components_undirected() {
		let mut graph = undirected(&["a", "b", "c", "d", "e"]);
		graph.add_edge("a", "b", 1.0);
		graph.add_edge("d", "c", 1.0);
		let components = graph.find_connected_components();
		assert_eq!(components, vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
		assert_eq!(graph.find_weakly_connected_components().len(), 3);
	}

	#[test]
	fn directed_components_follow_forward_edges() {
		let mut graph = directed(&["a", "b", "c"]);
		graph.add_edge("b", "a", 1.0);
		graph.add_edge("b", "c", 1.0);

		// "a" cannot reach "b", so forward search splits them.
		let forward = graph.find_connected_components();
		assert_eq!(forward, vec![vec!["a"], vec!["b", "c"]]);
		let weak = graph.find_weakly_connected_components();
		assert_eq!(weak, vec![vec!["a", "b", "c"]]);
	}

	#[test]
	fn degree_centrality_normalizes_by_other_nodes() {
		let mut graph = undirected(&["a", "b", "c"]);
		graph.add_edge("a", "b", 1.0);
		graph.add_edge("a", "c", 1.0);
		let centrality = graph.degree_centrality();
		assert_eq!(centrality["a"], 1.0);
		assert_eq!(centrality["b"], 0.5);

		let single = undirected(&["solo"]);
		assert_eq!(single.degree_centrality()["solo"], 0.0);
	}

	#[test]
	fn clear_resets_everything() {
		let mut graph = directed(&["a", "b"]);
		graph.add_edge("a", "b", 1.0);
		graph.clear();
		assert_eq!(graph.node_count(), 0);
		assert_eq!(graph.edge_count(), 0);
		assert!(graph.edges().is_empty());
	}

	// -- Properties ---------------------------------------------------------

	/// Cheapest simple path by exhaustive search.
	fn brute_force(graph: &WeightedGraph<()>, from: &str, to: &str) -> Option<f64> {
		fn walk(
			graph: &WeightedGraph<()>,
			current: &str,
			to: &str,
			cost: f64,
			seen: &mut Vec<String>,
			best: &mut Option<f64>,
		) {
			if current == to {
				if best.is_none_or(|b| cost < b) {
					*best = Some(cost);
				}
				return;
			}
			for (next, weight) in graph.neighbors(current) {
				if seen.iter().any(|s| s == next) {
					continue;
				}
				seen.push(next.to_string());
				walk(graph, next, to, cost + weight, seen, best);
				seen.pop();
			}
		}
		let mut best = None;
		walk(graph, from, to, 0.0, &mut vec![from.to_string()], &mut best);
		best
	}

	proptest! {
		#[test]
		fn dijkstra_matches_brute_force(
			directed_graph in any::<bool>(),
			edges in prop::collection::vec((0usize..6, 0usize..6, 0u8..10), 0..14),
		) {
			let ids = ["n0", "n1", "n2", "n3", "n4", "n5"];
			let mut graph = WeightedGraph::new(GraphKind { directed: directed_graph, weighted: true });
			for id in ids {
				graph.add_node(id, ());
			}
			for (s, t, w) in edges {
				graph.add_edge(ids[s], ids[t], f64::from(w));
			}

			let result = graph.dijkstra("n0", None);
			for target in ids {
				let expected = brute_force(&graph, "n0", target);
				match (result.get(target), expected) {
					(Some(found), Some(best)) => {
						prop_assert!((found.distance - best).abs() < 1e-9);
						let path_cost: f64 = found
							.path
							.windows(2)
							.map(|pair| graph.edge_weight(&pair[0], &pair[1]).unwrap_or(f64::NAN))
							.sum();
						prop_assert!((path_cost - found.distance).abs() < 1e-9);
						prop_assert_eq!(found.path.first().map(String::as_str), Some("n0"));
						prop_assert_eq!(found.path.last().map(String::as_str), Some(target));
					}
					(None, None) => {}
					(found, best) => prop_assert!(false, "{target}: {found:?} vs {best:?}"),
				}
			}
			prop_assert_eq!(graph.edges().len(), graph.edge_count());
		}
	}
}
