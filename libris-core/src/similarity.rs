//! Jaccard similarity and score ranking.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Jaccard index `|A ∩ B| / |A ∪ B|`. Two empty sets score 0.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
	let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
	let intersection = small.iter().filter(|x| large.contains(*x)).count();
	let union = a.len() + b.len() - intersection;
	if union == 0 {
		return 0.0;
	}
	intersection as f64 / union as f64
}

/// An entity id with a score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredId {
	pub id: String,
	pub score: f64,
}

impl ScoredId {
	pub fn new(id: impl Into<String>, score: f64) -> Self {
		Self { id: id.into(), score }
	}
}

/// Descending score, then ascending id.
pub fn by_score_desc(a: &ScoredId, b: &ScoredId) -> Ordering {
	b.score
		.partial_cmp(&a.score)
		.unwrap_or(Ordering::Equal)
		.then_with(|| a.id.cmp(&b.id))
}

/// Sort `scores` best-first and keep the top `limit`.
pub fn top_scored(scores: impl IntoIterator<Item = ScoredId>, limit: usize) -> Vec<ScoredId> {
	let mut ranked: Vec<ScoredId> = scores.into_iter().collect();
	ranked.sort_by(by_score_desc);
	ranked.truncate(limit);
	ranked
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn set(items: &[&str]) -> BTreeSet<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn jaccard_basics() {
		assert_eq!(jaccard(&set(&["u1", "u2"]), &set(&["u2"])), 0.5);
		assert_eq!(jaccard(&set(&["a"]), &set(&["b"])), 0.0);
		assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
		assert_eq!(jaccard(&set(&["a", "b"]), &set(&["b", "a"])), 1.0);
	}

	#[test]
	fn ties_break_by_id() {
		let ranked = top_scored(
			vec![
				ScoredId::new("c", 0.5),
				ScoredId::new("a", 0.5),
				ScoredId::new("b", 0.9),
				ScoredId::new("d", 0.1),
			],
			3,
		);
		let ids: Vec<&str> = ranked.iter().map(|s| s.id.as_str()).collect();
		assert_eq!(ids, vec!["b", "a", "c"]);
	}

	proptest! {
		#[test]
		fn jaccard_is_symmetric_and_bounded(
			a in prop::collection::btree_set(0u8..20, 0..12),
			b in prop::collection::btree_set(0u8..20, 0..12),
		) {
			let ab = jaccard(&a, &b);
			prop_assert_eq!(ab, jaccard(&b, &a));
			prop_assert!((0.0..=1.0).contains(&ab));
			if !a.is_empty() {
				prop_assert_eq!(jaccard(&a, &a), 1.0);
			}
			if a.is_disjoint(&b) {
				prop_assert_eq!(ab, 0.0);
			}
		}
	}
}
