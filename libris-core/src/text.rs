// ---------------------------------------------------------------------------
// Text helpers — key normalization and edit distance
// ---------------------------------------------------------------------------
//
// Every prefix-tree key goes through `normalize` on insert, lookup and
// delete. Natural keys (ISBN, email) have their own folding rules.
// ---------------------------------------------------------------------------

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

// ---------------------------------------------------------------------------
// Prefix-key normalization
// ---------------------------------------------------------------------------

/// Fold `text` into the form stored in a prefix index.
///
/// Case-folds, strips diacritics (NFD decomposition with combining marks
/// dropped), trims, and collapses runs of whitespace into a single space.
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
	let folded: String = text
		.nfd()
		.filter(|c| !is_combining_mark(*c))
		.flat_map(char::to_lowercase)
		.collect();

	let mut out = String::with_capacity(folded.len());
	for word in folded.split_whitespace() {
		if !out.is_empty() {
			out.push(' ');
		}
		out.push_str(word);
	}
	out
}

/// Fold a prefix query like [`normalize`], but keep one trailing space when
/// the query ends in whitespace after a word, so `"harry "` only matches keys
/// where `harry` is a whole word.
pub fn normalize_prefix(query: &str) -> String {
	let mut key = normalize(query);
	if !key.is_empty() && query.ends_with(char::is_whitespace) {
		key.push(' ');
	}
	key
}

/// ISBNs compare without hyphens or spaces and with an upper-case check
/// digit (`0-306-40615-x` == `030640615X`).
pub fn normalize_isbn(isbn: &str) -> String {
	isbn.chars()
		.filter(|c| !c.is_whitespace() && *c != '-')
		.flat_map(char::to_uppercase)
		.collect()
}

/// Emails compare case-insensitively, surrounding whitespace ignored.
pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Levenshtein distance
// ---------------------------------------------------------------------------

/// Levenshtein edit distance between two strings, by `char`.
///
/// Wagner-Fischer with a single rolling row over the shorter string.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
	let a_chars: Vec<char> = a.chars().collect();
	let b_chars: Vec<char> = b.chars().collect();
	let (short, long) = if a_chars.len() > b_chars.len() {
		(&b_chars, &a_chars)
	} else {
		(&a_chars, &b_chars)
	};

	if short.is_empty() {
		return long.len();
	}

	let mut prev: Vec<usize> = (0..=short.len()).collect();
	let mut curr: Vec<usize> = vec![0; short.len() + 1];

	for (j, lc) in long.iter().enumerate() {
		curr[0] = j + 1;
		for (i, sc) in short.iter().enumerate() {
			let cost = usize::from(sc != lc);
			curr[i + 1] = (curr[i] + 1).min(prev[i + 1] + 1).min(prev[i] + cost);
		}
		std::mem::swap(&mut prev, &mut curr);
	}

	prev[short.len()]
}

/// Next Levenshtein row when the trie walk descends by `ch`.
///
/// `prev` is the row for the current trie prefix against `query`; the
/// returned row is for the prefix extended by `ch`.
pub(crate) fn next_levenshtein_row(prev: &[usize], query: &[char], ch: char) -> Vec<usize> {
	let mut row = Vec::with_capacity(prev.len());
	row.push(prev[0] + 1);
	for (i, qc) in query.iter().enumerate() {
		let cost = usize::from(*qc != ch);
		let value = (row[i] + 1).min(prev[i + 1] + 1).min(prev[i] + cost);
		row.push(value);
	}
	row
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
