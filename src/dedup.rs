//! Per-run duplicate suppression keyed on the leading 50 characters.

use std::collections::HashSet;

use crate::types::Candidate;

const KEY_CHARS: usize = 50;

/// Hash of the fragment's first 50 characters.
pub fn fragment_key(text: &str) -> blake3::Hash {
    let end = text
        .char_indices()
        .nth(KEY_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    blake3::hash(text[..end].as_bytes())
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<blake3::Hash>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a key is seen.
    pub fn insert(&mut self, text: &str) -> bool {
        self.seen.insert(fragment_key(text))
    }

    /// Keep the first fragment per key, in input order.
    pub fn dedupe(&mut self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|c| self.insert(&c.text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_prefix_collapses() {
        let prefix = "A67 Venlo richting Eindhoven tussen afrit 38 en 37";
        assert_eq!(prefix.chars().count(), 50);
        let batch = vec![
            Candidate::from_text(format!("{prefix} + 12 min")),
            Candidate::from_text(format!("{prefix} + 20 min")),
        ];
        let kept = Deduplicator::new().dedupe(batch);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].text.ends_with("12 min"));
    }

    #[test]
    fn test_different_prefix_kept() {
        let batch = vec![
            Candidate::from_text("A2 Weert richting Eindhoven + 5 min"),
            Candidate::from_text("A2 Eindhoven richting Weert + 5 min"),
        ];
        assert_eq!(Deduplicator::new().dedupe(batch).len(), 2);
    }

    #[test]
    fn test_key_counts_chars_not_bytes() {
        let a = format!("{}x", "→".repeat(50));
        let b = format!("{}y", "→".repeat(50));
        assert_eq!(fragment_key(&a), fragment_key(&b));
        assert_ne!(fragment_key("short a"), fragment_key("short b"));
    }
}
