//! Near-duplicate detection for censored content
//!
//! Repeated near-identical spam would otherwise inflate a censor trigger's
//! count; comparisons are memoized because the same contents are re-checked
//! against each other on every evaluation pass.

use std::collections::HashMap;

/// Default bound on memoized comparison pairs
const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Edit distance between two strings, using the classic two-row
/// dynamic-programming table
#[must_use]
pub fn levenshtein(first: &str, second: &str) -> usize {
    let a: Vec<char> = first.chars().collect();
    let b: Vec<char> = second.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr: Vec<usize> = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Memoizing comparison context for near-duplicate checks
///
/// Results are keyed by the compared pair and tolerance. The cache is cleared
/// wholesale when the bound is hit; the set compared in one pass is small, so
/// a refill is cheaper than eviction bookkeeping.
#[derive(Debug)]
pub struct DuplicateDetector {
    cache: HashMap<(String, String, u32), bool>,
    capacity: usize,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicateDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Whether `a` and `b` are within `tolerance` edits of each other
    pub fn is_near_duplicate(&mut self, a: &str, b: &str, tolerance: u32) -> bool {
        if a == b {
            return true;
        }

        // Distance is symmetric; normalize the pair so both orders hit
        let key = if a <= b {
            (a.to_string(), b.to_string(), tolerance)
        } else {
            (b.to_string(), a.to_string(), tolerance)
        };

        if let Some(&hit) = self.cache.get(&key) {
            return hit;
        }

        if self.cache.len() >= self.capacity {
            self.cache.clear();
        }

        let hit = levenshtein(a, b) <= tolerance as usize;
        self.cache.insert(key, hit);
        hit
    }

    /// Count contents that are not near-duplicates of an earlier counted one
    ///
    /// Contents must be in insertion order so the earliest of a spam burst is
    /// the one that counts.
    pub fn count_distinct<'a>(
        &mut self,
        contents: impl IntoIterator<Item = &'a str>,
        tolerance: u32,
    ) -> u32 {
        let mut counted: Vec<&str> = Vec::new();

        for content in contents {
            if counted
                .iter()
                .any(|prev| self.is_near_duplicate(prev, content, tolerance))
            {
                continue;
            }
            counted.push(content);
        }

        u32::try_from(counted.len()).unwrap_or(u32::MAX)
    }
}
