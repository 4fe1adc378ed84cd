//! String Interning Pool
//!
//! Deduplicated storage for element names, prefixes, namespace URIs and
//! node content. Id 0 is reserved for the empty string.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// String interning pool
///
/// Memory layout:
/// - `spans`: (offset, len) into `data` for each interned string ID
/// - `data`: one contiguous UTF-8 buffer
/// - `hash_index`: hash -> list of IDs (handles rare collisions)
#[derive(Debug)]
pub struct StringPool {
    spans: Vec<(u32, u32)>,
    data: String,
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    /// Create a new empty string pool
    pub fn new() -> Self {
        let mut pool = StringPool {
            spans: Vec::with_capacity(256),
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        };
        pool.spans.push((0, 0));
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning its id. Equal strings share one id.
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == s {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);

        let id = self.spans.len() as u32;
        self.spans.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);

        id
    }

    /// Look up an id without interning
    pub fn find(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        let ids = self.hash_index.get(&Self::compute_hash(s))?;
        ids.iter().copied().find(|&id| self.get(id) == s)
    }

    /// Get a string by ID. Unknown ids resolve to the empty string.
    pub fn get(&self, id: u32) -> &str {
        match self.spans.get(id as usize) {
            Some(&(offset, len)) => {
                let start = offset as usize;
                self.data.get(start..start + len as usize).unwrap_or("")
            }
            None => "",
        }
    }

    /// Get a string by ID, treating the reserved empty id as absent
    pub fn get_non_empty(&self, id: u32) -> Option<&str> {
        if id == 0 {
            None
        } else {
            Some(self.get(id))
        }
    }

    /// Get the number of unique strings stored
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.spans.len() <= 1
    }
}
