use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::data::RawTable;

pub trait TableCache {
    fn get(&self, key: &str) -> Option<RawTable>;
    fn put(&mut self, key: String, table: RawTable);
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl TableCache for NoCache {
    fn get(&self, _key: &str) -> Option<RawTable> {
        None
    }

    fn put(&mut self, _key: String, _table: RawTable) {}
}

#[derive(Debug, Default, Clone)]
pub struct MemoryTableCache {
    entries: HashMap<String, RawTable>,
}

impl MemoryTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TableCache for MemoryTableCache {
    fn get(&self, key: &str) -> Option<RawTable> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: String, table: RawTable) {
        self.entries.insert(key, table);
    }
}

pub fn content_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Content digest plus a tag for the decoding options: a renamed copy still
/// hits, a different delimiter or encoding does not.
pub fn cache_key(bytes: &[u8], variant: &str) -> String {
    format!("{}:{variant}", content_digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        assert_eq!(
            content_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn keys_separate_decoding_variants() {
        assert_ne!(cache_key(b"a;b", "csv;utf-8"), cache_key(b"a;b", "csv,utf-8"));
    }

    #[test]
    fn memory_cache_round_trips_tables() {
        let mut cache = MemoryTableCache::new();
        let key = cache_key(b"Item\nX\n", "csv");
        assert!(cache.get(&key).is_none());
        let table = RawTable::from_strings(&["Item"], &[&["X"]]);
        cache.put(key.clone(), table.clone());
        assert_eq!(cache.get(&key), Some(table));
        assert_eq!(cache.len(), 1);
        assert!(NoCache.get(&key).is_none());
    }
}
