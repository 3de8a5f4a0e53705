use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key the chunker writes on every emitted chunk.
pub const CHUNK_INDEX_KEY: &str = "chunkIndex";

/// Caller-supplied key/value record carried through chunking untouched.
///
/// Insertion order is preserved. The only key the engine ever writes is
/// [`CHUNK_INDEX_KEY`]; every other entry is opaque pass-through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(IndexMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `chunkIndex` entry, if the record has been through the chunker.
    pub fn chunk_index(&self) -> Option<u64> {
        self.0.get(CHUNK_INDEX_KEY).and_then(Value::as_u64)
    }

    /// Copy of this record with `chunkIndex` set (or overwritten).
    pub fn with_chunk_index(&self, index: usize) -> Self {
        let mut out = self.clone();
        out.set_chunk_index(index);
        out
    }

    pub(crate) fn set_chunk_index(&mut self, index: usize) {
        self.0.insert(CHUNK_INDEX_KEY.to_string(), Value::from(index));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<IndexMap<String, Value>> for Metadata {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ── Input ───────────────────────────────────────────────────────────────────

/// One source text handed to multi-text chunking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TextInput {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }
}

// ── Output ──────────────────────────────────────────────────────────────────

/// A retrieval-sized passage of a source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Chunk text, including any overlap copied from the previous chunk.
    pub text: String,
    /// The source text's metadata plus `chunkIndex`.
    pub metadata: Metadata,
    /// 0-based position in the output sequence.
    pub chunk_index: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: &Metadata, chunk_index: usize) -> Self {
        Self {
            text: text.into(),
            metadata: metadata.with_chunk_index(chunk_index),
            chunk_index,
        }
    }

    /// Move the chunk to a new position, keeping `metadata.chunkIndex` in sync.
    pub fn reindex(&mut self, chunk_index: usize) {
        self.chunk_index = chunk_index;
        self.metadata.set_chunk_index(chunk_index);
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> Metadata {
        [("source", Value::from("a.md")), ("page", Value::from(3))]
            .into_iter()
            .collect()
    }

    #[test]
    fn chunk_index_is_added_without_touching_other_keys() {
        let m = meta();
        let chunk = Chunk::new("hello", &m, 4);
        assert_eq!(chunk.metadata.chunk_index(), Some(4));
        assert_eq!(chunk.metadata.get("source"), Some(&Value::from("a.md")));
        assert_eq!(chunk.metadata.get("page"), Some(&Value::from(3)));
        assert_eq!(chunk.metadata.len(), 3);
        // Source record is untouched.
        assert!(m.chunk_index().is_none());
    }

    #[test]
    fn existing_chunk_index_is_overwritten() {
        let mut m = meta();
        m.insert(CHUNK_INDEX_KEY, "stale");
        let chunk = Chunk::new("x", &m, 0);
        assert_eq!(chunk.metadata.chunk_index(), Some(0));
        assert_eq!(chunk.metadata.len(), 3);
    }

    #[test]
    fn metadata_preserves_insertion_order() {
        let mut m = Metadata::new();
        m.insert("zeta", 1);
        m.insert("alpha", 2);
        m.insert("mid", 3);
        let keys: Vec<&str> = m.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn reindex_keeps_metadata_in_sync() {
        let mut chunk = Chunk::new("x", &meta(), 0);
        chunk.reindex(7);
        assert_eq!(chunk.chunk_index, 7);
        assert_eq!(chunk.metadata.chunk_index(), Some(7));
    }

    #[test]
    fn chunk_serializes_camel_case() {
        let chunk = Chunk::new("héllo", &Metadata::new(), 2);
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["chunkIndex"], 2);
        assert_eq!(json["metadata"]["chunkIndex"], 2);
        assert_eq!(chunk.char_len(), 5);
    }
}
