//! JSON-file store implementation.
//!
//! A best-effort on-disk cache: records live in two JSON documents under a
//! root directory and are rewritten atomically (temp file + rename) on every
//! upsert. Load failures on open are logged and treated as an empty cache,
//! never as a hard error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::records::{ChunkRecord, VectorRecord};
use crate::ChunkStore;

const VECTORS_FILE: &str = "vectors.json";
const CHUNKS_FILE: &str = "chunks.json";

/// Durable chunk/vector store backed by JSON files.
pub struct JsonFileStore {
    root: PathBuf,
    vectors: RwLock<HashMap<String, VectorRecord>>,
    chunks: RwLock<HashMap<String, ChunkRecord>>,
}

impl JsonFileStore {
    /// Open (or create) a store rooted at the given directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        let vectors = load_map(&root.join(VECTORS_FILE)).await;
        let chunks = load_map(&root.join(CHUNKS_FILE)).await;
        info!(
            vectors = vectors.len(),
            chunks = chunks.len(),
            root = %root.display(),
            "opened json chunk store"
        );

        Ok(Self {
            root,
            vectors: RwLock::new(vectors),
            chunks: RwLock::new(chunks),
        })
    }

    /// Write a map to disk atomically via a temp file rename.
    async fn save_map<T: Serialize>(&self, file: &str, map: &HashMap<String, T>) -> Result<()> {
        let path = self.root.join(file);
        let content = serde_json::to_string_pretty(map)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;
        debug!(file, records = map.len(), "saved chunk store file");
        Ok(())
    }
}

/// Load a record map, tolerating missing or corrupt files.
async fn load_map<T: DeserializeOwned>(path: &Path) -> HashMap<String, T> {
    match fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!("discarding corrupt store file {}: {e}", path.display());
                HashMap::new()
            }
        },
        Err(_) => HashMap::new(),
    }
}

fn sorted_by_id<T: Clone>(map: &HashMap<String, T>) -> Vec<T> {
    let mut ids: Vec<&String> = map.keys().collect();
    ids.sort();
    ids.into_iter().filter_map(|id| map.get(id).cloned()).collect()
}

#[async_trait]
impl ChunkStore for JsonFileStore {
    async fn get_vectors_for_file(&self, file_id: &str) -> Result<Vec<VectorRecord>> {
        let vectors = self.vectors.read().await;
        let mut out: Vec<VectorRecord> = vectors
            .values()
            .filter(|v| v.file_id == file_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn upsert_vectors(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut vectors = self.vectors.write().await;
        for record in records {
            vectors.insert(record.id.clone(), record);
        }
        self.save_map(VECTORS_FILE, &vectors).await
    }

    async fn get_all_vectors(&self) -> Result<Vec<VectorRecord>> {
        Ok(sorted_by_id(&*self.vectors.read().await))
    }

    async fn get_chunks_for_file(&self, file_id: &str) -> Result<Vec<ChunkRecord>> {
        let chunks = self.chunks.read().await;
        let mut out: Vec<ChunkRecord> = chunks
            .values()
            .filter(|c| c.file_id == file_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn upsert_chunks(&self, records: Vec<ChunkRecord>) -> Result<()> {
        let mut chunks = self.chunks.write().await;
        for record in records {
            chunks.insert(record.id.clone(), record);
        }
        self.save_map(CHUNKS_FILE, &chunks).await
    }

    async fn get_all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        Ok(sorted_by_id(&*self.chunks.read().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::content_hash;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn vector(file_id: &str, start: usize, end: usize, content: &str) -> VectorRecord {
        VectorRecord {
            id: VectorRecord::make_id(file_id, start, end),
            file_id: file_id.to_string(),
            content: content.to_string(),
            start_line: start,
            end_line: end,
            embedding: Some(vec![0.1, 0.2]),
            hash: content_hash(content),
            tags: None,
        }
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let store = JsonFileStore::open(dir.path()).await.unwrap();
            store
                .upsert_vectors(vec![vector("a.rs", 1, 50, "fn a() {}")])
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        let all = reopened.get_all_vectors().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].embedding, Some(vec![0.1, 0.2]));
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join(VECTORS_FILE), "not json")
            .await
            .unwrap();

        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert!(store.get_all_vectors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_is_visible_before_reopen() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store
            .upsert_vectors(vec![vector("a.rs", 1, 10, "x")])
            .await
            .unwrap();
        assert_eq!(store.get_vectors_for_file("a.rs").await.unwrap().len(), 1);
    }
}
