//! In-memory store implementation.
//!
//! The reference implementation of [`ChunkStore`]: two id-keyed maps behind
//! async read/write locks. Useful as the test double and as the backing
//! store when persistence is disabled.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::records::{ChunkRecord, VectorRecord};
use crate::ChunkStore;

/// An id-keyed in-memory chunk/vector store.
#[derive(Default)]
pub struct MemoryStore {
    vectors: RwLock<HashMap<String, VectorRecord>>,
    chunks: RwLock<HashMap<String, ChunkRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
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
        Ok(())
    }

    async fn get_all_vectors(&self) -> Result<Vec<VectorRecord>> {
        let vectors = self.vectors.read().await;
        let mut out: Vec<VectorRecord> = vectors.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
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
        Ok(())
    }

    async fn get_all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        let chunks = self.chunks.read().await;
        let mut out: Vec<ChunkRecord> = chunks.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}
