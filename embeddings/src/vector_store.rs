//! Semantic vector store with health reporting.
//!
//! Wraps a [`ChunkStore`] and an embedding provider. The store degrades
//! instead of failing: a chunk whose embedding cannot be produced is
//! persisted without one, and a search whose query embedding fails returns
//! no hits. Both paths flip the health state to `Degraded`; a later
//! successful persist flips it back to `Ready`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use aether_store::{ChunkStore, VectorRecord, content_hash};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::Embedding;
use crate::error::Result;
use crate::similarity::cosine_similarity;
use crate::single_flight::SharedProvider;

/// Default number of hits returned by [`VectorStore::search`].
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Health of the semantic index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorHealth {
    /// A persist batch is in flight, or none has completed yet.
    Loading,
    /// The last embedding operation succeeded.
    Ready,
    /// The provider failed recently; keyword retrieval still works.
    Degraded,
}

/// A chunk handed to [`VectorStore::persist_vectors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInput {
    /// Chunk text.
    pub content: String,
    /// First line (1-based).
    pub start_line: usize,
    /// Last line (inclusive).
    pub end_line: usize,
}

/// A scored semantic search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// The stored record that matched.
    pub record: VectorRecord,
    /// Cosine similarity against the query embedding.
    pub score: f32,
}

type SubscriberMap = Mutex<HashMap<u64, mpsc::UnboundedSender<VectorHealth>>>;

/// Semantic index over a chunk store.
pub struct VectorStore {
    store: Arc<dyn ChunkStore>,
    provider: SharedProvider,
    search_limit: usize,
    health: Mutex<VectorHealth>,
    subscribers: Arc<SubscriberMap>,
    next_subscriber: AtomicU64,
}

impl VectorStore {
    /// Create a vector store in the `Loading` state.
    pub fn new(store: Arc<dyn ChunkStore>, provider: SharedProvider) -> Self {
        Self {
            store,
            provider,
            search_limit: DEFAULT_SEARCH_LIMIT,
            health: Mutex::new(VectorHealth::Loading),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_subscriber: AtomicU64::new(0),
        }
    }

    /// Override the default search hit limit.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Current health state.
    pub fn health(&self) -> VectorHealth {
        *self
            .health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to health transitions.
    ///
    /// Dropping the returned subscription unregisters it, after which no
    /// further states arrive.
    pub fn subscribe(&self) -> HealthSubscription {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        HealthSubscription {
            id,
            rx,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    /// Embed and persist chunks for one file.
    ///
    /// Embeddings of unchanged chunks (same content hash) are reused from
    /// the store without calling the provider. A provider failure never
    /// fails the batch: the chunk is persisted without an embedding and the
    /// store goes `Degraded`. Store errors still propagate.
    pub async fn persist_vectors(&self, file_id: &str, chunks: &[ChunkInput]) -> Result<()> {
        self.set_health(VectorHealth::Loading);

        let existing = self.store.get_vectors_for_file(file_id).await?;
        let by_hash: HashMap<&str, &Embedding> = existing
            .iter()
            .filter_map(|v| v.embedding.as_ref().map(|e| (v.hash.as_str(), e)))
            .collect();

        let provider = match self.provider.get().await {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!("embedding provider unavailable: {e}");
                None
            }
        };

        let mut degraded = provider.is_none();
        let mut reused = 0usize;
        let mut records = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let hash = content_hash(&chunk.content);
            let embedding = if let Some(known) = by_hash.get(hash.as_str()) {
                reused += 1;
                Some((*known).clone())
            } else if let Some(provider) = &provider {
                match provider.embed(&chunk.content).await {
                    Ok(embedding) => Some(embedding),
                    Err(e) => {
                        warn!(file_id, "embedding failed, persisting without vector: {e}");
                        degraded = true;
                        None
                    }
                }
            } else {
                None
            };

            records.push(VectorRecord {
                id: VectorRecord::make_id(file_id, chunk.start_line, chunk.end_line),
                file_id: file_id.to_string(),
                content: chunk.content.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                embedding,
                hash,
                tags: None,
            });
        }

        debug!(
            file_id,
            total = records.len(),
            reused,
            "persisting vector records"
        );
        self.store.upsert_vectors(records).await?;

        self.set_health(if degraded {
            VectorHealth::Degraded
        } else {
            VectorHealth::Ready
        });
        Ok(())
    }

    /// Rank all stored records against a query by cosine similarity.
    ///
    /// Never fails: provider or store trouble yields no hits and flips the
    /// health to `Degraded`. Records without an embedding never rank.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Vec<VectorHit> {
        let limit = limit.unwrap_or(self.search_limit);

        let query_vec = match self.embed_query(query).await {
            Some(vec) => vec,
            None => {
                self.set_health(VectorHealth::Degraded);
                return Vec::new();
            }
        };

        let all = match self.store.get_all_vectors().await {
            Ok(all) => all,
            Err(e) => {
                warn!("vector search failed to read store: {e}");
                self.set_health(VectorHealth::Degraded);
                return Vec::new();
            }
        };

        let mut hits: Vec<VectorHit> = all
            .into_iter()
            .filter(|record| record.embedding.is_some())
            .map(|record| {
                let score = record
                    .embedding
                    .as_deref()
                    .map(|embedding| cosine_similarity(&query_vec, embedding))
                    .unwrap_or(0.0);
                VectorHit { record, score }
            })
            .collect();

        hits.sort_by_key(|hit| std::cmp::Reverse(OrderedFloat(hit.score)));
        hits.truncate(limit);
        self.set_health(VectorHealth::Ready);
        hits
    }

    async fn embed_query(&self, query: &str) -> Option<Embedding> {
        let provider = match self.provider.get().await {
            Ok(provider) => provider,
            Err(e) => {
                warn!("embedding provider unavailable for search: {e}");
                return None;
            }
        };
        match provider.embed(query).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("query embedding failed: {e}");
                None
            }
        }
    }

    // Every call notifies, even without a state change: subscribers use
    // repeated `Loading` signals to show indexing activity.
    fn set_health(&self, next: VectorHealth) {
        {
            let mut health = self
                .health
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *health = next;
        }
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|_, tx| tx.send(next).is_ok());
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Receiver half of a health subscription.
///
/// Dropping it unregisters the subscriber.
pub struct HealthSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<VectorHealth>,
    registry: Weak<SubscriberMap>,
}

impl HealthSubscription {
    /// Next health state, `None` once the store is gone.
    pub async fn next(&mut self) -> Option<VectorHealth> {
        self.rx.recv().await
    }
}

impl Drop for HealthSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}
