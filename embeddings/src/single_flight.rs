//! Single-flight provider initialization.
//!
//! Provider construction can be expensive (credential lookup, model
//! warm-up), so concurrent callers must share one in-flight initialization
//! instead of racing. A failed initialization leaves the cell empty and the
//! next caller retries from scratch.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::provider::EmbeddingProvider;

type ProviderFactory =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn EmbeddingProvider>>> + Send + Sync>;

/// Lazily-initialized shared handle to an [`EmbeddingProvider`].
pub struct SharedProvider {
    cell: OnceCell<Arc<dyn EmbeddingProvider>>,
    factory: ProviderFactory,
}

impl SharedProvider {
    /// Wrap a provider factory. The factory runs at most once per
    /// successful initialization; concurrent callers await the same run.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn EmbeddingProvider>>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(move || Box::pin(factory())),
        }
    }

    /// Wrap an already-constructed provider.
    pub fn from_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(provider)),
            factory: Box::new(|| {
                Box::pin(async { Err(crate::error::EmbeddingError::ProviderNotConfigured) })
            }),
        }
    }

    /// Get the provider, initializing it if necessary.
    pub async fn get(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider = self.cell.get_or_try_init(|| (self.factory)()).await?;
        Ok(Arc::clone(provider))
    }
}
