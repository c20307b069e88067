//! # Blog System Lifecycle
//!
//! [`BlogSystem`] starts the content store actor and wires a [`ResolutionService`] to it. The
//! service fetches through a clone of the store client, so resolving an article is plain message
//! passing to the store task.
//!
//! ## Graceful Shutdown
//!
//! 1. **Drop every client**: the system's own client and the one held by the service
//! 2. **The store detects closure**: `receiver.recv()` returns `None`
//! 3. **Await completion** of the store task

use crate::model::{Article, Viewer};
use crate::schema::{blog_schema, ARTICLE};
use crate::store::{ContentStore, StoreClient, StoreError};
use entity_resolver::{ResolutionService, ResolverConfig, ResolverError, ResourceAddress, SchemaTable};
use serde_json::Value;
use tracing::{error, info};

/// Capacity of the store's request channel.
const STORE_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    #[error("No document at {0}")]
    NotFound(ResourceAddress),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

pub type BlogService = ResolutionService<SchemaTable<Viewer>, StoreClient>;

pub struct BlogSystem {
    pub store: StoreClient,
    pub service: BlogService,
    handle: tokio::task::JoinHandle<()>,
}

impl BlogSystem {
    pub fn new(config: ResolverConfig) -> Self {
        let (store, store_client) = ContentStore::new(STORE_BUFFER);
        let handle = tokio::spawn(store.run());
        let service = ResolutionService::new(blog_schema(), store_client.clone(), config);

        Self {
            store: store_client,
            service,
            handle,
        }
    }

    async fn document(&self, address: &ResourceAddress) -> Result<Value, BlogError> {
        self.store
            .get(address.clone())
            .await?
            .ok_or_else(|| BlogError::NotFound(address.clone()))
    }

    /// Loads the article at `address` and resolves it for `viewer` into its typed shape.
    pub async fn article(
        &self,
        address: &ResourceAddress,
        viewer: &Viewer,
    ) -> Result<Article, BlogError> {
        let document = self.document(address).await?;
        Ok(self
            .service
            .resolve_typed(ARTICLE, &document, viewer)
            .await?)
    }

    /// Loads the article at `address` and returns the rebuilt tree without marshalling.
    pub async fn raw_article(
        &self,
        address: &ResourceAddress,
        viewer: &Viewer,
    ) -> Result<Value, BlogError> {
        let document = self.document(address).await?;
        Ok(self.service.resolve(ARTICLE, &document, viewer, true).await?)
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down blog system...");

        drop(self.service);
        drop(self.store);

        if let Err(e) = self.handle.await {
            error!("Store task failed: {:?}", e);
            return Err(format!("Store task failed: {:?}", e));
        }

        info!("Blog system shutdown complete.");
        Ok(())
    }
}
