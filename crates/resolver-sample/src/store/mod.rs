//! # Content Store Actor
//!
//! An in-process stand-in for a JSON:API backend. The [`ContentStore`] owns every stored
//! resource document, keyed by its [`ResourceAddress`], and serves requests from a single
//! Tokio task. Callers talk to it through a cloneable [`StoreClient`], which is also the
//! [`ResourceFetcher`](entity_resolver::ResourceFetcher) the sample hands to the resolver.
//!
//! ```rust
//! use resolver_sample::store::ContentStore;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (store, client) = ContentStore::new(32);
//!     tokio::spawn(store.run());
//!
//!     let address = client
//!         .insert(json!({ "type": "person--user", "id": "u1", "name": "Alice" }))
//!         .await
//!         .unwrap();
//!     assert_eq!(address.to_string(), "/person/user/u1");
//!     assert!(client.get(address).await.unwrap().is_some());
//! }
//! ```

mod client;

pub use client::StoreClient;

use entity_resolver::{ResolverError, ResourceAddress};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Errors returned by the [`StoreClient`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store actor closed")]
    ActorClosed,
    #[error("Store actor dropped the response")]
    ActorDropped,
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] ResolverError),
}

pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

#[derive(Debug)]
pub enum StoreRequest {
    Insert {
        address: ResourceAddress,
        document: Value,
        respond_to: Response<()>,
    },
    Get {
        address: ResourceAddress,
        respond_to: Response<Option<Value>>,
    },
    Remove {
        address: ResourceAddress,
        respond_to: Response<bool>,
    },
    Len {
        respond_to: Response<usize>,
    },
}

/// The server half of the store. Owns the documents and processes requests sequentially.
pub struct ContentStore {
    receiver: mpsc::Receiver<StoreRequest>,
    documents: HashMap<ResourceAddress, Value>,
}

impl ContentStore {
    /// Creates the store and its client. `buffer_size` bounds the request channel.
    pub fn new(buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            documents: HashMap::new(),
        };
        (store, StoreClient::new(sender))
    }

    /// Serves requests until every client has been dropped.
    pub async fn run(mut self) {
        info!("Content store started");

        while let Some(request) = self.receiver.recv().await {
            match request {
                StoreRequest::Insert {
                    address,
                    document,
                    respond_to,
                } => {
                    self.documents.insert(address.clone(), document);
                    debug!(%address, size = self.documents.len(), "Stored");
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Get {
                    address,
                    respond_to,
                } => {
                    let document = self.documents.get(&address).cloned();
                    debug!(%address, found = document.is_some(), "Get");
                    let _ = respond_to.send(Ok(document));
                }
                StoreRequest::Remove {
                    address,
                    respond_to,
                } => {
                    let removed = self.documents.remove(&address).is_some();
                    debug!(%address, removed, "Remove");
                    let _ = respond_to.send(Ok(removed));
                }
                StoreRequest::Len { respond_to } => {
                    let _ = respond_to.send(Ok(self.documents.len()));
                }
            }
        }

        info!(size = self.documents.len(), "Content store shutdown");
    }
}
