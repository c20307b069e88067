use super::{StoreError, StoreRequest};
use async_trait::async_trait;
use entity_resolver::{FetchError, Path, ResourceAddress, ResourceFetcher, ResourceRef};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Cloneable handle to a running [`ContentStore`](super::ContentStore).
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub(super) fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    /// Stores a resource document under the address derived from its own `type` and `id`.
    pub async fn insert(&self, document: Value) -> Result<ResourceAddress, StoreError> {
        let address = ResourceRef::from_stub(&document, &Path::root())?.address(&Path::root())?;
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Insert {
                address: address.clone(),
                document,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)??;
        Ok(address)
    }

    pub async fn get(&self, address: ResourceAddress) -> Result<Option<Value>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get {
                address,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    /// Removes a document. Returns `false` if nothing was stored at `address`.
    pub async fn remove(&self, address: ResourceAddress) -> Result<bool, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Remove {
                address,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Len { respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }
}

#[async_trait]
impl ResourceFetcher for StoreClient {
    async fn fetch(&self, address: &ResourceAddress) -> Result<Value, FetchError> {
        debug!(%address, "Store fetch");
        match self.get(address.clone()).await {
            Ok(Some(document)) => Ok(document),
            Ok(None) => Err(FetchError::NotFound(address.to_string())),
            Err(err) => Err(FetchError::Transport(err.to_string())),
        }
    }
}
