//! # Resource Fetcher
//!
//! The resolver never talks to a transport directly. It asks a [`ResourceFetcher`] for the
//! payload at a [`ResourceAddress`] and treats whatever comes back as opaque. Timeouts,
//! authentication, retries and cancellation all belong to the implementation.

use crate::error::FetchError;
use crate::reference::ResourceAddress;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Source of resource payloads.
///
/// Returning `Ok(Value::Null)` means "no payload"; the resolver turns it into
/// [`ResolverError::Data`](crate::ResolverError::Data).
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use entity_resolver::{FetchError, ResourceAddress, ResourceFetcher};
/// use serde_json::{json, Value};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ResourceFetcher for Echo {
///     async fn fetch(&self, address: &ResourceAddress) -> Result<Value, FetchError> {
///         Ok(json!({ "id": address.id }))
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, address: &ResourceAddress) -> Result<Value, FetchError>;
}

#[async_trait]
impl<F: ResourceFetcher + ?Sized> ResourceFetcher for Arc<F> {
    async fn fetch(&self, address: &ResourceAddress) -> Result<Value, FetchError> {
        (**self).fetch(address).await
    }
}

#[async_trait]
impl<F: ResourceFetcher + ?Sized> ResourceFetcher for &F {
    async fn fetch(&self, address: &ResourceAddress) -> Result<Value, FetchError> {
        (**self).fetch(address).await
    }
}
