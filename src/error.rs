//! # Resolver Errors
//!
//! This module defines the error types used throughout the resolver. Every variant of
//! [`ResolverError`] is fatal to the resolution pass that raised it: the engine performs no
//! local recovery, and a failed [`resolve`](crate::ResolutionService::resolve) returns no
//! partial tree.
//!
//! [`FetchError`] is the collaborator-facing type. Implementations of
//! [`ResourceFetcher`](crate::ResourceFetcher) return it, and the resolver wraps it together with
//! the address that failed.

use crate::path::Path;

/// Errors raised by a [`ResourceFetcher`](crate::ResourceFetcher) implementation.
///
/// The resolver treats these as opaque: transport, auth and timeout policy (including retries)
/// belong to the fetcher.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Fetcher error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors that abort a resolution pass.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// A schema field has no resolvable wire name.
    #[error("Field '{field}' of type '{type_name}' has no wire name")]
    Config { type_name: String, field: String },

    /// A fetched or embedded reference resolved to absent or unusable data.
    #[error("Reference at '{path}' has no usable data: {reason}")]
    Data { path: Path, reason: String },

    /// A discriminator value matched none of the declared subtypes.
    #[error("No subtype declared for discriminator '{discriminator}' at '{path}'")]
    UnionResolution { path: Path, discriminator: String },

    /// The resource fetcher failed.
    #[error("Fetching '{address}' for '{path}' failed: {source}")]
    Fetch {
        path: Path,
        address: String,
        #[source]
        source: FetchError,
    },

    /// A reference stub lacks a usable `type`/`id` pair.
    #[error("Malformed reference at '{path}': {reason}")]
    MalformedReference { path: Path, reason: String },

    /// Two references were registered under the same path.
    #[error("Path '{0}' was registered twice in one pass")]
    LedgerCollision(Path),

    /// The marshaller rejected the rebuilt tree.
    #[error("Marshalling '{type_name}' failed: {reason}")]
    Marshal { type_name: String, reason: String },
}

impl ResolverError {
    /// Returns `true` if this error originated in the resource fetcher.
    pub fn is_fetch(&self) -> bool {
        matches!(self, ResolverError::Fetch { .. })
    }
}
