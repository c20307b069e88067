//! # Resolution Service
//!
//! Entry point of the crate. A [`ResolutionService`] owns the schema table, the fetcher, the
//! marshaller and the configuration; each call to [`resolve`](ResolutionService::resolve) runs
//! one isolated pass:
//!
//! 1. a fresh [`GraphResolver`] and [`Ledger`](crate::Ledger) are allocated,
//! 2. the resolver executes from the document root,
//! 3. the ledger splices every resolved payload into a copy of the document,
//! 4. the rebuilt tree is returned as-is (`raw_output`) or handed to the [`Marshaller`].
//!
//! Any error aborts the pass; no partial tree is returned. Nothing is shared between passes,
//! so concurrent calls on one service are independent.

use crate::config::ResolverConfig;
use crate::error::ResolverError;
use crate::fetcher::ResourceFetcher;
use crate::marshal::{Marshaller, SchemaMarshaller};
use crate::path::Path;
use crate::resolver::GraphResolver;
use crate::schema::SchemaRegistry;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, instrument, warn};

pub struct ResolutionService<R, F, M = SchemaMarshaller> {
    registry: R,
    fetcher: F,
    marshaller: M,
    config: ResolverConfig,
}

impl<R, F> ResolutionService<R, F> {
    /// Creates a service with the default [`SchemaMarshaller`].
    pub fn new(registry: R, fetcher: F, config: ResolverConfig) -> Self {
        Self {
            registry,
            fetcher,
            marshaller: SchemaMarshaller,
            config,
        }
    }
}

impl<R, F, M> ResolutionService<R, F, M> {
    /// Replaces the marshaller used for typed output.
    pub fn with_marshaller<M2>(self, marshaller: M2) -> ResolutionService<R, F, M2> {
        ResolutionService {
            registry: self.registry,
            fetcher: self.fetcher,
            marshaller,
            config: self.config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// A resolver bound to this service's schema, fetcher and configuration, with an empty
    /// ledger. Useful to inspect the ledger of a pass, including one that failed.
    pub fn resolver<'s, C>(&'s self, context: &'s C) -> GraphResolver<'s, C, R, F>
    where
        C: Send + Sync,
        R: SchemaRegistry<C>,
        F: ResourceFetcher,
    {
        GraphResolver::new(&self.registry, &self.fetcher, context, &self.config)
    }

    /// Resolves every reference reachable from `data` and returns the rebuilt tree.
    ///
    /// `data` is never modified. With `raw_output` the rebuilt tree is returned verbatim;
    /// otherwise it is marshalled into the exposed shape of `type_name`.
    #[instrument(skip(self, data, context))]
    pub async fn resolve<C>(
        &self,
        type_name: &str,
        data: &Value,
        context: &C,
        raw_output: bool,
    ) -> Result<Value, ResolverError>
    where
        C: Send + Sync,
        R: SchemaRegistry<C>,
        F: ResourceFetcher,
        M: Marshaller<C>,
    {
        info!(type_name, "Resolving");
        let resolver = self.resolver(context);
        let mut working = data.clone();

        if let Err(err) = resolver
            .execute(type_name, &mut working, Path::root())
            .await
        {
            warn!(
                type_name,
                error = %err,
                entities = resolver.ledger().len(),
                "Resolution failed"
            );
            return Err(err);
        }

        let ledger = resolver.into_ledger();
        let tree = ledger.rebuild(&working, &self.config.meta_key);
        info!(type_name, entities = ledger.len(), "Resolved");

        if raw_output {
            return Ok(tree);
        }
        self.marshaller.marshal(&self.registry, type_name, tree)
    }

    /// Resolves and marshals `data`, then deserializes the result into `T`.
    pub async fn resolve_typed<T, C>(
        &self,
        type_name: &str,
        data: &Value,
        context: &C,
    ) -> Result<T, ResolverError>
    where
        T: DeserializeOwned,
        C: Send + Sync,
        R: SchemaRegistry<C>,
        F: ResourceFetcher,
        M: Marshaller<C>,
    {
        let tree = self.resolve(type_name, data, context, false).await?;
        serde_json::from_value(tree).map_err(|err| ResolverError::Marshal {
            type_name: type_name.to_string(),
            reason: err.to_string(),
        })
    }
}
