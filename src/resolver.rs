//! # Graph Resolver
//!
//! The [`GraphResolver`] walks a document against the schema of its type and resolves every
//! reference field it finds, recording each visited reference in its [`Ledger`].
//!
//! ## Traversal
//!
//! For one node, the reference fields of its type are processed **sequentially** in schema
//! order. Each field is handled according to its [`FieldKind`]:
//!
//! * **Single**: the conditional gate is evaluated without an index; a declined reference is
//!   removed from its parent. Otherwise the concrete type is picked (a union without a matching
//!   subtype is an error), the entity is registered, its payload is embedded or fetched, and
//!   the resolver descends into it before moving on to the next field.
//! * **Array**: every element is typed (union elements without a matching subtype are dropped
//!   or rejected according to [`UnmatchedUnionPolicy`]), gated with its index (a declined
//!   element becomes `{}`), and registered. Then two concurrent phases run, each awaited in
//!   full before the next:
//!     1. all payloads are fetched at once,
//!     2. the resolver descends into every payload at once.
//!
//!   A failure in either phase fails the field with the error of its first failed element.
//!   Work that was already issued is not cancelled: the phase drives every sibling to
//!   completion and discards their results.
//!
//! ## Paths
//!
//! Entities are registered at `parent.wire` (single) or `parent.wire[i]` (array), where `i` is
//! the element's position in the original array. Dropped and declined elements keep their
//! position, so every ledger path designates exactly one node of the document.
//!
//! ## Payload ownership
//!
//! A payload is attached to the ledger as soon as it arrives, so a failed pass still shows every
//! reference that was fetched. The branch that fetched it keeps its own copy while descending,
//! so conditional gates further down can rewrite it in place, and attaches that copy again once
//! its subtree has settled.

use crate::config::{ResolverConfig, UnmatchedUnionPolicy};
use crate::error::ResolverError;
use crate::fetcher::ResourceFetcher;
use crate::ledger::{Ledger, ResolvedEntity};
use crate::path::Path;
use crate::reference::ResourceRef;
use crate::schema::{FieldKind, FieldSpec, SchemaRegistry};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Where an array element's payload comes from.
enum PayloadSource {
    Embedded(Value),
    Remote(ResourceRef),
}

/// Recursive resolution engine for one pass.
///
/// A resolver is built for a single pass and owns that pass's [`Ledger`]. Build a new one for
/// every document; [`ResolutionService`](crate::ResolutionService) does this for you.
pub struct GraphResolver<'a, C, R: ?Sized, F: ?Sized> {
    registry: &'a R,
    fetcher: &'a F,
    context: &'a C,
    config: &'a ResolverConfig,
    ledger: Ledger,
}

impl<'a, C, R, F> GraphResolver<'a, C, R, F>
where
    C: Send + Sync,
    R: SchemaRegistry<C> + ?Sized,
    F: ResourceFetcher + ?Sized,
{
    pub fn new(
        registry: &'a R,
        fetcher: &'a F,
        context: &'a C,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            registry,
            fetcher,
            context,
            config,
            ledger: Ledger::new(),
        }
    }

    /// The ledger of this pass. Entries registered before a failure remain visible here.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    /// Resolves every reference reachable from `data`, which sits at `path` in the root
    /// document and is of type `type_name`.
    ///
    /// `data` is rewritten in place where conditional gates decline a reference. Resolved
    /// payloads go to the ledger; they are not written into `data`.
    pub fn execute<'s>(
        &'s self,
        type_name: &'s str,
        data: &'s mut Value,
        path: Path,
    ) -> BoxFuture<'s, Result<(), ResolverError>> {
        async move {
            let specs = self.registry.field_specs(type_name);
            if specs.is_empty() {
                return Ok(());
            }
            debug!(type_name, path = %path, fields = specs.len(), "Execute");

            for spec in specs {
                let wire = spec
                    .resolved_wire_name()
                    .ok_or_else(|| ResolverError::Config {
                        type_name: type_name.to_string(),
                        field: spec.property().to_string(),
                    })?;

                match spec.kind() {
                    FieldKind::Single => self.resolve_single(spec, wire, data, &path).await?,
                    FieldKind::Array => self.resolve_array(spec, wire, data, &path).await?,
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn resolve_single(
        &self,
        spec: &FieldSpec<C>,
        wire: &str,
        data: &mut Value,
        path: &Path,
    ) -> Result<(), ResolverError> {
        let Some(raw) = data.get(wire) else {
            return Ok(());
        };
        if !raw.is_object() {
            if !raw.is_null() {
                debug!(path = %path, field = wire, "Not a reference object, skipping");
            }
            return Ok(());
        }

        let child_path = path.field(wire);
        let meta = raw.get(&self.config.reference_meta_key).cloned();
        let empty = Value::Object(Map::new());

        if !spec.should_resolve(self.context, meta.as_ref().unwrap_or(&empty), None) {
            debug!(path = %child_path, "Resolution declined");
            if let Some(object) = data.as_object_mut() {
                object.shift_remove(wire);
            }
            return Ok(());
        }

        let target =
            spec.target()
                .concrete_for(raw)
                .map_err(|discriminator| ResolverError::UnionResolution {
                    path: child_path.clone(),
                    discriminator,
                })?;
        let reference = ResourceRef::from_stub(raw, &child_path)?;
        let embedded = spec.is_parent_entity_holder().then(|| raw.clone());

        self.ledger.register(ResolvedEntity::pending(
            reference.clone(),
            child_path.clone(),
            meta,
        ))?;

        let mut payload = match embedded {
            Some(payload) => payload,
            None => self.fetch(&reference, &child_path).await?,
        };
        ensure_payload(&payload, &child_path)?;
        self.ledger.attach(&child_path, payload.clone());

        self.execute(target, &mut payload, child_path.clone()).await?;
        self.ledger.attach(&child_path, payload);
        Ok(())
    }

    async fn resolve_array(
        &self,
        spec: &FieldSpec<C>,
        wire: &str,
        data: &mut Value,
        path: &Path,
    ) -> Result<(), ResolverError> {
        let items = match data.get_mut(wire) {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => return Ok(()),
            Some(_) => {
                debug!(path = %path, field = wire, "Not a reference array, skipping");
                return Ok(());
            }
        };

        let field_path = path.field(wire);
        let empty = Value::Object(Map::new());
        let mut pending = Vec::new();

        for (index, item) in items.iter_mut().enumerate() {
            let child_path = field_path.index(index);
            if !item.is_object() {
                debug!(path = %child_path, "Not a reference object, skipping");
                continue;
            }

            let target = match spec.target().concrete_for(item) {
                Ok(target) => target,
                Err(discriminator) => match self.config.unmatched_union {
                    UnmatchedUnionPolicy::Drop => {
                        debug!(path = %child_path, %discriminator, "No matching subtype, dropping");
                        continue;
                    }
                    UnmatchedUnionPolicy::Reject => {
                        return Err(ResolverError::UnionResolution {
                            path: child_path,
                            discriminator,
                        });
                    }
                },
            };

            let meta = item.get(&self.config.reference_meta_key).cloned();
            if !spec.should_resolve(self.context, meta.as_ref().unwrap_or(&empty), Some(index)) {
                debug!(path = %child_path, "Resolution declined");
                *item = Value::Object(Map::new());
                continue;
            }

            let reference = ResourceRef::from_stub(item, &child_path)?;
            self.ledger.register(ResolvedEntity::pending(
                reference.clone(),
                child_path.clone(),
                meta,
            ))?;

            let source = if spec.is_parent_entity_holder() {
                PayloadSource::Embedded(item.clone())
            } else {
                PayloadSource::Remote(reference)
            };
            pending.push((target, child_path, source));
        }

        if pending.is_empty() {
            return Ok(());
        }
        debug!(path = %field_path, count = pending.len(), "Resolving array field");

        // Phase 1: every payload of the field, concurrently.
        let fetches: Vec<_> = pending
            .into_iter()
            .map(|(target, child_path, source)| async move {
                let payload = match source {
                    PayloadSource::Embedded(payload) => payload,
                    PayloadSource::Remote(reference) => {
                        self.fetch(&reference, &child_path).await?
                    }
                };
                ensure_payload(&payload, &child_path)?;
                self.ledger.attach(&child_path, payload.clone());
                Ok::<_, ResolverError>((target, child_path, payload))
            })
            .collect();
        let mut settled = join_settled(fetches).await?;

        // Phase 2: descend into every payload, concurrently.
        let descents: Vec<_> = settled
            .iter_mut()
            .map(|(target, child_path, payload)| {
                self.execute(*target, payload, child_path.clone())
            })
            .collect();
        join_settled(descents).await?;

        for (_, child_path, payload) in settled {
            self.ledger.attach(&child_path, payload);
        }
        Ok(())
    }

    async fn fetch(&self, reference: &ResourceRef, path: &Path) -> Result<Value, ResolverError> {
        let address = reference.address(path)?;
        debug!(path = %path, %address, "Fetch");
        self.fetcher.fetch(&address).await.map_err(|source| {
            warn!(path = %path, %address, error = %source, "Fetch failed");
            ResolverError::Fetch {
                path: path.clone(),
                address: address.to_string(),
                source,
            }
        })
    }
}

/// Drives every future to completion and returns their outputs in input order, or the error
/// of the first failed future in input order. Siblings of a failed future keep running; their
/// results are discarded.
async fn join_settled<I, T>(futures: I) -> Result<Vec<T>, ResolverError>
where
    I: IntoIterator,
    I::Item: Future<Output = Result<T, ResolverError>>,
{
    let mut outputs = Vec::new();
    let mut first_error = None;
    for result in join_all(futures).await {
        match result {
            Ok(output) => outputs.push(output),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => debug!(error = %err, "Discarding sibling failure"),
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(outputs),
    }
}

fn ensure_payload(payload: &Value, path: &Path) -> Result<(), ResolverError> {
    let reason = match payload {
        Value::Object(_) => return Ok(()),
        Value::Null => "payload is empty",
        _ => "payload is not an object",
    };
    warn!(path = %path, reason, "Unusable payload");
    Err(ResolverError::Data {
        path: path.clone(),
        reason: reason.to_string(),
    })
}
