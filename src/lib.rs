//! # Entity Resolver
//!
//! > **Hydrate JSON:API reference stubs into a fully resolved document tree.**
//!
//! Documents coming out of a JSON:API backend carry relationships as lightweight stubs:
//!
//! ```json
//! { "title": "Hello", "author": { "type": "person--user", "id": "u1", "meta": { "role": "owner" } } }
//! ```
//!
//! This crate walks such a document against a declarative schema, fetches every referenced
//! resource, recurses into what comes back, and splices the payloads (plus their metadata) into a
//! copy of the document.
//!
//! ## 🚀 Core Concepts
//!
//! ### Schemas
//! A [`SchemaTable`] maps each output type to its [`TypeSchema`]: the ordered [`FieldSpec`]s of
//! its reference fields, and which of its fields are exposed in typed output. A reference field
//! is single or array, points at one concrete type or at a discriminated union, can be embedded
//! in its parent (a *parent-entity-holder*, never fetched), and can be gated by a predicate over
//! a caller-supplied context.
//!
//! ### Passes
//! [`ResolutionService::resolve`] runs one pass: a fresh [`GraphResolver`] executes from the root,
//! records every visited reference in a [`Ledger`] keyed by its structured [`Path`], and the ledger
//! rebuilds the tree. Nothing is cached between passes.
//!
//! ### Fetching
//! The resolver calls a [`ResourceFetcher`] with the address `/{entityTypeId}/{bundleId}/{id}`
//! derived from the compound type. Transport, retries and auth belong to the fetcher.
//! [`mock::MockFetcher`] is an in-memory implementation for tests.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Concurrency Model
//! Fields of one node are resolved one after another. The references of an array field are
//! fetched concurrently, then descended into concurrently. The ledger is the only state shared
//! inside a pass.
//!
//! ### 2. Error Handling
//! Every failure is a [`ResolverError`] and aborts the pass. Fetch failures carry the
//! [`FetchError`] returned by the fetcher.
//!
//! ### 3. Observability
//! `tracing` everywhere with structured fields. See the [`telemetry`] module.
//!
//! ## 🗺️ Module Tour
//!
//! - [`schema`]: field specs, type schemas, the schema table
//! - [`resolver`]: the recursive traversal
//! - [`ledger`]: per-pass bookkeeping and tree rebuild
//! - [`service`]: one pass from input to output
//! - [`marshal`]: typed, field-filtered output
//! - [`path`], [`reference`]: structured paths and resource identities
//! - [`config`]: TOML configuration
//!
//! ### Running the Sample
//!
//! ```bash
//! RUST_LOG=info cargo run -p resolver-sample
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod marshal;
pub mod mock;
pub mod path;
pub mod reference;
pub mod resolver;
pub mod schema;
pub mod service;
pub mod telemetry;

pub use config::{ConfigError, ResolverConfig, UnmatchedUnionPolicy};
pub use error::{FetchError, ResolverError};
pub use fetcher::ResourceFetcher;
pub use ledger::{Ledger, ResolvedEntity};
pub use marshal::{Marshaller, NameCasing, SchemaMarshaller};
pub use path::{Path, PathParseError, Segment};
pub use reference::{ResourceAddress, ResourceRef, COMPOUND_SEPARATOR};
pub use resolver::GraphResolver;
pub use schema::{
    ConditionalResolver, ExposedField, Exposure, FieldKind, FieldSpec, FieldTarget,
    SchemaRegistry, SchemaTable, TypeSchema, DEFAULT_DISCRIMINATOR,
};
pub use service::ResolutionService;
pub use telemetry::setup_tracing;
