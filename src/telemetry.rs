//! # Observability
//!
//! The resolver logs through `tracing` with structured fields. Install a subscriber once per
//! process, typically with [`setup_tracing`].
//!
//! ## What Gets Traced
//!
//! - **Passes**: start and finish of every [`resolve`](crate::ResolutionService::resolve) call,
//!   with the number of entities visited (`info`)
//! - **Traversal**: every node executed, every fetch issued, every declined or dropped
//!   reference (`debug`)
//! - **Failures**: fetch errors, unusable payloads and ledger collisions, logged before they
//!   propagate (`warn`)
//!
//! ## Usage Examples
//!
//! ```bash
//! # Pass-level milestones only
//! RUST_LOG=info cargo run -p resolver-sample
//!
//! # Every fetch and descent
//! RUST_LOG=entity_resolver=debug cargo run -p resolver-sample
//! ```
//!
//! With `RUST_LOG=debug` a pass over an article looks like:
//!
//! ```text
//! INFO resolve: Resolving type_name="Article"
//! DEBUG resolve: Execute type_name="Article" path= fields=3
//! DEBUG resolve: Fetch path=author address=/person/user/u1
//! DEBUG resolve: Resolving array field path=comments count=2
//! DEBUG resolve: Fetch path=comments[0] address=/comment/basic/c1
//! DEBUG resolve: Fetch path=comments[1] address=/comment/basic/c2
//! INFO resolve: Resolved type_name="Article" entities=3
//! ```

/// Initializes a compact `tracing` subscriber filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
