//! # Resolver Sample Library
//!
//! A blog backend wired to the resolver: a content store actor, the blog schema, typed output
//! models and demo content. Exposed as a library for integration testing.

pub mod lifecycle;
pub mod model;
pub mod schema;
pub mod seed;
pub mod store;
