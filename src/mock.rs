//! # Mock Fetcher & Testing Guide
//!
//! [`MockFetcher`] implements [`ResourceFetcher`] entirely in memory. Register the payload (or
//! failure) each address should produce, run a pass, then inspect what the resolver asked for.
//!
//! | Need | Use |
//! |------|-----|
//! | Canned payload | `expect_fetch(address).return_ok(json)` |
//! | Missing payload | `expect_fetch(address).return_null()` |
//! | Failing fetch | `expect_fetch(address).return_err(error)` |
//! | Slow fetch (to observe concurrency) | `.with_delay(duration)` before `return_*` |
//! | Which addresses were fetched, in order | [`MockFetcher::calls`] |
//! | How many fetches ran to the end | [`MockFetcher::completed`] |
//! | Peak number of overlapping fetches | [`MockFetcher::max_in_flight`] |
//! | Every expectation was used | [`MockFetcher::verify`] |
//!
//! Expectations are keyed by address and may be served any number of times. An address with no
//! expectation fails with [`FetchError::NotFound`].
//!
//! ```rust
//! use entity_resolver::mock::MockFetcher;
//! use entity_resolver::{
//!     FieldSpec, NameCasing, ResolutionService, ResolverConfig, SchemaTable, TypeSchema,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let schema = SchemaTable::<()>::new()
//!         .register(
//!             "Article",
//!             TypeSchema::new().reference(FieldSpec::single("author", "Person")),
//!         )
//!         .register("Person", TypeSchema::new().expose_all(["name"], NameCasing::AsIs));
//!
//!     let fetcher = MockFetcher::new();
//!     fetcher.expect_fetch("/person/user/u1").return_ok(json!({ "name": "Alice" }));
//!
//!     let service = ResolutionService::new(schema, fetcher.clone(), ResolverConfig::default());
//!     let article = json!({ "author": { "type": "person--user", "id": "u1" } });
//!     let tree = service.resolve("Article", &article, &(), true).await.unwrap();
//!
//!     assert_eq!(tree, json!({ "author": { "name": "Alice" } }));
//!     assert_eq!(fetcher.calls(), vec!["/person/user/u1"]);
//!     fetcher.verify();
//! }
//! ```

use crate::error::FetchError;
use crate::fetcher::ResourceFetcher;
use crate::reference::ResourceAddress;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

enum Response {
    Ok(Value),
    NotFound(String),
    Transport(String),
    Other(Arc<dyn Error + Send + Sync>),
}

impl From<FetchError> for Response {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NotFound(message) => Response::NotFound(message),
            FetchError::Transport(message) => Response::Transport(message),
            FetchError::Other(source) => Response::Other(Arc::from(source)),
        }
    }
}

/// A registered [`FetchError::Other`] source, shared by every replay of it.
#[derive(Debug)]
struct Replayed(Arc<dyn Error + Send + Sync>);

impl fmt::Display for Replayed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for Replayed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

struct Expectation {
    response: Response,
    delay: Option<Duration>,
}

impl Expectation {
    fn replay(&self) -> Result<Value, FetchError> {
        match &self.response {
            Response::Ok(value) => Ok(value.clone()),
            Response::NotFound(message) => Err(FetchError::NotFound(message.clone())),
            Response::Transport(message) => Err(FetchError::Transport(message.clone())),
            Response::Other(source) => {
                Err(FetchError::Other(Box::new(Replayed(Arc::clone(source)))))
            }
        }
    }
}

#[derive(Default)]
struct MockState {
    expectations: HashMap<String, Expectation>,
    served: HashSet<String>,
    calls: Vec<String>,
    completed: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory [`ResourceFetcher`] with expectation tracking.
///
/// Clones share state, so a test can hand one clone to a service and keep another to inspect.
#[derive(Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<MockState>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Expects a fetch of `address` (rendered as `/{entityTypeId}/{bundleId}/{id}`).
    pub fn expect_fetch(&self, address: impl Into<String>) -> FetchExpectationBuilder {
        FetchExpectationBuilder {
            address: address.into(),
            delay: None,
            state: self.state.clone(),
        }
    }

    /// Every fetched address, in the order the fetches started.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Number of fetches of one address.
    pub fn calls_to(&self, address: &str) -> usize {
        self.state().calls.iter().filter(|call| *call == address).count()
    }

    /// Number of fetches that ran to the end, whether they answered with a payload or an
    /// error. A fetch dropped while pending never completes.
    pub fn completed(&self) -> usize {
        self.state().completed
    }

    /// Highest number of fetches that were pending at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    /// Panics if an expectation was never fetched.
    pub fn verify(&self) {
        let state = self.state();
        let mut unused: Vec<&String> = state
            .expectations
            .keys()
            .filter(|address| !state.served.contains(*address))
            .collect();
        if !unused.is_empty() {
            unused.sort();
            panic!("Not all expectations were met. Never fetched: {unused:?}");
        }
    }
}

/// Decrements the in-flight counter when a fetch settles or is dropped mid-flight.
struct InFlight<'a> {
    state: &'a Mutex<MockState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn fetch(&self, address: &ResourceAddress) -> Result<Value, FetchError> {
        let key = address.to_string();
        let (delay, outcome) = {
            let mut state = self.state();
            state.calls.push(key.clone());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            match state.expectations.get(&key) {
                Some(expectation) => {
                    let served = (expectation.delay, expectation.replay());
                    state.served.insert(key.clone());
                    served
                }
                None => (None, Err(FetchError::NotFound(key.clone()))),
            }
        };
        let _guard = InFlight { state: &self.state };

        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.state().completed += 1;
        outcome
    }
}

/// Builder for fetch expectations.
pub struct FetchExpectationBuilder {
    address: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl FetchExpectationBuilder {
    /// Holds the fetch pending for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answers with `value`.
    pub fn return_ok(self, value: Value) {
        self.register(Response::Ok(value));
    }

    /// Answers with `Value::Null`, i.e. "no payload".
    pub fn return_null(self) {
        self.register(Response::Ok(Value::Null));
    }

    /// Fails with `error`.
    pub fn return_err(self, error: FetchError) {
        self.register(Response::from(error));
    }

    fn register(self, response: Response) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.expectations.insert(
            self.address,
            Expectation {
                response,
                delay: self.delay,
            },
        );
    }
}
