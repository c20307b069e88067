//! Demo content for the content store.

use crate::store::{StoreClient, StoreError};
use entity_resolver::ResourceAddress;
use serde_json::{json, Value};

fn stub(compound_type: &str, id: &str) -> Value {
    json!({ "type": compound_type, "id": id })
}

/// Resources referenced by the demo article, in insertion order.
fn resources() -> Vec<Value> {
    vec![
        json!({ "type": "person--user", "id": "u1", "name": "Alice", "email": "alice@example.com" }),
        json!({ "type": "person--user", "id": "u2", "name": "Bob" }),
        json!({ "type": "person--user", "id": "u3", "name": "Carol", "email": "carol@example.com" }),
        json!({
            "type": "person--org",
            "id": "o1",
            "name": "Acme Publishing",
            "members": [stub("person--user", "u1"), stub("person--user", "u3")]
        }),
        json!({ "type": "comment--basic", "id": "c1", "text": "Great write-up!", "author": stub("person--user", "u2") }),
        json!({ "type": "comment--basic", "id": "c2", "text": "Buy cheap watches", "author": stub("person--user", "u2") }),
        json!({ "type": "comment--basic", "id": "c3", "text": "Thanks, fixed the typo.", "author": stub("person--user", "u1") }),
        json!({ "type": "taxonomy_term--tags", "id": "t1", "label": "rust" }),
        json!({ "type": "taxonomy_term--tags", "id": "t2", "label": "async" }),
        json!({ "type": "country--iso", "id": "de", "name": "Germany", "code": "DE" }),
    ]
}

/// The demo article as a backend would return it: relationships are stubs.
pub fn article() -> Value {
    json!({
        "type": "node--article",
        "id": "a1",
        "title": "Resolving JSON:API graphs",
        "body": "Stubs in, documents out.",
        "published_at": "2024-05-01T09:00:00Z",
        "internal_revision": 17,
        "author": { "type": "person--user", "id": "u1", "meta": { "byline": "Staff writer" } },
        "owner": stub("person--org", "o1"),
        "reviewer": stub("person--user", "u3"),
        "comments": [
            stub("comment--basic", "c1"),
            { "type": "comment--basic", "id": "c2", "meta": { "hidden": true } },
            stub("comment--basic", "c3")
        ],
        "field_tags": [stub("taxonomy_term--tags", "t1"), stub("taxonomy_term--tags", "t2")],
        "location": {
            "type": "address--postal",
            "id": "addr1",
            "street": "Friedrichstraße 1",
            "city": "Berlin",
            "country": stub("country--iso", "de")
        }
    })
}

/// Stores the demo article and everything it references. Returns the article's address.
pub async fn seed(store: &StoreClient) -> Result<ResourceAddress, StoreError> {
    for resource in resources() {
        store.insert(resource).await?;
    }
    store.insert(article()).await
}
