use entity_resolver::mock::MockFetcher;
use entity_resolver::{
    FetchError, FieldSpec, Path, ResolutionService, ResolverConfig, ResolverError, SchemaTable,
    TypeSchema, UnmatchedUnionPolicy,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::time::Duration;

/// Caller context consulted by the conditional gates of the test schema.
struct Viewer {
    is_admin: bool,
    max_comments: usize,
}

impl Viewer {
    fn admin() -> Self {
        Self {
            is_admin: true,
            max_comments: usize::MAX,
        }
    }

    fn anonymous(max_comments: usize) -> Self {
        Self {
            is_admin: false,
            max_comments,
        }
    }
}

fn schema() -> SchemaTable<Viewer> {
    SchemaTable::new()
        .register(
            "Article",
            TypeSchema::new()
                .reference(FieldSpec::single("author", "Person"))
                .reference(FieldSpec::array("comments", "Comment").when(
                    |viewer: &Viewer, _meta: &Value, index: Option<usize>| {
                        index.map_or(true, |i| i < viewer.max_comments)
                    },
                ))
                .reference(FieldSpec::single("reviewer", "Person").when(
                    |viewer: &Viewer, meta: &Value, _index: Option<usize>| {
                        viewer.is_admin || meta.get("public") == Some(&json!(true))
                    },
                ))
                .reference(FieldSpec::single_union(
                    "owner",
                    [("person--user", "Person"), ("person--org", "Organization")],
                ))
                .reference(FieldSpec::array_union(
                    "attachments",
                    [("media--image", "Image")],
                ))
                .reference(FieldSpec::single("address", "Address").parent_entity_holder())
                .reference(FieldSpec::array("embeds", "Comment").parent_entity_holder()),
        )
        .register(
            "Comment",
            TypeSchema::new().reference(FieldSpec::single("author", "Person").when(
                |_viewer: &Viewer, meta: &Value, _index: Option<usize>| {
                    meta.get("hidden") != Some(&json!(true))
                },
            )),
        )
        .register(
            "Organization",
            TypeSchema::new().reference(FieldSpec::array("members", "Person")),
        )
        .register(
            "Address",
            TypeSchema::new().reference(FieldSpec::single("country", "Country")),
        )
}

fn service(
    fetcher: &MockFetcher,
    config: ResolverConfig,
) -> ResolutionService<SchemaTable<Viewer>, MockFetcher> {
    ResolutionService::new(schema(), fetcher.clone(), config)
}

fn stub(compound_type: &str, id: &str) -> Value {
    json!({ "type": compound_type, "id": id })
}

fn path(text: &str) -> Path {
    text.parse().expect("valid path")
}

/// Article with an author and two comments where the second comment cannot be fetched.
#[tokio::test]
async fn test_failing_comment_fails_the_pass_and_keeps_ledger() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/person/user/u1")
        .return_ok(json!({ "name": "Alice" }));
    fetcher
        .expect_fetch("/comment/basic/c1")
        .return_ok(json!({ "text": "First" }));
    fetcher
        .expect_fetch("/comment/basic/c2")
        .return_err(FetchError::Transport("502 Bad Gateway".to_string()));
    let service = service(&fetcher, ResolverConfig::default());
    let viewer = Viewer::admin();

    let article = json!({
        "title": "Hello",
        "author": stub("person--user", "u1"),
        "comments": [stub("comment--basic", "c1"), stub("comment--basic", "c2")]
    });

    // Drive a resolver directly to inspect the ledger of the failed pass
    let resolver = service.resolver(&viewer);
    let mut working = article.clone();
    let err = resolver
        .execute("Article", &mut working, Path::root())
        .await
        .expect_err("c2 fetch should fail the pass");

    match &err {
        ResolverError::Fetch {
            path: failed,
            address,
            source,
        } => {
            assert_eq!(failed, &path("comments[1]"));
            assert_eq!(address, "/comment/basic/c2");
            assert!(matches!(source, FetchError::Transport(_)));
        }
        other => panic!("Expected fetch error, got {other:?}"),
    }

    let ledger = resolver.ledger();
    let paths: Vec<String> = ledger.paths().iter().map(ToString::to_string).collect();
    assert_eq!(paths, ["author", "comments[0]", "comments[1]"]);
    assert!(ledger.get(&path("author")).expect("author").is_resolved());
    assert!(!ledger
        .get(&path("comments[1]"))
        .expect("comments[1]")
        .is_resolved());

    // The service fails as a unit
    let err = service
        .resolve("Article", &article, &viewer, true)
        .await
        .expect_err("resolve should fail");
    assert!(err.is_fetch());
}

#[tokio::test]
async fn test_fetched_payloads_are_recorded_when_the_pass_fails() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/comment/basic/c1")
        .return_ok(json!({ "text": "hi" }));
    fetcher
        .expect_fetch("/comment/basic/c2")
        .with_delay(Duration::from_millis(20))
        .return_err(FetchError::Transport("timeout".to_string()));
    let viewer = Viewer::admin();

    // A sibling fetch fails after c1 has arrived
    let comments = service(&fetcher, ResolverConfig::default());
    let resolver = comments.resolver(&viewer);
    let mut working = json!({
        "comments": [stub("comment--basic", "c1"), stub("comment--basic", "c2")]
    });
    resolver
        .execute("Article", &mut working, Path::root())
        .await
        .expect_err("c2 fails");
    let first = resolver.ledger().get(&path("comments[0]")).expect("comments[0]");
    assert_eq!(first.data, Some(json!({ "text": "hi" })));
    assert!(!resolver
        .ledger()
        .get(&path("comments[1]"))
        .expect("comments[1]")
        .is_resolved());

    // A descent below a fetched payload fails
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/person/org/o1")
        .return_ok(json!({ "name": "Acme", "members": [stub("person--user", "u404")] }));
    let owners = service(&fetcher, ResolverConfig::default());
    let resolver = owners.resolver(&viewer);
    let mut working = json!({ "owner": stub("person--org", "o1") });
    let err = resolver
        .execute("Article", &mut working, Path::root())
        .await
        .expect_err("u404 is unknown");
    assert!(
        matches!(err, ResolverError::Fetch { ref path, .. } if path.to_string() == "owner.members[0]")
    );

    let ledger = resolver.ledger();
    assert_eq!(
        ledger.get(&path("owner")).expect("owner").data,
        Some(json!({ "name": "Acme", "members": [stub("person--user", "u404")] }))
    );
    assert!(!ledger
        .get(&path("owner.members[0]"))
        .expect("owner.members[0]")
        .is_resolved());
}

#[tokio::test]
async fn test_failed_fetch_lets_issued_siblings_finish() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/comment/basic/c1")
        .with_delay(Duration::from_millis(30))
        .return_ok(json!({ "text": "slow" }));
    fetcher
        .expect_fetch("/comment/basic/c2")
        .return_err(FetchError::Other(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "rate limited",
        ))));
    fetcher
        .expect_fetch("/comment/basic/c3")
        .with_delay(Duration::from_millis(10))
        .return_ok(json!({ "text": "quick" }));
    let service = service(&fetcher, ResolverConfig::default());

    let comments: Vec<Value> = ["c1", "c2", "c3"]
        .iter()
        .map(|id| stub("comment--basic", id))
        .collect();
    let err = service
        .resolve("Article", &json!({ "comments": comments }), &Viewer::admin(), true)
        .await
        .expect_err("c2 fails");

    match err {
        ResolverError::Fetch {
            path: failed,
            source: FetchError::Other(source),
            ..
        } => {
            assert_eq!(failed, path("comments[1]"));
            assert_eq!(source.to_string(), "rate limited");
        }
        other => panic!("Expected fetch error, got {other:?}"),
    }
    // Every issued fetch ran to the end before the pass reported the failure
    assert_eq!(fetcher.calls().len(), 3);
    assert_eq!(fetcher.completed(), 3);
}

#[tokio::test]
async fn test_gates_apply_inside_fetched_payloads() {
    let fetcher = MockFetcher::new();
    fetcher.expect_fetch("/comment/basic/c1").return_ok(json!({
        "text": "hi",
        "author": { "type": "person--user", "id": "u2", "meta": { "hidden": true } }
    }));
    fetcher.expect_fetch("/comment/basic/c2").return_ok(json!({
        "text": "hello",
        "author": stub("person--user", "u1")
    }));
    fetcher
        .expect_fetch("/person/user/u1")
        .return_ok(json!({ "name": "Alice" }));
    let service = service(&fetcher, ResolverConfig::default());

    let article = json!({
        "comments": [stub("comment--basic", "c1"), stub("comment--basic", "c2")]
    });
    let out = service
        .resolve("Article", &article, &Viewer::admin(), true)
        .await
        .expect("resolve");

    // The declined author is removed from the fetched comment, not just left unresolved
    assert_eq!(
        out,
        json!({
            "comments": [
                { "text": "hi" },
                { "text": "hello", "author": { "name": "Alice" } }
            ]
        })
    );
    assert_eq!(fetcher.calls_to("/person/user/u2"), 0);
    fetcher.verify();
}

#[tokio::test]
async fn test_parent_entity_holder_array_is_not_fetched() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/person/user/u1")
        .return_ok(json!({ "name": "Alice" }));
    let service = service(&fetcher, ResolverConfig::default());

    let article = json!({
        "embeds": [
            { "type": "comment--basic", "id": "e1", "text": "emb", "author": stub("person--user", "u1") },
            { "type": "comment--basic", "id": "e2", "text": "plain" }
        ]
    });
    let out = service
        .resolve("Article", &article, &Viewer::admin(), true)
        .await
        .expect("resolve");

    assert_eq!(fetcher.calls(), vec!["/person/user/u1"]);
    assert_eq!(
        out,
        json!({
            "embeds": [
                {
                    "type": "comment--basic",
                    "id": "e1",
                    "text": "emb",
                    "author": { "name": "Alice" }
                },
                { "type": "comment--basic", "id": "e2", "text": "plain" }
            ]
        })
    );
}

#[tokio::test]
async fn test_documents_without_references_are_unchanged() {
    let fetcher = MockFetcher::new();
    let service = service(&fetcher, ResolverConfig::default());
    let viewer = Viewer::admin();

    // Registered type, no reference field present
    let article = json!({ "title": "Hello", "tags": ["a", "b"], "stats": { "views": 3 } });
    let out = service
        .resolve("Article", &article, &viewer, true)
        .await
        .expect("resolve");
    assert_eq!(out, article);

    // Unregistered type: stubs are not references for it
    let tag = json!({ "label": "rust", "parent": stub("tag--term", "t1") });
    let out = service
        .resolve("Tag", &tag, &viewer, true)
        .await
        .expect("resolve");
    assert_eq!(out, tag);

    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_passes_are_isolated() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/person/user/u1")
        .return_ok(json!({ "name": "Alice" }));
    fetcher
        .expect_fetch("/person/user/u2")
        .return_ok(json!({ "name": "Bob" }));
    let service = service(&fetcher, ResolverConfig::default());
    let viewer = Viewer::admin();

    let first = json!({ "author": stub("person--user", "u1") });
    let second = json!({ "title": "No author" });

    let out = service
        .resolve("Article", &first, &viewer, true)
        .await
        .expect("first pass");
    assert_eq!(out, json!({ "author": { "name": "Alice" } }));

    // Nothing from the first pass leaks into the second
    let out = service
        .resolve("Article", &second, &viewer, true)
        .await
        .expect("second pass");
    assert_eq!(out, second);

    // Concurrent passes on one service stay independent
    let a = json!({ "author": stub("person--user", "u1") });
    let b = json!({ "author": stub("person--user", "u2") });
    let (out_a, out_b) = tokio::join!(
        service.resolve("Article", &a, &viewer, true),
        service.resolve("Article", &b, &viewer, true)
    );
    assert_eq!(out_a.expect("a")["author"]["name"], "Alice");
    assert_eq!(out_b.expect("b")["author"]["name"], "Bob");
    assert!(service.resolver(&viewer).ledger().is_empty());
}

#[tokio::test]
async fn test_conditional_gates_skip_fetches() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/comment/basic/c1")
        .return_ok(json!({ "text": "First" }));
    let service = service(&fetcher, ResolverConfig::default());
    let viewer = Viewer::anonymous(1);

    let article = json!({
        "title": "Hello",
        "reviewer": { "type": "person--user", "id": "u9", "meta": { "public": false } },
        "comments": [
            stub("comment--basic", "c1"),
            stub("comment--basic", "c2"),
            stub("comment--basic", "c3")
        ]
    });

    let out = service
        .resolve("Article", &article, &viewer, true)
        .await
        .expect("resolve");

    // Declined single reference is removed, declined array elements become {}
    assert_eq!(
        out,
        json!({
            "title": "Hello",
            "comments": [{ "text": "First" }, {}, {}]
        })
    );
    assert_eq!(fetcher.calls(), vec!["/comment/basic/c1"]);
    fetcher.verify();
}

#[tokio::test]
async fn test_gate_receives_reference_meta() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/person/user/u9")
        .return_ok(json!({ "name": "Rita" }));
    let service = service(&fetcher, ResolverConfig::default());

    let article = json!({
        "reviewer": { "type": "person--user", "id": "u9", "meta": { "public": true } }
    });
    let out = service
        .resolve("Article", &article, &Viewer::anonymous(0), true)
        .await
        .expect("resolve");

    assert_eq!(
        out,
        json!({ "reviewer": { "name": "Rita", "meta": { "public": true } } })
    );
}

#[tokio::test]
async fn test_union_dispatches_on_discriminator() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/person/org/o1")
        .return_ok(json!({ "name": "Acme", "members": [stub("person--user", "u1")] }));
    fetcher
        .expect_fetch("/person/user/u1")
        .return_ok(json!({ "name": "Alice" }));
    let service = service(&fetcher, ResolverConfig::default());
    let viewer = Viewer::admin();

    let article = json!({ "owner": stub("person--org", "o1") });
    let resolver = service.resolver(&viewer);
    let mut working = article.clone();
    resolver
        .execute("Article", &mut working, Path::root())
        .await
        .expect("resolve");

    // Members only resolve because the owner was treated as an Organization
    assert!(resolver.ledger().contains(&path("owner.members[0]")));

    let out = service
        .resolve("Article", &article, &viewer, true)
        .await
        .expect("resolve");
    assert_eq!(
        out,
        json!({ "owner": { "name": "Acme", "members": [{ "name": "Alice" }] } })
    );
}

#[tokio::test]
async fn test_unmatched_single_union_is_an_error() {
    let fetcher = MockFetcher::new();
    let service = service(&fetcher, ResolverConfig::default());

    let article = json!({ "owner": stub("person--bot", "b1") });
    let err = service
        .resolve("Article", &article, &Viewer::admin(), true)
        .await
        .expect_err("no subtype for person--bot");

    assert!(matches!(
        err,
        ResolverError::UnionResolution { ref discriminator, .. } if discriminator == "person--bot"
    ));
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_unmatched_array_union_elements() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/media/image/i1")
        .return_ok(json!({ "url": "cover.png" }));
    let article = json!({
        "attachments": [stub("media--video", "v1"), stub("media--image", "i1")]
    });

    // Default policy leaves the element alone and keeps the original indices
    let viewer = Viewer::admin();
    let lenient = service(&fetcher, ResolverConfig::default());
    let resolver = lenient.resolver(&viewer);
    let mut working = article.clone();
    resolver
        .execute("Article", &mut working, Path::root())
        .await
        .expect("resolve");
    assert_eq!(resolver.ledger().paths(), vec![path("attachments[1]")]);

    let out = lenient
        .resolve("Article", &article, &viewer, true)
        .await
        .expect("resolve");
    assert_eq!(
        out,
        json!({ "attachments": [stub("media--video", "v1"), { "url": "cover.png" }] })
    );

    // Reject policy fails the pass before anything is fetched
    let strict = ResolverConfig {
        unmatched_union: UnmatchedUnionPolicy::Reject,
        ..ResolverConfig::default()
    };
    let rejecting = MockFetcher::new();
    let err = service(&rejecting, strict)
        .resolve("Article", &article, &viewer, true)
        .await
        .expect_err("rejected");
    assert!(matches!(err, ResolverError::UnionResolution { .. }));
    assert_eq!(rejecting.call_count(), 0);
}

#[tokio::test]
async fn test_array_fetches_run_concurrently() {
    let fetcher = MockFetcher::new();
    let ids = ["c1", "c2", "c3", "c4"];
    for id in ids {
        fetcher
            .expect_fetch(format!("/comment/basic/{id}"))
            .with_delay(Duration::from_millis(25))
            .return_ok(json!({ "text": id }));
    }
    let service = service(&fetcher, ResolverConfig::default());

    let comments: Vec<Value> = ids.iter().map(|id| stub("comment--basic", id)).collect();
    let article = json!({ "comments": comments });
    let out = service
        .resolve("Article", &article, &Viewer::admin(), true)
        .await
        .expect("resolve");

    assert_eq!(fetcher.max_in_flight(), ids.len());
    // Order of the array is preserved regardless of completion order
    assert_eq!(
        out["comments"],
        json!([{ "text": "c1" }, { "text": "c2" }, { "text": "c3" }, { "text": "c4" }])
    );
}

#[tokio::test]
async fn test_sibling_fields_resolve_sequentially() {
    let fetcher = MockFetcher::new();
    for id in ["u1", "u2"] {
        fetcher
            .expect_fetch(format!("/person/user/{id}"))
            .with_delay(Duration::from_millis(20))
            .return_ok(json!({ "name": id }));
    }
    let service = service(&fetcher, ResolverConfig::default());

    let article = json!({
        "author": stub("person--user", "u1"),
        "reviewer": stub("person--user", "u2")
    });
    service
        .resolve("Article", &article, &Viewer::admin(), true)
        .await
        .expect("resolve");

    assert_eq!(fetcher.max_in_flight(), 1);
    assert_eq!(fetcher.calls(), vec!["/person/user/u1", "/person/user/u2"]);
}

#[tokio::test]
async fn test_one_failure_among_concurrent_fetches() {
    let fetcher = MockFetcher::new();
    for id in ["c1", "c2", "c4", "c5"] {
        fetcher
            .expect_fetch(format!("/comment/basic/{id}"))
            .with_delay(Duration::from_millis(50))
            .return_ok(json!({ "text": id }));
    }
    fetcher
        .expect_fetch("/comment/basic/c3")
        .return_err(FetchError::NotFound("c3".to_string()));
    let service = service(&fetcher, ResolverConfig::default());

    let comments: Vec<Value> = ["c1", "c2", "c3", "c4", "c5"]
        .iter()
        .map(|id| stub("comment--basic", id))
        .collect();
    let err = service
        .resolve("Article", &json!({ "comments": comments }), &Viewer::admin(), true)
        .await
        .expect_err("c3 is missing");

    assert!(matches!(err, ResolverError::Fetch { ref path, .. } if path.to_string() == "comments[2]"));
}

#[tokio::test]
async fn test_parent_entity_holder_is_not_fetched() {
    let fetcher = MockFetcher::new();
    fetcher
        .expect_fetch("/country/iso/de")
        .return_ok(json!({ "name": "Germany" }));
    let service = service(&fetcher, ResolverConfig::default());

    let article = json!({
        "address": {
            "type": "address--postal",
            "id": "a1",
            "street": "Main St",
            "country": stub("country--iso", "de")
        }
    });
    let out = service
        .resolve("Article", &article, &Viewer::admin(), true)
        .await
        .expect("resolve");

    assert_eq!(fetcher.calls(), vec!["/country/iso/de"]);
    assert_eq!(
        out,
        json!({
            "address": {
                "type": "address--postal",
                "id": "a1",
                "street": "Main St",
                "country": { "name": "Germany" }
            }
        })
    );
}

#[tokio::test]
async fn test_nested_references_are_rebuilt_with_meta() {
    let fetcher = MockFetcher::new();
    fetcher.expect_fetch("/comment/basic/c1").return_ok(json!({
        "text": "First",
        "author": { "type": "person--user", "id": "u2", "meta": { "role": "commenter" } }
    }));
    fetcher
        .expect_fetch("/person/user/u2")
        .return_ok(json!({ "name": "Bob" }));
    let config = ResolverConfig {
        meta_key: "_meta".to_string(),
        ..ResolverConfig::default()
    };
    let service = service(&fetcher, config);

    let article = json!({
        "comments": [{ "type": "comment--basic", "id": "c1", "meta": { "pinned": true } }]
    });
    let out = service
        .resolve("Article", &article, &Viewer::admin(), true)
        .await
        .expect("resolve");

    assert_eq!(
        out,
        json!({
            "comments": [{
                "text": "First",
                "author": { "name": "Bob", "_meta": { "role": "commenter" } },
                "_meta": { "pinned": true }
            }]
        })
    );
}

#[tokio::test]
async fn test_missing_payload_is_a_data_error() {
    let fetcher = MockFetcher::new();
    fetcher.expect_fetch("/person/user/u1").return_null();
    let service = service(&fetcher, ResolverConfig::default());

    let err = service
        .resolve(
            "Article",
            &json!({ "author": stub("person--user", "u1") }),
            &Viewer::admin(),
            true,
        )
        .await
        .expect_err("null payload");
    assert!(matches!(err, ResolverError::Data { ref path, .. } if path.to_string() == "author"));
}
