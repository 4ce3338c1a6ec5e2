//! End-to-end executor tests against a recording in-memory transport

mod common;

use common::{docs_response, harness, harness_with, param, Call};
use serde_json::json;
use std::time::Duration;

use solrgate::config::QueryFailurePolicy;
use solrgate::query::{FuzzyQuerySpec, SortClause, SortExpression, TableQuery};
use solrgate::schema::{BaseType, SchemaProvider};
use solrgate::table::{Row, Table};
use solrgate::{Error, TypedValue};

fn titles(table: &Table) -> Vec<String> {
    table
        .rows()
        .iter()
        .map(|r| r.get("title").and_then(TypedValue::as_str).unwrap_or("").to_string())
        .collect()
}

// ── Count ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_count_zero_matches_is_not_an_error() {
    let h = harness();
    let count = h
        .connector
        .count_matches("products", Some("title:nothing"), None, None, "products")
        .await
        .unwrap();
    assert_eq!(count, 0);

    let params = h.transport.query_params();
    assert_eq!(param(&params, "rows"), Some("0"));
    assert_eq!(param(&params, "start"), Some("0"));
    assert_eq!(param(&params, "q"), Some("title:nothing"));
}

#[tokio::test]
async fn test_count_returns_num_found() {
    let h = harness();
    h.transport.respond_with(json!({"response": {"numFound": 1234, "start": 0, "docs": []}}));
    let count = h
        .connector
        .count_matches("products", Some("*:*"), None, Some("inStock:true"), "products")
        .await
        .unwrap();
    assert_eq!(count, 1234);
    assert_eq!(param(&h.transport.query_params(), "fq"), Some("inStock:true"));
}

// ── Schema lookup ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_schema_id_is_fatal() {
    let h = harness();
    let err = h
        .connector
        .search("products", Some("*:*"), None, None, "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingSchema));
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_schema_is_fatal_even_when_recovering() {
    let h = harness_with(QueryFailurePolicy::Recover);
    let err = h
        .connector
        .count_matches("products", Some("*:*"), None, None, "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaNotFound(id) if id == "nope"));
    assert!(h.transport.calls().is_empty());
}

// ── Paging, sorting, caps ───────────────────────────────────────────────────

#[tokio::test]
async fn test_paged_window_requests_offset_and_count() {
    let h = harness();
    h.connector
        .paged_search("products", Some("*:*"), None, Some("price:[1 TO *]"), "products", 10, 15)
        .await
        .unwrap();

    let params = h.transport.query_params();
    assert_eq!(param(&params, "start"), Some("10"));
    assert_eq!(param(&params, "rows"), Some("5"));
    assert_eq!(param(&params, "fq"), Some("price:[1 TO *]"));
    assert_eq!(param(&params, "hl"), None);
}

#[tokio::test]
async fn test_paged_search_maps_every_returned_document() {
    let h = harness();
    let docs: Vec<_> = (0..600).map(|i| json!({"id": i.to_string()})).collect();
    h.transport.respond_with(docs_response(json!(docs)));

    let table = h
        .connector
        .paged_search("products", Some("*:*"), None, None, "products", 0, 600)
        .await
        .unwrap();
    assert_eq!(table.len(), 600);
}

#[tokio::test]
async fn test_sort_clauses_sent_in_order() {
    let h = harness();
    let sort = SortExpression::new(vec![SortClause::desc("price"), SortClause::asc("title")]);
    h.connector
        .search("products", Some("*:*"), Some(&sort), None, "products", None)
        .await
        .unwrap();
    assert_eq!(
        param(&h.transport.query_params(), "sort"),
        Some("price desc,title asc")
    );
}

#[tokio::test]
async fn test_plain_search_defaults_to_500_rows() {
    let h = harness();
    h.connector
        .search("products", Some("*:*"), None, None, "products", None)
        .await
        .unwrap();
    assert_eq!(param(&h.transport.query_params(), "rows"), Some("500"));
}

#[tokio::test]
async fn test_plain_search_caps_mapped_rows() {
    let h = harness();
    h.transport.respond_with(docs_response(json!([
        {"id": "1", "title": "Widget"},
        {"id": "2", "title": "Gadget"},
        {"id": "3", "title": "Sprocket"}
    ])));

    let table = h
        .connector
        .search("products", Some("*:*"), None, None, "products", Some(2))
        .await
        .unwrap();
    assert_eq!(param(&h.transport.query_params(), "rows"), Some("2"));
    assert_eq!(titles(&table), vec!["Widget", "Gadget"]);
}

#[tokio::test]
async fn test_post_filter_runs_on_mapped_rows() {
    let h = harness();
    h.transport.respond_with(docs_response(json!([
        {"id": "1", "title": "Widget", "price": 9.5},
        {"id": "2", "title": "Gadget", "price": 2.0},
        {"id": "3", "title": "Sprocket", "price": 12.0}
    ])));
    let post_filter = TableQuery::from_json(
        r#"{"filters": {"type": "GT", "fieldName": "price", "value": 5},
            "sorts": [{"fieldName": "price", "isAscending": false}]}"#,
    )
    .unwrap();

    let table = h
        .connector
        .search("products", Some("*:*"), None, Some(&post_filter), "products", None)
        .await
        .unwrap();

    let params = h.transport.query_params();
    assert_eq!(param(&params, "fq"), None);
    assert_eq!(titles(&table), vec!["Sprocket", "Widget"]);
}

#[tokio::test]
async fn test_post_filter_sort_skips_non_finite_prices() {
    let h = harness();
    let docs: Vec<_> = (0..40)
        .map(|i| {
            let price = if i % 3 == 0 { json!("NaN") } else { json!(i) };
            json!({"id": i.to_string(), "title": format!("item {}", i), "price": price})
        })
        .collect();
    h.transport.respond_with(docs_response(json!(docs)));
    let post_filter = TableQuery::from_json(r#"{"sorts": [{"fieldName": "price"}]}"#).unwrap();

    let table = h
        .connector
        .search("products", Some("*:*"), None, Some(&post_filter), "products", None)
        .await
        .unwrap();

    assert_eq!(table.len(), 40);
    let unpriced = table.rows().iter().filter(|r| !r.contains("price")).count();
    assert_eq!(unpriced, 14);
    assert!(table.rows()[..26].iter().all(|r| r.contains("price")));
}

// ── Boosted ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_boosted_search_registers_similarity_fields() {
    let h = harness();
    h.connector
        .boosted_search("products", Some("superman"), None, None, "products", true, "title^2 subject")
        .await
        .unwrap();

    let params = h.transport.query_params();
    assert_eq!(param(&params, "rows"), Some("500"));
    assert_eq!(param(&params, "mlt"), Some("true"));
    assert_eq!(param(&params, "mlt.fl"), Some("title^2 subject"));
    assert_eq!(param(&params, "mlt.qf"), Some("title^2 subject"));
    assert_eq!(param(&params, "fl"), Some("*,score"));
}

#[tokio::test]
async fn test_boosted_search_without_similarity() {
    let h = harness();
    h.connector
        .boosted_search("products", Some("superman"), None, None, "products", false, "title^2")
        .await
        .unwrap();
    let params = h.transport.query_params();
    assert_eq!(param(&params, "mlt"), None);
    assert_eq!(param(&params, "fl"), None);
}

// ── Highlighting ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_highlight_overlay_replaces_stored_value() {
    let h = harness();
    h.transport.respond_with(json!({
        "response": {"numFound": 2, "start": 0, "docs": [
            {"id": "42", "title": "Widget", "price": 3.5},
            {"id": "43", "title": "Gadget"}
        ]},
        "highlighting": {
            "42": {"title": ["<em>Wid</em>get"]},
            "43": {}
        }
    }));

    let table = h
        .connector
        .paged_highlighted_search("products", Some("title:wid*"), None, None, "products", 0, 10)
        .await
        .unwrap();

    assert_eq!(titles(&table), vec!["<em>Wid</em>get", "Gadget"]);
    assert_eq!(table.rows()[0].get("price"), Some(&TypedValue::Number(3.5)));

    let params = h.transport.query_params();
    assert_eq!(param(&params, "hl"), Some("true"));
    assert_eq!(param(&params, "hl.fl"), Some("*"));
    assert_eq!(param(&params, "hl.fragsize"), Some("0"));
}

#[tokio::test]
async fn test_plain_paged_search_ignores_highlighting() {
    let h = harness();
    h.transport.respond_with(json!({
        "response": {"numFound": 1, "start": 0, "docs": [{"id": "42", "title": "Widget"}]},
        "highlighting": {"42": {"title": ["<em>Wid</em>get"]}}
    }));
    let table = h
        .connector
        .paged_search("products", Some("*:*"), None, None, "products", 0, 10)
        .await
        .unwrap();
    assert_eq!(titles(&table), vec!["Widget"]);
}

// ── Fuzzy ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fuzzy_search_builds_query_from_term() {
    let h = harness();
    let spec = FuzzyQuerySpec::parse("title", "text", "Widgit", "0", "2", "50", true).unwrap();
    h.connector
        .fuzzy_search("products", "products", &spec)
        .await
        .unwrap();

    let params = h.transport.query_params();
    assert_eq!(param(&params, "q"), Some("title:widgit~2"));
    assert_eq!(param(&params, "df"), Some("text"));
    assert_eq!(param(&params, "rows"), Some("500"));
}

#[tokio::test]
async fn test_fuzzy_out_of_range_edits_rejected_before_network() {
    let h = harness();
    let spec = FuzzyQuerySpec {
        field: "title".into(),
        default_field: "title".into(),
        term: "widget".into(),
        prefix_length: 0,
        max_edits: 3,
        max_expansions: 50,
        transpositions: true,
    };
    let err = h
        .connector
        .fuzzy_search("products", "products", &spec)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(h.transport.calls().is_empty());
}

// ── Failure policy ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_surface_policy_returns_engine_error() {
    let h = harness();
    h.transport.fail(400, "undefined field nope");
    let err = h
        .connector
        .search("products", Some("nope:1"), None, None, "products", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Engine { status: 400, .. }));
}

#[tokio::test]
async fn test_recover_policy_answers_empty() {
    let h = harness_with(QueryFailurePolicy::Recover);
    h.transport.fail(500, "boom");

    let table = h
        .connector
        .search("products", Some("*:*"), None, None, "products", None)
        .await
        .unwrap();
    assert!(table.is_empty());
    assert_eq!(table.schema().len(), 4);

    let count = h
        .connector
        .count_matches("products", Some("*:*"), None, None, "products")
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_engine_times_out() {
    let h = harness();
    h.transport.stall(Duration::from_secs(120));
    let err = h
        .connector
        .paged_search("products", Some("*:*"), None, None, "products", 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(60_000)));
}

#[tokio::test(start_paused = true)]
async fn test_recover_policy_covers_timeouts() {
    let h = harness_with(QueryFailurePolicy::Recover);
    h.transport.stall(Duration::from_secs(120));
    let table = h
        .connector
        .fuzzy_search(
            "products",
            "products",
            &FuzzyQuerySpec::parse("title", "title", "widget", "0", "1", "50", true).unwrap(),
        )
        .await
        .unwrap();
    assert!(table.is_empty());
}

// ── Indexing ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_index_document_adds_then_commits() {
    let h = harness();
    let fields = json!({"id": "9", "title": "Gizmo"}).as_object().unwrap().clone();
    h.connector.index_document("products", &fields).await.unwrap();

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(&calls[0], Call::Add { documents, .. } if documents == &vec![fields.clone()]));
    assert!(matches!(&calls[1], Call::Commit { core } if core == "products"));
}

#[tokio::test]
async fn test_index_documents_sends_schema_shaped_rows() {
    let h = harness();
    let schema = h.schemas.lookup("products").unwrap();
    let mut table = Table::new(schema);
    let mut row = Row::new();
    row.set("title", TypedValue::String("Widget".into()));
    row.set("id", TypedValue::String("1".into()));
    table.push_row(row);

    h.connector.index_documents("products", &table).await.unwrap();

    let calls = h.transport.calls();
    let Call::Add { documents, .. } = &calls[0] else {
        panic!("expected add, got {:?}", calls[0]);
    };
    let keys: Vec<_> = documents[0].keys().cloned().collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"id".to_string()));
    assert!(keys.contains(&"title".to_string()));
    assert!(matches!(&calls[1], Call::Commit { .. }));
}

#[tokio::test]
async fn test_empty_bulk_index_still_commits() {
    let h = harness();
    let table = Table::new(h.schemas.lookup("products").unwrap());
    h.connector.index_documents("products", &table).await.unwrap();

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], Call::Commit { core } if core == "products"));
}

#[tokio::test]
async fn test_indexing_failure_propagates_even_when_recovering() {
    let h = harness_with(QueryFailurePolicy::Recover);
    h.transport.fail(503, "unavailable");
    let fields = json!({"id": "1"}).as_object().unwrap().clone();
    let err = h
        .connector
        .index_document("products", &fields)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Engine { status: 503, .. }));
}

// ── Schema sync ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_schema_adds_unknown_fields_only() {
    let h = harness();
    h.transport.with_catalogue(&[
        ("id", "string"),
        ("price", "string"),
        ("created", "pdate"),
        ("rating", "pfloat"),
    ]);

    let table = h.connector.sync_schema("products", "products").await.unwrap();
    assert!(table.is_empty());
    assert_eq!(table.schema().len(), 6);

    let stored = h.schemas.lookup("products").unwrap();
    assert_eq!(stored.field("price").unwrap().base_type, BaseType::Number);
    assert_eq!(stored.field("created").unwrap().base_type, BaseType::Datetime);
    assert_eq!(stored.field("rating").unwrap().base_type, BaseType::Number);
    assert_eq!(
        stored.field("created").unwrap().description.as_deref(),
        Some("solr-schema")
    );
}

#[tokio::test]
async fn test_sync_schema_is_idempotent() {
    let h = harness();
    h.transport.with_catalogue(&[("id", "string"), ("category", "text_general")]);

    let first = h.connector.sync_schema("products", "products").await.unwrap();
    let second = h.connector.sync_schema("products", "products").await.unwrap();
    assert_eq!(first.schema(), second.schema());
    assert_eq!(second.schema().len(), 5);
}

#[tokio::test]
async fn test_sync_schema_requires_schema_id() {
    let h = harness();
    let err = h.connector.sync_schema("products", " ").await.unwrap_err();
    assert!(matches!(err, Error::MissingSchema));
    assert!(h.transport.calls().is_empty());
}
