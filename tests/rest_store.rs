//! Integration tests for the PostgREST chunk store against a mock server.

use httpmock::prelude::*;
use serde_json::json;
use url::Url;

use ragpipe::{ChunkRecord, ChunkStore, Metadata, MetadataValue, RagError, RestChunkStore, StoreConfig};

fn store_for(server: &MockServer) -> RestChunkStore {
    let config = StoreConfig::new(Url::parse(&server.base_url()).unwrap())
        .with_service_role_key("service-key")
        .with_anon_key("anon-key");
    RestChunkStore::new(config).unwrap()
}

fn sample_record() -> ChunkRecord {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), MetadataValue::from("upload"));
    ChunkRecord {
        url: "file:///tmp/doc.txt".to_string(),
        source: "upload".to_string(),
        chunk_number: 0,
        content: "chunk text".to_string(),
        metadata,
        embedding: vec![1.0, 0.0],
    }
}

#[tokio::test]
async fn upsert_posts_one_bulk_merge_duplicates_request() {
    let server = MockServer::start_async().await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/rag_pages")
                .query_param("on_conflict", "url,chunk_number")
                .header("apikey", "service-key")
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .body_contains("file:///tmp/doc.txt");
            then.status(201);
        })
        .await;

    let store = store_for(&server);
    store.upsert_chunks(vec![sample_record()]).await.unwrap();
    upsert.assert_async().await;
}

#[tokio::test]
async fn empty_upsert_sends_no_request() {
    let server = MockServer::start_async().await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/rag_pages");
            then.status(201);
        })
        .await;

    let store = store_for(&server);
    store.upsert_chunks(Vec::new()).await.unwrap();
    assert_eq!(upsert.hits_async().await, 0);
}

#[tokio::test]
async fn rejected_write_surfaces_authorization_error_with_hint() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/rag_pages");
            then.status(401).body("permission denied for table rag_pages");
        })
        .await;

    let store = store_for(&server);
    let err = store.upsert_chunks(vec![sample_record()]).await.unwrap_err();
    assert!(matches!(err, RagError::WriteAuthorization { .. }));
    assert!(err.to_string().contains("SUPABASE_SERVICE_ROLE_KEY"));
}

#[tokio::test]
async fn upsert_without_write_key_is_a_config_error() {
    let server = MockServer::start_async().await;
    let config =
        StoreConfig::new(Url::parse(&server.base_url()).unwrap()).with_anon_key("anon-key");
    let store = RestChunkStore::new(config).unwrap();

    let err = store.upsert_chunks(vec![sample_record()]).await.unwrap_err();
    assert!(matches!(err, RagError::Config(_)));
}

#[tokio::test]
async fn scan_ranks_rows_locally_and_skips_unusable_embeddings() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/rag_pages")
                .query_param("select", "*")
                .header("apikey", "service-key");
            then.status(200).json_body(json!([
                {
                    "id": 1,
                    "url": "file:///tmp/a.txt",
                    "source": "upload",
                    "chunk_number": 0,
                    "content": "aligned",
                    "metadata": {"source": "upload"},
                    "embedding": [1.0, 0.0],
                },
                {
                    "id": 2,
                    "url": "file:///tmp/b.txt",
                    "source": "upload",
                    "chunk_number": "1",
                    "content": "orthogonal",
                    "metadata": "{\"source\": \"upload\"}",
                    "embedding": "[0.0, 1.0]",
                },
                {
                    "id": 3,
                    "url": "file:///tmp/c.txt",
                    "source": "upload",
                    "chunk_number": 2,
                    "content": "no embedding",
                    "metadata": {},
                    "embedding": null,
                },
                {
                    "id": 4,
                    "url": "file:///tmp/d.txt",
                    "source": "upload",
                    "chunk_number": 3,
                    "content": "garbage embedding",
                    "metadata": {},
                    "embedding": "not a vector",
                },
                {
                    "id": 5,
                    "url": "file:///tmp/e.txt",
                    "source": "upload",
                    "chunk_number": 4,
                    "content": "zero norm",
                    "metadata": {},
                    "embedding": [0.0, 0.0],
                },
            ]));
        })
        .await;

    let store = store_for(&server);
    let results = store.similarity_search(&[1.0, 0.0], 10, None).await.unwrap();

    // Rows 3-5 are unusable; the two survivors come back ranked.
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "file:///tmp/a.txt");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
    assert_eq!(results[1].url, "file:///tmp/b.txt");
    assert!(results[1].similarity.abs() < 1e-5);
    assert_eq!(results[1].chunk_number, 1);
    assert_eq!(
        results[1].metadata.get("source").and_then(MetadataValue::as_str),
        Some("upload")
    );
}

#[tokio::test]
async fn scan_truncates_to_match_count() {
    let server = MockServer::start_async().await;
    let rows: Vec<serde_json::Value> = (0..6)
        .map(|i| {
            json!({
                "id": i,
                "url": format!("file:///tmp/{i}.txt"),
                "source": "upload",
                "chunk_number": i,
                "content": format!("chunk {i}"),
                "metadata": {},
                "embedding": [1.0, i as f32 * 0.1],
            })
        })
        .collect();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/rag_pages");
            then.status(200).json_body(json!(rows));
        })
        .await;

    let store = store_for(&server);
    let results = store.similarity_search(&[1.0, 0.0], 3, None).await.unwrap();
    assert_eq!(results.len(), 3);
    // Highest similarity first: the row whose vector points along the query.
    assert_eq!(results[0].url, "file:///tmp/0.txt");
}

#[tokio::test]
async fn equality_filter_is_passed_to_the_server() {
    let server = MockServer::start_async().await;
    let filtered = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/v1/rag_pages")
                .query_param("source", "eq.upload");
            then.status(200).json_body(json!([{
                "id": 1,
                "url": "file:///tmp/a.txt",
                "source": "upload",
                "chunk_number": 0,
                "content": "mine",
                "metadata": {"source": "upload"},
                "embedding": [1.0, 0.0],
            }]));
        })
        .await;

    let store = store_for(&server);
    let mut filter = Metadata::new();
    filter.insert("source".to_string(), MetadataValue::from("upload"));
    let results = store
        .similarity_search(&[1.0, 0.0], 5, Some(&filter))
        .await
        .unwrap();
    filtered.assert_async().await;
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn remote_ranking_is_tried_when_the_scan_comes_back_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/rag_pages");
            then.status(200).json_body(json!([]));
        })
        .await;
    let first_candidate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/rest/v1/rpc/match_all_chunks")
                .body_contains("query_embedding");
            then.status(404).body("function does not exist");
        })
        .await;
    let second_candidate = server
        .mock_async(|when, then| {
            when.method(POST).path("/rest/v1/rpc/match_crawled_pages");
            then.status(200).json_body(json!([{
                "id": 9,
                "url": "https://example.com/crawled",
                "chunk_number": 0,
                "content": "ranked remotely",
                "metadata": {"source": "crawl"},
                "similarity": 0.87,
            }]));
        })
        .await;

    let store = store_for(&server);
    let results = store.similarity_search(&[1.0, 0.0], 5, None).await.unwrap();

    first_candidate.assert_async().await;
    second_candidate.assert_async().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "https://example.com/crawled");
    assert!((results[0].similarity - 0.87).abs() < 1e-5);
}

#[tokio::test]
async fn search_degrades_to_empty_when_every_tier_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/v1/rag_pages");
            then.status(500).body("table unavailable");
        })
        .await;
    let rpc = server
        .mock_async(|when, then| {
            when.method(POST).path_contains("/rest/v1/rpc/");
            then.status(404).body("no such function");
        })
        .await;

    let store = store_for(&server);
    let results = store.similarity_search(&[1.0, 0.0], 5, None).await.unwrap();
    assert!(results.is_empty());
    // All three candidate procedures were attempted before giving up.
    assert_eq!(rpc.hits_async().await, 3);
}
