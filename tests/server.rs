//! HTTP API tests: serve the router on an ephemeral port and call it with
//! `reqwest`.

use std::sync::Arc;

use serde_json::{json, Value};

use tender_rag::config::Config;
use tender_rag::embedding::DisabledEmbedder;
use tender_rag::server::router;
use tender_rag::service::RagService;
use tender_rag::store::memory::InMemoryStore;

async fn spawn_server() -> (String, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    store
        .add_document("Pumps", "/pumps.txt", "water pump maintenance every month")
        .await;
    store
        .add_document("Chairs", "/chairs.txt", "office chairs and desks")
        .await;

    let mut config = Config::with_db_path("unused.sqlite");
    config.chunking.chunk_size = 4;
    config.chunking.overlap = 1;

    let service = RagService::new(
        store.clone(),
        store.clone(),
        Arc::new(DisabledEmbedder::new(8)),
        None,
        &config,
    );
    let app = router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), store)
}

#[tokio::test]
async fn test_health() {
    let (base, _store) = spawn_server().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_reindex_then_query() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/chat/reindex", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["processed"], 2);
    assert_eq!(body["errors"], 0);

    let resp = client
        .post(format!("{}/api/chat/query", base))
        .json(&json!({"query": "water pump", "limit": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["query"], "water pump");
    assert!(body["answer"]
        .as_str()
        .unwrap()
        .contains("No answer generator configured"));
    assert_eq!(body["resultsCount"], 3);
    assert_eq!(body["citations"][0]["filePath"], "/pumps.txt");
    assert_eq!(body["citations"][0]["relevanceScore"], 0.3);

    let stats: Value = client
        .get(format!("{}/api/chat/stats", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalDocuments"], 2);
    assert_eq!(stats["totalChunks"], 3);
    assert_eq!(stats["averageChunksPerDocument"], 2);
}

#[tokio::test]
async fn test_query_validation_is_bad_request() {
    let (base, _store) = spawn_server().await;
    let client = reqwest::Client::new();

    for body in [json!({"query": ""}), json!({"query": "ok", "limit": 51})] {
        let resp = client
            .post(format!("{}/api/chat/query", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn test_index_and_delete_document() {
    let (base, store) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/documents/1/index", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"documentId": 1, "chunks": 2}));

    let resp = client
        .delete(format!("{}/api/documents/1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], true);

    use tender_rag::store::ChunkStore;
    assert_eq!(store.chunk_counts().await.unwrap().total_chunks, 0);

    let resp = client
        .delete(format!("{}/api/documents/1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "not_found");

    let resp = client
        .post(format!("{}/api/documents/42/index", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
