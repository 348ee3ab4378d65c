use super::*;
use serial_test::serial;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Deterministic four-dimensional stub embeddings: one axis per topic
/// keyword and a shared floor component so no vector is all zeros
fn stub_vector(text: &str) -> Vec<f32> {
    let lowered = text.to_lowercase();
    let mut vector = vec![0.0f32; 4];
    if lowered.contains("flour") || lowered.contains("dough") || lowered.contains("oven") {
        vector[0] = 1.0;
    }
    if lowered.contains("rocket") || lowered.contains("orbit") {
        vector[1] = 1.0;
    }
    if lowered.contains("garden") || lowered.contains("soil") {
        vector[2] = 1.0;
    }
    vector[3] = 0.1;
    vector
}

struct StubEmbedder;

impl Respond for StubEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let prompt = body["prompt"].as_str().unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": stub_vector(prompt)
        }))
    }
}

async fn stub_ollama() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(StubEmbedder)
        .mount(&server)
        .await;
    server
}

fn test_config(server: &MockServer, base_dir: &std::path::Path) -> Config {
    let url = Url::parse(&server.uri()).expect("mock server uri should parse");
    let mut config = Config {
        base_dir: base_dir.to_path_buf(),
        ..Config::default()
    };
    config.ollama.host = url
        .host_str()
        .expect("mock server uri should have a host")
        .to_string();
    config.ollama.port = url.port().expect("mock server uri should have a port");
    config.ollama.embedding_dimension = 4;
    config
}

async fn stub_db() -> (VectorDb, MockServer, TempDir) {
    let server = stub_ollama().await;
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&server, temp_dir.path());
    let db = VectorDb::connect(&config).await.expect("should connect");
    (db, server, temp_dir)
}

#[test]
fn distance_metric_mapping() {
    assert_eq!(DistanceType::from(DistanceMetric::Cosine), DistanceType::Cosine);
    assert_eq!(DistanceType::from(DistanceMetric::L2), DistanceType::L2);
    assert_eq!(DistanceType::from(DistanceMetric::Dot), DistanceType::Dot);
}

#[test]
fn chunk_schema_shape() {
    let schema = chunk_schema(4);
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["id", "vector", "text", "created_at"]);

    let vector_field = schema.field_with_name("vector").expect("vector field");
    match vector_field.data_type() {
        DataType::FixedSizeList(item, size) => {
            assert_eq!(*size, 4);
            assert_eq!(item.data_type(), &DataType::Float32);
        }
        other => panic!("unexpected vector type: {other:?}"),
    }
}

#[test]
fn record_batch_single_row() {
    let record = ChunkRecord {
        id: "chunk_3".to_string(),
        vector: vec![0.0, 1.0, 0.0, 0.1],
        text: "Some chunk text".to_string(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
    };

    let batch = create_record_batch(&record, 4).expect("should build record batch");
    assert_eq!(batch.num_rows(), 1);

    let ids = batch
        .column_by_name("id")
        .expect("id column")
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("string id column");
    assert_eq!(ids.value(0), "chunk_3");
}

#[tokio::test]
#[serial]
async fn collection_creation_and_reopen() {
    let (db, _server, _temp_dir) = stub_db().await;

    assert!(!db.exists("vdb_collection").await.expect("should check"));

    let collection = db
        .create_or_get("vdb_collection")
        .await
        .expect("should create collection");
    assert_eq!(collection.name(), "vdb_collection");
    assert_eq!(collection.count().await.expect("should count"), 0);
    assert!(db.exists("vdb_collection").await.expect("should check"));

    // Reopening must not disturb existing state
    let reopened = db
        .create_or_get("vdb_collection")
        .await
        .expect("should reopen collection");
    assert_eq!(reopened.count().await.expect("should count"), 0);
}

#[tokio::test]
#[serial]
async fn insert_and_count() {
    let (db, _server, _temp_dir) = stub_db().await;
    let collection = db
        .create_or_get("vdb_collection")
        .await
        .expect("should create collection");

    collection
        .insert("chunk_0", "Mix the flour with water.")
        .await
        .expect("should insert first chunk");
    collection
        .insert("chunk_1", "Let the dough rest.")
        .await
        .expect("should insert second chunk");

    assert_eq!(collection.count().await.expect("should count"), 2);
}

#[tokio::test]
#[serial]
async fn duplicate_ids_are_rejected() {
    let (db, _server, _temp_dir) = stub_db().await;
    let collection = db
        .create_or_get("vdb_collection")
        .await
        .expect("should create collection");

    collection
        .insert("chunk_0", "Mix the flour with water.")
        .await
        .expect("should insert chunk");

    let error = collection
        .insert("chunk_0", "Different text, same id.")
        .await
        .expect_err("duplicate id should be rejected");
    assert!(matches!(error, RagError::DuplicateId(_)));

    // The original row is untouched
    assert_eq!(collection.count().await.expect("should count"), 1);
}

#[tokio::test]
#[serial]
async fn search_orders_by_similarity() {
    let (db, _server, _temp_dir) = stub_db().await;
    let collection = db
        .create_or_get("vdb_collection")
        .await
        .expect("should create collection");

    collection
        .insert("chunk_0", "Mix the flour and knead the dough.")
        .await
        .expect("should insert");
    collection
        .insert("chunk_1", "The rocket reached a stable orbit.")
        .await
        .expect("should insert");
    collection
        .insert("chunk_2", "Water the garden in the morning.")
        .await
        .expect("should insert");

    let results = collection
        .search("How long should the dough rest before the oven?", 3)
        .await
        .expect("should search");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "chunk_0");
    assert!(results[0].similarity_score > results[2].similarity_score);
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
#[serial]
async fn search_is_bounded_by_collection_size() {
    let (db, _server, _temp_dir) = stub_db().await;
    let collection = db
        .create_or_get("vdb_collection")
        .await
        .expect("should create collection");

    collection
        .insert("chunk_0", "Mix the flour.")
        .await
        .expect("should insert");
    collection
        .insert("chunk_1", "Knead the dough.")
        .await
        .expect("should insert");

    let results = collection
        .search("flour", 5)
        .await
        .expect("should search");
    assert_eq!(results.len(), 2);

    let top_one = collection
        .search("flour", 1)
        .await
        .expect("should search");
    assert_eq!(top_one.len(), 1);
}

#[tokio::test]
#[serial]
async fn empty_collection_search_is_empty() {
    let (db, _server, _temp_dir) = stub_db().await;
    let collection = db
        .create_or_get("vdb_collection")
        .await
        .expect("should create collection");

    let results = collection
        .search("anything at all", 5)
        .await
        .expect("empty collection should not error");
    assert!(results.is_empty());
}

#[tokio::test]
#[serial]
async fn deleted_collection_recreates_empty() {
    let (db, _server, _temp_dir) = stub_db().await;
    let collection = db
        .create_or_get("vdb_collection")
        .await
        .expect("should create collection");

    collection
        .insert("chunk_0", "Mix the flour.")
        .await
        .expect("should insert");
    collection
        .insert("chunk_1", "Knead the dough.")
        .await
        .expect("should insert");

    db.delete("vdb_collection").await.expect("should drop");
    // Dropping a missing collection is not an error
    db.delete("vdb_collection").await.expect("should be idempotent");

    let recreated = db
        .create_or_get("vdb_collection")
        .await
        .expect("should recreate collection");
    assert_eq!(recreated.count().await.expect("should count"), 0);
}
