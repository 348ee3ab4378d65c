use super::*;
use crate::config::Config;

#[test]
fn client_configuration() {
    let mut config = Config::default();
    config.ollama.host = "test-host".to_string();
    config.ollama.port = 1234;
    config.ollama.model = "test-model".to_string();

    let client = OllamaClient::new(&config).expect("should create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let config = Config::default();
    let client = OllamaClient::new(&config)
        .expect("should create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    // Note: timeout is part of the agent configuration
    assert_eq!(client.retry_attempts, 5);
}

mod integration_tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    /// Test helper that points a client at a mock Ollama server
    fn mock_client(server: &MockServer) -> OllamaClient {
        let url = Url::parse(&server.uri()).expect("mock server uri should parse");
        let mut config = Config::default();
        config.ollama.host = url
            .host_str()
            .expect("mock server uri should have a host")
            .to_string();
        config.ollama.port = url.port().expect("mock server uri should have a port");

        OllamaClient::new(&config).expect("should create client")
    }

    #[tokio::test]
    async fn generate_embedding_parses_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.1, 0.2, 0.3, 0.4]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let embedding = tokio::task::spawn_blocking(move || client.generate_embedding("hello"))
            .await
            .expect("task should not panic")
            .expect("should generate embedding");

        assert_eq!(embedding, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[tokio::test]
    async fn empty_embedding_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embedding": [] })),
            )
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let result = tokio::task::spawn_blocking(move || client.generate_embedding("hello"))
            .await
            .expect("task should not panic");

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server).with_retry_attempts(3);
        let result = tokio::task::spawn_blocking(move || client.generate_embedding("hello"))
            .await
            .expect("task should not panic");

        let error = result.expect_err("client error should not be retried");
        assert!(format!("{:#}", error).contains("Client error: HTTP 404"));
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [1.0, 0.0]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server).with_retry_attempts(2);
        let embedding = tokio::task::spawn_blocking(move || client.generate_embedding("hello"))
            .await
            .expect("task should not panic")
            .expect("should succeed after retry");

        assert_eq!(embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn health_check_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    { "name": "nomic-embed-text:latest", "size": 274_302_450_u64 },
                    { "name": "llama3:latest" }
                ]
            })))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        tokio::task::spawn_blocking(move || client.health_check())
            .await
            .expect("task should not panic")
            .expect("health check should pass");
    }

    #[tokio::test]
    async fn validate_model_rejects_missing_model() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{ "name": "llama3:latest" }]
            })))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let result = tokio::task::spawn_blocking(move || client.validate_model())
            .await
            .expect("task should not panic");

        let error = result.expect_err("missing model should be rejected");
        assert!(format!("{:#}", error).contains("is not available"));
    }
}
