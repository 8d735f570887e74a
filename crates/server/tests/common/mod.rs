//! Common test utilities for integration testing.
//!
//! Builds the server in-process over a throwaway SQLite store with a
//! scripted stage processor, so the full HTTP surface can be exercised
//! without external infrastructure.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use docket_core::config::{DatabaseConfig, OrchestratorConfig, StorageConfig};
use docket_core::{
    testing::MockStageProcessor, CodeMappings, Config, ExtractionEngine, FsAttachmentStore,
    ProxyProcessor, SqliteTicketStore, StageOrchestrator, StageProcessor, TicketStore,
};

/// Re-export fixtures for test convenience
pub use docket_core::testing::fixtures;

const BOUNDARY: &str = "docket-test-boundary";

/// Test fixture for HTTP-level testing with a scripted processor.
///
/// By default the orchestrator runs against a `MockStageProcessor` and
/// auto extraction is off, so every stage runs exactly when a test
/// triggers it. `TestConfig` switches on auto extraction or swaps in
/// the local simulation processor for end-to-end runs.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Scripted stage processor behind the orchestrator (ignored when
    /// the fixture was built with the simulation processor)
    pub processor: Arc<MockStageProcessor>,
    /// Temporary directory holding the database and attachment root
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Run extraction automatically after submissions with a file
    pub auto_extract: bool,
    /// Use the local simulation processor instead of the mock
    pub simulate: bool,
}

impl TestConfig {
    /// Auto extraction on, mock processor.
    pub fn with_auto_extract() -> Self {
        Self {
            auto_extract: true,
            simulate: false,
        }
    }

    /// Local simulation for both stages, auto extraction on.
    pub fn with_simulation() -> Self {
        Self {
            auto_extract: true,
            simulate: true,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with the mock processor and manual
    /// stage triggers.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let attachments_dir = temp_dir.path().join("attachments");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            storage: StorageConfig {
                attachments_dir: attachments_dir.clone(),
            },
            orchestrator: OrchestratorConfig {
                auto_extract: test_config.auto_extract,
            },
            ..Default::default()
        };

        let store: Arc<dyn TicketStore> = Arc::new(
            SqliteTicketStore::new(&db_path).expect("Failed to create ticket store"),
        );

        let processor = Arc::new(MockStageProcessor::new());
        let stage_processor: Arc<dyn StageProcessor> = if test_config.simulate {
            Arc::new(ProxyProcessor::local(CodeMappings::builtin()))
        } else {
            Arc::clone(&processor) as Arc<dyn StageProcessor>
        };

        let engine = ExtractionEngine::new(&config.extraction)
            .expect("Failed to build extraction engine");

        let orchestrator = StageOrchestrator::new(
            Arc::clone(&store),
            FsAttachmentStore::new(attachments_dir),
            engine,
            stage_processor,
            config.orchestrator.auto_extract,
        );

        let state = Arc::new(docket_server::state::AppState::new(
            config,
            store,
            orchestrator,
        ));

        let router = docket_server::api::create_router(state);

        Self {
            router,
            processor,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request with an empty body (stage triggers).
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path).await
    }

    /// Send a GET request and return the body as plain text. Used for
    /// the Prometheus exposition endpoint, which is not JSON.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a multipart POST with text fields and an optional file part.
    pub async fn post_multipart(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, Vec<u8>)>,
    ) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();

        self.send(request).await
    }

    /// Submit the Invoice ABC sample with its PDF attachment; returns
    /// the new ticket id.
    pub async fn submit_invoice_ticket(&self) -> String {
        let response = self
            .post_multipart(
                "/api/v1/tickets",
                &[
                    ("title", "Invoice INV-2026-78432 from ABC Industrial Supplies"),
                    ("description", "Monthly parts order, PO-2026-1150"),
                    ("tags", "invoice,maintenance"),
                    ("priority", "high"),
                    ("submitter", "maria.gonzalez@example.com"),
                    ("submitter_name", "Maria Gonzalez"),
                    ("submitter_department", "Maintenance"),
                ],
                Some((
                    "INV_ABC_Industrial_2026_78432.pdf",
                    "application/pdf",
                    fixtures::invoice_abc_pdf(),
                )),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "submission failed: {}",
            response.body
        );
        response.body["ticketId"]
            .as_str()
            .expect("ticketId in response")
            .to_string()
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Encode text fields and an optional file part as multipart/form-data.
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, Vec<u8>)>,
) -> Vec<u8> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(&bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Content type header value matching `multipart_body`.
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
