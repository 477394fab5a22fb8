//! Shared test helpers
//!
//! - `MockCatalog`: in-process catalog service on an ephemeral port
//! - `FakeLookup`: in-memory `ProductLookup` with a configurable delay
//! - event draining for EventBus assertions

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use nutriscan_common::events::ScanEvent;
use nutriscan_scanner::models::LookupResult;
use nutriscan_scanner::services::ProductLookup;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Canned HTTP reply
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: String,
    json: bool,
}

impl Reply {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: value.to_string(),
            json: true,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            json: false,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let content_type = if self.json {
            "application/json"
        } else {
            "text/plain; charset=utf-8"
        };
        (self.status, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

/// File part received by the mock `/add-product`
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

/// Multipart submission received by the mock `/add-product`
#[derive(Debug, Clone, Default)]
pub struct ReceivedSubmission {
    pub barcode: String,
    pub files: Vec<ReceivedFile>,
}

#[derive(Clone)]
struct MockState {
    products: Arc<HashMap<String, Reply>>,
    submit_reply: Reply,
    delay: Duration,
    product_hits: Arc<Mutex<Vec<String>>>,
    submissions: Arc<Mutex<Vec<ReceivedSubmission>>>,
}

pub struct MockCatalogBuilder {
    products: HashMap<String, Reply>,
    submit_reply: Reply,
    delay: Duration,
}

impl MockCatalogBuilder {
    /// Reply for `GET /product/{barcode}`; unknown barcodes get a FastAPI-style 404
    pub fn product(mut self, barcode: &str, reply: Reply) -> Self {
        self.products.insert(barcode.to_string(), reply);
        self
    }

    pub fn submit_reply(mut self, reply: Reply) -> Self {
        self.submit_reply = reply;
        self
    }

    /// Delay every product reply
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn start(self) -> MockCatalog {
        let state = MockState {
            products: Arc::new(self.products),
            submit_reply: self.submit_reply,
            delay: self.delay,
            product_hits: Arc::new(Mutex::new(Vec::new())),
            submissions: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/product/:barcode", get(get_product))
            .route("/add-product", post(add_product))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockCatalog {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }
}

/// In-process catalog service
pub struct MockCatalog {
    pub base_url: String,
    state: MockState,
    server: JoinHandle<()>,
}

impl MockCatalog {
    pub fn builder() -> MockCatalogBuilder {
        MockCatalogBuilder {
            products: HashMap::new(),
            submit_reply: Reply::json(
                200,
                json!({
                    "message": "Product uploaded successfully",
                    "product_id": "665f1c0ffee",
                    "nutritional_facts": { "calories": "250" }
                }),
            ),
            delay: Duration::ZERO,
        }
    }

    /// Barcodes requested so far, as decoded by the server
    pub fn product_hits(&self) -> Vec<String> {
        self.state.product_hits.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<ReceivedSubmission> {
        self.state.submissions.lock().unwrap().clone()
    }
}

impl Drop for MockCatalog {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn get_product(State(state): State<MockState>, Path(barcode): Path<String>) -> Response {
    state.product_hits.lock().unwrap().push(barcode.clone());

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    match state.products.get(&barcode) {
        Some(reply) => reply.clone().into_response(),
        None => Reply::json(404, json!({ "detail": "Product not found" })).into_response(),
    }
}

async fn add_product(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    let mut submission = ReceivedSubmission::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap_or_default();

        if name == "barcode" {
            submission.barcode = String::from_utf8_lossy(&bytes).into_owned();
        } else {
            submission.files.push(ReceivedFile {
                field: name,
                file_name,
                content_type,
                size: bytes.len(),
            });
        }
    }

    state.submissions.lock().unwrap().push(submission);
    state.submit_reply.clone().into_response()
}

/// Address with nothing listening on it
pub async fn unused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// In-memory lookup returning a fixed result after `delay`
pub struct FakeLookup {
    result: LookupResult,
    delay: Duration,
    calls: AtomicUsize,
    barcodes: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new(result: LookupResult, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result,
            delay,
            calls: AtomicUsize::new(0),
            barcodes: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn barcodes(&self) -> Vec<String> {
        self.barcodes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductLookup for FakeLookup {
    async fn resolve(&self, barcode: &str) -> LookupResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.barcodes.lock().unwrap().push(barcode.to_string());
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

/// Collect every event currently buffered on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
