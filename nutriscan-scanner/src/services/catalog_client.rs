//! Catalog service client
//!
//! Two endpoints:
//! - `GET /product/{barcode}`: product lookup, folded into a [`LookupResult`]
//! - `POST /add-product`: multipart submission of a new product
//!
//! No retries happen here. A failed lookup is terminal for its scan session;
//! whether to try again is the user's call.

use crate::error::{CatalogError, CatalogResult};
use crate::models::{LookupResult, ProductRecord};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("NutriScan/", env!("CARGO_PKG_VERSION"));
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Anything that can turn a barcode into a [`LookupResult`]
///
/// Implementations must not panic or return errors: every failure is a
/// `TransportError` or `NotFound` value.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn resolve(&self, barcode: &str) -> LookupResult;
}

/// Image attached to a product submission
#[derive(Debug, Clone)]
pub struct ProductImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ProductImage {
    /// Wrap in-memory bytes, sniffing the content type from the data
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Read an image from disk
    pub async fn from_path(path: &Path) -> CatalogResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        tracing::debug!(
            path = %path.display(),
            size_kb = bytes.len() / 1024,
            "Loaded product image"
        );

        Ok(Self::new(file_name, bytes))
    }

    fn into_part(self) -> CatalogResult<Part> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .map_err(|e| CatalogError::InvalidSubmission(e.to_string()))
    }
}

/// New product to add to the catalog
#[derive(Debug, Clone)]
pub struct ProductSubmission {
    pub barcode: String,
    pub front_image: ProductImage,
    pub back_image: Option<ProductImage>,
}

/// Catalog acknowledgement of a submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub product_id: Option<String>,
    /// Facts the service extracted from the back image
    #[serde(default)]
    pub nutritional_facts: Map<String, Value>,
}

/// HTTP client for the catalog service
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> CatalogResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(base_url.to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        tracing::info!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "Catalog client created");

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each segment
    ///
    /// A barcode containing `/` or spaces (QR payloads) stays one segment.
    fn endpoint(&self, segments: &[&str]) -> CatalogResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch the raw product record for a barcode
    pub async fn fetch_product(&self, barcode: &str) -> CatalogResult<ProductRecord> {
        let url = self.endpoint(&["product", barcode])?;

        tracing::debug!(barcode = %barcode, url = %url, "Querying catalog service");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound {
                detail: json_detail(&body),
            });
        }

        if !status.is_success() {
            return Err(CatalogError::Api {
                status: status.as_u16(),
                detail: json_detail(&body),
            });
        }

        let value: Value =
            serde_json::from_slice(&body).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(CatalogError::Parse(
                "expected a JSON object for the product".to_string(),
            ));
        };

        // Older catalog builds answer 200 with {"error": true, "message": ...}
        if fields.get("error").and_then(Value::as_bool) == Some(true) {
            let detail = fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(CatalogError::NotFound { detail });
        }

        Ok(ProductRecord::new(fields))
    }

    /// Upload a new product with its images
    pub async fn submit_product(
        &self,
        submission: ProductSubmission,
    ) -> CatalogResult<SubmissionReceipt> {
        let barcode = submission.barcode.trim().to_string();
        if barcode.is_empty() {
            return Err(CatalogError::InvalidSubmission("Barcode Required".to_string()));
        }

        let url = self.endpoint(&["add-product"])?;

        let mut form = Form::new()
            .text("barcode", barcode.clone())
            .part("front_image", submission.front_image.into_part()?);
        if let Some(back) = submission.back_image {
            form = form.part("back_image", back.into_part()?);
        }

        tracing::info!(barcode = %barcode, url = %url, "Submitting product");

        let response = self
            .http_client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if !status.is_success() {
            // Non-JSON error pages are shown verbatim
            let detail = json_detail(body.as_bytes()).or_else(|| {
                let text = body.trim();
                (!text.is_empty()).then(|| text.to_string())
            });
            tracing::warn!(barcode = %barcode, status = status.as_u16(), "Product submission rejected");
            return Err(CatalogError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let receipt: SubmissionReceipt =
            serde_json::from_str(&body).map_err(|e| CatalogError::Parse(e.to_string()))?;

        tracing::info!(
            barcode = %barcode,
            product_id = receipt.product_id.as_deref().unwrap_or("unknown"),
            "Product submitted"
        );

        Ok(receipt)
    }
}

#[async_trait]
impl ProductLookup for CatalogClient {
    async fn resolve(&self, barcode: &str) -> LookupResult {
        match self.fetch_product(barcode).await {
            Ok(record) => {
                tracing::info!(barcode = %barcode, "Product found");
                LookupResult::Found(record)
            }
            Err(CatalogError::NotFound { detail }) => {
                tracing::info!(barcode = %barcode, "Product not found");
                LookupResult::not_found(detail)
            }
            Err(e) => {
                tracing::warn!(barcode = %barcode, error = %e, "Catalog lookup failed");
                LookupResult::transport_error(e.detail().map(str::to_string))
            }
        }
    }
}

/// Extract a non-empty string `detail` field from a JSON error body
fn json_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
