//! Catalog product record and lookup classification

use nutriscan_common::events::LookupOutcome;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fallback shown when the service reports 404 without a detail
pub const NOT_FOUND_FALLBACK: &str = "The product is not in the database.";

/// Fallback shown for any other failed lookup without a detail
pub const TRANSPORT_FALLBACK: &str = "Failed to fetch product details.";

/// Product record as returned by the catalog service
///
/// Opaque JSON object: the flow only cares whether a record exists. The
/// accessors below pick out the fields the result card displays; anything
/// missing simply renders as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRecord(Map<String, Value>);

impl ProductRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Raw field access
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn barcode(&self) -> Option<&str> {
        self.str_field("barcode")
    }

    /// `product_name`, or the legacy `name` field
    pub fn display_name(&self) -> Option<&str> {
        self.str_field("product_name").or_else(|| self.str_field("name"))
    }

    /// `product_description`, or the legacy `description` field
    pub fn description(&self) -> Option<&str> {
        self.str_field("product_description")
            .or_else(|| self.str_field("description"))
    }

    pub fn image_url(&self) -> Option<&str> {
        self.str_field("image_url")
    }

    /// Nutrition facts as display pairs, in key order
    pub fn nutrition_facts(&self) -> Vec<(String, String)> {
        match self.0.get("nutritional_facts") {
            Some(Value::Object(facts)) => facts
                .iter()
                .map(|(k, v)| (k.clone(), display_value(v)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Text rendering of the result card
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(name) = self.display_name() {
            lines.push(format!("Name: {}", name));
        }
        if let Some(description) = self.description() {
            lines.push(format!("Description: {}", description));
        }
        if let Some(url) = self.image_url() {
            lines.push(format!("Image: {}", url));
        }
        lines.push(format!("Barcode: {}", self.barcode().unwrap_or("")));

        let facts = self.nutrition_facts();
        if !facts.is_empty() {
            lines.push("Nutrition Facts:".to_string());
            lines.extend(facts.into_iter().map(|(k, v)| format!("{}: {}", k, v)));
        }

        lines
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Render a JSON value the way a label would show it (strings unquoted)
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Outcome of resolving one barcode against the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LookupResult {
    Found(ProductRecord),
    NotFound(String),
    TransportError(String),
}

impl LookupResult {
    /// Not-found result, substituting the fallback for a missing detail
    pub fn not_found(detail: Option<String>) -> Self {
        LookupResult::NotFound(non_empty_or(detail, NOT_FOUND_FALLBACK))
    }

    /// Transport failure, substituting the fallback for a missing detail
    pub fn transport_error(detail: Option<String>) -> Self {
        LookupResult::TransportError(non_empty_or(detail, TRANSPORT_FALLBACK))
    }

    pub fn outcome(&self) -> LookupOutcome {
        match self {
            LookupResult::Found(_) => LookupOutcome::Found,
            LookupResult::NotFound(_) => LookupOutcome::NotFound,
            LookupResult::TransportError(_) => LookupOutcome::TransportError,
        }
    }

    /// Headline for the result card and toast
    pub fn title(&self) -> &'static str {
        match self {
            LookupResult::Found(_) => "Product Found",
            LookupResult::NotFound(_) => "Product Not Found",
            LookupResult::TransportError(_) => "Error",
        }
    }

    /// User-displayable message; never empty
    pub fn message(&self) -> String {
        match self {
            LookupResult::Found(record) => record
                .display_name()
                .map(str::to_string)
                .unwrap_or_else(|| self.title().to_string()),
            LookupResult::NotFound(msg) => non_empty_or(Some(msg.clone()), NOT_FOUND_FALLBACK),
            LookupResult::TransportError(msg) => non_empty_or(Some(msg.clone()), TRANSPORT_FALLBACK),
        }
    }

    pub fn product(&self) -> Option<&ProductRecord> {
        match self {
            LookupResult::Found(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, LookupResult::Found(_))
    }
}

fn non_empty_or(detail: Option<String>, fallback: &str) -> String {
    detail
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
