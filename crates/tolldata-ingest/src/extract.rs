//! Structured-extraction boundary
//!
//! The AI extraction service is an external collaborator: it takes a URL
//! and a field schema and returns structured data. The pipeline only
//! defines the schema vocabulary and the call seam; it never interprets
//! the result.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Type tag of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Url,
    Number,
    Flag,
}

impl ScalarKind {
    fn tag(&self) -> &'static str {
        match self {
            ScalarKind::Text => "string",
            ScalarKind::Url => "url",
            ScalarKind::Number => "number",
            ScalarKind::Flag => "boolean",
        }
    }
}

/// Extraction schema: a scalar tag, a list of a schema, or an object of
/// named schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    Scalar(ScalarKind),
    List(Box<Schema>),
    Object(BTreeMap<String, Schema>),
}

impl Schema {
    pub fn text() -> Self {
        Schema::Scalar(ScalarKind::Text)
    }

    pub fn url() -> Self {
        Schema::Scalar(ScalarKind::Url)
    }

    pub fn list(inner: Schema) -> Self {
        Schema::List(Box::new(inner))
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(
            fields
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
        )
    }

    /// Render the loose JSON form the service accepts:
    /// `{"name": "string", "offices": [{"name": "string"}]}`.
    pub fn to_wire(&self) -> Value {
        match self {
            Schema::Scalar(kind) => json!(kind.tag()),
            Schema::List(inner) => json!([inner.to_wire()]),
            Schema::Object(fields) => {
                let map: Map<String, Value> = fields
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_wire()))
                    .collect();
                Value::Object(map)
            },
        }
    }
}

/// Seam for the external extraction service. Implementations own
/// transport, authentication and retries; callers get `(data, error)`.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, url: &str, schema: &Schema) -> anyhow::Result<Value>;
}
