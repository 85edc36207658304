//! The wire-format GraphQL request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A GraphQL request as it is serialized onto the wire.
///
/// Serializes to `{"query", "operationName", "variables"}`, omitting the
/// latter two when absent. This is both the HTTP POST body and the
/// `payload` of a subscribe frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The composed query source. Never empty when produced by
    /// [`Query::to_request`](crate::Query::to_request).
    pub query: String,

    /// Operation name, required when the query contains several operations.
    #[serde(
        default,
        rename = "operationName",
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,

    /// Variables, serialized as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl Request {
    /// Create a request from raw query source.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
        }
    }

    /// Set the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set the variables from any serializable value.
    pub fn variables(mut self, variables: impl Serialize) -> Self {
        self.variables = serde_json::to_value(variables).ok();
        self
    }

    /// Set a single variable, keeping any already set.
    pub fn variable(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let variables = self
            .variables
            .get_or_insert_with(|| Value::Object(Default::default()));
        if let Value::Object(map) = variables
            && let Ok(value) = serde_json::to_value(value)
        {
            map.insert(name.into(), value);
        }
        self
    }
}
