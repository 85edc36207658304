//! Query and fragment entities.
//!
//! A [`Query`] holds the raw source of exactly one operation plus the names
//! of the fragments it spreads; a [`Fragment`] is a reusable named selection
//! set. Composing the two produces the [`Request`] that goes on the wire.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::Request;
use graphwire_parser::OperationKind;

/// A GraphQL operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// A query operation (read-only).
    #[default]
    Query,
    /// A mutation operation (modifies data).
    Mutation,
    /// A subscription operation (real-time updates).
    Subscription,
}

impl From<OperationKind> for OperationType {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Query => Self::Query,
            OperationKind::Mutation => Self::Mutation,
            OperationKind::Subscription => Self::Subscription,
        }
    }
}

/// A single GraphQL operation, as loaded from a document.
///
/// Immutable after construction; the loader in [`crate::loader`] builds
/// these from parsed source, but they can also be constructed directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The file the operation was loaded from, if any. Provenance only.
    pub file_name: Option<String>,
    /// The operation name. Required to be unique only when the source
    /// document contains more than one operation.
    pub operation_name: Option<String>,
    /// Whether this is a query, mutation, or subscription.
    pub operation_type: OperationType,
    /// The raw source text of exactly this operation.
    pub source: String,
    /// Names of the fragments the operation spreads, in first-occurrence
    /// order.
    pub fragments: Vec<String>,
}

impl Query {
    /// Create a query from raw operation source.
    pub fn new(operation_type: OperationType, source: impl Into<String>) -> Self {
        Self {
            file_name: None,
            operation_name: None,
            operation_type,
            source: source.into(),
            fragments: Vec::new(),
        }
    }

    /// Set the operation name.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Check if this is a subscription.
    pub fn is_subscription(&self) -> bool {
        self.operation_type == OperationType::Subscription
    }

    /// Compose this operation with its fragments into a [`Request`].
    ///
    /// The request query is the operation source followed by each fragment
    /// source, every piece terminated by a newline. Fragments are appended
    /// in argument order; on a duplicate fragment name the first occurrence
    /// wins and later ones are skipped.
    pub fn to_request(&self, fragments: &[Fragment], variables: Option<Value>) -> Request {
        let mut query = String::with_capacity(
            self.source.len() + 1 + fragments.iter().map(|f| f.source.len() + 1).sum::<usize>(),
        );
        query.push_str(&self.source);
        query.push('\n');

        let mut seen = HashSet::new();
        for fragment in fragments {
            if seen.insert(fragment.name.as_str()) {
                query.push_str(&fragment.source);
                query.push('\n');
            }
        }

        Request {
            query,
            operation_name: self.operation_name.clone(),
            variables,
        }
    }
}

/// A reusable named selection set.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// The fragment name. This is the fragment's identity: equality and
    /// hashing consider the name alone.
    pub name: String,
    /// The type the fragment selects against.
    pub type_condition: String,
    /// The raw fragment source text.
    pub source: String,
}

impl Fragment {
    /// Create a fragment.
    pub fn new(
        name: impl Into<String>,
        type_condition: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_condition: type_condition.into(),
            source: source.into(),
        }
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Fragment {}

impl Hash for Fragment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_request_appends_fragments_with_newlines() {
        let query = Query::new(OperationType::Query, "query Q { f }").operation_name("Q");
        let fragment = Fragment::new("F", "T", "fragment F on T { x }");

        let request = query.to_request(&[fragment], None);
        assert_eq!(request.query, "query Q { f }\nfragment F on T { x }\n");
        assert_eq!(request.operation_name.as_deref(), Some("Q"));
        assert!(request.variables.is_none());
    }

    #[test]
    fn to_request_without_fragments_ends_with_newline() {
        let query = Query::new(OperationType::Mutation, "mutation { create }");
        let request = query.to_request(&[], None);
        assert_eq!(request.query, "mutation { create }\n");
        assert!(request.operation_name.is_none());
    }

    #[test]
    fn duplicate_fragment_names_first_wins() {
        let query = Query::new(OperationType::Query, "query Q { f }");
        let first = Fragment::new("F", "T", "fragment F on T { x }");
        let second = Fragment::new("F", "T", "fragment F on T { y }");

        let request = query.to_request(&[first, second], None);
        assert_eq!(request.query, "query Q { f }\nfragment F on T { x }\n");
    }

    #[test]
    fn fragment_identity_is_its_name() {
        let a = Fragment::new("F", "T", "fragment F on T { x }");
        let b = Fragment::new("F", "Other", "fragment F on Other { y }");
        let c = Fragment::new("G", "T", "fragment G on T { x }");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Fragment> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn operation_type_converts_from_parsed_kind() {
        assert_eq!(
            OperationType::from(OperationKind::Subscription),
            OperationType::Subscription
        );
        assert_eq!(OperationType::from(OperationKind::Query), OperationType::Query);
    }
}
