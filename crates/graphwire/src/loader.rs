//! Document loaders.
//!
//! Turn `.graphql` / `.graphqlfrag` source into [`Query`] and [`Fragment`]
//! values: parse once, slice each definition's raw text back out of the
//! source by byte span, and collect the fragment names an operation spreads.

use std::collections::HashSet;
use std::path::Path;

use graphwire_parser::{Definition, NodeRef, OperationDefinition, parse_document};

use crate::error::{Error, Result};
use crate::query::{Fragment, Query};

fn source_label(file_name: Option<&str>) -> String {
    file_name.unwrap_or("<inline>").to_string()
}

/// Load every operation definition from GraphQL source.
///
/// Fails with [`Error::LoadValidation`] when the source contains no
/// operations, or contains several and any of them is unnamed or shares a
/// name with another.
pub fn queries_from_source(source: &str, file_name: Option<&str>) -> Result<Vec<Query>> {
    let file = source_label(file_name);
    let document = parse_document(source).map_err(|e| Error::Parse {
        file: file.clone(),
        message: e.to_string(),
    })?;

    let operations: Vec<&OperationDefinition> = document
        .definitions
        .iter()
        .filter_map(|def| match def {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        })
        .collect();

    if operations.is_empty() {
        return Err(Error::LoadValidation {
            file,
            message: "no operation definitions found".into(),
        });
    }

    if operations.len() > 1 {
        let mut names = HashSet::new();
        for op in &operations {
            let Some(name) = op.name.as_deref() else {
                return Err(Error::LoadValidation {
                    file,
                    message: "every operation must be named when a document \
                              contains more than one"
                        .into(),
                });
            };
            if !names.insert(name) {
                return Err(Error::LoadValidation {
                    file,
                    message: format!("duplicate operation name `{name}`"),
                });
            }
        }
    }

    Ok(operations
        .into_iter()
        .map(|op| Query {
            file_name: file_name.map(str::to_string),
            operation_name: op.name.clone(),
            operation_type: op.operation.into(),
            source: source[op.loc.start..op.loc.end].to_string(),
            fragments: spread_names(op),
        })
        .collect())
}

/// Load every fragment definition from GraphQL source.
///
/// A source with zero fragment definitions fails with
/// [`Error::LoadValidation`].
pub fn fragments_from_source(source: &str, file_name: Option<&str>) -> Result<Vec<Fragment>> {
    let file = source_label(file_name);
    let document = parse_document(source).map_err(|e| Error::Parse {
        file: file.clone(),
        message: e.to_string(),
    })?;

    let fragments: Vec<Fragment> = document
        .definitions
        .iter()
        .filter_map(|def| match def {
            Definition::Fragment(frag) => Some(Fragment {
                name: frag.name.clone(),
                type_condition: frag.type_condition.clone(),
                source: source[frag.loc.start..frag.loc.end].to_string(),
            }),
            Definition::Operation(_) => None,
        })
        .collect();

    if fragments.is_empty() {
        return Err(Error::LoadValidation {
            file,
            message: "no fragment definitions found".into(),
        });
    }

    Ok(fragments)
}

/// Read a `.graphql` file and load its operations.
pub fn load_query_file(path: impl AsRef<Path>) -> Result<Vec<Query>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
    queries_from_source(&source, Some(&path.display().to_string()))
}

/// Read a `.graphqlfrag` file and load its fragments.
pub fn load_fragment_file(path: impl AsRef<Path>) -> Result<Vec<Fragment>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
    fragments_from_source(&source, Some(&path.display().to_string()))
}

/// Fragment names spread anywhere under an operation, in first-occurrence
/// order. Uses the iterative AST walk, so nesting depth is not a concern.
fn spread_names(op: &OperationDefinition) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for node in op.descendants() {
        if let NodeRef::FragmentSpread(spread) = node
            && seen.insert(spread.name.as_str())
        {
            names.push(spread.name.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OperationType;

    #[test]
    fn loads_single_operation_with_defaults() {
        let queries = queries_from_source("{ hero { name } }", None).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].operation_type, OperationType::Query);
        assert!(queries[0].operation_name.is_none());
        assert_eq!(queries[0].source, "{ hero { name } }");
    }

    #[test]
    fn loads_multiple_named_operations_in_source_order() {
        let src = "query A { a }\nmutation B { b }\nsubscription C { c }";
        let queries = queries_from_source(src, Some("ops.graphql")).unwrap();

        let summary: Vec<_> = queries
            .iter()
            .map(|q| (q.operation_type, q.operation_name.as_deref().unwrap()))
            .collect();
        assert_eq!(
            summary,
            [
                (OperationType::Query, "A"),
                (OperationType::Mutation, "B"),
                (OperationType::Subscription, "C"),
            ]
        );
        assert_eq!(queries[1].source, "mutation B { b }");
        assert_eq!(queries[1].file_name.as_deref(), Some("ops.graphql"));
    }

    #[test]
    fn rejects_source_without_operations() {
        let err = queries_from_source("fragment F on T { x }", Some("frag.graphql")).unwrap_err();
        assert!(matches!(err, Error::LoadValidation { ref file, .. } if file == "frag.graphql"));
    }

    #[test]
    fn rejects_unnamed_operation_among_several() {
        let err = queries_from_source("query A { a }\n{ b }", None).unwrap_err();
        assert!(matches!(err, Error::LoadValidation { .. }));
    }

    #[test]
    fn rejects_duplicate_operation_names() {
        let err = queries_from_source("query A { a }\nquery A { b }", None).unwrap_err();
        let Error::LoadValidation { message, .. } = err else {
            panic!("expected a load validation error");
        };
        assert!(message.contains("`A`"));
    }

    #[test]
    fn collects_spread_names_in_first_occurrence_order() {
        let src = "query Q { a { ...Second } ...First b { ...First } }";
        let queries = queries_from_source(src, None).unwrap();
        assert_eq!(queries[0].fragments, ["Second", "First"]);
    }

    #[test]
    fn loads_fragments_with_name_and_type_condition() {
        let src = "fragment Hero on Character { name }\nfragment Ship on Starship { id }";
        let fragments = fragments_from_source(src, None).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].name, "Hero");
        assert_eq!(fragments[0].type_condition, "Character");
        assert_eq!(fragments[0].source, "fragment Hero on Character { name }");
        assert_eq!(fragments[1].name, "Ship");
    }

    #[test]
    fn rejects_fragment_source_without_fragments() {
        let err = fragments_from_source("query Q { a }", None).unwrap_err();
        assert!(matches!(err, Error::LoadValidation { ref file, .. } if file == "<inline>"));
    }

    #[test]
    fn parse_errors_name_the_source_file() {
        let err = queries_from_source("query Q {", Some("broken.graphql")).unwrap_err();
        let Error::Parse { file, message } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(file, "broken.graphql");
        assert!(message.contains("expected"));
    }

    #[test]
    fn loads_query_and_fragment_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();

        let query_path = dir.path().join("hero.graphql");
        std::fs::write(&query_path, "query Hero { hero { ...Bits } }").unwrap();
        let queries = load_query_file(&query_path).unwrap();
        assert_eq!(queries[0].operation_name.as_deref(), Some("Hero"));
        assert_eq!(queries[0].fragments, ["Bits"]);

        let frag_path = dir.path().join("bits.graphqlfrag");
        std::fs::write(&frag_path, "fragment Bits on Character { name }").unwrap();
        let fragments = load_fragment_file(&frag_path).unwrap();
        assert_eq!(fragments[0].name, "Bits");
    }

    #[test]
    fn missing_file_reports_io_error_with_path() {
        let err = load_query_file("/nonexistent/nope.graphql").unwrap_err();
        let Error::Io(message) = err else {
            panic!("expected an I/O error");
        };
        assert!(message.contains("nope.graphql"));
    }
}
