//! Projection & column list (§4.4): the ordered list the executor walks to
//! turn a result document into a row tuple, and that fixes `description`'s
//! column order.

use bson::{Bson, Document};

#[derive(Debug, Clone)]
pub enum ProjectionSource {
    /// A dotted field path, e.g. `["total"]` or `["orders", "total"]` once a
    /// `$lookup` has nested a joined relation under its alias.
    Path(Vec<String>),
    /// `SELECT *` (or `t.*`): every top-level field of the document, in
    /// insertion order.
    Star,
    /// A literal projected as-is, e.g. the `1` in `SELECT 1 FROM users WHERE
    /// ...` (the common `EXISTS`/`IN` subquery idiom — the literal itself
    /// never needs to come from the document).
    Literal(Bson),
}

#[derive(Debug, Clone)]
pub struct ProjectionField {
    pub name: String,
    pub source: ProjectionSource,
}

impl ProjectionField {
    pub fn column(name: impl Into<String>, path: Vec<String>) -> Self {
        ProjectionField {
            name: name.into(),
            source: ProjectionSource::Path(path),
        }
    }

    pub fn star() -> Self {
        ProjectionField {
            name: "*".to_string(),
            source: ProjectionSource::Star,
        }
    }

    pub fn literal(name: impl Into<String>, value: Bson) -> Self {
        ProjectionField {
            name: name.into(),
            source: ProjectionSource::Literal(value),
        }
    }
}

/// Walks a dotted path into `doc`, returning `Bson::Null` for any missing
/// intermediate or leaf field (missing == null, per the documented `IS
/// NULL` semantics and the LEFT JOIN "no match" case).
pub fn extract_path(doc: &Document, path: &[String]) -> Bson {
    let mut current = Bson::Document(doc.clone());
    for segment in path {
        current = match current {
            Bson::Document(d) => d.get(segment).cloned().unwrap_or(Bson::Null),
            Bson::Array(mut arr) if !arr.is_empty() => {
                // `$unwind` already collapses lookup arrays to a single
                // element by the time projection runs; this guards the
                // rare case a field path still points at an array.
                arr.remove(0)
            }
            _ => Bson::Null,
        };
    }
    current
}

/// Expands `SELECT *` into one field per top-level key of `sample`, in the
/// order the document presents them. Used when the column list can only be
/// known after the first row is seen (no catalog to consult).
pub fn expand_star(sample: &Document) -> Vec<ProjectionField> {
    sample
        .keys()
        .filter(|k| k.as_str() != "_id")
        .map(|k| ProjectionField::column(k.clone(), vec![k.clone()]))
        .collect()
}
