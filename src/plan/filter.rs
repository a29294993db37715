//! Filter lowering (§4.4): turns a WHERE/HAVING/ON expression tree into a
//! `bson::Document` match expression. `IN (subquery)` and `EXISTS
//! (subquery)` are evaluated eagerly against the store here, which is sound
//! only because correlated subqueries were already rejected by the
//! validator.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use bson::{doc, Bson, Document};

use crate::ast::{CompareOp, Expr, InList};
use crate::binder::Bindings;
use crate::error::MdbError;
use crate::store::StoreClient;

/// Maps a `(qualifier, column)` reference to the document field path it
/// denotes once joins have nested right-hand relations under their alias.
/// Unqualified columns and columns qualified by the base table resolve to
/// a bare field name; columns qualified by a joined alias resolve to
/// `<alias>.<column>` (invariant 4: qualifiers are only meaningful once a
/// join is present).
#[derive(Debug, Clone)]
pub struct FieldResolver {
    base_alias: String,
    joined_aliases: BTreeSet<String>,
}

impl FieldResolver {
    pub fn single(base_alias: impl Into<String>) -> Self {
        FieldResolver {
            base_alias: base_alias.into(),
            joined_aliases: BTreeSet::new(),
        }
    }

    pub fn with_joins(base_alias: impl Into<String>, joined_aliases: BTreeSet<String>) -> Self {
        FieldResolver {
            base_alias: base_alias.into(),
            joined_aliases,
        }
    }

    pub fn path(&self, qualifier: Option<&str>, name: &str) -> Vec<String> {
        match qualifier {
            Some(q) if self.joined_aliases.contains(q) => vec![q.to_string(), name.to_string()],
            _ => vec![name.to_string()],
        }
    }

    pub fn field_name(&self, qualifier: Option<&str>, name: &str) -> String {
        self.path(qualifier, name).join(".")
    }
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, MdbError>> + Send + 'a>>;

/// Lowers a boolean expression tree to a MongoDB match document.
pub fn lower_filter<'a>(
    expr: &'a Expr,
    bindings: &'a Bindings,
    resolver: &'a FieldResolver,
    store: &'a StoreClient,
) -> BoxFut<'a, Document> {
    Box::pin(async move {
        match expr {
            Expr::And(l, r) => {
                let ld = lower_filter(l, bindings, resolver, store).await?;
                let rd = lower_filter(r, bindings, resolver, store).await?;
                Ok(doc! { "$and": [ld, rd] })
            }
            Expr::Or(l, r) => {
                let ld = lower_filter(l, bindings, resolver, store).await?;
                let rd = lower_filter(r, bindings, resolver, store).await?;
                Ok(doc! { "$or": [ld, rd] })
            }
            Expr::Not(inner) => {
                let d = lower_filter(inner, bindings, resolver, store).await?;
                Ok(doc! { "$nor": [d] })
            }
            Expr::Compare { op, lhs, rhs } => lower_compare(*op, lhs, rhs, bindings, resolver),
            Expr::In {
                expr,
                list,
                negated,
            } => lower_in(expr, list, *negated, bindings, resolver, store).await,
            Expr::Between { expr, low, high } => {
                let field = field_name_of(expr, resolver)?;
                let lo = lower_scalar(low, bindings)?;
                let hi = lower_scalar(high, bindings)?;
                Ok(doc! { field: { "$gte": lo, "$lte": hi } })
            }
            Expr::Like { expr, pattern } => {
                let field = field_name_of(expr, resolver)?;
                let pattern_value = lower_scalar(pattern, bindings)?;
                let pattern_str = match pattern_value {
                    Bson::String(s) => s,
                    other => {
                        return Err(MdbError::unsupported_statement(format!(
                            "LIKE pattern must be a string literal, got {other:?}"
                        )))
                    }
                };
                let regex = like_pattern_to_regex(&pattern_str);
                Ok(doc! { field: { "$regex": regex } })
            }
            Expr::IsNull(inner) => {
                let field = field_name_of(inner, resolver)?;
                // Missing field and explicit null compare equal (documented
                // behaviour); `$eq: null` already matches both in MongoDB.
                Ok(doc! { field: { "$eq": Bson::Null } })
            }
            Expr::Exists { subquery, negated } => {
                let rows = super::build::eval_subquery_rows(subquery, bindings, store).await?;
                let non_empty = !rows.is_empty();
                let satisfied = non_empty != *negated;
                Ok(tautology_or_contradiction(satisfied))
            }
            Expr::Column { .. } | Expr::Literal(_) | Expr::Placeholder(_) | Expr::FuncCall { .. }
            | Expr::WindowCall { .. } => Err(MdbError::unsupported_statement(
                "expression is not a boolean predicate",
            )),
        }
    })
}

fn tautology_or_contradiction(satisfied: bool) -> Document {
    if satisfied {
        doc! {}
    } else {
        doc! { "$expr": false }
    }
}

async fn lower_in<'a>(
    expr: &'a Expr,
    list: &'a InList,
    negated: bool,
    bindings: &'a Bindings,
    resolver: &'a FieldResolver,
    store: &'a StoreClient,
) -> Result<Document, MdbError> {
    let field = field_name_of(expr, resolver)?;
    let values: Vec<Bson> = match list {
        InList::Values(exprs) => exprs
            .iter()
            .map(|e| lower_scalar(e, bindings))
            .collect::<Result<_, _>>()?,
        InList::Subquery(subquery) => {
            let rows = super::build::eval_subquery_rows(subquery, bindings, store).await?;
            rows.into_iter()
                .filter_map(|row| row.into_iter().next().map(|(_, v)| v))
                .collect()
        }
    };
    let op = if negated { "$nin" } else { "$in" };
    Ok(doc! { field: { op: values } })
}

fn lower_compare(
    op: CompareOp,
    lhs: &Expr,
    rhs: &Expr,
    bindings: &Bindings,
    resolver: &FieldResolver,
) -> Result<Document, MdbError> {
    let (field, value) = match (lhs, rhs) {
        (Expr::Column { qualifier, name }, other) => (
            resolver.field_name(qualifier.as_deref(), name),
            lower_scalar(other, bindings)?,
        ),
        (other, Expr::Column { qualifier, name }) => (
            resolver.field_name(qualifier.as_deref(), name),
            lower_scalar(other, bindings)?,
        ),
        _ => {
            return Err(MdbError::unsupported_feature(
                "comparisons must reference exactly one column",
            ))
        }
    };
    let mongo_op = match op {
        CompareOp::Eq => "$eq",
        CompareOp::NotEq => "$ne",
        CompareOp::Lt => "$lt",
        CompareOp::LtEq => "$lte",
        CompareOp::Gt => "$gt",
        CompareOp::GtEq => "$gte",
    };
    Ok(doc! { field: { mongo_op: value } })
}

pub(crate) fn field_name_of(expr: &Expr, resolver: &FieldResolver) -> Result<String, MdbError> {
    match expr {
        Expr::Column { qualifier, name } => Ok(resolver.field_name(qualifier.as_deref(), name)),
        _ => Err(MdbError::unsupported_statement(
            "expected a column reference",
        )),
    }
}

/// Resolves literals and bound placeholders to their BSON value. Column
/// references are not valid here; this is used only for the "value" side
/// of a comparison/list/range.
pub fn lower_scalar(expr: &Expr, bindings: &Bindings) -> Result<Bson, MdbError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone().into()),
        Expr::Placeholder(id) => {
            let token = match id {
                crate::ast::PlaceholderId::Positional(t) => t.clone(),
                crate::ast::PlaceholderId::Named(n) => format!(":{n}"),
            };
            bindings
                .resolve(&token)
                .cloned()
                .map(Bson::from)
                .ok_or_else(|| MdbError::param_mismatch(format!("unbound placeholder {token}")))
        }
        _ => Err(MdbError::unsupported_statement(
            "expected a literal or bound parameter",
        )),
    }
}

/// `%` -> `.*`, `_` -> `.`, everything else regex-escaped, anchored on both
/// ends.
pub fn like_pattern_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_translates_wildcards_and_escapes_metacharacters() {
        assert_eq!(like_pattern_to_regex("%A%"), "^.*A.*$");
        assert_eq!(like_pattern_to_regex("a_c"), "^a.c$");
        assert_eq!(like_pattern_to_regex("50%"), "^50.*$");
        assert_eq!(like_pattern_to_regex("a.b"), "^a\\.b$");
    }

    #[test]
    fn field_resolver_ignores_qualifier_without_joins() {
        let resolver = FieldResolver::single("u");
        assert_eq!(resolver.field_name(Some("u"), "id"), "id");
        assert_eq!(resolver.field_name(None, "id"), "id");
    }

    #[test]
    fn field_resolver_nests_joined_aliases() {
        let mut joined = BTreeSet::new();
        joined.insert("o".to_string());
        let resolver = FieldResolver::with_joins("u", joined);
        assert_eq!(resolver.field_name(Some("u"), "id"), "id");
        assert_eq!(resolver.field_name(Some("o"), "total"), "o.total");
    }
}
