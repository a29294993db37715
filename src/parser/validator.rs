//! Post-parse validation (§4.3): join predicate shape, subquery
//! correlation, and window-function surface-shape classification. Runs
//! after conversion, before lowering.

use std::collections::BTreeSet;

use crate::ast::{CompareOp, Expr, JoinKind, Select, Statement, TableRef};
use crate::error::MdbError;

/// Window function names the parser lets through as "degenerate" (no
/// `PARTITION BY`). Every other window usage is rejected here; the
/// degenerate survivors are in turn rejected by the Plan Builder, since no
/// pipeline lowering is specified for any window shape (see DESIGN.md).
const DEGENERATE_WINDOW_FUNCTIONS: &[&str] = &["ROW_NUMBER"];

pub fn validate(stmt: &Statement) -> Result<(), MdbError> {
    match stmt {
        Statement::Select(select) => validate_select(select, &BTreeSet::new()),
        Statement::Update(update) => {
            if update.filter.is_none() {
                return Err(MdbError::guard_violation(
                    "UPDATE without WHERE is rejected",
                ));
            }
            if let Some(filter) = &update.filter {
                validate_expr(filter, &BTreeSet::new())?;
            }
            Ok(())
        }
        Statement::Delete(delete) => {
            if delete.filter.is_none() {
                return Err(MdbError::guard_violation(
                    "DELETE without WHERE is rejected",
                ));
            }
            if let Some(filter) = &delete.filter {
                validate_expr(filter, &BTreeSet::new())?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_select(select: &Select, outer_scopes: &BTreeSet<String>) -> Result<(), MdbError> {
    if let TableRef::Derived { query, .. } = &select.from {
        validate_select(query, outer_scopes)?;
    }

    let mut known_scopes: BTreeSet<String> = BTreeSet::new();
    known_scopes.insert(select.from.alias_or_name().to_string());

    for join in &select.joins {
        if let TableRef::Derived { query, .. } = &join.right {
            validate_select(query, outer_scopes)?;
        }
        let right_scope = join.right.alias_or_name().to_string();
        validate_join_on(&join.on, &known_scopes, &right_scope, join.kind)?;
        known_scopes.insert(right_scope);
    }

    let mut own_and_outer = outer_scopes.clone();
    own_and_outer.extend(known_scopes.iter().cloned());

    if let Some(filter) = &select.filter {
        validate_expr(filter, &own_and_outer)?;
    }
    if let Some(having) = &select.having {
        validate_expr(having, &own_and_outer)?;
    }
    for item in &select.projection {
        validate_expr(&item.expr, &own_and_outer)?;
    }
    for ob in &select.order_by {
        validate_expr(&ob.expr, &own_and_outer)?;
    }
    if let Some(union) = &select.union_all {
        validate_select(union, outer_scopes)?;
    }

    Ok(())
}

/// Walks an expression looking for subqueries (correlation check) and
/// window calls (surface-shape classification). `visible_scopes` is every
/// range variable in scope at this point (own relations plus any enclosing
/// query's), used to detect a subquery referencing an outer range variable.
fn validate_expr(expr: &Expr, visible_scopes: &BTreeSet<String>) -> Result<(), MdbError> {
    match expr {
        Expr::Exists { subquery, .. } => {
            check_no_correlation(subquery, visible_scopes)?;
            validate_select(subquery, visible_scopes)
        }
        Expr::In { expr, list, .. } => {
            validate_expr(expr, visible_scopes)?;
            if let crate::ast::InList::Subquery(subquery) = list {
                check_no_correlation(subquery, visible_scopes)?;
                validate_select(subquery, visible_scopes)?;
            }
            Ok(())
        }
        Expr::Compare { lhs, rhs, .. } => {
            validate_expr(lhs, visible_scopes)?;
            validate_expr(rhs, visible_scopes)
        }
        Expr::And(l, r) | Expr::Or(l, r) => {
            validate_expr(l, visible_scopes)?;
            validate_expr(r, visible_scopes)
        }
        Expr::Not(e) | Expr::IsNull(e) => validate_expr(e, visible_scopes),
        Expr::Between { expr, low, high } => {
            validate_expr(expr, visible_scopes)?;
            validate_expr(low, visible_scopes)?;
            validate_expr(high, visible_scopes)
        }
        Expr::Like { expr, pattern } => {
            validate_expr(expr, visible_scopes)?;
            validate_expr(pattern, visible_scopes)
        }
        Expr::FuncCall { args, .. } => {
            for a in args {
                validate_expr(a, visible_scopes)?;
            }
            Ok(())
        }
        Expr::WindowCall {
            name,
            partition_by,
            args,
            ..
        } => {
            for a in args {
                validate_expr(a, visible_scopes)?;
            }
            if !partition_by.is_empty() || !DEGENERATE_WINDOW_FUNCTIONS.contains(&name.as_str()) {
                return Err(MdbError::unsupported_feature(format!(
                    "window function {name} is not supported in this surface form"
                )));
            }
            Ok(())
        }
        Expr::Column { .. } | Expr::Literal(_) | Expr::Placeholder(_) => Ok(()),
    }
}

/// A subquery is correlated if it references a column qualified by a range
/// variable that belongs to the *enclosing* query rather than its own FROM.
/// This is sound to check purely syntactically because the dialect has no
/// other way to reach an outer row.
fn check_no_correlation(
    subquery: &Select,
    outer_scopes: &BTreeSet<String>,
) -> Result<(), MdbError> {
    let mut own_scopes = BTreeSet::new();
    own_scopes.insert(subquery.from.alias_or_name().to_string());
    for join in &subquery.joins {
        own_scopes.insert(join.right.alias_or_name().to_string());
    }

    let mut referenced = BTreeSet::new();
    if let Some(filter) = &subquery.filter {
        filter.qualifiers(&mut referenced);
    }
    if let Some(having) = &subquery.having {
        having.qualifiers(&mut referenced);
    }
    for item in &subquery.projection {
        item.expr.qualifiers(&mut referenced);
    }

    for qualifier in &referenced {
        if outer_scopes.contains(qualifier) && !own_scopes.contains(qualifier) {
            return Err(MdbError::unsupported_feature(
                "correlated subqueries are not supported",
            ));
        }
    }
    Ok(())
}

/// A join predicate must reduce to a conjunction of equalities, each
/// pairing one column from a relation already in scope with one column
/// from the newly-joined relation.
fn validate_join_on(
    on: &Expr,
    known_scopes: &BTreeSet<String>,
    right_scope: &str,
    _kind: JoinKind,
) -> Result<(), MdbError> {
    let mut conjuncts = Vec::new();
    flatten_and(on, &mut conjuncts);

    if conjuncts.is_empty() {
        return Err(MdbError::unsupported_feature(
            "JOIN ON clause must be a conjunction of equalities",
        ));
    }

    for conjunct in conjuncts {
        let Expr::Compare {
            op: CompareOp::Eq,
            lhs,
            rhs,
        } = conjunct
        else {
            return Err(MdbError::unsupported_feature(
                "non-equi join predicates are not supported",
            ));
        };
        let (Expr::Column { qualifier: Some(lq), .. }, Expr::Column { qualifier: Some(rq), .. }) =
            (lhs.as_ref(), rhs.as_ref())
        else {
            return Err(MdbError::unsupported_feature(
                "join equality must compare two qualified columns",
            ));
        };

        let pair_ok = (lq == right_scope && known_scopes.contains(rq))
            || (rq == right_scope && known_scopes.contains(lq));
        if !pair_ok {
            return Err(MdbError::unsupported_feature(
                "join predicate must relate exactly two relations",
            ));
        }
    }
    Ok(())
}

fn flatten_and<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    match expr {
        Expr::And(l, r) => {
            flatten_and(l, out);
            flatten_and(r, out);
        }
        other => out.push(other),
    }
}
