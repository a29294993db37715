//! SELECT lowering (§4.4). A query with no joins, no `GROUP BY`/aggregates,
//! no derived FROM and no `UNION ALL` lowers to a [`FindPlan`]; everything
//! else lowers to an [`AggregatePlan`] pipeline (`$lookup`+`$unwind` per
//! join, `$group`/`$match` for `GROUP BY`/`HAVING`, `$unionWith` for `UNION
//! ALL`).

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use bson::{doc, Bson, Document};

use crate::ast::{CompareOp, Expr, JoinKind, OrderByItem, Select, SelectItem, TableRef};
use crate::binder::Bindings;
use crate::error::MdbError;
use crate::store::StoreClient;

use super::filter::{field_name_of, lower_filter, FieldResolver};
use super::{AggregatePlan, FindPlan, Plan, ProjectionField, ProjectionSource};

const AGGREGATE_FUNCTIONS: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, MdbError>> + Send + 'a>>;

pub fn build_select_plan<'a>(
    select: &'a Select,
    bindings: &'a Bindings,
    store: &'a StoreClient,
) -> BoxFut<'a, Plan> {
    Box::pin(async move {
        if needs_pipeline(select) {
            build_aggregate_plan(select, bindings, store).await
        } else {
            build_find_plan(select, bindings, store).await
        }
    })
}

fn needs_pipeline(select: &Select) -> bool {
    matches!(select.from, TableRef::Derived { .. })
        || !select.joins.is_empty()
        || !select.group_by.is_empty()
        || select.having.is_some()
        || select.union_all.is_some()
        || projection_has_aggregate(&select.projection)
}

fn projection_has_aggregate(items: &[SelectItem]) -> bool {
    items.iter().any(|item| match &item.expr {
        Expr::FuncCall { name, .. } => AGGREGATE_FUNCTIONS.contains(&name.as_str()),
        _ => false,
    })
}

async fn build_find_plan(
    select: &Select,
    bindings: &Bindings,
    store: &StoreClient,
) -> Result<Plan, MdbError> {
    let TableRef::Named { name, alias } = &select.from else {
        return Err(MdbError::unsupported_statement(
            "derived tables require a join, GROUP BY or aggregate to route through the pipeline builder",
        ));
    };
    let resolver = FieldResolver::single(alias.clone().unwrap_or_else(|| name.clone()));

    let filter = match &select.filter {
        Some(expr) => lower_filter(expr, bindings, &resolver, store).await?,
        None => doc! {},
    };

    let projection = build_projection(&select.projection, &resolver)?;
    let sort = build_sort(&select.order_by, &resolver)?;

    Ok(Plan::Find(FindPlan {
        collection: name.clone(),
        filter,
        projection,
        sort,
        limit: select.limit,
        offset: select.offset,
        distinct: select.distinct,
    }))
}

fn build_aggregate_plan<'a>(
    select: &'a Select,
    bindings: &'a Bindings,
    store: &'a StoreClient,
) -> BoxFut<'a, Plan> {
    Box::pin(async move {
        let (collection, mut stages) = lower_from(&select.from, bindings, store).await?;

        let base_alias = select.from.alias_or_name().to_string();
        let mut joined_aliases: BTreeSet<String> = BTreeSet::new();

        for join in &select.joins {
            let right_alias = join.right.alias_or_name().to_string();
            let (right_collection, right_prefix) = lower_from(&join.right, bindings, store).await?;
            if !right_prefix.is_empty() {
                return Err(MdbError::unsupported_feature(
                    "derived tables are only supported as the leading FROM relation",
                ));
            }
            let left_resolver = FieldResolver::with_joins(base_alias.clone(), joined_aliases.clone());
            stages.push(build_lookup_stage(
                &join.on,
                &left_resolver,
                &right_alias,
                &right_collection,
            )?);
            stages.push(doc! {
                "$unwind": {
                    "path": format!("${right_alias}"),
                    "preserveNullAndEmptyArrays": join.kind == JoinKind::Left,
                }
            });
            joined_aliases.insert(right_alias);
        }

        let resolver = FieldResolver::with_joins(base_alias.clone(), joined_aliases);

        if let Some(filter) = &select.filter {
            let match_doc = lower_filter(filter, bindings, &resolver, store).await?;
            stages.push(doc! { "$match": match_doc });
        }

        let is_grouped = !select.group_by.is_empty() || projection_has_aggregate(&select.projection);
        let projection = if is_grouped {
            let (group_stage, projection) = build_group_stage(select, &resolver)?;
            stages.push(group_stage);
            if let Some(having) = &select.having {
                let having_doc = lower_filter(having, bindings, &resolver, store).await?;
                stages.push(doc! { "$match": having_doc });
            }
            projection
        } else {
            build_projection(&select.projection, &resolver)?
        };

        let sort = if is_grouped {
            build_group_sort(&select.order_by, &select.group_by)?
        } else {
            build_sort(&select.order_by, &resolver)?
        };
        if let Some(sort) = sort {
            stages.push(doc! { "$sort": sort });
        }
        if let Some(offset) = select.offset {
            stages.push(doc! { "$skip": offset });
        }
        if let Some(limit) = select.limit {
            stages.push(doc! { "$limit": limit });
        }

        if let Some(union) = &select.union_all {
            let (union_collection, union_stages) = select_pipeline(union, bindings, store).await?;
            stages.push(doc! {
                "$unionWith": {
                    "coll": union_collection,
                    "pipeline": union_stages,
                }
            });
        }

        Ok(Plan::Aggregate(AggregatePlan {
            collection,
            stages,
            projection,
            distinct: select.distinct,
        }))
    })
}

/// Builds the full pipeline (including the terminal `$project`) for a
/// `Select` used as a nested relation: a derived table in `FROM`, or the
/// right-hand side of `UNION ALL`. Unlike the top-level plan, nested
/// pipelines must rename fields to their final column names themselves,
/// since nothing downstream in the store has a [`ProjectionField`] list to
/// consult.
fn select_pipeline<'a>(
    select: &'a Select,
    bindings: &'a Bindings,
    store: &'a StoreClient,
) -> BoxFut<'a, (String, Vec<Document>)> {
    Box::pin(async move {
        match build_select_plan(select, bindings, store).await? {
            Plan::Find(FindPlan {
                collection,
                filter,
                projection,
                sort,
                limit,
                offset,
                ..
            }) => {
                let mut stages = Vec::new();
                if !filter.is_empty() {
                    stages.push(doc! { "$match": filter });
                }
                if let Some(sort) = sort {
                    stages.push(doc! { "$sort": sort });
                }
                if let Some(offset) = offset {
                    stages.push(doc! { "$skip": offset });
                }
                if let Some(limit) = limit {
                    stages.push(doc! { "$limit": limit });
                }
                if let Some(project) = project_stage_opt(&projection) {
                    stages.push(project);
                }
                Ok((collection, stages))
            }
            Plan::Aggregate(AggregatePlan {
                collection,
                mut stages,
                projection,
                ..
            }) => {
                if let Some(project) = project_stage_opt(&projection) {
                    stages.push(project);
                }
                Ok((collection, stages))
            }
            _ => Err(MdbError::unsupported_statement(
                "expected a query in this position",
            )),
        }
    })
}

fn lower_from<'a>(
    table: &'a TableRef,
    bindings: &'a Bindings,
    store: &'a StoreClient,
) -> BoxFut<'a, (String, Vec<Document>)> {
    match table {
        TableRef::Named { name, .. } => {
            let name = name.clone();
            Box::pin(async move { Ok((name, Vec::new())) })
        }
        TableRef::Derived { query, .. } => select_pipeline(query, bindings, store),
    }
}

fn project_stage_opt(fields: &[ProjectionField]) -> Option<Document> {
    if fields.iter().any(|f| matches!(f.source, ProjectionSource::Star)) {
        return None;
    }
    let mut proj = Document::new();
    for field in fields {
        match &field.source {
            ProjectionSource::Path(path) => {
                proj.insert(field.name.clone(), format!("${}", path.join(".")));
            }
            ProjectionSource::Literal(value) => {
                // A bare scalar in `$project` is read as an inclusion/exclusion
                // flag, not a value; `$literal` is required to project it as-is.
                proj.insert(field.name.clone(), doc! { "$literal": value.clone() });
            }
            ProjectionSource::Star => {}
        }
    }
    proj.insert("_id", 0);
    Some(doc! { "$project": proj })
}

fn build_projection(
    items: &[SelectItem],
    resolver: &FieldResolver,
) -> Result<Vec<ProjectionField>, MdbError> {
    if items.len() == 1 {
        if let Expr::Column { name, .. } = &items[0].expr {
            if name == "*" {
                return Ok(vec![ProjectionField::star()]);
            }
        }
    }
    items
        .iter()
        .map(|item| match &item.expr {
            Expr::Column { name, .. } if name == "*" => Err(MdbError::unsupported_feature(
                "`*` cannot be combined with other projected columns",
            )),
            Expr::Column { qualifier, name } => {
                let path = resolver.path(qualifier.as_deref(), name);
                let field_name = item.alias.clone().unwrap_or_else(|| name.clone());
                Ok(ProjectionField::column(field_name, path))
            }
            Expr::Literal(value) => {
                let field_name = item.alias.clone().unwrap_or_else(|| "?column?".to_string());
                Ok(ProjectionField::literal(field_name, value.clone().into()))
            }
            _ => Err(MdbError::unsupported_feature(
                "only column references and literals are supported in this projection position",
            )),
        })
        .collect()
}

fn build_sort(
    order_by: &[OrderByItem],
    resolver: &FieldResolver,
) -> Result<Option<Document>, MdbError> {
    if order_by.is_empty() {
        return Ok(None);
    }
    let mut sort = Document::new();
    for item in order_by {
        let field = field_name_of(&item.expr, resolver)?;
        sort.insert(field, if item.ascending { 1 } else { -1 });
    }
    Ok(Some(sort))
}

/// `ORDER BY` after a `$group` stage sorts the group's own output document,
/// not the pre-group documents the join `FieldResolver` paths describe.
/// Grouping columns live at `_id.<name>` there (see [`build_group_stage`]);
/// aggregate aliases (`SUM(score) AS total`) are already top-level.
fn build_group_sort(
    order_by: &[OrderByItem],
    group_by: &[Expr],
) -> Result<Option<Document>, MdbError> {
    if order_by.is_empty() {
        return Ok(None);
    }
    let group_columns: BTreeSet<&str> = group_by
        .iter()
        .filter_map(|expr| match expr {
            Expr::Column { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();

    let mut sort = Document::new();
    for item in order_by {
        let Expr::Column { name, .. } = &item.expr else {
            return Err(MdbError::unsupported_feature(
                "ORDER BY after GROUP BY supports column references only",
            ));
        };
        let field = if group_columns.contains(name.as_str()) {
            format!("_id.{name}")
        } else {
            name.clone()
        };
        sort.insert(field, if item.ascending { 1 } else { -1 });
    }
    Ok(Some(sort))
}

fn build_group_stage(
    select: &Select,
    resolver: &FieldResolver,
) -> Result<(Document, Vec<ProjectionField>), MdbError> {
    let mut id_doc = Document::new();
    let mut projection = Vec::new();

    for expr in &select.group_by {
        let Expr::Column { qualifier, name } = expr else {
            return Err(MdbError::unsupported_feature(
                "GROUP BY supports column references only",
            ));
        };
        let path = resolver.path(qualifier.as_deref(), name);
        id_doc.insert(name.clone(), format!("${}", path.join(".")));
        projection.push(ProjectionField::column(
            name.clone(),
            vec!["_id".to_string(), name.clone()],
        ));
    }

    let mut group_stage = doc! {
        "_id": if id_doc.is_empty() { Bson::Null } else { Bson::Document(id_doc) }
    };

    for item in &select.projection {
        if let Expr::FuncCall { name: fname, args } = &item.expr {
            if AGGREGATE_FUNCTIONS.contains(&fname.as_str()) {
                let out_name = item
                    .alias
                    .clone()
                    .unwrap_or_else(|| fname.to_lowercase());
                let accumulator = build_accumulator(fname, args, resolver)?;
                group_stage.insert(out_name.clone(), accumulator);
                projection.push(ProjectionField::column(
                    out_name.clone(),
                    vec![out_name],
                ));
            }
        }
    }

    Ok((doc! { "$group": group_stage }, projection))
}

fn build_accumulator(fname: &str, args: &[Expr], resolver: &FieldResolver) -> Result<Bson, MdbError> {
    if fname == "COUNT" {
        return match args.first() {
            Some(Expr::Column { name, .. }) if name == "*" => Ok(doc! { "$sum": 1 }.into()),
            Some(Expr::Column { qualifier, name }) => {
                let field = format!("${}", resolver.path(qualifier.as_deref(), name).join("."));
                Ok(doc! {
                    "$sum": { "$cond": [ { "$eq": [field, Bson::Null] }, 0, 1 ] }
                }
                .into())
            }
            _ => Err(MdbError::unsupported_feature("unsupported COUNT argument")),
        };
    }

    let mongo_fn = match fname {
        "SUM" => "$sum",
        "AVG" => "$avg",
        "MIN" => "$min",
        "MAX" => "$max",
        other => {
            return Err(MdbError::unsupported_feature(format!(
                "aggregate function {other} is not supported"
            )))
        }
    };
    let field = match args.first() {
        Some(Expr::Column { qualifier, name }) => {
            format!("${}", resolver.path(qualifier.as_deref(), name).join("."))
        }
        _ => {
            return Err(MdbError::unsupported_feature(format!(
                "{fname} requires a column argument"
            )))
        }
    };
    Ok(doc! { mongo_fn: field }.into())
}

/// Builds a `$lookup` stage as a sub-pipeline keyed by `$expr` equalities
/// rather than `localField`/`foreignField`, so that a join predicate with
/// more than one equality conjunct (already validated as a pure
/// equi-join) still lowers to a single stage.
fn build_lookup_stage(
    on: &Expr,
    left_resolver: &FieldResolver,
    right_alias: &str,
    right_collection: &str,
) -> Result<Document, MdbError> {
    let mut conjuncts = Vec::new();
    flatten_and(on, &mut conjuncts);

    let mut let_vars = Document::new();
    let mut conditions: Vec<Bson> = Vec::new();
    for (i, conjunct) in conjuncts.iter().enumerate() {
        let Expr::Compare {
            op: CompareOp::Eq,
            lhs,
            rhs,
        } = conjunct
        else {
            return Err(MdbError::unsupported_feature(
                "join predicate must be an equality",
            ));
        };
        let (left_col, right_col) = classify_join_columns(lhs, rhs, right_alias)?;
        let var_name = format!("v{i}");
        let left_path = left_resolver
            .path(left_col.0.as_deref(), &left_col.1)
            .join(".");
        let_vars.insert(var_name.clone(), format!("${left_path}"));
        conditions.push(
            doc! { "$eq": [format!("$${var_name}"), format!("${}", right_col.1)] }.into(),
        );
    }

    let match_expr = if conditions.len() == 1 {
        conditions.into_iter().next().unwrap()
    } else {
        Bson::Document(doc! { "$and": conditions })
    };

    Ok(doc! {
        "$lookup": {
            "from": right_collection,
            "let": let_vars,
            "pipeline": [ { "$match": { "$expr": match_expr } } ],
            "as": right_alias,
        }
    })
}

#[allow(clippy::type_complexity)]
fn classify_join_columns(
    lhs: &Expr,
    rhs: &Expr,
    right_alias: &str,
) -> Result<((Option<String>, String), (Option<String>, String)), MdbError> {
    let (
        Expr::Column {
            qualifier: lq,
            name: ln,
        },
        Expr::Column {
            qualifier: rq,
            name: rn,
        },
    ) = (lhs, rhs)
    else {
        return Err(MdbError::unsupported_feature(
            "join equality must compare two columns",
        ));
    };
    if rq.as_deref() == Some(right_alias) {
        Ok(((lq.clone(), ln.clone()), (rq.clone(), rn.clone())))
    } else if lq.as_deref() == Some(right_alias) {
        Ok(((rq.clone(), rn.clone()), (lq.clone(), ln.clone())))
    } else {
        Err(MdbError::unsupported_feature(
            "join predicate must reference the newly joined relation",
        ))
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_stage_skips_for_star() {
        assert!(project_stage_opt(&[ProjectionField::star()]).is_none());
    }

    #[test]
    fn project_stage_renames_paths() {
        let fields = vec![ProjectionField::column("total", vec!["o".into(), "total".into()])];
        let stage = project_stage_opt(&fields).unwrap();
        let inner = stage.get_document("$project").unwrap();
        assert_eq!(inner.get_str("total").unwrap(), "$o.total");
    }

    #[test]
    fn build_projection_accepts_bare_literal() {
        // `SELECT 1 FROM ...` is the common `EXISTS`/`IN` subquery idiom;
        // the projected value never needs to come from the document itself.
        let items = vec![SelectItem {
            expr: Expr::Literal(crate::value::Value::Int(1)),
            alias: None,
        }];
        let resolver = FieldResolver::single("users");
        let fields = build_projection(&items, &resolver).unwrap();
        assert_eq!(fields.len(), 1);
        assert!(matches!(fields[0].source, ProjectionSource::Literal(Bson::Int64(1))));
    }

    #[test]
    fn project_stage_wraps_literal_in_dollar_literal() {
        let fields = vec![ProjectionField::literal("one", Bson::Int64(1))];
        let stage = project_stage_opt(&fields).unwrap();
        let inner = stage.get_document("$project").unwrap();
        let literal_doc = inner.get_document("one").unwrap();
        assert_eq!(literal_doc.get_i64("$literal").unwrap(), 1);
    }
}
