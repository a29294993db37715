//! Plan Builder entry point (§4.4): dispatches a validated [`Statement`] to
//! the per-kind lowering module. `EXISTS`/`IN (subquery)` are evaluated
//! here too, via [`eval_subquery_rows`], since the filter lowerer and the
//! nested-query builder both need to run a query against the store before
//! the outer plan exists.

use bson::{Bson, Document};

use crate::ast::{Select, Statement};
use crate::binder::Bindings;
use crate::error::MdbError;
use crate::store::StoreClient;

use super::{ddl, dml, select, AggregatePlan, FindPlan, Plan, ProjectionField, ProjectionSource};

pub async fn build_plan(
    stmt: &Statement,
    bindings: &Bindings,
    store: &StoreClient,
) -> Result<Plan, MdbError> {
    match stmt {
        Statement::Select(query) => {
            if query.uses_window {
                // The validator accepts `ROW_NUMBER()` with no `PARTITION BY`
                // as a degenerate surface form; no stage sequence below
                // lowers a window call, so every window usage is rejected
                // here regardless of shape.
                return Err(MdbError::unsupported_feature(
                    "window functions have no pipeline lowering",
                ));
            }
            select::build_select_plan(query, bindings, store).await
        }
        Statement::Insert(insert) => dml::build_insert_plan(insert, bindings),
        Statement::Update(update) => dml::build_update_plan(update, bindings, store).await,
        Statement::Delete(delete) => dml::build_delete_plan(delete, bindings, store).await,
        Statement::CreateTable(create) => Ok(Plan::Ddl(ddl::build_create_table_plan(create))),
        Statement::DropTable(drop) => Ok(Plan::Ddl(ddl::build_drop_table_plan(drop))),
        Statement::CreateIndex(create) => Ok(Plan::Ddl(ddl::build_create_index_plan(create))),
        Statement::DropIndex(drop) => Ok(Plan::Ddl(ddl::build_drop_index_plan(drop))),
        Statement::Begin | Statement::Commit | Statement::Rollback => Ok(Plan::NoOp),
    }
}

/// Runs a nested `Select` (subquery of `EXISTS`/`IN`) to completion and
/// returns its rows as `(column name, value)` pairs in projection order.
/// Sound only because the validator already rejected any subquery that
/// would need a correlated outer row.
pub(crate) async fn eval_subquery_rows(
    select: &Select,
    bindings: &Bindings,
    store: &StoreClient,
) -> Result<Vec<Vec<(String, Bson)>>, MdbError> {
    let plan = select::build_select_plan(select, bindings, store).await?;
    execute_rows(&plan, store).await
}

/// Executes a query [`Plan`] and shapes the returned documents into row
/// tuples, in projection order. Shared by subquery evaluation here and by
/// [`crate::executor`], so a `SELECT` used as a top-level statement and one
/// nested inside `EXISTS`/`IN` shape rows identically.
pub(crate) async fn execute_rows(
    plan: &Plan,
    store: &StoreClient,
) -> Result<Vec<Vec<(String, Bson)>>, MdbError> {
    match plan {
        Plan::Find(FindPlan {
            collection,
            filter,
            projection,
            sort,
            limit,
            offset,
            ..
        }) => {
            let docs = store
                .find(
                    collection,
                    filter.clone(),
                    None,
                    sort.clone(),
                    offset.map(|o| o.max(0) as u64),
                    *limit,
                )
                .await?;
            Ok(shape_rows(&docs, projection))
        }
        Plan::Aggregate(AggregatePlan {
            collection,
            stages,
            projection,
            ..
        }) => {
            let docs = store.aggregate(collection, stages.clone()).await?;
            Ok(shape_rows(&docs, projection))
        }
        _ => Err(MdbError::unsupported_statement(
            "expected a query plan in this position",
        )),
    }
}

fn shape_rows(docs: &[Document], projection: &[ProjectionField]) -> Vec<Vec<(String, Bson)>> {
    let is_star = projection
        .iter()
        .any(|field| matches!(field.source, ProjectionSource::Star));

    docs.iter()
        .map(|doc| {
            if is_star {
                super::project::expand_star(doc)
                    .into_iter()
                    .map(|field| {
                        let value = match &field.source {
                            ProjectionSource::Path(path) => super::project::extract_path(doc, path),
                            ProjectionSource::Star => Bson::Null,
                            ProjectionSource::Literal(v) => v.clone(),
                        };
                        (field.name, value)
                    })
                    .collect()
            } else {
                projection
                    .iter()
                    .map(|field| {
                        let value = match &field.source {
                            ProjectionSource::Path(path) => super::project::extract_path(doc, path),
                            ProjectionSource::Star => Bson::Null,
                            ProjectionSource::Literal(v) => v.clone(),
                        };
                        (field.name.clone(), value)
                    })
                    .collect()
            }
        })
        .collect()
}
