//! INSERT/UPDATE/DELETE lowering (§4.4). The safety guard (no `WHERE` on
//! `UPDATE`/`DELETE`) has already been enforced by [`crate::parser::validator`];
//! by the time these functions run, `filter` is always present.

use bson::Document;

use crate::ast::{Delete, Insert, Update};
use crate::binder::Bindings;
use crate::error::MdbError;
use crate::store::StoreClient;

use super::filter::{lower_filter, lower_scalar, FieldResolver};
use super::{DeletePlan, InsertPlan, Plan, UpdatePlan};

pub fn build_insert_plan(insert: &Insert, bindings: &Bindings) -> Result<Plan, MdbError> {
    let mut documents = Vec::with_capacity(insert.rows.len());
    for row in &insert.rows {
        if row.len() != insert.columns.len() {
            return Err(MdbError::unsupported_statement(
                "INSERT column list and VALUES row must be the same length",
            ));
        }
        let mut doc = Document::new();
        for (column, expr) in insert.columns.iter().zip(row.iter()) {
            doc.insert(column.clone(), lower_scalar(expr, bindings)?);
        }
        documents.push(doc);
    }
    Ok(Plan::Insert(InsertPlan {
        collection: insert.table.clone(),
        documents,
    }))
}

pub async fn build_update_plan(
    update: &Update,
    bindings: &Bindings,
    store: &StoreClient,
) -> Result<Plan, MdbError> {
    let resolver = FieldResolver::single(update.table.clone());
    let filter_expr = update
        .filter
        .as_ref()
        .expect("UPDATE without WHERE is rejected before lowering");
    let filter = lower_filter(filter_expr, bindings, &resolver, store).await?;

    let mut set_doc = Document::new();
    for (column, expr) in &update.assignments {
        set_doc.insert(column.clone(), lower_scalar(expr, bindings)?);
    }

    Ok(Plan::Update(UpdatePlan {
        collection: update.table.clone(),
        filter,
        set_doc,
    }))
}

pub async fn build_delete_plan(
    delete: &Delete,
    bindings: &Bindings,
    store: &StoreClient,
) -> Result<Plan, MdbError> {
    let resolver = FieldResolver::single(delete.table.clone());
    let filter_expr = delete
        .filter
        .as_ref()
        .expect("DELETE without WHERE is rejected before lowering");
    let filter = lower_filter(filter_expr, bindings, &resolver, store).await?;

    Ok(Plan::Delete(DeletePlan {
        collection: delete.table.clone(),
        filter,
    }))
}
