//! Plan Executor (§4.5): drives the store for a built [`Plan`] and shapes
//! the outcome into the row/`rowcount`/`description` triple a façade hands
//! back to its caller.

use bson::Bson;

use crate::error::MdbError;
use crate::plan::{self, DdlPlan, Plan};
use crate::store::StoreClient;
use crate::value::{bson_to_value, Value};

/// A `(column_name, type_code, display_size, internal_size, precision,
/// scale, null_ok)` tuple, per the standard relational client protocol.
/// Only `name` and `type_code` are ever populated.
pub type ColumnDescription = (String, String, Option<i64>, Option<i64>, Option<i64>, Option<i64>, Option<bool>);

#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub rows: Vec<Vec<Value>>,
    pub rowcount: i64,
    pub description: Vec<ColumnDescription>,
}

pub async fn execute(plan: &Plan, store: &StoreClient) -> Result<ExecutionResult, MdbError> {
    match plan {
        Plan::Find(_) | Plan::Aggregate(_) => execute_query(plan, store).await,
        Plan::Insert(insert) => {
            let count = store
                .insert_many(&insert.collection, insert.documents.clone())
                .await?;
            Ok(ExecutionResult {
                rows: Vec::new(),
                rowcount: count as i64,
                description: Vec::new(),
            })
        }
        Plan::Update(update) => {
            let count = store
                .update_many(&update.collection, update.filter.clone(), update.set_doc.clone())
                .await?;
            Ok(ExecutionResult {
                rows: Vec::new(),
                rowcount: count as i64,
                description: Vec::new(),
            })
        }
        Plan::Delete(delete) => {
            let count = store.delete_many(&delete.collection, delete.filter.clone()).await?;
            Ok(ExecutionResult {
                rows: Vec::new(),
                rowcount: count as i64,
                description: Vec::new(),
            })
        }
        Plan::Ddl(ddl) => {
            execute_ddl(ddl, store).await?;
            Ok(ExecutionResult {
                rows: Vec::new(),
                rowcount: -1,
                description: Vec::new(),
            })
        }
        Plan::NoOp => Ok(ExecutionResult::default()),
    }
}

async fn execute_query(plan: &Plan, store: &StoreClient) -> Result<ExecutionResult, MdbError> {
    let rows = plan::execute_rows(plan, store).await?;
    let description = rows
        .first()
        .map(|row| {
            row.iter()
                .map(|(name, value)| (name.clone(), type_code(value), None, None, None, None, None))
                .collect()
        })
        .unwrap_or_default();
    let mut values = rows
        .into_iter()
        .map(|row| row.into_iter().map(|(_, v)| bson_to_value(&v)).collect())
        .collect::<Vec<Vec<Value>>>();
    if is_distinct(plan) {
        dedup_preserving_order(&mut values);
    }
    let rowcount = values.len() as i64;
    Ok(ExecutionResult {
        rows: values,
        rowcount,
        description,
    })
}

fn is_distinct(plan: &Plan) -> bool {
    match plan {
        Plan::Find(find) => find.distinct,
        Plan::Aggregate(agg) => agg.distinct,
        _ => false,
    }
}

/// `SELECT DISTINCT` dedups the already-shaped row tuples rather than
/// pushing a `$group` stage: the column list (and any renames/extractor
/// unboxing) is only settled once row shaping has run, so this is the
/// first point a row-level equality comparison is possible.
fn dedup_preserving_order(rows: &mut Vec<Vec<Value>>) {
    let mut seen: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
    rows.retain(|row| {
        if seen.iter().any(|s| s == row) {
            false
        } else {
            seen.push(row.clone());
            true
        }
    });
}

fn type_code(value: &Bson) -> String {
    match value {
        Bson::Double(_) => "float".to_string(),
        Bson::String(_) => "text".to_string(),
        Bson::Boolean(_) => "bool".to_string(),
        Bson::Null => "null".to_string(),
        Bson::Int32(_) | Bson::Int64(_) => "int".to_string(),
        Bson::ObjectId(_) => "objectid".to_string(),
        Bson::DateTime(_) => "datetime".to_string(),
        Bson::Decimal128(_) => "decimal".to_string(),
        Bson::Binary(_) => "blob".to_string(),
        _ => "text".to_string(),
    }
}

async fn execute_ddl(ddl: &DdlPlan, store: &StoreClient) -> Result<(), MdbError> {
    match ddl {
        DdlPlan::CreateCollection {
            name,
            if_not_exists,
            ..
        } => store.create_collection(name, *if_not_exists).await,
        DdlPlan::DropCollection { name, if_exists } => {
            if *if_exists && !store.list_collection_names().await?.contains(name) {
                return Ok(());
            }
            store.drop_collection(name).await
        }
        DdlPlan::CreateIndex {
            name,
            collection,
            keys,
        } => store.create_index(collection, keys.clone(), name).await,
        DdlPlan::DropIndex { name, collection } => store.drop_index(collection, name).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_occurrence_order() {
        let mut rows = vec![
            vec![Value::Int(1), Value::Text("A".into())],
            vec![Value::Int(2), Value::Text("B".into())],
            vec![Value::Int(1), Value::Text("A".into())],
        ];
        dedup_preserving_order(&mut rows);
        assert_eq!(
            rows,
            vec![
                vec![Value::Int(1), Value::Text("A".into())],
                vec![Value::Int(2), Value::Text("B".into())],
            ]
        );
    }

    #[test]
    fn is_distinct_reads_off_find_and_aggregate_plans() {
        use crate::plan::{FindPlan, Plan};
        let plan = Plan::Find(FindPlan {
            collection: "users".into(),
            filter: bson::doc! {},
            projection: Vec::new(),
            sort: None,
            limit: None,
            offset: None,
            distinct: true,
        });
        assert!(is_distinct(&plan));
    }
}
