//! CREATE/DROP TABLE and CREATE/DROP INDEX lowering (§4.4). `CREATE TABLE`
//! column definitions have no store counterpart; they ride along on
//! [`crate::plan::DdlPlan::CreateCollection`] purely so a façade can report
//! them back to a caller that asks, and are never persisted.

use bson::Document;

use crate::ast::{CreateIndex, CreateTable, DropIndex, DropTable};

use super::DdlPlan;

pub fn build_create_table_plan(create: &CreateTable) -> DdlPlan {
    DdlPlan::CreateCollection {
        name: create.table.clone(),
        if_not_exists: create.if_not_exists,
        columns: create.columns.clone(),
    }
}

pub fn build_drop_table_plan(drop: &DropTable) -> DdlPlan {
    DdlPlan::DropCollection {
        name: drop.table.clone(),
        if_exists: drop.if_exists,
    }
}

pub fn build_create_index_plan(create: &CreateIndex) -> DdlPlan {
    let mut keys = Document::new();
    for column in &create.columns {
        keys.insert(column.clone(), 1);
    }
    DdlPlan::CreateIndex {
        name: create.index_name.clone(),
        collection: create.table.clone(),
        keys,
    }
}

pub fn build_drop_index_plan(drop: &DropIndex) -> DdlPlan {
    DdlPlan::DropIndex {
        name: drop.index_name.clone(),
        collection: drop.table.clone(),
    }
}
