//! The store-agnostic execution Plan (§3, §4.4): every `Placeholder` has
//! been resolved to a literal value and every filter/projection/stage is
//! already a `bson` value by the time a [`Plan`] exists.

mod build;
mod ddl;
mod dml;
mod filter;
mod project;
mod select;

pub use build::build_plan;
pub(crate) use build::execute_rows;
pub use project::{ProjectionField, ProjectionSource};

use bson::Document;

#[derive(Debug, Clone)]
pub enum Plan {
    Find(FindPlan),
    Aggregate(AggregatePlan),
    Insert(InsertPlan),
    Update(UpdatePlan),
    Delete(DeletePlan),
    Ddl(DdlPlan),
    NoOp,
}

#[derive(Debug, Clone)]
pub struct FindPlan {
    pub collection: String,
    pub filter: Document,
    pub projection: Vec<ProjectionField>,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub distinct: bool,
}

#[derive(Debug, Clone)]
pub struct AggregatePlan {
    pub collection: String,
    pub stages: Vec<Document>,
    pub projection: Vec<ProjectionField>,
    pub distinct: bool,
}

#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub collection: String,
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub collection: String,
    pub filter: Document,
    pub set_doc: Document,
}

#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub collection: String,
    pub filter: Document,
}

#[derive(Debug, Clone)]
pub enum DdlPlan {
    CreateCollection {
        name: String,
        if_not_exists: bool,
        columns: Vec<crate::ast::ColumnDef>,
    },
    DropCollection {
        name: String,
        if_exists: bool,
    },
    CreateIndex {
        name: String,
        collection: String,
        keys: Document,
    },
    DropIndex {
        name: String,
        collection: String,
    },
}
