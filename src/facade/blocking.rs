//! Blocking façade (§4.6, §5): each `Connection` owns a private
//! single-threaded `tokio::runtime::Runtime` and blocks on the same async
//! [`Core`] the cooperative façade drives directly. No internal locking;
//! callers must not share a `Cursor` across threads.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::core::Core;
use crate::error::MdbError;
use crate::executor::ColumnDescription;
use crate::params::ParameterSet;
use crate::value::Value;

pub fn connect(uri: &str, db: &str) -> Result<Connection, MdbError> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| MdbError::store_error(e.to_string()))?;
    let core = runtime.block_on(Core::connect(uri, db))?;
    Ok(Connection {
        runtime: Arc::new(runtime),
        core: Arc::new(core),
    })
}

#[derive(Clone)]
pub struct Connection {
    runtime: Arc<Runtime>,
    core: Arc<Core>,
}

impl Connection {
    pub fn cursor(&self) -> Cursor {
        Cursor {
            runtime: self.runtime.clone(),
            core: self.core.clone(),
            rows: Vec::new(),
            position: 0,
            rowcount: -1,
            description: Vec::new(),
            closed: false,
        }
    }

    pub fn begin(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub fn commit(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub fn rollback(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub fn close(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub fn list_tables(&self) -> Result<Vec<String>, MdbError> {
        self.runtime.block_on(self.core.list_tables())
    }
}

pub struct Cursor {
    runtime: Arc<Runtime>,
    core: Arc<Core>,
    rows: Vec<Vec<Value>>,
    position: usize,
    rowcount: i64,
    description: Vec<ColumnDescription>,
    closed: bool,
}

impl Cursor {
    pub fn execute(&mut self, sql: &str, params: &ParameterSet) -> Result<(), MdbError> {
        self.ensure_open()?;
        let result = self.guard(self.runtime.block_on(self.core.execute(sql, params)))?;
        self.rows = result.rows;
        self.position = 0;
        self.rowcount = result.rowcount;
        self.description = result.description;
        Ok(())
    }

    pub fn executemany(&mut self, sql: &str, seq_of_params: &[ParameterSet]) -> Result<(), MdbError> {
        self.ensure_open()?;
        let result = self.guard(
            self.runtime
                .block_on(self.core.executemany(sql, seq_of_params)),
        )?;
        self.rows = Vec::new();
        self.position = 0;
        self.rowcount = result.rowcount;
        self.description = Vec::new();
        Ok(())
    }

    pub fn fetchone(&mut self) -> Option<Vec<Value>> {
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        row
    }

    pub fn fetchmany(&mut self, n: usize) -> Vec<Vec<Value>> {
        let end = (self.position + n).min(self.rows.len());
        let slice = self.rows[self.position..end].to_vec();
        self.position = end;
        slice
    }

    pub fn fetchall(&mut self) -> Vec<Vec<Value>> {
        let slice = self.rows[self.position..].to_vec();
        self.position = self.rows.len();
        slice
    }

    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    pub fn description(&self) -> &[ColumnDescription] {
        &self.description
    }

    pub fn close(&mut self) -> Result<(), MdbError> {
        self.closed = true;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), MdbError> {
        if self.closed {
            return Err(MdbError::store_error("cursor is closed"));
        }
        Ok(())
    }

    /// A store error (`E5`) invalidates the cursor; the `Connection` (and
    /// its underlying store handle) stays open (§5 cancellation, §7).
    fn guard<T>(&mut self, result: Result<T, MdbError>) -> Result<T, MdbError> {
        if let Err(err) = &result {
            if err.code == crate::error::ErrorCode::E5 {
                self.closed = true;
            }
        }
        result
    }
}
