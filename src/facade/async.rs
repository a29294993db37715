//! Cooperative façade (§4.6, §5): native `async` `Connection`/`Cursor` over
//! the shared [`Core`]. Suspension points are exactly `connect`, `execute`,
//! `fetch*`, `commit` and `close`; ordering within one `Cursor` is strictly
//! serial since every method takes `&mut self`.

use std::sync::Arc;

use crate::core::Core;
use crate::error::MdbError;
use crate::executor::ColumnDescription;
use crate::params::ParameterSet;
use crate::value::Value;

pub async fn connect(uri: &str, db: &str) -> Result<Connection, MdbError> {
    let core = Core::connect(uri, db).await?;
    Ok(Connection {
        core: Arc::new(core),
    })
}

#[derive(Clone)]
pub struct Connection {
    core: Arc<Core>,
}

impl Connection {
    pub fn cursor(&self) -> Cursor {
        Cursor {
            core: self.core.clone(),
            rows: Vec::new(),
            position: 0,
            rowcount: -1,
            description: Vec::new(),
            closed: false,
        }
    }

    /// Accepted no-op: the façade does not expose store sessions.
    pub async fn begin(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub async fn commit(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub async fn rollback(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub async fn close(&self) -> Result<(), MdbError> {
        Ok(())
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, MdbError> {
        self.core.list_tables().await
    }
}

pub struct Cursor {
    core: Arc<Core>,
    rows: Vec<Vec<Value>>,
    position: usize,
    rowcount: i64,
    description: Vec<ColumnDescription>,
    closed: bool,
}

impl Cursor {
    pub async fn execute(&mut self, sql: &str, params: &ParameterSet) -> Result<(), MdbError> {
        self.ensure_open()?;
        let result = self.guard(self.core.execute(sql, params).await)?;
        self.rows = result.rows;
        self.position = 0;
        self.rowcount = result.rowcount;
        self.description = result.description;
        Ok(())
    }

    pub async fn executemany(
        &mut self,
        sql: &str,
        seq_of_params: &[ParameterSet],
    ) -> Result<(), MdbError> {
        self.ensure_open()?;
        let result = self.guard(self.core.executemany(sql, seq_of_params).await)?;
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

    pub async fn close(&mut self) -> Result<(), MdbError> {
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
