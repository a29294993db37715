//! The shared async core (§5 [ADD]): binds a statement's placeholders,
//! parses/validates it, builds a `Plan` and executes it. Both façades wrap
//! this one type — the blocking façade drives it with a private
//! `tokio::runtime::Runtime`, the cooperative façade calls it directly.

use tracing::instrument;

use crate::binder;
use crate::error::MdbError;
use crate::executor::{self, ExecutionResult};
use crate::params::ParameterSet;
use crate::parser;
use crate::plan;
use crate::store::StoreClient;

#[derive(Clone)]
pub struct Core {
    store: StoreClient,
}

impl Core {
    pub async fn connect(uri: &str, db: &str) -> Result<Self, MdbError> {
        let store = StoreClient::connect(uri, db).await?;
        Ok(Core { store })
    }

    #[instrument(skip(self, sql, params))]
    pub async fn execute(&self, sql: &str, params: &ParameterSet) -> Result<ExecutionResult, MdbError> {
        let bound = binder::bind(sql, params)?;
        let stmt = parser::parse_statement(&bound.sql)?;
        let built = plan::build_plan(&stmt, &bound.bindings, &self.store).await?;
        executor::execute(&built, &self.store).await
    }

    pub async fn executemany(
        &self,
        sql: &str,
        seq_of_params: &[ParameterSet],
    ) -> Result<ExecutionResult, MdbError> {
        let mut total = 0i64;
        for params in seq_of_params {
            let result = self.execute(sql, params).await?;
            if result.rowcount > 0 {
                total += result.rowcount;
            }
        }
        Ok(ExecutionResult {
            rows: Vec::new(),
            rowcount: total,
            description: Vec::new(),
        })
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, MdbError> {
        self.store.list_collection_names().await
    }
}
