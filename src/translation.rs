//! Public entry point for exercising the Binder + Parser/Validator without
//! a live store connection. Mirrors the Python original's
//! `mongo_dbapi.translation.parse_sql`, which tests use to assert on
//! rejection codes directly.

use crate::ast::Statement;
use crate::binder;
use crate::error::MdbError;
use crate::params::ParameterSet;

/// The outcome of binding + parsing + validating one SQL statement, short
/// of building a store-facing `Plan`.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub statement: Statement,
    /// Mirrors `Select::uses_window` for a top-level `SELECT`; `false` for
    /// every other statement kind.
    pub uses_window: bool,
}

pub fn parse_sql(sql: &str, params: &ParameterSet) -> Result<ParsedStatement, MdbError> {
    let bound = binder::bind(sql, params)?;
    let statement = crate::parser::parse_statement(&bound.sql)?;
    let uses_window = match &statement {
        Statement::Select(select) => select.uses_window,
        _ => false,
    };
    Ok(ParsedStatement {
        statement,
        uses_window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn row_number_without_partition_parses() {
        let parsed = parse_sql(
            "SELECT ROW_NUMBER() OVER (ORDER BY id) FROM orders",
            &ParameterSet::Empty,
        )
        .unwrap();
        assert!(parsed.uses_window);
    }

    #[test]
    fn rank_is_rejected() {
        let err = parse_sql("SELECT RANK() OVER (ORDER BY id) FROM orders", &ParameterSet::Empty)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::E2);
    }

    #[test]
    fn delete_without_where_is_rejected() {
        let err = parse_sql("DELETE FROM orders", &ParameterSet::Empty).unwrap_err();
        assert_eq!(err.code, ErrorCode::E3);
    }

    #[test]
    fn manual_drop_index_is_recognised() {
        let parsed = parse_sql("DROP INDEX idx_orders_id ON orders", &ParameterSet::Empty).unwrap();
        assert!(matches!(parsed.statement, Statement::DropIndex(_)));
    }
}
