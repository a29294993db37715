//! Converts sqlparser's AST into the crate-owned [`crate::ast`] shapes.
//! Anything outside the accepted dialect fails here with `E1` (unknown
//! statement shape) or is deferred to [`super::validator`] for `E2`.

use sqlparser::ast::{
    self, BinaryOperator, Expr as SqlExpr, FunctionArg, FunctionArgExpr, FunctionArguments,
    GroupByExpr, Ident, Join as SqlJoin, JoinConstraint, JoinOperator, ObjectName, ObjectType,
    OrderByExpr, Query, Select as SqlSelect, SelectItem as SqlSelectItem, SetExpr, Statement as SqlStatement,
    TableFactor, TableWithJoins, Value as SqlValue, WindowType,
};

use crate::ast::*;
use crate::error::MdbError;
use crate::value::Value;

pub fn convert_statement(stmt: &SqlStatement) -> Result<Statement, MdbError> {
    match stmt {
        SqlStatement::Query(query) => Ok(Statement::Select(convert_query(query)?)),
        SqlStatement::Insert(insert) => convert_insert(insert),
        SqlStatement::Update(update) => {
            let table_name = table_name_of(&update.table.relation)?;
            let mut converted_assignments = Vec::with_capacity(update.assignments.len());
            for assignment in &update.assignments {
                let name = assignment.target.to_string();
                let value = convert_expr(&assignment.value)?;
                converted_assignments.push((name, value));
            }
            let filter = update.selection.as_ref().map(convert_expr).transpose()?;
            Ok(Statement::Update(Update {
                table: table_name,
                assignments: converted_assignments,
                filter,
            }))
        }
        SqlStatement::Delete(delete) => {
            let tables = match &delete.from {
                ast::FromTable::WithFromKeyword(t) | ast::FromTable::WithoutKeyword(t) => t,
            };
            if tables.len() != 1 {
                return Err(MdbError::unsupported_statement(
                    "DELETE supports exactly one target table",
                ));
            }
            let table_name = table_name_of(&tables[0].relation)?;
            let filter = delete.selection.as_ref().map(convert_expr).transpose()?;
            Ok(Statement::Delete(Delete {
                table: table_name,
                filter,
            }))
        }
        SqlStatement::CreateTable(create) => {
            let columns = create
                .columns
                .iter()
                .map(|c| ColumnDef {
                    name: c.name.value.clone(),
                    sql_type: c.data_type.to_string(),
                })
                .collect();
            Ok(Statement::CreateTable(CreateTable {
                table: create.name.to_string(),
                columns,
                if_not_exists: create.if_not_exists,
            }))
        }
        SqlStatement::Drop {
            object_type,
            names,
            if_exists,
            ..
        } => {
            if *object_type != ObjectType::Table {
                return Err(MdbError::unsupported_statement(format!(
                    "DROP {object_type} is not supported"
                )));
            }
            if names.len() != 1 {
                return Err(MdbError::unsupported_statement(
                    "DROP TABLE supports exactly one table",
                ));
            }
            Ok(Statement::DropTable(DropTable {
                table: names[0].to_string(),
                if_exists: *if_exists,
            }))
        }
        SqlStatement::CreateIndex(create_index) => {
            let index_name = create_index
                .name
                .as_ref()
                .map(ObjectName::to_string)
                .ok_or_else(|| MdbError::unsupported_statement("CREATE INDEX must have a name"))?;
            Ok(Statement::CreateIndex(CreateIndex {
                index_name,
                table: create_index.table_name.to_string(),
                columns: create_index
                    .columns
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            }))
        }
        SqlStatement::StartTransaction { .. } => Ok(Statement::Begin),
        SqlStatement::Commit { .. } => Ok(Statement::Commit),
        SqlStatement::Rollback { .. } => Ok(Statement::Rollback),
        other => Err(MdbError::unsupported_statement(format!(
            "unsupported statement: {other}"
        ))),
    }
}

/// `DROP INDEX n ON t` is MySQL-flavoured syntax that `GenericDialect`
/// doesn't always round-trip through `Statement::Drop`; it is recognised
/// textually before the general parse attempt (see [`super::parse_statement`]
/// callers in [`crate::translation`]).
pub fn convert_manual_drop_index(index_name: String, table: String) -> Statement {
    Statement::DropIndex(DropIndex {
        index_name,
        table,
    })
}

fn table_name_of(factor: &TableFactor) -> Result<String, MdbError> {
    match factor {
        TableFactor::Table { name, .. } => Ok(name.to_string()),
        _ => Err(MdbError::unsupported_statement(
            "expected a plain table reference",
        )),
    }
}

fn convert_insert(insert: &ast::Insert) -> Result<Statement, MdbError> {
    let source = insert
        .source
        .as_ref()
        .ok_or_else(|| MdbError::unsupported_statement("INSERT without VALUES is not supported"))?;
    let rows = match &*source.body {
        SetExpr::Values(values) => {
            let mut rows = Vec::with_capacity(values.rows.len());
            for row in &values.rows {
                let mut converted = Vec::with_capacity(row.len());
                for expr in row {
                    converted.push(convert_expr(expr)?);
                }
                rows.push(converted);
            }
            rows
        }
        _ => {
            return Err(MdbError::unsupported_statement(
                "INSERT ... SELECT is not supported",
            ))
        }
    };
    Ok(Statement::Insert(Insert {
        table: insert.table.to_string(),
        columns: insert.columns.iter().map(|c| c.value.clone()).collect(),
        rows,
    }))
}

fn convert_query(query: &Query) -> Result<Select, MdbError> {
    match &*query.body {
        SetExpr::Select(select) => {
            let mut converted = convert_select(select)?;
            apply_order_limit_offset(&mut converted, query)?;
            Ok(converted)
        }
        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            if !matches!(op, ast::SetOperator::Union) {
                return Err(MdbError::unsupported_feature(format!(
                    "set operation {op} is not supported"
                )));
            }
            if !matches!(set_quantifier, ast::SetQuantifier::All) {
                return Err(MdbError::unsupported_feature(
                    "UNION requires ALL (UNION DISTINCT is not supported)",
                ));
            }
            let mut left_select = convert_set_expr(left)?;
            let right_select = convert_set_expr(right)?;
            left_select.union_all = Some(Box::new(right_select));
            apply_order_limit_offset(&mut left_select, query)?;
            Ok(left_select)
        }
        _ => Err(MdbError::unsupported_statement(
            "only SELECT and UNION ALL queries are supported",
        )),
    }
}

fn convert_set_expr(expr: &SetExpr) -> Result<Select, MdbError> {
    match expr {
        SetExpr::Select(select) => convert_select(select),
        SetExpr::Query(query) => convert_query(query),
        _ => Err(MdbError::unsupported_statement(
            "only SELECT is supported on either side of UNION ALL",
        )),
    }
}

fn apply_order_limit_offset(select: &mut Select, query: &Query) -> Result<(), MdbError> {
    if let Some(order_by) = &query.order_by {
        select.order_by = convert_order_by(&order_by.exprs)?;
    }
    if let Some(limit_expr) = &query.limit {
        select.limit = Some(literal_i64(limit_expr)?);
    }
    if let Some(offset) = &query.offset {
        select.offset = Some(literal_i64(&offset.value)?);
    }
    Ok(())
}

fn convert_order_by(exprs: &[OrderByExpr]) -> Result<Vec<OrderByItem>, MdbError> {
    exprs
        .iter()
        .map(|item| {
            Ok(OrderByItem {
                expr: convert_expr(&item.expr)?,
                ascending: item.asc.unwrap_or(true),
            })
        })
        .collect()
}

fn literal_i64(expr: &SqlExpr) -> Result<i64, MdbError> {
    match expr {
        SqlExpr::Value(v) => match &v.value {
            SqlValue::Number(n, _) => n.parse::<i64>().map_err(|_| {
                MdbError::unsupported_statement(format!("invalid integer literal {n}"))
            }),
            _ => Err(MdbError::unsupported_statement(
                "LIMIT/OFFSET must be an integer literal",
            )),
        },
        _ => Err(MdbError::unsupported_statement(
            "LIMIT/OFFSET must be an integer literal",
        )),
    }
}

fn convert_select(select: &SqlSelect) -> Result<Select, MdbError> {
    if select.from.is_empty() {
        return Err(MdbError::unsupported_statement("SELECT without FROM is not supported"));
    }
    if select.from.len() > 1 {
        return Err(MdbError::unsupported_feature(
            "comma-joined FROM clauses (implicit cross joins) are not supported",
        ));
    }

    let TableWithJoins { relation, joins } = &select.from[0];
    let from = convert_table_factor(relation)?;
    let converted_joins = joins
        .iter()
        .map(convert_join)
        .collect::<Result<Vec<_>, _>>()?;

    let projection = select
        .projection
        .iter()
        .map(convert_select_item)
        .collect::<Result<Vec<_>, _>>()?;

    let filter = select.selection.as_ref().map(convert_expr).transpose()?;

    let group_by = match &select.group_by {
        GroupByExpr::Expressions(exprs, _) => exprs
            .iter()
            .map(convert_expr)
            .collect::<Result<Vec<_>, _>>()?,
        GroupByExpr::All(_) => {
            return Err(MdbError::unsupported_feature("GROUP BY ALL is not supported"))
        }
    };

    let having = select.having.as_ref().map(convert_expr).transpose()?;

    let uses_window = projection_uses_window(&select.projection);

    Ok(Select {
        projection,
        distinct: select.distinct.is_some(),
        from,
        joins: converted_joins,
        filter,
        group_by,
        having,
        order_by: Vec::new(),
        limit: None,
        offset: None,
        union_all: None,
        uses_window,
    })
}

fn convert_table_factor(factor: &TableFactor) -> Result<TableRef, MdbError> {
    match factor {
        TableFactor::Table { name, alias, .. } => Ok(TableRef::Named {
            name: name.to_string(),
            alias: alias.as_ref().map(|a| a.name.value.clone()),
        }),
        TableFactor::Derived {
            subquery, alias, ..
        } => {
            let alias = alias
                .as_ref()
                .map(|a| a.name.value.clone())
                .ok_or_else(|| MdbError::unsupported_statement("derived tables require an alias"))?;
            let query = convert_query(subquery)?;
            Ok(TableRef::Derived {
                query: Box::new(query),
                alias,
            })
        }
        _ => Err(MdbError::unsupported_statement(
            "unsupported FROM clause shape",
        )),
    }
}

fn convert_join(join: &SqlJoin) -> Result<Join, MdbError> {
    let (kind, constraint) = match &join.join_operator {
        JoinOperator::Inner(c) => (JoinKind::Inner, c),
        JoinOperator::LeftOuter(c) => (JoinKind::Left, c),
        JoinOperator::RightOuter(_) => {
            return Err(MdbError::unsupported_feature("RIGHT JOIN is not supported"))
        }
        JoinOperator::FullOuter(_) => {
            return Err(MdbError::unsupported_feature(
                "FULL OUTER JOIN is not supported",
            ))
        }
        JoinOperator::CrossJoin => {
            return Err(MdbError::unsupported_feature("CROSS JOIN is not supported"))
        }
        _ => return Err(MdbError::unsupported_feature("unsupported JOIN operator")),
    };
    let on = match constraint {
        JoinConstraint::On(expr) => convert_expr(expr)?,
        _ => {
            return Err(MdbError::unsupported_feature(
                "JOIN requires an ON equality predicate",
            ))
        }
    };
    let right = convert_table_factor(&join.relation)?;
    Ok(Join { kind, right, on })
}

fn convert_select_item(item: &SqlSelectItem) -> Result<SelectItem, MdbError> {
    match item {
        SqlSelectItem::UnnamedExpr(expr) => Ok(SelectItem {
            expr: convert_expr(expr)?,
            alias: None,
        }),
        SqlSelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem {
            expr: convert_expr(expr)?,
            alias: Some(alias.value.clone()),
        }),
        SqlSelectItem::Wildcard(_) => Ok(SelectItem {
            expr: Expr::Column {
                qualifier: None,
                name: "*".to_string(),
            },
            alias: None,
        }),
        SqlSelectItem::QualifiedWildcard(name, _) => Ok(SelectItem {
            expr: Expr::Column {
                qualifier: Some(name.to_string()),
                name: "*".to_string(),
            },
            alias: None,
        }),
    }
}

fn projection_uses_window(items: &[SqlSelectItem]) -> bool {
    fn expr_has_window(expr: &SqlExpr) -> bool {
        match expr {
            SqlExpr::Function(f) => f.over.is_some(),
            _ => false,
        }
    }
    items.iter().any(|item| match item {
        SqlSelectItem::UnnamedExpr(e) | SqlSelectItem::ExprWithAlias { expr: e, .. } => {
            expr_has_window(e)
        }
        _ => false,
    })
}

fn ident_name(ident: &Ident) -> String {
    ident.value.clone()
}

pub fn convert_expr(expr: &SqlExpr) -> Result<Expr, MdbError> {
    match expr {
        SqlExpr::Identifier(ident) => Ok(Expr::Column {
            qualifier: None,
            name: ident_name(ident),
        }),
        SqlExpr::CompoundIdentifier(parts) => {
            if parts.len() != 2 {
                return Err(MdbError::unsupported_statement(
                    "only single-qualifier column references (t.col) are supported",
                ));
            }
            Ok(Expr::Column {
                qualifier: Some(ident_name(&parts[0])),
                name: ident_name(&parts[1]),
            })
        }
        SqlExpr::Value(value) => Ok(Expr::Literal(convert_literal(&value.value)?)),
        SqlExpr::Placeholder(token) => Ok(Expr::Placeholder(placeholder_id(token))),
        SqlExpr::BinaryOp { left, op, right } => convert_binary_op(left, op, right),
        SqlExpr::UnaryOp { op, expr } => match op {
            ast::UnaryOperator::Not => Ok(Expr::Not(Box::new(convert_expr(expr)?))),
            _ => Err(MdbError::unsupported_statement(format!(
                "unsupported unary operator {op}"
            ))),
        },
        SqlExpr::Nested(inner) => convert_expr(inner),
        SqlExpr::InList {
            expr,
            list,
            negated,
        } => Ok(Expr::In {
            expr: Box::new(convert_expr(expr)?),
            list: InList::Values(
                list.iter()
                    .map(convert_expr)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            negated: *negated,
        }),
        SqlExpr::InSubquery {
            expr,
            subquery,
            negated,
        } => Ok(Expr::In {
            expr: Box::new(convert_expr(expr)?),
            list: InList::Subquery(Box::new(convert_query(subquery)?)),
            negated: *negated,
        }),
        SqlExpr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            if *negated {
                return Err(MdbError::unsupported_feature("NOT BETWEEN is not supported"));
            }
            Ok(Expr::Between {
                expr: Box::new(convert_expr(expr)?),
                low: Box::new(convert_expr(low)?),
                high: Box::new(convert_expr(high)?),
            })
        }
        SqlExpr::Like {
            negated,
            expr,
            pattern,
            ..
        } => {
            if *negated {
                return Err(MdbError::unsupported_feature("NOT LIKE is not supported"));
            }
            Ok(Expr::Like {
                expr: Box::new(convert_expr(expr)?),
                pattern: Box::new(convert_expr(pattern)?),
            })
        }
        SqlExpr::IsNull(inner) => Ok(Expr::IsNull(Box::new(convert_expr(inner)?))),
        SqlExpr::IsNotNull(inner) => {
            Ok(Expr::Not(Box::new(Expr::IsNull(Box::new(convert_expr(inner)?)))))
        }
        SqlExpr::Exists { subquery, negated } => Ok(Expr::Exists {
            subquery: Box::new(convert_query(subquery)?),
            negated: *negated,
        }),
        SqlExpr::Function(func) => convert_function(func),
        _ => Err(MdbError::unsupported_statement(format!(
            "unsupported expression shape: {expr}"
        ))),
    }
}

fn placeholder_id(token: &str) -> PlaceholderId {
    if let Some(name) = token.strip_prefix(':') {
        PlaceholderId::Named(name.to_string())
    } else {
        PlaceholderId::Positional(token.to_string())
    }
}

fn convert_binary_op(
    left: &SqlExpr,
    op: &BinaryOperator,
    right: &SqlExpr,
) -> Result<Expr, MdbError> {
    match op {
        BinaryOperator::And => Ok(Expr::And(
            Box::new(convert_expr(left)?),
            Box::new(convert_expr(right)?),
        )),
        BinaryOperator::Or => Ok(Expr::Or(
            Box::new(convert_expr(left)?),
            Box::new(convert_expr(right)?),
        )),
        BinaryOperator::Eq => compare(CompareOp::Eq, left, right),
        BinaryOperator::NotEq => compare(CompareOp::NotEq, left, right),
        BinaryOperator::Lt => compare(CompareOp::Lt, left, right),
        BinaryOperator::LtEq => compare(CompareOp::LtEq, left, right),
        BinaryOperator::Gt => compare(CompareOp::Gt, left, right),
        BinaryOperator::GtEq => compare(CompareOp::GtEq, left, right),
        other => Err(MdbError::unsupported_feature(format!(
            "unsupported binary operator {other}"
        ))),
    }
}

fn compare(op: CompareOp, left: &SqlExpr, right: &SqlExpr) -> Result<Expr, MdbError> {
    Ok(Expr::Compare {
        op,
        lhs: Box::new(convert_expr(left)?),
        rhs: Box::new(convert_expr(right)?),
    })
}

fn convert_literal(value: &SqlValue) -> Result<Value, MdbError> {
    match value {
        SqlValue::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Int(i))
            } else {
                n.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| MdbError::unsupported_statement(format!("invalid numeric literal {n}")))
            }
        }
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
            Ok(Value::Text(s.clone()))
        }
        SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(MdbError::unsupported_statement(format!(
            "unsupported literal {other}"
        ))),
    }
}

fn convert_function(func: &ast::Function) -> Result<Expr, MdbError> {
    let name = func.name.to_string().to_uppercase();
    let args = function_args(func)?;

    if let Some(WindowType::WindowSpec(spec)) = &func.over {
        let partition_by = spec
            .partition_by
            .iter()
            .map(convert_expr)
            .collect::<Result<Vec<_>, _>>()?;
        let order_by = convert_order_by(&spec.order_by)?;
        return Ok(Expr::WindowCall {
            name,
            args,
            partition_by,
            order_by,
        });
    }

    Ok(Expr::FuncCall { name, args })
}

fn function_args(func: &ast::Function) -> Result<Vec<Expr>, MdbError> {
    match &func.args {
        FunctionArguments::None => Ok(Vec::new()),
        FunctionArguments::Subquery(_) => Err(MdbError::unsupported_statement(
            "function subquery arguments are not supported",
        )),
        FunctionArguments::List(list) => list
            .args
            .iter()
            .map(|arg| match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => convert_expr(e),
                FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => {
                    Ok(Expr::Column {
                        qualifier: None,
                        name: "*".to_string(),
                    })
                }
                _ => Err(MdbError::unsupported_statement(
                    "unsupported function argument shape",
                )),
            })
            .collect(),
    }
}
