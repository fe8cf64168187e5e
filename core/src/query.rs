//! Conditional statements: filters, ordering, paging, and bulk writes.
//!
//! A [`Condition`] names a column, an [`Operator`], and its operand values.
//! Conditions passed together are joined with `AND`. Every operand is
//! checked against the column's logical type and bound as a parameter; a
//! `NULL` test is expressed with [`Condition::is_null`] rather than an
//! equality against [`Value::Null`].
//!
//! # Example
//!
//! ```
//! use rowmap_core::*;
//!
//! let d = Item::descriptor();
//! let query = Query::new()
//!     .filter(Condition::gt("id", 10))
//!     .filter(Condition::not_eq("content", "done"))
//!     .order_by("created_time", Order::Desc)
//!     .limit(5);
//!
//! let stmt = build_select_where(&d, &query).unwrap();
//! assert_eq!(
//!     stmt.sql(),
//!     r#"SELECT "id", "content", "created_time" FROM "Item" WHERE "id" > ?1 AND "content" <> ?2 ORDER BY "created_time" DESC LIMIT ?3"#
//! );
//! assert_eq!(stmt.params().len(), 3);
//! ```

use std::fmt;

use crate::error::{MappingError, Result};
use crate::statement::{Statement, column_list, placeholders, quote_identifier};
use crate::types::{ColumnDescriptor, EntityDescriptor, Value};
use crate::validate::key_index;

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
    /// `BETWEEN low AND high`
    Between,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl Operator {
    /// SQL spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate over a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    column: String,
    operator: Operator,
    values: Vec<Value>,
}

impl Condition {
    fn new(column: &str, operator: Operator, values: Vec<Value>) -> Self {
        Self {
            column: column.to_string(),
            operator,
            values,
        }
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, vec![value.into()])
    }

    pub fn not_eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::NotEq, vec![value.into()])
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Lt, vec![value.into()])
    }

    pub fn le(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Le, vec![value.into()])
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Gt, vec![value.into()])
    }

    pub fn ge(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Ge, vec![value.into()])
    }

    /// Matches rows whose column equals any of `values`. An empty list
    /// matches nothing.
    pub fn in_list<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(column, Operator::In, values.into_iter().map(Into::into).collect())
    }

    /// Matches rows whose column equals none of `values`. An empty list
    /// matches every row.
    pub fn not_in<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(column, Operator::NotIn, values.into_iter().map(Into::into).collect())
    }

    /// Inclusive range test.
    pub fn between(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::new(column, Operator::Between, vec![low.into(), high.into()])
    }

    pub fn is_null(column: &str) -> Self {
        Self::new(column, Operator::IsNull, Vec::new())
    }

    pub fn is_not_null(column: &str) -> Self {
        Self::new(column, Operator::IsNotNull, Vec::new())
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Operand values in binding order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    fn keyword(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Filters, ordering, and paging for [`build_select_where`].
///
/// Without an explicit ordering rows come back in primary key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
    ordering: Vec<(String, Order)>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition; all conditions must hold.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds a sort key. Earlier keys take precedence.
    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.ordering.push((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

fn lookup<'d>(descriptor: &'d EntityDescriptor, column: &str) -> Result<&'d ColumnDescriptor> {
    descriptor
        .column(column)
        .ok_or_else(|| MappingError::UnknownColumn {
            entity: descriptor.name.clone(),
            column: column.to_string(),
        })
}

fn check_operand(descriptor: &EntityDescriptor, column: &ColumnDescriptor, value: &Value) -> Result<()> {
    if value.logical_type() == Some(column.logical_type) {
        return Ok(());
    }
    Err(MappingError::TypeMismatch {
        entity: descriptor.name.clone(),
        column: column.name.clone(),
        expected: column.logical_type,
        found: value.type_name(),
    })
}

/// Renders `WHERE ...` (with a leading space) for the conditions, appending
/// their operands to `params`. Returns an empty string for no conditions.
fn where_clause(
    descriptor: &EntityDescriptor,
    conditions: &[Condition],
    params: &mut Vec<Value>,
) -> Result<String> {
    let mut predicates = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let column = lookup(descriptor, &condition.column)?;
        for value in &condition.values {
            check_operand(descriptor, column, value)?;
        }
        let name = quote_identifier(&column.name);
        let next = params.len() + 1;
        let predicate = match condition.operator {
            Operator::IsNull | Operator::IsNotNull => {
                format!("{name} {}", condition.operator)
            }
            Operator::In | Operator::NotIn => format!(
                "{name} {} ({})",
                condition.operator,
                placeholders(next, condition.values.len())
            ),
            Operator::Between => {
                if condition.values.len() != 2 {
                    return Err(MappingError::InvalidQuery {
                        entity: descriptor.name.clone(),
                        reason: format!("BETWEEN on '{}' needs two bounds", column.name),
                    });
                }
                format!("{name} BETWEEN ?{next} AND ?{}", next + 1)
            }
            op => format!("{name} {op} ?{next}"),
        };
        params.extend(condition.values.iter().cloned());
        predicates.push(predicate);
    }
    if predicates.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", predicates.join(" AND ")))
    }
}

/// Builds a filtered, ordered, and optionally paged `SELECT`.
///
/// `LIMIT` and `OFFSET` are bound as parameters after the condition
/// operands. An offset without a limit uses `LIMIT -1`.
///
/// # Errors
///
/// - [`MappingError::UnknownColumn`] if a condition or sort key names an
///   undeclared column.
/// - [`MappingError::TypeMismatch`] if an operand's type differs from its
///   column's logical type.
pub fn build_select_where(descriptor: &EntityDescriptor, query: &Query) -> Result<Statement> {
    let mut params = Vec::new();
    let filter = where_clause(descriptor, &query.conditions, &mut params)?;

    let ordering = if query.ordering.is_empty() {
        let key = &descriptor.columns[key_index(descriptor)?];
        quote_identifier(&key.name)
    } else {
        query
            .ordering
            .iter()
            .map(|(name, order)| {
                let column = lookup(descriptor, name)?;
                Ok(format!("{} {}", quote_identifier(&column.name), order.keyword()))
            })
            .collect::<Result<Vec<_>>>()?
            .join(", ")
    };

    let mut sql = format!(
        "SELECT {} FROM {}{filter} ORDER BY {ordering}",
        column_list(descriptor),
        quote_identifier(descriptor.table_name())
    );
    match (query.limit, query.offset) {
        (Some(limit), offset) => {
            params.push(Value::Integer(i64::from(limit)));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
            if let Some(offset) = offset {
                params.push(Value::Integer(i64::from(offset)));
                sql.push_str(&format!(" OFFSET ?{}", params.len()));
            }
        }
        (None, Some(offset)) => {
            params.push(Value::Integer(i64::from(offset)));
            sql.push_str(&format!(" LIMIT -1 OFFSET ?{}", params.len()));
        }
        (None, None) => {}
    }
    Ok(Statement::new(sql, params))
}

/// Builds a `SELECT COUNT(*)` over the rows matching every condition.
pub fn build_count_where(descriptor: &EntityDescriptor, conditions: &[Condition]) -> Result<Statement> {
    let mut params = Vec::new();
    let filter = where_clause(descriptor, conditions, &mut params)?;
    let sql = format!(
        "SELECT COUNT(*) FROM {}{filter}",
        quote_identifier(descriptor.table_name())
    );
    Ok(Statement::new(sql, params))
}

/// Builds an `UPDATE` that sets the given columns on every matching row.
///
/// Assignment values are bound first, then condition operands. A `Null`
/// assignment is allowed only on a nullable column. With no conditions the
/// update applies to the whole table.
///
/// # Errors
///
/// - [`MappingError::InvalidQuery`] if there are no assignments, or one
///   targets the primary key.
/// - [`MappingError::UnknownColumn`] / [`MappingError::TypeMismatch`] as
///   for [`build_select_where`].
pub fn build_update_where(
    descriptor: &EntityDescriptor,
    assignments: &[(&str, Value)],
    conditions: &[Condition],
) -> Result<Statement> {
    if assignments.is_empty() {
        return Err(MappingError::InvalidQuery {
            entity: descriptor.name.clone(),
            reason: "no columns to assign".to_string(),
        });
    }
    let key = key_index(descriptor)?;

    let mut sets = Vec::with_capacity(assignments.len());
    let mut params = Vec::with_capacity(assignments.len() + conditions.len());
    for (name, value) in assignments {
        let column = lookup(descriptor, name)?;
        if column.name == descriptor.columns[key].name {
            return Err(MappingError::InvalidQuery {
                entity: descriptor.name.clone(),
                reason: format!("primary key '{}' cannot be assigned", column.name),
            });
        }
        if !(value.is_null() && column.nullable) {
            check_operand(descriptor, column, value)?;
        }
        params.push(value.clone());
        sets.push(format!("{} = ?{}", quote_identifier(&column.name), params.len()));
    }

    let filter = where_clause(descriptor, conditions, &mut params)?;
    let sql = format!(
        "UPDATE {} SET {}{filter}",
        quote_identifier(descriptor.table_name()),
        sets.join(", ")
    );
    Ok(Statement::new(sql, params))
}

/// Builds a `DELETE` of every matching row. With no conditions the whole
/// table is cleared.
pub fn build_delete_where(descriptor: &EntityDescriptor, conditions: &[Condition]) -> Result<Statement> {
    let mut params = Vec::new();
    let filter = where_clause(descriptor, conditions, &mut params)?;
    let sql = format!(
        "DELETE FROM {}{filter}",
        quote_identifier(descriptor.table_name())
    );
    Ok(Statement::new(sql, params))
}
