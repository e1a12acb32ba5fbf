//! Structural and data operations that make up a migration direction.
//!
//! Each [`Operation`] is a tagged variant (`op: add_column`, ...) rather than
//! free-form code, so every forward operation can be checked for an inverse
//! via [`Operation::inverse`] and a down transformation derived with
//! [`Transformation::invert`].

use crate::error::{CoreError, CoreResult};
use crate::sql_utils::string_literal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A literal value used in row operations and column defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Render the value as a SQL literal.
    pub fn to_sql(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(true) => "TRUE".to_string(),
            SqlValue::Bool(false) => "FALSE".to_string(),
            SqlValue::Integer(n) => n.to_string(),
            SqlValue::Float(f) if f.is_finite() => format!("{f:?}"),
            SqlValue::Float(f) => format!("'{f}'::DOUBLE"),
            SqlValue::Text(s) => string_literal(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

fn default_true() -> bool {
    true
}

/// Column definition used by `create_table`, `add_column` and the stored
/// definitions that make drops reversible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDef {
    pub name: String,

    /// SQL data type, e.g. `VARCHAR` or `BOOLEAN`
    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default = "default_true")]
    pub nullable: bool,

    #[serde(default)]
    pub default: Option<SqlValue>,
}

impl ColumnDef {
    /// Nullable column without a default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Full table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub primary_key: Vec<String>,
}

/// Index definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// Column/value pairs, kept sorted so serialization is canonical.
pub type Assignments = BTreeMap<String, SqlValue>;

/// One step of a [`Transformation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateTable(TableDef),
    DropTable {
        table: String,
        /// Definition to recreate on rollback
        #[serde(default)]
        definition: Option<TableDef>,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: String,
        /// Definition to re-add on rollback
        #[serde(default)]
        definition: Option<ColumnDef>,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    AlterColumnType {
        table: String,
        column: String,
        to_type: String,
        #[serde(default)]
        from_type: Option<String>,
    },
    CreateIndex(IndexDef),
    DropIndex {
        name: String,
        #[serde(default)]
        definition: Option<IndexDef>,
    },
    InsertRows {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    /// Delete rows whose listed columns equal one of the given tuples.
    DeleteRows {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<SqlValue>>,
    },
    /// `UPDATE table SET set WHERE filter`. `revert` holds the values to
    /// restore on rollback.
    UpdateRows {
        table: String,
        set: Assignments,
        #[serde(default)]
        filter: Assignments,
        #[serde(default)]
        revert: Option<Assignments>,
    },
    /// Raw SQL escape hatch.
    Sql {
        sql: String,
        #[serde(default)]
        revert: Option<String>,
    },
}

impl Operation {
    /// Stable snake_case name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::CreateTable(_) => "create_table",
            Operation::DropTable { .. } => "drop_table",
            Operation::RenameTable { .. } => "rename_table",
            Operation::AddColumn { .. } => "add_column",
            Operation::DropColumn { .. } => "drop_column",
            Operation::RenameColumn { .. } => "rename_column",
            Operation::AlterColumnType { .. } => "alter_column_type",
            Operation::CreateIndex(_) => "create_index",
            Operation::DropIndex { .. } => "drop_index",
            Operation::InsertRows { .. } => "insert_rows",
            Operation::DeleteRows { .. } => "delete_rows",
            Operation::UpdateRows { .. } => "update_rows",
            Operation::Sql { .. } => "sql",
        }
    }

    /// True for operations that change the catalog rather than rows.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Operation::InsertRows { .. }
                | Operation::DeleteRows { .. }
                | Operation::UpdateRows { .. }
                | Operation::Sql { .. }
        )
    }

    /// Table the operation works on, under the name it has afterwards.
    /// `None` for raw SQL and for index drops without a stored definition.
    pub fn table(&self) -> Option<&str> {
        match self {
            Operation::CreateTable(def) => Some(&def.name),
            Operation::RenameTable { to, .. } => Some(to),
            Operation::CreateIndex(def) => Some(&def.table),
            Operation::DropIndex { definition, .. } => definition.as_ref().map(|d| d.table.as_str()),
            Operation::DropTable { table, .. }
            | Operation::AddColumn { table, .. }
            | Operation::DropColumn { table, .. }
            | Operation::RenameColumn { table, .. }
            | Operation::AlterColumnType { table, .. }
            | Operation::InsertRows { table, .. }
            | Operation::DeleteRows { table, .. }
            | Operation::UpdateRows { table, .. } => Some(table),
            Operation::Sql { .. } => None,
        }
    }

    /// The operation that undoes this one, if it carries enough information.
    pub fn inverse(&self) -> Option<Operation> {
        let inverse = match self {
            Operation::CreateTable(def) => Operation::DropTable {
                table: def.name.clone(),
                definition: Some(def.clone()),
            },
            Operation::DropTable { definition, .. } => {
                Operation::CreateTable(definition.clone()?)
            }
            Operation::RenameTable { from, to } => Operation::RenameTable {
                from: to.clone(),
                to: from.clone(),
            },
            Operation::AddColumn { table, column } => Operation::DropColumn {
                table: table.clone(),
                column: column.name.clone(),
                definition: Some(column.clone()),
            },
            Operation::DropColumn {
                table, definition, ..
            } => Operation::AddColumn {
                table: table.clone(),
                column: definition.clone()?,
            },
            Operation::RenameColumn { table, from, to } => Operation::RenameColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Operation::AlterColumnType {
                table,
                column,
                to_type,
                from_type,
            } => Operation::AlterColumnType {
                table: table.clone(),
                column: column.clone(),
                to_type: from_type.clone()?,
                from_type: Some(to_type.clone()),
            },
            Operation::CreateIndex(def) => Operation::DropIndex {
                name: def.name.clone(),
                definition: Some(def.clone()),
            },
            Operation::DropIndex { definition, .. } => {
                Operation::CreateIndex(definition.clone()?)
            }
            Operation::InsertRows {
                table,
                columns,
                rows,
            } => Operation::DeleteRows {
                table: table.clone(),
                columns: columns.clone(),
                rows: rows.clone(),
            },
            Operation::DeleteRows {
                table,
                columns,
                rows,
            } => Operation::InsertRows {
                table: table.clone(),
                columns: columns.clone(),
                rows: rows.clone(),
            },
            Operation::UpdateRows {
                table,
                set,
                filter,
                revert,
            } => {
                let revert = revert.clone()?;
                // Rows matched on a column that was just rewritten must be
                // found again by the new value.
                let filter = filter
                    .iter()
                    .map(|(col, old)| (col.clone(), set.get(col).unwrap_or(old).clone()))
                    .collect();
                Operation::UpdateRows {
                    table: table.clone(),
                    set: revert,
                    filter,
                    revert: Some(set.clone()),
                }
            }
            Operation::Sql { sql, revert } => Operation::Sql {
                sql: revert.clone()?,
                revert: Some(sql.clone()),
            },
        };
        Some(inverse)
    }

    /// Check structural well-formedness (row arity, non-empty lists, ...).
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Operation::CreateTable(def) | Operation::DropTable { definition: Some(def), .. } => {
                if def.columns.is_empty() {
                    return Err(format!("table '{}' has no columns", def.name));
                }
                if let Some(pk) = def
                    .primary_key
                    .iter()
                    .find(|pk| !def.columns.iter().any(|c| &c.name == *pk))
                {
                    return Err(format!(
                        "primary key column '{pk}' is not a column of '{}'",
                        def.name
                    ));
                }
                Ok(())
            }
            Operation::CreateIndex(def) | Operation::DropIndex { definition: Some(def), .. } => {
                if def.columns.is_empty() {
                    return Err(format!("index '{}' has no columns", def.name));
                }
                Ok(())
            }
            Operation::InsertRows { columns, rows, .. }
            | Operation::DeleteRows { columns, rows, .. } => {
                if columns.is_empty() {
                    return Err("no columns listed".to_string());
                }
                match rows.iter().position(|r| r.len() != columns.len()) {
                    Some(i) => Err(format!(
                        "row {i} has {} values but {} columns are listed",
                        rows[i].len(),
                        columns.len()
                    )),
                    None => Ok(()),
                }
            }
            Operation::UpdateRows { set, revert, .. } => {
                if set.is_empty() {
                    return Err("update assigns no columns".to_string());
                }
                if let Some(revert) = revert {
                    if !revert.keys().eq(set.keys()) {
                        return Err("revert must assign exactly the columns in set".to_string());
                    }
                }
                Ok(())
            }
            Operation::Sql { sql, .. } if sql.trim().is_empty() => {
                Err("sql operation is empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// An ordered sequence of operations executed atomically as one unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transformation(Vec<Operation>);

impl Transformation {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self(operations)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn operations(&self) -> &[Operation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    /// Derive the reverse transformation: operations in reverse order, each
    /// replaced by its inverse.
    pub fn invert(&self) -> CoreResult<Transformation> {
        self.0
            .iter()
            .enumerate()
            .rev()
            .map(|(index, op)| {
                op.inverse().ok_or(CoreError::MissingInverse {
                    index,
                    kind: op.kind(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()
            .map(Transformation)
    }
}

impl From<Vec<Operation>> for Transformation {
    fn from(operations: Vec<Operation>) -> Self {
        Self(operations)
    }
}

impl FromIterator<Operation> for Transformation {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Transformation {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[path = "operation_test.rs"]
mod tests;
