//! Render operations as DuckDB SQL.
//!
//! One operation may need several statements, so rendering yields a list.
//! Row operations with no rows render to nothing. Column-level changes
//! depend on the table's current shape and are handed to
//! [`rebuild`](crate::rebuild) instead.

use crate::rebuild::ColumnChange;
use tm_core::sql_utils::{quote_ident, quote_qualified, split_schema};
use tm_core::{Assignments, ColumnDef, IndexDef, Operation, SqlValue, TableDef};

/// How an operation is carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Statements to run in order
    Statements(Vec<String>),
    /// Column change applied by rebuilding `table`
    Rebuild { table: String, change: ColumnChange },
}

/// Render `op` for execution.
pub fn render(op: &Operation) -> Rendered {
    let rebuild = |table: &str, change: ColumnChange| Rendered::Rebuild {
        table: table.to_string(),
        change,
    };
    let statements = match op {
        Operation::CreateTable(def) => vec![create_table(def)],
        Operation::DropTable { table, .. } => {
            vec![format!("DROP TABLE {}", quote_qualified(table))]
        }
        Operation::RenameTable { from, to } => {
            let (_, bare) = split_schema(to);
            vec![format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_qualified(from),
                quote_ident(bare)
            )]
        }
        Operation::AddColumn { table, column } => {
            return rebuild(table, ColumnChange::Add(column.clone()))
        }
        Operation::DropColumn { table, column, .. } => {
            return rebuild(table, ColumnChange::Drop(column.clone()))
        }
        Operation::RenameColumn { table, from, to } => {
            return rebuild(
                table,
                ColumnChange::Rename {
                    from: from.clone(),
                    to: to.clone(),
                },
            )
        }
        Operation::AlterColumnType {
            table,
            column,
            to_type,
            ..
        } => {
            return rebuild(
                table,
                ColumnChange::Retype {
                    column: column.clone(),
                    to_type: to_type.clone(),
                },
            )
        }
        Operation::CreateIndex(def) => vec![create_index(def)],
        Operation::DropIndex { name, .. } => {
            vec![format!("DROP INDEX {}", quote_qualified(name))]
        }
        Operation::InsertRows {
            table,
            columns,
            rows,
        } => insert_rows(table, columns, rows),
        Operation::DeleteRows {
            table,
            columns,
            rows,
        } => delete_rows(table, columns, rows),
        Operation::UpdateRows {
            table, set, filter, ..
        } => vec![update_rows(table, set, filter)],
        Operation::Sql { sql, .. } => vec![sql.clone()],
    };
    Rendered::Statements(statements)
}

pub(crate) fn column_sql(column: &ColumnDef) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.data_type);
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(&format!(" DEFAULT {}", default.to_sql()));
    }
    sql
}

fn create_table(def: &TableDef) -> String {
    let mut parts: Vec<String> = def.columns.iter().map(column_sql).collect();
    if !def.primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", ident_list(&def.primary_key)));
    }
    format!(
        "CREATE TABLE {} ({})",
        quote_qualified(&def.name),
        parts.join(", ")
    )
}

fn create_index(def: &IndexDef) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if def.unique { "UNIQUE " } else { "" },
        quote_ident(&def.name),
        quote_qualified(&def.table),
        ident_list(&def.columns)
    )
}

fn insert_rows(table: &str, columns: &[String], rows: &[Vec<SqlValue>]) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }
    let values = rows
        .iter()
        .map(|row| {
            let literals: Vec<String> = row.iter().map(SqlValue::to_sql).collect();
            format!("({})", literals.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ");
    vec![format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_qualified(table),
        ident_list(columns),
        values
    )]
}

fn delete_rows(table: &str, columns: &[String], rows: &[Vec<SqlValue>]) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }
    let predicate = rows
        .iter()
        .map(|row| format!("({})", conjunction(columns.iter().zip(row))))
        .collect::<Vec<_>>()
        .join(" OR ");
    vec![format!(
        "DELETE FROM {} WHERE {}",
        quote_qualified(table),
        predicate
    )]
}

fn update_rows(table: &str, set: &Assignments, filter: &Assignments) -> String {
    let assignments = set
        .iter()
        .map(|(col, value)| format!("{} = {}", quote_ident(col), value.to_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("UPDATE {} SET {}", quote_qualified(table), assignments);
    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conjunction(filter.iter()));
    }
    sql
}

/// `"a" = 1 AND "b" IS NULL`
fn conjunction<'a, S>(pairs: impl Iterator<Item = (&'a S, &'a SqlValue)>) -> String
where
    S: AsRef<str> + 'a + ?Sized,
{
    pairs
        .map(|(col, value)| {
            let col = quote_ident(col.as_ref());
            if value.is_null() {
                format!("{col} IS NULL")
            } else {
                format!("{col} = {}", value.to_sql())
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub(crate) fn ident_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
