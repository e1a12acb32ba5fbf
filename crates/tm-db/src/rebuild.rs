//! Column changes carried out by rebuilding the table.
//!
//! DuckDB cannot commit a transaction that alters a populated table more
//! than once, and `SET NOT NULL` fails on a table with rows. Column-level
//! operations therefore never issue `ALTER TABLE`: the rows are copied to a
//! scratch table, the table is recreated in its new shape (keys, checks and
//! indexes included) and the rows are copied back, all inside the
//! migration's transaction.
//!
//! Tables that take part in foreign keys cannot be rebuilt; change them
//! with a `sql` operation instead. Indexes are recreated verbatim, so an
//! index on a column that is dropped or renamed has to be dropped first.

use crate::error::{DbError, DbResult};
use crate::render::{column_sql, ident_list};
use duckdb::Connection;
use tm_core::sql_utils::{quote_ident, split_schema};
use tm_core::ColumnDef;

/// A column-level change to an existing table.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange {
    Add(ColumnDef),
    Drop(String),
    Rename { from: String, to: String },
    Retype { column: String, to_type: String },
}

/// Column as DuckDB reports it. `default` is the SQL expression text.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// Primary key or unique constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyConstraint {
    pub primary: bool,
    pub columns: Vec<String>,
}

/// Everything needed to recreate a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ShapeColumn>,
    pub keys: Vec<KeyConstraint>,
    /// `CHECK (...)` clauses, verbatim
    pub checks: Vec<String>,
    /// `CREATE INDEX` statements, verbatim
    pub indexes: Vec<String>,
}

impl TableShape {
    /// Read the current shape of `table` (optionally schema-qualified).
    pub fn load(conn: &Connection, table: &str) -> DbResult<Self> {
        let (schema, name) = match split_schema(table) {
            (Some(schema), name) => (schema, name),
            (None, name) => ("main", name),
        };
        let mut stmt = conn.prepare(
            "SELECT column_name, data_type, is_nullable, column_default
             FROM duckdb_columns()
             WHERE database_name = current_database() AND schema_name = ? AND table_name = ?
             ORDER BY column_index",
        )?;
        let columns = stmt
            .query_map(duckdb::params![schema, name], |row| {
                Ok(ShapeColumn {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    nullable: row.get(2)?,
                    default: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(DbError::TableNotFound(table.to_string()));
        }

        let mut stmt = conn.prepare(
            "SELECT constraint_index, constraint_type,
                    unnest(constraint_column_names) AS column_name,
                    unnest(generate_series(1, len(constraint_column_names))) AS position
             FROM duckdb_constraints()
             WHERE database_name = current_database() AND schema_name = ? AND table_name = ?
               AND constraint_type IN ('PRIMARY KEY', 'UNIQUE')
             ORDER BY constraint_index, position",
        )?;
        let key_columns = stmt
            .query_map(duckdb::params![schema, name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut keys: Vec<(i64, KeyConstraint)> = Vec::new();
        for (index, kind, column) in key_columns {
            match keys.last_mut() {
                Some((last, key)) if *last == index => key.columns.push(column),
                _ => keys.push((
                    index,
                    KeyConstraint {
                        primary: kind == "PRIMARY KEY",
                        columns: vec![column],
                    },
                )),
            }
        }

        let mut stmt = conn.prepare(
            "SELECT constraint_type, constraint_text
             FROM duckdb_constraints()
             WHERE database_name = current_database() AND schema_name = ? AND table_name = ?
               AND constraint_type IN ('CHECK', 'FOREIGN KEY')
             ORDER BY constraint_index",
        )?;
        let mut checks = Vec::new();
        for row in stmt.query_map(duckdb::params![schema, name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })? {
            let (kind, text) = row?;
            if kind == "FOREIGN KEY" {
                return Err(DbError::ExecutionError(format!(
                    "cannot rebuild {table}: it has foreign key constraints ({text})"
                )));
            }
            checks.push(text);
        }

        let mut stmt = conn.prepare(
            "SELECT sql FROM duckdb_indexes()
             WHERE database_name = current_database() AND schema_name = ? AND table_name = ?
               AND sql IS NOT NULL
             ORDER BY index_name",
        )?;
        let indexes = stmt
            .query_map(duckdb::params![schema, name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            schema: schema.to_string(),
            name: name.to_string(),
            columns,
            keys: keys.into_iter().map(|(_, key)| key).collect(),
            checks,
            indexes,
        })
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    fn check(&self, change: &ColumnChange) -> DbResult<()> {
        let table = format!("{}.{}", self.schema, self.name);
        let fail = |reason: String| Err(DbError::ExecutionError(format!("{table}: {reason}")));
        match change {
            ColumnChange::Add(def) if self.has_column(&def.name) => {
                fail(format!("column \"{}\" already exists", def.name))
            }
            ColumnChange::Drop(column)
            | ColumnChange::Rename { from: column, .. }
            | ColumnChange::Retype { column, .. }
                if !self.has_column(column) =>
            {
                fail(format!("column \"{column}\" does not exist"))
            }
            ColumnChange::Rename { to, .. } if self.has_column(to) => {
                fail(format!("column \"{to}\" already exists"))
            }
            ColumnChange::Drop(_) if self.columns.len() == 1 => {
                fail("cannot drop the only column".to_string())
            }
            ColumnChange::Drop(column) if self.keys.iter().any(|k| k.columns.contains(column)) => {
                fail(format!("column \"{column}\" is part of a key"))
            }
            _ => Ok(()),
        }
    }

    /// Statements that give the table its new shape and keep its rows.
    pub fn rebuild(&self, change: &ColumnChange) -> DbResult<Vec<String>> {
        self.check(change)?;

        let mut definitions = Vec::new();
        let mut targets = Vec::new();
        let mut sources = Vec::new();
        for column in &self.columns {
            let (name, data_type, source) = match change {
                ColumnChange::Drop(dropped) if *dropped == column.name => continue,
                ColumnChange::Rename { from, to } if *from == column.name => {
                    (to.as_str(), column.data_type.as_str(), quote_ident(from))
                }
                ColumnChange::Retype {
                    column: retyped,
                    to_type,
                } if *retyped == column.name => (
                    column.name.as_str(),
                    to_type.as_str(),
                    format!("CAST({} AS {to_type})", quote_ident(&column.name)),
                ),
                _ => (
                    column.name.as_str(),
                    column.data_type.as_str(),
                    quote_ident(&column.name),
                ),
            };
            let mut sql = format!("{} {data_type}", quote_ident(name));
            if !column.nullable {
                sql.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default {
                sql.push_str(&format!(" DEFAULT {default}"));
            }
            definitions.push(sql);
            targets.push(quote_ident(name));
            sources.push(source);
        }
        // rows are copied back without it, so its default fills them
        if let ColumnChange::Add(def) = change {
            definitions.push(column_sql(def));
        }

        for key in &self.keys {
            let columns: Vec<String> = key
                .columns
                .iter()
                .map(|c| match change {
                    ColumnChange::Rename { from, to } if from == c => to.clone(),
                    _ => c.clone(),
                })
                .collect();
            let kind = if key.primary { "PRIMARY KEY" } else { "UNIQUE" };
            definitions.push(format!("{kind} ({})", ident_list(&columns)));
        }
        definitions.extend(self.checks.iter().cloned());

        let table = format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name));
        let scratch = format!(
            "{}.{}",
            quote_ident(&self.schema),
            quote_ident(&format!("__tidemark_rebuild_{}", self.name))
        );
        let mut statements = vec![
            format!("CREATE TABLE {scratch} AS SELECT * FROM {table}"),
            format!("DROP TABLE {table}"),
            format!("CREATE TABLE {table} ({})", definitions.join(", ")),
        ];
        // indexes go on while the table is still empty
        statements.extend(self.indexes.iter().cloned());
        statements.push(format!(
            "INSERT INTO {table} ({}) SELECT {} FROM {scratch}",
            targets.join(", "),
            sources.join(", ")
        ));
        statements.push(format!("DROP TABLE {scratch}"));
        Ok(statements)
    }
}

#[cfg(test)]
#[path = "rebuild_test.rs"]
mod tests;
