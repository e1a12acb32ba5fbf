//! Transformation executor.
//!
//! Runs a transformation's operations strictly in listed order against a
//! connection that is already inside a transaction. The first failing
//! operation aborts the transformation; the caller's transaction discards
//! everything done before it.

use crate::connection::{TargetDb, Tx};
use crate::error::{DbError, DbResult, ExecError, ExecResult};
use crate::rebuild::TableShape;
use crate::render::{render, Rendered};
use tm_core::sql_utils::split_schema;
use tm_core::{Direction, MigrationDefinition, Transformation};

/// Execute one direction of a migration.
pub fn execute(tx: &Tx<'_>, definition: &MigrationDefinition, direction: Direction) -> ExecResult<()> {
    log::debug!(
        "Executing {} of {} ({} operations)",
        direction,
        definition,
        definition.transformation(direction).len()
    );
    execute_transformation(tx, definition.transformation(direction))
}

/// Execute every operation of `transformation` in order.
pub fn execute_transformation(tx: &Tx<'_>, transformation: &Transformation) -> ExecResult<()> {
    for (index, op) in transformation.iter().enumerate() {
        let statements = match render(op) {
            Rendered::Statements(statements) => statements,
            Rendered::Rebuild { table, change } => {
                log::debug!("op {index} ({}): rebuilding {table}", op.kind());
                TableShape::load(tx, &table)
                    .and_then(|shape| shape.rebuild(&change))
                    .map_err(|source| ExecError::Operation {
                        index,
                        kind: op.kind(),
                        statement: format!("-- rebuild {table}"),
                        source,
                    })?
            }
        };
        for statement in statements {
            log::trace!("op {index} ({}): {statement}", op.kind());
            tx.execute_batch(&statement)
                .map_err(|e| ExecError::Operation {
                    index,
                    kind: op.kind(),
                    source: DbError::from(e),
                    statement,
                })?;
        }
    }
    Ok(())
}

/// Run one direction of `definition` plus `record` (the ledger change) in a
/// single transaction.
pub fn apply<F>(
    db: &TargetDb,
    definition: &MigrationDefinition,
    direction: Direction,
    record: F,
) -> ExecResult<()>
where
    F: FnOnce(&Tx<'_>) -> DbResult<()>,
{
    db.transaction(|tx| -> ExecResult<()> {
        execute(tx, definition, direction)?;
        record(tx)?;
        Ok(())
    })
    .map_err(|err| attribute_commit_failure(definition.transformation(direction), err))
}

/// Tie a rejected COMMIT to an operation. DuckDB reports catalog conflicts
/// only at commit, so blame the last structural operation on the table it
/// names, else the last structural operation, else the last operation.
pub fn attribute_commit_failure(transformation: &Transformation, err: ExecError) -> ExecError {
    let source = match err {
        ExecError::Db(source @ DbError::CommitRejected(_)) => source,
        other => return other,
    };
    let ops = transformation.operations();
    let on_table = |table: &str| {
        ops.iter().rposition(|op| {
            op.is_structural()
                && op
                    .table()
                    .is_some_and(|t| split_schema(t).1.eq_ignore_ascii_case(table))
        })
    };
    let index = source
        .altered_table()
        .and_then(|table| on_table(split_schema(table).1))
        .or_else(|| ops.iter().rposition(|op| op.is_structural()))
        .or_else(|| ops.len().checked_sub(1));
    match index {
        Some(index) => ExecError::Commit {
            index,
            kind: ops[index].kind(),
            source,
        },
        None => ExecError::Db(source),
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
