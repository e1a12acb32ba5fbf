use super::*;

fn accounts_table() -> TableDef {
    TableDef {
        name: "accounts".to_string(),
        columns: vec![
            ColumnDef::new("id", "INTEGER").not_null(),
            ColumnDef::new("username", "VARCHAR").not_null(),
        ],
        primary_key: vec!["id".to_string()],
    }
}

fn assignments(pairs: &[(&str, SqlValue)]) -> Assignments {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_sql_value_literals() {
    assert_eq!(SqlValue::Null.to_sql(), "NULL");
    assert_eq!(SqlValue::Bool(false).to_sql(), "FALSE");
    assert_eq!(SqlValue::Integer(-3).to_sql(), "-3");
    assert_eq!(SqlValue::Float(1.0).to_sql(), "1.0");
    assert_eq!(SqlValue::from("o'hare").to_sql(), "'o''hare'");
}

#[test]
fn test_sql_value_deserializes_untagged() {
    let values: Vec<SqlValue> = serde_yaml::from_str("[~, true, 7, 2.5, hello]").unwrap();
    assert_eq!(
        values,
        vec![
            SqlValue::Null,
            SqlValue::Bool(true),
            SqlValue::Integer(7),
            SqlValue::Float(2.5),
            SqlValue::Text("hello".to_string()),
        ]
    );
}

#[test]
fn test_operation_yaml_tagging() {
    let yaml = r#"
- op: add_column
  table: accounts
  column:
    name: locked
    type: BOOLEAN
    nullable: false
    default: false
- op: update_rows
  table: accounts
  set: { password_hash: "new" }
  filter: { username: admin }
  revert: { password_hash: "old" }
"#;
    let t: Transformation = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.operations()[0].kind(), "add_column");
    match &t.operations()[0] {
        Operation::AddColumn { column, .. } => {
            assert!(!column.nullable);
            assert_eq!(column.default, Some(SqlValue::Bool(false)));
        }
        other => panic!("unexpected operation {other:?}"),
    }
}

#[test]
fn test_create_drop_table_are_inverses() {
    let create = Operation::CreateTable(accounts_table());
    let drop = create.inverse().unwrap();
    assert_eq!(drop.kind(), "drop_table");
    assert_eq!(drop.inverse().unwrap(), create);
}

#[test]
fn test_drop_without_definition_is_irreversible() {
    let drop = Operation::DropTable {
        table: "accounts".to_string(),
        definition: None,
    };
    assert!(drop.inverse().is_none());

    let drop_col = Operation::DropColumn {
        table: "accounts".to_string(),
        column: "locked".to_string(),
        definition: None,
    };
    assert!(drop_col.inverse().is_none());
}

#[test]
fn test_rename_inverse_swaps_names() {
    let op = Operation::RenameColumn {
        table: "accounts".to_string(),
        from: "pw".to_string(),
        to: "password_hash".to_string(),
    };
    assert_eq!(
        op.inverse().unwrap(),
        Operation::RenameColumn {
            table: "accounts".to_string(),
            from: "password_hash".to_string(),
            to: "pw".to_string(),
        }
    );
}

#[test]
fn test_alter_type_needs_from_type() {
    let op = Operation::AlterColumnType {
        table: "t".to_string(),
        column: "c".to_string(),
        to_type: "BIGINT".to_string(),
        from_type: None,
    };
    assert!(op.inverse().is_none());
}

#[test]
fn test_insert_delete_rows_are_inverses() {
    let insert = Operation::InsertRows {
        table: "accounts".to_string(),
        columns: vec!["id".to_string()],
        rows: vec![vec![SqlValue::Integer(1)]],
    };
    let delete = insert.inverse().unwrap();
    assert_eq!(delete.kind(), "delete_rows");
    assert_eq!(delete.inverse().unwrap(), insert);
}

#[test]
fn test_update_rows_inverse_refilters_on_new_value() {
    let op = Operation::UpdateRows {
        table: "accounts".to_string(),
        set: assignments(&[("role", "admin".into())]),
        filter: assignments(&[("role", "root".into()), ("id", SqlValue::Integer(1))]),
        revert: Some(assignments(&[("role", "root".into())])),
    };
    match op.inverse().unwrap() {
        Operation::UpdateRows {
            set,
            filter,
            revert,
            ..
        } => {
            assert_eq!(set, assignments(&[("role", "root".into())]));
            assert_eq!(
                filter,
                assignments(&[("role", "admin".into()), ("id", SqlValue::Integer(1))])
            );
            assert_eq!(revert, Some(assignments(&[("role", "admin".into())])));
        }
        other => panic!("unexpected inverse {other:?}"),
    }
}

#[test]
fn test_update_rows_without_revert_is_irreversible() {
    let op = Operation::UpdateRows {
        table: "accounts".to_string(),
        set: assignments(&[("password_hash", "x".into())]),
        filter: Assignments::new(),
        revert: None,
    };
    assert!(op.inverse().is_none());
}

#[test]
fn test_invert_reverses_order() {
    let t = Transformation::new(vec![
        Operation::CreateTable(accounts_table()),
        Operation::AddColumn {
            table: "accounts".to_string(),
            column: ColumnDef::new("locked", "BOOLEAN").with_default(false),
        },
    ]);
    let inv = t.invert().unwrap();
    let kinds: Vec<&str> = inv.iter().map(|op| op.kind()).collect();
    assert_eq!(kinds, vec!["drop_column", "drop_table"]);
}

#[test]
fn test_invert_reports_first_missing_inverse_index() {
    let t = Transformation::new(vec![
        Operation::CreateTable(accounts_table()),
        Operation::Sql {
            sql: "SELECT 1".to_string(),
            revert: None,
        },
    ]);
    match t.invert() {
        Err(CoreError::MissingInverse { index, kind }) => {
            assert_eq!(index, 1);
            assert_eq!(kind, "sql");
        }
        other => panic!("expected MissingInverse, got {other:?}"),
    }
}

#[test]
fn test_validate_row_arity() {
    let op = Operation::InsertRows {
        table: "accounts".to_string(),
        columns: vec!["id".to_string(), "username".to_string()],
        rows: vec![vec![SqlValue::Integer(1)]],
    };
    let err = op.validate().unwrap_err();
    assert!(err.contains("row 0"));
}

#[test]
fn test_validate_primary_key_columns() {
    let mut def = accounts_table();
    def.primary_key = vec!["missing".to_string()];
    assert!(Operation::CreateTable(def).validate().is_err());
}

#[test]
fn test_validate_revert_columns_match_set() {
    let op = Operation::UpdateRows {
        table: "accounts".to_string(),
        set: assignments(&[("a", SqlValue::Integer(1))]),
        filter: Assignments::new(),
        revert: Some(assignments(&[("b", SqlValue::Integer(1))])),
    };
    assert!(op.validate().is_err());
}

#[test]
fn test_table_follows_renames() {
    let rename = Operation::RenameTable {
        from: "users".to_string(),
        to: "accounts".to_string(),
    };
    assert_eq!(rename.table(), Some("accounts"));
    assert_eq!(Operation::CreateTable(accounts_table()).table(), Some("accounts"));
    let drop_index = Operation::DropIndex {
        name: "accounts_username_idx".to_string(),
        definition: None,
    };
    assert_eq!(drop_index.table(), None);
    let sql = Operation::Sql {
        sql: "SELECT 1".to_string(),
        revert: None,
    };
    assert_eq!(sql.table(), None);
}

#[test]
fn test_structural_operations() {
    let add = Operation::AddColumn {
        table: "accounts".to_string(),
        column: ColumnDef::new("locked", "BOOLEAN"),
    };
    assert!(add.is_structural());
    assert!(add.inverse().unwrap().is_structural());
    let insert = Operation::InsertRows {
        table: "accounts".to_string(),
        columns: vec!["id".to_string()],
        rows: vec![vec![SqlValue::Integer(1)]],
    };
    assert!(!insert.is_structural());
}
