use super::*;
use tm_core::{ColumnDef, Operation, TableDef, Transformation};

fn def(version: &str) -> MigrationDefinition {
    MigrationDefinition::reversible(
        MigrationVersion::new(version),
        format!("create_t{version}"),
        Transformation::new(vec![Operation::CreateTable(TableDef {
            name: format!("t{version}"),
            columns: vec![ColumnDef::new("id", "INTEGER")],
            primary_key: vec![],
        })]),
    )
    .unwrap()
}

fn irreversible(version: &str) -> MigrationDefinition {
    MigrationDefinition::new(
        MigrationVersion::new(version),
        "one_way",
        Transformation::new(vec![Operation::Sql {
            sql: "SELECT 1".to_string(),
            revert: None,
        }]),
        Transformation::empty(),
    )
    .unwrap()
}

fn registry(versions: &[&str]) -> Registry {
    Registry::new(versions.iter().map(|v| def(v)).collect()).unwrap()
}

fn applied(registry: &Registry, versions: &[&str]) -> Vec<LedgerEntry> {
    versions
        .iter()
        .map(|v| LedgerEntry::for_definition(registry.get(&MigrationVersion::new(*v)).unwrap()))
        .collect()
}

fn v(s: &str) -> MigrationVersion {
    MigrationVersion::new(s)
}

#[test]
fn test_upgrade_latest_from_empty() {
    let reg = registry(&["1", "2", "10"]);
    let plan = upgrade(&reg, &[], &Target::Latest).unwrap();
    assert_eq!(plan.versions(), vec![v("1"), v("2"), v("10")]);
    assert_eq!(plan.from, None);
    assert_eq!(plan.to, Some(v("10")));
}

#[test]
fn test_upgrade_includes_intermediate_versions() {
    let reg = registry(&["1", "2", "3", "4"]);
    let done = applied(&reg, &["1"]);
    let plan = upgrade(&reg, &done, &Target::Version(v("3"))).unwrap();
    assert_eq!(plan.versions(), vec![v("2"), v("3")]);
    assert_eq!(plan.to, Some(v("3")));
}

#[test]
fn test_upgrade_at_target_is_empty() {
    let reg = registry(&["1", "2"]);
    let done = applied(&reg, &["1", "2"]);
    let plan = upgrade(&reg, &done, &Target::Latest).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.from, plan.to);

    let plan = upgrade(&reg, &done, &Target::Version(v("2"))).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn test_upgrade_to_older_version_is_rejected() {
    let reg = registry(&["1", "2", "3"]);
    let done = applied(&reg, &["1", "2", "3"]);
    let err = upgrade(&reg, &done, &Target::Version(v("1"))).unwrap_err();
    assert!(matches!(err, MigrateError::TargetBehind { .. }));

    let err = upgrade(&reg, &done, &Target::None).unwrap_err();
    assert!(matches!(err, MigrateError::TargetBehind { .. }));
}

#[test]
fn test_upgrade_to_none_on_empty_ledger_is_noop() {
    let reg = registry(&["1"]);
    assert!(upgrade(&reg, &[], &Target::None).unwrap().is_empty());
}

#[test]
fn test_upgrade_unknown_target() {
    let reg = registry(&["1", "2"]);
    match upgrade(&reg, &[], &Target::Version(v("5"))).unwrap_err() {
        MigrateError::TargetNotFound { target, location } => {
            assert_eq!(target, v("5"));
            assert_eq!(location, "registry");
        }
        other => panic!("expected TargetNotFound, got {other:?}"),
    }
}

#[test]
fn test_downgrade_reverts_in_descending_order() {
    let reg = registry(&["1", "2", "3"]);
    let done = applied(&reg, &["1", "2", "3"]);
    let plan = downgrade(&reg, &done, &Target::Version(v("1"))).unwrap();
    assert_eq!(plan.direction, Direction::Down);
    assert_eq!(plan.versions(), vec![v("3"), v("2")]);
    assert_eq!(plan.to, Some(v("1")));

    let plan = downgrade(&reg, &done, &Target::None).unwrap();
    assert_eq!(plan.versions(), vec![v("3"), v("2"), v("1")]);
    assert_eq!(plan.to, None);
}

#[test]
fn test_downgrade_latest_is_noop() {
    let reg = registry(&["1", "2"]);
    let done = applied(&reg, &["1", "2"]);
    assert!(downgrade(&reg, &done, &Target::Latest).unwrap().is_empty());
}

#[test]
fn test_downgrade_target_must_be_applied() {
    let reg = registry(&["1", "2", "3"]);
    let done = applied(&reg, &["1"]);
    match downgrade(&reg, &done, &Target::Version(v("3"))).unwrap_err() {
        MigrateError::TargetNotFound { location, .. } => assert_eq!(location, "ledger"),
        other => panic!("expected TargetNotFound, got {other:?}"),
    }
}

#[test]
fn test_downgrade_refuses_irreversible_step() {
    let reg = Registry::new(vec![def("1"), irreversible("2"), def("3")]).unwrap();
    let done = applied(&reg, &["1", "2", "3"]);

    // reverting only 3 is fine
    assert_eq!(
        downgrade(&reg, &done, &Target::Version(v("2"))).unwrap().len(),
        1
    );
    match downgrade(&reg, &done, &Target::None).unwrap_err() {
        MigrateError::Irreversible { version } => assert_eq!(version, v("2")),
        other => panic!("expected Irreversible, got {other:?}"),
    }
}

#[test]
fn test_checksum_mismatch_blocks_both_directions() {
    let reg = registry(&["1", "2"]);
    let mut done = applied(&reg, &["1"]);
    done[0].checksum = "0".repeat(64);

    assert!(matches!(
        upgrade(&reg, &done, &Target::Latest).unwrap_err(),
        MigrateError::ChecksumMismatch { .. }
    ));
    assert!(matches!(
        downgrade(&reg, &done, &Target::None).unwrap_err(),
        MigrateError::ChecksumMismatch { .. }
    ));
}

#[test]
fn test_gap_in_ledger_is_rejected() {
    let reg = registry(&["1", "2", "3"]);
    let done = applied(&reg, &["1", "3"]);
    match upgrade(&reg, &done, &Target::Latest).unwrap_err() {
        MigrateError::LedgerGap { missing, applied } => {
            assert_eq!(missing, v("2"));
            assert_eq!(applied, v("3"));
        }
        other => panic!("expected LedgerGap, got {other:?}"),
    }
}

#[test]
fn test_unknown_applied_version_is_rejected() {
    let reg = registry(&["1", "2"]);
    let mut done = applied(&reg, &["1"]);
    done.push(LedgerEntry::for_definition(&def("9")));
    assert!(matches!(
        upgrade(&reg, &done, &Target::Latest).unwrap_err(),
        MigrateError::UnknownAppliedVersion { .. }
    ));
}

#[test]
fn test_discrepancies_lists_everything() {
    let reg = registry(&["1", "2", "3"]);
    let mut done = applied(&reg, &["1", "3"]);
    done[0].checksum = "0".repeat(64);
    done.push(LedgerEntry::for_definition(&def("7")));

    let found = discrepancies(&reg, &done);
    assert_eq!(found.len(), 3);
    assert!(found.contains(&Discrepancy::UnknownAppliedVersion { version: v("7") }));
    assert!(found.contains(&Discrepancy::Gap {
        missing: v("2"),
        applied: v("7"),
    }));
    assert!(found
        .iter()
        .any(|d| matches!(d, Discrepancy::ChecksumMismatch { version, .. } if version == &v("1"))));
}

#[test]
fn test_discrepancies_empty_for_consistent_ledger() {
    let reg = registry(&["1", "2"]);
    let done = applied(&reg, &["1"]);
    assert!(discrepancies(&reg, &done).is_empty());
    assert!(validate(&reg, &done).is_ok());
}
