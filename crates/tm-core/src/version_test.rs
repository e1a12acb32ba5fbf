use super::*;

fn v(s: &str) -> MigrationVersion {
    MigrationVersion::new(s)
}

#[test]
fn test_parse_rejects_empty() {
    assert!(matches!(
        MigrationVersion::parse(""),
        Err(CoreError::InvalidVersion { .. })
    ));
}

#[test]
fn test_parse_rejects_whitespace_and_slashes() {
    assert!(MigrationVersion::parse("2024 01").is_err());
    assert!(MigrationVersion::parse("../v1").is_err());
}

#[test]
fn test_parse_rejects_underscore() {
    // would be split apart again when read back from `<version>_<name>.yml`
    assert!(matches!(
        MigrationVersion::parse("2024_01"),
        Err(CoreError::InvalidVersion { .. })
    ));
}

#[test]
fn test_parse_accepts_timestamp_and_semver_like() {
    assert_eq!(v("20240101120000").as_str(), "20240101120000");
    assert_eq!(v("v1.2-hotfix.3").as_str(), "v1.2-hotfix.3");
}

#[test]
fn test_numeric_versions_compare_numerically() {
    assert!(v("9") < v("10"));
    assert!(v("2") < v("0010"));
    assert!(v("20240101120000") < v("20240102000000"));
}

#[test]
fn test_leading_zeros_tie_break_on_raw_string() {
    assert_ne!(v("007"), v("7"));
    assert_ne!(v("007").cmp(&v("7")), Ordering::Equal);
}

#[test]
fn test_numeric_sorts_before_non_numeric() {
    assert!(v("999") < v("1a"));
    assert!(v("10") < v("9a"));
}

#[test]
fn test_non_numeric_compare_bytewise() {
    assert!(v("V1") < v("V2"));
    assert!(v("a") < v("b"));
}

#[test]
fn test_order_is_transitive_across_kinds() {
    let mut versions = vec![v("1a"), v("10"), v("9"), v("b"), v("0")];
    versions.sort();
    let sorted: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
    assert_eq!(sorted, vec!["0", "9", "10", "1a", "b"]);
}

#[test]
fn test_deserialize_validates() {
    let ok: MigrationVersion = serde_json::from_str("\"20240101\"").unwrap();
    assert_eq!(ok, "20240101");
    let bad: Result<MigrationVersion, _> = serde_json::from_str("\"\"");
    assert!(bad.is_err());
}

#[test]
fn test_from_str() {
    let parsed: MigrationVersion = "42".parse().unwrap();
    assert_eq!(parsed, v("42"));
}
