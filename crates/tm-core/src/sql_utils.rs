//! SQL identifier and literal quoting.
//!
//! Every identifier and value that reaches generated DDL/DML passes through
//! these helpers; migration files are never spliced into SQL verbatim except
//! through the explicit `sql` operation.

/// Quote a SQL identifier.
///
/// Wraps the identifier in double quotes and doubles any embedded double
/// quotes.
///
/// # Examples
/// ```
/// use tm_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("accounts"), r#""accounts""#);
/// assert_eq!(quote_ident(r#"odd"name"#), r#""odd""name""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a potentially schema-qualified name (e.g. `ops.accounts`).
///
/// # Examples
/// ```
/// use tm_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("accounts"), r#""accounts""#);
/// assert_eq!(quote_qualified("ops.accounts"), r#""ops"."accounts""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a potentially schema-qualified name into `(schema, name)`.
///
/// Uses the last `.` as the separator; unqualified names have no schema.
///
/// # Examples
/// ```
/// use tm_core::sql_utils::split_schema;
/// assert_eq!(split_schema("accounts"), (None, "accounts"));
/// assert_eq!(split_schema("ops.accounts"), (Some("ops"), "accounts"));
/// ```
pub fn split_schema(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Render a single-quoted SQL string literal.
pub fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
#[path = "sql_utils_test.rs"]
mod tests;
