//! Validation for the SQL accepted by [`Transform::sql`](crate::transform::Transform::sql)
//! and [`Transform::filter`](crate::transform::Transform::filter).
//!
//! Queries run against an in-memory copy of the data, but they must still be
//! read-only single statements: a check never changes anything.

use crate::error::{CheckError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const MAX_QUERY_LENGTH: usize = 10_000;

/// SQL validation for the expression mini-language.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Checks that `query` is a single read-only `SELECT` or `WITH` statement.
    ///
    /// # Examples
    /// ```rust
    /// use term_check::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_query("SELECT * FROM data WHERE a > 1").is_ok());
    /// assert!(SqlSecurity::validate_query("DROP TABLE data").is_err());
    /// assert!(SqlSecurity::validate_query("SELECT 1; DELETE FROM data").is_err());
    /// ```
    pub fn validate_query(query: &str) -> Result<()> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(CheckError::InvalidExpression(
                "query cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_QUERY_LENGTH {
            return Err(CheckError::InvalidExpression(format!(
                "query too long (max {MAX_QUERY_LENGTH} characters)"
            )));
        }
        if trimmed.contains('\0') {
            return Err(CheckError::InvalidExpression(
                "query cannot contain null bytes".to_string(),
            ));
        }

        let lower = trimmed.to_lowercase();
        if !(starts_with_word(&lower, "select") || starts_with_word(&lower, "with")) {
            return Err(CheckError::InvalidExpression(
                "query must start with SELECT or WITH".to_string(),
            ));
        }
        Self::check_statement_shape(&lower)?;
        Self::check_keywords(&lower)
    }

    /// Checks a boolean `WHERE` predicate for [`Transform::filter`](crate::transform::Transform::filter).
    pub fn validate_predicate(predicate: &str) -> Result<()> {
        if predicate.trim().is_empty() {
            return Err(CheckError::InvalidExpression(
                "filter predicate cannot be empty".to_string(),
            ));
        }
        Self::validate_query(&format!("SELECT * FROM data WHERE {predicate}"))
    }

    fn check_statement_shape(lower: &str) -> Result<()> {
        let body = strip_string_literals(lower);
        let body = body.trim_end().trim_end_matches(';');
        if body.contains(';') {
            return Err(CheckError::InvalidExpression(
                "only a single statement is allowed".to_string(),
            ));
        }
        for marker in ["--", "/*", "*/"] {
            if body.contains(marker) {
                return Err(CheckError::InvalidExpression(format!(
                    "comments are not allowed (found '{marker}')"
                )));
            }
        }
        Ok(())
    }

    /// Rejects statements that start with a modifying keyword: at the top
    /// level, inside parentheses, or right after a closing parenthesis as in
    /// `WITH x AS (...) INSERT ...`. The same words are fine as column names,
    /// e.g. `WHERE set > 1`.
    fn check_keywords(lower: &str) -> Result<()> {
        static FORBIDDEN: OnceLock<HashSet<&'static str>> = OnceLock::new();
        let forbidden = FORBIDDEN.get_or_init(|| {
            [
                "drop", "create", "alter", "truncate", "insert", "update", "delete", "merge",
                "copy", "set", "grant", "revoke", "exec", "execute", "declare", "begin",
                "commit", "rollback", "attach", "detach", "explain", "prepare", "deallocate",
            ]
            .into_iter()
            .collect()
        });
        static LEADING: Lazy<Option<Regex>> =
            Lazy::new(|| Regex::new(r"(?:^|[()])\s*([a-z_][a-z0-9_]*)\s+[a-z_*(]").ok());

        let body = strip_string_literals(lower);
        let Some(leading) = LEADING.as_ref() else {
            return Ok(());
        };
        for caps in leading.captures_iter(&body) {
            if let Some(word) = caps.get(1).filter(|w| forbidden.contains(w.as_str())) {
                return Err(CheckError::InvalidExpression(format!(
                    "query contains forbidden statement '{}'",
                    word.as_str().to_uppercase()
                )));
            }
        }
        Ok(())
    }
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .map(|rest| rest.is_empty() || !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
        .unwrap_or(false)
}

/// Blanks out the contents of quoted literals and identifiers so keyword and
/// separator scans only see SQL syntax.
fn strip_string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                out.push(c);
            }
            Some(_) => out.push(' '),
            None => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_read_only_queries() {
        assert!(SqlSecurity::validate_query("SELECT * FROM data").is_ok());
        assert!(SqlSecurity::validate_query("  select a, b from data limit 3;").is_ok());
        assert!(SqlSecurity::validate_query(
            "WITH t AS (SELECT a FROM data) SELECT count(*) FROM t"
        )
        .is_ok());
        assert!(SqlSecurity::validate_query("SELECT * FROM data WHERE note = 'drop; --'").is_ok());
        assert!(SqlSecurity::validate_query("SELECT updated_at, offset_x FROM data").is_ok());
    }

    #[test]
    fn test_rejects_modifications() {
        for query in [
            "DROP TABLE data",
            "SELECT * FROM data; DROP TABLE data",
            "SELECT * FROM data -- trailing",
            "SELECT /* hidden */ * FROM data",
            "INSERT INTO data VALUES (1)",
            "WITH x AS (DELETE FROM data) SELECT 1",
            "selected FROM data",
            "",
        ] {
            let err = SqlSecurity::validate_query(query).unwrap_err();
            assert!(matches!(err, CheckError::InvalidExpression(_)), "{query}");
        }
    }

    #[test]
    fn test_keywords_allowed_as_column_names() {
        assert!(SqlSecurity::validate_predicate("set > 1 AND begin < 3").is_ok());
        assert!(SqlSecurity::validate_query("SELECT set, (begin + 1) AS b FROM data").is_ok());
        assert!(SqlSecurity::validate_query("SELECT a AS set FROM data").is_ok());
        assert!(SqlSecurity::validate_query("SELECT * FROM (DELETE FROM data)").is_err());
        assert!(SqlSecurity::validate_query(
            "WITH x AS (SELECT 1) INSERT INTO data SELECT * FROM x"
        )
        .is_err());
    }

    #[test]
    fn test_predicate() {
        assert!(SqlSecurity::validate_predicate("sepal_length < 5 AND species = 'setosa'").is_ok());
        assert!(SqlSecurity::validate_predicate("1 = 1; DELETE FROM data").is_err());
        assert!(SqlSecurity::validate_predicate("  ").is_err());
    }
}
