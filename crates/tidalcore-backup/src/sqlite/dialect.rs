//! Translation of dump statements into SQLite SQL
//!
//! Dumps use MySQL conventions. SQLite understands backtick identifiers but
//! not backslash escapes inside string literals, nor the
//! `SET FOREIGN_KEY_CHECKS` toggle.

use tidalcore_core::{StoreError, StoreResult};

/// A dump statement rewritten for SQLite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translated {
    /// `PRAGMA foreign_keys` should be set to this value
    ForeignKeys(bool),
    /// SQL to execute as is
    Sql(String),
}

/// Rewrite one dump statement for SQLite
pub fn translate(statement: &str) -> StoreResult<Translated> {
    if let Some(enabled) = foreign_key_toggle(statement)? {
        return Ok(Translated::ForeignKeys(enabled));
    }
    rewrite_literals(statement).map(Translated::Sql)
}

fn foreign_key_toggle(statement: &str) -> StoreResult<Option<bool>> {
    let compact: String = statement
        .trim()
        .trim_end_matches(';')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let Some(value) = compact.strip_prefix("SETFOREIGN_KEY_CHECKS=") else {
        return Ok(None);
    };

    match value {
        "0" | "OFF" => Ok(Some(false)),
        "1" | "ON" => Ok(Some(true)),
        other => Err(StoreError::Query(format!(
            "unsupported FOREIGN_KEY_CHECKS value: {}",
            other
        ))),
    }
}

/// Re-emit every quoted literal as a standard single-quoted SQL literal
fn rewrite_literals(statement: &str) -> StoreResult<String> {
    let mut out = String::with_capacity(statement.len());
    let mut chars = statement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let mut value = String::new();
                let mut closed = false;

                while let Some(inner) = chars.next() {
                    if inner == '\\' {
                        match chars.next() {
                            Some(escaped) => push_unescaped(&mut value, escaped),
                            None => break,
                        }
                    } else if inner == c {
                        // A doubled quote is an embedded quote character.
                        if chars.peek() == Some(&c) {
                            chars.next();
                            value.push(c);
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        value.push(inner);
                    }
                }

                if !closed {
                    return Err(StoreError::Query(
                        "unterminated string literal".to_string(),
                    ));
                }

                out.push('\'');
                out.push_str(&value.replace('\'', "''"));
                out.push('\'');
            }
            '`' => {
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == '`' {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn push_unescaped(value: &mut String, escaped: char) {
    match escaped {
        'n' => value.push('\n'),
        'r' => value.push('\r'),
        't' => value.push('\t'),
        'b' => value.push('\u{8}'),
        'Z' => value.push('\u{1a}'),
        // SQLite statement text cannot carry NUL.
        '0' => {}
        // Pattern escapes keep their backslash.
        '%' | '_' => {
            value.push('\\');
            value.push(escaped);
        }
        other => value.push(other),
    }
}
