//! Error message sanitisation
//!
//! Store errors end up in HTTP responses and CLI output. Before that they are
//! reduced to a safe category or a short excerpt so credentials, connection
//! strings and file-system layout are not disclosed.

/// Longest database error excerpt passed through verbatim
pub const MAX_DATABASE_ERROR_LENGTH: usize = 160;

/// Helper for sanitizing database-specific errors
pub struct DatabaseErrorSanitizer;

impl DatabaseErrorSanitizer {
    /// Sanitize a database error with generic safe messages
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tidalcore_core::sanitization::DatabaseErrorSanitizer;
    ///
    /// assert_eq!(
    ///     DatabaseErrorSanitizer::sanitize(&"password authentication failed for user root"),
    ///     "Authentication failed"
    /// );
    /// assert_eq!(
    ///     DatabaseErrorSanitizer::sanitize(&"UNIQUE constraint failed: users.id"),
    ///     "Database error: UNIQUE constraint failed: users.id"
    /// );
    /// ```
    pub fn sanitize<E: std::fmt::Display>(error: &E) -> String {
        let error_str = error.to_string();
        let error_lower = error_str.to_lowercase();

        if error_lower.contains("password")
            || error_lower.contains("auth")
            || error_lower.contains("credential")
        {
            return "Authentication failed".to_string();
        }

        if error_lower.contains("unable to open") || error_lower.contains("connection") {
            return "Connection failed".to_string();
        }

        if error_lower.contains("timeout")
            || error_lower.contains("timed out")
            || error_lower.contains("database is locked")
        {
            return "Operation timed out".to_string();
        }

        if error_lower.contains("permission")
            || error_lower.contains("access denied")
            || error_lower.contains("readonly")
        {
            return "Permission denied".to_string();
        }

        let single_line = error_str.replace(['\n', '\r'], " ");
        if single_line.chars().count() > MAX_DATABASE_ERROR_LENGTH {
            "Database operation failed".to_string()
        } else {
            format!("Database error: {}", single_line)
        }
    }

    /// Categorize error type for logging (safe for logs)
    pub fn categorize<E: std::fmt::Display>(error: &E) -> &'static str {
        let error_str = error.to_string().to_lowercase();

        if error_str.contains("connection") || error_str.contains("unable to open") {
            "connection"
        } else if error_str.contains("timeout") || error_str.contains("locked") {
            "timeout"
        } else if error_str.contains("auth") || error_str.contains("permission") {
            "authorization"
        } else if error_str.contains("not found") || error_str.contains("no rows") {
            "not_found"
        } else if error_str.contains("constraint") || error_str.contains("unique") {
            "constraint_violation"
        } else if error_str.contains("syntax") || error_str.contains("no such") {
            "invalid_input"
        } else {
            "unknown"
        }
    }
}
