//! Identifier guard and text escaping for store commands.
//!
//! The store speaks a text command language with no parameter binding, so
//! every value is either shape-checked (slugs, record identifiers) or
//! escaped (free text) before it is interpolated. The patterns and the
//! escaping order here are the compatibility contract with the admin API,
//! which applies the same rules.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Minimum slug length in bytes.
pub const SLUG_MIN_LEN: usize = 2;

/// Maximum slug length in bytes.
pub const SLUG_MAX_LEN: usize = 100;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$").expect("invalid slug pattern"));

static RECORD_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(form|question|submission|form_stats):[a-zA-Z0-9]+$")
        .expect("invalid record id pattern")
});

/// Why a value was refused by the guard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("invalid slug length: {0}")]
    SlugLength(usize),

    #[error("invalid slug format")]
    SlugFormat,

    #[error("invalid record ID format")]
    RecordIdFormat,
}

/// Check a form slug: 2 to 100 bytes, lowercase alphanumerics and inner
/// hyphens only.
pub fn validate_slug(slug: &str) -> Result<(), GuardError> {
    if slug.len() < SLUG_MIN_LEN || slug.len() > SLUG_MAX_LEN {
        return Err(GuardError::SlugLength(slug.len()));
    }
    if !SLUG_PATTERN.is_match(slug) {
        return Err(GuardError::SlugFormat);
    }
    Ok(())
}

/// Check a record identifier: `<table>:<alphanumeric>` for one of the
/// tables this service touches.
pub fn validate_record_id(id: &str) -> Result<(), GuardError> {
    if !RECORD_ID_PATTERN.is_match(id) {
        return Err(GuardError::RecordIdFormat);
    }
    Ok(())
}

/// Escape free text for a single-quoted string literal.
///
/// Order matters: NUL bytes are removed, then backslashes are doubled
/// before any replacement that introduces a backslash.
pub fn escape_text(s: &str) -> String {
    s.replace('\0', "")
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// A slug that passed [`validate_slug`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    pub fn parse(raw: &str) -> Result<Self, GuardError> {
        validate_slug(raw)?;
        Ok(Slug(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The slug escaped for a quoted literal. Validated slugs never contain
    /// escapable characters; escaping anyway keeps the two checks independent.
    pub fn escaped(&self) -> String {
        escape_text(&self.0)
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record identifier that passed [`validate_record_id`].
///
/// Safe to splice unquoted into a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn parse(raw: &str) -> Result<Self, GuardError> {
        validate_record_id(raw)?;
        Ok(RecordId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table part, e.g. `form` for `form:abc123`.
    pub fn table(&self) -> &str {
        self.0.split_once(':').map(|(t, _)| t).unwrap_or_default()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_accepts_lowercase_with_inner_hyphens() {
        assert!(validate_slug("test-form").is_ok());
        assert!(validate_slug("ab").is_ok());
        assert!(validate_slug("a1-b2-c3").is_ok());
    }

    #[test]
    fn slug_rejects_bad_shapes() {
        assert_eq!(validate_slug("-test"), Err(GuardError::SlugFormat));
        assert_eq!(validate_slug("test-"), Err(GuardError::SlugFormat));
        assert_eq!(validate_slug("Test-Form"), Err(GuardError::SlugFormat));
        assert_eq!(validate_slug("test form"), Err(GuardError::SlugFormat));
        assert_eq!(validate_slug("test'form"), Err(GuardError::SlugFormat));
    }

    #[test]
    fn slug_length_is_checked_independently() {
        assert_eq!(validate_slug("a"), Err(GuardError::SlugLength(1)));
        assert_eq!(validate_slug(""), Err(GuardError::SlugLength(0)));
        let long = "a".repeat(101);
        assert_eq!(validate_slug(&long), Err(GuardError::SlugLength(101)));
        assert!(validate_slug(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn record_id_requires_known_table() {
        assert!(validate_record_id("form:abc123").is_ok());
        assert!(validate_record_id("form_stats:X9").is_ok());
        assert!(validate_record_id("submission:AbC").is_ok());
        assert!(validate_record_id("table:abc").is_err());
        assert!(validate_record_id("form:abc 123").is_err());
        assert!(validate_record_id("; DROP ALL").is_err());
        assert!(validate_record_id("form:").is_err());
        assert!(validate_record_id("form:abc;").is_err());
    }

    #[test]
    fn escape_handles_backslash_before_quote() {
        assert_eq!(escape_text(r"a\'b"), r"a\\\'b");
        assert_eq!(escape_text("it's"), r"it\'s");
    }

    #[test]
    fn escape_strips_nul_and_escapes_controls() {
        assert_eq!(escape_text("a\0b"), "ab");
        assert_eq!(escape_text("line1\nline2\r\tend"), r"line1\nline2\r\tend");
    }

    #[test]
    fn record_id_table() {
        let id = RecordId::parse("form:abc123").unwrap();
        assert_eq!(id.table(), "form");
        assert_eq!(id.to_string(), "form:abc123");
    }
}
