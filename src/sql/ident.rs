use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::BuildError;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("identifier pattern"));

/// A declared column type: a word, an optional `(n)` / `(n,m)` size and
/// trailing attribute words such as `unsigned`.
static COLUMN_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+(\s*\(\s*\d+(\s*,\s*\d+)*\s*\))?(\s+\w+)*$").expect("column type pattern")
});

/// A validated SQL identifier. Rendering with `Display` backtick-quotes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    fn check(kind: &'static str, name: &str, candidate: &str) -> Result<Self, BuildError> {
        if WORD.is_match(candidate) {
            Ok(Self(name.to_string()))
        } else {
            Err(BuildError::InvalidIdentifier {
                kind,
                name: name.to_string(),
            })
        }
    }

    /// An existing database or table. Spaces are ignored for validation,
    /// so names containing spaces can still be browsed.
    pub fn schema(kind: &'static str, name: &str) -> Result<Self, BuildError> {
        Self::check(kind, name, &name.replace(' ', ""))
    }

    /// A column name, or a name about to be created.
    pub fn strict(kind: &'static str, name: &str) -> Result<Self, BuildError> {
        Self::check(kind, name, name)
    }

    pub fn column(name: &str) -> Result<Self, BuildError> {
        Self::strict("column", name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.0.replace('`', "``"))
    }
}

/// Checks a declared column type before it is spliced into DDL.
pub fn column_type(raw: &str) -> Result<&str, BuildError> {
    let trimmed = raw.trim();
    if COLUMN_TYPE.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(BuildError::InvalidColumnType(raw.to_string()))
    }
}

/// Escapes a string for use inside a single-quoted SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_names_pass_and_quote() {
        let id = Ident::column("user_id2").unwrap();
        assert_eq!(id.to_string(), "`user_id2`");
        assert_eq!(id.as_str(), "user_id2");
    }

    #[test]
    fn injection_attempts_are_refused() {
        for bad in ["", "a b", "a;b", "a`b", "x) OR 1=1 --", "t.col", "a-b", "name'"] {
            assert!(Ident::column(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn schema_names_ignore_spaces() {
        let id = Ident::schema("table", "my table").unwrap();
        assert_eq!(id.to_string(), "`my table`");
        assert!(Ident::schema("table", "   ").is_err());
        assert!(Ident::schema("database", "my;db").is_err());
        assert!(Ident::strict("table", "my table").is_err());
    }

    #[test]
    fn unicode_word_characters_are_allowed() {
        assert!(Ident::column("größe").is_ok());
    }

    #[test]
    fn column_types() {
        for ok in ["int", "varchar(190)", "decimal(10, 2)", "int(11) unsigned", " text "] {
            assert!(column_type(ok).is_ok(), "{ok:?}");
        }
        for bad in ["", "int; DROP TABLE x", "varchar(a)", "enum('a')", "int DEFAULT 1)"] {
            assert!(column_type(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn literals_escape_quotes_and_backslashes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(r"a\b"), r"'a\\b'");
    }
}
