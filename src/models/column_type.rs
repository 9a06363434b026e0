use serde::Serialize;

/// How a column's values are parsed, bound and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Integer,
    Float,
    Decimal,
    String,
    Text,
    Timestamp,
    Binary,
    /// Unrecognised declared type; callers treat values as opaque strings.
    Opaque,
}

impl SemanticType {
    pub fn is_numeric(self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Float | SemanticType::Decimal)
    }

    /// Timestamp and binary columns are never bound as values.
    pub fn is_bindable(self) -> bool {
        !matches!(self, SemanticType::Timestamp | SemanticType::Binary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Number(i64),
    Text(&'static str),
    Null,
}

impl DefaultValue {
    /// The default as it would be typed into a form field. `Null` yields `None`.
    pub fn as_input(&self) -> Option<String> {
        match self {
            DefaultValue::Number(n) => Some(n.to_string()),
            DefaultValue::Text(s) => Some((*s).to_string()),
            DefaultValue::Null => None,
        }
    }
}

/// Maps a declared column type such as `varchar(50)` or `int(11) unsigned`
/// to its semantic type and the value a new column or an empty field takes.
///
/// Matching is case-insensitive and the first rule that applies wins.
pub fn classify(raw_type: &str) -> (SemanticType, DefaultValue) {
    let upper = raw_type.to_uppercase();

    if upper.contains("INT") {
        (SemanticType::Integer, DefaultValue::Number(0))
    } else if upper.starts_with("FLOAT") || upper.starts_with("DOUBLE") {
        (SemanticType::Float, DefaultValue::Number(0))
    } else if upper.starts_with("DECIMAL") {
        (SemanticType::Decimal, DefaultValue::Number(0))
    } else if upper == "CHAR(1)" {
        (SemanticType::String, DefaultValue::Text("N"))
    } else if upper.contains("CHAR") {
        (SemanticType::String, DefaultValue::Text(""))
    } else if upper.contains("TEXT") {
        (SemanticType::Text, DefaultValue::Text(""))
    } else if upper == "DATETIME" {
        (SemanticType::String, DefaultValue::Text("1970-01-01 00:00:00"))
    } else if upper == "DATE" {
        (SemanticType::String, DefaultValue::Text("1970-01-01"))
    } else if upper == "TIME" {
        (SemanticType::String, DefaultValue::Text("00:00:00"))
    } else if upper.starts_with("YEAR") {
        (SemanticType::Integer, DefaultValue::Number(1970))
    } else if upper == "TIMESTAMP" {
        (SemanticType::Timestamp, DefaultValue::Null)
    } else if upper.starts_with("BIT") || upper.contains("BINARY") || upper.contains("BLOB") {
        (SemanticType::Binary, DefaultValue::Null)
    } else {
        (SemanticType::Opaque, DefaultValue::Text(""))
    }
}

/// Column types offered when creating or altering a table.
pub const OFFERED_TYPES: &[&str] = &[
    "int",
    "bigint",
    "float",
    "double",
    "char(1)",
    "varchar(50)",
    "varchar(190)",
    "text",
    "mediumtext",
    "datetime",
    "date",
    "time",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_match_anywhere() {
        assert_eq!(classify("int(11)"), (SemanticType::Integer, DefaultValue::Number(0)));
        assert_eq!(classify("BIGINT UNSIGNED"), (SemanticType::Integer, DefaultValue::Number(0)));
        assert_eq!(classify("tinyint(1)").0, SemanticType::Integer);
    }

    #[test]
    fn char_one_is_a_flag_column() {
        assert_eq!(classify("char(1)"), (SemanticType::String, DefaultValue::Text("N")));
        assert_eq!(classify("char(2)"), (SemanticType::String, DefaultValue::Text("")));
        assert_eq!(classify("varchar(190)"), (SemanticType::String, DefaultValue::Text("")));
    }

    #[test]
    fn numeric_prefixes() {
        assert_eq!(classify("double").0, SemanticType::Float);
        assert_eq!(classify("float(7,4)").0, SemanticType::Float);
        assert_eq!(classify("decimal(10,2)"), (SemanticType::Decimal, DefaultValue::Number(0)));
    }

    #[test]
    fn temporal_types_need_exact_names() {
        assert_eq!(classify("datetime").1, DefaultValue::Text("1970-01-01 00:00:00"));
        assert_eq!(classify("date").1, DefaultValue::Text("1970-01-01"));
        assert_eq!(classify("time").1, DefaultValue::Text("00:00:00"));
        assert_eq!(classify("year(4)"), (SemanticType::Integer, DefaultValue::Number(1970)));
        assert_eq!(classify("timestamp"), (SemanticType::Timestamp, DefaultValue::Null));
        // datetime(6) is not an exact match and falls through to opaque
        assert_eq!(classify("datetime(6)"), (SemanticType::Opaque, DefaultValue::Text("")));
    }

    #[test]
    fn binary_family() {
        for t in ["bit(1)", "varbinary(16)", "longblob", "BINARY(4)"] {
            assert_eq!(classify(t), (SemanticType::Binary, DefaultValue::Null), "{t}");
        }
    }

    #[test]
    fn text_and_unknown() {
        assert_eq!(classify("mediumtext"), (SemanticType::Text, DefaultValue::Text("")));
        assert_eq!(classify("json"), (SemanticType::Opaque, DefaultValue::Text("")));
        assert_eq!(classify(""), (SemanticType::Opaque, DefaultValue::Text("")));
    }

    #[test]
    fn bindable_excludes_timestamp_and_binary() {
        assert!(!SemanticType::Timestamp.is_bindable());
        assert!(!SemanticType::Binary.is_bindable());
        assert!(SemanticType::Opaque.is_bindable());
        assert!(SemanticType::Decimal.is_numeric());
    }
}
