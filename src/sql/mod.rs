//! Schema-driven SQL synthesis.
//!
//! Every identifier reaching a statement is an [`Ident`], which can only be
//! built by passing `^\w+$` validation. Every value is a bound [`Param`].
//! Nothing in this module talks to a database; it turns column descriptors
//! and requests into [`Statement`]s.

use std::fmt;

use bigdecimal::BigDecimal;
use thiserror::Error;

pub mod ddl;
pub mod dml;
pub mod ident;

pub use ident::Ident;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid {kind} name: {name:?}")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("invalid column type: {0:?}")]
    InvalidColumnType(String),
    #[error("{field} is not {expected}")]
    InvalidValue {
        field: String,
        expected: &'static str,
    },
    #[error("invalid default for {field}: {value:?}")]
    InvalidDefault { field: String, value: String },
    #[error("at least one column is required")]
    NoColumns,
    #[error("only one column may be AUTO_INCREMENT")]
    MultipleAutoIncrement,
    #[error("no alter action given")]
    NoAlterAction,
    #[error("no index found on column {0}")]
    IndexNotFound(String),
    #[error("table has no columns")]
    NoPrimaryKey,
    #[error("no updatable columns")]
    NothingToUpdate,
    #[error("limit is invalid")]
    InvalidLimit,
    #[error("offset is invalid")]
    InvalidOffset,
}

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Unsigned(u64),
    Float(f64),
    Decimal(BigDecimal),
    Text(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Unsigned(v) => write!(f, "{}", v),
            Param::Float(v) => write!(f, "{}", v),
            Param::Decimal(v) => write!(f, "{}", v),
            Param::Text(v) => write!(f, "{}", v),
        }
    }
}

/// SQL text with `?` placeholders and the values for them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// The statement with each placeholder replaced by its value, unquoted.
    /// For showing an operator what ran; never executed.
    pub fn display(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut params = self.params.iter();
        for (i, part) in self.sql.split('?').enumerate() {
            if i > 0 {
                match params.next() {
                    Some(p) => out.push_str(&p.to_string()),
                    None => out.push('?'),
                }
            }
            out.push_str(part);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_splices_params_in_order() {
        let stmt = Statement::with_params(
            "SELECT * FROM `d`.`t` WHERE `a` LIKE ? LIMIT ? OFFSET ?",
            vec![Param::Text("%x%".into()), Param::Unsigned(10), Param::Unsigned(0)],
        );
        assert_eq!(
            stmt.display(),
            "SELECT * FROM `d`.`t` WHERE `a` LIKE %x% LIMIT 10 OFFSET 0"
        );
    }
}
