use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;

use super::{BuildError, Ident, Param, Statement};
use crate::models::request::SelectRequest;
use crate::models::{primary_key, ColumnDescriptor, SemanticType};

/// Introspected default that is inserted as an expression rather than a value.
const CURRENT_TIMESTAMP: &str = "current_timestamp()";

/// One `WHERE` predicate of a row search.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: Ident,
    pub like: bool,
    pub keyword: String,
}

impl Predicate {
    fn parse(field: &str, like: bool, keyword: &str) -> Result<Option<Self>, BuildError> {
        if field.is_empty() || keyword.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            field: Ident::schema("column", field)?,
            like,
            keyword: keyword.to_string(),
        }))
    }

    fn render(&self, params: &mut Vec<Param>) -> String {
        if self.like {
            params.push(Param::Text(format!("%{}%", self.keyword)));
            format!("{} LIKE ?", self.field)
        } else {
            params.push(Param::Text(self.keyword.clone()));
            format!("{} = ?", self.field)
        }
    }
}

/// A [`SelectRequest`] whose identifiers and bounds have been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSelect {
    pub database: Ident,
    pub table: Ident,
    pub first: Option<Predicate>,
    pub second: Option<Predicate>,
    pub is_or: bool,
    pub order_by: Option<Ident>,
    pub ascending: bool,
    pub limit: u64,
    pub offset: u64,
}

impl SelectRequest {
    /// Validates every name the search would splice into SQL. A limit above
    /// `max_limit` is clamped; a missing limit means `max_limit`.
    pub fn validate(&self, max_limit: u64) -> Result<ValidSelect, BuildError> {
        let database = Ident::schema("database", &self.database)?;
        let table = Ident::schema("table", &self.table)?;

        // field names are only checked when given, keywords alone are ignored
        if !self.field1.is_empty() {
            Ident::schema("column", &self.field1)?;
        }
        if !self.field2.is_empty() {
            Ident::schema("column", &self.field2)?;
        }
        let order_by = if self.order_by.is_empty() {
            None
        } else {
            Some(Ident::schema("column", &self.order_by)?)
        };

        let limit = match self.limit {
            None => max_limit,
            Some(l) if l < 1 => return Err(BuildError::InvalidLimit),
            Some(l) => (l as u64).min(max_limit),
        };
        let offset = u64::try_from(self.offset).map_err(|_| BuildError::InvalidOffset)?;

        Ok(ValidSelect {
            database,
            table,
            first: Predicate::parse(&self.field1, self.like1, &self.keyword1)?,
            second: Predicate::parse(&self.field2, self.like2, &self.keyword2)?,
            is_or: self.is_or,
            order_by,
            ascending: self.is_asc,
            limit,
            offset,
        })
    }
}

fn resolve_primary_key(columns: &[ColumnDescriptor]) -> Result<(&ColumnDescriptor, Ident), BuildError> {
    let pk = primary_key(columns).ok_or(BuildError::NoPrimaryKey)?;
    Ok((pk, Ident::column(&pk.field)?))
}

/// `SELECT *` with up to two predicates, ordered by the requested column or
/// the resolved primary key, limited and offset by bound values.
///
/// When only the second predicate is present it becomes the `WHERE` clause.
pub fn select_rows(query: &ValidSelect, columns: &[ColumnDescriptor]) -> Result<Statement, BuildError> {
    let mut sql = format!("SELECT * FROM {}.{}", query.database, query.table);
    let mut params = Vec::new();

    let mut predicates = Vec::with_capacity(2);
    if let Some(p) = &query.first {
        predicates.push(p.render(&mut params));
    }
    if let Some(p) = &query.second {
        predicates.push(p.render(&mut params));
    }
    if !predicates.is_empty() {
        let joiner = if query.is_or { " OR " } else { " AND " };
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(joiner));
    }

    let order = match &query.order_by {
        Some(column) => column.clone(),
        None => resolve_primary_key(columns)?.1,
    };
    let direction = if query.ascending { "ASC" } else { "DESC" };
    sql.push_str(&format!(" ORDER BY {} {} LIMIT ? OFFSET ?", order, direction));
    params.push(Param::Unsigned(query.limit));
    params.push(Param::Unsigned(query.offset));

    Ok(Statement::with_params(sql, params))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_offset: Option<u64>,
    pub next_offset: Option<u64>,
}

/// A full page is assumed to have a successor, so a result set ending
/// exactly on a page boundary offers one trailing empty page.
pub fn paginate(limit: u64, offset: u64, returned: usize) -> Pagination {
    let has_prev = offset > 0;
    let has_next = returned as u64 == limit;
    Pagination {
        has_prev,
        has_next,
        prev_offset: has_prev.then(|| offset.saturating_sub(limit)),
        next_offset: has_next.then(|| offset + limit),
    }
}

/// What goes into one `VALUES` / `SET` slot.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Bind(Param),
    Expr(&'static str),
}

impl Slot {
    fn placeholder(&self) -> &'static str {
        match self {
            Slot::Bind(_) => "?",
            Slot::Expr(e) => e,
        }
    }
}

/// Parses a submitted value for `column` by its semantic type. Numeric
/// columns fall back to the type default when the value is absent or empty.
pub fn parse_value(column: &ColumnDescriptor, raw: Option<&str>) -> Result<Param, BuildError> {
    let (semantic, default) = crate::models::classify(&column.column_type);
    let invalid = |expected| BuildError::InvalidValue {
        field: column.field.clone(),
        expected,
    };

    let numeric_input = || -> String {
        match raw.map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => default.as_input().unwrap_or_else(|| "0".to_string()),
        }
    };

    match semantic {
        SemanticType::Integer => {
            let v = numeric_input();
            if !v.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("an integer"));
            }
            v.parse::<u64>()
                .map(Param::Unsigned)
                .map_err(|_| invalid("an integer"))
        }
        SemanticType::Float => match numeric_input().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Param::Float(f)),
            _ => Err(invalid("numeric")),
        },
        SemanticType::Decimal => BigDecimal::from_str(&numeric_input())
            .map(Param::Decimal)
            .map_err(|_| invalid("numeric")),
        _ => Ok(Param::Text(raw.unwrap_or_default().to_string())),
    }
}

/// A non-numeric column defaulting to `current_timestamp()` gets the SQL
/// expression unless a value was submitted for it.
fn insert_slot(column: &ColumnDescriptor, raw: Option<&str>) -> Result<Slot, BuildError> {
    if raw.is_none()
        && !column.semantic_type().is_numeric()
        && column
            .default
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case(CURRENT_TIMESTAMP))
    {
        return Ok(Slot::Expr("CURRENT_TIMESTAMP()"));
    }
    parse_value(column, raw).map(Slot::Bind)
}

/// An `INSERT` plus what is needed to report the new row's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    pub statement: Statement,
    pub pk_column: String,
    /// The primary key value the caller supplied, if any.
    pub supplied_pk: Option<String>,
}

/// Binds every column in descriptor order except timestamp and binary
/// columns and an auto-increment integer primary key. The first value that
/// does not parse fails the whole insert.
pub fn insert_row(
    database: &Ident,
    table: &Ident,
    columns: &[ColumnDescriptor],
    values: &HashMap<String, String>,
) -> Result<InsertPlan, BuildError> {
    let (pk, _) = resolve_primary_key(columns)?;

    let mut names = Vec::new();
    let mut slots = Vec::new();
    for column in columns {
        let semantic = column.semantic_type();
        if !semantic.is_bindable() {
            continue;
        }
        if column.is_primary() && column.is_auto_increment() && semantic == SemanticType::Integer {
            continue;
        }
        names.push(Ident::column(&column.field)?.to_string());
        slots.push(insert_slot(column, values.get(&column.field).map(String::as_str))?);
    }

    let placeholders: Vec<&str> = slots.iter().map(Slot::placeholder).collect();
    let params = slots
        .into_iter()
        .filter_map(|s| match s {
            Slot::Bind(p) => Some(p),
            Slot::Expr(_) => None,
        })
        .collect();

    let sql = format!(
        "INSERT INTO {}.{} ({}) VALUES ({})",
        database,
        table,
        names.join(", "),
        placeholders.join(", ")
    );

    Ok(InsertPlan {
        statement: Statement::with_params(sql, params),
        pk_column: pk.field.clone(),
        supplied_pk: values.get(&pk.field).cloned(),
    })
}

/// A single row addressed by its resolved primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct RowTarget {
    database: Ident,
    table: Ident,
    pub pk_column: Ident,
    pub pk_value: Param,
}

impl RowTarget {
    pub fn resolve(
        database: &Ident,
        table: &Ident,
        columns: &[ColumnDescriptor],
        pk: &str,
    ) -> Result<Self, BuildError> {
        let (descriptor, pk_column) = resolve_primary_key(columns)?;
        Ok(Self {
            database: database.clone(),
            table: table.clone(),
            pk_column,
            pk_value: parse_value(descriptor, Some(pk))?,
        })
    }

    fn where_clause(&self) -> String {
        format!("WHERE {} = ?", self.pk_column)
    }

    /// Result column `_count` holds the number of matching rows.
    pub fn count(&self) -> Statement {
        Statement::with_params(
            format!(
                "SELECT COUNT({}) AS _count FROM {}.{} {}",
                self.pk_column,
                self.database,
                self.table,
                self.where_clause()
            ),
            vec![self.pk_value.clone()],
        )
    }

    pub fn select(&self) -> Statement {
        Statement::with_params(
            format!("SELECT * FROM {}.{} {}", self.database, self.table, self.where_clause()),
            vec![self.pk_value.clone()],
        )
    }

    pub fn delete(&self) -> Statement {
        Statement::with_params(
            format!("DELETE FROM {}.{} {}", self.database, self.table, self.where_clause()),
            vec![self.pk_value.clone()],
        )
    }

    /// `SET` covers the submitted non-key columns in descriptor order.
    /// Primary key columns are never updated.
    pub fn update(
        &self,
        columns: &[ColumnDescriptor],
        values: &HashMap<String, String>,
    ) -> Result<Statement, BuildError> {
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for column in columns {
            if column.is_primary() || !column.semantic_type().is_bindable() {
                continue;
            }
            let Some(raw) = values.get(&column.field) else {
                continue;
            };
            assignments.push(format!("{} = ?", Ident::column(&column.field)?));
            params.push(parse_value(column, Some(raw))?);
        }

        if assignments.is_empty() {
            return Err(BuildError::NothingToUpdate);
        }
        params.push(self.pk_value.clone());

        Ok(Statement::with_params(
            format!(
                "UPDATE {}.{} SET {} {}",
                self.database,
                self.table,
                assignments.join(", "),
                self.where_clause()
            ),
            params,
        ))
    }
}
