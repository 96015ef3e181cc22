//! Parameterized SELECT construction for the objects table
//!
//! Filter values only ever travel as bindings; the SQL text contains the
//! validated table name, the fixed column names and `?` placeholders.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::filters::FilterSet;

/// Maximum identifier length accepted by MySQL
const MAX_TABLE_NAME_LEN: usize = 64;

/// Unquoted identifier: letter or underscore first, then letters, digits, underscores
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid identifier regex"));

/// Validated table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Validate a table name.
    ///
    /// # Example
    /// ```
    /// use menudata_core::TableName;
    ///
    /// assert!(TableName::new("menu_items").is_ok());
    /// assert!(TableName::new("items; DROP TABLE x").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "table name" });
        }

        if s.len() > MAX_TABLE_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "table name",
                max: MAX_TABLE_NAME_LEN,
            });
        }

        if !IDENT_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "table name",
                reason: "must be letters, digits and underscores, not starting with a digit",
            });
        }

        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One bound value and the column it is compared against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub column: &'static str,
    pub value: String,
}

/// SQL text plus its bindings, in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatement {
    sql: String,
    bindings: Vec<Binding>,
}

impl QueryStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Number of `?` placeholders in the SQL text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Builds the objects SELECT for a filter set
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base: String,
}

impl QueryBuilder {
    pub fn new(table: &TableName) -> Self {
        Self {
            base: format!("SELECT * FROM `{}`", table.as_str()),
        }
    }

    pub fn build(&self, filters: &FilterSet) -> QueryStatement {
        let mut sql = self.base.clone();
        let mut bindings = Vec::new();

        for (key, value) in filters.present() {
            sql.push_str(if bindings.is_empty() { " WHERE " } else { " AND " });
            sql.push_str(key.name());
            sql.push_str(" = ?");
            bindings.push(Binding {
                column: key.name(),
                value: value.to_owned(),
            });
        }

        QueryStatement { sql, bindings }
    }
}
