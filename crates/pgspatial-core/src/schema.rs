//! Reflected schema types: tables, columns, defaults and indexes

use crate::spatial::{GeometricType, SpatialInfo, SpatialLimit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default PostgreSQL schema for unqualified table names
pub const DEFAULT_SCHEMA: &str = "public";

/// Quote an SQL identifier, doubling embedded double quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Identifies a table in a PostgreSQL database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentifier {
    /// Schema name
    pub schema: String,

    /// Table name
    pub table: String,
}

impl TableIdentifier {
    /// Create a new table identifier
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Identifier for a table in the `public` schema
    pub fn public(table: impl Into<String>) -> Self {
        Self::new(DEFAULT_SCHEMA, table)
    }

    /// Parse `schema.table` or a bare `table`
    pub fn parse(name: &str) -> Self {
        match name.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Self::public(name),
        }
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Quoted form for use in DDL
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

impl From<&str> for TableIdentifier {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

/// Logical column type
///
/// Maps PostgreSQL column types to the coarse categories a migration
/// author works with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnType {
    Integer,

    Float,

    /// Decimal with precision and scale
    Decimal {
        precision: Option<u16>,
        scale: Option<u16>,
    },

    /// `character varying` / `char`
    String,

    Text,

    Boolean,

    Date,

    /// `timestamp` with or without time zone
    DateTime,

    Time,

    /// `json` / `jsonb`
    Json,

    /// `bytea`
    Binary,

    Uuid,

    /// PostGIS `geometry` or `geography`
    Spatial,

    /// Unknown type (cannot map)
    Unknown,
}

impl ColumnType {
    /// Stable lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal { .. } => "decimal",
            Self::String => "string",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Json => "json",
            Self::Binary => "binary",
            Self::Uuid => "uuid",
            Self::Spatial => "spatial",
            Self::Unknown => "unknown",
        }
    }

    /// Date and time types
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime | Self::Time)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal {
                precision: Some(p),
                scale: Some(s),
            } => write!(f, "decimal({}, {})", p, s),
            Self::Decimal {
                precision: Some(p),
                scale: None,
            } => write!(f, "decimal({})", p),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Column default value
///
/// Literal defaults are decoded from the expression PostgreSQL reports
/// (`'-1'::integer`, `'abc'::character varying`); anything else is kept
/// as a raw SQL expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Expression { expression: String },
}

impl DefaultValue {
    /// Raw SQL expression default
    pub fn expression(sql: impl Into<String>) -> Self {
        Self::Expression {
            expression: sql.into(),
        }
    }

    /// Decode a default expression as returned by `pg_get_expr`
    pub fn parse(raw: &str) -> Self {
        let mut expr = raw.trim();
        while expr.len() >= 2 && expr.starts_with('(') && expr.ends_with(')') {
            expr = expr[1..expr.len() - 1].trim();
        }

        if let Some((literal, cast)) = split_cast(expr) {
            let cast = cast.trim_end_matches("[]").trim();
            return match cast {
                "integer" | "bigint" | "smallint" => literal
                    .parse()
                    .map(Self::Integer)
                    .unwrap_or_else(|_| Self::String(literal)),
                "numeric" | "real" | "double precision" => literal
                    .parse()
                    .map(Self::Float)
                    .unwrap_or_else(|_| Self::String(literal)),
                "boolean" => match literal.as_str() {
                    "true" => Self::Boolean(true),
                    "false" => Self::Boolean(false),
                    _ => Self::String(literal),
                },
                _ => Self::String(literal),
            };
        }

        if let Ok(value) = expr.parse::<i64>() {
            return Self::Integer(value);
        }
        if let Ok(value) = expr.parse::<f64>() {
            return Self::Float(value);
        }
        match expr {
            "true" => Self::Boolean(true),
            "false" => Self::Boolean(false),
            _ => Self::expression(expr),
        }
    }

    /// Render as an SQL literal (or the raw expression)
    pub fn to_sql(&self) -> String {
        match self {
            Self::Boolean(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::String(value) => quote_literal(value),
            Self::Expression { expression } => expression.clone(),
        }
    }
}

/// Split `'literal'::type` into the unescaped literal and the cast type
fn split_cast(expr: &str) -> Option<(String, &str)> {
    if !expr.starts_with('\'') {
        return None;
    }
    let end = expr.rfind("'::")?;
    if end == 0 {
        return None;
    }
    let literal = expr[1..end].replace("''", "'");
    Some((literal, &expr[end + 3..]))
}

/// A column as reflected from the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Formatted SQL type, e.g. `geometry(Point,4326)` or `character varying`
    pub sql_type: String,

    /// Logical type
    pub column_type: ColumnType,

    /// Whether NULL is allowed
    pub null: bool,

    /// Decoded default, if any
    pub default: Option<DefaultValue>,

    /// Array column
    pub array: bool,

    /// Spatial metadata, present only for geometry/geography columns
    pub spatial: Option<SpatialInfo>,
}

impl Column {
    /// Create a nullable, non-array column without a default
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            column_type,
            null: true,
            default: None,
            array: false,
            spatial: None,
        }
    }

    pub fn with_null(mut self, null: bool) -> Self {
        self.null = null;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    pub fn with_spatial(mut self, spatial: SpatialInfo) -> Self {
        self.spatial = Some(spatial);
        self
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial.is_some()
    }

    pub fn geometric_type(&self) -> Option<GeometricType> {
        self.spatial.as_ref().map(|s| s.geometric_type)
    }

    pub fn srid(&self) -> Option<i32> {
        self.spatial.as_ref().map(|s| s.srid)
    }

    /// `None` for non-spatial columns
    pub fn has_z(&self) -> Option<bool> {
        self.spatial.as_ref().map(|s| s.has_z)
    }

    /// `None` for non-spatial columns
    pub fn has_m(&self) -> Option<bool> {
        self.spatial.as_ref().map(|s| s.has_m)
    }

    pub fn is_geographic(&self) -> bool {
        self.spatial.as_ref().is_some_and(|s| s.geographic)
    }

    pub fn has_spatial_constraints(&self) -> bool {
        self.spatial.as_ref().is_some_and(|s| s.has_spatial_constraints)
    }

    /// Spatial limit map, `None` for non-spatial columns
    pub fn limit(&self) -> Option<SpatialLimit> {
        self.spatial.as_ref().map(SpatialInfo::limit)
    }
}

/// An index as reflected from the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Table the index belongs to
    pub table: String,

    /// Index name
    pub name: String,

    /// Indexed columns, in key order
    pub columns: Vec<String>,

    pub unique: bool,

    /// GIST index over a spatial column
    pub spatial: bool,
}
