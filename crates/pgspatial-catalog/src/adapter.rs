//! Catalog adapter trait and the raw rows it returns

use pgspatial_core::TableIdentifier;
use pgspatial_ddl::DdlError;
use serde::{Deserialize, Serialize};

/// A column row as read from `pg_attribute`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Column name
    pub name: String,

    /// `format_type(atttypid, atttypmod)`, e.g. `geometry(Point,4326)`
    pub sql_type: String,

    /// `pg_get_expr(adbin, adrelid)` of the column default
    pub default: Option<String>,

    /// `attnotnull`
    pub not_null: bool,

    /// `attndims > 0`
    pub array: bool,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            default: None,
            not_null: false,
            array: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }
}

/// A row of `geometry_columns` or `geography_columns`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialColumnRow {
    /// `f_geometry_column` / `f_geography_column`
    pub column: String,

    /// `type`, e.g. `POINT`, `POLYGONM`, `Geometry`
    pub geometry_type: String,

    pub srid: i32,

    pub coord_dimension: i32,

    /// Row came from `geography_columns`
    pub geographic: bool,
}

impl SpatialColumnRow {
    /// Row of `geometry_columns`
    pub fn geometry(column: impl Into<String>, geometry_type: impl Into<String>, srid: i32, coord_dimension: i32) -> Self {
        Self {
            column: column.into(),
            geometry_type: geometry_type.into(),
            srid,
            coord_dimension,
            geographic: false,
        }
    }

    /// Row of `geography_columns`
    pub fn geography(column: impl Into<String>, geometry_type: impl Into<String>, srid: i32, coord_dimension: i32) -> Self {
        Self {
            geographic: true,
            ..Self::geometry(column, geometry_type, srid, coord_dimension)
        }
    }
}

/// An index row joined from `pg_index`, `pg_class` and `pg_am`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIndex {
    pub name: String,

    pub columns: Vec<String>,

    pub unique: bool,

    /// `pg_am.amname`, e.g. `btree` or `gist`
    pub access_method: String,
}

/// Errors that can occur when talking to the catalog
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Ddl(#[from] DdlError),
}

/// Trait for database adapters that expose catalog metadata and run DDL
#[async_trait::async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Get the adapter name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Fetch the columns of a table, in ordinal order
    async fn fetch_columns(&self, table: &TableIdentifier) -> Result<Vec<RawColumn>, CatalogError>;

    /// Fetch every `geometry_columns` and `geography_columns` row for a table
    ///
    /// This is the expensive lookup the reflector caches per table.
    async fn fetch_spatial_columns(
        &self,
        table: &TableIdentifier,
    ) -> Result<Vec<SpatialColumnRow>, CatalogError>;

    /// Fetch the non-primary-key indexes of a table
    async fn fetch_indexes(&self, table: &TableIdentifier) -> Result<Vec<RawIndex>, CatalogError>;

    /// Execute a single DDL statement
    async fn execute(&self, sql: &str) -> Result<(), CatalogError>;

    /// Test the connection to the database
    async fn test_connection(&self) -> Result<(), CatalogError>;
}
