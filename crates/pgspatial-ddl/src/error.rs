//! DDL builder errors

/// Errors raised while resolving column options or rendering DDL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DdlError {
    #[error("Invalid SRID {srid} for column '{column}'")]
    InvalidSrid { column: String, srid: i32 },

    #[error("Unknown geometric type: {0}")]
    UnknownGeometricType(String),

    #[error("Unknown column type: {0}")]
    UnknownColumnType(String),

    #[error("Column '{column}' defined twice on {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("Index on {0} has no columns")]
    EmptyIndex(String),

    #[error("Spatial index '{0}' cannot be unique")]
    UniqueSpatialIndex(String),

    #[error("Failed to parse migration: {0}")]
    Parse(String),
}
