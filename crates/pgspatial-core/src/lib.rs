//! pgspatial core
//!
//! Domain model shared by the DDL builder and the catalog reader:
//! geometric types, requested spatial column specs, reflected columns and
//! indexes, and the `pgspatial.toml` configuration.

pub mod spatial;
pub mod schema;
pub mod config;

pub use spatial::{
    split_dimension_suffix, GeometricType, SpatialColumnSpec, SpatialInfo, SpatialLimit,
    DEFAULT_SRID, GEOGRAPHIC_SRID,
};
pub use schema::{
    quote_ident, quote_literal, Column, ColumnType, DefaultValue, IndexDefinition,
    TableIdentifier, DEFAULT_SCHEMA,
};
pub use config::{Config, ConfigError, DatabaseConfig, DdlConfig, DdlStyle};
