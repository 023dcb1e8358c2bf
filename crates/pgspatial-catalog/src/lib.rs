//! PostGIS catalog reflection
//!
//! This crate reads spatial column metadata back out of a PostGIS database
//! and executes DDL rendered by `pgspatial-ddl`.
//!
//! ## Features
//!
//! - `postgres` - live PostgreSQL/PostGIS adapter (tokio-postgres, optional TLS)
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgspatial_catalog::{PostgresAdapter, SchemaReflector};
//!
//! let adapter = PostgresAdapter::from_connection_string("host=localhost dbname=postgis_test").await?;
//! let reflector = SchemaReflector::new(adapter);
//!
//! for column in reflector.spatial_columns(&"spatial_test".into()).await? {
//!     println!("{} {:?} srid={:?}", column.name, column.geometric_type(), column.srid());
//! }
//! ```

pub mod adapter;
pub mod cache;
pub mod classify;
pub mod mock;
pub mod postgres;
pub mod reflector;

pub use adapter::{CatalogAdapter, CatalogError, RawColumn, RawIndex, SpatialColumnRow};
pub use cache::{CacheStats, SpatialInfoCache, SpatialRows};
pub use classify::{
    classify_column, is_spatial_sql_type, map_postgres_type, parse_spatial_sql_type, spatial_info,
    SpatialSqlType,
};
pub use mock::{MockAdapter, MockAdapterBuilder};
pub use postgres::PostgresAdapter;
pub use reflector::SchemaReflector;
