//! Spatial DDL builder
//!
//! Translates table definitions with spatial columns into the SQL PostGIS
//! expects: typmod columns (`geometry(Point,4326)`), legacy
//! `AddGeometryColumn` calls, and GIST indexes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgspatial_ddl::{ColumnMethods, ColumnOptions, IndexOptions, TableDefinition};
//! use pgspatial_core::DdlConfig;
//!
//! let table = TableDefinition::build("spatial_test", |t| {
//!     t.point("latlon", ColumnOptions::new().geographic());
//!     t.index(&["latlon"], IndexOptions::spatial());
//! });
//! for sql in table.statements(&DdlConfig::default())? {
//!     println!("{sql};");
//! }
//! ```

pub mod column;
pub mod error;
pub mod migration;
pub mod render;
pub mod table;

pub use column::{ColumnDefinition, ColumnMethods, ColumnOptions, Limit, SqlType};
pub use error::DdlError;
pub use migration::{MigrationFile, Operation};
pub use render::{default_index_name, IndexOptions, IndexSpec};
pub use table::{drop_table, ChangeTable, TableDefinition};
