//! TOML migration files
//!
//! A migration is an ordered list of table operations:
//!
//! ```toml
//! [[operations]]
//! op = "create_table"
//! table = "spatial_test"
//!
//! [[operations.columns]]
//! name = "latlon"
//! type = "point"
//! srid = 4326
//!
//! [[operations.indexes]]
//! columns = ["latlon"]
//! spatial = true
//!
//! [[operations]]
//! op = "change_table"
//! table = "spatial_test"
//! remove = ["name"]
//!
//! [[operations]]
//! op = "drop_table"
//! table = "spatial_test"
//! ```
//!
//! Unqualified table names resolve to the schema passed to
//! [`MigrationFile::from_toml_in_schema`], or `public`.

use crate::error::DdlError;
use crate::table::{drop_table, table_name, ChangeTable, TableDefinition};
use pgspatial_core::{DdlConfig, TableIdentifier, DEFAULT_SCHEMA};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One table operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateTable(TableDefinition),
    ChangeTable(ChangeTable),
    DropTable {
        #[serde(with = "table_name")]
        table: TableIdentifier,
    },
}

impl Operation {
    /// Table the operation applies to
    pub fn table(&self) -> &TableIdentifier {
        match self {
            Self::CreateTable(definition) => &definition.table,
            Self::ChangeTable(change) => &change.table,
            Self::DropTable { table } => table,
        }
    }

    fn table_mut(&mut self) -> &mut TableIdentifier {
        match self {
            Self::CreateTable(definition) => &mut definition.table,
            Self::ChangeTable(change) => &mut change.table,
            Self::DropTable { table } => table,
        }
    }

    pub fn statements(&self, config: &DdlConfig) -> Result<Vec<String>, DdlError> {
        match self {
            Self::CreateTable(definition) => definition.statements(config),
            Self::ChangeTable(change) => change.statements(config),
            Self::DropTable { table } => Ok(drop_table(table, config)),
        }
    }
}

/// A parsed migration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationFile {
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl MigrationFile {
    pub fn from_toml(toml: &str) -> Result<Self, DdlError> {
        Self::from_toml_in_schema(toml, DEFAULT_SCHEMA)
    }

    /// Parse a migration, placing unqualified tables in `schema`
    pub fn from_toml_in_schema(toml: &str, schema: &str) -> Result<Self, DdlError> {
        let mut migration: Self = toml::from_str(toml).map_err(|e| DdlError::Parse(e.to_string()))?;
        for operation in &mut migration.operations {
            let table = operation.table_mut();
            if table.schema.is_empty() {
                table.schema = schema.to_string();
            }
        }
        Ok(migration)
    }

    pub fn from_file(path: &Path) -> Result<Self, DdlError> {
        Self::from_file_in_schema(path, DEFAULT_SCHEMA)
    }

    pub fn from_file_in_schema(path: &Path, schema: &str) -> Result<Self, DdlError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DdlError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_in_schema(&contents, schema)
    }

    /// All statements, in operation order
    pub fn statements(&self, config: &DdlConfig) -> Result<Vec<String>, DdlError> {
        let mut statements = Vec::new();
        for operation in &self.operations {
            statements.extend(operation.statements(config)?);
        }
        Ok(statements)
    }
}
