//! `create_table` / `change_table` builders

use crate::column::{ColumnDefinition, ColumnMethods, ColumnOptions, SqlType};
use crate::error::DdlError;
use crate::render::{
    drop_column_sql, drop_index_sql, drop_spatial_column_sql, drop_table_sql, index_sql,
    render_column, IndexOptions, IndexSpec, RenderedColumn,
};
use pgspatial_core::{DdlConfig, TableIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Serialize table identifiers as `schema.table` strings
///
/// A bare `table` deserializes with an empty schema; [`MigrationFile`]
/// fills it in with the configured default schema after parsing.
///
/// [`MigrationFile`]: crate::MigrationFile
pub(crate) mod table_name {
    use pgspatial_core::TableIdentifier;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(table: &TableIdentifier, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&table.fqn())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TableIdentifier, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(match name.split_once('.') {
            Some((schema, table)) => TableIdentifier::new(schema, table),
            None => TableIdentifier::new("", name),
        })
    }
}

fn default_true() -> bool {
    true
}

fn check_duplicates<'a>(
    table: &TableIdentifier,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), DdlError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DdlError::DuplicateColumn {
                table: table.fqn(),
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

/// A `CREATE TABLE` with its columns and indexes
///
/// ```rust,ignore
/// let table = TableDefinition::build("spatial_test", |t| {
///     t.point("latlon", ColumnOptions::new().srid(4326));
///     t.string("name", ColumnOptions::new());
///     t.index(&["latlon"], IndexOptions::spatial());
/// });
/// let sql = table.statements(&DdlConfig::default())?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    #[serde(with = "table_name")]
    pub table: TableIdentifier,

    /// Add an implicit `id bigserial primary key` column
    #[serde(default = "default_true")]
    pub id: bool,

    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,

    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl TableDefinition {
    pub fn new(table: impl Into<TableIdentifier>) -> Self {
        Self {
            table: table.into(),
            id: true,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Create a definition and populate it in a closure
    pub fn build(table: impl Into<TableIdentifier>, f: impl FnOnce(&mut Self)) -> Self {
        let mut definition = Self::new(table);
        f(&mut definition);
        definition
    }

    /// Skip the implicit primary key
    pub fn without_id(mut self) -> Self {
        self.id = false;
        self
    }

    pub fn index(&mut self, columns: &[&str], options: IndexOptions) -> &mut Self {
        self.indexes.push(IndexSpec::new(
            columns.iter().map(|c| c.to_string()).collect(),
            options,
        ));
        self
    }

    fn all_columns(&self) -> Vec<ColumnDefinition> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        if self.id {
            columns.push(ColumnDefinition::new("id", SqlType::PrimaryKey, ColumnOptions::new()));
        }
        columns.extend(self.columns.iter().cloned());
        columns
    }

    /// Render the statements that create this table
    ///
    /// The first statement is always the `CREATE TABLE`; managed geometry
    /// columns and indexes follow in definition order.
    pub fn statements(&self, config: &DdlConfig) -> Result<Vec<String>, DdlError> {
        let columns = self.all_columns();
        check_duplicates(&self.table, columns.iter().map(|c| c.name.as_str()))?;

        let mut inline = Vec::new();
        let mut trailing = Vec::new();
        for column in &columns {
            match render_column(&self.table, column, config)? {
                RenderedColumn::Inline(sql) => inline.push(sql),
                RenderedColumn::Managed(statements) => trailing.extend(statements),
            }
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} ({})",
            self.table.quoted(),
            inline.join(", ")
        )];
        statements.extend(trailing);
        for index in &self.indexes {
            statements.push(index_sql(&self.table, index)?);
        }
        Ok(statements)
    }
}

impl ColumnMethods for TableDefinition {
    fn column(&mut self, name: &str, sql_type: SqlType, options: ColumnOptions) -> &mut Self {
        self.columns.push(ColumnDefinition::new(name, sql_type, options));
        self
    }
}

/// An `ALTER TABLE` block: added/removed columns and indexes
///
/// Statements are rendered in a fixed order: index removals, column
/// removals, column additions, index additions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeTable {
    #[serde(with = "table_name")]
    pub table: TableIdentifier,

    /// Columns to add
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,

    /// Columns to drop
    #[serde(default)]
    pub remove: Vec<String>,

    /// Spatial columns to drop (unregistered from `geometry_columns` in the legacy style)
    #[serde(default)]
    pub remove_spatial: Vec<String>,

    #[serde(default)]
    pub indexes: Vec<IndexSpec>,

    /// Index names to drop
    #[serde(default)]
    pub remove_indexes: Vec<String>,
}

impl ChangeTable {
    pub fn new(table: impl Into<TableIdentifier>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            remove: Vec::new(),
            remove_spatial: Vec::new(),
            indexes: Vec::new(),
            remove_indexes: Vec::new(),
        }
    }

    pub fn build(table: impl Into<TableIdentifier>, f: impl FnOnce(&mut Self)) -> Self {
        let mut change = Self::new(table);
        f(&mut change);
        change
    }

    pub fn remove(&mut self, column: &str) -> &mut Self {
        self.remove.push(column.to_string());
        self
    }

    pub fn remove_spatial(&mut self, column: &str) -> &mut Self {
        self.remove_spatial.push(column.to_string());
        self
    }

    pub fn index(&mut self, columns: &[&str], options: IndexOptions) -> &mut Self {
        self.indexes.push(IndexSpec::new(
            columns.iter().map(|c| c.to_string()).collect(),
            options,
        ));
        self
    }

    pub fn remove_index(&mut self, name: &str) -> &mut Self {
        self.remove_indexes.push(name.to_string());
        self
    }

    pub fn statements(&self, config: &DdlConfig) -> Result<Vec<String>, DdlError> {
        check_duplicates(&self.table, self.columns.iter().map(|c| c.name.as_str()))?;

        let mut statements = Vec::new();
        for name in &self.remove_indexes {
            statements.push(drop_index_sql(&self.table, name));
        }
        for column in &self.remove {
            statements.push(drop_column_sql(&self.table, column));
        }
        for column in &self.remove_spatial {
            statements.push(drop_spatial_column_sql(&self.table, column, config.style));
        }
        for column in &self.columns {
            match render_column(&self.table, column, config)? {
                RenderedColumn::Inline(sql) => statements.push(format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    self.table.quoted(),
                    sql
                )),
                RenderedColumn::Managed(managed) => statements.extend(managed),
            }
        }
        for index in &self.indexes {
            statements.push(index_sql(&self.table, index)?);
        }
        Ok(statements)
    }
}

impl ColumnMethods for ChangeTable {
    fn column(&mut self, name: &str, sql_type: SqlType, options: ColumnOptions) -> &mut Self {
        self.columns.push(ColumnDefinition::new(name, sql_type, options));
        self
    }
}

/// Statements that drop a table
pub fn drop_table(table: &TableIdentifier, config: &DdlConfig) -> Vec<String> {
    vec![drop_table_sql(table, config.style)]
}
