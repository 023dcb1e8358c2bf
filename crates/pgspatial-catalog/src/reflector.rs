//! Schema reflection with spatial metadata
//!
//! [`SchemaReflector`] turns raw catalog rows into [`Column`]s and runs DDL
//! through the same adapter. The spatial catalog rows for a table are fetched
//! through [`SpatialInfoCache`]:
//! - only when the table has at least one `geometry`/`geography` column,
//! - at most once until the entry is invalidated,
//! - invalidated by `clear_cache*` or by DDL executed through the reflector.
//!
//! DDL runs under the same lock as spatial fetches, so a fetch that read the
//! catalog before a schema change can never repopulate the cache after it.

use crate::adapter::{CatalogAdapter, CatalogError, RawIndex};
use crate::cache::{SpatialInfoCache, SpatialRows};
use crate::classify::{classify_column, is_spatial_sql_type};
use pgspatial_core::{Column, DdlConfig, DdlStyle, IndexDefinition, TableIdentifier};
use pgspatial_ddl::{drop_table, ChangeTable, MigrationFile, Operation, TableDefinition};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Reflects tables and applies DDL through a [`CatalogAdapter`]
///
/// ## Usage
///
/// ```rust,ignore
/// let reflector = SchemaReflector::new(adapter).with_config(config.ddl.clone());
///
/// reflector.create_table(&TableDefinition::build("spatial_test", |t| {
///     t.point("latlon", ColumnOptions::new().srid(4326));
/// })).await?;
///
/// let latlon = reflector.column(&"spatial_test".into(), "latlon").await?;
/// ```
pub struct SchemaReflector<A: CatalogAdapter> {
    adapter: Arc<A>,

    cache: Arc<SpatialInfoCache>,

    config: DdlConfig,

    /// Serializes spatial-row fetches and DDL execution
    fetch_lock: Mutex<()>,
}

impl<A: CatalogAdapter> SchemaReflector<A> {
    pub fn new(adapter: A) -> Self {
        Self::from_arc(Arc::new(adapter))
    }

    /// Create a reflector over a shared adapter
    pub fn from_arc(adapter: Arc<A>) -> Self {
        Self {
            adapter,
            cache: Arc::new(SpatialInfoCache::new()),
            config: DdlConfig::default(),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Set the DDL rendering configuration
    pub fn with_config(mut self, config: DdlConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a cache with other reflectors on the same database
    pub fn with_cache(mut self, cache: Arc<SpatialInfoCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn cache(&self) -> &SpatialInfoCache {
        &self.cache
    }

    pub fn config(&self) -> &DdlConfig {
        &self.config
    }

    // =========================================================================
    // Reflection
    // =========================================================================

    /// All columns of a table, in ordinal order
    pub async fn columns(&self, table: &TableIdentifier) -> Result<Vec<Column>, CatalogError> {
        let raw = self.adapter.fetch_columns(table).await?;

        let has_spatial = raw
            .iter()
            .any(|c| is_spatial_sql_type(c.sql_type.trim_end_matches("[]")));
        let rows = if has_spatial {
            self.spatial_rows(table).await?
        } else {
            SpatialRows::default()
        };

        Ok(raw.iter().map(|c| classify_column(c, &rows)).collect())
    }

    /// One column by name
    pub async fn column(&self, table: &TableIdentifier, name: &str) -> Result<Option<Column>, CatalogError> {
        Ok(self
            .columns(table)
            .await?
            .into_iter()
            .find(|c| c.name == name))
    }

    /// Only the geometry/geography columns
    pub async fn spatial_columns(&self, table: &TableIdentifier) -> Result<Vec<Column>, CatalogError> {
        let mut columns = self.columns(table).await?;
        columns.retain(Column::is_spatial);
        Ok(columns)
    }

    /// Indexes of a table; GIST indexes are reported as spatial
    pub async fn indexes(&self, table: &TableIdentifier) -> Result<Vec<IndexDefinition>, CatalogError> {
        let raw = self.adapter.fetch_indexes(table).await?;
        Ok(raw.into_iter().map(|index| index_definition(table, index)).collect())
    }

    /// Names of columns whose values need decoding on read (spatial and temporal)
    pub async fn cached_attributes(&self, table: &TableIdentifier) -> Result<Vec<String>, CatalogError> {
        Ok(self
            .columns(table)
            .await?
            .into_iter()
            .filter(|c| c.is_spatial() || c.column_type.is_temporal())
            .map(|c| c.name)
            .collect())
    }

    /// Number of `geometry_columns` rows for a table
    ///
    /// Always queries the catalog; the cache is neither read nor filled.
    pub async fn geometry_column_count(&self, table: &TableIdentifier) -> Result<usize, CatalogError> {
        let rows = self.adapter.fetch_spatial_columns(table).await?;
        Ok(rows.iter().filter(|r| !r.geographic).count())
    }

    async fn spatial_rows(&self, table: &TableIdentifier) -> Result<SpatialRows, CatalogError> {
        if let Some(rows) = self.cache.get(table) {
            return Ok(rows);
        }

        let _guard = self.fetch_lock.lock().await;
        // Another task may have filled the entry while we waited
        if let Some(rows) = self.cache.peek(table) {
            return Ok(rows);
        }

        tracing::debug!(table = %table, adapter = self.adapter.name(), "fetching spatial column info");
        let rows = self.adapter.fetch_spatial_columns(table).await?;
        Ok(self.cache.insert(table, rows))
    }

    // =========================================================================
    // DDL
    // =========================================================================

    /// Create a table, returning the executed statements
    pub async fn create_table(&self, definition: &TableDefinition) -> Result<Vec<String>, CatalogError> {
        let statements = definition.statements(&self.config)?;
        self.execute_for(&definition.table, statements).await
    }

    /// Alter a table, returning the executed statements
    ///
    /// In the `AddGeometryColumn` style, removed columns registered in
    /// `geometry_columns` are dropped through `DropGeometryColumn`.
    pub async fn change_table(&self, change: &ChangeTable) -> Result<Vec<String>, CatalogError> {
        let statements = self.change_statements(change).await?;
        self.execute_for(&change.table, statements).await
    }

    pub async fn drop_table(&self, table: &TableIdentifier) -> Result<Vec<String>, CatalogError> {
        let statements = drop_table(table, &self.config);
        self.execute_for(table, statements).await
    }

    /// Run every operation of a migration in order
    ///
    /// All statements are rendered before any is executed, so a rendering
    /// error leaves the database untouched.
    pub async fn execute_migration(&self, migration: &MigrationFile) -> Result<Vec<String>, CatalogError> {
        let mut planned = Vec::with_capacity(migration.operations.len());
        for operation in &migration.operations {
            planned.push((operation, operation.statements(&self.config)?));
        }

        let mut executed = Vec::new();
        for (operation, statements) in planned {
            // earlier operations may have added the columns a change removes
            let statements = match operation {
                Operation::ChangeTable(change) => self.change_statements(change).await?,
                _ => statements,
            };
            executed.extend(self.execute_for(operation.table(), statements).await?);
        }
        Ok(executed)
    }

    async fn change_statements(&self, change: &ChangeTable) -> Result<Vec<String>, CatalogError> {
        if self.config.style != DdlStyle::AddGeometryColumn || change.remove.is_empty() {
            return Ok(change.statements(&self.config)?);
        }

        // Read the live catalog: a cached entry may predate earlier DDL
        let rows = self.adapter.fetch_spatial_columns(&change.table).await?;
        let registered: HashSet<&str> = rows
            .iter()
            .filter(|row| !row.geographic)
            .map(|row| row.column.as_str())
            .collect();

        let (spatial, plain): (Vec<String>, Vec<String>) = change
            .remove
            .iter()
            .cloned()
            .partition(|column| registered.contains(column.as_str()));

        let mut routed = change.clone();
        routed.remove = plain;
        routed.remove_spatial.extend(spatial);
        Ok(routed.statements(&self.config)?)
    }

    /// Execute statements touching one table, then drop its cache entry
    async fn execute_for(
        &self,
        table: &TableIdentifier,
        statements: Vec<String>,
    ) -> Result<Vec<String>, CatalogError> {
        let _guard = self.fetch_lock.lock().await;
        let result = self.execute_all(&statements).await;
        // Evict even on failure: earlier statements may already have run
        self.cache.evict(table);
        result.map(|()| statements)
    }

    async fn execute_all(&self, statements: &[String]) -> Result<(), CatalogError> {
        for sql in statements {
            tracing::info!(sql = %sql, "executing DDL");
            self.adapter.execute(sql).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Cache control
    // =========================================================================

    /// Forget spatial metadata for every table
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Forget spatial metadata for one table
    pub fn clear_cache_for(&self, table: &TableIdentifier) {
        self.cache.evict(table);
    }
}

fn index_definition(table: &TableIdentifier, index: RawIndex) -> IndexDefinition {
    IndexDefinition {
        table: table.fqn(),
        spatial: index.access_method.eq_ignore_ascii_case("gist"),
        name: index.name,
        columns: index.columns,
        unique: index.unique,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{RawColumn, SpatialColumnRow};
    use crate::mock::MockAdapter;
    use pgspatial_core::{ColumnType, GeometricType};
    use pgspatial_ddl::{ColumnMethods, ColumnOptions, IndexOptions};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn spatial_test() -> TableIdentifier {
        TableIdentifier::public("spatial_test")
    }

    async fn seeded() -> SchemaReflector<MockAdapter> {
        let adapter = MockAdapter::new();
        adapter
            .add_table(
                spatial_test(),
                vec![
                    RawColumn::new("id", "bigint").not_null(),
                    RawColumn::new("latlon", "geometry"),
                    RawColumn::new("created_at", "timestamp without time zone"),
                ],
            )
            .await;
        adapter
            .add_spatial_rows(
                spatial_test(),
                vec![SpatialColumnRow::geometry("latlon", "GEOMETRY", 0, 2)],
            )
            .await;
        SchemaReflector::new(adapter)
    }

    #[tokio::test]
    async fn test_columns_are_classified() {
        let reflector = seeded().await;
        let columns = reflector.columns(&spatial_test()).await.unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].column_type, ColumnType::Integer);
        assert_eq!(columns[1].geometric_type(), Some(GeometricType::Geometry));
        assert!(columns[1].has_spatial_constraints());
        assert_eq!(columns[2].column_type, ColumnType::DateTime);
    }

    #[tokio::test]
    async fn test_spatial_info_fetched_once() {
        let reflector = seeded().await;

        reflector.columns(&spatial_test()).await.unwrap();
        reflector.columns(&spatial_test()).await.unwrap();
        reflector.spatial_columns(&spatial_test()).await.unwrap();

        assert_eq!(reflector.adapter().spatial_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_refetches() {
        let reflector = seeded().await;

        reflector.columns(&spatial_test()).await.unwrap();
        reflector.clear_cache();
        reflector.columns(&spatial_test()).await.unwrap();
        reflector.clear_cache_for(&spatial_test());
        reflector.columns(&spatial_test()).await.unwrap();

        assert_eq!(reflector.adapter().spatial_fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_cached_attributes() {
        let reflector = seeded().await;
        assert_eq!(
            reflector.cached_attributes(&spatial_test()).await.unwrap(),
            vec!["latlon".to_string(), "created_at".to_string()]
        );
    }

    #[tokio::test]
    async fn test_ddl_evicts_table() {
        let reflector = seeded().await;
        reflector.columns(&spatial_test()).await.unwrap();
        assert!(reflector.cache().contains(&spatial_test()));

        let change = ChangeTable::build("spatial_test", |t| {
            t.index(&["latlon"], IndexOptions::spatial());
        });
        let executed = reflector.change_table(&change).await.unwrap();

        assert_eq!(executed.len(), 1);
        assert_eq!(reflector.adapter().executed().await, executed);
        assert!(!reflector.cache().contains(&spatial_test()));
    }

    #[tokio::test]
    async fn test_render_error_executes_nothing() {
        let reflector = seeded().await;
        let definition = TableDefinition::build("broken", |t| {
            t.point("latlon", ColumnOptions::new().srid(-1));
        });

        let result = reflector.create_table(&definition).await;
        assert!(matches!(result, Err(CatalogError::Ddl(_))));
        assert!(reflector.adapter().executed().await.is_empty());
    }

    /// Catalog whose spatial lookup returns rows read before a delay, and
    /// whose DDL registers a `geom2` point at SRID 4326
    struct DelayedSnapshotAdapter {
        columns: StdMutex<Vec<RawColumn>>,
        spatial: StdMutex<Vec<SpatialColumnRow>>,
    }

    impl DelayedSnapshotAdapter {
        fn new() -> Self {
            Self {
                columns: StdMutex::new(vec![RawColumn::new("latlon", "geometry")]),
                spatial: StdMutex::new(vec![SpatialColumnRow::geometry("latlon", "GEOMETRY", 0, 2)]),
            }
        }
    }

    #[async_trait::async_trait]
    impl CatalogAdapter for DelayedSnapshotAdapter {
        fn name(&self) -> &'static str {
            "DelayedSnapshot"
        }

        async fn fetch_columns(&self, _table: &TableIdentifier) -> Result<Vec<RawColumn>, CatalogError> {
            Ok(self.columns.lock().unwrap().clone())
        }

        async fn fetch_spatial_columns(
            &self,
            _table: &TableIdentifier,
        ) -> Result<Vec<SpatialColumnRow>, CatalogError> {
            let snapshot = self.spatial.lock().unwrap().clone();
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(snapshot)
        }

        async fn fetch_indexes(&self, _table: &TableIdentifier) -> Result<Vec<RawIndex>, CatalogError> {
            Ok(Vec::new())
        }

        async fn execute(&self, _sql: &str) -> Result<(), CatalogError> {
            self.columns.lock().unwrap().push(RawColumn::new("geom2", "geometry"));
            self.spatial
                .lock()
                .unwrap()
                .push(SpatialColumnRow::geometry("geom2", "POINT", 4326, 2));
            Ok(())
        }

        async fn test_connection(&self) -> Result<(), CatalogError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_ddl_during_fetch_does_not_leave_stale_entry() {
        let reflector = SchemaReflector::new(DelayedSnapshotAdapter::new());
        let table = spatial_test();
        let change = ChangeTable::build("spatial_test", |t| {
            t.point("geom2", ColumnOptions::new().srid(4326));
        });

        let (before, executed) = tokio::join!(reflector.columns(&table), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            reflector.change_table(&change).await
        });
        assert_eq!(before.unwrap().len(), 1);
        assert_eq!(executed.unwrap().len(), 1);

        let geom2 = reflector.column(&table, "geom2").await.unwrap().unwrap();
        assert_eq!(geom2.geometric_type(), Some(GeometricType::Point));
        assert_eq!(geom2.srid(), Some(4326));
        assert!(geom2.has_spatial_constraints());
    }

    #[tokio::test]
    async fn test_legacy_remove_routes_geometry_columns() {
        let reflector = seeded().await.with_config(DdlConfig {
            style: DdlStyle::AddGeometryColumn,
            ..DdlConfig::default()
        });

        let change = ChangeTable::build("spatial_test", |t| {
            t.remove("latlon");
            t.remove("created_at");
        });
        let executed = reflector.change_table(&change).await.unwrap();

        assert_eq!(
            executed,
            vec![
                "ALTER TABLE \"public\".\"spatial_test\" DROP COLUMN \"created_at\"".to_string(),
                "SELECT DropGeometryColumn('public', 'spatial_test', 'latlon')".to_string(),
            ]
        );
        assert_eq!(reflector.adapter().executed().await, executed);
    }

    #[tokio::test]
    async fn test_typed_remove_skips_catalog_lookup() {
        let reflector = seeded().await;
        let change = ChangeTable::build("spatial_test", |t| {
            t.remove("latlon");
        });

        let executed = reflector.change_table(&change).await.unwrap();
        assert_eq!(
            executed,
            vec!["ALTER TABLE \"public\".\"spatial_test\" DROP COLUMN \"latlon\"".to_string()]
        );
        assert_eq!(reflector.adapter().spatial_fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_geometry_column_count_is_uncached() {
        let reflector = seeded().await;

        assert_eq!(reflector.geometry_column_count(&spatial_test()).await.unwrap(), 1);
        assert_eq!(reflector.geometry_column_count(&spatial_test()).await.unwrap(), 1);
        assert_eq!(reflector.adapter().spatial_fetch_count(), 2);
        assert!(reflector.cache().is_empty());
    }
}
