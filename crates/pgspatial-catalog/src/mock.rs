//! Mock catalog adapter for testing
//!
//! This adapter serves predefined catalog rows without connecting to any
//! database. It's useful for:
//! - Unit testing reflection and caching logic
//! - Checking which DDL statements would be executed
//! - Simulating various error conditions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pgspatial_catalog::{MockAdapter, RawColumn, SpatialColumnRow};
//!
//! let adapter = MockAdapter::new();
//! let table = TableIdentifier::public("spatial_test");
//!
//! adapter.add_table(table.clone(), vec![RawColumn::new("latlon", "geometry")]).await;
//! adapter.add_spatial_rows(table.clone(), vec![
//!     SpatialColumnRow::geometry("latlon", "POINT", 4326, 2),
//! ]).await;
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! // Simulate connection failure
//! let adapter = MockAdapter::new().with_connection_failure();
//! assert!(adapter.test_connection().await.is_err());
//!
//! // Simulate network latency
//! let adapter = MockAdapter::new().with_latency(100); // 100ms delay
//! ```

use crate::adapter::{CatalogAdapter, CatalogError, RawColumn, RawIndex, SpatialColumnRow};
use pgspatial_core::TableIdentifier;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Catalog contents of one table
#[derive(Debug, Clone, Default)]
struct MockTable {
    columns: Vec<RawColumn>,
    spatial: Vec<SpatialColumnRow>,
    indexes: Vec<RawIndex>,
}

/// Mock catalog adapter for testing
///
/// Clones share state, so a test can keep a handle to inspect executed
/// statements after moving the adapter into a reflector.
///
/// # Features
///
/// - Per-table columns, spatial rows and indexes
/// - Log of executed statements
/// - Count of spatial-info fetches
/// - Simulated connection failures, latency and per-table errors
pub struct MockAdapter {
    /// Tables by FQN
    tables: Arc<RwLock<HashMap<String, MockTable>>>,

    /// Errors to return for specific tables
    errors: Arc<RwLock<HashMap<String, CatalogError>>>,

    /// Statements passed to `execute`
    executed: Arc<RwLock<Vec<String>>>,

    /// Calls to `fetch_spatial_columns`
    spatial_fetches: Arc<AtomicUsize>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    /// Name to return from name() method
    adapter_name: &'static str,
}

impl MockAdapter {
    /// Create a new mock adapter with an empty catalog
    pub fn new() -> Self {
        MockAdapterBuilder::new().build()
    }

    /// Set the columns of a table, creating it if needed
    pub async fn add_table(&self, table: TableIdentifier, columns: Vec<RawColumn>) {
        self.tables.write().await.entry(table.fqn()).or_default().columns = columns;
    }

    /// Set the `geometry_columns` / `geography_columns` rows of a table
    pub async fn add_spatial_rows(&self, table: TableIdentifier, rows: Vec<SpatialColumnRow>) {
        self.tables.write().await.entry(table.fqn()).or_default().spatial = rows;
    }

    pub async fn add_indexes(&self, table: TableIdentifier, indexes: Vec<RawIndex>) {
        self.tables.write().await.entry(table.fqn()).or_default().indexes = indexes;
    }

    /// Remove a table from the catalog
    pub async fn remove_table(&self, table: &TableIdentifier) {
        self.tables.write().await.remove(&table.fqn());
    }

    /// Configure an error to be returned for a specific table
    ///
    /// ```rust,ignore
    /// adapter.add_error_for_table(
    ///     TableIdentifier::new("gis", "restricted"),
    ///     CatalogError::PermissionDenied("Access denied".to_string())
    /// ).await;
    /// ```
    pub async fn add_error_for_table(&self, table: TableIdentifier, error: CatalogError) {
        self.errors.write().await.insert(table.fqn(), error);
    }

    /// Configure to fail all connection tests and statements
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure simulated latency for all operations
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom adapter name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.adapter_name = name;
        self
    }

    /// Statements executed so far, in order
    pub async fn executed(&self) -> Vec<String> {
        self.executed.read().await.clone()
    }

    /// Number of `fetch_spatial_columns` calls so far
    pub fn spatial_fetch_count(&self) -> usize {
        self.spatial_fetches.load(Ordering::SeqCst)
    }

    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }

    pub async fn has_table(&self, table: &TableIdentifier) -> bool {
        self.tables.read().await.contains_key(&table.fqn())
    }

    /// Clear executed statements and the fetch counter
    pub async fn reset_log(&self) {
        self.executed.write().await.clear();
        self.spatial_fetches.store(0, Ordering::SeqCst);
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }

    async fn lookup<T>(
        &self,
        table: &TableIdentifier,
        f: impl FnOnce(&MockTable) -> T,
    ) -> Result<T, CatalogError> {
        self.simulate_latency().await;

        if let Some(error) = self.errors.read().await.get(&table.fqn()) {
            return Err(error.clone());
        }

        let tables = self.tables.read().await;
        tables
            .get(&table.fqn())
            .map(f)
            .ok_or_else(|| CatalogError::TableNotFound(table.fqn()))
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockAdapter {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            errors: Arc::clone(&self.errors),
            executed: Arc::clone(&self.executed),
            spatial_fetches: Arc::clone(&self.spatial_fetches),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            adapter_name: self.adapter_name,
        }
    }
}

#[async_trait::async_trait]
impl CatalogAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        self.adapter_name
    }

    async fn fetch_columns(&self, table: &TableIdentifier) -> Result<Vec<RawColumn>, CatalogError> {
        self.lookup(table, |t| t.columns.clone()).await
    }

    async fn fetch_spatial_columns(
        &self,
        table: &TableIdentifier,
    ) -> Result<Vec<SpatialColumnRow>, CatalogError> {
        self.spatial_fetches.fetch_add(1, Ordering::SeqCst);
        // catalog views simply have no rows for unknown tables
        match self.lookup(table, |t| t.spatial.clone()).await {
            Err(CatalogError::TableNotFound(_)) => Ok(Vec::new()),
            result => result,
        }
    }

    async fn fetch_indexes(&self, table: &TableIdentifier) -> Result<Vec<RawIndex>, CatalogError> {
        match self.lookup(table, |t| t.indexes.clone()).await {
            Err(CatalogError::TableNotFound(_)) => Ok(Vec::new()),
            result => result,
        }
    }

    async fn execute(&self, sql: &str) -> Result<(), CatalogError> {
        self.simulate_latency().await;

        if self.fail_connection {
            return Err(CatalogError::NetworkError(
                "Simulated connection failure".to_string(),
            ));
        }
        self.executed.write().await.push(sql.to_string());
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), CatalogError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(CatalogError::NetworkError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Builder for creating MockAdapter with multiple tables
///
/// # Example
///
/// ```rust,ignore
/// let adapter = MockAdapterBuilder::new()
///     .with_table("public", "spatial_test", vec![
///         RawColumn::new("id", "bigint").not_null(),
///         RawColumn::new("latlon", "geometry(Point,4326)"),
///     ])
///     .with_latency(50)
///     .build();
/// ```
pub struct MockAdapterBuilder {
    tables: HashMap<String, MockTable>,
    errors: HashMap<String, CatalogError>,
    fail_connection: bool,
    latency_ms: u64,
    adapter_name: &'static str,
}

impl MockAdapterBuilder {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
            fail_connection: false,
            latency_ms: 0,
            adapter_name: "Mock",
        }
    }

    /// Add the columns of a table
    pub fn with_table(mut self, schema: &str, table: &str, columns: Vec<RawColumn>) -> Self {
        let fqn = TableIdentifier::new(schema, table).fqn();
        self.tables.entry(fqn).or_default().columns = columns;
        self
    }

    /// Add spatial catalog rows for a table
    pub fn with_spatial_rows(mut self, schema: &str, table: &str, rows: Vec<SpatialColumnRow>) -> Self {
        let fqn = TableIdentifier::new(schema, table).fqn();
        self.tables.entry(fqn).or_default().spatial = rows;
        self
    }

    pub fn with_indexes(mut self, schema: &str, table: &str, indexes: Vec<RawIndex>) -> Self {
        let fqn = TableIdentifier::new(schema, table).fqn();
        self.tables.entry(fqn).or_default().indexes = indexes;
        self
    }

    /// Add an error for a specific table
    pub fn with_error(mut self, schema: &str, table: &str, error: CatalogError) -> Self {
        self.errors.insert(TableIdentifier::new(schema, table).fqn(), error);
        self
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.adapter_name = name;
        self
    }

    pub fn build(self) -> MockAdapter {
        MockAdapter {
            tables: Arc::new(RwLock::new(self.tables)),
            errors: Arc::new(RwLock::new(self.errors)),
            executed: Arc::new(RwLock::new(Vec::new())),
            spatial_fetches: Arc::new(AtomicUsize::new(0)),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            adapter_name: self.adapter_name,
        }
    }
}

impl Default for MockAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
