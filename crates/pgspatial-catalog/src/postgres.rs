//! PostgreSQL/PostGIS catalog adapter
//!
//! Reads table metadata straight from the system catalogs rather than
//! `information_schema`, since only `format_type()` exposes the PostGIS typmod
//! (`geometry(PointZ,4326)`):
//! - `pg_attribute` / `pg_attrdef` for columns and defaults
//! - `geometry_columns` / `geography_columns` for spatial registration
//! - `pg_index` / `pg_am` for indexes and their access method
//!
//! ## Usage
//!
//! ```rust,ignore
//! // Using connection string
//! let adapter = PostgresAdapter::from_connection_string(
//!     "host=localhost port=5432 dbname=postgis_test user=postgres"
//! ).await?;
//!
//! // Using the [database] section of pgspatial.toml
//! let adapter = PostgresAdapter::from_config(&config.database.unwrap()).await?;
//! ```

use crate::adapter::{CatalogAdapter, CatalogError, RawColumn, RawIndex, SpatialColumnRow};
use pgspatial_core::{DatabaseConfig, TableIdentifier};

#[cfg(feature = "postgres")]
use tokio_postgres::{config::Host, Client, Config as PgConfig, NoTls};

#[cfg(feature = "postgres")]
use postgres_native_tls::MakeTlsConnector;

#[cfg(feature = "postgres")]
use native_tls::TlsConnector;

#[cfg(feature = "postgres")]
const COLUMNS_QUERY: &str = r#"
    SELECT
        a.attname::text,
        format_type(a.atttypid, a.atttypmod),
        pg_get_expr(d.adbin, d.adrelid),
        a.attnotnull,
        a.attndims::int4
    FROM pg_attribute a
    JOIN pg_class c ON c.oid = a.attrelid
    JOIN pg_namespace n ON n.oid = c.relnamespace
    LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
    WHERE n.nspname = $1
      AND c.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

#[cfg(feature = "postgres")]
const SPATIAL_COLUMNS_QUERY: &str = r#"
    SELECT f_geometry_column::text, type::text, srid::int4, coord_dimension::int4, false
    FROM geometry_columns
    WHERE f_table_schema::text = $1 AND f_table_name::text = $2
    UNION ALL
    SELECT f_geography_column::text, type::text, srid::int4, coord_dimension::int4, true
    FROM geography_columns
    WHERE f_table_schema::text = $1 AND f_table_name::text = $2
"#;

#[cfg(feature = "postgres")]
const INDEXES_QUERY: &str = r#"
    SELECT
        i.relname::text,
        ix.indisunique,
        am.amname::text,
        array_agg(a.attname::text ORDER BY k.ord)
    FROM pg_index ix
    JOIN pg_class t ON t.oid = ix.indrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_class i ON i.oid = ix.indexrelid
    JOIN pg_am am ON am.oid = i.relam
    CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE n.nspname = $1
      AND t.relname = $2
      AND NOT ix.indisprimary
    GROUP BY i.oid, i.relname, ix.indisunique, am.amname
    ORDER BY i.oid
"#;

#[cfg(not(feature = "postgres"))]
const FEATURE_DISABLED: &str =
    "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres";

/// PostgreSQL catalog adapter
///
/// Supports both plain and TLS connections.
pub struct PostgresAdapter {
    /// PostgreSQL client (only available with postgres feature)
    #[cfg(feature = "postgres")]
    client: Client,

    host: String,

    port: u16,

    database: String,

    #[cfg(not(feature = "postgres"))]
    _phantom: std::marker::PhantomData<()>,
}

impl PostgresAdapter {
    /// Connect using the `[database]` section of the configuration
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, CatalogError> {
        let conn_str = config.connection_string();
        if config.tls {
            Self::from_connection_string_with_tls(&conn_str).await
        } else {
            Self::from_connection_string(&conn_str).await
        }
    }

    /// Create adapter from a key/value connection string or a `postgres://` URL
    ///
    /// ```rust,ignore
    /// let adapter = PostgresAdapter::from_connection_string(
    ///     "host=localhost port=5432 dbname=postgis_test user=postgres password=secret"
    /// ).await?;
    /// ```
    #[cfg(feature = "postgres")]
    pub async fn from_connection_string(conn_str: &str) -> Result<Self, CatalogError> {
        let config = parse_config(conn_str)?;
        let (host, port, database) = describe(&config);

        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| CatalogError::AuthenticationError(format!(
                "Failed to connect to PostgreSQL at {}:{}: {}",
                host, port, e
            )))?;

        let label = format!("{}:{}", host, port);
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(server = %label, error = %e, "PostgreSQL connection error");
            }
        });

        tracing::debug!(%host, port, %database, "connected to PostgreSQL");
        Ok(Self {
            client,
            host,
            port,
            database,
        })
    }

    #[cfg(not(feature = "postgres"))]
    pub async fn from_connection_string(_conn_str: &str) -> Result<Self, CatalogError> {
        Err(CatalogError::ConfigError(FEATURE_DISABLED.to_string()))
    }

    /// Create adapter from a connection string, always using TLS
    ///
    /// The `sslmode` setting is ignored.
    #[cfg(feature = "postgres")]
    pub async fn from_connection_string_with_tls(conn_str: &str) -> Result<Self, CatalogError> {
        let config = parse_config(conn_str)?;
        let (host, port, database) = describe(&config);

        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| CatalogError::ConfigError(format!(
                "Failed to create TLS connector: {}", e
            )))?;
        let tls = MakeTlsConnector::new(connector);

        let (client, connection) = config
            .connect(tls)
            .await
            .map_err(|e| CatalogError::AuthenticationError(format!(
                "Failed to connect to PostgreSQL at {}:{} with TLS: {}",
                host, port, e
            )))?;

        let label = format!("{}:{}", host, port);
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(server = %label, error = %e, "PostgreSQL TLS connection error");
            }
        });

        tracing::debug!(%host, port, %database, "connected to PostgreSQL with TLS");
        Ok(Self {
            client,
            host,
            port,
            database,
        })
    }

    #[cfg(not(feature = "postgres"))]
    pub async fn from_connection_string_with_tls(_conn_str: &str) -> Result<Self, CatalogError> {
        Err(CatalogError::ConfigError(FEATURE_DISABLED.to_string()))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    #[cfg(feature = "postgres")]
    async fn query(
        &self,
        sql: &str,
        table: &TableIdentifier,
    ) -> Result<Vec<tokio_postgres::Row>, CatalogError> {
        tracing::debug!(table = %table, "querying catalog");
        self.client
            .query(sql, &[&table.schema, &table.table])
            .await
            .map_err(|e| map_query_error(table, e.to_string()))
    }
}

#[cfg(feature = "postgres")]
fn parse_config(conn_str: &str) -> Result<PgConfig, CatalogError> {
    conn_str
        .parse()
        .map_err(|e| CatalogError::ConfigError(format!("Invalid connection string: {}", e)))
}

/// Host, port and database name for logging
#[cfg(feature = "postgres")]
fn describe(config: &PgConfig) -> (String, u16, String) {
    let host = match config.get_hosts().first() {
        Some(Host::Tcp(host)) => host.clone(),
        #[cfg(unix)]
        Some(Host::Unix(path)) => path.display().to_string(),
        None => "localhost".to_string(),
    };
    let port = config.get_ports().first().copied().unwrap_or(5432);
    let database = config.get_dbname().unwrap_or("postgres").to_string();
    (host, port, database)
}

#[cfg(any(feature = "postgres", test))]
fn map_query_error(table: &TableIdentifier, message: String) -> CatalogError {
    if message.contains("does not exist") {
        CatalogError::TableNotFound(format!("{}: {}", table.fqn(), message))
    } else if message.contains("permission denied") {
        CatalogError::PermissionDenied(format!("Cannot access {}: {}", table.fqn(), message))
    } else {
        CatalogError::QueryError(message)
    }
}

#[async_trait::async_trait]
impl CatalogAdapter for PostgresAdapter {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    #[cfg(feature = "postgres")]
    async fn fetch_columns(&self, table: &TableIdentifier) -> Result<Vec<RawColumn>, CatalogError> {
        let rows = self.query(COLUMNS_QUERY, table).await?;
        if rows.is_empty() {
            return Err(CatalogError::TableNotFound(format!(
                "Table {} not found or has no columns",
                table.fqn()
            )));
        }

        rows.iter()
            .map(|row| {
                let dims: i32 = row.try_get(4).map_err(invalid_response)?;
                Ok(RawColumn {
                    name: row.try_get(0).map_err(invalid_response)?,
                    sql_type: row.try_get(1).map_err(invalid_response)?,
                    default: row.try_get(2).map_err(invalid_response)?,
                    not_null: row.try_get(3).map_err(invalid_response)?,
                    array: dims > 0,
                })
            })
            .collect()
    }

    #[cfg(not(feature = "postgres"))]
    async fn fetch_columns(&self, _table: &TableIdentifier) -> Result<Vec<RawColumn>, CatalogError> {
        Err(CatalogError::ConfigError(FEATURE_DISABLED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn fetch_spatial_columns(
        &self,
        table: &TableIdentifier,
    ) -> Result<Vec<SpatialColumnRow>, CatalogError> {
        let rows = self.query(SPATIAL_COLUMNS_QUERY, table).await?;
        rows.iter()
            .map(|row| {
                Ok(SpatialColumnRow {
                    column: row.try_get(0).map_err(invalid_response)?,
                    geometry_type: row.try_get(1).map_err(invalid_response)?,
                    srid: row.try_get(2).map_err(invalid_response)?,
                    coord_dimension: row.try_get(3).map_err(invalid_response)?,
                    geographic: row.try_get(4).map_err(invalid_response)?,
                })
            })
            .collect()
    }

    #[cfg(not(feature = "postgres"))]
    async fn fetch_spatial_columns(
        &self,
        _table: &TableIdentifier,
    ) -> Result<Vec<SpatialColumnRow>, CatalogError> {
        Err(CatalogError::ConfigError(FEATURE_DISABLED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn fetch_indexes(&self, table: &TableIdentifier) -> Result<Vec<RawIndex>, CatalogError> {
        let rows = self.query(INDEXES_QUERY, table).await?;
        rows.iter()
            .map(|row| {
                Ok(RawIndex {
                    name: row.try_get(0).map_err(invalid_response)?,
                    unique: row.try_get(1).map_err(invalid_response)?,
                    access_method: row.try_get(2).map_err(invalid_response)?,
                    columns: row.try_get(3).map_err(invalid_response)?,
                })
            })
            .collect()
    }

    #[cfg(not(feature = "postgres"))]
    async fn fetch_indexes(&self, _table: &TableIdentifier) -> Result<Vec<RawIndex>, CatalogError> {
        Err(CatalogError::ConfigError(FEATURE_DISABLED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn execute(&self, sql: &str) -> Result<(), CatalogError> {
        self.client.batch_execute(sql).await.map_err(|e| {
            let message = e.to_string();
            if message.contains("permission denied") {
                CatalogError::PermissionDenied(message)
            } else {
                CatalogError::QueryError(format!("{}: {}", sql, message))
            }
        })
    }

    #[cfg(not(feature = "postgres"))]
    async fn execute(&self, _sql: &str) -> Result<(), CatalogError> {
        Err(CatalogError::ConfigError(FEATURE_DISABLED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn test_connection(&self) -> Result<(), CatalogError> {
        self.client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| CatalogError::QueryError(format!("Connection test failed: {}", e)))?;
        Ok(())
    }

    #[cfg(not(feature = "postgres"))]
    async fn test_connection(&self) -> Result<(), CatalogError> {
        Err(CatalogError::ConfigError(FEATURE_DISABLED.to_string()))
    }
}

#[cfg(feature = "postgres")]
fn invalid_response(e: tokio_postgres::Error) -> CatalogError {
    CatalogError::InvalidResponse(e.to_string())
}
