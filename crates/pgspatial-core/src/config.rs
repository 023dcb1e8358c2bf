//! Configuration schema (pgspatial.toml)

use serde::{Deserialize, Serialize};
use crate::schema::DEFAULT_SCHEMA;
use crate::spatial::DEFAULT_SRID;

/// How spatial columns are written out in DDL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DdlStyle {
    /// Inline typmod columns, `geometry(Point,4326)` (PostGIS 2+)
    Typed,

    /// `SELECT AddGeometryColumn(...)` after table creation (PostGIS 1.x)
    AddGeometryColumn,
}

impl Default for DdlStyle {
    fn default() -> Self {
        Self::Typed
    }
}

impl std::str::FromStr for DdlStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "typed" => Ok(Self::Typed),
            "add_geometry_column" | "legacy" => Ok(Self::AddGeometryColumn),
            other => Err(ConfigError::ParseError(format!("unknown DDL style: {}", other))),
        }
    }
}

/// DDL rendering settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlConfig {
    #[serde(default)]
    pub style: DdlStyle,

    /// SRID given to planar columns that don't request one
    #[serde(default = "default_srid")]
    pub default_srid: i32,
}

fn default_srid() -> i32 {
    DEFAULT_SRID
}

impl Default for DdlConfig {
    fn default() -> Self {
        Self {
            style: DdlStyle::default(),
            default_srid: DEFAULT_SRID,
        }
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub dbname: String,

    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Schema used for unqualified table names
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Connect over TLS
    #[serde(default)]
    pub tls: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// Quote a libpq keyword value, escaping `\` and `'`
fn conn_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl DatabaseConfig {
    /// libpq-style connection string with every value quoted
    pub fn connection_string(&self) -> String {
        let mut conn = format!(
            "host={} port={} dbname={} user={}",
            conn_value(&self.host),
            self.port,
            conn_value(&self.dbname),
            conn_value(&self.user)
        );
        if let Some(password) = &self.password {
            conn.push_str(" password=");
            conn.push_str(&conn_value(password));
        }
        conn
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ddl: DdlConfig,

    /// Database connection (needed for apply/inspect)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config.ddl.default_srid < 0 {
            return Err(ConfigError::ParseError(format!(
                "ddl.default_srid must not be negative, got {}",
                config.ddl.default_srid
            )));
        }
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Schema for unqualified table names
    pub fn default_schema(&self) -> &str {
        self.database
            .as_ref()
            .map(|db| db.schema.as_str())
            .unwrap_or(DEFAULT_SCHEMA)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
