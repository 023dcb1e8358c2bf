//! SQL rendering for column, table and index DDL
//!
//! Two styles are supported (see [`DdlStyle`]):
//! - `Typed` writes spatial columns inline with a typmod:
//!   `"latlon" geometry(Point,4326)`.
//! - `AddGeometryColumn` leaves planar geometry columns out of the table
//!   body and registers them through PostGIS 1.x management functions.
//!   Geography columns are always inline.
//!
//! Reference: https://postgis.net/docs/AddGeometryColumn.html

use crate::column::{ColumnDefinition, Limit, SqlType};
use crate::error::DdlError;
use pgspatial_core::{quote_ident, quote_literal, DdlConfig, DdlStyle, SpatialColumnSpec, TableIdentifier};
use serde::{Deserialize, Serialize};

/// Options for `index`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Explicit index name (defaults to `index_<table>_on_<columns>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub unique: bool,

    /// Build a GIST index
    pub spatial: bool,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// GIST index options
    pub fn spatial() -> Self {
        Self {
            spatial: true,
            ..Self::default()
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An index requested on a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub columns: Vec<String>,

    #[serde(flatten)]
    pub options: IndexOptions,
}

impl IndexSpec {
    pub fn new(columns: Vec<String>, options: IndexOptions) -> Self {
        Self { columns, options }
    }

    /// Index name, explicit or derived from table and columns
    pub fn name(&self, table: &TableIdentifier) -> String {
        self.options
            .name
            .clone()
            .unwrap_or_else(|| default_index_name(&table.table, &self.columns))
    }
}

/// `index_<table>_on_<col1>_and_<col2>`
pub fn default_index_name(table: &str, columns: &[String]) -> String {
    format!("index_{}_on_{}", table, columns.join("_and_"))
}

/// A rendered column: either inline in the table body or added afterwards
pub(crate) enum RenderedColumn {
    Inline(String),
    Managed(Vec<String>),
}

/// Native SQL type for a non-spatial column
fn native_type(column: &ColumnDefinition) -> String {
    let options = &column.options;
    match column.sql_type {
        SqlType::PrimaryKey => "bigserial primary key".to_string(),
        SqlType::String => match options.limit {
            Some(Limit::Length(length)) => format!("character varying({})", length),
            _ => "character varying".to_string(),
        },
        SqlType::Text => "text".to_string(),
        SqlType::Integer => "integer".to_string(),
        SqlType::BigInt => "bigint".to_string(),
        SqlType::Float => "float".to_string(),
        SqlType::Decimal => match (options.precision, options.scale) {
            (Some(p), Some(s)) => format!("decimal({},{})", p, s),
            (Some(p), None) => format!("decimal({})", p),
            _ => "decimal".to_string(),
        },
        SqlType::Boolean => "boolean".to_string(),
        SqlType::Date => "date".to_string(),
        SqlType::DateTime => "timestamp".to_string(),
        SqlType::Time => "time".to_string(),
        SqlType::Json => "json".to_string(),
        SqlType::Jsonb => "jsonb".to_string(),
        SqlType::Binary => "bytea".to_string(),
        SqlType::Uuid => "uuid".to_string(),
        SqlType::Spatial(ty) => ty.typmod_name().to_string(),
    }
}

/// Typmod form of a spatial column type, e.g. `geography(PointZ,4326)`
pub fn spatial_type_sql(spec: &SpatialColumnSpec, default_srid: i32) -> String {
    format!(
        "{}({},{})",
        spec.storage_type(),
        spec.typmod_token(),
        spec.effective_srid(default_srid)
    )
}

/// Column body without the name: type, array suffix, default and nullability
fn column_body(type_sql: String, column: &ColumnDefinition) -> String {
    let mut sql = type_sql;
    if column.options.array {
        sql.push_str("[]");
    }
    if let Some(default) = &column.options.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.to_sql());
    }
    if column.options.null == Some(false) {
        sql.push_str(" NOT NULL");
    }
    sql
}

/// Spatial spec of a column, rejecting a negative SRID taken from `default_srid`
fn checked_spec(column: &ColumnDefinition, config: &DdlConfig) -> Result<Option<SpatialColumnSpec>, DdlError> {
    let Some(spec) = column.spatial_spec()? else {
        return Ok(None);
    };
    let srid = spec.effective_srid(config.default_srid);
    if srid < 0 {
        return Err(DdlError::InvalidSrid {
            column: column.name.clone(),
            srid,
        });
    }
    Ok(Some(spec))
}

/// Inline column definition, `"name" <type> ...`
pub fn column_sql(column: &ColumnDefinition, config: &DdlConfig) -> Result<String, DdlError> {
    let type_sql = match checked_spec(column, config)? {
        Some(spec) => spatial_type_sql(&spec, config.default_srid),
        None => native_type(column),
    };
    Ok(format!("{} {}", quote_ident(&column.name), column_body(type_sql, column)))
}

/// `SELECT AddGeometryColumn(...)` plus follow-up statements for nullability and defaults
pub fn add_geometry_column_sql(
    table: &TableIdentifier,
    column: &ColumnDefinition,
    spec: &SpatialColumnSpec,
    default_srid: i32,
) -> Vec<String> {
    let mut statements = vec![format!(
        "SELECT AddGeometryColumn({}, {}, {}, {}, {}, {})",
        quote_literal(&table.schema),
        quote_literal(&table.table),
        quote_literal(&spec.name),
        spec.effective_srid(default_srid),
        quote_literal(&spec.postgis_type_token()),
        spec.dimension()
    )];

    if let Some(default) = &column.options.default {
        statements.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
            table.quoted(),
            quote_ident(&spec.name),
            default.to_sql()
        ));
    }
    if column.options.null == Some(false) {
        statements.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
            table.quoted(),
            quote_ident(&spec.name)
        ));
    }
    statements
}

/// Render a column for the configured style
///
/// `AddGeometryColumn` cannot create array columns, so spatial arrays are
/// written inline with a typmod in either style.
pub(crate) fn render_column(
    table: &TableIdentifier,
    column: &ColumnDefinition,
    config: &DdlConfig,
) -> Result<RenderedColumn, DdlError> {
    if config.style == DdlStyle::AddGeometryColumn && !column.options.array {
        if let Some(spec) = checked_spec(column, config)? {
            if !spec.geographic {
                return Ok(RenderedColumn::Managed(add_geometry_column_sql(
                    table,
                    column,
                    &spec,
                    config.default_srid,
                )));
            }
        }
    }
    column_sql(column, config).map(RenderedColumn::Inline)
}

/// `CREATE [UNIQUE ]INDEX ... [USING GIST ](...)`
pub fn index_sql(table: &TableIdentifier, index: &IndexSpec) -> Result<String, DdlError> {
    let name = index.name(table);
    if index.columns.is_empty() {
        return Err(DdlError::EmptyIndex(table.fqn()));
    }
    if index.options.spatial && index.options.unique {
        return Err(DdlError::UniqueSpatialIndex(name));
    }

    let columns = index
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "CREATE {}INDEX {} ON {} {}({})",
        if index.options.unique { "UNIQUE " } else { "" },
        quote_ident(&name),
        table.quoted(),
        if index.options.spatial { "USING GIST " } else { "" },
        columns
    ))
}

pub fn drop_index_sql(table: &TableIdentifier, name: &str) -> String {
    format!("DROP INDEX {}.{}", quote_ident(&table.schema), quote_ident(name))
}

pub fn drop_column_sql(table: &TableIdentifier, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", table.quoted(), quote_ident(column))
}

/// Drop a spatial column, unregistering it from `geometry_columns` in the legacy style
pub fn drop_spatial_column_sql(table: &TableIdentifier, column: &str, style: DdlStyle) -> String {
    match style {
        DdlStyle::Typed => drop_column_sql(table, column),
        DdlStyle::AddGeometryColumn => format!(
            "SELECT DropGeometryColumn({}, {}, {})",
            quote_literal(&table.schema),
            quote_literal(&table.table),
            quote_literal(column)
        ),
    }
}

pub fn drop_table_sql(table: &TableIdentifier, style: DdlStyle) -> String {
    match style {
        DdlStyle::Typed => format!("DROP TABLE {}", table.quoted()),
        DdlStyle::AddGeometryColumn => format!(
            "SELECT DropGeometryTable({}, {})",
            quote_literal(&table.schema),
            quote_literal(&table.table)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnOptions;
    use pgspatial_core::{DefaultValue, GeometricType};

    fn typed() -> DdlConfig {
        DdlConfig::default()
    }

    #[test]
    fn native_column_types() {
        let cases = [
            (SqlType::String, ColumnOptions::new(), "\"c\" character varying"),
            (SqlType::String, ColumnOptions::new().limit(40), "\"c\" character varying(40)"),
            (SqlType::Integer, ColumnOptions::new().default_value(DefaultValue::Integer(-1)), "\"c\" integer DEFAULT -1"),
            (SqlType::String, ColumnOptions::new().not_null(), "\"c\" character varying NOT NULL"),
            (SqlType::String, ColumnOptions::new().array(), "\"c\" character varying[]"),
            (SqlType::Decimal, ColumnOptions::new().precision(10, 2), "\"c\" decimal(10,2)"),
            (SqlType::DateTime, ColumnOptions::new(), "\"c\" timestamp"),
            (SqlType::PrimaryKey, ColumnOptions::new(), "\"c\" bigserial primary key"),
        ];

        for (sql_type, options, expected) in cases {
            let column = ColumnDefinition::new("c", sql_type, options);
            assert_eq!(column_sql(&column, &typed()).unwrap(), expected);
        }
    }

    #[test]
    fn spatial_column_types() {
        let column = ColumnDefinition::new("latlon", SqlType::Spatial(GeometricType::Geometry), ColumnOptions::new());
        assert_eq!(column_sql(&column, &typed()).unwrap(), "\"latlon\" geometry(Geometry,0)");

        let column = ColumnDefinition::new(
            "latlon",
            SqlType::Spatial(GeometricType::Point),
            ColumnOptions::new().geographic(),
        );
        assert_eq!(column_sql(&column, &typed()).unwrap(), "\"latlon\" geography(Point,4326)");

        let column = ColumnDefinition::new(
            "region",
            SqlType::Spatial(GeometricType::Polygon),
            ColumnOptions::new().has_m().srid(3785).not_null(),
        );
        assert_eq!(
            column_sql(&column, &typed()).unwrap(),
            "\"region\" geometry(PolygonM,3785) NOT NULL"
        );
    }

    #[test]
    fn default_srid_applies_to_planar_columns() {
        let config = DdlConfig {
            default_srid: 3857,
            ..DdlConfig::default()
        };
        let column = ColumnDefinition::new("pt", SqlType::Spatial(GeometricType::Point), ColumnOptions::new().has_z());
        assert_eq!(column_sql(&column, &config).unwrap(), "\"pt\" geometry(PointZ,3857)");
    }

    #[test]
    fn negative_default_srid_is_rejected() {
        let config = DdlConfig {
            default_srid: -1,
            ..DdlConfig::default()
        };
        let point = ColumnDefinition::new("pt", SqlType::Spatial(GeometricType::Point), ColumnOptions::new());
        assert_eq!(
            column_sql(&point, &config),
            Err(DdlError::InvalidSrid {
                column: "pt".to_string(),
                srid: -1,
            })
        );

        // explicit and geographic SRIDs don't fall back to the default
        let explicit = ColumnDefinition::new("pt", SqlType::Spatial(GeometricType::Point), ColumnOptions::new().srid(4326));
        assert_eq!(column_sql(&explicit, &config).unwrap(), "\"pt\" geometry(Point,4326)");
        let geography = ColumnDefinition::new("pt", SqlType::Spatial(GeometricType::Point), ColumnOptions::new().geographic());
        assert!(column_sql(&geography, &config).is_ok());

        let legacy = DdlConfig {
            style: DdlStyle::AddGeometryColumn,
            ..config
        };
        assert!(render_column(&TableIdentifier::public("t"), &point, &legacy).is_err());
    }

    #[test]
    fn add_geometry_column_statements() {
        let table = TableIdentifier::public("spatial_test");
        let column = ColumnDefinition::new(
            "region",
            SqlType::Spatial(GeometricType::Polygon),
            ColumnOptions::new().has_m().srid(3785).not_null(),
        );
        let spec = column.spatial_spec().unwrap().unwrap();

        assert_eq!(
            add_geometry_column_sql(&table, &column, &spec, 0),
            vec![
                "SELECT AddGeometryColumn('public', 'spatial_test', 'region', 3785, 'POLYGONM', 3)".to_string(),
                "ALTER TABLE \"public\".\"spatial_test\" ALTER COLUMN \"region\" SET NOT NULL".to_string(),
            ]
        );
    }

    #[test]
    fn index_statements() {
        let table = TableIdentifier::public("spatial_test");

        let spatial = IndexSpec::new(vec!["latlon".into()], IndexOptions::spatial());
        assert_eq!(
            index_sql(&table, &spatial).unwrap(),
            "CREATE INDEX \"index_spatial_test_on_latlon\" ON \"public\".\"spatial_test\" USING GIST (\"latlon\")"
        );

        let btree = IndexSpec::new(vec!["a".into(), "b".into()], IndexOptions::new().unique());
        assert_eq!(
            index_sql(&table, &btree).unwrap(),
            "CREATE UNIQUE INDEX \"index_spatial_test_on_a_and_b\" ON \"public\".\"spatial_test\" (\"a\", \"b\")"
        );
    }

    #[test]
    fn invalid_indexes() {
        let table = TableIdentifier::public("spatial_test");

        let empty = IndexSpec::new(vec![], IndexOptions::new());
        assert!(matches!(index_sql(&table, &empty), Err(DdlError::EmptyIndex(_))));

        let unique_gist = IndexSpec::new(vec!["latlon".into()], IndexOptions::spatial().unique());
        assert!(matches!(
            index_sql(&table, &unique_gist),
            Err(DdlError::UniqueSpatialIndex(_))
        ));
    }

    #[test]
    fn drop_statements() {
        let table = TableIdentifier::public("spatial_test");
        assert_eq!(drop_table_sql(&table, DdlStyle::Typed), "DROP TABLE \"public\".\"spatial_test\"");
        assert_eq!(
            drop_table_sql(&table, DdlStyle::AddGeometryColumn),
            "SELECT DropGeometryTable('public', 'spatial_test')"
        );
        assert_eq!(
            drop_spatial_column_sql(&table, "geom2", DdlStyle::AddGeometryColumn),
            "SELECT DropGeometryColumn('public', 'spatial_test', 'geom2')"
        );
        assert_eq!(
            drop_index_sql(&table, "index_spatial_test_on_latlon"),
            "DROP INDEX \"public\".\"index_spatial_test_on_latlon\""
        );
    }
}
