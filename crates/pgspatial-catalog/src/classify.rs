//! Classification of raw catalog rows into reflected columns
//!
//! Spatial metadata comes from two places that may disagree in detail:
//! - the formatted column type, which carries a typmod on PostGIS 2+
//!   (`geometry(PointZ,4326)`), and
//! - the `geometry_columns` / `geography_columns` rows, which are the only
//!   source for columns registered through `AddGeometryColumn` (plain
//!   `geometry` type plus CHECK constraints).
//!
//! The typmod wins when present; otherwise the catalog row is used.

use crate::adapter::{RawColumn, SpatialColumnRow};
use pgspatial_core::{
    split_dimension_suffix, Column, ColumnType, DefaultValue, GeometricType, SpatialInfo,
    DEFAULT_SRID, GEOGRAPHIC_SRID,
};
use std::collections::HashMap;

/// A `geometry`/`geography` SQL type, with its typmod if it has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialSqlType {
    pub geographic: bool,

    /// Type from the typmod; `None` for a bare `geometry`
    pub geometric_type: Option<GeometricType>,

    pub has_z: bool,

    pub has_m: bool,

    pub srid: Option<i32>,
}

/// Parse a formatted SQL type, returning `None` for non-spatial types
///
/// Handles:
/// - `geometry`, `geography`
/// - `geometry(Point)`, `geometry(PolygonM,3785)`, `geography(PointZ,4326)`
/// - schema-qualified names such as `postgis.geometry(Point,4326)`
pub fn parse_spatial_sql_type(sql_type: &str) -> Option<SpatialSqlType> {
    let sql_type = sql_type.trim();
    let (base, params) = match sql_type.split_once('(') {
        Some((base, rest)) => (base.trim(), rest.trim().strip_suffix(')')),
        None => (sql_type, None),
    };

    let base = base.rsplit('.').next().unwrap_or(base).trim_matches('"');
    let geographic = match base.to_ascii_lowercase().as_str() {
        "geometry" => false,
        "geography" => true,
        _ => return None,
    };

    let mut parsed = SpatialSqlType {
        geographic,
        geometric_type: None,
        has_z: false,
        has_m: false,
        srid: None,
    };

    if let Some(params) = params {
        let mut parts = params.split(',').map(str::trim);
        if let Some((ty, has_z, has_m)) = parts.next().and_then(split_dimension_suffix) {
            parsed.geometric_type = Some(ty);
            parsed.has_z = has_z;
            parsed.has_m = has_m;
        }
        parsed.srid = parts.next().and_then(|srid| srid.parse().ok());
    }

    Some(parsed)
}

/// Whether a formatted SQL type is `geometry` or `geography`
pub fn is_spatial_sql_type(sql_type: &str) -> bool {
    parse_spatial_sql_type(sql_type).is_some()
}

impl SpatialColumnRow {
    /// Geometric type and Z/M flags encoded in this row
    ///
    /// `geometry_columns` spells M-only types with a suffix (`POINTM`, dimension 3),
    /// while Z is only visible through the coordinate dimension.
    pub fn dimensions(&self) -> (GeometricType, bool, bool) {
        let (ty, suffix_z, has_m) =
            split_dimension_suffix(&self.geometry_type).unwrap_or((GeometricType::Geometry, false, false));
        let extra = self.coord_dimension - 2 - i32::from(has_m);
        (ty, suffix_z || extra > 0, has_m)
    }

    /// Spatial metadata from this row alone
    pub fn to_spatial_info(&self) -> SpatialInfo {
        let (geometric_type, has_z, has_m) = self.dimensions();
        SpatialInfo {
            geometric_type,
            srid: if self.geographic { GEOGRAPHIC_SRID } else { self.srid },
            has_z,
            has_m,
            geographic: self.geographic,
            has_spatial_constraints: true,
        }
    }
}

/// Combine the parsed SQL type with the catalog row, if any
pub fn spatial_info(parsed: &SpatialSqlType, row: Option<&SpatialColumnRow>) -> SpatialInfo {
    let geographic = parsed.geographic || row.is_some_and(|r| r.geographic);

    let (geometric_type, has_z, has_m) = match (parsed.geometric_type, row) {
        (Some(ty), _) => (ty, parsed.has_z, parsed.has_m),
        (None, Some(row)) => row.dimensions(),
        (None, None) => (GeometricType::Geometry, false, false),
    };

    let srid = if geographic {
        GEOGRAPHIC_SRID
    } else {
        parsed
            .srid
            .or(row.map(|r| r.srid))
            .unwrap_or(DEFAULT_SRID)
    };

    SpatialInfo {
        geometric_type,
        srid,
        has_z,
        has_m,
        geographic,
        has_spatial_constraints: parsed.geometric_type.is_some() || row.is_some(),
    }
}

/// Build a reflected column from its raw row and the table's spatial rows
pub fn classify_column(raw: &RawColumn, spatial_rows: &HashMap<String, SpatialColumnRow>) -> Column {
    let element_type = raw.sql_type.trim_end_matches("[]");
    let array = raw.array || element_type.len() != raw.sql_type.len();

    let mut column = match parse_spatial_sql_type(element_type) {
        Some(parsed) => Column::new(&raw.name, &raw.sql_type, ColumnType::Spatial)
            .with_spatial(spatial_info(&parsed, spatial_rows.get(&raw.name))),
        None => Column::new(&raw.name, &raw.sql_type, map_postgres_type(element_type)),
    };

    column = column.with_null(!raw.not_null).with_array(array);
    if let Some(default) = &raw.default {
        column = column.with_default(DefaultValue::parse(default));
    }
    column
}

/// Convert a formatted PostgreSQL type to a [`ColumnType`]
///
/// # Supported Types
///
/// - **Integer**: `smallint`, `integer`, `bigint` (and aliases)
/// - **Floating Point**: `real`, `double precision`
/// - **Numeric**: `numeric(p,s)`, `decimal(p,s)`, `money`
/// - **String**: `character varying`, `character`, `name`, `citext`
/// - **Text**: `text`, `xml`
/// - **Date/Time**: `date`, `timestamp[tz]`, `time[tz]`
/// - **JSON**: `json`, `jsonb`
/// - **Spatial**: `geometry`, `geography`
pub fn map_postgres_type(pg_type: &str) -> ColumnType {
    let base_type = pg_type.split('(').next()
        .unwrap_or(pg_type)
        .trim()
        .to_lowercase();

    match base_type.as_str() {
        "boolean" | "bool" => ColumnType::Boolean,

        "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" => ColumnType::Integer,
        "serial" | "serial4" | "bigserial" | "serial8" | "smallserial" | "serial2" => ColumnType::Integer,

        "real" | "float4" | "double precision" | "float8" | "float" => ColumnType::Float,

        "numeric" | "decimal" => parse_numeric_type(pg_type),
        "money" => ColumnType::Decimal {
            precision: Some(19),
            scale: Some(2),
        },

        "character varying" | "varchar" => ColumnType::String,
        "character" | "char" | "bpchar" => ColumnType::String,
        "name" | "citext" => ColumnType::String,
        "text" | "xml" => ColumnType::Text,

        "bytea" => ColumnType::Binary,

        "date" => ColumnType::Date,
        "timestamp without time zone" | "timestamp" => ColumnType::DateTime,
        "timestamp with time zone" | "timestamptz" => ColumnType::DateTime,
        "time without time zone" | "time" => ColumnType::Time,
        "time with time zone" | "timetz" => ColumnType::Time,

        "json" | "jsonb" => ColumnType::Json,

        "uuid" => ColumnType::Uuid,

        "geometry" | "geography" => ColumnType::Spatial,

        _ => ColumnType::Unknown,
    }
}

/// Parse numeric type with precision and scale
///
/// Handles types like:
/// - `numeric` - arbitrary precision
/// - `numeric(10)` - precision 10, scale 0
/// - `numeric(10,2)` - precision 10, scale 2
fn parse_numeric_type(type_str: &str) -> ColumnType {
    if let Some(params) = type_str.split('(').nth(1) {
        if let Some(params) = params.strip_suffix(')') {
            let parts: Vec<&str> = params.split(',').collect();
            if parts.len() == 2 {
                let precision = parts[0].trim().parse().ok();
                let scale = parts[1].trim().parse().ok();
                return ColumnType::Decimal { precision, scale };
            } else if parts.len() == 1 {
                let precision = parts[0].trim().parse().ok();
                return ColumnType::Decimal { precision, scale: Some(0) };
            }
        }
    }

    ColumnType::Decimal {
        precision: None,
        scale: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(rows: Vec<SpatialColumnRow>) -> HashMap<String, SpatialColumnRow> {
        rows.into_iter().map(|r| (r.column.clone(), r)).collect()
    }

    #[test]
    fn test_parse_typmod_types() {
        let parsed = parse_spatial_sql_type("geometry(PolygonM,3785)").unwrap();
        assert!(!parsed.geographic);
        assert_eq!(parsed.geometric_type, Some(GeometricType::Polygon));
        assert!(!parsed.has_z);
        assert!(parsed.has_m);
        assert_eq!(parsed.srid, Some(3785));

        let parsed = parse_spatial_sql_type("geography(PointZ,4326)").unwrap();
        assert!(parsed.geographic);
        assert!(parsed.has_z);
        assert_eq!(parsed.geometric_type, Some(GeometricType::Point));

        let parsed = parse_spatial_sql_type("postgis.geometry(MultiLineString)").unwrap();
        assert_eq!(parsed.geometric_type, Some(GeometricType::MultiLineString));
        assert_eq!(parsed.srid, None);
    }

    #[test]
    fn test_parse_bare_and_non_spatial_types() {
        let parsed = parse_spatial_sql_type("geometry").unwrap();
        assert_eq!(parsed.geometric_type, None);
        assert_eq!(parsed.srid, None);

        assert!(parse_spatial_sql_type("character varying").is_none());
        assert!(parse_spatial_sql_type("point").is_none());
        assert!(!is_spatial_sql_type("integer"));
        assert!(is_spatial_sql_type("GEOGRAPHY"));
    }

    #[test]
    fn test_row_dimensions() {
        assert_eq!(
            SpatialColumnRow::geometry("g", "POINTM", 0, 3).dimensions(),
            (GeometricType::Point, false, true)
        );
        assert_eq!(
            SpatialColumnRow::geometry("g", "POINT", 0, 3).dimensions(),
            (GeometricType::Point, true, false)
        );
        assert_eq!(
            SpatialColumnRow::geometry("g", "POLYGON", 0, 4).dimensions(),
            (GeometricType::Polygon, true, true)
        );
        assert_eq!(
            SpatialColumnRow::geometry("g", "GEOMETRY", 0, 2).dimensions(),
            (GeometricType::Geometry, false, false)
        );
    }

    #[test]
    fn test_classify_typmod_column() {
        let raw = RawColumn::new("region", "geometry(PolygonM,3785)");
        let column = classify_column(&raw, &HashMap::new());

        assert_eq!(column.column_type, ColumnType::Spatial);
        assert_eq!(column.geometric_type(), Some(GeometricType::Polygon));
        assert_eq!(column.srid(), Some(3785));
        assert_eq!(column.has_z(), Some(false));
        assert_eq!(column.has_m(), Some(true));
        assert!(!column.is_geographic());
        assert!(column.has_spatial_constraints());
    }

    #[test]
    fn test_classify_legacy_column_from_row() {
        let raw = RawColumn::new("geom2", "geometry");
        let spatial = rows(vec![SpatialColumnRow::geometry("geom2", "POINT", 4326, 2)]);
        let column = classify_column(&raw, &spatial);

        assert_eq!(column.geometric_type(), Some(GeometricType::Point));
        assert_eq!(column.srid(), Some(4326));
        assert!(column.has_spatial_constraints());
    }

    #[test]
    fn test_classify_unconstrained_geometry() {
        let column = classify_column(&RawColumn::new("geom", "geometry"), &HashMap::new());

        assert_eq!(column.geometric_type(), Some(GeometricType::Geometry));
        assert_eq!(column.srid(), Some(0));
        assert!(!column.has_spatial_constraints());
    }

    #[test]
    fn test_geography_always_reports_4326() {
        let column = classify_column(&RawColumn::new("latlon", "geography"), &HashMap::new());
        assert!(column.is_geographic());
        assert_eq!(column.srid(), Some(4326));

        let row = SpatialColumnRow::geography("latlon", "Point", 4269, 2);
        assert_eq!(row.to_spatial_info().srid, 4326);
    }

    #[test]
    fn test_classify_ordinary_columns() {
        let spatial = HashMap::new();

        let column = classify_column(&RawColumn::new("nulls_disallowed", "character varying").not_null(), &spatial);
        assert_eq!(column.column_type, ColumnType::String);
        assert!(!column.null);
        assert!(!column.is_spatial());

        let column = classify_column(
            &RawColumn::new("sample_integer_neg_default", "integer").with_default("'-1'::integer"),
            &spatial,
        );
        assert_eq!(column.column_type, ColumnType::Integer);
        assert_eq!(column.default, Some(DefaultValue::Integer(-1)));

        let column = classify_column(&RawColumn::new("sample_array", "character varying[]").array(), &spatial);
        assert_eq!(column.column_type, ColumnType::String);
        assert!(column.array);
    }

    #[test]
    fn test_basic_type_mapping() {
        assert_eq!(map_postgres_type("boolean"), ColumnType::Boolean);
        assert_eq!(map_postgres_type("bigint"), ColumnType::Integer);
        assert_eq!(map_postgres_type("double precision"), ColumnType::Float);
        assert_eq!(map_postgres_type("character varying(255)"), ColumnType::String);
        assert_eq!(map_postgres_type("text"), ColumnType::Text);
        assert_eq!(map_postgres_type("timestamp without time zone"), ColumnType::DateTime);
        assert_eq!(map_postgres_type("jsonb"), ColumnType::Json);
        assert_eq!(map_postgres_type("bytea"), ColumnType::Binary);
        assert_eq!(map_postgres_type("custom_type"), ColumnType::Unknown);
    }

    #[test]
    fn test_numeric_type_parsing() {
        assert_eq!(
            map_postgres_type("numeric"),
            ColumnType::Decimal { precision: None, scale: None }
        );
        assert_eq!(
            map_postgres_type("numeric(10,2)"),
            ColumnType::Decimal { precision: Some(10), scale: Some(2) }
        );
        assert_eq!(
            map_postgres_type("numeric(10)"),
            ColumnType::Decimal { precision: Some(10), scale: Some(0) }
        );
    }
}
