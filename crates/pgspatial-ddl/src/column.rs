//! Column definitions and their options
//!
//! A [`ColumnDefinition`] is what a migration asks for; spatial columns are
//! resolved into a [`SpatialColumnSpec`] before rendering, merging the
//! `limit` map with the explicit `srid`/`geographic`/`has_z`/`has_m` options.

use crate::error::DdlError;
use pgspatial_core::{DefaultValue, GeometricType, SpatialColumnSpec, SpatialLimit, GEOGRAPHIC_SRID};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column type requested in a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SqlType {
    /// `bigserial primary key`
    PrimaryKey,
    String,
    Text,
    Integer,
    BigInt,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Json,
    Jsonb,
    Binary,
    Uuid,
    /// `geometry`/`geography` column of the given type
    Spatial(GeometricType),
}

impl SqlType {
    /// Parse a type name as written in a migration (`string`, `point`, `spatial`, ...)
    pub fn parse(name: &str) -> Result<Self, DdlError> {
        let normalized = name.trim().to_ascii_lowercase();
        let ty = match normalized.as_str() {
            "primary_key" => Self::PrimaryKey,
            "string" => Self::String,
            "text" => Self::Text,
            "integer" => Self::Integer,
            "bigint" => Self::BigInt,
            "float" => Self::Float,
            "decimal" => Self::Decimal,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "datetime" | "timestamp" => Self::DateTime,
            "time" => Self::Time,
            "json" => Self::Json,
            "jsonb" => Self::Jsonb,
            "binary" => Self::Binary,
            "uuid" => Self::Uuid,
            "spatial" => Self::Spatial(GeometricType::Geometry),
            other => match GeometricType::parse(other) {
                Some(geometric_type) => Self::Spatial(geometric_type),
                None => return Err(DdlError::UnknownColumnType(name.to_string())),
            },
        };
        Ok(ty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryKey => "primary_key",
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Json => "json",
            Self::Jsonb => "jsonb",
            Self::Binary => "binary",
            Self::Uuid => "uuid",
            Self::Spatial(ty) => ty.as_str(),
        }
    }

    pub fn is_spatial(&self) -> bool {
        matches!(self, Self::Spatial(_))
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SqlType {
    type Err = DdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SqlType {
    type Error = DdlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SqlType> for String {
    fn from(value: SqlType) -> Self {
        value.as_str().to_string()
    }
}

/// The `limit` option: a length for strings, a spatial map for spatial columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Limit {
    Length(u32),
    Spatial(SpatialLimit),
}

/// Options accepted by every column helper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,

    pub array: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub srid: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub geographic: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_z: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_m: Option<bool>,
}

impl ColumnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn null(mut self, null: bool) -> Self {
        self.null = Some(null);
        self
    }

    pub fn not_null(self) -> Self {
        self.null(false)
    }

    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Length limit for string columns
    pub fn limit(mut self, length: u32) -> Self {
        self.limit = Some(Limit::Length(length));
        self
    }

    /// Spatial limit map (`type`, `srid`, `has_z`, `has_m`, `geographic`)
    pub fn spatial_limit(mut self, limit: SpatialLimit) -> Self {
        self.limit = Some(Limit::Spatial(limit));
        self
    }

    pub fn precision(mut self, precision: u16, scale: u16) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn geographic(mut self) -> Self {
        self.geographic = Some(true);
        self
    }

    pub fn has_z(mut self) -> Self {
        self.has_z = Some(true);
        self
    }

    pub fn has_m(mut self) -> Self {
        self.has_m = Some(true);
        self
    }
}

/// A column requested by `create_table` or `change_table`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub sql_type: SqlType,

    #[serde(flatten)]
    pub options: ColumnOptions,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: SqlType, options: ColumnOptions) -> Self {
        Self {
            name: name.into(),
            sql_type,
            options,
        }
    }

    /// Resolve the spatial spec for spatial columns
    ///
    /// Returns `Ok(None)` for ordinary columns. Explicit options win over
    /// entries of the spatial `limit` map; the limit's `type` wins over the
    /// helper's type, so `spatial(limit: {type: polygon})` yields a polygon.
    pub fn spatial_spec(&self) -> Result<Option<SpatialColumnSpec>, DdlError> {
        let SqlType::Spatial(base_type) = self.sql_type else {
            return Ok(None);
        };

        let limit = match &self.options.limit {
            Some(Limit::Spatial(limit)) => limit.clone(),
            _ => SpatialLimit::default(),
        };

        let geometric_type = match &limit.geometric_type {
            Some(name) => GeometricType::parse(name)
                .ok_or_else(|| DdlError::UnknownGeometricType(name.clone()))?,
            None => base_type,
        };

        let mut spec = SpatialColumnSpec::new(self.name.clone(), geometric_type);
        spec.srid = self.options.srid.or(limit.srid);
        spec.geographic = self.options.geographic.unwrap_or(limit.geographic);
        spec.has_z = self.options.has_z.unwrap_or(limit.has_z);
        spec.has_m = self.options.has_m.unwrap_or(limit.has_m);

        if let Some(srid) = spec.srid {
            if srid < 0 {
                return Err(DdlError::InvalidSrid {
                    column: self.name.clone(),
                    srid,
                });
            }
            if spec.geographic && srid != GEOGRAPHIC_SRID {
                tracing::warn!(
                    column = %self.name,
                    requested = srid,
                    "geography columns always use SRID {}",
                    GEOGRAPHIC_SRID
                );
            }
        }

        Ok(Some(spec))
    }
}

/// Column helpers shared by table definitions and change-table blocks
pub trait ColumnMethods {
    /// Add a column of any type
    fn column(&mut self, name: &str, sql_type: SqlType, options: ColumnOptions) -> &mut Self;

    /// Spatial column whose type comes from the `limit` map (defaults to geometry)
    fn spatial(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::Geometry), options)
    }

    fn geometry(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::Geometry), options)
    }

    fn point(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::Point), options)
    }

    fn line_string(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::LineString), options)
    }

    fn polygon(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::Polygon), options)
    }

    fn multi_point(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::MultiPoint), options)
    }

    fn multi_line_string(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::MultiLineString), options)
    }

    fn multi_polygon(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::MultiPolygon), options)
    }

    fn geometry_collection(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Spatial(GeometricType::GeometryCollection), options)
    }

    fn string(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::String, options)
    }

    fn text(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Text, options)
    }

    fn integer(&mut self, name: &str, options: ColumnOptions) -> &mut Self {
        self.column(name, SqlType::Integer, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_type_parsing() {
        assert_eq!(SqlType::parse("string").unwrap(), SqlType::String);
        assert_eq!(SqlType::parse("timestamp").unwrap(), SqlType::DateTime);
        assert_eq!(SqlType::parse("point").unwrap(), SqlType::Spatial(GeometricType::Point));
        assert_eq!(
            SqlType::parse("spatial").unwrap(),
            SqlType::Spatial(GeometricType::Geometry)
        );
        assert_eq!(
            SqlType::parse("multi_polygon").unwrap(),
            SqlType::Spatial(GeometricType::MultiPolygon)
        );
        assert!(matches!(
            SqlType::parse("hstore"),
            Err(DdlError::UnknownColumnType(_))
        ));
    }

    #[test]
    fn non_spatial_columns_have_no_spec() {
        let column = ColumnDefinition::new("name", SqlType::String, ColumnOptions::new());
        assert_eq!(column.spatial_spec().unwrap(), None);
    }

    #[test]
    fn options_resolve_into_spec() {
        let column = ColumnDefinition::new(
            "region",
            SqlType::Spatial(GeometricType::Polygon),
            ColumnOptions::new().has_m().srid(3785),
        );
        let spec = column.spatial_spec().unwrap().unwrap();
        assert_eq!(spec.geometric_type, GeometricType::Polygon);
        assert_eq!(spec.srid, Some(3785));
        assert!(spec.has_m);
        assert!(!spec.has_z);
        assert!(!spec.geographic);
    }

    #[test]
    fn limit_map_supplies_type_and_flags() {
        let column = ColumnDefinition::new(
            "region",
            SqlType::Spatial(GeometricType::Geometry),
            ColumnOptions::new().spatial_limit(
                SpatialLimit::new(GeometricType::Polygon).with_srid(3785).with_m(),
            ),
        );
        let spec = column.spatial_spec().unwrap().unwrap();
        assert_eq!(spec.geometric_type, GeometricType::Polygon);
        assert_eq!(spec.srid, Some(3785));
        assert!(spec.has_m);
    }

    #[test]
    fn explicit_options_override_limit() {
        let column = ColumnDefinition::new(
            "region",
            SqlType::Spatial(GeometricType::Geometry),
            ColumnOptions::new()
                .spatial_limit(SpatialLimit::new(GeometricType::Point).with_srid(3785))
                .srid(4326),
        );
        let spec = column.spatial_spec().unwrap().unwrap();
        assert_eq!(spec.srid, Some(4326));
    }

    #[test]
    fn negative_srid_is_rejected() {
        let column = ColumnDefinition::new(
            "latlon",
            SqlType::Spatial(GeometricType::Point),
            ColumnOptions::new().srid(-1),
        );
        assert_eq!(
            column.spatial_spec(),
            Err(DdlError::InvalidSrid {
                column: "latlon".to_string(),
                srid: -1
            })
        );
    }

    #[test]
    fn unknown_limit_type_is_rejected() {
        let mut limit = SpatialLimit::default();
        limit.geometric_type = Some("circle".to_string());
        let column = ColumnDefinition::new(
            "shape",
            SqlType::Spatial(GeometricType::Geometry),
            ColumnOptions::new().spatial_limit(limit),
        );
        assert!(matches!(
            column.spatial_spec(),
            Err(DdlError::UnknownGeometricType(_))
        ));
    }
}
