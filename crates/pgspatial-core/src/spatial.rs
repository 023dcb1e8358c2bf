//! Spatial column types: geometric types, requested column specs and
//! introspected spatial metadata

use serde::{Deserialize, Serialize};

/// SRID every geography column reports (WGS 84)
pub const GEOGRAPHIC_SRID: i32 = 4326;

/// SRID used for planar columns when none is requested
pub const DEFAULT_SRID: i32 = 0;

/// Geometric type of a spatial column
///
/// Mirrors the OGC simple feature hierarchy that PostGIS stores in
/// `geometry_columns.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometricType {
    /// Any geometry
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometricType {
    /// All geometric types, most generic first
    pub const ALL: [GeometricType; 8] = [
        Self::Geometry,
        Self::Point,
        Self::LineString,
        Self::Polygon,
        Self::MultiPoint,
        Self::MultiLineString,
        Self::MultiPolygon,
        Self::GeometryCollection,
    ];

    /// Parse a geometric type name
    ///
    /// Case-insensitive and tolerant of underscores, so `line_string`,
    /// `LineString` and `LINESTRING` all resolve to [`GeometricType::LineString`].
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "geometry" => Some(Self::Geometry),
            "point" => Some(Self::Point),
            "linestring" => Some(Self::LineString),
            "polygon" => Some(Self::Polygon),
            "multipoint" => Some(Self::MultiPoint),
            "multilinestring" => Some(Self::MultiLineString),
            "multipolygon" => Some(Self::MultiPolygon),
            "geometrycollection" => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    /// Lower snake-case name, as reported in column limits
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Point => "point",
            Self::LineString => "line_string",
            Self::Polygon => "polygon",
            Self::MultiPoint => "multi_point",
            Self::MultiLineString => "multi_line_string",
            Self::MultiPolygon => "multi_polygon",
            Self::GeometryCollection => "geometry_collection",
        }
    }

    /// Upper-case name used by `geometry_columns` and `AddGeometryColumn`
    pub fn postgis_name(&self) -> &'static str {
        match self {
            Self::Geometry => "GEOMETRY",
            Self::Point => "POINT",
            Self::LineString => "LINESTRING",
            Self::Polygon => "POLYGON",
            Self::MultiPoint => "MULTIPOINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
            Self::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// Camel-case name used in type modifiers, e.g. `geometry(LineString,4326)`
    pub fn typmod_name(&self) -> &'static str {
        match self {
            Self::Geometry => "Geometry",
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }
}

impl std::fmt::Display for GeometricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.typmod_name())
    }
}

/// Split a PostGIS type token such as `POINTZM` or `PolygonM` into the
/// geometric type and its Z/M flags
///
/// Returns `(type, has_z, has_m)`.
pub fn split_dimension_suffix(token: &str) -> Option<(GeometricType, bool, bool)> {
    let upper = token.trim().to_ascii_uppercase();

    if let Some(ty) = GeometricType::parse(&upper) {
        return Some((ty, false, false));
    }
    if let Some(base) = upper.strip_suffix("ZM") {
        return GeometricType::parse(base).map(|ty| (ty, true, true));
    }
    if let Some(base) = upper.strip_suffix('Z') {
        return GeometricType::parse(base).map(|ty| (ty, true, false));
    }
    if let Some(base) = upper.strip_suffix('M') {
        return GeometricType::parse(base).map(|ty| (ty, false, true));
    }
    None
}

/// The "limit" map of a spatial column
///
/// Used both to request a column (`limit: {type: polygon, srid: 3785, has_m: true}`)
/// and to report an introspected column back. Flags are only serialized
/// when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialLimit {
    /// Geometric type name (lower snake-case)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub geometric_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srid: Option<i32>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub has_z: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub has_m: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub geographic: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl SpatialLimit {
    pub fn new(geometric_type: GeometricType) -> Self {
        Self {
            geometric_type: Some(geometric_type.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn with_z(mut self) -> Self {
        self.has_z = true;
        self
    }

    pub fn with_m(mut self) -> Self {
        self.has_m = true;
        self
    }

    pub fn geographic(mut self) -> Self {
        self.geographic = true;
        self
    }
}

/// A requested spatial column, as resolved from migration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialColumnSpec {
    /// Column name
    pub name: String,

    /// Requested geometric type
    pub geometric_type: GeometricType,

    /// Requested SRID (ignored for geography columns)
    pub srid: Option<i32>,

    /// Store as `geography` instead of planar `geometry`
    pub geographic: bool,

    pub has_z: bool,

    pub has_m: bool,
}

impl SpatialColumnSpec {
    /// Create a planar spec with default SRID and two dimensions
    pub fn new(name: impl Into<String>, geometric_type: GeometricType) -> Self {
        Self {
            name: name.into(),
            geometric_type,
            srid: None,
            geographic: false,
            has_z: false,
            has_m: false,
        }
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn geographic(mut self) -> Self {
        self.geographic = true;
        self
    }

    pub fn with_z(mut self) -> Self {
        self.has_z = true;
        self
    }

    pub fn with_m(mut self) -> Self {
        self.has_m = true;
        self
    }

    /// SRID the column will actually carry
    ///
    /// Geography columns always use 4326; planar columns fall back to
    /// `default_srid` when no SRID was requested.
    pub fn effective_srid(&self, default_srid: i32) -> i32 {
        if self.geographic {
            GEOGRAPHIC_SRID
        } else {
            self.srid.unwrap_or(default_srid)
        }
    }

    /// Coordinate dimension (2, 3 or 4)
    pub fn dimension(&self) -> i32 {
        2 + i32::from(self.has_z) + i32::from(self.has_m)
    }

    /// Base PostGIS storage type, `geometry` or `geography`
    pub fn storage_type(&self) -> &'static str {
        if self.geographic {
            "geography"
        } else {
            "geometry"
        }
    }

    /// Type token with dimension suffix for typmods, e.g. `PointZ`, `PolygonM`
    pub fn typmod_token(&self) -> String {
        format!(
            "{}{}{}",
            self.geometric_type.typmod_name(),
            if self.has_z { "Z" } else { "" },
            if self.has_m { "M" } else { "" }
        )
    }

    /// Type token for `AddGeometryColumn`
    ///
    /// PostGIS only spells out the `M` suffix here; Z is implied by the
    /// dimension argument.
    pub fn postgis_type_token(&self) -> String {
        if self.has_m && !self.has_z {
            format!("{}M", self.geometric_type.postgis_name())
        } else {
            self.geometric_type.postgis_name().to_string()
        }
    }
}

/// Spatial properties of an existing column, reconstructed from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialInfo {
    pub geometric_type: GeometricType,

    pub srid: i32,

    pub has_z: bool,

    pub has_m: bool,

    /// Stored as `geography`
    pub geographic: bool,

    /// Type, SRID and dimension are enforced by a typmod or CHECK constraints
    pub has_spatial_constraints: bool,
}

impl SpatialInfo {
    /// Limit map as reported for this column
    pub fn limit(&self) -> SpatialLimit {
        SpatialLimit {
            geometric_type: Some(self.geometric_type.as_str().to_string()),
            srid: Some(self.srid),
            has_z: self.has_z,
            has_m: self.has_m,
            geographic: self.geographic,
        }
    }
}
