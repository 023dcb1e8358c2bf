//! Catalog fixtures for reflector integration tests
//!
//! Each fixture is the catalog state PostGIS 2+ reports after running the
//! matching migration: `format_type()` output in `pg_attribute` plus the
//! `geometry_columns` / `geography_columns` rows. Note that PostGIS prints a
//! `geometry(Geometry,0)` typmod as plain `geometry`.

#![allow(dead_code)]

use pgspatial_catalog::{MockAdapter, RawColumn, RawIndex, SpatialColumnRow};
use pgspatial_core::TableIdentifier;

pub fn spatial_test() -> TableIdentifier {
    TableIdentifier::public("spatial_test")
}

fn id() -> RawColumn {
    RawColumn::new("id", "bigint")
        .not_null()
        .with_default("nextval('spatial_test_id_seq'::regclass)")
}

/// `t.column 'latlon', :geometry`
pub async fn simple_geometry(adapter: &MockAdapter) {
    adapter
        .add_table(spatial_test(), vec![id(), RawColumn::new("latlon", "geometry")])
        .await;
    adapter
        .add_spatial_rows(
            spatial_test(),
            vec![SpatialColumnRow::geometry("latlon", "GEOMETRY", 0, 2)],
        )
        .await;
}

/// `t.column 'latlon', :geometry, geographic: true`
pub async fn simple_geography(adapter: &MockAdapter) {
    adapter
        .add_table(
            spatial_test(),
            vec![id(), RawColumn::new("latlon", "geography(Geometry,4326)")],
        )
        .await;
    adapter
        .add_spatial_rows(
            spatial_test(),
            vec![SpatialColumnRow::geography("latlon", "Geometry", 4326, 2)],
        )
        .await;
}

/// `t.column 'latlon', :point`
pub async fn point_geometry(adapter: &MockAdapter) {
    adapter
        .add_table(spatial_test(), vec![id(), RawColumn::new("latlon", "geometry(Point)")])
        .await;
    adapter
        .add_spatial_rows(
            spatial_test(),
            vec![SpatialColumnRow::geometry("latlon", "POINT", 0, 2)],
        )
        .await;
}

/// `latlon` geometry with a GIST index
pub async fn indexed_geometry(adapter: &MockAdapter) {
    simple_geometry(adapter).await;
    adapter
        .add_indexes(
            spatial_test(),
            vec![RawIndex {
                name: "index_spatial_test_on_latlon".to_string(),
                columns: vec!["latlon".to_string()],
                unique: false,
                access_method: "gist".to_string(),
            }],
        )
        .await;
}

/// `latlon` geometry, then `geom2` point at SRID 4326 and a `name` string
pub async fn added_point_and_string(adapter: &MockAdapter) {
    adapter
        .add_table(
            spatial_test(),
            vec![
                id(),
                RawColumn::new("latlon", "geometry"),
                RawColumn::new("geom2", "geometry(Point,4326)"),
                RawColumn::new("name", "character varying"),
            ],
        )
        .await;
    adapter
        .add_spatial_rows(
            spatial_test(),
            vec![
                SpatialColumnRow::geometry("latlon", "GEOMETRY", 0, 2),
                SpatialColumnRow::geometry("geom2", "POINT", 4326, 2),
            ],
        )
        .await;
}

/// `latlon_null` geometry with `null: false`, plus a nullable `latlon`
pub async fn not_null_geometry(adapter: &MockAdapter) {
    adapter
        .add_table(
            spatial_test(),
            vec![
                id(),
                RawColumn::new("latlon_null", "geometry").not_null(),
                RawColumn::new("latlon", "geometry"),
            ],
        )
        .await;
    adapter
        .add_spatial_rows(
            spatial_test(),
            vec![
                SpatialColumnRow::geometry("latlon_null", "GEOMETRY", 0, 2),
                SpatialColumnRow::geometry("latlon", "GEOMETRY", 0, 2),
            ],
        )
        .await;
}

/// `latlon` geometry, then a geographic `geom2` point and a `name` string
pub async fn added_geography(adapter: &MockAdapter) {
    adapter
        .add_table(
            spatial_test(),
            vec![
                id(),
                RawColumn::new("latlon", "geometry"),
                RawColumn::new("geom2", "geography(Point,4326)"),
                RawColumn::new("name", "character varying"),
            ],
        )
        .await;
    adapter
        .add_spatial_rows(
            spatial_test(),
            vec![
                SpatialColumnRow::geometry("latlon", "GEOMETRY", 0, 2),
                SpatialColumnRow::geography("geom2", "Point", 4326, 2),
            ],
        )
        .await;
}

/// `region` polygon with `has_m: true, srid: 3785`
pub async fn polygon_m(adapter: &MockAdapter) {
    adapter
        .add_table(
            spatial_test(),
            vec![id(), RawColumn::new("region", "geometry(PolygonM,3785)")],
        )
        .await;
    adapter
        .add_spatial_rows(
            spatial_test(),
            vec![SpatialColumnRow::geometry("region", "POLYGONM", 3785, 3)],
        )
        .await;
}

/// Plain columns exercising nullability, defaults and arrays
pub async fn ordinary_columns(adapter: &MockAdapter) {
    adapter
        .add_table(
            spatial_test(),
            vec![
                id(),
                RawColumn::new("nulls_allowed", "character varying"),
                RawColumn::new("nulls_disallowed", "character varying").not_null(),
                RawColumn::new("sample_integer_neg_default", "integer").with_default("'-1'::integer"),
                RawColumn::new("sample_array", "character varying[]").array(),
                RawColumn::new("created_at", "timestamp without time zone"),
            ],
        )
        .await;
}

/// `foo.foo_bars` with a `latlon` point at SRID 3785
pub async fn nested_schema(adapter: &MockAdapter) -> TableIdentifier {
    let table = TableIdentifier::new("foo", "foo_bars");
    adapter
        .add_table(
            table.clone(),
            vec![id(), RawColumn::new("latlon", "geometry(Point,3785)")],
        )
        .await;
    adapter
        .add_spatial_rows(
            table.clone(),
            vec![SpatialColumnRow::geometry("latlon", "POINT", 3785, 2)],
        )
        .await;
    table
}
