//! End-to-end file flow: NOAA CSV → preprocessed JSON → POI GeoJSON.
//!
//! Gauge sites are supplied directly so the test runs offline.

use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use phoenix_flood::config::PoiConfig;
use phoenix_flood::model::GaugeSite;
use phoenix_flood::{poi, storm_events};

const HEADER: &str = "EVENT_ID,EVENT_TYPE,BEGIN_DATE,BEGIN_TIME,END_DATE,END_TIME,BEGIN_LOCATION,END_LOCATION,BEGIN_LAT,BEGIN_LON,END_LAT,END_LON,CZ_NAME_STR,EVENT_NARRATIVE,EPISODE_NARRATIVE,INJURIES_DIRECT,INJURIES_INDIRECT,DEATHS_DIRECT,DEATHS_INDIRECT,DAMAGE_PROPERTY_NUM,DAMAGE_CROPS_NUM,MAGNITUDE,MAGNITUDE_TYPE";

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("phoenix_flood_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn sample_csv() -> String {
    [
        HEADER,
        // Central Phoenix: kept and inside the POI box.
        "1001,Flash Flood,07/15/2021,1530,07/15/2021,1800,PHOENIX,TEMPE,33.45,-112.07,33.42,-111.94,MARICOPA CO.,Water over Indian School Road.,Monsoon storms.,0,0,0,0,25000,0,,",
        // Gila Bend: valid but outside the Phoenix box.
        "1002,Flood,08/02/2019,0100,08/02/2019,0600,GILA BEND,GILA BEND,32.95,-112.72,32.95,-112.72,MARICOPA CO.,Wash flooding.,,0,0,0,0,0,0,,",
        // Zero end coordinate: dropped by the preprocessor.
        "1003,Heavy Rain,09/10/2020,1200,09/10/2020,1300,MESA,MESA,33.41,-111.83,0,-111.83,MARICOPA CO.,,,0,0,0,0,0,0,,",
        // Missing begin latitude: dropped.
        "1004,Flash Flood,09/11/2020,1200,09/11/2020,1300,GLENDALE,GLENDALE,,-112.18,33.53,-112.18,MARICOPA CO.,,,0,0,0,0,0,0,,",
    ]
    .join("\n")
}

fn gauges() -> Vec<GaugeSite> {
    (0..7)
        .map(|i| GaugeSite {
            site_no: format!("0951200{}", i),
            name: format!("SALT RIVER SITE {}", i),
            lat: 33.43,
            lon: -112.0 + f64::from(i) * 0.01,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_csv_to_geojson_round_trip_through_files() {
    let dir = scratch_dir("e2e");
    let csv_path = dir.join("floods.csv");
    let json_path = dir.join("events.json");
    let geojson_path = dir.join("web/data/pois.json");
    fs::write(&csv_path, sample_csv()).unwrap();

    let summary = storm_events::preprocess(&csv_path, &json_path).unwrap();
    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.valid_events, 2);
    assert_eq!(summary.filtered_out, 2);

    let events = poi::load_cached_events(&json_path);
    assert_eq!(events.len(), 2);

    let config = PoiConfig {
        events: json_path.to_string_lossy().into_owned(),
        output: geojson_path.to_string_lossy().into_owned(),
        ..PoiConfig::default()
    };
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let result = poi::build_and_write(events, &gauges(), &config, now).unwrap();
    assert_eq!(result.event_features, 1);
    assert_eq!(result.gauge_features, 5);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&geojson_path).unwrap()).unwrap();
    assert_eq!(written["type"], "FeatureCollection");
    let features = written["features"].as_array().unwrap();
    assert_eq!(features.len(), 6);

    let first = &features[0];
    assert_eq!(first["geometry"]["type"], "Point");
    assert_eq!(first["geometry"]["coordinates"][0], -112.07);
    assert_eq!(first["geometry"]["coordinates"][1], 33.45);
    assert_eq!(first["properties"]["name"], "Flash Flood - PHOENIX");
    assert!(
        first["properties"]["description"]
            .as_str()
            .unwrap()
            .ends_with("Property damage: $25,000.")
    );

    let last = &features[5];
    assert_eq!(last["properties"]["neighbourhood"], "USGS Stream Gauge");
    assert_eq!(last["properties"]["date"], "2025");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_events_file_yields_gauges_only() {
    let dir = scratch_dir("no_events");
    let events = poi::load_cached_events(&dir.join("does_not_exist.json"));
    assert!(events.is_empty());

    let config = PoiConfig {
        output: dir.join("pois.json").to_string_lossy().into_owned(),
        ..PoiConfig::default()
    };
    let result = poi::build_and_write(events, &gauges()[..2], &config, Utc::now()).unwrap();
    assert_eq!(result.event_features, 0);
    assert_eq!(result.gauge_features, 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_preprocess_missing_csv_is_an_error() {
    let dir = scratch_dir("no_csv");
    let result = storm_events::preprocess(&dir.join("missing.csv"), &dir.join("out.json"));
    assert!(result.is_err());
    assert!(!dir.join("out.json").exists());
    let _ = fs::remove_dir_all(&dir);
}
