//! Flood POI GeoJSON for the map front-end.
//!
//! Combines preprocessed NOAA storm events (loaded from the cached JSON the
//! preprocessor writes) with USGS stream gauge sites into one GeoJSON
//! FeatureCollection of points. The front-end imports the file directly, so
//! property names here are part of its contract.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use reqwest::Url;
use serde_json::json;

use crate::config::PoiConfig;
use crate::ingest::usgs;
use crate::logging::{self, DataSource};
use crate::model::{BoundingBox, FloodDataError, GaugeSite, StormEvent};
use crate::storm_events;

pub const NOAA_SOURCE: &str = "NOAA Storm Events Database";
const DESCRIPTION_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Storm events
// ---------------------------------------------------------------------------

/// Load the preprocessed events. A missing file is not fatal: the map is
/// still useful with gauges only.
pub fn load_cached_events(path: &Path) -> Vec<StormEvent> {
    logging::info(DataSource::Noaa, None, "Loading NOAA Storm Events from preprocessed data...");
    if !path.exists() {
        logging::warn(
            DataSource::Noaa,
            Some(&path.display().to_string()),
            "Preprocessed data not found! Run: phoenix_flood preprocess",
        );
        return Vec::new();
    }

    match storm_events::read_events_json(path) {
        Ok(events) => {
            logging::info(
                DataSource::Noaa,
                None,
                &format!("✓ Loaded {} events from preprocessed data", events.len()),
            );
            events
        }
        Err(e) => {
            logging::error(
                DataSource::Noaa,
                Some(&path.display().to_string()),
                &format!("Error loading preprocessed data: {}", e),
            );
            Vec::new()
        }
    }
}

/// Events whose begin point lies inside `bounds`.
pub fn events_in_bounds(events: Vec<StormEvent>, bounds: &BoundingBox) -> Vec<StormEvent> {
    events
        .into_iter()
        .filter(|e| bounds.contains(e.begin_lat, e.begin_lon))
        .collect()
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn event_type(event: &StormEvent) -> &str {
    non_empty(&event.event_type).unwrap_or("Flood")
}

/// `"<type> - <location>"`, preferring the begin location.
pub fn event_name(event: &StormEvent) -> String {
    let location = non_empty(&event.begin_location)
        .or_else(|| non_empty(&event.end_location))
        .unwrap_or("Maricopa County");
    format!("{} - {}", event_type(event), location)
}

/// Whole dollars with thousands separators: `1234567.6` → `"1,234,568"`.
pub fn format_dollars(value: f64) -> String {
    let digits = (value.round() as u64).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Short popup text: the narrative cut to 200 characters, plus property
/// damage when there was any.
pub fn event_description(event: &StormEvent) -> String {
    let narrative = &event.event_narrative;
    let mut description: String = narrative.chars().take(DESCRIPTION_CHARS).collect();
    if narrative.chars().count() > DESCRIPTION_CHARS {
        description.push_str("...");
    }

    if let Ok(damage) = event.damage_property_num.trim().parse::<f64>() {
        if damage > 0.0 && damage.is_finite() {
            description.push_str(&format!(" Property damage: ${}.", format_dollars(damage)));
        }
    }
    description
}

/// Web search link for the event, used as the popup's "more info" link.
pub fn search_url(event: &StormEvent) -> String {
    let query = format!(
        "{} {} Phoenix {}",
        event_type(event),
        event.begin_location,
        event.begin_date
    );
    Url::parse_with_params("https://www.google.com/search", &[("q", query.as_str())])
        .map(String::from)
        .unwrap_or_default()
}

fn point_feature(lon: f64, lat: f64, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![lon, lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn into_object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

pub fn storm_event_feature(event: &StormEvent) -> Feature {
    let properties = json!({
        "name": event_name(event),
        "neighbourhood": non_empty(&event.begin_location).unwrap_or("Phoenix Metro"),
        "date": event.begin_date,
        "url": search_url(event),
        "source": NOAA_SOURCE,
        "event_type": event_type(event),
        "description": event_description(event),
        "narrative": event.event_narrative,
        "episode_narrative": event.episode_narrative,
        "begin_location": event.begin_location,
        "end_location": event.end_location,
        "begin_time": event.begin_time,
        "end_time": event.end_time,
        "deaths_direct": event.deaths_direct,
        "deaths_indirect": event.deaths_indirect,
        "injuries_direct": event.injuries_direct,
        "injuries_indirect": event.injuries_indirect,
        "damage_property": event.damage_property_num,
        "damage_crops": event.damage_crops_num,
        "event_id": event.event_id,
    });
    point_feature(event.begin_lon, event.begin_lat, into_object(properties))
}

// ---------------------------------------------------------------------------
// Gauges
// ---------------------------------------------------------------------------

pub fn gauge_feature(site: &GaugeSite, generated_at: DateTime<Utc>) -> Feature {
    let properties = json!({
        "name": site.name,
        "neighbourhood": "USGS Stream Gauge",
        "date": generated_at.year().to_string(),
        "url": format!("https://waterdata.usgs.gov/monitoring-location/{}/", site.site_no),
    });
    point_feature(site.lon, site.lat, into_object(properties))
}

/// Gauge sites for the POI layer. Failures are logged and yield no gauges.
pub fn fetch_gauges(client: &reqwest::blocking::Client, bounds: &BoundingBox) -> Vec<GaugeSite> {
    logging::info(DataSource::Usgs, None, "Fetching USGS stream gauge sites...");
    match usgs::fetch_stream_gauges(client, bounds) {
        Ok(sites) => {
            logging::info(DataSource::Usgs, None, &format!("Found {} USGS stream gauge sites", sites.len()));
            sites
        }
        Err(e) => {
            logging::error(DataSource::Usgs, None, &format!("Error fetching USGS data: {}", e));
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Storm-event features first, then at most `max_gauges` gauge features.
pub fn build_collection(
    events: &[StormEvent],
    gauges: &[GaugeSite],
    max_gauges: usize,
    generated_at: DateTime<Utc>,
) -> FeatureCollection {
    let features = events
        .iter()
        .map(storm_event_feature)
        .chain(gauges.iter().take(max_gauges).map(|g| gauge_feature(g, generated_at)))
        .collect();

    FeatureCollection { bbox: None, features, foreign_members: None }
}

pub fn write_collection(collection: &FeatureCollection, path: &Path) -> Result<(), FloodDataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, collection)?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoiSummary {
    pub output: PathBuf,
    pub event_features: usize,
    pub gauge_features: usize,
}

/// Build POIs from already-fetched inputs and write them out.
pub fn build_and_write(
    events: Vec<StormEvent>,
    gauges: &[GaugeSite],
    config: &PoiConfig,
    generated_at: DateTime<Utc>,
) -> Result<PoiSummary, FloodDataError> {
    let bounds = config.resolved_bounds()?;
    let events = events_in_bounds(events, &bounds);
    logging::info(
        DataSource::Noaa,
        None,
        &format!("✓ Filtered to {} events within bounds", events.len()),
    );

    logging::info(DataSource::System, None, "Converting to GeoJSON format...");
    let collection = build_collection(&events, gauges, config.max_gauges, generated_at);
    let output = PathBuf::from(&config.output);
    write_collection(&collection, &output)?;

    let summary = PoiSummary {
        output,
        event_features: events.len(),
        gauge_features: gauges.len().min(config.max_gauges),
    };
    logging::info(
        DataSource::System,
        None,
        &format!(
            "✓ Saved {} flood POIs to {} ({} NOAA events, {} USGS sites)",
            collection.features.len(),
            summary.output.display(),
            summary.event_features,
            summary.gauge_features
        ),
    );
    Ok(summary)
}

/// Fetch gauges, load cached events, and write the POI file.
pub fn run(client: &reqwest::blocking::Client, config: &PoiConfig) -> Result<PoiSummary, FloodDataError> {
    let bounds = config.resolved_bounds()?;
    let gauges = fetch_gauges(client, &bounds);
    let events = load_cached_events(Path::new(&config.events));
    build_and_write(events, &gauges, config, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
