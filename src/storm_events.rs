//! NOAA Storm Events CSV preprocessing.
//!
//! Reads a Storm Events Database export for Maricopa County and keeps only
//! events whose begin and end coordinates are all present, non-zero, and in
//! range. The survivors are written as a JSON array consumed by the POI
//! builder.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::logging::{self, DataSource};
use crate::model::{FloodDataError, StormEvent, valid_latitude, valid_longitude};

// ---------------------------------------------------------------------------
// CSV columns
// ---------------------------------------------------------------------------

/// Position of every NOAA column in the header, `None` when the export
/// lacks it. Cells are looked up by position so that a row shorter than
/// the header still yields whatever columns it has.
#[derive(Debug, Default)]
struct Columns {
    event_id: Option<usize>,
    event_type: Option<usize>,
    begin_date: Option<usize>,
    begin_time: Option<usize>,
    end_date: Option<usize>,
    end_time: Option<usize>,
    begin_location: Option<usize>,
    end_location: Option<usize>,
    begin_lat: Option<usize>,
    begin_lon: Option<usize>,
    end_lat: Option<usize>,
    end_lon: Option<usize>,
    cz_name: Option<usize>,
    event_narrative: Option<usize>,
    episode_narrative: Option<usize>,
    injuries_direct: Option<usize>,
    injuries_indirect: Option<usize>,
    deaths_direct: Option<usize>,
    deaths_indirect: Option<usize>,
    damage_property_num: Option<usize>,
    damage_crops_num: Option<usize>,
    magnitude: Option<usize>,
    magnitude_type: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            event_id: find("EVENT_ID"),
            event_type: find("EVENT_TYPE"),
            begin_date: find("BEGIN_DATE"),
            begin_time: find("BEGIN_TIME"),
            end_date: find("END_DATE"),
            end_time: find("END_TIME"),
            begin_location: find("BEGIN_LOCATION"),
            end_location: find("END_LOCATION"),
            begin_lat: find("BEGIN_LAT"),
            begin_lon: find("BEGIN_LON"),
            end_lat: find("END_LAT"),
            end_lon: find("END_LON"),
            cz_name: find("CZ_NAME_STR"),
            event_narrative: find("EVENT_NARRATIVE"),
            episode_narrative: find("EPISODE_NARRATIVE"),
            injuries_direct: find("INJURIES_DIRECT"),
            injuries_indirect: find("INJURIES_INDIRECT"),
            deaths_direct: find("DEATHS_DIRECT"),
            deaths_indirect: find("DEATHS_INDIRECT"),
            damage_property_num: find("DAMAGE_PROPERTY_NUM"),
            damage_crops_num: find("DAMAGE_CROPS_NUM"),
            magnitude: find("MAGNITUDE"),
            magnitude_type: find("MAGNITUDE_TYPE"),
        }
    }

    /// Returns the cleaned event, or `None` if any coordinate is invalid.
    ///
    /// Missing cells read as `""`, or `"0"` for casualty and damage counts.
    fn event(&self, record: &StringRecord) -> Option<StormEvent> {
        let cell = |col: Option<usize>| col.and_then(|i| record.get(i));
        let text = |col: Option<usize>| cell(col).unwrap_or("").to_string();
        let count = |col: Option<usize>| cell(col).unwrap_or("0").to_string();

        let begin_lat = parse_coordinate(cell(self.begin_lat)?).filter(|v| valid_latitude(*v))?;
        let begin_lon = parse_coordinate(cell(self.begin_lon)?).filter(|v| valid_longitude(*v))?;
        let end_lat = parse_coordinate(cell(self.end_lat)?).filter(|v| valid_latitude(*v))?;
        let end_lon = parse_coordinate(cell(self.end_lon)?).filter(|v| valid_longitude(*v))?;

        Some(StormEvent {
            event_id: text(self.event_id),
            event_type: text(self.event_type),
            begin_date: text(self.begin_date),
            begin_time: text(self.begin_time),
            end_date: text(self.end_date),
            end_time: text(self.end_time),
            begin_location: text(self.begin_location),
            end_location: text(self.end_location),
            begin_lat,
            begin_lon,
            end_lat,
            end_lon,
            cz_name: text(self.cz_name),
            event_narrative: text(self.event_narrative),
            episode_narrative: text(self.episode_narrative),
            injuries_direct: count(self.injuries_direct),
            injuries_indirect: count(self.injuries_indirect),
            deaths_direct: count(self.deaths_direct),
            deaths_indirect: count(self.deaths_indirect),
            damage_property_num: count(self.damage_property_num),
            damage_crops_num: count(self.damage_crops_num),
            magnitude: text(self.magnitude),
            magnitude_type: text(self.magnitude_type),
        })
    }
}

/// Parse one coordinate cell: present, numeric, finite, and non-zero.
fn parse_coordinate(cell: &str) -> Option<f64> {
    let value = cell.trim().parse::<f64>().ok()?;
    (value.is_finite() && value != 0.0).then_some(value)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreprocessSummary {
    pub total_rows: usize,
    pub valid_events: usize,
    pub filtered_out: usize,
    /// Event counts keyed by `event_type`, sorted by type.
    pub event_types: BTreeMap<String, usize>,
    /// Earliest and latest `begin_date`, as written in the CSV.
    pub date_range: Option<(String, String)>,
}

/// Storm Events exports use `MM/DD/YYYY`; bulk files use ISO dates.
fn parse_event_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    NaiveDate::parse_from_str(date, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d"))
        .ok()
}

/// Sort key: parsed dates order chronologically and before unparsed ones,
/// which fall back to plain string order.
fn date_key(date: &str) -> (Option<NaiveDate>, &str) {
    (parse_event_date(date), date)
}

pub fn summarize(events: &[StormEvent], total_rows: usize) -> PreprocessSummary {
    let mut event_types = BTreeMap::new();
    for event in events {
        *event_types.entry(event.event_type.clone()).or_insert(0) += 1;
    }

    let dates: Vec<&str> = events
        .iter()
        .map(|e| e.begin_date.as_str())
        .filter(|d| !d.trim().is_empty())
        .collect();
    let parsed: Vec<&str> = dates.iter().copied().filter(|d| parse_event_date(d).is_some()).collect();
    // Only fall back to string order when no date parses at all.
    let pool = if parsed.is_empty() { &dates } else { &parsed };
    let date_range = match (
        pool.iter().min_by_key(|d| date_key(**d)),
        pool.iter().max_by_key(|d| date_key(**d)),
    ) {
        (Some(first), Some(last)) => Some((first.to_string(), last.to_string())),
        _ => None,
    };

    PreprocessSummary {
        total_rows,
        valid_events: events.len(),
        filtered_out: total_rows.saturating_sub(events.len()),
        event_types,
        date_range,
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Stream-parse a Storm Events CSV, keeping rows with valid coordinates.
///
/// Rows that cannot be decoded, or that end before a coordinate column,
/// count as filtered out rather than failing the whole file.
pub fn parse_storm_events<R: Read>(reader: R) -> Result<(Vec<StormEvent>, PreprocessSummary), FloodDataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns = Columns::from_headers(csv_reader.headers()?);

    let mut events = Vec::new();
    let mut total_rows = 0;

    for (line, record) in csv_reader.records().enumerate() {
        total_rows += 1;
        match record {
            Ok(record) => {
                if let Some(event) = columns.event(&record) {
                    events.push(event);
                }
            }
            Err(e) => logging::debug(
                DataSource::Noaa,
                Some(&format!("row {}", line + 2)),
                &format!("Unreadable row: {}", e),
            ),
        }
    }

    let summary = summarize(&events, total_rows);
    Ok((events, summary))
}

pub fn write_events_json(events: &[StormEvent], path: &Path) -> Result<(), FloodDataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, events)?;
    writer.flush()?;
    Ok(())
}

pub fn read_events_json(path: &Path) -> Result<Vec<StormEvent>, FloodDataError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Preprocess `csv_path` into `output`, logging a summary.
pub fn preprocess(csv_path: &Path, output: &Path) -> Result<PreprocessSummary, FloodDataError> {
    logging::info(DataSource::Noaa, None, &format!("Processing {}...", csv_path.display()));

    let file = File::open(csv_path)
        .map_err(|e| FloodDataError::Io(format!("{}: {}", csv_path.display(), e)))?;
    let (events, summary) = parse_storm_events(BufReader::new(file))?;

    logging::info(DataSource::Noaa, None, &format!("Total rows: {}", summary.total_rows));
    logging::info(DataSource::Noaa, None, &format!("Valid events: {}", summary.valid_events));
    logging::info(DataSource::Noaa, None, &format!("Filtered out: {}", summary.filtered_out));

    write_events_json(&events, output)?;
    logging::info(
        DataSource::Noaa,
        None,
        &format!("✓ Saved {} flood events to {}", events.len(), output.display()),
    );

    if !summary.event_types.is_empty() {
        logging::info(DataSource::Noaa, None, "Event type breakdown:");
        for (event_type, count) in &summary.event_types {
            logging::info(DataSource::Noaa, None, &format!("  {}: {} events", event_type, count));
        }
    }
    if let Some((first, last)) = &summary.date_range {
        logging::info(DataSource::Noaa, None, &format!("Date range: {} to {}", first, last));
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
