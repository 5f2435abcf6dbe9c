//! USGS NWIS Site Service Client
//!
//! Lists stream gauge sites inside a bounding box. The site service speaks
//! RDB, a tab-delimited format with `#` comment lines, a header row, and a
//! column-format row (`5s\t15s\t...`) before the data.
//!
//! API Documentation: https://waterservices.usgs.gov/docs/site-service/

use std::time::Duration;

use reqwest::Url;

use crate::logging::{self, DataSource};
use crate::model::{BoundingBox, FloodDataError, GaugeSite};

pub const USGS_SITE_URL: &str = "https://waterservices.usgs.gov/nwis/site/";

/// NWIS site type code for streams.
pub const SITE_TYPE_STREAM: &str = "ST";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the site service URL for all stream sites (active or not) in `bounds`.
pub fn build_site_url(bounds: &BoundingBox) -> Result<Url, FloodDataError> {
    let bbox = bounds.as_query_param();
    Url::parse_with_params(
        USGS_SITE_URL,
        &[
            ("format", "rdb"),
            ("bBox", bbox.as_str()),
            ("siteType", SITE_TYPE_STREAM),
            ("siteStatus", "all"),
        ],
    )
    .map_err(|e| FloodDataError::InvalidConfig(format!("bad USGS URL: {}", e)))
}

/// Parse an RDB site listing.
///
/// Rows whose coordinates do not parse are skipped rather than failing the
/// whole listing.
pub fn parse_site_rdb(body: &str) -> Result<Vec<GaugeSite>, FloodDataError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| FloodDataError::ParseError(format!("RDB response has no '{}' column", name)))
    };
    let site_col = column("site_no")?;
    let name_col = column("station_nm")?;
    let lat_col = column("dec_lat_va")?;
    let lon_col = column("dec_long_va")?;

    let mut sites = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // The row right after the header describes column widths and types.
        if i == 0 && record.get(site_col).is_some_and(is_rdb_format_cell) {
            continue;
        }

        let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");
        let lat = field(lat_col).parse::<f64>();
        let lon = field(lon_col).parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => sites.push(GaugeSite {
                site_no: field(site_col).to_string(),
                name: field(name_col).to_string(),
                lat,
                lon,
            }),
            _ => logging::debug(
                DataSource::Usgs,
                Some(field(site_col)),
                "Skipping site without decimal coordinates",
            ),
        }
    }

    Ok(sites)
}

/// `5s`, `15s`, `16n`, ...
fn is_rdb_format_cell(cell: &str) -> bool {
    cell.trim()
        .strip_suffix(['s', 'n', 'd'])
        .is_some_and(|width| !width.is_empty() && width.bytes().all(|b| b.is_ascii_digit()))
}

/// Fetch stream gauge sites inside `bounds`.
pub fn fetch_stream_gauges(
    client: &reqwest::blocking::Client,
    bounds: &BoundingBox,
) -> Result<Vec<GaugeSite>, FloodDataError> {
    let url = build_site_url(bounds)?;
    logging::debug(DataSource::Usgs, None, &format!("GET {}", url));

    let response = client.get(url).timeout(REQUEST_TIMEOUT).send()?;

    // The site service answers 404 when no sites match the query.
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(Vec::new());
    }
    if !response.status().is_success() {
        return Err(FloodDataError::HttpError(response.status().as_u16()));
    }

    let body = response.text()?;
    parse_site_rdb(&body)
}

// ============================================================================
// Tests
// ============================================================================
