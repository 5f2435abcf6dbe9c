/// USGS The National Map (TNM) Access API Client
///
/// Searches for elevation products intersecting a bounding box and downloads
/// the GeoTIFF tiles they point at.
///
/// API Documentation: https://apps.nationalmap.gov/tnmaccess/

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::logging::{self, DataSource};
use crate::model::{BoundingBox, FloodDataError};

pub const TNM_PRODUCTS_URL: &str = "https://tnmaccess.nationalmap.gov/api/v1/products";

/// 1/3 arc-second (~10 m) seamless elevation.
pub const NED_13_ARC_SECOND: &str = "National Elevation Dataset (NED) 1/3 arc-second";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// Query Parameters
// ============================================================================

/// Dataset parameters for a product search. Together with the bounding box
/// these fully determine the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub dataset: String,
    pub prod_format: String,
    pub max_products: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            dataset: NED_13_ARC_SECOND.to_string(),
            prod_format: "GeoTIFF".to_string(),
            max_products: 100,
        }
    }
}

// ============================================================================
// TNM API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TnmProductsResponse {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub items: Vec<DemProduct>,
}

/// A single downloadable product.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DemProduct {
    pub title: Option<String>,
    #[serde(rename = "downloadURL")]
    pub download_url: Option<String>,
    #[serde(rename = "sizeInBytes")]
    pub size_in_bytes: Option<u64>,
    #[serde(rename = "publicationDate")]
    pub publication_date: Option<String>,
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Build the products search URL.
///
/// Parameter order is fixed, so the same box and query always produce the
/// same URL.
pub fn build_products_url(bounds: &BoundingBox, query: &ProductQuery) -> Result<Url, FloodDataError> {
    products_url_at(TNM_PRODUCTS_URL, bounds, query)
}

/// Same as `build_products_url` against another products endpoint.
pub fn products_url_at(
    endpoint: &str,
    bounds: &BoundingBox,
    query: &ProductQuery,
) -> Result<Url, FloodDataError> {
    let max = query.max_products.to_string();
    let bbox = bounds.as_query_param();
    Url::parse_with_params(
        endpoint,
        &[
            ("bbox", bbox.as_str()),
            ("datasets", query.dataset.as_str()),
            ("prodFormats", query.prod_format.as_str()),
            ("outputFormat", "JSON"),
            ("max", max.as_str()),
        ],
    )
    .map_err(|e| FloodDataError::InvalidConfig(format!("bad TNM URL: {}", e)))
}

/// Parse a products search response body.
pub fn parse_products_response(body: &str) -> Result<TnmProductsResponse, FloodDataError> {
    Ok(serde_json::from_str(body)?)
}

/// Search TNM for products covering `bounds`.
///
/// An empty result is not an error; callers decide what to do with it.
pub fn search_products(
    client: &reqwest::blocking::Client,
    bounds: &BoundingBox,
    query: &ProductQuery,
) -> Result<Vec<DemProduct>, FloodDataError> {
    search_products_at(client, TNM_PRODUCTS_URL, bounds, query)
}

pub fn search_products_at(
    client: &reqwest::blocking::Client,
    endpoint: &str,
    bounds: &BoundingBox,
    query: &ProductQuery,
) -> Result<Vec<DemProduct>, FloodDataError> {
    let url = products_url_at(endpoint, bounds, query)?;
    logging::debug(DataSource::Tnm, None, &format!("GET {}", url));

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .timeout(SEARCH_TIMEOUT)
        .send()?;

    if !response.status().is_success() {
        return Err(FloodDataError::HttpError(response.status().as_u16()));
    }

    let body = response.text()?;
    let response = parse_products_response(&body)?;
    if let Some(total) = response.total {
        logging::debug(
            DataSource::Tnm,
            None,
            &format!("{} matching products, {} returned", total, response.items.len()),
        );
    }
    Ok(response.items)
}

// ============================================================================
// Tile Download
// ============================================================================

/// Local file name for a product: spaces and slashes become underscores.
pub fn tile_filename(title: Option<&str>, index: usize) -> String {
    match title {
        Some(t) if !t.trim().is_empty() => format!("{}.tif", t.replace([' ', '/'], "_")),
        _ => format!("tile_{}.tif", index),
    }
}

/// File names for `products`, in order. A title seen before gets the
/// product index appended so no two tiles share a file.
pub fn tile_filenames(products: &[DemProduct]) -> Vec<String> {
    let mut used = HashSet::new();
    products
        .iter()
        .enumerate()
        .map(|(i, product)| {
            let mut name = tile_filename(product.title.as_deref(), i);
            while !used.insert(name.clone()) {
                name = format!("{}_{}.tif", name.trim_end_matches(".tif"), i);
            }
            name
        })
        .collect()
}

/// Human-readable size and date for progress lines.
fn product_details(product: &DemProduct) -> String {
    let mut details = Vec::new();
    if let Some(date) = &product.publication_date {
        details.push(date.clone());
    }
    if let Some(bytes) = product.size_in_bytes {
        details.push(format!("{:.1} MB", bytes as f64 / 1_048_576.0));
    }
    if details.is_empty() {
        String::new()
    } else {
        format!(" ({})", details.join(", "))
    }
}

/// Stream one product to `dest`. A partial file is removed on failure.
pub fn download_tile(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, FloodDataError> {
    let mut response = client.get(url).timeout(DOWNLOAD_TIMEOUT).send()?;

    if !response.status().is_success() {
        return Err(FloodDataError::HttpError(response.status().as_u16()));
    }

    if let Some(len) = response.content_length() {
        logging::debug(
            DataSource::Tnm,
            dest.file_name().and_then(|n| n.to_str()),
            &format!("{:.1} MB expected", len as f64 / 1_048_576.0),
        );
    }

    let result = (|| -> Result<u64, FloodDataError> {
        let mut writer = BufWriter::new(File::create(dest)?);
        let bytes = response.copy_to(&mut writer)?;
        writer.flush()?;
        Ok(bytes)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(dest);
    }
    result
}

/// Download up to `max_tiles` products into `work_dir`.
///
/// Products without a download URL are skipped. A failed download is logged
/// and skipped. Returns the paths that were written, in product order.
pub fn download_tiles(
    client: &reqwest::blocking::Client,
    products: &[DemProduct],
    max_tiles: usize,
    work_dir: &Path,
) -> Vec<PathBuf> {
    let candidates = &products[..products.len().min(max_tiles)];
    let filenames = tile_filenames(candidates);
    let total = candidates.len();
    let mut downloaded = Vec::new();
    let mut failed = 0;

    for (i, (product, filename)) in candidates.iter().zip(filenames).enumerate() {
        let Some(url) = product.download_url.as_deref() else {
            logging::debug(DataSource::Tnm, product.title.as_deref(), "No downloadURL, skipping");
            continue;
        };

        let dest = work_dir.join(&filename);
        logging::info(
            DataSource::Tnm,
            Some(&filename),
            &format!(
                "[{}/{}] {}{}",
                i + 1,
                total,
                product.title.as_deref().unwrap_or(&filename),
                product_details(product)
            ),
        );

        match download_tile(client, url, &dest) {
            Ok(bytes) => {
                logging::info(
                    DataSource::Tnm,
                    Some(&filename),
                    &format!("✓ Downloaded {} ({} bytes)", filename, bytes),
                );
                downloaded.push(dest);
            }
            Err(e) => {
                failed += 1;
                logging::log_download_failure(DataSource::Tnm, &filename, "Tile download", &e);
            }
        }
    }

    logging::log_download_summary(DataSource::Tnm, total, downloaded.len(), failed);
    downloaded
}

// ============================================================================
// Tests
// ============================================================================
