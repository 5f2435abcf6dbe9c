//! Live API checks against The National Map and USGS NWIS.
//!
//! These hit the real services and are ignored by default:
//!
//!     cargo test --test live_sources -- --ignored --nocapture

use phoenix_flood::ingest::{self, tnm, usgs};
use phoenix_flood::regions::{MARICOPA_BOUNDS, PHOENIX_BOUNDS};

#[test]
#[ignore]
fn test_tnm_lists_dem_products_for_maricopa() {
    let client = ingest::build_client().unwrap();
    let query = tnm::ProductQuery { max_products: 5, ..tnm::ProductQuery::default() };

    let products = tnm::search_products(&client, &MARICOPA_BOUNDS, &query).unwrap();

    println!("\n🔍 TNM: {} products", products.len());
    for p in &products {
        println!("  {:?} -> {:?}", p.title, p.download_url);
    }
    assert!(!products.is_empty(), "TNM returned no DEM products for Maricopa County");
    assert!(products.iter().any(|p| p.download_url.is_some()));
}

#[test]
#[ignore]
fn test_usgs_lists_stream_gauges_in_phoenix() {
    let client = ingest::build_client().unwrap();

    let sites = usgs::fetch_stream_gauges(&client, &PHOENIX_BOUNDS).unwrap();

    println!("\n🔍 USGS: {} stream gauge sites", sites.len());
    for s in sites.iter().take(10) {
        println!("  {} {} ({}, {})", s.site_no, s.name, s.lat, s.lon);
    }
    assert!(!sites.is_empty(), "No USGS stream gauges found in the Phoenix box");
    assert!(sites.iter().all(|s| PHOENIX_BOUNDS.contains(s.lat, s.lon)));
}
