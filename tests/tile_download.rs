//! DEM search and tile download against a local HTTP server.
//!
//! The server speaks just enough HTTP/1.1 to stand in for TNM: a products
//! search, a good tile, a 404, and a tile whose body is cut short.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread;

use phoenix_flood::config::DemConfig;
use phoenix_flood::dem::{self, DemJob, DemOutcome};
use phoenix_flood::ingest::tnm::{self, ProductQuery};
use phoenix_flood::model::FloodDataError;
use phoenix_flood::regions::MARICOPA_BOUNDS;
use phoenix_flood::tools::{ToolCommand, ToolRunner};

const GOOD_TILE: &[u8] = b"II*\0fake geotiff bytes";

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Serves canned responses on an ephemeral port; returns the base URL.
fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let tile_base = base.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            handle(stream, &tile_base);
        }
    });
    base
}

fn handle(mut stream: TcpStream, base: &str) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {}
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);
    let (status, body, declared_len) = route(path, base);

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, declared_len
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

/// `(status line, body, Content-Length header)`.
fn route(path: &str, base: &str) -> (&'static str, Vec<u8>, usize) {
    let json = |body: String| {
        let bytes = body.into_bytes();
        let len = bytes.len();
        ("200 OK", bytes, len)
    };
    match path {
        "/products/ok" => json(format!(
            r#"{{"total": 5, "items": [
                {{"title": "n34w113", "downloadURL": "{b}/tiles/good.tif", "publicationDate": "2022-08-01", "sizeInBytes": 22}},
                {{"title": "no link"}},
                {{"title": "n33w112", "downloadURL": "{b}/tiles/missing.tif"}},
                {{"title": "n33w113", "downloadURL": "{b}/tiles/truncated.tif"}},
                {{"title": "n34w112", "downloadURL": "{b}/tiles/good.tif"}}
            ]}}"#,
            b = base
        )),
        "/products/empty" => json(r#"{"total": 0, "items": []}"#.to_string()),
        "/products/broken" => json(format!(
            r#"{{"items": [
                {{"title": "n33w112", "downloadURL": "{b}/tiles/missing.tif"}},
                {{"title": "n33w111", "downloadURL": "{b}/tiles/missing.tif"}}
            ]}}"#,
            b = base
        )),
        "/tiles/good.tif" => ("200 OK", GOOD_TILE.to_vec(), GOOD_TILE.len()),
        // Promises more bytes than it sends, then hangs up.
        "/tiles/truncated.tif" => ("200 OK", b"II*\0short".to_vec(), 4096),
        _ => ("404 Not Found", Vec::new(), 0),
    }
}

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder().no_proxy().build().unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("phoenix_flood_tiles_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn job(base: &str, products: &str, dir: &Path) -> DemJob {
    let config = DemConfig {
        work_dir: dir.to_string_lossy().into_owned(),
        max_tiles: 4,
        ..DemConfig::default()
    };
    let mut job = DemJob::from_config(&config).unwrap();
    job.products_url = format!("{}/products/{}", base, products);
    job
}

#[derive(Default)]
struct RecordingRunner {
    commands: Vec<ToolCommand>,
}

impl ToolRunner for RecordingRunner {
    fn run(&mut self, cmd: &ToolCommand) -> Result<(), FloodDataError> {
        self.commands.push(cmd.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tile download
// ---------------------------------------------------------------------------

#[test]
fn test_download_skips_bad_products_and_respects_cap() {
    let base = start_server();
    let dir = scratch_dir("download");
    let client = client();

    let products = tnm::search_products_at(
        &client,
        &format!("{}/products/ok", base),
        &MARICOPA_BOUNDS,
        &ProductQuery::default(),
    )
    .unwrap();
    assert_eq!(products.len(), 5);

    let tiles = tnm::download_tiles(&client, &products, 4, &dir);

    assert_eq!(tiles, vec![dir.join("n34w113.tif")]);
    assert_eq!(fs::read(&tiles[0]).unwrap(), GOOD_TILE);
    // 404: nothing written.
    assert!(!dir.join("n33w112.tif").exists());
    // Cut-short body: partial file removed.
    assert!(!dir.join("n33w113.tif").exists());
    // Fifth product is past the cap.
    assert!(!dir.join("n34w112.tif").exists());

    let _ = fs::remove_dir_all(&dir);
}

// ---------------------------------------------------------------------------
// Whole DEM run
// ---------------------------------------------------------------------------

#[test]
fn test_run_merges_downloaded_tiles() {
    let base = start_server();
    let dir = scratch_dir("run_ok");
    let job = job(&base, "ok", &dir);
    let mut runner = RecordingRunner::default();

    let outcome = dem::run(&client(), &mut runner, &job).unwrap();

    assert_eq!(outcome, DemOutcome::Written(job.output.clone()));
    assert_eq!(runner.commands.len(), 2);
    assert_eq!(runner.commands[0].program, "gdalbuildvrt");
    assert_eq!(
        runner.commands[0].args,
        vec![
            job.vrt_path.to_string_lossy().into_owned(),
            dir.join("n34w113.tif").to_string_lossy().into_owned(),
        ]
    );
    assert_eq!(runner.commands[1].program, "gdal_translate");
    assert!(!dir.join("n34w113.tif").exists(), "tile should be cleaned up");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_run_with_no_products_stops_without_merging() {
    let base = start_server();
    let dir = scratch_dir("run_empty");
    let mut runner = RecordingRunner::default();

    let outcome = dem::run(&client(), &mut runner, &job(&base, "empty", &dir)).unwrap();

    assert_eq!(outcome, DemOutcome::NoProducts);
    assert!(runner.commands.is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_run_with_every_tile_failing_is_an_error() {
    let base = start_server();
    let dir = scratch_dir("run_broken");
    let mut runner = RecordingRunner::default();

    let result = dem::run(&client(), &mut runner, &job(&base, "broken", &dir));

    assert_eq!(result, Err(FloodDataError::NoTilesDownloaded));
    assert!(runner.commands.is_empty());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_search_http_error_is_reported() {
    let base = start_server();

    let result = tnm::search_products_at(
        &client(),
        &format!("{}/products/nowhere", base),
        &MARICOPA_BOUNDS,
        &ProductQuery::default(),
    );

    assert_eq!(result, Err(FloodDataError::HttpError(404)));
}
