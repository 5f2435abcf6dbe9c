//! Data Source Verification Module
//!
//! Probes every external dependency the pipeline needs (the TNM products
//! API, the USGS site service, and the GDAL / WhiteboxTools executables) so
//! a broken environment shows up before a long DEM download or hydrology run.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::ingest::{tnm, usgs};
use crate::model::FloodDataError;
use crate::tools;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub api_results: Vec<ApiVerification>,
    pub tool_results: Vec<ToolVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub apis_total: usize,
    pub apis_working: usize,
    pub tools_total: usize,
    pub tools_found: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiVerification {
    pub name: String,
    pub status: VerificationStatus,
    pub sample_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVerification {
    pub program: String,
    pub status: VerificationStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    Failed,
}

impl ApiVerification {
    fn from_result<T>(name: &str, result: Result<Vec<T>, FloodDataError>) -> Self {
        match result {
            Ok(items) => ApiVerification {
                name: name.to_string(),
                status: VerificationStatus::Success,
                sample_count: items.len(),
                error_message: None,
            },
            Err(e) => ApiVerification {
                name: name.to_string(),
                status: VerificationStatus::Failed,
                sample_count: 0,
                error_message: Some(e.to_string()),
            },
        }
    }
}

// ============================================================================
// Individual Checks
// ============================================================================

/// One-product search against TNM for the configured DEM region.
pub fn verify_tnm(client: &reqwest::blocking::Client, config: &Config) -> ApiVerification {
    let result = config.dem.resolved_bounds().and_then(|bounds| {
        let query = tnm::ProductQuery {
            dataset: config.dem.dataset.clone(),
            prod_format: config.dem.prod_format.clone(),
            max_products: 1,
        };
        tnm::search_products(client, &bounds, &query)
    });
    ApiVerification::from_result("TNM products API", result)
}

/// Stream gauge listing for the configured POI region.
pub fn verify_usgs(client: &reqwest::blocking::Client, config: &Config) -> ApiVerification {
    let result = config
        .pois
        .resolved_bounds()
        .and_then(|bounds| usgs::fetch_stream_gauges(client, &bounds));
    ApiVerification::from_result("USGS site service", result)
}

pub fn verify_tool(program: &str) -> ToolVerification {
    let status = if tools::is_available(program) {
        VerificationStatus::Success
    } else {
        VerificationStatus::Failed
    };
    ToolVerification { program: program.to_string(), status }
}

/// Executables the DEM and hydrology jobs spawn.
pub fn required_tools(config: &Config) -> Vec<String> {
    vec![
        "gdalbuildvrt".to_string(),
        "gdal_translate".to_string(),
        config.hydrology.gdal_calc.clone(),
        config.hydrology.whitebox.clone(),
    ]
}

/// Tally working checks.
pub fn summarize(api_results: &[ApiVerification], tool_results: &[ToolVerification]) -> VerificationSummary {
    VerificationSummary {
        apis_total: api_results.len(),
        apis_working: api_results
            .iter()
            .filter(|r| r.status == VerificationStatus::Success)
            .count(),
        tools_total: tool_results.len(),
        tools_found: tool_results
            .iter()
            .filter(|r| r.status == VerificationStatus::Success)
            .count(),
    }
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_full_verification(
    client: &reqwest::blocking::Client,
    config: &Config,
) -> VerificationReport {
    let api_results = vec![verify_tnm(client, config), verify_usgs(client, config)];
    let tool_results: Vec<ToolVerification> = required_tools(config)
        .iter()
        .map(|program| verify_tool(program))
        .collect();
    let summary = summarize(&api_results, &tool_results);

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        api_results,
        tool_results,
        summary,
    }
}

impl VerificationReport {
    pub fn all_ok(&self) -> bool {
        self.summary.apis_working == self.summary.apis_total
            && self.summary.tools_found == self.summary.tools_total
    }
}

pub fn print_summary(report: &VerificationReport) {
    println!("═══════════════════════════════════════════════════════════");
    println!("📊 VERIFICATION SUMMARY  ({})", report.timestamp);
    println!("═══════════════════════════════════════════════════════════");
    println!();
    for api in &report.api_results {
        match api.status {
            VerificationStatus::Success => {
                println!("  ✓ {:<20} OK ({} results)", api.name, api.sample_count)
            }
            VerificationStatus::Failed => println!(
                "  ✗ {:<20} FAILED: {}",
                api.name,
                api.error_message.as_deref().unwrap_or("Unknown")
            ),
        }
    }
    for tool in &report.tool_results {
        match tool.status {
            VerificationStatus::Success => println!("  ✓ {:<20} found", tool.program),
            VerificationStatus::Failed => println!("  ✗ {:<20} NOT FOUND on PATH", tool.program),
        }
    }
    println!();
    println!(
        "APIs:  {}/{} working    Tools: {}/{} found",
        report.summary.apis_working,
        report.summary.apis_total,
        report.summary.tools_found,
        report.summary.tools_total
    );
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_api_carries_error_message() {
        let r = ApiVerification::from_result::<()>("TNM", Err(FloodDataError::HttpError(503)));
        assert_eq!(r.status, VerificationStatus::Failed);
        assert_eq!(r.sample_count, 0);
        assert!(r.error_message.unwrap().contains("503"));
    }

    #[test]
    fn test_required_tools_follow_config() {
        let mut config = Config::default();
        config.hydrology.whitebox = "/opt/wbt/whitebox_tools".to_string();
        let tools = required_tools(&config);
        assert_eq!(tools.len(), 4);
        assert!(tools.contains(&"/opt/wbt/whitebox_tools".to_string()));
        assert!(tools.contains(&"gdal_calc.py".to_string()));
    }

    #[test]
    fn test_missing_tool_is_failed() {
        let r = verify_tool("definitely-not-a-real-tool-7f3a");
        assert_eq!(r.status, VerificationStatus::Failed);
    }

    #[test]
    fn test_summary_counts_and_json() {
        let apis = vec![
            ApiVerification::from_result("a", Ok(vec![1, 2])),
            ApiVerification::from_result::<i32>("b", Err(FloodDataError::RequestFailed("x".into()))),
        ];
        let tools = vec![ToolVerification { program: "t".into(), status: VerificationStatus::Success }];
        let report = VerificationReport {
            timestamp: "now".into(),
            summary: summarize(&apis, &tools),
            api_results: apis,
            tool_results: tools,
        };
        assert_eq!(report.summary.apis_working, 1);
        assert_eq!(report.summary.tools_found, 1);
        assert!(!report.all_ok());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["api_results"][0]["status"], "Success");
        assert_eq!(json["api_results"][0]["sample_count"], 2);
    }
}
