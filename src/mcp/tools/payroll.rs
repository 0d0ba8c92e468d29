//! Tool for retrieving shift payroll from Planday.
//!
//! The payroll endpoint can be slow for wide ranges, so it gets a longer
//! timeout than the default.

use std::time::Duration;

use anyhow::Result;
use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::mcp::{
    error::PlandayError,
    http::{ApiRequest, PlandayClient},
    models::PayrollReport,
    resolve::{ForeignKeyDomain, resolve},
    tools::parse_range,
};

const PAYROLL_DOMAINS: [ForeignKeyDomain; 4] = [
    ForeignKeyDomain::Employee,
    ForeignKeyDomain::Department,
    ForeignKeyDomain::Position,
    ForeignKeyDomain::EmployeeGroup,
];

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct PayrollRequest {
    #[schemars(description = "Planday department ids to include, e.g. [12345, 12346]")]
    pub department_ids: Vec<i64>,
    #[schemars(description = "First day of the period in YYYY-MM-DD format, e.g. 2026-03-01")]
    pub from: String,
    #[schemars(description = "Last day of the period (inclusive) in YYYY-MM-DD format, e.g. 2026-03-31")]
    pub to: String,
}

pub async fn get_payroll(
    client: &PlandayClient,
    Parameters(args): Parameters<PayrollRequest>,
) -> Result<CallToolResult, ErrorData> {
    if args.department_ids.is_empty() {
        return Err(PlandayError::InvalidParams(
            "At least one department id is required.".to_string(),
        )
        .into());
    }
    let (from, to) = parse_range(&args.from, &args.to)?;

    let department_ids = args
        .department_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let request = ApiRequest::get("/payroll/v1.0/payroll")
        .query("departmentIds", department_ids)
        .query("from", from)
        .query("to", to)
        .timeout(Duration::from_secs(60));

    let report: PayrollReport =
        serde_json::from_value(client.call(&request).await?).map_err(PlandayError::from)?;
    info!(count = report.shifts_payroll.len(), %from, %to, "fetched payroll lines");

    let lines = &report.shifts_payroll;
    let resolutions = resolve(client, lines, &PAYROLL_DOMAINS).await;
    let enriched = resolutions.enrich(lines, &PAYROLL_DOMAINS);

    Ok(CallToolResult::structured(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "currency_symbol": report.currency_symbol,
        "count": enriched.len(),
        "payroll_lines": serde_json::to_value(&enriched).map_err(PlandayError::from)?,
    })))
}
