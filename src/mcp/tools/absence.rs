//! Tool for retrieving absence records from Planday.

use anyhow::Result;
use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::mcp::{
    error::PlandayError,
    http::{ApiRequest, PlandayClient},
    models::AbsenceRecord,
    resolve::{ForeignKeyDomain, resolve},
    tools::{fetch_all_pages, parse_range},
};

const ABSENCE_DOMAINS: [ForeignKeyDomain; 1] = [ForeignKeyDomain::Employee];

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct AbsenceRecordsRequest {
    #[schemars(description = "First day of the period in YYYY-MM-DD format, e.g. 2026-03-02")]
    pub from: String,
    #[schemars(description = "Last day of the period (inclusive) in YYYY-MM-DD format, e.g. 2026-03-31")]
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Only absences of this Planday employee, e.g. 67890")]
    pub employee_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Only absences in these statuses, e.g. [\"Approved\", \"Declined\"]")]
    pub statuses: Option<Vec<String>>,
}

pub async fn get_absence_records(
    client: &PlandayClient,
    Parameters(args): Parameters<AbsenceRecordsRequest>,
) -> Result<CallToolResult, ErrorData> {
    let (from, to) = parse_range(&args.from, &args.to)?;

    let statuses = args
        .statuses
        .filter(|statuses| !statuses.is_empty())
        .map(|statuses| statuses.join(","));

    let request = ApiRequest::get("/absence/v1.0/absencerecords")
        .query("from", from)
        .query("to", to)
        .query_opt("employeeId", args.employee_id)
        .query_opt("statuses", statuses);

    let records: Vec<AbsenceRecord> = fetch_all_pages(client, &request).await?;
    info!(count = records.len(), %from, %to, "fetched absence records");

    let resolutions = resolve(client, &records, &ABSENCE_DOMAINS).await;
    let enriched = resolutions.enrich(&records, &ABSENCE_DOMAINS);

    Ok(CallToolResult::structured(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "count": enriched.len(),
        "absence_records": serde_json::to_value(&enriched).map_err(PlandayError::from)?,
    })))
}
