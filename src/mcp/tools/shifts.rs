//! Tool for retrieving scheduled shifts from Planday.
//!
//! Shifts are returned in Planday's order, each paired with the names of
//! the employee, department, position and shift type it references.

use anyhow::Result;
use rmcp::{ErrorData, handler::server::wrapper::Parameters, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::mcp::{
    error::PlandayError,
    http::{ApiRequest, PlandayClient},
    models::Shift,
    resolve::{ForeignKeyDomain, resolve},
    tools::{fetch_all_pages, parse_range},
};

const SHIFT_DOMAINS: [ForeignKeyDomain; 4] = [
    ForeignKeyDomain::Employee,
    ForeignKeyDomain::Department,
    ForeignKeyDomain::Position,
    ForeignKeyDomain::ShiftType,
];

#[derive(Serialize, Deserialize, JsonSchema)]
pub struct ShiftsRequest {
    #[schemars(description = "First day of the period in YYYY-MM-DD format, e.g. 2026-03-02")]
    pub from: String,
    #[schemars(description = "Last day of the period (inclusive) in YYYY-MM-DD format, e.g. 2026-03-08")]
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Only shifts in this Planday department, e.g. 12345")]
    pub department_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Only shifts assigned to this Planday employee, e.g. 67890")]
    pub employee_id: Option<i64>,
}

pub async fn get_shifts(
    client: &PlandayClient,
    Parameters(args): Parameters<ShiftsRequest>,
) -> Result<CallToolResult, ErrorData> {
    let (from, to) = parse_range(&args.from, &args.to)?;

    let request = ApiRequest::get("/scheduling/v1.0/shifts")
        .query("from", from)
        .query("to", to)
        .query_opt("departmentId", args.department_id)
        .query_opt("employeeId", args.employee_id);

    let shifts: Vec<Shift> = fetch_all_pages(client, &request).await?;
    info!(count = shifts.len(), %from, %to, "fetched shifts");

    let resolutions = resolve(client, &shifts, &SHIFT_DOMAINS).await;
    let enriched = resolutions.enrich(&shifts, &SHIFT_DOMAINS);

    Ok(CallToolResult::structured(json!({
        "from": from.to_string(),
        "to": to.to_string(),
        "count": enriched.len(),
        "shifts": serde_json::to_value(&enriched).map_err(PlandayError::from)?,
    })))
}
