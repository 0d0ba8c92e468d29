//! Planday response shapes used by the tools.
//!
//! Primary records keep a fixed core schema; anything else the API returns
//! (custom fields, newer attributes) lands in their `extensions` map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::resolve::{ForeignKeyDomain, ForeignKeys};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default)]
    pub total: Option<usize>,
}

/// True when nothing follows the `seen` items of a listing whose last page
/// returned `fetched` of `limit` items. An unknown total never ends paging.
#[must_use]
pub fn listing_exhausted(fetched: usize, limit: usize, seen: usize, total: Option<usize>) -> bool {
    fetched < limit || total.is_some_and(|total| seen >= total)
}

/// `{ "paging": {...}, "data": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    #[serde(default)]
    pub paging: Option<Paging>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// `{ "data": {...} }`
#[derive(Debug, Clone, Deserialize)]
pub struct Single<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: i64,
    pub status: Option<String>,
    pub date: Option<String>,
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub employee_id: Option<i64>,
    pub department_id: Option<i64>,
    pub position_id: Option<i64>,
    pub shift_type_id: Option<i64>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl ForeignKeys for Shift {
    fn foreign_key(&self, domain: ForeignKeyDomain) -> Option<i64> {
        match domain {
            ForeignKeyDomain::Employee => self.employee_id,
            ForeignKeyDomain::Department => self.department_id,
            ForeignKeyDomain::Position => self.position_id,
            ForeignKeyDomain::ShiftType => self.shift_type_id,
            ForeignKeyDomain::EmployeeGroup => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsencePeriod {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRecord {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub status: Option<String>,
    pub absence_period: Option<AbsencePeriod>,
    pub note: Option<String>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl ForeignKeys for AbsenceRecord {
    fn foreign_key(&self, domain: ForeignKeyDomain) -> Option<i64> {
        match domain {
            ForeignKeyDomain::Employee => self.employee_id,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wage {
    pub rate: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollLine {
    pub shift_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub department_id: Option<i64>,
    pub position_id: Option<i64>,
    pub employee_group_id: Option<i64>,
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub units: Option<f64>,
    pub wage: Option<Wage>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl ForeignKeys for PayrollLine {
    fn foreign_key(&self, domain: ForeignKeyDomain) -> Option<i64> {
        match domain {
            ForeignKeyDomain::Employee => self.employee_id,
            ForeignKeyDomain::Department => self.department_id,
            ForeignKeyDomain::Position => self.position_id,
            ForeignKeyDomain::EmployeeGroup => self.employee_group_id,
            ForeignKeyDomain::ShiftType => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollReport {
    #[serde(default)]
    pub shifts_payroll: Vec<PayrollLine>,
    pub currency_symbol: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_shift_fields_land_in_extensions() {
        let shift: Shift = serde_json::from_value(json!({
            "id": 42,
            "employeeId": 5,
            "departmentId": 1,
            "startDateTime": "2026-03-02T09:00",
            "comment": "Opening",
            "customField_17": true,
        }))
        .unwrap();

        assert_eq!(shift.employee_id, Some(5));
        assert_eq!(shift.position_id, None);
        assert_eq!(shift.extensions.get("comment"), Some(&json!("Opening")));
        assert_eq!(shift.extensions.get("customField_17"), Some(&json!(true)));
        assert!(!shift.extensions.contains_key("employeeId"));
    }

    #[test]
    fn paged_envelope_tolerates_missing_paging() {
        let page: Paged<Shift> = serde_json::from_value(json!({ "data": [{ "id": 1 }] })).unwrap();
        assert!(page.paging.is_none());
        assert_eq!(page.data.len(), 1);

        let empty: Paged<Shift> = serde_json::from_value(json!({})).unwrap();
        assert!(empty.data.is_empty());
    }

    #[test]
    fn paging_without_total_is_unknown() {
        let page: Paged<Shift> =
            serde_json::from_value(json!({ "paging": { "offset": 0, "limit": 50 }, "data": [] }))
                .unwrap();
        assert_eq!(page.paging.and_then(|paging| paging.total), None);
    }

    #[test]
    fn unknown_total_only_ends_on_a_short_page() {
        assert!(!listing_exhausted(50, 50, 50, None));
        assert!(listing_exhausted(12, 50, 62, None));
        assert!(listing_exhausted(50, 50, 100, Some(100)));
        assert!(!listing_exhausted(50, 50, 100, Some(101)));
    }

    #[test]
    fn payroll_lines_expose_their_foreign_keys() {
        let report: PayrollReport = serde_json::from_value(json!({
            "currencySymbol": "kr",
            "shiftsPayroll": [{
                "shiftId": 7,
                "employeeId": 5,
                "departmentId": 1,
                "employeeGroupId": 3,
                "wage": { "rate": 150.0, "type": "HourlyRate" },
            }],
        }))
        .unwrap();

        let line = &report.shifts_payroll[0];
        assert_eq!(line.foreign_key(ForeignKeyDomain::EmployeeGroup), Some(3));
        assert_eq!(line.foreign_key(ForeignKeyDomain::Position), None);
        assert_eq!(line.wage.as_ref().and_then(|w| w.kind.as_deref()), Some("HourlyRate"));
    }
}
