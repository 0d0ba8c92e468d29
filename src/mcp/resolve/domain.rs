//! Secondary collections that primary records point into by numeric id.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyDomain {
    Employee,
    Department,
    Position,
    ShiftType,
    EmployeeGroup,
}

/// How entities of a domain are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRule {
    /// One paged listing, filtered client-side.
    Bulk { path: &'static str },
    /// One call per id, `{prefix}/{id}`.
    PerId { prefix: &'static str },
}

impl ForeignKeyDomain {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Department => "Department",
            Self::Position => "Position",
            Self::ShiftType => "Shift Type",
            Self::EmployeeGroup => "Employee Group",
        }
    }

    /// Shown when a record carries no reference at all.
    #[must_use]
    pub const fn unassigned(self) -> &'static str {
        match self {
            Self::Employee => "Unassigned",
            Self::Department => "No department",
            Self::Position => "No position",
            Self::ShiftType => "No shift type",
            Self::EmployeeGroup => "No employee group",
        }
    }

    /// Shown when a referenced id could not be resolved.
    #[must_use]
    pub fn fallback(self, id: i64) -> String {
        format!("{} ID: {id}", self.label())
    }

    #[must_use]
    pub const fn fetch_rule(self) -> FetchRule {
        match self {
            Self::Employee => FetchRule::Bulk {
                path: "/hr/v1.0/employees",
            },
            Self::Department => FetchRule::Bulk {
                path: "/hr/v1.0/departments",
            },
            Self::EmployeeGroup => FetchRule::Bulk {
                path: "/hr/v1.0/employeegroups",
            },
            Self::ShiftType => FetchRule::Bulk {
                path: "/scheduling/v1.0/shifttypes",
            },
            // The positions API only answers single-id lookups
            Self::Position => FetchRule::PerId {
                prefix: "/scheduling/v1.0/positions",
            },
        }
    }

    #[must_use]
    pub fn entity_id(entity: &Value) -> Option<i64> {
        entity["id"].as_i64()
    }

    /// Display text for a raw entity of this domain, if it has any.
    #[must_use]
    pub fn display_name(self, entity: &Value) -> Option<String> {
        let name = match self {
            Self::Employee => {
                let first = entity["firstName"].as_str().unwrap_or_default().trim();
                let last = entity["lastName"].as_str().unwrap_or_default().trim();
                format!("{first} {last}").trim().to_string()
            }
            _ => entity["name"].as_str().unwrap_or_default().trim().to_string(),
        };

        (!name.is_empty()).then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn employee_names_join_first_and_last() {
        let entity = json!({ "id": 5, "firstName": "Ada", "lastName": "Lovelace" });
        assert_eq!(
            ForeignKeyDomain::Employee.display_name(&entity).as_deref(),
            Some("Ada Lovelace")
        );

        let only_first = json!({ "id": 6, "firstName": "Grace" });
        assert_eq!(
            ForeignKeyDomain::Employee.display_name(&only_first).as_deref(),
            Some("Grace")
        );
    }

    #[test]
    fn blank_names_have_no_display_text() {
        let entity = json!({ "id": 1, "name": "   " });
        assert_eq!(ForeignKeyDomain::Department.display_name(&entity), None);
        assert_eq!(ForeignKeyDomain::Employee.display_name(&json!({ "id": 1 })), None);
    }

    #[test]
    fn fallback_names_the_domain_and_id() {
        assert_eq!(ForeignKeyDomain::Position.fallback(11), "Position ID: 11");
        assert_eq!(ForeignKeyDomain::ShiftType.fallback(3), "Shift Type ID: 3");
    }

    #[test]
    fn only_positions_are_fetched_per_id() {
        assert!(matches!(
            ForeignKeyDomain::Position.fetch_rule(),
            FetchRule::PerId { .. }
        ));
        assert!(matches!(
            ForeignKeyDomain::Employee.fetch_rule(),
            FetchRule::Bulk { .. }
        ));
    }
}
