//! Foreign-key resolution for primary records (shifts, absences, payroll).
//!
//! - `domain`: the secondary collections and their fetch and naming rules
//! - `source`: the fetch capability, implemented by `PlandayClient`
//! - `resolver`: concurrent resolution and enrichment

mod domain;
mod resolver;
mod source;

pub use domain::ForeignKeyDomain;
pub use resolver::{ForeignKeys, resolve};
