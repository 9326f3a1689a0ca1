//! Mach-O specific steps: introspection, relinking and the link policy check.

mod link_check;
mod macho;
mod relink;

#[cfg(test)]
pub(crate) mod fake;

pub use link_check::{LinkViolation, check_bundle, check_linking};
pub use macho::{MachOTools, SystemTools};
pub use relink::{RelinkPlan, RelinkSummary, relink};
