//! Helpers shared by the deployment steps.

pub mod fs;
