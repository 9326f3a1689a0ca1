//! Binary-format specific operations.

pub mod macos;
