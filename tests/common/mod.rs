//! Common test utilities for bulk-reports integration tests

#[allow(dead_code)]
pub mod marketplace;

#[allow(unused_imports)]
pub use fixtures::*;
pub use marketplace::*;
