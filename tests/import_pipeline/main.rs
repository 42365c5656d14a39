//! Import pipeline test suite.
//!
//! Drives `ImportService` end to end against in-memory repository and object
//! store fakes with failure injection. No database or S3 required.
//!
//! Run with: cargo test --test import_pipeline

mod test_helpers;

mod test_concurrency;
mod test_overwrite_modes;
mod test_validation;
