//! Integration tests for deploying applications end to end.

mod common;
mod mounting_tests;
mod runtime_tests;
mod scenario_tests;
