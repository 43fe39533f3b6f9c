//! Database and Engine integration tests

mod cache_tests;
mod engine_tests;
