//! Storage layer integration tests
