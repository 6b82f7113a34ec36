//! Shared helpers for integration tests.

pub mod compile_helpers;
