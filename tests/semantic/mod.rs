//! Semantic pipeline tests: build a model, compile it, inspect the result.

mod tests_extensions;
mod tests_propagation;
mod tests_queries;
mod tests_resolution;
