//! tests/mod.rs
//! Unit and integration-style tests; the database ones run on in-memory SQLite.

mod support;
mod watcher_tests;
