//! Unit tests with access to crate internals via `use crate::`.

mod config;
mod launch;
mod server;
