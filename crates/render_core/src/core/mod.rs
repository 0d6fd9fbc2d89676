//! Core engine modules
//!
//! Cross-cutting concerns that every subsystem consumes, starting with the
//! unified configuration system.

pub mod config;
