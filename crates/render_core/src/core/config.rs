//! # Unified Configuration System
//!
//! Consolidates the tuning knobs of the culling and batching core into a
//! single serializable structure.
//!
//! ## Design Goals
//!
//! - **Centralized**: All configuration types in one place for easy discovery
//! - **Serializable**: TOML config files with full defaults
//! - **Type Safe**: Strong typing with validation and defaults
//!
//! Every field has a default, so a partial (or absent) config file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be parsed as TOML
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tuning knobs for the culling tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    /// Segment size at or below which a tree node is treated as a leaf run
    /// instead of being split further
    pub max_node_items: u32,

    /// Number of frustum planes that must fully contain a node's bounding
    /// box before subdivision stops (the node is then almost certainly
    /// entirely visible, so splitting it buys nothing)
    pub containment_plane_hits: u32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            max_node_items: 1,
            containment_plane_hits: 3,
        }
    }
}

/// Initial sizing for the frame-scoped render pools
///
/// These are starting capacities only; the pools grow silently when a frame
/// needs more and never shrink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Render jobs reserved up front
    pub initial_jobs: usize,

    /// Instance records reserved up front
    pub initial_instances: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_jobs: 256,
            initial_instances: 1024,
        }
    }
}

/// Top-level configuration for the culling and batching core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderCoreConfig {
    /// Culling tree settings
    pub culling: CullingConfig,

    /// Pool sizing settings
    pub pools: PoolConfig,
}

impl RenderCoreConfig {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a configuration from a TOML file
    pub fn from_toml_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_constants() {
        let config = RenderCoreConfig::default();
        assert_eq!(config.culling.max_node_items, 1);
        assert_eq!(config.culling.containment_plane_hits, 3);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = RenderCoreConfig::from_toml_str(
            r#"
            [culling]
            max_node_items = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.culling.max_node_items, 8);
        assert_eq!(config.culling.containment_plane_hits, 3);
        assert_eq!(config.pools.initial_jobs, 256);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = RenderCoreConfig::from_toml_str("culling = \"not a table\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
