//! # Core Module
//!
//! Shared configuration used by the scene and spatial subsystems.
//!
//! ## Organization
//!
//! - **Config**: Engine-wide settings and the spatial index tuning knobs

pub mod config;

// Re-export commonly used config types
pub use config::{
    EngineConfig,
    SpatialIndexConfig,
    Config,
    ConfigError,
};
