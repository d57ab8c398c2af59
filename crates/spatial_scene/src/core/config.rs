//! # Configuration
//!
//! Persisted settings for the scene core. The spatial index section carries
//! the fixed footprint, the bucket capacity and the maximum depth used when a
//! quad-tree is generated; everything else is engine-wide behaviour.
//!
//! Both TOML and RON files are supported through the [`Config`] trait.

use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;

pub use crate::config::{Config, ConfigError};

/// Largest accepted subdivision depth
pub const MAX_SUPPORTED_DEPTH: u32 = 24;

/// # Spatial Index Configuration
///
/// Tuning parameters for the quad-tree built over static scene objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialIndexConfig {
    /// Members a leaf may hold before it splits
    pub bucket_capacity: usize,
    /// Depth at which leaves stop splitting (root is depth 0)
    pub max_depth: u32,
    /// Minimum corner of the fixed footprint (Y is ignored)
    pub fixed_min: Vec3,
    /// Maximum corner of the fixed footprint (Y is ignored)
    pub fixed_max: Vec3,
    /// Margin added around the union of static bounds for adaptive builds
    pub adaptive_padding: f32,
    /// Half extent of the adaptive footprint when no static object has bounds
    pub adaptive_default_half_extent: f32,
}

impl SpatialIndexConfig {
    /// Create a new spatial index configuration
    pub fn new() -> Self {
        Self {
            bucket_capacity: 8,
            max_depth: 8,
            fixed_min: Vec3::new(-50.0, 0.0, -50.0),
            fixed_max: Vec3::new(50.0, 0.0, 50.0),
            adaptive_padding: 1.0,
            adaptive_default_half_extent: 50.0,
        }
    }

    /// Set the bucket capacity
    pub fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity;
        self
    }

    /// Set the maximum depth
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the fixed footprint corners
    pub fn with_fixed_footprint(mut self, min: Vec3, max: Vec3) -> Self {
        self.fixed_min = min;
        self.fixed_max = max;
        self
    }

    /// Set the adaptive padding
    pub fn with_adaptive_padding(mut self, padding: f32) -> Self {
        self.adaptive_padding = padding;
        self
    }

    /// Set the fallback half extent for adaptive builds
    pub fn with_adaptive_default_half_extent(mut self, half_extent: f32) -> Self {
        self.adaptive_default_half_extent = half_extent;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_capacity == 0 {
            return Err(ConfigError::Invalid("Bucket capacity must be at least 1".to_string()));
        }

        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "Max depth {} exceeds the supported maximum of {}",
                self.max_depth, MAX_SUPPORTED_DEPTH
            )));
        }

        let corners_finite = self.fixed_min.iter().chain(self.fixed_max.iter()).all(|v| v.is_finite());
        if !corners_finite
            || self.fixed_min.x >= self.fixed_max.x
            || self.fixed_min.z >= self.fixed_max.z
        {
            return Err(ConfigError::Invalid(format!(
                "Fixed footprint must have finite corners with min < max in X and Z, got {:?} .. {:?}",
                self.fixed_min, self.fixed_max
            )));
        }

        if !self.adaptive_padding.is_finite() || self.adaptive_padding < 0.0 {
            return Err(ConfigError::Invalid("Adaptive padding must be finite and non-negative".to_string()));
        }

        if !self.adaptive_default_half_extent.is_finite() || self.adaptive_default_half_extent <= 0.0 {
            return Err(ConfigError::Invalid("Adaptive default half extent must be finite and positive".to_string()));
        }

        Ok(())
    }
}

impl Default for SpatialIndexConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for SpatialIndexConfig {}

/// # Engine Configuration
///
/// Top-level configuration: logging, debug features and the spatial index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
    /// Spatial index settings
    pub spatial_index: SpatialIndexConfig,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            spatial_index: SpatialIndexConfig::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Set the spatial index configuration
    pub fn with_spatial_index(mut self, spatial_index: SpatialIndexConfig) -> Self {
        self.spatial_index = spatial_index;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!("Unknown log level: {}", self.log_level)));
        }
        self.spatial_index.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}
