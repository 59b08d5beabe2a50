// src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::BspError;

/// Tuning knobs for a single build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BspConfig {
    /// Points closer than this are welded into one vertex. Also the tolerance of
    /// every line-side test.
    pub vertex_welding_epsilon: f64,
    /// When `true` the right child of a split is processed before the left one.
    /// Only the visiting order changes, never the tree.
    pub branch_right: bool,
    /// Cost of one cut segment when scoring splitters, in units of
    /// left/right imbalance.
    pub split_penalty: usize,
}

impl Default for BspConfig {
    fn default() -> Self {
        BspConfig {
            vertex_welding_epsilon: 0.001,
            branch_right: true,
            split_penalty: 8,
        }
    }
}

impl BspConfig {
    pub fn new(vertex_welding_epsilon: f64, branch_right: bool) -> Self {
        BspConfig {
            vertex_welding_epsilon,
            branch_right,
            ..Default::default()
        }
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    ///
    /// ```
    /// use rust_bsp::BspConfig;
    ///
    /// let config = BspConfig::from_json(r#"{ "branch_right": false }"#).unwrap();
    /// assert!(!config.branch_right);
    /// assert_eq!(config.split_penalty, 8);
    /// ```
    pub fn from_json(text: &str) -> Result<Self, BspError> {
        let config: BspConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BspError> {
        let eps = self.vertex_welding_epsilon;
        if !eps.is_finite() || eps <= 0.0 {
            return Err(BspError::InvalidConfig(format!(
                "vertex_welding_epsilon must be a positive finite number, got {}",
                eps
            )));
        }
        Ok(())
    }
}
