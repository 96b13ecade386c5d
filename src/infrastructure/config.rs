//! Engine configuration loaded from TOML.
//!
//! ```toml
//! visual_formulas = ["PROGRESS", "RATING", "TAG", "SPARKLINE"]
//!
//! [bounds]
//! max_rows = 50
//! max_cols = 20
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::InfrastructureResult;
use crate::domain::{DEFAULT_VISUAL_FORMULAS, FormulaEvaluator, GridBounds};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub bounds: GridBounds,
    /// Formula names rendered by the host and skipped by recalculation.
    pub visual_formulas: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bounds: GridBounds::default(),
            visual_formulas: DEFAULT_VISUAL_FORMULAS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> InfrastructureResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> InfrastructureResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn evaluator(&self) -> FormulaEvaluator {
        FormulaEvaluator::with_visual_formulas(&self.visual_formulas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InfrastructureError;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.bounds, GridBounds { max_rows: 30, max_cols: 15 });
        assert_eq!(config.visual_formulas, vec!["PROGRESS", "RATING", "TAG"]);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EngineConfig::from_toml("[bounds]\nmax_rows = 50\n").unwrap();
        assert_eq!(config.bounds.max_rows, 50);
        assert_eq!(config.bounds.max_cols, 15);
        assert_eq!(config.visual_formulas.len(), 3);
    }

    #[test]
    fn test_visual_formulas_override() {
        let config = EngineConfig::from_toml("visual_formulas = [\"sparkline\"]").unwrap();
        let evaluator = config.evaluator();
        assert!(evaluator.is_visual_formula("=SPARKLINE(A1:A5)"));
        assert!(!evaluator.is_visual_formula("=PROGRESS(50)"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = EngineConfig::from_toml("max_rows = 10");
        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gridcalc.toml");
        std::fs::write(&path, "[bounds]\nmax_rows = 5\nmax_cols = 4\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.bounds, GridBounds { max_rows: 5, max_cols: 4 });
    }
}
