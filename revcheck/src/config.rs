//! Configuration for revision checks
//!
//! The settings that the legacy clients kept in process-wide statics are
//! gathered here and handed to a [`RevisionChecker`](crate::RevisionChecker)
//! when it is built.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// How file contents are prepared for hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum LoadStrategy {
    /// Stream every file in 1 KiB chunks straight into the checksum pass
    #[default]
    OnDemand,
    /// Build the whole padded buffer before hashing, then drop it
    Preload,
    /// Build the padded buffer once and keep it for later checks of the same files
    PreloadRetain,
}

impl LoadStrategy {
    /// Kebab-case name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStrategy::OnDemand => "on-demand",
            LoadStrategy::Preload => "preload",
            LoadStrategy::PreloadRetain => "preload-retain",
        }
    }
}

impl FromStr for LoadStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on-demand" | "ondemand" => Ok(LoadStrategy::OnDemand),
            "preload" => Ok(LoadStrategy::Preload),
            "preload-retain" | "retain" => Ok(LoadStrategy::PreloadRetain),
            other => Err(Error::config(format!(
                "Unsupported file loading strategy '{}'. Expected on-demand, preload or preload-retain",
                other
            ))),
        }
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the value program is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ExecutionMode {
    /// Walk the parsed operation list for every word
    Interpreted,
    /// Use pre-resolved programs memoised in the formula cache
    #[default]
    Compiled,
}

impl ExecutionMode {
    /// Kebab-case name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Interpreted => "interpreted",
            ExecutionMode::Compiled => "compiled",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interpreted" | "slow" => Ok(ExecutionMode::Interpreted),
            "compiled" | "fast" => Ok(ExecutionMode::Compiled),
            other => Err(Error::config(format!(
                "Unsupported execution mode '{}'. Expected interpreted or compiled",
                other
            ))),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default number of compiled programs kept by the formula cache
pub const DEFAULT_FORMULA_CACHE_CAPACITY: usize = 5;

/// Settings for a [`RevisionChecker`](crate::RevisionChecker)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct RevisionConfig {
    /// File loading strategy
    pub strategy: LoadStrategy,

    /// Program execution mode
    pub execution: ExecutionMode,

    /// Number of compiled programs kept before the oldest is evicted
    pub formula_cache_capacity: usize,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        RevisionConfig {
            strategy: LoadStrategy::default(),
            execution: ExecutionMode::default(),
            formula_cache_capacity: DEFAULT_FORMULA_CACHE_CAPACITY,
        }
    }
}

impl RevisionConfig {
    /// Set the file loading strategy
    pub fn with_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the execution mode
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Set the formula cache capacity
    pub fn with_formula_cache_capacity(mut self, capacity: usize) -> Self {
        self.formula_cache_capacity = capacity;
        self
    }

    /// Check that the settings can be used
    pub fn validate(&self) -> Result<()> {
        if self.formula_cache_capacity == 0 {
            return Err(Error::config("formula cache capacity must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        for strategy in [
            LoadStrategy::OnDemand,
            LoadStrategy::Preload,
            LoadStrategy::PreloadRetain,
        ] {
            assert_eq!(strategy.as_str().parse::<LoadStrategy>().unwrap(), strategy);
        }
        assert_eq!(
            "Preload".parse::<LoadStrategy>().unwrap(),
            LoadStrategy::Preload
        );
    }

    #[test]
    fn test_unknown_strategy_is_config_error() {
        let err = "mmap".parse::<LoadStrategy>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("mmap"));
    }

    #[test]
    fn test_execution_names() {
        assert_eq!(
            "interpreted".parse::<ExecutionMode>().unwrap(),
            ExecutionMode::Interpreted
        );
        assert_eq!(
            "compiled".parse::<ExecutionMode>().unwrap(),
            ExecutionMode::Compiled
        );
        assert!("jit".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = RevisionConfig::default();
        assert_eq!(config.strategy, LoadStrategy::OnDemand);
        assert_eq!(config.execution, ExecutionMode::Compiled);
        assert_eq!(config.formula_cache_capacity, 5);
        assert!(config.validate().is_ok());
        assert!(config.with_formula_cache_capacity(0).validate().is_err());
    }
}
