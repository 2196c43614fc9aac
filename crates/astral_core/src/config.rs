//! # Allocator Configuration
//!
//! Settings for heap-backed stack allocators, loadable from the
//! `[stack_allocator]` table of a TOML file:
//!
//! ```toml
//! [stack_allocator]
//! capacity = 65536
//! fill_patterns = true
//! alloc_pattern = 0xCD
//! free_pattern = 0xDD
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AllocError, AllocResult};
use crate::memory::guard::{PatternGuard, ALLOCATED_MEMORY_PATTERN, FREED_MEMORY_PATTERN};

/// Default block size (64 KB).
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Configuration for a [`StackAllocator`](crate::memory::StackAllocator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Size of the backing block in bytes.
    pub capacity: usize,
    /// Whether granted and reclaimed ranges are painted with patterns.
    pub fill_patterns: bool,
    /// Pattern for freshly allocated memory.
    pub alloc_pattern: u8,
    /// Pattern for reclaimed memory.
    pub free_pattern: u8,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            fill_patterns: cfg!(debug_assertions),
            alloc_pattern: ALLOCATED_MEMORY_PATTERN,
            free_pattern: FREED_MEMORY_PATTERN,
        }
    }
}

/// Document layout: the settings live under `[stack_allocator]`.
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    stack_allocator: StackConfig,
}

impl StackConfig {
    /// Release settings: no pattern fills.
    #[must_use]
    pub fn production() -> Self {
        Self {
            fill_patterns: false,
            ..Self::default()
        }
    }

    /// Debug settings: pattern fills on.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            fill_patterns: true,
            ..Self::default()
        }
    }

    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::ZeroCapacity`] if `capacity` is zero.
    pub fn validate(&self) -> AllocResult<()> {
        if self.capacity == 0 {
            return Err(AllocError::ZeroCapacity);
        }
        Ok(())
    }

    /// Builds the region guard these settings describe.
    #[must_use]
    pub const fn guard(&self) -> PatternGuard {
        if self.fill_patterns {
            PatternGuard::new(Some(self.alloc_pattern), Some(self.free_pattern))
        } else {
            PatternGuard::disabled()
        }
    }

    /// Parses the `[stack_allocator]` table of a TOML document.
    ///
    /// A missing table yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidConfig`] for malformed TOML and
    /// [`AllocError::ZeroCapacity`] for a zero capacity.
    pub fn from_toml_str(source: &str) -> AllocResult<Self> {
        let file: ConfigFile =
            toml::from_str(source).map_err(|e| AllocError::InvalidConfig(e.to_string()))?;
        let config = file.stack_allocator;
        config.validate()?;
        tracing::debug!(
            capacity = config.capacity,
            fill_patterns = config.fill_patterns,
            "stack allocator config parsed"
        );
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidConfig`] if the file cannot be read or
    /// parsed, and [`AllocError::ZeroCapacity`] for a zero capacity.
    pub fn from_toml_file(path: impl AsRef<Path>) -> AllocResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| AllocError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StackConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.alloc_pattern, 0xCD);
        assert_eq!(config.free_pattern, 0xDD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(StackConfig::production().guard(), PatternGuard::disabled());
        assert_eq!(
            StackConfig::debug().guard(),
            PatternGuard::new(Some(0xCD), Some(0xDD))
        );
    }

    #[test]
    fn test_parse_table() {
        let config = StackConfig::from_toml_str(
            r#"
            [stack_allocator]
            capacity = 4096
            fill_patterns = true
            free_pattern = 0xEE
            "#,
        )
        .unwrap();

        assert_eq!(config.capacity, 4096);
        assert!(config.fill_patterns);
        assert_eq!(config.alloc_pattern, 0xCD);
        assert_eq!(config.free_pattern, 0xEE);
    }

    #[test]
    fn test_missing_table_uses_defaults() {
        let config = StackConfig::from_toml_str("[other]\nvalue = 1\n").unwrap();
        assert_eq!(config, StackConfig::default());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = StackConfig::from_toml_str("[stack_allocator]\ncapacity = 0\n").unwrap_err();
        assert_eq!(err, AllocError::ZeroCapacity);
    }

    #[test]
    fn test_malformed_toml_is_rejected() {
        let err = StackConfig::from_toml_str("[stack_allocator]\ncapacity = \"big\"\n").unwrap_err();
        assert!(matches!(err, AllocError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let err = StackConfig::from_toml_file("/nonexistent/astral/stack.toml").unwrap_err();
        assert!(matches!(err, AllocError::InvalidConfig(_)));
    }
}
