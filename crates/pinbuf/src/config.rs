// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! pinbuf configuration.
//!
//! - **Static**: layout constants shared by the compiler and the exporter.
//! - **Dynamic**: [`RegistryConfig`], built in code or read from the
//!   environment with [`RegistryConfig::from_env`].
//!
//! # Environment
//!
//! | Variable                   | Meaning                                         |
//! |----------------------------|-------------------------------------------------|
//! | `PINBUF_REGISTRY_CAPACITY` | initial identity table capacity                 |
//! | `PINBUF_PURGE_THRESHOLD`   | table size that triggers a sweep on `create`    |
//! | `PINBUF_BUFFER_CAPACITY`   | initial element capacity of registry buffers    |

// =======================================================================
// Layout constants
// =======================================================================

/// Size of the pointer code `P`, independent of the target.
pub const POINTER_SIZE: usize = 8;

/// Count prefix marking the trailing alignment filler run (`0i`, `0P`, ...).
pub const FILLER_PREFIX: char = '0';

/// First identity handed out by the process-wide identity source.
///
/// Zero is reserved so that FFI callers can use it as "no storage".
pub const FIRST_STORAGE_ID: u64 = 1;

// =======================================================================
// Registry defaults
// =======================================================================

/// Default initial capacity of the identity table.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 64;

/// Default initial element capacity of buffers created empty by a registry.
pub const DEFAULT_BUFFER_CAPACITY: usize = 0;

pub const ENV_REGISTRY_CAPACITY: &str = "PINBUF_REGISTRY_CAPACITY";
pub const ENV_PURGE_THRESHOLD: &str = "PINBUF_PURGE_THRESHOLD";
pub const ENV_BUFFER_CAPACITY: &str = "PINBUF_BUFFER_CAPACITY";

/// Registry configuration.
///
/// Expired entries are never removed behind the caller's back unless
/// `purge_threshold` is set; lookups of stale entries simply return `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Initial capacity of the identity table.
    pub table_capacity: usize,
    /// When set, `create` sweeps expired entries once the table holds this many.
    pub purge_threshold: Option<usize>,
    /// Initial element capacity of buffers created empty.
    pub buffer_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            table_capacity: DEFAULT_REGISTRY_CAPACITY,
            purge_threshold: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::default()
    }

    /// Defaults overridden by `PINBUF_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(capacity) = env_usize(ENV_REGISTRY_CAPACITY) {
            config.table_capacity = capacity;
        }
        if let Some(threshold) = env_usize(ENV_PURGE_THRESHOLD) {
            // 0 disables the sweep, same as leaving the variable unset
            config.purge_threshold = (threshold > 0).then_some(threshold);
        }
        if let Some(capacity) = env_usize(ENV_BUFFER_CAPACITY) {
            config.buffer_capacity = capacity;
        }
        config
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(value) => {
            log::debug!("[config] {}={} from environment", name, value);
            Some(value)
        }
        Err(_) => {
            log::warn!("[config] ignoring {}={:?}: not an unsigned integer", name, raw);
            None
        }
    }
}

/// Builder for [`RegistryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RegistryConfigBuilder {
    config: RegistryConfig,
}

impl RegistryConfigBuilder {
    #[must_use]
    pub fn table_capacity(mut self, capacity: usize) -> Self {
        self.config.table_capacity = capacity;
        self
    }

    #[must_use]
    pub fn purge_threshold(mut self, threshold: usize) -> Self {
        self.config.purge_threshold = (threshold > 0).then_some(threshold);
        self
    }

    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity = capacity;
        self
    }

    #[must_use]
    pub fn build(self) -> RegistryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = RegistryConfig::builder()
            .table_capacity(8)
            .purge_threshold(32)
            .buffer_capacity(1024)
            .build();
        assert_eq!(config.table_capacity, 8);
        assert_eq!(config.purge_threshold, Some(32));
        assert_eq!(config.buffer_capacity, 1024);
    }

    #[test]
    fn test_zero_threshold_disables_sweep() {
        let config = RegistryConfig::builder().purge_threshold(0).build();
        assert_eq!(config.purge_threshold, None);
    }

    #[test]
    fn test_default_never_sweeps() {
        assert_eq!(RegistryConfig::default().purge_threshold, None);
    }
}
