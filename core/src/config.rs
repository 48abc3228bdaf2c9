//! Lifecycle configuration.
//!
//! Configuration values should be provided by the application, not
//! hardcoded. Every field has a default suitable for development.

use chrono::{FixedOffset, Offset, Utc};

/// Configuration shared by every controller of an application.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Attach internal traces to 500 envelopes.
    ///
    /// Default: `false`
    pub dev_mode: bool,

    /// Offset of the local time zone used for the change log's local
    /// timestamps.
    ///
    /// Default: UTC
    pub local_offset: FixedOffset,

    /// `chrono` format string for local timestamps.
    ///
    /// Default: `%Y-%m-%d %H:%M:%S`
    pub local_format: String,

    /// Page size when a list request does not specify one.
    ///
    /// Default: 20
    pub default_page_size: u32,

    /// Upper bound for a requested page size.
    ///
    /// Default: 100
    pub max_page_size: u32,
}

impl LifecycleConfig {
    /// Create configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable dev mode.
    #[must_use]
    pub const fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Set the local time zone offset.
    #[must_use]
    pub const fn with_local_offset(mut self, offset: FixedOffset) -> Self {
        self.local_offset = offset;
        self
    }

    /// Set the local timestamp format.
    #[must_use]
    pub fn with_local_format(mut self, format: impl Into<String>) -> Self {
        self.local_format = format.into();
        self
    }

    /// Set the default and maximum page sizes.
    ///
    /// The default is clamped to the maximum.
    #[must_use]
    pub fn with_page_sizes(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self.default_page_size = default_page_size.clamp(1, self.max_page_size);
        self
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            local_offset: Utc.fix(),
            local_format: "%Y-%m-%d %H:%M:%S".to_string(),
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_sizes_are_clamped() {
        let config = LifecycleConfig::new().with_page_sizes(500, 50);
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.max_page_size, 50);

        let config = LifecycleConfig::new().with_page_sizes(0, 0);
        assert_eq!(config.default_page_size, 1);
        assert_eq!(config.max_page_size, 1);
    }

    #[test]
    fn defaults_are_utc() {
        let config = LifecycleConfig::default();
        assert_eq!(config.local_offset.local_minus_utc(), 0);
        assert!(!config.dev_mode);
    }
}
