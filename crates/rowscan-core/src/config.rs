//! Scanner configuration.

use crate::naming::snake_case;

/// Default binding name that excludes a field from binding.
pub const DEFAULT_IGNORE_MARKER: &str = "-";

/// Default separator between an embedding prefix and a column name.
pub const DEFAULT_PREFIX_SEPARATOR: &str = ".";

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Binding name that excludes a field (and, for embedded fields, its descendants).
    pub ignore_marker: String,

    /// Separator joining an embedding prefix and a column name.
    pub prefix_separator: String,

    /// Derives a column name from a field name that has no explicit binding.
    pub name_mapper: fn(&str) -> String,

    /// Scan columns without a matching field into a discard target instead of failing.
    pub allow_unknown_columns: bool,
}

impl ScanConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            ignore_marker: DEFAULT_IGNORE_MARKER.to_string(),
            prefix_separator: DEFAULT_PREFIX_SEPARATOR.to_string(),
            name_mapper: snake_case,
            allow_unknown_columns: false,
        }
    }

    /// Set the ignore marker.
    pub fn with_ignore_marker(mut self, marker: impl Into<String>) -> Self {
        self.ignore_marker = marker.into();
        self
    }

    /// Set the prefix separator.
    pub fn with_prefix_separator(mut self, separator: impl Into<String>) -> Self {
        self.prefix_separator = separator.into();
        self
    }

    /// Set the field name mapper.
    pub fn with_name_mapper(mut self, mapper: fn(&str) -> String) -> Self {
        self.name_mapper = mapper;
        self
    }

    /// Allow or reject columns without a matching field.
    pub fn with_allow_unknown_columns(mut self, allow: bool) -> Self {
        self.allow_unknown_columns = allow;
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.ignore_marker, DEFAULT_IGNORE_MARKER);
        assert_eq!(config.prefix_separator, DEFAULT_PREFIX_SEPARATOR);
        assert_eq!((config.name_mapper)("FooColumn"), "foo_column");
        assert!(!config.allow_unknown_columns);
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new()
            .with_ignore_marker("skip")
            .with_prefix_separator("__")
            .with_name_mapper(|name| name.to_ascii_lowercase())
            .with_allow_unknown_columns(true);

        assert_eq!(config.ignore_marker, "skip");
        assert_eq!(config.prefix_separator, "__");
        assert_eq!((config.name_mapper)("FooColumn"), "foocolumn");
        assert!(config.allow_unknown_columns);
    }
}
