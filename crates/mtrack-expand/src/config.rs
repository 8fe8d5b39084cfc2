//! Expansion configuration.

/// Mean used when a sampled declaration gives no `mean` tag.
pub const DEFAULT_MEAN: u32 = 10;

/// Name of the global level value read by level gates.
pub const DEFAULT_LEVEL_FIELD: &str = "level";

/// Expansion configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandConfig {
    /// Mean for sampled declarations without a `mean` tag.
    pub default_mean: u32,
    /// Global level value the gates compare against.
    pub level_field: String,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            default_mean: DEFAULT_MEAN,
            level_field: DEFAULT_LEVEL_FIELD.to_string(),
        }
    }
}

impl ExpandConfig {
    /// Set the default sampling mean.
    #[must_use]
    pub fn with_default_mean(mut self, mean: u32) -> Self {
        self.default_mean = mean.max(1);
        self
    }

    /// Set the level field name.
    #[must_use]
    pub fn with_level_field(mut self, field: impl Into<String>) -> Self {
        self.level_field = field.into();
        self
    }
}
