//! Ambient configuration carried by the connection subscriber and batch
//! builders (SPEC_FULL §10). Not part of the distilled spec, but every
//! rendering/execution call needs somewhere to read dialect knobs from,
//! the same way `tank_core::SqlWriter` implementations are handed
//! dialect-specific context rather than hard-coding it.

use std::borrow::Cow;

/// Configuration consulted while rendering and executing a query.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Named-parameter marker prefix (spec §6). Defaults to `$`, as in
    /// Postgres-family dialects; overridden per dialect family that needs
    /// a different marker (e.g. `?` or `:name`).
    pub named_parameter_prefix: Cow<'static, str>,
    /// Default cursor fetch-size hint applied to statements that don't
    /// specify one explicitly (spec §4.5 step 4).
    pub default_fetch_size: Option<usize>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            named_parameter_prefix: Cow::Borrowed("$"),
            default_fetch_size: None,
        }
    }
}

impl BridgeConfig {
    pub fn with_named_parameter_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.named_parameter_prefix = prefix.into();
        self
    }

    pub fn with_default_fetch_size(mut self, size: usize) -> Self {
        self.default_fetch_size = Some(size);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix_is_dollar() {
        assert_eq!(BridgeConfig::default().named_parameter_prefix, "$");
    }

    #[test]
    fn builder_overrides_apply() {
        let config = BridgeConfig::default()
            .with_named_parameter_prefix("?")
            .with_default_fetch_size(128);
        assert_eq!(config.named_parameter_prefix, "?");
        assert_eq!(config.default_fetch_size, Some(128));
    }
}
