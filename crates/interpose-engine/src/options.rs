//! Engine configuration

use serde::{Deserialize, Serialize};

/// Options controlling what the proxy synthesizer accepts.
///
/// Loaded from TOML by the CLI; every field falls back to [`EngineOptions::new`].
///
/// ```toml
/// allow_dynamic_contracts = false
/// max_methods_per_contract = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Whether contracts defined at runtime may be synthesized
    pub allow_dynamic_contracts: bool,
    /// Upper bound on the number of methods a contract may declare
    pub max_methods_per_contract: Option<usize>,
}

impl EngineOptions {
    /// Create default engine options
    pub fn new() -> Self {
        Self {
            allow_dynamic_contracts: true,
            max_methods_per_contract: Some(1024),
        }
    }

    /// Restricted options: only compile-time contracts, small method sets
    pub fn sandboxed() -> Self {
        Self {
            allow_dynamic_contracts: false,
            max_methods_per_contract: Some(64),
        }
    }

    /// No limits beyond what method identities can address
    pub fn unrestricted() -> Self {
        Self {
            allow_dynamic_contracts: true,
            max_methods_per_contract: None,
        }
    }

    /// Parse options from a TOML document
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(EngineOptions::new().allow_dynamic_contracts);
        assert!(!EngineOptions::sandboxed().allow_dynamic_contracts);
        assert_eq!(EngineOptions::unrestricted().max_methods_per_contract, None);
        assert_eq!(EngineOptions::default(), EngineOptions::new());
    }

    #[test]
    fn test_from_toml_partial() {
        let options = EngineOptions::from_toml("allow_dynamic_contracts = false\n").unwrap();
        assert!(!options.allow_dynamic_contracts);
        assert_eq!(options.max_methods_per_contract, Some(1024));
    }

    #[test]
    fn test_from_toml_rejects_bad_type() {
        assert!(EngineOptions::from_toml("allow_dynamic_contracts = 3\n").is_err());
    }
}
