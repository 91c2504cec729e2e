//! Engine options loading.

use std::path::Path;

use anyhow::Context;
use interpose_engine::EngineOptions;

/// Load engine options from a TOML file, or the defaults when no path is given.
///
/// ```toml
/// allow_dynamic_contracts = false
/// max_methods_per_contract = 64
/// ```
pub fn load_options(path: Option<&Path>) -> anyhow::Result<EngineOptions> {
    let Some(path) = path else {
        return Ok(EngineOptions::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let options = EngineOptions::from_toml(&source)
        .with_context(|| format!("Invalid engine options in {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?options, "loaded engine options");
    Ok(options)
}
