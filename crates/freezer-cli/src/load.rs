//! Document loading.
//!
//! `.json` files are parsed as JSON; everything else goes through the YAML
//! parser, which also accepts JSON.

use std::path::Path;

use anyhow::{Context, Result};
use freezer_core::{deepfreeze_with, Canonical, FreezeConfig, Value, ValueSeed};
use serde::de::DeserializeSeed;

/// Parse a document into a mutable value tree. Composite mapping keys are
/// frozen under `config`.
pub fn load_document(path: &Path, config: &FreezeConfig) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let seed = ValueSeed::new(config);
    let value = if is_json {
        let mut de = serde_json::Deserializer::from_str(&content);
        seed.deserialize(&mut de)
            .and_then(|value| de.end().map(|()| value))
            .with_context(|| format!("failed to parse JSON: {}", path.display()))?
    } else {
        seed.deserialize(serde_yaml::Deserializer::from_str(&content))
            .with_context(|| format!("failed to parse YAML: {}", path.display()))?
    };
    tracing::debug!(path = %path.display(), json = is_json, "loaded document");
    Ok(value)
}

/// Parse and deep-freeze a document.
pub fn load_frozen(path: &Path, config: &FreezeConfig) -> Result<Canonical> {
    let value = load_document(path, config)?;
    deepfreeze_with(&value, config)
        .with_context(|| format!("failed to freeze {}", path.display()))
}
