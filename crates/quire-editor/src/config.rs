//! Editor configuration, read from TOML or JSON.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::builtins;
use crate::editor::DEFAULT_HISTORY_DEPTH;
use crate::error::ConfigurationError;
use crate::highlight::HighlightOptions;
use crate::registry::{Composition, ExtensionRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Node type whose content is highlighted.
    pub node: SmolStr,
    /// Wait for the first deferred task before highlighting anything.
    pub defer_first_paint: bool,
    /// Only these language ids are highlighted. Empty means all.
    pub languages: Vec<SmolStr>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            node: SmolStr::new_static("code_block"),
            defer_first_paint: true,
            languages: Vec::new(),
        }
    }
}

impl HighlightConfig {
    pub fn options(&self) -> HighlightOptions {
        HighlightOptions {
            node: self.node.clone(),
            defer_first_paint: self.defer_first_paint,
            languages: (!self.languages.is_empty()).then(|| self.languages.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Built-in units to enable, in registration order.
    pub extensions: Vec<SmolStr>,
    pub history_depth: usize,
    pub highlight: HighlightConfig,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: Option<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            extensions: builtins::NAMES.iter().map(|name| SmolStr::new_static(name)).collect(),
            history_depth: DEFAULT_HISTORY_DEPTH,
            highlight: HighlightConfig::default(),
            log_filter: None,
        }
    }
}

impl EditorConfig {
    /// Read a config file. `.json` files are parsed as JSON, anything else
    /// as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&text)?
        } else {
            Self::from_toml(&text)?
        };
        tracing::debug!(target: "quire::registry", path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Compose the enabled built-in units.
    pub fn build_registry(&self) -> Result<Arc<Composition>, ConfigurationError> {
        let options = self.highlight.options();
        let units = self
            .extensions
            .iter()
            .map(|name| {
                builtins::by_name(name, &options)
                    .ok_or_else(|| ConfigurationError::UnknownExtension(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        ExtensionRegistry::compose(units)
    }
}
