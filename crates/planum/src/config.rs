//! Configuration types for importing, editing and exporting diagrams.
//!
//! All types implement [`serde::Deserialize`] with per-field defaults, so a
//! configuration source only has to name the settings it changes.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`ImportConfig`] - Event alias and synthetic placement used by the importer.
//! - [`StyleConfig`] - Colours and padding of the SVG export.
//! - [`HistoryConfig`] - Undo history limits.
//!
//! # Example
//!
//! ```
//! # use planum::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.import().element_alias(), "bpmnElement");
//! assert!(config.style().background_color().is_ok());
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use planum_core::{geometry::Size, semantic};

use crate::color::Color;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Import section.
    #[serde(default)]
    import: ImportConfig,

    /// Style section.
    #[serde(default)]
    style: StyleConfig,

    /// History section.
    #[serde(default)]
    history: HistoryConfig,
}

impl AppConfig {
    pub fn new(import: ImportConfig, style: StyleConfig, history: HistoryConfig) -> Self {
        Self {
            import,
            style,
            history,
        }
    }

    pub fn import(&self) -> &ImportConfig {
        &self.import
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn history(&self) -> &HistoryConfig {
        &self.history
    }
}

/// Importer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Prefix of the per-element add events fired during import
    /// (`<alias>.added`).
    #[serde(deserialize_with = "deserialize_alias")]
    element_alias: String,

    /// Create elements with synthetic placement when their interchange
    /// record is missing, instead of skipping them.
    synthesize_missing_di: bool,

    /// Sizes of synthetic shapes keyed by type name (`bpmn:Task`).
    default_sizes: HashMap<String, Size>,

    /// Size of external labels without their own bounds.
    label_size: Size,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            element_alias: "bpmnElement".to_string(),
            synthesize_missing_di: true,
            default_sizes: HashMap::new(),
            label_size: Size::new(90.0, 20.0),
        }
    }
}

impl ImportConfig {
    pub fn element_alias(&self) -> &str {
        &self.element_alias
    }

    pub fn synthesize_missing_di(&self) -> bool {
        self.synthesize_missing_di
    }

    /// Returns the size of a synthetic shape of `type_name`, falling back to
    /// the built-in size of the type.
    pub fn default_size(&self, type_name: &str) -> Size {
        self.default_sizes
            .get(type_name)
            .copied()
            .unwrap_or_else(|| semantic::default_size(type_name))
    }

    pub fn label_size(&self) -> Size {
        self.label_size
    }

    /// Sets the prefix of the per-element import events.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias is empty or names one of the element
    /// lifecycle events the diagram fires on its own (`element`, `shape`,
    /// `connection`, `label`, `root`).
    pub fn with_element_alias(mut self, alias: impl Into<String>) -> Result<Self, String> {
        let alias = alias.into();
        validate_alias(&alias)?;
        self.element_alias = alias;
        Ok(self)
    }

    pub fn with_synthesize_missing_di(mut self, synthesize: bool) -> Self {
        self.synthesize_missing_di = synthesize;
        self
    }

    pub fn with_default_size(mut self, type_name: impl Into<String>, size: Size) -> Self {
        self.default_sizes.insert(type_name.into(), size);
        self
    }
}

/// Event prefixes already used by the diagram's element lifecycle events.
const RESERVED_ALIASES: [&str; 5] = ["element", "shape", "connection", "label", "root"];

fn validate_alias(alias: &str) -> Result<(), String> {
    if alias.is_empty() {
        return Err("Element alias in config must not be empty".to_string());
    }
    if RESERVED_ALIASES.contains(&alias) {
        return Err(format!(
            "Element alias `{alias}` in config collides with a built-in element event"
        ));
    }
    Ok(())
}

fn deserialize_alias<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let alias = String::deserialize(deserializer)?;
    validate_alias(&alias).map_err(serde::de::Error::custom)?;
    Ok(alias)
}

/// Visual styling of exported diagrams.
///
/// Unset colours fall back to the exporter's defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    background_color: Option<String>,
    stroke_color: Option<String>,
    fill_color: Option<String>,
    /// Space around the diagram content, in user units.
    padding: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background_color: None,
            stroke_color: None,
            fill_color: None,
            padding: 20.0,
        }
    }
}

impl StyleConfig {
    /// Returns the parsed background [`Color`], or `None` if no colour is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured string is not a valid CSS colour.
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        parse_color(self.background_color.as_deref(), "background")
    }

    /// See [`StyleConfig::background_color`].
    pub fn stroke_color(&self) -> Result<Option<Color>, String> {
        parse_color(self.stroke_color.as_deref(), "stroke")
    }

    /// See [`StyleConfig::background_color`].
    pub fn fill_color(&self) -> Result<Option<Color>, String> {
        parse_color(self.fill_color.as_deref(), "fill")
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    pub fn with_background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }
}

fn parse_color(value: Option<&str>, which: &str) -> Result<Option<Color>, String> {
    value
        .map(Color::new)
        .transpose()
        .map_err(|err| format!("Invalid {which} color in config: {err}"))
}

/// Undo history settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries; 0 keeps everything.
    max_entries: usize,
}

impl HistoryConfig {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
