//! Session configuration
//!
//! Every field has a default, so hosts can pass a partial JSON object.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::i18n::InterfaceLanguage;

/// Direction of page transitions
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PageScrolling {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadAlongConfig {
    pub page_scrolling: PageScrolling,

    /// Autoscroll suspension after a seek
    pub seek_guard_ms: u64,

    /// Delay before autoscroll resumes once the highlighted unit is visible
    pub resume_debounce_ms: u64,

    /// Left inset for horizontal scrolling inside a paragraph
    pub scroll_inset_px: f64,

    /// Distance of the "go back" control
    pub rewind_ms: u64,

    /// Whether anchor editing may be turned on
    pub editable: bool,

    /// Prefix relative asset paths with `assets/`
    pub use_assets_folder: bool,

    #[serde(deserialize_with = "InterfaceLanguage::deserialize_lenient")]
    pub language: InterfaceLanguage,
}

impl Default for ReadAlongConfig {
    fn default() -> Self {
        Self {
            page_scrolling: PageScrolling::Horizontal,
            seek_guard_ms: 100,
            resume_debounce_ms: 100,
            scroll_inset_px: 10.0,
            rewind_ms: 5000,
            editable: false,
            use_assets_folder: true,
            language: InterfaceLanguage::Eng,
        }
    }
}

static ABSOLUTE_OR_ASSETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?:/|assets)/\b").expect("static regex"));

impl ReadAlongConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve an asset path against the assets folder
    pub fn resolve_asset_url(&self, path: &str) -> String {
        if self.use_assets_folder && !ABSOLUTE_OR_ASSETS.is_match(path) {
            format!("assets/{}", path)
        } else {
            path.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ReadAlongConfig::from_json(r#"{"pageScrolling":"vertical","editable":true}"#).unwrap();
        assert_eq!(config.page_scrolling, PageScrolling::Vertical);
        assert!(config.editable);
        assert_eq!(config.seek_guard_ms, 100);
        assert_eq!(config.rewind_ms, 5000);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(ReadAlongConfig::from_json("  ").unwrap(), ReadAlongConfig::default());
        assert!(ReadAlongConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_legacy_language_code() {
        let config = ReadAlongConfig::from_json(r#"{"language":"fr"}"#).unwrap();
        assert_eq!(config.language, InterfaceLanguage::Fra);
        let config = ReadAlongConfig::from_json(r#"{"language":"en"}"#).unwrap();
        assert_eq!(config.language, InterfaceLanguage::Eng);
    }

    #[test]
    fn test_resolve_asset_url() {
        let config = ReadAlongConfig::default();
        assert_eq!(config.resolve_asset_url("img/a.png"), "assets/img/a.png");
        assert_eq!(config.resolve_asset_url("assets/a.png"), "assets/a.png");
        assert_eq!(config.resolve_asset_url("https://x.org/a.png"), "https://x.org/a.png");

        let config = ReadAlongConfig {
            use_assets_folder: false,
            ..ReadAlongConfig::default()
        };
        assert_eq!(config.resolve_asset_url("img/a.png"), "img/a.png");
    }
}
