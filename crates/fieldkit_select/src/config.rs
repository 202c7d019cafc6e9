//! Select field configuration
//!
//! [`SelectSettings`] is the declarative part and can be loaded from TOML:
//!
//! ```toml
//! multiple = true
//! filterable = true
//! type_ahead_reset_ms = 500
//!
//! [texts]
//! no_options = "Nothing here"
//! ```
//!
//! [`SelectConfig`] adds what only code can provide (the search provider)
//! and is validated when a field is built.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};
use crate::query::{QueryMode, SearchProvider};

/// Where the query input is placed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryInputPlacement {
    /// Inside the field itself, in place of the selected display
    #[default]
    Root,
    /// At the top of the dropdown
    Dropdown,
}

/// User-facing strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texts {
    #[serde(default = "default_filter_placeholder")]
    pub filter_placeholder: String,
    #[serde(default = "default_filter_no_match")]
    pub filter_no_match: String,
    #[serde(default = "default_search_placeholder")]
    pub search_placeholder: String,
    #[serde(default = "default_search_query_empty")]
    pub search_query_empty: String,
    #[serde(default = "default_search_no_match")]
    pub search_no_match: String,
    #[serde(default = "default_no_options")]
    pub no_options: String,
}

fn default_filter_placeholder() -> String {
    "Filter options...".to_string()
}

fn default_filter_no_match() -> String {
    "No options match your filter".to_string()
}

fn default_search_placeholder() -> String {
    "Search options...".to_string()
}

fn default_search_query_empty() -> String {
    "Please enter at least one character to show options".to_string()
}

fn default_search_no_match() -> String {
    "No options match your search".to_string()
}

fn default_no_options() -> String {
    "No options available".to_string()
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            filter_placeholder: default_filter_placeholder(),
            filter_no_match: default_filter_no_match(),
            search_placeholder: default_search_placeholder(),
            search_query_empty: default_search_query_empty(),
            search_no_match: default_search_no_match(),
            no_options: default_no_options(),
        }
    }
}

/// Declarative select field settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectSettings {
    /// Multi-select instead of single-select
    #[serde(default)]
    pub multiple: bool,
    /// Client-side filtering of the options
    #[serde(default)]
    pub filterable: bool,
    /// Options come from a search provider (supplied in code)
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub query_input_placement: QueryInputPlacement,
    /// Show a count badge when more than one option is selected
    #[serde(default = "default_true")]
    pub count: bool,
    /// Take the live selection state of imported options instead of the
    /// authored `selected` attribute
    #[serde(default)]
    pub default_selected: bool,
    /// Whether a single-select option can be deselected again
    #[serde(default = "default_true")]
    pub allow_deselect: bool,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_type_ahead_reset_ms")]
    pub type_ahead_reset_ms: u64,
    #[serde(default)]
    pub texts: Texts,
}

fn default_true() -> bool {
    true
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_type_ahead_reset_ms() -> u64 {
    700
}

impl Default for SelectSettings {
    fn default() -> Self {
        Self {
            multiple: false,
            filterable: false,
            searchable: false,
            query_input_placement: QueryInputPlacement::default(),
            count: true,
            default_selected: false,
            allow_deselect: true,
            search_debounce_ms: default_search_debounce_ms(),
            type_ahead_reset_ms: default_type_ahead_reset_ms(),
            texts: Texts::default(),
        }
    }
}

impl SelectSettings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn type_ahead_reset(&self) -> Duration {
        Duration::from_millis(self.type_ahead_reset_ms)
    }
}

/// Everything needed to build a select field
#[derive(Clone, Default)]
pub struct SelectConfig {
    pub settings: SelectSettings,
    provider: Option<Rc<dyn SearchProvider>>,
}

impl fmt::Debug for SelectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectConfig")
            .field("settings", &self.settings)
            .field("provider", &self.provider.as_ref().map(|_| ".."))
            .finish()
    }
}

impl SelectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: SelectSettings) -> Self {
        Self {
            settings,
            provider: None,
        }
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.settings.multiple = multiple;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.settings.filterable = filterable;
        self
    }

    /// Make the field searchable through `provider`
    pub fn searchable(mut self, provider: impl SearchProvider + 'static) -> Self {
        self.settings.searchable = true;
        self.provider = Some(Rc::new(provider));
        self
    }

    pub fn query_input_placement(mut self, placement: QueryInputPlacement) -> Self {
        self.settings.query_input_placement = placement;
        self
    }

    pub fn count(mut self, count: bool) -> Self {
        self.settings.count = count;
        self
    }

    pub fn default_selected(mut self, default_selected: bool) -> Self {
        self.settings.default_selected = default_selected;
        self
    }

    pub fn allow_deselect(mut self, allow: bool) -> Self {
        self.settings.allow_deselect = allow;
        self
    }

    pub fn search_debounce(mut self, debounce: Duration) -> Self {
        self.settings.search_debounce_ms = duration_ms(debounce);
        self
    }

    pub fn type_ahead_reset(mut self, reset: Duration) -> Self {
        self.settings.type_ahead_reset_ms = duration_ms(reset);
        self
    }

    pub fn texts(mut self, texts: Texts) -> Self {
        self.settings.texts = texts;
        self
    }

    /// Check the configuration and resolve the query mode
    pub fn validate(&self) -> Result<QueryMode> {
        let settings = &self.settings;
        if settings.searchable && settings.filterable {
            return Err(FieldError::Config(
                "a field cannot be searchable and filterable at once".into(),
            ));
        }
        if settings.type_ahead_reset_ms == 0 {
            return Err(FieldError::Config(
                "type_ahead_reset_ms must be greater than zero".into(),
            ));
        }

        if settings.searchable {
            return match &self.provider {
                Some(provider) => Ok(QueryMode::Search(provider.clone())),
                None => Err(FieldError::Config(
                    "searchable fields need a search provider".into(),
                )),
            };
        }
        if settings.filterable {
            Ok(QueryMode::Filter)
        } else {
            Ok(QueryMode::None)
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{sync_search, SearchResponder};

    #[test]
    fn test_defaults() {
        let settings = SelectSettings::default();
        assert!(settings.count);
        assert!(settings.allow_deselect);
        assert_eq!(settings.search_debounce(), Duration::from_millis(300));
        assert_eq!(settings.type_ahead_reset(), Duration::from_millis(700));
        assert_eq!(settings.texts.no_options, "No options available");
    }

    #[test]
    fn test_from_toml() {
        let settings = SelectSettings::from_toml(
            r#"
            multiple = true
            filterable = true
            query_input_placement = "dropdown"
            type_ahead_reset_ms = 500

            [texts]
            no_options = "Nothing here"
            "#,
        )
        .unwrap();

        assert!(settings.multiple);
        assert_eq!(settings.query_input_placement, QueryInputPlacement::Dropdown);
        assert_eq!(settings.type_ahead_reset_ms, 500);
        assert_eq!(settings.search_debounce_ms, 300);
        assert_eq!(settings.texts.no_options, "Nothing here");
        assert_eq!(settings.texts.filter_placeholder, "Filter options...");
        assert!(settings.count);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = SelectSettings::from_toml("multiple = \"yes\"").unwrap_err();
        assert!(matches!(err, FieldError::ConfigParse(_)));
    }

    #[test]
    fn test_search_and_filter_are_exclusive() {
        let config = SelectConfig::new()
            .filterable(true)
            .searchable(|_query: &str, _responder: SearchResponder| {});
        assert!(matches!(config.validate(), Err(FieldError::Config(_))));
    }

    #[test]
    fn test_searchable_settings_need_a_provider() {
        let settings = SelectSettings {
            searchable: true,
            ..Default::default()
        };
        let config = SelectConfig::from_settings(settings);
        assert!(matches!(config.validate(), Err(FieldError::Config(_))));
    }

    #[test]
    fn test_zero_type_ahead_reset_is_rejected() {
        let config = SelectConfig::new().type_ahead_reset(Duration::ZERO);
        assert!(matches!(config.validate(), Err(FieldError::Config(_))));
    }

    #[test]
    fn test_query_mode_resolution() {
        assert!(matches!(SelectConfig::new().validate(), Ok(QueryMode::None)));
        assert!(SelectConfig::new().filterable(true).validate().unwrap().is_filter());
        let searchable = SelectConfig::new().searchable(sync_search(|_| Ok(Vec::new())));
        assert!(searchable.validate().unwrap().is_search());
    }
}
