//! Selectable options
//!
//! Options enter a field as [`OptionDescriptor`]s (from code, from a search
//! provider, or from authored markup via [`NativeOption`]). The registry turns
//! them into [`SelectOption`]s, which carry the per-option reactive flags, and
//! hands out plain [`OptionRecord`] copies to callers.

use std::fmt;

use fieldkit_core::Derived;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Stable identifier of an option
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionId {
    Num(i64),
    Str(String),
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionId::Num(n) => write!(f, "{n}"),
            OptionId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for OptionId {
    fn from(n: i64) -> Self {
        OptionId::Num(n)
    }
}

impl From<&str> for OptionId {
    fn from(s: &str) -> Self {
        OptionId::Str(s.to_string())
    }
}

impl From<String> for OptionId {
    fn from(s: String) -> Self {
        OptionId::Str(s)
    }
}

/// Input description of an option
///
/// `id` may be omitted, in which case the field generates one. An empty
/// `label` falls back to `value`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionDescriptor {
    pub id: Option<OptionId>,
    pub label: String,
    pub html_label: Option<String>,
    pub value: String,
    pub data: Option<serde_json::Value>,
    /// Select this option as soon as it is registered
    pub selected: bool,
}

impl OptionDescriptor {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<OptionId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn html_label(mut self, html: impl Into<String>) -> Self {
        self.html_label = Some(html.into());
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

/// An authored `<option>` element, as read from markup
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeOption {
    /// Text content
    pub label: String,
    pub value: String,
    /// Live selection state (may have been restored by the browser)
    pub selected: bool,
    /// Whether the `selected` attribute was authored
    pub selected_attribute: bool,
    /// Raw `data-json` payload
    pub json: Option<String>,
}

impl NativeOption {
    /// Convert into a descriptor
    ///
    /// With `default_selected` the live selection state is used, otherwise
    /// only the authored attribute counts. A malformed JSON payload is logged
    /// and dropped; the option itself is kept.
    pub fn into_descriptor(self, default_selected: bool) -> OptionDescriptor {
        let data = self.json.as_deref().and_then(parse_auxiliary_json);
        OptionDescriptor {
            id: None,
            label: self.label,
            html_label: None,
            value: self.value,
            data,
            selected: if default_selected {
                self.selected
            } else {
                self.selected_attribute
            },
        }
    }
}

/// Parse an auxiliary JSON payload. Blank means "no data".
pub fn parse_auxiliary_json(raw: &str) -> Option<serde_json::Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(%error, "unable to parse option data-json payload");
            None
        }
    }
}

/// A plain copy of an option, safe to hand to callers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub id: OptionId,
    pub label: String,
    pub html_label: Option<String>,
    pub value: String,
    pub data: Option<serde_json::Value>,
}

/// A registered option with its reactive flags
///
/// Valid for one registry generation only: replacing the options disposes
/// these flags, so consumers must re-read the registry rather than keep old
/// `SelectOption`s around.
#[derive(Debug)]
pub struct SelectOption {
    pub(crate) record: OptionRecord,
    pub(crate) ordinal: usize,
    pub(crate) normalized_label: String,
    pub(crate) selected: Derived<bool>,
    pub(crate) active: Derived<bool>,
    pub(crate) matches_filter: Derived<bool>,
}

impl SelectOption {
    pub fn id(&self) -> &OptionId {
        &self.record.id
    }

    pub fn label(&self) -> &str {
        &self.record.label
    }

    pub fn html_label(&self) -> Option<&str> {
        self.record.html_label.as_deref()
    }

    pub fn value(&self) -> &str {
        &self.record.value
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.record.data.as_ref()
    }

    /// Position in the registry
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn normalized_label(&self) -> &str {
        &self.normalized_label
    }

    /// Whether the label matches an already normalized filter text
    pub fn label_matches(&self, filter: &str) -> bool {
        label_matches(&self.normalized_label, filter)
    }

    /// Whether the option is in the selection
    pub fn selected(&self) -> Derived<bool> {
        self.selected
    }

    /// Whether the option is the keyboard highlight (multi-select only)
    pub fn active(&self) -> Derived<bool> {
        self.active
    }

    /// Whether the option's label matches the current filter text
    pub fn matches_filter(&self) -> Derived<bool> {
        self.matches_filter
    }

    pub fn record(&self) -> &OptionRecord {
        &self.record
    }
}

/// Generates ids for options that arrive without one
///
/// Owned by one field; sequence numbers never leak between fields.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> OptionId {
        let id = OptionId::Str(format!("_select_option_{}", self.next));
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Substring match of a normalized label against normalized filter text
pub(crate) fn label_matches(normalized_label: &str, filter: &str) -> bool {
    filter.is_empty() || normalized_label.contains(filter)
}

/// Normalize text for matching
///
/// Trimmed, lowercased, inner whitespace runs collapsed, and combining
/// diacritical marks (U+0300..=U+036F) stripped after canonical
/// decomposition.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_strips_case_and_diacritics() {
        assert_eq!(normalize("  Crème   Brûlée "), "creme brulee");
        assert_eq!(normalize("ÉCOLE"), "ecole");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_id_generator_is_per_instance() {
        let mut first = IdGenerator::new();
        let mut second = IdGenerator::new();

        assert_eq!(first.next_id(), OptionId::from("_select_option_0"));
        assert_eq!(first.next_id(), OptionId::from("_select_option_1"));
        assert_eq!(second.next_id(), OptionId::from("_select_option_0"));

        first.reset();
        assert_eq!(first.next_id(), OptionId::from("_select_option_0"));
    }

    #[test]
    fn test_option_id_deserializes_numbers_and_strings() {
        let ids: Vec<OptionId> = serde_json::from_value(json!([1, "fr"])).unwrap();
        assert_eq!(ids, vec![OptionId::Num(1), OptionId::from("fr")]);
        assert_eq!(ids[0].to_string(), "1");
    }

    #[test]
    fn test_descriptor_from_search_payload() {
        let descriptor: OptionDescriptor =
            serde_json::from_value(json!({ "value": "de", "label": "Germany" })).unwrap();
        assert_eq!(descriptor.id, None);
        assert_eq!(descriptor.label, "Germany");
        assert!(!descriptor.selected);
    }

    #[test]
    fn test_native_option_selection_source() {
        let native = NativeOption {
            label: "Apple".into(),
            value: "apple".into(),
            selected: true,
            selected_attribute: false,
            json: None,
        };

        assert!(native.clone().into_descriptor(true).selected);
        assert!(!native.into_descriptor(false).selected);
    }

    #[test]
    fn test_native_option_json_payload() {
        let native = NativeOption {
            label: "Apple".into(),
            value: "apple".into(),
            json: Some(r#"{"color":"red"}"#.into()),
            ..Default::default()
        };
        assert_eq!(
            native.into_descriptor(false).data,
            Some(json!({ "color": "red" }))
        );
    }

    #[test]
    fn test_malformed_json_payload_is_dropped() {
        let native = NativeOption {
            label: "Apple".into(),
            value: "apple".into(),
            json: Some("{not json".into()),
            ..Default::default()
        };
        let descriptor = native.into_descriptor(false);
        assert_eq!(descriptor.data, None);
        assert_eq!(descriptor.value, "apple");

        assert_eq!(parse_auxiliary_json("   "), None);
    }
}
