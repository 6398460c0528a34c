//! # Site Options Record
//!
//! The stored shape of the sitewide settings (`ipq_options`) and the
//! activation defaults.
//!
//! ## Stored vs. Normalized
//! ```text
//! ┌──────────────────────────────────────┐        ┌─────────────────────────┐
//! │ SiteOptionsRecord (stored, raw)      │        │ SiteOptions (normalized)│
//! │ ──────────────────────────────────── │  into  │ ─────────────────────── │
//! │ "ipq_site_rule_active": "on"         │ ─────► │ site_rule_active: true  │
//! │ "ipq_site_min": "0"                  │        │ limits.min: None        │
//! │ "ipq_site_max": 12          (number) │        │ limits.max: Some(12)    │
//! │ "ipq_qty_text": "Min: %MIN%"         │        │ qty_text: "Min: %MIN%"  │
//! └──────────────────────────────────────┘        └─────────────────────────┘
//! ```
//! Values arrive as strings, numbers or null depending on who wrote them;
//! every one is read as a string and then normalized.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{NotePosition, QuantityLimits, SiteOptions};
use crate::validation::{is_flag_on, validate_number};

/// Default quantity note template.
pub const DEFAULT_QTY_TEXT: &str = "Minimum Qty: %MIN%";

/// Keys and values written when the settings record is first created.
///
/// Existing records gain any key missing from this list and keep every
/// value they already have.
pub const ACTIVATION_DEFAULTS: &[(&str, &str)] = &[
    ("ipq_site_rule_active", ""),
    ("ipq_site_min", ""),
    ("ipq_site_max", ""),
    ("ipq_site_step", ""),
    ("ipq_show_qty_note", ""),
    ("ipq_qty_text", DEFAULT_QTY_TEXT),
    ("ipq_show_qty_note_pos", "below"),
    ("ipq_qty_class", ""),
];

/// Raw sitewide settings as stored under [`crate::SITE_OPTIONS_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOptionsRecord {
    #[serde(rename = "ipq_site_rule_active", default, deserialize_with = "raw_string")]
    pub site_rule_active: String,

    #[serde(rename = "ipq_site_min", default, deserialize_with = "raw_string")]
    pub site_min: String,

    #[serde(rename = "ipq_site_max", default, deserialize_with = "raw_string")]
    pub site_max: String,

    #[serde(rename = "ipq_site_step", default, deserialize_with = "raw_string")]
    pub site_step: String,

    #[serde(rename = "ipq_site_min_oos", default, deserialize_with = "raw_string")]
    pub site_min_oos: String,

    #[serde(rename = "ipq_site_max_oos", default, deserialize_with = "raw_string")]
    pub site_max_oos: String,

    #[serde(rename = "ipq_show_qty_note", default, deserialize_with = "raw_string")]
    pub show_qty_note: String,

    #[serde(rename = "ipq_qty_text", default = "default_qty_text", deserialize_with = "raw_string")]
    pub qty_text: String,

    #[serde(
        rename = "ipq_show_qty_note_pos",
        default = "default_note_pos",
        deserialize_with = "raw_string"
    )]
    pub show_qty_note_pos: String,

    #[serde(rename = "ipq_qty_class", default, deserialize_with = "raw_string")]
    pub qty_class: String,
}

fn default_qty_text() -> String {
    DEFAULT_QTY_TEXT.to_string()
}

fn default_note_pos() -> String {
    "below".to_string()
}

impl Default for SiteOptionsRecord {
    fn default() -> Self {
        SiteOptionsRecord {
            site_rule_active: String::new(),
            site_min: String::new(),
            site_max: String::new(),
            site_step: String::new(),
            site_min_oos: String::new(),
            site_max_oos: String::new(),
            show_qty_note: String::new(),
            qty_text: default_qty_text(),
            show_qty_note_pos: default_note_pos(),
            qty_class: String::new(),
        }
    }
}

impl SiteOptionsRecord {
    /// Normalizes the raw record.
    pub fn to_options(&self) -> SiteOptions {
        SiteOptions {
            site_rule_active: is_flag_on(&self.site_rule_active),
            limits: QuantityLimits {
                min: validate_number(&self.site_min),
                max: validate_number(&self.site_max),
                step: validate_number(&self.site_step),
                min_oos: validate_number(&self.site_min_oos),
                max_oos: validate_number(&self.site_max_oos),
            },
            show_qty_note: is_flag_on(&self.show_qty_note),
            qty_text: self.qty_text.clone(),
            qty_note_position: NotePosition::parse(&self.show_qty_note_pos),
            qty_class: self.qty_class.clone(),
        }
    }

    /// Writes normalized options back into stored form.
    pub fn from_options(options: &SiteOptions) -> Self {
        fn raw(value: Option<u32>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }
        fn flag(on: bool) -> String {
            if on { "on".to_string() } else { String::new() }
        }

        SiteOptionsRecord {
            site_rule_active: flag(options.site_rule_active),
            site_min: raw(options.limits.min),
            site_max: raw(options.limits.max),
            site_step: raw(options.limits.step),
            site_min_oos: raw(options.limits.min_oos),
            site_max_oos: raw(options.limits.max_oos),
            show_qty_note: flag(options.show_qty_note),
            qty_text: options.qty_text.clone(),
            show_qty_note_pos: match options.qty_note_position {
                NotePosition::Above => "above".to_string(),
                NotePosition::Below => "below".to_string(),
            },
            qty_class: options.qty_class.clone(),
        }
    }
}

impl From<&SiteOptionsRecord> for SiteOptions {
    fn from(record: &SiteOptionsRecord) -> Self {
        record.to_options()
    }
}

/// Accepts a string, number, boolean or null and yields its string form.
fn raw_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(true) => "on".to_string(),
        _ => String::new(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_normalizes_values() {
        let record: SiteOptionsRecord = serde_json::from_str(
            r#"{
                "ipq_site_rule_active": "on",
                "ipq_site_min": "0",
                "ipq_site_max": 12,
                "ipq_site_step": "3 per box",
                "ipq_site_min_oos": null
            }"#,
        )
        .unwrap();

        let options = record.to_options();
        assert!(options.site_rule_active);
        assert_eq!(options.limits.min, None);
        assert_eq!(options.limits.max, Some(12));
        assert_eq!(options.limits.step, Some(3));
        assert_eq!(options.limits.min_oos, None);
        assert_eq!(options.qty_text, DEFAULT_QTY_TEXT);
        assert_eq!(options.qty_note_position, NotePosition::Below);
    }

    #[test]
    fn test_empty_record_is_inactive() {
        let record: SiteOptionsRecord = serde_json::from_str("{}").unwrap();
        let options = record.to_options();
        assert!(!options.site_rule_active);
        assert!(options.limits.is_empty());
    }

    #[test]
    fn test_record_from_options_keeps_values() {
        let options = SiteOptions::sitewide(QuantityLimits::new().min(2).max(20));
        let record = SiteOptionsRecord::from_options(&options);

        assert_eq!(record.site_rule_active, "on");
        assert_eq!(record.site_min, "2");
        assert_eq!(record.site_step, "");
        assert_eq!(record.to_options(), options);
    }

    #[test]
    fn test_activation_defaults_are_stored_keys() {
        let value = serde_json::to_value(SiteOptionsRecord::default()).unwrap();
        for (key, default) in ACTIVATION_DEFAULTS {
            assert_eq!(value[*key], serde_json::Value::String(default.to_string()), "{key}");
        }
    }
}
