//! Per-class evaluation records and output head names.

use serde::{Deserialize, Serialize};

/// Offline evaluation metrics of one predictable class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub class_id: usize,
    pub class_name: String,
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
    pub support: u64,
}

/// Tag of heads that predict every class independently.
pub const MULTI_LABEL_TAG: &str = "multi-label";

/// Tag assumed for heads named without one.
pub const DEFAULT_TAG: &str = "multi-class";

/// How many classes a head predicts per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMode {
    /// Exactly one class per row.
    SingleLabel,
    /// Any number of classes per row.
    MultiLabel,
}

/// A parsed `"<tag>:<name>"` head key.
///
/// The tag is kept as written so the key serializes back unchanged; only
/// `multi-label` switches the decoding mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadName {
    pub tag: String,
    pub name: String,
}

impl HeadName {
    /// Parse a head key. The name is the text after the last `:` and the tag
    /// the text before the first one.
    pub fn parse(key: &str) -> Self {
        let mut parts = key.split(':');
        let first = parts.next().unwrap_or_default();
        match parts.next_back() {
            Some(name) => Self {
                tag: first.to_string(),
                name: name.to_string(),
            },
            None => Self {
                tag: DEFAULT_TAG.to_string(),
                name: first.to_string(),
            },
        }
    }

    pub fn mode(&self) -> LabelMode {
        if self.tag == MULTI_LABEL_TAG {
            LabelMode::MultiLabel
        } else {
            LabelMode::SingleLabel
        }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.tag, self.name)
    }
}
