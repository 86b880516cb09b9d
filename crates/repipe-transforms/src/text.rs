//! Text cleanup transforms.

use std::sync::LazyLock;

use regex::Regex;
use repipe_config::{ConfigValue, Result as ConfigResult, Serializable};
use repipe_pipeline::{
    Component, ComponentParams, FieldValue, PipelineError, Result, Transform, text_input,
};
use serde_json::json;
use tracing::debug;

use crate::parallel::map_rows;

/// Characters replaced by a space unless configured otherwise.
pub const DEFAULT_SCRUB_FILTERS: &str =
    "()[]{}<>$&%#|-+=*_─…•—–\"'’/\\“ °´®”\u{308}~¿";

static DOT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[\. ]*").expect("Invalid dot run regex"));
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9][0-9\- ]*").expect("Invalid digit run regex"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("Invalid line break regex"));
static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:'\w+)*|[^\w\s]").expect("Invalid word token regex"));

/// Split text into word and punctuation tokens.
pub fn word_tokenize(text: &str) -> Vec<String> {
    WORD_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalizes free text: line breaks become sentence ends, filtered characters
/// become spaces, dot runs become a single ` . ` token and digit runs collapse
/// into `__NUM__`.
pub struct TextScrubber {
    lower: bool,
    tokenize: bool,
    strip_line_break: bool,
    filters: String,
    scrubbers: Vec<(Regex, &'static str)>,
}

impl TextScrubber {
    pub const CLASS: &'static str = "repipe.transforms.TextScrubber";

    pub fn new(
        lower: bool,
        tokenize: bool,
        strip_line_break: bool,
        filters: impl Into<String>,
    ) -> std::result::Result<Self, regex::Error> {
        let filters = filters.into();
        let mut scrubbers = Vec::with_capacity(4);
        if strip_line_break {
            scrubbers.push((LINE_BREAK.clone(), ". "));
        }
        if !filters.is_empty() {
            let class = format!("[{}]+", regex::escape(&filters));
            scrubbers.push((Regex::new(&class)?, " "));
        }
        scrubbers.push((DOT_RUN.clone(), " . "));
        scrubbers.push((DIGIT_RUN.clone(), " __NUM__ "));
        Ok(Self {
            lower,
            tokenize,
            strip_line_break,
            filters,
            scrubbers,
        })
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let lower = params.optional_bool("lower")?.unwrap_or(false);
        let tokenize = params.optional_bool("tokenize")?.unwrap_or(false);
        let strip_line_break = params.optional_bool("strip_line_break")?.unwrap_or(true);
        let filters = params
            .optional_str("filters")?
            .unwrap_or_else(|| DEFAULT_SCRUB_FILTERS.to_string());
        let scrubber = Self::new(lower, tokenize, strip_line_break, filters)
            .map_err(|err| params.error(err.to_string()))?;
        params.finish()?;
        Ok(Component::transform(scrubber))
    }

    /// Scrub one text and split it into tokens.
    pub fn scrub(&self, text: &str) -> Vec<String> {
        let mut text = if self.lower {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        for (regex, replacement) in &self.scrubbers {
            text = regex.replace_all(&text, *replacement).into_owned();
        }
        word_tokenize(&text)
    }
}

impl Serializable for TextScrubber {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({
            "lower": self.lower,
            "tokenize": self.tokenize,
            "strip_line_break": self.strip_line_break,
            "filters": self.filters,
        })
    }
}

impl Transform for TextScrubber {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let texts = text_input(Self::CLASS, inputs)?;
        debug!("TextScrubber::transform - Start");
        let tokens = map_rows(Self::CLASS, texts, |text| {
            Ok(self.scrub(text.as_deref().unwrap_or_default()))
        })?;
        debug!("TextScrubber::transform - Done");
        Ok(if self.tokenize {
            FieldValue::Tokens(tokens)
        } else {
            FieldValue::Text(tokens.into_iter().map(|row| Some(row.join(" "))).collect())
        })
    }
}

/// Joins several text fields row-wise with a separator; nulls join as empty text.
#[derive(Debug, Clone)]
pub struct TextFieldUnion {
    separator: String,
}

impl Default for TextFieldUnion {
    fn default() -> Self {
        Self::new(" . ")
    }
}

impl TextFieldUnion {
    pub const CLASS: &'static str = "repipe.transforms.TextFieldUnion";

    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let separator = params
            .optional_str("separator")?
            .unwrap_or_else(|| " . ".to_string());
        params.finish()?;
        Ok(Component::transform(Self::new(separator)))
    }
}

impl Serializable for TextFieldUnion {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({ "separator": self.separator })
    }
}

impl Transform for TextFieldUnion {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let columns = inputs
            .iter()
            .map(|input| {
                input.as_text().ok_or_else(|| {
                    PipelineError::invalid_input(
                        Self::CLASS,
                        format!("expected text fields, received {}", input.kind()),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let Some((first, rest)) = columns.split_first() else {
            return Err(PipelineError::Arity {
                transform: Self::CLASS.to_string(),
                expected: "at least 1".to_string(),
                found: 0,
            });
        };
        if rest.is_empty() {
            return Ok(FieldValue::Text(first.to_vec()));
        }
        if let Some(column) = rest.iter().find(|column| column.len() != first.len()) {
            return Err(PipelineError::invalid_input(
                Self::CLASS,
                format!("row counts differ: {} and {}", first.len(), column.len()),
            ));
        }
        let joined = (0..first.len())
            .map(|row| {
                let parts: Vec<&str> = columns
                    .iter()
                    .map(|column| column[row].as_deref().unwrap_or_default())
                    .collect();
                Some(parts.join(&self.separator))
            })
            .collect();
        Ok(FieldValue::Text(joined))
    }
}
