//! Vocabulary tokenizer producing integer sequences.
//!
//! Fitting counts words over the corpus and assigns indices by descending
//! frequency after three reserved slots: `<pad>` = 0, `<mis>` = 1 (out of
//! vocabulary) and `<eos>` = 2. Transforming maps each text to its word indices
//! followed by `<eos>`.
//!
//! The fitted vocabulary is part of this transform's parameters, so its
//! descriptor is loaded verbatim (see [`repipe_config::VERBATIM_PARAMS_CLASS`]).

use std::collections::HashSet;

use indexmap::IndexMap;
use repipe_config::{
    ConfigMap, ConfigValue, Result as ConfigResult, Serializable, VERBATIM_PARAMS_CLASS,
};
use repipe_pipeline::{
    Component, ComponentParams, FieldValue, PipelineError, Result, Transform, single_input,
};
use serde_json::json;
use tracing::debug;

use crate::parallel::map_rows;

/// Characters stripped before splitting unless configured otherwise.
pub const DEFAULT_TOKENIZER_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

pub const PAD_TOKEN: &str = "<pad>";
pub const OOV_TOKEN: &str = "<mis>";
pub const EOS_TOKEN: &str = "<eos>";

const RESERVED: [(&str, i64); 3] = [(PAD_TOKEN, 0), (OOV_TOKEN, 1), (EOS_TOKEN, 2)];

/// Seed text fitted before the corpus so the reserved tokens are always counted.
const SEED_TEXT: &str = "<eos> <pad>";

#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerAdapter {
    num_words: Option<u64>,
    filters: String,
    lower: bool,
    split: String,
    char_level: bool,
    oov_token: String,
    document_count: u64,
    word_counts: IndexMap<String, u64>,
    word_docs: IndexMap<String, u64>,
    index_docs: IndexMap<i64, u64>,
    index_word: IndexMap<i64, String>,
    word_index: IndexMap<String, i64>,
}

impl Default for TokenizerAdapter {
    fn default() -> Self {
        Self {
            num_words: None,
            filters: DEFAULT_TOKENIZER_FILTERS.to_string(),
            lower: true,
            split: " ".to_string(),
            char_level: false,
            oov_token: OOV_TOKEN.to_string(),
            document_count: 0,
            word_counts: IndexMap::new(),
            word_docs: IndexMap::new(),
            index_docs: IndexMap::new(),
            index_word: IndexMap::new(),
            word_index: IndexMap::new(),
        }
    }
}

impl TokenizerAdapter {
    pub const CLASS: &'static str = VERBATIM_PARAMS_CLASS;

    pub fn new(filters: impl Into<String>) -> Self {
        Self {
            filters: filters.into(),
            ..Self::default()
        }
    }

    pub fn with_num_words(mut self, num_words: Option<u64>) -> Self {
        self.num_words = num_words;
        self
    }

    pub fn with_lower(mut self, lower: bool) -> Self {
        self.lower = lower;
        self
    }

    pub fn word_index(&self) -> &IndexMap<String, i64> {
        &self.word_index
    }

    pub fn document_count(&self) -> u64 {
        self.document_count
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let mut tokenizer = Self::default();
        tokenizer.num_words = params.optional_u64("num_words")?;
        if let Some(filters) = params.optional_str("filters")? {
            tokenizer.filters = filters;
        }
        if let Some(lower) = params.optional_bool("lower")? {
            tokenizer.lower = lower;
        }
        if let Some(split) = params.optional_str("split")? {
            tokenizer.split = split;
        }
        if let Some(char_level) = params.optional_bool("char_level")? {
            tokenizer.char_level = char_level;
        }
        // The out-of-vocabulary token is fixed; a configured value is ignored.
        params.optional_str("oov_token")?;
        tokenizer.document_count = params.optional_u64("document_count")?.unwrap_or(0);

        if let Some(raw) = params.take_raw("word_counts")? {
            tokenizer.word_counts = counts_by_word(&params, "word_counts", &raw)?;
        }
        if let Some(raw) = params.take_raw("word_docs")? {
            tokenizer.word_docs = counts_by_word(&params, "word_docs", &raw)?;
        }
        if let Some(raw) = params.take_raw("index_docs")? {
            tokenizer.index_docs = by_index(&params, "index_docs", &raw, ConfigValue::as_u64)?;
        }
        if let Some(raw) = params.take_raw("index_word")? {
            tokenizer.index_word = by_index(&params, "index_word", &raw, |value| {
                value.as_str().map(str::to_string)
            })?;
        }
        if let Some(raw) = params.take_raw("word_index")? {
            tokenizer.word_index = by_word(&params, "word_index", &raw, ConfigValue::as_i64)?;
        }
        if tokenizer.split.is_empty() && !tokenizer.char_level {
            return Err(params.error("'split' must not be empty"));
        }
        params.finish()?;
        Ok(Component::transform(tokenizer))
    }

    /// Split one text into words with this tokenizer's filters and casing.
    fn words(&self, text: &str) -> Vec<String> {
        let text = if self.lower {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        if self.char_level {
            return text.chars().map(String::from).collect();
        }
        let translated: String = text
            .chars()
            .map(|ch| {
                if self.filters.contains(ch) {
                    self.split.clone()
                } else {
                    ch.to_string()
                }
            })
            .collect();
        translated
            .split(self.split.as_str())
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn row_words(&self, input: &FieldValue, row: usize) -> Vec<String> {
        match input {
            FieldValue::Text(texts) => self.words(texts[row].as_deref().unwrap_or_default()),
            FieldValue::Tokens(tokens) if self.lower => {
                tokens[row].iter().map(|token| token.to_lowercase()).collect()
            }
            FieldValue::Tokens(tokens) => tokens[row].clone(),
            _ => Vec::new(),
        }
    }

    fn check_input<'a>(&self, inputs: &[&'a FieldValue]) -> Result<&'a FieldValue> {
        let input = single_input(Self::CLASS, inputs)?;
        match input {
            FieldValue::Text(_) | FieldValue::Tokens(_) => Ok(input),
            other => Err(PipelineError::invalid_input(
                Self::CLASS,
                format!("expected text or tokens, received {}", other.kind()),
            )),
        }
    }

    /// Count one document's words into the running statistics.
    fn count_document(&mut self, words: &[String]) {
        self.document_count += 1;
        let mut seen = HashSet::new();
        for word in words {
            *self.word_counts.entry(word.clone()).or_insert(0) += 1;
            if seen.insert(word.as_str()) {
                *self.word_docs.entry(word.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Rebuild per-index document counts from the frequency ranking with the
    /// out-of-vocabulary token in slot 1.
    fn rebuild_index_docs(&mut self) {
        let mut ranked: Vec<(&String, u64)> = self
            .word_counts
            .iter()
            .map(|(word, count)| (word, *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let sorted = std::iter::once(self.oov_token.as_str())
            .chain(ranked.into_iter().map(|(word, _)| word.as_str()));
        let mut ranking: IndexMap<&str, i64> = IndexMap::new();
        for (pos, word) in sorted.enumerate() {
            ranking.insert(word, pos as i64 + 1);
        }
        self.index_docs = self
            .word_docs
            .iter()
            .filter_map(|(word, docs)| ranking.get(word.as_str()).map(|idx| (*idx, *docs)))
            .collect();
    }

    fn rebuild_word_index(&mut self) {
        let mut vocabulary: Vec<(&String, u64)> = self
            .word_counts
            .iter()
            .filter(|(word, _)| !RESERVED.iter().any(|(token, _)| *token == word.as_str()))
            .map(|(word, count)| (word, *count))
            .collect();
        // Stable: equal counts keep first-seen order.
        vocabulary.sort_by(|a, b| b.1.cmp(&a.1));

        let first_slot = RESERVED.len() as i64;
        let mut word_index: IndexMap<String, i64> = RESERVED
            .iter()
            .map(|(token, idx)| ((*token).to_string(), *idx))
            .collect();
        for (offset, (word, _)) in vocabulary.into_iter().enumerate() {
            word_index.insert(word.clone(), first_slot + offset as i64);
        }
        self.index_word = word_index
            .iter()
            .map(|(word, idx)| (*idx, word.clone()))
            .collect();
        self.word_index = word_index;
    }

    fn encode(&self, words: &[String], eos: i64, oov: Option<i64>) -> Vec<i64> {
        let mut sequence = Vec::with_capacity(words.len() + 1);
        for word in words {
            match self.word_index.get(word) {
                Some(&idx) => match self.num_words {
                    Some(limit) if limit > 0 && idx >= limit as i64 => sequence.extend(oov),
                    _ => sequence.push(idx),
                },
                None => sequence.extend(oov),
            }
        }
        sequence.push(eos);
        sequence
    }
}

impl Serializable for TokenizerAdapter {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        let index_docs: ConfigMap = self
            .index_docs
            .iter()
            .map(|(idx, docs)| (idx.to_string(), json!(docs)))
            .collect();
        let index_word: ConfigMap = self
            .index_word
            .iter()
            .map(|(idx, word)| (idx.to_string(), json!(word)))
            .collect();
        json!({
            "num_words": self.num_words,
            "filters": self.filters,
            "lower": self.lower,
            "split": self.split,
            "char_level": self.char_level,
            "oov_token": self.oov_token,
            "document_count": self.document_count,
            "word_counts": self.word_counts,
            "word_docs": self.word_docs,
            "index_docs": index_docs,
            "index_word": index_word,
            "word_index": self.word_index,
        })
    }
}

impl Transform for TokenizerAdapter {
    fn fit(&mut self, inputs: &[&FieldValue]) -> Result<()> {
        let input = self.check_input(inputs)?;
        let seed = self.words(SEED_TEXT);
        self.count_document(&seed);
        for row in 0..input.len() {
            let words = self.row_words(input, row);
            self.count_document(&words);
        }
        self.rebuild_index_docs();
        self.rebuild_word_index();
        debug!(
            vocabulary = self.word_index.len(),
            documents = self.document_count,
            "fitted tokenizer"
        );
        Ok(())
    }

    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let input = self.check_input(inputs)?;
        let eos = *self
            .word_index
            .get(EOS_TOKEN)
            .ok_or_else(|| PipelineError::not_fitted(Self::CLASS))?;
        let oov = self.word_index.get(self.oov_token.as_str()).copied();
        debug!("TokenizerAdapter::transform - Start");
        let rows: Vec<usize> = (0..input.len()).collect();
        let sequences = map_rows(Self::CLASS, &rows, |row| {
            Ok(self.encode(&self.row_words(input, *row), eos, oov))
        })?;
        debug!("TokenizerAdapter::transform - Done");
        Ok(FieldValue::Sequences(sequences))
    }
}

fn counts_by_word(
    params: &ComponentParams,
    key: &str,
    raw: &ConfigValue,
) -> ConfigResult<IndexMap<String, u64>> {
    by_word(params, key, raw, ConfigValue::as_u64)
}

fn by_word<V>(
    params: &ComponentParams,
    key: &str,
    raw: &ConfigValue,
    convert: impl Fn(&ConfigValue) -> Option<V>,
) -> ConfigResult<IndexMap<String, V>> {
    let map = raw
        .as_object()
        .ok_or_else(|| params.error(format!("parameter '{key}' must be a mapping")))?;
    map.iter()
        .map(|(word, value)| {
            convert(value)
                .map(|value| (word.clone(), value))
                .ok_or_else(|| params.error(format!("parameter '{key}' has an invalid entry for '{word}'")))
        })
        .collect()
}

fn by_index<V>(
    params: &ComponentParams,
    key: &str,
    raw: &ConfigValue,
    convert: impl Fn(&ConfigValue) -> Option<V>,
) -> ConfigResult<IndexMap<i64, V>> {
    let map = raw
        .as_object()
        .ok_or_else(|| params.error(format!("parameter '{key}' must be a mapping")))?;
    map.iter()
        .map(|(idx, value)| {
            let parsed = idx
                .parse::<i64>()
                .map_err(|_| params.error(format!("parameter '{key}' has a non-integer key '{idx}'")))?;
            convert(value)
                .map(|value| (parsed, value))
                .ok_or_else(|| params.error(format!("parameter '{key}' has an invalid entry for '{idx}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(texts: &[&str]) -> TokenizerAdapter {
        let mut tokenizer = TokenizerAdapter::new("");
        tokenizer
            .fit(&[&FieldValue::text(texts.iter().copied())])
            .unwrap();
        tokenizer
    }

    #[test]
    fn reserved_slots_come_first() {
        let tokenizer = fitted(&["b a b", "c"]);
        let index: Vec<(&str, i64)> = tokenizer
            .word_index()
            .iter()
            .map(|(word, idx)| (word.as_str(), *idx))
            .collect();
        assert_eq!(
            index,
            vec![("<pad>", 0), ("<mis>", 1), ("<eos>", 2), ("b", 3), ("a", 4), ("c", 5)]
        );
        assert_eq!(tokenizer.document_count(), 3);
    }

    #[test]
    fn transform_appends_eos_and_marks_unknown_words() {
        let tokenizer = fitted(&["b a b"]);
        let out = tokenizer
            .transform(&[&FieldValue::Text(vec![Some("a z".to_string()), None])])
            .unwrap();
        assert_eq!(out, FieldValue::Sequences(vec![vec![4, 1, 2], vec![2]]));
    }

    #[test]
    fn num_words_limit_maps_rare_words_to_oov() {
        let mut tokenizer = TokenizerAdapter::new("").with_num_words(Some(4));
        tokenizer.fit(&[&FieldValue::text(["b a b"])]).unwrap();
        let out = tokenizer.transform(&[&FieldValue::text(["a b"])]).unwrap();
        assert_eq!(out, FieldValue::Sequences(vec![vec![1, 3, 2]]));
    }

    #[test]
    fn default_filters_strip_punctuation() {
        let mut tokenizer = TokenizerAdapter::default();
        tokenizer.fit(&[&FieldValue::text(["Hi, there!"])]).unwrap();
        // The seed text loses its brackets to the filters and is counted as words.
        assert_eq!(tokenizer.word_index().get("eos"), Some(&3));
        let out = tokenizer.transform(&[&FieldValue::text(["HI there"])]).unwrap();
        assert_eq!(out, FieldValue::Sequences(vec![vec![5, 6, 2]]));
    }

    #[test]
    fn transform_before_fit_is_not_fitted() {
        let err = TokenizerAdapter::default()
            .transform(&[&FieldValue::text(["a"])])
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFitted { .. }));
    }

    #[test]
    fn index_keyed_maps_serialize_with_string_keys() {
        let params = fitted(&["a"]).params();
        assert_eq!(params["index_word"]["3"], json!("a"));
        assert_eq!(params["word_index"]["a"], json!(3));
        assert_eq!(params["oov_token"], json!("<mis>"));
    }
}
