//! Feature hashing transforms.
//!
//! Both transforms hash with SHA-256 so that indices are identical across
//! processes and platforms.

use std::sync::LazyLock;

use regex::Regex;
use repipe_config::{ConfigValue, Result as ConfigResult, Serializable};
use repipe_pipeline::{
    Component, ComponentParams, FieldValue, Result, SparseMatrix, Transform, text_input,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::parallel::map_rows;
use crate::tokenizer::DEFAULT_TOKENIZER_FILTERS;

static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("Invalid word pattern regex"));
static WHITE_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s\s+").expect("Invalid white space regex"));

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Unsigned 64-bit hash of a token.
pub fn stable_hash(token: &str) -> u64 {
    let bytes = digest(token);
    let mut head = [0u8; 8];
    head.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(head)
}

/// Signed 32-bit hash of a token.
pub fn stable_hash_signed(token: &str) -> i32 {
    let bytes = digest(token);
    let mut head = [0u8; 4];
    head.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(head)
}

/// Hashes each word of a text into `1..hash_slots`.
#[derive(Debug, Clone)]
pub struct TextHasher {
    hash_slots: u64,
}

impl TextHasher {
    pub const CLASS: &'static str = "repipe.transforms.TextHasher";

    /// At least two slots are needed: slot 0 is never produced.
    pub fn new(hash_slots: u64) -> Option<Self> {
        (hash_slots >= 2).then_some(Self { hash_slots })
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let hash_slots = params.required_u64("hash_slots")?;
        let hasher =
            Self::new(hash_slots).ok_or_else(|| params.error("'hash_slots' must be at least 2"))?;
        params.finish()?;
        Ok(Component::transform(hasher))
    }

    fn hash_text(&self, text: &str) -> Vec<i64> {
        let lowered = text.to_lowercase();
        let translated: String = lowered
            .chars()
            .map(|ch| {
                if DEFAULT_TOKENIZER_FILTERS.contains(ch) {
                    ' '
                } else {
                    ch
                }
            })
            .collect();
        translated
            .split(' ')
            .filter(|word| !word.is_empty())
            .map(|word| (stable_hash(word) % (self.hash_slots - 1) + 1) as i64)
            .collect()
    }
}

impl Serializable for TextHasher {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({ "hash_slots": self.hash_slots })
    }
}

impl Transform for TextHasher {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let texts = text_input(Self::CLASS, inputs)?;
        debug!("TextHasher::transform - Start");
        let sequences = map_rows(Self::CLASS, texts, |text| {
            Ok(self.hash_text(text.as_deref().unwrap_or_default()))
        })?;
        debug!("TextHasher::transform - Done");
        Ok(FieldValue::Sequences(sequences))
    }
}

/// How documents are split into features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    Word,
    Char,
    CharWb,
}

impl Analyzer {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "word" => Some(Self::Word),
            "char" => Some(Self::Char),
            "char_wb" => Some(Self::CharWb),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Char => "char",
            Self::CharWb => "char_wb",
        }
    }
}

/// Signed hashed term counts with L2-normalized rows, as a sparse matrix.
#[derive(Debug, Clone)]
pub struct HashingVectorizerAdapter {
    n_features: u64,
    lowercase: bool,
    analyzer: Analyzer,
    ngram_range: (usize, usize),
}

impl Default for HashingVectorizerAdapter {
    fn default() -> Self {
        Self {
            n_features: 1 << 20,
            lowercase: true,
            analyzer: Analyzer::Word,
            ngram_range: (1, 1),
        }
    }
}

impl HashingVectorizerAdapter {
    pub const CLASS: &'static str = "repipe.transforms.HashingVectorizerAdapter";

    pub fn new(
        n_features: u64,
        lowercase: bool,
        analyzer: Analyzer,
        ngram_range: (usize, usize),
    ) -> std::result::Result<Self, String> {
        if n_features == 0 {
            return Err("'n_features' must be positive".to_string());
        }
        let (min_n, max_n) = ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid 'ngram_range' [{min_n}, {max_n}]"));
        }
        Ok(Self {
            n_features,
            lowercase,
            analyzer,
            ngram_range,
        })
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let defaults = Self::default();
        let n_features = params.optional_u64("n_features")?.unwrap_or(defaults.n_features);
        let lowercase = params.optional_bool("lowercase")?.unwrap_or(defaults.lowercase);
        let analyzer = match params.optional_str("analyzer")? {
            None => defaults.analyzer,
            Some(name) => Analyzer::parse(&name)
                .ok_or_else(|| params.error(format!("unknown analyzer '{name}'")))?,
        };
        let ngram_range = match params.take_raw("ngram_range")? {
            None | Some(ConfigValue::Null) => defaults.ngram_range,
            Some(raw) => parse_range(&raw)
                .ok_or_else(|| params.error("'ngram_range' must be a pair of positive integers"))?,
        };
        let vectorizer = Self::new(n_features, lowercase, analyzer, ngram_range)
            .map_err(|message| params.error(message))?;
        params.finish()?;
        Ok(Component::transform(vectorizer))
    }

    fn features(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let (min_n, max_n) = self.ngram_range;
        match self.analyzer {
            Analyzer::Word => {
                let words: Vec<&str> = WORD_PATTERN.find_iter(&text).map(|m| m.as_str()).collect();
                let mut grams = Vec::new();
                for n in min_n..=max_n {
                    grams.extend(words.windows(n).map(|window| window.join(" ")));
                }
                grams
            }
            Analyzer::Char => {
                let normalized = WHITE_SPACES.replace_all(&text, " ");
                char_ngrams(&normalized.chars().collect::<Vec<_>>(), min_n, max_n)
            }
            Analyzer::CharWb => {
                let normalized = WHITE_SPACES.replace_all(&text, " ");
                let mut grams = Vec::new();
                for word in normalized.split_whitespace() {
                    let padded: Vec<char> = std::iter::once(' ')
                        .chain(word.chars())
                        .chain(std::iter::once(' '))
                        .collect();
                    for n in min_n..=max_n {
                        let mut offset = 0;
                        grams.push(window(&padded, offset, n));
                        while offset + n < padded.len() {
                            offset += 1;
                            grams.push(window(&padded, offset, n));
                        }
                        // A word shorter than the n-gram is counted once.
                        if offset == 0 {
                            break;
                        }
                    }
                }
                grams
            }
        }
    }

    fn vectorize(&self, text: &str) -> Vec<(usize, f32)> {
        let mut counts: Vec<(usize, f64)> = Vec::new();
        for feature in self.features(text) {
            let hash = stable_hash_signed(&feature);
            let index = (i64::from(hash).unsigned_abs() % self.n_features) as usize;
            let sign = if hash >= 0 { 1.0 } else { -1.0 };
            match counts.iter_mut().find(|(col, _)| *col == index) {
                Some((_, value)) => *value += sign,
                None => counts.push((index, sign)),
            }
        }
        let norm = counts.iter().map(|(_, value)| value * value).sum::<f64>().sqrt();
        counts
            .into_iter()
            .filter(|(_, value)| *value != 0.0)
            .map(|(col, value)| (col, (value / norm) as f32))
            .collect()
    }
}

fn window(chars: &[char], offset: usize, n: usize) -> String {
    let end = (offset + n).min(chars.len());
    chars[offset..end].iter().collect()
}

fn char_ngrams(chars: &[char], min_n: usize, max_n: usize) -> Vec<String> {
    let mut grams = Vec::new();
    for n in min_n..=max_n {
        grams.extend(chars.windows(n).map(|window| window.iter().collect::<String>()));
    }
    grams
}

fn parse_range(raw: &ConfigValue) -> Option<(usize, usize)> {
    let items = raw.as_array()?;
    match items.as_slice() {
        [min_n, max_n] => Some((
            usize::try_from(min_n.as_u64()?).ok()?,
            usize::try_from(max_n.as_u64()?).ok()?,
        )),
        _ => None,
    }
}

impl Serializable for HashingVectorizerAdapter {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({
            "n_features": self.n_features,
            "lowercase": self.lowercase,
            "analyzer": self.analyzer.as_str(),
            "ngram_range": [self.ngram_range.0, self.ngram_range.1],
        })
    }
}

impl Transform for HashingVectorizerAdapter {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let texts = text_input(Self::CLASS, inputs)?;
        debug!("HashingVectorizerAdapter::transform - Start");
        let rows = map_rows(Self::CLASS, texts, |text| {
            Ok(self.vectorize(text.as_deref().unwrap_or_default()))
        })?;
        let matrix = SparseMatrix::from_rows(rows, self.n_features as usize)?;
        debug!("HashingVectorizerAdapter::transform - Done");
        Ok(FieldValue::Sparse(matrix))
    }
}
