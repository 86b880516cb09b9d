//! Pretrained word-vector embeddings.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndarray::{Array2, Array3, s};
use repipe_config::{ConfigValue, Result as ConfigResult, Serializable};
use repipe_pipeline::{Component, ComponentParams, FieldValue, Result, Transform, text_input};
use serde_json::json;
use tracing::{debug, info};

use crate::dtype;
use crate::parallel::map_rows;

/// Tail slots appended to every vector: missing word, end of sequence, padding.
const SPECIAL_SLOTS: usize = 3;
const MIS_SLOT: usize = 0;
const EOS_SLOT: usize = 1;
const PAD_SLOT: usize = 2;

/// Word vectors read from a word2vec text file.
#[derive(Debug, Clone, PartialEq)]
pub struct WordVectors {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    /// Parse the word2vec text format: a `count dim` header line followed by
    /// one `word v1 .. vdim` line per word.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines.next().ok_or("empty vector file")?;
        let mut fields = header.split_whitespace();
        let (Some(count), Some(dim), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(format!("invalid header '{header}'"));
        };
        let count: usize = count
            .parse()
            .map_err(|_| format!("invalid word count '{count}'"))?;
        let dim: usize = dim
            .parse()
            .map_err(|_| format!("invalid dimension '{dim}'"))?;

        let mut vectors = HashMap::with_capacity(count);
        for (number, line) in lines.enumerate() {
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let vector = fields
                .map(|value| {
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("line {}: invalid component '{value}'", number + 2))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if vector.len() != dim {
                return Err(format!(
                    "line {}: expected {dim} components, found {}",
                    number + 2,
                    vector.len()
                ));
            }
            vectors.insert(word.to_string(), vector);
        }
        if vectors.len() != count {
            return Err(format!(
                "header declares {count} words, found {}",
                vectors.len()
            ));
        }
        Ok(Self { dim, vectors })
    }

    pub fn read(path: &Path) -> std::result::Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|err| format!("failed to read '{}': {err}", path.display()))?;
        Self::parse(&text)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }
}

/// Embeds lowercased whitespace tokens as a `(rows, max_embedding_len, dim + 3)`
/// tensor.
///
/// Unknown words use the missing-word slot. An end-of-sequence marker follows
/// the tokens when at least two positions remain, and padding fills the rest
/// when at least three remain.
#[derive(Debug, Clone)]
pub struct WordVectorEmbedder {
    path: String,
    max_embedding_len: usize,
    dtype: String,
    vectors: WordVectors,
}

impl WordVectorEmbedder {
    pub const CLASS: &'static str = "repipe.transforms.WordVectorEmbedder";

    pub fn from_vectors(
        path: impl Into<String>,
        max_embedding_len: usize,
        vectors: WordVectors,
    ) -> Self {
        Self {
            path: path.into(),
            max_embedding_len,
            dtype: "float32".to_string(),
            vectors,
        }
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let path = params.required_str("path")?;
        let max_embedding_len = usize::try_from(params.required_u64("max_embedding_len")?)
            .map_err(|_| params.error("'max_embedding_len' is too large"))?;
        let dtype = params
            .optional_str("dtype")?
            .unwrap_or_else(|| "float32".to_string());
        if !dtype::is_supported(&dtype) {
            return Err(params.error(format!("unsupported dtype '{dtype}'")));
        }
        let vectors = WordVectors::read(Path::new(&path)).map_err(|err| params.error(err))?;
        info!(
            path = %path,
            words = vectors.len(),
            dim = vectors.dim(),
            "loaded word vectors"
        );
        params.finish()?;
        Ok(Component::transform(Self {
            path,
            max_embedding_len,
            dtype,
            vectors,
        }))
    }

    fn embed(&self, text: &str) -> Array2<f32> {
        let width = self.vectors.dim() + SPECIAL_SLOTS;
        let max_len = self.max_embedding_len;
        let special = |slot: usize| self.vectors.dim() + slot;
        let mut out = Array2::zeros((max_len, width));

        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();
        let len = tokens.len();
        if len + 1 < max_len {
            out[[len, special(EOS_SLOT)]] = 1.0;
        }
        if len + 2 < max_len {
            out.slice_mut(s![len + 1.., special(PAD_SLOT)]).fill(1.0);
        }
        for (position, token) in tokens.iter().take(max_len).enumerate() {
            let mut row = out.row_mut(position);
            match self.vectors.get(token) {
                Some(vector) => {
                    for (cell, value) in row.iter_mut().zip(vector) {
                        *cell = *value;
                    }
                }
                None => row[special(MIS_SLOT)] = 1.0,
            }
        }
        out
    }
}

impl Serializable for WordVectorEmbedder {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({
            "path": self.path,
            "dtype": self.dtype,
            "max_embedding_len": self.max_embedding_len,
        })
    }
}

impl Transform for WordVectorEmbedder {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let texts = text_input(Self::CLASS, inputs)?;
        debug!("WordVectorEmbedder::transform - Start");
        let rows = map_rows(Self::CLASS, texts, |text| {
            Ok(self.embed(text.as_deref().unwrap_or_default()))
        })?;
        let mut out = Array3::zeros((
            rows.len(),
            self.max_embedding_len,
            self.vectors.dim() + SPECIAL_SLOTS,
        ));
        for (index, row) in rows.iter().enumerate() {
            out.slice_mut(s![index, .., ..]).assign(row);
        }
        debug!("WordVectorEmbedder::transform - Done");
        Ok(FieldValue::Tensor(out))
    }
}
