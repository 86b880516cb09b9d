use indexmap::IndexMap;
use ndarray::{Array2, ArrayView2};
use repipe_config::{ConfigError, ConfigValue, InstanceDescriptor, Serializable};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::coverage::{CoverageTable, Selection, round_to};
use crate::decode::{HeadPredictions, decode_multi, decode_single};
use crate::error::{MapperError, Result};
use crate::record::{ClassRecord, HeadName, LabelMode};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapperParams {
    classes: IndexMap<String, Vec<ClassRecord>>,
    mean_f1: f64,
    fallback_class: String,
}

#[derive(Debug, Clone)]
struct Head {
    name: HeadName,
    table: CoverageTable,
}

/// Maps every output head's classes onto the best-performing subset and
/// decodes raw prediction scores through that mapping.
///
/// Per head, classes are ranked by F1 and the longest prefix whose mean F1
/// still reaches `mean_f1` is kept; the remaining classes are reported as
/// `fallback_class`.
#[derive(Debug, Clone)]
pub struct ClassCoverageMapper {
    heads: IndexMap<String, Head>,
    mean_f1: f64,
    fallback_class: String,
}

impl ClassCoverageMapper {
    pub const CLASS: &'static str = "repipe.mapper.ClassCoverageMapper";

    /// Build the mapper from class records keyed by `"<tag>:<head>"`.
    pub fn new(
        classes: IndexMap<String, Vec<ClassRecord>>,
        mean_f1: f64,
        fallback_class: impl Into<String>,
    ) -> Result<Self> {
        let fallback_class = fallback_class.into();
        let mut heads = IndexMap::with_capacity(classes.len());
        for (key, records) in classes {
            let name = HeadName::parse(&key);
            let table = CoverageTable::build(&name.name, records, mean_f1, &fallback_class)?;
            let selection = table.selection();
            info!(
                head = %name.name,
                kept = selection.classes,
                total = table.len(),
                mean_f1 = selection.mean_f1,
                coverage = selection.coverage,
                "class coverage"
            );
            for entry in table.entries().iter().filter(|entry| entry.is_kept()) {
                debug!(
                    head = %name.name,
                    class_id = entry.record.class_id,
                    class_name = %entry.record.class_name,
                    f1_score = entry.record.f1_score,
                    "kept class"
                );
            }
            heads.insert(name.name.clone(), Head { name, table });
        }
        Ok(Self {
            heads,
            mean_f1,
            fallback_class,
        })
    }

    /// Rebuild a mapper from its instance descriptor.
    pub fn from_config(config: &ConfigValue) -> Result<Self> {
        let descriptor = InstanceDescriptor::from_value(config)?.ok_or_else(|| {
            ConfigError::InvalidDescriptor {
                message: "a class coverage mapper must be an instance descriptor".to_string(),
            }
        })?;
        if descriptor.cls != Self::CLASS {
            return Err(ConfigError::InvalidDescriptor {
                message: format!("expected '{}', found '{}'", Self::CLASS, descriptor.cls),
            }
            .into());
        }
        let params: MapperParams = serde_json::from_value(descriptor.params)
            .map_err(|err| ConfigError::construction(Self::CLASS, err.to_string()))?;
        Self::new(params.classes, params.mean_f1, params.fallback_class)
    }

    pub fn mean_f1(&self) -> f64 {
        self.mean_f1
    }

    pub fn fallback_class(&self) -> &str {
        &self.fallback_class
    }

    /// Head names with their decoding mode, in declaration order.
    pub fn heads(&self) -> impl Iterator<Item = (&str, LabelMode)> {
        self.heads
            .iter()
            .map(|(name, head)| (name.as_str(), head.name.mode()))
    }

    pub fn table(&self, head: &str) -> Option<&CoverageTable> {
        self.heads.get(head).map(|head| &head.table)
    }

    /// The retained prefix of one head.
    pub fn selection(&self, head: &str) -> Option<&Selection> {
        self.table(head).map(CoverageTable::selection)
    }

    /// Decode one head's scores, one row per example and one column per class id.
    pub fn decode(&self, head: &str, scores: ArrayView2<'_, f32>) -> Result<HeadPredictions> {
        let entry = self.heads.get(head).ok_or_else(|| MapperError::UnknownHead {
            head: head.to_string(),
        })?;
        Ok(match entry.name.mode() {
            LabelMode::SingleLabel => {
                HeadPredictions::Single(decode_single(head, &entry.table, scores)?)
            }
            LabelMode::MultiLabel => HeadPredictions::Multi(decode_multi(
                head,
                &entry.table,
                &self.fallback_class,
                scores,
            )?),
        })
    }

    /// Decode the scores of several heads, keyed by head name.
    pub fn predictions_to_classes(
        &self,
        outputs: &IndexMap<String, Array2<f32>>,
    ) -> Result<IndexMap<String, HeadPredictions>> {
        outputs
            .iter()
            .map(|(head, scores)| Ok((head.clone(), self.decode(head, scores.view())?)))
            .collect()
    }
}

impl Serializable for ClassCoverageMapper {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        let classes: serde_json::Map<String, ConfigValue> = self
            .heads
            .values()
            .map(|head| {
                let records: Vec<&ClassRecord> = head.table.records().collect();
                (head.name.key(), json!(records))
            })
            .collect();
        json!({
            "classes": classes,
            "mean_f1": round_to(self.mean_f1, 3),
            "fallback_class": self.fallback_class,
        })
    }
}
