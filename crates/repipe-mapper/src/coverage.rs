//! Quality-ranked prefix selection over one head's class records.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{MapperError, Result};
use crate::record::ClassRecord;

/// Running statistics of the best `classes` records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub classes: usize,
    pub mean_f1: f64,
    pub coverage: u64,
}

/// A class record together with the class it is reported as.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedClass {
    pub record: ClassRecord,
    pub mapped_to_class: String,
}

impl MappedClass {
    pub fn is_kept(&self) -> bool {
        self.mapped_to_class == self.record.class_name
    }
}

/// The per-head lookup table, ordered by class id.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageTable {
    entries: Vec<MappedClass>,
    selection: Selection,
}

impl CoverageTable {
    /// Keep the longest F1-ranked prefix whose mean F1 reaches `target` and
    /// map every other class to `fallback`.
    pub fn build(
        head: &str,
        records: Vec<ClassRecord>,
        target: f64,
        fallback: &str,
    ) -> Result<Self> {
        validate(head, &records)?;
        let ranked = rank_by_f1(records);
        let stats = prefix_stats(&ranked);
        let Some(selected) = select_prefix(&stats, target) else {
            let best = stats
                .iter()
                .map(|stat| stat.mean_f1)
                .fold(f64::NEG_INFINITY, f64::max);
            return Err(MapperError::UnsatisfiableThreshold {
                head: head.to_string(),
                target,
                best,
            });
        };
        debug!(
            head,
            classes = selected.classes,
            total = ranked.len(),
            "selected class prefix"
        );

        let mut entries: Vec<MappedClass> = ranked
            .into_iter()
            .enumerate()
            .map(|(rank, record)| {
                let mapped_to_class = if rank < selected.classes {
                    record.class_name.clone()
                } else {
                    fallback.to_string()
                };
                MappedClass {
                    record,
                    mapped_to_class,
                }
            })
            .collect();
        entries.sort_by_key(|entry| entry.record.class_id);

        Ok(Self {
            entries,
            selection: Selection {
                classes: selected.classes,
                mean_f1: round_to(selected.mean_f1, 5),
                coverage: selected.coverage,
            },
        })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Entries in class-id order.
    pub fn entries(&self) -> &[MappedClass] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, class_id: usize) -> Option<&MappedClass> {
        self.entries
            .binary_search_by_key(&class_id, |entry| entry.record.class_id)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    pub fn records(&self) -> impl Iterator<Item = &ClassRecord> {
        self.entries.iter().map(|entry| &entry.record)
    }
}

fn validate(head: &str, records: &[ClassRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(MapperError::EmptyHead {
            head: head.to_string(),
        });
    }
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !record.f1_score.is_finite() {
            return Err(MapperError::InvalidRecord {
                head: head.to_string(),
                message: format!("class {} has a non-finite f1_score", record.class_id),
            });
        }
        if !seen.insert(record.class_id) {
            return Err(MapperError::InvalidRecord {
                head: head.to_string(),
                message: format!("class id {} appears more than once", record.class_id),
            });
        }
    }
    Ok(())
}

/// Order records by descending F1; equal scores keep their input order.
pub fn rank_by_f1(mut records: Vec<ClassRecord>) -> Vec<ClassRecord> {
    records.sort_by(|a, b| b.f1_score.total_cmp(&a.f1_score));
    records
}

/// Mean F1 and total support of every prefix, shortest first.
pub fn prefix_stats(ranked: &[ClassRecord]) -> Vec<Selection> {
    let mut f1_sum = 0.0;
    let mut coverage = 0;
    ranked
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            f1_sum += record.f1_score;
            coverage += record.support;
            Selection {
                classes: idx + 1,
                mean_f1: f1_sum / (idx + 1) as f64,
                coverage,
            }
        })
        .collect()
}

/// The last prefix meeting the target, scanning every prefix rather than
/// stopping at the first miss.
pub fn select_prefix(stats: &[Selection], target: f64) -> Option<Selection> {
    stats.iter().rev().find(|stat| stat.mean_f1 >= target).copied()
}

/// Round to `digits` decimal places, ties to even.
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(class_id: usize, f1_score: f64, support: u64) -> ClassRecord {
        ClassRecord {
            class_id,
            class_name: format!("class_{class_id}"),
            f1_score,
            precision: f1_score,
            recall: f1_score,
            support,
        }
    }

    #[test]
    fn rounding_ties_go_to_even() {
        assert_eq!(round_to(0.0625, 3), 0.062);
        assert_eq!(round_to(0.0626, 3), 0.063);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank_by_f1(vec![record(0, 0.5, 1), record(1, 0.7, 1), record(2, 0.5, 1)]);
        let ids: Vec<usize> = ranked.iter().map(|r| r.class_id).collect();
        assert_eq!(ids, vec![1, 0, 2]);
    }

    #[test]
    fn selection_takes_last_qualifying_prefix() {
        let stats = vec![
            Selection { classes: 1, mean_f1: 0.9, coverage: 1 },
            Selection { classes: 2, mean_f1: 0.7, coverage: 2 },
            Selection { classes: 3, mean_f1: 0.8, coverage: 3 },
        ];
        assert_eq!(select_prefix(&stats, 0.75).map(|s| s.classes), Some(3));
        assert_eq!(select_prefix(&stats, 0.95), None);
    }

    #[test]
    fn duplicate_class_ids_are_rejected() {
        let err = CoverageTable::build("h", vec![record(0, 0.5, 1), record(0, 0.6, 1)], 0.1, "other")
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidRecord { .. }));
    }

    #[test]
    fn empty_heads_are_rejected() {
        let err = CoverageTable::build("h", Vec::new(), 0.1, "other").unwrap_err();
        assert!(matches!(err, MapperError::EmptyHead { .. }));
    }

    #[test]
    fn table_is_ordered_by_class_id() {
        let table = CoverageTable::build(
            "h",
            vec![record(2, 0.2, 1), record(0, 0.9, 1), record(1, 0.6, 1)],
            0.7,
            "other",
        )
        .unwrap();
        let ids: Vec<usize> = table.records().map(|r| r.class_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(table.get(2).map(|e| e.mapped_to_class.as_str()), Some("other"));
        assert_eq!(table.selection().classes, 2);
    }
}
