//! Class coverage mapping for model outputs.
//!
//! A [`ClassCoverageMapper`] keeps, per output head, the longest list of
//! classes (ranked by F1) whose mean F1 reaches a target, reports every other
//! class as a fallback class, and decodes raw single-label or multi-label
//! scores into [`Prediction`]s.

pub mod coverage;
pub mod decode;
pub mod error;
pub mod mapper;
pub mod record;

pub use coverage::{CoverageTable, MappedClass, Selection, prefix_stats, rank_by_f1, select_prefix};
pub use decode::{HeadPredictions, Prediction, decode_multi, decode_single};
pub use error::{MapperError, Result};
pub use mapper::ClassCoverageMapper;
pub use record::{ClassRecord, DEFAULT_TAG, HeadName, LabelMode, MULTI_LABEL_TAG};
