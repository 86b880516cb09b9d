//! Calendar part extraction from timestamps.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use repipe_config::{ConfigValue, Result as ConfigResult, Serializable};
use repipe_pipeline::{
    Component, ComponentParams, FieldValue, PipelineError, Result, Transform, single_input,
};
use serde_json::json;
use tracing::debug;

/// A calendar or clock component of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Microsecond,
    /// Monday is 0.
    DayOfWeek,
    /// Same numbering as `DayOfWeek`, kept under its own name for round trips.
    Weekday,
    DayOfYear,
    Quarter,
}

impl DatePart {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "year" => Self::Year,
            "month" => Self::Month,
            "day" => Self::Day,
            "hour" => Self::Hour,
            "minute" => Self::Minute,
            "second" => Self::Second,
            "microsecond" => Self::Microsecond,
            "dayofweek" => Self::DayOfWeek,
            "weekday" => Self::Weekday,
            "dayofyear" => Self::DayOfYear,
            "quarter" => Self::Quarter,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Microsecond => "microsecond",
            Self::DayOfWeek => "dayofweek",
            Self::Weekday => "weekday",
            Self::DayOfYear => "dayofyear",
            Self::Quarter => "quarter",
        }
    }

    pub fn extract(self, timestamp: &NaiveDateTime) -> i64 {
        match self {
            Self::Year => i64::from(timestamp.year()),
            Self::Month => i64::from(timestamp.month()),
            Self::Day => i64::from(timestamp.day()),
            Self::Hour => i64::from(timestamp.hour()),
            Self::Minute => i64::from(timestamp.minute()),
            Self::Second => i64::from(timestamp.second()),
            Self::Microsecond => i64::from(timestamp.nanosecond() % 1_000_000_000 / 1_000),
            Self::DayOfWeek | Self::Weekday => {
                i64::from(timestamp.weekday().num_days_from_monday())
            }
            Self::DayOfYear => i64::from(timestamp.ordinal()),
            Self::Quarter => i64::from((timestamp.month() - 1) / 3 + 1),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%b %d, %Y", "%d %b %Y", "%Y%m%d",
];

/// Parse a timestamp; offsets are normalized to UTC. Blank text is `None`.
pub fn parse_timestamp(value: &str) -> Option<std::result::Result<NaiveDateTime, String>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(Ok(dt.naive_utc()));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Ok(dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(Ok(date.and_time(NaiveTime::MIN)));
        }
    }
    Some(Err(format!("unrecognized timestamp '{trimmed}'")))
}

/// Extracts one [`DatePart`] from a text or epoch-nanosecond field.
#[derive(Debug, Clone)]
pub struct DateTimePartExtractor {
    part: DatePart,
}

impl DateTimePartExtractor {
    pub const CLASS: &'static str = "repipe.transforms.DateTimePartExtractor";

    pub fn new(part: DatePart) -> Self {
        Self { part }
    }

    pub(crate) fn build(mut params: ComponentParams) -> ConfigResult<Component> {
        let name = params.required_str("part")?;
        let part = DatePart::parse(&name)
            .ok_or_else(|| params.error(format!("unknown datetime part '{name}'")))?;
        params.finish()?;
        Ok(Component::transform(Self::new(part)))
    }

    fn timestamps(input: &FieldValue) -> Result<Vec<Option<NaiveDateTime>>> {
        match input {
            FieldValue::Text(values) => values
                .iter()
                .map(|value| {
                    value
                        .as_deref()
                        .and_then(parse_timestamp)
                        .transpose()
                        .map_err(|message| PipelineError::invalid_input(Self::CLASS, message))
                })
                .collect(),
            FieldValue::Numeric(values) => Ok(values
                .iter()
                .map(|value| {
                    value
                        .filter(|nanos| nanos.is_finite())
                        .map(|nanos| DateTime::from_timestamp_nanos(nanos as i64).naive_utc())
                })
                .collect()),
            other => Err(PipelineError::invalid_input(
                Self::CLASS,
                format!("expected text or epoch nanoseconds, received {}", other.kind()),
            )),
        }
    }
}

impl Serializable for DateTimePartExtractor {
    fn class_name(&self) -> &'static str {
        Self::CLASS
    }

    fn params(&self) -> ConfigValue {
        json!({ "part": self.part.as_str() })
    }
}

impl Transform for DateTimePartExtractor {
    fn transform(&self, inputs: &[&FieldValue]) -> Result<FieldValue> {
        let input = single_input(Self::CLASS, inputs)?;
        debug!("DateTimePartExtractor::transform - Start");
        let parts = Self::timestamps(input)?
            .iter()
            .map(|timestamp| timestamp.as_ref().map(|ts| self.part.extract(ts) as f64))
            .collect();
        debug!("DateTimePartExtractor::transform - Done");
        Ok(FieldValue::Numeric(parts))
    }
}
