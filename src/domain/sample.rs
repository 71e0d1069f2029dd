// Sample domain model and raw-reading coercion
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The five water-quality metrics reported by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricId {
    Ph,
    Turbidity,
    Temperature,
    Tds,
    Conductivity,
}

impl MetricId {
    pub const ALL: [MetricId; 5] = [
        MetricId::Ph,
        MetricId::Turbidity,
        MetricId::Temperature,
        MetricId::Tds,
        MetricId::Conductivity,
    ];

    /// Key used in the JSON documents
    pub fn key(self) -> &'static str {
        match self {
            MetricId::Ph => "ph",
            MetricId::Turbidity => "turbidity",
            MetricId::Temperature => "temperature",
            MetricId::Tds => "tds",
            MetricId::Conductivity => "conductivity",
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One reading. Absent metrics mean "no data" for that metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub ph: Option<f64>,
    pub turbidity: Option<f64>,
    pub temperature: Option<f64>,
    pub tds: Option<f64>,
    pub conductivity: Option<f64>,
}

impl Sample {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ph: None,
            turbidity: None,
            temperature: None,
            tds: None,
            conductivity: None,
        }
    }

    pub fn value(&self, metric: MetricId) -> Option<f64> {
        match metric {
            MetricId::Ph => self.ph,
            MetricId::Turbidity => self.turbidity,
            MetricId::Temperature => self.temperature,
            MetricId::Tds => self.tds,
            MetricId::Conductivity => self.conductivity,
        }
    }

    fn slot(&mut self, metric: MetricId) -> &mut Option<f64> {
        match metric {
            MetricId::Ph => &mut self.ph,
            MetricId::Turbidity => &mut self.turbidity,
            MetricId::Temperature => &mut self.temperature,
            MetricId::Tds => &mut self.tds,
            MetricId::Conductivity => &mut self.conductivity,
        }
    }
}

/// Why a metric field was recorded as absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    NotNumeric,
    OutOfDomain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub metric: MetricId,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSample {
    pub sample: Sample,
    pub issues: Vec<FieldIssue>,
}

/// Coerce one raw reading into a Sample.
///
/// Never fails: fields that cannot be coerced are absent and listed in
/// `issues`, and `fallback` is used when the timestamp is missing or
/// unparseable.
pub fn parse_sample(raw: &Value, fallback: DateTime<Utc>) -> ParsedSample {
    let timestamp = raw
        .get("timestamp")
        .and_then(parse_timestamp)
        .unwrap_or(fallback);

    let mut sample = Sample::empty(timestamp);
    let mut issues = Vec::new();

    for metric in MetricId::ALL {
        match coerce_number(raw.get(metric.key())) {
            Ok(value) => *sample.slot(metric) = Some(value),
            Err(kind) => issues.push(FieldIssue { metric, kind }),
        }
    }

    ParsedSample { sample, issues }
}

/// Coerce a history document (array of readings, oldest first).
/// Anything other than an array yields no samples.
pub fn parse_samples(raw: &Value, fallback: DateTime<Utc>) -> Vec<Sample> {
    match raw.as_array() {
        Some(entries) => entries
            .iter()
            .filter(|entry| entry.is_object())
            .map(|entry| parse_sample(entry, fallback).sample)
            .collect(),
        None => Vec::new(),
    }
}

fn coerce_number(value: Option<&Value>) -> Result<f64, IssueKind> {
    let number = match value {
        None | Some(Value::Null) => return Err(IssueKind::Missing),
        Some(Value::Number(n)) => n.as_f64().ok_or(IssueKind::NotNumeric)?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| IssueKind::NotNumeric)?,
        Some(_) => return Err(IssueKind::NotNumeric),
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(IssueKind::OutOfDomain)
    }
}

/// Accepts RFC 3339, naive ISO-8601 (taken as UTC) and epoch milliseconds
/// given either as a number or a numeric string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch_millis),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(naive.and_utc());
                }
            }
            s.parse::<i64>().ok().and_then(from_epoch_millis)
        }
        _ => None,
    }
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
