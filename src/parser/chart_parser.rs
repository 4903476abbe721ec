// Chart API payload parsing
use crate::model::{ParserError, RawSample};
use crate::utils::parse_datetime;
use serde::Deserialize;
use serde_json::Value;

pub trait Parser: Send + Sync {
    fn parse(&self, body: &str, metric: &str) -> Result<Vec<RawSample>, ParserError>;
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    #[serde(default)]
    datasets: Vec<Dataset>,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(default)]
    metric: String,
    #[serde(default)]
    values: Vec<(String, Value)>,
}

/// Parser for `{"datasets": [{"metric": .., "values": [[date, value], ..]}]}` payloads.
pub struct ChartParser;

impl ChartParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_value(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
            _ => None,
        }
    }
}

impl Default for ChartParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for ChartParser {
    fn parse(&self, body: &str, metric: &str) -> Result<Vec<RawSample>, ParserError> {
        let payload: ChartPayload = serde_json::from_str(body)?;

        let dataset = payload
            .datasets
            .into_iter()
            .find(|d| d.metric.eq_ignore_ascii_case(metric))
            .ok_or_else(|| ParserError::MissingMetric(metric.to_string()))?;

        dataset
            .values
            .iter()
            .map(|(date, value)| {
                let timestamp = parse_datetime(date)
                    .ok_or_else(|| ParserError::InvalidSample(format!("bad date '{}'", date)))?;
                Ok(RawSample {
                    timestamp,
                    value: Self::parse_value(value),
                })
            })
            .collect()
    }
}
