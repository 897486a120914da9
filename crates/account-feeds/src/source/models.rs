use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Outcome flag a batch must carry to be usable.
pub const OK_STATUS: &str = "ok";

/// Validity flag of a record that can be displayed.
pub const VALID_FLAG: i64 = 1;

/// A batch of records as reported by one source.
///
/// Every field is read leniently: a wrongly typed flag or record list makes
/// the batch unusable instead of failing the parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    #[serde(rename = "status", alias = "outcomeFlag", default)]
    pub outcome_flag: Value,
    #[serde(
        rename = "data",
        alias = "records",
        default,
        deserialize_with = "lenient_records"
    )]
    pub records: Option<Vec<AccountRecord>>,
}

impl SourceBatch {
    /// Reads a batch out of any JSON value; shapes that are not a batch
    /// yield an unusable one.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!(error = %e, "Response is not a batch");
            Self::default()
        })
    }

    pub fn is_usable(&self) -> bool {
        self.outcome_flag.as_str() == Some(OK_STATUS) && self.records.is_some()
    }

    pub fn into_records(self) -> Option<Vec<AccountRecord>> {
        if self.is_usable() { self.records } else { None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(
        rename = "username",
        alias = "identifier",
        default,
        deserialize_with = "lenient_string"
    )]
    pub identifier: String,
    #[serde(
        rename = "password",
        alias = "secret",
        default,
        deserialize_with = "lenient_string"
    )]
    pub secret: String,
    #[serde(
        rename = "country",
        alias = "regionCode",
        default,
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub region_code: Option<String>,
    #[serde(rename = "time", alias = "observedAt", default)]
    pub observed_at: ObservedAt,
    #[serde(
        rename = "status",
        alias = "validityFlag",
        default,
        deserialize_with = "strict_integer"
    )]
    pub validity_flag: Option<i64>,
}

impl AccountRecord {
    pub fn is_valid(&self) -> bool {
        self.validity_flag == Some(VALID_FLAG)
    }

    /// Whole minutes elapsed since the record was observed, if the timestamp parsed.
    pub fn minutes_since(&self, now: DateTime<Utc>) -> Option<i64> {
        self.observed_at
            .parsed()
            .map(|at| (now - at).num_milliseconds().div_euclid(60_000))
    }
}

// A non-array list is no list; entries that are not records are skipped.
fn lenient_records<'de, D>(deserializer: D) -> Result<Option<Vec<AccountRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| match AccountRecord::deserialize(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed record");
                    None
                }
            })
            .collect(),
    ))
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_string(Value::deserialize(deserializer)?))
}

// Only a JSON integer counts; `"1"` or `1.0` are kept out of the valid set.
fn strict_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    })
}

/// Observation timestamp as reported by the source.
///
/// The raw value is kept verbatim, sources disagree on the format.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ObservedAt {
    raw: Value,
    #[serde(skip)]
    parsed: Option<DateTime<Utc>>,
}

impl ObservedAt {
    pub fn new(raw: Value) -> Self {
        let parsed = parse_timestamp(&raw);
        Self { raw, parsed }
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            raw: Value::String(time.to_rfc3339()),
            parsed: Some(time),
        }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn parsed(&self) -> Option<DateTime<Utc>> {
        self.parsed
    }
}

impl<'de> Deserialize<'de> for ObservedAt {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::new)
    }
}

fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(at) = DateTime::parse_from_rfc3339(s) {
                return Some(at.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .and_then(|naive| Local.from_local_datetime(&naive).earliest())
                .map(|at| at.with_timezone(&Utc))
        }
        // Epoch milliseconds
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
