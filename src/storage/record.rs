//! The job record stored in the corpus

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Format of timestamps written without an offset, e.g. `2025-09-29T12:00:00.123456`
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parses an RFC 3339 timestamp, or a naive ISO 8601 one read as UTC
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, NAIVE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", text)))
}

/// A scraped text field that is either present or explicitly unavailable
///
/// Serialized as the plain string, or as `"N/A"` when unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field {
    Value(String),
    #[default]
    NotAvailable,
}

impl Field {
    /// Text written for a field the detail page did not provide
    pub const SENTINEL: &'static str = "N/A";

    /// Builds a field from optional extracted text; blank text is unavailable
    pub fn from_text(text: Option<String>) -> Self {
        match text {
            Some(t) if !t.trim().is_empty() && t.trim() != Self::SENTINEL => Self::Value(t),
            _ => Self::NotAvailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns the value, or `None` when unavailable
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            Self::NotAvailable => None,
        }
    }

    /// Returns the value, or the `"N/A"` sentinel
    pub fn as_str(&self) -> &str {
        self.value().unwrap_or(Self::SENTINEL)
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Self::from_text(Some(text.to_string()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_text(text))
    }
}

/// One job posting, keyed by its canonical detail URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Canonical identifier of the posting
    pub url: String,

    /// When the detail page was fetched
    ///
    /// Older corpus files call this `current_datetime` and write it without
    /// an offset; those values are taken as UTC.
    #[serde(alias = "current_datetime", deserialize_with = "deserialize_timestamp")]
    pub scraped_at: DateTime<Utc>,

    #[serde(default)]
    pub title: Field,

    #[serde(default)]
    pub company: Field,

    #[serde(default)]
    pub location: Field,

    /// Publish timestamp as the site reports it
    #[serde(default)]
    pub posted_date: Field,

    /// "Updated ..." text from the posting header
    #[serde(default)]
    pub updated_date: Field,

    /// Employment type labels (e.g. "Remote", "Full-time")
    #[serde(default)]
    pub job_types: Vec<String>,

    #[serde(default)]
    pub salary: Field,

    #[serde(default)]
    pub skills: Vec<String>,

    #[serde(default)]
    pub description: Field,

    /// Query tokens of every search that surfaced this posting
    #[serde(default)]
    pub searches: Vec<String>,
}

impl JobRecord {
    /// Creates a record with every scraped field unavailable
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scraped_at: Utc::now(),
            title: Field::NotAvailable,
            company: Field::NotAvailable,
            location: Field::NotAvailable,
            posted_date: Field::NotAvailable,
            updated_date: Field::NotAvailable,
            job_types: Vec::new(),
            salary: Field::NotAvailable,
            skills: Vec::new(),
            description: Field::NotAvailable,
            searches: Vec::new(),
        }
    }

    /// Appends a query token unless already present
    ///
    /// Returns true if the token was added.
    pub fn add_search(&mut self, token: &str) -> bool {
        if self.has_search(token) {
            return false;
        }
        self.searches.push(token.to_string());
        true
    }

    pub fn has_search(&self, token: &str) -> bool {
        self.searches.iter().any(|s| s == token)
    }
}
