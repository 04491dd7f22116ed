use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Accepts `YYYY-MM-DD` or an ISO-8601 timestamp whose date part leads.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    let candidate = match trimmed.get(..10) {
        Some(prefix) if trimmed.len() > 10 && trimmed[10..].starts_with('T') => prefix,
        _ => trimmed,
    };
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.filter(|value| !value.trim().is_empty())
        .map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

/// Inclusive date window; an open side matches everything on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub const fn unbounded() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    pub const fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Undated records only count when the window is fully open.
    pub fn contains_optional(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(date) => self.contains(date),
            None => self.is_unbounded(),
        }
    }
}

/// Raw `from`/`to` query parameters; blank values are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl RangeQuery {
    pub fn into_range(self) -> Result<DateRange, ValidationError> {
        fn side(
            field: &'static str,
            raw: Option<String>,
        ) -> Result<Option<NaiveDate>, ValidationError> {
            raw.filter(|value| !value.trim().is_empty())
                .map(|value| {
                    parse_date(&value)
                        .map_err(|reason| ValidationError::Malformed { field, reason })
                })
                .transpose()
        }

        Ok(DateRange {
            from: side("from", self.from)?,
            to: side("to", self.to)?,
        })
    }
}
