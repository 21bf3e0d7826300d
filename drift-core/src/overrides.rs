//! Override Store & Active-Finding Resolver
//!
//! Day-granular, field-scoped suppressions. An override with change type `*`
//! matches every change on its field. Expired overrides never match and are
//! compacted away on read.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::change::ChangeType;
use crate::compiler::Finding;
use crate::session::ValidationError;

pub const WILDCARD: &str = "*";

// ============================================================================
// CHANGE SELECTOR
// ============================================================================

/// Which change types an override covers. Unrecognized types are kept
/// verbatim and never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeSelector {
    Any,
    Exact(ChangeType),
    Other(String),
}

impl ChangeSelector {
    pub fn matches(&self, kind: ChangeType) -> bool {
        match self {
            ChangeSelector::Any => true,
            ChangeSelector::Exact(expected) => *expected == kind,
            ChangeSelector::Other(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChangeSelector::Any => WILDCARD,
            ChangeSelector::Exact(kind) => kind.as_str(),
            ChangeSelector::Other(raw) => raw,
        }
    }
}

impl From<String> for ChangeSelector {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == WILDCARD {
            return ChangeSelector::Any;
        }
        match trimmed.parse() {
            Ok(kind) => ChangeSelector::Exact(kind),
            Err(_) => ChangeSelector::Other(trimmed.to_string()),
        }
    }
}

impl From<ChangeSelector> for String {
    fn from(selector: ChangeSelector) -> Self {
        match selector {
            ChangeSelector::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ChangeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// OVERRIDE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub id: String,
    pub field_id: String,
    pub change_type: ChangeSelector,
    /// Calendar day, `YYYY-MM-DD`
    pub expires: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Override {
    /// End of the expiry day, or `None` if `expires` is not a calendar date
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        day_end(&self.expires)
    }

    /// Live at `now` (inclusive of the whole expiry day)
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(false, |end| end >= now)
    }

    pub fn suppresses(&self, finding: &Finding, now: DateTime<Utc>) -> bool {
        self.field_id == finding.field_id
            && self.change_type.matches(finding.change_type)
            && self.is_live(now)
    }
}

/// `date`T23:59:59.000Z for a zero-padded `YYYY-MM-DD` date
pub fn day_end(date: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    if !is_padded_date(date) {
        return None;
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let end = day.and_hms_milli_opt(23, 59, 59, 0)?;
    Some(Utc.from_utc_datetime(&end))
}

fn is_padded_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

// ============================================================================
// RESOLVER
// ============================================================================

pub fn is_active(finding: &Finding, overrides: &[Override], now: DateTime<Utc>) -> bool {
    !overrides.iter().any(|o| o.suppresses(finding, now))
}

/// Split findings into the active set and the suppressed count, order preserved
pub fn active_findings(
    findings: &[Finding],
    overrides: &[Override],
    now: DateTime<Utc>,
) -> (Vec<Finding>, usize) {
    let active: Vec<Finding> = findings
        .iter()
        .filter(|f| is_active(f, overrides, now))
        .cloned()
        .collect();
    let suppressed = findings.len() - active.len();
    (active, suppressed)
}

/// Drop overrides that can no longer match; returns how many were removed
pub fn compact(overrides: &mut Vec<Override>, now: DateTime<Utc>) -> usize {
    let before = overrides.len();
    overrides.retain(|o| o.is_live(now));
    before - overrides.len()
}

// ============================================================================
// REQUEST
// ============================================================================

/// Raw add-override input as received on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    #[serde(default)]
    pub field_id: String,
    #[serde(default)]
    pub change_type: Option<String>,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub ticket: Option<String>,
}

impl OverrideRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<Override, ValidationError> {
        let field_id = self.field_id.trim();
        let expires = self.expires.trim();
        let reason = self.reason.trim();
        if field_id.is_empty() || expires.is_empty() || reason.is_empty() {
            return Err(ValidationError::OverrideFields);
        }
        if day_end(expires).is_none() {
            return Err(ValidationError::OverrideFields);
        }

        let change_type = ChangeSelector::from(self.change_type.clone().unwrap_or_default());
        let ticket = self
            .ticket
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Override {
            id: format!("ovr-{}", Uuid::new_v4()),
            field_id: field_id.to_string(),
            change_type,
            expires: expires.to_string(),
            reason: reason.to_string(),
            ticket,
            created_at: now,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
