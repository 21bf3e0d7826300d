//! Severity & Policy Primitives
//!
//! Total order over severities and the gate configuration that compares
//! findings against a threshold. Data only, no gate logic here.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// SEVERITY
// ============================================================================

/// Drift impact, ordered `info < low < medium < high`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Block-worthy maximum
    pub const MAX: Severity = Severity::High;

    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
    ];

    pub fn rank(&self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn is_max(&self) -> bool {
        *self == Self::MAX
    }

    /// Reports whether this severity meets or exceeds `threshold`
    pub fn meets(&self, threshold: Severity) -> bool {
        self.rank() >= threshold.rank()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(()),
        }
    }
}

// ============================================================================
// ENFORCEMENT MODE
// ============================================================================

/// Whether drift at or above the threshold blocks CI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    Warn,
    Block,
}

impl EnforcementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementMode::Warn => "warn",
            EnforcementMode::Block => "block",
        }
    }
}

impl std::fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnforcementMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" => Ok(EnforcementMode::Warn),
            "block" => Ok(EnforcementMode::Block),
            _ => Err(()),
        }
    }
}

// ============================================================================
// POLICY
// ============================================================================

/// Current gating configuration, replaced wholesale by set-policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub mode: EnforcementMode,
    pub fail_on: Severity,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            mode: EnforcementMode::Warn,
            fail_on: Severity::High,
        }
    }
}

impl Policy {
    /// Parse raw wire values. Both must match exactly.
    pub fn parse(mode: &str, fail_on: &str) -> Option<Self> {
        let mode = mode.parse().ok()?;
        let fail_on = fail_on.parse().ok()?;
        Some(Self { mode, fail_on })
    }
}

/// Raw set-policy input as received on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRequest {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub fail_on: String,
}

impl PolicyRequest {
    pub fn new(mode: &str, fail_on: &str) -> Self {
        Self {
            mode: mode.to_string(),
            fail_on: fail_on.to_string(),
        }
    }

    pub fn parse(&self) -> Option<Policy> {
        Policy::parse(&self.mode, &self.fail_on)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_total_order() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(Severity::High.rank(), 3);
        assert!(Severity::MAX.is_max());
    }

    #[test]
    fn test_meets_threshold() {
        assert!(Severity::High.meets(Severity::Medium));
        assert!(Severity::Medium.meets(Severity::Medium));
        assert!(!Severity::Low.meets(Severity::Medium));
    }

    #[test]
    fn test_default_policy() {
        let policy = Policy::default();
        assert_eq!(policy.mode, EnforcementMode::Warn);
        assert_eq!(policy.fail_on, Severity::High);
    }

    #[test]
    fn test_parse_policy() {
        let policy = Policy::parse("block", "medium").unwrap();
        assert_eq!(policy.mode, EnforcementMode::Block);
        assert_eq!(policy.fail_on, Severity::Medium);

        assert!(Policy::parse("strict", "high").is_none());
        assert!(Policy::parse("block", "critical").is_none());
        assert!(Policy::parse("BLOCK", "high").is_none());
    }

    #[test]
    fn test_policy_wire_format() {
        let json = serde_json::to_value(Policy::default()).unwrap();
        assert_eq!(json, serde_json::json!({"mode": "warn", "failOn": "high"}));
    }
}
