//! Gate Evaluator
//!
//! Folds the active finding set and the current policy into counts and a
//! PASS/BLOCK decision. Warn mode never blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compiler::Finding;
use crate::policy::{EnforcementMode, Policy, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gate {
    #[default]
    Pass,
    Block,
}

impl Gate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::Pass => "PASS",
            Gate::Block => "BLOCK",
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            counts.total += 1;
            match finding.severity {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }
}

/// Result of the last recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_count: u64,
    pub gate: Gate,
    pub mode: EnforcementMode,
    pub fail_on: Severity,
    pub finding_count: usize,
    pub blocked_count: usize,
    pub warning_count: usize,
    #[serde(default)]
    pub suppressed_count: usize,
    #[serde(default)]
    pub severity_counts: SeverityCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// Summary of a session that has never run
    pub fn initial(policy: &Policy) -> Self {
        Self {
            run_count: 0,
            gate: Gate::Pass,
            mode: policy.mode,
            fail_on: policy.fail_on,
            finding_count: 0,
            blocked_count: 0,
            warning_count: 0,
            suppressed_count: 0,
            severity_counts: SeverityCounts::default(),
            generated_at: None,
        }
    }
}

/// `mode == block` and some active finding meets `failOn`
pub fn should_block(active: &[Finding], policy: &Policy) -> bool {
    policy.mode == EnforcementMode::Block && active.iter().any(|f| f.severity.meets(policy.fail_on))
}

pub fn evaluate(
    active: &[Finding],
    suppressed: usize,
    policy: &Policy,
    run_count: u64,
    now: DateTime<Utc>,
) -> RunSummary {
    let blocked_count = active.iter().filter(|f| f.severity.is_max()).count();
    let gate = if should_block(active, policy) {
        Gate::Block
    } else {
        Gate::Pass
    };

    RunSummary {
        run_count,
        gate,
        mode: policy.mode,
        fail_on: policy.fail_on,
        finding_count: active.len(),
        blocked_count,
        warning_count: active.len() - blocked_count,
        suppressed_count: suppressed,
        severity_counts: SeverityCounts::tally(active),
        generated_at: Some(now),
    }
}

// ============================================================================
// TESTS
// ============================================================================
