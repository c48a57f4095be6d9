//! Validation Queue Types
//!
//! Queue items awaiting human review, the anomaly flags raised against them,
//! and the append-only record of every validation decision.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FiscalError;

// ============================================================================
// Status / severity / action enums
// ============================================================================

/// Lifecycle status of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Entered,
    Flagged,
    Approved,
    Corrected,
    Rejected,
    Published,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 6] = [
        Self::Entered,
        Self::Flagged,
        Self::Approved,
        Self::Corrected,
        Self::Rejected,
        Self::Published,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entered => "ENTERED",
            Self::Flagged => "FLAGGED",
            Self::Approved => "APPROVED",
            Self::Corrected => "CORRECTED",
            Self::Rejected => "REJECTED",
            Self::Published => "PUBLISHED",
        }
    }

    /// Statuses from which a value may be published
    pub fn is_publishable(&self) -> bool {
        matches!(self, Self::Approved | Self::Corrected)
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown queue status: {}", s))
    }
}

/// Severity of an anomaly; ordered INFO < WARNING < CRITICAL
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Self::Critical, Self::Warning, Self::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown severity: {}", s))
    }
}

/// A human validation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationAction {
    Approve,
    Correct,
    Reject,
    Escalate,
}

impl ValidationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Correct => "CORRECT",
            Self::Reject => "REJECT",
            Self::Escalate => "ESCALATE",
        }
    }
}

impl std::fmt::Display for ValidationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ValidationAction {
    type Err = FiscalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(Self::Approve),
            "CORRECT" => Ok(Self::Correct),
            "REJECT" => Ok(Self::Reject),
            "ESCALATE" => Ok(Self::Escalate),
            _ => Err(FiscalError::InvalidAction(s.to_string())),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// One (table, record, field) value awaiting review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub table_name: String,
    pub record_id: Uuid,
    pub field_name: String,
    pub city_id: Uuid,
    pub fiscal_year: i32,
    pub entered_value: Decimal,
    pub status: QueueStatus,
    pub severity: Severity,
    /// Name of the first rule that fired
    pub rule_name: Option<String>,
    /// Message of the first rule that fired
    pub rule_message: Option<String>,
    pub prior_value: Option<Decimal>,
    pub deviation_percent: Option<f64>,
    pub entered_by: String,
    pub entered_at: DateTime<Utc>,
    /// Escalation marker; does not change status
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub updated_at: DateTime<Utc>,
}

/// One rule violation raised against a queue item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub id: Uuid,
    pub queue_item_id: Uuid,
    pub rule_id: Uuid,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    pub entered_value: Decimal,
    pub expected_value: Option<Decimal>,
    pub prior_value: Option<Decimal>,
    pub deviation_percent: Option<f64>,
    pub suggested_action: Option<String>,
    pub is_resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnomalyFlag {
    pub fn resolve(&mut self, by: &str, at: DateTime<Utc>, notes: Option<String>) {
        self.is_resolved = true;
        self.resolved_by = Some(by.to_string());
        self.resolved_at = Some(at);
        self.resolution_notes = notes;
    }
}

/// Immutable audit entry for one validation decision. Never updated or
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub id: Uuid,
    pub queue_item_id: Uuid,
    pub action: ValidationAction,
    pub validator: String,
    pub validated_at: DateTime<Utc>,
    pub notes: Option<String>,
    /// Value on the item before the decision
    pub previous_value: Decimal,
    pub corrected_value: Option<Decimal>,
    pub escalated_to: Option<String>,
    pub confidence_adjustment: Option<i32>,
}

/// Caller's request to act on a queue item. The action stays a raw string
/// until the workflow parses it, so unknown actions fail before any load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub action: String,
    pub validator: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub corrected_value: Option<Decimal>,
    #[serde(default)]
    pub escalated_to: Option<String>,
    /// Signed nudge to the value's lineage confidence
    #[serde(default)]
    pub confidence_adjustment: Option<i32>,
}

/// Queue listing filter; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueFilter {
    pub status: Option<QueueStatus>,
    pub severity: Option<Severity>,
    pub city_id: Option<Uuid>,
    pub fiscal_year: Option<i32>,
}

impl QueueFilter {
    pub fn matches(&self, item: &QueueItem) -> bool {
        !item.is_deleted
            && self.status.map_or(true, |s| item.status == s)
            && self.severity.map_or(true, |s| item.severity == s)
            && self.city_id.map_or(true, |c| item.city_id == c)
            && self.fiscal_year.map_or(true, |y| item.fiscal_year == y)
    }
}
