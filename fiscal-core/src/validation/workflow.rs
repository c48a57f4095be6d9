//! Validation Workflow
//!
//! Drives queue items through their review lifecycle:
//!
//! | Action   | Requires          | Effect                                         |
//! |----------|-------------------|------------------------------------------------|
//! | APPROVE  | -                 | APPROVED, open flags resolved                  |
//! | CORRECT  | `corrected_value` | CORRECTED, value overwritten, flags resolved   |
//! | REJECT   | -                 | REJECTED, flags untouched                      |
//! | ESCALATE | `escalated_to`    | assignee set, note appended, status unchanged  |
//!
//! Every action appends one immutable validation record. Item, flags, record
//! and any lineage confidence change are committed together.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{
    AnomalyFlag, QueueFilter, QueueItem, QueueStatus, Severity, ValidationAction,
    ValidationRecord, ValidationRequest,
};
use crate::error::{FiscalError, FiscalResult};
use crate::store::{FiscalStore, ValidationCommit};

/// A validated action with its required parameters present
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Approve,
    Correct { corrected_value: Decimal },
    Reject,
    Escalate { escalated_to: String },
}

impl Decision {
    /// Parse and check preconditions. Nothing is loaded or mutated here.
    pub fn from_request(request: &ValidationRequest) -> FiscalResult<Self> {
        let action: ValidationAction = request.action.parse()?;
        if request.validator.trim().is_empty() {
            return Err(FiscalError::InvalidInput(
                "validator is required".to_string(),
            ));
        }
        match action {
            ValidationAction::Approve => Ok(Self::Approve),
            ValidationAction::Reject => Ok(Self::Reject),
            ValidationAction::Correct => request
                .corrected_value
                .map(|corrected_value| Self::Correct { corrected_value })
                .ok_or_else(|| {
                    FiscalError::InvalidInput("CORRECT requires corrected_value".to_string())
                }),
            ValidationAction::Escalate => request
                .escalated_to
                .as_deref()
                .map(str::trim)
                .filter(|to| !to.is_empty())
                .map(|to| Self::Escalate {
                    escalated_to: to.to_string(),
                })
                .ok_or_else(|| {
                    FiscalError::InvalidInput("ESCALATE requires escalated_to".to_string())
                }),
        }
    }

    pub fn action(&self) -> ValidationAction {
        match self {
            Self::Approve => ValidationAction::Approve,
            Self::Correct { .. } => ValidationAction::Correct,
            Self::Reject => ValidationAction::Reject,
            Self::Escalate { .. } => ValidationAction::Escalate,
        }
    }
}

/// Apply a decision to an item and its flags in memory.
///
/// Returns the flags whose resolution changed.
pub fn apply_decision(
    item: &mut QueueItem,
    flags: &mut [AnomalyFlag],
    decision: &Decision,
    validator: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<AnomalyFlag> {
    let mut resolved = Vec::new();
    let mut resolve_open = |resolution: Option<String>| {
        for flag in flags.iter_mut().filter(|f| !f.is_resolved) {
            flag.resolve(validator, now, resolution.clone());
            resolved.push(flag.clone());
        }
    };

    match decision {
        Decision::Approve => {
            item.status = QueueStatus::Approved;
            resolve_open(notes.map(str::to_string));
        }
        Decision::Correct { corrected_value } => {
            item.entered_value = *corrected_value;
            item.status = QueueStatus::Corrected;
            let reason = notes.unwrap_or("value replaced");
            resolve_open(Some(format!("Corrected: {}", reason)));
        }
        Decision::Reject => {
            item.status = QueueStatus::Rejected;
        }
        Decision::Escalate { escalated_to } => {
            item.assigned_to = Some(escalated_to.clone());
            let mut entry = format!(
                "[{}] Escalated by {} to {}",
                now.format("%Y-%m-%d %H:%M UTC"),
                validator,
                escalated_to
            );
            if let Some(reason) = notes {
                entry.push_str(": ");
                entry.push_str(reason);
            }
            item.notes = Some(match item.notes.take() {
                Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, entry),
                _ => entry,
            });
        }
    }

    item.updated_at = now;
    resolved
}

/// Result of one validation action
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub item: QueueItem,
    pub record: ValidationRecord,
    pub flags_resolved: usize,
    /// New lineage confidence when an adjustment was applied
    pub lineage_confidence: Option<i32>,
}

/// A queue item with its flags and audit trail
#[derive(Debug, Clone, Serialize)]
pub struct QueueItemDetail {
    pub item: QueueItem,
    pub flags: Vec<AnomalyFlag>,
    pub records: Vec<ValidationRecord>,
}

/// Counts of live queue items
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueSummary {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_severity: BTreeMap<&'static str, usize>,
}

impl QueueSummary {
    pub fn from_items(items: &[QueueItem]) -> Self {
        let mut summary = Self {
            total: 0,
            by_status: QueueStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect(),
            by_severity: Severity::ALL.iter().map(|s| (s.as_str(), 0)).collect(),
        };
        for item in items.iter().filter(|i| !i.is_deleted) {
            summary.total += 1;
            *summary.by_status.entry(item.status.as_str()).or_default() += 1;
            *summary.by_severity.entry(item.severity.as_str()).or_default() += 1;
        }
        summary
    }
}

pub struct ValidationWorkflow {
    store: Arc<dyn FiscalStore>,
}

impl ValidationWorkflow {
    pub fn new(store: Arc<dyn FiscalStore>) -> Self {
        Self { store }
    }

    /// Apply a validation action to a queue item
    pub async fn apply_action(
        &self,
        queue_item_id: Uuid,
        request: &ValidationRequest,
    ) -> FiscalResult<ValidationOutcome> {
        let decision = Decision::from_request(request)?;

        let mut item = self.load_item(queue_item_id).await?;
        let mut flags = self.store.load_flags(queue_item_id).await?;
        let previous_value = item.entered_value;
        let now = Utc::now();

        let resolved_flags = apply_decision(
            &mut item,
            &mut flags,
            &decision,
            &request.validator,
            request.notes.as_deref(),
            now,
        );

        let lineage = match request.confidence_adjustment {
            Some(delta) => {
                let lineage = self
                    .store
                    .load_lineage(&item.table_name, item.record_id, &item.field_name)
                    .await?;
                match lineage {
                    Some(mut lineage) => {
                        lineage.adjust_confidence(delta);
                        Some(lineage)
                    }
                    None => {
                        warn!(
                            "No lineage for {}.{} (record {}); confidence adjustment {} ignored",
                            item.table_name, item.field_name, item.record_id, delta
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let record = ValidationRecord {
            id: Uuid::new_v4(),
            queue_item_id,
            action: decision.action(),
            validator: request.validator.clone(),
            validated_at: now,
            notes: request.notes.clone(),
            previous_value,
            corrected_value: match &decision {
                Decision::Correct { corrected_value } => Some(*corrected_value),
                _ => None,
            },
            escalated_to: match &decision {
                Decision::Escalate { escalated_to } => Some(escalated_to.clone()),
                _ => None,
            },
            confidence_adjustment: request.confidence_adjustment,
        };

        let commit = ValidationCommit {
            item,
            resolved_flags,
            record,
            lineage,
        };
        self.store.commit_validation(&commit).await?;

        info!(
            "{} on queue item {} by {} -> {}",
            commit.record.action, queue_item_id, commit.record.validator, commit.item.status
        );

        Ok(ValidationOutcome {
            flags_resolved: commit.resolved_flags.len(),
            lineage_confidence: commit.lineage.as_ref().map(|l| l.confidence_score),
            item: commit.item,
            record: commit.record,
        })
    }

    /// Move an approved or corrected value to PUBLISHED
    pub async fn publish(&self, queue_item_id: Uuid, by: &str) -> FiscalResult<QueueItem> {
        let mut item = self.load_item(queue_item_id).await?;
        if !item.status.is_publishable() {
            return Err(FiscalError::InvalidTransition {
                from: item.status.to_string(),
                to: QueueStatus::Published.to_string(),
            });
        }
        item.status = QueueStatus::Published;
        item.updated_at = Utc::now();
        self.store.update_queue_item(&item).await?;

        info!("Queue item {} published by {}", queue_item_id, by);
        Ok(item)
    }

    /// Hide an item from the queue; items are never hard-deleted
    pub async fn soft_delete(&self, queue_item_id: Uuid) -> FiscalResult<QueueItem> {
        let mut item = self.load_item(queue_item_id).await?;
        item.is_deleted = true;
        item.updated_at = Utc::now();
        self.store.update_queue_item(&item).await?;

        info!("Queue item {} soft-deleted", queue_item_id);
        Ok(item)
    }

    pub async fn queue(&self, filter: &QueueFilter) -> FiscalResult<Vec<QueueItem>> {
        Ok(self.store.list_queue_items(filter).await?)
    }

    pub async fn detail(&self, queue_item_id: Uuid) -> FiscalResult<QueueItemDetail> {
        let item = self.load_item(queue_item_id).await?;
        let flags = self.store.load_flags(queue_item_id).await?;
        let records = self.store.load_validation_records(queue_item_id).await?;
        Ok(QueueItemDetail {
            item,
            flags,
            records,
        })
    }

    pub async fn summary(&self) -> FiscalResult<QueueSummary> {
        let items = self.store.list_queue_items(&QueueFilter::default()).await?;
        Ok(QueueSummary::from_items(&items))
    }

    async fn load_item(&self, queue_item_id: Uuid) -> FiscalResult<QueueItem> {
        self.store
            .load_queue_item(queue_item_id)
            .await?
            .filter(|item| !item.is_deleted)
            .ok_or_else(|| FiscalError::queue_item_not_found(queue_item_id))
    }
}
