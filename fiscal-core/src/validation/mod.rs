//! Data validation: rule-driven anomaly detection and the human review
//! workflow for flagged values

pub mod detector;
pub mod model;
pub mod rules;
pub mod workflow;

pub use detector::{build_queue_item, AnomalyDetector, EnteredValue};
pub use model::{
    AnomalyFlag, QueueFilter, QueueItem, QueueStatus, Severity, ValidationAction,
    ValidationRecord, ValidationRequest,
};
pub use rules::{
    check_range, check_year_over_year, load_rules, load_rules_from_str, order_for_evaluation,
    year_over_year_change, RuleCheck, RuleViolation, RulesConfig, ValidationRule,
};
pub use workflow::{
    apply_decision, Decision, QueueItemDetail, QueueSummary, ValidationOutcome,
    ValidationWorkflow,
};
