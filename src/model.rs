// 📋 Close Model - Value records for the financial close
//
// Every record here is an immutable VALUE: the reducer never mutates a
// snapshot in place, it builds the next one.
//
// Two merging organizations (TMH, Raymond) report out of two ERPs
// (SAP ECC, JD Edwards). "Both" marks records spanning the two.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CloseError;

// ============================================================================
// ENTITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    #[serde(rename = "TMH")]
    Tmh,
    Raymond,
    Both,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Tmh => "TMH",
            Entity::Raymond => "Raymond",
            Entity::Both => "Both",
        }
    }

    /// Cycle used by the dashboard entity selector
    pub fn next(&self) -> Self {
        match self {
            Entity::Both => Entity::Tmh,
            Entity::Tmh => Entity::Raymond,
            Entity::Raymond => Entity::Both,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = CloseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tmh" => Ok(Entity::Tmh),
            "raymond" => Ok(Entity::Raymond),
            "both" | "all" => Ok(Entity::Both),
            _ => Err(CloseError::UnknownEntity(s.to_string())),
        }
    }
}

// ============================================================================
// SOURCE SYSTEM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceSystem {
    /// TMH's SAP ECC instance
    SapEcc,

    /// Raymond's JD Edwards instance
    Jde,
}

impl SourceSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::SapEcc => "SAP ECC",
            SourceSystem::Jde => "JD Edwards",
        }
    }
}

// ============================================================================
// EXCEPTION CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionCategory {
    UnmatchedIntercompany,
    DuplicateVendor,
    DuplicateCustomer,
    MissingCostCenterMapping,
    UnmappedPaymentTerms,
    GlClassificationMismatch,
    ApAgingMismatch,
    AccrualMissing,
    AccrualMismatch,
    Variance,
}

impl ExceptionCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ExceptionCategory::UnmatchedIntercompany => "Unmatched Intercompany",
            ExceptionCategory::DuplicateVendor => "Duplicate Vendor",
            ExceptionCategory::DuplicateCustomer => "Duplicate Customer",
            ExceptionCategory::MissingCostCenterMapping => "Missing Cost Center Mapping",
            ExceptionCategory::UnmappedPaymentTerms => "Unmapped Payment Terms",
            ExceptionCategory::GlClassificationMismatch => "GL Classification Mismatch",
            ExceptionCategory::ApAgingMismatch => "AP Aging Mismatch",
            ExceptionCategory::AccrualMissing => "Accrual Missing",
            ExceptionCategory::AccrualMismatch => "Accrual Mismatch",
            ExceptionCategory::Variance => "Variance",
        }
    }
}

// ============================================================================
// EXCEPTION STATUS (state machine)
// ============================================================================

/// open → in_progress → resolved, or open → resolved directly.
/// Resolved is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionStatus {
    Open,
    InProgress,
    Resolved,
}

impl ExceptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionStatus::Open => "open",
            ExceptionStatus::InProgress => "in_progress",
            ExceptionStatus::Resolved => "resolved",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExceptionStatus::Resolved)
    }

    /// Only forward moves are allowed (the derived `Ord` is the lifecycle order)
    pub fn can_transition_to(&self, next: ExceptionStatus) -> bool {
        next > *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolver {
    /// Direct user action on a single exception
    Manual,

    /// One of the batch automations
    Automation,
}

impl Resolver {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolver::Manual => "manual",
            Resolver::Automation => "automation",
        }
    }
}

// ============================================================================
// EXCEPTION RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub id: String,
    pub category: ExceptionCategory,
    pub description: String,
    pub entity: Entity,
    pub source_system: SourceSystem,

    /// Monetary impact in USD (never negative)
    pub impact: f64,

    pub status: ExceptionStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Resolver>,

    // ========================================================================
    // LINEAGE (optional links back into the source systems)
    // ========================================================================
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_local_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_enterprise_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_center_local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_center_enterprise: Option<String>,
}

impl ExceptionRecord {
    /// Create an open exception. Negative impacts are clamped to zero.
    pub fn new(
        id: &str,
        category: ExceptionCategory,
        description: &str,
        entity: Entity,
        source_system: SourceSystem,
        impact: f64,
    ) -> Self {
        ExceptionRecord {
            id: id.to_string(),
            category,
            description: description.to_string(),
            entity,
            source_system,
            impact: impact.max(0.0),
            status: ExceptionStatus::Open,
            resolved_by: None,
            document_id: None,
            vendor_local_id: None,
            vendor_enterprise_id: None,
            cost_center_local: None,
            cost_center_enterprise: None,
        }
    }

    pub fn with_document(mut self, document_id: &str) -> Self {
        self.document_id = Some(document_id.to_string());
        self
    }

    pub fn with_vendor(mut self, local_id: &str, enterprise_id: &str) -> Self {
        self.vendor_local_id = Some(local_id.to_string());
        self.vendor_enterprise_id = Some(enterprise_id.to_string());
        self
    }

    pub fn with_cost_center(mut self, local: &str, enterprise: &str) -> Self {
        self.cost_center_local = Some(local.to_string());
        self.cost_center_enterprise = Some(enterprise.to_string());
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == ExceptionStatus::Open
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ExceptionStatus::Resolved
    }
}

// ============================================================================
// CHECKLIST TASKS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,

    /// Hours saved once this step is automated
    pub time_savings: f64,

    pub order: u32,
}

// ============================================================================
// REPORTING ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRow {
    pub task_list: String,
    pub person_responsible: String,
    pub number_of_errors: u32,
    pub company_code: String,
    pub entity: Entity,
    pub source_system: SourceSystem,
}

/// Negative `days_overdue` means the task is still ahead of its due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTaskRow {
    pub task: String,
    pub responsible: String,
    pub days_overdue: i32,
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedTaskListRow {
    pub task_list: String,
    pub closing_type: String,
    pub days_overdue: i32,
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRateRow {
    pub name: String,
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskToBeApprovedRow {
    pub task: String,
    pub responsible: String,
    pub days_overdue: i32,
}

// ============================================================================
// CONSOLIDATED P&L
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineCategory {
    Revenue,
    #[serde(rename = "COGS")]
    Cogs,
    Opex,
    Eliminations,
    /// Subtotals (gross profit); never summed again
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    Ok,
    Review,
    Exception,
}

/// One consolidated P&L line with its per-entity split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialLineItem {
    pub id: String,
    pub line_item: String,
    pub category: LineCategory,
    pub amount: f64,
    pub tmh_amount: f64,
    pub raymond_amount: f64,
    pub entity: Entity,
    pub status: LineStatus,
    pub description: String,
}

impl FinancialLineItem {
    /// Entity split should add up to the consolidated amount
    pub fn is_balanced(&self) -> bool {
        (self.tmh_amount + self.raymond_amount - self.amount).abs() < 0.005
    }
}

/// Suggested accrual entry; `booked` flips when accrual generation runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualSuggestion {
    pub id: String,
    pub account: String,
    pub description: String,
    pub amount: f64,

    /// Model confidence (percent)
    pub confidence: u8,

    pub booked: bool,
}

// ============================================================================
// COMPLETION OVERVIEW
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub completed_with_errors: u32,
    pub completed_with_warnings: u32,
    pub completed_without_issues: u32,
    pub others: u32,
}

impl StatusCounts {
    pub fn total(&self) -> u32 {
        self.completed_with_errors
            + self.completed_with_warnings
            + self.completed_without_issues
            + self.others
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOverview {
    /// Seeded task-completion rate for the task list (percent)
    pub completion_rate: u8,
    pub status_counts: StatusCounts,
}

// ============================================================================
// CLOSE SNAPSHOT
// ============================================================================

/// Everything one dashboard view renders for one task list.
///
/// Derived KPIs (projected close days, readiness, open counts) are NOT
/// stored here; see [`crate::kpi`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseSnapshot {
    pub task_list_id: String,
    pub completion_overview: CompletionOverview,
    pub error_rows: Vec<ErrorRow>,
    pub open_task_rows: Vec<OpenTaskRow>,
    pub delayed_task_list_rows: Vec<DelayedTaskListRow>,
    pub exceptions: Vec<ExceptionRecord>,
    pub tasks: Vec<TaskRecord>,

    /// Percentage of cross-entity transactions reconciled
    pub intercompany_match_rate: u8,

    pub completion_by_company_code: Vec<CompletionRateRow>,
    pub completion_by_task_list: Vec<CompletionRateRow>,
    pub tasks_to_be_approved: Vec<TaskToBeApprovedRow>,

    pub financial_line_items: Vec<FinancialLineItem>,
    pub accrual_suggestions: Vec<AccrualSuggestion>,
}

impl CloseSnapshot {
    pub fn exception(&self, id: &str) -> Option<&ExceptionRecord> {
        self.exceptions.iter().find(|e| e.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn has_open_task_row(&self, title: &str) -> bool {
        self.open_task_rows.iter().any(|row| row.task == title)
    }

    pub fn total_errors(&self) -> u32 {
        self.error_rows.iter().map(|row| row.number_of_errors).sum()
    }

    pub fn booked_accruals(&self) -> impl Iterator<Item = &AccrualSuggestion> {
        self.accrual_suggestions.iter().filter(|a| a.booked)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_only_move_forward() {
        use ExceptionStatus::*;

        assert!(Open.can_transition_to(InProgress));
        assert!(Open.can_transition_to(Resolved));
        assert!(InProgress.can_transition_to(Resolved));

        assert!(!InProgress.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(!Resolved.can_transition_to(Resolved));
        assert!(Resolved.is_terminal());
    }

    #[test]
    fn test_entity_parsing() {
        assert_eq!("TMH".parse::<Entity>().unwrap(), Entity::Tmh);
        assert_eq!("raymond".parse::<Entity>().unwrap(), Entity::Raymond);
        assert_eq!(" Both ".parse::<Entity>().unwrap(), Entity::Both);
        assert_eq!(
            "Acme".parse::<Entity>(),
            Err(CloseError::UnknownEntity("Acme".to_string()))
        );
    }

    #[test]
    fn test_entity_cycle_returns_to_start() {
        let start = Entity::Both;
        assert_eq!(start.next().next().next(), start);
    }

    #[test]
    fn test_negative_impact_clamped() {
        let exc = ExceptionRecord::new(
            "EXC-X",
            ExceptionCategory::Variance,
            "Negative variance",
            Entity::Tmh,
            SourceSystem::SapEcc,
            -500.0,
        );

        assert_eq!(exc.impact, 0.0);
        assert!(exc.is_open());
        assert!(exc.resolved_by.is_none());
    }

    #[test]
    fn test_serde_wire_names() {
        let exc = ExceptionRecord::new(
            "EXC-001",
            ExceptionCategory::UnmatchedIntercompany,
            "Unmatched invoice",
            Entity::Tmh,
            SourceSystem::Jde,
            10.0,
        )
        .with_document("DOC-1");

        let json = serde_json::to_value(&exc).unwrap();
        assert_eq!(json["category"], "unmatched_intercompany");
        assert_eq!(json["entity"], "TMH");
        assert_eq!(json["source_system"], "JDE");
        assert_eq!(json["status"], "open");
        assert_eq!(json["document_id"], "DOC-1");
        assert!(json.get("resolved_by").is_none());
    }

    #[test]
    fn test_status_counts_total() {
        let counts = StatusCounts {
            completed_with_errors: 12,
            completed_with_warnings: 18,
            completed_without_issues: 145,
            others: 25,
        };
        assert_eq!(counts.total(), 200);
    }
}
