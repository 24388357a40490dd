// ⚙️ Close-State Reducer - snapshot + action → new snapshot
//
// Every operation borrows the current snapshot and returns an owned
// successor. The input is never touched, so a caller holding the old
// snapshot keeps a consistent view.
//
// Unknown ids never fail: the snapshot comes back unchanged and the
// Outcome says NotFound, so callers can tell "already resolved" apart
// from "wrong id".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::CloseError;
use crate::model::{CloseSnapshot, ExceptionCategory, ExceptionRecord, ExceptionStatus, Entity, Resolver, SourceSystem};

/// Match-rate increase per intercompany run, and its cap
pub const MATCH_RATE_INCREMENT: u8 = 25;
pub const MATCH_RATE_CEILING: u8 = 95;

pub const INTERCOMPANY_ERROR_REDUCTION: u32 = 3;
pub const VENDOR_ERROR_REDUCTION: u32 = 2;
pub const COST_CENTER_ERROR_REDUCTION: u32 = 2;

pub const INTERCOMPANY_RECON_TASK_LIST: &str = "Intercompany Recon";
pub const INTERCOMPANY_ELIMINATION_TASK: &str = "Intercompany elimination check";
pub const VENDOR_REVIEW_TASK: &str = "Vendor duplicate review (TMH vs Raymond)";
pub const GOLDEN_VENDOR_TASK: &str = "Golden vendor consolidation";
pub const COST_CENTER_TASK: &str = "Cost center mapping exceptions";

// ============================================================================
// OUTCOME / REDUCTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The snapshot changed
    Applied,

    /// Target exists but nothing to do (already resolved, rejected transition,
    /// or no matching open records)
    Unchanged,

    /// No record with the requested id
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub snapshot: CloseSnapshot,
    pub outcome: Outcome,

    /// Ids of the exceptions/tasks whose state changed
    pub affected: Vec<String>,
}

impl Reduction {
    fn applied(snapshot: CloseSnapshot, affected: Vec<String>) -> Self {
        Reduction {
            snapshot,
            outcome: Outcome::Applied,
            affected,
        }
    }

    fn unchanged(snapshot: &CloseSnapshot) -> Self {
        Reduction {
            snapshot: snapshot.clone(),
            outcome: Outcome::Unchanged,
            affected: Vec::new(),
        }
    }

    fn not_found(snapshot: &CloseSnapshot) -> Self {
        Reduction {
            snapshot: snapshot.clone(),
            outcome: Outcome::NotFound,
            affected: Vec::new(),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

// ============================================================================
// ACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationKind {
    IntercompanyMatch,
    GoldenVendorMapping,
    NormalizeCostCenters,
    AccrualGeneration,
}

impl AutomationKind {
    pub const ALL: [AutomationKind; 4] = [
        AutomationKind::IntercompanyMatch,
        AutomationKind::GoldenVendorMapping,
        AutomationKind::NormalizeCostCenters,
        AutomationKind::AccrualGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationKind::IntercompanyMatch => "intercompany",
            AutomationKind::GoldenVendorMapping => "vendor",
            AutomationKind::NormalizeCostCenters => "costcenter",
            AutomationKind::AccrualGeneration => "accruals",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AutomationKind::IntercompanyMatch => "Run Intercompany Auto-Match",
            AutomationKind::GoldenVendorMapping => "Apply Golden Vendor Mapping",
            AutomationKind::NormalizeCostCenters => "Normalize Cost Centers",
            AutomationKind::AccrualGeneration => "Generate Accruals",
        }
    }

    /// Exception categories this automation resolves
    pub fn categories(&self) -> &'static [ExceptionCategory] {
        match self {
            AutomationKind::IntercompanyMatch => &[ExceptionCategory::UnmatchedIntercompany],
            AutomationKind::GoldenVendorMapping => &[
                ExceptionCategory::DuplicateVendor,
                ExceptionCategory::DuplicateCustomer,
            ],
            AutomationKind::NormalizeCostCenters => &[
                ExceptionCategory::MissingCostCenterMapping,
                ExceptionCategory::UnmappedPaymentTerms,
            ],
            AutomationKind::AccrualGeneration => &[
                ExceptionCategory::AccrualMissing,
                ExceptionCategory::AccrualMismatch,
            ],
        }
    }
}

impl fmt::Display for AutomationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutomationKind {
    type Err = CloseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intercompany" | "intercompany_match" => Ok(AutomationKind::IntercompanyMatch),
            "vendor" | "golden_vendor_mapping" => Ok(AutomationKind::GoldenVendorMapping),
            "costcenter" | "normalize_cost_centers" => Ok(AutomationKind::NormalizeCostCenters),
            "accruals" | "accrual_generation" => Ok(AutomationKind::AccrualGeneration),
            _ => Err(CloseError::UnknownAutomation(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ResolveException { id: String, resolver: Resolver },
    StartException { id: String },
    ToggleTask { id: String },
    Automation { kind: AutomationKind },
}

/// Single entry point used by every front-end
pub fn reduce(snapshot: &CloseSnapshot, action: &Action) -> Reduction {
    match action {
        Action::ResolveException { id, resolver } => resolve_exception(snapshot, id, *resolver),
        Action::StartException { id } => start_exception(snapshot, id),
        Action::ToggleTask { id } => toggle_task(snapshot, id),
        Action::Automation { kind } => apply_automation(snapshot, *kind),
    }
}

// ============================================================================
// SINGLE-RECORD OPERATIONS
// ============================================================================

/// Move one exception to `next`, honoring the forward-only state machine
fn transition_exception(
    snapshot: &CloseSnapshot,
    exception_id: &str,
    next: ExceptionStatus,
    resolver: Option<Resolver>,
) -> Reduction {
    let current = match snapshot.exception(exception_id) {
        Some(exc) => exc.status,
        None => {
            debug!(exception_id, "exception not found, snapshot unchanged");
            return Reduction::not_found(snapshot);
        }
    };

    if !current.can_transition_to(next) {
        debug!(
            exception_id,
            from = current.as_str(),
            to = next.as_str(),
            "transition rejected"
        );
        return Reduction::unchanged(snapshot);
    }

    let mut next_snapshot = snapshot.clone();
    if let Some(exc) = next_snapshot.exceptions.iter_mut().find(|e| e.id == exception_id) {
        exc.status = next;
        if resolver.is_some() {
            exc.resolved_by = resolver;
        }
    }

    debug!(exception_id, to = next.as_str(), "exception transitioned");
    Reduction::applied(next_snapshot, vec![exception_id.to_string()])
}

/// Resolve one exception. Idempotent: resolving twice equals resolving once.
pub fn resolve_exception(
    snapshot: &CloseSnapshot,
    exception_id: &str,
    resolver: Resolver,
) -> Reduction {
    transition_exception(snapshot, exception_id, ExceptionStatus::Resolved, Some(resolver))
}

/// open → in_progress
pub fn start_exception(snapshot: &CloseSnapshot, exception_id: &str) -> Reduction {
    transition_exception(snapshot, exception_id, ExceptionStatus::InProgress, None)
}

/// Flip a checklist task's completion flag
pub fn toggle_task(snapshot: &CloseSnapshot, task_id: &str) -> Reduction {
    if snapshot.task(task_id).is_none() {
        debug!(task_id, "task not found, snapshot unchanged");
        return Reduction::not_found(snapshot);
    }

    let mut next = snapshot.clone();
    if let Some(task) = next.tasks.iter_mut().find(|t| t.id == task_id) {
        task.completed = !task.completed;
    }

    Reduction::applied(next, vec![task_id.to_string()])
}

// ============================================================================
// BATCH AUTOMATIONS
// ============================================================================

/// Resolve every OPEN exception in `categories`; in-progress records are
/// left for manual review.
fn resolve_open_in(
    exceptions: &[ExceptionRecord],
    categories: &[ExceptionCategory],
) -> (Vec<ExceptionRecord>, Vec<String>) {
    let mut affected = Vec::new();

    let next = exceptions
        .iter()
        .map(|exc| {
            if exc.is_open() && categories.contains(&exc.category) {
                affected.push(exc.id.clone());
                ExceptionRecord {
                    status: ExceptionStatus::Resolved,
                    resolved_by: Some(Resolver::Automation),
                    ..exc.clone()
                }
            } else {
                exc.clone()
            }
        })
        .collect();

    (next, affected)
}

fn without_open_tasks(snapshot: &mut CloseSnapshot, titles: &[&str]) {
    snapshot
        .open_task_rows
        .retain(|row| !titles.contains(&row.task.as_str()));
}

fn reduce_errors<F>(snapshot: &mut CloseSnapshot, by: u32, matches: F)
where
    F: Fn(&crate::model::ErrorRow) -> bool,
{
    for row in snapshot.error_rows.iter_mut().filter(|row| matches(row)) {
        row.number_of_errors = row.number_of_errors.saturating_sub(by);
    }
}

fn finish(snapshot: &CloseSnapshot, next: CloseSnapshot, kind: AutomationKind, affected: Vec<String>) -> Reduction {
    info!(
        automation = kind.as_str(),
        resolved = affected.len(),
        task_list = %snapshot.task_list_id,
        "automation applied"
    );

    if next == *snapshot {
        Reduction::unchanged(snapshot)
    } else {
        Reduction::applied(next, affected)
    }
}

/// Intercompany auto-match.
///
/// Resolves unmatched intercompany exceptions, drops the elimination-check
/// task, lifts the match rate by 25 (cap 95) and takes 3 errors off the
/// intercompany reconciliation row (floor 0).
pub fn apply_intercompany_match(snapshot: &CloseSnapshot) -> Reduction {
    let kind = AutomationKind::IntercompanyMatch;
    let (exceptions, affected) = resolve_open_in(&snapshot.exceptions, kind.categories());

    let mut next = snapshot.clone();
    next.exceptions = exceptions;
    next.intercompany_match_rate = snapshot
        .intercompany_match_rate
        .saturating_add(MATCH_RATE_INCREMENT)
        .min(MATCH_RATE_CEILING);
    without_open_tasks(&mut next, &[INTERCOMPANY_ELIMINATION_TASK]);
    reduce_errors(&mut next, INTERCOMPANY_ERROR_REDUCTION, |row| {
        row.task_list == INTERCOMPANY_RECON_TASK_LIST
    });

    finish(snapshot, next, kind, affected)
}

/// Golden vendor mapping: duplicate vendors and customers collapse onto one
/// enterprise record. Rows spanning both entities lose 2 errors.
pub fn apply_golden_vendor_mapping(snapshot: &CloseSnapshot) -> Reduction {
    let kind = AutomationKind::GoldenVendorMapping;
    let (exceptions, affected) = resolve_open_in(&snapshot.exceptions, kind.categories());

    let mut next = snapshot.clone();
    next.exceptions = exceptions;
    without_open_tasks(&mut next, &[VENDOR_REVIEW_TASK, GOLDEN_VENDOR_TASK]);
    reduce_errors(&mut next, VENDOR_ERROR_REDUCTION, |row| row.entity == Entity::Both);

    finish(snapshot, next, kind, affected)
}

/// Cost-center normalization for Raymond's JDE feed
pub fn apply_normalize_cost_centers(snapshot: &CloseSnapshot) -> Reduction {
    let kind = AutomationKind::NormalizeCostCenters;
    let (exceptions, affected) = resolve_open_in(&snapshot.exceptions, kind.categories());

    let mut next = snapshot.clone();
    next.exceptions = exceptions;
    without_open_tasks(&mut next, &[COST_CENTER_TASK]);
    reduce_errors(&mut next, COST_CENTER_ERROR_REDUCTION, |row| {
        row.entity == Entity::Raymond && row.source_system == SourceSystem::Jde
    });

    finish(snapshot, next, kind, affected)
}

/// Accrual generation: every suggested accrual is booked and the accrual
/// exceptions resolve. Error rows and open tasks do not move.
pub fn apply_accrual_generation(snapshot: &CloseSnapshot) -> Reduction {
    let kind = AutomationKind::AccrualGeneration;
    let (exceptions, mut affected) = resolve_open_in(&snapshot.exceptions, kind.categories());

    let mut next = snapshot.clone();
    next.exceptions = exceptions;
    for accrual in next.accrual_suggestions.iter_mut().filter(|a| !a.booked) {
        accrual.booked = true;
        affected.push(accrual.id.clone());
    }

    finish(snapshot, next, kind, affected)
}

pub fn apply_automation(snapshot: &CloseSnapshot, kind: AutomationKind) -> Reduction {
    match kind {
        AutomationKind::IntercompanyMatch => apply_intercompany_match(snapshot),
        AutomationKind::GoldenVendorMapping => apply_golden_vendor_mapping(snapshot),
        AutomationKind::NormalizeCostCenters => apply_normalize_cost_centers(snapshot),
        AutomationKind::AccrualGeneration => apply_accrual_generation(snapshot),
    }
}

// ============================================================================
// TESTS
// ============================================================================
