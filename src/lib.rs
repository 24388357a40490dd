// Close Accelerator - Core Library
// Financial close + merger consolidation state engine (TMH + Raymond)
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod automation;     // Simulated latency + in-flight guard
pub mod config;
pub mod error;
pub mod filter;         // Entity filtering for dashboard views
pub mod kpi;            // Derived KPIs (never stored)
pub mod model;
pub mod reducer;        // Close-State Reducer
pub mod seed;           // Seed snapshots per task list
pub mod session;        // Explicit session context
pub mod traceback;      // Exception → source document lineage

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use automation::{AutomationRunner, InFlight};
pub use config::AppConfig;
pub use error::{CloseError, Result};
pub use filter::{filter_by_entity, DashboardView, EntityScoped};
pub use kpi::{
    compute_close_readiness, compute_projected_close_days, compute_task_projected_close_days,
    consolidated_summary, projected_close_days, ConsolidatedSummary, ExceptionSummary, KpiReport,
};
pub use model::{
    AccrualSuggestion, CloseSnapshot, CompletionOverview, DelayedTaskListRow, Entity, ErrorRow,
    ExceptionCategory, ExceptionRecord, ExceptionStatus, FinancialLineItem, LineCategory,
    LineStatus, OpenTaskRow, Resolver, SourceSystem, StatusCounts, TaskRecord,
};
pub use reducer::{
    apply_accrual_generation, apply_automation, apply_golden_vendor_mapping,
    apply_intercompany_match, apply_normalize_cost_centers, reduce, resolve_exception,
    start_exception, toggle_task, Action, AutomationKind, Outcome, Reduction,
};
pub use seed::{lineage_catalog, snapshot_for, snapshot_or_default, task_lists, TaskList};
pub use session::{Expiring, Session, SessionStore};
pub use traceback::{LineageCatalog, SourceDocument, Traceback};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
