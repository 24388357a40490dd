// 🌱 Seed Provider - Initial snapshots per task list
//
// Three named task lists, each producing a FRESH snapshot on every call.
// Nothing written to a snapshot survives a session: selecting a task list
// again starts from the seed.

use serde::{Deserialize, Serialize};

use crate::error::{CloseError, Result};
use crate::model::{
    AccrualSuggestion, CloseSnapshot, CompletionOverview, CompletionRateRow, DelayedTaskListRow,
    Entity, ErrorRow, ExceptionCategory, ExceptionRecord, FinancialLineItem, LineCategory,
    LineStatus, OpenTaskRow, SourceSystem, StatusCounts, TaskRecord, TaskToBeApprovedRow,
};
use crate::traceback::{CostCenterMapping, LineageCatalog, SourceDocument, VendorMapping, VendorMappingStatus};

pub const DEFAULT_TASK_LIST: &str = "AFC-1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub label: String,
}

pub fn task_lists() -> Vec<TaskList> {
    [
        ("AFC-1", "AFC-1 - Month-End Close November 2025 (TMH + Raymond Merger)"),
        ("AFC-2", "AFC-2 - Quarter-End Close Q4 2025"),
        ("AFC-3", "AFC-3 - Year-End Close 2025"),
    ]
    .into_iter()
    .map(|(id, label)| TaskList {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

/// Fresh snapshot for a task list
pub fn snapshot_for(task_list_id: &str) -> Result<CloseSnapshot> {
    let mut snapshot = merger_close_seed();

    match task_list_id {
        "AFC-1" => {}
        "AFC-2" => {
            snapshot.completion_overview = overview(12, 8, 15, 167, 20);
            snapshot.intercompany_match_rate = 75;
        }
        "AFC-3" => {
            snapshot.completion_overview = overview(3, 15, 22, 128, 35);
            snapshot.intercompany_match_rate = 58;
        }
        other => return Err(CloseError::UnknownTaskList(other.to_string())),
    }

    snapshot.task_list_id = task_list_id.to_string();
    Ok(snapshot)
}

/// Unknown task lists fall back to the month-end merger close
pub fn snapshot_or_default(task_list_id: &str) -> CloseSnapshot {
    snapshot_for(task_list_id).unwrap_or_else(|_| merger_close_seed())
}

fn overview(rate: u8, errors: u32, warnings: u32, clean: u32, others: u32) -> CompletionOverview {
    CompletionOverview {
        completion_rate: rate,
        status_counts: StatusCounts {
            completed_with_errors: errors,
            completed_with_warnings: warnings,
            completed_without_issues: clean,
            others,
        },
    }
}

fn error_row(
    task_list: &str,
    person: &str,
    errors: u32,
    company_code: &str,
    entity: Entity,
    system: SourceSystem,
) -> ErrorRow {
    ErrorRow {
        task_list: task_list.to_string(),
        person_responsible: person.to_string(),
        number_of_errors: errors,
        company_code: company_code.to_string(),
        entity,
        source_system: system,
    }
}

fn open_task(task: &str, responsible: &str, days_overdue: i32, entity: Entity) -> OpenTaskRow {
    OpenTaskRow {
        task: task.to_string(),
        responsible: responsible.to_string(),
        days_overdue,
        entity,
    }
}

fn delayed(task_list: &str, closing_type: &str, days_overdue: i32, entity: Entity) -> DelayedTaskListRow {
    DelayedTaskListRow {
        task_list: task_list.to_string(),
        closing_type: closing_type.to_string(),
        days_overdue,
        entity,
    }
}

fn rate(name: &str, percentage: u8) -> CompletionRateRow {
    CompletionRateRow {
        name: name.to_string(),
        percentage,
    }
}

fn approval(task: &str, responsible: &str, days_overdue: i32) -> TaskToBeApprovedRow {
    TaskToBeApprovedRow {
        task: task.to_string(),
        responsible: responsible.to_string(),
        days_overdue,
    }
}

fn task(id: &str, title: &str, description: &str, time_savings: f64, order: u32) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        completed: false,
        time_savings,
        order,
    }
}

fn line(
    id: &str,
    line_item: &str,
    category: LineCategory,
    (tmh_amount, raymond_amount): (f64, f64),
    status: LineStatus,
    description: &str,
) -> FinancialLineItem {
    FinancialLineItem {
        id: id.to_string(),
        line_item: line_item.to_string(),
        category,
        amount: tmh_amount + raymond_amount,
        tmh_amount,
        raymond_amount,
        entity: Entity::Both,
        status,
        description: description.to_string(),
    }
}

/// Consolidated P&L for the merged entity (consolidated amount = TMH + Raymond)
pub fn financial_line_items() -> Vec<FinancialLineItem> {
    use LineCategory::*;

    vec![
        line("FI-001", "Revenue - Products", Revenue, (1_600_000.0, 850_000.0), LineStatus::Ok, "Product sales from manufacturing facilities"),
        line("FI-002", "Revenue - Services", Revenue, (250_000.0, 200_000.0), LineStatus::Ok, "Service contracts and support"),
        line("FI-003", "COGS - Materials", Cogs, (800_000.0, 425_000.0), LineStatus::Ok, "Raw materials and components"),
        line("FI-004", "COGS - Labor", Cogs, (480_000.0, 255_000.0), LineStatus::Review, "Direct labor costs (discrepancy in overhead allocation)"),
        line("FI-005", "Gross Profit", Summary, (570_000.0, 370_000.0), LineStatus::Ok, "Calculated gross profit margin"),
        line("FI-006", "Operating Expenses - Salaries", Opex, (320_000.0, 200_000.0), LineStatus::Ok, "Employee salaries and benefits"),
        line("FI-007", "Operating Expenses - Facility", Opex, (120_000.0, 60_000.0), LineStatus::Exception, "Rent, utilities, maintenance (facility consolidation adjustment needed)"),
        line("FI-008", "Intercompany Eliminations", Eliminations, (-75_000.0, -50_000.0), LineStatus::Review, "Elimination of intercompany transactions"),
    ]
}

/// Accruals proposed for the merger close, none booked yet
pub fn accrual_suggestions() -> Vec<AccrualSuggestion> {
    [
        ("ACR-001", "2100 - Accrued Expenses", "Facility consolidation costs (lease termination)", 28_000.0, 92),
        ("ACR-002", "2100 - Accrued Expenses", "Integration bonus accrual (retention agreements)", 18_500.0, 85),
        ("ACR-003", "2150 - Deferred Revenue", "Service contract adjustment for merged entity", 12_000.0, 78),
    ]
    .into_iter()
    .map(|(id, account, description, amount, confidence)| AccrualSuggestion {
        id: id.to_string(),
        account: account.to_string(),
        description: description.to_string(),
        amount,
        confidence,
        booked: false,
    })
    .collect()
}

/// Merger-integration close checklist
pub fn merger_close_tasks() -> Vec<TaskRecord> {
    vec![
        task("TASK-001", "Import TMH SAP ECC Feed", "Extract GL, cost center, and vendor data from SAP ECC", 8.0, 1),
        task("TASK-002", "Import Raymond JDE Feed", "Extract GL, cost center, and vendor data from JD Edwards", 8.0, 2),
        task("TASK-003", "Run Standardization Mappings", "Apply cost center and vendor mappings to normalize data", 6.0, 3),
        task("TASK-004", "Auto-Match Intercompany", "Automatically match and verify intercompany invoices", 8.0, 4),
        task("TASK-005", "Identify & Flag Duplicate Vendors", "Find and consolidate duplicate vendor records across entities", 6.0, 5),
        task("TASK-006", "Resolve All Exceptions", "Review and resolve exceptions requiring manual intervention", 4.0, 6),
        task("TASK-007", "Final Approvals & Review", "Controller review and sign-off of consolidated P&L", 2.0, 7),
        task("TASK-008", "Publish Consolidated P&L", "Finalize and distribute consolidated financials", 1.0, 8),
    ]
}

/// The eight merger exceptions, all open
pub fn merger_exceptions() -> Vec<ExceptionRecord> {
    use ExceptionCategory::*;

    vec![
        ExceptionRecord::new(
            "EXC-001",
            UnmatchedIntercompany,
            "Unmatched intercompany invoice (TMH -> Raymond)",
            Entity::Both,
            SourceSystem::SapEcc,
            125_000.0,
        )
        .with_document("DOC-5001234")
        .with_vendor("V-TMH-5001", "EV-INTERCO-001"),
        ExceptionRecord::new(
            "EXC-002",
            DuplicateVendor,
            "Duplicate vendor IDs across TMH/Raymond (different IDs for same vendor)",
            Entity::Both,
            SourceSystem::Jde,
            89_000.0,
        )
        .with_vendor("V-RAY-2034", "EV-SUPPLIER-001"),
        ExceptionRecord::new(
            "EXC-003",
            MissingCostCenterMapping,
            "Missing cost center mapping (Raymond local -> enterprise)",
            Entity::Raymond,
            SourceSystem::Jde,
            45_000.0,
        )
        .with_cost_center("CC-RAY-3200", "ECC-3200"),
        ExceptionRecord::new(
            "EXC-004",
            GlClassificationMismatch,
            "GL classification mismatch (TMH vs Raymond chart of accounts)",
            Entity::Both,
            SourceSystem::SapEcc,
            67_000.0,
        )
        .with_document("DOC-5001289"),
        ExceptionRecord::new(
            "EXC-005",
            ApAgingMismatch,
            "AP aging mismatch by entity (currency conversion discrepancy)",
            Entity::Raymond,
            SourceSystem::Jde,
            23_000.0,
        ),
        ExceptionRecord::new(
            "EXC-006",
            AccrualMissing,
            "Accrual missing for warranty reserve (post-merger liability)",
            Entity::Both,
            SourceSystem::SapEcc,
            156_000.0,
        ),
        ExceptionRecord::new(
            "EXC-007",
            UnmappedPaymentTerms,
            "Unmapped payment terms (Raymond terms not in enterprise master)",
            Entity::Raymond,
            SourceSystem::Jde,
            12_000.0,
        ),
        ExceptionRecord::new(
            "EXC-008",
            DuplicateCustomer,
            "Duplicate customer master records (TMH + Raymond)",
            Entity::Both,
            SourceSystem::SapEcc,
            34_000.0,
        ),
    ]
}

/// AFC-1: Month-End Close November 2025 (TMH + Raymond Merger)
fn merger_close_seed() -> CloseSnapshot {
    use Entity::*;
    use SourceSystem::*;

    CloseSnapshot {
        task_list_id: DEFAULT_TASK_LIST.to_string(),
        completion_overview: overview(5, 12, 18, 145, 25),
        error_rows: vec![
            error_row("AFC-3", "Katharina Stopf", 14, "1010", Tmh, SapEcc),
            error_row("AFC-2", "John GLAccountant", 9, "1010", Raymond, Jde),
            error_row("TMH-SAP Month-End", "Sarah Chen", 8, "1000", Tmh, SapEcc),
            error_row("Raymond-JDE Close", "Michael Torres", 6, "2000", Raymond, Jde),
            error_row("Intercompany Recon", "Lisa Anderson", 4, "ALL", Both, SapEcc),
        ],
        open_task_rows: vec![
            open_task("Intercompany elimination check", "Lisa Anderson", -3, Both),
            open_task("Vendor duplicate review (TMH vs Raymond)", "Sarah Chen", -5, Both),
            open_task("Cost center mapping exceptions", "Michael Torres", 1, Raymond),
            open_task("AP Aging Analysis", "John Smith", -2, Tmh),
            open_task("Golden vendor consolidation", "David Kim", -4, Both),
            open_task("GL Account Reconciliation", "Emma Wilson", -1, Tmh),
            open_task("Revenue Recognition", "Robert Lee", 2, Raymond),
            open_task("Fixed Assets Depreciation", "Maria Garcia", -4, Tmh),
            open_task("Tax Provision Review", "James Brown", 1, Both),
            open_task("Foreign Currency Revaluation", "Anna Martinez", -2, Raymond),
            open_task("Inventory Valuation", "Thomas White", 0, Both),
        ],
        delayed_task_list_rows: vec![
            delayed("Month-End Close (Merger)", "Merger Integration", -5, Both),
            delayed("TMH North America", "Standard Close", -5, Tmh),
            delayed("Raymond EMEA", "Fast Close", -3, Raymond),
            delayed("TMH Asia Pacific", "Standard Close", -2, Tmh),
            delayed("Raymond Latin America", "Standard Close", -4, Raymond),
            delayed("Corporate Consolidation", "Consolidated", -1, Both),
        ],
        exceptions: merger_exceptions(),
        tasks: merger_close_tasks(),
        intercompany_match_rate: 62,
        completion_by_company_code: vec![
            rate("1000 - TMH North America", 85),
            rate("2000 - Raymond EMEA", 72),
            rate("3000 - TMH Asia Pacific", 91),
            rate("4000 - Raymond Latin America", 68),
            rate("5000 - Corporate HQ", 95),
        ],
        completion_by_task_list: vec![
            rate("AFC-1-001 Standard Posting", 100),
            rate("AFC-1-002 AP Processing", 87),
            rate("AFC-1-003 AR Processing", 93),
            rate("AFC-1-004 Intercompany", 45),
            rate("AFC-1-005 Consolidation", 62),
        ],
        tasks_to_be_approved: vec![
            approval("Revenue Recognition Adjustment", "Robert Lee", 2),
            approval("Accrual Adjustment - Warranty", "Michael Torres", 1),
            approval("Foreign Exchange Revaluation", "Anna Martinez", -1),
        ],
        financial_line_items: financial_line_items(),
        accrual_suggestions: accrual_suggestions(),
    }
}

// ============================================================================
// LINEAGE CATALOG
// ============================================================================

fn document(
    doc_id: &str,
    entity: Entity,
    source_system: SourceSystem,
    document_type: &str,
    vendor_id: Option<&str>,
    amount: f64,
    date: (i32, u32, u32),
    cost_center: &str,
    gl_account: &str,
    description: &str,
    document_number: &str,
) -> Option<SourceDocument> {
    Some(SourceDocument {
        doc_id: doc_id.to_string(),
        entity,
        source_system,
        document_type: document_type.to_string(),
        vendor_id: vendor_id.map(str::to_string),
        amount,
        date: chrono::NaiveDate::from_ymd_opt(date.0, date.1, date.2)?,
        cost_center: cost_center.to_string(),
        gl_account: gl_account.to_string(),
        description: description.to_string(),
        document_number: document_number.to_string(),
    })
}

fn cost_center(local_id: &str, entity: Entity, enterprise_id: &str, name: &str) -> CostCenterMapping {
    CostCenterMapping {
        local_id: local_id.to_string(),
        local_entity: entity,
        enterprise_id: enterprise_id.to_string(),
        enterprise_name: name.to_string(),
    }
}

fn vendor(
    tmh: Option<&str>,
    raymond: Option<&str>,
    enterprise_id: &str,
    name: &str,
    status: VendorMappingStatus,
) -> VendorMapping {
    VendorMapping {
        vendor_id_tmh: tmh.map(str::to_string),
        vendor_id_raymond: raymond.map(str::to_string),
        enterprise_vendor_id: enterprise_id.to_string(),
        vendor_name: name.to_string(),
        status,
    }
}

/// Source documents plus the local → enterprise mappings used for traceback
pub fn lineage_catalog() -> LineageCatalog {
    use Entity::*;
    use SourceSystem::*;
    use VendorMappingStatus::*;

    let documents = [
        document("DOC-5001234", Tmh, SapEcc, "Intercompany Invoice", Some("V-TMH-5001"), 125_000.0, (2025, 11, 12), "CC-3001", "9100", "Intercompany service transfer to Raymond", "ICC-SAP-2025-1234"),
        document("DOC-5001289", Tmh, SapEcc, "Journal Entry", None, 67_000.0, (2025, 11, 18), "CC-1001", "6100", "Overhead reclass under TMH chart of accounts", "JE-SAP-2025-1289"),
        document("DOC-SAP-001", Tmh, SapEcc, "Invoice", Some("V001"), 125_000.0, (2025, 5, 15), "CC-1001", "4100", "Raw materials purchase - Columbus facility", "INV-SAP-2025-001"),
        document("DOC-JDE-001", Raymond, Jde, "Invoice", Some("RV002"), 45_000.0, (2025, 5, 12), "CC-2101", "4200", "Transportation and logistics - Greeneville", "INV-JDE-2025-0512"),
        document("DOC-SAP-002", Tmh, SapEcc, "Purchase Order", Some("V002"), 78_500.0, (2025, 5, 10), "CC-1101", "4100", "Component purchase - quality assurance", "PO-SAP-2025-002"),
        document("DOC-JDE-002", Raymond, Jde, "Journal Entry", None, 62_000.0, (2025, 5, 8), "CC-2001", "6100", "Labor allocation - manufacturing overhead", "JE-JDE-2025-0508"),
    ];

    LineageCatalog {
        documents: documents.into_iter().flatten().collect(),
        cost_centers: vec![
            cost_center("CC-1001", Tmh, "ECC-1001", "Plant Operations - Columbus"),
            cost_center("CC-1101", Tmh, "ECC-1101", "Quality Assurance - Columbus"),
            cost_center("CC-2001", Raymond, "ECC-2001", "Plant Operations - Greeneville"),
            cost_center("CC-2101", Raymond, "ECC-2101", "Logistics - Greeneville"),
            cost_center("CC-3001", Tmh, "ECC-3001", "Engineering - Corporate"),
            cost_center("CC-3001", Raymond, "ECC-3001", "Engineering - Corporate"),
        ],
        vendors: vec![
            vendor(Some("V001"), Some("RV001"), "EV-SUPPLIER-001", "Acme Materials Inc", Matched),
            vendor(Some("V002"), None, "EV-SUPPLIER-002", "Precision Parts Co", Matched),
            vendor(None, Some("RV002"), "EV-SUPPLIER-003", "Regional Logistics Ltd", Matched),
            vendor(Some("V003"), Some("RV003"), "EV-SUPPLIER-004", "ElectroSupply Systems", Review),
            vendor(Some("V004"), None, "EV-SUPPLIER-005", "Maintenance Services Group", Matched),
            vendor(Some("V-TMH-5001"), None, "EV-INTERCO-001", "Raymond Corporation (Intercompany)", Unmatched),
        ],
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExceptionStatus;

    #[test]
    fn test_three_named_seeds() {
        let lists = task_lists();
        assert_eq!(lists.len(), 3);

        for list in &lists {
            let snapshot = snapshot_for(&list.id).unwrap();
            assert_eq!(snapshot.task_list_id, list.id);
            assert_eq!(snapshot.exceptions.len(), 8);
            assert!(snapshot.exceptions.iter().all(|e| e.status == ExceptionStatus::Open));
        }
    }

    #[test]
    fn test_seed_variants() {
        let afc1 = snapshot_for("AFC-1").unwrap();
        let afc2 = snapshot_for("AFC-2").unwrap();
        let afc3 = snapshot_for("AFC-3").unwrap();

        assert_eq!(afc1.intercompany_match_rate, 62);
        assert_eq!(afc2.intercompany_match_rate, 75);
        assert_eq!(afc3.intercompany_match_rate, 58);

        assert_eq!(afc1.completion_overview.completion_rate, 5);
        assert_eq!(afc2.completion_overview.status_counts.completed_without_issues, 167);
        assert_eq!(afc3.completion_overview.status_counts.others, 35);

        // Shared rows
        assert_eq!(afc1.open_task_rows, afc2.open_task_rows);
        assert_eq!(afc1.error_rows, afc3.error_rows);
    }

    #[test]
    fn test_unknown_task_list() {
        assert_eq!(
            snapshot_for("AFC-9"),
            Err(CloseError::UnknownTaskList("AFC-9".to_string()))
        );

        let fallback = snapshot_or_default("AFC-9");
        assert_eq!(fallback.task_list_id, DEFAULT_TASK_LIST);
    }

    #[test]
    fn test_checklist_ordering() {
        let tasks = merger_close_tasks();
        assert_eq!(tasks.len(), 8);
        assert!(tasks.windows(2).all(|w| w[0].order < w[1].order));
        assert!(tasks.iter().all(|t| !t.completed));
    }

    #[test]
    fn test_catalog_documents_all_parsed() {
        let catalog = lineage_catalog();
        assert_eq!(catalog.documents.len(), 6);

        // Every document linked from a seeded exception is in the catalog
        for exc in merger_exceptions() {
            if let Some(doc_id) = exc.document_id {
                assert!(catalog.document(&doc_id).is_some(), "missing {}", doc_id);
            }
        }
    }

    #[test]
    fn test_pl_lines_balance_by_entity() {
        let items = financial_line_items();
        assert_eq!(items.len(), 8);
        assert!(items.iter().all(|item| item.is_balanced()), "entity split off");
        assert!(items.iter().all(|item| item.entity == crate::model::Entity::Both));

        let accruals = accrual_suggestions();
        assert_eq!(accruals.len(), 3);
        assert!(accruals.iter().all(|a| !a.booked && a.confidence <= 100));
    }
}
