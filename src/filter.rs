// 🔽 Entity Filter - What a dashboard shows for the selected entity
//
// Selecting "Both" shows everything. Selecting TMH or Raymond shows that
// entity's rows plus the joint rows (entity = Both).

use serde::{Deserialize, Serialize};

use crate::kpi::KpiReport;
use crate::model::{
    AccrualSuggestion, CloseSnapshot, DelayedTaskListRow, Entity, ErrorRow, ExceptionRecord,
    FinancialLineItem, OpenTaskRow,
};

/// Anything owned by one of the merging entities
pub trait EntityScoped {
    fn entity(&self) -> Entity;

    fn visible_to(&self, selected: Entity) -> bool {
        selected == Entity::Both || self.entity() == selected || self.entity() == Entity::Both
    }
}

impl EntityScoped for ErrorRow {
    fn entity(&self) -> Entity {
        self.entity
    }
}

impl EntityScoped for OpenTaskRow {
    fn entity(&self) -> Entity {
        self.entity
    }
}

impl EntityScoped for DelayedTaskListRow {
    fn entity(&self) -> Entity {
        self.entity
    }
}

impl EntityScoped for ExceptionRecord {
    fn entity(&self) -> Entity {
        self.entity
    }
}

impl EntityScoped for FinancialLineItem {
    fn entity(&self) -> Entity {
        self.entity
    }
}

pub fn filter_by_entity<T: EntityScoped + Clone>(rows: &[T], selected: Entity) -> Vec<T> {
    rows.iter()
        .filter(|row| row.visible_to(selected))
        .cloned()
        .collect()
}

/// Filtered rows plus KPIs.
///
/// KPIs are computed from the FULL snapshot: the entity selector narrows
/// the tables, not the headline numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub entity: Entity,
    pub kpis: KpiReport,
    pub error_rows: Vec<ErrorRow>,
    pub open_task_rows: Vec<OpenTaskRow>,
    pub delayed_task_list_rows: Vec<DelayedTaskListRow>,
    pub exceptions: Vec<ExceptionRecord>,
    pub financial_line_items: Vec<FinancialLineItem>,

    /// Suggestions are entity-neutral and always shown
    pub accruals: Vec<AccrualSuggestion>,
}

impl DashboardView {
    pub fn build(snapshot: &CloseSnapshot, entity: Entity) -> Self {
        DashboardView {
            entity,
            kpis: KpiReport::from_snapshot(snapshot),
            error_rows: filter_by_entity(&snapshot.error_rows, entity),
            open_task_rows: filter_by_entity(&snapshot.open_task_rows, entity),
            delayed_task_list_rows: filter_by_entity(&snapshot.delayed_task_list_rows, entity),
            exceptions: filter_by_entity(&snapshot.exceptions, entity),
            financial_line_items: filter_by_entity(&snapshot.financial_line_items, entity),
            accruals: snapshot.accrual_suggestions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::snapshot_for;

    #[test]
    fn test_both_shows_everything() {
        let snapshot = snapshot_for("AFC-1").unwrap();
        let view = DashboardView::build(&snapshot, Entity::Both);

        assert_eq!(view.error_rows.len(), snapshot.error_rows.len());
        assert_eq!(view.open_task_rows.len(), snapshot.open_task_rows.len());
        assert_eq!(view.exceptions.len(), snapshot.exceptions.len());
    }

    #[test]
    fn test_entity_includes_joint_rows() {
        let snapshot = snapshot_for("AFC-1").unwrap();
        let raymond = filter_by_entity(&snapshot.exceptions, Entity::Raymond);

        assert!(raymond.iter().all(|e| e.entity != Entity::Tmh));
        assert!(raymond.iter().any(|e| e.entity == Entity::Both));
        assert!(raymond.iter().any(|e| e.entity == Entity::Raymond));

        let tmh_errors = filter_by_entity(&snapshot.error_rows, Entity::Tmh);
        let names: Vec<&str> = tmh_errors.iter().map(|r| r.task_list.as_str()).collect();
        assert_eq!(names, vec!["AFC-3", "TMH-SAP Month-End", "Intercompany Recon"]);
    }

    #[test]
    fn test_kpis_ignore_entity_filter() {
        let snapshot = snapshot_for("AFC-1").unwrap();
        let both = DashboardView::build(&snapshot, Entity::Both);
        let tmh = DashboardView::build(&snapshot, Entity::Tmh);

        assert_eq!(both.kpis.projected_close_days, tmh.kpis.projected_close_days);
        assert_eq!(both.kpis.exceptions, tmh.kpis.exceptions);
        assert_eq!(both.kpis.consolidated, tmh.kpis.consolidated);
    }

    #[test]
    fn test_joint_pl_lines_visible_to_each_entity() {
        let snapshot = snapshot_for("AFC-1").unwrap();
        let raymond = DashboardView::build(&snapshot, Entity::Raymond);

        assert_eq!(raymond.financial_line_items.len(), 8);
        assert_eq!(raymond.accruals.len(), 3);
    }
}
