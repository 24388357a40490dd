// 🔎 Traceback - From an exception back to its source document
//
// Lineage chain:
//   ExceptionRecord.document_id → SourceDocument
//   SourceDocument.(cost_center, entity) → CostCenterMapping
//   SourceDocument.(vendor_id, entity) → VendorMapping

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CloseError, Result};
use crate::model::{CloseSnapshot, Entity, ExceptionRecord, SourceSystem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub doc_id: String,
    pub entity: Entity,
    pub source_system: SourceSystem,
    pub document_type: String,

    /// Local vendor id in the owning entity's ERP
    pub vendor_id: Option<String>,

    pub amount: f64,
    pub date: NaiveDate,
    pub cost_center: String,
    pub gl_account: String,
    pub description: String,
    pub document_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCenterMapping {
    pub local_id: String,
    pub local_entity: Entity,
    pub enterprise_id: String,
    pub enterprise_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorMappingStatus {
    Matched,
    Unmatched,
    Review,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorMapping {
    pub vendor_id_tmh: Option<String>,
    pub vendor_id_raymond: Option<String>,
    pub enterprise_vendor_id: String,
    pub vendor_name: String,
    pub status: VendorMappingStatus,
}

impl VendorMapping {
    /// Local id of this vendor in the given entity's ERP
    pub fn local_id_for(&self, entity: Entity) -> Option<&str> {
        match entity {
            Entity::Tmh => self.vendor_id_tmh.as_deref(),
            Entity::Raymond => self.vendor_id_raymond.as_deref(),
            Entity::Both => None,
        }
    }
}

/// Result of a traceback: the document and whatever mappings resolve for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traceback {
    pub document: SourceDocument,
    pub cost_center: Option<CostCenterMapping>,
    pub vendor: Option<VendorMapping>,
}

impl Traceback {
    /// Fully mapped into the enterprise master data
    pub fn is_fully_mapped(&self) -> bool {
        let vendor_ok = match (&self.document.vendor_id, &self.vendor) {
            (None, _) => true,
            (Some(_), Some(mapping)) => mapping.status == VendorMappingStatus::Matched,
            (Some(_), None) => false,
        };
        self.cost_center.is_some() && vendor_ok
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineageCatalog {
    pub documents: Vec<SourceDocument>,
    pub cost_centers: Vec<CostCenterMapping>,
    pub vendors: Vec<VendorMapping>,
}

impl LineageCatalog {
    pub fn document(&self, doc_id: &str) -> Option<&SourceDocument> {
        self.documents.iter().find(|d| d.doc_id == doc_id)
    }

    /// Cost-center ids are only unique per entity (CC-3001 exists in both)
    pub fn cost_center_for(&self, doc: &SourceDocument) -> Option<&CostCenterMapping> {
        self.cost_centers
            .iter()
            .find(|m| m.local_id == doc.cost_center && m.local_entity == doc.entity)
    }

    pub fn vendor_for(&self, doc: &SourceDocument) -> Option<&VendorMapping> {
        let vendor_id = doc.vendor_id.as_deref()?;
        self.vendors
            .iter()
            .find(|v| v.local_id_for(doc.entity) == Some(vendor_id))
    }

    pub fn trace_document(&self, doc_id: &str) -> Result<Traceback> {
        let document = self
            .document(doc_id)
            .ok_or_else(|| CloseError::DocumentNotFound(doc_id.to_string()))?;

        Ok(Traceback {
            cost_center: self.cost_center_for(document).cloned(),
            vendor: self.vendor_for(document).cloned(),
            document: document.clone(),
        })
    }

    /// Follow an exception's document link.
    ///
    /// `Ok(None)` when the exception exists but carries no document link.
    pub fn trace_exception(
        &self,
        snapshot: &CloseSnapshot,
        exception_id: &str,
    ) -> Result<Option<Traceback>> {
        let exception: &ExceptionRecord = snapshot
            .exception(exception_id)
            .ok_or_else(|| CloseError::ExceptionNotFound(exception_id.to_string()))?;

        match &exception.document_id {
            Some(doc_id) => self.trace_document(doc_id).map(Some),
            None => Ok(None),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{lineage_catalog, snapshot_for};

    #[test]
    fn test_trace_document_with_mappings() {
        let catalog = lineage_catalog();
        let trace = catalog.trace_document("DOC-SAP-001").unwrap();

        assert_eq!(trace.document.document_number, "INV-SAP-2025-001");
        assert_eq!(trace.cost_center.as_ref().unwrap().enterprise_id, "ECC-1001");
        assert_eq!(trace.vendor.as_ref().unwrap().vendor_name, "Acme Materials Inc");
        assert!(trace.is_fully_mapped());
    }

    #[test]
    fn test_cost_center_resolved_per_entity() {
        let catalog = lineage_catalog();

        // CC-3001 exists for both entities; the TMH mapping must win for a TMH doc
        let trace = catalog.trace_document("DOC-5001234").unwrap();
        let cc = trace.cost_center.unwrap();
        assert_eq!(cc.local_id, "CC-3001");
        assert_eq!(cc.local_entity, Entity::Tmh);
    }

    #[test]
    fn test_unmatched_vendor_not_fully_mapped() {
        let catalog = lineage_catalog();
        let trace = catalog.trace_document("DOC-5001234").unwrap();

        assert_eq!(trace.vendor.as_ref().unwrap().status, VendorMappingStatus::Unmatched);
        assert!(!trace.is_fully_mapped());
    }

    #[test]
    fn test_raymond_vendor_lookup() {
        let catalog = lineage_catalog();
        let trace = catalog.trace_document("DOC-JDE-001").unwrap();
        assert_eq!(trace.vendor.unwrap().enterprise_vendor_id, "EV-SUPPLIER-003");
    }

    #[test]
    fn test_missing_document() {
        let catalog = lineage_catalog();
        assert_eq!(
            catalog.trace_document("DOC-NOPE"),
            Err(CloseError::DocumentNotFound("DOC-NOPE".to_string()))
        );
    }

    #[test]
    fn test_trace_exception() {
        let catalog = lineage_catalog();
        let snapshot = snapshot_for("AFC-1").unwrap();

        let linked = catalog.trace_exception(&snapshot, "EXC-001").unwrap();
        assert_eq!(linked.unwrap().document.doc_id, "DOC-5001234");

        let unlinked = catalog.trace_exception(&snapshot, "EXC-005").unwrap();
        assert!(unlinked.is_none());

        assert_eq!(
            catalog.trace_exception(&snapshot, "EXC-999"),
            Err(CloseError::ExceptionNotFound("EXC-999".to_string()))
        );
    }
}
