//! Supplier directory.

use tracing::info;

use shopfloor_core::{StockError, StockResult, SupplierId};
use shopfloor_store::{StockStore, SupplierRow, SupplierStatus};

/// Input for creating or updating a supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierDraft {
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: Option<String>,
    pub status: SupplierStatus,
}

/// Supplier directory service over an injected store handle.
pub struct Suppliers<S> {
    store: S,
}

impl<S: StockStore> Suppliers<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create(&self, draft: SupplierDraft) -> StockResult<SupplierRow> {
        if draft.legal_name.trim().is_empty() {
            return Err(StockError::validation("legal name cannot be empty"));
        }
        let row = SupplierRow {
            id: SupplierId::new(),
            legal_name: draft.legal_name,
            trade_name: draft.trade_name,
            tax_id: draft.tax_id,
            status: draft.status,
        };
        let row = self.store.transact(|tx| {
            tx.insert_supplier(row.clone())?;
            Ok(row)
        })?;
        info!(supplier = %row.id, legal_name = %row.legal_name, "supplier created");
        Ok(row)
    }

    pub fn get(&self, id: SupplierId) -> StockResult<SupplierRow> {
        self.store
            .read(|r| r.supplier(id).ok_or_else(|| StockError::not_found("supplier")))
    }

    pub fn list(&self) -> StockResult<Vec<SupplierRow>> {
        self.store.read(|r| Ok(r.suppliers()))
    }

    /// Legal/trade name substring search, case-insensitive.
    pub fn search(&self, term: &str) -> StockResult<Vec<SupplierRow>> {
        let term = term.to_lowercase();
        self.store.read(|r| {
            Ok(r.suppliers()
                .into_iter()
                .filter(|s| {
                    s.legal_name.to_lowercase().contains(&term)
                        || s.trade_name
                            .as_deref()
                            .is_some_and(|t| t.to_lowercase().contains(&term))
                })
                .collect())
        })
    }

    pub fn update(&self, id: SupplierId, draft: SupplierDraft) -> StockResult<SupplierRow> {
        if draft.legal_name.trim().is_empty() {
            return Err(StockError::validation("legal name cannot be empty"));
        }
        self.store.transact(|tx| {
            if tx.supplier(id).is_none() {
                return Err(StockError::not_found("supplier"));
            }
            let row = SupplierRow {
                id,
                legal_name: draft.legal_name,
                trade_name: draft.trade_name,
                tax_id: draft.tax_id,
                status: draft.status,
            };
            tx.update_supplier(row.clone())?;
            Ok(row)
        })
    }

    /// Delete a supplier. The store restricts the delete while items or
    /// entry note lines still reference it.
    pub fn delete(&self, id: SupplierId) -> StockResult<()> {
        self.store.transact(|tx| {
            if tx.supplier(id).is_none() {
                return Err(StockError::not_found("supplier"));
            }
            tx.delete_supplier(id)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::item::{ItemCatalog, ItemDraft};
    use shopfloor_store::{ItemKind, MemoryStore};

    fn suppliers() -> (Arc<MemoryStore>, Suppliers<Arc<MemoryStore>>) {
        let store = Arc::new(MemoryStore::with_default_units());
        (store.clone(), Suppliers::new(store))
    }

    fn draft(legal_name: &str) -> SupplierDraft {
        SupplierDraft {
            legal_name: legal_name.to_string(),
            trade_name: None,
            tax_id: None,
            status: SupplierStatus::Active,
        }
    }

    #[test]
    fn duplicate_legal_name_is_rejected() {
        let (_store, suppliers) = suppliers();
        suppliers.create(draft("Acme Mills")).unwrap();
        let err = suppliers.create(draft("Acme Mills")).unwrap_err();
        assert!(matches!(err, StockError::DuplicateKey(_)));
    }

    #[test]
    fn delete_is_restricted_while_an_item_references_the_supplier() {
        let (store, suppliers) = suppliers();
        let supplier = suppliers.create(draft("Acme Mills")).unwrap();

        let items = ItemCatalog::new(store);
        let unit = items.units().unwrap().into_iter().next().unwrap();
        items
            .create(ItemDraft {
                description: "Flour".to_string(),
                kind: ItemKind::Material,
                unit_id: unit.id,
                internal_code: None,
                default_supplier: Some(supplier.id),
            })
            .unwrap();

        let err = suppliers.delete(supplier.id).unwrap_err();
        assert!(matches!(err, StockError::DependencyExists(_)));
    }

    #[test]
    fn search_matches_trade_names_too() {
        let (_store, suppliers) = suppliers();
        suppliers
            .create(SupplierDraft {
                legal_name: "Moinhos Reunidos SA".to_string(),
                trade_name: Some("Acme Flour".to_string()),
                tax_id: None,
                status: SupplierStatus::Active,
            })
            .unwrap();
        assert_eq!(suppliers.search("acme").unwrap().len(), 1);
        assert!(suppliers.search("nothing").unwrap().is_empty());
    }
}
