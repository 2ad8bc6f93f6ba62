//! Item catalog operations.

use rust_decimal::Decimal;
use tracing::info;

use shopfloor_core::{ItemId, StockError, StockResult, SupplierId, UnitId};
use shopfloor_store::{ItemKind, ItemRow, StockStore, UnitRow};

/// Input for creating or updating an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub description: String,
    pub kind: ItemKind,
    pub unit_id: UnitId,
    pub internal_code: Option<String>,
    pub default_supplier: Option<SupplierId>,
}

/// Item joined with its unit abbreviation, as listed by searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub id: ItemId,
    pub description: String,
    pub kind: ItemKind,
    pub unit_abbreviation: String,
    pub balance: Decimal,
    pub average_cost: Decimal,
}

/// Search arms offered by the item list. Description substring is the
/// default a caller falls back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemSearch {
    All,
    ById(ItemId),
    /// Unit abbreviation substring, case-insensitive.
    ByUnit(String),
    /// Exact stock balance.
    ByBalance(Decimal),
    /// Description substring, case-insensitive.
    ByDescription(String),
}

/// Item catalog service over an injected store handle.
pub struct ItemCatalog<S> {
    store: S,
}

impl<S: StockStore> ItemCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an item. Fails with `DuplicateKey` if the description exists
    /// and `NotFound` if the unit or default supplier reference is missing.
    pub fn create(&self, draft: ItemDraft) -> StockResult<ItemRow> {
        if draft.description.trim().is_empty() {
            return Err(StockError::validation("description cannot be empty"));
        }
        let row = ItemRow {
            id: ItemId::new(),
            description: draft.description,
            kind: draft.kind,
            unit_id: draft.unit_id,
            internal_code: draft.internal_code,
            default_supplier: draft.default_supplier,
            balance: Decimal::ZERO,
            average_cost: Decimal::ZERO,
        };
        let row = self.store.transact(|tx| {
            tx.insert_item(row.clone())?;
            Ok(row)
        })?;
        info!(item = %row.id, description = %row.description, "item created");
        Ok(row)
    }

    pub fn get(&self, id: ItemId) -> StockResult<ItemRow> {
        self.store
            .read(|r| r.item(id).ok_or_else(|| StockError::not_found("item")))
    }

    /// Update catalog fields. Balance and average cost are not touched here;
    /// those belong to the stock ledger.
    pub fn update(&self, id: ItemId, draft: ItemDraft) -> StockResult<ItemRow> {
        if draft.description.trim().is_empty() {
            return Err(StockError::validation("description cannot be empty"));
        }
        self.store.transact(|tx| {
            let current = tx.item(id).ok_or_else(|| StockError::not_found("item"))?;
            let row = ItemRow {
                id,
                description: draft.description,
                kind: draft.kind,
                unit_id: draft.unit_id,
                internal_code: draft.internal_code,
                default_supplier: draft.default_supplier,
                balance: current.balance,
                average_cost: current.average_cost,
            };
            tx.update_item(row.clone())?;
            Ok(row)
        })
    }

    /// Delete an item after the ordered dependency checks; the first
    /// violation is the one reported. No history is ever cascaded away.
    pub fn delete(&self, id: ItemId) -> StockResult<()> {
        self.store.transact(|tx| {
            if tx.item(id).is_none() {
                return Err(StockError::not_found("item"));
            }
            if !tx.bom_using(id).is_empty() {
                return Err(StockError::dependency(
                    "item is used as a material in a product's bill of materials",
                ));
            }
            if !tx.order_lines_using(id).is_empty() {
                return Err(StockError::dependency(
                    "item appears on production order lines",
                ));
            }
            if !tx.movements_of(id).is_empty() {
                return Err(StockError::dependency("item has stock movement records"));
            }
            // Safety net over the material check: a product whose own BOM
            // still has lines is rejected as well.
            if !tx.bom_of(id).is_empty() {
                return Err(StockError::dependency(
                    "item still owns bill-of-materials lines; remove its materials first",
                ));
            }
            tx.delete_item(id)?;
            Ok(())
        })?;
        info!(item = %id, "item deleted");
        Ok(())
    }

    /// Filtered item listing joined with unit abbreviations.
    pub fn search(&self, search: ItemSearch) -> StockResult<Vec<ItemSummary>> {
        self.store.read(|r| {
            let summaries = r.items().into_iter().map(|item| {
                let unit_abbreviation = r
                    .unit(item.unit_id)
                    .map(|u| u.abbreviation)
                    .unwrap_or_default();
                ItemSummary {
                    id: item.id,
                    description: item.description,
                    kind: item.kind,
                    unit_abbreviation,
                    balance: item.balance,
                    average_cost: item.average_cost,
                }
            });
            let matches: Vec<ItemSummary> = match &search {
                ItemSearch::All => summaries.collect(),
                ItemSearch::ById(id) => summaries.filter(|s| s.id == *id).collect(),
                ItemSearch::ByUnit(term) => {
                    let term = term.to_lowercase();
                    summaries
                        .filter(|s| s.unit_abbreviation.to_lowercase().contains(&term))
                        .collect()
                }
                ItemSearch::ByBalance(balance) => {
                    summaries.filter(|s| s.balance == *balance).collect()
                }
                ItemSearch::ByDescription(term) => {
                    let term = term.to_lowercase();
                    summaries
                        .filter(|s| s.description.to_lowercase().contains(&term))
                        .collect()
                }
            };
            Ok(matches)
        })
    }

    pub fn units(&self) -> StockResult<Vec<UnitRow>> {
        self.store.read(|r| Ok(r.units()))
    }

    pub fn unit(&self, id: UnitId) -> StockResult<UnitRow> {
        self.store
            .read(|r| r.unit(id).ok_or_else(|| StockError::not_found("unit")))
    }
}
