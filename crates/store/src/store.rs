//! The transactional store contract.
//!
//! The core treats the relational store as an external collaborator (it
//! never implements persistence itself). This module pins down exactly what
//! that collaborator must provide:
//!
//! - **Typed CRUD per entity table**: [`StoreRead`] / [`StoreTx`], returning
//!   the row structs from [`crate::rows`] rather than dynamic maps.
//! - **Referential constraints**: restrict-on-delete for items referenced by
//!   BOM lines, document lines, or movements; cascade for template lines.
//!   Violations surface as [`StorageError`] values, never as partial writes.
//! - **Multi-statement atomic transactions**: [`StockStore::transact`] runs
//!   a closure against a [`StoreTx`]; every write inside commits together or
//!   not at all. Returning `Err` from the closure rolls the whole
//!   transaction back.
//!
//! ## Concurrency
//!
//! Implementations must serialize conflicting writers on the same item's
//! (balance, average-cost) pair: a read-modify-write wrapped in `transact`
//! must not lose an update to a concurrent finalization. Pessimistic row
//! locking or serializable transactions both satisfy this; the in-memory
//! implementation holds a single write lock for the whole transaction.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use shopfloor_core::{
    EntryNoteId, ItemId, ProductionLineId, ProductionOrderId, SaleId, StockError, StockResult,
    SupplierId, UnitId,
};

use crate::rows::{
    BomLineRow, DocumentRef, EntryLineRow, EntryNoteRow, ItemRow, MovementRow, OrderLineRow,
    ProductionOrderRow, SaleLineRow, SaleRow, SupplierRow, TemplateLineRow, TemplateRow, UnitRow,
};

/// Failure reported by the storage collaborator.
///
/// These are infrastructure-shaped errors (constraints, missing rows,
/// connectivity), mapped to the domain taxonomy at the operation boundary
/// via `From<StorageError> for StockError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("delete restricted by referencing rows: {0}")]
    RestrictViolation(String),

    #[error("referenced row missing: {0}")]
    MissingReference(String),

    #[error("row to update missing: {0}")]
    MissingRow(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for StockError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UniqueViolation(msg) => StockError::DuplicateKey(msg),
            StorageError::RestrictViolation(msg) => StockError::DependencyExists(msg),
            StorageError::MissingReference(what) | StorageError::MissingRow(what) => {
                StockError::NotFound(what)
            }
            StorageError::Unavailable(msg) => StockError::Storage(msg),
        }
    }
}

/// Read-side typed queries. Rows are returned by value; callers re-read
/// inside each operation instead of caching across calls.
pub trait StoreRead {
    fn units(&self) -> Vec<UnitRow>;
    fn unit(&self, id: UnitId) -> Option<UnitRow>;

    fn suppliers(&self) -> Vec<SupplierRow>;
    fn supplier(&self, id: SupplierId) -> Option<SupplierRow>;

    fn items(&self) -> Vec<ItemRow>;
    fn item(&self, id: ItemId) -> Option<ItemRow>;

    /// BOM lines owned by `product_id`, in persisted order.
    fn bom_of(&self, product_id: ItemId) -> Vec<BomLineRow>;
    /// BOM lines (for any product) that consume `material_id`.
    fn bom_using(&self, material_id: ItemId) -> Vec<BomLineRow>;

    /// Movement history for one item, in append order.
    fn movements_of(&self, item_id: ItemId) -> Vec<MovementRow>;
    fn movements_for_document(&self, document: DocumentRef) -> Vec<MovementRow>;

    fn entry_notes(&self) -> Vec<EntryNoteRow>;
    fn entry_note(&self, id: EntryNoteId) -> Option<EntryNoteRow>;
    fn entry_lines_of(&self, id: EntryNoteId) -> Vec<EntryLineRow>;

    fn sales(&self) -> Vec<SaleRow>;
    fn sale(&self, id: SaleId) -> Option<SaleRow>;
    fn sale_lines_of(&self, id: SaleId) -> Vec<SaleLineRow>;

    fn orders(&self) -> Vec<ProductionOrderRow>;
    fn order(&self, id: ProductionOrderId) -> Option<ProductionOrderRow>;
    fn order_lines_of(&self, id: ProductionOrderId) -> Vec<OrderLineRow>;
    /// Order lines (for any order) that plan `product_id`.
    fn order_lines_using(&self, product_id: ItemId) -> Vec<OrderLineRow>;

    fn templates(&self) -> Vec<TemplateRow>;
    fn template(&self, id: ProductionLineId) -> Option<TemplateRow>;
    fn template_lines_of(&self, id: ProductionLineId) -> Vec<TemplateLineRow>;
}

/// Write-side typed statements, only reachable inside a transaction.
///
/// Line sets (`put_*_lines`, `put_bom`) are replaced wholesale: delete the
/// document's current set, insert the new one, atomically with everything
/// else in the transaction. Movements are append-only: there is no update
/// or delete statement for them.
pub trait StoreTx: StoreRead {
    fn insert_supplier(&mut self, row: SupplierRow) -> Result<(), StorageError>;
    fn update_supplier(&mut self, row: SupplierRow) -> Result<(), StorageError>;
    fn delete_supplier(&mut self, id: SupplierId) -> Result<(), StorageError>;

    fn insert_item(&mut self, row: ItemRow) -> Result<(), StorageError>;
    fn update_item(&mut self, row: ItemRow) -> Result<(), StorageError>;
    /// The stock ledger's dedicated balance/cost update; the only statement
    /// that touches `ItemRow::balance` / `ItemRow::average_cost`.
    fn update_item_stock(
        &mut self,
        id: ItemId,
        balance: Decimal,
        average_cost: Decimal,
    ) -> Result<(), StorageError>;
    fn delete_item(&mut self, id: ItemId) -> Result<(), StorageError>;

    fn put_bom(&mut self, product_id: ItemId, lines: Vec<BomLineRow>)
        -> Result<(), StorageError>;

    fn append_movement(&mut self, row: MovementRow) -> Result<(), StorageError>;

    fn insert_entry_note(&mut self, row: EntryNoteRow) -> Result<(), StorageError>;
    fn update_entry_note(&mut self, row: EntryNoteRow) -> Result<(), StorageError>;
    fn put_entry_lines(
        &mut self,
        note_id: EntryNoteId,
        lines: Vec<EntryLineRow>,
    ) -> Result<(), StorageError>;

    fn insert_sale(&mut self, row: SaleRow) -> Result<(), StorageError>;
    fn update_sale(&mut self, row: SaleRow) -> Result<(), StorageError>;
    fn put_sale_lines(&mut self, sale_id: SaleId, lines: Vec<SaleLineRow>)
        -> Result<(), StorageError>;

    fn insert_order(&mut self, row: ProductionOrderRow) -> Result<(), StorageError>;
    fn update_order(&mut self, row: ProductionOrderRow) -> Result<(), StorageError>;
    fn put_order_lines(
        &mut self,
        order_id: ProductionOrderId,
        lines: Vec<OrderLineRow>,
    ) -> Result<(), StorageError>;
    /// Removes the order and its lines (orders own their lines). Restricted
    /// while movements reference the order.
    fn delete_order(&mut self, id: ProductionOrderId) -> Result<(), StorageError>;

    fn insert_template(&mut self, row: TemplateRow) -> Result<(), StorageError>;
    fn update_template(&mut self, row: TemplateRow) -> Result<(), StorageError>;
    fn put_template_lines(
        &mut self,
        template_id: ProductionLineId,
        lines: Vec<TemplateLineRow>,
    ) -> Result<(), StorageError>;
    /// Cascade-deletes the template's lines; orders keep running with their
    /// template reference cleared.
    fn delete_template(&mut self, id: ProductionLineId) -> Result<(), StorageError>;
}

/// Handle to the transactional store, injected into every service.
pub trait StockStore: Send + Sync {
    /// Run `f` inside one atomic transaction. Every write made through the
    /// [`StoreTx`] commits if and only if `f` returns `Ok`; an `Err` rolls
    /// everything back and is returned unchanged.
    fn transact<T, F>(&self, f: F) -> StockResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> StockResult<T>;

    /// Run `f` against a consistent read snapshot.
    fn read<T, F>(&self, f: F) -> StockResult<T>
    where
        F: FnOnce(&dyn StoreRead) -> StockResult<T>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore,
{
    fn transact<T, F>(&self, f: F) -> StockResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> StockResult<T>,
    {
        (**self).transact(f)
    }

    fn read<T, F>(&self, f: F) -> StockResult<T>
    where
        F: FnOnce(&dyn StoreRead) -> StockResult<T>,
    {
        (**self).read(f)
    }
}
