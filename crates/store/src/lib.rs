//! `shopfloor-store` — the storage collaborator boundary.
//!
//! The ledger and lifecycle crates never talk to a database directly; they
//! talk to the [`StockStore`] contract defined here. This crate owns the
//! typed row structs (the single mapping layer between relational rows and
//! the domain), the typed-CRUD read/write traits, and an in-memory
//! implementation used by tests and development setups.

pub mod memory;
pub mod rows;
pub mod store;

pub use memory::MemoryStore;
pub use rows::{
    BomLineRow, DocumentRef, DocumentStatus, EntryLineRow, EntryNoteRow, ItemKind, ItemRow,
    MovementKind, MovementRow, OrderAction, OrderLineRow, OrderStatus, ProductionOrderRow,
    SaleLineRow, SaleRow, SupplierRow, SupplierStatus, TemplateLineRow, TemplateRow,
    TemplateStatus, UnitRow,
};
pub use store::{StockStore, StorageError, StoreRead, StoreTx};
