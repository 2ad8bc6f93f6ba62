//! `shopfloor-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers and the error taxonomy shared by the catalog,
//! ledger, and document lifecycle crates.

pub mod error;
pub mod id;

pub use error::{StockError, StockResult};
pub use id::{
    EntryNoteId, ItemId, MovementId, ProductionLineId, ProductionOrderId, SaleId, SupplierId,
    UnitId,
};
