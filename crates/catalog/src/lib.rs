//! `shopfloor-catalog` — item, unit, supplier, and bill-of-materials access.
//!
//! Catalog management sits next to the ledger: it creates and maintains the
//! rows the ledger moves stock against, and it guards deletions so movement
//! history is never orphaned.

pub mod bom;
pub mod item;
pub mod supplier;

pub use bom::{BomCatalog, BomComponent, BomLineDraft, cost_per_unit, validate_bom_line};
pub use item::{ItemCatalog, ItemDraft, ItemSearch, ItemSummary};
pub use supplier::{SupplierDraft, Suppliers};
