//! `shopfloor-documents` — document lifecycle engines.
//!
//! Three parallel state machines over one shared shape: the entry note
//! (supplier receipt) and sale share `Open → Finalized`, the production
//! order runs `InProgress → Completed / Cancelled` with reopen and delete.
//! Finalization drives the stock ledger inside a single transaction per
//! document; production line templates are a convenience composition that
//! pre-populates new orders.

pub mod entry_note;
pub mod production;
pub mod production_line;
pub mod sale;

pub use entry_note::{EntryLineDraft, EntryNoteDetail, EntryNoteDraft, EntryNotes, EntrySearch};
pub use production::{
    OrderDetail, OrderDraft, OrderSearch, PlannedLineDraft, ProductionOrders, yield_percent,
};
pub use production_line::{
    ProductionLines, TemplateDetail, TemplateDraft, TemplateLineDraft, TemplateSummary,
};
pub use sale::{SaleDetail, SaleDraft, SaleLineDraft, SaleSearch, SalesDesk};
