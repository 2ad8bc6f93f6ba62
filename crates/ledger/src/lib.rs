//! `shopfloor-ledger` — the transactional stock ledger and costing engine.
//!
//! The only writer of item balances, average costs, and movement rows.
//! Document lifecycles call the transaction-scoped posting primitives from
//! inside their own transactions; standalone postings (manual entries,
//! production material issues) go through the [`StockLedger`] service.

pub mod costing;
pub mod ledger;

pub use costing::{CostedReceipt, apply_receipt};
pub use ledger::{StockLedger, post_outflow, post_receipt};
