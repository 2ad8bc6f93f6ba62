//! Typed per-entity rows and closed status enumerations.
//!
//! One struct per table, with named, typed fields. Services re-read these
//! rows inside each operation; nothing here is an in-memory authoritative
//! copy of store state.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfloor_core::{
    EntryNoteId, ItemId, MovementId, ProductionLineId, ProductionOrderId, SaleId, SupplierId,
    UnitId,
};

/// How an item participates in manufacturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Material,
    Product,
    Both,
}

impl ItemKind {
    /// Items of this kind may appear as BOM materials and receive goods.
    pub fn stocks_as_material(self) -> bool {
        matches!(self, ItemKind::Material | ItemKind::Both)
    }

    /// Items of this kind may appear on production order and sale lines.
    pub fn stocks_as_product(self) -> bool {
        matches!(self, ItemKind::Product | ItemKind::Both)
    }
}

/// Measurement unit referenced by items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRow {
    pub id: UnitId,
    pub name: String,
    pub abbreviation: String,
}

/// Supplier directory status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Active,
    Inactive,
}

/// Supplier directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRow {
    pub id: SupplierId,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: Option<String>,
    pub status: SupplierStatus,
}

/// Catalog item. `balance` and `average_cost` are written exclusively by the
/// stock ledger's balance/cost update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: ItemId,
    pub description: String,
    pub kind: ItemKind,
    pub unit_id: UnitId,
    pub internal_code: Option<String>,
    pub default_supplier: Option<SupplierId>,
    pub balance: Decimal,
    pub average_cost: Decimal,
}

/// One bill-of-materials line: `quantity` of `material_id` per unit of
/// `product_id`. The (product, material) pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLineRow {
    pub product_id: ItemId,
    pub material_id: ItemId,
    pub quantity: Decimal,
}

/// Origin of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Manual material entry outside any document.
    ManualEntry,
    /// Receipt posted by finalizing an entry note.
    NoteReceipt,
    /// Production-related leg (material issue or output).
    Production,
    /// Exit posted by finalizing a sale.
    SaleExit,
}

/// Reference from a movement back to the document that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "document", content = "id")]
pub enum DocumentRef {
    EntryNote(EntryNoteId),
    Sale(SaleId),
    ProductionOrder(ProductionOrderId),
}

/// One immutable ledger entry. Never updated or deleted; per item, the sum
/// of `quantity` over all movements equals the item's current balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRow {
    pub id: MovementId,
    pub item_id: ItemId,
    pub kind: MovementKind,
    /// Signed: positive for receipts, negative for outflows.
    pub quantity: Decimal,
    /// None on production consumption legs.
    pub unit_value: Option<Decimal>,
    pub document: Option<DocumentRef>,
    pub at: DateTime<Utc>,
}

/// Shared two-state machine for entry notes and sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Open,
    Finalized,
}

/// Supplier receipt note header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryNoteRow {
    pub id: EntryNoteId,
    pub receipt_date: NaiveDate,
    pub entered_at: DateTime<Utc>,
    pub note_number: Option<String>,
    pub observation: Option<String>,
    /// Recomputed and stored on finalize.
    pub total: Option<Decimal>,
    pub status: DocumentStatus,
}

/// Entry note line; the (note, material) pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLineRow {
    pub note_id: EntryNoteId,
    pub material_id: ItemId,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub supplier_id: SupplierId,
}

/// Sale header. The total is maintained on create/update from the line set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRow {
    pub id: SaleId,
    pub sale_date: NaiveDate,
    pub observation: Option<String>,
    pub total: Decimal,
    pub status: DocumentStatus,
}

/// Sale line; the (sale, product) pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLineRow {
    pub sale_id: SaleId,
    pub product_id: ItemId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Production order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    InProgress,
    Completed,
    Cancelled,
}

/// Actions a caller may offer for an order in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Save,
    Finalize,
    Cancel,
    Delete,
    Reopen,
}

impl OrderStatus {
    /// The action set exposed to presentation layers for this status.
    pub fn available_actions(self) -> &'static [OrderAction] {
        match self {
            OrderStatus::InProgress => {
                &[OrderAction::Save, OrderAction::Finalize, OrderAction::Cancel]
            }
            OrderStatus::Cancelled => &[OrderAction::Delete, OrderAction::Reopen],
            OrderStatus::Completed => &[OrderAction::Delete],
        }
    }

    /// Header and lines are editable only while in progress.
    pub fn is_editable(self) -> bool {
        matches!(self, OrderStatus::InProgress)
    }
}

/// Production order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOrderRow {
    pub id: ProductionOrderId,
    /// Human-readable number, generated when the caller does not supply one.
    pub number: String,
    pub created_on: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: OrderStatus,
    /// Recorded on completion.
    pub produced_quantity: Option<Decimal>,
    /// Recorded on completion: Σ line quantity × line unit-cost snapshot.
    pub total_cost: Option<Decimal>,
    pub template_id: Option<ProductionLineId>,
}

/// Production order line; the (order, product) pair is unique. `unit_cost`
/// is the BOM explosion snapshot taken when the line was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRow {
    pub order_id: ProductionOrderId,
    pub product_id: ItemId,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

/// Production line template status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Active,
    Inactive,
}

/// Production line template header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRow {
    pub id: ProductionLineId,
    pub name: String,
    pub description: Option<String>,
    pub status: TemplateStatus,
}

/// Template line; the (template, product) pair is unique. Cascade-deleted
/// with the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLineRow {
    pub template_id: ProductionLineId,
    pub product_id: ItemId,
    pub quantity: Decimal,
}
