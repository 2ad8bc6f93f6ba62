//! In-memory implementation of the store contract.
//!
//! Intended for tests/dev. Transactions are clone-on-write: `transact`
//! clones the table set, runs the closure against the scratch copy, and
//! swaps it back only on `Ok`. The write lock is held for the whole
//! transaction, which serializes conflicting writers the same way row
//! locking would at a SQL backend.

use std::collections::BTreeMap;
use std::sync::RwLock;

use rust_decimal::Decimal;

use shopfloor_core::{
    EntryNoteId, ItemId, ProductionLineId, ProductionOrderId, SaleId, StockError, StockResult,
    SupplierId, UnitId,
};

use crate::rows::{
    BomLineRow, DocumentRef, EntryLineRow, EntryNoteRow, ItemRow, MovementRow, OrderLineRow,
    ProductionOrderRow, SaleLineRow, SaleRow, SupplierRow, TemplateLineRow, TemplateRow, UnitRow,
};
use crate::store::{StockStore, StorageError, StoreRead, StoreTx};

/// Measurement units guaranteed present by the schema bootstrap.
const DEFAULT_UNITS: [(&str, &str); 5] = [
    ("Gram", "g"),
    ("Kilogram", "kg"),
    ("Milliliter", "ml"),
    ("Liter", "L"),
    ("Unit", "un"),
];

#[derive(Debug, Default, Clone)]
struct Tables {
    units: BTreeMap<UnitId, UnitRow>,
    suppliers: BTreeMap<SupplierId, SupplierRow>,
    items: BTreeMap<ItemId, ItemRow>,
    bom: Vec<BomLineRow>,
    movements: Vec<MovementRow>,
    entry_notes: BTreeMap<EntryNoteId, EntryNoteRow>,
    entry_lines: Vec<EntryLineRow>,
    sales: BTreeMap<SaleId, SaleRow>,
    sale_lines: Vec<SaleLineRow>,
    orders: BTreeMap<ProductionOrderId, ProductionOrderRow>,
    order_lines: Vec<OrderLineRow>,
    templates: BTreeMap<ProductionLineId, TemplateRow>,
    template_lines: Vec<TemplateLineRow>,
}

impl Tables {
    fn require_item(&self, id: ItemId) -> Result<(), StorageError> {
        if self.items.contains_key(&id) {
            Ok(())
        } else {
            Err(StorageError::MissingReference("item".into()))
        }
    }

    fn require_document(&self, document: DocumentRef) -> Result<(), StorageError> {
        let present = match document {
            DocumentRef::EntryNote(id) => self.entry_notes.contains_key(&id),
            DocumentRef::Sale(id) => self.sales.contains_key(&id),
            DocumentRef::ProductionOrder(id) => self.orders.contains_key(&id),
        };
        if present {
            Ok(())
        } else {
            Err(StorageError::MissingReference("movement document".into()))
        }
    }

    fn unique_by<T, K: PartialEq>(
        lines: &[T],
        key: impl Fn(&T) -> K,
        constraint: &str,
    ) -> Result<(), StorageError> {
        for (i, line) in lines.iter().enumerate() {
            if lines[..i].iter().any(|other| key(other) == key(line)) {
                return Err(StorageError::UniqueViolation(constraint.to_string()));
            }
        }
        Ok(())
    }
}

impl StoreRead for Tables {
    fn units(&self) -> Vec<UnitRow> {
        self.units.values().cloned().collect()
    }

    fn unit(&self, id: UnitId) -> Option<UnitRow> {
        self.units.get(&id).cloned()
    }

    fn suppliers(&self) -> Vec<SupplierRow> {
        self.suppliers.values().cloned().collect()
    }

    fn supplier(&self, id: SupplierId) -> Option<SupplierRow> {
        self.suppliers.get(&id).cloned()
    }

    fn items(&self) -> Vec<ItemRow> {
        self.items.values().cloned().collect()
    }

    fn item(&self, id: ItemId) -> Option<ItemRow> {
        self.items.get(&id).cloned()
    }

    fn bom_of(&self, product_id: ItemId) -> Vec<BomLineRow> {
        self.bom
            .iter()
            .filter(|line| line.product_id == product_id)
            .cloned()
            .collect()
    }

    fn bom_using(&self, material_id: ItemId) -> Vec<BomLineRow> {
        self.bom
            .iter()
            .filter(|line| line.material_id == material_id)
            .cloned()
            .collect()
    }

    fn movements_of(&self, item_id: ItemId) -> Vec<MovementRow> {
        self.movements
            .iter()
            .filter(|m| m.item_id == item_id)
            .cloned()
            .collect()
    }

    fn movements_for_document(&self, document: DocumentRef) -> Vec<MovementRow> {
        self.movements
            .iter()
            .filter(|m| m.document == Some(document))
            .cloned()
            .collect()
    }

    fn entry_notes(&self) -> Vec<EntryNoteRow> {
        self.entry_notes.values().cloned().collect()
    }

    fn entry_note(&self, id: EntryNoteId) -> Option<EntryNoteRow> {
        self.entry_notes.get(&id).cloned()
    }

    fn entry_lines_of(&self, id: EntryNoteId) -> Vec<EntryLineRow> {
        self.entry_lines
            .iter()
            .filter(|line| line.note_id == id)
            .cloned()
            .collect()
    }

    fn sales(&self) -> Vec<SaleRow> {
        self.sales.values().cloned().collect()
    }

    fn sale(&self, id: SaleId) -> Option<SaleRow> {
        self.sales.get(&id).cloned()
    }

    fn sale_lines_of(&self, id: SaleId) -> Vec<SaleLineRow> {
        self.sale_lines
            .iter()
            .filter(|line| line.sale_id == id)
            .cloned()
            .collect()
    }

    fn orders(&self) -> Vec<ProductionOrderRow> {
        self.orders.values().cloned().collect()
    }

    fn order(&self, id: ProductionOrderId) -> Option<ProductionOrderRow> {
        self.orders.get(&id).cloned()
    }

    fn order_lines_of(&self, id: ProductionOrderId) -> Vec<OrderLineRow> {
        self.order_lines
            .iter()
            .filter(|line| line.order_id == id)
            .cloned()
            .collect()
    }

    fn order_lines_using(&self, product_id: ItemId) -> Vec<OrderLineRow> {
        self.order_lines
            .iter()
            .filter(|line| line.product_id == product_id)
            .cloned()
            .collect()
    }

    fn templates(&self) -> Vec<TemplateRow> {
        self.templates.values().cloned().collect()
    }

    fn template(&self, id: ProductionLineId) -> Option<TemplateRow> {
        self.templates.get(&id).cloned()
    }

    fn template_lines_of(&self, id: ProductionLineId) -> Vec<TemplateLineRow> {
        self.template_lines
            .iter()
            .filter(|line| line.template_id == id)
            .cloned()
            .collect()
    }
}

impl StoreTx for Tables {
    fn insert_supplier(&mut self, row: SupplierRow) -> Result<(), StorageError> {
        if self.suppliers.values().any(|s| s.legal_name == row.legal_name) {
            return Err(StorageError::UniqueViolation(format!(
                "supplier legal name '{}'",
                row.legal_name
            )));
        }
        if let Some(tax_id) = &row.tax_id {
            if self.suppliers.values().any(|s| s.tax_id.as_ref() == Some(tax_id)) {
                return Err(StorageError::UniqueViolation(format!(
                    "supplier tax id '{tax_id}'"
                )));
            }
        }
        self.suppliers.insert(row.id, row);
        Ok(())
    }

    fn update_supplier(&mut self, row: SupplierRow) -> Result<(), StorageError> {
        if !self.suppliers.contains_key(&row.id) {
            return Err(StorageError::MissingRow("supplier".into()));
        }
        if self
            .suppliers
            .values()
            .any(|s| s.id != row.id && s.legal_name == row.legal_name)
        {
            return Err(StorageError::UniqueViolation(format!(
                "supplier legal name '{}'",
                row.legal_name
            )));
        }
        if let Some(tax_id) = &row.tax_id {
            if self
                .suppliers
                .values()
                .any(|s| s.id != row.id && s.tax_id.as_ref() == Some(tax_id))
            {
                return Err(StorageError::UniqueViolation(format!(
                    "supplier tax id '{tax_id}'"
                )));
            }
        }
        self.suppliers.insert(row.id, row);
        Ok(())
    }

    fn delete_supplier(&mut self, id: SupplierId) -> Result<(), StorageError> {
        if !self.suppliers.contains_key(&id) {
            return Err(StorageError::MissingRow("supplier".into()));
        }
        if self.items.values().any(|i| i.default_supplier == Some(id)) {
            return Err(StorageError::RestrictViolation(
                "supplier is the default supplier of an item".into(),
            ));
        }
        if self.entry_lines.iter().any(|l| l.supplier_id == id) {
            return Err(StorageError::RestrictViolation(
                "supplier appears on entry note lines".into(),
            ));
        }
        self.suppliers.remove(&id);
        Ok(())
    }

    fn insert_item(&mut self, row: ItemRow) -> Result<(), StorageError> {
        if self.items.values().any(|i| i.description == row.description) {
            return Err(StorageError::UniqueViolation(format!(
                "item description '{}'",
                row.description
            )));
        }
        if !self.units.contains_key(&row.unit_id) {
            return Err(StorageError::MissingReference("unit".into()));
        }
        if let Some(supplier) = row.default_supplier {
            if !self.suppliers.contains_key(&supplier) {
                return Err(StorageError::MissingReference("supplier".into()));
            }
        }
        self.items.insert(row.id, row);
        Ok(())
    }

    fn update_item(&mut self, row: ItemRow) -> Result<(), StorageError> {
        if !self.items.contains_key(&row.id) {
            return Err(StorageError::MissingRow("item".into()));
        }
        if self
            .items
            .values()
            .any(|i| i.id != row.id && i.description == row.description)
        {
            return Err(StorageError::UniqueViolation(format!(
                "item description '{}'",
                row.description
            )));
        }
        if !self.units.contains_key(&row.unit_id) {
            return Err(StorageError::MissingReference("unit".into()));
        }
        if let Some(supplier) = row.default_supplier {
            if !self.suppliers.contains_key(&supplier) {
                return Err(StorageError::MissingReference("supplier".into()));
            }
        }
        self.items.insert(row.id, row);
        Ok(())
    }

    fn update_item_stock(
        &mut self,
        id: ItemId,
        balance: Decimal,
        average_cost: Decimal,
    ) -> Result<(), StorageError> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| StorageError::MissingRow("item".into()))?;
        item.balance = balance;
        item.average_cost = average_cost;
        Ok(())
    }

    fn delete_item(&mut self, id: ItemId) -> Result<(), StorageError> {
        if !self.items.contains_key(&id) {
            return Err(StorageError::MissingRow("item".into()));
        }
        if self
            .bom
            .iter()
            .any(|l| l.material_id == id || l.product_id == id)
        {
            return Err(StorageError::RestrictViolation(
                "item is referenced by bill-of-materials lines".into(),
            ));
        }
        if self.order_lines.iter().any(|l| l.product_id == id) {
            return Err(StorageError::RestrictViolation(
                "item is referenced by production order lines".into(),
            ));
        }
        if self.entry_lines.iter().any(|l| l.material_id == id) {
            return Err(StorageError::RestrictViolation(
                "item is referenced by entry note lines".into(),
            ));
        }
        if self.sale_lines.iter().any(|l| l.product_id == id) {
            return Err(StorageError::RestrictViolation(
                "item is referenced by sale lines".into(),
            ));
        }
        if self.template_lines.iter().any(|l| l.product_id == id) {
            return Err(StorageError::RestrictViolation(
                "item is referenced by production line template lines".into(),
            ));
        }
        if self.movements.iter().any(|m| m.item_id == id) {
            return Err(StorageError::RestrictViolation(
                "item is referenced by stock movements".into(),
            ));
        }
        self.items.remove(&id);
        Ok(())
    }

    fn put_bom(
        &mut self,
        product_id: ItemId,
        lines: Vec<BomLineRow>,
    ) -> Result<(), StorageError> {
        self.require_item(product_id)?;
        for line in &lines {
            self.require_item(line.material_id)?;
        }
        Tables::unique_by(&lines, |l| l.material_id, "bom (product, material) pair")?;
        self.bom.retain(|l| l.product_id != product_id);
        self.bom.extend(lines);
        Ok(())
    }

    fn append_movement(&mut self, row: MovementRow) -> Result<(), StorageError> {
        self.require_item(row.item_id)?;
        if let Some(document) = row.document {
            self.require_document(document)?;
        }
        self.movements.push(row);
        Ok(())
    }

    fn insert_entry_note(&mut self, row: EntryNoteRow) -> Result<(), StorageError> {
        self.entry_notes.insert(row.id, row);
        Ok(())
    }

    fn update_entry_note(&mut self, row: EntryNoteRow) -> Result<(), StorageError> {
        if !self.entry_notes.contains_key(&row.id) {
            return Err(StorageError::MissingRow("entry note".into()));
        }
        self.entry_notes.insert(row.id, row);
        Ok(())
    }

    fn put_entry_lines(
        &mut self,
        note_id: EntryNoteId,
        lines: Vec<EntryLineRow>,
    ) -> Result<(), StorageError> {
        if !self.entry_notes.contains_key(&note_id) {
            return Err(StorageError::MissingReference("entry note".into()));
        }
        for line in &lines {
            self.require_item(line.material_id)?;
            if !self.suppliers.contains_key(&line.supplier_id) {
                return Err(StorageError::MissingReference("supplier".into()));
            }
        }
        Tables::unique_by(&lines, |l| l.material_id, "entry (note, material) pair")?;
        self.entry_lines.retain(|l| l.note_id != note_id);
        self.entry_lines.extend(lines);
        Ok(())
    }

    fn insert_sale(&mut self, row: SaleRow) -> Result<(), StorageError> {
        self.sales.insert(row.id, row);
        Ok(())
    }

    fn update_sale(&mut self, row: SaleRow) -> Result<(), StorageError> {
        if !self.sales.contains_key(&row.id) {
            return Err(StorageError::MissingRow("sale".into()));
        }
        self.sales.insert(row.id, row);
        Ok(())
    }

    fn put_sale_lines(
        &mut self,
        sale_id: SaleId,
        lines: Vec<SaleLineRow>,
    ) -> Result<(), StorageError> {
        if !self.sales.contains_key(&sale_id) {
            return Err(StorageError::MissingReference("sale".into()));
        }
        for line in &lines {
            self.require_item(line.product_id)?;
        }
        Tables::unique_by(&lines, |l| l.product_id, "sale (sale, product) pair")?;
        self.sale_lines.retain(|l| l.sale_id != sale_id);
        self.sale_lines.extend(lines);
        Ok(())
    }

    fn insert_order(&mut self, row: ProductionOrderRow) -> Result<(), StorageError> {
        if let Some(template_id) = row.template_id {
            if !self.templates.contains_key(&template_id) {
                return Err(StorageError::MissingReference(
                    "production line template".into(),
                ));
            }
        }
        self.orders.insert(row.id, row);
        Ok(())
    }

    fn update_order(&mut self, row: ProductionOrderRow) -> Result<(), StorageError> {
        if !self.orders.contains_key(&row.id) {
            return Err(StorageError::MissingRow("production order".into()));
        }
        self.orders.insert(row.id, row);
        Ok(())
    }

    fn put_order_lines(
        &mut self,
        order_id: ProductionOrderId,
        lines: Vec<OrderLineRow>,
    ) -> Result<(), StorageError> {
        if !self.orders.contains_key(&order_id) {
            return Err(StorageError::MissingReference("production order".into()));
        }
        for line in &lines {
            self.require_item(line.product_id)?;
        }
        Tables::unique_by(&lines, |l| l.product_id, "order (order, product) pair")?;
        self.order_lines.retain(|l| l.order_id != order_id);
        self.order_lines.extend(lines);
        Ok(())
    }

    fn delete_order(&mut self, id: ProductionOrderId) -> Result<(), StorageError> {
        if !self.orders.contains_key(&id) {
            return Err(StorageError::MissingRow("production order".into()));
        }
        if !self
            .movements_for_document(DocumentRef::ProductionOrder(id))
            .is_empty()
        {
            return Err(StorageError::RestrictViolation(
                "production order is referenced by stock movements".into(),
            ));
        }
        self.order_lines.retain(|l| l.order_id != id);
        self.orders.remove(&id);
        Ok(())
    }

    fn insert_template(&mut self, row: TemplateRow) -> Result<(), StorageError> {
        if self.templates.values().any(|t| t.name == row.name) {
            return Err(StorageError::UniqueViolation(format!(
                "production line name '{}'",
                row.name
            )));
        }
        self.templates.insert(row.id, row);
        Ok(())
    }

    fn update_template(&mut self, row: TemplateRow) -> Result<(), StorageError> {
        if !self.templates.contains_key(&row.id) {
            return Err(StorageError::MissingRow("production line template".into()));
        }
        if self
            .templates
            .values()
            .any(|t| t.id != row.id && t.name == row.name)
        {
            return Err(StorageError::UniqueViolation(format!(
                "production line name '{}'",
                row.name
            )));
        }
        self.templates.insert(row.id, row);
        Ok(())
    }

    fn put_template_lines(
        &mut self,
        template_id: ProductionLineId,
        lines: Vec<TemplateLineRow>,
    ) -> Result<(), StorageError> {
        if !self.templates.contains_key(&template_id) {
            return Err(StorageError::MissingReference(
                "production line template".into(),
            ));
        }
        for line in &lines {
            self.require_item(line.product_id)?;
        }
        Tables::unique_by(&lines, |l| l.product_id, "template (template, product) pair")?;
        self.template_lines.retain(|l| l.template_id != template_id);
        self.template_lines.extend(lines);
        Ok(())
    }

    fn delete_template(&mut self, id: ProductionLineId) -> Result<(), StorageError> {
        if !self.templates.contains_key(&id) {
            return Err(StorageError::MissingRow("production line template".into()));
        }
        // Lines cascade; orders keep their history with the reference cleared.
        self.template_lines.retain(|l| l.template_id != id);
        for order in self.orders.values_mut() {
            if order.template_id == Some(id) {
                order.template_id = None;
            }
        }
        self.templates.remove(&id);
        Ok(())
    }
}

/// In-memory transactional store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with the default measurement units.
    pub fn with_default_units() -> Self {
        let store = Self::new();
        {
            let mut tables = store
                .tables
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for (name, abbreviation) in DEFAULT_UNITS {
                let id = UnitId::new();
                tables.units.insert(
                    id,
                    UnitRow {
                        id,
                        name: name.to_string(),
                        abbreviation: abbreviation.to_string(),
                    },
                );
            }
        }
        store
    }
}

impl StockStore for MemoryStore {
    fn transact<T, F>(&self, f: F) -> StockResult<T>
    where
        F: FnOnce(&mut dyn StoreTx) -> StockResult<T>,
    {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| StockError::storage("memory store lock poisoned"))?;
        let mut scratch = guard.clone();
        let out = f(&mut scratch)?;
        // Commit by swap; an early `?` above dropped the scratch copy instead.
        *guard = scratch;
        Ok(out)
    }

    fn read<T, F>(&self, f: F) -> StockResult<T>
    where
        F: FnOnce(&dyn StoreRead) -> StockResult<T>,
    {
        let guard = self
            .tables
            .read()
            .map_err(|_| StockError::storage("memory store lock poisoned"))?;
        f(&*guard)
    }
}
