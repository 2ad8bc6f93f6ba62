//! Bill-of-materials access and the costing rollup.

use rust_decimal::Decimal;
use tracing::info;

use shopfloor_core::{ItemId, StockError, StockResult};
use shopfloor_store::{BomLineRow, StockStore, StoreRead};

/// One BOM component joined with its material's description, unit, and
/// current average cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomComponent {
    pub material_id: ItemId,
    pub description: String,
    pub quantity: Decimal,
    pub unit_abbreviation: String,
    pub average_cost: Decimal,
}

/// Input for one BOM line on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomLineDraft {
    pub material_id: ItemId,
    pub quantity: Decimal,
}

/// Reject a line that points a product at itself or at an item that cannot
/// serve as a material.
pub fn validate_bom_line<R: StoreRead + ?Sized>(
    store: &R,
    product_id: ItemId,
    material_id: ItemId,
) -> StockResult<()> {
    if material_id == product_id {
        return Err(StockError::invalid_bom_line(
            "a product cannot be a component of itself",
        ));
    }
    let material = store
        .item(material_id)
        .ok_or_else(|| StockError::not_found("material"))?;
    if !material.kind.stocks_as_material() {
        return Err(StockError::invalid_bom_line(format!(
            "'{}' is a product and cannot be used as a material",
            material.description
        )));
    }
    Ok(())
}

/// Cost to produce one unit of `product_id`: Σ line quantity × material
/// average cost. Order lines snapshot this at the moment they are written.
pub fn cost_per_unit<R: StoreRead + ?Sized>(
    store: &R,
    product_id: ItemId,
) -> StockResult<Decimal> {
    if store.item(product_id).is_none() {
        return Err(StockError::not_found("product"));
    }
    let mut total = Decimal::ZERO;
    for line in store.bom_of(product_id) {
        let material = store
            .item(line.material_id)
            .ok_or_else(|| StockError::not_found("material"))?;
        total += line.quantity * material.average_cost;
    }
    Ok(total)
}

/// BOM service over an injected store handle.
pub struct BomCatalog<S> {
    store: S,
}

impl<S: StockStore> BomCatalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The product's components in persisted order, joined for display.
    pub fn get_bom(&self, product_id: ItemId) -> StockResult<Vec<BomComponent>> {
        self.store.read(|r| {
            if r.item(product_id).is_none() {
                return Err(StockError::not_found("product"));
            }
            let mut components = Vec::new();
            for line in r.bom_of(product_id) {
                let material = r
                    .item(line.material_id)
                    .ok_or_else(|| StockError::not_found("material"))?;
                let unit_abbreviation = r
                    .unit(material.unit_id)
                    .map(|u| u.abbreviation)
                    .unwrap_or_default();
                components.push(BomComponent {
                    material_id: material.id,
                    description: material.description,
                    quantity: line.quantity,
                    unit_abbreviation,
                    average_cost: material.average_cost,
                });
            }
            Ok(components)
        })
    }

    pub fn cost_per_unit(&self, product_id: ItemId) -> StockResult<Decimal> {
        self.store.read(|r| cost_per_unit(r, product_id))
    }

    pub fn validate_line(&self, product_id: ItemId, material_id: ItemId) -> StockResult<()> {
        self.store
            .read(|r| validate_bom_line(r, product_id, material_id))
    }

    /// Replace the product's whole line set: delete-all-then-insert-all in
    /// one transaction, each incoming line validated first.
    pub fn replace_bom(&self, product_id: ItemId, lines: Vec<BomLineDraft>) -> StockResult<()> {
        self.store.transact(|tx| {
            if tx.item(product_id).is_none() {
                return Err(StockError::not_found("product"));
            }
            let mut rows = Vec::with_capacity(lines.len());
            for line in &lines {
                validate_bom_line(tx, product_id, line.material_id)?;
                if line.quantity <= Decimal::ZERO {
                    return Err(StockError::validation("bom line quantity must be positive"));
                }
                rows.push(BomLineRow {
                    product_id,
                    material_id: line.material_id,
                    quantity: line.quantity,
                });
            }
            tx.put_bom(product_id, rows)?;
            Ok(())
        })?;
        info!(product = %product_id, lines = lines.len(), "bill of materials replaced");
        Ok(())
    }
}
