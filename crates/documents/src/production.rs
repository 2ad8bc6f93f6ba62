//! Production order lifecycle.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;

use shopfloor_catalog::cost_per_unit;
use shopfloor_core::{ItemId, ProductionLineId, ProductionOrderId, StockError, StockResult};
use shopfloor_store::{
    OrderAction, OrderLineRow, OrderStatus, ProductionOrderRow, StockStore, StoreTx,
    TemplateStatus,
};

/// Header input for a production order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    /// Human-readable number; generated from the order id when absent.
    pub number: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// One planned line: a product and the quantity to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLineDraft {
    pub product_id: ItemId,
    pub quantity: Decimal,
}

/// Line joined for display, carrying the cost snapshot taken when the line
/// was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineDetail {
    pub product_id: ItemId,
    pub description: String,
    pub unit_abbreviation: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

/// Header plus joined lines and the derived figures callers display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub order: ProductionOrderRow,
    pub lines: Vec<OrderLineDetail>,
    pub planned_quantity: Decimal,
    /// `None` when the order is not completed or the planned total is zero.
    pub yield_percent: Option<Decimal>,
}

/// Search arms for the order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSearch {
    All,
    ById(ProductionOrderId),
    /// Order number substring.
    ByNumber(String),
    ByStatus(OrderStatus),
}

/// Yield of a completed order: produced over planned, as a percentage.
/// Undefined (`None`) when nothing was planned.
pub fn yield_percent(produced: Decimal, planned: Decimal) -> Option<Decimal> {
    if planned > Decimal::ZERO {
        Some(produced / planned * Decimal::ONE_HUNDRED)
    } else {
        None
    }
}

/// Production order service over an injected store handle.
pub struct ProductionOrders<S> {
    store: S,
}

impl<S: StockStore> ProductionOrders<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an in-progress order. Lines are priced by exploding each
    /// product's BOM at this moment; the snapshot is not recomputed later.
    pub fn create(
        &self,
        draft: OrderDraft,
        lines: Vec<PlannedLineDraft>,
    ) -> StockResult<ProductionOrderRow> {
        let order = self.store.transact(|tx| {
            Self::create_in_tx(tx, draft.number, draft.due_date, None, &lines)
        })?;
        info!(order = %order.id, number = %order.number, "production order created");
        Ok(order)
    }

    /// Replace header fields and the line set; only while in progress.
    pub fn update(
        &self,
        id: ProductionOrderId,
        draft: OrderDraft,
        lines: Vec<PlannedLineDraft>,
    ) -> StockResult<ProductionOrderRow> {
        self.store.transact(|tx| {
            let mut order = Self::editable_order(tx, id)?;
            if let Some(number) = draft.number {
                order.number = number;
            }
            order.due_date = draft.due_date;
            tx.update_order(order.clone())?;
            let rows = Self::priced_lines(tx, id, &lines)?;
            tx.put_order_lines(id, rows)?;
            Ok(order)
        })
    }

    pub fn get(&self, id: ProductionOrderId) -> StockResult<OrderDetail> {
        self.store.read(|r| {
            let order = r
                .order(id)
                .ok_or_else(|| StockError::not_found("production order"))?;
            let mut lines = Vec::new();
            let mut planned_quantity = Decimal::ZERO;
            for line in r.order_lines_of(id) {
                let product = r
                    .item(line.product_id)
                    .ok_or_else(|| StockError::not_found("product"))?;
                let unit_abbreviation = r
                    .unit(product.unit_id)
                    .map(|u| u.abbreviation)
                    .unwrap_or_default();
                planned_quantity += line.quantity;
                lines.push(OrderLineDetail {
                    product_id: line.product_id,
                    description: product.description,
                    unit_abbreviation,
                    quantity: line.quantity,
                    unit_cost: line.unit_cost,
                });
            }
            let yield_pct = order
                .produced_quantity
                .and_then(|produced| yield_percent(produced, planned_quantity));
            Ok(OrderDetail {
                order,
                lines,
                planned_quantity,
                yield_percent: yield_pct,
            })
        })
    }

    pub fn list(&self, search: OrderSearch) -> StockResult<Vec<ProductionOrderRow>> {
        self.store.read(|r| {
            let orders = r.orders().into_iter();
            let matches: Vec<ProductionOrderRow> = match &search {
                OrderSearch::All => orders.collect(),
                OrderSearch::ById(id) => orders.filter(|o| o.id == *id).collect(),
                OrderSearch::ByNumber(term) => {
                    orders.filter(|o| o.number.contains(term)).collect()
                }
                OrderSearch::ByStatus(status) => {
                    orders.filter(|o| o.status == *status).collect()
                }
            };
            Ok(matches)
        })
    }

    /// Complete the order: record the produced quantity and the total cost
    /// (Σ line quantity × snapshot cost). Deliberately posts no material
    /// consumption; issuing materials is an explicit ledger call.
    pub fn finalize(
        &self,
        id: ProductionOrderId,
        produced_quantity: Decimal,
    ) -> StockResult<ProductionOrderRow> {
        if produced_quantity < Decimal::ZERO {
            return Err(StockError::validation("produced quantity cannot be negative"));
        }
        let order = self.store.transact(|tx| {
            let mut order = tx
                .order(id)
                .ok_or_else(|| StockError::not_found("production order"))?;
            if order.status != OrderStatus::InProgress {
                return Err(StockError::invalid_state(
                    "only in-progress production orders can be finalized",
                ));
            }
            let lines = tx.order_lines_of(id);
            if lines.is_empty() {
                return Err(StockError::EmptyDocument);
            }
            let total_cost: Decimal = lines.iter().map(|l| l.quantity * l.unit_cost).sum();
            order.produced_quantity = Some(produced_quantity);
            order.total_cost = Some(total_cost);
            order.status = OrderStatus::Completed;
            tx.update_order(order.clone())?;
            Ok(order)
        })?;
        info!(order = %id, produced = %produced_quantity, "production order completed");
        Ok(order)
    }

    /// Cancel an in-progress order. A pure status flip: no movements were
    /// recorded while in progress, so there is nothing to reverse.
    pub fn cancel(&self, id: ProductionOrderId) -> StockResult<ProductionOrderRow> {
        self.store.transact(|tx| {
            let mut order = tx
                .order(id)
                .ok_or_else(|| StockError::not_found("production order"))?;
            if order.status != OrderStatus::InProgress {
                return Err(StockError::invalid_state(
                    "only in-progress production orders can be cancelled",
                ));
            }
            order.status = OrderStatus::Cancelled;
            tx.update_order(order.clone())?;
            Ok(order)
        })
    }

    /// Reopen a cancelled order; its lines are intact.
    pub fn reopen(&self, id: ProductionOrderId) -> StockResult<ProductionOrderRow> {
        self.store.transact(|tx| {
            let mut order = tx
                .order(id)
                .ok_or_else(|| StockError::not_found("production order"))?;
            if order.status != OrderStatus::Cancelled {
                return Err(StockError::invalid_state(
                    "only cancelled production orders can be reopened",
                ));
            }
            order.status = OrderStatus::InProgress;
            tx.update_order(order.clone())?;
            Ok(order)
        })
    }

    /// Remove a completed or cancelled order together with its lines.
    pub fn delete(&self, id: ProductionOrderId) -> StockResult<()> {
        self.store.transact(|tx| {
            let order = tx
                .order(id)
                .ok_or_else(|| StockError::not_found("production order"))?;
            if order.status == OrderStatus::InProgress {
                return Err(StockError::invalid_state(
                    "an in-progress production order cannot be deleted",
                ));
            }
            tx.delete_order(id)?;
            Ok(())
        })?;
        info!(order = %id, "production order deleted");
        Ok(())
    }

    /// The action set a presentation layer may offer for this order.
    pub fn available_actions(&self, id: ProductionOrderId) -> StockResult<&'static [OrderAction]> {
        self.store.read(|r| {
            let order = r
                .order(id)
                .ok_or_else(|| StockError::not_found("production order"))?;
            Ok(order.status.available_actions())
        })
    }

    /// Instantiate an order from a production line template: one line per
    /// template line, quantities preserved, costs snapshotted now. No ledger
    /// effects.
    pub fn create_from_template(
        &self,
        template_id: ProductionLineId,
    ) -> StockResult<ProductionOrderRow> {
        let order = self.store.transact(|tx| {
            let template = tx
                .template(template_id)
                .ok_or_else(|| StockError::not_found("production line template"))?;
            if template.status == TemplateStatus::Inactive {
                return Err(StockError::invalid_state(
                    "production line template is inactive",
                ));
            }
            let template_lines = tx.template_lines_of(template_id);
            if template_lines.is_empty() {
                return Err(StockError::EmptyTemplate);
            }
            let planned: Vec<PlannedLineDraft> = template_lines
                .iter()
                .map(|l| PlannedLineDraft {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect();
            Self::create_in_tx(tx, None, None, Some(template_id), &planned)
        })?;
        info!(order = %order.id, template = %template_id, "production order instantiated from template");
        Ok(order)
    }

    fn create_in_tx(
        tx: &mut dyn StoreTx,
        number: Option<String>,
        due_date: Option<NaiveDate>,
        template_id: Option<ProductionLineId>,
        lines: &[PlannedLineDraft],
    ) -> StockResult<ProductionOrderRow> {
        if lines.is_empty() {
            return Err(StockError::validation(
                "a production order needs at least one line",
            ));
        }
        let id = ProductionOrderId::new();
        let number = number.unwrap_or_else(|| Self::generated_number(id));
        let order = ProductionOrderRow {
            id,
            number,
            created_on: Utc::now().date_naive(),
            due_date,
            status: OrderStatus::InProgress,
            produced_quantity: None,
            total_cost: None,
            template_id,
        };
        tx.insert_order(order.clone())?;
        let rows = Self::priced_lines(tx, id, lines)?;
        tx.put_order_lines(id, rows)?;
        Ok(order)
    }

    fn priced_lines(
        tx: &mut dyn StoreTx,
        id: ProductionOrderId,
        lines: &[PlannedLineDraft],
    ) -> StockResult<Vec<OrderLineRow>> {
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let product = tx
                .item(line.product_id)
                .ok_or_else(|| StockError::not_found("product"))?;
            if !product.kind.stocks_as_product() {
                return Err(StockError::validation(format!(
                    "'{}' is not a product and cannot be produced",
                    product.description
                )));
            }
            if line.quantity <= Decimal::ZERO {
                return Err(StockError::validation("line quantity must be positive"));
            }
            let unit_cost = cost_per_unit(tx, line.product_id)?;
            rows.push(OrderLineRow {
                order_id: id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_cost,
            });
        }
        Ok(rows)
    }

    fn editable_order(
        tx: &mut dyn StoreTx,
        id: ProductionOrderId,
    ) -> StockResult<ProductionOrderRow> {
        let order = tx
            .order(id)
            .ok_or_else(|| StockError::not_found("production order"))?;
        if !order.status.is_editable() {
            return Err(StockError::invalid_state(
                "only in-progress production orders can be edited",
            ));
        }
        Ok(order)
    }

    fn generated_number(id: ProductionOrderId) -> String {
        let hex = id.as_uuid().simple().to_string();
        format!("OP-{}", &hex[..8])
    }
}
