//! Stock ledger: balance/cost persistence plus the append-only movement log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use shopfloor_core::{ItemId, MovementId, ProductionOrderId, StockError, StockResult};
use shopfloor_store::{DocumentRef, MovementKind, MovementRow, StockStore, StoreTx};

use crate::costing;

fn kind_for(document: Option<DocumentRef>) -> MovementKind {
    match document {
        None => MovementKind::ManualEntry,
        Some(DocumentRef::EntryNote(_)) => MovementKind::NoteReceipt,
        Some(DocumentRef::Sale(_)) => MovementKind::SaleExit,
        Some(DocumentRef::ProductionOrder(_)) => MovementKind::Production,
    }
}

/// Post a receiving movement inside the caller's transaction.
///
/// Reads the item's current balance/cost, applies the costing engine,
/// persists the new pair, and appends a positive-quantity movement. The
/// caller's transaction makes this atomic with its sibling line postings.
pub fn post_receipt(
    tx: &mut dyn StoreTx,
    item_id: ItemId,
    quantity: Decimal,
    unit_cost: Decimal,
    document: Option<DocumentRef>,
    at: DateTime<Utc>,
) -> StockResult<MovementRow> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::validation("receipt quantity must be positive"));
    }
    if unit_cost < Decimal::ZERO {
        return Err(StockError::validation("unit cost cannot be negative"));
    }
    let item = tx.item(item_id).ok_or_else(|| StockError::not_found("item"))?;
    let costed = costing::apply_receipt(item.balance, item.average_cost, quantity, unit_cost);
    tx.update_item_stock(item_id, costed.new_balance, costed.new_average_cost)?;
    let movement = MovementRow {
        id: MovementId::new(),
        item_id,
        kind: kind_for(document),
        quantity,
        unit_value: Some(unit_cost),
        document,
        at,
    };
    tx.append_movement(movement.clone())?;
    debug!(item = %item_id, qty = %quantity, balance = %costed.new_balance, "receipt posted");
    Ok(movement)
}

/// Post an outgoing movement inside the caller's transaction.
///
/// Persists `balance - quantity` with no floor at zero (a negative balance is
/// a caller-level business concern, not rejected here) and appends a
/// negative-quantity movement. Average cost is left untouched. `unit_value`
/// is recorded for history only and is `None` on production consumption legs.
pub fn post_outflow(
    tx: &mut dyn StoreTx,
    item_id: ItemId,
    quantity: Decimal,
    unit_value: Option<Decimal>,
    document: Option<DocumentRef>,
    at: DateTime<Utc>,
) -> StockResult<MovementRow> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::validation("outflow quantity must be positive"));
    }
    let item = tx.item(item_id).ok_or_else(|| StockError::not_found("item"))?;
    tx.update_item_stock(item_id, item.balance - quantity, item.average_cost)?;
    let movement = MovementRow {
        id: MovementId::new(),
        item_id,
        kind: kind_for(document),
        quantity: -quantity,
        unit_value,
        document,
        at,
    };
    tx.append_movement(movement.clone())?;
    debug!(item = %item_id, qty = %quantity, balance = %(item.balance - quantity), "outflow posted");
    Ok(movement)
}

/// Store-injected ledger service for standalone postings and audits.
pub struct StockLedger<S> {
    store: S,
}

impl<S: StockStore> StockLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a standalone receipt in its own transaction.
    pub fn record_receipt(
        &self,
        item_id: ItemId,
        quantity: Decimal,
        unit_cost: Decimal,
        document: Option<DocumentRef>,
        at: DateTime<Utc>,
    ) -> StockResult<MovementRow> {
        self.store
            .transact(|tx| post_receipt(tx, item_id, quantity, unit_cost, document, at))
    }

    /// Record a standalone outflow in its own transaction.
    pub fn record_outflow(
        &self,
        item_id: ItemId,
        quantity: Decimal,
        unit_value: Option<Decimal>,
        document: Option<DocumentRef>,
        at: DateTime<Utc>,
    ) -> StockResult<MovementRow> {
        self.store
            .transact(|tx| post_outflow(tx, item_id, quantity, unit_value, document, at))
    }

    /// Manual material entry: a receipt outside any document, priced by the
    /// total value paid. Only items stocked as materials accept it.
    pub fn record_manual_entry(
        &self,
        item_id: ItemId,
        quantity: Decimal,
        total_value: Decimal,
        at: DateTime<Utc>,
    ) -> StockResult<MovementRow> {
        self.store.transact(|tx| {
            let item = tx.item(item_id).ok_or_else(|| StockError::not_found("item"))?;
            if !item.kind.stocks_as_material() {
                return Err(StockError::validation(
                    "only items of kind material or both accept a manual entry",
                ));
            }
            if quantity <= Decimal::ZERO {
                return Err(StockError::validation("receipt quantity must be positive"));
            }
            let unit_cost = total_value / quantity;
            post_receipt(tx, item_id, quantity, unit_cost, None, at)
        })
    }

    /// Material consumption for a production order, layered on the outflow
    /// primitive. Never invoked implicitly by order finalization.
    pub fn record_production_issue(
        &self,
        order_id: ProductionOrderId,
        item_id: ItemId,
        quantity: Decimal,
        at: DateTime<Utc>,
    ) -> StockResult<MovementRow> {
        self.store.transact(|tx| {
            if tx.order(order_id).is_none() {
                return Err(StockError::not_found("production order"));
            }
            post_outflow(
                tx,
                item_id,
                quantity,
                None,
                Some(DocumentRef::ProductionOrder(order_id)),
                at,
            )
        })
    }

    /// Movement history for one item, in append order.
    pub fn movements_of(&self, item_id: ItemId) -> StockResult<Vec<MovementRow>> {
        self.store.read(|r| {
            if r.item(item_id).is_none() {
                return Err(StockError::not_found("item"));
            }
            Ok(r.movements_of(item_id))
        })
    }

    /// Replay the movement log: the sum of signed quantities for the item.
    pub fn replayed_balance(&self, item_id: ItemId) -> StockResult<Decimal> {
        self.store.read(|r| {
            if r.item(item_id).is_none() {
                return Err(StockError::not_found("item"));
            }
            Ok(r.movements_of(item_id)
                .iter()
                .map(|m| m.quantity)
                .sum::<Decimal>())
        })
    }

    /// Audit: the stored balance must equal the replayed movement sum.
    pub fn verify_item_consistency(&self, item_id: ItemId) -> StockResult<bool> {
        self.store.read(|r| {
            let item = r.item(item_id).ok_or_else(|| StockError::not_found("item"))?;
            let replayed: Decimal = r.movements_of(item_id).iter().map(|m| m.quantity).sum();
            Ok(replayed == item.balance)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    use shopfloor_store::{ItemKind, ItemRow, MemoryStore, OrderStatus, ProductionOrderRow};

    fn store_with_item(kind: ItemKind) -> (Arc<MemoryStore>, ItemId) {
        let store = Arc::new(MemoryStore::with_default_units());
        let item_id = store
            .transact(|tx| {
                let unit = tx.units().into_iter().next().unwrap();
                let id = ItemId::new();
                tx.insert_item(ItemRow {
                    id,
                    description: "Test item".to_string(),
                    kind,
                    unit_id: unit.id,
                    internal_code: None,
                    default_supplier: None,
                    balance: Decimal::ZERO,
                    average_cost: Decimal::ZERO,
                })?;
                Ok(id)
            })
            .unwrap();
        (store, item_id)
    }

    #[test]
    fn receipt_updates_balance_and_average_cost() {
        let (store, item_id) = store_with_item(ItemKind::Material);
        let ledger = StockLedger::new(store.clone());

        ledger
            .record_receipt(item_id, dec!(10), dec!(2.0), None, Utc::now())
            .unwrap();
        ledger
            .record_receipt(item_id, dec!(10), dec!(4.0), None, Utc::now())
            .unwrap();

        let item = store.read(|r| Ok(r.item(item_id).unwrap())).unwrap();
        assert_eq!(item.balance, dec!(20));
        assert_eq!(item.average_cost, dec!(3.0));
    }

    #[test]
    fn outflow_keeps_average_cost_and_may_go_negative() {
        let (store, item_id) = store_with_item(ItemKind::Both);
        let ledger = StockLedger::new(store.clone());

        ledger
            .record_receipt(item_id, dec!(5), dec!(2.0), None, Utc::now())
            .unwrap();
        ledger
            .record_outflow(item_id, dec!(8), Some(dec!(3.0)), None, Utc::now())
            .unwrap();

        let item = store.read(|r| Ok(r.item(item_id).unwrap())).unwrap();
        assert_eq!(item.balance, dec!(-3));
        assert_eq!(item.average_cost, dec!(2.0));
        assert!(ledger.verify_item_consistency(item_id).unwrap());
    }

    #[test]
    fn manual_entry_rejects_product_only_items() {
        let (store, item_id) = store_with_item(ItemKind::Product);
        let ledger = StockLedger::new(store);

        let err = ledger
            .record_manual_entry(item_id, dec!(5), dec!(10.0), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
    }

    #[test]
    fn manual_entry_derives_unit_cost_from_total_value() {
        let (store, item_id) = store_with_item(ItemKind::Material);
        let ledger = StockLedger::new(store.clone());

        let movement = ledger
            .record_manual_entry(item_id, dec!(4), dec!(10.0), Utc::now())
            .unwrap();
        assert_eq!(movement.unit_value, Some(dec!(2.5)));
        assert_eq!(movement.kind, MovementKind::ManualEntry);

        let item = store.read(|r| Ok(r.item(item_id).unwrap())).unwrap();
        assert_eq!(item.average_cost, dec!(2.5));
    }

    #[test]
    fn production_issue_posts_unvalued_outflow_tied_to_the_order() {
        let (store, item_id) = store_with_item(ItemKind::Material);
        let order_id = store
            .transact(|tx| {
                let id = ProductionOrderId::new();
                tx.insert_order(ProductionOrderRow {
                    id,
                    number: "OP-1".to_string(),
                    created_on: Utc::now().date_naive(),
                    due_date: None,
                    status: OrderStatus::InProgress,
                    produced_quantity: None,
                    total_cost: None,
                    template_id: None,
                })?;
                Ok(id)
            })
            .unwrap();
        let ledger = StockLedger::new(store);

        let movement = ledger
            .record_production_issue(order_id, item_id, dec!(3), Utc::now())
            .unwrap();
        assert_eq!(movement.quantity, dec!(-3));
        assert_eq!(movement.unit_value, None);
        assert_eq!(movement.kind, MovementKind::Production);
        assert_eq!(
            movement.document,
            Some(DocumentRef::ProductionOrder(order_id))
        );
    }

    #[test]
    fn zero_quantity_receipt_is_rejected() {
        let (store, item_id) = store_with_item(ItemKind::Material);
        let ledger = StockLedger::new(store);

        let err = ledger
            .record_receipt(item_id, dec!(0), dec!(1.0), None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of receipts and outflows, the stored
        /// balance equals the replayed sum of movement quantities.
        #[test]
        fn balance_always_equals_replayed_movements(
            ops in prop::collection::vec((any::<bool>(), 1i64..10_000, 0i64..5_000), 1..40)
        ) {
            let (store, item_id) = store_with_item(ItemKind::Both);
            let ledger = StockLedger::new(store.clone());
            let now = Utc::now();

            for (is_receipt, qty_hundredths, cost_hundredths) in ops {
                let qty = Decimal::new(qty_hundredths, 2);
                let cost = Decimal::new(cost_hundredths, 2);
                if is_receipt {
                    ledger.record_receipt(item_id, qty, cost, None, now).unwrap();
                } else {
                    ledger.record_outflow(item_id, qty, Some(cost), None, now).unwrap();
                }
            }

            let item = store.read(|r| Ok(r.item(item_id).unwrap())).unwrap();
            prop_assert_eq!(ledger.replayed_balance(item_id).unwrap(), item.balance);
            prop_assert!(ledger.verify_item_consistency(item_id).unwrap());
        }
    }
}
