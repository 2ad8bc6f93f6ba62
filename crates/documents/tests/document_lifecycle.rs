//! Black-box lifecycle tests over the document services and the in-memory
//! store: ledger effects, atomicity, and the state machine guards.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use shopfloor_catalog::{BomCatalog, BomLineDraft, ItemCatalog, ItemDraft, SupplierDraft, Suppliers};
use shopfloor_core::{ItemId, StockError, SupplierId};
use shopfloor_documents::{
    EntryLineDraft, EntryNoteDraft, EntryNotes, OrderDraft, PlannedLineDraft, ProductionLines,
    ProductionOrders, SaleDraft, SaleLineDraft, SalesDesk, TemplateDraft, TemplateLineDraft,
};
use shopfloor_ledger::StockLedger;
use shopfloor_store::{
    DocumentRef, DocumentStatus, EntryLineRow, ItemKind, MemoryStore, OrderLineRow, OrderStatus,
    StockStore, SupplierStatus, TemplateStatus,
};

struct Fixture {
    store: Arc<MemoryStore>,
    items: ItemCatalog<Arc<MemoryStore>>,
    boms: BomCatalog<Arc<MemoryStore>>,
    notes: EntryNotes<Arc<MemoryStore>>,
    sales: SalesDesk<Arc<MemoryStore>>,
    orders: ProductionOrders<Arc<MemoryStore>>,
    lines: ProductionLines<Arc<MemoryStore>>,
    ledger: StockLedger<Arc<MemoryStore>>,
    supplier_id: SupplierId,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::with_default_units());
    let suppliers = Suppliers::new(store.clone());
    let supplier_id = suppliers
        .create(SupplierDraft {
            legal_name: "Acme Mills".to_string(),
            trade_name: None,
            tax_id: None,
            status: SupplierStatus::Active,
        })
        .unwrap()
        .id;
    Fixture {
        items: ItemCatalog::new(store.clone()),
        boms: BomCatalog::new(store.clone()),
        notes: EntryNotes::new(store.clone()),
        sales: SalesDesk::new(store.clone()),
        orders: ProductionOrders::new(store.clone()),
        lines: ProductionLines::new(store.clone()),
        ledger: StockLedger::new(store.clone()),
        store,
        supplier_id,
    }
}

impl Fixture {
    fn item(&self, description: &str, kind: ItemKind) -> ItemId {
        let unit = self.items.units().unwrap().into_iter().next().unwrap();
        self.items
            .create(ItemDraft {
                description: description.to_string(),
                kind,
                unit_id: unit.id,
                internal_code: None,
                default_supplier: None,
            })
            .unwrap()
            .id
    }

    fn balance_of(&self, item_id: ItemId) -> Decimal {
        self.store.read(|r| Ok(r.item(item_id).unwrap().balance)).unwrap()
    }

    fn average_cost_of(&self, item_id: ItemId) -> Decimal {
        self.store
            .read(|r| Ok(r.item(item_id).unwrap().average_cost))
            .unwrap()
    }
}

fn note_draft() -> EntryNoteDraft {
    EntryNoteDraft {
        receipt_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        note_number: Some("NF-1001".to_string()),
        observation: None,
    }
}

#[test]
fn entry_note_finalize_posts_receipts_and_recomputes_the_total() {
    let fx = fixture();
    let flour = fx.item("Flour", ItemKind::Material);
    let sugar = fx.item("Sugar", ItemKind::Material);

    let note = fx.notes.create(note_draft()).unwrap();
    fx.notes
        .set_lines(
            note.id,
            vec![
                EntryLineDraft {
                    material_id: flour,
                    quantity: dec!(10),
                    unit_cost: dec!(2.00),
                    supplier_id: fx.supplier_id,
                },
                EntryLineDraft {
                    material_id: sugar,
                    quantity: dec!(4),
                    unit_cost: dec!(5.00),
                    supplier_id: fx.supplier_id,
                },
            ],
        )
        .unwrap();

    let finalized = fx.notes.finalize(note.id).unwrap();
    assert_eq!(finalized.status, DocumentStatus::Finalized);
    assert_eq!(finalized.total, Some(dec!(40.00)));
    assert_eq!(fx.balance_of(flour), dec!(10));
    assert_eq!(fx.average_cost_of(flour), dec!(2.00));
    assert_eq!(fx.balance_of(sugar), dec!(4));
    assert!(fx.ledger.verify_item_consistency(flour).unwrap());
    assert!(fx.ledger.verify_item_consistency(sugar).unwrap());

    let posted = fx
        .store
        .read(|r| Ok(r.movements_for_document(DocumentRef::EntryNote(note.id))))
        .unwrap();
    assert_eq!(posted.len(), 2);
    assert!(posted.iter().all(|m| m.quantity > Decimal::ZERO));
}

#[test]
fn finalize_blends_receipts_into_the_weighted_average() {
    let fx = fixture();
    let flour = fx.item("Flour", ItemKind::Material);
    fx.ledger
        .record_manual_entry(flour, dec!(10), dec!(20.00), Utc::now())
        .unwrap();

    let note = fx.notes.create(note_draft()).unwrap();
    fx.notes
        .set_lines(
            note.id,
            vec![EntryLineDraft {
                material_id: flour,
                quantity: dec!(10),
                unit_cost: dec!(4.00),
                supplier_id: fx.supplier_id,
            }],
        )
        .unwrap();
    fx.notes.finalize(note.id).unwrap();

    assert_eq!(fx.balance_of(flour), dec!(20));
    assert_eq!(fx.average_cost_of(flour), dec!(3.00));
}

#[test]
fn finalizing_twice_fails_and_moves_stock_exactly_once() {
    let fx = fixture();
    let flour = fx.item("Flour", ItemKind::Material);

    let note = fx.notes.create(note_draft()).unwrap();
    fx.notes
        .set_lines(
            note.id,
            vec![EntryLineDraft {
                material_id: flour,
                quantity: dec!(10),
                unit_cost: dec!(2.00),
                supplier_id: fx.supplier_id,
            }],
        )
        .unwrap();

    fx.notes.finalize(note.id).unwrap();
    let err = fx.notes.finalize(note.id).unwrap_err();
    assert!(matches!(err, StockError::InvalidState(_)));
    assert_eq!(fx.balance_of(flour), dec!(10));
}

#[test]
fn a_failing_line_rolls_back_the_whole_finalize() {
    let fx = fixture();
    let flour = fx.item("Flour", ItemKind::Material);
    let sugar = fx.item("Sugar", ItemKind::Material);

    let note = fx.notes.create(note_draft()).unwrap();
    // Bypass the service-level line guards: the second line's quantity is
    // invalid at posting time, so the first line's receipt must roll back.
    let supplier_id = fx.supplier_id;
    fx.store
        .transact(|tx| {
            tx.put_entry_lines(
                note.id,
                vec![
                    EntryLineRow {
                        note_id: note.id,
                        material_id: flour,
                        quantity: dec!(10),
                        unit_cost: dec!(2.00),
                        supplier_id,
                    },
                    EntryLineRow {
                        note_id: note.id,
                        material_id: sugar,
                        quantity: dec!(0),
                        unit_cost: dec!(5.00),
                        supplier_id,
                    },
                ],
            )?;
            Ok(())
        })
        .unwrap();

    let err = fx.notes.finalize(note.id).unwrap_err();
    assert!(matches!(err, StockError::Validation(_)));
    assert_eq!(fx.balance_of(flour), dec!(0));
    assert_eq!(
        fx.notes.get(note.id).unwrap().note.status,
        DocumentStatus::Open
    );
    assert!(fx.ledger.movements_of(flour).unwrap().is_empty());
}

#[test]
fn an_empty_note_cannot_be_finalized() {
    let fx = fixture();
    let note = fx.notes.create(note_draft()).unwrap();
    assert!(matches!(
        fx.notes.finalize(note.id),
        Err(StockError::EmptyDocument)
    ));
}

#[test]
fn a_finalized_note_is_immutable() {
    let fx = fixture();
    let flour = fx.item("Flour", ItemKind::Material);
    let note = fx.notes.create(note_draft()).unwrap();
    fx.notes
        .set_lines(
            note.id,
            vec![EntryLineDraft {
                material_id: flour,
                quantity: dec!(1),
                unit_cost: dec!(1.00),
                supplier_id: fx.supplier_id,
            }],
        )
        .unwrap();
    fx.notes.finalize(note.id).unwrap();

    assert!(matches!(
        fx.notes.update_header(note.id, note_draft()),
        Err(StockError::InvalidState(_))
    ));
    assert!(matches!(
        fx.notes.set_lines(note.id, vec![]),
        Err(StockError::InvalidState(_))
    ));
}

#[test]
fn sale_finalize_posts_outflows_and_keeps_average_cost() {
    let fx = fixture();
    let bread = fx.item("Bread", ItemKind::Both);
    fx.ledger
        .record_manual_entry(bread, dec!(10), dec!(20.00), Utc::now())
        .unwrap();

    let sale = fx
        .sales
        .create(
            SaleDraft {
                sale_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
                observation: None,
            },
            vec![SaleLineDraft {
                product_id: bread,
                quantity: dec!(4),
                unit_price: dec!(7.50),
            }],
        )
        .unwrap();
    assert_eq!(sale.total, dec!(30.00));

    let finalized = fx.sales.finalize(sale.id).unwrap();
    assert_eq!(finalized.status, DocumentStatus::Finalized);
    assert_eq!(fx.balance_of(bread), dec!(6));
    assert_eq!(fx.average_cost_of(bread), dec!(2.00));
    assert!(fx.ledger.verify_item_consistency(bread).unwrap());

    let movements = fx.ledger.movements_of(bread).unwrap();
    assert_eq!(movements.last().unwrap().quantity, dec!(-4));
}

#[test]
fn production_finalize_records_cost_from_the_snapshot_and_reports_yield() {
    let fx = fixture();
    let flour = fx.item("Flour", ItemKind::Material);
    let bread = fx.item("Bread", ItemKind::Product);
    fx.ledger
        .record_manual_entry(flour, dec!(100), dec!(200.00), Utc::now())
        .unwrap();
    fx.boms
        .replace_bom(
            bread,
            vec![BomLineDraft {
                material_id: flour,
                quantity: dec!(0.5),
            }],
        )
        .unwrap();

    let order = fx
        .orders
        .create(
            OrderDraft::default(),
            vec![PlannedLineDraft {
                product_id: bread,
                quantity: dec!(100),
            }],
        )
        .unwrap();
    assert!(order.number.starts_with("OP-"));

    // A later price change must not move the snapshot taken at create time.
    fx.ledger
        .record_manual_entry(flour, dec!(100), dec!(600.00), Utc::now())
        .unwrap();

    let finalized = fx.orders.finalize(order.id, dec!(80)).unwrap();
    assert_eq!(finalized.status, OrderStatus::Completed);
    assert_eq!(finalized.produced_quantity, Some(dec!(80)));
    assert_eq!(finalized.total_cost, Some(dec!(100.00)));

    let detail = fx.orders.get(order.id).unwrap();
    assert_eq!(detail.planned_quantity, dec!(100));
    assert_eq!(detail.yield_percent, Some(dec!(80)));

    // Finalization performed no material consumption on its own.
    assert_eq!(fx.balance_of(flour), dec!(200));
}

#[test]
fn yield_is_undefined_when_nothing_was_planned() {
    let fx = fixture();
    let bread = fx.item("Bread", ItemKind::Product);
    let order = fx
        .orders
        .create(
            OrderDraft::default(),
            vec![PlannedLineDraft {
                product_id: bread,
                quantity: dec!(1),
            }],
        )
        .unwrap();
    // Force a zero planned total past the service guards.
    fx.store
        .transact(|tx| {
            tx.put_order_lines(
                order.id,
                vec![OrderLineRow {
                    order_id: order.id,
                    product_id: bread,
                    quantity: dec!(0),
                    unit_cost: dec!(0),
                }],
            )?;
            Ok(())
        })
        .unwrap();

    fx.orders.finalize(order.id, dec!(80)).unwrap();
    let detail = fx.orders.get(order.id).unwrap();
    assert_eq!(detail.planned_quantity, dec!(0));
    assert_eq!(detail.yield_percent, None);
}

#[test]
fn order_lifecycle_guards_hold() {
    let fx = fixture();
    let bread = fx.item("Bread", ItemKind::Product);
    let order = fx
        .orders
        .create(
            OrderDraft::default(),
            vec![PlannedLineDraft {
                product_id: bread,
                quantity: dec!(10),
            }],
        )
        .unwrap();

    fx.orders.cancel(order.id).unwrap();
    assert!(matches!(
        fx.orders.finalize(order.id, dec!(5)),
        Err(StockError::InvalidState(_))
    ));
    assert!(matches!(
        fx.orders.cancel(order.id),
        Err(StockError::InvalidState(_))
    ));

    let reopened = fx.orders.reopen(order.id).unwrap();
    assert_eq!(reopened.status, OrderStatus::InProgress);
    assert_eq!(fx.orders.get(order.id).unwrap().lines.len(), 1);
    assert!(matches!(
        fx.orders.reopen(order.id),
        Err(StockError::InvalidState(_))
    ));
    assert!(matches!(
        fx.orders.delete(order.id),
        Err(StockError::InvalidState(_))
    ));

    fx.orders.finalize(order.id, dec!(10)).unwrap();
    assert!(matches!(
        fx.orders.update(order.id, OrderDraft::default(), vec![]),
        Err(StockError::InvalidState(_))
    ));
    fx.orders.delete(order.id).unwrap();
    assert!(matches!(
        fx.orders.get(order.id),
        Err(StockError::NotFound(_))
    ));
}

#[test]
fn templates_instantiate_orders_with_quantities_preserved() {
    let fx = fixture();
    let bread = fx.item("Bread", ItemKind::Product);
    let cake = fx.item("Cake", ItemKind::Product);

    let template = fx
        .lines
        .create(
            TemplateDraft {
                name: "Morning bake".to_string(),
                description: None,
                status: TemplateStatus::Active,
            },
            vec![
                TemplateLineDraft {
                    product_id: bread,
                    quantity: dec!(40),
                },
                TemplateLineDraft {
                    product_id: cake,
                    quantity: dec!(12),
                },
            ],
        )
        .unwrap();

    let order = fx.orders.create_from_template(template.id).unwrap();
    assert_eq!(order.status, OrderStatus::InProgress);
    assert_eq!(order.template_id, Some(template.id));
    assert!(order.number.starts_with("OP-"));

    let detail = fx.orders.get(order.id).unwrap();
    assert_eq!(detail.lines.len(), 2);
    assert_eq!(detail.planned_quantity, dec!(52));
}

#[test]
fn inactive_or_empty_templates_cannot_instantiate_orders() {
    let fx = fixture();
    let bread = fx.item("Bread", ItemKind::Product);

    let inactive = fx
        .lines
        .create(
            TemplateDraft {
                name: "Retired line".to_string(),
                description: None,
                status: TemplateStatus::Inactive,
            },
            vec![TemplateLineDraft {
                product_id: bread,
                quantity: dec!(1),
            }],
        )
        .unwrap();
    assert!(matches!(
        fx.orders.create_from_template(inactive.id),
        Err(StockError::InvalidState(_))
    ));

    let empty = fx
        .lines
        .create(
            TemplateDraft {
                name: "Empty line".to_string(),
                description: None,
                status: TemplateStatus::Active,
            },
            vec![],
        )
        .unwrap();
    assert!(matches!(
        fx.orders.create_from_template(empty.id),
        Err(StockError::EmptyTemplate)
    ));
}

#[test]
fn template_names_are_unique_and_deletion_cascades() {
    let fx = fixture();
    let bread = fx.item("Bread", ItemKind::Product);
    let draft = || TemplateDraft {
        name: "Morning bake".to_string(),
        description: None,
        status: TemplateStatus::Active,
    };

    let template = fx
        .lines
        .create(
            draft(),
            vec![TemplateLineDraft {
                product_id: bread,
                quantity: dec!(40),
            }],
        )
        .unwrap();
    assert!(matches!(
        fx.lines.create(draft(), vec![]),
        Err(StockError::DuplicateKey(_))
    ));

    fx.lines.delete(template.id).unwrap();
    assert!(fx.lines.list().unwrap().is_empty());
}

#[test]
fn issued_materials_restrict_order_deletion() {
    let fx = fixture();
    let flour = fx.item("Flour", ItemKind::Material);
    let bread = fx.item("Bread", ItemKind::Product);
    let order = fx
        .orders
        .create(
            OrderDraft::default(),
            vec![PlannedLineDraft {
                product_id: bread,
                quantity: dec!(10),
            }],
        )
        .unwrap();

    fx.ledger
        .record_production_issue(order.id, flour, dec!(5), Utc::now())
        .unwrap();
    fx.orders.finalize(order.id, dec!(10)).unwrap();

    assert!(matches!(
        fx.orders.delete(order.id),
        Err(StockError::DependencyExists(_))
    ));
    assert_eq!(fx.balance_of(flour), dec!(-5));
    assert!(fx.ledger.verify_item_consistency(flour).unwrap());
}
