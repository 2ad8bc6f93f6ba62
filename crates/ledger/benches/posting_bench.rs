use std::sync::Arc;

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;

use shopfloor_core::ItemId;
use shopfloor_ledger::{StockLedger, apply_receipt};
use shopfloor_store::{ItemKind, ItemRow, MemoryStore, StockStore};

fn seeded_store() -> (Arc<MemoryStore>, ItemId) {
    let store = Arc::new(MemoryStore::with_default_units());
    let item_id = store
        .transact(|tx| {
            let unit = tx.units().into_iter().next().unwrap();
            let id = ItemId::new();
            tx.insert_item(ItemRow {
                id,
                description: "Bench item".to_string(),
                kind: ItemKind::Both,
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

fn costing_blend(c: &mut Criterion) {
    c.bench_function("apply_receipt", |b| {
        let old_balance = Decimal::new(12_345, 2);
        let old_cost = Decimal::new(275, 2);
        b.iter(|| {
            black_box(apply_receipt(
                black_box(old_balance),
                black_box(old_cost),
                Decimal::new(500, 2),
                Decimal::new(310, 2),
            ))
        });
    });
}

fn ledger_posting(c: &mut Criterion) {
    c.bench_function("record_receipt x100", |b| {
        b.iter_with_setup(seeded_store, |(store, item_id)| {
            let ledger = StockLedger::new(store);
            let now = Utc::now();
            for i in 1..=100i64 {
                ledger
                    .record_receipt(item_id, Decimal::new(i, 1), Decimal::new(i, 2), None, now)
                    .unwrap();
            }
        });
    });
}

criterion_group!(benches, costing_blend, ledger_posting);
criterion_main!(benches);
