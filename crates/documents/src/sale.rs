//! Sale (outgoing goods) lifecycle.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use tracing::info;

use shopfloor_core::{ItemId, SaleId, StockError, StockResult};
use shopfloor_ledger::post_outflow;
use shopfloor_store::{DocumentRef, DocumentStatus, SaleLineRow, SaleRow, StockStore, StoreTx};

/// Header input for a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDraft {
    pub sale_date: NaiveDate,
    pub observation: Option<String>,
}

/// One outgoing line: a product, how much, at what price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleLineDraft {
    pub product_id: ItemId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Line joined for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLineDetail {
    pub product_id: ItemId,
    pub description: String,
    pub unit_abbreviation: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Header plus joined lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDetail {
    pub sale: SaleRow,
    pub lines: Vec<SaleLineDetail>,
}

/// Search arms for the sale list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleSearch {
    All,
    ById(SaleId),
    ByStatus(DocumentStatus),
}

/// Sale service over an injected store handle.
pub struct SalesDesk<S> {
    store: S,
}

impl<S: StockStore> SalesDesk<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an open sale with its line set. The total is maintained here
    /// (Σ quantity × price); finalize does not recompute it.
    pub fn create(&self, draft: SaleDraft, lines: Vec<SaleLineDraft>) -> StockResult<SaleRow> {
        let id = SaleId::new();
        let row = self.store.transact(|tx| {
            let rows = Self::line_rows(tx, id, &lines)?;
            let row = SaleRow {
                id,
                sale_date: draft.sale_date,
                observation: draft.observation.clone(),
                total: Self::total_of(&rows),
                status: DocumentStatus::Open,
            };
            tx.insert_sale(row.clone())?;
            tx.put_sale_lines(id, rows)?;
            Ok(row)
        })?;
        info!(sale = %row.id, total = %row.total, "sale created");
        Ok(row)
    }

    /// Replace header and line set while the sale is still open.
    pub fn update(
        &self,
        id: SaleId,
        draft: SaleDraft,
        lines: Vec<SaleLineDraft>,
    ) -> StockResult<SaleRow> {
        self.store.transact(|tx| {
            let mut sale = Self::open_sale(tx, id)?;
            let rows = Self::line_rows(tx, id, &lines)?;
            sale.sale_date = draft.sale_date;
            sale.observation = draft.observation;
            sale.total = Self::total_of(&rows);
            tx.update_sale(sale.clone())?;
            tx.put_sale_lines(id, rows)?;
            Ok(sale)
        })
    }

    pub fn get(&self, id: SaleId) -> StockResult<SaleDetail> {
        self.store.read(|r| {
            let sale = r.sale(id).ok_or_else(|| StockError::not_found("sale"))?;
            let mut lines = Vec::new();
            for line in r.sale_lines_of(id) {
                let product = r
                    .item(line.product_id)
                    .ok_or_else(|| StockError::not_found("product"))?;
                let unit_abbreviation = r
                    .unit(product.unit_id)
                    .map(|u| u.abbreviation)
                    .unwrap_or_default();
                lines.push(SaleLineDetail {
                    product_id: line.product_id,
                    description: product.description,
                    unit_abbreviation,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                });
            }
            Ok(SaleDetail { sale, lines })
        })
    }

    pub fn list(&self, search: SaleSearch) -> StockResult<Vec<SaleRow>> {
        self.store.read(|r| {
            let sales = r.sales().into_iter();
            let matches: Vec<SaleRow> = match &search {
                SaleSearch::All => sales.collect(),
                SaleSearch::ById(id) => sales.filter(|s| s.id == *id).collect(),
                SaleSearch::ByStatus(status) => sales.filter(|s| s.status == *status).collect(),
            };
            Ok(matches)
        })
    }

    /// Finalize: post one outflow per line (in persisted order) and flip the
    /// status, atomically. Stock may go negative; that is the caller's
    /// business decision to surface, not a ledger rejection.
    pub fn finalize(&self, id: SaleId) -> StockResult<SaleRow> {
        let sale = self.store.transact(|tx| {
            let mut sale = tx.sale(id).ok_or_else(|| StockError::not_found("sale"))?;
            if sale.status == DocumentStatus::Finalized {
                return Err(StockError::invalid_state("sale is already finalized"));
            }
            let lines = tx.sale_lines_of(id);
            if lines.is_empty() {
                return Err(StockError::EmptyDocument);
            }
            let posted_at = sale.sale_date.and_time(NaiveTime::MIN).and_utc();
            for line in &lines {
                post_outflow(
                    tx,
                    line.product_id,
                    line.quantity,
                    Some(line.unit_price),
                    Some(DocumentRef::Sale(id)),
                    posted_at,
                )?;
            }
            sale.status = DocumentStatus::Finalized;
            tx.update_sale(sale.clone())?;
            Ok(sale)
        })?;
        info!(sale = %id, total = %sale.total, "sale finalized");
        Ok(sale)
    }

    fn open_sale(tx: &mut dyn StoreTx, id: SaleId) -> StockResult<SaleRow> {
        let sale = tx.sale(id).ok_or_else(|| StockError::not_found("sale"))?;
        if sale.status == DocumentStatus::Finalized {
            return Err(StockError::invalid_state(
                "sale is finalized and can no longer be edited",
            ));
        }
        Ok(sale)
    }

    fn line_rows(
        tx: &mut dyn StoreTx,
        id: SaleId,
        lines: &[SaleLineDraft],
    ) -> StockResult<Vec<SaleLineRow>> {
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let product = tx
                .item(line.product_id)
                .ok_or_else(|| StockError::not_found("product"))?;
            if !product.kind.stocks_as_product() {
                return Err(StockError::validation(format!(
                    "'{}' is not a product and cannot be sold",
                    product.description
                )));
            }
            if line.quantity <= Decimal::ZERO {
                return Err(StockError::validation("line quantity must be positive"));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(StockError::validation("line unit price cannot be negative"));
            }
            rows.push(SaleLineRow {
                sale_id: id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }
        Ok(rows)
    }

    fn total_of(rows: &[SaleLineRow]) -> Decimal {
        rows.iter().map(|l| l.quantity * l.unit_price).sum()
    }
}
