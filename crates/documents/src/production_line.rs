//! Production line templates: reusable named product/quantity sets used to
//! pre-populate new production orders.

use rust_decimal::Decimal;
use tracing::info;

use shopfloor_core::{ItemId, ProductionLineId, StockError, StockResult};
use shopfloor_store::{StockStore, StoreTx, TemplateLineRow, TemplateRow, TemplateStatus};

/// Header input for a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: Option<String>,
    pub status: TemplateStatus,
}

/// One template line: a product and its default quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateLineDraft {
    pub product_id: ItemId,
    pub quantity: Decimal,
}

/// Listing row with the per-template product count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSummary {
    pub id: ProductionLineId,
    pub name: String,
    pub status: TemplateStatus,
    pub product_count: usize,
}

/// Line joined for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLineDetail {
    pub product_id: ItemId,
    pub description: String,
    pub unit_abbreviation: String,
    pub quantity: Decimal,
}

/// Header plus joined lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDetail {
    pub template: TemplateRow,
    pub lines: Vec<TemplateLineDetail>,
}

/// Template service over an injected store handle.
pub struct ProductionLines<S> {
    store: S,
}

impl<S: StockStore> ProductionLines<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a template with its line set. Fails with `DuplicateKey` on a
    /// name collision.
    pub fn create(
        &self,
        draft: TemplateDraft,
        lines: Vec<TemplateLineDraft>,
    ) -> StockResult<TemplateRow> {
        if draft.name.trim().is_empty() {
            return Err(StockError::validation("name cannot be empty"));
        }
        let id = ProductionLineId::new();
        let row = self.store.transact(|tx| {
            let row = TemplateRow {
                id,
                name: draft.name.clone(),
                description: draft.description.clone(),
                status: draft.status,
            };
            tx.insert_template(row.clone())?;
            let rows = Self::line_rows(tx, id, &lines)?;
            tx.put_template_lines(id, rows)?;
            Ok(row)
        })?;
        info!(template = %row.id, name = %row.name, "production line created");
        Ok(row)
    }

    /// Replace header and line set wholesale.
    pub fn update(
        &self,
        id: ProductionLineId,
        draft: TemplateDraft,
        lines: Vec<TemplateLineDraft>,
    ) -> StockResult<TemplateRow> {
        if draft.name.trim().is_empty() {
            return Err(StockError::validation("name cannot be empty"));
        }
        self.store.transact(|tx| {
            if tx.template(id).is_none() {
                return Err(StockError::not_found("production line template"));
            }
            let row = TemplateRow {
                id,
                name: draft.name.clone(),
                description: draft.description.clone(),
                status: draft.status,
            };
            tx.update_template(row.clone())?;
            let rows = Self::line_rows(tx, id, &lines)?;
            tx.put_template_lines(id, rows)?;
            Ok(row)
        })
    }

    /// All templates with their product counts, ordered by name.
    pub fn list(&self) -> StockResult<Vec<TemplateSummary>> {
        self.store.read(|r| {
            let mut summaries: Vec<TemplateSummary> = r
                .templates()
                .into_iter()
                .map(|t| {
                    let product_count = r.template_lines_of(t.id).len();
                    TemplateSummary {
                        id: t.id,
                        name: t.name,
                        status: t.status,
                        product_count,
                    }
                })
                .collect();
            summaries.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(summaries)
        })
    }

    pub fn get(&self, id: ProductionLineId) -> StockResult<TemplateDetail> {
        self.store.read(|r| {
            let template = r
                .template(id)
                .ok_or_else(|| StockError::not_found("production line template"))?;
            let mut lines = Vec::new();
            for line in r.template_lines_of(id) {
                let product = r
                    .item(line.product_id)
                    .ok_or_else(|| StockError::not_found("product"))?;
                let unit_abbreviation = r
                    .unit(product.unit_id)
                    .map(|u| u.abbreviation)
                    .unwrap_or_default();
                lines.push(TemplateLineDetail {
                    product_id: line.product_id,
                    description: product.description,
                    unit_abbreviation,
                    quantity: line.quantity,
                });
            }
            Ok(TemplateDetail { template, lines })
        })
    }

    /// Delete the template; its lines cascade away with it. Orders created
    /// from it keep running with the reference cleared.
    pub fn delete(&self, id: ProductionLineId) -> StockResult<()> {
        self.store.transact(|tx| {
            if tx.template(id).is_none() {
                return Err(StockError::not_found("production line template"));
            }
            tx.delete_template(id)?;
            Ok(())
        })?;
        info!(template = %id, "production line deleted");
        Ok(())
    }

    fn line_rows(
        tx: &mut dyn StoreTx,
        id: ProductionLineId,
        lines: &[TemplateLineDraft],
    ) -> StockResult<Vec<TemplateLineRow>> {
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let product = tx
                .item(line.product_id)
                .ok_or_else(|| StockError::not_found("product"))?;
            if !product.kind.stocks_as_product() {
                return Err(StockError::validation(format!(
                    "'{}' is not a product and cannot be on a production line",
                    product.description
                )));
            }
            if line.quantity <= Decimal::ZERO {
                return Err(StockError::validation("line quantity must be positive"));
            }
            rows.push(TemplateLineRow {
                template_id: id,
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        Ok(rows)
    }
}
