//! Entry note (supplier receipt) lifecycle.

use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use shopfloor_core::{EntryNoteId, ItemId, StockError, StockResult, SupplierId};
use shopfloor_ledger::post_receipt;
use shopfloor_store::{
    DocumentRef, DocumentStatus, EntryLineRow, EntryNoteRow, StockStore, StoreTx,
};

/// Header input while a note is being keyed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryNoteDraft {
    pub receipt_date: NaiveDate,
    pub note_number: Option<String>,
    pub observation: Option<String>,
}

/// One incoming line: a material, how much, at what cost, from whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLineDraft {
    pub material_id: ItemId,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub supplier_id: SupplierId,
}

/// Line joined for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLineDetail {
    pub material_id: ItemId,
    pub description: String,
    pub unit_abbreviation: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub supplier_id: SupplierId,
}

/// Header plus joined lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryNoteDetail {
    pub note: EntryNoteRow,
    pub lines: Vec<EntryLineDetail>,
}

/// Search arms for the note list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySearch {
    All,
    ById(EntryNoteId),
    /// Note number substring.
    ByNumber(String),
    ByStatus(DocumentStatus),
}

/// Entry note service over an injected store handle.
pub struct EntryNotes<S> {
    store: S,
}

impl<S: StockStore> EntryNotes<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an open note. No ledger effect until finalize.
    pub fn create(&self, draft: EntryNoteDraft) -> StockResult<EntryNoteRow> {
        let row = EntryNoteRow {
            id: EntryNoteId::new(),
            receipt_date: draft.receipt_date,
            entered_at: Utc::now(),
            note_number: draft.note_number,
            observation: draft.observation,
            total: None,
            status: DocumentStatus::Open,
        };
        let row = self.store.transact(|tx| {
            tx.insert_entry_note(row.clone())?;
            Ok(row)
        })?;
        info!(note = %row.id, "entry note created");
        Ok(row)
    }

    /// Update header fields while the note is still open.
    pub fn update_header(
        &self,
        id: EntryNoteId,
        draft: EntryNoteDraft,
    ) -> StockResult<EntryNoteRow> {
        self.store.transact(|tx| {
            let mut note = Self::open_note(tx, id)?;
            note.receipt_date = draft.receipt_date;
            note.note_number = draft.note_number;
            note.observation = draft.observation;
            tx.update_entry_note(note.clone())?;
            Ok(note)
        })
    }

    /// Replace the note's whole line set while it is still open.
    pub fn set_lines(&self, id: EntryNoteId, lines: Vec<EntryLineDraft>) -> StockResult<()> {
        self.store.transact(|tx| {
            Self::open_note(tx, id)?;
            let mut rows = Vec::with_capacity(lines.len());
            for line in lines {
                let material = tx
                    .item(line.material_id)
                    .ok_or_else(|| StockError::not_found("material"))?;
                if !material.kind.stocks_as_material() {
                    return Err(StockError::validation(format!(
                        "'{}' is not a material and cannot be received on an entry note",
                        material.description
                    )));
                }
                if line.quantity <= Decimal::ZERO {
                    return Err(StockError::validation("line quantity must be positive"));
                }
                if line.unit_cost < Decimal::ZERO {
                    return Err(StockError::validation("line unit cost cannot be negative"));
                }
                rows.push(EntryLineRow {
                    note_id: id,
                    material_id: line.material_id,
                    quantity: line.quantity,
                    unit_cost: line.unit_cost,
                    supplier_id: line.supplier_id,
                });
            }
            tx.put_entry_lines(id, rows)?;
            Ok(())
        })
    }

    pub fn get(&self, id: EntryNoteId) -> StockResult<EntryNoteDetail> {
        self.store.read(|r| {
            let note = r
                .entry_note(id)
                .ok_or_else(|| StockError::not_found("entry note"))?;
            let mut lines = Vec::new();
            for line in r.entry_lines_of(id) {
                let material = r
                    .item(line.material_id)
                    .ok_or_else(|| StockError::not_found("material"))?;
                let unit_abbreviation = r
                    .unit(material.unit_id)
                    .map(|u| u.abbreviation)
                    .unwrap_or_default();
                lines.push(EntryLineDetail {
                    material_id: line.material_id,
                    description: material.description,
                    unit_abbreviation,
                    quantity: line.quantity,
                    unit_cost: line.unit_cost,
                    supplier_id: line.supplier_id,
                });
            }
            Ok(EntryNoteDetail { note, lines })
        })
    }

    pub fn list(&self, search: EntrySearch) -> StockResult<Vec<EntryNoteRow>> {
        self.store.read(|r| {
            let notes = r.entry_notes().into_iter();
            let matches: Vec<EntryNoteRow> = match &search {
                EntrySearch::All => notes.collect(),
                EntrySearch::ById(id) => notes.filter(|n| n.id == *id).collect(),
                EntrySearch::ByNumber(term) => notes
                    .filter(|n| n.note_number.as_deref().is_some_and(|num| num.contains(term)))
                    .collect(),
                EntrySearch::ByStatus(status) => {
                    notes.filter(|n| n.status == *status).collect()
                }
            };
            Ok(matches)
        })
    }

    /// Finalize: post one receipt per line (in persisted order), recompute
    /// the total, and flip the status, all in one transaction. A failure on
    /// any line rolls back every ledger effect of this note.
    pub fn finalize(&self, id: EntryNoteId) -> StockResult<EntryNoteRow> {
        let note = self.store.transact(|tx| {
            let mut note = tx
                .entry_note(id)
                .ok_or_else(|| StockError::not_found("entry note"))?;
            if note.status == DocumentStatus::Finalized {
                return Err(StockError::invalid_state("entry note is already finalized"));
            }
            let lines = tx.entry_lines_of(id);
            if lines.is_empty() {
                return Err(StockError::EmptyDocument);
            }
            let posted_at = note.receipt_date.and_time(NaiveTime::MIN).and_utc();
            let mut total = Decimal::ZERO;
            for line in &lines {
                post_receipt(
                    tx,
                    line.material_id,
                    line.quantity,
                    line.unit_cost,
                    Some(DocumentRef::EntryNote(id)),
                    posted_at,
                )?;
                total += line.quantity * line.unit_cost;
            }
            note.total = Some(total);
            note.status = DocumentStatus::Finalized;
            tx.update_entry_note(note.clone())?;
            Ok(note)
        })?;
        info!(note = %id, total = %note.total.unwrap_or_default(), "entry note finalized");
        Ok(note)
    }

    fn open_note(tx: &mut dyn StoreTx, id: EntryNoteId) -> StockResult<EntryNoteRow> {
        let note = tx
            .entry_note(id)
            .ok_or_else(|| StockError::not_found("entry note"))?;
        if note.status == DocumentStatus::Finalized {
            return Err(StockError::invalid_state(
                "entry note is finalized and can no longer be edited",
            ));
        }
        Ok(note)
    }
}
