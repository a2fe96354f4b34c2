use crate::core::query::StoreQuery;
use crate::domain::model::{
    ImportRow, PostalRecord, RecordFields, RecordSummary, FIELD_CENTRO, FIELD_CP, FIELD_GIRO,
    FIELD_LOCALIDADE, FIELD_SABADO,
};
use crate::domain::ports::RecordStore;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local record store, kept in insertion order.
///
/// Used by the test suites and by `--record-store memory` for running the
/// pages without a database. The `fail_*` switches make every subsequent
/// call of that kind fail with a store error.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<PostalRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    insert_calls: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of bulk-insert calls that reached the store.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::store("memory store: reads disabled"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::store("memory store: writes disabled"));
        }
        Ok(())
    }
}

fn record_from_row(row: &ImportRow) -> PostalRecord {
    let field = |key: &str| row.get(key).unwrap_or_default().to_string();
    PostalRecord {
        id: Uuid::new_v4(),
        cp: field(FIELD_CP),
        localidade: field(FIELD_LOCALIDADE),
        giro: field(FIELD_GIRO),
        centro: field(FIELD_CENTRO),
        sabado: field(FIELD_SABADO),
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<PostalRecord>> {
        self.check_read()?;
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.cp == code).cloned())
    }

    async fn count(&self, query: &StoreQuery) -> Result<u64> {
        self.check_read()?;
        let matcher = query.matcher();
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| matcher.matches(r)).count() as u64)
    }

    async fn list(&self, query: &StoreQuery, offset: u64, limit: u64) -> Result<Vec<RecordSummary>> {
        self.check_read()?;
        let matcher = query.matcher();
        let records = self.records.read().await;

        let mut matching: Vec<&PostalRecord> = records.iter().filter(|r| matcher.matches(r)).collect();
        matching.sort_by(|a, b| a.cp.cmp(&b.cp));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(RecordSummary::from)
            .collect())
    }

    async fn upsert(&self, fields: &RecordFields) -> Result<()> {
        self.check_write()?;
        let mut records = self.records.write().await;

        match records.iter_mut().find(|r| r.cp == fields.cp) {
            Some(existing) => {
                existing.localidade = fields.localidade.clone();
                existing.giro = fields.giro.clone();
                existing.centro = fields.centro.clone();
                existing.sabado = fields.sabado.clone();
            }
            None => records.push(PostalRecord {
                id: Uuid::new_v4(),
                cp: fields.cp.clone(),
                localidade: fields.localidade.clone(),
                giro: fields.giro.clone(),
                centro: fields.centro.clone(),
                sabado: fields.sabado.clone(),
            }),
        }

        Ok(())
    }

    async fn insert_many(&self, rows: &[ImportRow]) -> Result<u64> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        let mut records = self.records.write().await;
        records.extend(rows.iter().map(record_from_row));
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{build_query, RecordFilters};

    #[tokio::test]
    async fn test_list_sorts_by_code_and_pages() {
        let store = MemoryRecordStore::new();
        let rows: Vec<ImportRow> = ["4000-001", "1000-002", "1000-001"]
            .iter()
            .map(|cp| ImportRow::from_pairs(vec![("CP", *cp)]))
            .collect();
        store.insert_many(&rows).await.unwrap();

        let page = store.list(&StoreQuery::match_all(), 1, 5).await.unwrap();

        let codes: Vec<&str> = page.iter().map(|r| r.cp.as_str()).collect();
        assert_eq!(codes, vec!["1000-002", "4000-001"]);
    }

    #[tokio::test]
    async fn test_find_returns_first_inserted_duplicate() {
        let store = MemoryRecordStore::new();
        store
            .insert_many(&[
                ImportRow::from_pairs(vec![("CP", "1000-001"), ("LOCALIDADE", "Primeiro")]),
                ImportRow::from_pairs(vec![("CP", "1000-001"), ("LOCALIDADE", "Segundo")]),
            ])
            .await
            .unwrap();

        let found = store.find_by_code("1000-001").await.unwrap().unwrap();
        assert_eq!(found.localidade, "Primeiro");
    }

    #[tokio::test]
    async fn test_count_honours_query() {
        let store = MemoryRecordStore::new();
        store
            .insert_many(&[
                ImportRow::from_pairs(vec![("CP", "1000-001"), ("SABADO", "S")]),
                ImportRow::from_pairs(vec![("CP", "1000-002"), ("SABADO", "N")]),
            ])
            .await
            .unwrap();

        let query = build_query(&RecordFilters::from_raw("", "", "S"));
        assert_eq!(store.count(&query).await.unwrap(), 1);
    }
}
