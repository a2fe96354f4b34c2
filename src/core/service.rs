//! Per-page use cases: public search, admin list/lookup and admin save.

use crate::core::pagination::{paginate, parse_page_param, Page};
use crate::core::query::{build_query, ListParams};
use crate::core::records::{upsert_record, RecordForm};
use crate::domain::model::{AddressEntries, PostalRecord, RecordFields, RecordSummary};
use crate::domain::ports::{PostalLookup, RecordStore};
use crate::utils::error::{AppError, LookupError, Result};
use std::sync::Arc;

pub type LookupOutcome = std::result::Result<AddressEntries, LookupError>;

pub const SAVED_MESSAGE: &str = "Registo guardado com sucesso.";

#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub postal_code: String,
    pub record: Option<PostalRecord>,
    pub not_found_message: Option<String>,
    pub store_error: Option<AppError>,
    pub external: Option<LookupOutcome>,
}

/// Filter values echoed back into the list form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterValues {
    pub localidade: String,
    pub prefixo: String,
    pub sabado: String,
}

#[derive(Debug)]
pub struct Listing {
    pub filters: FilterValues,
    pub page: Page,
    pub records: Vec<RecordSummary>,
}

#[derive(Debug, Default)]
pub struct ManageOutcome {
    pub postal_code: String,
    pub form: RecordFields,
    pub record: Option<PostalRecord>,
    pub external: Option<LookupOutcome>,
    pub not_found_message: Option<String>,
    pub message: Option<String>,
    pub failure: Option<AppError>,
    pub listing: Option<Listing>,
}

pub struct PostalService {
    store: Arc<dyn RecordStore>,
    lookup: Arc<dyn PostalLookup>,
    page_size: u64,
    lookup_after_save: bool,
}

impl PostalService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        lookup: Arc<dyn PostalLookup>,
        page_size: u64,
        lookup_after_save: bool,
    ) -> Self {
        Self {
            store,
            lookup,
            page_size,
            lookup_after_save,
        }
    }

    /// Public lookup. Store failures are reported in the outcome; the external
    /// panel is still filled.
    pub async fn search(&self, raw_code: &str) -> SearchOutcome {
        let postal_code = raw_code.trim().to_string();
        if postal_code.is_empty() {
            return SearchOutcome::default();
        }

        let mut outcome = SearchOutcome {
            postal_code: postal_code.clone(),
            ..Default::default()
        };

        match self.store.find_by_code(&postal_code).await {
            Ok(Some(record)) => outcome.record = Some(record),
            Ok(None) => {
                outcome.not_found_message = Some(format!(
                    "Não encontrámos registos para o código {} na base de dados.",
                    postal_code
                ))
            }
            Err(e) => {
                tracing::error!(cp = %postal_code, error = %e, "Failed to retrieve record");
                outcome.store_error = Some(e);
            }
        }

        outcome.external = Some(self.lookup.lookup(&postal_code).await);
        outcome
    }

    /// Admin list page: optional single-code lookup plus the filtered, paginated list.
    pub async fn manage(&self, params: &ListParams) -> Result<ManageOutcome> {
        let postal_code = params.postal_code.trim().to_string();
        let mut outcome = ManageOutcome {
            postal_code: postal_code.clone(),
            message: params.message.clone().filter(|m| !m.is_empty()),
            ..Default::default()
        };

        if !postal_code.is_empty() {
            outcome.record = self.store.find_by_code(&postal_code).await?;
            if outcome.record.is_none() {
                outcome.not_found_message = Some(format!(
                    "Não existe nenhum registo com o código {}. Pode criar um novo abaixo.",
                    postal_code
                ));
            }
            outcome.external = Some(self.lookup.lookup(&postal_code).await);
        }

        outcome.form = prefill_form(&postal_code, outcome.record.as_ref(), outcome.external.as_ref());
        outcome.listing = Some(self.listing(params).await?);

        Ok(outcome)
    }

    async fn listing(&self, params: &ListParams) -> Result<Listing> {
        let query = build_query(&params.filters());
        let total_count = self.store.count(&query).await?;
        let page = paginate(total_count, parse_page_param(&params.pagina), self.page_size);
        let records = self.store.list(&query, page.offset, page.page_size).await?;

        tracing::debug!(
            page = page.page,
            total_pages = page.total_pages,
            total_count,
            "Listing records"
        );

        Ok(Listing {
            filters: FilterValues {
                localidade: params.localidade.trim().to_string(),
                prefixo: params.prefixo.trim().to_string(),
                sabado: params.sabado.trim().to_uppercase(),
            },
            page,
            records,
        })
    }

    /// Admin save. Validation and store failures come back in `failure` with the
    /// submitted values echoed in the form.
    pub async fn save(&self, form: &RecordForm) -> ManageOutcome {
        let echoed = form.normalized();
        let mut outcome = ManageOutcome {
            postal_code: echoed.cp.clone(),
            ..Default::default()
        };

        match upsert_record(self.store.as_ref(), form).await {
            Ok(record) => {
                outcome.form = RecordFields {
                    cp: record.cp.clone(),
                    localidade: record.localidade.clone(),
                    giro: record.giro.clone(),
                    centro: record.centro.clone(),
                    sabado: record.sabado.clone(),
                };
                outcome.record = Some(record);
                outcome.message = Some(SAVED_MESSAGE.to_string());
            }
            Err(e) => {
                if !matches!(e, AppError::ValidationError { .. }) {
                    tracing::error!(cp = %echoed.cp, error = %e, "Failed to save record");
                }
                outcome.form = echoed;
                outcome.failure = Some(e);
            }
        }

        if self.lookup_after_save && !outcome.postal_code.is_empty() {
            outcome.external = Some(self.lookup.lookup(&outcome.postal_code).await);
        }

        outcome
    }
}

/// Store values first; a blank locality falls back to the first external entry.
fn prefill_form(
    postal_code: &str,
    record: Option<&PostalRecord>,
    external: Option<&LookupOutcome>,
) -> RecordFields {
    let (mut localidade, giro, centro, sabado) = match record {
        Some(r) => (
            r.localidade.clone(),
            r.giro.clone(),
            r.centro.clone(),
            r.sabado.clone(),
        ),
        None => Default::default(),
    };

    if localidade.is_empty() {
        if let Some(Ok(entries)) = external {
            localidade = entries.primary().localidade().unwrap_or_default().to_string();
        }
    }

    RecordFields {
        cp: postal_code.to_string(),
        localidade,
        giro,
        centro,
        sabado,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRecordStore;
    use crate::domain::model::AddressEntry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubLookup {
        localidade: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl StubLookup {
        fn new(localidade: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                localidade,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PostalLookup for StubLookup {
        async fn lookup(&self, _code: &str) -> LookupOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some(localidade) = self.localidade else {
                return Err(LookupError::NoData);
            };
            let mut data = serde_json::Map::new();
            data.insert("localidade".into(), serde_json::json!(localidade));
            Ok(AddressEntries::new(vec![AddressEntry { data }]).unwrap())
        }
    }

    async fn seeded_store() -> Arc<MemoryRecordStore> {
        let store = Arc::new(MemoryRecordStore::new());
        for (cp, localidade, sabado) in [
            ("1000-001", "Lisboa", "S"),
            ("1000-002", "Lisboa", "N"),
            ("4000-001", "Porto", "S"),
        ] {
            store
                .upsert(&RecordFields {
                    cp: cp.into(),
                    localidade: localidade.into(),
                    giro: "G".into(),
                    centro: "C".into(),
                    sabado: sabado.into(),
                })
                .await
                .unwrap();
        }
        store
    }

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut params = ListParams::default();
        for (key, value) in pairs {
            let value = value.to_string();
            match *key {
                "postalCode" => params.postal_code = value,
                "localidade" => params.localidade = value,
                "prefixo" => params.prefixo = value,
                "sabado" => params.sabado = value,
                "pagina" => params.pagina = value,
                _ => unreachable!(),
            }
        }
        params
    }

    #[tokio::test]
    async fn test_search_blank_code_does_nothing() {
        let lookup = StubLookup::new(Some("Lisboa"));
        let service = PostalService::new(seeded_store().await, lookup.clone(), 20, true);

        let outcome = service.search("   ").await;

        assert!(outcome.external.is_none());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_not_found_still_looks_up() {
        let lookup = StubLookup::new(Some("Braga"));
        let service = PostalService::new(seeded_store().await, lookup.clone(), 20, true);

        let outcome = service.search(" 4700-001 ").await;

        assert!(outcome.record.is_none());
        assert!(outcome.not_found_message.unwrap().contains("4700-001"));
        assert!(matches!(outcome.external, Some(Ok(_))));
    }

    #[tokio::test]
    async fn test_search_store_failure_degrades() {
        let store = seeded_store().await;
        store.fail_reads(true);
        let service = PostalService::new(store, StubLookup::new(Some("Lisboa")), 20, true);

        let outcome = service.search("1000-001").await;

        assert!(outcome.store_error.is_some());
        assert!(matches!(outcome.external, Some(Ok(_))));
    }

    #[tokio::test]
    async fn test_manage_prefills_locality_from_external_when_unknown() {
        let service =
            PostalService::new(seeded_store().await, StubLookup::new(Some("Braga")), 20, true);

        let outcome = service.manage(&params(&[("postalCode", "4700-001")])).await.unwrap();

        assert_eq!(outcome.form.cp, "4700-001");
        assert_eq!(outcome.form.localidade, "Braga");
        assert!(outcome.not_found_message.is_some());
    }

    #[tokio::test]
    async fn test_manage_prefers_stored_locality() {
        let service =
            PostalService::new(seeded_store().await, StubLookup::new(Some("Outra")), 20, true);

        let outcome = service.manage(&params(&[("postalCode", "1000-001")])).await.unwrap();

        assert_eq!(outcome.form.localidade, "Lisboa");
        assert_eq!(outcome.form.sabado, "S");
    }

    #[tokio::test]
    async fn test_manage_filters_and_paginates() {
        let service = PostalService::new(seeded_store().await, StubLookup::new(None), 1, true);

        let outcome = service
            .manage(&params(&[("localidade", "lis"), ("pagina", "9")]))
            .await
            .unwrap();
        let listing = outcome.listing.unwrap();

        assert_eq!(listing.page.total_count, 2);
        assert_eq!(listing.page.total_pages, 2);
        assert_eq!(listing.page.page, 2);
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].cp, "1000-002");
    }

    #[tokio::test]
    async fn test_unknown_saturday_filter_equals_no_filter() {
        let service = PostalService::new(seeded_store().await, StubLookup::new(None), 20, true);

        let with_x = service.manage(&params(&[("sabado", "x")])).await.unwrap();
        let without = service.manage(&params(&[])).await.unwrap();

        assert_eq!(with_x.listing.unwrap().records, without.listing.unwrap().records);
    }

    #[tokio::test]
    async fn test_save_success_reads_back_and_looks_up_once() {
        let lookup = StubLookup::new(Some("Lisboa"));
        let service = PostalService::new(seeded_store().await, lookup.clone(), 20, true);
        let form = RecordForm {
            cp: "1000-001".into(),
            localidade: "Lisboa Centro".into(),
            giro: "G9".into(),
            centro: "C9".into(),
            sabado: "n".into(),
        };

        let outcome = service.save(&form).await;

        assert!(outcome.failure.is_none());
        assert_eq!(outcome.message.as_deref(), Some(SAVED_MESSAGE));
        assert_eq!(outcome.form.localidade, "Lisboa Centro");
        assert_eq!(outcome.form.sabado, "N");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_save_without_lookup_when_disabled() {
        let lookup = StubLookup::new(Some("Lisboa"));
        let service = PostalService::new(seeded_store().await, lookup.clone(), 20, false);
        let form = RecordForm {
            cp: "1000-001".into(),
            ..Default::default()
        };

        let outcome = service.save(&form).await;

        assert!(outcome.external.is_none());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_save_validation_failure_echoes_form() {
        let service =
            PostalService::new(seeded_store().await, StubLookup::new(None), 20, true);
        let form = RecordForm {
            cp: "1000-001".into(),
            localidade: " Lisboa ".into(),
            sabado: "x".into(),
            ..Default::default()
        };

        let outcome = service.save(&form).await;

        assert!(matches!(outcome.failure, Some(AppError::ValidationError { .. })));
        assert_eq!(outcome.form.localidade, "Lisboa");
        assert_eq!(outcome.form.sabado, "X");
    }
}
