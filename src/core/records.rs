use crate::domain::model::{PostalRecord, RecordFields, SaturdayDelivery};
use crate::domain::ports::RecordStore;
use crate::utils::error::{AppError, Result};
use serde::Deserialize;

pub const MISSING_CODE_MESSAGE: &str = "O campo Código Postal é obrigatório.";
pub const INVALID_SATURDAY_MESSAGE: &str = "Introduza S para Sim ou N para Não no campo Sábado.";

/// Admin create/update form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordForm {
    #[serde(default)]
    pub cp: String,
    #[serde(default)]
    pub localidade: String,
    #[serde(default)]
    pub giro: String,
    #[serde(default)]
    pub centro: String,
    #[serde(default)]
    pub sabado: String,
}

impl RecordForm {
    /// Trimmed values, Saturday upper-cased; used to echo the form back.
    pub fn normalized(&self) -> RecordFields {
        RecordFields {
            cp: self.cp.trim().to_string(),
            localidade: self.localidade.trim().to_string(),
            giro: self.giro.trim().to_string(),
            centro: self.centro.trim().to_string(),
            sabado: self.sabado.trim().to_uppercase(),
        }
    }

    pub fn validate(&self) -> Result<RecordFields> {
        let mut fields = self.normalized();

        if fields.cp.is_empty() {
            return Err(AppError::validation(MISSING_CODE_MESSAGE));
        }

        if !fields.sabado.is_empty() {
            let flag = SaturdayDelivery::parse(&fields.sabado)
                .ok_or_else(|| AppError::validation(INVALID_SATURDAY_MESSAGE))?;
            fields.sabado = flag.as_str().to_string();
        }

        Ok(fields)
    }
}

/// Validates, writes, then re-reads the authoritative stored record.
pub async fn upsert_record(store: &dyn RecordStore, form: &RecordForm) -> Result<PostalRecord> {
    let fields = form.validate()?;

    store.upsert(&fields).await?;
    tracing::info!(cp = %fields.cp, "Record saved");

    store
        .find_by_code(&fields.cp)
        .await?
        .ok_or_else(|| AppError::store(format!("record {} missing after upsert", fields.cp)))
}
