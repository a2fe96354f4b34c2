use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const FIELD_CP: &str = "CP";
pub const FIELD_LOCALIDADE: &str = "LOCALIDADE";
pub const FIELD_GIRO: &str = "GIRO";
pub const FIELD_CENTRO: &str = "CENTRO";
pub const FIELD_SABADO: &str = "SABADO";

/// Saturday-delivery flag as accepted by filters and the admin form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaturdayDelivery {
    #[serde(rename = "S")]
    Yes,
    #[serde(rename = "N")]
    No,
}

impl SaturdayDelivery {
    /// Trims and upper-cases `raw`; anything other than `S`/`N` yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "S" => Some(Self::Yes),
            "N" => Some(Self::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "S",
            Self::No => "N",
        }
    }
}

/// A stored postal-code record. Fields absent in the store read as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostalRecord {
    pub id: Uuid,
    pub cp: String,
    pub localidade: String,
    pub giro: String,
    pub centro: String,
    pub sabado: String,
}

/// Projection used by the admin list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecordSummary {
    pub cp: String,
    pub localidade: String,
    pub sabado: String,
    pub giro: String,
}

impl From<&PostalRecord> for RecordSummary {
    fn from(record: &PostalRecord) -> Self {
        Self {
            cp: record.cp.clone(),
            localidade: record.localidade.clone(),
            sabado: record.sabado.clone(),
            giro: record.giro.clone(),
        }
    }
}

/// The four mutable fields plus the code that keys an upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub cp: String,
    pub localidade: String,
    pub giro: String,
    pub centro: String,
    /// `"S"`, `"N"` or empty.
    pub sabado: String,
}

/// One cleaned CSV row: upper-cased header -> trimmed value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub data: BTreeMap<String, String>,
}

impl ImportRow {
    /// Builds a row from raw header/value pairs, normalising both sides.
    /// Headers that are empty after trimming are dropped.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut data = BTreeMap::new();
        for (key, value) in pairs {
            let key = normalize_header(key.as_ref());
            if key.is_empty() {
                continue;
            }
            data.insert(key, value.as_ref().trim().to_string());
        }
        Self { data }
    }

    pub fn normalized(self) -> Self {
        Self::from_pairs(self.data)
    }

    pub fn is_blank(&self) -> bool {
        self.data.values().all(|value| value.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Columns other than the five known record fields.
    pub fn extra_fields(&self) -> BTreeMap<&str, &str> {
        self.data
            .iter()
            .filter(|(key, _)| {
                ![FIELD_CP, FIELD_LOCALIDADE, FIELD_GIRO, FIELD_CENTRO, FIELD_SABADO]
                    .contains(&key.as_str())
            })
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_uppercase()
}

/// One address entry returned by the external lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl AddressEntry {
    pub fn text(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn localidade(&self) -> Option<&str> {
        self.text("localidade").filter(|v| !v.is_empty())
    }
}

/// Entries for one postal code; never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressEntries(Vec<AddressEntry>);

impl AddressEntries {
    pub fn new(entries: Vec<AddressEntry>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self(entries))
        }
    }

    pub fn primary(&self) -> &AddressEntry {
        &self.0[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AddressEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
