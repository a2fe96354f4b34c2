//! Translation of the admin list filters into a store query.
//!
//! User text in the locality and prefix filters is matched literally: pattern
//! metacharacters are escaped before the pattern reaches any backend.

use crate::domain::model::{PostalRecord, SaturdayDelivery};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Optional filters, each independently omittable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilters {
    pub locality: Option<String>,
    pub prefix: Option<String>,
    pub saturday: Option<SaturdayDelivery>,
}

impl RecordFilters {
    /// Blank values are dropped; an unrecognised Saturday value means "no filter".
    pub fn from_raw(locality: &str, prefix: &str, saturday: &str) -> Self {
        Self {
            locality: non_blank(locality),
            prefix: non_blank(prefix),
            saturday: SaturdayDelivery::parse(saturday),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Query-string shape of the admin list page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default, rename = "postalCode")]
    pub postal_code: String,
    #[serde(default)]
    pub localidade: String,
    #[serde(default)]
    pub prefixo: String,
    #[serde(default)]
    pub sabado: String,
    #[serde(default)]
    pub pagina: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ListParams {
    pub fn filters(&self) -> RecordFilters {
        RecordFilters::from_raw(&self.localidade, &self.prefixo, &self.sabado)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Case-insensitive substring of the locality.
    LocalityContains(String),
    /// Anchored prefix of the postal code.
    CodeStartsWith(String),
    SaturdayIs(SaturdayDelivery),
}

impl Condition {
    /// Pattern source for regex-capable backends.
    pub fn pattern(&self) -> Option<String> {
        match self {
            Self::LocalityContains(text) => Some(regex::escape(text)),
            Self::CodeStartsWith(prefix) => Some(format!("^{}", regex::escape(prefix))),
            Self::SaturdayIs(_) => None,
        }
    }

    fn compile(&self) -> Option<Regex> {
        let source = self.pattern()?;
        let case_insensitive = matches!(self, Self::LocalityContains(_));
        // escaped input always compiles
        RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .ok()
    }
}

/// Conjunction of conditions; no conditions matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreQuery {
    pub conditions: Vec<Condition>,
}

impl StoreQuery {
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn is_match_all(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matcher(&self) -> QueryMatcher {
        QueryMatcher {
            checks: self
                .conditions
                .iter()
                .map(|condition| match condition {
                    Condition::SaturdayIs(flag) => Check::Saturday(*flag),
                    Condition::LocalityContains(_) => Check::Locality(condition.compile()),
                    Condition::CodeStartsWith(_) => Check::Code(condition.compile()),
                })
                .collect(),
        }
    }
}

enum Check {
    Locality(Option<Regex>),
    Code(Option<Regex>),
    Saturday(SaturdayDelivery),
}

/// Compiled form of a [`StoreQuery`] for in-process evaluation.
pub struct QueryMatcher {
    checks: Vec<Check>,
}

impl QueryMatcher {
    pub fn matches(&self, record: &PostalRecord) -> bool {
        self.checks.iter().all(|check| match check {
            Check::Locality(re) => re.as_ref().is_some_and(|re| re.is_match(&record.localidade)),
            Check::Code(re) => re.as_ref().is_some_and(|re| re.is_match(&record.cp)),
            Check::Saturday(flag) => record.sabado == flag.as_str(),
        })
    }
}

pub fn build_query(filters: &RecordFilters) -> StoreQuery {
    let mut conditions = Vec::new();

    if let Some(locality) = &filters.locality {
        conditions.push(Condition::LocalityContains(locality.clone()));
    }
    if let Some(prefix) = &filters.prefix {
        conditions.push(Condition::CodeStartsWith(prefix.clone()));
    }
    if let Some(flag) = filters.saturday {
        conditions.push(Condition::SaturdayIs(flag));
    }

    StoreQuery { conditions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(cp: &str, localidade: &str, sabado: &str) -> PostalRecord {
        PostalRecord {
            id: Uuid::new_v4(),
            cp: cp.to_string(),
            localidade: localidade.to_string(),
            giro: String::new(),
            centro: String::new(),
            sabado: sabado.to_string(),
        }
    }

    #[test]
    fn test_no_filters_is_match_all() {
        let query = build_query(&RecordFilters::from_raw("", "  ", ""));
        assert!(query.is_match_all());
        assert!(query.matcher().matches(&record("1000-001", "Lisboa", "")));
    }

    #[test]
    fn test_unknown_saturday_value_is_ignored() {
        assert_eq!(
            build_query(&RecordFilters::from_raw("", "", "x")),
            build_query(&RecordFilters::from_raw("", "", ""))
        );
    }

    #[test]
    fn test_lowercase_saturday_matches_uppercase_records() {
        let query = build_query(&RecordFilters::from_raw("", "", "s"));
        let matcher = query.matcher();
        assert!(matcher.matches(&record("1000-001", "Lisboa", "S")));
        assert!(!matcher.matches(&record("1000-002", "Lisboa", "N")));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let query = build_query(&RecordFilters::from_raw("lis", "1000", "N"));
        assert_eq!(query.conditions.len(), 3);

        let matcher = query.matcher();
        assert!(matcher.matches(&record("1000-001", "LISBOA", "N")));
        assert!(!matcher.matches(&record("4000-001", "Lisboa", "N")));
        assert!(!matcher.matches(&record("1000-001", "Porto", "N")));
        assert!(!matcher.matches(&record("1000-001", "Lisboa", "S")));
    }

    #[test]
    fn test_prefix_is_anchored() {
        let matcher = build_query(&RecordFilters::from_raw("", "001", "")).matcher();
        assert!(!matcher.matches(&record("1000-001", "Lisboa", "")));
        assert!(matcher.matches(&record("0010-100", "Lisboa", "")));
    }

    #[test]
    fn test_metacharacters_match_literally() {
        let matcher = build_query(&RecordFilters::from_raw("a.b", "", "")).matcher();
        assert!(matcher.matches(&record("1000-001", "Vila A.B", "")));
        assert!(!matcher.matches(&record("1000-001", "Vila AxB", "")));

        // would be an invalid pattern if interpolated raw
        let matcher = build_query(&RecordFilters::from_raw("(", "", "")).matcher();
        assert!(matcher.matches(&record("1000-001", "Sé (Centro)", "")));
    }

    #[test]
    fn test_same_inputs_same_query() {
        let filters = RecordFilters::from_raw("Porto", "4", "S");
        assert_eq!(build_query(&filters), build_query(&filters));
    }
}
