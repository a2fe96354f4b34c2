//! PostgreSQL record store.

use crate::core::query::{Condition, StoreQuery};
use crate::domain::model::{
    ImportRow, PostalRecord, RecordFields, RecordSummary, FIELD_CENTRO, FIELD_CP, FIELD_GIRO,
    FIELD_LOCALIDADE, FIELD_SABADO,
};
use crate::domain::ports::RecordStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;

const RECORD_COLUMNS: &str = "id, COALESCE(cp, '') AS cp, COALESCE(localidade, '') AS localidade, \
     COALESCE(giro, '') AS giro, COALESCE(centro, '') AS centro, COALESCE(sabado, '') AS sabado";

const SUMMARY_COLUMNS: &str = "COALESCE(cp, '') AS cp, COALESCE(localidade, '') AS localidade, \
     COALESCE(sabado, '') AS sabado, COALESCE(giro, '') AS giro";

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        tracing::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(max_connections, "Database connected and migrations applied");

        Ok(Self::new(pool))
    }
}

fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, query: &StoreQuery) {
    for (i, condition) in query.conditions.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match condition {
            Condition::LocalityContains(_) => {
                builder
                    .push("localidade ~* ")
                    .push_bind(condition.pattern().unwrap_or_default());
            }
            Condition::CodeStartsWith(_) => {
                builder
                    .push("cp ~ ")
                    .push_bind(condition.pattern().unwrap_or_default());
            }
            Condition::SaturdayIs(flag) => {
                builder.push("sabado = ").push_bind(flag.as_str());
            }
        }
    }
}

/// Codes sort bytewise (`COLLATE "C"`), independent of the database locale.
fn list_query(query: &StoreQuery, offset: u64, limit: u64) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM locales", SUMMARY_COLUMNS));
    push_conditions(&mut builder, query);
    builder
        .push(" ORDER BY COALESCE(cp, '') COLLATE \"C\" ASC, seq ASC OFFSET ")
        .push_bind(offset as i64)
        .push(" LIMIT ")
        .push_bind(limit as i64);
    builder
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[tracing::instrument(skip(self), fields(db.table = "locales", db.operation = "select"))]
    async fn find_by_code(&self, code: &str) -> Result<Option<PostalRecord>> {
        let record = sqlx::query_as::<Postgres, PostalRecord>(&format!(
            "SELECT {} FROM locales WHERE cp = $1 ORDER BY seq ASC LIMIT 1",
            RECORD_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "locales", db.operation = "count"))]
    async fn count(&self, query: &StoreQuery) -> Result<u64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM locales");
        push_conditions(&mut builder, query);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    #[tracing::instrument(skip(self), fields(db.table = "locales", db.operation = "select"))]
    async fn list(&self, query: &StoreQuery, offset: u64, limit: u64) -> Result<Vec<RecordSummary>> {
        let mut builder = list_query(query, offset, limit);
        let records = builder
            .build_query_as::<RecordSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "locales", db.operation = "upsert", cp = %record.cp))]
    async fn upsert(&self, record: &RecordFields) -> Result<()> {
        // updates the row exact lookups return; inserts when the code is unknown
        sqlx::query(
            r#"
            WITH target AS (
                SELECT id FROM locales WHERE cp = $1 ORDER BY seq ASC LIMIT 1
            ), updated AS (
                UPDATE locales
                SET localidade = $2, giro = $3, centro = $4, sabado = $5, updated_at = NOW()
                WHERE id IN (SELECT id FROM target)
                RETURNING id
            )
            INSERT INTO locales (cp, localidade, giro, centro, sabado)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (SELECT 1 FROM updated)
            "#,
        )
        .bind(&record.cp)
        .bind(&record.localidade)
        .bind(&record.giro)
        .bind(&record.centro)
        .bind(&record.sabado)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, rows), fields(db.table = "locales", db.operation = "insert", rows = rows.len()))]
    async fn insert_many(&self, rows: &[ImportRow]) -> Result<u64> {
        let column = |key: &str| -> Vec<Option<String>> {
            rows.iter().map(|row| row.get(key).map(str::to_string)).collect()
        };
        let extra = rows
            .iter()
            .map(|row| serde_json::to_string(&row.extra_fields()))
            .collect::<std::result::Result<Vec<String>, _>>()?;

        let result = sqlx::query(
            r#"
            INSERT INTO locales (cp, localidade, giro, centro, sabado, extra)
            SELECT t.cp, t.localidade, t.giro, t.centro, t.sabado, t.extra::jsonb
            FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[])
                WITH ORDINALITY AS t(cp, localidade, giro, centro, sabado, extra, ord)
            ORDER BY t.ord
            "#,
        )
        .bind(column(FIELD_CP))
        .bind(column(FIELD_LOCALIDADE))
        .bind(column(FIELD_GIRO))
        .bind(column(FIELD_CENTRO))
        .bind(column(FIELD_SABADO))
        .bind(extra)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{build_query, RecordFilters};

    #[test]
    fn test_list_orders_codes_bytewise() {
        let builder = list_query(&StoreQuery::match_all(), 20, 10);
        assert!(builder
            .sql()
            .contains(r#"ORDER BY COALESCE(cp, '') COLLATE "C" ASC, seq ASC"#));
    }

    #[test]
    fn test_filters_are_bound_not_inlined() {
        let query = build_query(&RecordFilters::from_raw("Lisboa (Centro)", "10", "s"));
        let builder = list_query(&query, 0, 10);
        let sql = builder.sql();

        assert!(sql.contains("WHERE localidade ~* $1 AND cp ~ $2 AND sabado = $3"));
        assert!(!sql.contains("Lisboa"));
    }
}
