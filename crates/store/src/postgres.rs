// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PostgreSQL report backend.
//!
//! One `reports` table with JSON text columns for nested fields and
//! indices on `scan_id`, `status`, and `created_at`. Upsert semantics on
//! save.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::{ReportBackend, ReportFilters, ReportId, ReportRecord, StoreError};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS reports (
    report_id TEXT PRIMARY KEY,
    scan_id TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending',
    report_type TEXT NOT NULL DEFAULT 'full',
    progress_pct DOUBLE PRECISION NOT NULL DEFAULT 0.0,
    message TEXT NOT NULL DEFAULT '',
    executive_summary TEXT,
    recommendations TEXT,
    sections_json TEXT NOT NULL DEFAULT '[]',
    metadata_json TEXT NOT NULL DEFAULT '{}',
    generation_time_ms DOUBLE PRECISION NOT NULL DEFAULT 0.0,
    total_tokens_used BIGINT NOT NULL DEFAULT 0,
    created_at DOUBLE PRECISION NOT NULL,
    updated_at DOUBLE PRECISION NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reports_scan_id ON reports(scan_id);
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);
CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at);
";

const UPSERT_SQL: &str = "
INSERT INTO reports
    (report_id, scan_id, title, status, report_type, progress_pct,
     message, executive_summary, recommendations, sections_json,
     metadata_json, generation_time_ms, total_tokens_used,
     created_at, updated_at)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
ON CONFLICT (report_id) DO UPDATE SET
    scan_id = EXCLUDED.scan_id,
    title = EXCLUDED.title,
    status = EXCLUDED.status,
    report_type = EXCLUDED.report_type,
    progress_pct = EXCLUDED.progress_pct,
    message = EXCLUDED.message,
    executive_summary = EXCLUDED.executive_summary,
    recommendations = EXCLUDED.recommendations,
    sections_json = EXCLUDED.sections_json,
    metadata_json = EXCLUDED.metadata_json,
    generation_time_ms = EXCLUDED.generation_time_ms,
    total_tokens_used = EXCLUDED.total_tokens_used,
    updated_at = EXCLUDED.updated_at
";

/// PostgreSQL-backed report storage owning its connection pool.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect, create the schema, and return the backend.
    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(dsn)
            .await
            .map_err(backend_err)?;
        Self::with_pool(pool).await
    }

    /// Use a caller-supplied pool (deployments that pool globally).
    pub async fn with_pool(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(backend_err)?;
        info!("postgres report backend ready");
        Ok(Self { pool })
    }
}

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn row_to_record(row: &PgRow) -> Result<ReportRecord, StoreError> {
    let sections_json: String = row.try_get("sections_json").map_err(backend_err)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(backend_err)?;
    Ok(ReportRecord {
        report_id: ReportId::new(row.try_get::<String, _>("report_id").map_err(backend_err)?),
        scan_id: row.try_get("scan_id").map_err(backend_err)?,
        title: row.try_get("title").map_err(backend_err)?,
        status: row.try_get("status").map_err(backend_err)?,
        report_type: row.try_get("report_type").map_err(backend_err)?,
        progress_pct: row.try_get("progress_pct").map_err(backend_err)?,
        message: row.try_get("message").map_err(backend_err)?,
        executive_summary: row.try_get("executive_summary").map_err(backend_err)?,
        recommendations: row.try_get("recommendations").map_err(backend_err)?,
        sections: serde_json::from_str(&sections_json)?,
        metadata: serde_json::from_str(&metadata_json)?,
        generation_time_ms: row.try_get("generation_time_ms").map_err(backend_err)?,
        total_tokens_used: row.try_get("total_tokens_used").map_err(backend_err)?,
        created_at: row.try_get("created_at").map_err(backend_err)?,
        updated_at: row.try_get("updated_at").map_err(backend_err)?,
    })
}

#[async_trait]
impl ReportBackend for PostgresBackend {
    async fn save(&self, record: &ReportRecord) -> Result<(), StoreError> {
        let sections = serde_json::to_string(&record.sections)?;
        let metadata = serde_json::to_string(&record.metadata)?;
        sqlx::query(UPSERT_SQL)
            .bind(record.report_id.as_str())
            .bind(&record.scan_id)
            .bind(&record.title)
            .bind(&record.status)
            .bind(&record.report_type)
            .bind(record.progress_pct)
            .bind(&record.message)
            .bind(&record.executive_summary)
            .bind(&record.recommendations)
            .bind(sections)
            .bind(metadata)
            .bind(record.generation_time_ms)
            .bind(record.total_tokens_used)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn get(&self, report_id: &ReportId) -> Result<Option<ReportRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM reports WHERE report_id = $1")
            .bind(report_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn delete(&self, report_id: &ReportId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reports WHERE report_id = $1")
            .bind(report_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        filters: &ReportFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportRecord>, StoreError> {
        let limit = limit as i64;
        let offset = offset as i64;
        let rows = match (&filters.scan_id, &filters.status) {
            (Some(scan_id), Some(status)) => {
                sqlx::query(
                    "SELECT * FROM reports WHERE scan_id = $1 AND status = $2 \
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4",
                )
                .bind(scan_id)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            (Some(scan_id), None) => {
                sqlx::query(
                    "SELECT * FROM reports WHERE scan_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(scan_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            (None, Some(status)) => {
                sqlx::query(
                    "SELECT * FROM reports WHERE status = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            (None, None) => {
                sqlx::query("SELECT * FROM reports ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(backend_err)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn count(&self, scan_id: Option<&str>) -> Result<usize, StoreError> {
        let count: i64 = match scan_id {
            Some(scan_id) => sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE scan_id = $1")
                .bind(scan_id)
                .fetch_one(&self.pool)
                .await
                .map_err(backend_err)?,
            None => sqlx::query_scalar("SELECT COUNT(*) FROM reports")
                .fetch_one(&self.pool)
                .await
                .map_err(backend_err)?,
        };
        Ok(count as usize)
    }

    async fn cleanup_before(&self, cutoff_epoch: f64) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM reports WHERE created_at < $1")
            .bind(cutoff_epoch)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(result.rows_affected() as usize)
    }
}
