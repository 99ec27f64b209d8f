use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS monitors (
    id TEXT PRIMARY KEY NOT NULL,
    org_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    created_by TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    monitor_type TEXT NOT NULL,
    target TEXT NOT NULL,
    frequency_secs INTEGER NOT NULL DEFAULT 60,
    enabled INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'pending',
    config_json TEXT NOT NULL,
    alert_config_json TEXT NOT NULL,
    location_config_json TEXT,
    muted_until TEXT,
    last_check_at TEXT,
    last_status_change_at TEXT,
    scheduled_job_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_monitors_org ON monitors(org_id);
CREATE INDEX IF NOT EXISTS idx_monitors_project ON monitors(project_id);
CREATE INDEX IF NOT EXISTS idx_monitors_enabled ON monitors(enabled);
CREATE INDEX IF NOT EXISTS idx_monitors_status ON monitors(status);

CREATE TABLE IF NOT EXISTS monitor_results (
    id TEXT PRIMARY KEY NOT NULL,
    monitor_id TEXT NOT NULL,
    checked_at TEXT NOT NULL,
    status TEXT NOT NULL,
    response_time_ms INTEGER NOT NULL DEFAULT 0,
    details_json TEXT NOT NULL DEFAULT '{}',
    is_up INTEGER NOT NULL DEFAULT 0,
    is_status_change INTEGER NOT NULL DEFAULT 0,
    consecutive_failure_count INTEGER NOT NULL DEFAULT 0,
    alerts_sent_for_failure INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_results_monitor_checked
    ON monitor_results(monitor_id, checked_at DESC);
CREATE INDEX IF NOT EXISTS idx_results_checked_at ON monitor_results(checked_at);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS monitor_results;
DROP TABLE IF EXISTS monitors;
";
