use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod monitor;
pub mod result;

pub use monitor::MonitorFilter;

/// 监控数据库的统一访问层。
///
/// 所有方法均为 `async fn`，底层使用 SeaORM；默认 SQLite（WAL 模式），
/// 连接时自动执行迁移。`monitor_results` 为追加写入表，结果插入与监控
/// 状态更新在同一事务内完成。
pub struct MonitorStore {
    pub(crate) db: DatabaseConnection,
}

impl MonitorStore {
    /// 连接并初始化数据库。
    ///
    /// `db_url`：完整连接 URL。SQLite 示例：`sqlite://data/pulsemon.db?mode=rwc`。
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL 模式仅对 SQLite 有效
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "Initialized monitor store");

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
