use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use pulsemon_common::types::{CheckStatus, MonitorResult, MonitorStatus};

use crate::entities::{monitor, monitor_result};
use crate::error::StorageError;
use crate::store::MonitorStore;

pub(crate) fn to_result(m: monitor_result::Model) -> Result<MonitorResult> {
    let status: CheckStatus = m
        .status
        .parse()
        .map_err(|reason| StorageError::CorruptColumn {
            entity: "monitor_result",
            id: m.id.clone(),
            column: "status",
            reason,
        })?;
    let details: serde_json::Value = serde_json::from_str(&m.details_json)?;

    Ok(MonitorResult {
        id: m.id,
        monitor_id: m.monitor_id,
        checked_at: m.checked_at.with_timezone(&Utc),
        status,
        response_time_ms: m.response_time_ms.max(0) as u64,
        details,
        is_up: m.is_up,
        is_status_change: m.is_status_change,
        consecutive_failure_count: m.consecutive_failure_count.max(0) as u32,
        alerts_sent_for_failure: m.alerts_sent_for_failure.max(0) as u32,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

impl MonitorStore {
    /// 插入一条结果并在同一事务内更新监控的
    /// `status` / `last_check_at` / `last_status_change_at` 字段。
    ///
    /// 两者要么同时成功要么同时失败：结果行缺少对应的监控状态更新属于
    /// 数据一致性缺陷。监控行不存在时整个事务回滚（监控已被删除）。
    pub async fn insert_result_and_update_monitor(
        &self,
        result: &MonitorResult,
        new_status: MonitorStatus,
    ) -> Result<()> {
        let now = Utc::now().fixed_offset();
        let txn = self.db().begin().await?;

        monitor_result::ActiveModel {
            id: Set(result.id.clone()),
            monitor_id: Set(result.monitor_id.clone()),
            checked_at: Set(result.checked_at.fixed_offset()),
            status: Set(result.status.to_string()),
            response_time_ms: Set(result.response_time_ms as i64),
            details_json: Set(serde_json::to_string(&result.details)?),
            is_up: Set(result.is_up),
            is_status_change: Set(result.is_status_change),
            consecutive_failure_count: Set(result.consecutive_failure_count as i64),
            alerts_sent_for_failure: Set(result.alerts_sent_for_failure as i64),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let model = monitor::Entity::find_by_id(&result.monitor_id)
            .one(&txn)
            .await?
            .ok_or_else(|| StorageError::NotFound {
                entity: "monitor",
                id: result.monitor_id.clone(),
            })?;
        let mut am: monitor::ActiveModel = model.into();
        am.status = Set(new_status.to_string());
        am.last_check_at = Set(Some(result.checked_at.fixed_offset()));
        if result.is_status_change {
            am.last_status_change_at = Set(Some(result.checked_at.fixed_offset()));
        }
        am.updated_at = Set(now);
        am.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// The immediately preceding result for a monitor, by `checked_at`.
    pub async fn latest_result(&self, monitor_id: &str) -> Result<Option<MonitorResult>> {
        let model = monitor_result::Entity::find()
            .filter(monitor_result::Column::MonitorId.eq(monitor_id))
            .order_by(monitor_result::Column::CheckedAt, Order::Desc)
            .one(self.db())
            .await?;
        model.map(to_result).transpose()
    }

    pub async fn list_results(
        &self,
        monitor_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MonitorResult>> {
        let rows = monitor_result::Entity::find()
            .filter(monitor_result::Column::MonitorId.eq(monitor_id))
            .order_by(monitor_result::Column::CheckedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_result).collect()
    }

    pub async fn count_results(&self, monitor_id: &str) -> Result<u64> {
        Ok(monitor_result::Entity::find()
            .filter(monitor_result::Column::MonitorId.eq(monitor_id))
            .count(self.db())
            .await?)
    }

    /// Retention sweep: removes result rows checked before `cutoff`.
    /// Returns the number of rows deleted.
    pub async fn delete_results_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let res = monitor_result::Entity::delete_many()
            .filter(monitor_result::Column::CheckedAt.lt(cutoff.fixed_offset()))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
