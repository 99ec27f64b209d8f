use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use pulsemon_common::types::{
    AlertConfig, LocationConfig, Monitor, MonitorConfig, MonitorStatus, MonitorType,
};

use crate::entities::monitor::{self, Column, Entity};
use crate::error::StorageError;
use crate::store::MonitorStore;

/// 监控列表过滤器
#[derive(Debug, Clone, Default)]
pub struct MonitorFilter {
    pub org_id_eq: Option<String>,
    pub project_id_eq: Option<String>,
    pub monitor_type_eq: Option<String>,
    pub status_eq: Option<String>,
    pub enabled_eq: Option<bool>,
}

pub(crate) fn to_monitor(m: monitor::Model) -> Result<Monitor> {
    let monitor_type: MonitorType = m.monitor_type.parse().map_err(|reason| {
        StorageError::CorruptColumn {
            entity: "monitor",
            id: m.id.clone(),
            column: "monitor_type",
            reason,
        }
    })?;
    let status: MonitorStatus =
        m.status
            .parse()
            .map_err(|reason| StorageError::CorruptColumn {
                entity: "monitor",
                id: m.id.clone(),
                column: "status",
                reason,
            })?;
    let config: MonitorConfig = serde_json::from_str(&m.config_json)?;
    let alert_config: AlertConfig = serde_json::from_str(&m.alert_config_json)?;
    let location_config: Option<LocationConfig> = m
        .location_config_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;

    Ok(Monitor {
        id: m.id,
        org_id: m.org_id,
        project_id: m.project_id,
        created_by: m.created_by,
        name: m.name,
        monitor_type,
        target: m.target,
        frequency_secs: m.frequency_secs.max(0) as u64,
        enabled: m.enabled,
        status,
        config,
        alert_config,
        location_config,
        muted_until: m.muted_until.map(|t| t.with_timezone(&Utc)),
        last_check_at: m.last_check_at.map(|t| t.with_timezone(&Utc)),
        last_status_change_at: m.last_status_change_at.map(|t| t.with_timezone(&Utc)),
        scheduled_job_id: m.scheduled_job_id,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn apply_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &MonitorFilter,
) -> sea_orm::Select<Entity> {
    if let Some(org) = &filter.org_id_eq {
        q = q.filter(Column::OrgId.eq(org));
    }
    if let Some(project) = &filter.project_id_eq {
        q = q.filter(Column::ProjectId.eq(project));
    }
    if let Some(t) = &filter.monitor_type_eq {
        q = q.filter(Column::MonitorType.eq(t));
    }
    if let Some(s) = &filter.status_eq {
        q = q.filter(Column::Status.eq(s));
    }
    if let Some(en) = filter.enabled_eq {
        q = q.filter(Column::Enabled.eq(en));
    }
    q
}

impl MonitorStore {
    pub async fn insert_monitor(&self, row: &Monitor) -> Result<Monitor> {
        let now = Utc::now().fixed_offset();
        let am = monitor::ActiveModel {
            id: Set(row.id.clone()),
            org_id: Set(row.org_id.clone()),
            project_id: Set(row.project_id.clone()),
            created_by: Set(row.created_by.clone()),
            name: Set(row.name.clone()),
            monitor_type: Set(row.monitor_type.to_string()),
            target: Set(row.target.clone()),
            frequency_secs: Set(row.frequency_secs as i64),
            enabled: Set(row.enabled),
            status: Set(row.status.to_string()),
            config_json: Set(serde_json::to_string(&row.config)?),
            alert_config_json: Set(serde_json::to_string(&row.alert_config)?),
            location_config_json: Set(row
                .location_config
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?),
            muted_until: Set(row.muted_until.map(|t| t.fixed_offset())),
            last_check_at: Set(None),
            last_status_change_at: Set(None),
            scheduled_job_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = am.insert(self.db()).await?;
        to_monitor(model)
    }

    pub async fn get_monitor(&self, id: &str) -> Result<Option<Monitor>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_monitor).transpose()
    }

    pub async fn list_monitors(
        &self,
        filter: &MonitorFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Monitor>> {
        let rows = apply_filter(Entity::find(), filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_monitor).collect()
    }

    pub async fn count_monitors(&self, filter: &MonitorFilter) -> Result<u64> {
        Ok(apply_filter(Entity::find(), filter)
            .count(self.db())
            .await?)
    }

    /// 启动时重建调度注册表使用：启用且未暂停的监控。
    pub async fn list_schedulable_monitors(&self) -> Result<Vec<Monitor>> {
        let rows = Entity::find()
            .filter(Column::Enabled.eq(true))
            .filter(Column::Status.ne(MonitorStatus::Paused.to_string()))
            .all(self.db())
            .await?;
        rows.into_iter().map(to_monitor).collect()
    }

    /// Full-row update of the mutable fields. The monitor type is immutable
    /// and deliberately not written.
    pub async fn update_monitor(&self, id: &str, row: &Monitor) -> Result<Option<Monitor>> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut am: monitor::ActiveModel = model.into();
        am.name = Set(row.name.clone());
        am.target = Set(row.target.clone());
        am.frequency_secs = Set(row.frequency_secs as i64);
        am.enabled = Set(row.enabled);
        am.status = Set(row.status.to_string());
        am.config_json = Set(serde_json::to_string(&row.config)?);
        am.alert_config_json = Set(serde_json::to_string(&row.alert_config)?);
        am.location_config_json = Set(row
            .location_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?);
        am.muted_until = Set(row.muted_until.map(|t| t.fixed_offset()));
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_monitor(updated)?))
    }

    pub async fn update_monitor_status(&self, id: &str, status: MonitorStatus) -> Result<bool> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(false);
        };
        let mut am: monitor::ActiveModel = model.into();
        am.status = Set(status.to_string());
        am.updated_at = Set(Utc::now().fixed_offset());
        am.update(self.db()).await?;
        Ok(true)
    }

    pub async fn set_scheduled_job_id(&self, id: &str, job_id: Option<String>) -> Result<bool> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Ok(false);
        };
        let mut am: monitor::ActiveModel = model.into();
        am.scheduled_job_id = Set(job_id);
        am.updated_at = Set(Utc::now().fixed_offset());
        am.update(self.db()).await?;
        Ok(true)
    }

    pub async fn delete_monitor(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }
}
