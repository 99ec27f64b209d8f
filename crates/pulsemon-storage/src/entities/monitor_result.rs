use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "monitor_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub monitor_id: String,
    pub checked_at: DateTimeWithTimeZone,
    pub status: String,
    pub response_time_ms: i64,
    pub details_json: String,
    pub is_up: bool,
    pub is_status_change: bool,
    pub consecutive_failure_count: i64,
    pub alerts_sent_for_failure: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
